use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::scanner::comments::is_line_comment;
use crate::source::DocumentSource;

static INCLUDE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\(?:input|include)\{(.+?)\}").expect("valid include pattern")
});

/// Discovers the ordered list of files composing a document.
pub struct IncludeWalker<'a> {
    source: &'a dyn DocumentSource,
}

impl<'a> IncludeWalker<'a> {
    pub fn new(source: &'a dyn DocumentSource) -> Self {
        Self { source }
    }

    /// Root first, then included files depth-first in directive order.
    ///
    /// Missing targets are dropped and files already visited are not
    /// followed again.
    pub fn walk(&self, root: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let mut visited = HashSet::new();
        self.walk_recursive(root, &mut files, &mut visited);
        files
    }

    fn walk_recursive(
        &self,
        file: &Path,
        files: &mut Vec<PathBuf>,
        visited: &mut HashSet<PathBuf>,
    ) {
        if !visited.insert(normalize_path(file)) {
            return;
        }
        files.push(file.to_path_buf());

        let Some(content) = self.source.read(file) else {
            return;
        };
        let base_dir = file.parent().unwrap_or_else(|| Path::new(""));

        for target in include_targets(&content, base_dir) {
            if self.source.exists(&target) {
                self.walk_recursive(&target, files, visited);
            } else {
                tracing::debug!("Dropping missing include {}", target.display());
            }
        }
    }
}

/// Resolved targets of uncommented `\input`/`\include` directives.
pub fn include_targets(content: &str, base_dir: &Path) -> Vec<PathBuf> {
    INCLUDE
        .captures_iter(content)
        .filter(|caps| {
            caps.get(0)
                .map(|m| !is_line_comment(content, m.start()))
                .unwrap_or(false)
        })
        .filter_map(|caps| caps.get(1))
        .map(|m| resolve_target(m.as_str().trim(), base_dir))
        .collect()
}

fn resolve_target(rel: &str, base_dir: &Path) -> PathBuf {
    let mut name = rel.to_string();
    if !name.ends_with(".tex") {
        name.push_str(".tex");
    }
    normalize_path(&base_dir.join(name))
}

/// Folds `.` and `..` components without touching the filesystem, so one
/// file reached through different relative spellings has one path.
fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::FsSource;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::TempDir;

    fn create_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_walk_orders_includes() {
        let temp_dir = TempDir::new().unwrap();
        let root = create_file(
            temp_dir.path(),
            "main.tex",
            "\\input{intro}\n\\include{chapters/two.tex}\n",
        );
        create_file(temp_dir.path(), "intro.tex", "\\section{Intro}");
        create_file(temp_dir.path(), "chapters/two.tex", "\\input{nested}");
        create_file(temp_dir.path(), "chapters/nested.tex", "");

        let files = IncludeWalker::new(&FsSource).walk(&root);
        let names: Vec<String> = files
            .iter()
            .map(|p| {
                p.strip_prefix(temp_dir.path())
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        assert_eq!(
            names,
            vec!["main.tex", "intro.tex", "chapters/two.tex", "chapters/nested.tex"]
        );
    }

    #[test]
    fn test_missing_and_commented_includes_dropped() {
        let temp_dir = TempDir::new().unwrap();
        let root = create_file(
            temp_dir.path(),
            "main.tex",
            "\\input{missing}\n% \\input{present}\n",
        );
        create_file(temp_dir.path(), "present.tex", "");

        let files = IncludeWalker::new(&FsSource).walk(&root);
        assert_eq!(files, vec![root]);
    }

    #[test]
    fn test_include_cycle_terminates() {
        let temp_dir = TempDir::new().unwrap();
        let root = create_file(temp_dir.path(), "a.tex", "\\input{b}");
        create_file(temp_dir.path(), "b.tex", "\\input{a}");

        let files = IncludeWalker::new(&FsSource).walk(&root);
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_include_cycle_through_parent_dir_terminates() {
        let temp_dir = TempDir::new().unwrap();
        let root = create_file(temp_dir.path(), "main.tex", "\\input{d/b}");
        create_file(temp_dir.path(), "d/b.tex", "\\input{../d/b}\n\\input{./b}");

        let files = IncludeWalker::new(&FsSource).walk(&root);
        assert_eq!(files, vec![root, temp_dir.path().join("d").join("b.tex")]);
    }

    #[test]
    fn test_include_targets_fold_relative_components() {
        let targets = include_targets(
            "\\input{../d/b}\\input{./c}\\input{../../../up}",
            Path::new("/doc/d"),
        );
        assert_eq!(
            targets,
            vec![
                PathBuf::from("/doc/d/b.tex"),
                PathBuf::from("/doc/d/c.tex"),
                PathBuf::from("/up.tex"),
            ]
        );
        assert_eq!(normalize_path(Path::new("../x/./y")), PathBuf::from("../x/y"));
    }

    #[test]
    fn test_include_targets_ignore_includegraphics() {
        let targets = include_targets(
            "\\includegraphics{fig}\\include{part}",
            Path::new("/doc"),
        );
        assert_eq!(targets, vec![PathBuf::from("/doc/part.tex")]);
    }
}
