pub mod braces;
pub mod comments;
pub mod environments;
pub mod includes;
pub mod symbols;
pub mod watcher;

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::outline::{sort_by_inclusion, Symbol};
use crate::source::DocumentSource;

pub use braces::extract_brace_group;
pub use comments::{find_comment_blocks, is_line_comment, uses_comment_package, CommentFilter};
pub use environments::{
    classify_label, find_env_pairs, innermost_enclosing, is_equation_env, match_envs, EnvClass,
    EnvPair,
};
pub use includes::IncludeWalker;
pub use symbols::{label_after, scan_content, Recognizer};
pub use watcher::{DocumentEvent, FileWatcher};

/// Symbols of a whole document together with the files it spans.
#[derive(Debug, Default, Clone)]
pub struct ScanResult {
    pub symbols: Vec<Symbol>,
    /// Inclusion order, root first
    pub files: Vec<PathBuf>,
    /// Files at or after the first one loading the `comment` package
    pub comment_package: Vec<bool>,
}

impl ScanResult {
    /// Whether block comments apply to `file`
    pub fn comment_package_for(&self, file: &Path) -> bool {
        self.files
            .iter()
            .position(|f| f == file)
            .map(|i| self.comment_package[i])
            .unwrap_or(false)
    }
}

/// Scans every file of a document reachable from its root.
pub struct DocumentScanner<'a> {
    source: &'a dyn DocumentSource,
}

impl<'a> DocumentScanner<'a> {
    pub fn new(source: &'a dyn DocumentSource) -> Self {
        Self { source }
    }

    /// Full scan: include walk, per-file scan in parallel, merge.
    ///
    /// A `\title{}` found in the root is kept unless `title` is given.
    pub fn scan_document(&self, root: &Path, title: Option<&str>) -> ScanResult {
        let files = IncludeWalker::new(self.source).walk(root);
        let contents: Vec<Option<String>> = files.iter().map(|f| self.source.read(f)).collect();

        // Once a file loads the package, block comments apply from there on
        let mut comment_package = Vec::with_capacity(files.len());
        let mut sticky = false;
        for content in &contents {
            if content.as_deref().map(uses_comment_package).unwrap_or(false) {
                sticky = true;
            }
            comment_package.push(sticky);
        }

        let mut symbols: Vec<Symbol> = files
            .par_iter()
            .zip(contents.par_iter())
            .zip(comment_package.par_iter())
            .flat_map(|((file, content), &package)| match content {
                Some(content) => {
                    let filter = CommentFilter::for_text(content, package);
                    scan_content(content, file, &filter)
                }
                None => Vec::new(),
            })
            .collect();

        match (title, contents.first()) {
            (Some(title), _) => symbols.push(Symbol::title(title, root)),
            (None, Some(Some(root_content))) => {
                let filter = CommentFilter::for_text(root_content, comment_package[0]);
                if let Some(scanned) = symbols::scan_title(root_content, root, &filter) {
                    symbols.push(scanned);
                }
            }
            _ => {}
        }

        sort_by_inclusion(&mut symbols, &files);
        tracing::debug!(
            "Scanned {} symbols across {} files from {}",
            symbols.len(),
            files.len(),
            root.display()
        );

        ScanResult {
            symbols,
            files,
            comment_package,
        }
    }

    /// Symbols of a single file, as used by the cheaper refresh paths.
    pub fn scan_file(&self, file: &Path, comment_package: bool) -> Vec<Symbol> {
        let Some(content) = self.source.read(file) else {
            return Vec::new();
        };
        let package = comment_package || uses_comment_package(&content);
        scan_content(&content, file, &CommentFilter::for_text(&content, package))
    }
}
