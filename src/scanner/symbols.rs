//! Regex-driven structural command scanner.
//!
//! Each command family has its own recognizer so the patterns can be tested
//! one at a time. A recognizer only finds the command and the opening brace
//! of its mandatory argument; the argument is then extracted with brace
//! counting.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::outline::{Region, Symbol, SymbolKind};
use crate::scanner::braces::extract_brace_group;
use crate::scanner::comments::CommentFilter;

/// A compiled pattern for one command family.
pub struct Recognizer {
    pub kind: SymbolKind,
    pattern: Regex,
}

impl Recognizer {
    pub fn new(kind: SymbolKind) -> Self {
        let pattern = Regex::new(&format!(
            r"\\({})(\*)?\s*(?:\[[^\]]*\])?\{{",
            regex::escape(kind.name())
        ))
        .expect("valid recognizer pattern");
        Self { kind, pattern }
    }

    /// Symbols of this family in `content`, in source order.
    pub fn scan(&self, content: &str, file: &Path, filter: &CommentFilter) -> Vec<Symbol> {
        let mut symbols = Vec::new();

        for caps in self.pattern.captures_iter(content) {
            let Some(whole) = caps.get(0) else { continue };
            if filter.is_commented(content, whole.start()) {
                continue;
            }
            let starred = caps.get(2).is_some();
            let brace_start = whole.end() - 1;

            match extract_brace_group(content, brace_start) {
                Ok((name, brace_end)) if !name.is_empty() => {
                    symbols.push(Symbol::new(
                        name,
                        self.kind,
                        starred,
                        Region::new(brace_start + 1, brace_end - 1),
                        file,
                    ));
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(
                        "Skipping \\{} at offset {} in {}: {}",
                        self.kind,
                        whole.start(),
                        file.display(),
                        e
                    );
                }
            }
        }

        symbols
    }
}

static RECOGNIZERS: Lazy<Vec<Recognizer>> =
    Lazy::new(|| SymbolKind::ALL.iter().map(|k| Recognizer::new(*k)).collect());

/// The shared recognizer for `kind`.
pub fn recognizer(kind: SymbolKind) -> &'static Recognizer {
    RECOGNIZERS
        .iter()
        .find(|r| r.kind == kind)
        .expect("every kind has a recognizer")
}

pub fn scan_sections(content: &str, file: &Path, filter: &CommentFilter) -> Vec<Symbol> {
    [
        SymbolKind::Part,
        SymbolKind::Chapter,
        SymbolKind::Section,
        SymbolKind::Subsection,
        SymbolKind::Subsubsection,
        SymbolKind::Paragraph,
    ]
    .iter()
    .flat_map(|k| recognizer(*k).scan(content, file, filter))
    .collect()
}

pub fn scan_frametitles(content: &str, file: &Path, filter: &CommentFilter) -> Vec<Symbol> {
    recognizer(SymbolKind::Frametitle).scan(content, file, filter)
}

pub fn scan_labels(content: &str, file: &Path, filter: &CommentFilter) -> Vec<Symbol> {
    recognizer(SymbolKind::Label).scan(content, file, filter)
}

pub fn scan_title(content: &str, file: &Path, filter: &CommentFilter) -> Option<Symbol> {
    recognizer(SymbolKind::Title)
        .scan(content, file, filter)
        .into_iter()
        .next()
}

/// Every structural symbol of one file, ordered by region start.
///
/// `\title{}` is not included; the document title is handled separately.
pub fn scan_content(content: &str, file: &Path, filter: &CommentFilter) -> Vec<Symbol> {
    let mut symbols = scan_sections(content, file, filter);
    symbols.extend(scan_frametitles(content, file, filter));
    symbols.extend(scan_labels(content, file, filter));
    symbols.sort_by_key(|s| s.region.start);
    symbols
}

static LABEL_AFTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\label\{([^}]*)\}").expect("valid label pattern"));
static ANY_COMMAND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\\w*\{").expect("valid command pattern"));

/// The label attached to the structure ending at `offset`: the first
/// `\label{}` after it, provided no other command comes first.
pub fn label_after(content: &str, offset: usize) -> Option<&str> {
    let rest = content.get(offset..)?;
    let label = LABEL_AFTER.captures(rest)?;
    let label_start = label.get(0)?.start();
    if let Some(cmd) = ANY_COMMAND.find(rest) {
        if cmd.start() < label_start {
            return None;
        }
    }
    label.get(1).map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn file() -> PathBuf {
        PathBuf::from("main.tex")
    }

    fn scan(text: &str) -> Vec<Symbol> {
        scan_content(text, &file(), &CommentFilter::lines_only())
    }

    #[test]
    fn test_section_region_spans_argument() {
        let text = "intro\n\\section{Results}\n";
        let symbols = scan(text);
        assert_eq!(symbols.len(), 1);
        let s = &symbols[0];
        assert_eq!(s.content, "Results");
        assert_eq!(s.kind, SymbolKind::Section);
        assert_eq!(&text[s.region.start..s.region.end], "Results");
    }

    #[test]
    fn test_all_section_levels() {
        let text = r"\part{P}\chapter{C}\section{S}\subsection{SS}\subsubsection{SSS}\paragraph{Pa}";
        let kinds: Vec<SymbolKind> = scan(text).iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SymbolKind::Part,
                SymbolKind::Chapter,
                SymbolKind::Section,
                SymbolKind::Subsection,
                SymbolKind::Subsubsection,
                SymbolKind::Paragraph,
            ]
        );
    }

    #[test]
    fn test_section_does_not_match_subsection() {
        let symbols = recognizer(SymbolKind::Section).scan(
            r"\subsection{Inner}",
            &file(),
            &CommentFilter::lines_only(),
        );
        assert!(symbols.is_empty());
    }

    #[test]
    fn test_star_and_short_title() {
        let text = r"\section*[Short]{Long {\em title}}";
        let symbols = scan(text);
        assert_eq!(symbols.len(), 1);
        assert!(symbols[0].starred);
        assert_eq!(symbols[0].type_name(), "section*");
        assert_eq!(symbols[0].content, r"Long {\em title}");
    }

    #[test]
    fn test_whitespace_before_brace() {
        let symbols = scan("\\section {Spaced}");
        assert_eq!(symbols[0].content, "Spaced");
    }

    #[test]
    fn test_commented_command_is_dropped() {
        let text = "\\section{Kept}\n  % \\section{Dropped}\n\\label{kept}\n%\\label{gone}";
        let contents: Vec<String> = scan(text).into_iter().map(|s| s.content).collect();
        assert_eq!(contents, vec!["Kept", "kept"]);
    }

    #[test]
    fn test_unbalanced_and_empty_skipped() {
        let text = "\\section{}\\section{Good}\\section{broken";
        let contents: Vec<String> = scan(text).into_iter().map(|s| s.content).collect();
        assert_eq!(contents, vec!["Good"]);
    }

    #[test]
    fn test_symbols_sorted_by_position() {
        let text = r"\label{a}\section{S}\label{b}\frametitle{F}";
        let contents: Vec<String> = scan(text).into_iter().map(|s| s.content).collect();
        assert_eq!(contents, vec!["a", "S", "b", "F"]);
    }

    #[test]
    fn test_title_recognizer() {
        let title = scan_title(r"\title{On Things}", &file(), &CommentFilter::lines_only());
        assert_eq!(title.unwrap().content, "On Things");
        assert!(scan(r"\title{On Things}").is_empty());
    }

    #[test]
    fn test_label_after_section() {
        let text = r"\section{Intro}\label{sec:intro} text \ref{x}";
        let end = text.find('}').unwrap() + 1;
        assert_eq!(label_after(text, end), Some("sec:intro"));

        let text = r"\section{Intro} \emph{x} \label{later}";
        let end = text.find('}').unwrap() + 1;
        assert_eq!(label_after(text, end), None);
    }
}
