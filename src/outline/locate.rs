//! Cursor to outline-row lookup.

use std::path::Path;

use crate::outline::{OutlineEntry, OutlineView, Positioned, LABEL_LEVEL};
use crate::scanner::comments::line_bounds;

/// Index of the entry whose line range holds `cursor`.
///
/// The first entry owns everything from offset 0 and the last one
/// everything up to `doc_len`. Returns `None` for an empty list.
pub fn locate_index(line_starts: &[usize], doc_len: usize, cursor: usize) -> Option<usize> {
    if line_starts.is_empty() {
        return None;
    }
    let mut bounds = Vec::with_capacity(line_starts.len() + 1);
    bounds.push(0);
    bounds.extend_from_slice(&line_starts[1..]);
    bounds.push(doc_len);

    let upper = bounds.partition_point(|&b| b <= cursor);
    Some(upper.saturating_sub(1).min(line_starts.len() - 1))
}

/// Row of `view` to highlight for a cursor in `active_file`.
///
/// Rows count every entry the view shows, title included. Outside the
/// table-of-contents view a label row gives way to the heading above it.
pub fn locate_row(
    entries: &[OutlineEntry],
    view: OutlineView,
    active_file: &Path,
    content: &str,
    cursor: usize,
) -> Option<usize> {
    let visible = view.filter(entries);
    if visible.is_empty() {
        return None;
    }

    let active: Vec<usize> = visible
        .iter()
        .enumerate()
        .filter(|(_, e)| e.file() == active_file)
        .map(|(i, _)| i)
        .collect();
    if active.is_empty() {
        return Some(0);
    }

    let line_starts: Vec<usize> = active
        .iter()
        .map(|&i| line_bounds(content, visible[i].region().start.min(content.len())).0)
        .collect();
    let index = locate_index(&line_starts, content.len(), cursor)?;
    let mut row = active[index];

    if view != OutlineView::Toc {
        let max_level = view.max_level().min(LABEL_LEVEL - 1);
        if let Some(heading) = (0..=row).rev().find(|&i| visible[i].level() <= max_level) {
            row = heading;
        }
    }
    Some(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::{Reference, Region, Symbol, SymbolKind};

    #[test]
    fn test_locate_index_boundaries() {
        let starts = [0, 10, 25, 40];
        assert_eq!(locate_index(&starts, 50, 30), Some(2));
        assert_eq!(locate_index(&starts, 50, 5), Some(0));
        assert_eq!(locate_index(&starts, 50, 49), Some(3));
        assert_eq!(locate_index(&starts, 50, 50), Some(3));
        assert_eq!(locate_index(&[], 50, 3), None);
    }

    #[test]
    fn test_locate_index_before_first_entry() {
        assert_eq!(locate_index(&[12, 30], 40, 3), Some(0));
    }

    fn entries(content: &str) -> Vec<OutlineEntry> {
        let mut out = Vec::new();
        for (needle, kind) in [
            ("Intro", SymbolKind::Section),
            ("sec:intro", SymbolKind::Label),
            ("Method", SymbolKind::Section),
            ("eq:m", SymbolKind::Label),
        ] {
            let start = content.find(needle).unwrap();
            let symbol = Symbol::new(
                needle,
                kind,
                false,
                Region::new(start, start + needle.len()),
                "main.tex",
            );
            out.push(OutlineEntry::new(symbol, Reference::Unresolved));
        }
        out
    }

    const DOC: &str = "\\section{Intro}\n\\label{sec:intro}\ntext\n\\section{Method}\nmore\n\\begin{equation}\\label{eq:m}\\end{equation}\nend\n";

    #[test]
    fn test_locate_row_toc() {
        let entries = entries(DOC);
        let file = Path::new("main.tex");
        let cursor = DOC.find("more").unwrap();
        assert_eq!(locate_row(&entries, OutlineView::Toc, file, DOC, cursor), Some(1));
        assert_eq!(locate_row(&entries, OutlineView::Toc, file, DOC, 0), Some(0));
    }

    #[test]
    fn test_locate_row_full_walks_back_to_heading() {
        let entries = entries(DOC);
        let file = Path::new("main.tex");
        let cursor = DOC.find("end\n").unwrap();
        assert_eq!(locate_row(&entries, OutlineView::Full, file, DOC, cursor), Some(2));
    }

    #[test]
    fn test_locate_row_other_file() {
        let entries = entries(DOC);
        assert_eq!(
            locate_row(&entries, OutlineView::Toc, Path::new("other.tex"), DOC, 3),
            Some(0)
        );
    }

    #[test]
    fn test_locate_row_stale_region_inside_multibyte_char() {
        // Region recorded before "xxxxxxxxé" was typed; offset 9 splits the é
        let content = "xxxxxxxx\u{e9}\\section{A}\n";
        let symbol = Symbol::new("A", SymbolKind::Section, false, Region::new(9, 10), "main.tex");
        let entries = vec![OutlineEntry::new(symbol, Reference::Unresolved)];
        let file = Path::new("main.tex");
        assert_eq!(locate_row(&entries, OutlineView::Toc, file, content, 3), Some(0));
        assert_eq!(locate_row(&entries, OutlineView::Toc, file, content, content.len()), Some(0));
    }
}
