//! Pairs scanned symbols with aux-file entries.
//!
//! Labels match by key. Sections match by type and position only: the
//! n-th numbered `section` line of the aux file goes to the n-th unstarred
//! `\section` of the scan. Titles in the aux file are post-expansion, so
//! comparing them with source text is not attempted.

use crate::outline::{OutlineEntry, Reference, Symbol, SymbolKind};
use crate::refs::pool::AuxPool;
use crate::scanner::is_equation_env;

/// Resolves references for `symbols`, consuming matched entries from `pool`.
///
/// Without a pool every symbol is unresolved.
pub fn resolve_references(symbols: &[Symbol], mut pool: Option<&mut AuxPool>) -> Vec<OutlineEntry> {
    let mut entries = Vec::with_capacity(symbols.len());

    for (i, symbol) in symbols.iter().enumerate() {
        let Some(pool) = pool.as_deref_mut() else {
            entries.push(OutlineEntry::new(symbol.clone(), Reference::Unresolved));
            continue;
        };

        let entry = match symbol.kind {
            SymbolKind::Label => resolve_label(symbol, pool),
            SymbolKind::Title => OutlineEntry::new(symbol.clone(), Reference::Unresolved),
            _ if symbol.starred => OutlineEntry::new(symbol.clone(), Reference::Unresolved),
            _ => {
                let reference = match pool.take_section(symbol.kind.name()) {
                    Some(section) => Reference::Resolved(section.number),
                    None => attached_label_number(symbols, i, pool)
                        .map(Reference::Resolved)
                        .unwrap_or(Reference::Unresolved),
                };
                OutlineEntry::new(symbol.clone(), reference)
            }
        };
        entries.push(entry);
    }

    if let Some(pool) = pool {
        tracing::debug!("{} aux entries left unconsumed", pool.remaining());
    }
    entries
}

fn resolve_label(symbol: &Symbol, pool: &mut AuxPool) -> OutlineEntry {
    match pool.take_label(&symbol.content) {
        Some(label) => {
            let mut entry = OutlineEntry::new(symbol.clone(), Reference::Resolved(label.reference));
            entry.is_equation = label
                .entry_type
                .as_deref()
                .map(is_equation_env)
                .unwrap_or(false);
            entry
        }
        None => OutlineEntry::new(symbol.clone(), Reference::Unresolved),
    }
}

/// Number lent by a label placed under the section at `index`, before the
/// next structural heading, whose aux entry has the section's type.
fn attached_label_number(symbols: &[Symbol], index: usize, pool: &AuxPool) -> Option<String> {
    let section = &symbols[index];
    symbols[index + 1..]
        .iter()
        .take_while(|s| s.file == section.file && s.kind == SymbolKind::Label)
        .filter_map(|s| pool.peek_label(&s.content))
        .find(|l| l.entry_type.as_deref() == Some(section.kind.name()))
        .map(|l| l.reference.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::Region;
    use crate::refs::aux_file::parse_aux;

    fn sym(content: &str, kind: SymbolKind, start: usize) -> Symbol {
        Symbol::new(content, kind, false, Region::new(start, start + content.len()), "main.tex")
    }

    fn pool(aux: &str) -> AuxPool {
        AuxPool::new(parse_aux(aux))
    }

    #[test]
    fn test_sections_resolve_positionally_by_type() {
        let mut pool = pool(
            "\\@writefile{toc}{\\contentsline {chapter}{\\numberline {1}Start}{1}}\n\
             \\@writefile{toc}{\\contentsline {section}{\\numberline {1.1}Whatever}{1}}\n\
             \\@writefile{toc}{\\contentsline {section}{\\numberline {1.2}Else}{2}}\n",
        );
        let symbols = vec![
            sym("Start", SymbolKind::Chapter, 0),
            sym("Alpha", SymbolKind::Section, 20),
            sym("Beta", SymbolKind::Section, 40),
            sym("Gamma", SymbolKind::Section, 60),
        ];
        let entries = resolve_references(&symbols, Some(&mut pool));
        let refs: Vec<&str> = entries.iter().map(|e| e.reference.marker()).collect();
        assert_eq!(refs, vec!["1", "1.1", "1.2", "*"]);
        assert_eq!(pool.remaining(), 0);
    }

    #[test]
    fn test_label_consumed_once() {
        let mut pool = pool("\\newlabel{eq:a}{{3}{1}{}{equation.3}{}}\n");
        let symbols = vec![
            sym("eq:a", SymbolKind::Label, 0),
            sym("eq:a", SymbolKind::Label, 30),
        ];
        let entries = resolve_references(&symbols, Some(&mut pool));
        assert_eq!(entries[0].reference, Reference::Resolved("3".into()));
        assert!(entries[0].is_equation);
        assert_eq!(entries[1].reference, Reference::Unresolved);
    }

    #[test]
    fn test_attached_label_lends_section_number() {
        let mut pool = pool(
            "\\@writefile{toc}{\\contentsline {section}{\\numberline {1}Intro}{1}}\n\
             \\newlabel{sec:details}{{2}{1}{}{section.2}{}}\n",
        );
        let symbols = vec![
            sym("Intro", SymbolKind::Section, 0),
            sym("Details", SymbolKind::Section, 30),
            sym("sec:details", SymbolKind::Label, 45),
        ];
        let entries = resolve_references(&symbols, Some(&mut pool));
        assert_eq!(entries[0].reference, Reference::Resolved("1".into()));
        assert_eq!(entries[1].reference, Reference::Resolved("2".into()));
        assert_eq!(entries[2].reference, Reference::Resolved("2".into()));
        assert!(!entries[2].is_equation);
    }

    #[test]
    fn test_starred_and_missing_aux_unresolved() {
        let mut starred = sym("Preface", SymbolKind::Section, 0);
        starred.starred = true;
        let symbols = vec![starred, sym("sec:x", SymbolKind::Label, 20)];

        let mut pool = pool("\\@writefile{toc}{\\contentsline {section}{\\numberline {1}A}{1}}\n");
        let entries = resolve_references(&symbols, Some(&mut pool));
        assert_eq!(entries[0].reference, Reference::Unresolved);
        assert_eq!(pool.remaining(), 1);

        let entries = resolve_references(&symbols, None);
        assert!(entries.iter().all(|e| e.reference == Reference::Unresolved));
    }
}
