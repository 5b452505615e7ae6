use crate::refs::aux_file::{AuxEntry, LabelEntry, SectionEntry};
use crate::refs::out_file::OutEntry;

/// Entries that can each be handed out once, first match wins.
#[derive(Debug, Clone)]
pub struct Pool<T> {
    entries: Vec<T>,
    consumed: Vec<bool>,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T> Pool<T> {
    pub fn new(entries: Vec<T>) -> Self {
        let consumed = vec![false; entries.len()];
        Self { entries, consumed }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.consumed.iter().filter(|c| !**c).count()
    }

    /// First unconsumed entry matching `pred`, without consuming it
    pub fn peek_first(&self, pred: impl Fn(&T) -> bool) -> Option<&T> {
        self.position(&pred).map(|i| &self.entries[i])
    }

    /// Consumes and returns the first unconsumed entry matching `pred`
    pub fn take_first(&mut self, pred: impl Fn(&T) -> bool) -> Option<&T> {
        let i = self.position(&pred)?;
        self.consumed[i] = true;
        Some(&self.entries[i])
    }

    pub fn unconsumed(&self) -> impl Iterator<Item = &T> {
        self.entries
            .iter()
            .zip(self.consumed.iter())
            .filter(|(_, c)| !**c)
            .map(|(e, _)| e)
    }

    fn position(&self, pred: &impl Fn(&T) -> bool) -> Option<usize> {
        self.entries
            .iter()
            .zip(self.consumed.iter())
            .position(|(e, c)| !*c && pred(e))
    }
}

/// Aux-file entries available to one resolution run.
pub type AuxPool = Pool<AuxEntry>;

impl Pool<AuxEntry> {
    /// Consumes the first label entry with `key`.
    pub fn take_label(&mut self, key: &str) -> Option<LabelEntry> {
        self.take_first(|e| matches!(e, AuxEntry::Label(l) if l.key == key))
            .and_then(as_label)
    }

    pub fn peek_label(&self, key: &str) -> Option<&LabelEntry> {
        self.peek_first(|e| matches!(e, AuxEntry::Label(l) if l.key == key))
            .and_then(|e| match e {
                AuxEntry::Label(l) => Some(l),
                AuxEntry::Section(_) => None,
            })
    }

    /// Consumes the first numbered section entry of `entry_type`.
    pub fn take_section(&mut self, entry_type: &str) -> Option<SectionEntry> {
        self.take_first(|e| {
            matches!(e, AuxEntry::Section(s) if s.entry_type == entry_type && !s.number.is_empty())
        })
        .and_then(|e| match e {
            AuxEntry::Section(s) => Some(s.clone()),
            AuxEntry::Label(_) => None,
        })
    }
}

/// Bookmarks available for display-title backfill.
pub type OutPool = Pool<OutEntry>;

impl Pool<OutEntry> {
    /// Consumes the first bookmark anchored at `major.minor`.
    pub fn take_bookmark(&mut self, major: &str, minor: &str) -> Option<OutEntry> {
        self.take_first(|b| b.major == major && b.minor == minor)
            .cloned()
    }
}

fn as_label(entry: &AuxEntry) -> Option<LabelEntry> {
    match entry {
        AuxEntry::Label(l) => Some(l.clone()),
        AuxEntry::Section(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refs::aux_file::parse_aux;

    fn pool() -> AuxPool {
        AuxPool::new(parse_aux(
            "\\@writefile{toc}{\\contentsline {section}{\\numberline {1}A}{1}}\n\
             \\@writefile{toc}{\\contentsline {section}{Unnumbered}{1}}\n\
             \\@writefile{toc}{\\contentsline {section}{\\numberline {2}B}{2}}\n\
             \\newlabel{x}{{1}{1}{}{section.1}{}}\n\
             \\newlabel{x}{{5}{1}{}{equation.5}{}}\n",
        ))
    }

    #[test]
    fn test_sections_taken_in_order_once() {
        let mut pool = pool();
        assert_eq!(pool.take_section("section").unwrap().number, "1");
        assert_eq!(pool.take_section("section").unwrap().number, "2");
        assert!(pool.take_section("section").is_none());
        assert!(pool.take_section("chapter").is_none());
    }

    #[test]
    fn test_duplicate_label_keys_consumed_one_at_a_time() {
        let mut pool = pool();
        assert_eq!(pool.peek_label("x").unwrap().reference, "1");
        assert_eq!(pool.take_label("x").unwrap().reference, "1");
        assert_eq!(pool.take_label("x").unwrap().reference, "5");
        assert!(pool.take_label("x").is_none());
        assert!(pool.peek_label("x").is_none());
    }

    #[test]
    fn test_bookmark_taken_by_anchor() {
        let mut pool = OutPool::new(crate::refs::out_file::parse_out(
            "\\BOOKMARK [1][-]{section.1}{Intro}{}% 1\n\\BOOKMARK [1][-]{section.2}{Details}{}% 2\n",
            true,
        ));
        assert_eq!(pool.take_bookmark("section", "2").unwrap().title, "Details");
        assert!(pool.take_bookmark("section", "2").is_none());
        assert!(pool.take_bookmark("chapter", "1").is_none());
    }

    #[test]
    fn test_remaining_counts_unconsumed() {
        let mut pool = pool();
        assert_eq!(pool.len(), 5);
        pool.take_label("x");
        assert_eq!(pool.remaining(), 4);
        assert_eq!(pool.unconsumed().count(), 4);
    }
}
