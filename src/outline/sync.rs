//! Cheap re-synchronization of an outline against a fresh scan.
//!
//! Entries are paired by content, not position, so insertions earlier in a
//! file do not disturb them. Two identical headings in one file may swap.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::outline::render::{render_entry, RenderOptions};
use crate::outline::{sort_by_inclusion, OutlineEntry, Reference, Symbol};

/// Rebuilds the active file's part of the outline from `fresh`.
///
/// Matched entries keep their reference and decoration and take the new
/// region. Unmatched symbols become pending entries, and old entries of
/// the active file that no longer occur are dropped. Entries from other
/// files are left alone.
pub fn light_refresh(
    old: Vec<OutlineEntry>,
    fresh: Vec<Symbol>,
    active_file: &Path,
    files: &[PathBuf],
    options: &RenderOptions,
) -> Vec<OutlineEntry> {
    let (active, mut kept): (Vec<OutlineEntry>, Vec<OutlineEntry>) =
        old.into_iter().partition(|e| e.symbol.file == active_file);
    let mut candidates: Vec<Option<OutlineEntry>> = active.into_iter().map(Some).collect();

    let mut added = 0usize;
    for symbol in fresh {
        let matched = candidates
            .iter_mut()
            .find(|c| matches!(c, Some(e) if e.symbol.content == symbol.content))
            .and_then(Option::take);

        let entry = match matched {
            Some(mut entry) => {
                let reshaped =
                    entry.symbol.kind != symbol.kind || entry.symbol.starred != symbol.starred;
                entry.symbol = symbol;
                if reshaped {
                    entry.reference = Reference::Pending;
                    entry.rendered = render_entry(&entry, options);
                }
                entry
            }
            None => {
                added += 1;
                let mut entry = OutlineEntry::new(symbol, Reference::Pending);
                entry.rendered = render_entry(&entry, options);
                entry
            }
        };
        kept.push(entry);
    }

    let removed = candidates.iter().filter(|c| c.is_some()).count();
    tracing::debug!(
        "Light refresh of {}: {} added, {} removed",
        active_file.display(),
        added,
        removed
    );

    sort_by_inclusion(&mut kept, files);
    kept
}

/// Moves the regions of the active file's entries to where `fresh` found
/// their content. Returns how many entries moved.
pub fn refresh_regions(entries: &mut [OutlineEntry], fresh: Vec<Symbol>, active_file: &Path) -> usize {
    let mut fresh: Vec<Option<Symbol>> = fresh.into_iter().map(Some).collect();
    let mut moved = 0;

    for entry in entries.iter_mut().filter(|e| e.symbol.file == active_file) {
        let found = fresh
            .iter_mut()
            .find(|s| matches!(s, Some(s) if s.content == entry.symbol.content))
            .and_then(Option::take);
        if let Some(symbol) = found {
            if entry.symbol.region != symbol.region {
                entry.symbol.region = symbol.region;
                moved += 1;
            }
        }
    }
    moved
}

/// Spacing between region-only refreshes.
#[derive(Debug, Clone)]
pub struct Cooldown {
    period: Duration,
    last: Option<Instant>,
}

impl Cooldown {
    pub fn new(period: Duration) -> Self {
        Self { period, last: None }
    }

    /// Starts a new window when the previous one has elapsed.
    pub fn try_start(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.period => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}
