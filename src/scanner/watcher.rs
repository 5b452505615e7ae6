use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::time::Duration;

use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEvent, Debouncer};

use crate::error::{OutlineError, Result};

/// Changes relevant to an open outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    /// A `.tex` file was written
    SourceSaved(PathBuf),
    /// The compiler rewrote a `.aux` or `.out` file
    CompanionUpdated(PathBuf),
    Removed(PathBuf),
}

/// Classifies a debounced path; other extensions are ignored.
pub fn classify_path(path: &Path) -> Option<DocumentEvent> {
    let ext = path.extension()?.to_str()?;
    if !path.exists() {
        return match ext {
            "tex" | "aux" | "out" => Some(DocumentEvent::Removed(path.to_path_buf())),
            _ => None,
        };
    }
    match ext {
        "tex" => Some(DocumentEvent::SourceSaved(path.to_path_buf())),
        "aux" | "out" => Some(DocumentEvent::CompanionUpdated(path.to_path_buf())),
        _ => None,
    }
}

/// Watches a document directory.
///
/// The debounce window also lets a LaTeX run finish rewriting its `.aux`
/// before the change is reported.
pub struct FileWatcher {
    _debouncer: Debouncer<notify::RecommendedWatcher>,
    receiver: Receiver<std::result::Result<Vec<DebouncedEvent>, notify::Error>>,
}

impl FileWatcher {
    pub fn new(path: &Path) -> Result<Self> {
        Self::with_debounce(path, Duration::from_millis(500))
    }

    pub fn with_debounce(path: &Path, debounce: Duration) -> Result<Self> {
        let (tx, rx) = channel();

        let mut debouncer =
            new_debouncer(debounce, tx).map_err(|e| OutlineError::Watcher(e.to_string()))?;

        debouncer
            .watcher()
            .watch(path, RecursiveMode::Recursive)
            .map_err(|e| OutlineError::Watcher(e.to_string()))?;

        Ok(Self {
            _debouncer: debouncer,
            receiver: rx,
        })
    }

    /// Blocks until the next batch of relevant events.
    ///
    /// Returns `None` when the batch held nothing relevant or the watcher
    /// failed.
    pub fn recv(&self) -> Option<Vec<DocumentEvent>> {
        match self.receiver.recv() {
            Ok(Ok(events)) => Self::relevant(events),
            Ok(Err(e)) => {
                tracing::warn!("Watcher error: {}", e);
                None
            }
            Err(_) => None,
        }
    }

    pub fn try_recv(&self) -> Option<Vec<DocumentEvent>> {
        match self.receiver.try_recv() {
            Ok(Ok(events)) => Self::relevant(events),
            _ => None,
        }
    }

    fn relevant(events: Vec<DebouncedEvent>) -> Option<Vec<DocumentEvent>> {
        let mut doc_events: Vec<DocumentEvent> = events
            .into_iter()
            .filter_map(|e| classify_path(&e.path))
            .collect();
        doc_events.dedup();

        if doc_events.is_empty() {
            None
        } else {
            Some(doc_events)
        }
    }
}
