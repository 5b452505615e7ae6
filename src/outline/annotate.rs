//! Environment annotation, run off the interactive path.
//!
//! A snapshot of the outline goes to a worker task, which pairs the
//! environments of every file, classifies labels and backfills bookmark
//! titles. The result is posted back through the [`SessionManager`], which
//! drops it when the session was closed or refreshed in the meantime.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::error::{OutlineError, Result};
use crate::outline::render::{render_entry, RenderOptions};
use crate::outline::session::SessionManager;
use crate::outline::{OutlineEntry, Reference, SymbolKind};
use crate::refs::{load_out, OutPool};
use crate::scanner::{classify_label, find_env_pairs, CommentFilter, EnvPair};
use crate::source::DocumentSource;

/// What the worker needs to annotate one outline.
#[derive(Debug, Clone)]
pub struct AnnotationSnapshot {
    pub session_id: String,
    /// Session generation the snapshot was taken at
    pub generation: u64,
    pub root: PathBuf,
    pub files: Vec<PathBuf>,
    pub comment_package: Vec<bool>,
    pub entries: Vec<OutlineEntry>,
    pub options: RenderOptions,
    pub strip_bookmark_numbers: bool,
}

/// New decoration for the entry at `index`.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationUpdate {
    pub index: usize,
    pub env_type: String,
    pub is_equation: bool,
    pub display_title: Option<String>,
    pub rendered: String,
}

#[derive(Debug, Clone)]
pub struct AnnotationResult {
    pub session_id: String,
    pub generation: u64,
    pub updates: Vec<AnnotationUpdate>,
}

/// Classifies labels by enclosing environment and backfills section titles
/// from the bookmarks file.
pub fn annotate_snapshot(snapshot: &AnnotationSnapshot, source: &dyn DocumentSource) -> AnnotationResult {
    let mut bookmarks = load_out(&snapshot.root, source, snapshot.strip_bookmark_numbers)
        .filter(|b| !b.is_empty())
        .map(OutPool::new);

    let mut pairs_by_file: HashMap<&Path, Vec<EnvPair>> = HashMap::new();
    for (file, &package) in snapshot.files.iter().zip(snapshot.comment_package.iter()) {
        if let Some(content) = source.read(file) {
            let filter = CommentFilter::for_text(&content, package);
            pairs_by_file.insert(file.as_path(), find_env_pairs(&content, &filter));
        }
    }

    let mut updates = Vec::new();
    for (index, entry) in snapshot.entries.iter().enumerate() {
        let mut annotated = entry.clone();
        match entry.kind() {
            SymbolKind::Title => continue,
            SymbolKind::Label => {
                let Some(pairs) = pairs_by_file.get(entry.symbol.file.as_path()) else {
                    continue;
                };
                let class = classify_label(pairs, entry.symbol.region.start);
                annotated.env_type = class.env_type;
                annotated.is_equation = class.is_equation;
            }
            kind => {
                let (Some(pool), Reference::Resolved(number)) = (bookmarks.as_mut(), &entry.reference)
                else {
                    continue;
                };
                let Some(bookmark) = pool.take_bookmark(kind.name(), number) else {
                    continue;
                };
                annotated.display_title = Some(bookmark.title);
            }
        }
        annotated.rendered = render_entry(&annotated, &snapshot.options);
        updates.push(AnnotationUpdate {
            index,
            env_type: annotated.env_type,
            is_equation: annotated.is_equation,
            display_title: annotated.display_title,
            rendered: annotated.rendered,
        });
    }

    tracing::debug!(
        "Annotated {} of {} entries for session {}",
        updates.len(),
        snapshot.entries.len(),
        snapshot.session_id
    );
    AnnotationResult {
        session_id: snapshot.session_id.clone(),
        generation: snapshot.generation,
        updates,
    }
}

/// Commands accepted by the annotation worker.
#[derive(Debug)]
pub enum AnnotationCommand {
    Annotate {
        snapshot: AnnotationSnapshot,
        /// Receives whether the result was applied
        respond: Option<oneshot::Sender<bool>>,
    },
    Shutdown,
}

/// Handle for queueing annotation work. Jobs run one at a time.
#[derive(Clone)]
pub struct AnnotationQueue {
    sender: mpsc::Sender<AnnotationCommand>,
}

impl AnnotationQueue {
    const DEFAULT_BUFFER_SIZE: usize = 32;

    /// Creates the queue and spawns its worker on the current runtime.
    pub fn new(manager: SessionManager, source: Arc<dyn DocumentSource>) -> Self {
        let (sender, receiver) = mpsc::channel(Self::DEFAULT_BUFFER_SIZE);
        let worker = AnnotationWorker {
            receiver,
            manager,
            source,
        };

        tokio::spawn(async move {
            worker.run().await;
        });

        Self { sender }
    }

    /// Queues a snapshot without waiting for the result.
    pub async fn submit(&self, snapshot: AnnotationSnapshot) -> Result<()> {
        self.sender
            .send(AnnotationCommand::Annotate {
                snapshot,
                respond: None,
            })
            .await
            .map_err(|_| OutlineError::Session("Annotation queue closed".into()))
    }

    /// Queues a snapshot and waits until it has been applied or dropped.
    pub async fn annotate(&self, snapshot: AnnotationSnapshot) -> Result<bool> {
        let (respond, rx) = oneshot::channel();
        self.sender
            .send(AnnotationCommand::Annotate {
                snapshot,
                respond: Some(respond),
            })
            .await
            .map_err(|_| OutlineError::Session("Annotation queue closed".into()))?;
        rx.await
            .map_err(|_| OutlineError::Session("Annotation response channel closed".into()))
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(AnnotationCommand::Shutdown)
            .await
            .map_err(|_| OutlineError::Session("Annotation queue already closed".into()))
    }

    pub fn is_active(&self) -> bool {
        !self.sender.is_closed()
    }
}

struct AnnotationWorker {
    receiver: mpsc::Receiver<AnnotationCommand>,
    manager: SessionManager,
    source: Arc<dyn DocumentSource>,
}

impl AnnotationWorker {
    async fn run(mut self) {
        tracing::debug!("Annotation worker started");

        while let Some(command) = self.receiver.recv().await {
            match command {
                AnnotationCommand::Annotate { snapshot, respond } => {
                    let source = Arc::clone(&self.source);
                    let computed =
                        tokio::task::spawn_blocking(move || annotate_snapshot(&snapshot, source.as_ref()))
                            .await;
                    let applied = match computed {
                        Ok(result) => self.manager.apply_annotation(result),
                        Err(e) => {
                            tracing::warn!("Annotation task failed: {}", e);
                            false
                        }
                    };
                    if let Some(respond) = respond {
                        let _ = respond.send(applied);
                    }
                }
                AnnotationCommand::Shutdown => {
                    tracing::debug!("Annotation worker shutting down");
                    break;
                }
            }
        }

        tracing::debug!("Annotation worker stopped");
    }
}
