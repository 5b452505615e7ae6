//! Outline sessions.
//!
//! An [`OutlineSession`] owns the outline of one root document: its files,
//! entries and settings. Sessions live in a [`SessionManager`] and are
//! addressed by id, so background work can re-fetch the live session before
//! writing back instead of holding on to it.

use std::collections::HashMap;
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Instant, SystemTime};

use crate::config::OutlineSettings;
use crate::outline::annotate::{annotate_snapshot, AnnotationResult, AnnotationSnapshot};
use crate::outline::locate::locate_row;
use crate::outline::render::{render_all, section_shift, RenderOptions};
use crate::outline::sync::{self, Cooldown};
use crate::outline::{OutlineEntry, OutlineView};
use crate::refs::{companion_path, load_aux, resolve_references, AuxPool};
use crate::scanner::{label_after, DocumentScanner};
use crate::source::DocumentSource;

/// Outline state of one root document.
#[derive(Debug, Clone)]
pub struct OutlineSession {
    pub id: String,
    /// Bumped whenever the entry list is rebuilt
    pub generation: u64,
    pub root: PathBuf,
    /// Host-supplied title
    pub title: Option<String>,
    pub files: Vec<PathBuf>,
    pub comment_package: Vec<bool>,
    pub entries: Vec<OutlineEntry>,
    pub settings: OutlineSettings,
    pub view: OutlineView,
    /// Environment annotation has not caught up with the entries yet
    pub annotation_pending: bool,
    /// Modification time of the aux file at the last full refresh
    aux_modified: Option<SystemTime>,
    region_cooldown: Cooldown,
}

impl OutlineSession {
    pub fn new(id: String, root: PathBuf, title: Option<String>, settings: OutlineSettings) -> Self {
        let view = settings.view().unwrap_or_else(|e| {
            tracing::warn!("{}, using table of contents", e);
            OutlineView::Toc
        });
        let region_cooldown = Cooldown::new(settings.region_refresh_cooldown());
        Self {
            id,
            generation: 0,
            root,
            title,
            files: Vec::new(),
            comment_package: Vec::new(),
            entries: Vec::new(),
            settings,
            view,
            annotation_pending: false,
            aux_modified: None,
            region_cooldown,
        }
    }

    pub fn render_options(&self) -> RenderOptions {
        let shift = section_shift(self.entries.iter().map(|e| e.kind()));
        RenderOptions::from_settings(&self.settings, shift)
    }

    /// Rescans every file, resolves references and replaces the outline.
    pub fn full_refresh(&mut self, source: &dyn DocumentSource) {
        let scan = DocumentScanner::new(source).scan_document(&self.root, self.title.as_deref());
        self.aux_modified = source.modified(&companion_path(&self.root, "aux"));
        let mut pool = load_aux(&self.root, source).map(AuxPool::new);
        if pool.is_none() {
            tracing::debug!("No aux file for {}, references unresolved", self.root.display());
        }

        self.entries = resolve_references(&scan.symbols, pool.as_mut());
        let options = self.render_options();
        render_all(&mut self.entries, &options);

        self.files = scan.files;
        self.comment_package = scan.comment_package;
        self.generation += 1;
        self.annotation_pending = true;
        self.region_cooldown.reset();

        tracing::info!(
            "Outline of {} refreshed: {} entries in {} files",
            self.root.display(),
            self.entries.len(),
            self.files.len()
        );
    }

    /// True when the aux file was rewritten since the last full refresh.
    /// LaTeX touches the aux file several times per run; events that leave
    /// the modification time unchanged are ignored.
    pub fn aux_changed(&self, source: &dyn DocumentSource) -> bool {
        let current = source.modified(&companion_path(&self.root, "aux"));
        current.is_some() && current != self.aux_modified
    }

    fn comment_package_for(&self, file: &Path) -> bool {
        self.files
            .iter()
            .position(|f| f == file)
            .map(|i| self.comment_package[i])
            .unwrap_or(false)
    }

    /// Rescans `file` after a save. Returns false when the file is not part
    /// of the document.
    pub fn light_refresh(&mut self, source: &dyn DocumentSource, file: &Path) -> bool {
        if !self.files.iter().any(|f| f == file) {
            tracing::debug!("{} is not part of {}", file.display(), self.root.display());
            return false;
        }
        let fresh = DocumentScanner::new(source).scan_file(file, self.comment_package_for(file));
        let options = self.render_options();
        let old = mem::take(&mut self.entries);
        self.entries = sync::light_refresh(old, fresh, file, &self.files, &options);
        self.generation += 1;
        self.annotation_pending = true;
        true
    }

    /// Moves entry regions of `file` to their current place, at most once
    /// per cooldown window.
    pub fn refresh_regions(&mut self, source: &dyn DocumentSource, file: &Path, now: Instant) -> bool {
        if !self.region_cooldown.try_start(now) {
            return false;
        }
        let fresh = DocumentScanner::new(source).scan_file(file, self.comment_package_for(file));
        let moved = sync::refresh_regions(&mut self.entries, fresh, file);
        tracing::debug!("Region refresh of {}: {} entries moved", file.display(), moved);
        true
    }

    /// Row of the current view to highlight for a cursor in `file`.
    pub fn locate(&mut self, source: &dyn DocumentSource, file: &Path, cursor: usize) -> Option<usize> {
        self.refresh_regions(source, file, Instant::now());
        let content = source.read(file)?;
        locate_row(&self.entries, self.view, file, &content, cursor)
    }

    pub fn visible_entries(&self) -> Vec<&OutlineEntry> {
        self.view.filter(&self.entries)
    }

    pub fn rendered_lines(&self) -> Vec<String> {
        self.visible_entries()
            .into_iter()
            .map(|e| e.rendered.clone())
            .collect()
    }

    /// Key of the label at `row`, or of the `\label{}` right after the
    /// heading at `row`.
    pub fn attached_label(&self, source: &dyn DocumentSource, row: usize) -> Option<String> {
        let entry = *self.visible_entries().get(row)?;
        if entry.symbol.is_label() {
            return Some(entry.content().to_string());
        }
        let content = source.read(&entry.symbol.file)?;
        label_after(&content, entry.symbol.region.end).map(str::to_string)
    }

    pub fn snapshot(&self) -> AnnotationSnapshot {
        AnnotationSnapshot {
            session_id: self.id.clone(),
            generation: self.generation,
            root: self.root.clone(),
            files: self.files.clone(),
            comment_package: self.comment_package.clone(),
            entries: self.entries.clone(),
            options: self.render_options(),
            strip_bookmark_numbers: self.settings.strip_bookmark_numbers,
        }
    }

    /// Applies a result computed from this session. Results from an older
    /// generation are dropped.
    pub fn apply_annotation(&mut self, result: AnnotationResult) -> bool {
        if result.session_id != self.id || result.generation != self.generation {
            tracing::debug!(
                "Dropping annotation for generation {} of session {} (now {})",
                result.generation,
                result.session_id,
                self.generation
            );
            return false;
        }
        for update in result.updates {
            let Some(entry) = self.entries.get_mut(update.index) else {
                continue;
            };
            entry.env_type = update.env_type;
            entry.is_equation = update.is_equation;
            entry.display_title = update.display_title;
            entry.rendered = update.rendered;
        }
        self.annotation_pending = false;
        true
    }

    /// Annotates in place on the calling thread.
    pub fn annotate_now(&mut self, source: &dyn DocumentSource) -> bool {
        let result = annotate_snapshot(&self.snapshot(), source);
        self.apply_annotation(result)
    }
}

/// Manager for open outline sessions
#[derive(Debug, Clone, Default)]
pub struct SessionManager {
    sessions: Arc<Mutex<HashMap<String, OutlineSession>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a session for `root` and returns its id. Nothing is scanned
    /// until the first refresh.
    pub fn open(&self, root: PathBuf, title: Option<String>, settings: OutlineSettings) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let session = OutlineSession::new(id.clone(), root, title, settings);
        let mut sessions = self.sessions.lock().unwrap();
        sessions.insert(id.clone(), session);
        id
    }

    /// Runs `f` on the live session, if it is still open
    pub fn with_session<R>(&self, id: &str, f: impl FnOnce(&mut OutlineSession) -> R) -> Option<R> {
        let mut sessions = self.sessions.lock().unwrap();
        sessions.get_mut(id).map(f)
    }

    pub fn snapshot(&self, id: &str) -> Option<AnnotationSnapshot> {
        self.with_session(id, |s| s.snapshot())
    }

    /// Re-fetches the target session and applies `result` if it is current.
    pub fn apply_annotation(&self, result: AnnotationResult) -> bool {
        let id = result.session_id.clone();
        match self.with_session(&id, |s| s.apply_annotation(result)) {
            Some(applied) => applied,
            None => {
                tracing::debug!("Session {} closed before annotation finished", id);
                false
            }
        }
    }

    pub fn close(&self, id: &str) -> bool {
        let mut sessions = self.sessions.lock().unwrap();
        sessions.remove(id).is_some()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::Reference;
    use crate::source::DocumentOverlay;
    use std::time::Duration;

    const ROOT: &str = "/virtual/paper/main.tex";

    fn overlay(main: &str) -> DocumentOverlay {
        let overlay = DocumentOverlay::new();
        overlay.update(Path::new(ROOT), main, 1);
        overlay
    }

    fn session(settings: OutlineSettings) -> OutlineSession {
        OutlineSession::new("s1".into(), PathBuf::from(ROOT), None, settings)
    }

    #[test]
    fn test_full_refresh_without_aux() {
        let source = overlay("\\chapter{One}\n\\section{A}\n\\label{sec:a}\n");
        let mut session = session(OutlineSettings::default());
        session.full_refresh(&source);

        assert_eq!(session.generation, 1);
        assert_eq!(session.entries.len(), 3);
        assert!(session.entries.iter().all(|e| e.reference == Reference::Unresolved));
        assert_eq!(session.rendered_lines(), vec!["𑗕 One ⌖ ", " ⏺ A ⌖ "]);
    }

    #[test]
    fn test_light_refresh_after_edit() {
        let source = overlay("\\section{A}\n\\section{B}\n");
        let mut session = session(OutlineSettings::default());
        session.full_refresh(&source);

        source.update(Path::new(ROOT), "intro text\n\\section{A}\n\\section{C}\n", 2);
        assert!(session.light_refresh(&source, Path::new(ROOT)));
        let contents: Vec<&str> = session.entries.iter().map(|e| e.content()).collect();
        assert_eq!(contents, vec!["A", "C"]);
        assert_eq!(session.entries[0].symbol.region.start, 20);
        assert_eq!(session.entries[1].reference, Reference::Pending);
        assert_eq!(session.generation, 2);

        assert!(!session.light_refresh(&source, Path::new("/elsewhere.tex")));
    }

    #[test]
    fn test_region_refresh_respects_cooldown() {
        let source = overlay("\\section{A}\n");
        let mut session = session(OutlineSettings {
            region_refresh_cooldown_ms: 1_000,
            ..OutlineSettings::default()
        });
        session.full_refresh(&source);

        let now = Instant::now();
        source.update(Path::new(ROOT), "xx\\section{A}\n", 2);
        assert!(session.refresh_regions(&source, Path::new(ROOT), now));
        assert_eq!(session.entries[0].symbol.region.start, 11);

        source.update(Path::new(ROOT), "xxxx\\section{A}\n", 3);
        assert!(!session.refresh_regions(&source, Path::new(ROOT), now + Duration::from_millis(10)));
        assert_eq!(session.entries[0].symbol.region.start, 11);
        assert!(session.refresh_regions(&source, Path::new(ROOT), now + Duration::from_secs(2)));
        assert_eq!(session.entries[0].symbol.region.start, 13);
    }

    #[test]
    fn test_locate_with_stale_region_after_multibyte_edit() {
        let source = overlay("\\section{A}\n");
        let mut session = session(OutlineSettings {
            region_refresh_cooldown_ms: 600_000,
            ..OutlineSettings::default()
        });
        session.full_refresh(&source);
        assert!(session.refresh_regions(&source, Path::new(ROOT), Instant::now()));

        // Regions stay put inside the cooldown, so start 9 now splits the é
        source.update(Path::new(ROOT), "xxxxxxxx\u{e9}\\section{A}\n", 2);
        assert_eq!(session.locate(&source, Path::new(ROOT), 3), Some(0));
        assert_eq!(session.entries[0].symbol.region.start, 9);
    }

    /// Overlay with a settable aux modification time.
    struct StampedSource {
        overlay: DocumentOverlay,
        aux_modified: Mutex<Option<SystemTime>>,
    }

    impl DocumentSource for StampedSource {
        fn read(&self, path: &Path) -> Option<String> {
            self.overlay.read(path)
        }

        fn modified(&self, path: &Path) -> Option<SystemTime> {
            if path.extension().is_some_and(|e| e == "aux") {
                *self.aux_modified.lock().unwrap()
            } else {
                None
            }
        }
    }

    #[test]
    fn test_aux_changed_tracks_modification_time() {
        let source = StampedSource {
            overlay: overlay("\\section{A}\n"),
            aux_modified: Mutex::new(None),
        };
        let mut session = session(OutlineSettings::default());
        session.full_refresh(&source);
        assert!(!session.aux_changed(&source));

        let first = SystemTime::UNIX_EPOCH + Duration::from_secs(100);
        *source.aux_modified.lock().unwrap() = Some(first);
        assert!(session.aux_changed(&source));

        session.full_refresh(&source);
        assert!(!session.aux_changed(&source));

        *source.aux_modified.lock().unwrap() = Some(first + Duration::from_secs(1));
        assert!(session.aux_changed(&source));
    }

    #[test]
    fn test_attached_label() {
        let source = overlay("\\section{A}\\label{sec:a}\n\\section{B}\n\\emph{x}\\label{late}\n");
        let mut session = session(OutlineSettings::default());
        session.full_refresh(&source);

        assert_eq!(session.attached_label(&source, 0).as_deref(), Some("sec:a"));
        assert_eq!(session.attached_label(&source, 1), None);
        assert_eq!(session.attached_label(&source, 7), None);
    }

    #[test]
    fn test_manager_lifecycle() {
        let manager = SessionManager::new();
        let a = manager.open(PathBuf::from(ROOT), None, OutlineSettings::default());
        let b = manager.open(PathBuf::from(ROOT), Some("Paper".into()), OutlineSettings::default());
        assert_ne!(a, b);
        assert_eq!(manager.session_count(), 2);

        assert!(manager.close(&a));
        assert!(!manager.close(&a));
        assert!(manager.with_session(&a, |_| ()).is_none());
        assert_eq!(manager.with_session(&b, |s| s.title.clone()).flatten().as_deref(), Some("Paper"));
    }
}
