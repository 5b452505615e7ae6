//! Document text providers.
//!
//! The engine never opens files itself; it asks a [`DocumentSource`]. The
//! plain [`FsSource`] reads from disk, and [`DocumentOverlay`] layers unsaved
//! editor buffers on top of it so live edits can be scanned before they are
//! written out.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::SystemTime;

/// Supplies raw document text and companion file metadata.
pub trait DocumentSource: Send + Sync {
    /// Full UTF-8 contents, or `None` when unavailable
    fn read(&self, path: &Path) -> Option<String>;

    fn exists(&self, path: &Path) -> bool {
        self.read(path).is_some()
    }

    fn modified(&self, _path: &Path) -> Option<SystemTime> {
        None
    }
}

/// Reads straight from the filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsSource;

impl DocumentSource for FsSource {
    fn read(&self, path: &Path) -> Option<String> {
        match fs::read_to_string(path) {
            Ok(content) => Some(content),
            Err(e) => {
                tracing::debug!("Cannot read {}: {}", path.display(), e);
                None
            }
        }
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn modified(&self, path: &Path) -> Option<SystemTime> {
        fs::metadata(path).and_then(|m| m.modified()).ok()
    }
}

/// An in-memory buffer of a document with unsaved changes
#[derive(Debug, Clone)]
pub struct VirtualDocument {
    pub content: String,
    /// Editor version; older updates are ignored
    pub version: u64,
}

impl VirtualDocument {
    pub fn new(content: String, version: u64) -> Self {
        Self { content, version }
    }
}

/// Unsaved buffers layered over the filesystem.
#[derive(Debug, Default)]
pub struct DocumentOverlay {
    documents: RwLock<HashMap<PathBuf, VirtualDocument>>,
}

impl DocumentOverlay {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
        }
    }

    /// Updates or creates a buffer; stale versions are ignored
    pub fn update(&self, path: &Path, content: &str, version: u64) {
        let mut docs = self.documents.write().unwrap();
        match docs.get_mut(path) {
            Some(doc) if version > doc.version => {
                doc.content = content.to_string();
                doc.version = version;
            }
            Some(_) => {
                tracing::debug!(
                    "Ignoring stale buffer version {} for {}",
                    version,
                    path.display()
                );
            }
            None => {
                docs.insert(
                    path.to_path_buf(),
                    VirtualDocument::new(content.to_string(), version),
                );
            }
        }
    }

    pub fn get(&self, path: &Path) -> Option<VirtualDocument> {
        let docs = self.documents.read().unwrap();
        docs.get(path).cloned()
    }

    pub fn contains(&self, path: &Path) -> bool {
        let docs = self.documents.read().unwrap();
        docs.contains_key(path)
    }

    /// Drops a buffer, falling back to the file on disk
    pub fn discard(&self, path: &Path) {
        let mut docs = self.documents.write().unwrap();
        docs.remove(path);
    }

}

impl DocumentSource for DocumentOverlay {
    fn read(&self, path: &Path) -> Option<String> {
        if let Some(doc) = self.get(path) {
            return Some(doc.content);
        }
        FsSource.read(path)
    }

    fn exists(&self, path: &Path) -> bool {
        self.contains(path) || FsSource.exists(path)
    }

    fn modified(&self, path: &Path) -> Option<SystemTime> {
        FsSource.modified(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_overlay_prefers_buffer() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("main.tex");
        fs::write(&path, "on disk").unwrap();

        let overlay = DocumentOverlay::new();
        assert_eq!(overlay.read(&path).as_deref(), Some("on disk"));

        overlay.update(&path, "edited", 1);
        assert_eq!(overlay.read(&path).as_deref(), Some("edited"));
        assert!(overlay.contains(&path));

        overlay.discard(&path);
        assert_eq!(overlay.read(&path).as_deref(), Some("on disk"));
    }

    #[test]
    fn test_overlay_ignores_stale_versions() {
        let overlay = DocumentOverlay::new();
        let path = Path::new("virtual.tex");
        overlay.update(path, "v2", 2);
        overlay.update(path, "v1", 1);
        assert_eq!(overlay.get(path).unwrap().content, "v2");
        assert!(overlay.exists(path));
    }

    #[test]
    fn test_fs_source_missing_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.aux");
        assert!(FsSource.read(&missing).is_none());
        assert!(!FsSource.exists(&missing));
        assert!(FsSource.modified(&missing).is_none());
    }
}
