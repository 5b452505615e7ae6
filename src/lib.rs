pub mod config;
pub mod error;
pub mod outline;
pub mod refs;
pub mod scanner;
pub mod source;

pub use config::OutlineSettings;
pub use error::{OutlineError, Result};
pub use outline::{
    AnnotationQueue, OutlineEntry, OutlineSession, OutlineView, Reference, Region, SessionManager,
    Symbol, SymbolKind,
};
pub use refs::{AuxEntry, AuxPool, OutEntry};
pub use scanner::{DocumentEvent, DocumentScanner, FileWatcher, ScanResult};
pub use source::{DocumentOverlay, DocumentSource, FsSource};
