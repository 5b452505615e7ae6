//! Cross-reference data recovered from compiler side files.

pub mod aux_file;
pub mod out_file;
pub mod pool;
pub mod resolver;

use std::path::{Path, PathBuf};

use crate::source::DocumentSource;

pub use aux_file::{parse_aux, AuxEntry, LabelEntry, SectionEntry};
pub use out_file::{decode_bookmark, parse_out, OutEntry};
pub use pool::{AuxPool, OutPool, Pool};
pub use resolver::resolve_references;

/// Sibling of `root` with the given extension, e.g. `main.aux`.
pub fn companion_path(root: &Path, extension: &str) -> PathBuf {
    root.with_extension(extension)
}

/// Parsed `.aux` entries, or `None` when the file is missing.
pub fn load_aux(root: &Path, source: &dyn DocumentSource) -> Option<Vec<AuxEntry>> {
    let path = companion_path(root, "aux");
    let content = source.read(&path)?;
    let entries = parse_aux(&content);
    tracing::debug!("Loaded {} aux entries from {}", entries.len(), path.display());
    Some(entries)
}

/// Parsed `.out` bookmarks, or `None` when the file is missing.
pub fn load_out(
    root: &Path,
    source: &dyn DocumentSource,
    strip_numbers: bool,
) -> Option<Vec<OutEntry>> {
    let path = companion_path(root, "out");
    let content = source.read(&path)?;
    Some(parse_out(&content, strip_numbers))
}
