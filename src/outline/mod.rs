//! Outline data model.
//!
//! A [`Symbol`] is what the scanner finds in the source; an
//! [`OutlineEntry`] is a symbol enriched with its resolved reference,
//! enclosing environment and rendered line.

pub mod annotate;
pub mod locate;
pub mod render;
pub mod session;
pub mod sync;

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::OutlineError;

pub use annotate::{AnnotationQueue, AnnotationResult, AnnotationSnapshot};
pub use locate::{locate_index, locate_row};
pub use render::{render_entry, section_shift, RenderOptions};
pub use session::{OutlineSession, SessionManager};
pub use sync::{light_refresh, refresh_regions};

/// Hierarchy level of labels; greater than every sectioning level.
pub const LABEL_LEVEL: i32 = 20;

/// Structural command families recognized in LaTeX source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Title,
    Part,
    Chapter,
    Section,
    Subsection,
    Subsubsection,
    Paragraph,
    Frametitle,
    Label,
}

impl SymbolKind {
    pub const ALL: [SymbolKind; 9] = [
        SymbolKind::Title,
        SymbolKind::Label,
        SymbolKind::Part,
        SymbolKind::Chapter,
        SymbolKind::Section,
        SymbolKind::Subsection,
        SymbolKind::Subsubsection,
        SymbolKind::Paragraph,
        SymbolKind::Frametitle,
    ];

    /// LaTeX command name, also used as the aux-file entry type
    pub fn name(&self) -> &'static str {
        match self {
            SymbolKind::Title => "title",
            SymbolKind::Part => "part",
            SymbolKind::Chapter => "chapter",
            SymbolKind::Section => "section",
            SymbolKind::Subsection => "subsection",
            SymbolKind::Subsubsection => "subsubsection",
            SymbolKind::Paragraph => "paragraph",
            SymbolKind::Frametitle => "frametitle",
            SymbolKind::Label => "label",
        }
    }

    pub fn level(&self) -> i32 {
        match self {
            SymbolKind::Title => -1,
            SymbolKind::Part => 0,
            SymbolKind::Chapter => 1,
            SymbolKind::Section => 2,
            SymbolKind::Subsection => 3,
            SymbolKind::Subsubsection => 4,
            SymbolKind::Paragraph => 5,
            SymbolKind::Frametitle => 3,
            SymbolKind::Label => LABEL_LEVEL,
        }
    }

    /// Part through paragraph; frametitles and labels are not sectioning
    pub fn is_sectioning(&self) -> bool {
        matches!(
            self,
            SymbolKind::Part
                | SymbolKind::Chapter
                | SymbolKind::Section
                | SymbolKind::Subsection
                | SymbolKind::Subsubsection
                | SymbolKind::Paragraph
        )
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.name() == name)
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Half-open byte interval `[start, end)` in the owning file.
///
/// Scanned symbols always have a non-empty region. The document title has
/// no source span and carries the empty region `[0, 0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub start: usize,
    pub end: usize,
}

impl Region {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

/// Anything with a position inside one file of the document.
pub trait Positioned {
    fn file(&self) -> &Path;
    fn region(&self) -> Region;
    fn level(&self) -> i32;
}

/// One structural unit found in the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub content: String,
    pub kind: SymbolKind,
    /// Unnumbered variant (`\section*`)
    pub starred: bool,
    pub region: Region,
    pub file: PathBuf,
}

impl Symbol {
    pub fn new(
        content: impl Into<String>,
        kind: SymbolKind,
        starred: bool,
        region: Region,
        file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            content: content.into(),
            kind,
            starred,
            region,
            file: file.into(),
        }
    }

    /// Document title; sorts before everything else.
    ///
    /// The title is not tied to a span of the root, so its region is the
    /// empty `[0, 0)`. Ordering goes by [`SymbolKind::Title`], not by region.
    pub fn title(content: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self::new(content, SymbolKind::Title, false, Region::new(0, 0), file)
    }

    /// Textual type, e.g. `section` or `section*`
    pub fn type_name(&self) -> String {
        if self.starred {
            format!("{}*", self.kind.name())
        } else {
            self.kind.name().to_string()
        }
    }

    pub fn level(&self) -> i32 {
        self.kind.level()
    }

    pub fn is_label(&self) -> bool {
        self.kind == SymbolKind::Label
    }
}

impl Positioned for Symbol {
    fn file(&self) -> &Path {
        &self.file
    }

    fn region(&self) -> Region {
        self.region
    }

    fn level(&self) -> i32 {
        self.kind.level()
    }
}

/// Resolved numbering of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "lowercase")]
pub enum Reference {
    Resolved(String),
    /// No aux entry matched
    Unresolved,
    /// New since the last full refresh
    Pending,
}

impl Reference {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Reference::Resolved(r) => Some(r),
            _ => None,
        }
    }

    /// Visible marker for presentation
    pub fn marker(&self) -> &str {
        match self {
            Reference::Resolved(r) => r,
            Reference::Unresolved => "*",
            Reference::Pending => "…",
        }
    }
}

/// Sentinel environment name of labels sitting directly in `document`.
pub const TOP_LEVEL_ENV: &str = " ↪ Ref.";

/// A symbol enriched for presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineEntry {
    #[serde(flatten)]
    pub symbol: Symbol,
    pub reference: Reference,
    pub is_equation: bool,
    /// Innermost enclosing environment, labels only
    pub env_type: String,
    /// Title recovered from the bookmarks file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_title: Option<String>,
    pub rendered: String,
}

impl OutlineEntry {
    pub fn new(symbol: Symbol, reference: Reference) -> Self {
        Self {
            symbol,
            reference,
            is_equation: false,
            env_type: String::new(),
            display_title: None,
            rendered: String::new(),
        }
    }

    pub fn content(&self) -> &str {
        &self.symbol.content
    }

    pub fn kind(&self) -> SymbolKind {
        self.symbol.kind
    }
}

impl Positioned for OutlineEntry {
    fn file(&self) -> &Path {
        &self.symbol.file
    }

    fn region(&self) -> Region {
        self.symbol.region
    }

    fn level(&self) -> i32 {
        self.symbol.kind.level()
    }
}

/// Level filter applied when presenting the outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlineView {
    /// Sectioning only
    Toc,
    /// Sectioning and labels
    Full,
    /// Everything up to the level of one command family
    UpTo(SymbolKind),
}

impl OutlineView {
    pub fn max_level(&self) -> i32 {
        match self {
            OutlineView::Toc => LABEL_LEVEL - 1,
            OutlineView::Full => LABEL_LEVEL,
            OutlineView::UpTo(kind) => kind.level(),
        }
    }

    pub fn includes(&self, item: &impl Positioned) -> bool {
        item.level() <= self.max_level()
    }

    pub fn filter<'a, T: Positioned>(&self, items: &'a [T]) -> Vec<&'a T> {
        items.iter().filter(|i| self.includes(*i)).collect()
    }
}

impl Default for OutlineView {
    fn default() -> Self {
        OutlineView::Toc
    }
}

impl FromStr for OutlineView {
    type Err = OutlineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "toc" => Ok(OutlineView::Toc),
            "full" => Ok(OutlineView::Full),
            other => SymbolKind::from_name(other)
                .map(OutlineView::UpTo)
                .ok_or_else(|| OutlineError::Parse(format!("Unknown outline view: {}", other))),
        }
    }
}

/// Sorts by (file inclusion order, region start); titles come first.
///
/// Files missing from `files` sort after every listed file.
pub fn sort_by_inclusion<T: Positioned>(items: &mut [T], files: &[PathBuf]) {
    let order: HashMap<&Path, usize> = files
        .iter()
        .enumerate()
        .map(|(i, f)| (f.as_path(), i))
        .collect();

    items.sort_by(|a, b| {
        let a_title = a.level() < 0;
        let b_title = b.level() < 0;
        match (a_title, b_title) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
        let a_file = order.get(a.file()).copied().unwrap_or(usize::MAX);
        let b_file = order.get(b.file()).copied().unwrap_or(usize::MAX);
        a_file
            .cmp(&b_file)
            .then(a.region().start.cmp(&b.region().start))
    });
}
