//! Decorated one-line presentation of outline entries.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::OutlineSettings;
use crate::outline::{OutlineEntry, Reference, SymbolKind};

pub const COPY_GLYPH: &str = "❐";
pub const TAKEALOOK_GLYPH: &str = "⌖";

static EMPHASIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\(?:emph|textbf)\{([^}]*)\}").expect("valid emphasis pattern"));
static EMBEDDED_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\label\{[^}]*\}\s*").expect("valid label pattern"));
static MBOX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\mbox\{([^}]*)\}").expect("valid mbox pattern"));
static TIE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*~\s*").expect("valid tie pattern"));

/// Bullet glyph of a command family
pub fn glyph(kind: SymbolKind) -> &'static str {
    match kind {
        SymbolKind::Title => "❝",
        SymbolKind::Part => "■",
        SymbolKind::Chapter => "𑗕",
        SymbolKind::Section => "⏺",
        SymbolKind::Subsection => "⊛",
        SymbolKind::Subsubsection => "‣",
        SymbolKind::Paragraph => "⸱",
        SymbolKind::Frametitle => "▫",
        SymbolKind::Label => "›",
    }
}

/// Indentation added below parts (2) or chapters (1).
pub fn section_shift(kinds: impl IntoIterator<Item = SymbolKind>) -> usize {
    let mut shift = 0;
    for kind in kinds {
        match kind {
            SymbolKind::Part => return 2,
            SymbolKind::Chapter => shift = 1,
            _ => {}
        }
    }
    shift
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub show_ref_numbers: bool,
    pub show_environment_names: bool,
    pub shift: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            show_ref_numbers: true,
            show_environment_names: true,
            shift: 0,
        }
    }
}

impl RenderOptions {
    pub fn from_settings(settings: &OutlineSettings, shift: usize) -> Self {
        Self {
            show_ref_numbers: settings.show_ref_numbers,
            show_environment_names: settings.show_environment_names,
            shift,
        }
    }
}

fn prefix(kind: SymbolKind, shift: usize) -> String {
    let indent = match kind {
        SymbolKind::Chapter if shift == 2 => 1,
        SymbolKind::Section => shift,
        SymbolKind::Subsection => shift + 1,
        SymbolKind::Subsubsection => shift + 2,
        SymbolKind::Paragraph => shift + 3,
        SymbolKind::Label => 2,
        _ => 0,
    };
    match kind {
        SymbolKind::Label => format!("{}{}", " ".repeat(indent), glyph(kind)),
        _ => format!("{}{} ", " ".repeat(indent), glyph(kind)),
    }
}

/// Strips emphasis, `\mbox`, embedded `\label{}` and ties from a title.
pub fn simplify_markup(text: &str) -> String {
    let text = EMPHASIS.replace_all(text, "$1");
    let text = EMBEDDED_LABEL.replace_all(&text, "");
    let text = MBOX.replace_all(&text, "$1");
    TIE.replace_all(&text, " ").trim().to_string()
}

/// Presentation line of one entry.
pub fn render_entry(entry: &OutlineEntry, options: &RenderOptions) -> String {
    let kind = entry.kind();
    let actions = format!(" {} {} ", COPY_GLYPH, TAKEALOOK_GLYPH);

    match kind {
        SymbolKind::Label => {
            let key = entry.content();
            let env_type = if entry.env_type.is_empty() {
                "Ref."
            } else {
                entry.env_type.as_str()
            };
            let body = if options.show_ref_numbers {
                match &entry.reference {
                    Reference::Resolved(r) if entry.is_equation => format!("Eq. ({})", r),
                    reference => format!("{} {}", env_type, reference.marker()),
                }
            } else if options.show_environment_names {
                format!("{} ", env_type)
            } else {
                return format!("{}{}{}", prefix(kind, 0), key, actions.trim_end());
            };
            format!("{}{}{}{{{}}}", prefix(kind, 0), body, actions, key)
        }
        SymbolKind::Title => format!("❝{}❞", entry.content()),
        _ => {
            let title = simplify_markup(entry.display_title.as_deref().unwrap_or(entry.content()));
            let prefix = prefix(kind, options.shift);
            let takealook = format!(" {} ", TAKEALOOK_GLYPH);
            if entry.symbol.starred {
                return format!("{}* {}{}", prefix, title, takealook);
            }
            match &entry.reference {
                Reference::Resolved(r) if options.show_ref_numbers => {
                    format!("{}{} {}{}", prefix, r, title, takealook)
                }
                Reference::Pending if options.show_ref_numbers => {
                    format!("{}{} {}{}", prefix, Reference::Pending.marker(), title, takealook)
                }
                _ => format!("{}{}{}", prefix, title, takealook),
            }
        }
    }
}

/// Re-renders every entry in place.
pub fn render_all(entries: &mut [OutlineEntry], options: &RenderOptions) {
    for entry in entries.iter_mut() {
        entry.rendered = render_entry(entry, options);
    }
}
