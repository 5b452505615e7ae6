//! `\begin{..}`/`\end{..}` pairing and enclosing-environment queries.
//!
//! Markers are matched in a single ordered pass with an explicit stack. An
//! `\end` closes the nearest open `\begin` of the same name; anything opened
//! above it stays open, and an `\end` with no same-named `\begin` on the
//! stack is dropped.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::outline::{Region, TOP_LEVEL_ENV};
use crate::scanner::comments::CommentFilter;

static BEGIN_ENV: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\begin(?:\[[^\]]*\])?\{([^}]*)\}").expect("valid begin pattern")
});
static END_ENV: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\end\{([^}]*)\}").expect("valid end pattern"));

static EQUATION_ENV: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:align|alignat|aligned|alignedat|displaymath|eqnarray|equation|flalign|gather|gathered|math|multline|x?xalignat|split|dmath|dseries|dgroup|darray|dsuspend)\*?",
    )
    .expect("valid equation pattern")
});

/// One `\begin{name}` or `\end{name}` occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvMarker {
    /// The whole command
    pub marker: Region,
    /// The environment name inside the braces
    pub name_region: Region,
    pub name: String,
}

/// A matched begin/end pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvPair {
    pub name: String,
    pub begin: Region,
    pub end: Region,
    /// Name regions inside each marker's braces
    pub begin_name: Region,
    pub end_name: Region,
}

impl EnvPair {
    /// From the start of `\begin` to the end of `\end`
    pub fn span(&self) -> Region {
        Region::new(self.begin.start, self.end.end)
    }

    pub fn encloses(&self, offset: usize) -> bool {
        self.span().contains(offset)
    }
}

fn collect_markers(content: &str, pattern: &Regex, filter: &CommentFilter) -> Vec<EnvMarker> {
    pattern
        .captures_iter(content)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?;
            if filter.is_commented(content, whole.start()) {
                return None;
            }
            Some(EnvMarker {
                marker: Region::new(whole.start(), whole.end()),
                name_region: Region::new(name.start(), name.end()),
                name: name.as_str().trim().to_string(),
            })
        })
        .collect()
}

/// Uncommented `\begin` markers in source order.
pub fn find_begins(content: &str, filter: &CommentFilter) -> Vec<EnvMarker> {
    collect_markers(content, &BEGIN_ENV, filter)
}

/// Uncommented `\end` markers in source order.
pub fn find_ends(content: &str, filter: &CommentFilter) -> Vec<EnvMarker> {
    collect_markers(content, &END_ENV, filter)
}

/// Pairs begin and end markers in one ordered pass.
pub fn match_envs(begins: &[EnvMarker], ends: &[EnvMarker]) -> Vec<EnvPair> {
    enum Event<'a> {
        Begin(&'a EnvMarker),
        End(&'a EnvMarker),
    }

    let mut events: Vec<(usize, Event)> = begins
        .iter()
        .map(|b| (b.marker.start, Event::Begin(b)))
        .chain(ends.iter().map(|e| (e.marker.start, Event::End(e))))
        .collect();
    events.sort_by_key(|(pos, _)| *pos);

    let mut stack: Vec<&EnvMarker> = Vec::new();
    let mut pairs = Vec::new();

    for (_, event) in events {
        match event {
            Event::Begin(b) => stack.push(b),
            Event::End(e) => {
                let Some(idx) = stack.iter().rposition(|b| b.name == e.name) else {
                    tracing::debug!(
                        "Discarding unmatched \\end{{{}}} at offset {}",
                        e.name,
                        e.marker.start
                    );
                    continue;
                };
                let b = stack.remove(idx);
                pairs.push(EnvPair {
                    name: b.name.clone(),
                    begin: b.marker,
                    end: e.marker,
                    begin_name: b.name_region,
                    end_name: e.name_region,
                });
            }
        }
    }

    pairs
}

/// Scans and pairs every environment of one file.
pub fn find_env_pairs(content: &str, filter: &CommentFilter) -> Vec<EnvPair> {
    let begins = find_begins(content, filter);
    let ends = find_ends(content, filter);
    match_envs(&begins, &ends)
}

/// The innermost pair whose span contains `offset`.
pub fn innermost_enclosing(pairs: &[EnvPair], offset: usize) -> Option<&EnvPair> {
    pairs
        .iter()
        .filter(|p| p.encloses(offset))
        .max_by_key(|p| p.begin.start)
}

/// Case-insensitive check against the display-math environment names.
pub fn is_equation_env(name: &str) -> bool {
    EQUATION_ENV.is_match(name)
}

/// Enclosing-environment classification of a label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvClass {
    pub env_type: String,
    pub is_equation: bool,
}

impl EnvClass {
    pub fn top_level() -> Self {
        Self {
            env_type: TOP_LEVEL_ENV.to_string(),
            is_equation: false,
        }
    }
}

/// Classifies the label at `offset`. Labels outside any environment, or
/// directly inside `document`, get the top-level sentinel.
pub fn classify_label(pairs: &[EnvPair], offset: usize) -> EnvClass {
    match innermost_enclosing(pairs, offset) {
        Some(pair) if pair.name != "document" => EnvClass {
            env_type: title_case(&pair.name),
            is_equation: is_equation_env(&pair.name),
        },
        _ => EnvClass::top_level(),
    }
}

/// Capitalizes the first letter of every alphabetic run, lowercasing the rest.
pub fn title_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_alpha = false;
    for c in name.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs_of(text: &str) -> Vec<EnvPair> {
        find_env_pairs(text, &CommentFilter::lines_only())
    }

    #[test]
    fn test_nested_pairs_have_equal_names() {
        let text = r"\begin{document}\begin{theorem}\begin{equation}x\end{equation}\end{theorem}\end{document}";
        let pairs = pairs_of(text);
        assert_eq!(pairs.len(), 3);
        for p in &pairs {
            assert_eq!(&text[p.begin_name.start..p.begin_name.end], p.name);
            assert_eq!(&text[p.end_name.start..p.end_name.end], p.name);
        }
        let x = text.find('x').unwrap();
        assert_eq!(innermost_enclosing(&pairs, x).unwrap().name, "equation");
    }

    #[test]
    fn test_same_named_nesting() {
        let text = r"\begin{itemize}A\begin{itemize}B\end{itemize}C\end{itemize}";
        let pairs = pairs_of(text);
        assert_eq!(pairs.len(), 2);
        let b = text.find('B').unwrap();
        let c = text.find('C').unwrap();
        let inner = innermost_enclosing(&pairs, b).unwrap();
        let outer = innermost_enclosing(&pairs, c).unwrap();
        assert!(inner.begin.start > outer.begin.start);
        assert_eq!(outer.begin.start, 0);
    }

    #[test]
    fn test_unmatched_end_discarded() {
        let text = r"\end{figure}\begin{table}x\end{table}";
        let pairs = pairs_of(text);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].name, "table");
    }

    #[test]
    fn test_mismatched_begin_left_open() {
        // \begin{proof} is never closed; \end{lemma} still pairs with lemma
        let text = r"\begin{lemma}\begin{proof}x\end{lemma}";
        let pairs = pairs_of(text);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].name, "lemma");
        assert_eq!(pairs[0].begin.start, 0);
    }

    #[test]
    fn test_commented_markers_ignored() {
        let text = "\\begin{align}\n% \\end{align}\nx\n\\end{align}";
        let pairs = pairs_of(text);
        assert_eq!(pairs.len(), 1);
        assert!(pairs[0].end.start > text.find('x').unwrap());
    }

    #[test]
    fn test_begin_with_optional_argument() {
        let pairs = pairs_of(r"\begin[t]{frame}x\end{frame}");
        assert_eq!(pairs[0].name, "frame");
    }

    #[test]
    fn test_classify_label() {
        let text = r"\begin{document}\label{a}\begin{align*}\label{b}\end{align*}\begin{theorem}\label{c}\end{theorem}\end{document}";
        let pairs = pairs_of(text);

        let a = classify_label(&pairs, text.find("{a}").unwrap());
        assert_eq!(a, EnvClass::top_level());

        let b = classify_label(&pairs, text.find("{b}").unwrap());
        assert!(b.is_equation);
        assert_eq!(b.env_type, "Align*");

        let c = classify_label(&pairs, text.find("{c}").unwrap());
        assert!(!c.is_equation);
        assert_eq!(c.env_type, "Theorem");

        assert_eq!(classify_label(&[], 3), EnvClass::top_level());
    }

    #[test]
    fn test_equation_names() {
        for name in ["equation", "Equation*", "align", "multline*", "dmath", "xxalignat", "split"] {
            assert!(is_equation_env(name), "{}", name);
        }
        for name in ["theorem", "figure", "document", "itemize"] {
            assert!(!is_equation_env(name), "{}", name);
        }
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("theorem"), "Theorem");
        assert_eq!(title_case("align*"), "Align*");
        assert_eq!(title_case("my-env"), "My-Env");
    }
}
