//! Comment detection on raw source offsets.
//!
//! Two independent checks: `%` line comments, and `comment` environment
//! blocks which only exist when the document loads the `comment` package.

use once_cell::sync::Lazy;
use regex::Regex;

const BEGIN_COMMENT: &str = r"\begin{comment}";
const END_COMMENT: &str = r"\end{comment}";

static COMMENT_PACKAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\usepackage(?:\[[^\]]*\])?\{[^}]*\bcomment\b[^}]*\}")
        .expect("valid comment package pattern")
});

/// Byte range of the line containing `offset`, without its newline.
pub fn line_bounds(text: &str, offset: usize) -> (usize, usize) {
    let bytes = text.as_bytes();
    let offset = offset.min(bytes.len());
    let start = bytes[..offset]
        .iter()
        .rposition(|&b| b == b'\n')
        .map(|i| i + 1)
        .unwrap_or(0);
    let end = bytes[offset..]
        .iter()
        .position(|&b| b == b'\n')
        .map(|i| offset + i)
        .unwrap_or(bytes.len());
    (start, end)
}

/// True when the line holding `offset` starts with `%` once leading
/// whitespace is stripped.
pub fn is_line_comment(text: &str, offset: usize) -> bool {
    let (start, end) = line_bounds(text, offset);
    text[start..end].trim_start().starts_with('%')
}

/// True when an uncommented `\usepackage{...comment...}` is present.
pub fn uses_comment_package(text: &str) -> bool {
    COMMENT_PACKAGE
        .find_iter(text)
        .any(|m| !is_line_comment(text, m.start()))
}

/// Top-level `\begin{comment}` .. `\end{comment}` spans, end exclusive and
/// past the closing marker.
///
/// Nested blocks are folded into their outermost span. An `\end{comment}`
/// with nothing open stops the scan; begins left open at the end of the text
/// produce no span.
pub fn find_comment_blocks(text: &str) -> Vec<(usize, usize)> {
    let mut stack: Vec<usize> = Vec::new();
    let mut blocks = Vec::new();
    let mut index = 0;

    while index < text.len() {
        let next_start = text[index..].find(BEGIN_COMMENT).map(|i| i + index);
        let next_end = text[index..].find(END_COMMENT).map(|i| i + index);

        match (next_start, next_end) {
            (Some(s), Some(e)) if s < e => {
                stack.push(s);
                index = s + BEGIN_COMMENT.len();
            }
            (Some(s), None) => {
                stack.push(s);
                index = s + BEGIN_COMMENT.len();
            }
            (_, Some(e)) => {
                let Some(start) = stack.pop() else {
                    tracing::debug!("Unmatched \\end{{comment}} at offset {}", e);
                    break;
                };
                if stack.is_empty() {
                    blocks.push((start, e + END_COMMENT.len()));
                }
                index = e + END_COMMENT.len();
            }
            (None, None) => break,
        }
    }

    blocks
}

/// True when `point` falls inside one of `blocks`.
pub fn point_in_blocks(point: usize, blocks: &[(usize, usize)]) -> bool {
    blocks.iter().any(|&(start, end)| start <= point && point < end)
}

/// Per-file comment context used by the scanners.
#[derive(Debug, Clone, Default)]
pub struct CommentFilter {
    blocks: Vec<(usize, usize)>,
}

impl CommentFilter {
    /// Line comments only.
    pub fn lines_only() -> Self {
        Self::default()
    }

    /// Line comments plus `comment` environment blocks of `text`.
    pub fn with_blocks(text: &str) -> Self {
        Self {
            blocks: find_comment_blocks(text),
        }
    }

    pub fn for_text(text: &str, comment_package: bool) -> Self {
        if comment_package {
            Self::with_blocks(text)
        } else {
            Self::lines_only()
        }
    }

    pub fn is_commented(&self, text: &str, offset: usize) -> bool {
        is_line_comment(text, offset) || point_in_blocks(offset, &self.blocks)
    }

    pub fn blocks(&self) -> &[(usize, usize)] {
        &self.blocks
    }
}
