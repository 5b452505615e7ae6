//! Balanced brace group extraction.
//!
//! LaTeX arguments are delimited by `{`/`}` and may nest arbitrarily, so
//! regular expressions only locate the opening brace; the argument itself is
//! recovered by counting depth from there.

use crate::error::{OutlineError, Result};

/// Returns the content of the brace group opening at `start` and the offset
/// just past its closing brace.
///
/// `text[start]` must be `{`. The returned slice excludes the outer braces.
pub fn extract_brace_group(text: &str, start: usize) -> Result<(&str, usize)> {
    let bytes = text.as_bytes();
    if bytes.get(start) != Some(&b'{') {
        return Err(OutlineError::Parse(format!(
            "Expected opening brace at offset {}",
            start
        )));
    }

    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&text[start + 1..i], i + 1));
                }
            }
            _ => {}
        }
    }

    Err(OutlineError::UnbalancedBraces { start })
}

/// Collects up to `max` consecutive brace groups starting at `start`,
/// skipping any characters found between groups.
///
/// Stops at the first unbalanced group; whatever was collected so far is
/// returned together with the offset reached.
pub fn brace_groups(text: &str, start: usize, max: usize) -> (Vec<&str>, usize) {
    let bytes = text.as_bytes();
    let mut groups = Vec::new();
    let mut i = start;

    while groups.len() < max && i < bytes.len() {
        if bytes[i] == b'{' {
            match extract_brace_group(text, i) {
                Ok((group, end)) => {
                    groups.push(group);
                    i = end;
                }
                Err(_) => break,
            }
        } else {
            i += 1;
        }
    }

    (groups, i)
}

/// Like [`brace_groups`] but only accepts whitespace between groups.
pub fn adjacent_brace_groups(text: &str, start: usize) -> (Vec<&str>, usize) {
    let bytes = text.as_bytes();
    let mut groups = Vec::new();
    let mut i = start;

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] != b'{' {
            break;
        }
        match extract_brace_group(text, i) {
            Ok((group, end)) => {
                groups.push(group);
                i = end;
            }
            Err(_) => break,
        }
    }

    (groups, i)
}
