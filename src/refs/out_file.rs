//! Parser for the hyperref `.out` bookmarks file.
//!
//! ```text
//! \BOOKMARK [1][-]{section.1}{\376\377\0001\000\040\000I\000n\000t\000r\000o}{}% 1
//! ```
//!
//! Titles are UTF-16 text written as octal-escaped bytes.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static BOOKMARK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\BOOKMARK\s*\[(-?\d+)\]\[[^\]]*\]\{([^}]*)\}\{([^}]*)\}\{([^}]*)\}%\s*(\d+)")
        .expect("valid bookmark pattern")
});

static OCTAL_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\[0-7]{3}").expect("valid octal pattern"));

/// One bookmark line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutEntry {
    pub level: i32,
    /// Anchor type, e.g. `section`
    pub major: String,
    /// Anchor number, e.g. `2.1`
    pub minor: String,
    pub title: String,
    pub parent: String,
    pub sequence: u32,
}

/// Decodes an octal-escaped UTF-16 bookmark title.
///
/// Titles without octal escapes are returned unchanged, and so is anything
/// that does not decode to valid UTF-16.
pub fn decode_bookmark(raw: &str) -> String {
    if !OCTAL_ESCAPE.is_match(raw) {
        return raw.to_string();
    }
    match try_decode(raw) {
        Some(decoded) => decoded,
        None => {
            tracing::debug!("Leaving undecodable bookmark title as is: {}", raw);
            raw.to_string()
        }
    }
}

fn try_decode(raw: &str) -> Option<String> {
    let bytes = unescape_bytes(raw)?;
    if bytes.len() % 2 != 0 {
        return None;
    }

    let (big_endian, body) = match bytes.as_slice() {
        [0xFE, 0xFF, rest @ ..] => (true, rest),
        [0xFF, 0xFE, rest @ ..] => (false, rest),
        all => (true, all),
    };

    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|pair| {
            if big_endian {
                u16::from_be_bytes([pair[0], pair[1]])
            } else {
                u16::from_le_bytes([pair[0], pair[1]])
            }
        })
        .collect();

    String::from_utf16(&units).ok()
}

/// `\NNN` becomes one byte, `\c` becomes `c`, and other characters must fit
/// in a single byte.
fn unescape_bytes(raw: &str) -> Option<Vec<u8>> {
    let chars: Vec<char> = raw.chars().collect();
    let mut bytes = Vec::with_capacity(chars.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '\\' {
            let octal: String = chars.iter().skip(i + 1).take(3).collect();
            if octal.len() == 3 && octal.chars().all(|d| ('0'..='7').contains(&d)) {
                let value = u32::from_str_radix(&octal, 8).ok()?;
                bytes.push(u8::try_from(value).ok()?);
                i += 4;
                continue;
            }
            match chars.get(i + 1) {
                Some(&next) => {
                    bytes.push(u8::try_from(u32::from(next)).ok()?);
                    i += 2;
                }
                None => {
                    bytes.push(b'\\');
                    i += 1;
                }
            }
        } else {
            bytes.push(u8::try_from(u32::from(c)).ok()?);
            i += 1;
        }
    }

    Some(bytes)
}

/// Drops a leading `minor` number the title repeats, e.g. `1.2 Setup`.
pub fn strip_number_prefix(title: &str, minor: &str) -> String {
    if minor.is_empty() {
        return title.to_string();
    }
    match title.strip_prefix(minor) {
        Some(rest) if rest.starts_with(char::is_whitespace) => rest.trim_start().to_string(),
        _ => title.to_string(),
    }
}

/// Parses one bookmark line; `None` when the line is not a bookmark.
pub fn parse_out_line(line: &str, strip_numbers: bool) -> Option<OutEntry> {
    let caps = BOOKMARK.captures(line)?;
    let level = caps[1].parse().ok()?;
    let reference = &caps[2];
    let (major, minor) = reference.split_once('.').unwrap_or((reference, ""));

    let mut title = decode_bookmark(&caps[3]);
    if strip_numbers {
        title = strip_number_prefix(&title, minor);
    }

    Some(OutEntry {
        level,
        major: major.to_string(),
        minor: minor.to_string(),
        title,
        parent: caps[4].to_string(),
        sequence: caps[5].parse().ok()?,
    })
}

/// Parses a whole `.out` file; other lines are ignored.
pub fn parse_out(content: &str, strip_numbers: bool) -> Vec<OutEntry> {
    content
        .lines()
        .filter_map(|line| parse_out_line(line, strip_numbers))
        .collect()
}
