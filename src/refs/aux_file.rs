//! Parser for the LaTeX `.aux` file.
//!
//! Two line forms carry numbering:
//!
//! ```text
//! \newlabel{sec:details}{{2}{1}{Details}{section.2}{}}
//! \@writefile{toc}{\contentsline {section}{\numberline {1}Intro}{1}{section.1}}
//! ```
//!
//! Every other line is ignored, and a line that looks like one of these but
//! cannot be parsed is skipped without affecting the rest of the file.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::{OutlineError, Result};
use crate::scanner::braces::{adjacent_brace_groups, brace_groups, extract_brace_group};

static TOC_COMMAND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\\toc[A-Za-z]+\s*").expect("valid toc command pattern"));
static MBOX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\mbox\s*\{([^}]*)\}").expect("valid mbox pattern"));

/// A `\newlabel` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelEntry {
    pub key: String,
    /// Printed reference (field 0)
    pub reference: String,
    pub page: Option<String>,
    pub anchor: Option<String>,
    /// Field 3 before the first `.`, e.g. `section` or `equation`
    pub entry_type: Option<String>,
    /// Field 3 after the first `.`
    pub entry_num: Option<String>,
    pub extra: Option<String>,
}

/// A `\@writefile{..}{\contentsline ..}` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionEntry {
    /// Table file the line targets (`toc`, `lof`, ...)
    pub target: String,
    pub entry_type: String,
    /// Section number; empty for unnumbered lines
    pub number: String,
    pub title: String,
    pub page: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AuxEntry {
    Label(LabelEntry),
    Section(SectionEntry),
}

impl AuxEntry {
    pub fn entry_type(&self) -> Option<&str> {
        match self {
            AuxEntry::Label(l) => l.entry_type.as_deref(),
            AuxEntry::Section(s) => Some(&s.entry_type),
        }
    }

    pub fn reference(&self) -> &str {
        match self {
            AuxEntry::Label(l) => &l.reference,
            AuxEntry::Section(s) => &s.number,
        }
    }
}

/// Parses one trimmed line.
///
/// `Ok(None)` for lines of no interest, `Err` for recognized but malformed
/// lines.
pub fn parse_aux_line(line: &str) -> Result<Option<AuxEntry>> {
    if line.starts_with(r"\newlabel") {
        parse_newlabel(line).map(|e| Some(AuxEntry::Label(e)))
    } else if line.starts_with(r"\@writefile") {
        Ok(parse_writefile(line)?.map(AuxEntry::Section))
    } else {
        Ok(None)
    }
}

/// Parses a whole `.aux` file, skipping malformed lines.
pub fn parse_aux(content: &str) -> Vec<AuxEntry> {
    let mut entries = Vec::new();
    for (n, line) in content.lines().enumerate() {
        match parse_aux_line(line.trim()) {
            Ok(Some(entry)) => entries.push(entry),
            Ok(None) => {}
            Err(e) => tracing::debug!("Skipping aux line {}: {}", n + 1, e),
        }
    }
    entries
}

fn parse_newlabel(line: &str) -> Result<LabelEntry> {
    let malformed = || OutlineError::Parse(format!("Malformed \\newlabel: {}", line));

    let name_start = line.find('{').ok_or_else(malformed)?;
    let name_end = line[name_start..].find('}').ok_or_else(malformed)? + name_start;
    let key = line[name_start + 1..name_end].to_string();

    let fields_start = line[name_end..].find("{{").ok_or_else(malformed)? + name_end + 1;
    let (fields, _) = brace_groups(line, fields_start, 5);
    if fields.is_empty() {
        return Err(malformed());
    }

    let field = |i: usize| fields.get(i).map(|f| f.to_string());
    let (entry_type, entry_num) = match fields.get(3) {
        Some(t) if !t.is_empty() => match t.split_once('.') {
            Some((main, sub)) => (Some(main.to_string()), Some(sub.to_string())),
            None => (Some(t.to_string()), None),
        },
        _ => (None, None),
    };

    Ok(LabelEntry {
        key,
        reference: fields[0].to_string(),
        page: field(1),
        anchor: field(2),
        entry_type,
        entry_num,
        extra: field(4),
    })
}

fn parse_writefile(line: &str) -> Result<Option<SectionEntry>> {
    let start = line
        .find('{')
        .ok_or_else(|| OutlineError::Parse(format!("Malformed \\@writefile: {}", line)))?;
    let (target, after_target) = extract_brace_group(line, start)?;
    let content_start = after_target
        + line[after_target..]
            .find('{')
            .ok_or_else(|| OutlineError::Parse(format!("Missing \\@writefile body: {}", line)))?;
    let (content, _) = extract_brace_group(line, content_start)?;

    if !content.starts_with(r"\contentsline") {
        return Ok(None);
    }

    let groups_start = content
        .find('{')
        .ok_or_else(|| OutlineError::Parse(format!("Empty \\contentsline: {}", line)))?;
    let (groups, _) = adjacent_brace_groups(content, groups_start);
    if groups.len() < 2 {
        return Err(OutlineError::Parse(format!(
            "Incomplete \\contentsline: {}",
            line
        )));
    }

    let (number, title) = split_number_title(groups[1]);

    Ok(Some(SectionEntry {
        target: target.to_string(),
        entry_type: groups[0].trim().to_string(),
        number,
        title,
        page: groups.get(2).map(|p| p.to_string()),
    }))
}

/// Splits the raw `\contentsline` text into number and title.
pub fn split_number_title(raw: &str) -> (String, String) {
    let raw = raw.trim();

    let (number, title) = if let Some(rest) = raw.strip_prefix(r"\numberline") {
        numberline(rest).unwrap_or_else(|| (String::new(), raw.to_string()))
    } else if let Some(m) = TOC_COMMAND.find(raw) {
        let (groups, end) = adjacent_brace_groups(raw, m.end());
        let tail = raw[end..].trim();
        match groups.len() {
            n if n >= 3 => (groups[1].to_string(), join_title(groups[2], tail)),
            2 => (groups[0].to_string(), join_title(groups[1], tail)),
            _ => (String::new(), raw.to_string()),
        }
    } else if let Some(pos) = raw.find(r"\hspace") {
        hspace(raw, pos).unwrap_or_else(|| (String::new(), raw.to_string()))
    } else {
        (String::new(), raw.to_string())
    };

    (normalize_number(&number), strip_ignorespaces(&title))
}

fn numberline(rest: &str) -> Option<(String, String)> {
    let open = rest.find('{')?;
    if !rest[..open].trim().is_empty() {
        return None;
    }
    let (number, end) = extract_brace_group(rest, open).ok()?;
    Some((number.to_string(), rest[end..].trim_start().to_string()))
}

fn hspace(raw: &str, pos: usize) -> Option<(String, String)> {
    let after = &raw[pos + r"\hspace".len()..];
    let after = after.trim_start();
    let after = after.strip_prefix('*').unwrap_or(after).trim_start();
    let (_, end) = extract_brace_group(after, 0).ok()?;
    Some((
        raw[..pos].trim().to_string(),
        after[end..].trim().to_string(),
    ))
}

fn join_title(title: &str, tail: &str) -> String {
    if tail.is_empty() {
        title.to_string()
    } else {
        format!("{} {}", title, tail)
    }
}

fn strip_ignorespaces(title: &str) -> String {
    let title = title.trim();
    if title.starts_with(r"{\ignorespaces") {
        if let Ok((inner, end)) = extract_brace_group(title, 0) {
            let inner = inner[r"\ignorespaces".len()..].trim();
            return join_title(inner, title[end..].trim());
        }
    }
    title.to_string()
}

fn normalize_number(number: &str) -> String {
    MBOX.replace_all(number, "$1").trim().to_string()
}
