//! Parser for .tex-outline.yml settings files.
//!
//! The file sits next to the root document. Every field is optional:
//!
//! ```yaml
//! show_ref_numbers: true
//! show_environment_names: true
//! default_view: toc        # toc | full | <command name>
//! region_refresh_cooldown_ms: 20000
//! strip_bookmark_numbers: true
//! background_annotation: true
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{OutlineError, Result};
use crate::outline::OutlineView;

/// Name of the settings file
pub const CONFIG_FILENAME: &str = ".tex-outline.yml";

/// Outline presentation and refresh settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlineSettings {
    /// Show resolved numbers next to entries
    pub show_ref_numbers: bool,

    /// Show enclosing environment names on labels
    pub show_environment_names: bool,

    pub default_view: String,

    /// Minimum spacing between region-only refreshes
    pub region_refresh_cooldown_ms: u64,

    /// Drop the leading number hyperref repeats in bookmark titles
    pub strip_bookmark_numbers: bool,

    /// Run environment annotation off the interactive path
    pub background_annotation: bool,
}

impl Default for OutlineSettings {
    fn default() -> Self {
        Self {
            show_ref_numbers: true,
            show_environment_names: true,
            default_view: "toc".to_string(),
            region_refresh_cooldown_ms: 20_000,
            strip_bookmark_numbers: true,
            background_annotation: true,
        }
    }
}

impl OutlineSettings {
    pub fn region_refresh_cooldown(&self) -> Duration {
        Duration::from_millis(self.region_refresh_cooldown_ms)
    }

    pub fn view(&self) -> Result<OutlineView> {
        self.default_view.parse()
    }
}

/// Parses settings file content
pub fn parse_settings(content: &str) -> Result<OutlineSettings> {
    if content.trim().is_empty() {
        return Ok(OutlineSettings::default());
    }
    serde_yaml::from_str(content)
        .map_err(|e| OutlineError::Config(format!("Invalid settings YAML: {}", e)))
}

/// Settings file path for a root document
pub fn find_config_path(root: &Path) -> Option<PathBuf> {
    let dir = root.parent()?;
    Some(dir.join(CONFIG_FILENAME))
}

/// Loads the settings next to `root`, falling back to defaults when absent.
pub fn load_settings(root: &Path) -> Result<OutlineSettings> {
    match find_config_path(root) {
        Some(path) if path.is_file() => load_settings_file(&path),
        _ => Ok(OutlineSettings::default()),
    }
}

pub fn load_settings_file(path: &Path) -> Result<OutlineSettings> {
    let content = fs::read_to_string(path)?;
    let settings = parse_settings(&content)?;
    tracing::debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::SymbolKind;
    use tempfile::TempDir;

    #[test]
    fn test_parse_settings_partial() {
        let settings = parse_settings("show_ref_numbers: false\ndefault_view: subsection\n").unwrap();
        assert!(!settings.show_ref_numbers);
        assert!(settings.show_environment_names);
        assert_eq!(settings.view().unwrap(), OutlineView::UpTo(SymbolKind::Subsection));
        assert_eq!(settings.region_refresh_cooldown(), Duration::from_secs(20));
    }

    #[test]
    fn test_parse_settings_empty() {
        assert_eq!(parse_settings("").unwrap(), OutlineSettings::default());
    }

    #[test]
    fn test_parse_settings_invalid() {
        assert!(matches!(
            parse_settings("show_ref_numbers: [1, 2"),
            Err(OutlineError::Config(_))
        ));
    }

    #[test]
    fn test_load_settings_next_to_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("main.tex");
        assert_eq!(load_settings(&root).unwrap(), OutlineSettings::default());

        fs::write(dir.path().join(CONFIG_FILENAME), "region_refresh_cooldown_ms: 5\n").unwrap();
        let settings = load_settings(&root).unwrap();
        assert_eq!(settings.region_refresh_cooldown_ms, 5);
    }
}
