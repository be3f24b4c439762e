//! Optional config file loading. Search order: ./wanderscrape.toml, then
//! $XDG_CONFIG_HOME/wanderscrape/config.toml (or ~/.config/wanderscrape/config.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Settings read from `wanderscrape.toml`. Command-line flags take precedence; keys
/// left out fall back to the client defaults (2s delay, 30s timeout, 3 attempts with
/// 1s/2s backoff) and to skipping empty chapters.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    /// Directory for the JSON dump when `-o` is not given.
    pub output_dir: Option<PathBuf>,
    pub user_agent: Option<String>,
    /// Pause before every request to wanderinginn.com.
    pub request_delay_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    /// Total attempts per page, including the first. Values below 1 count as 1.
    pub retry_count: Option<u32>,
    /// Wait before retry N is entry N-1; the last entry repeats. 429s use their own table.
    pub retry_backoff_secs: Option<Vec<u64>>,
    /// `skip`, `placeholder`, or `fail`. Applies to any chapter whose content cannot be
    /// used: no content block, blank body, unreadable colour, broken image URL.
    pub empty_chapters: Option<String>,
    /// Case-insensitive patterns added to the navigation phrases; matching paragraphs
    /// are dropped from chapter bodies.
    pub extra_bad_text: Option<Vec<String>>,
}

fn read_config(path: &Path) -> Result<Config, String> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
    toml::from_str(&s).map_err(|e| format!("Invalid config {}: {}", path.display(), e))
}

/// Search order: (1) ./wanderscrape.toml, (2) $XDG_CONFIG_HOME/wanderscrape/config.toml.
/// Missing file returns Ok(None). Invalid TOML or I/O error reading a present file returns Err.
pub fn load_config() -> Result<Option<Config>, String> {
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Cannot determine current directory: {}", e))?;
    let mut paths = vec![cwd.join("wanderscrape.toml")];
    if let Some(d) = dirs::config_dir() {
        paths.push(d.join("wanderscrape").join("config.toml"));
    }
    for path in &paths {
        if path.exists() {
            return read_config(path).map(Some);
        }
    }
    Ok(None)
}
