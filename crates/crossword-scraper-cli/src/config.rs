//! Configuration loading and resolution.
//!
//! Every setting resolves as: explicit flag, then environment variable, then default.

use std::path::PathBuf;

pub const CHROMIUM_ENV: &str = "CROSSWORD_SCRAPER_CHROMIUM";
pub const GRANTS_ENV: &str = "CROSSWORD_SCRAPER_GRANTS";
pub const OUTPUT_ENV: &str = "CROSSWORD_SCRAPER_OUTPUT";

/// Find the Chromium binary.
pub fn resolve_chromium_path(explicit: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(PathBuf::from(path));
    }

    if let Ok(p) = std::env::var(CHROMIUM_ENV) {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
        tracing::warn!(path = %p, "{CHROMIUM_ENV} does not exist, searching PATH");
    }

    for name in ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    if cfg!(target_os = "macos") {
        let common = PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Directory for saved puzzles and debug logs.
pub fn resolve_output_dir(explicit: Option<&str>) -> PathBuf {
    if let Some(path) = explicit {
        return PathBuf::from(path);
    }

    if let Ok(env_path) = std::env::var(OUTPUT_ENV) {
        if !env_path.is_empty() {
            return PathBuf::from(env_path);
        }
    }

    default_output_dir()
}

fn default_output_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".crossword-scraper")
        .join("downloads")
}

/// Pre-granted permission patterns: `--grant` flags, or the environment list if none were given.
pub fn resolve_grants(explicit: &[String]) -> Vec<String> {
    if !explicit.is_empty() {
        return explicit.to_vec();
    }
    std::env::var(GRANTS_ENV)
        .map(|list| parse_grant_list(&list))
        .unwrap_or_default()
}

/// Split a comma-separated pattern list, dropping blanks.
pub fn parse_grant_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}
