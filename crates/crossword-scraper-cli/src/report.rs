//! Presenting and saving extraction results.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use serde::Serialize;

use crossword_scraper::{OutputFormat, ProcessedResultSet, ScrapedPuzzle};

#[derive(Debug, Serialize)]
pub struct PuzzleSummary {
    pub source: String,
    pub title: String,
    pub creator: String,
    pub date: Option<NaiveDate>,
    pub payload_format: &'static str,
    pub output_formats: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_to: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct PermissionSummary {
    pub source: String,
    pub permissions: Vec<String>,
    pub prompt: String,
}

/// Machine-readable view of one run.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub page_url: String,
    pub puzzles: Vec<PuzzleSummary>,
    pub permission_requests: Vec<PermissionSummary>,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_log: Option<PathBuf>,
}

impl RunSummary {
    pub fn new(page_url: &str, results: &ProcessedResultSet) -> Self {
        Self {
            page_url: page_url.to_string(),
            puzzles: results.successes().map(summarize).collect(),
            permission_requests: results
                .permission_requests()
                .map(|(source, permissions, prompt)| PermissionSummary {
                    source: source.to_string(),
                    permissions: permissions.to_vec(),
                    prompt: prompt.to_string(),
                })
                .collect(),
            errors: results.errors().map(String::from).collect(),
            debug_log: None,
        }
    }

    /// Record where each puzzle was saved, in result order.
    pub fn set_saved_paths(&mut self, paths: Vec<PathBuf>) {
        for (puzzle, path) in self.puzzles.iter_mut().zip(paths) {
            puzzle.saved_to = Some(path);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.puzzles.is_empty() && self.permission_requests.is_empty() && self.errors.is_empty()
    }

    pub fn print_pretty(&self) {
        println!();
        println!("  Page: {}", self.page_url);
        if self.is_empty() {
            println!("  No puzzles found.");
        }
        for puzzle in &self.puzzles {
            let date = puzzle.date.map(|d| format!(" ({d})")).unwrap_or_default();
            println!("  \x1b[32m\u{2713}\x1b[0m {}{date} \x1b[90m[{}]\x1b[0m", puzzle.title, puzzle.source);
            println!("      formats: {}", puzzle.output_formats.join(", "));
            if let Some(path) = &puzzle.saved_to {
                println!("      saved:   {}", path.display());
            }
        }
        for request in &self.permission_requests {
            println!(
                "  \x1b[33m!\x1b[0m {} needs permission: {}",
                request.source,
                request.permissions.join(", ")
            );
        }
        for source in &self.errors {
            println!("  \x1b[31m\u{2717}\x1b[0m Scrape error from {source}; save the debug log for details.");
        }
        if let Some(path) = &self.debug_log {
            println!("  Debug log: {}", path.display());
        }
        println!();
    }
}

fn summarize(scraped: &ScrapedPuzzle) -> PuzzleSummary {
    PuzzleSummary {
        source: scraped.source.clone(),
        title: scraped.display_title().to_string(),
        creator: scraped.puzzle.creator.clone(),
        date: scraped.puzzle.date,
        payload_format: scraped.payload.kind(),
        output_formats: scraped
            .puzzle
            .supported_formats()
            .into_iter()
            .map(OutputFormat::extension)
            .collect(),
        saved_to: None,
    }
}

/// A path in `dir` for `stem.ext` that does not exist yet, numbering duplicates.
fn unused_path(dir: &Path, stem: &str, ext: &str) -> PathBuf {
    let first = dir.join(format!("{stem}.{ext}"));
    if !first.exists() {
        return first;
    }
    (2..)
        .map(|n| dir.join(format!("{stem}-{n}.{ext}")))
        .find(|p| !p.exists())
        .unwrap_or(first)
}

/// Save each successful puzzle's raw payload. Returns the paths in result order.
pub fn save_payloads(dir: &Path, results: &ProcessedResultSet) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let mut paths = Vec::new();
    for scraped in results.successes() {
        let path = unused_path(dir, &scraped.base_filename(), scraped.payload.extension());
        std::fs::write(&path, scraped.payload.to_bytes())
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), source = scraped.source, "Saved puzzle");
        paths.push(path);
    }
    Ok(paths)
}

/// Write the debug log to a timestamped file.
pub fn save_debug_log(dir: &Path, log: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let stamp = Utc::now().format("%Y%m%d-%H%M%S");
    let path = unused_path(dir, &format!("crossword-scraper-debug-{stamp}"), "txt");
    std::fs::write(&path, log).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}
