//! Plain-text debug log accumulated over one extraction run.
//!
//! The log is meant to be attached to bug reports, so every decision is mirrored here in a
//! stable line format in addition to the tracing events.

use chrono::{DateTime, SecondsFormat, Utc};

/// Metadata written at the top of the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunInfo {
    pub generated_at: DateTime<Utc>,
    pub extension_version: String,
    pub user_agent: String,
    pub page_url: Option<String>,
}

impl RunInfo {
    pub fn now(
        extension_version: impl Into<String>,
        user_agent: impl Into<String>,
        page_url: Option<String>,
    ) -> Self {
        Self {
            generated_at: Utc::now(),
            extension_version: extension_version.into(),
            user_agent: user_agent.into(),
            page_url,
        }
    }
}

const SEPARATOR: &str = "-------";

#[derive(Debug, Clone)]
pub struct DebugLog {
    text: String,
}

impl DebugLog {
    pub fn new(info: &RunInfo) -> Self {
        let mut log = Self {
            text: String::new(),
        };
        log.line("Crossword Scraper Debug Log");
        log.line("Please attach this file to any issue report");
        log.line("-------------------------------------------");
        log.line(format!(
            "Generated at: {}",
            info.generated_at.to_rfc3339_opts(SecondsFormat::Millis, true)
        ));
        log.line(format!("Extension version: {}", info.extension_version));
        log.line(format!("Browser: {}", info.user_agent));
        log.line(format!(
            "URL: {}",
            info.page_url.as_deref().unwrap_or("<unknown>")
        ));
        log.line("Scraped Puzzles:");
        log
    }

    fn line(&mut self, line: impl AsRef<str>) {
        self.text.push_str(line.as_ref());
        self.text.push('\n');
    }

    fn block(&mut self, detail: &str) {
        self.line(SEPARATOR);
        self.text.push_str(detail);
        if !detail.ends_with('\n') {
            self.text.push('\n');
        }
        self.line(SEPARATOR);
    }

    pub fn success(&mut self, source: &str, title: &str) {
        tracing::info!(source, title, "Successful scrape");
        self.line(format!(
            "Successful scrape: source = {source}, puzzle title = {title}"
        ));
    }

    pub fn duplicate(&mut self, source: &str, title: &str) {
        tracing::debug!(source, title, "Duplicate grid suppressed");
        self.line(format!(
            "Duplicate grid: source = {source}, puzzle title = {title}"
        ));
    }

    pub fn need_permissions(&mut self, source: &str, permissions: &[String], prompt: &str) {
        tracing::info!(source, ?permissions, "Permissions needed");
        self.line(format!(
            "Need permission: source = {source}, permissions = [{}], prompt = {prompt}",
            permissions.join(", ")
        ));
    }

    pub fn permissions_already_covered(&mut self, source: &str) {
        tracing::debug!(source, "Permission request already covered");
        self.line(format!(
            "Need permissions: source = {source}, already covered"
        ));
    }

    pub fn scrape_error(&mut self, source: &str, message: &str) {
        tracing::warn!(source, message, "Scrape error");
        self.line(format!(
            "Scrape error: source = {source}, error = {message}"
        ));
    }

    /// A payload that failed to convert; `detail` is the full diagnostic.
    pub fn conversion_failure(&mut self, source: &str, detail: &str) {
        tracing::warn!(source, detail, "Error converting payload to puzzle");
        self.line(format!("Scrape exception: source = {source}"));
        self.block(detail);
    }

    /// A failure of the strategy itself for one (frame, source) pair.
    pub fn source_failure(&mut self, source: &str, detail: &str) {
        tracing::warn!(source, detail, "Error scraping puzzles");
        self.line(format!("Source scrape error, source = {source}"));
        self.block(detail);
    }

    /// A frame skipped because its URL could not be parsed.
    pub fn skipped_frame(&mut self, frame_url: &str, reason: &str) {
        tracing::warn!(frame_url, reason, "Skipping frame");
        self.line(format!("Skipped frame: url = {frame_url}, reason = {reason}"));
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}
