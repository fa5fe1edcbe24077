//! Runs every matching source against every frame and classifies the outcomes.

use std::error::Error as StdError;

use url::Url;

use crate::convert::PuzzleConverter;
use crate::debug_log::{DebugLog, RunInfo};
use crate::dedup::{AcceptedGrids, DUPLICATE_THRESHOLD};
use crate::error::ScrapeError;
use crate::http::Fetcher;
use crate::permissions::PermissionGate;
use crate::remote::{CookieStore, RemoteExecutor};
use crate::sources::{ScrapeContext, ScrapeOutcome, Source, SourceRegistry, DEFAULT_PROMPT};
use crate::types::{Frame, ProcessedResult, ProcessedResultSet, RawPayload, ScrapedPuzzle, TabId};

/// Browser and network access handed to every source.
#[derive(Clone, Copy)]
pub struct Capabilities<'a> {
    pub executor: &'a dyn RemoteExecutor,
    pub fetcher: &'a dyn Fetcher,
    pub permissions: &'a dyn PermissionGate,
    pub cookies: &'a dyn CookieStore,
}

/// Tunables and metadata for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionConfig {
    /// Reported in the debug log header.
    pub extension_version: String,
    /// Reported in the debug log header.
    pub user_agent: String,
    /// Share of matching cells above which two grids are duplicates.
    pub duplicate_threshold: f64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        let version = env!("CARGO_PKG_VERSION");
        Self {
            extension_version: version.to_string(),
            user_agent: format!("crossword-scraper/{version}"),
            duplicate_threshold: DUPLICATE_THRESHOLD,
        }
    }
}

/// Output of [`run_extraction`].
#[derive(Debug, Clone)]
pub struct ExtractionReport {
    pub results: ProcessedResultSet,
    pub debug_log: String,
}

/// Mutable state of one run.
struct Run<'a> {
    converter: &'a dyn PuzzleConverter,
    results: ProcessedResultSet,
    accepted: AcceptedGrids,
    log: DebugLog,
}

impl Run<'_> {
    fn record(&mut self, source: &str, outcome: ScrapeOutcome) {
        match outcome {
            ScrapeOutcome::Success(payloads) => {
                for payload in payloads {
                    self.record_payload(source, payload);
                }
            }
            ScrapeOutcome::NeedPermissions {
                permissions,
                prompt,
            } => self.record_permission_request(source, permissions, prompt),
            ScrapeOutcome::Error(message) => {
                self.log.scrape_error(source, &message);
                self.results.insert(ProcessedResult::Error {
                    source: source.to_string(),
                });
            }
        }
    }

    fn record_payload(&mut self, source: &str, payload: RawPayload) {
        let puzzle = match self.converter.convert(&payload) {
            Ok(puzzle) => puzzle,
            Err(e) => {
                self.log.conversion_failure(source, &error_chain(&e));
                self.results.insert(ProcessedResult::Error {
                    source: source.to_string(),
                });
                return;
            }
        };

        let scraped = ScrapedPuzzle {
            source: source.to_string(),
            puzzle,
            payload,
        };
        if self.accepted.try_accept(&scraped.puzzle.grid) {
            self.log.success(source, &scraped.puzzle.title);
            self.results.insert(ProcessedResult::Success(scraped));
        } else {
            self.log.duplicate(source, &scraped.puzzle.title);
        }
    }

    fn record_permission_request(&mut self, source: &str, permissions: Vec<String>, prompt: String) {
        if self.results.has_permission_request(&permissions) {
            self.log.permissions_already_covered(source);
            return;
        }
        self.log.need_permissions(source, &permissions, &prompt);
        self.results.insert(ProcessedResult::NeedPermissions {
            source: source.to_string(),
            permissions,
            prompt,
        });
    }

    fn record_failure(&mut self, source: &str, error: ScrapeError) {
        match error {
            ScrapeError::PermissionMissing { url, permissions } => {
                tracing::debug!(source, url, "Fetch blocked pending permission");
                self.record_permission_request(source, permissions, DEFAULT_PROMPT.to_string());
            }
            other => {
                self.log.source_failure(source, &error_chain(&other));
                self.results.insert(ProcessedResult::Error {
                    source: source.to_string(),
                });
            }
        }
    }
}

/// Run the extraction pipeline over the frames of one tab.
///
/// Frames are visited in ascending id order and sources in registry order. Failures never
/// abort the run: they are confined to the payload or (frame, source) pair that raised them.
pub async fn run_extraction(
    tab_id: TabId,
    frames: &[Frame],
    registry: &SourceRegistry,
    converter: &dyn PuzzleConverter,
    caps: Capabilities<'_>,
    config: &ExtractionConfig,
) -> ExtractionReport {
    let mut ordered: Vec<&Frame> = frames.iter().collect();
    ordered.sort_by_key(|f| f.frame_id);

    let page_url = ordered
        .iter()
        .find(|f| f.is_top_level())
        .map(|f| f.url.clone());
    let info = RunInfo::now(&config.extension_version, &config.user_agent, page_url);

    let mut run = Run {
        converter,
        results: ProcessedResultSet::new(),
        accepted: AcceptedGrids::new(config.duplicate_threshold),
        log: DebugLog::new(&info),
    };

    for frame in ordered {
        let url = match Url::parse(&frame.url) {
            Ok(url) => url,
            Err(e) => {
                run.log.skipped_frame(&frame.url, &e.to_string());
                continue;
            }
        };

        for source in registry.matching(&url) {
            let ctx = ScrapeContext::new(tab_id, frame, url.clone(), caps);
            scrape_frame(&mut run, source, &ctx).await;
        }
    }

    tracing::info!(
        tab_id,
        results = run.results.len(),
        accepted = run.accepted.len(),
        "Extraction finished"
    );
    ExtractionReport {
        results: run.results,
        debug_log: run.log.into_string(),
    }
}

async fn scrape_frame(run: &mut Run<'_>, source: &dyn Source, ctx: &ScrapeContext<'_>) {
    let name = source.name();
    tracing::debug!(source = name, frame_id = ctx.frame_id(), url = %ctx.url, "Running source");
    match source.extract(ctx).await {
        Ok(outcomes) => {
            for outcome in outcomes {
                run.record(name, outcome);
            }
        }
        Err(e) => run.record_failure(name, e),
    }
}

/// An error and its sources, one per line.
fn error_chain(error: &dyn StdError) -> String {
    let mut text = error.to_string();
    let mut cause = error.source();
    while let Some(inner) = cause {
        text.push_str("\ncaused by: ");
        text.push_str(&inner.to_string());
        cause = inner.source();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::FormatConverter;
    use crate::error::{ExecutionError, HttpError, ScrapeResult};
    use crate::permissions::GrantedPermissions;
    use crate::remote::{NoCookies, PageScript};
    use crate::types::FrameId;
    use async_trait::async_trait;

    struct NoScripts;

    #[async_trait]
    impl RemoteExecutor for NoScripts {
        async fn execute(
            &self,
            _tab_id: TabId,
            frame_id: FrameId,
            script: &PageScript,
        ) -> Result<String, ExecutionError> {
            Err(ExecutionError {
                frame_id,
                script: script.name.to_string(),
                message: "no scripts in tests".into(),
            })
        }
    }

    struct Offline;

    #[async_trait]
    impl Fetcher for Offline {
        async fn fetch_text(&self, url: &str, _headers: &[(String, String)]) -> Result<String, HttpError> {
            Err(HttpError::Status {
                url: url.to_string(),
                status: 404,
            })
        }

        async fn fetch_binary(
            &self,
            url: &str,
            _headers: &[(String, String)],
        ) -> Result<Vec<u8>, HttpError> {
            Err(HttpError::Status {
                url: url.to_string(),
                status: 404,
            })
        }
    }

    /// Returns fixed xd payloads, or fetches a fixed URL when asked to.
    struct Fixed {
        name: &'static str,
        payloads: Vec<String>,
        fetch: Option<&'static str>,
    }

    #[async_trait]
    impl Source for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        fn matches(&self, url: &Url) -> bool {
            url.host_str() == Some("puzzles.example.com")
        }

        fn needed_permissions(&self, _url: &Url) -> Vec<String> {
            vec!["https://*.example.com/*".into()]
        }

        async fn extract_with_access(&self, ctx: &ScrapeContext<'_>) -> ScrapeResult<Vec<ScrapeOutcome>> {
            if let Some(url) = self.fetch {
                ctx.fetch_text(url, &[]).await?;
            }
            let payloads = self
                .payloads
                .iter()
                .map(|xd| RawPayload::Xd(xd.clone()))
                .collect();
            Ok(ScrapeOutcome::Success(payloads).into())
        }
    }

    fn xd(title: &str, rows: &[&str]) -> String {
        format!("Title: {title}\n\n\n{}\n\n\nA1. Clue ~ {}\n", rows.join("\n"), rows[0])
    }

    async fn run(frames: &[Frame], registry: &SourceRegistry, granted: &GrantedPermissions) -> ExtractionReport {
        let caps = Capabilities {
            executor: &NoScripts,
            fetcher: &Offline,
            permissions: granted,
            cookies: &NoCookies,
        };
        run_extraction(7, frames, registry, &FormatConverter, caps, &ExtractionConfig::default()).await
    }

    #[tokio::test]
    async fn test_blocked_fetch_becomes_permission_request() {
        let registry = SourceRegistry::new(vec![Box::new(Fixed {
            name: "Fetching",
            payloads: vec![],
            fetch: Some("https://cdn.other.org/data.json"),
        })]);
        let frames = [Frame::top_level(0, "https://puzzles.example.com/today")];
        let report = run(&frames, &registry, &GrantedPermissions::new()).await;

        let requests: Vec<_> = report.results.permission_requests().collect();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].1, ["https://cdn.other.org/*".to_string()]);
        assert_eq!(requests[0].2, DEFAULT_PROMPT);
    }

    #[tokio::test]
    async fn test_http_failure_is_source_error() {
        let registry = SourceRegistry::new(vec![Box::new(Fixed {
            name: "Fetching",
            payloads: vec![],
            fetch: Some("https://puzzles.example.com/missing.json"),
        })]);
        let frames = [Frame::top_level(0, "https://puzzles.example.com/today")];
        let report = run(&frames, &registry, &GrantedPermissions::new()).await;

        assert_eq!(report.results.errors().collect::<Vec<_>>(), vec!["Fetching"]);
        assert!(report.debug_log.contains("Source scrape error, source = Fetching\n"));
        assert!(report.debug_log.contains("error code 404"));
    }

    #[tokio::test]
    async fn test_unparseable_frame_is_skipped() {
        let registry = SourceRegistry::new(vec![Box::new(Fixed {
            name: "Fixed",
            payloads: vec![xd("Mini", &["AB", "CD"])],
            fetch: None,
        })]);
        let frames = [
            Frame::top_level(0, "https://puzzles.example.com/today"),
            Frame::new(1, 0, ""),
        ];
        let report = run(&frames, &registry, &GrantedPermissions::new()).await;

        assert_eq!(report.results.successes().count(), 1);
        assert!(report.debug_log.contains("Skipped frame: url = , reason ="));
    }

    #[tokio::test]
    async fn test_debug_log_header_names_page() {
        let registry = SourceRegistry::new(Vec::new());
        let frames = [
            Frame::new(4, 2, "https://embed.example.com/"),
            Frame::top_level(2, "https://puzzles.example.com/today"),
        ];
        let report = run(&frames, &registry, &GrantedPermissions::new()).await;
        assert!(report.results.is_empty());
        assert!(report
            .debug_log
            .contains("URL: https://puzzles.example.com/today\n"));
    }

    #[test]
    fn test_error_chain() {
        let err = ScrapeError::invalid_url("::", Url::parse("::").unwrap_err());
        let text = error_chain(&err);
        assert!(text.starts_with("Invalid URL ::"));
        assert!(text.contains("\ncaused by: "));
    }
}
