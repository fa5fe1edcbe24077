//! One scrape of the active tab, rerun after each round of granted permissions.

use anyhow::Result;

use crossword_scraper::{
    enumerate_frames, run_extraction, same_set, Capabilities, CookieStore, ExtractionConfig, ExtractionReport,
    Fetcher, FormatConverter, FrameSource, GrantedPermissions, RemoteExecutor, SourceRegistry,
};

use crate::prompt::GrantPrompt;

/// Upper bound on extraction reruns after grants.
pub const MAX_GRANT_ROUNDS: usize = 5;

/// A scrape of one tab. `browser` supplies frame discovery, scripts and cookies.
pub struct ScrapeSession<'a, B> {
    pub browser: &'a B,
    pub fetcher: &'a dyn Fetcher,
    pub grants: &'a GrantedPermissions,
    pub registry: &'a SourceRegistry,
    pub config: &'a ExtractionConfig,
}

impl<B> ScrapeSession<'_, B>
where
    B: FrameSource + RemoteExecutor + CookieStore,
{
    pub async fn run_once(&self) -> Result<ExtractionReport> {
        let frames = enumerate_frames(self.browser).await?;
        let caps = Capabilities {
            executor: self.browser,
            fetcher: self.fetcher,
            permissions: self.grants,
            cookies: self.browser,
        };
        Ok(run_extraction(
            frames.tab_id,
            &frames.frames,
            self.registry,
            &FormatConverter,
            caps,
            self.config,
        )
        .await)
    }

    /// Run, ask about each permission request, and rerun while anything new was granted.
    ///
    /// Declined requests are not asked again. The last report is returned.
    pub async fn run(&self, prompt: &mut dyn GrantPrompt) -> Result<ExtractionReport> {
        let mut declined: Vec<Vec<String>> = Vec::new();
        let mut report = self.run_once().await?;

        for round in 1..=MAX_GRANT_ROUNDS {
            let mut granted_any = false;
            for (source, permissions, text) in report.results.permission_requests() {
                if declined.iter().any(|d| same_set(d, permissions)) {
                    continue;
                }
                if prompt.ask(source, permissions, text)? {
                    tracing::info!(source, ?permissions, "Permissions granted");
                    self.grants.grant(permissions);
                    granted_any = true;
                } else {
                    declined.push(permissions.to_vec());
                }
            }
            if !granted_any {
                break;
            }
            tracing::debug!(round, "Rerunning extraction after grant");
            report = self.run_once().await?;
        }
        Ok(report)
    }
}
