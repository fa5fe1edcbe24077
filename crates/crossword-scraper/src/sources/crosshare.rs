use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use url::Url;

use super::{host_is_domain_or_subdomain_of, patterns, Attempt, ScrapeContext, ScrapeOutcome, Source};
use crate::error::ScrapeResult;
use crate::remote::PageScript;
use crate::types::RawPayload;

fn puzzle_id(path: &str) -> Option<&str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:crosswords|embed)/(.+)").expect("puzzle id regex is valid"))
        .captures(path)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

const TITLE_SCRIPT: PageScript = PageScript::new("document-title", "function() { return document.title; }");

#[derive(Debug, Clone, Copy)]
enum Step {
    /// `__NEXT_DATA__` of the current page, if it belongs to the displayed puzzle.
    PageData,
    /// The Next.js data route for the puzzle id in the path.
    DataRoute,
}

impl Step {
    const ORDER: [Step; 2] = [Step::PageData, Step::DataRoute];
}

/// Crosshare puzzle pages and embeds.
///
/// After client-side navigation `__NEXT_DATA__` still holds the first page's puzzle, so on
/// the main site the embedded title must agree with the page title before it is trusted.
pub struct CrosshareSource;

impl CrosshareSource {
    async fn from_page_data(&self, ctx: &ScrapeContext<'_>, next_data: &str) -> ScrapeResult<Attempt> {
        // Embeds never navigate, so their data is always current.
        if ctx.url.path().contains("/embed/") {
            return Ok(ScrapeOutcome::found(RawPayload::Crosshare(next_data.to_string())).into());
        }
        let parsed: Value = match serde_json::from_str(next_data) {
            Ok(v) => v,
            Err(e) => {
                tracing::info!(error = %e, "Could not read __NEXT_DATA__; falling back to data route");
                return Ok(Attempt::Continue);
            }
        };
        let Some(title) = parsed
            .pointer("/props/pageProps/puzzle/title")
            .and_then(Value::as_str)
        else {
            tracing::info!("No puzzle title in __NEXT_DATA__; falling back to data route");
            return Ok(Attempt::Continue);
        };
        let page_title = ctx.run_script(&TITLE_SCRIPT).await?;
        if page_title.starts_with(title) {
            return Ok(ScrapeOutcome::found(RawPayload::Crosshare(next_data.to_string())).into());
        }
        tracing::info!("__NEXT_DATA__ is for a different puzzle; falling back to data route");
        Ok(Attempt::Continue)
    }

    async fn from_data_route(&self, ctx: &ScrapeContext<'_>, next_data: &str) -> ScrapeResult<Attempt> {
        let parsed: Value = serde_json::from_str(next_data)?;
        let Some(build_id) = parsed.get("buildId").and_then(Value::as_str) else {
            return Ok(Attempt::Continue);
        };
        let Some(puzzle_id) = puzzle_id(ctx.url.path()) else {
            return Ok(Attempt::Continue);
        };

        let needed = self.needed_permissions(&ctx.url);
        if !ctx.has_permissions(&needed).await {
            return Ok(ScrapeOutcome::need_permissions(needed).into());
        }
        let data_url = format!("https://crosshare.org/_next/data/{build_id}/crosswords/{puzzle_id}.json");
        let data = ctx.fetch_text(&data_url, &[]).await?;
        Ok(ScrapeOutcome::found(RawPayload::Crosshare(data)).into())
    }
}

#[async_trait]
impl Source for CrosshareSource {
    fn name(&self) -> &'static str {
        "Crosshare"
    }

    fn matches(&self, url: &Url) -> bool {
        host_is_domain_or_subdomain_of(url, "crosshare.org")
            && (url.path().starts_with("/crosswords/") || url.path().starts_with("/embed/"))
    }

    fn needed_permissions(&self, _url: &Url) -> Vec<String> {
        patterns(&["https://*.crosshare.org/*"])
    }

    async fn extract_with_access(&self, ctx: &ScrapeContext<'_>) -> ScrapeResult<Vec<ScrapeOutcome>> {
        let next_data_script = PageScript::read_global_json("crosshare-next-data", "window.__NEXT_DATA__");
        let next_data = ctx.run_script(&next_data_script).await?;
        if next_data.is_empty() {
            return Ok(ScrapeOutcome::nothing().into());
        }

        for step in Step::ORDER {
            let attempt = match step {
                Step::PageData => self.from_page_data(ctx, &next_data).await?,
                Step::DataRoute => self.from_data_route(ctx, &next_data).await?,
            };
            if let Attempt::Finished(outcomes) = attempt {
                return Ok(outcomes);
            }
        }
        Ok(ScrapeOutcome::nothing().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_puzzle_id_from_path() {
        assert_eq!(puzzle_id("/crosswords/abc123/some-title"), Some("abc123/some-title"));
        assert_eq!(puzzle_id("/embed/xyz"), Some("xyz"));
    }

    #[test]
    fn test_matches() {
        assert!(CrosshareSource.matches(&Url::parse("https://crosshare.org/crosswords/x/y").unwrap()));
        assert!(CrosshareSource.matches(&Url::parse("https://crosshare.org/embed/x/y").unwrap()));
        assert!(!CrosshareSource.matches(&Url::parse("https://crosshare.org/dashboard").unwrap()));
    }
}
