use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use url::Url;

use super::{patterns, ScrapeContext, ScrapeOutcome, Source};
use crate::error::ScrapeResult;
use crate::types::RawPayload;

const API_URL: &str = "https://crossword.dailyprincetonian.com/api/crosswords";

/// Crossword id for paths of the form `/<slug>`.
fn crossword_id(path: &str) -> Option<&str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^/([0-9a-z-]+)$").expect("crossword path regex is valid"));
    re.captures(path).and_then(|c| c.get(1)).map(|m| m.as_str())
}

pub struct DailyPrincetonianSource;

#[async_trait]
impl Source for DailyPrincetonianSource {
    fn name(&self) -> &'static str {
        "The Daily Princetonian"
    }

    fn matches(&self, url: &Url) -> bool {
        url.host_str() == Some("crossword.dailyprincetonian.com")
    }

    fn needed_permissions(&self, _url: &Url) -> Vec<String> {
        patterns(&["https://*.crossword.dailyprincetonian.com/*"])
    }

    async fn extract_with_access(&self, ctx: &ScrapeContext<'_>) -> ScrapeResult<Vec<ScrapeOutcome>> {
        let Some(id) = crossword_id(ctx.url.path()) else {
            return Ok(ScrapeOutcome::nothing().into());
        };
        let needed = self.needed_permissions(&ctx.url);
        if !ctx.has_permissions(&needed).await {
            return Ok(ScrapeOutcome::need_permissions(needed).into());
        }
        let crossword = ctx.fetch_text(&format!("{API_URL}/{id}"), &[]).await?;
        let authors = ctx.fetch_text(&format!("{API_URL}/{id}/authors"), &[]).await?;
        let clues = ctx.fetch_text(&format!("{API_URL}/{id}/clues"), &[]).await?;
        Ok(ScrapeOutcome::found(RawPayload::DailyPrincetonian {
            crossword,
            authors,
            clues,
        })
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crossword_id() {
        assert_eq!(crossword_id("/2024-03-01-mini"), Some("2024-03-01-mini"));
        assert_eq!(crossword_id("/"), None);
        assert_eq!(crossword_id("/puzzles/abc"), None);
    }
}
