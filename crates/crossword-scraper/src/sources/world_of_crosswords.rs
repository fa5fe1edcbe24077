use async_trait::async_trait;
use chrono::Datelike;
use url::Url;

use super::{host_is_domain_or_subdomain_of, patterns, ScrapeContext, ScrapeOutcome, Source};
use crate::error::ScrapeResult;
use crate::types::RawPayload;

pub struct WorldOfCrosswordsSource;

#[async_trait]
impl Source for WorldOfCrosswordsSource {
    fn name(&self) -> &'static str {
        "World of Crosswords"
    }

    fn matches(&self, url: &Url) -> bool {
        host_is_domain_or_subdomain_of(url, "worldofcrosswords.com")
            && matches!(url.path(), "/" | "/index.php")
    }

    fn needed_permissions(&self, _url: &Url) -> Vec<String> {
        patterns(&["https://*.worldofcrosswords.com/*"])
    }

    async fn extract_with_access(&self, ctx: &ScrapeContext<'_>) -> ScrapeResult<Vec<ScrapeOutcome>> {
        let mut puzzle_url = ctx.url.clone();
        puzzle_url.set_path("/getEmptyPuzzle.php");
        let html = ctx.fetch_text(puzzle_url.as_str(), &[]).await?;
        // The page has no year of its own; puzzles are always current.
        Ok(ScrapeOutcome::found(RawPayload::WorldOfCrosswords {
            html,
            year: chrono::Local::now().year(),
        })
        .into())
    }
}
