use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use super::{host_is_domain_or_subdomain_of, patterns, ScrapeContext, ScrapeOutcome, Source};
use crate::error::{ScrapeError, ScrapeResult};
use crate::permissions::permissions_for_urls;
use crate::remote::PageScript;
use crate::types::RawPayload;

const GAMES_API: &str = "https://puzzles-games-api.gp-prod.conde.digital/api/v1/games";

const CONTAINER_ID_SCRIPT: PageScript = PageScript::new(
    "newyorker-container-id",
    r#"function() {
        var crosswordElems = document.getElementsByClassName('crossword-container');
        if (crosswordElems.length == 0) {
            return '';
        }
        return crosswordElems[0].id;
    }"#,
);

#[derive(Debug, Deserialize)]
struct GameResponse {
    data: String,
}

/// New Yorker games, whose API serves puzzles as xd text.
pub struct NewYorkerSource;

#[async_trait]
impl Source for NewYorkerSource {
    fn name(&self) -> &'static str {
        "New Yorker"
    }

    fn matches(&self, url: &Url) -> bool {
        host_is_domain_or_subdomain_of(url, "newyorker.com")
    }

    fn needed_permissions(&self, _url: &Url) -> Vec<String> {
        patterns(&["https://*.newyorker.com/*"])
    }

    async fn extract_with_access(&self, ctx: &ScrapeContext<'_>) -> ScrapeResult<Vec<ScrapeOutcome>> {
        let id = ctx.run_script(&CONTAINER_ID_SCRIPT).await?;
        if id.is_empty() {
            return Ok(ScrapeOutcome::nothing().into());
        }
        let puzzle_url = format!("{GAMES_API}/{id}");
        let parsed = Url::parse(&puzzle_url).map_err(|e| ScrapeError::invalid_url(puzzle_url.as_str(), e))?;
        let needed = permissions_for_urls([&parsed]);
        if !ctx.has_permissions(&needed).await {
            return Ok(ScrapeOutcome::need_permissions(needed).into());
        }
        let response: GameResponse = serde_json::from_str(&ctx.fetch_text(&puzzle_url, &[]).await?)?;
        Ok(ScrapeOutcome::found(RawPayload::Xd(response.data)).into())
    }
}
