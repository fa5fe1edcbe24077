use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::{host_is_domain_or_subdomain_of, patterns, Attempt, ScrapeContext, ScrapeOutcome, Source};
use crate::error::{ScrapeError, ScrapeResult};
use crate::permissions::permissions_for_urls;
use crate::remote::PageScript;
use crate::types::RawPayload;

const PUZZLE_API: &str = "https://nyt-games-prd.appspot.com/svc/crosswords/v6/puzzle";
const GRAPHICS_PROMPT: &str = "Grant permission (needed to scrape grid graphics)";

#[derive(Debug, Default, Deserialize)]
struct GameData {
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    stream: Option<String>,
}

/// Grid graphics referenced by an API puzzle, fetched later during conversion.
fn extra_data_urls(puzzle_json: &str) -> ScrapeResult<Vec<Url>> {
    let json: Value = serde_json::from_str(puzzle_json)?;
    json.get("assets")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|asset| asset.get("uri").and_then(Value::as_str))
        .map(|uri| Url::parse(uri).map_err(|e| ScrapeError::invalid_url(uri, e)))
        .collect()
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Acrostic,
    Pluribus,
    PuzzleApi,
}

impl Step {
    const ORDER: [Step; 3] = [Step::Acrostic, Step::Pluribus, Step::PuzzleApi];
}

pub struct NewYorkTimesSource;

impl NewYorkTimesSource {
    async fn from_acrostic(&self, ctx: &ScrapeContext<'_>) -> ScrapeResult<Attempt> {
        if !ctx.url.path().contains("/acrostic/") {
            return Ok(Attempt::Continue);
        }
        let script = PageScript::read_global_string("nyt-acrostic-game-data", "window.gameData");
        let game_data = ctx.run_script(&script).await?;
        if game_data.is_empty() {
            return Ok(ScrapeOutcome::nothing().into());
        }
        Ok(ScrapeOutcome::found(RawPayload::NewYorkTimesAcrostic(game_data)).into())
    }

    async fn from_pluribus(&self, ctx: &ScrapeContext<'_>) -> ScrapeResult<Attempt> {
        let script = PageScript::read_global_string("nyt-pluribus", "window.pluribus");
        let pluribus = ctx.run_script(&script).await?;
        if pluribus.is_empty() {
            return Ok(Attempt::Continue);
        }
        Ok(ScrapeOutcome::found(RawPayload::NewYorkTimesPluribus(pluribus)).into())
    }

    async fn from_puzzle_api(&self, ctx: &ScrapeContext<'_>) -> ScrapeResult<Attempt> {
        let script = PageScript::read_global_json("nyt-game-data", "window.gameData");
        let game_data: GameData = ctx.run_script_json(&script).await?.unwrap_or_default();
        let Some(filename) = game_data.filename.filter(|f| !f.is_empty()) else {
            return Ok(Attempt::Continue);
        };

        let puzzle_url = format!("{PUZZLE_API}/{filename}.json");
        let parsed = Url::parse(&puzzle_url).map_err(|e| ScrapeError::invalid_url(puzzle_url.as_str(), e))?;
        // Cookies for the page and the API origin are both needed.
        let mut needed = self.needed_permissions(&ctx.url);
        needed.extend(permissions_for_urls([&parsed]));
        if !ctx.has_permissions(&needed).await {
            return Ok(ScrapeOutcome::need_permissions(needed).into());
        }

        let Some(cookie) = ctx.cookie("NYT-S").await.filter(|c| !c.is_empty()) else {
            tracing::debug!("No NYT-S cookie; not signed in");
            return Ok(Attempt::Continue);
        };
        let json = ctx
            .fetch_text(&puzzle_url, &[("nyt-s".to_string(), cookie)])
            .await?;

        let graphics = extra_data_urls(&json)?;
        if !graphics.is_empty() {
            let graphics_permissions = permissions_for_urls(&graphics);
            if !ctx.has_permissions(&graphics_permissions).await {
                return Ok(
                    ScrapeOutcome::need_permissions_with_prompt(graphics_permissions, GRAPHICS_PROMPT).into(),
                );
            }
        }
        let stream = game_data.stream.unwrap_or_else(|| "daily".to_string());
        Ok(ScrapeOutcome::found(RawPayload::NewYorkTimes { json, stream }).into())
    }
}

#[async_trait]
impl Source for NewYorkTimesSource {
    fn name(&self) -> &'static str {
        "New York Times"
    }

    fn matches(&self, url: &Url) -> bool {
        host_is_domain_or_subdomain_of(url, "nytimes.com")
    }

    fn needed_permissions(&self, _url: &Url) -> Vec<String> {
        patterns(&["https://*.nytimes.com/*"])
    }

    async fn extract_with_access(&self, ctx: &ScrapeContext<'_>) -> ScrapeResult<Vec<ScrapeOutcome>> {
        for step in Step::ORDER {
            let attempt = match step {
                Step::Acrostic => self.from_acrostic(ctx).await?,
                Step::Pluribus => self.from_pluribus(ctx).await?,
                Step::PuzzleApi => self.from_puzzle_api(ctx).await?,
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
    fn test_extra_data_urls() {
        let json = r#"{"assets": [{"uri": "https://static01.nyt.com/a.png"}, {"other": 1}], "body": []}"#;
        let urls = extra_data_urls(json).unwrap();
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].host_str(), Some("static01.nyt.com"));
        assert!(extra_data_urls(r#"{"body": []}"#).unwrap().is_empty());
    }
}
