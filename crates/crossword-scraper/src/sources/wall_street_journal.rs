use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use super::{host_is_domain_or_subdomain_of, patterns, ScrapeContext, ScrapeOutcome, Source};
use crate::error::ScrapeResult;
use crate::remote::PageScript;
use crate::types::RawPayload;

/// Classify the applet's puzzle JSON. Acrostics carry only their `data` object forward.
fn payload_for(puzzle_json: String) -> ScrapeResult<RawPayload> {
    let parsed: Value = serde_json::from_str(&puzzle_json)?;
    let is_acrostic = parsed
        .pointer("/data/meta/type")
        .and_then(Value::as_str)
        == Some("acrostic");
    if is_acrostic {
        let data = parsed.get("data").cloned().unwrap_or(Value::Null);
        return Ok(RawPayload::WallStreetJournalAcrostic(data.to_string()));
    }
    Ok(RawPayload::WallStreetJournal(puzzle_json))
}

pub struct WallStreetJournalSource;

#[async_trait]
impl Source for WallStreetJournalSource {
    fn name(&self) -> &'static str {
        "Wall Street Journal"
    }

    fn matches(&self, url: &Url) -> bool {
        (host_is_domain_or_subdomain_of(url, "wsj.com") || url.host_str() == Some("s3.amazonaws.com"))
            && url.path().contains("/puzzles/crossword/")
    }

    fn needed_permissions(&self, _url: &Url) -> Vec<String> {
        patterns(&["https://*.wsj.com/*", "https://s3.amazonaws.com/*"])
    }

    async fn extract_with_access(&self, ctx: &ScrapeContext<'_>) -> ScrapeResult<Vec<ScrapeOutcome>> {
        let script = PageScript::read_global_json("wsj-puzzle-json", "window.oApp.puzzle.JSON");
        let json = ctx.run_script(&script).await?;
        if json.is_empty() {
            return Ok(ScrapeOutcome::nothing().into());
        }
        Ok(ScrapeOutcome::found(payload_for(json)?).into())
    }
}
