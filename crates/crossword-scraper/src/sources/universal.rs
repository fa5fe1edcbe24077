use async_trait::async_trait;
use url::Url;

use super::{patterns, ScrapeContext, ScrapeOutcome, Source};
use crate::error::ScrapeResult;
use crate::remote::PageScript;
use crate::types::RawPayload;

pub struct UniversalSource;

#[async_trait]
impl Source for UniversalSource {
    fn name(&self) -> &'static str {
        "Universal Uclick"
    }

    fn matches(&self, url: &Url) -> bool {
        url.host_str() == Some("embed.universaluclick.com")
    }

    fn needed_permissions(&self, _url: &Url) -> Vec<String> {
        patterns(&["https://*.universaluclick.com/*"])
    }

    async fn extract_with_access(&self, ctx: &ScrapeContext<'_>) -> ScrapeResult<Vec<ScrapeOutcome>> {
        let script = PageScript::read_global_json("universal-json-data", "window.crossword.jsonData");
        let json = ctx.run_script(&script).await?;
        if json.is_empty() {
            return Ok(ScrapeOutcome::nothing().into());
        }
        Ok(ScrapeOutcome::found(RawPayload::UclickJson(json)).into())
    }
}
