use async_trait::async_trait;
use url::Url;

use super::{patterns, ScrapeContext, ScrapeOutcome, Source};
use crate::error::ScrapeResult;
use crate::remote::PageScript;
use crate::types::RawPayload;

pub struct TheWeekSource;

#[async_trait]
impl Source for TheWeekSource {
    fn name(&self) -> &'static str {
        "The Week"
    }

    fn matches(&self, url: &Url) -> bool {
        url.host_str() == Some("theweek.com")
    }

    fn needed_permissions(&self, _url: &Url) -> Vec<String> {
        patterns(&["https://*.theweek.com/*"])
    }

    async fn extract_with_access(&self, ctx: &ScrapeContext<'_>) -> ScrapeResult<Vec<ScrapeOutcome>> {
        // The applet also keeps a parsed copy, but the .puz it was loaded from is the better source.
        let script = PageScript::read_global_json("theweek-puz-url", "window.xrPuzUrl");
        let puz_path = ctx.run_script(&script).await?;
        if puz_path.is_empty() {
            return Ok(ScrapeOutcome::nothing().into());
        }
        let needed = self.needed_permissions(&ctx.url);
        if !ctx.has_permissions(&needed).await {
            return Ok(ScrapeOutcome::need_permissions(needed).into());
        }
        let puz_url = format!(
            "{}{}",
            ctx.url.origin().ascii_serialization(),
            puz_path.trim_matches('"')
        );
        let data = ctx.fetch_binary(&puz_url, &[]).await?;
        Ok(ScrapeOutcome::found(RawPayload::AcrossLite(data)).into())
    }
}
