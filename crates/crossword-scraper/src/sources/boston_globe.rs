use async_trait::async_trait;
use url::Url;

use super::{host_is_domain_or_subdomain_of, patterns, ScrapeContext, ScrapeOutcome, Source};
use crate::error::ScrapeResult;
use crate::remote::PageScript;
use crate::types::RawPayload;

const PAGE_HTML_SCRIPT: PageScript = PageScript::new(
    "bostonglobe-html",
    "function() { return document.body ? document.body.outerHTML : ''; }",
);

pub struct BostonGlobeSource;

#[async_trait]
impl Source for BostonGlobeSource {
    fn name(&self) -> &'static str {
        "Boston Globe"
    }

    fn matches(&self, url: &Url) -> bool {
        host_is_domain_or_subdomain_of(url, "bostonglobe.com")
            && url.path().starts_with("/games-comics/crossword")
    }

    fn needed_permissions(&self, _url: &Url) -> Vec<String> {
        patterns(&["https://*.bostonglobe.com/*"])
    }

    async fn extract_with_access(&self, ctx: &ScrapeContext<'_>) -> ScrapeResult<Vec<ScrapeOutcome>> {
        let html = ctx.run_script(&PAGE_HTML_SCRIPT).await?;
        if html.is_empty() {
            return Ok(ScrapeOutcome::nothing().into());
        }
        Ok(ScrapeOutcome::found(RawPayload::BostonGlobe(html)).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_crossword_path_only() {
        let yes = Url::parse("https://www.bostonglobe.com/games-comics/crossword/").unwrap();
        let no = Url::parse("https://www.bostonglobe.com/metro/").unwrap();
        assert!(BostonGlobeSource.matches(&yes));
        assert!(!BostonGlobeSource.matches(&no));
    }
}
