use async_trait::async_trait;
use url::Url;

use super::{ScrapeContext, ScrapeOutcome, Source};
use crate::error::ScrapeResult;
use crate::permissions::permissions_for_urls;
use crate::remote::PageScript;
use crate::types::RawPayload;

/// Hosts known to embed Crossword Compiler applets in iframes.
const KNOWN_IFRAME_HOSTS: &[&str] = &["apps.washingtonexaminer.com", "www.brendanemmettquigley.com"];

/// Crossword Compiler applets on any page, reading the `CrosswordPuzzleData` XML global.
pub struct CrosswordCompilerSource;

#[async_trait]
impl Source for CrosswordCompilerSource {
    fn name(&self) -> &'static str {
        "Crossword Compiler"
    }

    fn matches(&self, url: &Url) -> bool {
        matches!(url.scheme(), "http" | "https")
    }

    fn needed_permissions(&self, url: &Url) -> Vec<String> {
        permissions_for_urls([url])
    }

    async fn extract(&self, ctx: &ScrapeContext<'_>) -> ScrapeResult<Vec<ScrapeOutcome>> {
        // Embedded frames are only inspected on known hosts; anywhere else we would be asking
        // for permissions on every page with an iframe.
        if !ctx.is_top_level() {
            let known = ctx
                .url
                .host_str()
                .is_some_and(|host| KNOWN_IFRAME_HOSTS.contains(&host));
            if !known {
                return Ok(ScrapeOutcome::nothing().into());
            }
            let needed = self.needed_permissions(&ctx.url);
            if !ctx.has_permissions(&needed).await {
                return Ok(ScrapeOutcome::need_permissions(needed).into());
            }
        }
        self.extract_with_access(ctx).await
    }

    async fn extract_with_access(&self, ctx: &ScrapeContext<'_>) -> ScrapeResult<Vec<ScrapeOutcome>> {
        let script = PageScript::read_global_string("crossword-compiler-data", "window.CrosswordPuzzleData");
        let xml = ctx.run_script(&script).await?;
        if xml.is_empty() {
            return Ok(ScrapeOutcome::nothing().into());
        }
        Ok(ScrapeOutcome::found(RawPayload::Jpz(xml.into_bytes())).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_any_web_page() {
        assert!(CrosswordCompilerSource.matches(&Url::parse("http://example.com/").unwrap()));
        assert!(!CrosswordCompilerSource.matches(&Url::parse("file:///tmp/x.html").unwrap()));
    }

    #[test]
    fn test_needed_permissions_are_frame_origin() {
        let url = Url::parse("https://apps.washingtonexaminer.com/crossword/index.html").unwrap();
        assert_eq!(
            CrosswordCompilerSource.needed_permissions(&url),
            vec!["https://apps.washingtonexaminer.com/*"]
        );
    }
}
