use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use url::Url;

use super::{ScrapeContext, ScrapeOutcome, Source};
use crate::error::{ScrapeError, ScrapeResult};
use crate::permissions::permissions_for_urls;
use crate::remote::PageScript;
use crate::types::RawPayload;

const LINKS_SCRIPT: PageScript = PageScript::new(
    "puzzle-links",
    r#"function() {
        return JSON.stringify(
            Array.from(
                document.querySelectorAll('a:is([href$=".puz"],[href$=".jpz"],[href$=".ipuz"])')
            ).map(function(elem) { return elem.href; })
        );
    }"#,
);

/// Distinct http(s) links whose path ends in a puzzle extension, in page order.
///
/// The anchor selector also catches links like `viewer.html?puzzle=a.puz`; those are dropped here.
fn puzzle_links(hrefs: &[String]) -> Vec<Url> {
    static EXT: OnceLock<Regex> = OnceLock::new();
    let ext = EXT.get_or_init(|| Regex::new(r"\.(puz|jpz|ipuz)$").expect("extension regex is valid"));
    let mut links: Vec<Url> = Vec::new();
    for href in hrefs {
        let Ok(url) = Url::parse(href) else {
            continue;
        };
        if matches!(url.scheme(), "http" | "https") && ext.is_match(url.path()) && !links.contains(&url) {
            links.push(url);
        }
    }
    links
}

/// Direct links to `.puz`, `.jpz` and `.ipuz` files on any page.
pub struct PuzzleLinkSource;

impl PuzzleLinkSource {
    async fn fetch_link(&self, ctx: &ScrapeContext<'_>, url: &Url) -> ScrapeResult<RawPayload> {
        let payload = match url.path().rsplit('.').next() {
            Some("jpz") => RawPayload::Jpz(ctx.fetch_binary(url.as_str(), &[]).await?),
            Some("ipuz") => RawPayload::Ipuz(ctx.fetch_text(url.as_str(), &[]).await?),
            _ => RawPayload::AcrossLite(ctx.fetch_binary(url.as_str(), &[]).await?),
        };
        Ok(payload)
    }
}

#[async_trait]
impl Source for PuzzleLinkSource {
    fn name(&self) -> &'static str {
        "Puzzle Link"
    }

    fn matches(&self, url: &Url) -> bool {
        matches!(url.scheme(), "http" | "https")
    }

    fn needed_permissions(&self, _url: &Url) -> Vec<String> {
        Vec::new()
    }

    async fn extract(&self, ctx: &ScrapeContext<'_>) -> ScrapeResult<Vec<ScrapeOutcome>> {
        // Embedded frames would need permissions up front; links are only collected from the tab itself.
        if !ctx.is_top_level() {
            return Ok(ScrapeOutcome::nothing().into());
        }
        self.extract_with_access(ctx).await
    }

    async fn extract_with_access(&self, ctx: &ScrapeContext<'_>) -> ScrapeResult<Vec<ScrapeOutcome>> {
        let hrefs: Vec<String> = ctx.run_script_json(&LINKS_SCRIPT).await?.unwrap_or_default();
        let links = puzzle_links(&hrefs);
        if links.is_empty() {
            return Ok(ScrapeOutcome::nothing().into());
        }

        let needed = permissions_for_urls(&links);
        if !ctx.has_permissions(&needed).await {
            return Ok(ScrapeOutcome::need_permissions(needed).into());
        }

        // One broken link must not hide the others.
        let mut payloads = Vec::new();
        let mut outcomes = Vec::new();
        for link in &links {
            match self.fetch_link(ctx, link).await {
                Ok(payload) => payloads.push(payload),
                Err(ScrapeError::Http(e)) => {
                    tracing::warn!(url = %link, error = %e, "Puzzle link fetch failed");
                    outcomes.push(ScrapeOutcome::error(e.to_string()));
                }
                Err(e) => return Err(e),
            }
        }
        outcomes.insert(0, ScrapeOutcome::Success(payloads));
        Ok(outcomes)
    }
}
