use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use url::Url;

use super::{host_is_domain_or_subdomain_of, ScrapeContext, ScrapeOutcome, Source};
use crate::error::ScrapeResult;
use crate::types::RawPayload;

/// One syndicate served by the PZZL applet.
struct Syndicate {
    host_permission: &'static str,
    base_url: &'static str,
}

const NYT_SYNDICATED: Syndicate = Syndicate {
    host_permission: "https://*.pzzl.com/*",
    base_url: "https://nytsyn.pzzl.com/nytsyn-crossword-mh/nytsyncrossword",
};

const NEWSDAY: Syndicate = Syndicate {
    host_permission: "https://*.brainsonly.com/*",
    base_url: "https://www.brainsonly.com/servlets-newsday-crossword/newsdaycrossword",
};

fn syndicate(url: &Url) -> Option<&'static Syndicate> {
    static NYT_PATH: OnceLock<Regex> = OnceLock::new();
    let nyt_path = NYT_PATH.get_or_init(|| Regex::new(r"^/cwd[^/]*/$").expect("pzzl path regex is valid"));
    if url.host_str() == Some("nytsyn.pzzl.com") && nyt_path.is_match(url.path()) {
        return Some(&NYT_SYNDICATED);
    }
    if host_is_domain_or_subdomain_of(url, "brainsonly.com") && url.path() == "/global/newsday/cwd/" {
        return Some(&NEWSDAY);
    }
    None
}

/// Date parameter for the puzzle API: the last segment of the URL fragment.
fn puzzle_date(url: &Url) -> &str {
    let fragment = url.fragment().unwrap_or_default();
    fragment.rsplit('/').next().unwrap_or(fragment)
}

/// NYT syndicated and Newsday puzzles in the PZZL applet.
pub struct PzzlSource;

#[async_trait]
impl Source for PzzlSource {
    fn name(&self) -> &'static str {
        "PZZL"
    }

    fn matches(&self, url: &Url) -> bool {
        syndicate(url).is_some()
    }

    fn needed_permissions(&self, url: &Url) -> Vec<String> {
        syndicate(url)
            .map(|s| vec![s.host_permission.to_string()])
            .unwrap_or_default()
    }

    async fn extract_with_access(&self, ctx: &ScrapeContext<'_>) -> ScrapeResult<Vec<ScrapeOutcome>> {
        let Some(syndicate) = syndicate(&ctx.url) else {
            return Ok(ScrapeOutcome::nothing().into());
        };
        let data_url = format!("{}?date={}", syndicate.base_url, puzzle_date(&ctx.url));
        let data = ctx.fetch_text(&data_url, &[]).await?;
        Ok(ScrapeOutcome::found(RawPayload::Pzzl(data)).into())
    }
}
