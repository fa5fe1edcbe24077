use async_trait::async_trait;
use chrono::NaiveDate;
use url::Url;

use super::{patterns, ScrapeContext, ScrapeOutcome, Source};
use crate::error::{ScrapeError, ScrapeResult};
use crate::permissions::permissions_for_urls;
use crate::remote::PageScript;
use crate::types::RawPayload;

const LEVELS_API: &str = "https://games-service-prod.site.aws.wapo.pub/crossword/levels";

const MODALS_SCRIPT: PageScript = PageScript::new(
    "washingtonpost-modals",
    r#"function() {
        return JSON.stringify(
            Array.from(document.getElementsByClassName('wpds-modal')).map(function(elem) { return elem.innerText; })
        );
    }"#,
);

/// Levels API URL for the first modal that shows a puzzle date.
fn puzzle_url(modals: &[String]) -> Option<String> {
    modals.iter().find_map(|modal| {
        let date = modal
            .lines()
            .find_map(|line| NaiveDate::parse_from_str(line.trim(), "%b %d, %Y").ok())?;
        let series = if modal.contains("Daily crosswords") {
            "daily"
        } else {
            "sunday"
        };
        Some(format!("{LEVELS_API}/{series}/{}", date.format("%Y/%m/%d")))
    })
}

pub struct WashingtonPostSource;

#[async_trait]
impl Source for WashingtonPostSource {
    fn name(&self) -> &'static str {
        "Washington Post"
    }

    fn matches(&self, url: &Url) -> bool {
        match url.host_str() {
            Some("discovery-games-portal-prod-cdn.site.aws.wapo.pub") => true,
            Some("www.washingtonpost.com") => url.path().contains("/games-crossword/"),
            _ => false,
        }
    }

    fn needed_permissions(&self, _url: &Url) -> Vec<String> {
        patterns(&["https://*.wapo.pub/*"])
    }

    async fn extract_with_access(&self, ctx: &ScrapeContext<'_>) -> ScrapeResult<Vec<ScrapeOutcome>> {
        let modals: Vec<String> = ctx.run_script_json(&MODALS_SCRIPT).await?.unwrap_or_default();
        let Some(url) = puzzle_url(&modals) else {
            return Ok(ScrapeOutcome::nothing().into());
        };
        let parsed = Url::parse(&url).map_err(|e| ScrapeError::invalid_url(url.as_str(), e))?;
        let needed = permissions_for_urls([&parsed]);
        if !ctx.has_permissions(&needed).await {
            return Ok(ScrapeOutcome::need_permissions(needed).into());
        }
        let data = ctx.fetch_text(&url, &[]).await?;
        Ok(ScrapeOutcome::found(RawPayload::WashingtonPost(data)).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_puzzle_url_from_modal() {
        let modals = vec![
            "Settings\nSound on".to_string(),
            "Daily crosswords\nFeb 9, 2024\nBy Someone".to_string(),
        ];
        assert_eq!(
            puzzle_url(&modals).as_deref(),
            Some("https://games-service-prod.site.aws.wapo.pub/crossword/levels/daily/2024/02/09")
        );
    }

    #[test]
    fn test_sunday_modal() {
        let modals = vec!["The Sunday Crossword\nMar 3, 2024".to_string()];
        assert!(puzzle_url(&modals).unwrap().contains("/sunday/2024/03/03"));
    }

    #[test]
    fn test_no_date_means_no_puzzle() {
        assert_eq!(puzzle_url(&["Help".to_string()]), None);
    }
}
