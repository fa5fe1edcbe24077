use async_trait::async_trait;
use url::Url;

use super::{host_is_domain_or_subdomain_of, patterns, ScrapeContext, ScrapeOutcome, Source};
use crate::error::ScrapeResult;
use crate::remote::PageScript;
use crate::types::RawPayload;

const CROSSWORD_PROPS_SCRIPT: PageScript = PageScript::new(
    "guardian-crossword-props",
    r#"function() {
        var crosswordElem = document.querySelector('gu-island[name="CrosswordComponent"]');
        if (!crosswordElem || !crosswordElem.hasAttribute("props")) {
            return '';
        }
        var data = JSON.parse(crosswordElem.getAttribute("props")).data;
        return data ? JSON.stringify(data) : '';
    }"#,
);

pub struct GuardianSource;

#[async_trait]
impl Source for GuardianSource {
    fn name(&self) -> &'static str {
        "The Guardian"
    }

    fn matches(&self, url: &Url) -> bool {
        host_is_domain_or_subdomain_of(url, "theguardian.com")
    }

    fn needed_permissions(&self, _url: &Url) -> Vec<String> {
        patterns(&["https://*.theguardian.com/*"])
    }

    async fn extract_with_access(&self, ctx: &ScrapeContext<'_>) -> ScrapeResult<Vec<ScrapeOutcome>> {
        let json = ctx.run_script(&CROSSWORD_PROPS_SCRIPT).await?;
        if json.is_empty() {
            return Ok(ScrapeOutcome::nothing().into());
        }
        Ok(ScrapeOutcome::found(RawPayload::Guardian(json)).into())
    }
}
