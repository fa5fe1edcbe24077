//! XWord Info solve and acrostic pages.
//!
//! The data endpoints check the referer, which an out-of-band fetch cannot set, so the final
//! request runs inside the page through its own jQuery.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use url::Url;

use super::{host_is_domain_or_subdomain_of, patterns, ScrapeContext, ScrapeOutcome, Source};
use crate::error::{ScrapeError, ScrapeResult};
use crate::remote::PageScript;
use crate::types::RawPayload;

const HEADERS_SCRIPT: PageScript = PageScript::new(
    "xwordinfo-headers",
    r#"function() {
        return JSON.stringify(
            Array.from(document.getElementsByTagName('h2')).map(function(elem) { return elem.innerText; })
        );
    }"#,
);

const ACROSTIC_DATA_SCRIPT: PageScript = PageScript::new(
    "xwordinfo-acrostic-data",
    r#"function() {
        var page = new URL(window.location);
        return $.ajax({
            url: "https://www.xwordinfo.com/JSON/AcrosticData.ashx",
            dataType: "json",
            async: false,
            data: { date: page.searchParams.get("date") }
        }).responseText;
    }"#,
);

const INIT_SCRIPT: PageScript = PageScript::new(
    "xwordinfo-init-script",
    r#"function() {
        var script = Array.from(document.getElementsByTagName("script")).map(function(tag) {
            return tag.innerText;
        }).find(function(text) {
            return text.includes("xwInterAct");
        });
        return script || '';
    }"#,
);

/// Parameters of the `Go({...});` call in the solver's initialization script.
///
/// The object literal uses bare keys, which are quoted before parsing as JSON.
fn go_parameters(script: &str) -> ScrapeResult<Option<Value>> {
    static GO_CALL: OnceLock<Regex> = OnceLock::new();
    static BARE_KEY: OnceLock<Regex> = OnceLock::new();
    let go_call = GO_CALL.get_or_init(|| Regex::new(r"Go\((\{[^}]+\})\);").expect("Go call regex is valid"));
    let bare_key = BARE_KEY.get_or_init(|| Regex::new(r"([a-zA-Z]+):").expect("bare key regex is valid"));

    let Some(literal) = go_call.captures(script).and_then(|c| c.get(1)) else {
        return Ok(None);
    };
    let quoted = bare_key.replace_all(literal.as_str(), r#""$1":"#);
    Ok(Some(serde_json::from_str(&quoted)?))
}

fn puzzle_data_script(parameters: &Value) -> PageScript {
    PageScript::dynamic(
        "xwordinfo-puzzle-data",
        format!(
            r#"function() {{
                return $.ajax({{
                    url: "https://www.xwordinfo.com/JSON/data.ashx",
                    dataType: "json",
                    async: false,
                    data: {parameters}
                }}).responseText;
            }}"#
        ),
    )
}

pub struct XWordInfoSource;

impl XWordInfoSource {
    async fn scrape_acrostic(&self, ctx: &ScrapeContext<'_>) -> ScrapeResult<Vec<ScrapeOutcome>> {
        let headers: Vec<String> = ctx.run_script_json(&HEADERS_SCRIPT).await?.unwrap_or_default();
        let author = headers
            .into_iter()
            .find(|h| h.starts_with("by "))
            .unwrap_or_default();
        let json = ctx.run_script(&ACROSTIC_DATA_SCRIPT).await?;
        if json.is_empty() {
            return Ok(ScrapeOutcome::nothing().into());
        }
        Ok(ScrapeOutcome::found(RawPayload::XWordInfoAcrostic { json, author }).into())
    }

    async fn scrape_puzzle(&self, ctx: &ScrapeContext<'_>) -> ScrapeResult<Vec<ScrapeOutcome>> {
        let init = ctx.run_script(&INIT_SCRIPT).await?;
        let Some(parameters) = go_parameters(&init)? else {
            return Ok(ScrapeOutcome::nothing().into());
        };
        if !parameters.is_object() {
            return Err(ScrapeError::PageData(format!("Go() parameters are not an object: {parameters}")));
        }
        let json = ctx.run_script(&puzzle_data_script(&parameters)).await?;
        if json.is_empty() {
            return Ok(ScrapeOutcome::nothing().into());
        }
        Ok(ScrapeOutcome::found(RawPayload::XWordInfo(json)).into())
    }
}

#[async_trait]
impl Source for XWordInfoSource {
    fn name(&self) -> &'static str {
        "XWord Info"
    }

    fn matches(&self, url: &Url) -> bool {
        host_is_domain_or_subdomain_of(url, "xwordinfo.com")
    }

    fn needed_permissions(&self, _url: &Url) -> Vec<String> {
        patterns(&["https://*.xwordinfo.com/*"])
    }

    async fn extract_with_access(&self, ctx: &ScrapeContext<'_>) -> ScrapeResult<Vec<ScrapeOutcome>> {
        let path = ctx.url.path();
        if path.contains("/Acrostic") {
            self.scrape_acrostic(ctx).await
        } else if path.contains("/Solve") {
            self.scrape_puzzle(ctx).await
        } else {
            Ok(ScrapeOutcome::nothing().into())
        }
    }
}
