use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use url::Url;

use super::{host_is_domain_or_subdomain_of, patterns, Attempt, ScrapeContext, ScrapeOutcome, Source};
use crate::error::ScrapeResult;
use crate::permissions::permissions_for_urls;
use crate::remote::PageScript;
use crate::types::RawPayload;

/// Fetchable formats, in the order their payloads are reported.
const SUPPORTED_EXTENSIONS: [&str; 3] = ["puz", "jpz", "ipuz"];

const IPUZ_SCRIPT: PageScript = PageScript::new(
    "crosswordnexus-ipuz",
    r#"function() {
        if (!window.ipuz) {
            return '';
        }
        return typeof window.ipuz === 'string' ? window.ipuz : JSON.stringify(window.ipuz);
    }"#,
);

const SCRIPT_TEXTS_SCRIPT: PageScript = PageScript::new(
    "crosswordnexus-scripts",
    r#"function() {
        return JSON.stringify(
            Array.from(document.getElementsByTagName('script')).map(function(elem) { return elem.innerText; })
        );
    }"#,
);

fn extension(url: &str) -> &str {
    url.rsplit_once('.').map(|(_, ext)| ext).unwrap_or_default()
}

/// Puzzle URLs given as `url: '...'` in solver initialization scripts.
fn urls_in_scripts(scripts: &[String]) -> Vec<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"url: '([^']*.)'").expect("puzzle url regex is valid"));
    scripts
        .iter()
        .filter_map(|script| re.captures(script))
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

#[derive(Debug, Clone, Copy)]
enum Step {
    GlobalIpuz,
    QueryParameters,
    InitScripts,
}

impl Step {
    const ORDER: [Step; 3] = [Step::GlobalIpuz, Step::QueryParameters, Step::InitScripts];
}

/// Crossword Nexus HTML5 solver, on crosswordnexus.com or its GitHub Pages mirror.
pub struct CrosswordNexusSource;

impl CrosswordNexusSource {
    async fn from_global(&self, ctx: &ScrapeContext<'_>) -> ScrapeResult<Attempt> {
        let ipuz = ctx.run_script(&IPUZ_SCRIPT).await?;
        if ipuz.is_empty() {
            return Ok(Attempt::Continue);
        }
        Ok(ScrapeOutcome::found(RawPayload::Ipuz(ipuz)).into())
    }

    async fn from_query(&self, ctx: &ScrapeContext<'_>) -> ScrapeResult<Attempt> {
        let urls: Vec<String> = ctx
            .url
            .query_pairs()
            .map(|(_, value)| value.into_owned())
            .filter(|value| SUPPORTED_EXTENSIONS.contains(&extension(value)))
            .collect();
        if urls.is_empty() {
            return Ok(Attempt::Continue);
        }
        Ok(Attempt::Finished(self.fetch_urls(ctx, &urls).await?))
    }

    async fn from_scripts(&self, ctx: &ScrapeContext<'_>) -> ScrapeResult<Attempt> {
        let scripts: Vec<String> = ctx
            .run_script_json(&SCRIPT_TEXTS_SCRIPT)
            .await?
            .unwrap_or_default();
        let urls = urls_in_scripts(&scripts);
        if urls.is_empty() {
            return Ok(Attempt::Continue);
        }
        Ok(Attempt::Finished(self.fetch_urls(ctx, &urls).await?))
    }

    async fn fetch_urls(&self, ctx: &ScrapeContext<'_>, urls: &[String]) -> ScrapeResult<Vec<ScrapeOutcome>> {
        let resolved = urls
            .iter()
            .map(|href| ctx.resolve(href))
            .collect::<ScrapeResult<Vec<Url>>>()?;
        let needed = permissions_for_urls(&resolved);
        if !ctx.has_permissions(&needed).await {
            return Ok(ScrapeOutcome::need_permissions(needed).into());
        }

        let mut fetched: Vec<(&str, Vec<u8>)> = Vec::new();
        for url in &resolved {
            let data = ctx.fetch_binary(url.as_str(), &[]).await?;
            fetched.push((extension(url.path()), data));
        }

        let mut payloads = Vec::new();
        for format in SUPPORTED_EXTENSIONS {
            for (_, data) in fetched.iter().filter(|(ext, _)| *ext == format) {
                payloads.push(match format {
                    "puz" => RawPayload::AcrossLite(data.clone()),
                    "jpz" => RawPayload::Jpz(data.clone()),
                    _ => RawPayload::Ipuz(String::from_utf8_lossy(data).into_owned()),
                });
            }
        }
        Ok(ScrapeOutcome::Success(payloads).into())
    }
}

#[async_trait]
impl Source for CrosswordNexusSource {
    fn name(&self) -> &'static str {
        "Crossword Nexus"
    }

    fn matches(&self, url: &Url) -> bool {
        host_is_domain_or_subdomain_of(url, "crosswordnexus.com")
            || (host_is_domain_or_subdomain_of(url, "crosswordnexus.github.io")
                && url.path().contains("html5-crossword-solver"))
    }

    fn needed_permissions(&self, _url: &Url) -> Vec<String> {
        patterns(&["https://crosswordnexus.github.io/*", "https://*.crosswordnexus.com/*"])
    }

    async fn extract_with_access(&self, ctx: &ScrapeContext<'_>) -> ScrapeResult<Vec<ScrapeOutcome>> {
        for step in Step::ORDER {
            let attempt = match step {
                Step::GlobalIpuz => self.from_global(ctx).await?,
                Step::QueryParameters => self.from_query(ctx).await?,
                Step::InitScripts => self.from_scripts(ctx).await?,
            };
            if let Attempt::Finished(outcomes) = attempt {
                return Ok(outcomes);
            }
        }
        Ok(ScrapeOutcome::nothing().into())
    }
}
