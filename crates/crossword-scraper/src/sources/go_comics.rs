use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::uclick::{fetch_level_file, issue_date};
use super::{host_is_domain_or_subdomain_of, patterns, Attempt, ScrapeContext, ScrapeOutcome, Source};
use crate::error::ScrapeResult;
use crate::permissions::permissions_for_urls;
use crate::remote::PageScript;

const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const PAGE_DATE_SCRIPT: PageScript = PageScript::new(
    "gocomics-page-date",
    r#"function() {
        var crosswordFrame = document.querySelector('iframe[data-level-id]');
        if (!crosswordFrame) {
            return '';
        }
        return crosswordFrame.getAttribute('data-level-id');
    }"#,
);

const NEXT_F_SCRIPT: PageScript = PageScript::new(
    "gocomics-next-f",
    r#"function() {
        if (!window.__next_f) {
            return '';
        }
        var dataElems = window.__next_f.filter(function(elem) {
            return elem.length > 1 && typeof elem[1] === 'string';
        });
        return dataElems.reduce(function(acc, elem) { return acc + elem[1]; }, '');
    }"#,
);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LevelData {
    issue_date: String,
    #[serde(default)]
    files: Vec<LevelFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LevelFile {
    url: String,
    original_file_name: String,
}

/// First value under `key`, searching objects through their `children` and arrays in order.
fn find_value_with_key<'a>(element: &'a Value, key: &str) -> Option<&'a Value> {
    match element {
        Value::Object(map) => map
            .get(key)
            .or_else(|| map.get("children").and_then(|c| find_value_with_key(c, key))),
        Value::Array(items) => items.iter().find_map(|item| find_value_with_key(item, key)),
        _ => None,
    }
}

/// The level for `page_date`, if the streamed data belongs to the puzzle in `path`.
///
/// Client-side navigation leaves older puzzles in `__next_f`, so the data must name the
/// path's puzzle slug and contain a level for the displayed date.
fn level_if_matching(data: &str, page_date: &str, path: &str) -> ScrapeResult<Option<LevelData>> {
    let Some(line) = data.lines().find(|line| line.contains("levelData")) else {
        return Ok(None);
    };
    let json_text = line.split_once(':').map(|(_, rest)| rest).unwrap_or(line);
    let json: Value = serde_json::from_str(json_text)?;

    let Some(slug) = find_value_with_key(&json, "puzzleSlug") else {
        return Ok(None);
    };
    let slug = match slug {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if !path.split('/').any(|part| part == slug) {
        return Ok(None);
    }

    let Some(levels) = find_value_with_key(&json, "levelData") else {
        return Ok(None);
    };
    let levels: Vec<LevelData> = serde_json::from_value(levels.clone())?;
    Ok(levels.into_iter().find(|level| level.issue_date == page_date))
}

/// Concatenated `self.__next_f.push([1, "..."])` string literals of a fetched page.
fn next_f_from_html(html: &str) -> ScrapeResult<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^self\.__next_f\.push\(\[1,(.*)\]\)$").expect("next_f regex is valid")
    });
    let document = Html::parse_document(html);
    let selector = Selector::parse("script").expect("script selector is valid");

    let mut joined = String::new();
    for script in document.select(&selector) {
        let text: String = script.text().collect();
        if let Some(literal) = re.captures(&text).and_then(|c| c.get(1)) {
            // A JavaScript string literal; decoding it as JSON resolves the escapes.
            let decoded: String = serde_json::from_str(literal.as_str())?;
            joined.push_str(&decoded);
        }
    }
    Ok(joined)
}

#[derive(Debug, Clone, Copy)]
enum Step {
    LivePage,
    RefetchedPage,
}

impl Step {
    const ORDER: [Step; 2] = [Step::LivePage, Step::RefetchedPage];
}

pub struct GoComicsSource;

impl GoComicsSource {
    async fn from_live_page(&self, ctx: &ScrapeContext<'_>, page_date: &str) -> ScrapeResult<Attempt> {
        let data = ctx.run_script(&NEXT_F_SCRIPT).await?;
        if data.is_empty() {
            return Ok(Attempt::Continue);
        }
        match level_if_matching(&data, page_date, ctx.url.path())? {
            Some(level) => Ok(Attempt::Finished(self.fetch_level(ctx, level).await?)),
            None => {
                tracing::info!("Page data is for a different puzzle; refetching page");
                Ok(Attempt::Continue)
            }
        }
    }

    async fn from_refetched_page(&self, ctx: &ScrapeContext<'_>, page_date: &str) -> ScrapeResult<Attempt> {
        let needed = self.needed_permissions(&ctx.url);
        let mut with_page = needed.clone();
        with_page.extend(permissions_for_urls([&ctx.url]));
        if !ctx.has_permissions(&with_page).await {
            return Ok(ScrapeOutcome::need_permissions(needed).into());
        }

        let html = ctx.fetch_text(ctx.url.as_str(), &[]).await?;
        let data = next_f_from_html(&html)?;
        if data.is_empty() {
            return Ok(ScrapeOutcome::nothing().into());
        }
        match level_if_matching(&data, page_date, ctx.url.path())? {
            Some(level) => Ok(Attempt::Finished(self.fetch_level(ctx, level).await?)),
            None => Ok(ScrapeOutcome::nothing().into()),
        }
    }

    async fn fetch_level(&self, ctx: &ScrapeContext<'_>, level: LevelData) -> ScrapeResult<Vec<ScrapeOutcome>> {
        if level.files.is_empty() {
            return Ok(ScrapeOutcome::nothing().into());
        }
        let date = issue_date(&level.issue_date, DATE_FORMAT)?;
        let xml_url = level
            .files
            .iter()
            .rev()
            .find(|f| f.original_file_name.contains(".xml") && !f.original_file_name.contains("title"))
            .map(|f| f.url.as_str());
        fetch_level_file(ctx, xml_url, date).await
    }
}

#[async_trait]
impl Source for GoComicsSource {
    fn name(&self) -> &'static str {
        "GoComics"
    }

    fn matches(&self, url: &Url) -> bool {
        host_is_domain_or_subdomain_of(url, "gocomics.com") && url.path().starts_with("/puzzles/")
    }

    fn needed_permissions(&self, _url: &Url) -> Vec<String> {
        patterns(&["https://*.gocomics.com/*", "https://*.amuniversal.com/*"])
    }

    async fn extract_with_access(&self, ctx: &ScrapeContext<'_>) -> ScrapeResult<Vec<ScrapeOutcome>> {
        // Without the displayed date there is no way to tell current data from stale data.
        let page_date = ctx.run_script(&PAGE_DATE_SCRIPT).await?;
        if page_date.is_empty() {
            return Ok(ScrapeOutcome::nothing().into());
        }

        for step in Step::ORDER {
            let attempt = match step {
                Step::LivePage => self.from_live_page(ctx, &page_date).await?,
                Step::RefetchedPage => self.from_refetched_page(ctx, &page_date).await?,
            };
            if let Attempt::Finished(outcomes) = attempt {
                return Ok(outcomes);
            }
        }
        Ok(ScrapeOutcome::nothing().into())
    }
}
