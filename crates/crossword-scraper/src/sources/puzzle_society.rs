use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::Deserialize;
use url::Url;

use super::uclick::{fetch_level_file, issue_date};
use super::{host_is_domain_or_subdomain_of, patterns, Attempt, ScrapeContext, ScrapeOutcome, Source};
use crate::error::ScrapeResult;
use crate::permissions::permissions_for_urls;
use crate::remote::PageScript;

const DATE_FORMAT: &str = "%Y-%m-%d";
const LEVEL_MIME_TYPES: [&str; 2] = ["text/html", "application/xml"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NextData {
    props: Props,
    #[serde(default)]
    query: Query,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Props {
    page_props: PageProps,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageProps {
    #[serde(default)]
    game_content: GameContent,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GameContent {
    #[serde(default)]
    game_level_data_sets: Vec<LevelData>,
}

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
    mime_type: String,
}

#[derive(Debug, Default, Deserialize)]
struct Query {
    #[serde(default)]
    game: Vec<String>,
}

/// Page data, if its game route is the trailing part of `path`.
fn data_if_matching(json: &str, path: &str) -> ScrapeResult<Option<NextData>> {
    let data: NextData = serde_json::from_str(json)?;
    let parts: Vec<&str> = path.split('/').collect();
    let game = &data.query.game;
    let matching = !game.is_empty()
        && parts.len() > game.len()
        && parts[parts.len() - game.len()..]
            .iter()
            .zip(game)
            .all(|(part, segment)| *part == segment.as_str());
    Ok(matching.then_some(data))
}

/// Text of the `#__NEXT_DATA__` script in a fetched page.
fn next_data_from_html(html: &str) -> String {
    let document = Html::parse_document(html);
    let selector = Selector::parse("#__NEXT_DATA__").expect("next data selector is valid");
    document
        .select(&selector)
        .next()
        .map(|elem| elem.text().collect())
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy)]
enum Step {
    LivePage,
    RefetchedPage,
}

impl Step {
    const ORDER: [Step; 2] = [Step::LivePage, Step::RefetchedPage];
}

/// Puzzle Society (Andrews McMeel), whose `__NEXT_DATA__` goes stale after in-app navigation.
pub struct PuzzleSocietySource;

impl PuzzleSocietySource {
    async fn from_live_page(&self, ctx: &ScrapeContext<'_>) -> ScrapeResult<Attempt> {
        let script = PageScript::read_global_json("puzzlesociety-next-data", "window.__NEXT_DATA__");
        let json = ctx.run_script(&script).await?;
        if json.is_empty() {
            return Ok(Attempt::Continue);
        }
        match data_if_matching(&json, ctx.url.path())? {
            Some(data) => Ok(Attempt::Finished(self.fetch_level(ctx, data).await?)),
            None => {
                tracing::info!("__NEXT_DATA__ is for a different game; refetching page");
                Ok(Attempt::Continue)
            }
        }
    }

    async fn from_refetched_page(&self, ctx: &ScrapeContext<'_>) -> ScrapeResult<Attempt> {
        let needed = self.needed_permissions(&ctx.url);
        let mut with_page = needed.clone();
        with_page.extend(permissions_for_urls([&ctx.url]));
        if !ctx.has_permissions(&with_page).await {
            return Ok(ScrapeOutcome::need_permissions(needed).into());
        }

        let html = ctx.fetch_text(ctx.url.as_str(), &[]).await?;
        let json = next_data_from_html(&html);
        if json.is_empty() {
            return Ok(ScrapeOutcome::nothing().into());
        }
        match data_if_matching(&json, ctx.url.path())? {
            Some(data) => Ok(Attempt::Finished(self.fetch_level(ctx, data).await?)),
            None => Ok(ScrapeOutcome::nothing().into()),
        }
    }

    async fn fetch_level(&self, ctx: &ScrapeContext<'_>, data: NextData) -> ScrapeResult<Vec<ScrapeOutcome>> {
        let Some(level) = data.props.page_props.game_content.game_level_data_sets.into_iter().next() else {
            return Ok(ScrapeOutcome::nothing().into());
        };
        let date = issue_date(&level.issue_date, DATE_FORMAT)?;
        let xml_url = level
            .files
            .iter()
            .rev()
            .find(|f| LEVEL_MIME_TYPES.contains(&f.mime_type.as_str()))
            .map(|f| f.url.as_str());
        fetch_level_file(ctx, xml_url, date).await
    }
}

#[async_trait]
impl Source for PuzzleSocietySource {
    fn name(&self) -> &'static str {
        "Puzzle Society"
    }

    fn matches(&self, url: &Url) -> bool {
        host_is_domain_or_subdomain_of(url, "puzzlesociety.com")
    }

    fn needed_permissions(&self, _url: &Url) -> Vec<String> {
        patterns(&["https://*.puzzlesociety.com/*", "https://*.amuniversal.com/*"])
    }

    async fn extract_with_access(&self, ctx: &ScrapeContext<'_>) -> ScrapeResult<Vec<ScrapeOutcome>> {
        for step in Step::ORDER {
            let attempt = match step {
                Step::LivePage => self.from_live_page(ctx).await?,
                Step::RefetchedPage => self.from_refetched_page(ctx).await?,
            };
            if let Attempt::Finished(outcomes) = attempt {
                return Ok(outcomes);
            }
        }
        Ok(ScrapeOutcome::nothing().into())
    }
}
