use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use url::Url;

use super::{host_is_domain_or_subdomain_of, patterns, ScrapeContext, ScrapeOutcome, Source};
use crate::error::{ScrapeError, ScrapeResult};
use crate::types::RawPayload;

const GRAPHQL_ENDPOINT: &str = "https://api.crosswordr.com/graphql";

const SOLVE_DATA_QUERY: &str = r#"query GetPuzzleSolveData($puzzleId: String!, $puzzleContext: PuzzleContext) {
  puzzleV2(puzzleId: $puzzleId, puzzleContext: $puzzleContext) {
    puzzle {
      content
      width
      height
      title
      description
      editedBy
      byline
      postSolveNote
    }
  }
}"#;

fn puzzle_id(path: &str) -> Option<&str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/puzzle/([^/]+)").expect("puzzle path regex is valid"))
        .captures(path)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// GraphQL GET request for a puzzle's solve data.
///
/// The applet POSTs this query, but a GET with the same parameters is accepted and is not
/// subject to origin rewriting.
fn solve_data_url(puzzle_id: &str) -> Result<Url, url::ParseError> {
    let variables = serde_json::json!({ "puzzleId": puzzle_id }).to_string();
    Url::parse_with_params(
        GRAPHQL_ENDPOINT,
        &[
            ("operationName", "GetPuzzleSolveData"),
            ("query", SOLVE_DATA_QUERY),
            ("variables", variables.as_str()),
        ],
    )
}

pub struct CrosswordrSource;

#[async_trait]
impl Source for CrosswordrSource {
    fn name(&self) -> &'static str {
        "Crosswordr"
    }

    fn matches(&self, url: &Url) -> bool {
        host_is_domain_or_subdomain_of(url, "crosswordr.com") && puzzle_id(url.path()).is_some()
    }

    fn needed_permissions(&self, _url: &Url) -> Vec<String> {
        patterns(&["https://*.crosswordr.com/*"])
    }

    async fn extract_with_access(&self, ctx: &ScrapeContext<'_>) -> ScrapeResult<Vec<ScrapeOutcome>> {
        // The API lives on another origin, so even the top-level frame needs the grant.
        let needed = self.needed_permissions(&ctx.url);
        if !ctx.has_permissions(&needed).await {
            return Ok(ScrapeOutcome::need_permissions(needed).into());
        }
        let Some(id) = puzzle_id(ctx.url.path()) else {
            return Ok(ScrapeOutcome::nothing().into());
        };
        let url = solve_data_url(id).map_err(|e| ScrapeError::invalid_url(GRAPHQL_ENDPOINT, e))?;
        let data = ctx
            .fetch_text(
                url.as_str(),
                &[("Content-Type".to_string(), "application/json".to_string())],
            )
            .await?;
        Ok(ScrapeOutcome::found(RawPayload::Crosswordr(data)).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solve_data_url() {
        let url = solve_data_url("abc-123").unwrap();
        let params: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(params[0], ("operationName".into(), "GetPuzzleSolveData".into()));
        assert!(params[1].1.starts_with("query GetPuzzleSolveData"));
        assert_eq!(params[2], ("variables".into(), r#"{"puzzleId":"abc-123"}"#.into()));
    }

    #[test]
    fn test_matches_puzzle_pages() {
        assert!(CrosswordrSource.matches(&Url::parse("https://crosswordr.com/puzzle/xyz").unwrap()));
        assert!(!CrosswordrSource.matches(&Url::parse("https://crosswordr.com/about").unwrap()));
    }
}
