//! CNN crosswords, served from a GameDistribution iframe.
//!
//! The applet stores one state object per puzzle in localStorage, so several puzzles may be
//! known to the page at once. The displayed one is picked by comparing each stored state with
//! what the page shows:
//!
//! 1. how many stored signals match the highlighted clue bar,
//! 2. agreement between the stored and rendered locked-cell patterns,
//! 3. how recently the puzzle's data was fetched by the page.

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use super::{host_is_domain_or_subdomain_of, patterns, ScrapeContext, ScrapeOutcome, Source};
use crate::error::ScrapeResult;
use crate::remote::PageScript;
use crate::types::RawPayload;

const PAGE_STATE_SCRIPT: PageScript = PageScript::new(
    "cnn-page-state",
    r#"function() {
        var currentClueBar = document.getElementsByClassName("currentClueBar");
        if (!currentClueBar || currentClueBar.length == 0) {
            return '';
        }
        var currentClue = currentClueBar[0].innerText;
        var keyPattern = /^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$/;
        var toPattern = function(cells) {
            return Array.from(cells || []).map(function(c) { return c ? '1' : '0'; }).join('');
        };
        var rendered = toPattern(Array.from(document.querySelectorAll('.cell')).map(function(c) {
            return c.classList.contains('locked');
        }));
        var candidates = [];
        for (var i = 0; i < localStorage.length; i++) {
            var key = localStorage.key(i);
            if (!keyPattern.test(key)) {
                continue;
            }
            var state = JSON.parse(localStorage.getItem(key));
            if (!state || !state.currentClueId) {
                continue;
            }
            var matches = 0;
            if (currentClue.includes('| ' + state.currentClueId + ' (')) {
                matches++;
            }
            if (state.currentClueText && currentClue.includes(state.currentClueText)) {
                matches++;
            }
            candidates.push({id: key, clueMatches: matches, lockedPattern: toPattern(state.lockedCells)});
        }
        var fetched = performance.getEntriesByType('resource').map(function(e) { return e.name; });
        return JSON.stringify({lockedPattern: rendered, candidates: candidates, fetched: fetched});
    }"#,
);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageState {
    #[serde(default)]
    locked_pattern: String,
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    fetched: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    id: String,
    clue_matches: u32,
    #[serde(default)]
    locked_pattern: String,
}

fn pattern_agreement(stored: &str, rendered: &str) -> usize {
    if stored.is_empty() || stored.len() != rendered.len() {
        return 0;
    }
    stored
        .bytes()
        .zip(rendered.bytes())
        .filter(|(a, b)| a == b)
        .count()
}

fn fetch_recency(id: &str, fetched: &[String]) -> Option<usize> {
    fetched.iter().rposition(|url| url.contains(id))
}

/// The displayed puzzle, if any stored state matches the clue bar. Full ties go to the first.
fn pick_displayed(state: &PageState) -> Option<&Candidate> {
    state
        .candidates
        .iter()
        .filter(|c| c.clue_matches > 0)
        .rev()
        .max_by_key(|c| {
            (
                c.clue_matches,
                pattern_agreement(&c.locked_pattern, &state.locked_pattern),
                fetch_recency(&c.id, &state.fetched),
            )
        })
}

pub struct CnnSource;

#[async_trait]
impl Source for CnnSource {
    fn name(&self) -> &'static str {
        "CNN"
    }

    fn matches(&self, url: &Url) -> bool {
        host_is_domain_or_subdomain_of(url, "sg.gamedistribution.com")
    }

    fn needed_permissions(&self, _url: &Url) -> Vec<String> {
        patterns(&["https://*.gamedistribution.com/*"])
    }

    async fn extract_with_access(&self, ctx: &ScrapeContext<'_>) -> ScrapeResult<Vec<ScrapeOutcome>> {
        let Some(state) = ctx.run_script_json::<PageState>(&PAGE_STATE_SCRIPT).await? else {
            return Ok(ScrapeOutcome::nothing().into());
        };
        let Some(candidate) = pick_displayed(&state) else {
            tracing::debug!(candidates = state.candidates.len(), "No stored CNN puzzle matches the clue bar");
            return Ok(ScrapeOutcome::nothing().into());
        };

        let needed = self.needed_permissions(&ctx.url);
        if !ctx.has_permissions(&needed).await {
            return Ok(ScrapeOutcome::need_permissions(needed).into());
        }
        let puzzle_url = format!(
            "https://crosswords-sgweb.gamedistribution.com/storage/cnn_demo-crossword/{}.json",
            candidate.id
        );
        let data = ctx.fetch_text(&puzzle_url, &[]).await?;
        Ok(ScrapeOutcome::found(RawPayload::Cnn(data)).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, clue_matches: u32, locked_pattern: &str) -> Candidate {
        Candidate {
            id: id.to_string(),
            clue_matches,
            locked_pattern: locked_pattern.to_string(),
        }
    }

    #[test]
    fn test_structural_matches_win_first() {
        let state = PageState {
            locked_pattern: "0110".into(),
            candidates: vec![candidate("a", 1, "0110"), candidate("b", 2, "1111")],
            fetched: vec![],
        };
        assert_eq!(pick_displayed(&state).unwrap().id, "b");
    }

    #[test]
    fn test_pattern_breaks_structural_tie() {
        let state = PageState {
            locked_pattern: "0110".into(),
            candidates: vec![candidate("a", 1, "1111"), candidate("b", 1, "0110")],
            fetched: vec!["https://x/a.json".into()],
        };
        assert_eq!(pick_displayed(&state).unwrap().id, "b");
    }

    #[test]
    fn test_recency_breaks_pattern_tie() {
        let state = PageState {
            locked_pattern: String::new(),
            candidates: vec![candidate("a", 1, ""), candidate("b", 1, "")],
            fetched: vec!["https://x/b.json".into(), "https://x/a.json".into()],
        };
        assert_eq!(pick_displayed(&state).unwrap().id, "a");
    }

    #[test]
    fn test_full_tie_prefers_first_and_unmatched_are_ignored() {
        let state = PageState {
            locked_pattern: String::new(),
            candidates: vec![candidate("z", 0, ""), candidate("a", 1, ""), candidate("b", 1, "")],
            fetched: vec![],
        };
        assert_eq!(pick_displayed(&state).unwrap().id, "a");

        let none = PageState {
            locked_pattern: String::new(),
            candidates: vec![candidate("z", 0, "")],
            fetched: vec![],
        };
        assert!(pick_displayed(&none).is_none());
    }
}
