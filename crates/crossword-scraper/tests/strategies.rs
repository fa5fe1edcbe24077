//! Built-in sources driven through the full pipeline with scripted pages.

mod common;

use common::*;
use chrono::NaiveDate;
use serde_json::json;

use crossword_scraper::{Frame, ProcessedResult, RawPayload, SourceRegistry, DEFAULT_PROMPT};

const GUARDIAN_PROPS: &str = r#"{
    "name": "Quick crossword No 16,789",
    "creator": {"name": "Pasquale"},
    "dimensions": {"cols": 3, "rows": 3},
    "entries": [
        {"position": {"x": 0, "y": 0}, "direction": "across", "length": 3, "solution": "CAT"},
        {"position": {"x": 0, "y": 0}, "direction": "down", "length": 3, "solution": "COW"}
    ]
}"#;

/// The same grid as [`GUARDIAN_PROPS`], as iPuz.
const SAME_GRID_IPUZ: &str = r##"{
    "version": "http://ipuz.org/v2",
    "kind": ["http://ipuz.org/crossword#1"],
    "dimensions": {"width": 3, "height": 3},
    "title": "Mirror",
    "puzzle": [[1, 2, 3], [4, "#", "#"], [5, "#", "#"]],
    "solution": [["C", "A", "T"], ["O", "#", "#"], ["W", "#", "#"]]
}"##;

const MINI_IPUZ: &str = r##"{
    "version": "http://ipuz.org/v2",
    "kind": ["http://ipuz.org/crossword#1"],
    "dimensions": {"width": 2, "height": 2},
    "title": "Nexus Mini",
    "author": "Brendan",
    "puzzle": [[1, 2], [3, 0]],
    "solution": [["H", "I"], ["O", "N"]]
}"##;

#[tokio::test]
async fn test_guardian_page() {
    let frames = [Frame::top_level(0, "https://www.theguardian.com/crosswords/quick/16789")];
    let mut harness = Harness::new();
    harness.page = ScriptedPage::new().answer(0, "guardian-crossword-props", GUARDIAN_PROPS);

    let report = harness.run(&frames, &SourceRegistry::standard()).await;

    let successes: Vec<_> = report.results.successes().collect();
    assert_eq!(successes.len(), 1);
    assert_eq!(successes[0].source, "The Guardian");
    assert_eq!(successes[0].puzzle.creator, "Pasquale");
    assert_eq!(successes[0].base_filename(), "Pasquale-QuickCrosswordNo16789");
}

#[tokio::test]
async fn test_earlier_source_wins_duplicate_grid() {
    let frames = [Frame::top_level(0, "https://www.theguardian.com/crosswords/quick/16789")];
    let mut harness = Harness::new();
    harness.page = ScriptedPage::new()
        .answer(0, "guardian-crossword-props", GUARDIAN_PROPS)
        .answer(0, "puzzle-links", r#"["https://files.guardian.net/quick.ipuz"]"#);
    harness.web = StaticWeb::new().serve("https://files.guardian.net/quick.ipuz", SAME_GRID_IPUZ);
    harness.gate = CountingGate::with(&["https://files.guardian.net/*"]);

    let report = harness.run(&frames, &SourceRegistry::standard()).await;

    let sources: Vec<&str> = report.results.successes().map(|s| s.source.as_str()).collect();
    assert_eq!(sources, vec!["The Guardian"]);
    assert!(report
        .debug_log
        .contains("Duplicate grid: source = Puzzle Link, puzzle title = Mirror\n"));
}

#[tokio::test]
async fn test_new_york_times_needs_api_permission() {
    let frames = [Frame::top_level(0, "https://www.nytimes.com/crosswords/game/daily")];
    let mut harness = Harness::new();
    harness.page = ScriptedPage::new().answer(0, "nyt-game-data", r#"{"filename":"daily/2024-03-01"}"#);

    let report = harness.run(&frames, &SourceRegistry::standard()).await;

    let requests: Vec<_> = report.results.permission_requests().collect();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0, "New York Times");
    assert_eq!(
        requests[0].1,
        [
            "https://*.nytimes.com/*".to_string(),
            "https://nyt-games-prd.appspot.com/*".to_string()
        ]
    );
    assert!(harness.web.requests().is_empty());
}

#[tokio::test]
async fn test_new_york_times_api_with_cookie() {
    let api = "https://nyt-games-prd.appspot.com/svc/crosswords/v6/puzzle/daily/2024-03-01.json";
    let frames = [Frame::top_level(0, "https://www.nytimes.com/crosswords/game/daily")];
    let mut harness = Harness::new();
    harness.page = ScriptedPage::new().answer(
        0,
        "nyt-game-data",
        r#"{"filename":"daily/2024-03-01","stream":"daily"}"#,
    );
    harness.web = StaticWeb::new().serve(api, r#"{"body":[]}"#);
    harness.gate = CountingGate::with(&["https://*.nytimes.com/*", "https://nyt-games-prd.appspot.com/*"]);
    harness.cookies.0.insert("NYT-S".into(), "signed-in".into());

    let report = harness.run(&frames, &SourceRegistry::standard()).await;

    let requests = harness.web.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0, api);
    assert_eq!(requests[0].1, vec![("nyt-s".to_string(), "signed-in".to_string())]);
    // The API format has no built-in converter.
    assert_eq!(report.results.errors().collect::<Vec<_>>(), vec!["New York Times"]);
    assert!(report
        .debug_log
        .contains("Conversion of New York Times payloads is not supported"));
}

#[tokio::test]
async fn test_new_york_times_without_cookie_finds_nothing() {
    let frames = [Frame::top_level(0, "https://www.nytimes.com/crosswords/game/daily")];
    let mut harness = Harness::new();
    harness.page = ScriptedPage::new().answer(0, "nyt-game-data", r#"{"filename":"daily/2024-03-01"}"#);
    harness.gate = CountingGate::with(&["https://*.nytimes.com/*", "https://nyt-games-prd.appspot.com/*"]);

    let report = harness.run(&frames, &SourceRegistry::standard()).await;

    assert!(report.results.is_empty());
    assert!(harness.web.requests().is_empty());
}

#[tokio::test]
async fn test_crossword_nexus_query_parameter() {
    let frames = [Frame::top_level(
        0,
        "https://crosswordnexus.com/solve/?puzzle=https://crosswordnexus.com/puzzles/mini.ipuz",
    )];
    let mut harness = Harness::new();
    harness.web = StaticWeb::new().serve("https://crosswordnexus.com/puzzles/mini.ipuz", MINI_IPUZ);
    harness.gate = CountingGate::with(&["https://crosswordnexus.com/*"]);

    let report = harness.run(&frames, &SourceRegistry::standard()).await;

    let successes: Vec<_> = report.results.successes().collect();
    assert_eq!(successes.len(), 1);
    assert_eq!(successes[0].source, "Crossword Nexus");
    assert_eq!(successes[0].display_title(), "Nexus Mini");
    assert!(matches!(successes[0].payload, RawPayload::Ipuz(_)));
}

#[tokio::test]
async fn test_puzzle_link_reports_broken_links_separately() {
    let frames = [Frame::top_level(0, "https://blog.example.org/")];
    let mut harness = Harness::new();
    harness.page = ScriptedPage::new().answer(
        0,
        "puzzle-links",
        r#"["https://files.example.org/mini.ipuz", "https://files.example.org/gone.puz"]"#,
    );
    harness.web = StaticWeb::new().serve("https://files.example.org/mini.ipuz", MINI_IPUZ);
    harness.gate = CountingGate::with(&["https://files.example.org/*"]);

    let report = harness.run(&frames, &SourceRegistry::standard()).await;

    assert_eq!(report.results.successes().count(), 1);
    assert!(report.results.contains(&ProcessedResult::Error {
        source: "Puzzle Link".into()
    }));
    assert!(report.debug_log.contains(
        "Scrape error: source = Puzzle Link, error = HTTP GET error code 404 from URL: https://files.example.org/gone.puz\n"
    ));
}

#[tokio::test]
async fn test_puzzle_links_need_permission_first() {
    let frames = [Frame::top_level(0, "https://blog.example.org/")];
    let mut harness = Harness::new();
    harness.page = ScriptedPage::new().answer(0, "puzzle-links", r#"["https://files.example.org/mini.ipuz"]"#);

    let report = harness.run(&frames, &SourceRegistry::standard()).await;

    let requests: Vec<_> = report.results.permission_requests().collect();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].1, ["https://files.example.org/*".to_string()]);
    assert!(harness.web.requests().is_empty());
}

#[tokio::test]
async fn test_unknown_iframe_is_ignored_by_generic_sources() {
    let frames = [
        Frame::top_level(0, "https://blog.example.org/"),
        Frame::new(1, 0, "https://ads.tracker.net/slot"),
    ];
    let harness = Harness::new();

    let report = harness.run(&frames, &SourceRegistry::standard()).await;

    assert!(report.results.is_empty());
    assert!(harness.page.calls().iter().all(|(frame, _)| *frame == 0));
}

// ─────────────────────── page script failures ───────────────────────

#[tokio::test]
async fn test_wall_street_journal_page_error_is_reported() {
    let frames = [Frame::top_level(0, "https://www.wsj.com/puzzles/crossword/20240301/58213/index.html")];
    let mut harness = Harness::new();
    harness.page = ScriptedPage::new().fail(
        0,
        "wsj-puzzle-json",
        "TypeError: Cannot read properties of undefined (reading 'JSON')",
    );

    let report = harness.run(&frames, &SourceRegistry::standard()).await;

    assert_eq!(report.results.errors().collect::<Vec<_>>(), vec!["Wall Street Journal"]);
    assert!(report
        .debug_log
        .contains("script `wsj-puzzle-json` failed in frame 0: TypeError"));
}

#[tokio::test]
async fn test_wall_street_journal_puzzle() {
    let frames = [Frame::top_level(0, "https://www.wsj.com/puzzles/crossword/20240301/58213/index.html")];
    let puzzle = json!({"data": {
        "copy": {"title": "Turning Point", "byline": "By Mike Shenk"},
        "meta": {"type": "crossword"},
        "grid": [
            [{"Letter": "A", "Blank": ""}, {"Letter": "", "Blank": "blank"}],
            [{"Letter": "B", "Blank": ""}, {"Letter": "C", "Blank": ""}]
        ]
    }});
    let mut harness = Harness::new();
    harness.page = ScriptedPage::new().answer(0, "wsj-puzzle-json", puzzle.to_string());

    let report = harness.run(&frames, &SourceRegistry::standard()).await;

    let successes: Vec<_> = report.results.successes().collect();
    assert_eq!(successes.len(), 1);
    assert_eq!(successes[0].source, "Wall Street Journal");
    assert_eq!(successes[0].base_filename(), "MikeShenk-TurningPoint");
}

// ─────────────────────── fallback chains ───────────────────────

const DAILY_UCLICK_XML: &str = r#"<crossword><Title v="Daily"/><Author v="Eve"/><Width v="2"/><Height v="1"/><AllAnswer v="AB"/></crossword>"#;

/// Streamed GoComics page data naming `slug`, with one level dated 2024-02-29.
fn gocomics_stream(slug: &str) -> String {
    let tree = json!(["$", "div", null, {"children": [{
        "puzzleSlug": slug,
        "levelData": [{
            "issueDate": "2024-02-29T00:00:00",
            "files": [{"url": "https://assets.amuniversal.com/a.xml", "originalFileName": "puzzle.xml"}]
        }]
    }]}]);
    format!("1:HL[\"/style.css\"]\n7:{tree}\n")
}

#[tokio::test]
async fn test_go_comics_refetches_page_when_live_data_is_stale() {
    let page = "https://www.gocomics.com/puzzles/daily-crossword/2024/02/29";
    let refetched = format!(
        "<html><head><script>self.__next_f.push([1,{}])</script></head></html>",
        serde_json::to_string(&gocomics_stream("daily-crossword")).unwrap()
    );
    let frames = [Frame::top_level(0, page)];
    let mut harness = Harness::new();
    harness.page = ScriptedPage::new()
        .answer(0, "gocomics-page-date", "2024-02-29T00:00:00")
        .answer(0, "gocomics-next-f", gocomics_stream("mini"));
    harness.web = StaticWeb::new()
        .serve(page, refetched)
        .serve("https://assets.amuniversal.com/a.xml", DAILY_UCLICK_XML);
    harness.gate = CountingGate::with(&["https://*.gocomics.com/*", "https://*.amuniversal.com/*"]);

    let report = harness.run(&frames, &SourceRegistry::standard()).await;

    let successes: Vec<_> = report.results.successes().collect();
    assert_eq!(successes.len(), 1);
    assert_eq!(successes[0].source, "GoComics");
    assert_eq!(successes[0].display_title(), "Daily");
    assert_eq!(successes[0].puzzle.date, NaiveDate::from_ymd_opt(2024, 2, 29));
    assert_eq!(report.results.errors().count(), 0);
    assert_eq!(report.results.permission_requests().count(), 0);
    let fetched: Vec<String> = harness.web.requests().into_iter().map(|(url, _)| url).collect();
    assert_eq!(fetched, vec![page.to_string(), "https://assets.amuniversal.com/a.xml".to_string()]);
}

fn puzzle_society_data(game: &[&str]) -> String {
    json!({
        "props": {"pageProps": {"gameContent": {"gameLevelDataSets": [{
            "issueDate": "2024-02-29",
            "files": [{"url": "https://assets.amuniversal.com/puzzle.xml", "mimeType": "application/xml"}]
        }]}}},
        "query": {"game": game}
    })
    .to_string()
}

#[tokio::test]
async fn test_puzzle_society_refetches_page_when_live_data_is_stale() {
    let page = "https://www.puzzlesociety.com/crossword-puzzles/daily-crossword";
    let refetched = format!(
        r#"<html><body><script id="__NEXT_DATA__" type="application/json">{}</script></body></html>"#,
        puzzle_society_data(&["crossword-puzzles", "daily-crossword"])
    );
    let frames = [Frame::top_level(0, page)];
    let mut harness = Harness::new();
    harness.page = ScriptedPage::new().answer(
        0,
        "puzzlesociety-next-data",
        puzzle_society_data(&["crossword-puzzles", "modern-crossword"]),
    );
    harness.web = StaticWeb::new()
        .serve(page, refetched)
        .serve("https://assets.amuniversal.com/puzzle.xml", DAILY_UCLICK_XML);
    harness.gate = CountingGate::with(&["https://*.puzzlesociety.com/*", "https://*.amuniversal.com/*"]);

    let report = harness.run(&frames, &SourceRegistry::standard()).await;

    let successes: Vec<_> = report.results.successes().collect();
    assert_eq!(successes.len(), 1);
    assert_eq!(successes[0].source, "Puzzle Society");
    assert_eq!(successes[0].puzzle.date, NaiveDate::from_ymd_opt(2024, 2, 29));
    let fetched: Vec<String> = harness.web.requests().into_iter().map(|(url, _)| url).collect();
    assert_eq!(
        fetched,
        vec![page.to_string(), "https://assets.amuniversal.com/puzzle.xml".to_string()]
    );
}

#[tokio::test]
async fn test_crosshare_title_mismatch_uses_data_route() {
    let data_url = "https://crosshare.org/_next/data/b1/crosswords/abc123.json";
    let stale = json!({"buildId": "b1", "props": {"pageProps": {"puzzle": {
        "title": "Old Puzzle", "authorName": "mike",
        "size": {"rows": 1, "cols": 2}, "grid": ["N", "O"]
    }}}});
    let current = json!({"pageProps": {"puzzle": {
        "title": "New Puzzle", "authorName": "mike",
        "size": {"rows": 2, "cols": 2}, "grid": ["H", "I", "O", "N"]
    }}});
    let frames = [Frame::top_level(0, "https://crosshare.org/crosswords/abc123")];
    let mut harness = Harness::new();
    harness.page = ScriptedPage::new()
        .answer(0, "crosshare-next-data", stale.to_string())
        .answer(0, "document-title", "New Puzzle | Crosshare crossword puzzle");
    harness.web = StaticWeb::new().serve(data_url, current.to_string());
    harness.gate = CountingGate::with(&["https://*.crosshare.org/*"]);

    let report = harness.run(&frames, &SourceRegistry::standard()).await;

    let titles: Vec<&str> = report.results.successes().map(|s| s.display_title()).collect();
    assert_eq!(titles, vec!["New Puzzle"]);
    let fetched: Vec<String> = harness.web.requests().into_iter().map(|(url, _)| url).collect();
    assert_eq!(fetched, vec![data_url.to_string()]);
}

#[tokio::test]
async fn test_puzzle_me_fetches_loader_script() {
    let loader = "https://cdn3.amuselabs.com/pmm/js/c-min.js?v=2";
    let frames = [Frame::top_level(0, "https://cdn3.amuselabs.com/pmm/crossword?id=abc&set=daily")];
    let mut harness = Harness::new();
    harness.page = ScriptedPage::new()
        .answer(0, "amuselabs-rawc", "cmF3Yw==")
        .answer(0, "amuselabs-loader-url", loader);
    harness.web = StaticWeb::new().serve(loader, "var decode = function() {};");

    let report = harness.run(&frames, &SourceRegistry::standard()).await;

    let fetched: Vec<String> = harness.web.requests().into_iter().map(|(url, _)| url).collect();
    assert_eq!(fetched, vec![loader.to_string()]);
    // The rawc payload has no built-in converter.
    assert_eq!(report.results.errors().collect::<Vec<_>>(), vec!["PuzzleMe (Amuse Labs)"]);
    assert!(report
        .debug_log
        .contains("Conversion of PuzzleMe payloads is not supported"));
}

#[tokio::test]
async fn test_blocked_loader_fetch_becomes_permission_request() {
    let frames = [Frame::top_level(0, "https://cdn3.amuselabs.com/pmm/crossword?id=abc&set=daily")];
    let mut harness = Harness::new();
    harness.page = ScriptedPage::new()
        .answer(0, "amuselabs-rawc", "cmF3Yw==")
        .answer(0, "amuselabs-loader-url", "https://static.puzzleme.net/js/c-min.js");

    let report = harness.run(&frames, &SourceRegistry::standard()).await;

    assert!(harness.web.requests().is_empty());
    assert_eq!(report.results.len(), 1);
    assert!(report.results.contains(&ProcessedResult::NeedPermissions {
        source: "PuzzleMe (Amuse Labs)".into(),
        permissions: vec!["https://static.puzzleme.net/*".into()],
        prompt: DEFAULT_PROMPT.into(),
    }));
}

#[tokio::test]
async fn test_xword_info_go_parameters_feed_data_request() {
    let frames = [Frame::top_level(0, "https://www.xwordinfo.com/Solve?date=3/1/2024")];
    let mut harness = Harness::new();
    harness.page = ScriptedPage::new()
        .answer(
            0,
            "xwordinfo-init-script",
            r#"var app = new xwInterAct(); Go({date:"3/1/2024",type:1});"#,
        )
        .answer(0, "xwordinfo-puzzle-data", r#"{"title":"NY Times, Fri, Mar 1, 2024"}"#);

    let report = harness.run(&frames, &SourceRegistry::standard()).await;

    let request = harness.page.source_of("xwordinfo-puzzle-data").unwrap();
    assert!(request.contains(r#"url: "https://www.xwordinfo.com/JSON/data.ashx""#));
    assert!(request.contains(r#"data: {"date":"3/1/2024","type":1}"#));
    // The request runs in the page, not through the fetcher.
    assert!(harness.web.requests().is_empty());
    assert_eq!(report.results.errors().collect::<Vec<_>>(), vec!["XWord Info"]);
}
