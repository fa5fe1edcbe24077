//! Shared fakes for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use url::Url;

use crossword_scraper::{
    run_extraction, Capabilities, CookieStore, ExecutionError, ExtractionConfig, ExtractionReport, Fetcher, Frame,
    FrameId, FormatConverter, GrantedPermissions, HttpError, PageScript, PermissionGate, RemoteExecutor,
    ScrapeContext, ScrapeOutcome, ScrapeResult, Source, SourceRegistry, TabId,
};

pub const TAB: TabId = 11;

// ─────────────────────── page scripts ───────────────────────

/// Answers scripts by name, per frame. Unknown scripts find nothing.
#[derive(Default)]
pub struct ScriptedPage {
    answers: HashMap<(FrameId, String), Result<String, String>>,
    calls: Mutex<Vec<(FrameId, String)>>,
    sources: Mutex<HashMap<String, String>>,
}

impl ScriptedPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, frame_id: FrameId, script: &str, result: impl Into<String>) -> Self {
        self.answers
            .insert((frame_id, script.to_string()), Ok(result.into()));
        self
    }

    pub fn fail(mut self, frame_id: FrameId, script: &str, message: &str) -> Self {
        self.answers
            .insert((frame_id, script.to_string()), Err(message.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<(FrameId, String)> {
        self.calls.lock().unwrap().clone()
    }

    /// Body of the last script executed under `name`.
    pub fn source_of(&self, name: &str) -> Option<String> {
        self.sources.lock().unwrap().get(name).cloned()
    }
}

#[async_trait]
impl RemoteExecutor for ScriptedPage {
    async fn execute(
        &self,
        _tab_id: TabId,
        frame_id: FrameId,
        script: &PageScript,
    ) -> Result<String, ExecutionError> {
        self.calls
            .lock()
            .unwrap()
            .push((frame_id, script.name.to_string()));
        self.sources
            .lock()
            .unwrap()
            .insert(script.name.to_string(), script.source.to_string());
        match self.answers.get(&(frame_id, script.name.to_string())) {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(message)) => Err(ExecutionError {
                frame_id,
                script: script.name.to_string(),
                message: message.clone(),
            }),
            None => Ok(String::new()),
        }
    }
}

// ─────────────────────── network ───────────────────────

/// Serves fixed bodies by URL; everything else is a 404.
#[derive(Default)]
pub struct StaticWeb {
    bodies: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl StaticWeb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(url.to_string(), body.into());
        self
    }

    pub fn requests(&self) -> Vec<(String, Vec<(String, String)>)> {
        self.requests.lock().unwrap().clone()
    }

    fn get(&self, url: &str, headers: &[(String, String)]) -> Result<Vec<u8>, HttpError> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), headers.to_vec()));
        self.bodies.get(url).cloned().ok_or_else(|| HttpError::Status {
            url: url.to_string(),
            status: 404,
        })
    }
}

#[async_trait]
impl Fetcher for StaticWeb {
    async fn fetch_text(&self, url: &str, headers: &[(String, String)]) -> Result<String, HttpError> {
        self.get(url, headers)
            .map(|body| String::from_utf8_lossy(&body).into_owned())
    }

    async fn fetch_binary(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<Vec<u8>, HttpError> {
        self.get(url, headers)
    }
}

// ─────────────────────── permissions and cookies ───────────────────────

/// Wraps [`GrantedPermissions`] and counts checks.
#[derive(Default)]
pub struct CountingGate {
    pub granted: GrantedPermissions,
    checks: AtomicUsize,
}

impl CountingGate {
    pub fn with(patterns: &[&str]) -> Self {
        Self {
            granted: GrantedPermissions::from_patterns(patterns),
            checks: AtomicUsize::new(0),
        }
    }

    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionGate for CountingGate {
    async fn has_permissions(&self, patterns: &[String]) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.granted.has_permissions(patterns).await
    }

    async fn request_permissions(&self, patterns: &[String]) -> bool {
        self.granted.request_permissions(patterns).await
    }
}

#[derive(Default)]
pub struct Jar(pub HashMap<String, String>);

#[async_trait]
impl CookieStore for Jar {
    async fn cookie(&self, _url: &str, name: &str) -> Option<String> {
        self.0.get(name).cloned()
    }
}

// ─────────────────────── sources ───────────────────────

/// A source on `*.example.com` that returns canned outcomes and counts its invocations.
pub struct StubSource {
    pub name: &'static str,
    pub host: &'static str,
    pub outcomes: Vec<ScrapeOutcome>,
    pub invocations: Arc<AtomicUsize>,
}

impl StubSource {
    pub fn new(name: &'static str, outcomes: Vec<ScrapeOutcome>) -> Self {
        Self {
            name,
            host: "example.com",
            outcomes,
            invocations: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn on_host(mut self, host: &'static str) -> Self {
        self.host = host;
        self
    }
}

#[async_trait]
impl Source for StubSource {
    fn name(&self) -> &'static str {
        self.name
    }

    fn matches(&self, url: &Url) -> bool {
        url.host_str()
            .is_some_and(|h| h == self.host || h.ends_with(&format!(".{}", self.host)))
    }

    fn needed_permissions(&self, _url: &Url) -> Vec<String> {
        vec![format!("https://*.{}/*", self.host)]
    }

    async fn extract_with_access(&self, _ctx: &ScrapeContext<'_>) -> ScrapeResult<Vec<ScrapeOutcome>> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        Ok(self.outcomes.clone())
    }
}

// ─────────────────────── helpers ───────────────────────

/// An xd document with the given title and grid rows.
pub fn xd(title: &str, rows: &[&str]) -> String {
    format!(
        "Title: {title}\nAuthor: Test Setter\n\n\n{}\n\n\nA1. First ~ {}\n",
        rows.join("\n"),
        rows[0]
    )
}

pub struct Harness {
    pub page: ScriptedPage,
    pub web: StaticWeb,
    pub gate: CountingGate,
    pub cookies: Jar,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            page: ScriptedPage::new(),
            web: StaticWeb::new(),
            gate: CountingGate::default(),
            cookies: Jar::default(),
        }
    }

    pub fn capabilities(&self) -> Capabilities<'_> {
        Capabilities {
            executor: &self.page,
            fetcher: &self.web,
            permissions: &self.gate,
            cookies: &self.cookies,
        }
    }

    pub async fn run(&self, frames: &[Frame], registry: &SourceRegistry) -> ExtractionReport {
        run_extraction(
            TAB,
            frames,
            registry,
            &FormatConverter,
            self.capabilities(),
            &ExtractionConfig::default(),
        )
        .await
    }
}
