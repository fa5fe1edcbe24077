//! A headless Chromium tab exposed as the pipeline's browser capabilities.
//!
//! The loaded page is the top-level frame. Each `<iframe src>` becomes a child frame, which is
//! opened in its own page the first time a script needs to run there.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::Mutex;

use crossword_scraper::{
    CookieStore, ExecutionError, Frame, FrameId, FrameSource, PageScript, RemoteExecutor, ScrapeError, ScrapeResult,
    TabId,
};

const TAB_ID: TabId = 1;
const TOP_FRAME_ID: FrameId = 0;

const IFRAME_SOURCES: &str = "Array.from(document.querySelectorAll('iframe[src]'))\
                              .map(function(f) { return f.src; })\
                              .filter(function(src) { return /^https?:/.test(src); })";

/// Convert a script's return value to the string contract: `null`/`undefined` mean nothing found.
pub fn script_output(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Whether a cookie set for `domain` is sent to `host`.
pub fn cookie_domain_matches(domain: &str, host: &str) -> bool {
    let domain = domain.trim_start_matches('.');
    host == domain || host.ends_with(&format!(".{domain}"))
}

pub struct ChromiumTab {
    browser: Browser,
    page: Page,
    timeout: Duration,
    /// Child frames discovered by the last enumeration.
    frames: Mutex<HashMap<FrameId, String>>,
    /// Pages opened for child frames.
    frame_pages: Mutex<HashMap<FrameId, Page>>,
}

impl ChromiumTab {
    /// Launch headless Chromium and load `url`.
    pub async fn open(chrome_path: PathBuf, url: &str, timeout: Duration) -> Result<Self> {
        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let page = load(&browser, url, timeout).await?;
        Ok(Self {
            browser,
            page,
            timeout,
            frames: Mutex::new(HashMap::new()),
            frame_pages: Mutex::new(HashMap::new()),
        })
    }

    pub async fn close(mut self) {
        for (_, page) in self.frame_pages.into_inner() {
            let _ = page.close().await;
        }
        let _ = self.page.close().await;
        let _ = self.browser.close().await;
    }

    async fn page_for(&self, frame_id: FrameId) -> Result<Page> {
        if frame_id == TOP_FRAME_ID {
            return Ok(self.page.clone());
        }
        let mut pages = self.frame_pages.lock().await;
        if let Some(page) = pages.get(&frame_id) {
            return Ok(page.clone());
        }
        let url = self
            .frames
            .lock()
            .await
            .get(&frame_id)
            .cloned()
            .with_context(|| format!("unknown frame {frame_id}"))?;
        tracing::debug!(frame_id, url, "Opening frame in its own page");
        let page = load(&self.browser, &url, self.timeout).await?;
        pages.insert(frame_id, page.clone());
        Ok(page)
    }

    async fn top_level_url(&self) -> Result<String> {
        Ok(self
            .page
            .url()
            .await
            .context("failed to get URL")?
            .map(|u| u.to_string())
            .unwrap_or_default())
    }
}

async fn load(browser: &Browser, url: &str, timeout: Duration) -> Result<Page> {
    let page = match tokio::time::timeout(timeout, browser.new_page(url)).await {
        Ok(page) => page.with_context(|| format!("failed to open {url}"))?,
        Err(_) => bail!("loading {url} timed out after {}ms", timeout.as_millis()),
    };
    let _ = tokio::time::timeout(timeout, page.wait_for_navigation()).await;
    Ok(page)
}

#[async_trait]
impl FrameSource for ChromiumTab {
    async fn active_tab(&self) -> ScrapeResult<TabId> {
        Ok(TAB_ID)
    }

    async fn all_frames(&self, _tab_id: TabId) -> ScrapeResult<Vec<Frame>> {
        let top_url = self
            .top_level_url()
            .await
            .map_err(|e| ScrapeError::Enumeration(format!("{e:#}")))?;
        let iframes: Vec<String> = self
            .page
            .evaluate(IFRAME_SOURCES)
            .await
            .map_err(|e| ScrapeError::Enumeration(e.to_string()))?
            .into_value()
            .map_err(|e| ScrapeError::Enumeration(format!("unexpected iframe list: {e:?}")))?;

        let mut known = self.frames.lock().await;
        known.clear();
        let mut frames = vec![Frame::top_level(TOP_FRAME_ID, top_url)];
        for (index, src) in iframes.into_iter().enumerate() {
            let frame_id = index as FrameId + 1;
            known.insert(frame_id, src.clone());
            frames.push(Frame::new(frame_id, TOP_FRAME_ID, src));
        }
        Ok(frames)
    }
}

#[async_trait]
impl RemoteExecutor for ChromiumTab {
    async fn execute(
        &self,
        _tab_id: TabId,
        frame_id: FrameId,
        script: &PageScript,
    ) -> Result<String, ExecutionError> {
        let failure = |message: String| ExecutionError {
            frame_id,
            script: script.name.to_string(),
            message,
        };
        let page = self.page_for(frame_id).await.map_err(|e| failure(format!("{e:#}")))?;
        let result = page
            .evaluate(script.invocation())
            .await
            .map_err(|e| failure(e.to_string()))?;
        Ok(script_output(result.value()))
    }
}

#[async_trait]
impl CookieStore for ChromiumTab {
    async fn cookie(&self, url: &str, name: &str) -> Option<String> {
        let host = url::Url::parse(url).ok()?.host_str()?.to_string();
        let cookies = match self.page.get_cookies().await {
            Ok(cookies) => cookies,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read cookies");
                return None;
            }
        };
        cookies
            .into_iter()
            .find(|c| c.name == name && cookie_domain_matches(&c.domain, &host))
            .map(|c| c.value)
    }
}
