//! Out-of-band HTTP fetching.
//!
//! Handles redirects, timeouts, retry on 5xx and transport errors, and backoff on 429.
//! Any final non-2xx status is an error carrying the URL.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::HttpError;

/// HTTP GET capability used by sources for secondary fetches.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch_text(&self, url: &str, headers: &[(String, String)]) -> Result<String, HttpError>;

    async fn fetch_binary(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<Vec<u8>, HttpError>;
}

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                          AppleWebKit/537.36 (KHTML, like Gecko) \
                          Chrome/131.0.0.0 Safari/537.36";

const MAX_RETRIES: u32 = 2;

/// reqwest-backed [`Fetcher`].
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    /// HTTP/1.1-only fallback client for hosts that reject HTTP/2.
    h1_client: reqwest::Client,
    retry_base: Duration,
}

impl HttpClient {
    /// Create a client with a desktop Chrome user agent.
    pub fn new(timeout_ms: u64) -> Self {
        Self::with_user_agent(timeout_ms, USER_AGENT)
    }

    pub fn with_user_agent(timeout_ms: u64, user_agent: &str) -> Self {
        let build = |http1_only: bool| {
            let builder = reqwest::Client::builder()
                .timeout(Duration::from_millis(timeout_ms))
                .redirect(reqwest::redirect::Policy::limited(5))
                .user_agent(user_agent);
            let builder = if http1_only {
                builder.http1_only()
            } else {
                builder
            };
            builder.build().unwrap_or_default()
        };

        Self {
            client: build(false),
            h1_client: build(true),
            retry_base: Duration::from_millis(500),
        }
    }

    /// Override the base delay between retries.
    pub fn with_retry_base(mut self, retry_base: Duration) -> Self {
        self.retry_base = retry_base;
        self
    }

    async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<reqwest::Response, HttpError> {
        match self.get_inner(&self.client, url, headers).await {
            Err(HttpError::Transport { message, .. })
                if message.contains("http2")
                    || message.contains("protocol")
                    || message.contains("connection closed") =>
            {
                tracing::debug!(url, "Retrying over HTTP/1.1");
                self.get_inner(&self.h1_client, url, headers).await
            }
            other => other,
        }
    }

    async fn get_inner(
        &self,
        client: &reqwest::Client,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<reqwest::Response, HttpError> {
        let mut retries = 0u32;

        loop {
            let mut request = client.get(url);
            for (name, value) in headers {
                request = request.header(name.as_str(), value.as_str());
            }

            match request.send().await {
                Ok(resp) => {
                    let status = resp.status().as_u16();

                    if status >= 500 && retries < MAX_RETRIES {
                        retries += 1;
                        tokio::time::sleep(self.backoff(retries)).await;
                        continue;
                    }

                    if status == 429 && retries < MAX_RETRIES {
                        retries += 1;
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|s| s.parse::<u64>().ok())
                            .map(|secs| Duration::from_secs(secs.min(10)))
                            .unwrap_or_else(|| self.backoff(retries));
                        tokio::time::sleep(retry_after).await;
                        continue;
                    }

                    if !resp.status().is_success() {
                        return Err(HttpError::Status {
                            url: url.to_string(),
                            status,
                        });
                    }
                    return Ok(resp);
                }
                Err(e) => {
                    if retries < MAX_RETRIES && !e.is_builder() {
                        retries += 1;
                        tokio::time::sleep(self.backoff(retries)).await;
                        continue;
                    }
                    return Err(transport(url, &e));
                }
            }
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.retry_base * 2u32.pow(attempt - 1)
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new(30_000)
    }
}

fn transport(url: &str, e: &reqwest::Error) -> HttpError {
    HttpError::Transport {
        url: url.to_string(),
        message: format!("{e}"),
    }
}

#[async_trait]
impl Fetcher for HttpClient {
    async fn fetch_text(&self, url: &str, headers: &[(String, String)]) -> Result<String, HttpError> {
        let resp = self.get(url, headers).await?;
        resp.text().await.map_err(|e| transport(url, &e))
    }

    async fn fetch_binary(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<Vec<u8>, HttpError> {
        let resp = self.get(url, headers).await?;
        resp.bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| transport(url, &e))
    }
}
