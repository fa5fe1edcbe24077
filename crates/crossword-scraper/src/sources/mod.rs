//! Per-publisher extraction strategies.
//!
//! Each strategy implements [`Source`]. Publisher-specific page inspection stays private to
//! its module; the orchestrator only sees names, match predicates, permission patterns and
//! [`ScrapeOutcome`]s.

mod amuse_labs;
mod boston_globe;
mod cnn;
mod crosshare;
mod crossword_compiler;
mod crossword_nexus;
mod crosswordr;
mod daily_princetonian;
mod go_comics;
mod guardian;
mod new_york_times;
mod new_yorker;
mod puzzle_link;
mod puzzle_society;
mod pzzl;
mod registry;
mod the_week;
mod uclick;
mod universal;
mod wall_street_journal;
mod washington_post;
mod world_of_crosswords;
mod xword_info;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{ScrapeError, ScrapeResult};
use crate::orchestrator::Capabilities;
use crate::permissions::permissions_for_urls;
use crate::remote::PageScript;
use crate::types::{Frame, FrameId, RawPayload, TabId};

pub use amuse_labs::AmuseLabsSource;
pub use boston_globe::BostonGlobeSource;
pub use cnn::CnnSource;
pub use crosshare::CrosshareSource;
pub use crossword_compiler::CrosswordCompilerSource;
pub use crossword_nexus::CrosswordNexusSource;
pub use crosswordr::CrosswordrSource;
pub use daily_princetonian::DailyPrincetonianSource;
pub use go_comics::GoComicsSource;
pub use guardian::GuardianSource;
pub use new_york_times::NewYorkTimesSource;
pub use new_yorker::NewYorkerSource;
pub use puzzle_link::PuzzleLinkSource;
pub use puzzle_society::PuzzleSocietySource;
pub use pzzl::PzzlSource;
pub use registry::SourceRegistry;
pub use the_week::TheWeekSource;
pub use universal::UniversalSource;
pub use wall_street_journal::WallStreetJournalSource;
pub use washington_post::WashingtonPostSource;
pub use world_of_crosswords::WorldOfCrosswordsSource;
pub use xword_info::XWordInfoSource;

/// Prompt shown for a permission request when the source does not supply one.
pub const DEFAULT_PROMPT: &str = "Grant permission";

/// Result of running one strategy against one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeOutcome {
    /// Zero or more payloads. Zero is the common "no puzzle here" case.
    Success(Vec<RawPayload>),
    NeedPermissions {
        permissions: Vec<String>,
        prompt: String,
    },
    Error(String),
}

impl ScrapeOutcome {
    pub fn nothing() -> Self {
        ScrapeOutcome::Success(Vec::new())
    }

    pub fn found(payload: RawPayload) -> Self {
        ScrapeOutcome::Success(vec![payload])
    }

    pub fn need_permissions(permissions: Vec<String>) -> Self {
        Self::need_permissions_with_prompt(permissions, DEFAULT_PROMPT)
    }

    pub fn need_permissions_with_prompt(permissions: Vec<String>, prompt: impl Into<String>) -> Self {
        ScrapeOutcome::NeedPermissions {
            permissions,
            prompt: prompt.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ScrapeOutcome::Error(message.into())
    }
}

impl From<ScrapeOutcome> for Vec<ScrapeOutcome> {
    fn from(outcome: ScrapeOutcome) -> Self {
        vec![outcome]
    }
}

/// One step of a strategy's fallback chain.
pub(crate) enum Attempt {
    /// The chain stops here with these outcomes.
    Finished(Vec<ScrapeOutcome>),
    /// Nothing conclusive; try the next step.
    Continue,
}

impl From<ScrapeOutcome> for Attempt {
    fn from(outcome: ScrapeOutcome) -> Self {
        Attempt::Finished(vec![outcome])
    }
}

/// Everything a strategy may use while extracting from one frame.
pub struct ScrapeContext<'a> {
    pub tab_id: TabId,
    pub frame: &'a Frame,
    pub url: Url,
    caps: Capabilities<'a>,
}

impl<'a> ScrapeContext<'a> {
    pub fn new(tab_id: TabId, frame: &'a Frame, url: Url, caps: Capabilities<'a>) -> Self {
        Self {
            tab_id,
            frame,
            url,
            caps,
        }
    }

    pub fn frame_id(&self) -> FrameId {
        self.frame.frame_id
    }

    pub fn is_top_level(&self) -> bool {
        self.frame.is_top_level()
    }

    /// Run a script in this frame. An empty string means the script found nothing.
    pub async fn run_script(&self, script: &PageScript) -> ScrapeResult<String> {
        tracing::trace!(frame_id = self.frame_id(), script = script.name, "Executing page script");
        Ok(self
            .caps
            .executor
            .execute(self.tab_id, self.frame_id(), script)
            .await?)
    }

    /// Run a script returning JSON. `None` if the script found nothing.
    pub async fn run_script_json<T: DeserializeOwned>(
        &self,
        script: &PageScript,
    ) -> ScrapeResult<Option<T>> {
        let text = self.run_script(script).await?;
        if text.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&text)?))
    }

    pub async fn has_permissions(&self, patterns: &[String]) -> bool {
        self.caps.permissions.has_permissions(patterns).await
    }

    /// Check that a fetch of `target` is allowed.
    ///
    /// Same-origin fetches from the top-level frame are implicitly allowed; anything else needs
    /// a granted permission covering the target's origin.
    async fn guard_fetch(&self, target: &str) -> ScrapeResult<()> {
        let parsed = Url::parse(target).map_err(|e| ScrapeError::invalid_url(target, e))?;
        if self.is_top_level() && parsed.origin() == self.url.origin() {
            return Ok(());
        }
        let needed = permissions_for_urls([&parsed]);
        if self.has_permissions(&needed).await {
            return Ok(());
        }
        Err(ScrapeError::PermissionMissing {
            url: target.to_string(),
            permissions: needed,
        })
    }

    pub async fn fetch_text(&self, url: &str, headers: &[(String, String)]) -> ScrapeResult<String> {
        self.guard_fetch(url).await?;
        tracing::debug!(url, "Fetching");
        Ok(self.caps.fetcher.fetch_text(url, headers).await?)
    }

    pub async fn fetch_binary(&self, url: &str, headers: &[(String, String)]) -> ScrapeResult<Vec<u8>> {
        self.guard_fetch(url).await?;
        tracing::debug!(url, "Fetching");
        Ok(self.caps.fetcher.fetch_binary(url, headers).await?)
    }

    /// A cookie for this frame's URL.
    pub async fn cookie(&self, name: &str) -> Option<String> {
        self.caps.cookies.cookie(self.url.as_str(), name).await
    }

    /// Resolve a possibly relative URL against this frame's URL.
    pub fn resolve(&self, href: &str) -> ScrapeResult<Url> {
        self.url
            .join(href)
            .map_err(|e| ScrapeError::invalid_url(href, e))
    }
}

/// A self-contained extraction algorithm for one publisher's page structure.
#[async_trait]
pub trait Source: Send + Sync {
    /// Name shown to users and in permission prompts.
    fn name(&self) -> &'static str;

    /// Whether the page may contain a puzzle for this source. Only matching sources run.
    fn matches(&self, url: &Url) -> bool;

    /// Host permissions needed to read this source's puzzles when embedded in a frame.
    fn needed_permissions(&self, url: &Url) -> Vec<String>;

    /// Extract from the frame.
    ///
    /// Top-level frames are implicitly accessible; embedded frames need
    /// [`Source::needed_permissions`] first, and no page access is attempted without them.
    async fn extract(&self, ctx: &ScrapeContext<'_>) -> ScrapeResult<Vec<ScrapeOutcome>> {
        if !ctx.is_top_level() {
            let needed = self.needed_permissions(&ctx.url);
            if !ctx.has_permissions(&needed).await {
                return Ok(ScrapeOutcome::need_permissions(needed).into());
            }
        }
        self.extract_with_access(ctx).await
    }

    /// Page-specific logic, run once the frame is accessible.
    async fn extract_with_access(&self, ctx: &ScrapeContext<'_>) -> ScrapeResult<Vec<ScrapeOutcome>>;
}

/// Whether the URL's host is `domain` or a subdomain of it.
pub fn host_is_domain_or_subdomain_of(url: &Url, domain: &str) -> bool {
    url.host_str()
        .is_some_and(|host| host == domain || host.ends_with(&format!(".{domain}")))
}

/// Collect a list of static permission patterns.
pub(crate) fn patterns(list: &[&str]) -> Vec<String> {
    list.iter().map(|p| p.to_string()).collect()
}
