//! Crossword Scraper: multi-source crossword extraction, permission gating and grid deduplication.

pub mod convert;
pub mod debug_log;
pub mod dedup;
pub mod error;
pub mod frames;
pub mod http;
pub mod orchestrator;
pub mod permissions;
pub mod remote;
pub mod sources;
pub mod types;

pub use convert::{FormatConverter, PuzzleConverter};
pub use debug_log::{DebugLog, RunInfo};
pub use dedup::{is_duplicate, AcceptedGrids, DUPLICATE_THRESHOLD};
pub use error::{ConvertError, ExecutionError, HttpError, ScrapeError, ScrapeResult};
pub use frames::{enumerate_frames, filter_frames, FrameSource, Frames};
pub use http::{Fetcher, HttpClient};
pub use orchestrator::{run_extraction, Capabilities, ExtractionConfig, ExtractionReport};
pub use permissions::{permissions_for_urls, GrantedPermissions, MatchPattern, PermissionGate};
pub use remote::{CookieStore, NoCookies, PageScript, RemoteExecutor};
pub use sources::{ScrapeContext, ScrapeOutcome, Source, SourceRegistry, DEFAULT_PROMPT};
pub use types::*;
