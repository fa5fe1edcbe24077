//! Crossword Scraper command-line front end: drives headless Chromium through the extraction pipeline.

pub mod browser;
pub mod config;
pub mod prompt;
pub mod report;
pub mod session;

pub use browser::ChromiumTab;
pub use config::{resolve_chromium_path, resolve_grants, resolve_output_dir};
pub use prompt::{DenyAll, GrantPrompt, TerminalPrompt};
pub use report::{save_debug_log, save_payloads, RunSummary};
pub use session::ScrapeSession;
