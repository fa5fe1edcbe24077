//! Crossword Scraper: entry point.

use std::time::Duration;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crossword_scraper::{ExtractionConfig, GrantedPermissions, HttpClient, SourceRegistry};
use crossword_scraper_cli::{
    resolve_chromium_path, resolve_grants, resolve_output_dir, save_debug_log, save_payloads, ChromiumTab, DenyAll,
    GrantPrompt, RunSummary, ScrapeSession, TerminalPrompt,
};

#[derive(Parser)]
#[command(
    name = "crossword-scraper",
    about = "Extract crossword puzzles from publisher web pages",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a page in headless Chromium and extract its puzzles.
    Scrape {
        /// Page URL.
        url: String,

        /// Path to the Chromium binary.
        /// Also reads from CROSSWORD_SCRAPER_CHROMIUM.
        #[arg(long)]
        chromium: Option<String>,

        /// Directory for saved puzzles and debug logs.
        /// Also reads from CROSSWORD_SCRAPER_OUTPUT.
        #[arg(short, long)]
        output: Option<String>,

        /// Pre-grant a host permission pattern (repeatable).
        /// Also reads a comma-separated list from CROSSWORD_SCRAPER_GRANTS.
        #[arg(long = "grant")]
        grants: Vec<String>,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,

        /// Never prompt for permissions; report requests instead.
        #[arg(long)]
        no_prompt: bool,

        /// Do not save puzzle files.
        #[arg(long)]
        no_save: bool,

        /// Save the debug log next to the puzzles.
        #[arg(long)]
        debug_log: bool,

        /// Page load and HTTP timeout in milliseconds.
        #[arg(long, default_value_t = 30_000)]
        timeout_ms: u64,
    },

    /// List the built-in sources in registry order.
    Sources,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   crossword-scraper completions bash > ~/.local/share/bash-completion/completions/crossword-scraper
    ///   crossword-scraper completions zsh > ~/.zfunc/_crossword-scraper
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Scrape {
            url,
            chromium,
            output,
            grants,
            json,
            no_prompt,
            no_save,
            debug_log,
            timeout_ms,
        } => {
            let chrome = resolve_chromium_path(chromium.as_deref())
                .context("Chromium not found. Pass --chromium or set CROSSWORD_SCRAPER_CHROMIUM.")?;
            let output_dir = resolve_output_dir(output.as_deref());
            let granted = GrantedPermissions::from_patterns(resolve_grants(&grants));

            let timeout = Duration::from_millis(timeout_ms);
            let tab = ChromiumTab::open(chrome, &url, timeout).await?;
            let fetcher = HttpClient::new(timeout_ms);
            let registry = SourceRegistry::standard();
            let config = ExtractionConfig::default();
            let session = ScrapeSession {
                browser: &tab,
                fetcher: &fetcher,
                grants: &granted,
                registry: &registry,
                config: &config,
            };

            let mut prompt: Box<dyn GrantPrompt> = if no_prompt || json {
                Box::new(DenyAll)
            } else {
                Box::new(TerminalPrompt::new()?)
            };
            let result = session.run(prompt.as_mut()).await;
            tab.close().await;
            let report = result?;

            let mut summary = RunSummary::new(&url, &report.results);
            if !no_save {
                summary.set_saved_paths(save_payloads(&output_dir, &report.results)?);
            }
            if debug_log {
                summary.debug_log = Some(save_debug_log(&output_dir, &report.debug_log)?);
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                summary.print_pretty();
            }
        }

        Commands::Sources => {
            for (index, name) in SourceRegistry::standard().names().iter().enumerate() {
                println!("{:>3}. {name}", index + 1);
            }
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(
                shell,
                &mut cmd,
                "crossword-scraper",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}
