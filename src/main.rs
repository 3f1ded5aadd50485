//! # Market Monitor
//!
//! An interactive market-news analyst. The user gives a search topic and an
//! analysis directive; the application finds matching news through SerpApi,
//! scrapes and cleans the articles, and asks an OpenAI chat model for an
//! executive analysis. Follow-up questions continue the same conversation
//! and the latest answer can be exported as a PDF report.
//!
//! ## Usage
//!
//! ```sh
//! SERPAPI_API_KEY=... OPENAI_API_KEY=sk-... market_monitor --report-dir ./relatorios
//! ```
//!
//! ## Architecture
//!
//! Each analysis runs a small pipeline:
//! 1. **Search**: topic → article links (memoized for one hour)
//! 2. **Fetching**: download and clean the articles (5 at a time)
//! 3. **Prompting**: topic, directive and up to 8000 characters of text
//! 4. **Conversation**: the full message history is replayed to the model
//! 5. **Report**: optional PDF export of the latest answer

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod console;
mod conversation;
mod error;
mod models;
mod outputs;
mod prompt;
mod scrapers;
mod search;
mod session;
mod utils;

use api::OpenAiChat;
use cli::{Cli, Settings};
use console::Console;
use error::ConfigError;
use scrapers::article::ArticleExtractor;
use search::{CACHE_TTL, Memoized, SerpApiNews};
use session::Session;
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("market_monitor starting up");

    if let Err(e) = dotenvy::dotenv() {
        debug!(error = %e, "No .env file loaded");
    }

    // Parse CLI
    let args = Cli::parse();
    debug!(report_dir = %args.report_dir, config = ?args.config, "Parsed CLI arguments");

    let settings = match Settings::from_cli(args) {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "Invalid configuration; halting");
            eprintln!("Erro de configuração: {e}");
            return Err(e.into());
        }
    };
    info!(model = %settings.sampling.model, "Configuration loaded");

    // Early check: ensure the report dir is writable
    if let Err(source) = ensure_writable_dir(&settings.report_dir).await {
        let e = ConfigError::ReportDir {
            path: settings.report_dir.clone(),
            source,
        };
        error!(error = %e, "Report directory is not writable (fix perms or choose a different path)");
        eprintln!("Erro de configuração: {e}");
        return Err(e.into());
    }

    let search = Memoized::new(
        SerpApiNews::new(&settings.search_url, &settings.serpapi_key)?,
        CACHE_TTL,
    );
    let extractor = ArticleExtractor::new()?;
    let model = OpenAiChat::new(&settings.api_url, &settings.openai_api_key, settings.sampling.clone())?;
    let mut session = Session::new(search, extractor, model);

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut console = Console::new(stdin, std::io::stdout(), &settings.report_dir);
    console.run(&mut session).await?;

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        messages = session.conversation().len(),
        "Execution complete"
    );
    Ok(())
}
