//! # FBi Radio Feeds
//!
//! A batch pipeline that scrapes episode listings and audio links from
//! FBi Radio program pages and writes one podcast-compatible RSS feed file
//! per program.
//!
//! ## Usage
//!
//! ```sh
//! fbi_radio_feeds -o ./feeds
//! ```
//!
//! ## Architecture
//!
//! One-shot and strictly sequential: each program is processed wholly before
//! the next, and every page fetch within a program happens one at a time.
//! Per program:
//! 1. **Fetch**: Download the program page
//! 2. **Extract**: Recover structured data, episode records, cover image,
//!    and per-episode audio locators through layered heuristic fallbacks
//! 3. **Emit**: Write a sorted RSS 2.0 document with podcast extensions
//!
//! Fetch failures and unparseable pages are logged and skipped; a run only
//! fails on environment problems such as an unwritable output directory.

use std::error::Error;
use std::time::Duration;

use clap::Parser;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cli;
mod extract;
mod fetch;
mod models;
mod outputs;
mod programs;
mod scrape;
mod utils;

use cli::Cli;
use models::ProgramIdentity;
use scrape::ProgramScraper;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("fbi_radio_feeds starting up");

    let args = Cli::parse();
    debug!(?args.output_dir, ?args.programs, args.timeout_secs, "Parsed CLI arguments");

    // Early check: ensure the output dir is writable
    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let roster: Vec<ProgramIdentity> = programs::ROSTER
        .iter()
        .filter(|(slug, _)| args.programs.is_empty() || args.programs.iter().any(|p| p == slug))
        .map(|(slug, name)| ProgramIdentity::new(slug, name))
        .collect();

    if roster.is_empty() {
        warn!(requested = ?args.programs, "No rostered programs match the filter");
        return Ok(());
    }
    info!(count = roster.len(), "Programs to process");

    let mut feeds_written = 0usize;
    let mut total_episodes = 0usize;

    // Strictly sequential: one program at a time, one request at a time.
    for identity in roster {
        info!(program = %identity.slug, name = %identity.name, "Processing program");

        let client = match fetch::build_client(Duration::from_secs(args.timeout_secs)) {
            Ok(client) => client,
            Err(e) => {
                error!(error = %e, "Failed to build HTTP client");
                return Err(e.into());
            }
        };

        let mut scraper = ProgramScraper::new(client, identity.clone());
        let scrape = scraper.collect().await;

        if scrape.episodes.is_empty() {
            warn!(program = %identity.slug, "No episodes found; skipping program");
            continue;
        }

        match outputs::feed::write_feed(
            &identity.slug,
            &scrape.display_name,
            &identity.url,
            scrape.cover_image.as_deref(),
            &scrape.episodes,
            &args.output_dir,
        )
        .await
        {
            Ok(path) => {
                info!(
                    program = %identity.slug,
                    episodes = scrape.episodes.len(),
                    path = %path.display(),
                    "Feed written"
                );
                feeds_written += 1;
                total_episodes += scrape.episodes.len();
            }
            Err(e) => {
                error!(program = %identity.slug, error = %e, "Failed writing feed");
            }
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        feeds_written,
        total_episodes,
        "Execution complete"
    );

    Ok(())
}
