//! Librarian Matcher - match media file paths to catalog episodes
//!
//! Usage: librarian-matcher [--strict] [--base-url URL] PATH...
//!
//! Prints one JSON line per path on stdout; logs go to stderr.

mod cli;

use std::sync::Arc;

use librarian_matcher::{Config, EpisodeMatcher, PatternLibrary, TvMazeClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::CliOptions;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let options = CliOptions::from_args()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "librarian_matcher=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let mut config = Config::from_env()?;
    if let Some(base_url) = options.base_url_override {
        config.set_base_url(base_url, "--base-url")?;
    }
    if options.strict {
        config.strict_numbers = true;
    }
    tracing::debug!(config = ?config, "Configuration loaded");

    let resolver = TvMazeClient::new(&config.tvmaze_base_url, config.rate_limit(), config.retry())?;
    let matcher = EpisodeMatcher::new(
        PatternLibrary::standard()?,
        Arc::new(resolver),
        config.matcher_config(),
    );

    if options.paths.is_empty() {
        tracing::warn!("No paths given");
    }

    for path in &options.paths {
        let line = match matcher.match_path(path).await {
            Ok(episodes) => serde_json::json!({ "path": path, "episodes": episodes }),
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Failed to match file");
                serde_json::json!({ "path": path, "error": e.to_string() })
            }
        };
        println!("{}", line);
    }

    Ok(())
}
