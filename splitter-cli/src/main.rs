mod cli;
mod config;
mod error;
mod logging;

use std::io;
use std::process;
use std::time::Duration;

use clap::Parser;
use playlist_splitter::api::{Credentials, TokenProvider, YouTubeClient};
use playlist_splitter::{CheckpointStore, Reconciler, RunOutcome, diagnostics, http};
use tracing::{error, info, warn};

use crate::{
    cli::{Args, Report},
    config::AppConfig,
    error::Result,
};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let log_guard = match logging::init_logging(args.verbose, args.quiet, args.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run(args).await {
        error!("Application error: {}", e);
        eprintln!("Error: {}", e);
        drop(log_guard);
        process::exit(e.exit_code());
    }
}

async fn run(args: Args) -> Result<()> {
    let config = AppConfig::load(args.config.as_deref())?.merge_args(&args);
    let store = CheckpointStore::new(&config.checkpoint_file);

    if let Some(report) = args.report() {
        let mut out = io::stdout().lock();
        match report {
            Report::Logs => diagnostics::view_logs(&store, &mut out)?,
            Report::Stats => diagnostics::view_stats(&store, &mut out)?,
            Report::VideoErrors => diagnostics::view_errors(&store, &mut out)?,
        }
        return Ok(());
    }

    let split = config.split_config();
    info!(
        playlist = %split.source_playlist,
        new_playlist = %split.new_playlist_name,
        target_size = split.target_size,
        delete_original = split.delete_original,
        "Starting playlist split"
    );

    let client = http::build_client(
        Duration::from_secs(config.timeout_secs),
        config.proxy.as_deref(),
    )?;
    let credentials = Credentials::from_file(&config.secret_file)?;
    let tokens = TokenProvider::new(client.clone(), credentials);
    tokens.authenticate().await?;

    let api = YouTubeClient::new(client, tokens);
    let mut reconciler = Reconciler::new(api, store, split)?;

    let finished = tokio::select! {
        result = reconciler.run() => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    match finished {
        Some(result) => match result? {
            RunOutcome::Completed => info!("All videos have been processed"),
            RunOutcome::QuotaPaused => {
                warn!("Quota exhausted; run the command again after the daily reset")
            }
            RunOutcome::NothingToSplit => info!("Source playlist is empty; nothing to split"),
        },
        None => reconciler.record_interrupt(),
    }

    Ok(())
}
