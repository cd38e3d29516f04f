//! CLI entry point for the bibscan tool.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use bibscan_core::{
    CrossrefClient, ExtractOptions, Pipeline, ProgressEvent, RequestPacer, RetryPolicy,
    write_library,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (warn)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");
    info!("Bibscan starting");

    let policy = RetryPolicy::with_max_attempts(u32::from(args.max_retries));
    let pacer = if args.rate_limit == 0 {
        debug!("request pacing disabled");
        RequestPacer::disabled()
    } else {
        debug!(rate_limit_ms = args.rate_limit, "request pacing enabled");
        RequestPacer::new(Duration::from_millis(args.rate_limit))
    };

    let resolver = CrossrefClient::new(args.mailto.clone().unwrap_or_default())
        .context("failed to construct metadata client")?
        .with_retry_policy(policy)
        .with_pacer(pacer);

    let extract_options = ExtractOptions {
        max_pages: args.max_pages,
        ..ExtractOptions::default()
    };
    let pipeline = Pipeline::new(resolver).with_extract_options(extract_options);

    let bar = Arc::new(progress_bar(args.quiet));
    let outcome = {
        let bar = Arc::clone(&bar);
        async {
            let result = pipeline
                .run(&args.input_dir, move |event: ProgressEvent| {
                    bar.set_length(event.total as u64);
                    bar.set_position(event.current as u64);
                    bar.set_message(event.message);
                })
                .await?;
            write_library(result.records(), &args.output).with_context(|| {
                format!("failed to write library to {}", args.output.display())
            })?;
            anyhow::Ok(result)
        }
        .await
    };

    // The bar must be cleared before anything else prints, errors included.
    bar.finish_and_clear();
    let result = outcome?;

    println!("{}", result.summary(&args.output));
    Ok(())
}

fn progress_bar(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::no_length();
    bar.set_style(
        ProgressStyle::with_template("[{bar:40}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    bar
}
