//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use bibscan_core::DEFAULT_MAX_ATTEMPTS;

/// Scan a directory of PDFs and build an EndNote XML library.
///
/// Bibscan extracts DOIs from PDF metadata and text, resolves them against
/// the Crossref API, and writes the collected bibliographic records to an
/// EndNote XML file.
#[derive(Parser, Debug)]
#[command(name = "bibscan")]
#[command(author, version, about)]
pub struct Args {
    /// Directory to scan recursively for PDF files
    pub input_dir: PathBuf,

    /// Output path for the EndNote XML library
    #[arg(short, long, default_value = "library.xml")]
    pub output: PathBuf,

    /// Contact email sent with API requests (Crossref polite pool)
    #[arg(long, env = "BIBSCAN_MAILTO")]
    pub mailto: Option<String>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Maximum lookup attempts for transient failures (1-10)
    #[arg(short = 'r', long, default_value_t = DEFAULT_MAX_ATTEMPTS as u8, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub max_retries: u8,

    /// Minimum delay between API requests in milliseconds (0 to disable, max 60000)
    #[arg(short = 'l', long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub rate_limit: u64,

    /// Maximum pages scanned per document during the full-text fallback (1-10000)
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u32).range(1..=10000))]
    pub max_pages: u32,
}
