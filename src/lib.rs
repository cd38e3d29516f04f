//! Bibscan Core Library
//!
//! This library provides the core functionality for the bibscan tool, which
//! scans directories of PDF files, extracts DOIs from document metadata or
//! text, resolves them against the Crossref API, and writes the results out
//! as an EndNote XML library.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`extract`] - DOI extraction from PDF metadata and text layers
//! - [`resolve`] - Crossref metadata resolution with retry and pacing
//! - [`pipeline`] - Sequential scan-extract-resolve orchestration
//! - [`endnote`] - EndNote XML serialization and atomic file writes
//! - [`record`] - Per-file outcome records and run aggregation

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod endnote;
pub mod extract;
pub mod pipeline;
pub mod record;
pub mod resolve;

pub(crate) mod user_agent;

// Re-export commonly used types
pub use endnote::{WriteError, serialize, write_library};
pub use extract::{ExtractOptions, extract_doi, find_first_doi};
pub use pipeline::{Pipeline, PipelineError, ProgressEvent, walk_pdf_files};
pub use record::{OutcomeRecord, RecordStatus, RunResult};
pub use resolve::{
    BibRecord, CrossrefClient, DEFAULT_MAX_ATTEMPTS, DEFAULT_REQUEST_INTERVAL, RequestPacer,
    ResolveError, RetryPolicy,
};
