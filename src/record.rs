//! Per-file outcome records and the aggregated run result.
//!
//! Every candidate file discovered during a scan yields exactly one
//! [`OutcomeRecord`], even when extraction or resolution fails. Records carry
//! a [`RecordStatus`] that moves from `Pending` to exactly one terminal state
//! and never reverts.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::resolve::BibRecord;

/// Processing status of a single scanned file.
///
/// `Pending` is the only transient state; all other variants are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordStatus {
    /// File discovered but not yet processed.
    Pending,
    /// DOI extracted and metadata resolved.
    Success,
    /// No DOI could be extracted from the file.
    DoiNotFound,
    /// A DOI was extracted but the metadata service did not resolve it.
    MetadataNotFound,
    /// Unexpected per-file failure (unreadable file, extraction panic).
    Failed(String),
}

impl RecordStatus {
    /// Returns true for any state other than `Pending`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Success => write!(f, "Success"),
            Self::DoiNotFound => write!(f, "DOI Not Found"),
            Self::MetadataNotFound => write!(f, "Metadata Not Found"),
            Self::Failed(reason) => write!(f, "Error: {reason}"),
        }
    }
}

/// The outcome of processing one scanned file.
///
/// Bibliographic fields are each independently optional: a partial metadata
/// response does not invalidate the record. Constructors enforce the
/// status/field invariants, so a `Success` record always carries a DOI and a
/// title, while the not-found variants never carry stale metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeRecord {
    file_path: PathBuf,
    /// Extracted identifier, if any.
    pub doi: Option<String>,
    pub title: Option<String>,
    pub authors: Option<String>,
    pub year: Option<i32>,
    pub journal: Option<String>,
    pub status: RecordStatus,
}

impl OutcomeRecord {
    /// A fully resolved record.
    ///
    /// Falls back to [`OutcomeRecord::metadata_not_found`] when the resolved
    /// metadata carries no title, so the `Success implies title present`
    /// invariant always holds.
    #[must_use]
    pub fn success(file_path: impl Into<PathBuf>, doi: impl Into<String>, bib: BibRecord) -> Self {
        let file_path = file_path.into();
        let doi = doi.into();
        if bib.title.is_none() {
            return Self::metadata_not_found(file_path, doi);
        }
        Self {
            file_path,
            doi: Some(doi),
            title: bib.title,
            authors: bib.authors,
            year: bib.year,
            journal: bib.journal,
            status: RecordStatus::Success,
        }
    }

    /// No DOI was found in the file.
    #[must_use]
    pub fn doi_not_found(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            doi: None,
            title: None,
            authors: None,
            year: None,
            journal: None,
            status: RecordStatus::DoiNotFound,
        }
    }

    /// A DOI was found but the metadata lookup came back empty.
    #[must_use]
    pub fn metadata_not_found(file_path: impl Into<PathBuf>, doi: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            doi: Some(doi.into()),
            title: None,
            authors: None,
            year: None,
            journal: None,
            status: RecordStatus::MetadataNotFound,
        }
    }

    /// Unexpected per-file failure; the run continues with the next file.
    #[must_use]
    pub fn failed(file_path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            doi: None,
            title: None,
            authors: None,
            year: None,
            journal: None,
            status: RecordStatus::Failed(reason.into()),
        }
    }

    /// Absolute path of the source file. Immutable once created.
    #[must_use]
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

/// Ordered collection of outcome records for one pipeline run.
///
/// Order matches scan order and is stable within a run. The collection has a
/// single writer (the orchestrator) and is only read by consumers after each
/// append completes.
#[derive(Debug, Clone, Default)]
pub struct RunResult {
    records: Vec<OutcomeRecord>,
}

impl RunResult {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record. Only terminal-status records are expected here;
    /// a `Pending` record indicates an orchestrator bug and is logged.
    pub fn push(&mut self, record: OutcomeRecord) {
        if !record.status.is_terminal() {
            tracing::warn!(
                path = %record.file_path().display(),
                "appending non-terminal record to run result"
            );
        }
        self.records.push(record);
    }

    #[must_use]
    pub fn records(&self) -> &[OutcomeRecord] {
        &self.records
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn success_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.status == RecordStatus::Success)
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Human-readable completion summary for the run controller.
    #[must_use]
    pub fn summary(&self, output_path: &Path) -> String {
        let file_name = output_path
            .file_name()
            .map_or_else(|| output_path.display().to_string(), |n| n.to_string_lossy().into_owned());
        format!(
            "Processed {} files. {} success. Saved to {}",
            self.total(),
            self.success_count(),
            file_name
        )
    }
}
