//! Sequential scan-extract-resolve pipeline.
//!
//! The [`Pipeline`] walks an input directory for PDF files and processes each
//! one end-to-end (extract DOI, resolve metadata, append outcome record)
//! before moving to the next. Per-file failures become terminal record
//! statuses and never abort the run; only setup problems (an invalid input
//! directory) surface as errors. Progress events are emitted once per file
//! from the single worker, plus initializing/saving bookends.

mod progress;

pub use progress::ProgressEvent;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::extract::{ExtractOptions, extract_doi};
use crate::record::{OutcomeRecord, RunResult};
use crate::resolve::CrossrefClient;

/// Run-level pipeline failures. Per-file problems never appear here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid input directory '{}': {reason}", path.display())]
    InvalidDirectory { path: PathBuf, reason: String },
}

/// Directory-scan pipeline: one resolver, one extraction configuration.
#[derive(Debug)]
pub struct Pipeline {
    resolver: CrossrefClient,
    extract_options: ExtractOptions,
}

impl Pipeline {
    #[must_use]
    pub fn new(resolver: CrossrefClient) -> Self {
        Self {
            resolver,
            extract_options: ExtractOptions::default(),
        }
    }

    /// Replaces the page-scan limits used during extraction.
    #[must_use]
    pub fn with_extract_options(mut self, options: ExtractOptions) -> Self {
        self.extract_options = options;
        self
    }

    /// Processes every PDF under `dir` and returns one record per file.
    ///
    /// Returns only after every discovered file has a terminal-status record.
    /// The per-file loop is the natural granularity for any future
    /// cooperative cancellation.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidDirectory`] when `dir` is missing,
    /// not a directory, or unreadable.
    #[instrument(skip(self, progress), fields(dir = %dir.display()))]
    pub async fn run(
        &self,
        dir: &Path,
        progress: impl Fn(ProgressEvent),
    ) -> Result<RunResult, PipelineError> {
        let files = walk_pdf_files(dir)?;
        let total = files.len();
        info!(total, "scan discovered candidate files");

        progress(ProgressEvent::new(0, total, "Initializing scan..."));

        let mut result = RunResult::new();
        for (index, path) in files.iter().enumerate() {
            let current = index + 1;
            let record = self.process_file(path, current, total, &progress).await;
            debug!(
                path = %record.file_path().display(),
                status = %record.status,
                "file processed"
            );
            result.push(record);
        }

        progress(ProgressEvent::new(total, total, "Saving library..."));
        Ok(result)
    }

    /// Processes one file end-to-end. Infallible by construction: every
    /// failure mode maps to a terminal record status.
    async fn process_file(
        &self,
        path: &Path,
        current: usize,
        total: usize,
        progress: &impl Fn(ProgressEvent),
    ) -> OutcomeRecord {
        let file_name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

        // Extraction parses untrusted files; run it off the async worker and
        // absorb panics from pathological inputs via the join error.
        let options = self.extract_options;
        let task_path = path.to_path_buf();
        let doi = match tokio::task::spawn_blocking(move || extract_doi(&task_path, &options)).await
        {
            Ok(doi) => doi,
            Err(error) => {
                warn!(path = %path.display(), error = %error, "extraction task failed");
                progress(ProgressEvent::new(
                    current,
                    total,
                    format!("Failed to process {file_name}"),
                ));
                return OutcomeRecord::failed(path, format!("extraction failed: {error}"));
            }
        };

        let Some(doi) = doi else {
            progress(ProgressEvent::new(
                current,
                total,
                format!("No DOI found in {file_name}"),
            ));
            return OutcomeRecord::doi_not_found(path);
        };

        progress(ProgressEvent::new(
            current,
            total,
            format!("Fetching metadata for DOI: {doi}"),
        ));

        match self.resolver.resolve(&doi).await {
            Some(bib) => OutcomeRecord::success(path, doi, bib),
            None => OutcomeRecord::metadata_not_found(path, doi),
        }
    }
}

/// Recursively collects `*.pdf` files under `dir` (case-insensitive
/// extension), sorted lexicographically so enumeration order is stable within
/// a run. Unreadable subdirectories and entries are logged and skipped.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidDirectory`] when `dir` itself cannot be
/// enumerated.
pub fn walk_pdf_files(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    if !dir.is_dir() {
        return Err(PipelineError::InvalidDirectory {
            path: dir.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }

    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    let mut first = true;

    while let Some(current_dir) = pending.pop() {
        let entries = match fs::read_dir(&current_dir) {
            Ok(entries) => entries,
            Err(error) if first => {
                return Err(PipelineError::InvalidDirectory {
                    path: current_dir,
                    reason: error.to_string(),
                });
            }
            Err(error) => {
                warn!(
                    path = %current_dir.display(),
                    error = %error,
                    "skipping unreadable directory"
                );
                continue;
            }
        };
        first = false;

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    warn!(error = %error, "skipping unreadable directory entry");
                    continue;
                }
            };
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else if has_pdf_extension(&path) {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use std::fs;

    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::write(path, b"stub").unwrap();
    }

    // ==================== Directory Walk Tests ====================

    #[test]
    fn test_walk_finds_pdfs_recursively() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        touch(&dir.path().join("top.pdf"));
        touch(&nested.join("deep.pdf"));
        touch(&dir.path().join("notes.txt"));

        let files = walk_pdf_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| has_pdf_extension(f)));
    }

    #[test]
    fn test_walk_extension_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("upper.PDF"));
        touch(&dir.path().join("mixed.Pdf"));

        let files = walk_pdf_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_walk_order_is_sorted_and_stable() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("c.pdf"));
        touch(&dir.path().join("a.pdf"));
        touch(&dir.path().join("b.pdf"));

        let first = walk_pdf_files(dir.path()).unwrap();
        let second = walk_pdf_files(dir.path()).unwrap();
        assert_eq!(first, second);

        let names: Vec<_> = first
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf", "c.pdf"]);
    }

    #[test]
    fn test_walk_empty_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(walk_pdf_files(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_walk_missing_directory_is_error() {
        let err = walk_pdf_files(Path::new("/nonexistent/never")).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidDirectory { .. }));
    }

    #[test]
    fn test_walk_file_path_is_error() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("not-a-dir.pdf");
        touch(&file);

        let err = walk_pdf_files(&file).unwrap_err();
        assert!(err.to_string().contains("not a directory"), "{err}");
    }
}
