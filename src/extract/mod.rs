//! DOI extraction from PDF files.
//!
//! The extractor is pure and side-effect free: it reads a file, never touches
//! the network, and maps every failure mode (corrupt file, encrypted PDF,
//! image-only pages) to "no DOI found" rather than an error. Strategy, first
//! match wins:
//!
//! 1. Document Info dictionary (a DOI-shaped string in Subject, Keywords, or
//!    Title, or an explicit `doi` key)
//! 2. Text layer of the first few pages (front matter usually carries the DOI)
//! 3. Remaining pages, bounded by a page budget so pathological documents
//!    cannot stall the run

mod doi;

pub use doi::find_first_doi;

use std::path::Path;

use lopdf::{Document, Object};
use tracing::{debug, instrument, trace};

/// Info dictionary keys inspected for DOI-shaped strings, in priority order.
const INFO_KEYS: [&[u8]; 5] = [b"doi", b"DOI", b"Subject", b"Keywords", b"Title"];

/// Scan limits for the page-text passes.
#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions {
    /// Pages scanned in the front-matter pass.
    pub front_pages: u32,
    /// Total page budget for the full-document fallback pass.
    pub max_pages: u32,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            front_pages: 3,
            max_pages: 50,
        }
    }
}

/// Extracts a DOI from a PDF file, or `None` when no identifier is found.
///
/// Never fails: any parse problem on a malformed, encrypted, or non-PDF input
/// is treated as an absent DOI so one bad file cannot abort a directory run.
#[instrument(skip(options), fields(path = %path.display()))]
#[must_use]
pub fn extract_doi(path: &Path, options: &ExtractOptions) -> Option<String> {
    let doc = match Document::load(path) {
        Ok(doc) => doc,
        Err(error) => {
            debug!(error = %error, "failed to load PDF; treating as no DOI");
            return None;
        }
    };

    if doc.is_encrypted() {
        debug!("PDF is encrypted; treating as no DOI");
        return None;
    }

    if let Some(doi) = scan_info_dictionary(&doc) {
        debug!(doi = %doi, "DOI found in Info dictionary");
        return Some(doi);
    }

    let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    let front_count = options.front_pages as usize;

    let front = &page_numbers[..page_numbers.len().min(front_count)];
    if let Some(doi) = scan_pages(&doc, front) {
        debug!(doi = %doi, "DOI found in front matter");
        return Some(doi);
    }

    let budget_end = page_numbers.len().min(options.max_pages as usize);
    if budget_end > front_count {
        let rest = &page_numbers[front_count..budget_end];
        if let Some(doi) = scan_pages(&doc, rest) {
            debug!(doi = %doi, "DOI found beyond front matter");
            return Some(doi);
        }
    }

    debug!("no DOI found");
    None
}

/// Scans the trailer's Info dictionary for a DOI-shaped string.
fn scan_info_dictionary(doc: &Document) -> Option<String> {
    let info = match doc.trailer.get(b"Info") {
        // Info is usually an indirect reference, occasionally inline.
        Ok(Object::Reference(id)) => doc.get_object(*id).ok()?.as_dict().ok()?,
        Ok(Object::Dictionary(dict)) => dict,
        _ => return None,
    };

    for key in INFO_KEYS {
        if let Ok(Object::String(bytes, _)) = info.get(key) {
            let value = String::from_utf8_lossy(bytes);
            trace!(key = %String::from_utf8_lossy(key), value = %value, "checking Info entry");
            if let Some(doi) = find_first_doi(&value) {
                return Some(doi);
            }
        }
    }

    None
}

/// Scans the text layer of the given pages, one page at a time so a single
/// undecodable page does not hide a DOI on the next one.
fn scan_pages(doc: &Document, page_numbers: &[u32]) -> Option<String> {
    for &page in page_numbers {
        let text = match doc.extract_text(&[page]) {
            Ok(text) => text,
            Err(error) => {
                trace!(page, error = %error, "skipping undecodable page");
                continue;
            }
        };
        if let Some(doi) = find_first_doi(&text) {
            return Some(doi);
        }
    }
    None
}
