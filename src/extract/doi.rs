//! DOI detection, validation, and normalization from PDF text.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

/// Regex pattern for bare DOIs: `10.XXXX/suffix`
/// Handles nested registrants like `10.1000.10/example`.
/// Note: Preceding character check (to reject IP-like patterns) is done in code
/// since the `regex` crate doesn't support lookbehind.
#[allow(clippy::expect_used)]
static DOI_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"10\.\d{4,9}(?:\.\d+)*/[^\s<>"'\]]+"#).expect("DOI regex is valid") // Static pattern, safe to panic
});

/// Regex pattern for DOI URLs: `https://doi.org/10.XXXX/suffix` or `https://dx.doi.org/...`
/// The slash after the registrant may arrive percent-encoded (`%2F`);
/// normalization decodes it.
#[allow(clippy::expect_used)]
static DOI_URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://(?:dx\.)?doi\.org/(10\.\d{4,9}(?:\.\d+)*(?:/|%2[Ff])[^\s<>"'\]]+)"#)
        .expect("DOI URL regex is valid") // Static pattern, safe to panic
});

/// Regex pattern for `DOI:` prefixed DOIs: `DOI: 10.XXXX/suffix`
#[allow(clippy::expect_used)]
static DOI_PREFIX_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)doi:\s*(10\.\d{4,9}(?:\.\d+)*/[^\s<>"'\]]+)"#)
        .expect("DOI prefix regex is valid") // Static pattern, safe to panic
});

/// Finds the first valid DOI in reading order.
///
/// Candidates are collected from all supported shapes (DOI URLs, `doi:`
/// prefixed, bare `10.XXXX/suffix`) and considered by their position in the
/// text; the earliest candidate that survives normalization and validation
/// wins. No semantic disambiguation is attempted when a document mentions
/// several DOIs.
#[must_use]
pub fn find_first_doi(text: &str) -> Option<String> {
    let mut candidates: Vec<(usize, String)> = Vec::new();

    // DOI URLs first (most specific pattern)
    for cap in DOI_URL_PATTERN.captures_iter(text) {
        if let Some(full_match) = cap.get(0) {
            trace!(raw = %full_match.as_str(), "found DOI URL candidate");
            candidates.push((full_match.start(), cap[1].to_string()));
        }
    }

    // DOI: prefixed
    for cap in DOI_PREFIX_PATTERN.captures_iter(text) {
        if let Some(full_match) = cap.get(0) {
            if covered(&candidates, text, full_match.start()) {
                continue;
            }
            trace!(raw = %full_match.as_str(), "found DOI prefix candidate");
            candidates.push((full_match.start(), cap[1].to_string()));
        }
    }

    // Bare DOIs
    for m in DOI_PATTERN.find_iter(text) {
        if covered(&candidates, text, m.start()) {
            continue;
        }
        // Check preceding character to reject false positives:
        // - IP-like patterns (e.g., 192.10.1234/24) - preceded by digit or dot
        // - Version numbers (e.g., v10.1234/rc1) - preceded by letter
        if m.start() > 0 {
            let prev_byte = text.as_bytes()[m.start() - 1];
            if prev_byte.is_ascii_alphanumeric() || prev_byte == b'.' {
                continue;
            }
        }
        trace!(raw = %m.as_str(), "found bare DOI candidate");
        candidates.push((m.start(), m.as_str().to_string()));
    }

    candidates.sort_by_key(|(start, _)| *start);

    for (_, raw) in candidates {
        let normalized = normalize_doi(&raw);
        let cleaned = clean_trailing_punctuation(&normalized);
        let cleaned = clean_unbalanced_trailing(&cleaned, '(', ')');
        let cleaned = clean_unbalanced_trailing(&cleaned, '{', '}');

        if let Some(doi) = validate_doi(&cleaned) {
            debug!(doi = %doi, "DOI validated");
            return Some(doi);
        }
        debug!(candidate = %cleaned, "DOI candidate rejected");
    }

    None
}

/// Whether `start` falls inside a DOI already captured by an earlier pattern.
/// The earlier patterns capture the DOI body, so a position is covered when an
/// existing candidate's body contains it.
fn covered(candidates: &[(usize, String)], text: &str, start: usize) -> bool {
    candidates.iter().any(|(cand_start, body)| {
        let end = text[*cand_start..]
            .find(body.as_str())
            .map_or(*cand_start + body.len(), |offset| {
                *cand_start + offset + body.len()
            });
        start >= *cand_start && start < end
    })
}

/// Normalizes a DOI candidate by stripping prefixes and decoding.
///
/// Strips URL prefixes (`https://doi.org/`, `https://dx.doi.org/`),
/// text prefixes (`doi:`, `DOI:`), URL-decodes, and trims whitespace.
#[must_use]
fn normalize_doi(input: &str) -> String {
    let mut doi = input.trim();

    for prefix in &[
        "https://doi.org/",
        "http://doi.org/",
        "https://dx.doi.org/",
        "http://dx.doi.org/",
    ] {
        if let Some(stripped) = doi.strip_prefix(prefix) {
            doi = stripped;
            break;
        }
    }

    if doi.len() >= 4 && doi[..4].eq_ignore_ascii_case("doi:") {
        doi = doi[4..].trim_start();
    }

    match urlencoding::decode(doi) {
        Ok(decoded) => decoded.trim().to_string(),
        Err(_) => doi.trim().to_string(),
    }
}

/// Strips trailing sentence punctuation that text extraction drags along.
fn clean_trailing_punctuation(doi: &str) -> String {
    doi.trim_end_matches(['.', ',', ';', ':']).to_string()
}

/// Strips trailing closers (`)` or `}`) from the suffix while unbalanced.
///
/// DOIs can contain parentheses in their suffix (e.g., `10.1002/(SICI)1097-4636`),
/// but are often wrapped in parentheses in text (e.g., `(10.1234/example)`).
fn clean_unbalanced_trailing(doi: &str, open: char, close: char) -> String {
    let mut result = doi.to_string();

    if let Some(slash_pos) = result.find('/') {
        while result.ends_with(close) && {
            let s = &result[slash_pos + 1..];
            s.chars().filter(|&c| c == close).count() > s.chars().filter(|&c| c == open).count()
        } {
            result.pop();
        }
    }

    result
}

/// Validates a DOI candidate, returning it when well-formed.
///
/// Rules: must start with `10.`, the registrant's first segment must be 4+
/// digits (nested registrants like `10.1000.10` are allowed), and the suffix
/// after `/` must be non-empty.
fn validate_doi(doi: &str) -> Option<String> {
    if !doi.starts_with("10.") {
        return None;
    }

    let slash_pos = doi.find('/')?;

    let registrant = &doi[3..slash_pos];
    if registrant.is_empty() {
        return None;
    }

    let first_segment = registrant.split('.').next().unwrap_or("");
    if first_segment.len() < 4 || !first_segment.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let suffix = &doi[slash_pos + 1..];
    if suffix.is_empty() {
        return None;
    }

    Some(doi.to_string())
}
