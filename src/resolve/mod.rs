//! DOI metadata resolution via the Crossref REST API.
//!
//! The [`CrossrefClient`] queries `https://api.crossref.org/works/{doi}` and
//! normalizes the response into a [`BibRecord`]. Lookup failures never abort a
//! run: transient problems are retried by an explicit policy and everything
//! else is absorbed into an absent result for the caller to record.
//!
//! # Polite Pool
//!
//! When a contact email is configured, every request carries a `mailto`
//! query parameter (the courtesy identity) plus a shared User-Agent, which
//! routes traffic to Crossref's polite pool with its higher rate limits.

mod error;
mod rate_limit;
mod retry;

pub use error::ResolveError;
pub use rate_limit::RequestPacer;
pub use retry::{
    DEFAULT_MAX_ATTEMPTS, FailureKind, RetryDecision, RetryPolicy, classify, parse_retry_after,
};

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::user_agent;

/// Default Crossref API base URL.
const DEFAULT_BASE_URL: &str = "https://api.crossref.org";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Default minimum interval between metadata requests (polite courtesy).
pub const DEFAULT_REQUEST_INTERVAL: Duration = Duration::from_secs(1);

// ==================== Crossref API Response Types ====================

/// Top-level Crossref works response.
#[derive(Debug, Deserialize)]
struct CrossrefResponse {
    status: String,
    message: CrossrefMessage,
}

/// The `message` field from a Crossref works response.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
struct CrossrefMessage {
    title: Option<Vec<String>>,
    author: Option<Vec<CrossrefAuthor>>,
    container_title: Option<Vec<String>>,
    published: Option<CrossrefDate>,
    published_print: Option<CrossrefDate>,
    published_online: Option<CrossrefDate>,
}

/// An author entry from the Crossref response.
#[derive(Debug, Deserialize)]
struct CrossrefAuthor {
    given: Option<String>,
    family: Option<String>,
}

/// A date entry from the Crossref response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct CrossrefDate {
    date_parts: Option<Vec<Vec<Option<i32>>>>,
}

// ==================== Normalized Record ====================

/// Normalized bibliographic record produced by a successful lookup.
///
/// Every field is independently optional: Crossref legitimately omits titles,
/// author lists, container titles, and dates for some registrations, and a
/// partial response must not invalidate the lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BibRecord {
    pub title: Option<String>,
    /// Formatted as `"Family, Given; Family, Given"`.
    pub authors: Option<String>,
    pub year: Option<i32>,
    /// Journal / container name.
    pub journal: Option<String>,
}

// ==================== CrossrefClient ====================

/// Resolves DOIs to bibliographic metadata via the Crossref REST API.
pub struct CrossrefClient {
    client: Client,
    base_url: String,
    mailto: String,
    policy: RetryPolicy,
    pacer: RequestPacer,
}

impl CrossrefClient {
    /// Creates a client configured for the Crossref polite pool.
    ///
    /// # Arguments
    ///
    /// * `mailto` - Contact email sent with every request per Crossref's
    ///   courtesy policy
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidConfig`] when the mailto value contains
    /// control characters or HTTP client construction fails.
    pub fn new(mailto: impl Into<String>) -> Result<Self, ResolveError> {
        Self::build(mailto.into(), DEFAULT_BASE_URL.to_string())
    }

    /// Creates a client with a custom base URL (for testing with a mock server).
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidConfig`] on the same conditions as
    /// [`CrossrefClient::new`].
    pub fn with_base_url(
        mailto: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, ResolveError> {
        Self::build(mailto.into(), base_url.into())
    }

    fn build(mailto: String, base_url: String) -> Result<Self, ResolveError> {
        if mailto.chars().any(|c| c == '\n' || c == '\r' || c == '\0') {
            return Err(ResolveError::InvalidConfig(
                "mailto contains invalid control characters".to_string(),
            ));
        }

        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(READ_TIMEOUT)
            .user_agent(user_agent::default_api_user_agent())
            .gzip(true)
            .build()
            .map_err(|error| {
                ResolveError::InvalidConfig(format!("HTTP client construction failed: {error}"))
            })?;

        Ok(Self {
            client,
            base_url,
            mailto,
            policy: RetryPolicy::default(),
            pacer: RequestPacer::new(DEFAULT_REQUEST_INTERVAL),
        })
    }

    /// Replaces the retry policy (default: 3 attempts, exponential backoff).
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the request pacer (default: 1 request/second).
    #[must_use]
    pub fn with_pacer(mut self, pacer: RequestPacer) -> Self {
        self.pacer = pacer;
        self
    }

    /// Resolves a DOI to a bibliographic record.
    ///
    /// Returns `None` for every failure mode: upstream not-found, malformed
    /// response, and network errors once the retry budget is exhausted. A
    /// definitive not-found short-circuits without retry.
    #[instrument(skip(self), fields(doi = %doi))]
    pub async fn resolve(&self, doi: &str) -> Option<BibRecord> {
        for attempt in 1..=self.policy.max_attempts() {
            self.pacer.acquire().await;

            let error = match self.lookup(doi).await {
                Ok(record) => return Some(record),
                Err(error) => error,
            };

            match self.policy.should_retry(classify(&error), attempt) {
                RetryDecision::Retry { delay, attempt } => {
                    warn!(
                        error = %error,
                        attempt,
                        max_attempts = self.policy.max_attempts(),
                        "metadata lookup failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(error = %error, %reason, "metadata lookup failed");
                    return None;
                }
            }
        }

        None
    }

    /// One lookup attempt against the works endpoint.
    async fn lookup(&self, doi: &str) -> Result<BibRecord, ResolveError> {
        let encoded_doi = urlencoding::encode(doi);
        let mut url = format!("{}/works/{}", self.base_url, encoded_doi);
        if !self.mailto.is_empty() {
            let encoded_mailto = urlencoding::encode(&self.mailto);
            url.push_str(&format!("?mailto={encoded_mailto}"));
        }

        debug!(api_url = %url, "calling Crossref API");
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            return Err(ResolveError::HttpStatus {
                status: status.as_u16(),
                retry_after,
            });
        }

        let body: CrossrefResponse = response
            .json()
            .await
            .map_err(|error| ResolveError::MalformedResponse(error.to_string()))?;

        if !body.status.eq_ignore_ascii_case("ok") {
            return Err(ResolveError::MalformedResponse(format!(
                "unexpected response status '{}'",
                body.status
            )));
        }

        Ok(normalize(&body.message))
    }
}

impl std::fmt::Debug for CrossrefClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrossrefClient")
            .field("base_url", &self.base_url)
            .field("mailto", &self.mailto)
            .finish_non_exhaustive()
    }
}

// ==================== Normalization Helpers ====================

/// Maps a Crossref message onto the normalized record shape.
fn normalize(message: &CrossrefMessage) -> BibRecord {
    BibRecord {
        title: first_nonempty(message.title.as_ref()),
        authors: format_authors(message.author.as_deref().unwrap_or(&[])),
        year: extract_year(message.published.as_ref())
            .or_else(|| extract_year(message.published_print.as_ref()))
            .or_else(|| extract_year(message.published_online.as_ref())),
        journal: first_nonempty(message.container_title.as_ref()),
    }
}

fn first_nonempty(values: Option<&Vec<String>>) -> Option<String> {
    values
        .and_then(|v| v.first())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Joins authors as `"Family, Given; Family, Given"`, tolerating entries with
/// only one name part.
fn format_authors(authors: &[CrossrefAuthor]) -> Option<String> {
    let formatted: Vec<String> = authors
        .iter()
        .map(|a| match (&a.family, &a.given) {
            (Some(f), Some(g)) => format!("{f}, {g}"),
            (Some(f), None) => f.clone(),
            (None, Some(g)) => g.clone(),
            (None, None) => String::new(),
        })
        .filter(|s| !s.is_empty())
        .collect();

    if formatted.is_empty() {
        None
    } else {
        Some(formatted.join("; "))
    }
}

/// Extracts the year from a Crossref date field (`date-parts: [[year, m, d]]`).
fn extract_year(date: Option<&CrossrefDate>) -> Option<i32> {
    date.and_then(|d| d.date_parts.as_ref())
        .and_then(|parts| parts.first())
        .and_then(|inner| inner.first())
        .copied()
        .flatten()
}
