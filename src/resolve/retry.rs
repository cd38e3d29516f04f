//! Retry state machine for transient metadata-lookup failures.
//!
//! A failed lookup is classified into a [`FailureKind`]; the [`RetryPolicy`]
//! turns (kind, attempt) into a [`RetryDecision`]. Definitive failures (a
//! not-found answer, a malformed payload) short-circuit without retry;
//! transient failures back off exponentially with jitter; rate-limited
//! responses honor the server's Retry-After when present.

use std::time::{Duration, SystemTime};

use rand::Rng;
use tracing::debug;

use super::error::ResolveError;

/// Default maximum attempts per DOI (initial attempt + 2 retries).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Base delay for the first retry.
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Cap on any single backoff delay.
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(16);

/// Multiplier applied per attempt.
const DEFAULT_BACKOFF_MULTIPLIER: f32 = 2.0;

/// Maximum jitter added to delays.
const MAX_JITTER: Duration = Duration::from_millis(500);

/// Cap applied to server-provided Retry-After values.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Classification of a failed lookup attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// May succeed on retry: timeout, connect failure, 5xx.
    Transient,
    /// HTTP 429; retried with the server-suggested delay when available.
    RateLimited {
        retry_after: Option<Duration>,
    },
    /// Will not succeed on retry: not-found, other 4xx, malformed payload.
    Definitive,
}

/// Decision on whether to retry a failed lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        delay: Duration,
        /// The attempt number about to run (1-indexed, so the first retry is 2).
        attempt: u32,
    },
    /// Give up and report the DOI as unresolved.
    DoNotRetry { reason: String },
}

/// Classifies a lookup error for the retry policy.
#[must_use]
pub fn classify(error: &ResolveError) -> FailureKind {
    match error {
        ResolveError::Network(_) => FailureKind::Transient,
        ResolveError::HttpStatus {
            status: 429,
            retry_after,
        } => FailureKind::RateLimited {
            retry_after: *retry_after,
        },
        ResolveError::HttpStatus { status, .. } if *status >= 500 => FailureKind::Transient,
        ResolveError::HttpStatus { .. }
        | ResolveError::MalformedResponse(_)
        | ResolveError::InvalidConfig(_) => FailureKind::Definitive,
    }
}

/// Bounded exponential backoff policy.
///
/// Delay calculation: `min(base * multiplier^(attempt-1), max) + jitter`.
/// With defaults the retry delays are roughly 1s then 2s.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    backoff_multiplier: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with a custom attempt budget, keeping default delays.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Creates a policy with no artificial delay between attempts (tests).
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decides whether the attempt that just failed should be followed by
    /// another one.
    ///
    /// `attempt` is the 1-indexed number of the attempt that failed.
    #[must_use]
    pub fn should_retry(&self, failure_kind: FailureKind, attempt: u32) -> RetryDecision {
        match failure_kind {
            FailureKind::Definitive => {
                return RetryDecision::DoNotRetry {
                    reason: "definitive failure (not retryable)".to_string(),
                };
            }
            FailureKind::Transient | FailureKind::RateLimited { .. } => {}
        }

        if attempt >= self.max_attempts {
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) reached", self.max_attempts),
            };
        }

        let delay = match failure_kind {
            FailureKind::RateLimited {
                retry_after: Some(server_delay),
            } => server_delay.min(MAX_RETRY_AFTER),
            _ => self.backoff_delay(attempt),
        };

        debug!(?delay, attempt = attempt + 1, "scheduling retry");
        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }

    /// Exponential delay for the retry following `attempt`, with jitter.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(10);
        let multiplier = self.backoff_multiplier.powi(exponent.try_into().unwrap_or(10));
        let scaled = self.base_delay.mul_f32(multiplier.max(0.0));
        let capped = scaled.min(self.max_delay);

        if capped.is_zero() {
            return capped;
        }
        #[allow(clippy::cast_possible_truncation)]
        let jitter_ms = rand::thread_rng().gen_range(0..=MAX_JITTER.as_millis() as u64);
        capped + Duration::from_millis(jitter_ms)
    }
}

/// Parses a Retry-After header value: integer seconds or an HTTP-date.
#[must_use]
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let trimmed = value.trim();
    if let Ok(secs) = trimmed.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let when = httpdate::parse_http_date(trimmed).ok()?;
    when.duration_since(SystemTime::now()).ok()
}
