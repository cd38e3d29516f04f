//! Minimum inter-request spacing for metadata lookups.
//!
//! The pipeline processes files sequentially, so a directory full of PDFs
//! turns into a burst of back-to-back API calls. The [`RequestPacer`] enforces
//! a minimum interval between requests to the upstream service as a courtesy
//! policy, keeping the tool inside polite-pool expectations without the
//! orchestrator having to care.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Enforces a minimum delay between consecutive requests.
///
/// Single-writer by design: the sequential pipeline is the only caller, the
/// mutex exists for the `acquire` read-update to stay atomic if the resolver
/// is ever shared.
#[derive(Debug)]
pub struct RequestPacer {
    min_interval: Duration,
    disabled: bool,
    /// `None` until the first request; the first request is never delayed.
    last_request: Mutex<Option<Instant>>,
}

impl RequestPacer {
    /// Creates a pacer with the given minimum interval between requests.
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            disabled: min_interval.is_zero(),
            last_request: Mutex::new(None),
        }
    }

    /// Creates a pacer that never delays (tests, `--rate-limit 0`).
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            min_interval: Duration::ZERO,
            disabled: true,
            last_request: Mutex::new(None),
        }
    }

    /// Waits until the minimum interval since the previous request has
    /// elapsed, then records this request's timestamp.
    pub async fn acquire(&self) {
        if self.disabled {
            return;
        }

        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!(?wait, "pacing metadata request");
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }
}
