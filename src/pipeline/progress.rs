//! Progress event protocol consumed by the run controller.

/// A progress notification emitted by the pipeline.
///
/// `current` increases monotonically from 0 over one run: an initializing
/// event at 0, one event per processed file (1-based), and a final saving
/// event at `total`. Events come from a single worker; no two events for the
/// same run are ever concurrent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub current: usize,
    pub total: usize,
    /// Human-readable description of the current file/stage.
    pub message: String,
}

impl ProgressEvent {
    #[must_use]
    pub fn new(current: usize, total: usize, message: impl Into<String>) -> Self {
        Self {
            current,
            total,
            message: message.into(),
        }
    }

    /// Completion percentage, `floor(current/total*100)` clamped to [0, 100].
    /// An empty run (total 0) has nothing left to do and reports 100.
    #[must_use]
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        let percent = self.current.saturating_mul(100) / self.total;
        u8::try_from(percent.min(100)).unwrap_or(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_basic() {
        assert_eq!(ProgressEvent::new(0, 4, "x").percent(), 0);
        assert_eq!(ProgressEvent::new(1, 4, "x").percent(), 25);
        assert_eq!(ProgressEvent::new(4, 4, "x").percent(), 100);
    }

    #[test]
    fn test_percent_floors() {
        assert_eq!(ProgressEvent::new(1, 3, "x").percent(), 33);
        assert_eq!(ProgressEvent::new(2, 3, "x").percent(), 66);
    }

    #[test]
    fn test_percent_clamped_to_100() {
        assert_eq!(ProgressEvent::new(5, 4, "x").percent(), 100);
    }

    #[test]
    fn test_percent_zero_total_is_complete() {
        assert_eq!(ProgressEvent::new(0, 0, "x").percent(), 100);
        assert_eq!(ProgressEvent::new(1, 0, "x").percent(), 100);
    }
}
