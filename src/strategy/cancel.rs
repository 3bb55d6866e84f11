use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cooperative stop signal for a running optimization.
///
/// Clones share the same flag, so a caller can keep one clone and cancel
/// a run executing on another thread. An optional deadline turns the token
/// into a timeout.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// Creates a token that never fires on its own.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires automatically once `timeout` has elapsed from now.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Instant::now().checked_add(timeout);
        self
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested or the deadline has passed.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed) || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_flag() {
        let token = CancelToken::new();
        let observer = token.clone();
        assert!(!observer.is_cancelled());
        token.cancel();
        assert!(observer.is_cancelled());
    }

    #[test]
    fn test_zero_timeout_fires() {
        let token = CancelToken::new().with_timeout(Duration::ZERO);
        assert!(token.is_cancelled());
        assert!(!CancelToken::new()
            .with_timeout(Duration::from_secs(3600))
            .is_cancelled());
    }
}
