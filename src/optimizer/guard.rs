// src/optimizer/guard.rs — Cancellation flag and wall-clock deadline

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::infra::errors::{EvolveError, Result};

/// Checked between generations and before each candidate is scored.
/// An in-flight LLM call is never interrupted.
#[derive(Debug, Clone, Default)]
pub struct RunGuard {
    cancel: Option<Arc<AtomicBool>>,
    deadline: Option<(Instant, Duration)>,
}

impl RunGuard {
    pub fn new(cancel: Option<Arc<AtomicBool>>, timeout: Option<Duration>) -> Self {
        Self {
            cancel,
            deadline: timeout.map(|t| (Instant::now() + t, t)),
        }
    }

    /// Fails if the flag is set or the deadline has passed.
    pub fn check(&self, generation: usize) -> Result<()> {
        if let Some(flag) = &self.cancel {
            if flag.load(Ordering::Relaxed) {
                return Err(EvolveError::Cancelled { generation });
            }
        }
        if let Some((at, timeout)) = self.deadline {
            if Instant::now() >= at {
                return Err(EvolveError::DeadlineExceeded {
                    timeout_seconds: timeout.as_secs(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_never_trips() {
        assert!(RunGuard::default().check(1).is_ok());
    }

    #[test]
    fn test_cancel_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let guard = RunGuard::new(Some(flag.clone()), None);
        assert!(guard.check(1).is_ok());
        flag.store(true, Ordering::Relaxed);
        assert!(matches!(
            guard.check(3),
            Err(EvolveError::Cancelled { generation: 3 })
        ));
    }

    #[test]
    fn test_expired_deadline() {
        let guard = RunGuard::new(None, Some(Duration::ZERO));
        assert!(matches!(
            guard.check(1),
            Err(EvolveError::DeadlineExceeded { timeout_seconds: 0 })
        ));
    }

    #[test]
    fn test_distant_deadline() {
        let guard = RunGuard::new(None, Some(Duration::from_secs(3600)));
        assert!(guard.check(1).is_ok());
    }
}
