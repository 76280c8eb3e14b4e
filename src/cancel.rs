//! The external cancellation signal of a matching run.
//!
//! A [`Cancellation`] is cheap to clone and is handed to every
//! [`RoutingOracle`](crate::oracle::RoutingOracle) call. Cancelling any
//! clone cancels all of them. The matching core has no timeouts of its
//! own: a deadline, if any, is supplied by the caller here.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::oracle::OracleError;

#[derive(Clone, Debug, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Cancellation {
    /// A signal which is only ever cancelled explicitly.
    pub fn new() -> Self {
        Self::default()
    }

    /// A signal which additionally expires once `timeout` has elapsed.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            flag: Arc::default(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire) || self.deadline_elapsed()
    }

    /// Time left until the deadline, `None` if there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Returns an error if the run should stop.
    #[inline]
    pub fn check(&self) -> Result<(), OracleError> {
        if self.flag.load(Ordering::Acquire) {
            return Err(OracleError::Cancelled);
        }

        if self.deadline_elapsed() {
            return Err(OracleError::DeadlineExceeded);
        }

        Ok(())
    }

    fn deadline_elapsed(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}
