//! Cooperative cancellation.
//!
//! The token is only consulted at safe points (between entries, around retry
//! sleeps); an in-flight download always runs to completion. A deadline, once
//! passed, is noticed the next time the token is checked.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use time::OffsetDateTime;
use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<OffsetDateTime>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that also ends once `deadline` has passed.
    pub fn with_deadline(deadline: OffsetDateTime) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: Some(deadline),
        }
    }

    /// Token ending `minutes` from now. Negative values mean no deadline, as
    /// do values too large to represent as a date.
    pub fn with_timeout_minutes(minutes: i64) -> Self {
        if minutes < 0 {
            return Self::new();
        }
        let deadline = minutes
            .checked_mul(60)
            .and_then(|secs| OffsetDateTime::now_utc().checked_add(time::Duration::seconds(secs)));
        match deadline {
            Some(deadline) => Self::with_deadline(deadline),
            None => {
                warn!(minutes, "timeout out of range, running without a deadline");
                Self::new()
            }
        }
    }

    pub fn deadline(&self) -> Option<OffsetDateTime> {
        self.deadline
    }

    /// Request cancellation. Safe to call from a signal listener task.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn should_end(&self) -> bool {
        self.should_end_at(OffsetDateTime::now_utc())
    }

    pub fn should_end_at(&self, now: OffsetDateTime) -> bool {
        if let Some(deadline) = self.deadline {
            if now > deadline {
                warn!(%deadline, "time is out");
                return true;
            }
        }
        if self.flag.load(Ordering::SeqCst) {
            warn!("termination requested");
            return true;
        }
        false
    }
}
