//! Retry policy for harvest work.
//!
//! The policy only knows about attempt counts, pauses, and cancellation. The
//! unit of work is an async closure and the pause goes through a [`Sleeper`],
//! so tests drive it with a fake clock.

use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use crate::errors::{RomDbError, RomDbResult};
use crate::harvest::cancel::CancelToken;

/// Something that can pause the harvest between attempts.
#[allow(async_fn_in_trait)]
pub trait Sleeper {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub pause: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            pause: Duration::from_secs(5 * 60),
        }
    }
}

/// How a retried unit of work ended, short of exhausting its attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T> {
    Done(T),
    Cancelled,
}

impl RetryPolicy {
    /// Run `op` until it succeeds, the token ends the run, or attempts run out.
    ///
    /// After a failed attempt the token is checked; if another attempt
    /// remains the policy pauses and checks the token again. Running out of
    /// attempts is an error for the whole run.
    pub async fn run<T, F, Fut, S>(
        &self,
        label: &str,
        cancel: &CancelToken,
        sleeper: &S,
        mut op: F,
    ) -> RomDbResult<RetryOutcome<T>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = RomDbResult<T>>,
        S: Sleeper,
    {
        for attempt in 1..=self.attempts {
            match op(attempt).await {
                Ok(value) => return Ok(RetryOutcome::Done(value)),
                Err(e) => warn!(label, attempt, error = %e, "attempt failed"),
            }

            if cancel.should_end() {
                return Ok(RetryOutcome::Cancelled);
            }
            if attempt == self.attempts {
                break;
            }

            info!(label, pause_secs = self.pause.as_secs(), "waiting before next attempt");
            sleeper.sleep(self.pause).await;

            if cancel.should_end() {
                return Ok(RetryOutcome::Cancelled);
            }
        }

        Err(RomDbError::RetriesExhausted {
            name: label.to_string(),
            attempts: self.attempts,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;

    use super::*;

    /// Records requested pauses instead of sleeping.
    #[derive(Default)]
    pub struct FakeClock {
        pub pauses: RefCell<Vec<Duration>>,
    }

    impl Sleeper for FakeClock {
        async fn sleep(&self, duration: Duration) {
            self.pauses.borrow_mut().push(duration);
        }
    }

    /// Cancels the token on the first pause.
    pub struct CancellingClock(pub CancelToken);

    impl Sleeper for CancellingClock {
        async fn sleep(&self, _duration: Duration) {
            self.0.cancel();
        }
    }
}
