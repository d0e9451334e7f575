//! Waiting out asynchronous backend state machines
//!
//! The remote side exposes progress as a polled status field. The waiter
//! polls, sleeps, and polls again until a caller-supplied predicate holds or
//! the deadline passes. A poll that itself hangs is cut off by the same
//! deadline.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, timeout_at, Instant};
use tracing::debug;

use crate::error::{ConvergeError, Result};

/// Default pause between two polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default upper bound for one wait.
pub const DEFAULT_WAIT_DEADLINE: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Pause between two polls
    pub interval: Duration,
    /// Total time allowed before giving up
    pub deadline: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            deadline: DEFAULT_WAIT_DEADLINE,
        }
    }
}

impl WaitPolicy {
    pub fn new(interval: Duration, deadline: Duration) -> Self {
        Self { interval, deadline }
    }

    /// Poll until `is_terminal` accepts a record.
    ///
    /// `is_terminal` sees every polled record, in order, and may record
    /// observations from the non-terminal ones. The first poll happens
    /// immediately. Errors from `poll` end the wait at once.
    pub async fn await_terminal<T, F, Fut, P>(
        &self,
        what: &str,
        mut poll: F,
        mut is_terminal: P,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        P: FnMut(&T) -> bool,
    {
        let started = Instant::now();
        let deadline = started + self.deadline;
        let timed_out = || ConvergeError::Timeout {
            what: what.to_string(),
            waited: started.elapsed(),
        };

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let record = timeout_at(deadline, poll()).await.map_err(|_| timed_out())??;
            if is_terminal(&record) {
                debug!(what, attempt, "reached terminal status");
                return Ok(record);
            }

            if Instant::now() + self.interval > deadline {
                return Err(timed_out());
            }
            debug!(
                what,
                attempt,
                "not in terminal status yet, waiting {:?}",
                self.interval
            );
            sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn policy() -> WaitPolicy {
        WaitPolicy::new(Duration::from_secs(2), Duration::from_secs(10))
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_first_terminal_record() {
        let polls = Arc::new(AtomicU32::new(0));
        let counter = polls.clone();

        let status = policy()
            .await_terminal(
                "user app",
                || {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    async move { Ok(if n < 2 { "PENDING" } else { "READY" }) }
                },
                |status| *status == "READY",
            )
            .await
            .unwrap();

        assert_eq!(status, "READY");
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_on_first_poll_does_not_sleep() {
        let started = Instant::now();
        policy()
            .await_terminal("volume v1", || async { Ok("available") }, |s| *s != "detaching")
            .await
            .unwrap();
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_exceeded_is_timeout() {
        let err = policy()
            .await_terminal("volume v1", || async { Ok("detaching") }, |s| *s != "detaching")
            .await
            .unwrap_err();

        match err {
            ConvergeError::Timeout { what, waited } => {
                assert_eq!(what, "volume v1");
                assert!(waited <= Duration::from_secs(10));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_poll_is_cut_off_by_deadline() {
        let err = policy()
            .await_terminal(
                "user app",
                || async {
                    sleep(Duration::from_secs(3600)).await;
                    Ok("READY")
                },
                |s| *s == "READY",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ConvergeError::Timeout { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_error_is_not_retried() {
        let polls = Arc::new(AtomicU32::new(0));
        let counter = polls.clone();

        let err = policy()
            .await_terminal(
                "user app",
                || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Err::<&str, _>(ConvergeError::Configuration("boom".to_string())) }
                },
                |_| true,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ConvergeError::Configuration(_)));
        assert_eq!(polls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_predicate_observes_every_poll() {
        let seen = std::sync::Mutex::new(Vec::new());
        let polls = AtomicU32::new(0);

        policy()
            .await_terminal(
                "user app",
                || {
                    let n = polls.fetch_add(1, Ordering::SeqCst);
                    async move { Ok(n) }
                },
                |n| {
                    seen.lock().unwrap().push(*n);
                    *n == 2
                },
            )
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    }
}
