//! Thread polling
//!
//! Keeps a view of a thread current by re-fetching it on a fixed
//! interval. Failed fetches back off exponentially; too many in a row
//! and the poller gives up. Dropping the handle stops the task.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Polling cadence and failure policy
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Delay between successful fetches
    pub interval: Duration,
    /// Upper bound on the backoff, as a multiple of `interval`
    pub max_backoff_factor: u32,
    /// Consecutive failures after which polling stops
    pub max_consecutive_failures: u32,
}

impl PollerConfig {
    /// Chat and purchase threads (3 s)
    pub fn threads() -> Self {
        Self {
            interval: Duration::from_secs(3),
            max_backoff_factor: 8,
            max_consecutive_failures: 5,
        }
    }

    /// Notification feed (5 s)
    pub fn notifications() -> Self {
        Self {
            interval: Duration::from_secs(5),
            ..Self::threads()
        }
    }

    /// Delay after `failures` consecutive failed fetches
    pub fn backoff(&self, failures: u32) -> Duration {
        let factor = 2u32
            .checked_pow(failures)
            .unwrap_or(u32::MAX)
            .min(self.max_backoff_factor.max(1));
        self.interval * factor
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self::threads()
    }
}

/// Latest outcome published by a poller
#[derive(Debug, Clone, PartialEq)]
pub enum PollerState<T> {
    /// Nothing fetched yet
    Loading,
    /// Most recent successful fetch
    Ready(T),
    /// Polling stopped after too many consecutive failures
    GaveUp { error: String },
}

/// Spawns polling tasks
pub struct ThreadPoller;

impl ThreadPoller {
    /// Start polling with `fetch`. The first fetch happens immediately.
    pub fn spawn<T, E, F, Fut>(config: PollerConfig, mut fetch: F) -> PollerHandle<T>
    where
        T: Send + Sync + 'static,
        E: Display + Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let (tx, rx) = watch::channel(PollerState::Loading);

        let task = tokio::spawn(async move {
            let mut delay = Duration::ZERO;
            let mut failures = 0u32;

            loop {
                tokio::time::sleep(delay).await;

                match fetch().await {
                    Ok(value) => {
                        failures = 0;
                        if tx.send(PollerState::Ready(value)).is_err() {
                            break;
                        }
                        delay = config.interval;
                    }
                    Err(e) => {
                        failures += 1;
                        if failures >= config.max_consecutive_failures {
                            tracing::warn!(error = %e, failures = failures, "Poller giving up");
                            let _ = tx.send(PollerState::GaveUp {
                                error: e.to_string(),
                            });
                            break;
                        }
                        delay = config.backoff(failures);
                        tracing::debug!(
                            error = %e,
                            failures = failures,
                            retry_in_ms = delay.as_millis() as u64,
                            "Poll failed, backing off"
                        );
                    }
                }
            }
        });

        PollerHandle { rx, task }
    }
}

/// Owner of a running poller; dropping it cancels the task.
pub struct PollerHandle<T> {
    rx: watch::Receiver<PollerState<T>>,
    task: JoinHandle<()>,
}

impl<T: Clone> PollerHandle<T> {
    /// Snapshot of the latest state
    pub fn latest(&self) -> PollerState<T> {
        self.rx.borrow().clone()
    }
}

impl<T> PollerHandle<T> {
    /// Receiver notified on every publish
    pub fn subscribe(&self) -> watch::Receiver<PollerState<T>> {
        self.rx.clone()
    }

    /// Stop polling now
    pub fn stop(self) {}
}

impl<T> Drop for PollerHandle<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}
