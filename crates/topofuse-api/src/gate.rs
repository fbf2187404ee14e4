// Rate-limited request gate
//
// Spaces outbound calls for one vendor connection and absorbs a single
// 429 with a fixed backoff. One gate per connection, never shared across
// vendors or processes.

use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::Error;

/// Spacing and backoff tuning for a [`RequestGate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateConfig {
    /// Minimum time between the starts of two consecutive calls.
    pub min_interval: Duration,
    /// Wait applied after a 429 before the single retry.
    pub backoff: Duration,
}

impl Default for GateConfig {
    /// 5 requests/second and a one second backoff.
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(200),
            backoff: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Default)]
struct RateLimitState {
    /// Start time reserved by the most recent call.
    last_request: Option<Instant>,
    consecutive_throttles: u32,
}

/// Enforces call spacing and one-shot 429 backoff.
#[derive(Debug)]
pub struct RequestGate {
    config: GateConfig,
    state: Mutex<RateLimitState>,
}

impl Default for RequestGate {
    fn default() -> Self {
        Self::new(GateConfig::default())
    }
}

impl RequestGate {
    pub fn new(config: GateConfig) -> Self {
        Self {
            config,
            state: Mutex::new(RateLimitState::default()),
        }
    }

    pub fn config(&self) -> GateConfig {
        self.config
    }

    /// Number of 429s seen since the last non-throttled response.
    pub async fn consecutive_throttles(&self) -> u32 {
        self.state.lock().await.consecutive_throttles
    }

    /// Run `call` behind the gate.
    ///
    /// Waits for the next free slot, issues the call, and on a 429 waits
    /// the backoff window and retries exactly once. A second 429 is returned
    /// to the caller as `Error::RateLimited`.
    pub async fn throttled_call<T, F, Fut>(&self, mut call: F) -> Result<T, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        self.wait_for_slot().await;
        match call().await {
            Err(Error::RateLimited { retry_after_secs }) => {
                self.record_throttle().await;
                warn!(
                    retry_after_secs,
                    backoff_ms = self.config.backoff.as_millis(),
                    "throttled by vendor, backing off"
                );
                tokio::time::sleep(self.config.backoff).await;

                self.wait_for_slot().await;
                let retried = call().await;
                if retried.as_ref().is_err_and(Error::is_rate_limited) {
                    self.record_throttle().await;
                } else {
                    self.reset_throttles().await;
                }
                retried
            }
            other => {
                self.reset_throttles().await;
                other
            }
        }
    }

    /// Reserve the next start slot, then sleep until it arrives.
    ///
    /// The reservation happens under the lock, the sleep outside it, so
    /// concurrent callers queue up one interval apart.
    async fn wait_for_slot(&self) {
        let slot = {
            let mut state = self.state.lock().await;
            let now = Instant::now();
            let slot = match state.last_request {
                Some(last) => (last + self.config.min_interval).max(now),
                None => now,
            };
            state.last_request = Some(slot);
            slot
        };

        if slot > Instant::now() {
            debug!(wait_ms = (slot - Instant::now()).as_millis(), "spacing request");
            tokio::time::sleep_until(slot).await;
        }
    }

    async fn record_throttle(&self) {
        self.state.lock().await.consecutive_throttles += 1;
    }

    async fn reset_throttles(&self) {
        self.state.lock().await.consecutive_throttles = 0;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn gate() -> Arc<RequestGate> {
        Arc::new(RequestGate::new(GateConfig {
            min_interval: Duration::from_millis(200),
            backoff: Duration::from_secs(1),
        }))
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_are_spaced() {
        let gate = gate();
        let starts = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for _ in 0..6 {
            let gate = Arc::clone(&gate);
            let starts = Arc::clone(&starts);
            handles.push(tokio::spawn(async move {
                gate.throttled_call(|| {
                    let starts = Arc::clone(&starts);
                    async move {
                        starts.lock().await.push(Instant::now());
                        Ok::<_, Error>(())
                    }
                })
                .await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let mut starts = starts.lock().await.clone();
        starts.sort();
        assert_eq!(starts.len(), 6);
        for pair in starts.windows(2) {
            assert!(
                pair[1] - pair[0] >= Duration::from_millis(200),
                "calls {:?} apart",
                pair[1] - pair[0]
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_call_is_not_delayed() {
        let gate = gate();
        let before = Instant::now();
        gate.throttled_call(|| async { Ok::<_, Error>(()) })
            .await
            .unwrap();
        assert_eq!(Instant::now(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn single_429_is_retried_after_backoff() {
        let gate = gate();
        let calls = AtomicU32::new(0);
        let before = Instant::now();

        let result = gate
            .throttled_call(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(Error::RateLimited {
                            retry_after_secs: 1,
                        })
                    } else {
                        Ok("ports")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "ports");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(Instant::now() - before >= Duration::from_secs(1));
        assert_eq!(gate.consecutive_throttles().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn second_429_is_terminal() {
        let gate = gate();
        let calls = AtomicU32::new(0);

        let result: Result<(), Error> = gate
            .throttled_call(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(Error::RateLimited {
                        retry_after_secs: 2,
                    })
                }
            })
            .await;

        assert!(matches!(result, Err(Error::RateLimited { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2, "no unbounded retry");
        assert_eq!(gate.consecutive_throttles().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn other_errors_pass_through_without_retry() {
        let gate = gate();
        let calls = AtomicU32::new(0);

        let result: Result<(), Error> = gate
            .throttled_call(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(Error::Api {
                        status: 500,
                        message: "boom".into(),
                    })
                }
            })
            .await;

        assert!(matches!(result, Err(Error::Api { status: 500, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
