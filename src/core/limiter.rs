//! Sliding-window RPM/TPM rate limiting for outgoing requests

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// Length of the sliding quota window.
const WINDOW: Duration = Duration::from_secs(60);

/// Safety margin added to every wait so a caller does not wake exactly on
/// the window boundary and re-trigger the same check.
const WAIT_BUFFER: Duration = Duration::from_millis(500);

/// Ordered timestamped events inside one quota window.
///
/// One abstraction, two aggregations: the request window counts events
/// (`len`), the token window sums their weights (`total`). Events are
/// appended in non-decreasing time order and pruned eagerly once older
/// than the window length.
#[derive(Debug, Default)]
struct SlidingWindow {
    events: VecDeque<(Instant, u64)>,
}

impl SlidingWindow {
    fn prune(&mut self, now: Instant) {
        while self
            .events
            .front()
            .is_some_and(|(t, _)| now.duration_since(*t) > WINDOW)
        {
            self.events.pop_front();
        }
    }

    fn push(&mut self, now: Instant, weight: u64) {
        self.events.push_back((now, weight));
    }

    fn oldest(&self) -> Option<Instant> {
        self.events.front().map(|(t, _)| *t)
    }

    fn len(&self) -> usize {
        self.events.len()
    }

    fn total(&self) -> u64 {
        self.events.iter().map(|(_, w)| w).sum()
    }
}

#[derive(Debug, Default)]
struct LimiterState {
    requests: SlidingWindow,
    tokens: SlidingWindow,
}

/// Admission gate limiting requests per minute (RPM) and tokens per minute
/// (TPM) over a sliding 60-second window, shared by all workers of a run.
///
/// [`RateLimiter::acquire`] never rejects: it blocks until the request may
/// fire. A cap of 0 disables that dimension entirely. The check-and-update
/// sequence is serialized behind one async mutex so two workers can never
/// both observe "quota available" and jointly over-admit; the mutex is held
/// across the wait, so blocked callers queue with no ordering guarantee.
#[derive(Debug)]
pub struct RateLimiter {
    rpm: u32,
    tpm: u64,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    /// Create a limiter with the given caps. 0 means unlimited.
    pub fn new(rpm: u32, tpm: u64) -> Self {
        Self {
            rpm,
            tpm,
            state: Mutex::new(LimiterState::default()),
        }
    }

    /// Block until it is safe to make a request, then record it.
    ///
    /// `estimated_tokens` is the caller's cost estimate for the request; it
    /// is charged to the token window on admission. A single request whose
    /// estimate alone exceeds `tpm` is still admitted once the token window
    /// drains empty: the wait branch only fires while the window holds
    /// events, so such a request passes the cap rather than waiting forever.
    pub async fn acquire(&self, estimated_tokens: u64) {
        let mut state = self.state.lock().await;

        loop {
            let now = Instant::now();
            state.requests.prune(now);
            state.tokens.prune(now);

            // RPM check
            let current_rpm = state.requests.len() as u32;
            if self.rpm > 0 && current_rpm >= self.rpm {
                if let Some(oldest) = state.requests.oldest() {
                    let wait = WINDOW.saturating_sub(now.duration_since(oldest)) + WAIT_BUFFER;
                    warn!(
                        "Rate limit (RPM): {}/{}, sleeping for {:.2}s",
                        current_rpm,
                        self.rpm,
                        wait.as_secs_f64()
                    );
                    sleep(wait).await;
                    continue;
                }
            }

            // TPM check
            let current_tpm = state.tokens.total();
            if self.tpm > 0 && current_tpm + estimated_tokens > self.tpm {
                if let Some(oldest) = state.tokens.oldest() {
                    let wait = WINDOW.saturating_sub(now.duration_since(oldest)) + WAIT_BUFFER;
                    warn!(
                        "Rate limit (TPM): {}/{}, sleeping for {:.2}s",
                        current_tpm,
                        self.tpm,
                        wait.as_secs_f64()
                    );
                    sleep(wait).await;
                    continue;
                }
            }

            state.requests.push(now, 1);
            state.tokens.push(now, estimated_tokens);
            debug!(
                "Admitted request ({} tokens), window: {} requests / {} tokens",
                estimated_tokens,
                state.requests.len(),
                state.tokens.total()
            );
            return;
        }
    }
}
