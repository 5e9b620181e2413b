//! Shared outbound request budget
//!
//! Every GraphQL call goes through one [`RateLimiter`]: a single-token bucket
//! that hands out one request slot per `interval`, plus a reset deadline
//! reported by GitHub. While a deadline is in the future no caller proceeds,
//! including callers already queued for a slot.

use chrono::{DateTime, Utc};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::client::ClientError;

/// Reset reported by GitHub, pinned to the runtime clock when recorded
#[derive(Debug, Clone, Copy)]
struct ResetDeadline {
    at: DateTime<Utc>,
    until: Instant,
}

pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Instant>,
    reset: Mutex<Option<ResetDeadline>>,
}

impl RateLimiter {
    /// Budget of `requests_per_hour`, evenly spaced
    pub fn per_hour(requests_per_hour: u32) -> Self {
        let interval = Duration::from_secs(3600) / requests_per_hour.max(1);
        Self::with_interval(interval)
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(Instant::now()),
            reset: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Record a reset instant reported by GitHub. All later acquisitions wait
    /// for it, and so do callers still queued for a slot.
    pub fn record_reset(&self, reset_at: DateTime<Utc>) {
        let remaining = (reset_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        let mut guard = self.reset.lock().unwrap_or_else(|e| e.into_inner());
        info!("Rate limit reset recorded at {}", reset_at);
        *guard = Some(ResetDeadline {
            at: reset_at,
            until: Instant::now() + remaining,
        });
    }

    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        let reset = *self.reset.lock().unwrap_or_else(|e| e.into_inner());
        reset.map(|r| r.at)
    }

    /// Wait until both the reset deadline has passed and a request slot is free.
    ///
    /// Returns [`ClientError::Cancelled`] as soon as `cancel` fires; the
    /// reserved slot is handed back when possible.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), ClientError> {
        loop {
            if cancel.is_cancelled() {
                return Err(ClientError::Cancelled);
            }

            if let Some(until) = self.pending_reset() {
                debug!(
                    "Waiting {:?} for rate limit reset",
                    until.saturating_duration_since(Instant::now())
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(ClientError::Cancelled),
                    _ = sleep_until(until) => {}
                }
            }

            let slot = self.reserve();
            if slot > Instant::now() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        self.release(slot);
                        return Err(ClientError::Cancelled);
                    }
                    _ = sleep_until(slot) => {}
                }
            }

            // A reset recorded while queued voids the slot
            if self.pending_reset().is_none() {
                return Ok(());
            }
        }
    }

    fn pending_reset(&self) -> Option<Instant> {
        let reset = (*self.reset.lock().unwrap_or_else(|e| e.into_inner()))?;
        (reset.until > Instant::now()).then_some(reset.until)
    }

    fn reserve(&self) -> Instant {
        let mut next = self.next_slot.lock().unwrap_or_else(|e| e.into_inner());
        let slot = (*next).max(Instant::now());
        *next = slot + self.interval;
        slot
    }

    // Only the most recent reservation can be rolled back
    fn release(&self, slot: Instant) {
        let mut next = self.next_slot.lock().unwrap_or_else(|e| e.into_inner());
        if *next == slot + self.interval {
            *next = slot;
        }
    }
}
