// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Proactive token renewal timer.
//!
//! At most one timer is pending per scheduler. Scheduling again replaces the
//! pending timer, cancelling clears it, and a timer that fires leaves the
//! scheduler idle before running its callback (so the callback may schedule
//! the next renewal).

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::services::token_clock;
use crate::time_utils::now_epoch_secs;

/// Renew this long before the access token expires (5 minutes).
pub const REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Never arm a timer shorter than this (1 minute).
pub const MIN_REFRESH_DELAY_SECS: i64 = 60;

/// Delay before renewing a token that expires at `expires_at` (Unix seconds).
///
/// `max(time_until_expiry - 5 min, 1 min)`; expired tokens get the floor.
pub fn refresh_delay(expires_at: i64, now: i64) -> Duration {
    let secs = expires_at
        .saturating_sub(now)
        .saturating_sub(REFRESH_MARGIN_SECS)
        .max(MIN_REFRESH_DELAY_SECS);
    Duration::from_secs(secs as u64)
}

struct ArmedTimer {
    id: u64,
    delay: Duration,
    handle: JoinHandle<()>,
}

/// Owns the single pending renewal timer.
///
/// Must be used from within a Tokio runtime. Dropping the scheduler cancels
/// the pending timer.
#[derive(Default)]
pub struct RefreshScheduler {
    armed: Arc<Mutex<Option<ArmedTimer>>>,
    next_id: AtomicU64,
}

impl RefreshScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a renewal for `raw_access_token`, replacing any pending timer.
    ///
    /// Returns the armed delay. A token whose expiry cannot be read leaves the
    /// scheduler idle and returns `MalformedToken`.
    pub fn schedule<F, Fut>(&self, raw_access_token: &str, on_fire: F) -> Result<Duration>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let expires_at = match token_clock::expiry_of(raw_access_token) {
            Ok(exp) => exp,
            Err(e) => {
                self.cancel();
                return Err(e);
            }
        };
        let delay = refresh_delay(expires_at, now_epoch_secs());
        self.arm(delay, on_fire);
        Ok(delay)
    }

    /// Arm a one-shot timer firing after `delay`, replacing any pending timer.
    pub fn arm<F, Fut>(&self, delay: Duration, on_fire: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let slot = Arc::clone(&self.armed);

        let mut armed = lock(&self.armed);
        if let Some(previous) = armed.take() {
            previous.handle.abort();
        }

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut current = lock(&slot);
                if current.as_ref().map(|t| t.id) != Some(id) {
                    return;
                }
                // Detach before firing so the callback can arm the next timer.
                current.take();
            }
            tracing::debug!(delay_secs = delay.as_secs(), "Token refresh timer fired");
            on_fire().await;
        });

        tracing::debug!(delay_secs = delay.as_secs(), "Token refresh scheduled");
        *armed = Some(ArmedTimer { id, delay, handle });
    }

    /// Clear the pending timer, if any.
    pub fn cancel(&self) {
        if let Some(timer) = lock(&self.armed).take() {
            timer.handle.abort();
            tracing::debug!("Token refresh timer cancelled");
        }
    }

    pub fn is_armed(&self) -> bool {
        lock(&self.armed).is_some()
    }

    /// Delay the pending timer was armed with.
    pub fn armed_delay(&self) -> Option<Duration> {
        lock(&self.armed).as_ref().map(|t| t.delay)
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

// The slot is only held for a few instructions and never across an await.
fn lock(slot: &Mutex<Option<ArmedTimer>>) -> std::sync::MutexGuard<'_, Option<ArmedTimer>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
