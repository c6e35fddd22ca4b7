//! Throttled, fire-and-forget `last_used_at` updates.
//!
//! Successful authentications schedule a bump of the key's last-used
//! timestamp. Updates are batched for about a second and then throttled
//! per key for a full window, so a busy key writes at most once per
//! window. Failures are logged and never affect the authentication
//! result.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use uuid::Uuid;

use super::ApiKeyStore;

/// Delay before the write, so bursts collapse into one update.
const BATCH_DELAY: Duration = Duration::from_secs(1);
/// Minimum spacing between updates for the same key.
const THROTTLE_WINDOW: Duration = Duration::from_secs(60);

pub struct LastUsedTracker {
    store: Arc<dyn ApiKeyStore>,
    scheduled: Arc<DashMap<Uuid, Instant>>,
    batch_delay: Duration,
    throttle_window: Duration,
}

impl LastUsedTracker {
    pub fn new(store: Arc<dyn ApiKeyStore>) -> Self {
        Self::with_timing(store, BATCH_DELAY, THROTTLE_WINDOW)
    }

    pub fn with_timing(
        store: Arc<dyn ApiKeyStore>,
        batch_delay: Duration,
        throttle_window: Duration,
    ) -> Self {
        Self {
            store,
            scheduled: Arc::new(DashMap::new()),
            batch_delay,
            throttle_window,
        }
    }

    /// Schedule a last-used update for `key_id`. Returns immediately; the
    /// write happens on a background task. Repeat calls within the
    /// throttle window are dropped.
    pub fn schedule(&self, key_id: Uuid) {
        let now = Instant::now();

        // Entry still inside its window: already handled.
        if let Some(entry) = self.scheduled.get(&key_id) {
            if now.duration_since(*entry) < self.throttle_window {
                return;
            }
        }
        self.scheduled.insert(key_id, now);

        let store = Arc::clone(&self.store);
        let scheduled = Arc::clone(&self.scheduled);
        let batch_delay = self.batch_delay;
        let throttle_window = self.throttle_window;

        tokio::spawn(async move {
            tokio::time::sleep(batch_delay).await;
            if let Err(error) = store.touch_last_used(key_id).await {
                tracing::warn!(%key_id, %error, "failed to update last_used_at");
            }

            tokio::time::sleep(throttle_window.saturating_sub(batch_delay)).await;
            // Only clear our own entry: a re-schedule may have replaced it
            // with a newer instant whose window must run its full course.
            scheduled.remove_if(&key_id, |_, scheduled_at| *scheduled_at == now);
        });
    }
}
