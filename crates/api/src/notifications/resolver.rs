//! Per-user delivery-eligibility resolution.
//!
//! Loads the user's stored preference record (or substitutes system
//! defaults) and answers "may this notification go out on this channel
//! right now?". The time source is injected so quiet-hours decisions are
//! deterministic under test.

use std::sync::Arc;

use opsdesk_core::preference::{Channel, DeliveryPolicy, TimeOfDay};
use opsdesk_core::types::{DbId, Timestamp};
use opsdesk_db::repositories::NotificationPreferenceRepo;
use opsdesk_db::DbPool;

/// Injectable time source.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Production clock: `chrono::Utc::now()`.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        chrono::Utc::now()
    }
}

/// Resolves delivery eligibility against stored preferences.
pub struct PreferenceResolver {
    pool: DbPool,
    clock: Arc<dyn Clock>,
}

impl PreferenceResolver {
    pub fn new(pool: DbPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    /// The user's effective delivery policy: their stored record, or the
    /// system defaults when none exists. A missing record is not an error.
    pub async fn policy_for(&self, user_id: DbId) -> Result<DeliveryPolicy, sqlx::Error> {
        let stored = NotificationPreferenceRepo::get(&self.pool, user_id).await?;
        Ok(stored
            .as_ref()
            .map(DeliveryPolicy::from)
            .unwrap_or_default())
    }

    /// Decide whether a notification of `kind` may be delivered to the user
    /// over the named channel right now.
    ///
    /// Unrecognized channel names fail closed.
    pub async fn should_send(
        &self,
        user_id: DbId,
        kind: &str,
        channel: &str,
    ) -> Result<bool, sqlx::Error> {
        let Some(channel) = Channel::parse(channel) else {
            tracing::debug!(channel, "Unknown delivery channel, refusing");
            return Ok(false);
        };
        let policy = self.policy_for(user_id).await?;
        let now = TimeOfDay::from_timestamp(self.clock.now());
        Ok(policy.should_send(kind, channel, now))
    }

    /// Whether the user's quiet-hours window covers the current time.
    pub async fn is_in_quiet_hours(&self, user_id: DbId) -> Result<bool, sqlx::Error> {
        let policy = self.policy_for(user_id).await?;
        let now = TimeOfDay::from_timestamp(self.clock.now());
        Ok(policy.quiet_hours.contains(now))
    }
}
