//! Batched bulk mutations over notification id sets.
//!
//! Large id collections are split into bounded-size chunks and issued to
//! the store one batch at a time — batch N+1 is not sent until batch N
//! completes, bounding load against the database. A failing batch
//! propagates its error and halts the remaining batches, so callers can see
//! which slice of work did not complete.
//!
//! After a successful mutation, each distinct owning user gets a
//! best-effort side-channel event; that fan-out can never fail or delay the
//! primary operation.

use std::sync::Arc;

use opsdesk_core::batch::{self, BatchOutcome};
use opsdesk_core::types::DbId;
use opsdesk_db::models::notification::NotificationPatch;
use opsdesk_db::repositories::NotificationRepo;
use opsdesk_db::DbPool;
use opsdesk_events::channel::send_best_effort;
use opsdesk_events::{ClientEvent, DeliveryChannel};

/// Executes bulk notification mutations in bounded batches.
pub struct BulkProcessor {
    pool: DbPool,
    delivery: Option<Arc<dyn DeliveryChannel>>,
    batch_size: usize,
}

impl BulkProcessor {
    pub fn new(
        pool: DbPool,
        delivery: Option<Arc<dyn DeliveryChannel>>,
        batch_size: usize,
    ) -> Self {
        Self {
            pool,
            delivery,
            batch_size,
        }
    }

    /// Apply a patch to the given ids in sequential batches.
    ///
    /// An empty id set returns a zero outcome without touching the store.
    pub async fn bulk_update(
        &self,
        ids: &[DbId],
        patch: &NotificationPatch,
    ) -> Result<BatchOutcome, sqlx::Error> {
        let mut outcome = BatchOutcome::default();
        if ids.is_empty() {
            return Ok(outcome);
        }
        for chunk in batch::chunks(ids, self.batch_size) {
            let affected = NotificationRepo::update_many(&self.pool, chunk, patch).await?;
            outcome.count += affected;
            outcome.batches += 1;
            tracing::debug!(
                batch = outcome.batches,
                affected,
                "Bulk update batch applied"
            );
        }
        Ok(outcome)
    }

    /// Mark the given notifications read or unread, then notify each
    /// distinct owner's connected clients.
    pub async fn set_read(&self, ids: &[DbId], is_read: bool) -> Result<BatchOutcome, sqlx::Error> {
        let patch = NotificationPatch {
            is_read: Some(is_read),
        };
        let outcome = self.bulk_update(ids, &patch).await?;
        if outcome.count > 0 {
            let owners = NotificationRepo::distinct_user_ids(&self.pool, ids).await?;
            let name = if is_read {
                "notifications.bulk_read"
            } else {
                "notifications.bulk_unread"
            };
            self.fan_out(&owners, name, outcome.count).await;
        }
        Ok(outcome)
    }

    /// Delete the given notifications in sequential batches, then notify
    /// each distinct owner.
    ///
    /// Owners are resolved before the delete — afterwards the rows are gone.
    pub async fn delete(&self, ids: &[DbId]) -> Result<BatchOutcome, sqlx::Error> {
        let mut outcome = BatchOutcome::default();
        if ids.is_empty() {
            return Ok(outcome);
        }
        let owners = NotificationRepo::distinct_user_ids(&self.pool, ids).await?;
        for chunk in batch::chunks(ids, self.batch_size) {
            let affected = NotificationRepo::delete_many(&self.pool, chunk).await?;
            outcome.count += affected;
            outcome.batches += 1;
        }
        if outcome.count > 0 {
            self.fan_out(&owners, "notifications.bulk_deleted", outcome.count)
                .await;
        }
        Ok(outcome)
    }

    /// Mark a user's entire feed read or unread.
    pub async fn set_read_all(&self, user_id: DbId, is_read: bool) -> Result<u64, sqlx::Error> {
        let count = NotificationRepo::set_read_all(&self.pool, user_id, is_read).await?;
        if count > 0 {
            let name = if is_read {
                "notifications.bulk_read"
            } else {
                "notifications.bulk_unread"
            };
            self.fan_out(&[user_id], name, count).await;
        }
        Ok(count)
    }

    /// Delete every notification of one kind from a user's feed.
    pub async fn delete_by_kind(&self, user_id: DbId, kind: &str) -> Result<u64, sqlx::Error> {
        let count = NotificationRepo::delete_by_kind(&self.pool, user_id, kind).await?;
        if count > 0 {
            self.fan_out(&[user_id], "notifications.bulk_deleted", count)
                .await;
        }
        Ok(count)
    }

    /// Best-effort per-owner side-channel events.
    async fn fan_out(&self, owners: &[DbId], name: &str, count: u64) {
        let event = ClientEvent::new(name, serde_json::json!({ "count": count }));
        for &user_id in owners {
            send_best_effort(self.delivery.as_ref(), user_id, &event).await;
        }
    }
}
