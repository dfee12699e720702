//! Repository for the `notification_preferences` table.
//!
//! At most one row per user; a missing row is a valid state meaning "use
//! system defaults", not an error.

use sqlx::PgPool;

use opsdesk_core::types::DbId;

use crate::models::notification::{NotificationPreference, UpdatePreferences};

/// Column list for `notification_preferences` queries.
const COLUMNS: &str = "id, user_id, email_enabled, email_types, push_enabled, push_types, \
    in_app_enabled, in_app_types, quiet_hours_enabled, quiet_hours_start, quiet_hours_end, \
    email_frequency, digest_enabled, marketing_enabled, promotional_enabled, \
    created_at, updated_at";

/// Provides CRUD operations for notification preferences.
pub struct NotificationPreferenceRepo;

impl NotificationPreferenceRepo {
    /// Get the stored preference record for a user, if any.
    pub async fn get(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<NotificationPreference>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM notification_preferences WHERE user_id = $1");
        sqlx::query_as::<_, NotificationPreference>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Insert or partially update a user's preference record.
    ///
    /// Uses `INSERT ... ON CONFLICT (user_id) DO UPDATE` with `COALESCE` so
    /// only the fields that are `Some` in the patch overwrite stored values;
    /// on first insert, `None` fields take the column defaults.
    pub async fn upsert(
        pool: &PgPool,
        user_id: DbId,
        patch: &UpdatePreferences,
    ) -> Result<NotificationPreference, sqlx::Error> {
        let query = format!(
            "INSERT INTO notification_preferences \
                (user_id, email_enabled, email_types, push_enabled, push_types, \
                 in_app_enabled, in_app_types, quiet_hours_enabled, \
                 quiet_hours_start, quiet_hours_end, email_frequency, \
                 digest_enabled, marketing_enabled, promotional_enabled) \
             VALUES ($1, \
                COALESCE($2, true), COALESCE($3, ARRAY['welcome', 'security', 'billing']), \
                COALESCE($4, true), COALESCE($5, ARRAY['urgent', 'reminders']), \
                COALESCE($6, true), COALESCE($7, ARRAY['all']), \
                COALESCE($8, false), $9, $10, COALESCE($11, 'immediate'), \
                COALESCE($12, false), COALESCE($13, false), COALESCE($14, false)) \
             ON CONFLICT (user_id) DO UPDATE SET \
                email_enabled = COALESCE($2, notification_preferences.email_enabled), \
                email_types = COALESCE($3, notification_preferences.email_types), \
                push_enabled = COALESCE($4, notification_preferences.push_enabled), \
                push_types = COALESCE($5, notification_preferences.push_types), \
                in_app_enabled = COALESCE($6, notification_preferences.in_app_enabled), \
                in_app_types = COALESCE($7, notification_preferences.in_app_types), \
                quiet_hours_enabled = COALESCE($8, notification_preferences.quiet_hours_enabled), \
                quiet_hours_start = COALESCE($9, notification_preferences.quiet_hours_start), \
                quiet_hours_end = COALESCE($10, notification_preferences.quiet_hours_end), \
                email_frequency = COALESCE($11, notification_preferences.email_frequency), \
                digest_enabled = COALESCE($12, notification_preferences.digest_enabled), \
                marketing_enabled = COALESCE($13, notification_preferences.marketing_enabled), \
                promotional_enabled = COALESCE($14, notification_preferences.promotional_enabled), \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NotificationPreference>(&query)
            .bind(user_id)
            .bind(patch.email_enabled)
            .bind(&patch.email_types)
            .bind(patch.push_enabled)
            .bind(&patch.push_types)
            .bind(patch.in_app_enabled)
            .bind(&patch.in_app_types)
            .bind(patch.quiet_hours_enabled)
            .bind(&patch.quiet_hours_start)
            .bind(&patch.quiet_hours_end)
            .bind(&patch.email_frequency)
            .bind(patch.digest_enabled)
            .bind(patch.marketing_enabled)
            .bind(patch.promotional_enabled)
            .fetch_one(pool)
            .await
    }

    /// Delete a user's preference record, reverting them to system defaults.
    ///
    /// Returns `true` if a row existed.
    pub async fn delete(pool: &PgPool, user_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notification_preferences WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
