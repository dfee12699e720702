//! Notification entity models and DTOs.

use opsdesk_core::preference::{ChannelPolicy, DeliveryPolicy, QuietHours, TimeOfDay};
use opsdesk_core::query::Cursor;
use opsdesk_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `notifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: DbId,
    pub user_id: DbId,
    pub message: String,
    /// The notification kind, e.g. `"billing"`. Nullable.
    pub kind: Option<String>,
    pub is_read: bool,
    pub link: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Notification {
    /// The keyset-pagination key of this row.
    pub fn cursor(&self) -> Cursor {
        Cursor {
            created_at: self.created_at,
            id: self.id,
        }
    }
}

/// A row from the `notification_preferences` table.
///
/// At most one per user; absence means "use system defaults".
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NotificationPreference {
    pub id: DbId,
    pub user_id: DbId,
    pub email_enabled: bool,
    pub email_types: Vec<String>,
    pub push_enabled: bool,
    pub push_types: Vec<String>,
    pub in_app_enabled: bool,
    pub in_app_types: Vec<String>,
    pub quiet_hours_enabled: bool,
    /// `HH:MM`, parsed into a `TimeOfDay` at the boundary.
    pub quiet_hours_start: Option<String>,
    pub quiet_hours_end: Option<String>,
    pub email_frequency: String,
    pub digest_enabled: bool,
    pub marketing_enabled: bool,
    pub promotional_enabled: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&NotificationPreference> for DeliveryPolicy {
    /// Resolve a stored row into the policy the eligibility check runs on.
    ///
    /// Unparseable quiet-hours bounds resolve to `None`, which the window
    /// comparison treats as "never in quiet hours".
    fn from(row: &NotificationPreference) -> Self {
        DeliveryPolicy {
            email: ChannelPolicy {
                enabled: row.email_enabled,
                kinds: row.email_types.clone(),
            },
            push: ChannelPolicy {
                enabled: row.push_enabled,
                kinds: row.push_types.clone(),
            },
            in_app: ChannelPolicy {
                enabled: row.in_app_enabled,
                kinds: row.in_app_types.clone(),
            },
            quiet_hours: QuietHours {
                enabled: row.quiet_hours_enabled,
                start: row.quiet_hours_start.as_deref().and_then(TimeOfDay::parse),
                end: row.quiet_hours_end.as_deref().and_then(TimeOfDay::parse),
            },
        }
    }
}

/// DTO for creating a notification.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateNotification {
    pub user_id: DbId,
    pub message: String,
    pub kind: Option<String>,
    pub link: Option<String>,
}

/// Partial patch applied by bulk updates. `None` fields are left unchanged.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct NotificationPatch {
    pub is_read: Option<bool>,
}

/// DTO for partially updating a preference record. `None` fields keep their
/// stored (or default) value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePreferences {
    pub email_enabled: Option<bool>,
    pub email_types: Option<Vec<String>>,
    pub push_enabled: Option<bool>,
    pub push_types: Option<Vec<String>>,
    pub in_app_enabled: Option<bool>,
    pub in_app_types: Option<Vec<String>>,
    pub quiet_hours_enabled: Option<bool>,
    pub quiet_hours_start: Option<String>,
    pub quiet_hours_end: Option<String>,
    pub email_frequency: Option<String>,
    pub digest_enabled: Option<bool>,
    pub marketing_enabled: Option<bool>,
    pub promotional_enabled: Option<bool>,
}
