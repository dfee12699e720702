//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod notification_preference_repo;
pub mod notification_repo;

pub use notification_preference_repo::NotificationPreferenceRepo;
pub use notification_repo::{FeedPage, NotificationRepo};
