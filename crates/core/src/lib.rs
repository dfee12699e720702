//! Opsdesk core domain logic.
//!
//! This crate holds the pure, database-free parts of the notification
//! engine:
//!
//! - [`search`] — advanced-search grammar parsed into a [`search::FilterExpression`].
//! - [`query`] — structural filters compiled into a backend-agnostic
//!   [`query::NotificationQuery`], plus cursor-pagination primitives.
//! - [`preference`] — per-channel delivery policy and quiet-hours arithmetic.
//! - [`batch`] — chunking arithmetic for bulk mutations.
//! - [`export`] — CSV rendering of a notification feed.
//!
//! Everything here is evaluated against data passed in by the caller; the
//! repository layer in `opsdesk-db` owns the one lowering point to SQL.

pub mod batch;
pub mod error;
pub mod export;
pub mod preference;
pub mod query;
pub mod search;
pub mod types;
