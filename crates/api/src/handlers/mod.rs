//! HTTP request handlers, grouped by resource.

pub mod event;
pub mod notification;
pub mod preference;
