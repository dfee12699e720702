//! Database row models and DTOs.

pub mod notification;
