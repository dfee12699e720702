//! The notification engine: event routing, delivery-eligibility
//! resolution, and batched bulk mutations.

mod bulk;
mod resolver;
mod router;

pub use bulk::BulkProcessor;
pub use resolver::{Clock, PreferenceResolver, SystemClock};
pub use router::NotificationRouter;
