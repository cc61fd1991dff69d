//! Attribution backend abstraction

pub mod mock;
pub mod timeout;
pub mod traits;

// Re-export key types for convenience
pub use mock::{MockBackend, PendingInit};
pub use timeout::TimeoutBackend;
pub use traits::AttributionBackend;
