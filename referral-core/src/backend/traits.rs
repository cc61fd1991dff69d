//! AttributionBackend trait
//!
//! The backend is the external service that resolves referral data for a
//! launch. `init_session` resolves exactly once, which stands in for the
//! single completion callback of platform SDKs.

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::error::BackendError;
use crate::session::ReferringParams;

/// Trait for attribution backends
///
/// Implementations own network access, retries against their service, and
/// timeouts. The coordinator never retries a failed call.
#[async_trait]
pub trait AttributionBackend: Send + Sync {
    /// Open a backend session for the given launch URI
    async fn init_session(&self, launch_data: Option<Url>)
    -> Result<ReferringParams, BackendError>;

    /// Short name used in logs
    fn name(&self) -> &str {
        "backend"
    }
}

#[async_trait]
impl<B: AttributionBackend + ?Sized> AttributionBackend for Arc<B> {
    async fn init_session(
        &self,
        launch_data: Option<Url>,
    ) -> Result<ReferringParams, BackendError> {
        (**self).init_session(launch_data).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
