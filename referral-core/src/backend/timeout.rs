//! Timeout adapter for any attribution backend

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::traits::AttributionBackend;
use crate::error::BackendError;
use crate::session::ReferringParams;

/// Fails `init_session` with `BackendError::Timeout` when the inner backend
/// does not answer within the limit
pub struct TimeoutBackend<B> {
    inner: B,
    limit: Duration,
}

impl<B: AttributionBackend> TimeoutBackend<B> {
    pub fn new(inner: B, limit: Duration) -> Self {
        Self { inner, limit }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }
}

#[async_trait]
impl<B: AttributionBackend> AttributionBackend for TimeoutBackend<B> {
    async fn init_session(
        &self,
        launch_data: Option<Url>,
    ) -> Result<ReferringParams, BackendError> {
        match tokio::time::timeout(self.limit, self.inner.init_session(launch_data)).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout {
                after_ms: u64::try_from(self.limit.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;

    #[tokio::test]
    async fn passes_through_fast_responses() {
        let mock = MockBackend::new();
        mock.queue_response([("campaign", "x")].into_iter().collect())
            .await;
        let backend = TimeoutBackend::new(mock, Duration::from_secs(5));

        let result = backend.init_session(None).await.unwrap();

        assert_eq!(result.get("campaign"), Some("x"));
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_unanswered_calls() {
        let (mock, _pending) = MockBackend::manual();
        let backend = TimeoutBackend::new(mock, Duration::from_millis(250));

        let result = backend.init_session(None).await;

        assert_eq!(result, Err(BackendError::Timeout { after_ms: 250 }));
        assert_eq!(backend.inner().call_count().await, 1);
    }

    #[test]
    fn reports_inner_name() {
        let backend = TimeoutBackend::new(MockBackend::new(), Duration::from_secs(1));
        assert_eq!(backend.name(), "mock");
    }
}
