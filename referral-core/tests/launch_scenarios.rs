//! End-to-end launch scenarios through a running coordinator
//!
//! Each test drives the coordinator task through its public handle, answers
//! backend calls by hand via `MockBackend::manual`, and observes outcomes
//! through a channel listener.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;

use referral_core::backend::{MockBackend, PendingInit};
use referral_core::{
    BackendError, BeginOutcome, ChannelListener, CoordinatorConfig, CoordinatorHandle,
    CoordinatorPhase, DeepLinkTarget, LaunchSignal, ReferringParams, ResultDispatcher,
    RouteListener, SessionCoordinator, SessionId, SessionOutcome, SessionState, SessionStore,
};

fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

fn params(pairs: &[(&str, &str)]) -> ReferringParams {
    pairs.iter().copied().collect()
}

struct Harness {
    handle: CoordinatorHandle,
    store: Arc<SessionStore>,
    dispatcher: Arc<ResultDispatcher>,
    backend: Arc<MockBackend>,
    pending: mpsc::UnboundedReceiver<PendingInit>,
    outcomes: mpsc::UnboundedReceiver<SessionOutcome>,
    _listener: Arc<ChannelListener>,
    task: JoinHandle<()>,
}

impl Harness {
    async fn start() -> Self {
        let (backend, pending) = MockBackend::manual();
        let backend = Arc::new(backend);
        let store = Arc::new(SessionStore::new());
        let dispatcher = Arc::new(ResultDispatcher::new());
        let (listener, outcomes) = ChannelListener::new();
        let listener = Arc::new(listener);
        dispatcher.register(&listener);

        let (coordinator, handle) = SessionCoordinator::new(
            store.clone(),
            dispatcher.clone(),
            backend.clone(),
            &CoordinatorConfig::default(),
        );
        let task = tokio::spawn(coordinator.run());

        Self {
            handle,
            store,
            dispatcher,
            backend,
            pending,
            outcomes,
            _listener: listener,
            task,
        }
    }

    async fn next_call(&mut self) -> PendingInit {
        tokio::time::timeout(Duration::from_secs(5), self.pending.recv())
            .await
            .expect("backend was not called")
            .expect("backend dropped")
    }

    async fn next_outcome(&mut self) -> SessionOutcome {
        tokio::time::timeout(Duration::from_secs(5), self.outcomes.recv())
            .await
            .expect("no outcome dispatched")
            .expect("dispatcher dropped")
    }

    async fn stop(self) {
        self.handle.shutdown().await.unwrap();
        self.task.await.unwrap();
    }
}

// ==================== Scenario Tests ====================

#[tokio::test]
async fn cold_start_without_uri_resolves_once() {
    let mut h = Harness::start().await;

    assert!(h.handle.on_visible(None).await.unwrap());
    let call = h.next_call().await;
    assert!(call.launch_data().is_none());
    call.resolve(params(&[("campaign", "x")]));

    let outcome = h.next_outcome().await;
    assert_eq!(
        outcome,
        SessionOutcome::Resolved {
            session_id: SessionId::new(1),
            result: params(&[("campaign", "x")]),
        }
    );

    let status = h.handle.status().await.unwrap();
    assert_eq!(status.phase, CoordinatorPhase::Idle);
    assert!(h.outcomes.try_recv().is_err());
    h.stop().await;
}

#[tokio::test]
async fn cold_start_and_redelivery_of_same_uri_call_backend_once() {
    let mut h = Harness::start().await;
    let promo = url("app://promo/1");

    h.handle.on_visible(Some(promo.clone())).await.unwrap();
    h.handle.on_new_launch_data(promo.clone()).await.unwrap();

    let status = h.handle.status().await.unwrap();
    assert_eq!(status.in_flight, Some(SessionId::new(1)));
    assert!(status.queued.is_none());

    let call = h.next_call().await;
    assert_eq!(call.launch_data(), Some(&promo));
    call.resolve(ReferringParams::new());
    h.next_outcome().await;

    let status = h.handle.status().await.unwrap();
    assert_eq!(status.phase, CoordinatorPhase::Idle);
    assert_eq!(h.backend.calls().await, vec![Some(promo)]);
    assert_eq!(h.store.current().await.unwrap().id, SessionId::new(1));
    assert!(h.pending.try_recv().is_err());
    h.stop().await;
}

#[tokio::test]
async fn new_uri_during_flight_opens_second_session_after_first_completes() {
    let mut h = Harness::start().await;

    h.handle
        .on_visible(Some(url("app://promo/1")))
        .await
        .unwrap();
    let first = h.next_call().await;
    h.handle
        .on_new_launch_data(url("app://promo/2"))
        .await
        .unwrap();

    let status = h.handle.status().await.unwrap();
    assert_eq!(
        status.queued,
        Some(LaunchSignal::redelivered(url("app://promo/2")))
    );
    assert!(h.pending.try_recv().is_err());

    first.resolve(params(&[("campaign", "first")]));
    let second = h.next_call().await;
    assert_eq!(second.launch_data(), Some(&url("app://promo/2")));

    assert_eq!(h.next_outcome().await.session_id(), SessionId::new(1));
    second.resolve(params(&[("campaign", "second")]));
    assert_eq!(h.next_outcome().await.session_id(), SessionId::new(2));
    assert_eq!(
        h.backend.calls().await,
        vec![Some(url("app://promo/1")), Some(url("app://promo/2"))]
    );
    h.stop().await;
}

#[tokio::test]
async fn latest_queued_uri_wins() {
    let mut h = Harness::start().await;

    h.handle.on_visible(None).await.unwrap();
    let first = h.next_call().await;
    h.handle
        .on_new_launch_data(url("app://promo/2"))
        .await
        .unwrap();
    h.handle
        .on_new_launch_data(url("app://promo/3"))
        .await
        .unwrap();
    h.handle.status().await.unwrap();

    first.fail(BackendError::InitFailed("offline".to_string()));
    let second = h.next_call().await;

    assert_eq!(second.launch_data(), Some(&url("app://promo/3")));
    assert_eq!(h.backend.call_count().await, 2);
    h.stop().await;
}

#[tokio::test]
async fn backend_failure_is_delivered_and_not_retried() {
    let mut h = Harness::start().await;

    h.handle.on_visible(None).await.unwrap();
    h.next_call()
        .await
        .fail(BackendError::InitFailed("no network".to_string()));

    let outcome = h.next_outcome().await;
    match outcome {
        SessionOutcome::Failed { session_id, error } => {
            assert_eq!(session_id, SessionId::new(1));
            assert!(error.contains("no network"));
        }
        other => panic!("expected failure, got {other:?}"),
    }

    let status = h.handle.status().await.unwrap();
    assert_eq!(status.phase, CoordinatorPhase::Idle);
    assert!(status.in_flight.is_none());
    assert!(matches!(
        h.store.current().await.unwrap().state,
        SessionState::Failed { .. }
    ));
    assert_eq!(h.backend.call_count().await, 1);
    h.stop().await;
}

#[tokio::test]
async fn stale_completion_is_dropped_by_store() {
    let store = SessionStore::new();
    let BeginOutcome::Started(superseded) = store.try_begin_session(None).await else {
        panic!("expected a new session");
    };
    store
        .fail(&superseded, &BackendError::Timeout { after_ms: 10 })
        .await
        .unwrap();
    let BeginOutcome::Started(live) = store
        .try_begin_session(Some(url("app://promo/2")))
        .await
    else {
        panic!("expected a new session");
    };

    let result = store
        .complete(&superseded, params(&[("campaign", "late")]))
        .await;

    assert!(result.is_err());
    let current = store.current().await.unwrap();
    assert_eq!(current.id, live.id());
    assert_eq!(current.state, SessionState::Pending);
}

// ==================== Signal Source Tests ====================

#[tokio::test]
async fn repeated_visible_hook_is_not_a_second_cold_start() {
    let mut h = Harness::start().await;

    assert!(h.handle.on_visible(None).await.unwrap());
    h.next_call().await.resolve(ReferringParams::new());
    h.next_outcome().await;

    assert!(!h.handle.on_visible(None).await.unwrap());
    h.handle.status().await.unwrap();
    assert_eq!(h.backend.call_count().await, 1);
    h.stop().await;
}

#[tokio::test]
async fn redelivery_after_completion_opens_new_session() {
    let mut h = Harness::start().await;
    let promo = url("app://promo/1");

    h.handle.on_visible(Some(promo.clone())).await.unwrap();
    h.next_call().await.resolve(ReferringParams::new());
    h.next_outcome().await;

    h.handle.on_new_launch_data(promo.clone()).await.unwrap();
    let call = h.next_call().await;

    assert_eq!(call.launch_data(), Some(&promo));
    assert_eq!(h.store.pending_id().await, Some(SessionId::new(2)));
    h.stop().await;
}

// ==================== Listener Tests ====================

#[tokio::test]
async fn unregistered_listener_misses_later_sessions() {
    let mut h = Harness::start().await;
    let (late, mut late_rx) = ChannelListener::new();
    let late = Arc::new(late);
    let token = h.dispatcher.register(&late);

    h.handle.on_visible(None).await.unwrap();
    h.next_call().await.resolve(ReferringParams::new());
    h.next_outcome().await;
    assert!(late_rx.try_recv().is_ok());

    h.dispatcher.unregister(token);
    h.dispatcher.unregister(token);
    h.handle
        .on_new_launch_data(url("app://promo/9"))
        .await
        .unwrap();
    h.next_call().await.resolve(ReferringParams::new());
    h.next_outcome().await;

    assert!(late_rx.try_recv().is_err());
    h.stop().await;
}

#[tokio::test]
async fn route_listener_receives_target_for_referral_params() {
    let mut h = Harness::start().await;
    let (router, mut routes) = RouteListener::new();
    let router = Arc::new(router);
    h.dispatcher.register(&router);

    h.handle
        .on_visible(Some(url("wisaw://photos/42")))
        .await
        .unwrap();
    h.next_call().await.resolve(params(&[("photoId", "42")]));
    h.next_outcome().await;

    let routed = routes.try_recv().unwrap();
    assert_eq!(routed.session_id, SessionId::new(1));
    assert_eq!(
        routed.target,
        DeepLinkTarget::Photo {
            photo_id: "42".to_string()
        }
    );
    h.stop().await;
}

// ==================== Shutdown Tests ====================

#[tokio::test]
async fn loop_exits_when_handles_dropped_and_idle() {
    let h = Harness::start().await;
    let Harness { handle, task, .. } = h;

    drop(handle);

    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("coordinator did not stop")
        .unwrap();
}

#[tokio::test]
async fn loop_waits_for_in_flight_session_before_exiting_on_drop() {
    let mut h = Harness::start().await;
    h.handle.on_visible(None).await.unwrap();
    let call = h.next_call().await;

    let Harness {
        handle,
        task,
        mut outcomes,
        _listener,
        ..
    } = h;
    drop(handle);
    call.resolve(params(&[("campaign", "x")]));

    let outcome = tokio::time::timeout(Duration::from_secs(5), outcomes.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(outcome.is_resolved());
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("coordinator did not stop")
        .unwrap();
}

#[tokio::test]
async fn cancelled_coordinator_rejects_signals() {
    let h = Harness::start().await;
    let token = h.handle.cancellation_token();

    token.cancel();
    let Harness { handle, task, .. } = h;
    task.await.unwrap();

    let err = handle.on_new_launch_data(url("app://promo/1")).await;
    assert!(err.is_err());
}

#[tokio::test]
async fn undelivered_cold_start_is_not_used_up() {
    let h = Harness::start().await;
    h.handle.cancellation_token().cancel();
    let Harness { handle, task, .. } = h;
    task.await.unwrap();

    assert!(handle.on_visible(None).await.is_err());
    assert!(handle.on_visible(None).await.is_err());
}
