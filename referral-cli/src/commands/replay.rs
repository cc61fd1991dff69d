//! Replay a scripted launch scenario against a live coordinator
//!
//! A scenario is a TOML file of `[[step]]` tables. Each step is either a
//! lifecycle signal or a reply to the oldest unanswered backend call:
//!
//! ```toml
//! [[step]]
//! signal = "cold_start"
//! uri = "wisaw://photos/42"
//!
//! [[step]]
//! resolve = { photoId = "42" }
//!
//! [[step]]
//! signal = "redelivered"
//! uri = "wisaw://friends/uuid-1"
//!
//! [[step]]
//! fail = "network unreachable"
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Args;
use referral_core::backend::PendingInit;
use referral_core::{
    AttributionBackend, BackendError, ChannelListener, DeepLinkTarget, LoggingListener,
    MockBackend, ReferralConfig, ReferringParams, ResultDispatcher, RouteListener, RoutedLaunch,
    SessionCoordinator, SessionId, SessionOutcome, SessionStore, SignalKind, TimeoutBackend,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};
use url::Url;

use super::route::describe_target;

/// How long a reply step waits for a backend call or its outcome
const STEP_WAIT: Duration = Duration::from_secs(5);

/// Replay command arguments
#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Scenario file
    pub scenario: PathBuf,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// One scripted action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    ColdStart(Option<Url>),
    Redelivered(Url),
    Resolve(ReferringParams),
    Fail(String),
}

#[derive(Debug, Deserialize)]
struct ScenarioFile {
    #[serde(default, rename = "step")]
    steps: Vec<RawStep>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStep {
    signal: Option<SignalKind>,
    uri: Option<Url>,
    resolve: Option<ReferringParams>,
    fail: Option<String>,
}

impl RawStep {
    fn into_step(self, number: usize) -> Result<Step> {
        match (self.signal, self.resolve, self.fail) {
            (Some(kind), None, None) => match (kind, self.uri) {
                (SignalKind::ColdStart, uri) => Ok(Step::ColdStart(uri)),
                (SignalKind::Redelivered, Some(uri)) => Ok(Step::Redelivered(uri)),
                (SignalKind::Redelivered, None) => {
                    bail!("step {}: redelivered signal requires a uri", number)
                }
            },
            (None, Some(params), None) if self.uri.is_none() => Ok(Step::Resolve(params)),
            (None, None, Some(message)) if self.uri.is_none() => Ok(Step::Fail(message)),
            (None, None, None) => bail!("step {}: expected signal, resolve, or fail", number),
            _ => bail!(
                "step {}: a step must be exactly one of signal, resolve, or fail",
                number
            ),
        }
    }
}

/// Parse a scenario document into steps
pub fn parse_scenario(contents: &str) -> Result<Vec<Step>> {
    let file: ScenarioFile = toml::from_str(contents).context("Invalid scenario")?;
    file.steps
        .into_iter()
        .enumerate()
        .map(|(index, raw)| raw.into_step(index + 1))
        .collect()
}

/// A dispatched outcome and the target it routed to
#[derive(Debug, Clone, Serialize)]
pub struct ReplayedOutcome {
    #[serde(flatten)]
    pub outcome: SessionOutcome,
    pub route: Option<DeepLinkTarget>,
}

/// Everything observed while replaying a scenario
#[derive(Debug, Default, Serialize)]
pub struct ReplayReport {
    pub outcomes: Vec<ReplayedOutcome>,
    pub backend_calls: Vec<Option<Url>>,
    pub ignored_signals: usize,
    pub in_flight: Option<SessionId>,
}

impl fmt::Display for ReplayReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.outcomes.is_empty() {
            writeln!(f, "No outcomes dispatched")?;
        }
        for replayed in &self.outcomes {
            match &replayed.outcome {
                SessionOutcome::Resolved { session_id, result } => {
                    let params: Vec<String> =
                        result.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                    writeln!(f, "session {} resolved {{{}}}", session_id, params.join(", "))?;
                }
                SessionOutcome::Failed { session_id, error } => {
                    writeln!(f, "session {} failed: {}", session_id, error)?;
                }
            }
            if let Some(target) = &replayed.route {
                writeln!(f, "  route: {}", describe_target(target))?;
            }
        }

        writeln!(f, "\nBackend calls:")?;
        for (index, call) in self.backend_calls.iter().enumerate() {
            match call {
                Some(uri) => writeln!(f, "  {}. {}", index + 1, uri)?,
                None => writeln!(f, "  {}. (no launch uri)", index + 1)?,
            }
        }

        if self.ignored_signals > 0 {
            writeln!(f, "\nIgnored cold starts: {}", self.ignored_signals)?;
        }
        if let Some(id) = self.in_flight {
            writeln!(f, "\nSession {} still pending at end of scenario", id)?;
        }
        Ok(())
    }
}

/// Run replay command
pub async fn run(args: ReplayArgs, config: &ReferralConfig) -> Result<()> {
    let contents = std::fs::read_to_string(&args.scenario)
        .with_context(|| format!("Failed to read scenario {}", args.scenario.display()))?;
    let steps = parse_scenario(&contents)?;
    info!(steps = steps.len(), path = %args.scenario.display(), "Replaying scenario");

    let report = run_scenario(steps, config).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report);
    }
    Ok(())
}

/// Drive a coordinator through the steps, answering backend calls as scripted
pub async fn run_scenario(steps: Vec<Step>, config: &ReferralConfig) -> Result<ReplayReport> {
    let (mock, mut pending) = MockBackend::manual();
    let mock = Arc::new(mock);
    let backend: Arc<dyn AttributionBackend> = match config.backend.timeout() {
        Some(limit) => Arc::new(TimeoutBackend::new(mock.clone(), limit)),
        None => mock.clone(),
    };

    // Router first so a route is queued before its outcome is observed
    let dispatcher = Arc::new(ResultDispatcher::new());
    let (router, routes) = RouteListener::new();
    let mut routes = RouteBuffer::new(routes);
    let router = Arc::new(router);
    let logger = Arc::new(LoggingListener);
    let (collector, mut outcomes) = ChannelListener::new();
    let collector = Arc::new(collector);
    dispatcher.register(&router);
    dispatcher.register(&logger);
    dispatcher.register(&collector);

    let (coordinator, handle) = SessionCoordinator::new(
        Arc::new(SessionStore::new()),
        dispatcher,
        backend,
        &config.coordinator,
    );
    let task = tokio::spawn(coordinator.run());

    let mut report = ReplayReport::default();
    for (index, step) in steps.into_iter().enumerate() {
        let number = index + 1;
        debug!(step = number, ?step, "Replaying step");
        match step {
            Step::ColdStart(uri) => {
                if !handle.on_visible(uri).await? {
                    report.ignored_signals += 1;
                }
                handle.status().await?;
            }
            Step::Redelivered(uri) => {
                handle.on_new_launch_data(uri).await?;
                handle.status().await?;
            }
            Step::Resolve(params) => {
                next_call(&mut pending, number).await?.resolve(params);
                let outcome = next_outcome(&mut outcomes, number).await?;
                report.outcomes.push(with_route(outcome, &mut routes));
            }
            Step::Fail(message) => {
                next_call(&mut pending, number)
                    .await?
                    .fail(BackendError::InitFailed(message));
                let outcome = next_outcome(&mut outcomes, number).await?;
                report.outcomes.push(with_route(outcome, &mut routes));
            }
        }
    }

    report.in_flight = handle.status().await?.in_flight;
    handle.shutdown().await?;
    task.await.context("Coordinator task failed")?;

    while let Ok(outcome) = outcomes.try_recv() {
        report.outcomes.push(with_route(outcome, &mut routes));
    }
    report.backend_calls = mock.calls().await;
    Ok(report)
}

async fn next_call(
    pending: &mut mpsc::UnboundedReceiver<PendingInit>,
    number: usize,
) -> Result<PendingInit> {
    match tokio::time::timeout(STEP_WAIT, pending.recv()).await {
        Ok(Some(call)) => Ok(call),
        _ => bail!("step {}: no backend call is outstanding", number),
    }
}

async fn next_outcome(
    outcomes: &mut mpsc::UnboundedReceiver<SessionOutcome>,
    number: usize,
) -> Result<SessionOutcome> {
    match tokio::time::timeout(STEP_WAIT, outcomes.recv()).await {
        Ok(Some(outcome)) => Ok(outcome),
        _ => bail!("step {}: reply produced no outcome", number),
    }
}

fn with_route(outcome: SessionOutcome, routes: &mut RouteBuffer) -> ReplayedOutcome {
    let route = routes.take(outcome.session_id());
    ReplayedOutcome { outcome, route }
}

/// Routes received from the router, held until their session's outcome is
/// reported.
struct RouteBuffer {
    rx: mpsc::UnboundedReceiver<RoutedLaunch>,
    held: HashMap<SessionId, DeepLinkTarget>,
}

impl RouteBuffer {
    fn new(rx: mpsc::UnboundedReceiver<RoutedLaunch>) -> Self {
        Self {
            rx,
            held: HashMap::new(),
        }
    }

    fn take(&mut self, session_id: SessionId) -> Option<DeepLinkTarget> {
        while let Ok(routed) = self.rx.try_recv() {
            self.held.insert(routed.session_id, routed.target);
        }
        self.held.remove(&session_id)
    }
}
