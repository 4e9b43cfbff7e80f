//! Per-host session pipeline.
//!
//! One pipeline run takes a host from platform lookup through connect,
//! authenticate, escalate and command execution to close, and always ends
//! in exactly one [`HostResult`].

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, trace, warn};
use serde::{Serialize, Serializer};
use tokio::time::Instant;
use tokio::time::error::Elapsed;

use crate::driver::{DriverFactory, TransportDriver};
use crate::error::{Error, ErrorKind, Result};
use crate::inventory::Host;
use crate::platform::PlatformRegistry;
use crate::resolver::{CommandCatalog, CommandResolver, CommandSet};

/// Terminal outcome of one host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// No platform profile for the host's platform tag.
    Unsupported,
    /// The connection could not be opened.
    ConnectFailed,
    /// Credentials were rejected.
    AuthFailed,
    /// Escalation was rejected or a required secret was missing.
    EscalationFailed,
    /// The session was lost while commands were running.
    CommandError,
    /// The run deadline expired first.
    Timeout,
    /// Session opened and authenticated; there were no commands to run.
    Connected,
    /// Every command was sent.
    Completed,
}

impl Stage {
    /// Whether the host was reached and handled as intended.
    pub fn is_success(self) -> bool {
        matches!(self, Stage::Connected | Stage::Completed)
    }

    /// Whether running the host again could change the outcome.
    pub fn is_retryable(self) -> bool {
        !self.is_success() && self != Stage::Unsupported
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Unsupported => "unsupported",
            Stage::ConnectFailed => "connect_failed",
            Stage::AuthFailed => "auth_failed",
            Stage::EscalationFailed => "escalation_failed",
            Stage::CommandError => "command_error",
            Stage::Timeout => "timeout",
            Stage::Connected => "connected",
            Stage::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// Pipeline states. `Failed` carries the kind of the failure that ended it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Init,
    Connecting,
    Authenticating,
    Escalating,
    Executing,
    Closing,
    Done,
    Failed(ErrorKind),
}

/// Result of one command.
#[derive(Debug, Clone, Serialize)]
pub struct CommandOutcome {
    /// The command as sent.
    pub command: String,

    /// Normalized output; empty when the command produced none.
    pub output: String,

    /// Failure classification, `None` on success.
    pub error: Option<ErrorKind>,

    /// Device message or error text behind `error`.
    pub detail: Option<String>,

    /// Time spent on this command.
    #[serde(serialize_with = "as_secs")]
    pub elapsed: Duration,
}

impl CommandOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Everything recorded for one host.
#[derive(Debug, Clone, Serialize)]
pub struct HostResult {
    /// The host as submitted.
    pub host: Arc<Host>,

    /// Outcomes in command order.
    pub outcomes: Vec<CommandOutcome>,

    /// Terminal stage.
    pub stage: Stage,

    /// What ended the pipeline early, if anything did.
    pub overall_error: Option<String>,

    /// Wall-clock time for the host.
    #[serde(serialize_with = "as_secs")]
    pub elapsed: Duration,
}

impl HostResult {
    /// Result for a host that never reached its pipeline.
    pub(crate) fn not_run(host: Arc<Host>, stage: Stage, message: impl Into<String>) -> Self {
        Self {
            host,
            outcomes: vec![],
            stage,
            overall_error: Some(message.into()),
            elapsed: Duration::ZERO,
        }
    }

    pub fn is_success(&self) -> bool {
        self.stage.is_success()
    }
}

fn as_secs<S: Serializer>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Bookkeeping for one run of the state machine.
struct HostRun {
    host: Arc<Host>,
    state: PipelineState,
    outcomes: Vec<CommandOutcome>,
    started: Instant,
}

impl HostRun {
    fn new(host: Arc<Host>) -> Self {
        Self {
            host,
            state: PipelineState::Init,
            outcomes: vec![],
            started: Instant::now(),
        }
    }

    fn advance(&mut self, next: PipelineState) {
        trace!("{}: {:?} -> {:?}", self.host.name, self.state, next);
        self.state = next;
    }

    fn finish(mut self, ending: Ending) -> HostResult {
        self.advance(ending.terminal_state());

        let Ending { stage, error, .. } = ending;
        match &error {
            Some(message) => warn!("{}: {} ({})", self.host.name, stage, message),
            None => info!(
                "{}: {} ({} commands)",
                self.host.name,
                stage,
                self.outcomes.len()
            ),
        }

        HostResult {
            host: self.host,
            outcomes: self.outcomes,
            stage,
            overall_error: error,
            elapsed: self.started.elapsed(),
        }
    }
}

/// How a host's run ended.
struct Ending {
    stage: Stage,
    kind: Option<ErrorKind>,
    error: Option<String>,
}

impl Ending {
    fn ok(stage: Stage) -> Self {
        Self {
            stage,
            kind: None,
            error: None,
        }
    }

    fn failed(stage: Stage, err: &Error) -> Self {
        Self {
            stage,
            kind: Some(err.kind()),
            error: Some(format!("{}: {}", err.kind(), err)),
        }
    }

    fn unsupported(platform: &str) -> Self {
        Self {
            stage: Stage::Unsupported,
            kind: Some(ErrorKind::Unsupported),
            error: Some(format!("unsupported platform: {}", platform)),
        }
    }

    fn timed_out() -> Self {
        Self {
            stage: Stage::Timeout,
            kind: Some(ErrorKind::Timeout),
            error: Some("run deadline exceeded".to_string()),
        }
    }

    /// The state machine's final state, carrying the error's own kind.
    fn terminal_state(&self) -> PipelineState {
        match self.kind {
            Some(kind) => PipelineState::Failed(kind),
            None => PipelineState::Done,
        }
    }
}

/// Runs the per-host state machine.
///
/// Shared read-only by every host task of a run.
pub struct SessionPipeline<F> {
    registry: Arc<PlatformRegistry>,
    catalog: Arc<CommandCatalog>,
    factory: Arc<F>,
    deadline: Option<Instant>,
    close_timeout: Duration,
}

impl<F: DriverFactory> SessionPipeline<F> {
    /// Create a pipeline without a deadline.
    pub fn new(
        registry: Arc<PlatformRegistry>,
        catalog: Arc<CommandCatalog>,
        factory: Arc<F>,
    ) -> Self {
        Self {
            registry,
            catalog,
            factory,
            deadline: None,
            close_timeout: Duration::from_secs(5),
        }
    }

    /// Bound every step by an absolute deadline.
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Upper bound on closing the session.
    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    async fn bounded<T>(
        &self,
        step: impl Future<Output = Result<T>>,
    ) -> std::result::Result<Result<T>, Elapsed> {
        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, step).await,
            None => Ok(step.await),
        }
    }

    /// Run the pipeline for one host.
    pub async fn run(&self, host: Arc<Host>) -> HostResult {
        let mut run = HostRun::new(host.clone());

        let profile = match self.registry.resolve(&host.platform) {
            Ok(profile) => profile,
            Err(_) => return run.finish(Ending::unsupported(&host.platform)),
        };
        let commands = CommandResolver::resolve(&host, &self.catalog);
        let mut driver = self.factory.create(&host, &profile);

        run.advance(PipelineState::Connecting);
        debug!("{}: connecting to {} ({})", host.name, host.hostname, profile.transport);
        match self.bounded(driver.connect()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return run.finish(Ending::failed(Stage::ConnectFailed, &e)),
            Err(_) => return run.finish(Ending::timed_out()),
        }

        let ending = self
            .drive(&mut driver, profile.escalation.is_required(), &commands, &mut run)
            .await;

        run.advance(PipelineState::Closing);
        match tokio::time::timeout(self.close_timeout, driver.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("{}: close failed: {}", host.name, e),
            Err(_) => debug!("{}: close timed out", host.name),
        }

        run.finish(ending)
    }

    /// Everything between a successful connect and close.
    async fn drive(
        &self,
        driver: &mut F::Driver,
        escalate: bool,
        commands: &CommandSet,
        run: &mut HostRun,
    ) -> Ending {
        run.advance(PipelineState::Authenticating);
        match self.bounded(driver.authenticate()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Ending::failed(Stage::AuthFailed, &e),
            Err(_) => return Ending::timed_out(),
        }

        if escalate {
            run.advance(PipelineState::Escalating);
            match self.bounded(driver.escalate()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Ending::failed(Stage::EscalationFailed, &e),
                Err(_) => return Ending::timed_out(),
            }
        }

        if commands.is_empty() {
            return Ending::ok(Stage::Connected);
        }

        run.advance(PipelineState::Executing);
        for command in commands {
            let started = Instant::now();
            let outcome = match self.bounded(driver.send_command(command)).await {
                Err(_) => return Ending::timed_out(),
                Ok(Ok(response)) => CommandOutcome {
                    command: command.clone(),
                    error: response.failure_message.as_ref().map(|_| ErrorKind::CommandFailed),
                    detail: response.failure_message,
                    output: response.result,
                    elapsed: response.elapsed,
                },
                Ok(Err(e)) => {
                    let lost = e.is_session_lost();
                    run.outcomes.push(CommandOutcome {
                        command: command.clone(),
                        output: String::new(),
                        error: Some(match e.kind() {
                            ErrorKind::ProtocolError => ErrorKind::ProtocolError,
                            _ => ErrorKind::CommandFailed,
                        }),
                        detail: Some(e.to_string()),
                        elapsed: started.elapsed(),
                    });
                    if lost {
                        return Ending::failed(Stage::CommandError, &e);
                    }
                    continue;
                }
            };
            run.outcomes.push(outcome);
        }

        Ending::ok(Stage::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ChannelError, DriverError};
    use crate::inventory::Credentials;
    use crate::testing::{MockFactory, MockScript};

    fn pipeline(factory: MockFactory) -> SessionPipeline<MockFactory> {
        SessionPipeline::new(
            Arc::new(PlatformRegistry::builtin()),
            Arc::new(
                CommandCatalog::new().with("cisco", ["show version", "show ip interface brief"]),
            ),
            Arc::new(factory),
        )
    }

    fn host(name: &str, platform: &str) -> Arc<Host> {
        Arc::new(
            Host::new(name, "192.0.2.1", platform, Credentials::new("u", "p"))
                .with_group("cisco"),
        )
    }

    #[tokio::test]
    async fn test_completed_in_order() {
        let factory = MockFactory::default();
        let stats = factory.stats();
        let result = pipeline(factory).run(host("r1", "cisco")).await;

        assert_eq!(result.stage, Stage::Completed);
        assert_eq!(result.host.name, "r1");
        let commands: Vec<_> = result.outcomes.iter().map(|o| o.command.as_str()).collect();
        assert_eq!(commands, ["show version", "show ip interface brief"]);
        assert!(result.outcomes.iter().all(|o| o.error.is_none() && !o.output.is_empty()));
        assert!(result.overall_error.is_none());
        assert_eq!(stats.opens(), 1);
        assert_eq!(stats.closes(), 1);
    }

    #[tokio::test]
    async fn test_unknown_platform_creates_no_driver() {
        let factory = MockFactory::default();
        let stats = factory.stats();
        let result = pipeline(factory).run(host("x", "unknown_vendor")).await;

        assert_eq!(result.stage, Stage::Unsupported);
        assert!(result.outcomes.is_empty());
        assert_eq!(
            result.overall_error.as_deref(),
            Some("unsupported platform: unknown_vendor")
        );
        assert_eq!(stats.created(), 0);
    }

    #[tokio::test]
    async fn test_connect_failure_is_not_closed() {
        let factory = MockFactory::default().script("r1", MockScript::default().fail_connect());
        let stats = factory.stats();
        let result = pipeline(factory).run(host("r1", "cisco_ios")).await;

        assert_eq!(result.stage, Stage::ConnectFailed);
        assert!(result.outcomes.is_empty());
        assert_eq!(stats.opens(), 0);
        assert_eq!(stats.closes(), 0);
    }

    #[tokio::test]
    async fn test_auth_failure_skips_escalation() {
        let factory = MockFactory::default().script("r1", MockScript::default().fail_auth());
        let stats = factory.stats();
        let result = pipeline(factory).run(host("r1", "cisco_ios")).await;

        assert_eq!(result.stage, Stage::AuthFailed);
        assert!(result.outcomes.is_empty());
        assert_eq!(stats.escalations(), 0);
        assert_eq!(stats.closes(), 1);
    }

    #[tokio::test]
    async fn test_escalation_failure_sends_no_commands() {
        let factory = MockFactory::default().script("r1", MockScript::default().fail_escalate());
        let stats = factory.stats();
        let result = pipeline(factory).run(host("r1", "cisco_ios")).await;

        assert_eq!(result.stage, Stage::EscalationFailed);
        assert!(result.outcomes.is_empty());
        assert_eq!(stats.escalations(), 1);
        assert_eq!(stats.commands(), 0);
        assert_eq!(stats.closes(), 1);
    }

    #[tokio::test]
    async fn test_no_escalation_when_not_required() {
        let factory = MockFactory::default();
        let stats = factory.stats();
        let result = pipeline(factory).run(host("r1", "cisco_nxos")).await;

        assert_eq!(result.stage, Stage::Completed);
        assert_eq!(stats.escalations(), 0);
    }

    #[tokio::test]
    async fn test_rejected_command_continues() {
        let factory = MockFactory::default()
            .script("r1", MockScript::default().reject("show version"));
        let result = pipeline(factory).run(host("r1", "cisco_ios")).await;

        assert_eq!(result.stage, Stage::Completed);
        assert_eq!(result.outcomes.len(), 2);
        assert_eq!(result.outcomes[0].error, Some(ErrorKind::CommandFailed));
        assert!(result.outcomes[1].is_success());
    }

    #[tokio::test]
    async fn test_lost_session_stops_execution() {
        let factory = MockFactory::default()
            .script("r1", MockScript::default().lose_session_at("show version"));
        let stats = factory.stats();
        let result = pipeline(factory).run(host("r1", "cisco_ios")).await;

        assert_eq!(result.stage, Stage::CommandError);
        assert!(result
            .overall_error
            .as_deref()
            .is_some_and(|e| e.starts_with("connect failed: ")));
        assert_eq!(result.outcomes.len(), 1);
        assert!(result.outcomes[0].error.is_some());
        assert_eq!(stats.commands(), 1);
        assert_eq!(stats.closes(), 1);
    }

    #[tokio::test]
    async fn test_empty_command_set_only_connects() {
        let factory = MockFactory::default();
        let host = Arc::new(Host::new("reach", "192.0.2.9", "linux", Credentials::new("u", "p")));
        let result = pipeline(factory).run(host).await;

        assert_eq!(result.stage, Stage::Connected);
        assert!(result.outcomes.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_closes_session() {
        let factory = MockFactory::default()
            .script("r1", MockScript::default().latency(Duration::from_secs(10)));
        let stats = factory.stats();
        let deadline = Instant::now() + Duration::from_secs(15);
        let result = pipeline(factory)
            .with_deadline(Some(deadline))
            .run(host("r1", "cisco_ios"))
            .await;

        assert_eq!(result.stage, Stage::Timeout);
        assert_eq!(stats.opens(), 1);
        assert_eq!(stats.closes(), 1);
    }

    #[test]
    fn test_stage_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Stage::EscalationFailed).unwrap(),
            "\"escalation_failed\""
        );
        assert_eq!(Stage::ConnectFailed.to_string(), "connect_failed");
        assert!(Stage::Timeout.is_retryable());
        assert!(!Stage::Unsupported.is_retryable());
    }

    #[test]
    fn test_terminal_state_keeps_error_kind() {
        let lost: Error = ChannelError::Closed.into();
        let ending = Ending::failed(Stage::CommandError, &lost);
        assert_eq!(
            ending.terminal_state(),
            PipelineState::Failed(ErrorKind::ConnectFailed)
        );

        let malformed: Error = DriverError::UnexpectedResponse {
            message: "garbled prompt".to_string(),
        }
        .into();
        assert_eq!(
            Ending::failed(Stage::CommandError, &malformed).terminal_state(),
            PipelineState::Failed(ErrorKind::ProtocolError)
        );

        assert_eq!(
            Ending::timed_out().terminal_state(),
            PipelineState::Failed(ErrorKind::Timeout)
        );
        assert_eq!(Ending::ok(Stage::Completed).terminal_state(), PipelineState::Done);
    }
}
