//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "SNMP switch adapter."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Binary switch backed by a single SNMP scalar.
//!
//! Reads classify the scalar at `baseoid` into on/off/unknown and store the
//! result as the visible state. Writes send the command payload to
//! `command_oid` and leave the visible state alone until the next read.
//! At most one request per switch is outstanding at any time.

use parking_lot::RwLock;
use r_ems_logging::{ems_debug, ems_error, ems_warn, log_command_event, CommandOutcome, LogContext};
use tokio::sync::Mutex;

use crate::codec::{Classification, Rejection, SwitchState, TargetState};
use crate::config::{SwitchConfig, SwitchSettings};
use crate::error::{ConfigError, SwitchError};
use crate::transport::{SnmpTransport, TransportError};

/// On/off switch driven through an [`SnmpTransport`].
///
/// Requests from one switch never overlap; [`SnmpSwitch::state`] can be read
/// without waiting on them.
#[derive(Debug)]
pub struct SnmpSwitch<T> {
    config: SwitchConfig,
    transport: T,
    endpoint: String,
    state_oid: String,
    command_oid: String,
    session: Mutex<()>,
    state: RwLock<SwitchState>,
}

impl<T: SnmpTransport> SnmpSwitch<T> {
    /// Wrap a validated configuration. The state starts as unknown.
    pub fn new(config: SwitchConfig, transport: T) -> Self {
        Self {
            endpoint: config.target().endpoint(),
            state_oid: config.state_oid().to_string(),
            command_oid: config.command_oid().to_string(),
            config,
            transport,
            session: Mutex::new(()),
            state: RwLock::new(SwitchState::Unknown),
        }
    }

    /// Validate `settings`, build the switch and read its initial state.
    pub async fn setup(settings: &SwitchSettings, transport: T) -> Result<Self, ConfigError> {
        let config = SwitchConfig::from_settings(settings)?;
        let switch = Self::new(config, transport);
        switch.read_state().await;
        Ok(switch)
    }

    /// Validated configuration of this switch.
    pub fn config(&self) -> &SwitchConfig {
        &self.config
    }

    /// Identity used in logs, e.g. `switch.snmp`.
    pub fn entity_id(&self) -> &str {
        self.config.entity_id()
    }

    /// Configured display name.
    pub fn name(&self) -> &str {
        self.config.name()
    }

    /// State reported by the most recent read.
    pub fn state(&self) -> SwitchState {
        *self.state.read()
    }

    /// `None` while the state is unknown.
    pub fn is_on(&self) -> Option<bool> {
        match self.state() {
            SwitchState::On => Some(true),
            SwitchState::Off => Some(false),
            SwitchState::Unknown => None,
        }
    }

    fn log_context<'a>(&'a self, oid: &'a str) -> LogContext<'a> {
        LogContext::new()
            .with_entity(self.entity_id())
            .with_host(&self.endpoint)
            .with_oid(oid)
    }

    /// Issue one GET and update the visible state from the response.
    ///
    /// Transport failures and unrecognised values yield [`SwitchState::Unknown`].
    pub async fn read_state(&self) -> SwitchState {
        let _session = self.session.lock().await;
        let ctx = self.log_context(&self.state_oid);

        let state = match self
            .transport
            .get(self.config.target(), self.config.state_oid())
            .await
        {
            Ok(scalar) => {
                let classification = self.config.codec().classify(&scalar);
                match classification {
                    Classification::Unrecognized(Rejection::UnmatchedValue) => {
                        ems_warn!(
                            context = ctx,
                            "Invalid payload '{}' received for entity {}, state is unknown",
                            scalar,
                            self.entity_id()
                        );
                    }
                    Classification::Unrecognized(Rejection::WrongKind(kind)) => {
                        ems_warn!(
                            context = ctx,
                            "Invalid payload '{}' received for entity {}, {} values cannot carry {} payloads",
                            scalar,
                            self.entity_id(),
                            kind,
                            self.config.codec().payloads().representation()
                        );
                    }
                    Classification::On | Classification::Off => {
                        ems_debug!(context = ctx, "read '{}' from device", scalar);
                    }
                }
                classification.state()
            }
            Err(err) => {
                match &err {
                    TransportError::Unreachable { .. } | TransportError::Timeout { .. } => {
                        ems_error!(context = ctx, "Unable to reach {}: {}", self.endpoint, err);
                    }
                    TransportError::ErrorStatus { .. } | TransportError::Malformed(_) => {
                        ems_error!(
                            context = ctx,
                            "Failed to read state of entity {}: {}",
                            self.entity_id(),
                            err
                        );
                    }
                }
                SwitchState::Unknown
            }
        };

        *self.state.write() = state;
        state
    }

    /// Issue one SET carrying the command payload for `target`.
    ///
    /// The visible state is not changed; the next read reflects the device.
    pub async fn write_state(&self, target: TargetState) -> Result<(), SwitchError> {
        let ctx = self.log_context(&self.command_oid);
        let command = match target {
            TargetState::On => "turn_on",
            TargetState::Off => "turn_off",
        };

        let value = match self.config.codec().encode(target) {
            Ok(value) => value,
            Err(err) => {
                log_command_event(
                    Some(&ctx),
                    command,
                    &format!("unable to encode command payload: {err}"),
                    CommandOutcome::Failed,
                );
                return Err(err.into());
            }
        };

        let _session = self.session.lock().await;
        match self
            .transport
            .set(self.config.target(), self.config.command_oid(), value.clone())
            .await
        {
            Ok(echoed) => {
                if echoed != value {
                    ems_debug!(
                        context = ctx,
                        "agent echoed '{}' for requested '{}'",
                        echoed,
                        value
                    );
                }
                log_command_event(
                    Some(&ctx),
                    command,
                    &format!("set '{value}' on entity {}", self.entity_id()),
                    CommandOutcome::Accepted,
                );
                Ok(())
            }
            Err(err) => {
                log_command_event(
                    Some(&ctx),
                    command,
                    &format!("set '{value}' on entity {} failed: {err}", self.entity_id()),
                    CommandOutcome::Failed,
                );
                Err(err.into())
            }
        }
    }

    /// Send the on command. See [`SnmpSwitch::write_state`].
    pub async fn turn_on(&self) -> Result<(), SwitchError> {
        self.write_state(TargetState::On).await
    }

    /// Send the off command. See [`SnmpSwitch::write_state`].
    pub async fn turn_off(&self) -> Result<(), SwitchError> {
        self.write_state(TargetState::Off).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use r_ems_logging::LogCapture;

    use super::*;
    use crate::codec::Payload;
    use crate::transport::memory::{AgentRequest, InMemoryAgent};
    use crate::transport::ErrorStatus;
    use crate::value::{Oid, TypedScalar};

    const BASEOID: &str = "1.3.6.1.4.1.8072.2.1.1";

    fn oid() -> Oid {
        BASEOID.parse().unwrap()
    }

    fn settings() -> SwitchSettings {
        SwitchSettings::new("192.0.2.1", BASEOID)
    }

    fn agent_with(value: TypedScalar) -> Arc<InMemoryAgent> {
        Arc::new(InMemoryAgent::with_objects([(oid(), value)]))
    }

    #[tokio::test]
    async fn state_is_unknown_before_first_read() {
        let config = SwitchConfig::from_settings(&settings()).unwrap();
        let switch = SnmpSwitch::new(config, agent_with(TypedScalar::Integer32(1)));
        assert_eq!(switch.state(), SwitchState::Unknown);
        assert_eq!(switch.is_on(), None);
        assert_eq!(switch.read_state().await, SwitchState::On);
        assert_eq!(switch.is_on(), Some(true));
    }

    #[tokio::test]
    async fn unmatched_value_warns_with_entity() {
        let capture = LogCapture::new();
        let _guard = capture.set_default();
        let switch = SnmpSwitch::setup(&settings(), agent_with(TypedScalar::Integer32(3)))
            .await
            .unwrap();
        assert_eq!(switch.state(), SwitchState::Unknown);
        assert!(capture.contains("Invalid payload '3' received for entity switch.snmp"));
        assert!(capture.contains("WARN"));
    }

    #[tokio::test]
    async fn wrong_kind_also_warns() {
        let capture = LogCapture::new();
        let _guard = capture.set_default();
        let switch = SnmpSwitch::setup(&settings(), agent_with(TypedScalar::Gauge32(1)))
            .await
            .unwrap();
        assert_eq!(switch.state(), SwitchState::Unknown);
        assert!(capture.contains("Invalid payload '1' received for entity switch.snmp"));
        assert!(capture.contains("Gauge32 values cannot carry numeric payloads"));
    }

    #[tokio::test]
    async fn each_read_issues_exactly_one_get() {
        let agent = agent_with(TypedScalar::Integer32(0));
        let switch = SnmpSwitch::setup(&settings(), Arc::clone(&agent)).await.unwrap();
        assert_eq!(agent.get_count(), 1);
        for _ in 0..3 {
            assert_eq!(switch.read_state().await, SwitchState::Off);
        }
        assert_eq!(agent.get_count(), 4);
        assert_eq!(agent.set_count(), 0);
    }

    #[tokio::test]
    async fn transport_failure_degrades_to_unknown() {
        let capture = LogCapture::new();
        let _guard = capture.set_default();
        let agent = agent_with(TypedScalar::Integer32(1));
        let switch = SnmpSwitch::setup(&settings(), Arc::clone(&agent)).await.unwrap();
        assert_eq!(switch.state(), SwitchState::On);

        agent.fail_next(TransportError::Unreachable {
            endpoint: "192.0.2.1:161".into(),
            reason: "no route to host".into(),
        });
        assert_eq!(switch.read_state().await, SwitchState::Unknown);
        assert!(capture.contains("Unable to reach 192.0.2.1:161"));

        agent.fail_next(TransportError::ErrorStatus {
            status: ErrorStatus::GenErr,
            index: 1,
        });
        assert_eq!(switch.read_state().await, SwitchState::Unknown);
        assert!(capture.contains("SNMP error: genErr at index 1"));

        assert_eq!(switch.read_state().await, SwitchState::On);
    }

    #[tokio::test]
    async fn unmatched_text_value_warns_with_entity() {
        let capture = LogCapture::new();
        let _guard = capture.set_default();
        let raw = SwitchSettings {
            payload_on: "testswitchon".into(),
            payload_off: "testswitchoff".into(),
            ..settings()
        };
        let switch = SnmpSwitch::setup(&raw, agent_with(TypedScalar::octet_string("test")))
            .await
            .unwrap();
        assert_eq!(switch.state(), SwitchState::Unknown);
        assert!(capture.contains("Invalid payload 'test' received for entity switch.snmp"));
        assert!(capture.contains("WARN"));
    }

    #[tokio::test]
    async fn timeout_is_reported_as_unreachable() {
        let capture = LogCapture::new();
        let _guard = capture.set_default();
        let agent = agent_with(TypedScalar::Integer32(1));
        let switch = SnmpSwitch::setup(&settings(), Arc::clone(&agent)).await.unwrap();
        assert_eq!(switch.state(), SwitchState::On);

        agent.fail_next(TransportError::Timeout {
            endpoint: "192.0.2.1:161".into(),
        });
        assert_eq!(switch.read_state().await, SwitchState::Unknown);
        assert!(capture.contains("Unable to reach 192.0.2.1:161"));
        assert!(capture.contains("timed out"));
        assert!(capture.contains("ERROR"));
    }

    #[tokio::test]
    async fn malformed_response_degrades_to_unknown() {
        let capture = LogCapture::new();
        let _guard = capture.set_default();
        let agent = agent_with(TypedScalar::Integer32(0));
        let switch = SnmpSwitch::setup(&settings(), Arc::clone(&agent)).await.unwrap();
        assert_eq!(switch.state(), SwitchState::Off);

        agent.fail_next(TransportError::Malformed("truncated varbind".into()));
        assert_eq!(switch.read_state().await, SwitchState::Unknown);
        assert!(capture.contains("Failed to read state of entity switch.snmp"));
        assert!(capture.contains("malformed response: truncated varbind"));
    }

    #[tokio::test]
    async fn write_sends_command_without_changing_state() {
        let agent = agent_with(TypedScalar::Integer32(0));
        let switch = SnmpSwitch::setup(&settings(), Arc::clone(&agent)).await.unwrap();
        assert_eq!(switch.state(), SwitchState::Off);

        switch.turn_on().await.unwrap();
        assert_eq!(switch.state(), SwitchState::Off);
        assert_eq!(agent.set_count(), 1);
        assert_eq!(agent.get_count(), 1);
        assert_eq!(
            agent.requests().last(),
            Some(&AgentRequest::Set {
                oid: oid(),
                value: TypedScalar::Integer32(1)
            })
        );

        assert_eq!(switch.read_state().await, SwitchState::On);
    }

    #[tokio::test]
    async fn command_overrides_target_command_oid() {
        let command_oid: Oid = "1.3.6.1.4.1.8072.2.1.2".parse().unwrap();
        let mut raw = settings();
        raw.command_oid = Some(command_oid.to_string());
        raw.command_payload_off = Some(Payload::Integer(2));
        let agent = agent_with(TypedScalar::Integer32(1));
        let switch = SnmpSwitch::setup(&raw, Arc::clone(&agent)).await.unwrap();

        switch.turn_off().await.unwrap();
        assert_eq!(agent.value(&command_oid).await, Some(TypedScalar::Integer32(2)));
        assert_eq!(agent.value(&oid()).await, Some(TypedScalar::Integer32(1)));
    }

    #[tokio::test]
    async fn failed_write_is_reported_and_state_kept() {
        let capture = LogCapture::new();
        let _guard = capture.set_default();
        let agent = agent_with(TypedScalar::Integer32(1));
        agent.mark_read_only(oid());
        let switch = SnmpSwitch::setup(&settings(), Arc::clone(&agent)).await.unwrap();

        let err = switch.turn_off().await.unwrap_err();
        assert_eq!(
            err,
            SwitchError::Transport(TransportError::ErrorStatus {
                status: ErrorStatus::ReadOnly,
                index: 1
            })
        );
        assert_eq!(switch.state(), SwitchState::On);
        assert!(capture.contains("outcome=\"failed\""));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn requests_are_serialised_per_switch() {
        let agent = agent_with(TypedScalar::Integer32(1));
        agent.set_latency(Duration::from_millis(10));
        let config = SwitchConfig::from_settings(&settings()).unwrap();
        let switch = Arc::new(SnmpSwitch::new(config, Arc::clone(&agent)));

        let mut tasks = Vec::new();
        for idx in 0..8 {
            let switch = Arc::clone(&switch);
            tasks.push(tokio::spawn(async move {
                if idx % 2 == 0 {
                    switch.read_state().await;
                } else {
                    switch.turn_on().await.unwrap();
                }
            }));
        }
        for task in futures::future::join_all(tasks).await {
            task.unwrap();
        }
        assert_eq!(agent.peak_in_flight(), 1);
        assert_eq!(agent.requests().len(), 8);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn separate_switches_run_independently() {
        let agent = agent_with(TypedScalar::Integer32(1));
        agent.set_latency(Duration::from_millis(50));
        let mut other = settings();
        other.name = "Second Relay".into();
        let first = SnmpSwitch::new(
            SwitchConfig::from_settings(&settings()).unwrap(),
            Arc::clone(&agent),
        );
        let second = SnmpSwitch::new(
            SwitchConfig::from_settings(&other).unwrap(),
            Arc::clone(&agent),
        );

        let (a, b) = tokio::join!(first.read_state(), second.read_state());
        assert_eq!((a, b), (SwitchState::On, SwitchState::On));
        assert_eq!(agent.peak_in_flight(), 2);
    }
}
