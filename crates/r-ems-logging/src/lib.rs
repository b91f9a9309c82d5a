//! ---
//! ems_section: "03-persistence-logging"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Structured logging adapters and sinks."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
#![warn(missing_docs)]

use tracing::Level;

pub mod capture;
#[macro_use]
pub mod macros;

pub use capture::LogCapture;
#[doc(hidden)]
pub use tracing;

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Entity identifier (e.g. `switch.snmp`).
    pub entity: Option<&'a str>,
    /// Device endpoint in `host:port` form.
    pub host: Option<&'a str>,
    /// Object identifier the event relates to.
    pub oid: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an entity identifier.
    pub fn with_entity(mut self, entity: &'a str) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Attach a device endpoint.
    pub fn with_host(mut self, host: &'a str) -> Self {
        self.host = Some(host);
        self
    }

    /// Attach an object identifier.
    pub fn with_oid(mut self, oid: &'a str) -> Self {
        self.oid = Some(oid);
        self
    }
}

/// Outcome of a command sent to a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The device accepted the command.
    Accepted,
    /// The command could not be delivered or was rejected.
    Failed,
}

impl CommandOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            CommandOutcome::Accepted => "accepted",
            CommandOutcome::Failed => "failed",
        }
    }
}

/// Emit a standardized command event with an accepted/failed outcome.
pub fn log_command_event(
    context: Option<&LogContext>,
    command: &str,
    message: &str,
    outcome: CommandOutcome,
) {
    let ctx = context.cloned().unwrap_or_default();
    let entity = ctx.entity.unwrap_or("");
    let host = ctx.host.unwrap_or("");
    let oid = ctx.oid.unwrap_or("");
    let outcome_str = outcome.as_str();
    match outcome {
        CommandOutcome::Accepted => tracing::event!(
            Level::INFO,
            command,
            outcome = outcome_str,
            entity,
            host,
            oid,
            message = %message
        ),
        CommandOutcome::Failed => tracing::event!(
            Level::ERROR,
            command,
            outcome = outcome_str,
            entity,
            host,
            oid,
            message = %message
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macros_attach_context_fields() {
        let capture = LogCapture::new();
        let _guard = capture.set_default();
        let ctx = LogContext::new()
            .with_entity("switch.pump")
            .with_host("192.0.2.1:161");
        ems_warn!(context = ctx.clone(), "payload {} rejected", 7);
        ems_debug!("plain debug message");
        ems_error!(context = ctx, "device unreachable");

        let text = capture.contents();
        assert!(text.contains("payload 7 rejected"));
        assert!(text.contains("entity=\"switch.pump\""));
        assert!(text.contains("plain debug message"));
        assert!(text.contains("device unreachable"));
    }

    #[test]
    fn command_event_reports_outcome() {
        let capture = LogCapture::new();
        let _guard = capture.set_default();
        let ctx = LogContext::new().with_entity("switch.snmp");
        log_command_event(
            Some(&ctx),
            "turn_on",
            "set request accepted",
            CommandOutcome::Accepted,
        );
        log_command_event(None, "turn_off", "set request failed", CommandOutcome::Failed);

        let text = capture.contents();
        assert!(text.contains("outcome=\"accepted\""));
        assert!(text.contains("outcome=\"failed\""));
        assert!(text.contains("ERROR"));
    }
}
