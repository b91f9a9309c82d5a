//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "SNMP switch adapter."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! SNMP-backed on/off switch for R-EMS edge integrations.
//!
//! The adapter reads one scalar to decide whether a device is on or off and
//! writes a configured payload to switch it. The SNMP client itself is
//! supplied through [`SnmpTransport`]; [`InMemoryAgent`] simulates a device.

pub mod codec;
pub mod config;
pub mod error;
pub mod switch;
pub mod transport;
pub mod value;

pub use codec::{
    encode_payload, Classification, Payload, PayloadPair, Rejection, Representation,
    SwitchState, TargetState, ValueCodec, VarType,
};
pub use config::{PlatformConfig, SwitchConfig, SwitchSettings, PLATFORM};
pub use error::{ConfigError, EncodeError, OidParseError, SwitchError};
pub use switch::SnmpSwitch;
pub use transport::memory::{AgentRequest, InMemoryAgent};
pub use transport::{
    AuthProtocol, Credentials, ErrorStatus, PrivProtocol, SnmpTarget, SnmpTransport, SnmpVersion,
    TransportError, UsmUser,
};
pub use value::{Oid, ScalarKind, TypedScalar};
