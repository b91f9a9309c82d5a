//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "SNMP switch adapter."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use thiserror::Error;

use crate::codec::Payload;
use crate::transport::{AuthProtocol, PrivProtocol, TransportError};
use crate::value::ScalarKind;

/// Rejected object identifier text or arcs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OidParseError {
    #[error("object identifier is empty")]
    Empty,
    #[error("object identifier needs at least two arcs")]
    TooShort,
    #[error("invalid sub-identifier '{0}'")]
    InvalidArc(String),
    #[error("root arc must be 0, 1 or 2, found {0}")]
    InvalidRoot(u32),
    #[error("second arc must be below 40 under roots 0 and 1, found {0}")]
    InvalidSecondArc(u32),
}

/// A payload that cannot be written as the requested kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("payload '{payload}' does not fit in {kind}")]
    OutOfRange { payload: Payload, kind: ScalarKind },
    #[error("payload '{payload}' cannot be written as {kind}: {reason}")]
    Incompatible {
        payload: Payload,
        kind: ScalarKind,
        reason: String,
    },
    #[error("unsupported vartype '{0}'")]
    UnsupportedVarType(String),
}

/// Setup-time configuration failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `platform` is not `snmp`.
    #[error("unsupported platform '{0}', expected 'snmp'")]
    UnsupportedPlatform(String),
    /// `host` is blank.
    #[error("host must not be empty")]
    MissingHost,
    /// `baseoid` or `command_oid` is not a valid OID.
    #[error("invalid {field} '{value}': {source}")]
    InvalidOid {
        field: &'static str,
        value: String,
        source: OidParseError,
    },
    /// One payload is an integer and the other a string.
    #[error("payload_on '{on}' and payload_off '{off}' mix integer and string payloads")]
    MixedPayloads { on: Payload, off: Payload },
    /// Both payloads are equal.
    #[error("payload_on and payload_off are both '{0}'")]
    IdenticalPayloads(Payload),
    /// Version 3 without `username`.
    #[error("SNMPv3 requires a username")]
    MissingUsername,
    /// An auth protocol without `auth_key`.
    #[error("auth_protocol {0} requires auth_key")]
    MissingAuthKey(AuthProtocol),
    /// A privacy protocol without `priv_key`.
    #[error("priv_protocol {0} requires priv_key")]
    MissingPrivKey(PrivProtocol),
    /// A privacy protocol without authentication.
    #[error("priv_protocol {0} requires an auth_protocol")]
    PrivWithoutAuth(PrivProtocol),
    /// The payload written for a command does not encode under `vartype`.
    /// `field` names the key that supplied it.
    #[error("{field} is not usable for writes: {source}")]
    CommandPayload {
        field: &'static str,
        source: EncodeError,
    },
    /// Two switches share an entity id.
    #[error("entity id '{0}' is declared more than once")]
    DuplicateEntity(String),
}

/// Failure of a command sent to the device.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SwitchError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
}
