//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "SNMP switch adapter."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Seam between the switch adapter and an SNMP client implementation.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, FromRepr};
use thiserror::Error;

use crate::value::{Oid, TypedScalar};

pub mod memory;

/// Protocol version negotiated by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
pub enum SnmpVersion {
    #[default]
    #[serde(rename = "1")]
    #[strum(serialize = "1")]
    V1,
    #[serde(rename = "2c")]
    #[strum(serialize = "2c")]
    V2c,
    #[serde(rename = "3")]
    #[strum(serialize = "3")]
    V3,
}

/// SNMPv3 authentication protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AuthProtocol {
    #[default]
    None,
    HmacMd5,
    HmacSha,
    HmacSha224,
    HmacSha256,
    HmacSha384,
    HmacSha512,
}

/// SNMPv3 privacy protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
pub enum PrivProtocol {
    #[default]
    #[serde(rename = "none")]
    #[strum(serialize = "none")]
    None,
    #[serde(rename = "des")]
    #[strum(serialize = "des")]
    Des,
    #[serde(rename = "3des-ede")]
    #[strum(serialize = "3des-ede")]
    TripleDesEde,
    #[serde(rename = "aes-cfb-128")]
    #[strum(serialize = "aes-cfb-128")]
    AesCfb128,
    #[serde(rename = "aes-cfb-192")]
    #[strum(serialize = "aes-cfb-192")]
    AesCfb192,
    #[serde(rename = "aes-cfb-256")]
    #[strum(serialize = "aes-cfb-256")]
    AesCfb256,
}

/// SNMPv3 user-based security parameters.
#[derive(Clone, PartialEq, Eq)]
pub struct UsmUser {
    pub username: String,
    pub auth_protocol: AuthProtocol,
    pub auth_key: Option<String>,
    pub priv_protocol: PrivProtocol,
    pub priv_key: Option<String>,
}

// Keys never reach logs.
impl fmt::Debug for UsmUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UsmUser")
            .field("username", &self.username)
            .field("auth_protocol", &self.auth_protocol)
            .field("auth_key", &self.auth_key.as_ref().map(|_| "<redacted>"))
            .field("priv_protocol", &self.priv_protocol)
            .field("priv_key", &self.priv_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Security parameters sent with each request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// SNMPv1/v2c community string.
    Community(String),
    /// SNMPv3 user-based security.
    Usm(UsmUser),
}

/// Where and how requests are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnmpTarget {
    pub host: String,
    pub port: u16,
    pub version: SnmpVersion,
    pub credentials: Credentials,
}

impl SnmpTarget {
    /// `host:port`, bracketing IPv6 literals.
    pub fn endpoint(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Agent error-status codes (RFC 3416).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, FromRepr)]
#[strum(serialize_all = "camelCase")]
#[repr(u32)]
pub enum ErrorStatus {
    NoError = 0,
    TooBig = 1,
    NoSuchName = 2,
    BadValue = 3,
    ReadOnly = 4,
    GenErr = 5,
    NoAccess = 6,
    WrongType = 7,
    WrongLength = 8,
    WrongEncoding = 9,
    WrongValue = 10,
    NoCreation = 11,
    InconsistentValue = 12,
    ResourceUnavailable = 13,
    CommitFailed = 14,
    UndoFailed = 15,
    AuthorizationError = 16,
    NotWritable = 17,
    InconsistentName = 18,
}

/// Failure reported by an [`SnmpTransport`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("unable to reach {endpoint}: {reason}")]
    /// The agent could not be contacted.
    Unreachable { endpoint: String, reason: String },
    #[error("request to {endpoint} timed out")]
    /// No response arrived in time.
    Timeout { endpoint: String },
    #[error("SNMP error: {status} at index {index}")]
    /// The agent answered with a non-zero error status.
    ErrorStatus { status: ErrorStatus, index: u32 },
    #[error("malformed response: {0}")]
    /// The response could not be decoded.
    Malformed(String),
}

/// Request/response primitives supplied by an SNMP client.
///
/// Implementations own timeouts, retries and session security.
#[async_trait]
pub trait SnmpTransport: Send + Sync {
    /// Read a single scalar.
    async fn get(&self, target: &SnmpTarget, oid: &Oid) -> Result<TypedScalar, TransportError>;

    /// Write a single scalar. Returns the value echoed by the agent.
    async fn set(
        &self,
        target: &SnmpTarget,
        oid: &Oid,
        value: TypedScalar,
    ) -> Result<TypedScalar, TransportError>;
}

#[async_trait]
impl<T: SnmpTransport + ?Sized> SnmpTransport for Arc<T> {
    async fn get(&self, target: &SnmpTarget, oid: &Oid) -> Result<TypedScalar, TransportError> {
        (**self).get(target, oid).await
    }

    async fn set(
        &self,
        target: &SnmpTarget,
        oid: &Oid,
        value: TypedScalar,
    ) -> Result<TypedScalar, TransportError> {
        (**self).set(target, oid, value).await
    }
}
