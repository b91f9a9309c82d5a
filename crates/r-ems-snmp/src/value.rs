//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "SNMP switch adapter."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Decoded SNMP values and object identifiers.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::error::OidParseError;

/// Object identifier, e.g. `1.3.6.1.4.1.8072.2.1.1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Oid(Vec<u32>);

impl Oid {
    /// Build an identifier from its arcs.
    pub fn from_arcs(arcs: impl Into<Vec<u32>>) -> Result<Self, OidParseError> {
        let arcs = arcs.into();
        Self::check_arcs(&arcs)?;
        Ok(Self(arcs))
    }

    /// Sub-identifiers of this OID.
    pub fn arcs(&self) -> &[u32] {
        &self.0
    }

    fn check_arcs(arcs: &[u32]) -> Result<(), OidParseError> {
        if arcs.len() < 2 {
            return Err(OidParseError::TooShort);
        }
        if arcs[0] > 2 {
            return Err(OidParseError::InvalidRoot(arcs[0]));
        }
        if arcs[0] < 2 && arcs[1] >= 40 {
            return Err(OidParseError::InvalidSecondArc(arcs[1]));
        }
        Ok(())
    }
}

impl FromStr for Oid {
    type Err = OidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = trimmed.strip_prefix('.').unwrap_or(trimmed);
        if body.is_empty() {
            return Err(OidParseError::Empty);
        }
        let arcs = body
            .split('.')
            .map(|part| {
                part.parse::<u32>()
                    .map_err(|_| OidParseError::InvalidArc(part.to_owned()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_arcs(arcs)
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, arc) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(".")?;
            }
            write!(f, "{arc}")?;
        }
        Ok(())
    }
}

/// ASN.1-derived type tag of a decoded SNMP value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr)]
pub enum ScalarKind {
    Counter32,
    Counter64,
    Gauge32,
    Integer,
    Integer32,
    IpAddress,
    Null,
    ObjectIdentifier,
    OctetString,
    Opaque,
    TimeTicks,
    Unsigned32,
    #[strum(serialize = "noSuchObject")]
    NoSuchObject,
    #[strum(serialize = "noSuchInstance")]
    NoSuchInstance,
    #[strum(serialize = "endOfMibView")]
    EndOfMibView,
}

impl ScalarKind {
    /// Whether the kind is one of the SNMPv2 exception markers rather than a value.
    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            ScalarKind::NoSuchObject | ScalarKind::NoSuchInstance | ScalarKind::EndOfMibView
        )
    }
}

/// A single value as decoded by the transport, tagged with its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedScalar {
    Counter32(u32),
    Counter64(u64),
    Gauge32(u32),
    Integer(i32),
    Integer32(i32),
    IpAddress(Ipv4Addr),
    Null,
    ObjectIdentifier(Oid),
    OctetString(Vec<u8>),
    Opaque(Vec<u8>),
    TimeTicks(u32),
    Unsigned32(u32),
    NoSuchObject,
    NoSuchInstance,
    EndOfMibView,
}

impl TypedScalar {
    /// Convenience constructor for textual octet strings.
    pub fn octet_string(value: impl Into<Vec<u8>>) -> Self {
        TypedScalar::OctetString(value.into())
    }

    /// Type tag of this value.
    pub fn kind(&self) -> ScalarKind {
        match self {
            TypedScalar::Counter32(_) => ScalarKind::Counter32,
            TypedScalar::Counter64(_) => ScalarKind::Counter64,
            TypedScalar::Gauge32(_) => ScalarKind::Gauge32,
            TypedScalar::Integer(_) => ScalarKind::Integer,
            TypedScalar::Integer32(_) => ScalarKind::Integer32,
            TypedScalar::IpAddress(_) => ScalarKind::IpAddress,
            TypedScalar::Null => ScalarKind::Null,
            TypedScalar::ObjectIdentifier(_) => ScalarKind::ObjectIdentifier,
            TypedScalar::OctetString(_) => ScalarKind::OctetString,
            TypedScalar::Opaque(_) => ScalarKind::Opaque,
            TypedScalar::TimeTicks(_) => ScalarKind::TimeTicks,
            TypedScalar::Unsigned32(_) => ScalarKind::Unsigned32,
            TypedScalar::NoSuchObject => ScalarKind::NoSuchObject,
            TypedScalar::NoSuchInstance => ScalarKind::NoSuchInstance,
            TypedScalar::EndOfMibView => ScalarKind::EndOfMibView,
        }
    }
}

fn write_bytes(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    match std::str::from_utf8(bytes) {
        Ok(text) => f.write_str(text),
        Err(_) => write!(f, "0x{}", hex::encode(bytes)),
    }
}

/// Renders the decoded value the way operators see it in logs.
impl fmt::Display for TypedScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedScalar::Counter32(v)
            | TypedScalar::Gauge32(v)
            | TypedScalar::TimeTicks(v)
            | TypedScalar::Unsigned32(v) => write!(f, "{v}"),
            TypedScalar::Counter64(v) => write!(f, "{v}"),
            TypedScalar::Integer(v) | TypedScalar::Integer32(v) => write!(f, "{v}"),
            TypedScalar::IpAddress(addr) => write!(f, "{addr}"),
            TypedScalar::Null => Ok(()),
            TypedScalar::ObjectIdentifier(oid) => write!(f, "{oid}"),
            TypedScalar::OctetString(bytes) => write_bytes(f, bytes),
            TypedScalar::Opaque(bytes) => write!(f, "0x{}", hex::encode(bytes)),
            TypedScalar::NoSuchObject
            | TypedScalar::NoSuchInstance
            | TypedScalar::EndOfMibView => write!(f, "{}", self.kind()),
        }
    }
}
