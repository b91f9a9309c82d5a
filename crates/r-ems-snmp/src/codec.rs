//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "SNMP switch adapter."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Mapping between configured on/off payloads and wire values.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::EncodeError;
use crate::value::{Oid, ScalarKind, TypedScalar};

/// A logical on/off value as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    /// Matched against `Integer`/`Integer32` responses.
    Integer(i64),
    /// Matched against `OctetString` responses.
    Text(String),
}

impl Payload {
    /// Whether this payload is numeric or text.
    pub fn representation(&self) -> Representation {
        match self {
            Payload::Integer(_) => Representation::Numeric,
            Payload::Text(_) => Representation::Text,
        }
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Integer(v) => write!(f, "{v}"),
            Payload::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for Payload {
    fn from(value: i64) -> Self {
        Payload::Integer(value)
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Payload::Text(value.to_owned())
    }
}

/// How payloads are compared against responses.
/// How a payload pair is compared against responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Representation {
    Numeric,
    Text,
}

/// Externally visible switch state.
/// Externally visible state of a switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
#[strum(serialize_all = "lowercase")]
pub enum SwitchState {
    On,
    Off,
    #[default]
    Unknown,
}

/// Requested state for a write.
/// State requested by a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum TargetState {
    On,
    Off,
}

/// Why a response could not be mapped to on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The kind matches the configured representation but the value is neither payload.
    UnmatchedValue,
    /// The kind can never carry the configured representation.
    WrongKind(ScalarKind),
}

/// Result of classifying a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    On,
    Off,
    Unrecognized(Rejection),
}

impl Classification {
    /// Visible state for this classification. Rejections become unknown.
    pub fn state(&self) -> SwitchState {
        match self {
            Classification::On => SwitchState::On,
            Classification::Off => SwitchState::Off,
            Classification::Unrecognized(_) => SwitchState::Unknown,
        }
    }
}

/// The expected on/off pair. Both payloads share one representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadPair {
    on: Payload,
    off: Payload,
}

impl PayloadPair {
    /// Returns `None` when the payloads mix integer and string values.
    pub fn new(on: Payload, off: Payload) -> Option<Self> {
        if on.representation() != off.representation() {
            return None;
        }
        Some(Self { on, off })
    }

    /// Payload that means on.
    pub fn on(&self) -> &Payload {
        &self.on
    }

    /// Payload that means off.
    pub fn off(&self) -> &Payload {
        &self.off
    }

    /// Representation shared by both payloads.
    pub fn representation(&self) -> Representation {
        self.on.representation()
    }

    fn match_integer(&self, value: i64) -> Classification {
        match (&self.on, &self.off) {
            (Payload::Integer(on), _) if *on == value => Classification::On,
            (_, Payload::Integer(off)) if *off == value => Classification::Off,
            (Payload::Integer(_), Payload::Integer(_)) => {
                Classification::Unrecognized(Rejection::UnmatchedValue)
            }
            _ => Classification::Unrecognized(Rejection::WrongKind(ScalarKind::Integer32)),
        }
    }

    fn match_bytes(&self, value: &[u8]) -> Classification {
        match (&self.on, &self.off) {
            (Payload::Text(on), _) if on.as_bytes() == value => Classification::On,
            (_, Payload::Text(off)) if off.as_bytes() == value => Classification::Off,
            (Payload::Text(_), Payload::Text(_)) => {
                Classification::Unrecognized(Rejection::UnmatchedValue)
            }
            _ => Classification::Unrecognized(Rejection::WrongKind(ScalarKind::OctetString)),
        }
    }

    /// Map a response onto on/off. Only `Integer`/`Integer32` against integer
    /// payloads and `OctetString` against string payloads can match.
    pub fn classify(&self, scalar: &TypedScalar) -> Classification {
        let wrong_kind = Classification::Unrecognized(Rejection::WrongKind(scalar.kind()));
        match scalar {
            TypedScalar::Integer(v) | TypedScalar::Integer32(v) => {
                match self.representation() {
                    Representation::Numeric => self.match_integer(i64::from(*v)),
                    Representation::Text => wrong_kind,
                }
            }
            TypedScalar::OctetString(bytes) => match self.representation() {
                Representation::Text => self.match_bytes(bytes),
                Representation::Numeric => wrong_kind,
            },
            TypedScalar::Counter32(_)
            | TypedScalar::Counter64(_)
            | TypedScalar::Gauge32(_)
            | TypedScalar::IpAddress(_)
            | TypedScalar::Null
            | TypedScalar::ObjectIdentifier(_)
            | TypedScalar::Opaque(_)
            | TypedScalar::TimeTicks(_)
            | TypedScalar::Unsigned32(_)
            | TypedScalar::NoSuchObject
            | TypedScalar::NoSuchInstance
            | TypedScalar::EndOfMibView => wrong_kind,
        }
    }
}

/// Kind used when writing a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VarType {
    /// Integer payloads are written as `Integer32`, strings as `OctetString`.
    #[default]
    Auto,
    /// Payloads are converted to this kind, with range checks.
    Explicit(ScalarKind),
}

impl FromStr for VarType {
    type Err = EncodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("none") {
            return Ok(VarType::Auto);
        }
        let kind = ScalarKind::from_str(s)
            .map_err(|_| EncodeError::UnsupportedVarType(s.to_owned()))?;
        if kind == ScalarKind::Null || kind.is_exception() {
            return Err(EncodeError::UnsupportedVarType(s.to_owned()));
        }
        Ok(VarType::Explicit(kind))
    }
}

impl TryFrom<String> for VarType {
    type Error = EncodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VarType> for String {
    fn from(value: VarType) -> Self {
        value.to_string()
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarType::Auto => f.write_str("none"),
            VarType::Explicit(kind) => write!(f, "{kind}"),
        }
    }
}

fn numeric<T>(payload: &Payload, kind: ScalarKind) -> Result<T, EncodeError>
where
    T: TryFrom<i64> + FromStr,
{
    match payload {
        Payload::Integer(v) => T::try_from(*v).map_err(|_| EncodeError::OutOfRange {
            payload: payload.clone(),
            kind,
        }),
        Payload::Text(text) => text.trim().parse::<T>().map_err(|_| EncodeError::Incompatible {
            payload: payload.clone(),
            kind,
            reason: "not a number in range".into(),
        }),
    }
}

fn text_bytes(payload: &Payload) -> Vec<u8> {
    payload.to_string().into_bytes()
}

/// Encode a payload for a set request.
pub fn encode_payload(payload: &Payload, vartype: VarType) -> Result<TypedScalar, EncodeError> {
    let kind = match vartype {
        VarType::Auto => {
            return match payload {
                Payload::Integer(_) => {
                    Ok(TypedScalar::Integer32(numeric(payload, ScalarKind::Integer32)?))
                }
                Payload::Text(text) => Ok(TypedScalar::OctetString(text.as_bytes().to_vec())),
            };
        }
        VarType::Explicit(kind) => kind,
    };

    let incompatible = |reason: &str| EncodeError::Incompatible {
        payload: payload.clone(),
        kind,
        reason: reason.to_owned(),
    };

    let scalar = match kind {
        ScalarKind::Integer => TypedScalar::Integer(numeric(payload, kind)?),
        ScalarKind::Integer32 => TypedScalar::Integer32(numeric(payload, kind)?),
        ScalarKind::Counter32 => TypedScalar::Counter32(numeric(payload, kind)?),
        ScalarKind::Counter64 => TypedScalar::Counter64(numeric(payload, kind)?),
        ScalarKind::Gauge32 => TypedScalar::Gauge32(numeric(payload, kind)?),
        ScalarKind::TimeTicks => TypedScalar::TimeTicks(numeric(payload, kind)?),
        ScalarKind::Unsigned32 => TypedScalar::Unsigned32(numeric(payload, kind)?),
        ScalarKind::OctetString => TypedScalar::OctetString(text_bytes(payload)),
        ScalarKind::Opaque => TypedScalar::Opaque(text_bytes(payload)),
        ScalarKind::IpAddress => match payload {
            Payload::Text(text) => TypedScalar::IpAddress(
                text.trim()
                    .parse::<Ipv4Addr>()
                    .map_err(|_| incompatible("not an IPv4 address"))?,
            ),
            Payload::Integer(_) => return Err(incompatible("not an IPv4 address")),
        },
        ScalarKind::ObjectIdentifier => match payload {
            Payload::Text(text) => TypedScalar::ObjectIdentifier(
                text.parse::<Oid>()
                    .map_err(|err| incompatible(&err.to_string()))?,
            ),
            Payload::Integer(_) => return Err(incompatible("not an object identifier")),
        },
        ScalarKind::Null
        | ScalarKind::NoSuchObject
        | ScalarKind::NoSuchInstance
        | ScalarKind::EndOfMibView => {
            return Err(EncodeError::UnsupportedVarType(kind.to_string()));
        }
    };
    Ok(scalar)
}

/// Reads and writes on/off values for one configured switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueCodec {
    payloads: PayloadPair,
    command_on: Payload,
    command_off: Payload,
    vartype: VarType,
}

impl ValueCodec {
    /// Command payloads default to the expected payloads. Both must be
    /// encodable under `vartype`.
    pub fn new(
        payloads: PayloadPair,
        command_on: Option<Payload>,
        command_off: Option<Payload>,
        vartype: VarType,
    ) -> Result<Self, (TargetState, EncodeError)> {
        let codec = Self {
            command_on: command_on.unwrap_or_else(|| payloads.on().clone()),
            command_off: command_off.unwrap_or_else(|| payloads.off().clone()),
            payloads,
            vartype,
        };
        for target in [TargetState::On, TargetState::Off] {
            codec.encode(target).map_err(|err| (target, err))?;
        }
        Ok(codec)
    }

    /// Expected on/off payloads.
    pub fn payloads(&self) -> &PayloadPair {
        &self.payloads
    }

    /// Kind used for set requests.
    pub fn vartype(&self) -> VarType {
        self.vartype
    }

    /// Payload written to request `target`.
    pub fn command_payload(&self, target: TargetState) -> &Payload {
        match target {
            TargetState::On => &self.command_on,
            TargetState::Off => &self.command_off,
        }
    }

    /// Classify a response against the expected payloads.
    pub fn classify(&self, scalar: &TypedScalar) -> Classification {
        self.payloads.classify(scalar)
    }

    /// Value to send in the set request for `target`.
    pub fn encode(&self, target: TargetState) -> Result<TypedScalar, EncodeError> {
        encode_payload(self.command_payload(target), self.vartype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric_pair() -> PayloadPair {
        PayloadPair::new(Payload::Integer(1), Payload::Integer(0)).unwrap()
    }

    fn text_pair() -> PayloadPair {
        PayloadPair::new("testswitchon".into(), "testswitchoff".into()).unwrap()
    }

    #[test]
    fn numeric_payloads_classify_three_ways() {
        let pair = numeric_pair();
        assert_eq!(pair.classify(&TypedScalar::Integer32(1)), Classification::On);
        assert_eq!(pair.classify(&TypedScalar::Integer32(0)), Classification::Off);
        assert_eq!(pair.classify(&TypedScalar::Integer(1)), Classification::On);
        assert_eq!(
            pair.classify(&TypedScalar::Integer32(3)),
            Classification::Unrecognized(Rejection::UnmatchedValue)
        );
    }

    #[test]
    fn text_payloads_classify_three_ways() {
        let pair = text_pair();
        assert_eq!(
            pair.classify(&TypedScalar::octet_string("testswitchon")),
            Classification::On
        );
        assert_eq!(
            pair.classify(&TypedScalar::octet_string("testswitchoff")),
            Classification::Off
        );
        assert_eq!(
            pair.classify(&TypedScalar::octet_string("TESTSWITCHON")).state(),
            SwitchState::Unknown
        );
    }

    #[test]
    fn representation_mismatch_is_wrong_kind() {
        assert_eq!(
            numeric_pair().classify(&TypedScalar::octet_string("1")),
            Classification::Unrecognized(Rejection::WrongKind(ScalarKind::OctetString))
        );
        assert_eq!(
            text_pair().classify(&TypedScalar::Integer32(1)),
            Classification::Unrecognized(Rejection::WrongKind(ScalarKind::Integer32))
        );
    }

    #[test]
    fn non_switch_kinds_never_match_even_with_equal_value() {
        let pair = PayloadPair::new(Payload::Integer(64), Payload::Integer(0)).unwrap();
        let values = [
            TypedScalar::Counter32(64),
            TypedScalar::Counter64(64),
            TypedScalar::Gauge32(64),
            TypedScalar::TimeTicks(64),
            TypedScalar::Unsigned32(64),
            TypedScalar::IpAddress(Ipv4Addr::new(192, 0, 2, 1)),
            TypedScalar::Null,
            TypedScalar::ObjectIdentifier("1.3.6.1.4.1.8072.2.1.1".parse().unwrap()),
            TypedScalar::Opaque(b"64".to_vec()),
            TypedScalar::NoSuchObject,
            TypedScalar::NoSuchInstance,
            TypedScalar::EndOfMibView,
        ];
        for value in values {
            assert_eq!(
                pair.classify(&value),
                Classification::Unrecognized(Rejection::WrongKind(value.kind())),
                "{} should not map to a state",
                value.kind()
            );
        }
    }

    #[test]
    fn classification_is_repeatable() {
        let pair = numeric_pair();
        let value = TypedScalar::Integer32(1);
        let first = pair.classify(&value);
        for _ in 0..5 {
            assert_eq!(pair.classify(&value), first);
        }
    }

    #[test]
    fn mixed_pair_is_refused() {
        assert!(PayloadPair::new(Payload::Integer(1), "off".into()).is_none());
    }

    #[test]
    fn auto_vartype_follows_payload_representation() {
        assert_eq!(
            encode_payload(&Payload::Integer(1), VarType::Auto).unwrap(),
            TypedScalar::Integer32(1)
        );
        assert_eq!(
            encode_payload(&"on".into(), VarType::Auto).unwrap(),
            TypedScalar::octet_string("on")
        );
        assert!(matches!(
            encode_payload(&Payload::Integer(i64::MAX), VarType::Auto),
            Err(EncodeError::OutOfRange { .. })
        ));
    }

    #[test]
    fn explicit_vartype_forces_kind() {
        let gauge: VarType = "Gauge32".parse().unwrap();
        assert_eq!(
            encode_payload(&Payload::Integer(7), gauge).unwrap(),
            TypedScalar::Gauge32(7)
        );
        assert_eq!(
            encode_payload(&"7".into(), gauge).unwrap(),
            TypedScalar::Gauge32(7)
        );
        assert!(encode_payload(&Payload::Integer(-1), gauge).is_err());

        let ip: VarType = "IpAddress".parse().unwrap();
        assert_eq!(
            encode_payload(&"192.0.2.10".into(), ip).unwrap(),
            TypedScalar::IpAddress(Ipv4Addr::new(192, 0, 2, 10))
        );
        assert!(encode_payload(&Payload::Integer(1), ip).is_err());

        let octets: VarType = "OctetString".parse().unwrap();
        assert_eq!(
            encode_payload(&Payload::Integer(1), octets).unwrap(),
            TypedScalar::octet_string("1")
        );
    }

    #[test]
    fn vartype_parsing() {
        assert_eq!("none".parse::<VarType>().unwrap(), VarType::Auto);
        assert_eq!(
            "Unsigned32".parse::<VarType>().unwrap(),
            VarType::Explicit(ScalarKind::Unsigned32)
        );
        assert!("Null".parse::<VarType>().is_err());
        assert!("Float".parse::<VarType>().is_err());
        assert_eq!(VarType::Explicit(ScalarKind::TimeTicks).to_string(), "TimeTicks");
    }

    #[test]
    fn codec_uses_command_overrides_for_writes() {
        let codec = ValueCodec::new(
            numeric_pair(),
            Some(Payload::Integer(2)),
            None,
            VarType::Auto,
        )
        .unwrap();
        assert_eq!(codec.encode(TargetState::On).unwrap(), TypedScalar::Integer32(2));
        assert_eq!(codec.encode(TargetState::Off).unwrap(), TypedScalar::Integer32(0));
        // reads still compare against the expected payloads
        assert_eq!(codec.classify(&TypedScalar::Integer32(2)).state(), SwitchState::Unknown);
    }

    #[test]
    fn codec_rejects_unencodable_command_payload() {
        let err = ValueCodec::new(
            text_pair(),
            None,
            None,
            VarType::Explicit(ScalarKind::Counter32),
        )
        .unwrap_err();
        assert_eq!(err.0, TargetState::On);
    }

    #[test]
    fn write_then_read_round_trips() {
        for pair in [numeric_pair(), text_pair()] {
            let codec = ValueCodec::new(pair, None, None, VarType::Auto).unwrap();
            let on = codec.encode(TargetState::On).unwrap();
            let off = codec.encode(TargetState::Off).unwrap();
            assert_eq!(codec.classify(&on).state(), SwitchState::On);
            assert_eq!(codec.classify(&off).state(), SwitchState::Off);
        }
    }
}
