//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "SNMP switch adapter."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::collections::HashSet;
use std::str::FromStr;

use r_ems_common::config::{parse_document, ConfigDocument, LoggingConfig};
use serde::{Deserialize, Serialize};

use crate::codec::{Payload, PayloadPair, TargetState, ValueCodec, VarType};
use crate::error::ConfigError;
use crate::transport::{AuthProtocol, Credentials, PrivProtocol, SnmpTarget, SnmpVersion, UsmUser};
use crate::value::Oid;

/// Platform key accepted by this adapter.
pub const PLATFORM: &str = "snmp";

fn default_platform() -> String {
    PLATFORM.to_owned()
}

fn default_port() -> u16 {
    161
}

fn default_community() -> String {
    "private".to_owned()
}

fn default_name() -> String {
    "SNMP".to_owned()
}

fn default_payload_on() -> Payload {
    Payload::Integer(1)
}

fn default_payload_off() -> Payload {
    Payload::Integer(0)
}

/// A `[[switch]]` entry as written by the operator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SwitchSettings {
    #[serde(default = "default_platform")]
    pub platform: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_community")]
    pub community: String,
    pub baseoid: String,
    #[serde(default)]
    pub command_oid: Option<String>,
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_payload_on")]
    pub payload_on: Payload,
    #[serde(default = "default_payload_off")]
    pub payload_off: Payload,
    #[serde(default)]
    pub command_payload_on: Option<Payload>,
    #[serde(default)]
    pub command_payload_off: Option<Payload>,
    #[serde(default)]
    pub version: SnmpVersion,
    #[serde(default)]
    pub vartype: VarType,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub auth_key: Option<String>,
    #[serde(default)]
    pub auth_protocol: AuthProtocol,
    #[serde(default)]
    pub priv_key: Option<String>,
    #[serde(default)]
    pub priv_protocol: PrivProtocol,
}

impl SwitchSettings {
    /// Settings for `host`/`baseoid` with every optional key at its default.
    pub fn new(host: impl Into<String>, baseoid: impl Into<String>) -> Self {
        Self {
            platform: default_platform(),
            host: host.into(),
            port: default_port(),
            community: default_community(),
            baseoid: baseoid.into(),
            command_oid: None,
            name: default_name(),
            payload_on: default_payload_on(),
            payload_off: default_payload_off(),
            command_payload_on: None,
            command_payload_off: None,
            version: SnmpVersion::default(),
            vartype: VarType::default(),
            username: None,
            auth_key: None,
            auth_protocol: AuthProtocol::default(),
            priv_key: None,
            priv_protocol: PrivProtocol::default(),
        }
    }
}

/// Lower-case `name`, collapsing runs of other characters into `_`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('_');
            }
            pending_separator = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_separator = true;
        }
    }
    if slug.is_empty() {
        "unnamed".to_owned()
    } else {
        slug
    }
}

fn parse_oid(field: &'static str, value: &str) -> Result<Oid, ConfigError> {
    value.parse::<Oid>().map_err(|source| ConfigError::InvalidOid {
        field,
        value: value.to_owned(),
        source,
    })
}

fn credentials(settings: &SwitchSettings) -> Result<Credentials, ConfigError> {
    if settings.version != SnmpVersion::V3 {
        return Ok(Credentials::Community(settings.community.clone()));
    }
    let username = settings
        .username
        .clone()
        .filter(|name| !name.trim().is_empty())
        .ok_or(ConfigError::MissingUsername)?;
    if settings.auth_protocol != AuthProtocol::None && settings.auth_key.is_none() {
        return Err(ConfigError::MissingAuthKey(settings.auth_protocol));
    }
    if settings.priv_protocol != PrivProtocol::None {
        if settings.auth_protocol == AuthProtocol::None {
            return Err(ConfigError::PrivWithoutAuth(settings.priv_protocol));
        }
        if settings.priv_key.is_none() {
            return Err(ConfigError::MissingPrivKey(settings.priv_protocol));
        }
    }
    Ok(Credentials::Usm(UsmUser {
        username,
        auth_protocol: settings.auth_protocol,
        auth_key: settings.auth_key.clone(),
        priv_protocol: settings.priv_protocol,
        priv_key: settings.priv_key.clone(),
    }))
}

/// Validated, immutable configuration of one switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchConfig {
    name: String,
    entity_id: String,
    target: SnmpTarget,
    state_oid: Oid,
    command_oid: Oid,
    codec: ValueCodec,
}

impl SwitchConfig {
    /// Validate operator settings.
    ///
    /// Checks the platform, host, both OIDs, the payload pair, that the command
    /// payloads encode under `vartype`, and the SNMPv3 credential rules.
    pub fn from_settings(settings: &SwitchSettings) -> Result<Self, ConfigError> {
        if settings.platform != PLATFORM {
            return Err(ConfigError::UnsupportedPlatform(settings.platform.clone()));
        }
        if settings.host.trim().is_empty() {
            return Err(ConfigError::MissingHost);
        }
        let state_oid = parse_oid("baseoid", &settings.baseoid)?;
        let command_oid = match &settings.command_oid {
            Some(oid) => parse_oid("command_oid", oid)?,
            None => state_oid.clone(),
        };

        let payloads = PayloadPair::new(settings.payload_on.clone(), settings.payload_off.clone())
            .ok_or_else(|| ConfigError::MixedPayloads {
                on: settings.payload_on.clone(),
                off: settings.payload_off.clone(),
            })?;
        if payloads.on() == payloads.off() {
            return Err(ConfigError::IdenticalPayloads(payloads.on().clone()));
        }
        let codec = ValueCodec::new(
            payloads,
            settings.command_payload_on.clone(),
            settings.command_payload_off.clone(),
            settings.vartype,
        )
        .map_err(|(target, source)| ConfigError::CommandPayload {
            field: match (target, &settings.command_payload_on, &settings.command_payload_off) {
                (TargetState::On, Some(_), _) => "command_payload_on",
                (TargetState::On, None, _) => "payload_on",
                (TargetState::Off, _, Some(_)) => "command_payload_off",
                (TargetState::Off, _, None) => "payload_off",
            },
            source,
        })?;

        let target = SnmpTarget {
            host: settings.host.trim().to_owned(),
            port: settings.port,
            version: settings.version,
            credentials: credentials(settings)?,
        };

        Ok(Self {
            name: settings.name.clone(),
            entity_id: format!("switch.{}", slugify(&settings.name)),
            target,
            state_oid,
            command_oid,
            codec,
        })
    }

    /// Display name, `SNMP` unless configured.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identity used in logs, `switch.<slug>`.
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    /// Endpoint, version and credentials for requests.
    pub fn target(&self) -> &SnmpTarget {
        &self.target
    }

    /// Object read to determine state.
    pub fn state_oid(&self) -> &Oid {
        &self.state_oid
    }

    /// Object written by commands.
    pub fn command_oid(&self) -> &Oid {
        &self.command_oid
    }

    /// Payload classification and encoding rules.
    pub fn codec(&self) -> &ValueCodec {
        &self.codec
    }
}

/// A platform file: logging settings plus any number of `[[switch]]` tables.
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default, rename = "switch")]
    pub switches: Vec<SwitchSettings>,
}

impl PlatformConfig {
    /// Validate every switch entry into its runtime configuration.
    pub fn switch_configs(&self) -> Result<Vec<SwitchConfig>, ConfigError> {
        let mut seen = HashSet::new();
        let mut configs = Vec::with_capacity(self.switches.len());
        for settings in &self.switches {
            let config = SwitchConfig::from_settings(settings)?;
            if !seen.insert(config.entity_id().to_owned()) {
                return Err(ConfigError::DuplicateEntity(config.entity_id().to_owned()));
            }
            configs.push(config);
        }
        Ok(configs)
    }
}

impl ConfigDocument for PlatformConfig {
    fn validate(&self) -> anyhow::Result<()> {
        self.switch_configs()?;
        Ok(())
    }
}

impl FromStr for PlatformConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        parse_document(content)
    }
}
