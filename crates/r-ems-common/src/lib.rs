//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared primitives and utilities for the SNMP integration runtime."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Shared primitives for the R-EMS SNMP integration workspace.
//! This crate exposes configuration discovery and tracing subscriber
//! setup consumed by the adapter crates.

pub mod config;
pub mod logging;

pub use config::{load, load_with_source, parse_document, ConfigDocument, Loaded, LoggingConfig};
pub use logging::{init_tracing, LogFormat};
