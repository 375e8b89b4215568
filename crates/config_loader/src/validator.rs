//! Configuration validation
//!
//! Rules:
//! - field-level ranges (derive rules on the blueprint types)
//! - every explicit dsn parses
//! - network destinations have a resolvable `host:port`
//! - fallback source names are non-empty and unique
//! - sink parameters are recognized

use std::collections::HashSet;

use contracts::{ContractError, Dsn, RoutingBlueprint, SinkConfig, SinkType};
use validator::Validate;

/// Validate a RoutingBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &RoutingBlueprint) -> Result<(), ContractError> {
    validate_fields(blueprint)?;
    validate_destination("primary", &blueprint.primary.dsn, &blueprint.primary.sink)?;
    validate_secondary(blueprint)?;
    validate_fallback_names(blueprint)?;
    Ok(())
}

/// Derived field rules (ranges, lengths)
fn validate_fields(blueprint: &RoutingBlueprint) -> Result<(), ContractError> {
    blueprint
        .validate()
        .map_err(|e| ContractError::config_validation("blueprint", e.to_string().trim().to_string()))
}

fn validate_destination(field: &str, dsn: &str, sink: &SinkConfig) -> Result<(), ContractError> {
    let dsn = Dsn::parse(dsn)
        .map_err(|e| ContractError::config_validation(format!("{field}.dsn"), e.to_string()))?;
    validate_sink(field, sink, Some(&dsn))
}

/// The secondary dsn is optional; only check it when present
fn validate_secondary(blueprint: &RoutingBlueprint) -> Result<(), ContractError> {
    let secondary = &blueprint.secondary;
    match secondary.dsn.as_deref().filter(|d| !d.trim().is_empty()) {
        Some(dsn) => validate_destination("secondary", dsn, &secondary.sink),
        None => validate_sink("secondary", &secondary.sink, None),
    }
}

fn validate_sink(field: &str, sink: &SinkConfig, dsn: Option<&Dsn>) -> Result<(), ContractError> {
    let (sink_type, params) = (sink.sink_type, &sink.params);
    let allowed: &[&str] = match sink_type {
        SinkType::Log => &[],
        SinkType::File => &["base_path"],
        SinkType::Network => &["format", "max_packet_size"],
    };
    if let Some(unknown) = params.keys().find(|k| !allowed.contains(&k.as_str())) {
        return Err(ContractError::config_validation(
            format!("{field}.params.{unknown}"),
            format!("unknown parameter for {sink_type:?} sink"),
        ));
    }

    if sink_type == SinkType::Network {
        if let Some(format) = params.get("format") {
            if format != "json" && format != "bincode" {
                return Err(ContractError::config_validation(
                    format!("{field}.params.format"),
                    format!("unknown format '{format}', expected 'json' or 'bincode'"),
                ));
            }
        }
        if let Some(dsn) = dsn {
            if dsn.socket_addr().is_none() {
                return Err(ContractError::config_validation(
                    format!("{field}.dsn"),
                    "network destinations need a port (or an http/https scheme)",
                ));
            }
        }
    }
    Ok(())
}

fn validate_fallback_names(blueprint: &RoutingBlueprint) -> Result<(), ContractError> {
    let Some(names) = &blueprint.secondary.fallback_env else {
        return Ok(());
    };
    let mut seen = HashSet::new();
    for (idx, name) in names.iter().enumerate() {
        if name.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("secondary.fallback_env[{idx}]"),
                "fallback name cannot be empty",
            ));
        }
        if !seen.insert(name) {
            return Err(ContractError::config_validation(
                format!("secondary.fallback_env[{idx}]"),
                format!("duplicate fallback '{name}'"),
            ));
        }
    }
    Ok(())
}
