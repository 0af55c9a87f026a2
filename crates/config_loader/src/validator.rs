//! Configuration validation
//!
//! Rules:
//! - relay host is non-empty
//! - file chunk size and payload limit are positive
//! - stream names are non-empty, path-safe and unique
//! - stream ports are unique
//! - `kind = video` if and only if `gop_size > 0`

use std::collections::HashSet;

use contracts::{ContractError, GathererKind, RelayConfig};

/// Validate a parsed configuration
///
/// Returns the first error found.
pub fn validate(config: &RelayConfig) -> Result<(), ContractError> {
    validate_relay(config)?;
    validate_file(config)?;
    validate_stream_names(config)?;
    validate_stream_ports(config)?;
    validate_gop(config)?;
    Ok(())
}

fn validate_relay(config: &RelayConfig) -> Result<(), ContractError> {
    if config.relay.host.trim().is_empty() {
        return Err(ContractError::config_validation(
            "relay.host",
            "host cannot be empty",
        ));
    }
    Ok(())
}

fn validate_file(config: &RelayConfig) -> Result<(), ContractError> {
    if config.file.chunk_size == 0 {
        return Err(ContractError::config_validation(
            "file.chunk_size",
            "chunk_size must be > 0",
        ));
    }
    if config.file.max_payload_bytes == 0 {
        return Err(ContractError::config_validation(
            "file.max_payload_bytes",
            "max_payload_bytes must be > 0",
        ));
    }
    Ok(())
}

fn validate_stream_names(config: &RelayConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, stream) in config.streams.iter().enumerate() {
        if !stream.name.is_path_safe() {
            return Err(ContractError::config_validation(
                format!("streams[{idx}].name"),
                format!(
                    "'{}' must be non-empty and use only [A-Za-z0-9_-]",
                    stream.name
                ),
            ));
        }
        if !seen.insert(&stream.name) {
            return Err(ContractError::config_validation(
                format!("streams[name={}]", stream.name),
                "duplicate stream name",
            ));
        }
    }
    Ok(())
}

fn validate_stream_ports(config: &RelayConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for stream in &config.streams {
        if !seen.insert(stream.port) {
            return Err(ContractError::config_validation(
                format!("streams[{}].port", stream.name),
                format!("duplicate port {}", stream.port),
            ));
        }
    }
    Ok(())
}

fn validate_gop(config: &RelayConfig) -> Result<(), ContractError> {
    for stream in &config.streams {
        let video = stream.kind == GathererKind::Video;
        if video != (stream.gop_size > 0) {
            return Err(ContractError::config_validation(
                format!("streams[{}].gop_size", stream.name),
                format!(
                    "kind {:?} with gop_size {}: video streams need gop_size > 0, basic streams need 0",
                    stream.kind, stream.gop_size
                ),
            ));
        }
    }
    Ok(())
}
