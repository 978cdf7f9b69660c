//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, URLs and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use url::Url;

use crate::config::schema::{resolve_addr, ServiceConfig};

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The forward-auth address is unset.
    #[error("forward_auth_address is required")]
    MissingForwardAuthAddress,

    /// The forward-auth address is not an absolute http(s) URL.
    #[error("forward_auth_address {address:?} is invalid: {reason}")]
    InvalidForwardAuthAddress { address: String, reason: String },

    /// The listen address does not resolve.
    #[error("address {address:?} is invalid: {reason}")]
    InvalidAddress { address: String, reason: String },

    /// The metrics address does not resolve.
    #[error("metrics_address {address:?} is invalid: {reason}")]
    InvalidMetricsAddress { address: String, reason: String },

    /// The timeout is zero.
    #[error("forward_auth_timeout_secs must be greater than zero")]
    ZeroTimeout,

    /// The log level is not a valid filter directive.
    #[error("log_level {level:?} is invalid: {reason}")]
    InvalidLogLevel { level: String, reason: String },
}

/// Validate a loaded configuration.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.forward_auth_address.is_empty() {
        errors.push(ValidationError::MissingForwardAuthAddress);
    } else if let Err(reason) = check_forward_auth_address(&config.forward_auth_address) {
        errors.push(ValidationError::InvalidForwardAuthAddress {
            address: config.forward_auth_address.clone(),
            reason,
        });
    }

    if let Err(e) = resolve_addr(&config.address) {
        errors.push(ValidationError::InvalidAddress {
            address: config.address.clone(),
            reason: e.to_string(),
        });
    }

    if let Err(e) = config.metrics_addr() {
        errors.push(ValidationError::InvalidMetricsAddress {
            address: config.metrics_address.clone().unwrap_or_default(),
            reason: e.to_string(),
        });
    }

    if config.forward_auth_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if let Err(e) = EnvFilter::try_new(&config.log_level) {
        errors.push(ValidationError::InvalidLogLevel {
            level: config.log_level.clone(),
            reason: e.to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_forward_auth_address(address: &str) -> Result<(), String> {
    let url = Url::parse(address).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported scheme {:?}", other)),
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    Ok(())
}
