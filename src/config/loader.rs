//! Configuration loading from the command line, environment and disk.
//!
//! Every setting can come from a `FORWARDEAZ_SERVICE_*` environment variable
//! or the matching flag. An optional TOML file supplies the base values; flags
//! and environment variables override it.

use std::fs;
use std::path::{Path, PathBuf};

use clap::builder::BoolishValueParser;
use clap::Parser;
use thiserror::Error;

use crate::config::schema::{LogFormat, ServiceConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Command line arguments for the service binary.
#[derive(Debug, Default, Parser)]
#[command(name = "forwardeaz")]
#[command(about = "Envoy external authorization backed by a forward-auth endpoint", long_about = None)]
#[command(version)]
pub struct Args {
    /// TOML file with base configuration
    #[arg(long, env = "FORWARDEAZ_SERVICE_CONFIG")]
    pub config: Option<PathBuf>,

    /// gRPC listen address
    #[arg(long, env = "FORWARDEAZ_SERVICE_ADDRESS")]
    pub address: Option<String>,

    /// The authentication server address
    #[arg(long, env = "FORWARDEAZ_SERVICE_FORWARD_AUTH_ADDRESS")]
    pub forward_auth_address: Option<String>,

    /// Headers to copy from the request to the authentication server
    #[arg(long, env = "FORWARDEAZ_SERVICE_AUTH_REQUEST_HEADERS", value_delimiter = ',')]
    pub auth_request_headers: Option<Vec<String>>,

    /// Headers to copy from the authentication server to the request
    #[arg(long, env = "FORWARDEAZ_SERVICE_AUTH_RESPONSE_HEADERS", value_delimiter = ',')]
    pub auth_response_headers: Option<Vec<String>>,

    /// Trust all the existing X-Forwarded-* headers
    #[arg(long, env = "FORWARDEAZ_SERVICE_TRUST_FORWARD_HEADER", value_parser = BoolishValueParser::new())]
    pub trust_forward_header: Option<bool>,

    /// Timeout for each forward-auth call in seconds
    #[arg(long, env = "FORWARDEAZ_SERVICE_FORWARD_AUTH_TIMEOUT_SECS")]
    pub forward_auth_timeout_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "FORWARDEAZ_SERVICE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(long, env = "FORWARDEAZ_SERVICE_LOG_FORMAT", value_enum)]
    pub log_format: Option<LogFormat>,

    /// Prometheus endpoint bind address
    #[arg(long, env = "FORWARDEAZ_SERVICE_METRICS_ADDRESS")]
    pub metrics_address: Option<String>,

    /// Version reported in logs
    #[arg(long = "service-version", env = "FORWARDEAZ_SERVICE_VERSION")]
    pub service_version: Option<String>,
}

/// Build the effective configuration from `args`, then validate it.
pub fn load(args: Args) -> Result<ServiceConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => read_config(path)?,
        None => ServiceConfig::default(),
    };

    apply_overrides(&mut config, args);
    normalize(&mut config);

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let mut config = read_config(path)?;
    normalize(&mut config);

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn read_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

fn apply_overrides(config: &mut ServiceConfig, args: Args) {
    if let Some(address) = args.address {
        config.address = address;
    }
    if let Some(address) = args.forward_auth_address {
        config.forward_auth_address = address;
    }
    if let Some(headers) = args.auth_request_headers {
        config.auth_request_headers = headers;
    }
    if let Some(headers) = args.auth_response_headers {
        config.auth_response_headers = headers;
    }
    if let Some(trust) = args.trust_forward_header {
        config.trust_forward_header = trust;
    }
    if let Some(secs) = args.forward_auth_timeout_secs {
        config.forward_auth_timeout_secs = secs;
    }
    if let Some(level) = args.log_level {
        config.log_level = level;
    }
    if let Some(format) = args.log_format {
        config.log_format = format;
    }
    if let Some(address) = args.metrics_address {
        config.metrics_address = Some(address);
    }
    if let Some(version) = args.service_version {
        config.version = version;
    }
}

/// Trim header lists and fill in an unknown version.
fn normalize(config: &mut ServiceConfig) {
    for list in [
        &mut config.auth_request_headers,
        &mut config.auth_response_headers,
    ] {
        list.iter_mut().for_each(|name| *name = name.trim().to_string());
        list.retain(|name| !name.is_empty());
    }
    if config.version.is_empty() {
        config.version = "unknown".to_string();
    }
}
