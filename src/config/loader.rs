//! Configuration loading.
//!
//! Layering, lowest precedence first:
//! defaults → TOML file → command line / environment overrides.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub primary: Option<String>,
    pub secondary: Option<String>,
    pub port: Option<u16>,
}

impl ConfigOverrides {
    pub fn apply(self, config: &mut ProxyConfig) {
        if let Some(primary) = self.primary {
            config.upstreams.primary = primary;
        }
        if let Some(secondary) = self.secondary {
            config.upstreams.secondary = secondary;
        }
        if let Some(port) = self.port {
            config.listener.port = port;
        }
    }
}

/// Parse a TOML document without validating it.
pub fn parse_config(content: &str) -> Result<ProxyConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Build the effective configuration and validate it.
///
/// `path` is optional: without a file, defaults plus overrides are used.
pub fn load_config(
    path: Option<&Path>,
    overrides: ConfigOverrides,
) -> Result<ProxyConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_config(&fs::read_to_string(path)?)?,
        None => ProxyConfig::default(),
    };

    overrides.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
