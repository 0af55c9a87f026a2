//! # Config Loader
//!
//! Loads and validates the relay configuration.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate stream identities and relay settings
//! - Produce a `RelayConfig` passed explicitly to every task
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("relay.toml")).unwrap();
//! println!("relay: {}", config.relay.host);
//! ```

mod parser;
mod validator;

pub use contracts::RelayConfig;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file
    ///
    /// The format is taken from the extension (`.toml` / `.json`).
    ///
    /// # Errors
    /// Read, format detection, parse or validation failure
    pub fn load_from_path(path: &Path) -> Result<RelayConfig, ContractError> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format).inspect_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "config rejected");
        })
    }

    /// Load configuration from a string
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<RelayConfig, ContractError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }

    /// Validate a configuration built in code
    pub fn validate(config: &RelayConfig) -> Result<(), ContractError> {
        validator::validate(config)
    }

    pub fn to_toml(config: &RelayConfig) -> Result<String, ContractError> {
        parser::render(config, ConfigFormat::Toml)
    }

    pub fn to_json(config: &RelayConfig) -> Result<String, ContractError> {
        parser::render(config, ConfigFormat::Json)
    }
}
