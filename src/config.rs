use serde::{Deserialize, Serialize};

use crate::mnemonic::{Language, Strength};
use crate::network::Network;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
    #[error("Failed to serialize configuration: {0}")]
    Serialize(String),
}

/// Settings for creating and restoring keychains.
///
/// Every field is optional in JSON form:
///
/// ```json
/// { "network": "testnet", "language": "japanese", "strength": 256 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub network: Network,
    pub language: Language,
    pub strength: Strength,
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Config =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        tracing::debug!(
            network = ?config.network,
            language = ?config.language,
            strength = config.strength.entropy_bits(),
            "loaded keychain configuration"
        );
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }
}
