// Configuration management for the MCD beacon
//
// Layers, lowest precedence first: built-in defaults, a config file
// (TOML, JSON or .env), a `.env` in the working directory, then `MCD_*`
// environment variables.

pub mod env;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{FileFormat, read_file};
pub use settings::{BeaconSettings, DirectiveSetting, STORE_BACKENDS};
pub use validation::{ConfigValidator, Validate};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Prefix for environment overrides, e.g. `MCD_SITE_URL`.
pub const ENV_PREFIX: &str = "MCD";

/// Main configuration manager
#[derive(Clone)]
pub struct ConfigManager {
    config: Arc<RwLock<HashMap<String, serde_json::Value>>>,
    env_prefix: Option<String>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(HashMap::new())),
            env_prefix: None,
        }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            config: Arc::new(RwLock::new(HashMap::new())),
            env_prefix: Some(prefix.into()),
        }
    }

    /// Merge environment variables (prefix stripped) into the configuration
    pub fn load_env(&self) {
        let loader = EnvLoader::new(self.env_prefix.clone());
        let mut config = self.config.write();
        for (key, value) in loader.load() {
            config.insert(key, serde_json::Value::String(value));
        }
    }

    /// Load a `.env` file into the process environment, then merge the
    /// environment. A missing default `.env` is not an error.
    pub fn load_dotenv(&self, path: Option<&Path>) -> Result<()> {
        match path {
            Some(path) => {
                dotenvy::from_path(path)?;
            }
            None => {
                dotenvy::dotenv().ok();
            }
        }
        self.load_env();
        Ok(())
    }

    /// Merge the top-level keys of a config file
    pub fn load_file(&self, path: &Path) -> Result<()> {
        let data = read_file(path)?;
        self.config.write().extend(data);
        Ok(())
    }

    /// Merge the top-level keys of an already-parsed document
    pub fn merge_value(&self, data: serde_json::Value) -> Result<()> {
        let serde_json::Value::Object(map) = data else {
            return Err(ConfigError::NotATable);
        };

        let mut config = self.config.write();
        for (key, value) in map {
            config.insert(key, value);
        }
        Ok(())
    }

    pub fn set<T: serde::Serialize>(&self, key: &str, value: T) -> Result<()> {
        let json_value = serde_json::to_value(value)?;
        self.config.write().insert(key.to_string(), json_value);
        Ok(())
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let config = self.config.read();
        let value = config
            .get(key)
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;

        Ok(serde_json::from_value(value.clone())?)
    }

    pub fn has(&self, key: &str) -> bool {
        self.config.read().contains_key(key)
    }

    /// Deserialize everything loaded so far into `T` and validate it
    pub fn load_validated<T: DeserializeOwned + Validate>(&self) -> Result<T> {
        let json_value = {
            let config = self.config.read();
            serde_json::Value::Object(
                config.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            )
        };

        let validated: T = serde_json::from_value(json_value)?;

        validated.validate()?;
        Ok(validated)
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Load [`BeaconSettings`] through every layer.
pub fn load_settings(file: Option<&Path>) -> Result<BeaconSettings> {
    let manager = ConfigManager::with_prefix(ENV_PREFIX);
    if let Some(path) = file {
        manager.load_file(path)?;
    }
    manager.load_dotenv(None)?;
    manager.load_validated()
}
