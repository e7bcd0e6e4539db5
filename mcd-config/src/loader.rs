//! Settings file parsing.
//!
//! Every format is read into a JSON object so the layers can be merged key
//! by key before deserializing into typed settings.

use crate::{ConfigError, Result};
use serde_json::{Map, Value};
use std::path::Path;

/// Formats a settings file can be written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Toml,
    Json,
    /// `KEY=value` lines, keys lowercased to match settings fields
    Dotenv,
}

impl FileFormat {
    /// Pick the format from the file name: `.toml`, `.json`, `.env` or a
    /// bare `.env` file.
    pub fn detect(path: &Path) -> Result<Self> {
        let is_dotenv = path.file_name().and_then(|n| n.to_str()) == Some(".env");
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match ext.as_deref() {
            Some("toml") => Ok(FileFormat::Toml),
            Some("json") => Ok(FileFormat::Json),
            Some("env") => Ok(FileFormat::Dotenv),
            None if is_dotenv => Ok(FileFormat::Dotenv),
            _ => Err(ConfigError::UnknownFormat(path.to_path_buf())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FileFormat::Toml => "TOML",
            FileFormat::Json => "JSON",
            FileFormat::Dotenv => ".env",
        }
    }

    /// Parse a document. The root must be a table.
    pub fn parse(&self, content: &str) -> Result<Map<String, Value>> {
        let value = match self {
            FileFormat::Toml => toml::from_str::<toml::Table>(content)
                .map_err(|e| self.parse_error(e))
                .and_then(|table| serde_json::to_value(table).map_err(ConfigError::from))?,
            FileFormat::Json => serde_json::from_str(content).map_err(|e| self.parse_error(e))?,
            FileFormat::Dotenv => self.parse_dotenv(content)?,
        };

        match value {
            Value::Object(map) => Ok(map),
            _ => Err(ConfigError::NotATable),
        }
    }

    fn parse_dotenv(&self, content: &str) -> Result<Value> {
        let mut map = Map::new();
        for item in dotenvy::from_read_iter(content.as_bytes()) {
            let (key, value) = item.map_err(|e| self.parse_error(e))?;
            map.insert(key.to_lowercase(), Value::String(value));
        }
        Ok(Value::Object(map))
    }

    fn parse_error(&self, err: impl std::fmt::Display) -> ConfigError {
        ConfigError::Parse {
            format: self.name(),
            message: err.to_string(),
        }
    }
}

/// Read and parse a settings file, detecting its format.
pub fn read_file(path: &Path) -> Result<Map<String, Value>> {
    let format = FileFormat::detect(path)?;
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    format.parse(&content)
}
