//! Typed settings for the beacon service.

use crate::{ConfigError, ConfigValidator, Result, Validate};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;

/// Storage backends the service knows how to build.
pub const STORE_BACKENDS: &[&str] = &["memory", "file"];

/// One policy directive as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DirectiveSetting {
    pub name: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

impl DirectiveSetting {
    pub fn new(name: &str, sources: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Complete service configuration.
///
/// Every field has a default so partial files and bare environments load.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BeaconSettings {
    /// Canonical site URL; substituted for an empty `blocked-uri`.
    pub site_url: String,
    #[serde(deserialize_with = "number_from_any")]
    pub port: u16,
    /// Secret for nonce signing, at least 32 bytes.
    pub nonce_secret: String,
    #[serde(deserialize_with = "number_from_any")]
    pub nonce_lifetime: i64,
    pub store_backend: String,
    pub store_path: Option<String>,
    pub log_level: String,
    pub log_format: String,
    #[serde(deserialize_with = "bool_from_any")]
    pub report_only: bool,
    /// Ordered policy directives; the report-uri is appended at runtime.
    pub policy: Vec<DirectiveSetting>,
    /// Session token to user id.
    pub sessions: HashMap<String, u64>,
}

impl Default for BeaconSettings {
    fn default() -> Self {
        Self {
            site_url: "http://localhost:8080".to_string(),
            port: 8080,
            nonce_secret: String::new(),
            nonce_lifetime: 86_400,
            store_backend: "memory".to_string(),
            store_path: None,
            log_level: "info".to_string(),
            log_format: "json".to_string(),
            report_only: true,
            policy: vec![
                DirectiveSetting::new("default-src", &["'self'"]),
                DirectiveSetting::new("script-src", &["'self'"]),
                DirectiveSetting::new("style-src", &["'self'", "'unsafe-inline'"]),
                DirectiveSetting::new("img-src", &["'self'", "data:", "https:"]),
                DirectiveSetting::new("font-src", &["'self'"]),
                DirectiveSetting::new("connect-src", &["'self'"]),
                DirectiveSetting::new("object-src", &["'none'"]),
            ],
            sessions: HashMap::new(),
        }
    }
}

impl Validate for BeaconSettings {
    fn validate(&self) -> Result<()> {
        ConfigValidator::is_url(&self.site_url, "site_url")?;
        ConfigValidator::min_len(&self.nonce_secret, 32, "nonce_secret")?;
        ConfigValidator::in_range(self.nonce_lifetime, 2, 31_536_000, "nonce_lifetime")?;
        ConfigValidator::one_of(&self.store_backend, STORE_BACKENDS, "store_backend")?;
        ConfigValidator::one_of(
            &self.log_format,
            &["json", "pretty", "compact"],
            "log_format",
        )?;

        if self.store_backend == "file" && self.store_path.is_none() {
            return Err(ConfigError::invalid(
                "store_path",
                "required for the file backend",
            ));
        }

        for directive in &self.policy {
            ConfigValidator::not_empty(&directive.name, "policy.name")?;
            if directive.name.contains(char::is_whitespace) || directive.name.contains(';') {
                let message = format!("invalid directive name: {}", directive.name);
                return Err(ConfigError::invalid("policy.name", message));
            }
        }

        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString<T> {
    Number(T),
    String(String),
}

/// Environment variables arrive as strings; accept both forms.
fn number_from_any<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match NumberOrString::<T>::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn bool_from_any<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrString::<bool>::deserialize(deserializer)? {
        NumberOrString::Number(b) => Ok(b),
        NumberOrString::String(s) => match s.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            other => Err(serde::de::Error::custom(format!("invalid boolean: {}", other))),
        },
    }
}
