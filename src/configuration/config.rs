use super::types::*;
use crate::error_handling::types::ConfigError;
use clap::parser::ValueSource;
use clap::ArgMatches;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::IpAddr;
use std::path::Path;

/// File-level configuration, one table per subcommand.
///
/// Both tables are optional and every missing key falls back to the built-in default, so the
/// smallest valid file is an empty one.
///
/// # Examples
///
/// ```
/// use snare::configuration::config::Config;
///
/// let config = Config::from_toml_str("[trap]\nlisten_port = 2022\n").unwrap();
/// assert_eq!(config.trap.listen_port, 2022);
/// assert_eq!(config.api.port, 8000);
/// ```
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub trap: TrapConfig,
    pub api: ApiConfig,
}

impl Config {
    /// Reads and parses a TOML configuration file.
    ///
    /// # Errors
    /// * `ConfigError::IoError` when the file cannot be read
    /// * `ConfigError::TomlError` when its content is not valid for this structure
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|e| ConfigError::TomlError(e.to_string()))
    }
}

/// Lays the options given explicitly on the command line or through the environment over a
/// section read from a configuration file.
///
/// `cli` is the section as parsed by clap from `matches`; options that only carry their
/// built-in default keep the value found in `file`. Argument ids are the field names, which
/// are also the TOML keys.
pub fn overlay_explicit<T>(file: &T, cli: &T, matches: &ArgMatches) -> Result<T, ConfigError>
where
    T: Serialize + DeserializeOwned,
{
    let mut merged =
        toml::Table::try_from(file).map_err(|e| ConfigError::TomlError(e.to_string()))?;
    let given = toml::Table::try_from(cli).map_err(|e| ConfigError::TomlError(e.to_string()))?;

    for (key, value) in given {
        if matches!(
            matches.value_source(&key),
            Some(ValueSource::CommandLine) | Some(ValueSource::EnvVariable)
        ) {
            merged.insert(key, value);
        }
    }

    merged
        .try_into()
        .map_err(|e| ConfigError::TomlError(e.to_string()))
}

impl TrapConfig {
    /// Checks the values that would otherwise only fail once the listener is running.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen_host.trim().is_empty() {
            return Err(ConfigError::EmptyValue("listen_host".into()));
        }
        if self.listen_host.parse::<IpAddr>().is_err() {
            return Err(ConfigError::NotInRange(format!(
                "listen_host '{}' is not an IP address",
                self.listen_host
            )));
        }
        if self.listen_port == 0 {
            return Err(ConfigError::NotInRange("listen_port must not be 0".into()));
        }
        if self.banner.is_empty() {
            return Err(ConfigError::EmptyValue("banner".into()));
        }
        if self.read_buffer_size == 0 {
            return Err(ConfigError::NotInRange("read_buffer_size must not be 0".into()));
        }
        if self.probe_attempts == 0 {
            return Err(ConfigError::NotInRange("probe_attempts must not be 0".into()));
        }
        for (name, secs) in [
            ("read_timeout_secs", self.read_timeout_secs),
            ("report_timeout_secs", self.report_timeout_secs),
            ("probe_timeout_secs", self.probe_timeout_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::NotInRange(format!("{} must not be 0", name)));
            }
        }
        validate_backend_url(&self.backend_url)
    }
}

impl ApiConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_address.parse::<IpAddr>().is_err() {
            return Err(ConfigError::NotInRange(format!(
                "bind_address '{}' is not an IP address",
                self.bind_address
            )));
        }
        if !self.database_url.starts_with("sqlite:") {
            return Err(ConfigError::BadUrl(format!(
                "database_url '{}' must use the sqlite: scheme",
                self.database_url
            )));
        }
        Ok(())
    }
}

fn validate_backend_url(url: &str) -> Result<(), ConfigError> {
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
        .ok_or_else(|| ConfigError::BadUrl(format!("'{}' must start with http:// or https://", url)))?;

    if rest.trim_end_matches('/').is_empty() {
        return Err(ConfigError::BadUrl(format!("'{}' has no host", url)));
    }
    Ok(())
}
