//! Registrar configuration, read from `PIDREG_*` environment variables.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::payload::PayloadConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

/// dArk provider settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DarkConfig {
    pub enabled: bool,
    pub base_url: Option<String>,
    pub repo_prefix: String,
}

/// DOI provider settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoiConfig {
    pub enabled: bool,
    pub base_url: Option<String>,
    pub prefix: String,
    pub namespace_separator: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub log_level: String,
    pub sweep_interval: Duration,
    pub http_timeout: Duration,
    /// Repository REST API used to look resources up.
    pub repository_api_url: Option<String>,
    pub payload: PayloadConfig,
    pub dark: DarkConfig,
    pub doi: DoiConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let db_path = get("PIDREG_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("pidreg.db"));

        let log_level = get("PIDREG_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let sweep_interval = Duration::from_secs(parse_secs(
            "PIDREG_SWEEP_INTERVAL_SECS",
            get("PIDREG_SWEEP_INTERVAL_SECS"),
            60,
        )?);
        let http_timeout = Duration::from_secs(parse_secs(
            "PIDREG_HTTP_TIMEOUT_SECS",
            get("PIDREG_HTTP_TIMEOUT_SECS"),
            10,
        )?);

        let mut payload = PayloadConfig::default();
        if let Some(fields) = get("PIDREG_SEND_METADATA") {
            payload = payload.with_requested(&fields);
        }
        if let Some(ui) = get("PIDREG_UI_URL") {
            payload = payload.with_ui_base_url(ui);
        }

        let dark_enabled = parse_flag("PIDREG_DARK_ENABLED", get("PIDREG_DARK_ENABLED"))?;
        let dark = DarkConfig {
            enabled: dark_enabled,
            base_url: required_if(
                dark_enabled,
                "PIDREG_DARK_BASE_URL",
                get("PIDREG_DARK_BASE_URL"),
            )?,
            repo_prefix: match get("PIDREG_DARK_REPO_PREFIX") {
                Some(prefix) => prefix,
                None if dark_enabled => return Err(ConfigError::Missing("PIDREG_DARK_REPO_PREFIX")),
                None => "local".to_string(),
            },
        };

        let doi_enabled = parse_flag("PIDREG_DOI_ENABLED", get("PIDREG_DOI_ENABLED"))?;
        let doi = DoiConfig {
            enabled: doi_enabled,
            base_url: required_if(
                doi_enabled,
                "PIDREG_DOI_BASE_URL",
                get("PIDREG_DOI_BASE_URL"),
            )?,
            prefix: match get("PIDREG_DOI_PREFIX") {
                Some(prefix) => prefix,
                None if doi_enabled => return Err(ConfigError::Missing("PIDREG_DOI_PREFIX")),
                None => "10.5072".to_string(),
            },
            namespace_separator: get("PIDREG_DOI_NAMESPACE_SEPARATOR").unwrap_or_default(),
            username: get("PIDREG_DOI_USERNAME"),
            password: get("PIDREG_DOI_PASSWORD"),
        };

        Ok(Self {
            db_path,
            log_level,
            sweep_interval,
            http_timeout,
            repository_api_url: get("PIDREG_REPOSITORY_API_URL"),
            payload,
            dark,
            doi,
        })
    }
}

fn parse_secs(key: &'static str, value: Option<String>, default: u64) -> Result<u64, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => match v.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(secs),
            _ => Err(ConfigError::Invalid { key, value: v }),
        },
    }
}

fn parse_flag(key: &'static str, value: Option<String>) -> Result<bool, ConfigError> {
    match value.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) if v == "1" || v == "true" || v == "yes" => Ok(true),
        Some(v) if v == "0" || v == "false" || v == "no" => Ok(false),
        Some(_) => Err(ConfigError::Invalid {
            key,
            value: value.unwrap_or_default(),
        }),
    }
}

fn required_if(
    enabled: bool,
    key: &'static str,
    value: Option<String>,
) -> Result<Option<String>, ConfigError> {
    match value {
        None if enabled => Err(ConfigError::Missing(key)),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.db_path, PathBuf::from("pidreg.db"));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
        assert_eq!(config.http_timeout, Duration::from_secs(10));
        assert!(!config.dark.enabled);
        assert!(!config.doi.enabled);
        assert_eq!(config.payload, PayloadConfig::default());
        assert_eq!(config.repository_api_url, None);
    }

    #[test]
    fn test_enabled_provider_needs_base_url() {
        let err = config(&[
            ("PIDREG_DARK_ENABLED", "true"),
            ("PIDREG_DARK_REPO_PREFIX", "hope"),
        ])
        .unwrap_err();
        assert_eq!(err, ConfigError::Missing("PIDREG_DARK_BASE_URL"));

        let err = config(&[("PIDREG_DOI_ENABLED", "1")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing("PIDREG_DOI_BASE_URL"));
    }

    #[test]
    fn test_full_provider_settings() {
        let config = config(&[
            ("PIDREG_DARK_ENABLED", "true"),
            ("PIDREG_DARK_BASE_URL", "https://dark.example.org"),
            ("PIDREG_DARK_REPO_PREFIX", "hope"),
            ("PIDREG_DOI_ENABLED", "false"),
            ("PIDREG_SEND_METADATA", "dc.title,dc.identifier.uri"),
            ("PIDREG_UI_URL", "https://repo.example.org"),
            ("PIDREG_HTTP_TIMEOUT_SECS", "5"),
        ])
        .unwrap();

        assert_eq!(
            config.dark,
            DarkConfig {
                enabled: true,
                base_url: Some("https://dark.example.org".into()),
                repo_prefix: "hope".into(),
            }
        );
        assert!(!config.doi.enabled);
        assert_eq!(config.http_timeout, Duration::from_secs(5));
        assert_eq!(config.payload.requested_fields.len(), 2);
        assert_eq!(
            config.payload.ui_base_url.as_deref(),
            Some("https://repo.example.org")
        );
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            config(&[("PIDREG_SWEEP_INTERVAL_SECS", "soon")]),
            Err(ConfigError::Invalid { key: "PIDREG_SWEEP_INTERVAL_SECS", .. })
        ));
        assert!(matches!(
            config(&[("PIDREG_HTTP_TIMEOUT_SECS", "0")]),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            config(&[("PIDREG_DOI_ENABLED", "maybe")]),
            Err(ConfigError::Invalid { key: "PIDREG_DOI_ENABLED", .. })
        ));
    }
}
