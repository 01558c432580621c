use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "HomecareNurse";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default request timeout for backend calls.
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Extra attempts for the task confirmation call on transport failure.
pub const DEFAULT_CONFIRM_RETRIES: u32 = 1;

const CONFIG_FILE_NAME: &str = "config.json";

/// Get the application data directory.
/// Falls back to the working directory when no home directory is known
/// (sandboxed mobile targets resolve `data_dir` instead).
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// SQLite file holding the persisted session (account info + access token).
pub fn session_db_path() -> PathBuf {
    app_data_dir().join("session.db")
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "info,homecare_nurse_lib=debug"
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Malformed config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

// ═══════════════════════════════════════════════════════════
// Config types
// ═══════════════════════════════════════════════════════════

/// Path prefix per backend service. The platform routes every service
/// under the same host, each under its own prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicePrefixes {
    pub auth: String,
    pub appointment: String,
    pub nurse: String,
    pub patient: String,
}

impl Default for ServicePrefixes {
    fn default() -> Self {
        Self {
            auth: "auth".into(),
            appointment: "appointment".into(),
            nurse: "nurse".into(),
            patient: "patient".into(),
        }
    }
}

/// Care platform REST backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub prefixes: ServicePrefixes,
    pub timeout_secs: u64,
    /// Retries for `mark_task_done` on connect/timeout failures only.
    pub confirm_retries: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api/v1".into(),
            prefixes: ServicePrefixes::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            confirm_retries: DEFAULT_CONFIRM_RETRIES,
        }
    }
}

/// Directions service settings (route preview on the map screen).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapsConfig {
    pub directions_url: String,
    pub api_key: Option<String>,
    pub vehicle: String,
}

impl Default for MapsConfig {
    fn default() -> Self {
        Self {
            directions_url: "https://rsapi.goong.io/Direction".into(),
            api_key: None,
            vehicle: "car".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub maps: MapsConfig,
}

impl AppConfig {
    /// Defaults, then `config.json` in the app data dir, then env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = app_data_dir().join(CONFIG_FILE_NAME);
        let mut config = Self::from_file_or_default(&path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file. A missing file yields defaults.
    pub fn from_file_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Apply `HOMECARE_*` overrides through the given lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("HOMECARE_API_BASE_URL") {
            self.api.base_url = url;
        }
        if let Some(raw) = lookup("HOMECARE_API_TIMEOUT_SECS") {
            self.api.timeout_secs = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                field: "HOMECARE_API_TIMEOUT_SECS",
                value: raw.clone(),
            })?;
        }
        if let Some(raw) = lookup("HOMECARE_CONFIRM_RETRIES") {
            self.api.confirm_retries =
                raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    field: "HOMECARE_CONFIRM_RETRIES",
                    value: raw.clone(),
                })?;
        }
        if let Some(key) = lookup("HOMECARE_GOONG_API_KEY") {
            self.maps.api_key = Some(key).filter(|k| !k.trim().is_empty());
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "api.base_url",
                value: self.api.base_url.clone(),
            });
        }
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "api.timeout_secs",
                value: "0".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn app_data_dir_ends_with_app_name() {
        assert!(app_data_dir().ends_with(APP_NAME));
    }

    #[test]
    fn session_db_under_app_data() {
        let db = session_db_path();
        assert!(db.starts_with(app_data_dir()));
        assert!(db.ends_with("session.db"));
    }

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.api.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.api.confirm_retries, 1);
        assert_eq!(config.api.prefixes.appointment, "appointment");
        assert!(config.maps.api_key.is_none());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::from_file_or_default(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"api": {"base_url": "https://care.example/api"}}"#).unwrap();

        let config = AppConfig::from_file_or_default(&path).unwrap();
        assert_eq!(config.api.base_url, "https://care.example/api");
        assert_eq!(config.api.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.maps.vehicle, "car");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            AppConfig::from_file_or_default(&path),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config
            .apply_env(env_from(&[
                ("HOMECARE_API_BASE_URL", "https://staging.example/api"),
                ("HOMECARE_API_TIMEOUT_SECS", "30"),
                ("HOMECARE_CONFIRM_RETRIES", "0"),
                ("HOMECARE_GOONG_API_KEY", "key-123"),
            ]))
            .unwrap();
        assert_eq!(config.api.base_url, "https://staging.example/api");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.api.confirm_retries, 0);
        assert_eq!(config.maps.api_key.as_deref(), Some("key-123"));
    }

    #[test]
    fn bad_timeout_env_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env(env_from(&[("HOMECARE_API_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "HOMECARE_API_TIMEOUT_SECS", .. }));
    }

    #[test]
    fn zero_timeout_fails_validation() {
        let mut config = AppConfig::default();
        config.api.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_base_url_fails_validation() {
        let mut config = AppConfig::default();
        config.api.base_url = "  ".into();
        assert!(config.validate().is_err());
    }
}
