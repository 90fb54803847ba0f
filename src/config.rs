//! Terminal configuration.
//!
//! Settings come from an optional JSON file named by `POS_CART_CONFIG`, then
//! individual environment variables override single keys. Nothing here is a
//! secret; the backend is unauthenticated.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::scan_gate::{DEFAULT_SCAN_WINDOW_MS, MAX_SCAN_WINDOW_MS};

const ENV_CONFIG_FILE: &str = "POS_CART_CONFIG";
const ENV_API_BASE_URL: &str = "POS_API_BASE_URL";
const ENV_SCANNER_PORT: &str = "POS_SCANNER_PORT";
const ENV_SCANNER_BAUD: &str = "POS_SCANNER_BAUD";
const ENV_SCAN_DEBOUNCE_MS: &str = "POS_SCAN_DEBOUNCE_MS";
const ENV_UPI_PAYEE: &str = "POS_UPI_PAYEE";
const ENV_UPI_NAME: &str = "POS_UPI_NAME";
const ENV_LOG_DIR: &str = "POS_LOG_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PosConfig {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub scan_debounce_ms: u64,
    pub scanner_port: Option<String>,
    pub scanner_baud_rate: u32,
    pub upi_payee_address: String,
    pub upi_payee_name: String,
    pub currency: String,
    pub log_dir: Option<PathBuf>,
}

impl Default for PosConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:5000".to_string(),
            request_timeout_secs: 30,
            scan_debounce_ms: DEFAULT_SCAN_WINDOW_MS,
            scanner_port: None,
            scanner_baud_rate: 9600,
            upi_payee_address: String::new(),
            upi_payee_name: String::new(),
            currency: "INR".to_string(),
            log_dir: None,
        }
    }
}

impl PosConfig {
    /// Load from `POS_CART_CONFIG` (if set) and apply env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(ENV_CONFIG_FILE) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(Path::new(path.trim()))?,
            _ => Self::default(),
        };
        config.apply_env()?;
        config.normalize()?;
        info!(
            api_base_url = %config.api_base_url,
            scanner_port = ?config.scanner_port,
            scan_debounce_ms = config.scan_debounce_ms,
            "Configuration loaded"
        );
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(v) = env_value(ENV_API_BASE_URL) {
            self.api_base_url = v;
        }
        if let Some(v) = env_value(ENV_SCANNER_PORT) {
            self.scanner_port = Some(v);
        }
        if let Some(v) = env_value(ENV_SCANNER_BAUD) {
            self.scanner_baud_rate = v.parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_SCANNER_BAUD,
                value: v.clone(),
            })?;
        }
        if let Some(v) = env_value(ENV_SCAN_DEBOUNCE_MS) {
            self.scan_debounce_ms = v.parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_SCAN_DEBOUNCE_MS,
                value: v.clone(),
            })?;
        }
        if let Some(v) = env_value(ENV_UPI_PAYEE) {
            self.upi_payee_address = v;
        }
        if let Some(v) = env_value(ENV_UPI_NAME) {
            self.upi_payee_name = v;
        }
        if let Some(v) = env_value(ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(v));
        }
        Ok(())
    }

    fn normalize(&mut self) -> Result<(), ConfigError> {
        self.api_base_url = normalize_base_url(&self.api_base_url);
        if self.api_base_url.is_empty() || self.api_base_url.ends_with("://") {
            return Err(ConfigError::InvalidValue {
                key: "api_base_url",
                value: self.api_base_url.clone(),
            });
        }
        if self.scan_debounce_ms > MAX_SCAN_WINDOW_MS {
            return Err(ConfigError::InvalidValue {
                key: "scan_debounce_ms",
                value: self.scan_debounce_ms.to_string(),
            });
        }
        if self.scanner_baud_rate == 0 {
            return Err(ConfigError::InvalidValue {
                key: "scanner_baud_rate",
                value: "0".into(),
            });
        }
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = PosConfig::default().request_timeout_secs;
        }
        self.scanner_port = self
            .scanner_port
            .take()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        self.currency = self.currency.trim().to_uppercase();
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Normalise the backend URL:
/// - ensure a scheme is present (https, or http for localhost)
/// - strip trailing slashes
/// - strip a trailing `/api` segment
pub fn normalize_base_url(url: &str) -> String {
    let mut url = url.trim().to_string();
    if url.is_empty() {
        return url;
    }

    if !url.starts_with("http://") && !url.starts_with("https://") {
        if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
            url = format!("http://{url}");
        } else {
            url = format!("https://{url}");
        }
    }

    while url.ends_with('/') {
        url.pop();
    }
    if url.ends_with("/api") {
        url.truncate(url.len() - 4);
    }
    while url.ends_with('/') {
        url.pop();
    }

    url
}
