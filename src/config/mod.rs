use std::env;
use std::path::PathBuf;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Session storage configuration
    pub storage: StorageConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Session storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory holding one JSON record per session
    pub sessions_dir: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    /// Human-readable output
    Pretty,
    /// Structured JSON output
    Json,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let sessions_dir = match env::var("ULTRATHINK_SESSIONS_DIR") {
            Ok(dir) if dir.trim().is_empty() => {
                return Err(AppError::Config {
                    message: "ULTRATHINK_SESSIONS_DIR cannot be empty".to_string(),
                });
            }
            Ok(dir) => PathBuf::from(dir),
            Err(_) => StorageConfig::default_sessions_dir(),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "warn".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        Ok(Config {
            storage: StorageConfig { sessions_dir },
            logging,
        })
    }
}

impl StorageConfig {
    /// `<system temp dir>/ultrathink/sessions`
    pub fn default_sessions_dir() -> PathBuf {
        env::temp_dir().join("ultrathink").join("sessions")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sessions_dir: Self::default_sessions_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Pretty,
        }
    }
}
