//! Configuration Module
//!
//! Provides configuration management for the Shastho registration service.
//! Settings are read from a YAML file and can be overridden with `APP_`
//! environment variables, using `__` between nested keys
//! (e.g. `APP_STORAGE__BACKEND=memory`). Every setting has a default, so a
//! missing file is not an error.
//!
//! @author Shastho
//! @copyright 2025

use std::path::PathBuf;

use config::{Config as ConfigFile, Environment, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::DEFAULT_CODE_LENGTH;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/application.yml";

/// Application metadata configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Application {
    /// Name of the application
    #[serde(default = "default_app_name")]
    pub name: String,
}

/// Which store backs the session and directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local map, lost on exit
    Memory,
    /// One JSON file per key under `path`
    File,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Backend to use
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
    /// Directory for the file backend
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

/// Sign-in configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Number of characters a verification code must have
    #[serde(default = "default_otp_length")]
    pub otp_length: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `shastho_registration=debug`
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

/// Application configuration settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Application metadata
    #[serde(default)]
    pub application: Application,
    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Sign-in configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_app_name() -> String {
    "shastho-registration".to_string()
}

fn default_backend() -> StorageBackend {
    StorageBackend::File
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("data/store")
}

fn default_otp_length() -> usize {
    DEFAULT_CODE_LENGTH
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Application {
    fn default() -> Self {
        Self { name: default_app_name() }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_storage_path(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { otp_length: default_otp_length() }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    ParseError(String),
    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl Config {
    /// Loads configuration from [`DEFAULT_CONFIG_PATH`] and the environment.
    ///
    /// # Configuration Sources
    /// Configuration is loaded in the following order (later sources override earlier ones):
    /// 1. Built-in defaults
    /// 2. Base configuration (`config/application.yml`), if present
    /// 3. Environment variables (prefixed with `APP_`)
    pub fn new() -> Result<Self, ConfigError> {
        Self::load(DEFAULT_CONFIG_PATH)
    }

    /// Same as [`Config::new`] with an explicit file path.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let builder = ConfigFile::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.otp_length == 0 {
            return Err(ConfigError::InvalidValue(
                "auth.otp_length must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
