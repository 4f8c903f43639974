//! Layered configuration loading: built-in defaults, overlaid by a YAML file,
//! overlaid by `APP_`-prefixed environment variables. The YAML file's location
//! is resolved from (in order) `--config`, `CONFIG_PATH`, then
//! `configs/config.yaml`.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Env {
    Dev,
    Local,
    Prod,
}

impl Env {
    /// Log verbosity floor for this environment: dev/local default to
    /// debug, prod defaults to info.
    pub fn default_filter(&self) -> &'static str {
        match self {
            Env::Dev | Env::Local => "calendar_reminder=debug,tower_http=debug",
            Env::Prod => "calendar_reminder=info,tower_http=info",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub env: Env,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub queue: QueueConfig,
    pub smtp: SmtpConfig,
    pub worker: WorkerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_idle_timeout_seconds")]
    pub idle_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub database: String,
    #[serde(default = "default_sslmode")]
    pub sslmode: String,
}

impl StorageConfig {
    pub fn connection_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            self.user, self.password, self.host, self.port, self.database, self.sslmode
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub db: u8,
}

impl QueueConfig {
    pub fn connection_url(&self) -> String {
        if self.user.is_empty() && self.password.is_empty() {
            format!("redis://{}:{}/{}", self.host, self.port, self.db)
        } else {
            format!(
                "redis://{}:{}@{}:{}/{}",
                self.user, self.password, self.host, self.port, self.db
            )
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_true")]
    pub tls_enabled: bool,
    /// Address reminder emails are sent from. Defaults to the SMTP
    /// username if unset.
    #[serde(default)]
    pub from_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    #[serde(default = "default_worker_interval_seconds")]
    pub interval_seconds: u64,
    #[serde(default = "default_worker_limit")]
    pub limit: i64,
}

fn default_port() -> u16 {
    8080
}
fn default_timeout_seconds() -> u64 {
    10
}
fn default_idle_timeout_seconds() -> u64 {
    60
}
fn default_sslmode() -> String {
    "disable".to_string()
}
fn default_true() -> bool {
    true
}
fn default_worker_interval_seconds() -> u64 {
    30
}
fn default_worker_limit() -> i64 {
    100
}

/// Resolve the config file path in CLI precedence order: `--config`, else
/// `CONFIG_PATH`, else `configs/config.yaml`. Returns `None` when falling
/// back to the default path and that path doesn't exist (defaults alone
/// are sufficient); an explicitly-named missing path is an error.
pub fn resolve_config_path(cli_flag: Option<&Path>) -> AppResult<Option<PathBuf>> {
    if let Some(path) = cli_flag {
        if !path.exists() {
            return Err(AppError::Config(format!(
                "config file {} does not exist",
                path.display()
            )));
        }
        return Ok(Some(path.to_path_buf()));
    }

    if let Ok(env_path) = std::env::var("CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if !path.exists() {
            return Err(AppError::Config(format!(
                "config file {} does not exist",
                path.display()
            )));
        }
        return Ok(Some(path));
    }

    let default_path = PathBuf::from("configs/config.yaml");
    if default_path.exists() {
        Ok(Some(default_path))
    } else {
        Ok(None)
    }
}

impl Config {
    /// Load configuration from the resolved YAML file (if any), overlaid
    /// with `APP_`-prefixed environment variables using `__` as the
    /// nested-field separator (e.g. `APP_STORAGE__PASSWORD`).
    pub fn load(cli_flag: Option<&Path>) -> AppResult<Self> {
        dotenvy::dotenv().ok();

        let path = resolve_config_path(cli_flag)?;

        let mut builder = config::Config::builder();
        if let Some(path) = &path {
            tracing::info!("loading configuration from {}", path.display());
            builder = builder.add_source(config::File::from(path.as_path()));
        } else {
            tracing::warn!(
                "no configuration file found at configs/config.yaml; relying on defaults and environment"
            );
        }

        builder = builder.add_source(
            config::Environment::with_prefix("APP")
                .separator("__")
                .try_parsing(true),
        );

        let raw = builder
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        let config: Config = raw
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))?;

        Ok(config)
    }
}
