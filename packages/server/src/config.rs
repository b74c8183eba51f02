use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub use common::config::{S3StorageConfig, StorageAppConfig, StorageBackend};

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    /// Origins of the admin front end. Empty allows any origin.
    #[serde(default)]
    pub allow_origins: Vec<String>,
    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
}

fn default_cors_max_age() -> u64 {
    3600
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: Vec::new(),
            max_age: default_cors_max_age(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub cors: CorsConfig,
}

/// Edit-session lifetime settings.
#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// Sessions idle longer than this are closed and their unsaved uploads
    /// deleted. Default: 2 hours.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// How often to look for idle sessions. Default: 5 minutes.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Default folder for uploads that do not name one. Default: "uploads".
    #[serde(default = "default_upload_folder")]
    pub default_folder: String,
}

fn default_idle_timeout_secs() -> u64 {
    2 * 60 * 60
}
fn default_sweep_interval_secs() -> u64 {
    5 * 60
}
fn default_upload_folder() -> String {
    "uploads".into()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            default_folder: default_upload_folder(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageAppConfig,
    #[serde(default)]
    pub sessions: SessionConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("CMS_CONFIG").unwrap_or_else(|_| "config/config".to_string());

        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            // Load from config/config.toml
            .add_source(File::with_name(&config_path).required(false))
            // Override from environment (e.g., CMS__STORAGE__ROOT)
            .add_source(Environment::with_prefix("CMS").separator("__"))
            .build()?;

        s.try_deserialize::<Self>()?.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.sessions.sweep_interval_secs == 0 {
            return Err(ConfigError::Message(
                "sessions.sweep_interval_secs must be at least 1".into(),
            ));
        }
        Ok(self)
    }
}
