//! Shared configuration used by the core library and the gateway.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the registrations CSV inside `data_dir`.
pub const INSCRIPTIONS_FILE_NAME: &str = "inscriptions.csv";

/// Global application configuration. Load from TOML or env.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Application identity shown in start-up logs.
    pub app_name: String,
    /// Bind address for the gateway.
    pub host: String,
    /// HTTP port for the gateway.
    pub port: u16,
    /// Directory holding the registrations CSV.
    pub data_dir: String,
    /// Directory for `app.log`.
    pub logs_dir: String,
    /// Directory served under `/static` (logo, background images).
    pub static_dir: String,
    /// Directory holding `index.html` and `test-image.html`.
    pub templates_dir: String,
    /// Optional JSON file overriding the built-in FAQ knowledge base.
    #[serde(default)]
    pub knowledge_path: Option<String>,
    /// When true, technical error details are echoed in 500 responses.
    #[serde(default)]
    pub debug: bool,

    pub smtp_server: String,
    pub smtp_port: u16,
    /// Sender and recipient of registration notifications.
    pub email_address: String,
    /// SMTP password. Empty disables notification mail.
    #[serde(default)]
    pub email_password: String,

    pub rate_limit_per_day: u32,
    pub rate_limit_per_hour: u32,
    /// Extra per-IP limit on `POST /inscription`.
    pub inscription_limit_per_hour: u32,
    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
}

impl CoreConfig {
    /// Path of the registrations CSV.
    pub fn inscriptions_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(INSCRIPTIONS_FILE_NAME)
    }

    /// True when an SMTP password is configured.
    pub fn mail_enabled(&self) -> bool {
        !self.email_password.trim().is_empty()
    }

    /// Load config from file and environment. Precedence: env `BBC_*` > `BBC_CONFIG` path (default `config/gateway.toml`) > defaults.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path = std::env::var("BBC_CONFIG").unwrap_or_else(|_| "config/gateway".to_string());
        let builder = Self::defaults()?;

        let path = Path::new(&config_path);
        let with_ext = path.with_extension("toml");
        let builder = if path.is_file() {
            builder.add_source(config::File::from(path))
        } else if with_ext.is_file() {
            builder.add_source(config::File::from(with_ext.as_path()))
        } else {
            builder
        };

        let built = builder
            .add_source(
                config::Environment::with_prefix("BBC")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        built.try_deserialize()
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
        config::Config::builder()
            .set_default("app_name", "BBC School Algeria")?
            .set_default("host", "0.0.0.0")?
            .set_default("port", 5000_i64)?
            .set_default("data_dir", "data")?
            .set_default("logs_dir", "logs")?
            .set_default("static_dir", "static")?
            .set_default("templates_dir", "templates")?
            .set_default("debug", false)?
            .set_default("smtp_server", "smtp.gmail.com")?
            .set_default("smtp_port", 587_i64)?
            .set_default("email_address", "bbcschoolformations@gmail.com")?
            .set_default("email_password", "")?
            .set_default("rate_limit_per_day", 2000_i64)?
            .set_default("rate_limit_per_hour", 500_i64)?
            .set_default("inscription_limit_per_hour", 10_i64)?
            .set_default("max_body_bytes", 16_i64 * 1024 * 1024)
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            app_name: "BBC School Algeria".to_string(),
            host: "0.0.0.0".to_string(),
            port: 5000,
            data_dir: "data".to_string(),
            logs_dir: "logs".to_string(),
            static_dir: "static".to_string(),
            templates_dir: "templates".to_string(),
            knowledge_path: None,
            debug: false,
            smtp_server: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            email_address: "bbcschoolformations@gmail.com".to_string(),
            email_password: String::new(),
            rate_limit_per_day: 2000,
            rate_limit_per_hour: 500,
            inscription_limit_per_hour: 10,
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}
