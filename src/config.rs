use config::{Config, ConfigError, File};
use secrecy::{ExposeSecret, Secret};
use serde_aux::field_attributes::deserialize_number_from_string;
use sqlx::{
    postgres::{PgConnectOptions, PgSslMode},
    ConnectOptions,
};
use std::path::PathBuf;
use std::time;

use crate::import::ImportSettings;

#[derive(Debug)]
pub enum Environment {
    Development,
    Production,
}

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub import: ImportConfig,
    pub phone_verification: PhoneVerificationSettings,
    pub auth: AuthSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_body_bytes: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub request_timeout_secs: u64,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    // secrecy protects secret information and prevents them to be exposed (eg: via logs)
    pub password: Secret<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    pub name: String,
    pub require_ssl: bool,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_connections: u32,
}

#[derive(serde::Deserialize, Clone)]
pub struct ImportConfig {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub batch_size: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub association_batch_size: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_upload_bytes: usize,
    pub upload_dir: PathBuf,
}

#[derive(serde::Deserialize, Clone)]
pub struct PhoneVerificationSettings {
    pub base_url: String,
    // Verification is skipped (fail-open) when no key is configured
    pub api_key: Option<Secret<String>>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_millis: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub bot_score_threshold: f64,
}

#[derive(serde::Deserialize, Clone)]
pub struct AuthSettings {
    pub jwt_secret: Secret<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub token_ttl_secs: i64,
    pub admin: AdminSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct AdminSettings {
    pub username: String,
    pub password_hash: Secret<String>,
    pub email: String,
    pub name: String,
}

impl Settings {
    pub fn get_address(&self) -> String {
        format!(
            "{}:{}",
            self.application.get_host(),
            self.application.get_port()
        )
    }

    pub fn get_request_timeout(&self) -> time::Duration {
        time::Duration::from_secs(self.application.request_timeout_secs)
    }

    pub fn set_phone_verification_base_url(&mut self, new_base_url: String) {
        self.phone_verification.base_url = new_base_url
    }

    pub fn set_phone_verification_api_key(&mut self, api_key: Option<Secret<String>>) {
        self.phone_verification.api_key = api_key
    }

    pub fn set_upload_dir(&mut self, upload_dir: PathBuf) {
        self.import.upload_dir = upload_dir
    }

    pub fn set_app_port(&mut self, port: u16) {
        self.application.port = port;
    }
}

impl DatabaseSettings {
    pub fn get_db_options(&self) -> PgConnectOptions {
        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };

        let mut db_options = PgConnectOptions::new()
            .host(&self.host)
            .password(self.password.expose_secret())
            .username(&self.username)
            .port(self.port)
            .database(&self.name)
            .ssl_mode(ssl_mode);

        db_options.log_statements(tracing::log::LevelFilter::Trace);

        db_options
    }

    /// Options for the maintenance connection, without selecting a database.
    pub fn get_server_options(&self) -> PgConnectOptions {
        self.get_db_options().database("postgres")
    }

    pub fn set_name(&mut self, new_db_name: String) {
        self.name = new_db_name
    }
}

impl ApplicationSettings {
    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub fn get_host(&self) -> String {
        self.host.clone()
    }
}

impl ImportConfig {
    pub fn get_import_settings(&self) -> ImportSettings {
        ImportSettings {
            batch_size: self.batch_size,
            association_batch_size: self.association_batch_size,
        }
    }
}

impl PhoneVerificationSettings {
    pub fn get_timeout(&self) -> time::Duration {
        time::Duration::from_millis(self.timeout_millis)
    }
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            unknown_env => Err(format!(
                "{} is not supported environment. Use either 'development' or 'production'.",
                unknown_env
            )),
        }
    }
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let root_path = std::env::current_dir()
        .map_err(|err| ConfigError::Message(format!("Failed to read current dir: {}", err)))?;
    let config_directory = root_path.join("config");
    // Uses development environment by default
    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "development".into())
        .try_into()
        .map_err(ConfigError::Message)?;
    let config_base_filepath = config_directory.join("base");
    let config_env_filepath = config_directory.join(environment.as_str());

    // It merges the base configuration file with the one from the specific environment (development or production)
    let settings = Config::builder()
        .add_source(File::from(config_base_filepath).required(true))
        .add_source(File::from(config_env_filepath).required(true))
        // Merge settings from environment variables with a prefix of APP and "__" separator
        // E.g APP_APPLICATION__PORT would set Settings.application.port
        .add_source(config::Environment::with_prefix("app").separator("__"))
        .build()?;

    tracing::info!("Application environment = {:?}", environment);

    // Try to convert the value from the configuration file into a Settings type
    settings.try_deserialize()
}
