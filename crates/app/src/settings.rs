//! Handles settings for the application.
//!
//! Sources, lowest precedence first: built-in defaults, the optional
//! `settings.toml`, `EXPENSE__`-prefixed environment variables (for example
//! `EXPENSE__SERVER__PERSIST_CREATED=true`), then the flat variables `PORT`,
//! `DB_HOST`, `DB_PORT`, `DB_USER`, `DB_PASSWORD`, `DB_NAME` and `DB_SSLMODE`.
use config::{
    Config, ConfigError, Environment, File,
    builder::{ConfigBuilder, DefaultState},
};
use serde::Deserialize;
use url::Url;

const DEFAULT_CONFIG_PATH: &str = "settings";

/// Flat variables and the key each one overrides.
const FLAT_OVERRIDES: [(&str, &str); 7] = [
    ("PORT", "server.port"),
    ("DB_HOST", "database.host"),
    ("DB_PORT", "database.port"),
    ("DB_USER", "database.user"),
    ("DB_PASSWORD", "database.password"),
    ("DB_NAME", "database.name"),
    ("DB_SSLMODE", "database.ssl_mode"),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
    pub persist_created: bool,
}

#[derive(Debug, Deserialize)]
pub struct Database {
    /// Full connection url, wins over the individual fields.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub ssl_mode: String,
    pub max_connections: Option<u32>,
}

impl Database {
    /// Postgres url assembled from the fields, credentials percent-encoded.
    pub fn connection_url(&self) -> Result<String, ConfigError> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }

        let invalid = |what: &str| ConfigError::Message(format!("invalid database {what}"));
        let mut url = Url::parse(&format!("postgres://{}:{}", self.host, self.port))
            .map_err(|err| ConfigError::Message(format!("invalid database host: {err}")))?;
        url.set_username(&self.user).map_err(|_| invalid("user"))?;
        url.set_password(Some(&self.password))
            .map_err(|_| invalid("password"))?;
        url.set_path(&self.name);
        url.query_pairs_mut().append_pair("sslmode", &self.ssl_mode);

        Ok(url.into())
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub server: Server,
    pub database: Database,
}

impl Settings {
    pub fn new(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = defaults()?
            .add_source(File::with_name(config_path.unwrap_or(DEFAULT_CONFIG_PATH)).required(false))
            .add_source(
                Environment::with_prefix("EXPENSE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        for (var, key) in FLAT_OVERRIDES {
            builder = builder.set_override_option(key, std::env::var(var).ok())?;
        }

        builder.build()?.try_deserialize()
    }

    /// Log the loaded values, the password never leaves this function.
    pub fn log_loaded(&self) {
        tracing::info!(
            port = self.server.port,
            db_host = %self.database.host,
            db_port = self.database.port,
            db_user = %self.database.user,
            db_password = "***",
            db_name = %self.database.name,
            db_ssl_mode = %self.database.ssl_mode,
            db_url_override = self.database.url.is_some(),
            persist_created = self.server.persist_created,
            "configuration loaded successfully"
        );
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("app.level", "info")?
        .set_default("app.log_format", "json")?
        .set_default("server.bind", "0.0.0.0")?
        .set_default("server.port", 8080)?
        .set_default("server.shutdown_timeout_secs", 10)?
        .set_default("server.persist_created", false)?
        .set_default("database.host", "localhost")?
        .set_default("database.port", 5432)?
        .set_default("database.user", "postgres")?
        .set_default("database.password", "postgres")?
        .set_default("database.name", "expense-api")?
        .set_default("database.ssl_mode", "disable")
}
