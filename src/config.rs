//! Application settings read from a JSON file and overridden by environment variables.
//!
//! The file uses the same names as the environment, with the database settings nested under
//! `DATABASE`:
//!
//! ```json
//! {
//!     "DATABASE": { "DRIVER": "sqlite", "NAME": "financial_record.db" },
//!     "APP_SECRET": "change me",
//!     "APP_TIMEZONE": "Asia/Jakarta"
//! }
//! ```
//!
//! The environment variable for a nested key joins the names with an underscore, e.g.
//! `DATABASE_NAME`.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use rusqlite::Connection;
use serde::Deserialize;
use serde_json::Value;

use crate::{Error, timezone::get_local_offset, validation::Locale};

/// The only supported database driver.
pub const SQLITE_DRIVER: &str = "sqlite";

const DEFAULT_DATABASE_NAME: &str = "financial_record.db";
const DEFAULT_ENV: &str = "production";
const DEFAULT_TIMEZONE: &str = "Asia/Jakarta";
const DEFAULT_PHOTO_DIR: &str = "public/user_photo";

/// Environments where cookies are sent over plain HTTP unless configured otherwise.
const INSECURE_ENVS: [&str; 4] = ["development", "dev", "local", "test"];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
struct DatabaseFile {
    driver: Option<String>,
    name: Option<String>,
    user: Option<String>,
    password: Option<String>,
    host: Option<String>,
    port: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
struct ConfigFile {
    database: DatabaseFile,
    app_secret: Option<String>,
    app_secure_cookie: Option<Value>,
    app_env: Option<String>,
    app_timezone: Option<String>,
    app_photo_dir: Option<String>,
    app_locale: Option<String>,
}

/// Where the application data is stored.
#[derive(Clone, PartialEq)]
pub struct DatabaseConfig {
    pub driver: String,
    /// The path of the SQLite database file.
    pub name: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<String>,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("driver", &self.driver)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

impl DatabaseConfig {
    /// Open a connection to the configured database.
    ///
    /// SQLite has no server, so the user, password, host and port are ignored with a warning.
    ///
    /// # Errors
    ///
    /// Returns an [Error::ConfigError] for drivers other than SQLite, or an [Error::SqlError]
    /// if the database file could not be opened.
    pub fn open(&self) -> Result<Connection, Error> {
        if !self.driver.eq_ignore_ascii_case(SQLITE_DRIVER) {
            return Err(Error::ConfigError(format!(
                "unsupported database driver \"{}\", only \"{SQLITE_DRIVER}\" is supported",
                self.driver
            )));
        }

        for (key, value) in [
            ("DATABASE.USER", &self.user),
            ("DATABASE.PASSWORD", &self.password),
            ("DATABASE.HOST", &self.host),
            ("DATABASE.PORT", &self.port),
        ] {
            if value.is_some() {
                tracing::warn!("{key} is ignored by the {SQLITE_DRIVER} driver");
            }
        }

        Connection::open(&self.name).map_err(Error::from)
    }
}

/// The settings for the web server.
#[derive(Clone, PartialEq)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    /// The secret the cookie encryption key is derived from.
    pub secret: String,
    /// Whether cookies are only sent over HTTPS.
    pub secure_cookie: bool,
    /// The deployment environment, e.g. "production" or "development".
    pub env: String,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Jakarta".
    pub timezone: String,
    /// The directory that profile photos are written to and served from.
    pub photo_dir: PathBuf,
    /// The language of validation messages.
    pub locale: Locale,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("database", &self.database)
            .field("secret", &"<redacted>")
            .field("secure_cookie", &self.secure_cookie)
            .field("env", &self.env)
            .field("timezone", &self.timezone)
            .field("photo_dir", &self.photo_dir)
            .field("locale", &self.locale)
            .finish()
    }
}

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(string) => Some(string),
        other => Some(other.to_string()),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, Error> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::ConfigError(format!(
            "{key} must be true or false, got \"{value}\""
        ))),
    }
}

impl AppConfig {
    /// The config file read when no other path is given.
    pub const DEFAULT_PATH: &str = "app.conf.json";

    /// Load the config file at `path`, if it exists, and apply the process environment on top.
    ///
    /// # Errors
    ///
    /// Returns an [Error::ConfigError] if the file cannot be read or parsed, or the combined
    /// settings are invalid.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => Some(contents),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(
                    "no config file at {}, using environment variables only",
                    path.display()
                );
                None
            }
            Err(error) => {
                return Err(Error::ConfigError(format!(
                    "could not read {}: {error}",
                    path.display()
                )));
            }
        };

        Self::from_sources(contents.as_deref(), |key| std::env::var(key).ok())
    }

    /// Build the settings from the contents of a config file and a lookup for environment
    /// variables. Environment variables take precedence over the file.
    ///
    /// # Errors
    ///
    /// Returns an [Error::ConfigError] if:
    /// - the file is not valid JSON,
    /// - `APP_SECRET` is missing or empty,
    /// - `APP_SECURE_COOKIE` is not a boolean,
    /// - `APP_TIMEZONE` is not a known timezone,
    /// - `APP_LOCALE` is not a supported language.
    pub fn from_sources(
        file_contents: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, Error> {
        let file: ConfigFile = match file_contents {
            Some(contents) => serde_json::from_str(contents)
                .map_err(|error| Error::ConfigError(format!("invalid config file: {error}")))?,
            None => ConfigFile::default(),
        };

        let pick = |key: &str, from_file: Option<String>| {
            env(key).filter(|value| !value.is_empty()).or(from_file)
        };

        let database = DatabaseConfig {
            driver: pick("DATABASE_DRIVER", file.database.driver)
                .unwrap_or_else(|| SQLITE_DRIVER.to_owned()),
            name: pick("DATABASE_NAME", file.database.name)
                .unwrap_or_else(|| DEFAULT_DATABASE_NAME.to_owned()),
            user: pick("DATABASE_USER", file.database.user),
            password: pick("DATABASE_PASSWORD", file.database.password),
            host: pick("DATABASE_HOST", file.database.host),
            port: pick(
                "DATABASE_PORT",
                file.database.port.and_then(value_to_string),
            ),
        };

        let secret = pick("APP_SECRET", file.app_secret)
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| Error::ConfigError("APP_SECRET must be set".to_owned()))?;

        let env_name = pick("APP_ENV", file.app_env).unwrap_or_else(|| DEFAULT_ENV.to_owned());

        let secure_cookie = match pick(
            "APP_SECURE_COOKIE",
            file.app_secure_cookie.and_then(value_to_string),
        ) {
            Some(value) => parse_bool("APP_SECURE_COOKIE", &value)?,
            None => !INSECURE_ENVS.contains(&env_name.to_ascii_lowercase().as_str()),
        };

        let timezone =
            pick("APP_TIMEZONE", file.app_timezone).unwrap_or_else(|| DEFAULT_TIMEZONE.to_owned());
        if get_local_offset(&timezone).is_none() {
            return Err(Error::ConfigError(format!(
                "APP_TIMEZONE \"{timezone}\" is not a valid, canonical timezone"
            )));
        }

        let photo_dir = pick("APP_PHOTO_DIR", file.app_photo_dir)
            .unwrap_or_else(|| DEFAULT_PHOTO_DIR.to_owned());

        let locale = match pick("APP_LOCALE", file.app_locale) {
            Some(locale) => locale.parse()?,
            None => Locale::default(),
        };

        Ok(Self {
            database,
            secret,
            secure_cookie,
            env: env_name,
            timezone,
            photo_dir: PathBuf::from(photo_dir),
            locale,
        })
    }
}
