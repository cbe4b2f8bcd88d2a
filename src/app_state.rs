//! Implements a struct that holds the state of the web server.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use rusqlite::Connection;
use sha2::{Digest, Sha512};

use crate::{Error, PasswordHash, db::initialize, session::SessionStore, validation::Locale};

/// The state of the web server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,

    /// Reads and writes the session cookies.
    pub sessions: SessionStore,

    /// The local timezone as a canonical timezone name, e.g. "Asia/Jakarta".
    pub local_timezone: String,

    /// The directory that profile photos are written to and served from.
    pub photo_dir: PathBuf,

    /// The language of validation messages.
    pub locale: Locale,

    /// The bcrypt cost for hashing new passwords.
    pub password_cost: u32,

    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    /// `local_timezone` should be a valid, canonical timezone name, e.g. "Asia/Jakarta".
    /// `secure_cookie` controls the `Secure` attribute of the session cookies.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(
        db_connection: Connection,
        cookie_secret: &str,
        secure_cookie: bool,
        local_timezone: &str,
        photo_dir: PathBuf,
    ) -> Result<Self, Error> {
        initialize(&db_connection)?;

        let cookie_key = create_cookie_key(cookie_secret);

        Ok(Self {
            sessions: SessionStore::new(cookie_key.clone(), secure_cookie),
            cookie_key,
            local_timezone: local_timezone.to_owned(),
            photo_dir,
            locale: Locale::default(),
            password_cost: PasswordHash::DEFAULT_COST,
            db_connection: Arc::new(Mutex::new(db_connection)),
        })
    }

    /// Write validation messages in `locale` instead of the default.
    pub fn with_locale(self, locale: Locale) -> Self {
        Self { locale, ..self }
    }

    /// Hash new passwords with `password_cost` instead of [PasswordHash::DEFAULT_COST].
    pub fn with_password_cost(self, password_cost: u32) -> Self {
        Self {
            password_cost,
            ..self
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

impl FromRef<AppState> for SessionStore {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

/// Create a signing key for cookies from a `secret`s string.
pub fn create_cookie_key(secret: &str) -> Key {
    let hash = Sha512::digest(secret);

    Key::from(&hash)
}
