//! Encrypted, cookie-backed sessions with one-shot flash messages.
//!
//! A session is serialized as JSON and stored in a private (encrypted and
//! authenticated) cookie. Two cookies are used:
//! - [SESSION_NAME] holds the log-in state and in-app notices.
//! - [FLASH_NAME] holds notices that must survive a log-out, e.g. the
//!   "logged out" message shown on the log-in page.

use std::collections::BTreeMap;

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, Key, SameSite},
};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::user::UserID;

/// The name of the cookie holding the authentication state.
pub const SESSION_NAME: &str = "financial_record_session";
/// The name of the cookie holding notices that outlive the session.
pub const FLASH_NAME: &str = "financial_record_flash";
/// How long a session cookie is kept by the client.
pub const SESSION_DURATION: Duration = Duration::hours(24);

/// The kind of notice a flash message represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashCategory {
    Success,
    Error,
}

impl FlashCategory {
    /// The name of the queue holding this category.
    pub fn key(self) -> &'static str {
        match self {
            FlashCategory::Success => "success",
            FlashCategory::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct SessionValues {
    #[serde(default)]
    authenticated: bool,
    #[serde(default)]
    user_id: Option<UserID>,
    #[serde(default)]
    flashes: BTreeMap<String, Vec<String>>,
}

/// The session bound to a single request.
///
/// Changes are only sent to the client once the session is passed to
/// [SessionStore::save].
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    name: &'static str,
    values: SessionValues,
    invalidated: bool,
}

impl Session {
    /// Create an empty session that will be stored under the cookie `name`.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            values: SessionValues::default(),
            invalidated: false,
        }
    }

    /// The name of the cookie the session is stored in.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Mark the session as belonging to the authenticated user `user_id`.
    pub fn log_in(&mut self, user_id: UserID) {
        self.values.authenticated = true;
        self.values.user_id = Some(user_id);
        self.invalidated = false;
    }

    pub fn is_authenticated(&self) -> bool {
        self.values.authenticated
    }

    /// The ID of the logged in user.
    ///
    /// Returns `None` unless the session is authenticated.
    pub fn user_id(&self) -> Option<UserID> {
        if self.values.authenticated {
            self.values.user_id
        } else {
            None
        }
    }

    /// Queue a one-shot `message` that is returned by the next call to
    /// [Session::flashes] for `category`.
    pub fn add_flash(&mut self, message: impl Into<String>, category: FlashCategory) {
        self.values
            .flashes
            .entry(category.key().to_owned())
            .or_default()
            .push(message.into());
    }

    /// Take the queued messages for `category`.
    ///
    /// The messages are removed from the session, the client only forgets
    /// them once the session has been saved.
    pub fn flashes(&mut self, category: FlashCategory) -> Vec<String> {
        self.values
            .flashes
            .remove(category.key())
            .unwrap_or_default()
    }

    /// Take the queued messages of every category, errors first.
    pub fn take_flashes(&mut self) -> Vec<(FlashCategory, String)> {
        [FlashCategory::Error, FlashCategory::Success]
            .into_iter()
            .flat_map(|category| {
                self.flashes(category)
                    .into_iter()
                    .map(move |message| (category, message))
            })
            .collect()
    }

    /// Mark the session for deletion, [SessionStore::save] will then expire
    /// the cookie on the client.
    pub fn invalidate(&mut self) {
        self.values = SessionValues::default();
        self.invalidated = true;
    }
}

/// Reads sessions from, and writes sessions to, private cookies.
#[derive(Debug, Clone)]
pub struct SessionStore {
    key: Key,
    secure: bool,
    max_age: Duration,
}

impl SessionStore {
    /// Create a store that encrypts cookies with `key`.
    ///
    /// `secure` sets the `Secure` attribute on every cookie written by the
    /// store.
    pub fn new(key: Key, secure: bool) -> Self {
        Self {
            key,
            secure,
            max_age: SESSION_DURATION,
        }
    }

    /// The key used to encrypt the session cookies.
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Get the session `name` from `jar`.
    ///
    /// A missing cookie, or one that cannot be decrypted or deserialized,
    /// yields an empty session.
    pub fn get(&self, jar: &PrivateCookieJar, name: &'static str) -> Session {
        let Some(cookie) = jar.get(name) else {
            return Session::new(name);
        };

        match serde_json::from_str(cookie.value()) {
            Ok(values) => Session {
                name,
                values,
                invalidated: false,
            },
            Err(error) => {
                tracing::warn!("Discarding unreadable session cookie {name}: {error}");
                Session::new(name)
            }
        }
    }

    /// Write `session` to `jar`.
    ///
    /// An invalidated session is written as an empty cookie with a max age of
    /// zero and an expiry in the past, which deletes the cookie on the client.
    pub fn save(&self, jar: PrivateCookieJar, session: &Session) -> PrivateCookieJar {
        if session.invalidated {
            return jar.add(
                Cookie::build((session.name, ""))
                    .path("/")
                    .expires(OffsetDateTime::UNIX_EPOCH)
                    .max_age(Duration::ZERO)
                    .http_only(true)
                    .same_site(SameSite::Lax)
                    .secure(self.secure),
            );
        }

        let value = match serde_json::to_string(&session.values) {
            Ok(value) => value,
            Err(error) => {
                tracing::error!("Could not serialize session {}: {error}", session.name);
                return jar;
            }
        };

        jar.add(
            Cookie::build((session.name, value))
                .path("/")
                .expires(OffsetDateTime::now_utc() + self.max_age)
                .max_age(self.max_age)
                .http_only(true)
                .same_site(SameSite::Lax)
                .secure(self.secure),
        )
    }
}
