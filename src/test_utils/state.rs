use axum::{
    http::{HeaderMap, HeaderValue, header::COOKIE, header::SET_COOKIE},
    response::IntoResponse,
};
use axum_extra::extract::{PrivateCookieJar, cookie::Cookie};
use rusqlite::Connection;

use crate::{
    AppState, PasswordHash,
    session::{SESSION_NAME, Session},
    user::{NewUser, User, UserID, create_user},
};

/// An app state with an in-memory database and insecure cookies so that the
/// test client sends them back over plain HTTP.
///
/// Passwords are hashed with the minimum cost to keep tests fast.
pub(crate) fn get_test_state() -> AppState {
    AppState::new(
        Connection::open_in_memory().expect("Could not open in-memory SQLite database"),
        "test secret",
        false,
        "Asia/Jakarta",
        std::env::temp_dir().join("financial_record_test_photos"),
    )
    .expect("Could not create app state")
    .with_password_cost(4)
}

/// Insert a user named after the local part of `email`.
///
/// The password is hashed with the minimum cost to keep tests fast.
#[track_caller]
pub(crate) fn insert_test_user(state: &AppState, email: &str, password: &str) -> User {
    let name = email.split('@').next().unwrap_or(email).to_owned();
    let connection = state.db_connection.lock().unwrap();

    create_user(
        &NewUser {
            name,
            email: email.to_owned(),
            password_hash: PasswordHash::new(password, 4).unwrap(),
        },
        &connection,
    )
    .expect("Could not create test user")
}

/// The encrypted cookie that `state` would send for `session`.
#[track_caller]
pub(crate) fn session_cookie_with(state: &AppState, session: &Session) -> Cookie<'static> {
    let jar = state
        .sessions
        .save(PrivateCookieJar::new(state.cookie_key.clone()), session);
    let response = jar.into_response();

    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| Cookie::parse(value.to_str().ok()?.to_owned()).ok())
        .find(|cookie| cookie.name() == session.name())
        .expect("Saved jar has no session cookie")
}

/// A session cookie for the logged in user `user_id`.
#[track_caller]
pub(crate) fn session_cookie(state: &AppState, user_id: UserID) -> Cookie<'static> {
    let mut session = Session::new(SESSION_NAME);
    session.log_in(user_id);

    session_cookie_with(state, &session)
}

/// Decrypt the session `name` from a cookie set by the server.
#[track_caller]
pub(crate) fn read_session(state: &AppState, cookie: &Cookie<'_>, name: &'static str) -> Session {
    let mut headers = HeaderMap::new();
    headers.insert(
        COOKIE,
        HeaderValue::from_str(&format!("{}={}", cookie.name(), cookie.value()))
            .expect("Cookie is not a valid header value"),
    );
    let jar = PrivateCookieJar::from_headers(&headers, state.cookie_key.clone());

    state.sessions.get(&jar, name)
}
