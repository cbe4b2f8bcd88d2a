//! Log-out route handler that invalidates the session and redirects users.

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::PrivateCookieJar;

use crate::{
    endpoints,
    session::{FLASH_NAME, FlashCategory, SESSION_NAME, SessionStore},
};

/// Invalidate the session and redirect the client to the log-in page.
///
/// The "logged out" notice goes into the flash cookie since the session cookie is deleted.
pub async fn get_log_out(State(sessions): State<SessionStore>, jar: PrivateCookieJar) -> Response {
    let mut session = sessions.get(&jar, SESSION_NAME);
    if let Some(user_id) = session.user_id() {
        tracing::info!("user {user_id} logged out");
    }
    session.invalidate();
    let jar = sessions.save(jar, &session);

    let mut flash = sessions.get(&jar, FLASH_NAME);
    flash.add_flash("Berhasil logout", FlashCategory::Success);
    let jar = sessions.save(jar, &flash);

    (jar, Redirect::to(endpoints::LOG_IN)).into_response()
}
