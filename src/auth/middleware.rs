//! Middleware that only lets guests, or only logged in users, through to a route.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::PrivateCookieJar;

use crate::{
    endpoints,
    session::{SESSION_NAME, SessionStore},
};

/// Middleware function that redirects logged in users to the home page.
///
/// A missing or unreadable session counts as a guest.
pub async fn guest_only(
    State(sessions): State<SessionStore>,
    jar: PrivateCookieJar,
    request: Request,
    next: Next,
) -> Response {
    if sessions.get(&jar, SESSION_NAME).is_authenticated() {
        return Redirect::to(endpoints::HOME).into_response();
    }

    next.run(request).await
}

/// Middleware function that checks for an authenticated session.
///
/// The user ID is placed into the request and the request executed normally if the session is
/// authenticated, otherwise the client is redirected to the log-in page.
///
/// **Note**: Route handlers can use the function argument `Extension(user_id): Extension<UserID>`
/// to receive the user ID.
pub async fn auth_only(
    State(sessions): State<SessionStore>,
    jar: PrivateCookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(user_id) = sessions.get(&jar, SESSION_NAME).user_id() else {
        tracing::debug!("no authenticated session for {}", request.uri().path());
        return Redirect::to(endpoints::LOG_IN).into_response();
    };

    request.extensions_mut().insert(user_id);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use axum::{
        Extension, Router,
        middleware::from_fn_with_state,
        routing::get,
    };
    use axum_extra::extract::cookie::Cookie;
    use axum_test::TestServer;

    use crate::{
        AppState, endpoints,
        session::{FlashCategory, SESSION_NAME, Session},
        test_utils::{assert_redirect, get_test_state, session_cookie, session_cookie_with},
        user::UserID,
    };

    use super::{auth_only, guest_only};

    async fn whoami(Extension(user_id): Extension<UserID>) -> String {
        user_id.to_string()
    }

    fn get_server(state: &AppState) -> TestServer {
        let app = Router::new()
            .route("/guest", get(|| async { "hello guest" }))
            .route_layer(from_fn_with_state(state.clone(), guest_only))
            .merge(
                Router::new()
                    .route("/private", get(whoami))
                    .route_layer(from_fn_with_state(state.clone(), auth_only)),
            )
            .with_state(state.clone());

        TestServer::try_new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn guest_passes_guest_only() {
        let state = get_test_state();
        let server = get_server(&state);

        let response = server.get("/guest").await;

        response.assert_status_ok();
        response.assert_text("hello guest");
    }

    #[tokio::test]
    async fn logged_in_user_is_sent_home_from_guest_only() {
        let state = get_test_state();
        let server = get_server(&state);

        let response = server
            .get("/guest")
            .add_cookie(session_cookie(&state, UserID::new(1)))
            .await;

        assert_redirect(&response, endpoints::HOME);
    }

    #[tokio::test]
    async fn corrupt_session_passes_guest_only() {
        let state = get_test_state();
        let server = get_server(&state);

        let response = server
            .get("/guest")
            .add_cookie(Cookie::new(SESSION_NAME, "not encrypted"))
            .await;

        response.assert_status_ok();
    }

    #[tokio::test]
    async fn auth_only_inserts_user_id() {
        let state = get_test_state();
        let server = get_server(&state);

        let response = server
            .get("/private")
            .add_cookie(session_cookie(&state, UserID::new(42)))
            .await;

        response.assert_status_ok();
        response.assert_text("42");
    }

    #[tokio::test]
    async fn guest_is_sent_to_log_in_from_auth_only() {
        let state = get_test_state();
        let server = get_server(&state);

        let response = server.get("/private").await;

        assert_redirect(&response, endpoints::LOG_IN);
    }

    #[tokio::test]
    async fn unauthenticated_session_is_sent_to_log_in() {
        let state = get_test_state();
        let server = get_server(&state);
        let mut session = Session::new(SESSION_NAME);
        session.add_flash("Halo", FlashCategory::Success);

        let response = server
            .get("/private")
            .add_cookie(session_cookie_with(&state, &session))
            .await;

        assert_redirect(&response, endpoints::LOG_IN);
    }

    #[tokio::test]
    async fn corrupt_session_is_sent_to_log_in() {
        let state = get_test_state();
        let server = get_server(&state);

        let response = server
            .get("/private")
            .add_cookie(Cookie::new(SESSION_NAME, "not encrypted"))
            .await;

        assert_redirect(&response, endpoints::LOG_IN);
    }
}
