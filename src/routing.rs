//! Application router configuration with guest-only, auth-only and static route definitions.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::get,
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    auth::{
        auth_only, get_log_in_page, get_log_out, get_register_page, guest_only, post_log_in,
        register_user,
    },
    endpoints,
    home::get_home_page,
    not_found::get_404_not_found,
    profile::{MAX_PHOTO_SIZE, get_profile_page, update_profile_endpoint},
    record::{
        create_record_endpoint, delete_record_endpoint, download_records_endpoint,
        edit_record_endpoint, get_create_record_page, get_edit_record_page,
    },
};

/// Room for the text fields of the profile form on top of the largest photo.
const PROFILE_BODY_LIMIT: usize = MAX_PHOTO_SIZE + 1024 * 1024;

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let guest_routes = Router::new()
        .route(
            endpoints::REGISTER,
            get(get_register_page).post(register_user),
        )
        .route(endpoints::LOG_IN, get(get_log_in_page).post(post_log_in))
        .layer(middleware::from_fn_with_state(state.clone(), guest_only));

    let protected_routes = Router::new()
        .route(endpoints::ROOT, get(get_home_page))
        .route(endpoints::HOME, get(get_home_page))
        .route(
            endpoints::ADD_RECORD,
            get(get_create_record_page).post(create_record_endpoint),
        )
        .route(
            endpoints::EDIT_RECORD,
            get(get_edit_record_page).post(edit_record_endpoint),
        )
        .route(endpoints::DELETE_RECORD, get(delete_record_endpoint))
        .route(endpoints::DOWNLOAD_RECORD, get(download_records_endpoint))
        .route(
            endpoints::PROFILE,
            get(get_profile_page)
                .post(update_profile_endpoint)
                .layer(DefaultBodyLimit::max(PROFILE_BODY_LIMIT)),
        )
        .route(endpoints::LOG_OUT, get(get_log_out))
        .layer(middleware::from_fn_with_state(state.clone(), auth_only));

    guest_routes
        .merge(protected_routes)
        .nest_service(endpoints::USER_PHOTO, ServeDir::new(&state.photo_dir))
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;

    use crate::{
        AppState, build_router,
        endpoints::{self, photo_url},
        test_utils::{assert_redirect, get_test_state},
    };

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let server = TestServer::try_new(build_router(get_test_state()))
            .expect("Could not create test server.");

        let response = server.get("/does/not/exist").await;

        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn protected_routes_redirect_guests_to_log_in() {
        let server = TestServer::try_new(build_router(get_test_state()))
            .expect("Could not create test server.");

        for endpoint in [
            endpoints::ROOT,
            endpoints::HOME,
            endpoints::ADD_RECORD,
            endpoints::EDIT_RECORD,
            endpoints::DELETE_RECORD,
            endpoints::DOWNLOAD_RECORD,
            endpoints::PROFILE,
            endpoints::LOG_OUT,
        ] {
            let response = server.get(endpoint).await;

            assert_redirect(&response, endpoints::LOG_IN);
        }
    }

    #[tokio::test]
    async fn serves_user_photos_without_log_in() {
        let photo_dir = tempfile::tempdir().unwrap();
        std::fs::write(photo_dir.path().join("profile_1_1.png"), b"png bytes").unwrap();
        let state = AppState {
            photo_dir: photo_dir.path().to_owned(),
            ..get_test_state()
        };
        let server =
            TestServer::try_new(build_router(state)).expect("Could not create test server.");

        let response = server.get(&photo_url("profile_1_1.png")).await;

        response.assert_status_ok();
        assert_eq!(response.as_bytes().as_ref(), b"png bytes");
    }
}
