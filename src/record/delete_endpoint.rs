//! Defines the endpoint for deleting a financial record.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::PrivateCookieJar;
use rusqlite::Connection;

use crate::{
    AppState, Error, endpoints,
    record::{
        core::delete_record,
        edit_endpoint::{INVALID_ID_MESSAGE, NOT_FOUND_MESSAGE, RecordIdQuery},
    },
    session::{FlashCategory, SESSION_NAME, SessionStore},
    user::UserID,
};

/// The state needed to delete a record.
#[derive(Debug, Clone)]
pub struct DeleteRecordState {
    pub sessions: SessionStore,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteRecordState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            sessions: state.sessions.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Delete one of the user's records and redirect to the home page.
///
/// The outcome is reported with a flash message on the home page.
pub async fn delete_record_endpoint(
    State(state): State<DeleteRecordState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<RecordIdQuery>,
    jar: PrivateCookieJar,
) -> Response {
    let (message, category) = match query.record_id() {
        None => (INVALID_ID_MESSAGE.to_owned(), FlashCategory::Error),
        Some(id) => {
            let result = match state.db_connection.lock() {
                Ok(connection) => delete_record(id, user_id, &connection),
                Err(error) => {
                    tracing::error!("could not acquire database lock: {error}");
                    Err(Error::DatabaseLockError)
                }
            };

            match result {
                Ok(0) => (NOT_FOUND_MESSAGE.to_owned(), FlashCategory::Error),
                Ok(_) => (
                    "Berhasil menghapus data keuangan".to_owned(),
                    FlashCategory::Success,
                ),
                Err(error) => {
                    tracing::error!("could not delete record {id} for user {user_id}: {error}");
                    (
                        format!("Gagal menghapus data keuangan, {error}"),
                        FlashCategory::Error,
                    )
                }
            }
        }
    };

    let mut session = state.sessions.get(&jar, SESSION_NAME);
    session.add_flash(message, category);
    let jar = state.sessions.save(jar, &session);

    (jar, Redirect::to(endpoints::HOME)).into_response()
}
