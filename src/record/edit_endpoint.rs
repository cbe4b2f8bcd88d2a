//! Defines the page and endpoint for editing a financial record.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::PrivateCookieJar;
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    database_id::RecordID,
    endpoints::{self, with_id},
    record::{
        core::{get_record, update_record},
        form::{RecordForm, RecordFormView, record_form_page},
    },
    session::{FlashCategory, SESSION_NAME, SessionStore},
    user::UserID,
    validation::{Locale, ValidationErrors, Validator},
};

/// The state needed to edit a record.
#[derive(Debug, Clone)]
pub struct EditRecordState {
    pub sessions: SessionStore,
    pub locale: Locale,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditRecordState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            sessions: state.sessions.clone(),
            locale: state.locale,
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The query string naming the record to act on.
#[derive(Debug, Default, Deserialize)]
pub struct RecordIdQuery {
    pub id: Option<String>,
}

impl RecordIdQuery {
    /// The record ID, or `None` if it is missing or not a number.
    pub fn record_id(&self) -> Option<RecordID> {
        self.id.as_deref()?.trim().parse().ok()
    }
}

pub(crate) const NOT_FOUND_MESSAGE: &str = "Data keuangan tidak ditemukan";
pub(crate) const INVALID_ID_MESSAGE: &str = "Gagal mengambil data keuangan";

const PAGE_TITLE: &str = "Ubah Data Keuangan";

fn render(
    status: StatusCode,
    id: Option<RecordID>,
    form: &RecordForm,
    errors: Option<&ValidationErrors>,
    error_message: Option<&str>,
) -> Response {
    let action = match id {
        Some(id) => with_id(endpoints::EDIT_RECORD, id),
        None => endpoints::EDIT_RECORD.to_owned(),
    };

    (
        status,
        record_form_page(&RecordFormView {
            title: PAGE_TITLE,
            active_endpoint: endpoints::EDIT_RECORD,
            action: &action,
            form,
            errors,
            error_message,
        }),
    )
        .into_response()
}

fn render_error(status: StatusCode, id: Option<RecordID>, message: &str) -> Response {
    render(status, id, &RecordForm::default(), None, Some(message))
}

/// Display the form for editing a record, filled with the record's current values.
pub async fn get_edit_record_page(
    State(state): State<EditRecordState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<RecordIdQuery>,
) -> Response {
    let Some(id) = query.record_id() else {
        return render_error(StatusCode::BAD_REQUEST, None, INVALID_ID_MESSAGE);
    };

    let record = match state.db_connection.lock() {
        Ok(connection) => get_record(id, user_id, &connection),
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match record {
        Ok(record) => render(
            StatusCode::OK,
            Some(id),
            &RecordForm::from_record(&record),
            None,
            None,
        ),
        Err(Error::NotFound) => render_error(StatusCode::NOT_FOUND, Some(id), NOT_FOUND_MESSAGE),
        Err(error) => {
            tracing::error!("could not get record {id} for user {user_id}: {error}");
            render_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                Some(id),
                &format!("{INVALID_ID_MESSAGE}, {error}"),
            )
        }
    }
}

/// Replace the fields of a record and redirect to the home page.
///
/// The form is shown again with an error for each invalid field.
pub async fn edit_record_endpoint(
    State(state): State<EditRecordState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<RecordIdQuery>,
    jar: PrivateCookieJar,
    Form(form): Form<RecordForm>,
) -> Response {
    let Some(id) = query.record_id() else {
        return render(StatusCode::BAD_REQUEST, None, &form, None, Some(INVALID_ID_MESSAGE));
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match Validator::new(&connection)
        .with_locale(state.locale)
        .validate(&form)
    {
        Ok(None) => {}
        Ok(Some(errors)) => return render(StatusCode::OK, Some(id), &form, Some(&errors), None),
        Err(error) => {
            tracing::error!("could not validate record form: {error}");
            return render(
                StatusCode::INTERNAL_SERVER_ERROR,
                Some(id),
                &form,
                None,
                Some("Gagal memeriksa data keuangan"),
            );
        }
    }

    let result = form
        .to_new_record(user_id)
        .and_then(|record| update_record(id, &record, &connection));
    drop(connection);

    match result {
        Ok(0) => {
            return render(StatusCode::NOT_FOUND, Some(id), &form, None, Some(NOT_FOUND_MESSAGE));
        }
        Ok(_) => {}
        Err(error) => {
            tracing::error!("could not update record {id} for user {user_id}: {error}");
            let message = format!("Gagal mengubah data keuangan, {error}");
            return render(
                StatusCode::INTERNAL_SERVER_ERROR,
                Some(id),
                &form,
                None,
                Some(&message),
            );
        }
    }

    let mut session = state.sessions.get(&jar, SESSION_NAME);
    session.add_flash("Berhasil mengubah data keuangan", FlashCategory::Success);
    let jar = state.sessions.save(jar, &session);

    (jar, Redirect::to(endpoints::HOME)).into_response()
}
