//! Defines the page and endpoint for adding a financial record.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::PrivateCookieJar;
use rusqlite::Connection;

use crate::{
    AppState, Error, endpoints,
    record::{
        core::create_record,
        form::{RecordForm, RecordFormView, record_form_page},
    },
    session::{FlashCategory, SESSION_NAME, SessionStore},
    timezone::local_today,
    user::UserID,
    validation::{Locale, ValidationErrors, Validator},
};

/// The state needed to add a record.
#[derive(Debug, Clone)]
pub struct CreateRecordState {
    pub sessions: SessionStore,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Jakarta".
    pub local_timezone: String,
    pub locale: Locale,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateRecordState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            sessions: state.sessions.clone(),
            local_timezone: state.local_timezone.clone(),
            locale: state.locale,
            db_connection: state.db_connection.clone(),
        }
    }
}

const PAGE_TITLE: &str = "Tambah Data Keuangan";

fn render(
    form: &RecordForm,
    errors: Option<&ValidationErrors>,
    error_message: Option<&str>,
) -> Response {
    record_form_page(&RecordFormView {
        title: PAGE_TITLE,
        active_endpoint: endpoints::ADD_RECORD,
        action: endpoints::ADD_RECORD,
        form,
        errors,
        error_message,
    })
    .into_response()
}

/// Display the form for adding a record, with the date set to today.
pub async fn get_create_record_page(State(state): State<CreateRecordState>) -> Response {
    let date = match local_today(&state.local_timezone) {
        Some(today) => today.to_string(),
        None => {
            tracing::warn!("could not get today's date for timezone {}", state.local_timezone);
            String::new()
        }
    };

    render(
        &RecordForm {
            date,
            ..Default::default()
        },
        None,
        None,
    )
}

/// Add a record for the logged in user and redirect to the home page.
///
/// The form is shown again with an error for each invalid field.
pub async fn create_record_endpoint(
    State(state): State<CreateRecordState>,
    Extension(user_id): Extension<UserID>,
    jar: PrivateCookieJar,
    Form(form): Form<RecordForm>,
) -> Response {
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
        Ok(Some(errors)) => return render(&form, Some(&errors), None),
        Err(error) => {
            tracing::error!("could not validate record form: {error}");
            return render(&form, None, Some("Gagal memeriksa data keuangan"));
        }
    }

    let result = form
        .to_new_record(user_id)
        .and_then(|new_record| create_record(&new_record, &connection));
    drop(connection);

    if let Err(error) = result {
        tracing::error!("could not create record for user {user_id}: {error}");
        let message = format!("Gagal menambahkan data keuangan, {error}");
        return render(&form, None, Some(&message));
    }

    let mut session = state.sessions.get(&jar, SESSION_NAME);
    session.add_flash("Berhasil menambahkan data keuangan", FlashCategory::Success);
    let jar = state.sessions.save(jar, &session);

    (jar, Redirect::to(endpoints::HOME)).into_response()
}
