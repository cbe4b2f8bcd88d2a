//! This file defines the routes for displaying the log-in page and handling log-in requests.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::PrivateCookieJar;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error, endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, ERROR_TEXT_STYLE, Input, LINK_STYLE, base, flash_messages,
        log_in_register,
    },
    session::{FLASH_NAME, FlashCategory, SESSION_NAME, SessionStore},
    user::{User, get_user_by_email},
    validation::{FieldRules, Locale, Rule, Validate, ValidationErrors, Validator},
};

/// The credentials submitted by the log-in form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogInForm {
    pub email: String,
    pub password: String,
}

impl Validate for LogInForm {
    const RULES: &'static [FieldRules] = &[
        FieldRules {
            field: "email",
            label: Some("Email"),
            rules: &[Rule::Required],
        },
        FieldRules {
            field: "password",
            label: Some("Password"),
            rules: &[Rule::Required, Rule::MinLength(6)],
        },
    ];

    fn field_value(&self, field: &str) -> Option<&str> {
        match field {
            "email" => Some(&self.email),
            "password" => Some(&self.password),
            _ => None,
        }
    }
}

pub(crate) const ACCOUNT_NOT_FOUND_MESSAGE: &str = "Akun tidak ditemukan";
pub(crate) const WRONG_PASSWORD_MESSAGE: &str = "Password anda salah";

struct LogInView<'a> {
    form: &'a LogInForm,
    flashes: &'a [(FlashCategory, String)],
    errors: Option<&'a ValidationErrors>,
    error_message: Option<&'a str>,
}

fn log_in_page(view: &LogInView<'_>) -> Markup {
    let errors = view.errors;

    let form = html! {
        form method="post" action=(endpoints::LOG_IN) class="space-y-4 md:space-y-6"
        {
            (Input::text("email", "Email", &view.form.email).with_type("email").render(errors))
            // The password is never sent back to the client.
            (Input::text("password", "Password", "").with_type("password").render(errors))

            @if let Some(error_message) = view.error_message
            {
                p class=(ERROR_TEXT_STYLE) { (error_message) }
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Login" }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Belum punya akun? "
                a href=(endpoints::REGISTER) class=(LINK_STYLE) { "Daftar di sini" }
            }
        }
    };

    base(
        "Login",
        &log_in_register("Masuk ke akun anda", &flash_messages(view.flashes), &form),
    )
}

/// The state needed to log in.
#[derive(Debug, Clone)]
pub struct LogInState {
    pub sessions: SessionStore,
    pub locale: Locale,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LogInState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            sessions: state.sessions.clone(),
            locale: state.locale,
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the log-in page, showing the notices queued for the log-in page.
///
/// The flash cookie is only rewritten when it held notices.
fn render(
    sessions: &SessionStore,
    jar: PrivateCookieJar,
    form: &LogInForm,
    errors: Option<&ValidationErrors>,
    error_message: Option<&str>,
) -> Response {
    let mut flash_session = sessions.get(&jar, FLASH_NAME);
    let flashes = flash_session.take_flashes();

    let page = log_in_page(&LogInView {
        form,
        flashes: &flashes,
        errors,
        error_message,
    });

    if flashes.is_empty() {
        page.into_response()
    } else {
        (sessions.save(jar, &flash_session), page).into_response()
    }
}

/// Display the log-in page.
pub async fn get_log_in_page(State(state): State<LogInState>, jar: PrivateCookieJar) -> Response {
    render(&state.sessions, jar, &LogInForm::default(), None, None)
}

fn find_user(state: &LogInState, form: &LogInForm) -> Result<Result<User, ValidationErrors>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    if let Some(errors) = Validator::new(&connection)
        .with_locale(state.locale)
        .validate(form)?
    {
        return Ok(Err(errors));
    }

    get_user_by_email(form.email.trim(), &connection).map(Ok)
}

/// Handler for log-in requests via the POST method.
///
/// On a successful log-in request, the session is marked as authenticated, a welcome notice is
/// queued and the client is redirected to the home page.
/// Otherwise, the form is returned with an error message explaining the problem.
pub async fn post_log_in(
    State(state): State<LogInState>,
    jar: PrivateCookieJar,
    Form(form): Form<LogInForm>,
) -> Response {
    let user = match find_user(&state, &form) {
        Ok(Ok(user)) => user,
        Ok(Err(errors)) => return render(&state.sessions, jar, &form, Some(&errors), None),
        Err(Error::NotFound) => {
            return render(
                &state.sessions,
                jar,
                &form,
                None,
                Some(ACCOUNT_NOT_FOUND_MESSAGE),
            );
        }
        Err(error) => {
            tracing::error!("could not look up user for log-in: {error}");
            let message = format!("Gagal login, {error}");
            return render(&state.sessions, jar, &form, None, Some(&message));
        }
    };

    match user.password_hash.verify(&form.password) {
        Ok(true) => {}
        Ok(false) => {
            return render(&state.sessions, jar, &form, None, Some(WRONG_PASSWORD_MESSAGE));
        }
        Err(error) => {
            tracing::error!("could not verify password for user {}: {error}", user.id);
            let message = format!("Gagal login, {error}");
            return render(&state.sessions, jar, &form, None, Some(&message));
        }
    }

    let mut session = state.sessions.get(&jar, SESSION_NAME);
    session.log_in(user.id);
    session.add_flash(format!("Selamat datang {}", user.name), FlashCategory::Success);
    let jar = state.sessions.save(jar, &session);

    tracing::info!("user {} logged in", user.id);

    (jar, Redirect::to(endpoints::HOME)).into_response()
}

#[cfg(test)]
mod tests {
    use axum_test::TestServer;
    use scraper::Selector;

    use crate::{
        AppState, build_router, endpoints,
        session::{FLASH_NAME, FlashCategory, SESSION_NAME, Session},
        test_utils::{
            assert_form_error_message, assert_form_input, assert_form_submit_button,
            assert_redirect, assert_valid_html, get_test_state, insert_test_user, must_get_form,
            parse_html_text, read_session, session_cookie_with,
        },
    };

    use super::{ACCOUNT_NOT_FOUND_MESSAGE, LogInForm, WRONG_PASSWORD_MESSAGE};

    fn get_server(state: &AppState) -> TestServer {
        TestServer::try_new(build_router(state.clone())).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn log_in_page_displays_form() {
        let state = get_test_state();
        let server = get_server(&state);

        let response = server.get(endpoints::LOG_IN).await;

        response.assert_status_ok();
        let html = parse_html_text(&response.text());
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_eq!(form.value().attr("method"), Some("post"));
        assert_eq!(form.value().attr("action"), Some(endpoints::LOG_IN));
        assert_form_input(&form, "email", "email");
        assert_form_input(&form, "password", "password");
        assert_form_submit_button(&form);
    }

    #[tokio::test]
    async fn log_in_page_shows_flash_notices() {
        let state = get_test_state();
        let server = get_server(&state);
        let mut flash = Session::new(FLASH_NAME);
        flash.add_flash("Berhasil logout", FlashCategory::Success);

        let response = server
            .get(endpoints::LOG_IN)
            .add_cookie(session_cookie_with(&state, &flash))
            .await;

        response.assert_status_ok();
        let html = parse_html_text(&response.text());
        let alert = html
            .select(&Selector::parse("div[role=alert]").unwrap())
            .next()
            .expect("No alert found");
        assert_eq!(alert.text().collect::<String>().trim(), "Berhasil logout");

        let mut flash = read_session(&state, &response.cookie(FLASH_NAME), FLASH_NAME);
        assert!(flash.take_flashes().is_empty());
    }

    #[tokio::test]
    async fn log_in_succeeds_with_correct_credentials() {
        let state = get_test_state();
        let user = insert_test_user(&state, "budi@example.com", "rahasia");
        let server = get_server(&state);

        let response = server
            .post(endpoints::LOG_IN)
            .form(&LogInForm {
                email: "budi@example.com".to_owned(),
                password: "rahasia".to_owned(),
            })
            .await;

        assert_redirect(&response, endpoints::HOME);
        let mut session = read_session(&state, &response.cookie(SESSION_NAME), SESSION_NAME);
        assert!(session.is_authenticated());
        assert_eq!(session.user_id(), Some(user.id));
        assert_eq!(
            session.flashes(FlashCategory::Success),
            ["Selamat datang budi"]
        );
    }

    #[tokio::test]
    async fn log_in_fails_with_unknown_email() {
        let state = get_test_state();
        insert_test_user(&state, "budi@example.com", "rahasia");
        let server = get_server(&state);

        let response = server
            .post(endpoints::LOG_IN)
            .form(&LogInForm {
                email: "siti@example.com".to_owned(),
                password: "rahasia".to_owned(),
            })
            .await;

        response.assert_status_ok();
        let html = parse_html_text(&response.text());
        assert_form_error_message(&must_get_form(&html), ACCOUNT_NOT_FOUND_MESSAGE);
        assert!(response.maybe_cookie(SESSION_NAME).is_none());
    }

    #[tokio::test]
    async fn log_in_fails_with_wrong_password() {
        let state = get_test_state();
        insert_test_user(&state, "budi@example.com", "rahasia");
        let server = get_server(&state);

        let response = server
            .post(endpoints::LOG_IN)
            .form(&LogInForm {
                email: "budi@example.com".to_owned(),
                password: "salah123".to_owned(),
            })
            .await;

        response.assert_status_ok();
        let html = parse_html_text(&response.text());
        assert_form_error_message(&must_get_form(&html), WRONG_PASSWORD_MESSAGE);
        assert!(response.maybe_cookie(SESSION_NAME).is_none());
    }

    #[tokio::test]
    async fn log_in_validates_fields() {
        let state = get_test_state();
        let server = get_server(&state);

        let response = server
            .post(endpoints::LOG_IN)
            .form(&LogInForm {
                email: String::new(),
                password: "123".to_owned(),
            })
            .await;

        response.assert_status_ok();
        let html = parse_html_text(&response.text());
        let form = must_get_form(&html);
        assert_form_error_message(&form, "Email tidak boleh kosong");
        assert_form_error_message(&form, "Password minimal 6 karakter");
    }

    #[tokio::test]
    async fn logged_in_user_is_redirected_home() {
        let state = get_test_state();
        let user = insert_test_user(&state, "budi@example.com", "rahasia");
        let server = get_server(&state);
        let mut session = Session::new(SESSION_NAME);
        session.log_in(user.id);

        let response = server
            .get(endpoints::LOG_IN)
            .add_cookie(session_cookie_with(&state, &session))
            .await;

        assert_redirect(&response, endpoints::HOME);
    }
}
