//! The registration page for creating an account.

use std::sync::{Arc, Mutex, MutexGuard};

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
    AppState, Error, PasswordHash, endpoints,
    html::{BUTTON_PRIMARY_STYLE, ERROR_TEXT_STYLE, Input, LINK_STYLE, base, log_in_register},
    session::{FLASH_NAME, FlashCategory, SessionStore},
    user::{NewUser, create_user},
    validation::{FieldRules, Locale, Rule, Validate, ValidationErrors, Validator},
};

const EMAIL_RULES: &[Rule] = &[
    Rule::Required,
    Rule::Email,
    Rule::UniqueAcrossTable {
        table: "users",
        column: "email",
    },
];

/// The fields submitted by the registration form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl Validate for RegisterForm {
    const RULES: &'static [FieldRules] = &[
        FieldRules {
            field: "name",
            label: Some("Nama"),
            rules: &[Rule::Required],
        },
        FieldRules {
            field: "email",
            label: Some("Email"),
            rules: EMAIL_RULES,
        },
        FieldRules {
            field: "password",
            label: Some("Password"),
            rules: &[Rule::Required, Rule::MinLength(6)],
        },
        FieldRules {
            field: "confirm_password",
            label: Some("Konfirmasi Password"),
            rules: &[
                Rule::Required,
                Rule::MinLength(6),
                Rule::EqualsField("password"),
            ],
        },
    ];

    fn field_value(&self, field: &str) -> Option<&str> {
        match field {
            "name" => Some(&self.name),
            "email" => Some(&self.email),
            "password" => Some(&self.password),
            "confirm_password" => Some(&self.confirm_password),
            _ => None,
        }
    }
}

fn register_page(
    form: &RegisterForm,
    errors: Option<&ValidationErrors>,
    error_message: Option<&str>,
) -> Markup {
    let form = html! {
        form method="post" action=(endpoints::REGISTER) class="space-y-4 md:space-y-6"
        {
            (Input::text("name", "Nama", &form.name).render(errors))
            (Input::text("email", "Email", &form.email).with_type("email").render(errors))
            (Input::text("password", "Password", "").with_type("password").render(errors))
            (Input::text("confirm_password", "Konfirmasi Password", "").with_type("password").render(errors))

            @if let Some(error_message) = error_message
            {
                p class=(ERROR_TEXT_STYLE) { (error_message) }
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Daftar" }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Sudah punya akun? "
                a href=(endpoints::LOG_IN) class=(LINK_STYLE) { "Login di sini" }
            }
        }
    };

    base("Registrasi", &log_in_register("Buat akun baru", &html! {}, &form))
}

/// Display the registration page.
pub async fn get_register_page() -> Response {
    register_page(&RegisterForm::default(), None, None).into_response()
}

/// The state needed to register a user.
#[derive(Debug, Clone)]
pub struct RegisterState {
    pub sessions: SessionStore,
    pub locale: Locale,
    /// The bcrypt cost used when hashing new passwords.
    pub password_cost: u32,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RegisterState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            sessions: state.sessions.clone(),
            locale: state.locale,
            password_cost: state.password_cost,
            db_connection: state.db_connection.clone(),
        }
    }
}

enum Registration {
    Created,
    Invalid(ValidationErrors),
}

fn lock(state: &RegisterState) -> Result<MutexGuard<'_, Connection>, Error> {
    state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })
}

fn register(state: &RegisterState, form: &RegisterForm) -> Result<Registration, Error> {
    if let Some(errors) = Validator::new(&*lock(state)?)
        .with_locale(state.locale)
        .validate(form)?
    {
        return Ok(Registration::Invalid(errors));
    }

    // The lock is not held while hashing.
    let new_user = NewUser {
        name: form.name.trim().to_owned(),
        email: form.email.trim().to_owned(),
        password_hash: PasswordHash::new(&form.password, state.password_cost)?,
    };

    insert_user(state, &new_user)
}

/// Store `new_user`, reporting a taken email as an error on the email field.
///
/// The email can be taken by another request after the uniqueness check in [register].
fn insert_user(state: &RegisterState, new_user: &NewUser) -> Result<Registration, Error> {
    match create_user(new_user, &*lock(state)?) {
        Ok(user) => {
            tracing::info!("registered user {}", user.id);
            Ok(Registration::Created)
        }
        Err(Error::DuplicateEmail) => {
            let mut errors = ValidationErrors::default();
            errors.insert(
                "email",
                "Email",
                state.locale.message(&EMAIL_RULES[2], "Email", ""),
            );
            Ok(Registration::Invalid(errors))
        }
        Err(error) => Err(error),
    }
}

/// Handler for registration requests via the POST method.
///
/// On success a notice is queued for the log-in page and the client is redirected there.
/// Otherwise, the form is returned with an error message for each invalid field.
pub async fn register_user(
    State(state): State<RegisterState>,
    jar: PrivateCookieJar,
    Form(form): Form<RegisterForm>,
) -> Response {
    match register(&state, &form) {
        Ok(Registration::Created) => {
            let mut flash = state.sessions.get(&jar, FLASH_NAME);
            flash.add_flash(
                "Registrasi berhasil, silahkan login untuk melanjutkan",
                FlashCategory::Success,
            );
            let jar = state.sessions.save(jar, &flash);

            (jar, Redirect::to(endpoints::LOG_IN)).into_response()
        }
        Ok(Registration::Invalid(errors)) => {
            register_page(&form, Some(&errors), None).into_response()
        }
        Err(error) => {
            tracing::error!("could not register user: {error}");
            let message = format!("Registrasi gagal, {error}");
            register_page(&form, None, Some(&message)).into_response()
        }
    }
}
