//! The profile page where users change their name, email, password and photo.

mod photo;

use std::{
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard},
};

use axum::{
    Extension,
    extract::{FromRef, Multipart, State, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::PrivateCookieJar;
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error, PasswordHash, endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, ERROR_TEXT_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE,
        FORM_TEXT_INPUT_STYLE, Input, base, flash_messages,
    },
    navigation::NavBar,
    session::{FlashCategory, SESSION_NAME, SessionStore},
    user::{ProfileUpdate, UserID, get_user_by_id, update_profile},
    validation::{FieldRules, Locale, Rule, Validate, ValidationErrors, Validator},
};

pub use photo::MAX_PHOTO_SIZE;
use photo::{ALLOWED_EXTENSIONS, PhotoUpload, remove_photo, store_photo, validate_upload};

/// The text fields of the profile form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileForm {
    pub name: String,
    pub email: String,
    /// A new password, or empty to keep the current one.
    pub password: String,
}

impl Validate for ProfileForm {
    const RULES: &'static [FieldRules] = &[
        FieldRules {
            field: "name",
            label: Some("Nama"),
            rules: &[Rule::Required],
        },
        FieldRules {
            field: "email",
            label: Some("Email"),
            rules: &[Rule::Required, Rule::Email],
        },
        FieldRules {
            field: "password",
            label: Some("Password"),
            rules: &[Rule::Optional, Rule::MinLength(6)],
        },
    ];

    fn field_value(&self, field: &str) -> Option<&str> {
        match field {
            "name" => Some(&self.name),
            "email" => Some(&self.email),
            "password" => Some(&self.password),
            _ => None,
        }
    }
}

/// The state needed for the profile page.
#[derive(Debug, Clone)]
pub struct ProfileState {
    pub sessions: SessionStore,
    pub locale: Locale,
    /// The bcrypt cost used when hashing new passwords.
    pub password_cost: u32,
    /// The directory that profile photos are written to.
    pub photo_dir: PathBuf,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ProfileState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            sessions: state.sessions.clone(),
            locale: state.locale,
            password_cost: state.password_cost,
            photo_dir: state.photo_dir.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

struct ProfileView<'a> {
    photo: Option<&'a str>,
    form: &'a ProfileForm,
    flashes: &'a [(FlashCategory, String)],
    errors: Option<&'a ValidationErrors>,
    error_message: Option<&'a str>,
}

fn profile_page(view: &ProfileView<'_>) -> Markup {
    let form = view.form;
    let errors = view.errors;
    let accept = ALLOWED_EXTENSIONS.map(|extension| format!(".{extension}")).join(",");

    let content = html! {
        (NavBar::new(endpoints::PROFILE).into_html())

        div class=(FORM_CONTAINER_STYLE)
        {
            div class="w-full" { (flash_messages(view.flashes)) }

            h1 class="text-xl font-bold mb-4" { "Profile" }

            @if let Some(photo) = view.photo {
                img
                    src=(endpoints::photo_url(photo))
                    alt="Foto profil"
                    id="profile-photo"
                    class="w-32 h-32 rounded-full object-cover mb-4";
            }

            @if let Some(error_message) = view.error_message
            {
                p class=(ERROR_TEXT_STYLE) { (error_message) }
            }

            form
                method="post"
                action=(endpoints::PROFILE)
                enctype="multipart/form-data"
                class="w-full space-y-4 md:space-y-6"
            {
                (Input::text("name", "Nama", &form.name).render(errors))
                (Input::text("email", "Email", &form.email).with_type("email").render(errors))
                (Input::text("password", "Password baru", "").with_type("password").optional().render(errors))

                div
                {
                    label for="photo" class=(FORM_LABEL_STYLE) { "Foto" }
                    input type="file" name="photo" id="photo" accept=(accept) class=(FORM_TEXT_INPUT_STYLE);
                }

                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Simpan" }
            }
        }
    };

    base("Profile", &content)
}

fn lock(state: &ProfileState) -> Result<MutexGuard<'_, Connection>, Error> {
    state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })
}

/// Display the logged in user's profile.
///
/// Pending flash messages are shown once and then cleared from the session.
pub async fn get_profile_page(
    State(state): State<ProfileState>,
    Extension(user_id): Extension<UserID>,
    jar: PrivateCookieJar,
) -> Response {
    let user = lock(&state).and_then(|connection| get_user_by_id(user_id, &connection));

    let mut session = state.sessions.get(&jar, SESSION_NAME);
    let flashes = session.take_flashes();

    let page = match &user {
        Ok(user) => profile_page(&ProfileView {
            photo: user.photo.as_deref(),
            form: &ProfileForm {
                name: user.name.clone(),
                email: user.email.clone(),
                password: String::new(),
            },
            flashes: &flashes,
            errors: None,
            error_message: None,
        }),
        Err(error) => {
            tracing::error!("could not get user {user_id}: {error}");
            profile_page(&ProfileView {
                photo: None,
                form: &ProfileForm::default(),
                flashes: &flashes,
                errors: None,
                error_message: Some(&format!("User tidak ditemukan, {error}")),
            })
        }
    };

    if flashes.is_empty() {
        page.into_response()
    } else {
        (state.sessions.save(jar, &session), page).into_response()
    }
}

#[derive(Debug, Default)]
struct ProfileSubmission {
    form: ProfileForm,
    photo: Option<PhotoUpload>,
}

async fn read_submission(multipart: &mut Multipart) -> Result<ProfileSubmission, MultipartError> {
    let mut submission = ProfileSubmission::default();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        match name.as_str() {
            "name" => submission.form.name = field.text().await?,
            "email" => submission.form.email = field.text().await?,
            "password" => submission.form.password = field.text().await?,
            "photo" => {
                let file_name = field.file_name().unwrap_or_default().to_owned();
                let bytes = field.bytes().await?;

                // Browsers send an unnamed, empty part when no file was chosen.
                if !file_name.is_empty() {
                    submission.photo = Some(PhotoUpload { file_name, bytes });
                }
            }
            _ => tracing::debug!("ignoring unexpected profile form field {name}"),
        }
    }

    Ok(submission)
}

/// Why a profile update did not go through.
enum Rejection {
    Invalid(ValidationErrors),
    Message(StatusCode, String),
}

impl From<Error> for Rejection {
    fn from(error: Error) -> Self {
        Rejection::Message(
            StatusCode::OK,
            format!("Gagal mengubah data profile, {error}"),
        )
    }
}

fn render_rejection(
    state: &ProfileState,
    user_id: UserID,
    form: &ProfileForm,
    rejection: Rejection,
) -> Response {
    let photo = lock(state)
        .and_then(|connection| get_user_by_id(user_id, &connection))
        .map(|user| user.photo)
        .unwrap_or_else(|error| {
            tracing::error!("could not get user {user_id}: {error}");
            None
        });

    let (status, errors, message) = match rejection {
        Rejection::Invalid(errors) => (StatusCode::OK, Some(errors), None),
        Rejection::Message(status, message) => (status, None, Some(message)),
    };

    let page = profile_page(&ProfileView {
        photo: photo.as_deref(),
        form,
        flashes: &[],
        errors: errors.as_ref(),
        error_message: message.as_deref(),
    });

    (status, page).into_response()
}

/// Apply the submitted changes, replacing the stored photo when a new one was uploaded.
///
/// The new photo is written and checked before the user row is updated, and the old photo is
/// only deleted once the row points at the new one.
async fn apply_update(
    state: &ProfileState,
    user_id: UserID,
    submission: &ProfileSubmission,
) -> Result<(), Rejection> {
    let form = &submission.form;

    if let Some(errors) = Validator::new(&*lock(state)?)
        .with_locale(state.locale)
        .validate(form)?
    {
        return Err(Rejection::Invalid(errors));
    }

    let extension = match &submission.photo {
        Some(upload) => Some(validate_upload(upload).map_err(|error| {
            Rejection::Message(StatusCode::BAD_REQUEST, error.message().to_owned())
        })?),
        None => None,
    };

    let password_hash = match form.password.as_str() {
        "" => None,
        password => Some(PasswordHash::new(password, state.password_cost)?),
    };

    let new_photo = match (&submission.photo, extension) {
        (Some(upload), Some(extension)) => {
            let file_name = store_photo(&state.photo_dir, user_id, extension, &upload.bytes)
                .await
                .map_err(|error| {
                    tracing::error!("could not store photo for user {user_id}: {error}");
                    Rejection::Message(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        format!("Gagal menyimpan foto baru, {error}"),
                    )
                })?;
            Some(file_name)
        }
        _ => None,
    };

    let update = ProfileUpdate {
        name: form.name.trim().to_owned(),
        email: form.email.trim().to_owned(),
        password_hash,
        photo: new_photo.clone(),
    };

    let result = lock(state).and_then(|connection| {
        let old_photo = get_user_by_id(user_id, &connection)?.photo;
        update_profile(user_id, &update, &connection)?;
        Ok(old_photo)
    });

    let old_photo = match result {
        Ok(old_photo) => old_photo,
        Err(error) => {
            if let Some(file_name) = &new_photo
                && let Err(remove_error) = remove_photo(&state.photo_dir, file_name).await
            {
                tracing::warn!("could not remove unused photo {file_name}: {remove_error}");
            }

            return Err(match error {
                Error::DuplicateEmail => {
                    let mut errors = ValidationErrors::default();
                    errors.insert(
                        "email",
                        "Email",
                        state.locale.message(
                            &Rule::UniqueAcrossTable {
                                table: "users",
                                column: "email",
                            },
                            "Email",
                            "",
                        ),
                    );
                    Rejection::Invalid(errors)
                }
                error => {
                    tracing::error!("could not update profile of user {user_id}: {error}");
                    error.into()
                }
            });
        }
    };

    if let (Some(_), Some(old_photo)) = (&new_photo, old_photo)
        && let Err(error) = remove_photo(&state.photo_dir, &old_photo).await
    {
        tracing::warn!("could not remove old photo {old_photo} of user {user_id}: {error}");
    }

    Ok(())
}

/// Handler for profile updates via a multipart POST.
///
/// On success a notice is queued and the client is redirected back to the profile page.
/// Otherwise, the form is shown again with the problem.
pub async fn update_profile_endpoint(
    State(state): State<ProfileState>,
    Extension(user_id): Extension<UserID>,
    jar: PrivateCookieJar,
    mut multipart: Multipart,
) -> Response {
    let submission = match read_submission(&mut multipart).await {
        Ok(submission) => submission,
        Err(error) => {
            tracing::warn!("could not read profile form of user {user_id}: {error}");
            let status = error.status();
            let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
                photo::UploadError::TooLarge.message().to_owned()
            } else {
                format!("Gagal mengubah data profile, {error}")
            };

            return render_rejection(
                &state,
                user_id,
                &ProfileForm::default(),
                Rejection::Message(status, message),
            );
        }
    };

    if let Err(rejection) = apply_update(&state, user_id, &submission).await {
        return render_rejection(&state, user_id, &submission.form, rejection);
    }

    tracing::info!("user {user_id} updated their profile");

    let mut session = state.sessions.get(&jar, SESSION_NAME);
    session.add_flash("Berhasil mengubah data profile", FlashCategory::Success);
    let jar = state.sessions.save(jar, &session);

    (jar, Redirect::to(endpoints::PROFILE)).into_response()
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::{
        TestServer,
        multipart::{MultipartForm, Part},
    };
    use scraper::Selector;
    use tempfile::TempDir;

    use crate::{
        AppState, build_router, endpoints,
        session::{FlashCategory, SESSION_NAME, Session},
        test_utils::{
            assert_form_error_message, assert_redirect, assert_valid_html, get_test_state,
            insert_test_user, must_get_form, parse_html_text, read_session, session_cookie,
            session_cookie_with,
        },
        user::{User, get_user_by_id},
    };

    use super::MAX_PHOTO_SIZE;

    struct Fixture {
        state: AppState,
        server: TestServer,
        user: User,
        // Keeps the photo directory alive for the test.
        photo_dir: TempDir,
    }

    fn fixture() -> Fixture {
        let photo_dir = tempfile::tempdir().unwrap();
        let state = AppState {
            photo_dir: photo_dir.path().to_owned(),
            ..get_test_state()
        };
        let user = insert_test_user(&state, "budi@example.com", "rahasia");
        let server =
            TestServer::try_new(build_router(state.clone())).expect("Could not create test server.");

        Fixture {
            state,
            server,
            user,
            photo_dir,
        }
    }

    fn text_form(name: &str, email: &str, password: &str) -> MultipartForm {
        MultipartForm::new()
            .add_text("name", name.to_owned())
            .add_text("email", email.to_owned())
            .add_text("password", password.to_owned())
    }

    fn photo_part(file_name: &str, size: usize) -> Part {
        Part::bytes(vec![7u8; size])
            .file_name(file_name.to_owned())
            .mime_type("image/png")
    }

    #[track_caller]
    fn reload(fixture: &Fixture) -> User {
        get_user_by_id(fixture.user.id, &fixture.state.db_connection.lock().unwrap()).unwrap()
    }

    fn photo_files(fixture: &Fixture) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(fixture.photo_dir.path())
            .map(|entries| {
                entries
                    .filter_map(|entry| entry.ok())
                    .map(|entry| entry.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    #[tokio::test]
    async fn profile_page_shows_user() {
        let fixture = fixture();

        let response = fixture
            .server
            .get(endpoints::PROFILE)
            .add_cookie(session_cookie(&fixture.state, fixture.user.id))
            .await;

        response.assert_status_ok();
        let html = parse_html_text(&response.text());
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_eq!(form.value().attr("enctype"), Some("multipart/form-data"));
        let name = form
            .select(&Selector::parse("input[name=name]").unwrap())
            .next()
            .unwrap();
        assert_eq!(name.value().attr("value"), Some("budi"));
    }

    #[tokio::test]
    async fn profile_page_shows_flash_once() {
        let fixture = fixture();
        let mut session = Session::new(SESSION_NAME);
        session.log_in(fixture.user.id);
        session.add_flash("Berhasil mengubah data profile", FlashCategory::Success);

        let response = fixture
            .server
            .get(endpoints::PROFILE)
            .add_cookie(session_cookie_with(&fixture.state, &session))
            .await;

        response.assert_status_ok();
        assert!(response.text().contains("Berhasil mengubah data profile"));
        let mut session = read_session(&fixture.state, &response.cookie(SESSION_NAME), SESSION_NAME);
        assert!(session.take_flashes().is_empty());
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn updates_name_email_and_password() {
        let fixture = fixture();

        let response = fixture
            .server
            .post(endpoints::PROFILE)
            .add_cookie(session_cookie(&fixture.state, fixture.user.id))
            .multipart(text_form("Budi Santoso", "budi.s@example.com", "rahasia baru"))
            .await;

        assert_redirect(&response, endpoints::PROFILE);
        let user = reload(&fixture);
        assert_eq!(user.name, "Budi Santoso");
        assert_eq!(user.email, "budi.s@example.com");
        assert!(user.password_hash.verify("rahasia baru").unwrap());
        let mut session =
            read_session(&fixture.state, &response.cookie(SESSION_NAME), SESSION_NAME);
        assert_eq!(
            session.flashes(FlashCategory::Success),
            ["Berhasil mengubah data profile"]
        );
    }

    #[tokio::test]
    async fn empty_password_keeps_current_password() {
        let fixture = fixture();

        let response = fixture
            .server
            .post(endpoints::PROFILE)
            .add_cookie(session_cookie(&fixture.state, fixture.user.id))
            .multipart(text_form("Budi", "budi@example.com", ""))
            .await;

        assert_redirect(&response, endpoints::PROFILE);
        assert!(reload(&fixture).password_hash.verify("rahasia").unwrap());
    }

    #[tokio::test]
    async fn short_password_is_rejected() {
        let fixture = fixture();

        let response = fixture
            .server
            .post(endpoints::PROFILE)
            .add_cookie(session_cookie(&fixture.state, fixture.user.id))
            .multipart(text_form("Budi", "budi@example.com", "123"))
            .await;

        response.assert_status_ok();
        let html = parse_html_text(&response.text());
        assert_form_error_message(&must_get_form(&html), "Password minimal 6 karakter");
        assert!(reload(&fixture).password_hash.verify("rahasia").unwrap());
    }

    #[tokio::test]
    async fn email_of_another_user_is_rejected() {
        let fixture = fixture();
        insert_test_user(&fixture.state, "siti@example.com", "rahasia");

        let response = fixture
            .server
            .post(endpoints::PROFILE)
            .add_cookie(session_cookie(&fixture.state, fixture.user.id))
            .multipart(text_form("Budi", "siti@example.com", ""))
            .await;

        response.assert_status_ok();
        let html = parse_html_text(&response.text());
        assert_form_error_message(&must_get_form(&html), "Email sudah digunakan");
        assert_eq!(reload(&fixture).email, "budi@example.com");
    }

    #[tokio::test]
    async fn new_photo_replaces_old_photo() {
        let fixture = fixture();
        let cookie = session_cookie(&fixture.state, fixture.user.id);

        fixture
            .server
            .post(endpoints::PROFILE)
            .add_cookie(cookie.clone())
            .multipart(text_form("Budi", "budi@example.com", "").add_part("photo", photo_part("a.png", 16)))
            .await;
        let first_photo = reload(&fixture).photo.expect("first photo was not saved");
        assert_eq!(photo_files(&fixture), [first_photo.clone()]);

        let response = fixture
            .server
            .post(endpoints::PROFILE)
            .add_cookie(cookie)
            .multipart(text_form("Budi", "budi@example.com", "").add_part("photo", photo_part("b.WEBP", 32)))
            .await;

        assert_redirect(&response, endpoints::PROFILE);
        let second_photo = reload(&fixture).photo.expect("second photo was not saved");
        assert_ne!(second_photo, first_photo);
        assert!(second_photo.ends_with(".webp"));
        assert_eq!(photo_files(&fixture), [second_photo.clone()]);
        let size = std::fs::metadata(fixture.photo_dir.path().join(&second_photo))
            .unwrap()
            .len();
        assert_eq!(size, 32);
    }

    #[tokio::test]
    async fn unsupported_photo_type_is_rejected_before_writing() {
        let fixture = fixture();

        let response = fixture
            .server
            .post(endpoints::PROFILE)
            .add_cookie(session_cookie(&fixture.state, fixture.user.id))
            .multipart(text_form("Budi Baru", "budi@example.com", "").add_part("photo", photo_part("a.gif", 16)))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(response.text().contains("File tidak didukung"));
        assert!(photo_files(&fixture).is_empty());
        assert_eq!(reload(&fixture).name, "budi");
    }

    #[tokio::test]
    async fn oversized_photo_is_rejected() {
        let fixture = fixture();

        let response = fixture
            .server
            .post(endpoints::PROFILE)
            .add_cookie(session_cookie(&fixture.state, fixture.user.id))
            .multipart(
                text_form("Budi", "budi@example.com", "")
                    .add_part("photo", photo_part("a.png", MAX_PHOTO_SIZE + 1)),
            )
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(response.text().contains("Ukuran file terlalu besar, maksimal 5MB"));
        assert!(photo_files(&fixture).is_empty());
        assert_eq!(reload(&fixture).photo, None);
    }

    #[tokio::test]
    async fn failed_update_keeps_old_photo_and_removes_new_file() {
        let fixture = fixture();
        let cookie = session_cookie(&fixture.state, fixture.user.id);
        fixture
            .server
            .post(endpoints::PROFILE)
            .add_cookie(cookie.clone())
            .multipart(text_form("Budi", "budi@example.com", "").add_part("photo", photo_part("a.png", 16)))
            .await;
        let first_photo = reload(&fixture).photo.unwrap();
        insert_test_user(&fixture.state, "siti@example.com", "rahasia");

        // Taking another user's email fails at the UNIQUE constraint, after the new photo is written.
        let response = fixture
            .server
            .post(endpoints::PROFILE)
            .add_cookie(cookie)
            .multipart(text_form("Budi", "siti@example.com", "").add_part("photo", photo_part("b.png", 16)))
            .await;

        response.assert_status_ok();
        assert_eq!(reload(&fixture).photo, Some(first_photo.clone()));
        assert_eq!(photo_files(&fixture), [first_photo]);
    }

    #[tokio::test]
    async fn profile_requires_log_in() {
        let fixture = fixture();

        let response = fixture.server.get(endpoints::PROFILE).await;

        assert_redirect(&response, endpoints::LOG_IN);
    }
}
