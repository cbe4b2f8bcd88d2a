//! The endpoint URIs.
//!
//! Record endpoints take the record ID as the `id` query parameter, use [with_id] to add it.

/// The root route, shows the same page as [HOME].
pub const ROOT: &str = "/";
/// The registration page and form.
pub const REGISTER: &str = "/register";
/// The log-in page and form.
pub const LOG_IN: &str = "/login";
/// Ends the session and redirects to the log-in page.
pub const LOG_OUT: &str = "/logout";
/// The landing page for logged in users, shows a month of records.
pub const HOME: &str = "/home";
/// The page and form for adding a financial record.
pub const ADD_RECORD: &str = "/financial/add_financial_record";
/// The page and form for editing a financial record.
pub const EDIT_RECORD: &str = "/financial/edit_financial_record";
/// Deletes a financial record and redirects to the home page.
pub const DELETE_RECORD: &str = "/financial/delete_financial_record";
/// A printable report or CSV file of a month of records.
pub const DOWNLOAD_RECORD: &str = "/financial/download_financial_record";
/// The page and form for editing the user's profile.
pub const PROFILE: &str = "/profile";
/// Serves uploaded profile photos.
pub const USER_PHOTO: &str = "/user_photo";
/// Serves the static assets.
pub const STATIC: &str = "/static";

/// Add the record ID `id` to `endpoint` as the `id` query parameter.
pub fn with_id(endpoint: &str, id: i64) -> String {
    format!("{endpoint}?id={id}")
}

/// The URL of the stored profile photo `file_name`.
pub fn photo_url(file_name: &str) -> String {
    format!("{USER_PHOTO}/{file_name}")
}
