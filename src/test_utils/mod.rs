#![allow(missing_docs)]

pub(crate) mod form;
pub(crate) mod html;
pub(crate) mod http;
pub(crate) mod state;

pub(crate) use form::{
    assert_form_error_message, assert_form_input, assert_form_submit_button, must_get_form,
};
pub(crate) use html::{assert_valid_html, parse_html_text};
pub(crate) use http::assert_redirect;
pub(crate) use state::{
    get_test_state, insert_test_user, read_session, session_cookie, session_cookie_with,
};
