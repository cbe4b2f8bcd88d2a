use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::html::error_view;

pub async fn get_404_not_found() -> Response {
    get_404_not_found_response()
}

pub fn get_404_not_found_response() -> Response {
    let page = error_view(
        "Tidak Ditemukan",
        "404",
        "Halaman tidak ditemukan.",
        "Periksa kembali alamat yang anda tuju.",
    );

    (StatusCode::NOT_FOUND, Html(page.into_string())).into_response()
}
