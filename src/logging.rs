//! Middleware for logging requests and responses.

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{
        HeaderMap, StatusCode,
        header::CONTENT_TYPE,
        request::Parts as RequestParts,
        response::Parts as ResponseParts,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};

/// The number of characters of a body logged at the `info` level.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// The largest request body, in bytes, that is buffered for logging.
const MAX_BUFFERED_REQUEST_BODY: usize = 2 * 1024 * 1024;

/// Form fields whose values never appear in the logs.
const REDACTED_FIELDS: [&str; 2] = ["password", "confirm_password"];

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If a body is longer than [LOG_BODY_LENGTH_LIMIT] characters, it is
/// truncated and the full body is logged at the `debug` level.
/// Password fields of URL encoded forms are redacted and multipart bodies, i.e. file uploads,
/// are passed through without being read.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let request = if has_content_type(request.headers(), "multipart/form-data") {
        let (parts, body) = request.into_parts();
        log_request(&parts, "<multipart body not logged>");
        Request::from_parts(parts, body)
    } else {
        let (parts, body) = request.into_parts();
        let bytes = match axum::body::to_bytes(body, MAX_BUFFERED_REQUEST_BODY).await {
            Ok(bytes) => bytes,
            Err(error) => {
                tracing::warn!("could not read request body for {}: {error}", parts.uri);
                return StatusCode::PAYLOAD_TOO_LARGE.into_response();
            }
        };

        let body_text = String::from_utf8_lossy(&bytes);
        if has_content_type(&parts.headers, "application/x-www-form-urlencoded") {
            log_request(&parts, &redact_form_fields(&body_text, &REDACTED_FIELDS));
        } else {
            log_request(&parts, &body_text);
        }

        Request::from_parts(parts, Body::from(bytes))
    };

    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::error!("could not read response body: {error}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    log_response(&parts, &bytes);

    Response::from_parts(parts, Body::from(bytes))
}

fn has_content_type(headers: &HeaderMap, mime: &str) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with(mime))
}

/// Replace the values of `fields` in a URL encoded form body with asterisks.
fn redact_form_fields(form_text: &str, fields: &[&str]) -> String {
    form_text
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((name, _)) if fields.contains(&name) => format!("{name}=********"),
            _ => pair.to_owned(),
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// The first [LOG_BODY_LENGTH_LIMIT] characters of `body`, or `None` if it is not longer.
fn truncate(body: &str) -> Option<&str> {
    body.char_indices()
        .nth(LOG_BODY_LENGTH_LIMIT)
        .map(|(end, _)| &body[..end])
}

fn log_request(parts: &RequestParts, body: &str) {
    match truncate(body) {
        Some(start) => {
            tracing::info!("Received request: {parts:#?}\nbody: {start}...");
            tracing::debug!("Full request body: {body:?}");
        }
        None => tracing::info!("Received request: {parts:#?}\nbody: {body:?}"),
    }
}

fn log_response(parts: &ResponseParts, bytes: &Bytes) {
    let body = String::from_utf8_lossy(bytes);

    match truncate(&body) {
        Some(start) => {
            tracing::info!("Sending response: {parts:#?}\nbody: {start}...");
            tracing::debug!("Full response body: {body:?}");
        }
        None => tracing::info!("Sending response: {parts:#?}\nbody: {body:?}"),
    }
}
