use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::Response;

use tessera_core::SessionId;

pub const SESSION_COOKIE: &str = "tessera_session";

/// The caller's session id, or a fresh one (`true`) when the cookie is absent or not a UUID.
pub(crate) fn session_from(headers: &HeaderMap) -> (SessionId, bool) {
    let existing = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| SessionId::parse(value));

    match existing {
        Some(id) => (id, false),
        None => (SessionId::generate(), true),
    }
}

pub(crate) fn attach(mut response: Response, id: SessionId, fresh: bool) -> Response {
    if fresh {
        let cookie = format!("{SESSION_COOKIE}={id}; HttpOnly; SameSite=Lax; Path=/");
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    response
}
