//! HTTP error handling and response mapping.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use tessera_core::PatternError;

use crate::view::escape;

#[derive(Debug, thiserror::Error)]
pub enum WebError {
    #[error("could not load prompt patterns: {0}")]
    Patterns(#[from] PatternError),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        tracing::error!("[http] {self}");
        let body = format!(
            "<!doctype html><title>Tessera error</title><h1>Server error</h1><pre>{}</pre>",
            escape(&self.to_string())
        );
        (StatusCode::INTERNAL_SERVER_ERROR, Html(body)).into_response()
    }
}
