use std::fmt;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::api::ErrorResponse;

/// Raised by the store when a write would break the (user, parent, url)
/// uniqueness of the bookmarks table.
#[derive(Debug)]
pub struct DuplicateEntry {
    pub parent_url: String,
    pub url: String,
}

impl fmt::Display for DuplicateEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DuplicateEntry: {} already exists under {}", self.url, self.parent_url)
    }
}

impl std::error::Error for DuplicateEntry {}

#[derive(Debug, thiserror::Error)]
pub enum BookmarkError {
    #[error("failed to parse bookmark html: {0}")]
    Parse(String),
    #[error("invalid parameter format: {0}")]
    Validation(String),
    #[error("bookmark not found or not permitted")]
    NotFoundOrForbidden,
    #[error("a bookmark with this url already exists in that folder")]
    Conflict,
    #[error("failed to {op}")]
    Persistence {
        op: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("missing or invalid user identity")]
    Unauthenticated,
}

impl BookmarkError {
    /// Wraps a store failure. Unique-key violations surface as `Conflict`,
    /// everything else is logged with its full chain and hidden from callers.
    pub fn from_store(op: &'static str, source: anyhow::Error) -> Self {
        if source.downcast_ref::<DuplicateEntry>().is_some() {
            tracing::info!(error = %source, "rejected duplicate bookmark");
            return BookmarkError::Conflict;
        }
        tracing::error!(error = %crate::unpack_error(&*source), "failed to {}", op);
        BookmarkError::Persistence { op, source }
    }

    pub fn status(&self) -> StatusCode {
        use BookmarkError::*;
        match self {
            Parse(_) | Validation(_) => StatusCode::BAD_REQUEST,
            NotFoundOrForbidden => StatusCode::NOT_FOUND,
            Conflict => StatusCode::CONFLICT,
            Persistence { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Unauthenticated => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for BookmarkError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
