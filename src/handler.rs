use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::request::Parts,
    response::IntoResponse,
};

use tracing::info;

use crate::api::ApiResponse;
use crate::db::Database;
use crate::error::BookmarkError;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
}

/// Header carrying the caller's user id, set by the gateway in front of us.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The user a request acts on behalf of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub i64);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = BookmarkError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
            .map(CurrentUser)
            .ok_or(BookmarkError::Unauthenticated)
    }
}

pub async fn healthcheck() -> impl IntoResponse {
    info!("got healthcheck request");
    Json(ApiResponse { data: "ok" })
}
