use axum::{
    Router,
    routing::{delete, get, post, put},
};

use super::handler;
use crate::handler::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handler::list_bookmarks))
        .route("/", post(handler::add_bookmark))
        .route("/", delete(handler::delete_bookmarks))
        .route("/import", post(handler::import_bookmarks))
        .route("/:id", put(handler::update_bookmark))
}
