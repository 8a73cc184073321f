//! HTTP handlers for the bookmark API

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::service;
use crate::api::{
    ApiResponse, BookmarkInput, DeleteRequest, DeleteResponse, ImportRequest, ImportResponse, ListResponse,
    UpdateRequest,
};
use crate::error::BookmarkError;
use crate::handler::{AppState, CurrentUser};

fn success<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse { data })).into_response()
}

fn created<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(ApiResponse { data })).into_response()
}

fn bad_payload(rejection: JsonRejection) -> Response {
    BookmarkError::Validation(rejection.body_text()).into_response()
}

pub async fn import_bookmarks(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    payload: Result<Json<ImportRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_payload(rejection),
    };

    match service::import_bookmarks(state.db.as_ref(), user_id, request).await {
        Ok(list) => success(ImportResponse {
            count: list.len(),
            list,
        }),
        Err(e) => e.into_response(),
    }
}

pub async fn add_bookmark(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    payload: Result<Json<BookmarkInput>, JsonRejection>,
) -> Response {
    let Json(input) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_payload(rejection),
    };

    match service::add_bookmark(state.db.as_ref(), user_id, input).await {
        Ok(bookmark) => created(bookmark),
        Err(e) => e.into_response(),
    }
}

pub async fn list_bookmarks(State(state): State<AppState>, CurrentUser(user_id): CurrentUser) -> Response {
    match service::list_bookmark_tree(state.db.as_ref(), user_id).await {
        Ok(tree) => success(ListResponse {
            count: tree.len(),
            list: tree,
        }),
        Err(e) => e.into_response(),
    }
}

pub async fn update_bookmark(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
    payload: Result<Json<UpdateRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_payload(rejection),
    };
    let changes = match request.into_changes() {
        Ok(changes) => changes,
        Err(e) => return e.into_response(),
    };

    match service::update_bookmark(state.db.as_ref(), user_id, id, changes).await {
        Ok(bookmark) => success(bookmark),
        Err(e) => e.into_response(),
    }
}

pub async fn delete_bookmarks(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    payload: Result<Json<DeleteRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_payload(rejection),
    };

    match service::delete_bookmarks(state.db.as_ref(), user_id, &request.ids).await {
        Ok(deleted) => success(DeleteResponse { deleted }),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Method, Request, header},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::super::routes;
    use super::*;
    use crate::db::Database;
    use crate::handler::USER_ID_HEADER;

    async fn app() -> Router {
        let db = Arc::new(Database::open_local(":memory:").await.unwrap());
        Router::new()
            .nest("/bookmarks", routes())
            .with_state(AppState { db })
    }

    async fn call(app: &Router, method: Method, uri: &str, user: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(USER_ID_HEADER, user);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    const EXPORT: &str = r#"<DL><p>
<DT><H3>F</H3>
<DL><p>
<DT><A HREF="https://leaf.example">L</A>
</DL><p>
</DL><p>"#;

    #[tokio::test]
    async fn import_then_list_returns_tree() {
        let app = app().await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/bookmarks/import",
            Some("1"),
            Some(json!({ "htmlContent": EXPORT })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["count"], 2);
        assert!(body["data"]["list"][0]["id"].as_i64().unwrap() > 0);

        let (status, body) = call(&app, Method::GET, "/bookmarks", Some("1"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["count"], 1);
        let root = &body["data"]["list"][0];
        assert_eq!(root["title"], "F");
        assert_eq!(root["isFolder"], true);
        assert_eq!(root["children"][0]["title"], "L");
        assert_eq!(root["children"][0]["parentUrl"], "F");
        assert_eq!(root["children"][0]["children"], json!([]));

        let (_, body) = call(
            &app,
            Method::POST,
            "/bookmarks/import",
            Some("1"),
            Some(json!({ "htmlContent": EXPORT })),
        )
        .await;
        assert_eq!(body["data"]["count"], 0);
    }

    #[tokio::test]
    async fn requests_without_user_are_rejected() {
        let app = app().await;
        let (status, body) = call(&app, Method::GET, "/bookmarks", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "missing or invalid user identity");

        let (status, _) = call(&app, Method::GET, "/bookmarks", Some("abc"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_payload_is_a_parameter_error() {
        let app = app().await;
        let (status, body) = call(
            &app,
            Method::DELETE,
            "/bookmarks",
            Some("1"),
            Some(json!({ "ids": "nope" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("invalid parameter format"));
    }

    #[tokio::test]
    async fn unparseable_export_is_reported() {
        let app = app().await;
        let (status, body) = call(
            &app,
            Method::POST,
            "/bookmarks/import",
            Some("1"),
            Some(json!({ "htmlContent": "just text" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("no bookmark list"));
    }

    #[tokio::test]
    async fn add_update_delete_lifecycle() {
        let app = app().await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/bookmarks",
            Some("5"),
            Some(json!({ "title": "Router", "url": "http://router.example", "lanUrl": "http://192.168.0.1" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["data"]["id"].as_i64().unwrap();
        assert_eq!(body["data"]["sort"], 9999);

        let (status, _) = call(
            &app,
            Method::POST,
            "/bookmarks",
            Some("5"),
            Some(json!({ "title": "Again", "url": "http://router.example" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let uri = format!("/bookmarks/{id}");
        let (status, body) = call(
            &app,
            Method::PUT,
            &uri,
            Some("6"),
            Some(json!({ "title": "Mine now", "url": "http://router.example" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "bookmark not found or not permitted");

        let (status, body) = call(
            &app,
            Method::PUT,
            &uri,
            Some("5"),
            Some(json!({ "title": "Gateway", "url": "http://router.example", "sort": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["title"], "Gateway");
        assert_eq!(body["data"]["sort"], 1);
        assert_eq!(body["data"]["lanUrl"], "http://192.168.0.1");

        let (status, _) = call(&app, Method::PUT, &uri, Some("5"), Some(json!({ "title": "no url" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(
            &app,
            Method::DELETE,
            "/bookmarks",
            Some("6"),
            Some(json!({ "ids": [id] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["deleted"], 0);

        let (_, body) = call(
            &app,
            Method::DELETE,
            "/bookmarks",
            Some("5"),
            Some(json!({ "ids": [id, 12345] })),
        )
        .await;
        assert_eq!(body["data"]["deleted"], 1);

        let (_, body) = call(&app, Method::GET, "/bookmarks", Some("5"), None).await;
        assert_eq!(body["data"]["list"], json!([]));
    }
}
