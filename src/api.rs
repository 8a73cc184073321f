use crate::error::BookmarkError;
use crate::model::{self, Bookmark, BookmarkChanges, NewBookmark, ROOT_PARENT};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Body of `POST /bookmarks/import`. Either the raw export or an already
/// parsed list must be present; the html wins when both are.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    #[serde(default)]
    pub html_content: Option<String>,
    #[serde(default, alias = "Bookmarks")]
    pub bookmarks: Option<Vec<BookmarkInput>>,
}

/// A single bookmark as submitted by a client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub lan_url: Option<String>,
    #[serde(default)]
    pub is_folder: bool,
    #[serde(default)]
    pub parent_url: Option<String>,
    #[serde(default)]
    pub sort: Option<i32>,
}

impl BookmarkInput {
    pub fn validate(&self) -> Result<(), BookmarkError> {
        if self.title.trim().is_empty() {
            return Err(BookmarkError::Validation("title is required".into()));
        }
        if self.url.trim().is_empty() {
            return Err(BookmarkError::Validation("url is required".into()));
        }
        Ok(())
    }

    pub fn into_new_bookmark(self, user_id: i64) -> NewBookmark {
        NewBookmark {
            user_id,
            sort: self.sort.unwrap_or_else(|| model::default_sort(self.is_folder)),
            parent_url: self.parent_url.unwrap_or_else(|| ROOT_PARENT.to_string()),
            lan_url: self.lan_url.unwrap_or_default(),
            title: self.title,
            url: self.url,
            is_folder: self.is_folder,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub lan_url: Option<String>,
    #[serde(default)]
    pub parent_url: Option<String>,
    #[serde(default)]
    pub sort: Option<i32>,
}

impl UpdateRequest {
    pub fn into_changes(self) -> Result<BookmarkChanges, BookmarkError> {
        if self.title.trim().is_empty() {
            return Err(BookmarkError::Validation("title is required".into()));
        }
        if self.url.trim().is_empty() {
            return Err(BookmarkError::Validation("url is required".into()));
        }
        Ok(BookmarkChanges {
            title: Some(self.title),
            url: Some(self.url),
            lan_url: self.lan_url,
            parent_url: self.parent_url,
            sort: self.sort,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub count: usize,
    pub list: Vec<Bookmark>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub count: usize,
    pub list: Vec<T>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: u64,
}
