//! Storage seam for the bookmark operations.
//!
//! The service layer only talks to [`BookmarkStore`]; [`crate::db::Database`]
//! is the libsql implementation used by the server.

use std::future::Future;

use anyhow::Result;

use crate::model::{Bookmark, BookmarkChanges, NewBookmark};

pub trait BookmarkStore: Send + Sync {
    /// Every record owned by `user_id`, ordered by sort then id.
    fn find_all_for_user(&self, user_id: i64) -> impl Future<Output = Result<Vec<Bookmark>>> + Send;

    /// Inserts the whole batch or nothing.
    fn bulk_insert(&self, bookmarks: Vec<NewBookmark>) -> impl Future<Output = Result<Vec<Bookmark>>> + Send;

    fn insert(&self, bookmark: NewBookmark) -> impl Future<Output = Result<Bookmark>> + Send;

    fn find_by_id(&self, id: i64) -> impl Future<Output = Result<Option<Bookmark>>> + Send;

    fn update_fields(&self, id: i64, changes: BookmarkChanges) -> impl Future<Output = Result<()>> + Send;

    /// Returns the number of rows removed. Ids owned by someone else are ignored.
    fn delete_by_ids_for_user(&self, user_id: i64, ids: &[i64]) -> impl Future<Output = Result<u64>> + Send;
}
