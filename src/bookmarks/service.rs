use crate::api::{BookmarkInput, ImportRequest};
use crate::error::BookmarkError;
use crate::model::{Bookmark, BookmarkChanges, BookmarkNode};
use crate::store::BookmarkStore;

use super::dedup::filter_against_store;
use super::parser::parse_bookmark_html;
use super::tree::build_tree;

/// Parses or accepts the submitted records, drops (parent, url) duplicates
/// and stores the rest in one batch. Returns what was actually inserted.
pub async fn import_bookmarks<S: BookmarkStore>(
    store: &S,
    user_id: i64,
    request: ImportRequest,
) -> Result<Vec<Bookmark>, BookmarkError> {
    let candidates = match (request.html_content, request.bookmarks) {
        (Some(html), _) if !html.trim().is_empty() => parse_bookmark_html(&html, user_id)?,
        (_, Some(inputs)) => {
            let mut candidates = Vec::with_capacity(inputs.len());
            for (idx, input) in inputs.into_iter().enumerate() {
                input.validate().map_err(|e| match e {
                    BookmarkError::Validation(reason) => {
                        BookmarkError::Validation(format!("bookmarks[{idx}]: {reason}"))
                    }
                    other => other,
                })?;
                candidates.push(input.into_new_bookmark(user_id));
            }
            candidates
        }
        _ => {
            return Err(BookmarkError::Validation(
                "either htmlContent or bookmarks is required".to_string(),
            ));
        }
    };
    let submitted = candidates.len();

    let unique = filter_against_store(store, user_id, candidates)
        .await
        .map_err(|e| BookmarkError::from_store("import bookmarks", e))?;
    if unique.is_empty() {
        tracing::info!(user_id, submitted, inserted = 0, "nothing new to import");
        return Ok(Vec::new());
    }

    let inserted = store
        .bulk_insert(unique)
        .await
        .map_err(|e| BookmarkError::from_store("import bookmarks", e))?;

    tracing::info!(user_id, submitted, inserted = inserted.len(), "imported bookmarks");
    Ok(inserted)
}

pub async fn add_bookmark<S: BookmarkStore>(
    store: &S,
    user_id: i64,
    input: BookmarkInput,
) -> Result<Bookmark, BookmarkError> {
    input.validate()?;
    let bookmark = store
        .insert(input.into_new_bookmark(user_id))
        .await
        .map_err(|e| BookmarkError::from_store("add bookmark", e))?;

    tracing::info!(user_id, id = bookmark.id, "added bookmark");
    Ok(bookmark)
}

pub async fn list_bookmark_tree<S: BookmarkStore>(
    store: &S,
    user_id: i64,
) -> Result<Vec<BookmarkNode>, BookmarkError> {
    let records = store
        .find_all_for_user(user_id)
        .await
        .map_err(|e| BookmarkError::from_store("get bookmark list", e))?;

    Ok(build_tree(records))
}

/// Only the owner may update; a missing record and someone else's record
/// produce the same error.
pub async fn update_bookmark<S: BookmarkStore>(
    store: &S,
    user_id: i64,
    id: i64,
    changes: BookmarkChanges,
) -> Result<Bookmark, BookmarkError> {
    find_owned(store, user_id, id).await?;

    store
        .update_fields(id, changes)
        .await
        .map_err(|e| BookmarkError::from_store("update bookmark", e))?;

    tracing::info!(user_id, id, "updated bookmark");
    find_owned(store, user_id, id).await
}

pub async fn delete_bookmarks<S: BookmarkStore>(
    store: &S,
    user_id: i64,
    ids: &[i64],
) -> Result<u64, BookmarkError> {
    let deleted = store
        .delete_by_ids_for_user(user_id, ids)
        .await
        .map_err(|e| BookmarkError::from_store("delete bookmarks", e))?;

    tracing::info!(user_id, requested = ids.len(), deleted, "deleted bookmarks");
    Ok(deleted)
}

async fn find_owned<S: BookmarkStore>(store: &S, user_id: i64, id: i64) -> Result<Bookmark, BookmarkError> {
    match store.find_by_id(id).await {
        Ok(Some(bookmark)) if bookmark.user_id == user_id => Ok(bookmark),
        Ok(_) => Err(BookmarkError::NotFoundOrForbidden),
        Err(e) => Err(BookmarkError::from_store("find bookmark", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewBookmark;
    use crate::store::memory::MemoryStore;

    const EXPORT: &str = r#"<!DOCTYPE NETSCAPE-Bookmark-file-1>
<TITLE>Bookmarks</TITLE>
<DL><p>
    <DT><H3>Dev</H3>
    <DL><p>
        <DT><A HREF="https://docs.rs">docs.rs</A>
        <DT><A HREF="https://crates.io">crates.io</A>
    </DL><p>
    <DT><A HREF="https://news.example">News</A>
</DL><p>"#;

    fn html_request(html: &str) -> ImportRequest {
        ImportRequest {
            html_content: Some(html.to_string()),
            bookmarks: None,
        }
    }

    #[tokio::test]
    async fn import_then_list_round_trips() {
        let store = MemoryStore::default();
        let inserted = import_bookmarks(&store, 1, html_request(EXPORT)).await.unwrap();
        assert_eq!(inserted.len(), 4);
        assert!(inserted.iter().all(|b| b.id > 0 && b.user_id == 1));

        let tree = list_bookmark_tree(&store, 1).await.unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].bookmark.title, "Dev");
        let children: Vec<&str> = tree[0].children.iter().map(|c| c.bookmark.title.as_str()).collect();
        assert_eq!(children, ["crates.io", "docs.rs"]);
        assert_eq!(tree[1].bookmark.title, "News");
    }

    #[tokio::test]
    async fn deeply_nested_import_lists_as_bounded_tree() {
        use crate::bookmarks::tree::MAX_TREE_DEPTH;

        let depth = 5_000;
        let mut html = String::from("<!DOCTYPE NETSCAPE-Bookmark-file-1>\n<DL><p>\n");
        for level in 0..depth {
            html.push_str(&format!("<DT><H3>f{level:05}</H3>\n<DL><p>\n"));
        }

        let store = MemoryStore::default();
        let inserted = import_bookmarks(&store, 1, html_request(&html)).await.unwrap();
        assert_eq!(inserted.len(), depth);

        let tree = list_bookmark_tree(&store, 1).await.unwrap();
        assert_eq!(tree.len(), depth.div_ceil(MAX_TREE_DEPTH));
        assert_eq!(tree[0].bookmark.title, "f00000");
        assert_eq!(tree[1].bookmark.title, format!("f{MAX_TREE_DEPTH:05}"));

        let json = serde_json::to_string(&tree).unwrap();
        assert!(json.contains("f04999"));
    }

    #[tokio::test]
    async fn reimporting_the_same_file_inserts_nothing() {
        let store = MemoryStore::default();
        import_bookmarks(&store, 1, html_request(EXPORT)).await.unwrap();
        let second = import_bookmarks(&store, 1, html_request(EXPORT)).await.unwrap();
        assert!(second.is_empty());
        assert_eq!(store.rows().len(), 4);

        // another user gets their own copy
        let other = import_bookmarks(&store, 2, html_request(EXPORT)).await.unwrap();
        assert_eq!(other.len(), 4);
    }

    #[tokio::test]
    async fn import_accepts_parsed_bookmarks() {
        let store = MemoryStore::default();
        let request = ImportRequest {
            html_content: None,
            bookmarks: Some(vec![
                BookmarkInput {
                    title: "Home".into(),
                    url: "Home".into(),
                    is_folder: true,
                    ..Default::default()
                },
                BookmarkInput {
                    title: "NAS".into(),
                    url: "http://nas.example".into(),
                    lan_url: Some("http://192.168.1.10".into()),
                    parent_url: Some("Home".into()),
                    ..Default::default()
                },
            ]),
        };

        let inserted = import_bookmarks(&store, 3, request).await.unwrap();
        assert_eq!(inserted.len(), 2);
        assert_eq!(inserted[1].lan_url, "http://192.168.1.10");
        assert_eq!(inserted[1].sort, 9999);
        assert_eq!(inserted[0].sort, 0);
        assert!(inserted.iter().all(|b| b.user_id == 3));
    }

    #[tokio::test]
    async fn import_requires_some_content() {
        let store = MemoryStore::default();
        let err = import_bookmarks(&store, 1, ImportRequest::default()).await.unwrap_err();
        assert!(matches!(err, BookmarkError::Validation(_)));

        let err = import_bookmarks(&store, 1, html_request("   ")).await.unwrap_err();
        assert!(matches!(err, BookmarkError::Validation(_)));
    }

    #[tokio::test]
    async fn import_surfaces_parse_errors() {
        let store = MemoryStore::default();
        let err = import_bookmarks(&store, 1, html_request("<p>not an export</p>"))
            .await
            .unwrap_err();
        assert!(matches!(err, BookmarkError::Parse(_)));
        assert!(store.rows().is_empty());
    }

    #[tokio::test]
    async fn failed_insert_reports_persistence_error() {
        let store = MemoryStore::failing();
        let err = import_bookmarks(&store, 1, html_request(EXPORT)).await.unwrap_err();
        assert!(matches!(err, BookmarkError::Persistence { .. }));
        assert_eq!(err.to_string(), "failed to import bookmarks");
    }

    #[tokio::test]
    async fn add_rejects_duplicates_in_same_folder() {
        let store = MemoryStore::default();
        let input = BookmarkInput {
            title: "Rust".into(),
            url: "https://rust-lang.org".into(),
            ..Default::default()
        };
        let first = add_bookmark(&store, 1, input.clone()).await.unwrap();
        assert_eq!(first.parent_url, "0");

        let err = add_bookmark(&store, 1, input).await.unwrap_err();
        assert!(matches!(err, BookmarkError::Conflict));
    }

    #[tokio::test]
    async fn update_is_owner_only() {
        let store = MemoryStore::default();
        let mine = store
            .insert(NewBookmark::leaf(1, "old", "http://old", "0"))
            .await
            .unwrap();

        let changes = BookmarkChanges {
            title: Some("new".into()),
            url: Some("http://new".into()),
            ..Default::default()
        };
        let err = update_bookmark(&store, 2, mine.id, changes.clone()).await.unwrap_err();
        assert!(matches!(err, BookmarkError::NotFoundOrForbidden));
        let err = update_bookmark(&store, 1, 404, changes.clone()).await.unwrap_err();
        assert!(matches!(err, BookmarkError::NotFoundOrForbidden));

        let updated = update_bookmark(&store, 1, mine.id, changes).await.unwrap();
        assert_eq!(updated.title, "new");
        assert_eq!(updated.url, "http://new");
        assert_eq!(updated.sort, 9999);
        assert!(!updated.is_folder);
    }

    #[tokio::test]
    async fn moving_into_folder_by_id_shows_in_tree() {
        let store = MemoryStore::default();
        let folder = store.insert(NewBookmark::folder(1, "Work", "0")).await.unwrap();
        let leaf = store
            .insert(NewBookmark::leaf(1, "mail", "http://mail", "0"))
            .await
            .unwrap();

        let changes = BookmarkChanges {
            title: Some("mail".into()),
            url: Some("http://mail".into()),
            parent_url: Some(folder.id.to_string()),
            ..Default::default()
        };
        update_bookmark(&store, 1, leaf.id, changes).await.unwrap();

        let tree = list_bookmark_tree(&store, 1).await.unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].children[0].bookmark.id, leaf.id);
    }

    #[tokio::test]
    async fn delete_ignores_foreign_and_unknown_ids() {
        let store = MemoryStore::default();
        let mine = store.insert(NewBookmark::leaf(1, "a", "http://a", "0")).await.unwrap();
        let theirs = store.insert(NewBookmark::leaf(2, "b", "http://b", "0")).await.unwrap();

        let deleted = delete_bookmarks(&store, 1, &[mine.id, theirs.id, 77]).await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.rows().len(), 1);
        assert_eq!(store.rows()[0].id, theirs.id);
    }
}
