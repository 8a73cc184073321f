use std::collections::HashSet;

use anyhow::Result;

use crate::model::{Bookmark, NewBookmark};
use crate::store::BookmarkStore;

/// Drops candidates whose (parent_url, url) pair is already stored or was
/// seen earlier in the batch. First occurrence wins; dropped entries are
/// not reported.
pub fn filter_unique(candidates: Vec<NewBookmark>, existing: &[Bookmark]) -> Vec<NewBookmark> {
    let taken: HashSet<(&str, &str)> = existing
        .iter()
        .map(|b| (b.parent_url.as_str(), b.url.as_str()))
        .collect();
    let mut batch_keys: HashSet<(String, String)> = HashSet::new();

    let mut unique = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let key = (candidate.parent_url.as_str(), candidate.url.as_str());
        if taken.contains(&key) {
            continue;
        }
        if !batch_keys.insert((candidate.parent_url.clone(), candidate.url.clone())) {
            continue;
        }
        unique.push(candidate);
    }
    unique
}

/// Reads the user's whole collection once and filters against it.
pub async fn filter_against_store<S: BookmarkStore>(
    store: &S,
    user_id: i64,
    candidates: Vec<NewBookmark>,
) -> Result<Vec<NewBookmark>> {
    let existing = store.find_all_for_user(user_id).await?;
    Ok(filter_unique(candidates, &existing))
}
