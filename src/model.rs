use serde::{Deserialize, Serialize};

/// Parent reference used for top-level records.
pub const ROOT_PARENT: &str = "0";

/// Sort value given to leaves created without an explicit order, so freshly
/// imported items land after manually ordered ones.
pub const DEFAULT_LEAF_SORT: i32 = 9999;

pub const DEFAULT_FOLDER_SORT: i32 = 0;

/// Returns true for every spelling of "no parent" seen in stored data.
pub fn is_root_parent(parent_url: &str) -> bool {
    matches!(parent_url, "0" | "" | "null")
}

pub fn default_sort(is_folder: bool) -> i32 {
    if is_folder { DEFAULT_FOLDER_SORT } else { DEFAULT_LEAF_SORT }
}

/// A persisted bookmark or folder.
///
/// Folders reuse their name as `url`; children point at it through
/// `parent_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub url: String,
    pub lan_url: String,
    pub parent_url: String,
    pub sort: i32,
    pub is_folder: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// A record that has not been written to the store yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBookmark {
    pub user_id: i64,
    pub title: String,
    pub url: String,
    pub lan_url: String,
    pub parent_url: String,
    pub sort: i32,
    pub is_folder: bool,
}

impl NewBookmark {
    pub fn folder(user_id: i64, name: &str, parent_url: &str) -> Self {
        NewBookmark {
            user_id,
            title: name.to_string(),
            url: name.to_string(),
            lan_url: String::new(),
            parent_url: parent_url.to_string(),
            sort: DEFAULT_FOLDER_SORT,
            is_folder: true,
        }
    }

    pub fn leaf(user_id: i64, title: &str, url: &str, parent_url: &str) -> Self {
        NewBookmark {
            user_id,
            title: title.to_string(),
            url: url.to_string(),
            lan_url: String::new(),
            parent_url: parent_url.to_string(),
            sort: DEFAULT_LEAF_SORT,
            is_folder: false,
        }
    }
}

/// Field set accepted by an update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookmarkChanges {
    pub title: Option<String>,
    pub url: Option<String>,
    pub lan_url: Option<String>,
    pub parent_url: Option<String>,
    pub sort: Option<i32>,
}

impl BookmarkChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.url.is_none()
            && self.lan_url.is_none()
            && self.parent_url.is_none()
            && self.sort.is_none()
    }

    pub fn apply_to(&self, bookmark: &mut Bookmark) {
        if let Some(title) = &self.title {
            bookmark.title = title.clone();
        }
        if let Some(url) = &self.url {
            bookmark.url = url.clone();
        }
        if let Some(lan_url) = &self.lan_url {
            bookmark.lan_url = lan_url.clone();
        }
        if let Some(parent_url) = &self.parent_url {
            bookmark.parent_url = parent_url.clone();
        }
        if let Some(sort) = self.sort {
            bookmark.sort = sort;
        }
    }
}

/// A bookmark with its ordered children, as returned by the list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookmarkNode {
    #[serde(flatten)]
    pub bookmark: Bookmark,
    pub children: Vec<BookmarkNode>,
}

impl BookmarkNode {
    pub fn new(bookmark: Bookmark) -> Self {
        BookmarkNode {
            bookmark,
            children: Vec::new(),
        }
    }
}
