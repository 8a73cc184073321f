//! Bookmark Module
//!
//! Imports browser bookmark exports and serves a user's bookmarks as a tree.
//!
//! # Architecture
//!
//! - `parser` turns a Netscape bookmark file into flat records; folders are
//!   keyed by name and children point at that name through `parent_url`
//! - `dedup` drops records whose (parent_url, url) pair already exists
//! - `tree` rebuilds the hierarchy from parent references, resolving both
//!   numeric ids and folder names
//! - `service` composes those with a [`crate::store::BookmarkStore`]
//!
//! # Usage
//!
//! ```rust,ignore
//! use bookmarkd::bookmarks;
//!
//! let app = Router::new()
//!     .nest("/bookmarks", bookmarks::routes())
//!     .with_state(app_state);
//! ```

pub mod dedup;
mod handler;
pub mod parser;
mod routes;
pub mod service;
pub mod tree;

pub use dedup::filter_unique;
pub use parser::parse_bookmark_html;
pub use routes::routes;
pub use tree::build_tree;
