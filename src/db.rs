use crate::config::Config;
use crate::error::DuplicateEntry;
use crate::model::{Bookmark, BookmarkChanges, NewBookmark};
use crate::store::BookmarkStore;
use anyhow::Result;
use libsql::{Builder, Connection, Database as LibsqlDatabase};
use std::path::Path;
use std::time::Duration;
use tokio::sync::Mutex;

const SYSTEM_MIGRATIONS: &[(&str, &str)] =
    &[("system/000_migrations_table.sql", include_str!("migrations/system/000_migrations_table.sql"))];

const MIGRATIONS: &[(&str, &str)] = &[
    ("001_bookmarks.sql", include_str!("migrations/001_bookmarks.sql")),
    (
        "002_bookmarks_unique_parent_url.sql",
        include_str!("migrations/002_bookmarks_unique_parent_url.sql"),
    ),
];

// stays well under SQLite's bound-variable limit
const DELETE_CHUNK: usize = 500;

const BOOKMARK_COLUMNS: &str =
    "id, user_id, title, url, lan_url, parent_url, sort, is_folder, created_at, updated_at";

pub struct Database {
    db: LibsqlDatabase,
    conn: Connection,
    // one shared connection: a write must never land inside another request's transaction
    tx_lock: Mutex<()>,
    turso_url: Option<String>,
    turso_auth_token: Option<String>,
}

impl Database {
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn is_replica(turso_url: &Option<String>, turso_auth_token: &Option<String>) -> bool {
        turso_url.is_some() && turso_auth_token.is_some()
    }

    pub async fn sync(&self) -> Result<()> {
        if Self::is_replica(&self.turso_url, &self.turso_auth_token) {
            self.db
                .sync()
                .await
                .map_err(|e| anyhow::anyhow!("sync failed: {}", e))?;
        }
        Ok(())
    }

    async fn is_migration_applied(conn: &Connection, name: &str) -> Result<bool> {
        let query = "SELECT 1 FROM _migrations WHERE name = ?";
        match conn.query(query, libsql::params![name]).await {
            Ok(mut rows) => Ok(rows.next().await?.is_some()),
            Err(e) => {
                if e.to_string().contains("no such table") {
                    Ok(false)
                } else {
                    Err(e.into())
                }
            }
        }
    }

    async fn record_migration(conn: &Connection, name: &str) -> Result<()> {
        let query = r#"
            INSERT INTO _migrations (name, applied_at)
            VALUES (?, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        "#;
        conn.execute(query, libsql::params![name]).await?;
        Ok(())
    }

    async fn run_migration(conn: &Connection, name: &str, sql: &str) -> Result<()> {
        if Self::is_migration_applied(conn, name).await? {
            tracing::debug!("migration {} already applied, skipping", name);
            return Ok(());
        }

        tracing::info!("applying migration: {}", name);
        conn.execute_batch(sql)
            .await
            .map_err(|e| anyhow::anyhow!("failed to execute migration {name}: {e}"))?;

        Self::record_migration(conn, name).await?;
        Ok(())
    }

    async fn migrate(conn: &Connection) -> Result<()> {
        for (filename, sql) in SYSTEM_MIGRATIONS.iter().chain(MIGRATIONS) {
            Self::run_migration(conn, filename, sql).await?;
        }
        Ok(())
    }

    pub async fn new(cfg: &Config, data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(cfg.app.get_db());
        let turso_url = cfg.app.turso_url.clone();
        let turso_auth_token = cfg.app.turso_auth_token.clone();

        let db = match (&turso_url, &turso_auth_token) {
            (Some(url), Some(token)) => {
                tracing::info!("[db] running in synced database mode (offline writes)");
                let sync_interval = Duration::from_secs(cfg.app.sync_interval_seconds);
                Builder::new_synced_database(&path, url.clone(), token.clone())
                    .sync_interval(sync_interval)
                    .build()
                    .await?
            }
            _ => {
                tracing::info!(path = ?path, "[db] running in local mode");
                Builder::new_local(&path).build().await?
            }
        };

        Self::from_libsql(db, turso_url, turso_auth_token).await
    }

    /// Opens a plain local database, `":memory:"` included.
    pub async fn open_local(path: impl AsRef<Path>) -> Result<Self> {
        let db = Builder::new_local(path.as_ref()).build().await?;
        Self::from_libsql(db, None, None).await
    }

    async fn from_libsql(
        db: LibsqlDatabase,
        turso_url: Option<String>,
        turso_auth_token: Option<String>,
    ) -> Result<Self> {
        let conn = db.connect()?;
        conn.query("SELECT 1", ()).await?;
        Self::migrate(&conn).await?;

        Ok(Database {
            db,
            conn,
            tx_lock: Mutex::new(()),
            turso_url,
            turso_auth_token,
        })
    }

    fn row_to_bookmark(row: &libsql::Row) -> Result<Bookmark> {
        Ok(Bookmark {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            url: row.get(3)?,
            lan_url: row.get::<Option<String>>(4)?.unwrap_or_default(),
            parent_url: row.get::<Option<String>>(5)?.unwrap_or_default(),
            sort: row.get(6)?,
            is_folder: row.get::<i32>(7)? != 0,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    fn classify_write_error(e: libsql::Error, parent_url: &str, url: &str) -> anyhow::Error {
        if e.to_string().contains("UNIQUE constraint failed") {
            DuplicateEntry {
                parent_url: parent_url.to_string(),
                url: url.to_string(),
            }
            .into()
        } else {
            e.into()
        }
    }

    async fn insert_row(&self, bookmark: &NewBookmark) -> Result<Bookmark> {
        let query = format!(
            r#"
            INSERT INTO bookmarks (user_id, title, url, lan_url, parent_url, sort, is_folder)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING {BOOKMARK_COLUMNS}
        "#
        );
        let classify = |e| Self::classify_write_error(e, &bookmark.parent_url, &bookmark.url);

        let mut rows = self
            .conn
            .query(
                &query,
                libsql::params![
                    bookmark.user_id,
                    bookmark.title.as_str(),
                    bookmark.url.as_str(),
                    bookmark.lan_url.as_str(),
                    bookmark.parent_url.as_str(),
                    bookmark.sort,
                    bookmark.is_folder as i32
                ],
            )
            .await
            .map_err(classify)?;

        match rows.next().await.map_err(classify)? {
            Some(row) => Self::row_to_bookmark(&row),
            None => anyhow::bail!("Failed to insert bookmark: {}", bookmark.url),
        }
    }

    async fn bulk_insert_internal(&self, bookmarks: &[NewBookmark]) -> Result<Vec<Bookmark>> {
        let mut inserted = Vec::with_capacity(bookmarks.len());
        for bookmark in bookmarks {
            inserted.push(self.insert_row(bookmark).await?);
        }
        Ok(inserted)
    }

    async fn delete_chunks(&self, user_id: i64, ids: &[i64]) -> Result<u64> {
        let mut deleted = 0;
        for chunk in ids.chunks(DELETE_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let query = format!("DELETE FROM bookmarks WHERE user_id = ? AND id IN ({placeholders})");

            let mut params: Vec<libsql::Value> = Vec::with_capacity(chunk.len() + 1);
            params.push(user_id.into());
            params.extend(chunk.iter().map(|id| libsql::Value::from(*id)));

            deleted += self.conn.execute(&query, params).await?;
        }
        Ok(deleted)
    }
}

impl BookmarkStore for Database {
    async fn find_all_for_user(&self, user_id: i64) -> Result<Vec<Bookmark>> {
        let query = format!("SELECT {BOOKMARK_COLUMNS} FROM bookmarks WHERE user_id = ? ORDER BY sort ASC, id ASC");

        let _guard = self.tx_lock.lock().await;
        let mut rows = self.conn.query(&query, libsql::params![user_id]).await?;
        let mut bookmarks = Vec::new();
        while let Some(row) = rows.next().await? {
            bookmarks.push(Self::row_to_bookmark(&row)?);
        }
        Ok(bookmarks)
    }

    async fn bulk_insert(&self, bookmarks: Vec<NewBookmark>) -> Result<Vec<Bookmark>> {
        let _guard = self.tx_lock.lock().await;

        self.conn.execute("BEGIN TRANSACTION", ()).await?;

        match self.bulk_insert_internal(&bookmarks).await {
            Ok(inserted) => {
                self.conn.execute("COMMIT", ()).await?;
                Ok(inserted)
            }
            Err(e) => {
                let _ = self.conn.execute("ROLLBACK", ()).await;
                Err(e)
            }
        }
    }

    async fn insert(&self, bookmark: NewBookmark) -> Result<Bookmark> {
        let _guard = self.tx_lock.lock().await;
        self.insert_row(&bookmark).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Bookmark>> {
        let query = format!("SELECT {BOOKMARK_COLUMNS} FROM bookmarks WHERE id = ?");

        let _guard = self.tx_lock.lock().await;
        let mut rows = self.conn.query(&query, libsql::params![id]).await?;
        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_bookmark(&row)?))
        } else {
            Ok(None)
        }
    }

    async fn update_fields(&self, id: i64, changes: BookmarkChanges) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut updates = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();

        if let Some(title) = &changes.title {
            updates.push("title = ?");
            params.push(title.clone().into());
        }
        if let Some(url) = &changes.url {
            updates.push("url = ?");
            params.push(url.clone().into());
        }
        if let Some(lan_url) = &changes.lan_url {
            updates.push("lan_url = ?");
            params.push(lan_url.clone().into());
        }
        if let Some(parent_url) = &changes.parent_url {
            updates.push("parent_url = ?");
            params.push(parent_url.clone().into());
        }
        if let Some(sort) = changes.sort {
            updates.push("sort = ?");
            params.push(sort.into());
        }

        updates.push("updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')");
        params.push(id.into());

        let query = format!("UPDATE bookmarks SET {} WHERE id = ?", updates.join(", "));

        let _guard = self.tx_lock.lock().await;
        self.conn.execute(&query, params).await.map_err(|e| {
            Self::classify_write_error(
                e,
                changes.parent_url.as_deref().unwrap_or_default(),
                changes.url.as_deref().unwrap_or_default(),
            )
        })?;
        Ok(())
    }

    async fn delete_by_ids_for_user(&self, user_id: i64, ids: &[i64]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let _guard = self.tx_lock.lock().await;

        self.conn.execute("BEGIN TRANSACTION", ()).await?;

        match self.delete_chunks(user_id, ids).await {
            Ok(deleted) => {
                self.conn.execute("COMMIT", ()).await?;
                Ok(deleted)
            }
            Err(e) => {
                let _ = self.conn.execute("ROLLBACK", ()).await;
                Err(e)
            }
        }
    }
}
