use std::{fmt, io::Error, path::PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::types::{TokenPair, UserSession};

#[derive(Debug)]
pub enum StoreError {
    IoError(Error),
    SerdeError(serde_json::Error),
}

impl From<Error> for StoreError {
    fn from(err: Error) -> Self {
        StoreError::IoError(err)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::SerdeError(err)
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::IoError(e) => write!(f, "session store io error: {e}"),
            StoreError::SerdeError(e) => write!(f, "session store is malformed: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Persistence of [`UserSession`] rows.
///
/// Every method is a single row-level read or write; implementations
/// serialize them, so concurrent callers see last-write-wins per row.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// All sessions in storage order.
    async fn list(&self) -> Result<Vec<UserSession>, StoreError>;

    async fn list_enabled(&self) -> Result<Vec<UserSession>, StoreError> {
        Ok(self.list().await?.into_iter().filter(|s| s.enabled).collect())
    }

    async fn get(&self, id: &str) -> Result<Option<UserSession>, StoreError>;

    /// Inserts a new enabled session, or refreshes username and credentials
    /// of an existing one while keeping its playlist, last run and flag.
    async fn upsert_login(
        &self,
        id: &str,
        username: &str,
        tokens: &TokenPair,
    ) -> Result<UserSession, StoreError>;

    /// Replaces both credentials of the row holding `old_refresh`.
    async fn replace_tokens(&self, old_refresh: &str, tokens: &TokenPair)
    -> Result<bool, StoreError>;

    async fn set_playlist(&self, id: &str, playlist_id: &str) -> Result<bool, StoreError>;

    /// Advances `last_run`; an older timestamp than the stored one is ignored.
    async fn record_run(&self, id: &str, at: DateTime<Utc>) -> Result<bool, StoreError>;

    async fn set_enabled(&self, id: &str, enabled: bool) -> Result<bool, StoreError>;

    async fn remove(&self, id: &str) -> Result<bool, StoreError>;

    async fn remove_by_refresh_token(&self, refresh_token: &str) -> Result<bool, StoreError>;
}

/// Row edits shared by both stores.
mod edits {
    use super::*;

    pub fn upsert_login(
        rows: &mut Vec<UserSession>,
        id: &str,
        username: &str,
        tokens: &TokenPair,
    ) -> UserSession {
        if let Some(row) = rows.iter_mut().find(|r| r.id == id) {
            row.username = username.to_string();
            row.access_token = tokens.access_token.clone();
            row.refresh_token = tokens.refresh_token.clone();
            return row.clone();
        }

        let row = UserSession::new(id.to_string(), username.to_string(), tokens.clone());
        rows.push(row.clone());
        row
    }

    pub fn replace_tokens(rows: &mut [UserSession], old_refresh: &str, tokens: &TokenPair) -> bool {
        match rows.iter_mut().find(|r| r.refresh_token == old_refresh) {
            Some(row) => {
                row.access_token = tokens.access_token.clone();
                row.refresh_token = tokens.refresh_token.clone();
                true
            }
            None => false,
        }
    }

    pub fn set_playlist(rows: &mut [UserSession], id: &str, playlist_id: &str) -> bool {
        match rows.iter_mut().find(|r| r.id == id) {
            Some(row) => {
                row.playlist_id = Some(playlist_id.to_string());
                true
            }
            None => false,
        }
    }

    pub fn record_run(rows: &mut [UserSession], id: &str, at: DateTime<Utc>) -> bool {
        match rows.iter_mut().find(|r| r.id == id) {
            Some(row) if row.last_run.is_none_or(|prev| at > prev) => {
                row.last_run = Some(at);
                true
            }
            _ => false,
        }
    }

    pub fn set_enabled(rows: &mut [UserSession], id: &str, enabled: bool) -> bool {
        match rows.iter_mut().find(|r| r.id == id) {
            Some(row) => {
                row.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn retain(rows: &mut Vec<UserSession>, keep: impl Fn(&UserSession) -> bool) -> bool {
        let before = rows.len();
        rows.retain(|r| keep(r));
        rows.len() != before
    }
}

/// Sessions kept only in memory.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    rows: Mutex<Vec<UserSession>>,
}

impl MemorySessionStore {
    pub fn new(rows: Vec<UserSession>) -> Self {
        Self {
            rows: Mutex::new(rows),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn list(&self) -> Result<Vec<UserSession>, StoreError> {
        Ok(self.rows.lock().await.clone())
    }

    async fn get(&self, id: &str) -> Result<Option<UserSession>, StoreError> {
        Ok(self.rows.lock().await.iter().find(|r| r.id == id).cloned())
    }

    async fn upsert_login(
        &self,
        id: &str,
        username: &str,
        tokens: &TokenPair,
    ) -> Result<UserSession, StoreError> {
        Ok(edits::upsert_login(&mut *self.rows.lock().await, id, username, tokens))
    }

    async fn replace_tokens(
        &self,
        old_refresh: &str,
        tokens: &TokenPair,
    ) -> Result<bool, StoreError> {
        Ok(edits::replace_tokens(&mut *self.rows.lock().await, old_refresh, tokens))
    }

    async fn set_playlist(&self, id: &str, playlist_id: &str) -> Result<bool, StoreError> {
        Ok(edits::set_playlist(&mut *self.rows.lock().await, id, playlist_id))
    }

    async fn record_run(&self, id: &str, at: DateTime<Utc>) -> Result<bool, StoreError> {
        Ok(edits::record_run(&mut *self.rows.lock().await, id, at))
    }

    async fn set_enabled(&self, id: &str, enabled: bool) -> Result<bool, StoreError> {
        Ok(edits::set_enabled(&mut *self.rows.lock().await, id, enabled))
    }

    async fn remove(&self, id: &str) -> Result<bool, StoreError> {
        Ok(edits::retain(&mut *self.rows.lock().await, |r| r.id != id))
    }

    async fn remove_by_refresh_token(&self, refresh_token: &str) -> Result<bool, StoreError> {
        Ok(edits::retain(&mut *self.rows.lock().await, |r| {
            r.refresh_token != refresh_token
        }))
    }
}

/// Sessions persisted as a pretty-printed JSON array.
///
/// The file is the only copy of the rows: every read loads it and every change
/// is a read-modify-write under the store mutex, so a CLI command editing the
/// same file as a running daemon is seen by the daemon's next access and is
/// never overwritten by a stale copy. A missing file is an empty store; it is
/// created on the first write.
///
/// # Example
///
/// ```
/// let store = JsonSessionStore::open(config.sessions_path.clone()).await?;
/// store.set_enabled("alice", false).await?;
/// ```
#[derive(Debug)]
pub struct JsonSessionStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonSessionStore {
    /// Opens the store at `path`, failing early when the file exists but is
    /// unreadable or malformed.
    pub async fn open(path: PathBuf) -> Result<Self, StoreError> {
        let store = Self {
            path,
            lock: Mutex::new(()),
        };
        store.load().await?;
        Ok(store)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    async fn load(&self) -> Result<Vec<UserSession>, StoreError> {
        match async_fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(Vec::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(StoreError::IoError(e)),
        }
    }

    async fn persist(&self, rows: &[UserSession]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(rows)?;
        // per-process name so two writers never share a temporary file
        let tmp = self
            .path
            .with_extension(format!("json.{}.tmp", std::process::id()));
        async_fs::write(&tmp, json).await?;
        if let Err(e) = async_fs::rename(&tmp, &self.path).await {
            let _ = async_fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Reloads the rows, applies `edit` and writes the file if it reports a
    /// change. Nothing is kept in memory, so a failed write leaves no trace.
    async fn edit<T>(
        &self,
        edit: impl FnOnce(&mut Vec<UserSession>) -> (bool, T),
    ) -> Result<T, StoreError> {
        let _guard = self.lock.lock().await;
        let mut rows = self.load().await?;
        let (changed, value) = edit(&mut rows);
        if changed {
            self.persist(&rows).await?;
        }
        Ok(value)
    }
}

#[async_trait]
impl SessionStore for JsonSessionStore {
    async fn list(&self) -> Result<Vec<UserSession>, StoreError> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    async fn get(&self, id: &str) -> Result<Option<UserSession>, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.into_iter().find(|r| r.id == id))
    }

    async fn upsert_login(
        &self,
        id: &str,
        username: &str,
        tokens: &TokenPair,
    ) -> Result<UserSession, StoreError> {
        self.edit(|rows| (true, edits::upsert_login(rows, id, username, tokens)))
            .await
    }

    async fn replace_tokens(
        &self,
        old_refresh: &str,
        tokens: &TokenPair,
    ) -> Result<bool, StoreError> {
        self.edit(|rows| {
            let changed = edits::replace_tokens(rows, old_refresh, tokens);
            (changed, changed)
        })
        .await
    }

    async fn set_playlist(&self, id: &str, playlist_id: &str) -> Result<bool, StoreError> {
        self.edit(|rows| {
            let changed = edits::set_playlist(rows, id, playlist_id);
            (changed, changed)
        })
        .await
    }

    async fn record_run(&self, id: &str, at: DateTime<Utc>) -> Result<bool, StoreError> {
        self.edit(|rows| {
            let changed = edits::record_run(rows, id, at);
            (changed, changed)
        })
        .await
    }

    async fn set_enabled(&self, id: &str, enabled: bool) -> Result<bool, StoreError> {
        self.edit(|rows| {
            let changed = edits::set_enabled(rows, id, enabled);
            (changed, changed)
        })
        .await
    }

    async fn remove(&self, id: &str) -> Result<bool, StoreError> {
        self.edit(|rows| {
            let changed = edits::retain(rows, |r| r.id != id);
            (changed, changed)
        })
        .await
    }

    async fn remove_by_refresh_token(&self, refresh_token: &str) -> Result<bool, StoreError> {
        self.edit(|rows| {
            let changed = edits::retain(rows, |r| r.refresh_token != refresh_token);
            (changed, changed)
        })
        .await
    }
}
