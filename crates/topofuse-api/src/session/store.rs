// Session persistence
//
// `SessionStore` is the only state shared across process instances.
// Two backends ship: an in-process `DashMap` and a directory of JSON
// files that several processes on one host can share.

use std::future::Future;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, trace, warn};

use super::Session;
use crate::auth::SessionTuple;
use crate::error::Error;

/// TTL-aware key/value persistence for vendor sessions.
///
/// `put_if_absent_or_expired` must be atomic with respect to every other
/// caller of the same store, including other processes for shared backends.
pub trait SessionStore: Send + Sync {
    /// Raw read, including expired sessions.
    fn load(
        &self,
        tuple: &SessionTuple,
    ) -> impl Future<Output = Result<Option<Session>, Error>> + Send;

    /// Unconditional write.
    fn put(&self, session: Session) -> impl Future<Output = Result<(), Error>> + Send;

    /// Store `session` unless a live session already exists for its tuple.
    ///
    /// Returns whichever session is live afterwards: the existing one if it
    /// won, otherwise `session`.
    fn put_if_absent_or_expired(
        &self,
        session: Session,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Session, Error>> + Send;

    /// Remove the session for `tuple`, if any.
    fn delete(&self, tuple: &SessionTuple) -> impl Future<Output = Result<(), Error>> + Send;

    /// Remove the session only if it still carries `key`.
    ///
    /// Keeps a 401 on a stale key from wiping a newer session that another
    /// caller stored in the meantime.
    fn delete_if_key(
        &self,
        tuple: &SessionTuple,
        key: &str,
    ) -> impl Future<Output = Result<bool, Error>> + Send;

    /// Live session for `tuple`. Expired entries read as absent and are removed.
    fn get(
        &self,
        tuple: &SessionTuple,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<Session>, Error>> + Send {
        async move {
            match self.load(tuple).await? {
                Some(session) if session.is_live_at(now) => Ok(Some(session)),
                Some(expired) => {
                    trace!(tuple = %tuple, "dropping expired session");
                    self.delete_if_key(tuple, &expired.key).await?;
                    Ok(None)
                }
                None => Ok(None),
            }
        }
    }
}

// ── In-memory backend ───────────────────────────────────────────────

/// Process-local store. Atomicity comes from `DashMap`'s entry API.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: DashMap<SessionTuple, Session>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    async fn load(&self, tuple: &SessionTuple) -> Result<Option<Session>, Error> {
        Ok(self.sessions.get(tuple).map(|s| s.value().clone()))
    }

    async fn put(&self, session: Session) -> Result<(), Error> {
        self.sessions.insert(session.tuple(), session);
        Ok(())
    }

    async fn put_if_absent_or_expired(
        &self,
        session: Session,
        now: DateTime<Utc>,
    ) -> Result<Session, Error> {
        match self.sessions.entry(session.tuple()) {
            Entry::Occupied(mut existing) => {
                if existing.get().is_live_at(now) {
                    Ok(existing.get().clone())
                } else {
                    existing.insert(session.clone());
                    Ok(session)
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(session.clone());
                Ok(session)
            }
        }
    }

    async fn delete(&self, tuple: &SessionTuple) -> Result<(), Error> {
        self.sessions.remove(tuple);
        Ok(())
    }

    async fn delete_if_key(&self, tuple: &SessionTuple, key: &str) -> Result<bool, Error> {
        Ok(self.sessions.remove_if(tuple, |_, s| s.key == key).is_some())
    }
}

// ── File backend ────────────────────────────────────────────────────

const LOCK_RETRY: Duration = Duration::from_millis(25);
const LOCK_ATTEMPTS: u32 = 200;
const STALE_LOCK_AGE: Duration = Duration::from_secs(10);

/// Directory-backed store shared by every process that points at the same path.
///
/// One JSON file per tuple. Mutations take an exclusive `create_new` lock
/// file next to the session file and publish through write-then-rename.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

/// Removes the lock file when dropped.
struct FileLock {
    path: PathBuf,
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to release session lock");
        }
    }
}

impl FileSessionStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, Error> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            Error::SessionStore(format!("cannot create {}: {e}", dir.display()))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_stem(tuple: &SessionTuple) -> String {
        let sanitize = |raw: &str| -> String {
            raw.chars()
                .map(|c| {
                    if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                        c
                    } else {
                        '_'
                    }
                })
                .collect()
        };
        format!(
            "{}__{}__{}",
            tuple.vendor,
            sanitize(&tuple.host),
            sanitize(&tuple.username)
        )
    }

    fn session_path(&self, tuple: &SessionTuple) -> PathBuf {
        self.dir.join(format!("{}.json", Self::file_stem(tuple)))
    }

    fn lock_path(&self, tuple: &SessionTuple) -> PathBuf {
        self.dir.join(format!("{}.lock", Self::file_stem(tuple)))
    }

    async fn lock(&self, tuple: &SessionTuple) -> Result<FileLock, Error> {
        let path = self.lock_path(tuple);

        for _ in 0..LOCK_ATTEMPTS {
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(_) => return Ok(FileLock { path }),
                Err(e) if e.kind() == IoErrorKind::AlreadyExists => {
                    if Self::is_stale(&path).await {
                        Self::break_stale(&path).await;
                        continue;
                    }
                    tokio::time::sleep(LOCK_RETRY).await;
                }
                Err(e) => {
                    return Err(Error::SessionStore(format!(
                        "cannot lock {}: {e}",
                        path.display()
                    )));
                }
            }
        }

        Err(Error::SessionStore(format!(
            "timed out waiting for {}",
            path.display()
        )))
    }

    /// Move a stale lock aside, then delete it.
    ///
    /// The rename is atomic, so when two processes race to break the same
    /// lock only one moves it. If the file moved turns out to be fresh, it
    /// is a lock another process took after our staleness check; it is
    /// linked back into place before the moved copy is removed.
    async fn break_stale(path: &Path) {
        static GRAVE_SEQ: AtomicU64 = AtomicU64::new(0);
        let grave = path.with_extension(format!(
            "lock.{}-{}.stale",
            std::process::id(),
            GRAVE_SEQ.fetch_add(1, Ordering::Relaxed)
        ));

        match tokio::fs::rename(path, &grave).await {
            Ok(()) => {}
            Err(e) if e.kind() == IoErrorKind::NotFound => return,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot move stale session lock aside");
                return;
            }
        }

        if Self::is_stale(&grave).await {
            debug!(path = %path.display(), "broke stale session lock");
        } else if let Err(e) = tokio::fs::hard_link(&grave, path).await {
            warn!(path = %path.display(), error = %e, "cannot restore live session lock");
        }

        if let Err(e) = tokio::fs::remove_file(&grave).await {
            warn!(path = %grave.display(), error = %e, "cannot remove stale session lock");
        }
    }

    async fn is_stale(path: &Path) -> bool {
        let Ok(meta) = tokio::fs::metadata(path).await else {
            return false;
        };
        meta.modified()
            .ok()
            .and_then(|m| SystemTime::now().duration_since(m).ok())
            .is_some_and(|age| age > STALE_LOCK_AGE)
    }

    async fn read(&self, tuple: &SessionTuple) -> Result<Option<Session>, Error> {
        let path = self.session_path(tuple);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::SessionStore(format!(
                    "cannot read {}: {e}",
                    path.display()
                )));
            }
        };

        match serde_json::from_slice::<Session>(&bytes) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring corrupt session file");
                Ok(None)
            }
        }
    }

    async fn write(&self, session: &Session) -> Result<(), Error> {
        let path = self.session_path(&session.tuple());
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec(session)
            .map_err(|e| Error::SessionStore(format!("cannot encode session: {e}")))?;

        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| Error::SessionStore(format!("cannot write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| Error::SessionStore(format!("cannot publish {}: {e}", path.display())))
    }

    async fn remove(&self, tuple: &SessionTuple) -> Result<(), Error> {
        let path = self.session_path(tuple);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::SessionStore(format!(
                "cannot remove {}: {e}",
                path.display()
            ))),
        }
    }
}

impl SessionStore for FileSessionStore {
    async fn load(&self, tuple: &SessionTuple) -> Result<Option<Session>, Error> {
        self.read(tuple).await
    }

    async fn put(&self, session: Session) -> Result<(), Error> {
        let _lock = self.lock(&session.tuple()).await?;
        self.write(&session).await
    }

    async fn put_if_absent_or_expired(
        &self,
        session: Session,
        now: DateTime<Utc>,
    ) -> Result<Session, Error> {
        let tuple = session.tuple();
        let _lock = self.lock(&tuple).await?;

        if let Some(existing) = self.read(&tuple).await? {
            if existing.is_live_at(now) {
                return Ok(existing);
            }
        }

        self.write(&session).await?;
        Ok(session)
    }

    async fn delete(&self, tuple: &SessionTuple) -> Result<(), Error> {
        let _lock = self.lock(tuple).await?;
        self.remove(tuple).await
    }

    async fn delete_if_key(&self, tuple: &SessionTuple, key: &str) -> Result<bool, Error> {
        let _lock = self.lock(tuple).await?;
        match self.read(tuple).await? {
            Some(existing) if existing.key == key => {
                self.remove(tuple).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

// ── Backend selection ───────────────────────────────────────────────

/// Store chosen at runtime from configuration.
#[derive(Debug)]
pub enum SessionBackend {
    Memory(MemorySessionStore),
    File(FileSessionStore),
}

impl Default for SessionBackend {
    fn default() -> Self {
        Self::Memory(MemorySessionStore::new())
    }
}

impl SessionStore for SessionBackend {
    async fn load(&self, tuple: &SessionTuple) -> Result<Option<Session>, Error> {
        match self {
            Self::Memory(s) => s.load(tuple).await,
            Self::File(s) => s.load(tuple).await,
        }
    }

    async fn put(&self, session: Session) -> Result<(), Error> {
        match self {
            Self::Memory(s) => s.put(session).await,
            Self::File(s) => s.put(session).await,
        }
    }

    async fn put_if_absent_or_expired(
        &self,
        session: Session,
        now: DateTime<Utc>,
    ) -> Result<Session, Error> {
        match self {
            Self::Memory(s) => s.put_if_absent_or_expired(session, now).await,
            Self::File(s) => s.put_if_absent_or_expired(session, now).await,
        }
    }

    async fn delete(&self, tuple: &SessionTuple) -> Result<(), Error> {
        match self {
            Self::Memory(s) => s.delete(tuple).await,
            Self::File(s) => s.delete(tuple).await,
        }
    }

    async fn delete_if_key(&self, tuple: &SessionTuple, key: &str) -> Result<bool, Error> {
        match self {
            Self::Memory(s) => s.delete_if_key(tuple, key).await,
            Self::File(s) => s.delete_if_key(tuple, key).await,
        }
    }
}
