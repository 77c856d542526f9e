//! File-backed credential store.
//!
//! The credential is kept as pretty-printed JSON. Writes go to a sibling
//! temporary file that is then renamed over the target, so a crash mid-write
//! leaves the previous credential intact.
//!
//! Two processes sharing a store are last-writer-wins: there is no lock.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::credential::Credential;
use crate::error::{AuthError, AuthResult};

/// Persisted credential storage at a single path.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Creates a store backed by `path`. Nothing is read until [`load`](Self::load).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the token file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the stored credential.
    ///
    /// A missing file yields `None`. So does an unreadable or malformed one:
    /// corruption is logged and treated as absence, never raised.
    pub fn load(&self) -> Option<Credential> {
        match self.read() {
            Ok(credential) => credential,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable token file");
                None
            }
        }
    }

    /// Reads the stored credential, reporting corruption as [`AuthError::StoreCorrupt`].
    pub fn read(&self) -> AuthResult<Option<Credential>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no token file");
                return Ok(None);
            }
            Err(e) => return Err(AuthError::corrupt(&self.path, e.to_string())),
        };

        let credential: Credential = serde_json::from_str(&content)
            .map_err(|e| AuthError::corrupt(&self.path, e.to_string()))?;

        debug!(path = %self.path.display(), expiry = %credential.expiry, "loaded credential");
        Ok(Some(credential))
    }

    /// Writes `credential` to the store, replacing any previous one.
    pub fn persist(&self, credential: &Credential) -> AuthResult<()> {
        self.write_atomic(credential)
            .map_err(|e| AuthError::persist(&self.path, e))?;
        debug!(path = %self.path.display(), "saved credential");
        Ok(())
    }

    fn write_atomic(&self, credential: &Credential) -> io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(credential).map_err(io::Error::other)?;
        let temp_path = self.temp_path();

        let result = Self::write_private(&temp_path, content.as_bytes())
            .and_then(|()| fs::rename(&temp_path, &self.path));
        if result.is_err() {
            let _ = fs::remove_file(&temp_path);
        }
        result
    }

    /// Creates (or truncates) `path` readable by the owner only, then syncs it.
    fn write_private(path: &Path, content: &[u8]) -> io::Result<()> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(path)?;
        file.write_all(content)?;
        file.write_all(b"\n")?;
        file.sync_all()
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "token".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, Utc};

    fn sample() -> Credential {
        Credential::new("access-token", Utc::now() + TimeDelta::hours(1))
            .with_refresh_token("refresh-token")
            .with_scope(vec!["scope1".to_string()])
    }

    #[test]
    fn persist_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        let credential = sample();

        store.persist(&credential).unwrap();
        assert!(store.path().exists());

        let loaded = TokenStore::new(store.path()).load().unwrap();
        assert_eq!(loaded, credential);
    }

    #[test]
    fn persist_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("nested").join("deeper").join("token.json"));
        store.persist(&sample()).unwrap();
        assert!(store.load().is_some());
    }

    #[test]
    fn persist_replaces_previous_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));

        store.persist(&sample()).unwrap();
        let newer = sample().with_refresh_token("rotated");
        store.persist(&newer).unwrap();

        assert_eq!(store.load().unwrap().refresh_token.as_deref(), Some("rotated"));
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn persisted_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        store.persist(&sample()).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        assert!(store.read().unwrap().is_none());
        assert!(store.load().is_none());
    }

    #[test]
    fn corrupt_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        fs::write(store.path(), "{ not json").unwrap();

        assert!(matches!(store.read(), Err(AuthError::StoreCorrupt { .. })));
        assert!(store.load().is_none());
    }

    #[test]
    fn directory_in_place_of_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path());
        assert!(store.load().is_none());
    }

    #[test]
    fn persist_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file, not a directory").unwrap();

        let store = TokenStore::new(blocker.join("token.json"));
        let err = store.persist(&sample()).unwrap_err();
        assert!(matches!(err, AuthError::PersistFailed { .. }));
    }
}
