//! Preference store interfaces and the file-backed anonymous store.

use super::PartialPreferences;
use crate::errors::SessionError;
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};

/// Remote per-user profile document (Registered tier)
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn read(&self, user_id: &str) -> Result<Option<PartialPreferences>, SessionError>;

    async fn write(&self, user_id: &str, prefs: &PartialPreferences) -> Result<(), SessionError>;
}

/// Local key-value store holding JSON blobs (Anonymous tier)
pub trait EphemeralStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError>;

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError>;
}

/// One `<key>.json` file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileEphemeralStore {
    dir: PathBuf,
}

impl FileEphemeralStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, SessionError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(SessionError::Storage(format!("invalid storage key: {:?}", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl EphemeralStore for FileEphemeralStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SessionError::Storage(format!("read {:?}: {}", path, e))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;
        fs::write(&path, value).map_err(|e| SessionError::Storage(format!("write {:?}: {}", path, e)))
    }
}

/// Profile documents kept as local JSON files, one per user id. Used when
/// the host application does not supply a remote profile service.
#[derive(Debug, Clone)]
pub struct FileProfileStore {
    files: FileEphemeralStore,
}

impl FileProfileStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            files: FileEphemeralStore::new(dir),
        }
    }
}

#[async_trait]
impl ProfileStore for FileProfileStore {
    async fn read(&self, user_id: &str) -> Result<Option<PartialPreferences>, SessionError> {
        let files = self.files.clone();
        let user_id = user_id.to_string();
        let raw = tokio::task::spawn_blocking(move || files.get(&user_id))
            .await
            .map_err(|e| SessionError::Storage(format!("profile read task failed: {}", e)))??;
        raw.map(|blob| serde_json::from_str(&blob).map_err(SessionError::from))
            .transpose()
    }

    async fn write(&self, user_id: &str, prefs: &PartialPreferences) -> Result<(), SessionError> {
        let blob = serde_json::to_string_pretty(prefs)?;
        let files = self.files.clone();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || files.set(&user_id, &blob))
            .await
            .map_err(|e| SessionError::Storage(format!("profile write task failed: {}", e)))?
    }
}
