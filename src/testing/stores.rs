use crate::errors::SessionError;
use crate::preferences::{EphemeralStore, PartialPreferences, ProfileStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// In-memory profile store
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    docs: Mutex<HashMap<String, PartialPreferences>>,
    failing: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every read and write fails.
    pub fn failing() -> Self {
        let store = Self::default();
        store.failing.store(true, Ordering::SeqCst);
        store
    }

    pub fn insert(&self, user_id: &str, doc: PartialPreferences) {
        self.docs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(user_id.to_string(), doc);
    }

    pub fn get(&self, user_id: &str) -> Option<PartialPreferences> {
        self.docs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(user_id)
            .cloned()
    }

    /// Write attempts, including failed ones.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), SessionError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(SessionError::Storage("profile service unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn read(&self, user_id: &str) -> Result<Option<PartialPreferences>, SessionError> {
        self.check()?;
        Ok(self.get(user_id))
    }

    async fn write(&self, user_id: &str, prefs: &PartialPreferences) -> Result<(), SessionError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.insert(user_id, prefs.clone());
        Ok(())
    }
}

/// In-memory key-value store
#[derive(Debug, Default)]
pub struct MemoryEphemeralStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryEphemeralStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }
}

impl EphemeralStore for MemoryEphemeralStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.raw(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
