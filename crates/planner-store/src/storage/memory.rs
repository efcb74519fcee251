//! In-memory backend.
//!
//! Clones share the same map, so a test can keep a handle to inspect what a
//! store persisted or reopen a second store over the same data.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{Storage, validate_key};
use crate::errors::StorageError;

#[derive(Debug, Default)]
struct Inner {
    items: HashMap<String, String>,
    quota: Option<usize>,
}

impl Inner {
    /// Bytes held (keys plus values) if `key` were set to a value of `len` bytes.
    fn size_with(&self, key: &str, len: usize) -> usize {
        let others: usize = self
            .items
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum();
        others + key.len() + len
    }
}

/// Shareable in-memory key/value map.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStorage {
    /// Empty storage without a quota.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty storage that rejects writes past `quota` bytes.
    #[must_use]
    pub fn with_quota(quota: usize) -> Self {
        let storage = Self::default();
        storage.set_quota(Some(quota));
        storage
    }

    /// Change the quota; existing entries are kept even if they exceed it.
    pub fn set_quota(&self, quota: Option<usize>) {
        self.inner.lock().quota = quota;
    }

    /// Total bytes held (keys plus values).
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        self.inner
            .lock()
            .items
            .iter()
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        validate_key(key)?;
        Ok(self.inner.lock().items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        let mut inner = self.inner.lock();
        if let Some(quota) = inner.quota {
            let needed = inner.size_with(key, value.len());
            if needed > quota {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    quota,
                });
            }
        }
        let _ = inner.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        let _ = self.inner.lock().items.remove(key);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
