//! In-memory record backend.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::RecordBackend;
use crate::error::StoreError;

/// Process-local record backend.
///
/// Records vanish when the process exits.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: RwLock<HashMap<String, String>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Returns true if nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecordBackend for MemoryBackend {
    async fn save(&self, key: &str, blob: String) -> Result<(), StoreError> {
        self.records
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), blob);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<String, StoreError> {
        self.records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key() {
        let backend = MemoryBackend::new();
        assert!(backend.is_empty());
        let err = backend.get("nope").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(key) if key == "nope"));
    }

    #[tokio::test]
    async fn test_overwrite() {
        let backend = MemoryBackend::new();
        backend.save("k", "1".to_string()).await.unwrap();
        backend.save("k", "2".to_string()).await.unwrap();
        assert_eq!(backend.get("k").await.unwrap(), "2");
        assert_eq!(backend.len(), 1);
    }
}
