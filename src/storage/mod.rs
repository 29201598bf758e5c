//! Record store for infrastructure, job, and transfer records.
//!
//! Records are JSON blobs addressed by a synthetic three-part key,
//! `{namespace}/{kind}/{id}`. The backing is injected:
//!
//! - **MemoryBackend**: process-local map, used by tests and single-shot runs
//! - **RedisBackend**: durable records shared between gateway processes
//!
//! # Usage
//!
//! ```rust,ignore
//! use hpc_gateway::storage::{RecordKind, RecordStore};
//!
//! let store = RecordStore::in_memory("hpc-gateway");
//! store.save_record(RecordKind::Job, &job.id, &job).await?;
//! let job: JobRecord = store.get_record(RecordKind::Job, &job.id).await?;
//! ```
//!
//! Writes are last-write-wins. There is no compare-and-swap: every record
//! has a single writer at a time.

pub mod keys;
pub mod memory;
pub mod redis_backend;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;

// Re-export main types for convenience
pub use keys::{record_key, RecordKind};
pub use memory::MemoryBackend;
pub use redis_backend::RedisBackend;

/// Raw key/value persistence used by [`RecordStore`].
#[async_trait]
pub trait RecordBackend: Send + Sync {
    /// Stores `blob` under `key`, replacing any previous value.
    async fn save(&self, key: &str, blob: String) -> Result<(), StoreError>;

    /// Reads the blob stored under `key`.
    ///
    /// Fails with `StoreError::NotFound` when the key was never written.
    async fn get(&self, key: &str) -> Result<String, StoreError>;
}

/// Typed access to persisted records.
#[derive(Clone)]
pub struct RecordStore {
    backend: Arc<dyn RecordBackend>,
    namespace: String,
}

impl RecordStore {
    /// Creates a store over an existing backend.
    pub fn new(backend: Arc<dyn RecordBackend>, namespace: impl Into<String>) -> Self {
        Self {
            backend,
            namespace: namespace.into(),
        }
    }

    /// Creates a store backed by a fresh in-memory map.
    pub fn in_memory(namespace: impl Into<String>) -> Self {
        Self::new(Arc::new(MemoryBackend::new()), namespace)
    }

    /// Returns the namespace prefixed to every key.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the key a record of `kind` with `id` is stored under.
    pub fn key(&self, kind: RecordKind, id: &str) -> String {
        record_key(&self.namespace, kind, id)
    }

    /// Serializes `record` to JSON and saves it.
    pub async fn save_record<T: Serialize + Sync>(
        &self,
        kind: RecordKind,
        id: &str,
        record: &T,
    ) -> Result<(), StoreError> {
        let blob = serde_json::to_string(record)?;
        self.backend.save(&self.key(kind, id), blob).await
    }

    /// Loads and deserializes a record.
    pub async fn get_record<T: DeserializeOwned>(
        &self,
        kind: RecordKind,
        id: &str,
    ) -> Result<T, StoreError> {
        let blob = self.backend.get(&self.key(kind, id)).await?;
        Ok(serde_json::from_str(&blob)?)
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[tokio::test]
    async fn test_save_then_get_record() {
        let store = RecordStore::in_memory("test");
        let sample = Sample {
            name: "a".to_string(),
            count: 3,
        };

        store
            .save_record(RecordKind::Job, "id-1", &sample)
            .await
            .expect("save should work");
        let loaded: Sample = store
            .get_record(RecordKind::Job, "id-1")
            .await
            .expect("get should work");

        assert_eq!(loaded, sample);
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let store = RecordStore::in_memory("test");
        for count in 0..3 {
            let sample = Sample {
                name: "a".to_string(),
                count,
            };
            store
                .save_record(RecordKind::Cluster, "a", &sample)
                .await
                .expect("save should work");
        }

        let loaded: Sample = store
            .get_record(RecordKind::Cluster, "a")
            .await
            .expect("get should work");
        assert_eq!(loaded.count, 2);
    }

    #[tokio::test]
    async fn test_kinds_do_not_collide() {
        let store = RecordStore::in_memory("test");
        let sample = Sample {
            name: "a".to_string(),
            count: 1,
        };
        store
            .save_record(RecordKind::FileTransfer, "same", &sample)
            .await
            .expect("save should work");

        let result = store
            .get_record::<Sample>(RecordKind::S3Transfer, "same")
            .await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_wrong_shape_is_json_error() {
        let store = RecordStore::in_memory("test");
        store
            .save_record(RecordKind::Job, "x", &"just a string")
            .await
            .expect("save should work");

        let result = store.get_record::<Sample>(RecordKind::Job, "x").await;
        assert!(matches!(result, Err(StoreError::Json(_))));
    }

    #[tokio::test]
    async fn test_concurrent_writers_on_distinct_keys() {
        let store = RecordStore::in_memory("test");
        let mut handles = Vec::new();
        for i in 0..32u32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let sample = Sample {
                    name: format!("n{}", i),
                    count: i,
                };
                store
                    .save_record(RecordKind::Job, &format!("job-{}", i), &sample)
                    .await
            }));
        }
        for handle in handles {
            handle.await.expect("task panicked").expect("save failed");
        }

        for i in 0..32u32 {
            let loaded: Sample = store
                .get_record(RecordKind::Job, &format!("job-{}", i))
                .await
                .expect("get should work");
            assert_eq!(loaded.count, i);
        }
    }
}
