//! Cache Backend Module
//!
//! The capability set the catalog and cart layers need from a TTL-keyed cache.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheError;

// == Cache Command ==
/// A single mutation queued in a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheCommand {
    /// Store a string value with a TTL
    Set { key: String, value: String, ttl: Duration },
    /// Remove a key of any type
    Delete { key: String },
    /// Merge fields into a hash, creating it if needed
    HashSet { key: String, fields: Vec<(String, String)> },
    /// Push a value to the front of a list
    ListPush { key: String, value: String },
    /// Keep only the inclusive `start..=stop` range of a list
    ListTrim { key: String, start: isize, stop: isize },
    /// Remove every occurrence of a value from a list
    ListRemove { key: String, value: String },
    /// Set the TTL of an existing key
    Expire { key: String, ttl: Duration },
}

impl CacheCommand {
    pub fn key(&self) -> &str {
        match self {
            CacheCommand::Set { key, .. }
            | CacheCommand::Delete { key }
            | CacheCommand::HashSet { key, .. }
            | CacheCommand::ListPush { key, .. }
            | CacheCommand::ListTrim { key, .. }
            | CacheCommand::ListRemove { key, .. }
            | CacheCommand::Expire { key, .. } => key,
        }
    }
}

// == Pipeline ==
/// Ordered batch of commands applied atomically (not transactionally) by a backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    commands: Vec<CacheCommand>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>, ttl: Duration) -> &mut Self {
        self.commands.push(CacheCommand::Set {
            key: key.into(),
            value: value.into(),
            ttl,
        });
        self
    }

    pub fn delete(&mut self, key: impl Into<String>) -> &mut Self {
        self.commands.push(CacheCommand::Delete { key: key.into() });
        self
    }

    pub fn hash_set(&mut self, key: impl Into<String>, fields: Vec<(String, String)>) -> &mut Self {
        self.commands.push(CacheCommand::HashSet {
            key: key.into(),
            fields,
        });
        self
    }

    pub fn list_push(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.commands.push(CacheCommand::ListPush {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn list_trim(&mut self, key: impl Into<String>, start: isize, stop: isize) -> &mut Self {
        self.commands.push(CacheCommand::ListTrim {
            key: key.into(),
            start,
            stop,
        });
        self
    }

    pub fn list_remove(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.commands.push(CacheCommand::ListRemove {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn expire(&mut self, key: impl Into<String>, ttl: Duration) -> &mut Self {
        self.commands.push(CacheCommand::Expire {
            key: key.into(),
            ttl,
        });
        self
    }

    pub fn commands(&self) -> &[CacheCommand] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<CacheCommand> {
        self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

// == Cache Backend Trait ==
/// Generic TTL-keyed cache used by the catalog and cart layers.
///
/// Reads of missing or expired keys return empty values, never errors.
#[async_trait]
pub trait CacheBackend: Send + Sync + fmt::Debug {
    /// Returns the string stored at `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    /// Returns every field of the hash at `key` (empty when absent).
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, CacheError>;

    /// Returns the inclusive range of a list; negative indexes count from the end.
    async fn list_range(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, CacheError>;

    /// Enumerates keys matching a glob pattern (`*` and `?`).
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError>;

    /// Deletes the given keys, returning how many existed.
    async fn delete(&self, keys: &[String]) -> Result<usize, CacheError>;

    /// Applies the pipeline as one atomic unit: no other client observes a
    /// partial batch.
    ///
    /// This is atomic, not transactional. `MemoryCache` stages the whole batch
    /// before committing and applies nothing on error. Redis `MULTI/EXEC` rejects
    /// a batch that fails to queue, but a command that fails at execution time
    /// (e.g. a type mismatch) does not roll back the commands around it.
    async fn execute(&self, pipeline: Pipeline) -> Result<(), CacheError>;

    /// Number of live keys.
    async fn size(&self) -> Result<usize, CacheError>;

    async fn ping(&self) -> Result<(), CacheError>;
}

/// Shared handle injected into the catalog and cart layers.
pub type SharedCache = Arc<dyn CacheBackend>;

/// Runs a cache call under a deadline, mapping elapsed deadlines to `CacheError::Timeout`.
pub async fn with_deadline<T, F>(deadline: Duration, fut: F) -> Result<T, CacheError>
where
    F: Future<Output = Result<T, CacheError>>,
{
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| CacheError::Timeout(deadline))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_builder_preserves_order() {
        let mut pipe = Pipeline::new();
        pipe.set("product:A", "{}", Duration::from_secs(10))
            .list_push("products:recent", "A")
            .list_trim("products:recent", 0, 99)
            .expire("products:recent", Duration::from_secs(10));

        assert_eq!(pipe.len(), 4);
        let keys: Vec<&str> = pipe.commands().iter().map(|c| c.key()).collect();
        assert_eq!(
            keys,
            vec!["product:A", "products:recent", "products:recent", "products:recent"]
        );
    }

    #[test]
    fn test_empty_pipeline() {
        assert!(Pipeline::new().is_empty());
    }

    #[tokio::test]
    async fn test_with_deadline_times_out() {
        let result: Result<(), CacheError> = with_deadline(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(CacheError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_with_deadline_passes_result_through() {
        let result = with_deadline(Duration::from_secs(1), async { Ok::<_, CacheError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
