//! Test doubles for cache backends.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::cache::{CacheBackend, Pipeline};
use crate::error::CacheError;

/// Backend that fails every call, simulating a cache outage.
#[derive(Debug, Default)]
pub struct UnavailableCache;

fn down<T>() -> Result<T, CacheError> {
    Err(CacheError::Unavailable("connection refused".to_string()))
}

#[async_trait]
impl CacheBackend for UnavailableCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        down()
    }

    async fn exists(&self, _key: &str) -> Result<bool, CacheError> {
        down()
    }

    async fn hash_get_all(&self, _key: &str) -> Result<HashMap<String, String>, CacheError> {
        down()
    }

    async fn list_range(&self, _key: &str, _start: isize, _stop: isize) -> Result<Vec<String>, CacheError> {
        down()
    }

    async fn keys(&self, _pattern: &str) -> Result<Vec<String>, CacheError> {
        down()
    }

    async fn delete(&self, _keys: &[String]) -> Result<usize, CacheError> {
        down()
    }

    async fn execute(&self, _pipeline: Pipeline) -> Result<(), CacheError> {
        down()
    }

    async fn size(&self) -> Result<usize, CacheError> {
        down()
    }

    async fn ping(&self) -> Result<(), CacheError> {
        down()
    }
}
