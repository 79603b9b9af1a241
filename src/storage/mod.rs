//! Key-value storage of JSON documents
//!
//! Every value is stored as a serialized JSON string under a plain string key.
//! Backends only move strings around; (de)serialization and the corruption
//! policy live in [`Storage`].

pub mod file;
pub mod memory;
pub mod redis;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::{StorageBackend, StorageConfig},
    error::AppResult,
};

/// Raw string storage backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read the raw value stored under `key`
    async fn read(&self, key: &str) -> AppResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    async fn write(&self, key: &str, value: String) -> AppResult<()>;

    /// Delete `key`; deleting a missing key is not an error
    async fn delete(&self, key: &str) -> AppResult<()>;
}

/// Outcome of reading a typed value
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded<T> {
    Found(T),
    Missing,
    /// A value exists but could not be parsed
    Corrupted { raw: String, error: String },
}

impl<T> Loaded<T> {
    pub fn is_corrupted(&self) -> bool {
        matches!(self, Loaded::Corrupted { .. })
    }

    /// Collapse to a value, using `fallback` for missing or corrupted data
    pub fn unwrap_or(self, fallback: T) -> T {
        match self {
            Loaded::Found(value) => value,
            Loaded::Missing | Loaded::Corrupted { .. } => fallback,
        }
    }
}

/// Typed JSON view over a [`KvStore`]
#[derive(Clone)]
pub struct Storage {
    backend: Arc<dyn KvStore>,
}

impl Storage {
    pub fn new(backend: Arc<dyn KvStore>) -> Self {
        Self { backend }
    }

    /// Process-local storage, mostly for tests
    pub fn in_memory() -> Self {
        Self::new(Arc::new(memory::MemoryStore::new()))
    }

    /// Build the backend selected in configuration
    pub async fn from_config(config: &StorageConfig) -> AppResult<Self> {
        let backend: Arc<dyn KvStore> = match config.backend {
            StorageBackend::Memory => Arc::new(memory::MemoryStore::new()),
            StorageBackend::File => Arc::new(file::FileStore::open(&config.path).await?),
            StorageBackend::Redis => Arc::new(
                redis::RedisStore::connect(&config.redis_url, &config.redis_prefix).await?,
            ),
        };
        tracing::info!("Using {:?} storage backend", config.backend);
        Ok(Self::new(backend))
    }

    /// Read and parse the value under `key`, reporting corruption explicitly
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> AppResult<Loaded<T>> {
        let raw = match self.backend.read(key).await? {
            Some(raw) if !raw.is_empty() => raw,
            _ => return Ok(Loaded::Missing),
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Loaded::Found(value)),
            Err(e) => Ok(Loaded::Corrupted {
                raw,
                error: e.to_string(),
            }),
        }
    }

    /// Read the value under `key`, or `fallback` when it is missing or unparsable
    pub async fn get<T: DeserializeOwned>(&self, key: &str, fallback: T) -> AppResult<T> {
        let loaded = self.load(key).await?;
        if let Loaded::Corrupted { error, .. } = &loaded {
            tracing::warn!(key, %error, "Stored value is corrupted, using fallback");
        }
        Ok(loaded.unwrap_or(fallback))
    }

    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> AppResult<()> {
        let raw = serde_json::to_string(value)?;
        self.backend.write(key, raw).await
    }

    pub async fn remove(&self, key: &str) -> AppResult<()> {
        self.backend.delete(key).await
    }
}
