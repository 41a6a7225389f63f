//! Write-once storage for inference results.
//!
//! Sampling results and embeddings live in separate namespaces keyed by
//! [`SamplingKey`] and [`EmbeddingKey`]. A lookup never fails just because an
//! entry is missing, and inserting an existing key leaves the stored value intact.

mod disk;
pub mod key;
mod memory;

pub use disk::{DiskCache, EMBEDDING_TABLE, SAMPLING_TABLE};
pub use key::{EmbeddingKey, ModelIdentity, SamplingKey, SamplingOperation};
pub use memory::MemoryCache;

use crate::core::models::embedding::Embedding;
use crate::core::models::sample::SampleResult;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to create cache directory '{path}': {source}", path = path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to open cache at '{path}': {source}", path = path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rocksdb::Error,
    },

    #[error("Cache table '{0}' is missing from the store")]
    MissingTable(&'static str),

    #[error("Cache table '{table}' holds an undecodable record: {reason}")]
    Corrupted { table: &'static str, reason: String },

    #[error("Cache store failure: {0}")]
    Store(#[from] rocksdb::Error),

    #[error("Failed to encode cache record: {0}")]
    Encode(#[from] bincode::Error),

    #[error("Cache lock poisoned by a panicking writer")]
    Poisoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub samples: usize,
    pub embeddings: usize,
}

/// Storage for sampling results and embeddings.
pub trait ResultCache: Send + Sync {
    fn fetch_sample(&self, key: &SamplingKey) -> Result<Option<SampleResult>, CacheError>;
    fn insert_sample(&self, key: SamplingKey, value: SampleResult) -> Result<(), CacheError>;
    fn fetch_embedding(&self, key: &EmbeddingKey) -> Result<Option<Embedding>, CacheError>;
    fn insert_embedding(&self, key: EmbeddingKey, value: Embedding) -> Result<(), CacheError>;
    fn stats(&self) -> CacheStats;
}
