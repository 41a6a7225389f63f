use super::key::{EmbeddingKey, SamplingKey};
use super::{CacheError, CacheStats, ResultCache};
use crate::core::models::embedding::Embedding;
use crate::core::models::sample::SampleResult;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, error, info};

/// Column family holding bincode `SamplingKey -> SampleResult` records.
pub const SAMPLING_TABLE: &str = "sampling";
/// Column family holding bincode `EmbeddingKey -> Embedding` records.
pub const EMBEDDING_TABLE: &str = "embedding";

/// Durable cache backed by RocksDB, one column family per namespace.
///
/// Keys and values are bincode-encoded. Records are written once; inserting an
/// existing key leaves the stored value untouched.
pub struct DiskCache {
    dir: PathBuf,
    db: DB,
    writer: Mutex<()>,
}

impl DiskCache {
    /// Opens (or creates) the cache at `dir`.
    ///
    /// Fails fast if the store cannot be opened, for example when another process
    /// holds it.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, CacheError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|source| CacheError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let cf_opts = Options::default();
        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(SAMPLING_TABLE, cf_opts.clone()),
            ColumnFamilyDescriptor::new(EMBEDDING_TABLE, cf_opts),
        ];

        let db = DB::open_cf_descriptors(&db_opts, &dir, cf_descriptors).map_err(|source| {
            error!(path = %dir.display(), error = %source, "Failed to open result cache.");
            CacheError::Open {
                path: dir.clone(),
                source,
            }
        })?;

        let cache = Self {
            dir,
            db,
            writer: Mutex::new(()),
        };
        info!(path = %cache.dir.display(), "Opened result cache.");
        Ok(cache)
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn table(&self, name: &'static str) -> Result<&ColumnFamily, CacheError> {
        self.db.cf_handle(name).ok_or(CacheError::MissingTable(name))
    }

    fn get<K, V>(&self, table: &'static str, key: &K) -> Result<Option<V>, CacheError>
    where
        K: Serialize,
        V: DeserializeOwned,
    {
        let cf = self.table(table)?;
        let key = bincode::serialize(key)?;
        match self.db.get_pinned_cf(cf, &key)? {
            Some(bytes) => bincode::deserialize(&bytes)
                .map(Some)
                .map_err(|e| CacheError::Corrupted {
                    table,
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    fn insert<K, V>(&self, table: &'static str, key: &K, value: &V) -> Result<(), CacheError>
    where
        K: Serialize,
        V: Serialize,
    {
        let cf = self.table(table)?;
        let key = bincode::serialize(key)?;
        let _guard = self.writer.lock().map_err(|_| CacheError::Poisoned)?;
        if self.db.get_pinned_cf(cf, &key)?.is_some() {
            debug!(table, "Key already cached; keeping stored value.");
            return Ok(());
        }
        let value = bincode::serialize(value)?;
        self.db.put_cf(cf, &key, &value)?;
        Ok(())
    }

    fn count(&self, table: &'static str) -> usize {
        match self.table(table) {
            Ok(cf) => self.db.iterator_cf(cf, IteratorMode::Start).count(),
            Err(_) => 0,
        }
    }
}

impl ResultCache for DiskCache {
    fn fetch_sample(&self, key: &SamplingKey) -> Result<Option<SampleResult>, CacheError> {
        self.get(SAMPLING_TABLE, key)
    }

    fn insert_sample(&self, key: SamplingKey, value: SampleResult) -> Result<(), CacheError> {
        self.insert(SAMPLING_TABLE, &key, &value)
    }

    fn fetch_embedding(&self, key: &EmbeddingKey) -> Result<Option<Embedding>, CacheError> {
        self.get(EMBEDDING_TABLE, key)
    }

    fn insert_embedding(&self, key: EmbeddingKey, value: Embedding) -> Result<(), CacheError> {
        self.insert(EMBEDDING_TABLE, &key, &value)
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            samples: self.count(SAMPLING_TABLE),
            embeddings: self.count(EMBEDDING_TABLE),
        }
    }
}
