use super::key::{EmbeddingKey, SamplingKey};
use super::{CacheError, CacheStats, ResultCache};
use crate::core::models::embedding::Embedding;
use crate::core::models::sample::SampleResult;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

/// A write-once map guarded by a reader-writer lock.
#[derive(Debug)]
struct MemoryTable<K, V> {
    entries: RwLock<HashMap<K, V>>,
}

impl<K, V> Default for MemoryTable<K, V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash, V: Clone> MemoryTable<K, V> {
    fn get(&self, key: &K) -> Result<Option<V>, CacheError> {
        let entries = self.entries.read().map_err(|_| CacheError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    /// Inserts unless the key is present; returns whether the entry was added.
    fn insert_if_absent(&self, key: K, value: V) -> Result<bool, CacheError> {
        let mut entries = self.entries.write().map_err(|_| CacheError::Poisoned)?;
        if entries.contains_key(&key) {
            return Ok(false);
        }
        entries.insert(key, value);
        Ok(true)
    }

    fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }
}

/// Non-durable cache for tests and one-off runs.
#[derive(Debug, Default)]
pub struct MemoryCache {
    samples: MemoryTable<SamplingKey, SampleResult>,
    embeddings: MemoryTable<EmbeddingKey, Embedding>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultCache for MemoryCache {
    fn fetch_sample(&self, key: &SamplingKey) -> Result<Option<SampleResult>, CacheError> {
        self.samples.get(key)
    }

    fn insert_sample(&self, key: SamplingKey, value: SampleResult) -> Result<(), CacheError> {
        self.samples.insert_if_absent(key, value).map(|_| ())
    }

    fn fetch_embedding(&self, key: &EmbeddingKey) -> Result<Option<Embedding>, CacheError> {
        self.embeddings.get(key)
    }

    fn insert_embedding(&self, key: EmbeddingKey, value: Embedding) -> Result<(), CacheError> {
        self.embeddings.insert_if_absent(key, value).map(|_| ())
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            samples: self.samples.len(),
            embeddings: self.embeddings.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::cache::key::ModelIdentity;
    use crate::engine::inference::SamplingParams;

    fn key(molecule: &str) -> SamplingKey {
        SamplingKey::find_similar(
            &ModelIdentity::new("CDDD", 0),
            molecule,
            &SamplingParams {
                num_samples: 2,
                radius: 0.5,
                force_unique: false,
                sanitize: true,
            },
        )
    }

    fn sample(items: &[&str]) -> SampleResult {
        SampleResult::from_molecules(items.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    #[test]
    fn round_trip_and_absent_is_none() {
        let cache = MemoryCache::new();
        assert_eq!(cache.fetch_sample(&key("CCO")).unwrap(), None);
        cache.insert_sample(key("CCO"), sample(&["CCO", "CCC"])).unwrap();
        assert_eq!(cache.fetch_sample(&key("CCO")).unwrap(), Some(sample(&["CCO", "CCC"])));
        assert_eq!(cache.fetch_sample(&key("CCN")).unwrap(), None);
    }

    #[test]
    fn second_insert_is_a_no_op() {
        let cache = MemoryCache::new();
        cache.insert_sample(key("CCO"), sample(&["CCO", "CCC"])).unwrap();
        cache.insert_sample(key("CCO"), sample(&["CCO", "OOO"])).unwrap();
        assert_eq!(cache.fetch_sample(&key("CCO")).unwrap(), Some(sample(&["CCO", "CCC"])));
        assert_eq!(cache.stats().samples, 1);
    }

    #[test]
    fn embeddings_are_a_separate_namespace() {
        let cache = MemoryCache::new();
        let model = ModelIdentity::new("CDDD", 0);
        let key = EmbeddingKey::new(&model, "CCO", 8);
        cache.insert_embedding(key.clone(), Embedding::flat(vec![1.0, 2.0])).unwrap();
        assert_eq!(cache.fetch_embedding(&key).unwrap(), Some(Embedding::flat(vec![1.0, 2.0])));
        assert_eq!(cache.stats(), CacheStats { samples: 0, embeddings: 1 });
    }
}
