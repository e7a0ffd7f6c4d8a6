// src/rl/feature_cache.rs
use log::{info, warn};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::models::PatientRecord;
use crate::rl::feature_extraction::{extract_features, FeatureVector};
use crate::utils::signature::{pair_key, record_signature};

// Default cache size - can be configured via FEATURE_CACHE_SIZE
pub const DEFAULT_CACHE_SIZE: usize = 20000;

/// LRU cache of pair feature vectors, keyed by record content signatures.
/// Features do not depend on weights, so entries stay valid across training.
pub struct FeatureCache {
    pair_cache: LruCache<String, FeatureVector>,

    // Stats
    pub hits: usize,
    pub misses: usize,
}

impl FeatureCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        info!("Initializing FeatureCache with capacity: {}", capacity);
        Self {
            pair_cache: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Cache key for a pair. Computed outside any lock.
    pub fn key_for(a: &PatientRecord, b: &PatientRecord) -> String {
        pair_key(&record_signature(a), &record_signature(b))
    }

    /// Looks up a key, counting the hit or miss.
    pub fn get(&mut self, key: &str) -> Option<FeatureVector> {
        let cached = self.pair_cache.get(key).cloned();
        match cached {
            Some(features) => {
                self.hits += 1;
                if self.hits % 1000 == 0 {
                    info!(
                        "FeatureCache stats - hits: {}, misses: {}, hit rate: {:.2}%",
                        self.hits,
                        self.misses,
                        self.hit_rate() * 100.0
                    );
                }
                Some(features)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, key: String, features: FeatureVector) {
        self.pair_cache.put(key, features);
    }

    /// Features for a pair, extracting and caching on a miss.
    pub fn get_or_extract(&mut self, a: &PatientRecord, b: &PatientRecord) -> FeatureVector {
        let key = Self::key_for(a, b);
        if let Some(features) = self.get(&key) {
            return features;
        }
        let features = extract_features(a, b);
        self.insert(key, features.clone());
        features
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// (entries, capacity)
    pub fn get_cache_info(&self) -> (usize, usize) {
        (self.pair_cache.len(), self.pair_cache.cap().get())
    }

    pub fn clear(&mut self) {
        self.pair_cache.clear();
        self.hits = 0;
        self.misses = 0;
        info!("Feature cache cleared");
    }
}

/// Shared across worker threads; held only for a lookup or insert.
pub type SharedFeatureCache = Arc<Mutex<FeatureCache>>;

fn lock_cache(cache: &SharedFeatureCache) -> MutexGuard<'_, FeatureCache> {
    cache.lock().unwrap_or_else(|poisoned| {
        warn!("Feature cache lock poisoned; recovering");
        poisoned.into_inner()
    })
}

/// Shared-cache lookup. Signatures and extraction run outside the lock, so concurrent
/// workers only serialize on the LRU get and put.
pub fn cached_features(cache: &SharedFeatureCache, a: &PatientRecord, b: &PatientRecord) -> FeatureVector {
    let key = FeatureCache::key_for(a, b);
    if let Some(features) = lock_cache(cache).get(&key) {
        return features;
    }
    let features = extract_features(a, b);
    lock_cache(cache).insert(key, features.clone());
    features
}

/// (hits, misses, entries)
pub fn shared_cache_stats(cache: &SharedFeatureCache) -> (usize, usize, usize) {
    let guard = lock_cache(cache);
    (guard.hits, guard.misses, guard.get_cache_info().0)
}

pub fn create_shared_cache(capacity: usize) -> SharedFeatureCache {
    Arc::new(Mutex::new(FeatureCache::new(capacity)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hits_for_reversed_pair() {
        let mut cache = FeatureCache::new(10);
        let a = PatientRecord::new("Vijay Kumar").with_dob("1985-01-01");
        let b = PatientRecord::new("Wijay Kumar").with_dob("1985-01-01");

        let first = cache.get_or_extract(&a, &b);
        let second = cache.get_or_extract(&b, &a);
        assert_eq!(first, second);
        assert_eq!((cache.hits, cache.misses), (1, 1));
        assert_eq!(first, extract_features(&a, &b));
    }

    #[test]
    fn test_changed_record_misses() {
        let mut cache = FeatureCache::new(10);
        let a = PatientRecord::new("Priya Sharma");
        let b = PatientRecord::new("Priya Sharma");
        cache.get_or_extract(&a, &b);
        let b = b.with_gender("F");
        cache.get_or_extract(&a, &b);
        assert_eq!(cache.misses, 2);
    }

    #[test]
    fn test_lookup_releases_borrow_before_stats() {
        let mut cache = FeatureCache::new(4);
        let a = PatientRecord::new("Ramesh Singh");
        let b = PatientRecord::new("Ramehs Singh");
        let key = FeatureCache::key_for(&a, &b);
        assert!(cache.get(&key).is_none());
        cache.insert(key.clone(), extract_features(&a, &b));
        for _ in 0..1000 {
            assert!(cache.get(&key).is_some());
        }
        assert_eq!((cache.hits, cache.misses), (1000, 1));
        assert!(cache.hit_rate() > 0.99);
    }

    #[test]
    fn test_shared_cache_from_many_threads() {
        let cache = create_shared_cache(64);
        let a = PatientRecord::new("Vijay Kumar").with_dob("1985-04-12");
        let b = PatientRecord::new("Wijay Kumar").with_dob("1985-04-12");
        let expected = extract_features(&a, &b);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let (cache, a, b) = (cache.clone(), a.clone(), b.clone());
                std::thread::spawn(move || cached_features(&cache, &a, &b))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
        let (hits, misses, entries) = shared_cache_stats(&cache);
        assert_eq!(hits + misses, 4);
        assert!(misses >= 1);
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_capacity_is_respected() {
        let mut cache = FeatureCache::new(1);
        let a = PatientRecord::new("A One");
        let b = PatientRecord::new("B Two");
        let c = PatientRecord::new("C Three");
        cache.get_or_extract(&a, &b);
        cache.get_or_extract(&a, &c);
        assert_eq!(cache.get_cache_info(), (1, 1));
        cache.get_or_extract(&a, &b);
        assert_eq!(cache.misses, 3);

        cache.clear();
        assert_eq!(cache.get_cache_info(), (0, 1));
        assert_eq!(cache.hit_rate(), 0.0);
    }
}
