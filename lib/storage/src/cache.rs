use kgsql_common::DecodeError;
use kgsql_encoding::{encode, StorableValue, TermCodec};
use kgsql_model::{Term, TermRef};
use lru::LruCache;
use parking_lot::Mutex;
use rustc_hash::FxBuildHasher;
use std::hash::BuildHasher;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

/// The storable form of a term, used to look terms up in [TermCache::resolve].
pub type CacheKey = StorableValue;

/// Hit and miss counters of a [TermCache].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// A bounded memo of term encodings in both directions.
///
/// The same predicate and class IRIs occur in almost every query and result row, so both the
/// compiler and the result decoder go through this cache. The least recently used entries are
/// evicted once `capacity` is reached. Eviction never fails a lookup: a miss computes the value
/// directly.
///
/// The locks are only held for the map operation itself, never while encoding, decoding or
/// waiting for the database.
#[derive(Debug)]
pub struct TermCache {
    /// Keyed by the hash of the borrowed term, so a hit does not copy the term.
    encoded: Option<Mutex<LruCache<u64, (Term, StorableValue)>>>,
    decoded: Option<Mutex<LruCache<StorableValue, Term>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl TermCache {
    /// A cache of `capacity` entries per direction. A capacity of zero disables caching.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity);
        Self {
            encoded: capacity.map(|c| Mutex::new(LruCache::new(c))),
            decoded: capacity.map(|c| Mutex::new(LruCache::new(c))),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the storable form of `term`.
    pub fn intern(&self, term: TermRef<'_>) -> CacheKey {
        let Some(encoded) = &self.encoded else {
            return encode(term);
        };
        let hash = FxBuildHasher.hash_one(term);
        let hit = encoded
            .lock()
            .get(&hash)
            .filter(|(cached, _)| cached.as_ref() == term)
            .map(|(_, value)| value.clone());
        if let Some(value) = hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return value;
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let value = encode(term);
        encoded.lock().put(hash, (term.into_owned(), value.clone()));
        value
    }

    /// Returns the term stored as `key`.
    pub fn resolve(&self, key: &CacheKey) -> Result<Term, DecodeError> {
        let Some(decoded) = &self.decoded else {
            return key.decode();
        };
        if let Some(term) = decoded.lock().get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(term.clone());
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let term = key.decode()?;
        decoded.lock().put(key.clone(), term.clone());
        Ok(term)
    }

    /// The number of cached entries in both directions.
    pub fn len(&self) -> usize {
        self.encoded.as_ref().map_or(0, |c| c.lock().len())
            + self.decoded.as_ref().map_or(0, |c| c.lock().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    pub fn clear(&self) {
        if let Some(encoded) = &self.encoded {
            encoded.lock().clear();
        }
        if let Some(decoded) = &self.decoded {
            decoded.lock().clear();
        }
    }
}

impl TermCodec for TermCache {
    fn encode(&self, term: TermRef<'_>) -> StorableValue {
        self.intern(term)
    }

    fn decode(&self, value: &StorableValue) -> Result<Term, DecodeError> {
        self.resolve(value)
    }
}
