//! Bounded in-memory tier with least-recently-used eviction

use lru::LruCache;
use tracing::debug;

use super::key::CacheKey;
use crate::types::AudioBlob;

/// LRU map bounded by entry count and total payload bytes.
pub struct MemoryTier {
    max_entries: usize,
    max_bytes: usize,
    entries: LruCache<CacheKey, AudioBlob>,
    total_bytes: usize,
}

impl MemoryTier {
    pub fn new(max_entries: usize, max_bytes: usize) -> Self {
        Self {
            max_entries,
            max_bytes,
            entries: LruCache::unbounded(),
            total_bytes: 0,
        }
    }

    pub fn get(&mut self, key: &CacheKey) -> Option<AudioBlob> {
        self.entries.get(key).cloned()
    }

    /// Insert or overwrite; returns how many entries were evicted.
    ///
    /// A blob larger than the byte limit is not kept.
    pub fn put(&mut self, key: CacheKey, blob: AudioBlob) -> usize {
        self.remove(&key);
        if blob.len() > self.max_bytes || self.max_entries == 0 {
            debug!("Skipping memory tier for {} ({} bytes)", key, blob.len());
            return 0;
        }

        let mut evicted = 0;
        while self.entries.len() >= self.max_entries
            || self.total_bytes + blob.len() > self.max_bytes
        {
            match self.entries.pop_lru() {
                Some((_, old)) => {
                    self.total_bytes -= old.len();
                    evicted += 1;
                }
                None => break,
            }
        }

        self.total_bytes += blob.len();
        self.entries.put(key, blob);
        evicted
    }

    pub fn remove(&mut self, key: &CacheKey) -> Option<AudioBlob> {
        let blob = self.entries.pop(key)?;
        self.total_bytes -= blob.len();
        Some(blob)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.total_bytes = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::Voice;

    fn key(n: usize) -> CacheKey {
        CacheKey::new(&format!("unit {}", n), Voice::Alloy)
    }

    fn blob(len: usize) -> AudioBlob {
        AudioBlob::from(vec![7u8; len])
    }

    #[test]
    fn test_entry_limit_evicts_least_recent() {
        let mut tier = MemoryTier::new(2, 1024);
        tier.put(key(0), blob(1));
        tier.put(key(1), blob(1));
        assert!(tier.get(&key(0)).is_some());

        assert_eq!(tier.put(key(2), blob(1)), 1);
        assert!(tier.get(&key(0)).is_some());
        assert!(tier.get(&key(1)).is_none());
        assert!(tier.get(&key(2)).is_some());
    }

    #[test]
    fn test_byte_limit_is_respected() {
        let mut tier = MemoryTier::new(100, 10);
        tier.put(key(0), blob(4));
        tier.put(key(1), blob(4));
        tier.put(key(2), blob(4));

        assert!(tier.total_bytes() <= 10);
        assert_eq!(tier.len(), 2);
        assert!(tier.get(&key(0)).is_none());
    }

    #[test]
    fn test_oversized_blob_is_skipped() {
        let mut tier = MemoryTier::new(100, 10);
        tier.put(key(0), blob(4));
        assert_eq!(tier.put(key(1), blob(11)), 0);
        assert!(tier.get(&key(1)).is_none());
        assert_eq!(tier.len(), 1);
    }

    #[test]
    fn test_overwrite_keeps_byte_total_exact() {
        let mut tier = MemoryTier::new(10, 100);
        tier.put(key(0), blob(30));
        tier.put(key(0), blob(10));
        assert_eq!(tier.len(), 1);
        assert_eq!(tier.total_bytes(), 10);
        assert_eq!(tier.get(&key(0)).unwrap().len(), 10);
    }

    #[test]
    fn test_byte_pressure_evicts_in_recency_order() {
        let mut tier = MemoryTier::new(100, 12);
        tier.put(key(0), blob(4));
        tier.put(key(1), blob(4));
        tier.put(key(2), blob(4));
        assert!(tier.get(&key(0)).is_some());

        assert_eq!(tier.put(key(3), blob(8)), 2);
        assert!(tier.get(&key(0)).is_some());
        assert!(tier.get(&key(1)).is_none());
        assert!(tier.get(&key(2)).is_none());
        assert_eq!(tier.total_bytes(), 12);
    }
}
