//! Two-tier audio cache.
//!
//! Lookups go memory first, then disk; a disk hit is copied back into memory.
//! Writes land in both tiers. The cache is an optimization only: disk errors
//! are logged and treated as misses, never surfaced to the caller.

mod disk;
mod key;
mod memory;

pub use disk::DiskTier;
pub use key::CacheKey;
pub use memory::MemoryTier;

use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

use crate::config::SpeechConfig;
use crate::types::AudioBlob;

/// Cache counters
#[derive(Debug, Default)]
pub struct CacheCounters {
    pub memory_hits: AtomicU64,
    pub disk_hits: AtomicU64,
    pub misses: AtomicU64,
    pub evictions: AtomicU64,
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CacheStats {
    pub memory_hits: u64,
    pub disk_hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub memory_entries: usize,
    pub memory_bytes: usize,
    pub disk_entries: usize,
    pub cache_dir: PathBuf,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let hits = self.memory_hits + self.disk_hits;
        let total = hits + self.misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

/// Memory + disk cache keyed by [`CacheKey`].
pub struct AudioCache {
    memory: Mutex<MemoryTier>,
    disk: DiskTier,
    counters: CacheCounters,
}

impl AudioCache {
    pub fn new(memory: MemoryTier, disk: DiskTier) -> Self {
        Self {
            memory: Mutex::new(memory),
            disk,
            counters: CacheCounters::default(),
        }
    }

    pub fn from_config(config: &SpeechConfig) -> Self {
        Self::new(
            MemoryTier::new(config.memory_max_entries, config.memory_max_bytes),
            DiskTier::new(config.cache_dir.clone()),
        )
    }

    /// Pure lookup; never touches the network.
    pub fn get(&self, key: &CacheKey) -> Option<AudioBlob> {
        if let Some(blob) = self.memory.lock().get(key) {
            self.counters.memory_hits.fetch_add(1, Ordering::Relaxed);
            debug!("Memory cache hit {}", key);
            return Some(blob);
        }

        match self.disk.read(key) {
            Ok(Some(blob)) => {
                self.counters.disk_hits.fetch_add(1, Ordering::Relaxed);
                debug!("Disk cache hit {}", key);
                self.put_memory(key.clone(), blob.clone());
                Some(blob)
            }
            Ok(None) => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                warn!("Treating unreadable cache entry as a miss: {}", e);
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store in both tiers, overwriting any previous entry.
    pub fn put(&self, key: &CacheKey, blob: AudioBlob) {
        if let Err(e) = self.disk.write(key, &blob) {
            warn!("Failed to persist cache entry: {}", e);
        }
        self.put_memory(key.clone(), blob);
    }

    /// Drop the memory tier only; the disk tier keeps serving.
    pub fn evict_memory(&self) {
        self.memory.lock().clear();
    }

    /// Empty both tiers.
    pub fn clear(&self) {
        self.memory.lock().clear();
        match self.disk.clear() {
            Ok(removed) => info!("Cleared audio cache ({} files removed)", removed),
            Err(e) => warn!("Failed to clear persistent cache: {}", e),
        }
    }

    pub fn stats(&self) -> CacheStats {
        let (memory_entries, memory_bytes) = {
            let memory = self.memory.lock();
            (memory.len(), memory.total_bytes())
        };
        CacheStats {
            memory_hits: self.counters.memory_hits.load(Ordering::Relaxed),
            disk_hits: self.counters.disk_hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            memory_entries,
            memory_bytes,
            disk_entries: self.disk.count(),
            cache_dir: self.disk.dir().to_path_buf(),
        }
    }

    fn put_memory(&self, key: CacheKey, blob: AudioBlob) {
        let evicted = self.memory.lock().put(key, blob);
        if evicted > 0 {
            self.counters
                .evictions
                .fetch_add(evicted as u64, Ordering::Relaxed);
        }
    }
}
