//! Bounded LRU store of visual memories with JSON persistence

use crate::config::VisualMemoryConfig;
use crate::config::constants::cache;
use crate::visual::models::VisualMemory;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("no cache path configured")]
    NoPath,
    #[error("cache file I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cache file {path} is not a valid snapshot: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unsupported cache snapshot version {found} (expected {expected})")]
    UnsupportedVersion { found: String, expected: &'static str },
}

/// Counters reported by [`VisualCache::stats`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub max_entries: usize,
    /// Estimated size, rounded to two decimals
    pub size_mb: f64,
    pub max_size_mb: f64,
    pub hits: u64,
    pub misses: u64,
    /// Percent, rounded to one decimal
    pub hit_rate: f64,
    pub evictions: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
struct Counters {
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// On-disk form; entries are ordered least to most recently used
#[derive(Debug, Serialize, Deserialize)]
struct CacheSnapshot {
    version: String,
    saved_at: DateTime<Utc>,
    entries: IndexMap<String, VisualMemory>,
    stats: Counters,
}

/// Cache key for a block: identifiers joined in order
pub fn cache_key(message_ids: &[String]) -> String {
    message_ids.join(crate::config::constants::visual_memory::CACHE_KEY_SEPARATOR)
}

/// LRU cache bounded by entry count and estimated size
///
/// Every mutating call leaves `len() <= max_entries` and
/// `size_mb() <= max_size_mb` (or the cache empty).
pub struct VisualCache {
    entries: LruCache<String, VisualMemory>,
    max_entries: usize,
    max_size_mb: f64,
    cache_path: Option<PathBuf>,
    counters: Counters,
}

impl std::fmt::Debug for VisualCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisualCache")
            .field("entries", &self.entries.len())
            .field("max_entries", &self.max_entries)
            .field("max_size_mb", &self.max_size_mb)
            .field("cache_path", &self.cache_path)
            .finish()
    }
}

impl VisualCache {
    pub fn new(max_entries: usize, max_size_mb: f64) -> Self {
        Self {
            entries: LruCache::unbounded(),
            max_entries,
            max_size_mb,
            cache_path: None,
            counters: Counters::default(),
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = Some(path.into());
        self
    }

    /// Cache sized and located according to `config`
    pub fn from_config(config: &VisualMemoryConfig) -> Self {
        Self::new(config.cache_max_entries, config.cache_max_size_mb)
            .with_path(config.resolve_cache_path(None))
    }

    pub fn cache_path(&self) -> Option<&Path> {
        self.cache_path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up `key`, marking it most recently used on a hit
    pub fn get(&mut self, key: &str) -> Option<&VisualMemory> {
        if self.entries.contains(key) {
            self.counters.hits += 1;
            self.entries.get(key)
        } else {
            self.counters.misses += 1;
            None
        }
    }

    /// Look up without touching recency or counters
    pub fn peek(&self, key: &str) -> Option<&VisualMemory> {
        self.entries.peek(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    /// Insert or replace `key` as most recently used, then enforce bounds
    pub fn put(&mut self, key: impl Into<String>, memory: VisualMemory) {
        let key = key.into();
        debug!(key = %key, tokens = memory.token_count(), "caching visual memory");
        self.entries.put(key, memory);
        self.evict_if_needed();
    }

    /// Remove `key`, reporting whether it was present; not counted as an eviction
    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.pop(key).is_some()
    }

    /// Drop every entry and reset the counters
    pub fn clear(&mut self) {
        self.entries.clear();
        self.counters = Counters::default();
    }

    /// Keys from least to most recently used
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().rev().map(|(key, _)| key.clone()).collect()
    }

    /// Estimated footprint: 8 bytes per token plus the source text length
    pub fn size_mb(&self) -> f64 {
        let bytes: usize = self
            .entries
            .iter()
            .map(|(_, memory)| {
                memory.token_count() * cache::BYTES_PER_TOKEN + memory.original_text_length
            })
            .sum();
        bytes as f64 / cache::BYTES_PER_MB
    }

    fn evict_if_needed(&mut self) {
        while self.entries.len() > self.max_entries {
            self.evict_one("entry limit");
        }
        while !self.entries.is_empty() && self.size_mb() > self.max_size_mb {
            self.evict_one("size limit");
        }
    }

    fn evict_one(&mut self, reason: &str) {
        if let Some((key, _)) = self.entries.pop_lru() {
            self.counters.evictions += 1;
            debug!(key = %key, reason, "evicted visual memory");
        }
    }

    pub fn stats(&self) -> CacheStats {
        let Counters {
            hits,
            misses,
            evictions,
        } = self.counters;
        let lookups = hits + misses;
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            hits as f64 / lookups as f64 * 100.0
        };

        CacheStats {
            entries: self.entries.len(),
            max_entries: self.max_entries,
            size_mb: round_to(self.size_mb(), 2),
            max_size_mb: self.max_size_mb,
            hits,
            misses,
            hit_rate: round_to(hit_rate, 1),
            evictions,
        }
    }

    fn target_path<'a>(&'a self, path: Option<&'a Path>) -> Result<&'a Path, CacheError> {
        path.or(self.cache_path.as_deref()).ok_or(CacheError::NoPath)
    }

    /// Write a snapshot to `path` (or the configured path)
    pub fn try_save(&self, path: Option<&Path>) -> Result<PathBuf, CacheError> {
        let path = self.target_path(path)?.to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| CacheError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let snapshot = CacheSnapshot {
            version: cache::SNAPSHOT_VERSION.to_string(),
            saved_at: Utc::now(),
            entries: self
                .entries
                .iter()
                .rev()
                .map(|(key, memory)| (key.clone(), memory.clone()))
                .collect(),
            stats: self.counters,
        };
        let payload = serde_json::to_string_pretty(&snapshot).map_err(|source| CacheError::Parse {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, payload).map_err(|source| CacheError::Io {
            path: path.clone(),
            source,
        })?;

        info!(path = %path.display(), entries = self.entries.len(), "saved visual cache");
        Ok(path)
    }

    /// Replace the contents with the snapshot at `path` (or the configured path)
    ///
    /// Nothing changes unless the whole file parses.
    pub fn try_load(&mut self, path: Option<&Path>) -> Result<usize, CacheError> {
        let path = self.target_path(path)?.to_path_buf();
        let payload = fs::read_to_string(&path).map_err(|source| CacheError::Io {
            path: path.clone(),
            source,
        })?;
        let snapshot: CacheSnapshot =
            serde_json::from_str(&payload).map_err(|source| CacheError::Parse {
                path: path.clone(),
                source,
            })?;
        if snapshot.version != cache::SNAPSHOT_VERSION {
            return Err(CacheError::UnsupportedVersion {
                found: snapshot.version,
                expected: cache::SNAPSHOT_VERSION,
            });
        }

        let mut entries = LruCache::unbounded();
        for (key, memory) in snapshot.entries {
            entries.put(key, memory);
        }
        self.entries = entries;
        self.counters = snapshot.stats;
        self.evict_if_needed();

        info!(path = %path.display(), entries = self.entries.len(), "loaded visual cache");
        Ok(self.entries.len())
    }

    /// [`VisualCache::try_save`], logging failures and reporting success as a bool
    pub fn save(&self, path: Option<&Path>) -> bool {
        match self.try_save(path) {
            Ok(_) => true,
            Err(err) => {
                warn!(error = %err, "failed to save visual cache");
                false
            }
        }
    }

    /// [`VisualCache::try_load`]; a missing file or any error returns `false`
    pub fn load(&mut self, path: Option<&Path>) -> bool {
        match self.try_load(path) {
            Ok(_) => true,
            Err(CacheError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                debug!("no visual cache file yet");
                false
            }
            Err(err) => {
                warn!(error = %err, "failed to load visual cache");
                false
            }
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visual::models::{VisualToken, VisualTokens};
    use serde_json::Map;
    use tempfile::tempdir;

    fn memory(id: &str, tokens: usize, text_len: usize) -> VisualMemory {
        let data = (0..tokens)
            .map(|i| VisualToken::Symbol(format!("{i:08x}")))
            .collect();
        VisualMemory::new(
            vec![id.to_string()],
            VisualTokens::new(data, Map::new()),
            text_len,
            8.0,
        )
    }

    #[test]
    fn get_refreshes_recency() {
        let mut cache = VisualCache::new(2, 100.0);
        cache.put("a", memory("a", 4, 10));
        cache.put("b", memory("b", 4, 10));
        assert!(cache.get("a").is_some());
        cache.put("c", memory("c", 4, 10));

        assert_eq!(cache.keys(), vec!["a".to_string(), "c".to_string()]);
        assert!(!cache.contains("b"));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn replacing_a_key_does_not_grow_the_cache() {
        let mut cache = VisualCache::new(2, 100.0);
        cache.put("a", memory("a", 4, 10));
        cache.put("b", memory("b", 4, 10));
        cache.put("a", memory("a", 8, 10));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.keys(), vec!["b".to_string(), "a".to_string()]);
        assert_eq!(cache.peek("a").map(VisualMemory::token_count), Some(8));
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn size_limit_evicts_oldest() {
        // Each entry: 256 * 8 + 0 bytes = 2 KiB
        let limit_mb = 5.0 * 2048.0 / (1024.0 * 1024.0);
        let mut cache = VisualCache::new(100, limit_mb);
        for i in 0..8 {
            cache.put(format!("k{i}"), memory("x", 256, 0));
        }

        assert_eq!(cache.len(), 5);
        assert!(cache.size_mb() <= limit_mb);
        assert_eq!(cache.keys().first().map(String::as_str), Some("k3"));
        assert_eq!(cache.stats().evictions, 3);
    }

    #[test]
    fn oversized_single_entry_leaves_cache_empty() {
        let mut cache = VisualCache::new(10, 0.000_001);
        cache.put("huge", memory("huge", 256, 1000));
        assert!(cache.is_empty());
    }

    #[test]
    fn stats_rounding_and_clear() {
        let mut cache = VisualCache::new(10, 100.0);
        cache.put("a", memory("a", 4, 10));
        cache.get("a");
        cache.get("a");
        cache.get("missing");

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate, 66.7);
        assert_eq!(stats.size_mb, 0.0);

        assert!(cache.remove("a"));
        assert_eq!(cache.stats().evictions, 0);

        cache.clear();
        assert_eq!(cache.stats().hits, 0);
        assert_eq!(cache.stats().misses, 0);
    }

    #[test]
    fn load_failures_keep_existing_entries() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let mut cache = VisualCache::new(10, 100.0);
        cache.put("keep", memory("keep", 4, 10));

        assert!(!cache.load(Some(&dir.path().join("absent.json"))));

        let corrupt = dir.path().join("corrupt.json");
        fs::write(&corrupt, "{\"version\": 1, \"entries\": [")?;
        assert!(!cache.load(Some(&corrupt)));

        let future = dir.path().join("future.json");
        fs::write(
            &future,
            r#"{"version": "9.9", "saved_at": "2024-01-01T00:00:00Z", "entries": {}, "stats": {"hits": 0, "misses": 0, "evictions": 0}}"#,
        )?;
        assert!(matches!(
            cache.try_load(Some(&future)),
            Err(CacheError::UnsupportedVersion { ref found, .. }) if found == "9.9"
        ));

        assert_eq!(cache.keys(), vec!["keep".to_string()]);
        Ok(())
    }

    #[test]
    fn save_without_path_fails() {
        let cache = VisualCache::new(10, 100.0);
        assert!(matches!(cache.try_save(None), Err(CacheError::NoPath)));
        assert!(!cache.save(None));
    }
}
