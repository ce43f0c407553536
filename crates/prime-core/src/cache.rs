//! Response caching keyed by run cache key and request URL
//!
//! A cache key scopes every entry written during one inventory run. Two
//! backends are provided:
//! - [`MemoryCache`] keeps entries for the life of the process
//! - [`JsonFileCache`] persists each cache key to `{dir}/{cache_key}.json`
//!   and treats files older than the configured timeout as empty
//!
//! A backend is opened for a key once per run and flushed once at the end.
//! Reads in between see the snapshot taken by `open` plus this run's writes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Cache of raw JSON response bodies
pub trait ResponseCache {
    fn get(&self, key: &str, url: &str) -> Option<Value>;

    fn contains(&self, key: &str, url: &str) -> bool {
        self.get(key, url).is_some()
    }

    /// Store a response body for the rest of the run
    fn put(&mut self, key: &str, url: &str, value: Value) -> Result<(), CacheError>;

    /// Drop every entry for `key`
    fn clear(&mut self, key: &str) -> Result<(), CacheError>;

    /// Load the stored entries for `key` before the first lookup
    fn open(&mut self, _key: &str) -> Result<(), CacheError> {
        Ok(())
    }

    /// Persist entries written for `key` since it was opened
    fn flush(&mut self, _key: &str) -> Result<(), CacheError> {
        Ok(())
    }
}

/// Process-local cache
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: HashMap<String, HashMap<String, Value>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of URLs cached under `key`
    pub fn len(&self, key: &str) -> usize {
        self.entries.get(key).map(HashMap::len).unwrap_or(0)
    }
}

impl ResponseCache for MemoryCache {
    fn get(&self, key: &str, url: &str) -> Option<Value> {
        self.entries.get(key).and_then(|urls| urls.get(url)).cloned()
    }

    fn put(&mut self, key: &str, url: &str, value: Value) -> Result<(), CacheError> {
        self.entries
            .entry(key.to_string())
            .or_default()
            .insert(url.to_string(), value);
        Ok(())
    }

    fn clear(&mut self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// On-disk contents of one cache key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheFile {
    /// When the first entry of this set was written
    pub fetched_at: DateTime<Utc>,
    /// URL -> response body
    #[serde(default)]
    pub entries: HashMap<String, Value>,
}

impl CacheFile {
    fn new() -> Self {
        Self {
            fetched_at: Utc::now(),
            entries: HashMap::new(),
        }
    }

    fn is_expired(&self, timeout: Duration) -> bool {
        if timeout.is_zero() {
            return false;
        }
        let age = Utc::now() - self.fetched_at;
        age.to_std().map(|age| age > timeout).unwrap_or(false)
    }
}

/// JSON file cache, one file per cache key
#[derive(Debug, Clone)]
pub struct JsonFileCache {
    /// Directory holding the cache files
    pub base_dir: PathBuf,
    /// Entries older than this are discarded on load; zero never expires
    pub timeout: Duration,
    loaded: HashMap<String, CacheFile>,
    dirty: HashSet<String>,
}

impl JsonFileCache {
    /// Create a cache rooted at `base_dir`, creating the directory if needed
    pub fn new(base_dir: PathBuf, timeout: Duration) -> Result<Self, CacheError> {
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self {
            base_dir,
            timeout,
            loaded: HashMap::new(),
            dirty: HashSet::new(),
        })
    }

    /// Path of the file backing `key`
    pub fn file_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", key))
    }

    fn read_file(path: &Path) -> Result<CacheFile, CacheError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Read the entry set for `key` from disk, if present and not expired
    fn read_fresh(&self, key: &str) -> Option<CacheFile> {
        let path = self.file_path(key);
        if !path.exists() {
            return None;
        }
        match Self::read_file(&path) {
            Ok(file) if file.is_expired(self.timeout) => {
                debug!(path = %path.display(), "Cache file expired");
                None
            }
            Ok(file) => Some(file),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable cache file");
                None
            }
        }
    }

    /// Entry set for `key`, read from disk the first time only
    fn load(&mut self, key: &str) -> &mut CacheFile {
        if !self.loaded.contains_key(key) {
            let file = self.read_fresh(key).unwrap_or_else(CacheFile::new);
            self.loaded.insert(key.to_string(), file);
        }
        self.loaded.entry(key.to_string()).or_insert_with(CacheFile::new)
    }

    fn save(&self, key: &str) -> Result<(), CacheError> {
        if let Some(file) = self.loaded.get(key) {
            let content = serde_json::to_string(file)?;
            std::fs::write(self.file_path(key), content)?;
            debug!(key = %key, entries = file.entries.len(), "Cache file written");
        }
        Ok(())
    }
}

impl ResponseCache for JsonFileCache {
    /// Only keys that were opened (or written) are visible; the file is not
    /// consulted here.
    fn get(&self, key: &str, url: &str) -> Option<Value> {
        self.loaded
            .get(key)
            .and_then(|file| file.entries.get(url))
            .cloned()
    }

    fn put(&mut self, key: &str, url: &str, value: Value) -> Result<(), CacheError> {
        self.load(key).entries.insert(url.to_string(), value);
        self.dirty.insert(key.to_string());
        Ok(())
    }

    fn clear(&mut self, key: &str) -> Result<(), CacheError> {
        self.loaded.insert(key.to_string(), CacheFile::new());
        self.dirty.remove(key);
        let path = self.file_path(key);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    fn open(&mut self, key: &str) -> Result<(), CacheError> {
        self.load(key);
        Ok(())
    }

    fn flush(&mut self, key: &str) -> Result<(), CacheError> {
        if !self.dirty.contains(key) {
            return Ok(());
        }
        self.save(key)?;
        self.dirty.remove(key);
        Ok(())
    }
}

/// Derive the cache key for an inventory source path
pub fn cache_key_for_path(plugin: &str, path: &Path) -> String {
    let digest = sha256_hex(path.to_string_lossy().as_bytes());
    format!("{}_{}", plugin, &digest[..16])
}

/// Compute SHA256 hash of data and return as hex string
pub fn sha256_hex(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    const URL: &str = "https://prime.local/webacs/api/v4/data/Devices.json";

    #[test]
    fn test_memory_cache() {
        let mut cache = MemoryCache::new();
        assert!(!cache.contains("run", URL));

        cache.put("run", URL, json!({"a": 1})).unwrap();
        assert_eq!(cache.get("run", URL), Some(json!({"a": 1})));
        assert!(!cache.contains("other", URL));

        cache.clear("run").unwrap();
        assert_eq!(cache.len("run"), 0);
    }

    #[test]
    fn test_file_cache_persists() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().to_path_buf();

        let mut cache = JsonFileCache::new(dir.clone(), Duration::from_secs(3600)).unwrap();
        cache.open("run").unwrap();
        cache.put("run", URL, json!({"queryResponse": {"@count": 0}})).unwrap();
        cache.flush("run").unwrap();
        assert!(cache.file_path("run").exists());

        let mut reopened = JsonFileCache::new(dir, Duration::from_secs(3600)).unwrap();
        assert_eq!(reopened.get("run", URL), None);
        reopened.open("run").unwrap();
        assert_eq!(
            reopened.get("run", URL),
            Some(json!({"queryResponse": {"@count": 0}}))
        );
    }

    #[test]
    fn test_file_cache_expiry() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().to_path_buf();

        let stale = CacheFile {
            fetched_at: Utc::now() - chrono::Duration::hours(2),
            entries: HashMap::from([(URL.to_string(), json!(1))]),
        };
        let cache = JsonFileCache::new(dir.clone(), Duration::from_secs(3600)).unwrap();
        std::fs::write(cache.file_path("run"), serde_json::to_string(&stale).unwrap()).unwrap();

        let mut expiring = JsonFileCache::new(dir.clone(), Duration::from_secs(3600)).unwrap();
        expiring.open("run").unwrap();
        assert_eq!(expiring.get("run", URL), None);

        let mut forever = JsonFileCache::new(dir, Duration::ZERO).unwrap();
        forever.open("run").unwrap();
        assert_eq!(forever.get("run", URL), Some(json!(1)));
    }

    #[test]
    fn test_file_cache_clear() {
        let temp_dir = TempDir::new().unwrap();
        let mut cache =
            JsonFileCache::new(temp_dir.path().to_path_buf(), Duration::from_secs(60)).unwrap();
        cache.put("run", URL, json!(true)).unwrap();
        cache.put("keep", URL, json!(false)).unwrap();
        cache.flush("run").unwrap();
        cache.flush("keep").unwrap();

        cache.clear("run").unwrap();
        assert!(!cache.file_path("run").exists());
        assert_eq!(cache.get("run", URL), None);
        assert_eq!(cache.get("keep", URL), Some(json!(false)));

        // Nothing left to write for a cleared key
        cache.flush("run").unwrap();
        assert!(!cache.file_path("run").exists());
    }

    #[test]
    fn test_file_cache_writes_only_on_flush() {
        let temp_dir = TempDir::new().unwrap();
        let mut cache =
            JsonFileCache::new(temp_dir.path().to_path_buf(), Duration::from_secs(60)).unwrap();
        cache.open("run").unwrap();

        cache.put("run", URL, json!(1)).unwrap();
        cache.put("run", "https://prime.local/other", json!(2)).unwrap();
        assert!(!cache.file_path("run").exists());
        assert_eq!(cache.get("run", URL), Some(json!(1)));

        cache.flush("run").unwrap();
        let on_disk = JsonFileCache::read_file(&cache.file_path("run")).unwrap();
        assert_eq!(on_disk.entries.len(), 2);

        // A clean key is not rewritten
        std::fs::remove_file(cache.file_path("run")).unwrap();
        cache.flush("run").unwrap();
        assert!(!cache.file_path("run").exists());
    }

    #[test]
    fn test_file_cache_reads_from_open_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().to_path_buf();

        let mut seed = JsonFileCache::new(dir.clone(), Duration::from_secs(3600)).unwrap();
        seed.put("run", URL, json!("first")).unwrap();
        seed.flush("run").unwrap();

        let mut reader = JsonFileCache::new(dir.clone(), Duration::from_secs(3600)).unwrap();
        reader.open("run").unwrap();

        // Another process rewrites the file after the reader opened it
        let mut writer = JsonFileCache::new(dir.clone(), Duration::from_secs(3600)).unwrap();
        writer.open("run").unwrap();
        writer.put("run", URL, json!("second")).unwrap();
        writer.flush("run").unwrap();

        assert_eq!(reader.get("run", URL), Some(json!("first")));
        std::fs::remove_file(reader.file_path("run")).unwrap();
        assert_eq!(reader.get("run", URL), Some(json!("first")));
    }

    #[test]
    fn test_cache_key_for_path() {
        let a = cache_key_for_path("ciscoprime", Path::new("/etc/prime.toml"));
        let b = cache_key_for_path("ciscoprime", Path::new("/etc/prime.toml"));
        let c = cache_key_for_path("ciscoprime", Path::new("/etc/other.toml"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("ciscoprime_"));
        assert_eq!(a.len(), "ciscoprime_".len() + 16);
    }

    #[test]
    fn test_sha256() {
        let data = b"hello world";
        let hash = sha256_hex(data);
        assert_eq!(hash, "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9");
    }
}
