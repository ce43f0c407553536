//! Cached JSON fetcher
//!
//! Within one run a URL goes to the network at most once while caching is
//! enabled; later reads come from the cache. A forced update clears the
//! run's cache key once, when the fetcher is created, before any lookup.
//! The key is opened at creation and written back by [`CachedFetcher::flush`].

use prime_core::{CacheError, ResponseCache};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::error::FetchError;
use crate::transport::Transport;

/// Cache behaviour for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheSettings {
    /// Serve repeated URLs from the cache
    pub enabled: bool,
    /// Discard cached entries for this run's key before fetching
    pub force_update: bool,
}

pub struct CachedFetcher<T, C> {
    transport: T,
    cache: C,
    cache_key: String,
    use_cache: bool,
    network_calls: usize,
}

impl<T: Transport, C: ResponseCache> CachedFetcher<T, C> {
    pub fn new(transport: T, mut cache: C, cache_key: impl Into<String>, settings: CacheSettings) -> Self {
        let cache_key = cache_key.into();

        if settings.force_update {
            debug!(cache_key = %cache_key, "Forced cache update, clearing cached responses");
            if let Err(e) = cache.clear(&cache_key) {
                warn!(cache_key = %cache_key, error = %e, "Failed to clear response cache");
            }
        }
        if let Err(e) = cache.open(&cache_key) {
            warn!(cache_key = %cache_key, error = %e, "Failed to open response cache");
        }

        Self {
            transport,
            cache,
            cache_key,
            use_cache: settings.enabled,
            network_calls: 0,
        }
    }

    /// Fetch `url` as JSON, from the cache when possible
    pub fn fetch(&mut self, url: &str) -> Result<Value, FetchError> {
        if self.use_cache {
            if let Some(value) = self.cache.get(&self.cache_key, url) {
                trace!(url = %url, "Cache hit");
                return Ok(value);
            }
        }
        trace!(url = %url, use_cache = self.use_cache, "Cache miss or cache disabled");

        self.network_calls += 1;
        let response = self.transport.get(url)?;
        if !response.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status,
            });
        }

        let value: Value =
            serde_json::from_str(&response.body).map_err(|source| FetchError::Decode {
                url: url.to_string(),
                source,
            })?;

        if let Err(e) = self.cache.put(&self.cache_key, url, value.clone()) {
            warn!(url = %url, error = %e, "Failed to cache response");
        }

        Ok(value)
    }

    /// Write this run's responses to the cache backend
    pub fn flush(&mut self) -> Result<(), CacheError> {
        self.cache.flush(&self.cache_key)
    }

    /// Number of requests that went to the network
    pub fn network_calls(&self) -> usize {
        self.network_calls
    }

    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }
}
