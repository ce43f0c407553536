//! Typed access to the Prime `data` endpoints

use prime_core::{CacheError, GroupIndex, RemoteDevice, ResponseCache};
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::fetcher::CachedFetcher;
use crate::pagination::{fetch_all_pages, fetch_page};
use crate::transport::Transport;

/// Prime's own default page size
pub const DEFAULT_MAX_RESULTS: u32 = 1000;

fn devices_url(endpoint: &str, max_results: u32, first_result: i64) -> String {
    format!(
        "{}/data/Devices.json?.full=true&.maxResults={}&.firstResult={}",
        endpoint, max_results, first_result
    )
}

fn groups_url(endpoint: &str, max_results: u32, first_result: i64) -> String {
    format!(
        "{}/data/GroupSpecification.json?.full=true&.maxResults={}&.firstResult={}",
        endpoint, max_results, first_result
    )
}

/// Group-scoped device query; the path is percent-encoded as one query value
pub(crate) fn group_devices_url(endpoint: &str, group_path: &str) -> String {
    let group = format!("/{}", group_path);
    format!(
        "{}/data/Devices.json?.group={}&.full=true",
        endpoint,
        urlencoding::encode(&group)
    )
}

/// Prime API client on top of a cached fetcher
pub struct PrimeClient<T, C> {
    fetcher: CachedFetcher<T, C>,
    /// API base, e.g. `https://prime.local/webacs/api/v4`
    endpoint: String,
    max_results: u32,
}

impl<T: Transport, C: ResponseCache> PrimeClient<T, C> {
    pub fn new(fetcher: CachedFetcher<T, C>, endpoint: &str, max_results: u32) -> Self {
        Self {
            fetcher,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            max_results: max_results.max(1),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn fetcher(&self) -> &CachedFetcher<T, C> {
        &self.fetcher
    }

    /// Persist every response fetched so far
    pub fn flush_cache(&mut self) -> Result<(), CacheError> {
        self.fetcher.flush()
    }

    /// Load every device group into an id-keyed index
    pub fn load_groups(&mut self) -> Result<GroupIndex, SyncError> {
        info!("Getting device groups from Prime");
        let endpoint = &self.endpoint;
        let max_results = self.max_results;
        let rows = fetch_all_pages(&mut self.fetcher, |first| {
            groups_url(endpoint, max_results, first)
        })?;

        let index = GroupIndex::from_entities(&rows)?;
        info!(groups = index.len(), "Loaded device groups");
        Ok(index)
    }

    /// Load the full device list, unfiltered
    pub fn load_devices(&mut self) -> Result<Vec<RemoteDevice>, SyncError> {
        info!("Getting devices from Prime");
        let endpoint = &self.endpoint;
        let max_results = self.max_results;
        let rows = fetch_all_pages(&mut self.fetcher, |first| {
            devices_url(endpoint, max_results, first)
        })?;

        let devices = rows
            .iter()
            .map(RemoteDevice::from_entity)
            .collect::<Result<Vec<_>, _>>()?;
        info!(devices = devices.len(), "Loaded devices");
        Ok(devices)
    }

    /// Devices that belong to the group at `group_path`
    ///
    /// Issues a single request; groups are expected to fit in one response.
    pub fn devices_in_group(&mut self, group_path: &str) -> Result<Vec<RemoteDevice>, SyncError> {
        let url = group_devices_url(&self.endpoint, group_path);
        let page = fetch_page(&mut self.fetcher, &url)?;

        if page.count <= 0 {
            return Ok(Vec::new());
        }
        if (page.entity.len() as i64) < page.count {
            warn!(
                group = %group_path,
                count = page.count,
                returned = page.entity.len(),
                "Group membership response is truncated"
            );
        }
        debug!(group = %group_path, count = page.count, "Fetched group members");

        Ok(page
            .entity
            .iter()
            .map(RemoteDevice::from_entity)
            .collect::<Result<Vec<_>, _>>()?)
    }
}
