//! Prime Sync - Cisco Prime API client and inventory synchronization
//!
//! This crate drives a full inventory run:
//! - [`Transport`] performs authenticated GET requests
//! - [`CachedFetcher`] serves each URL from the response cache or the network
//! - [`pagination`] walks `firstResult`/`maxResults` pages
//! - [`PrimeClient`] loads groups, devices and group members
//! - [`sync::populate`] assembles everything into an inventory store

pub mod api;
pub mod error;
pub mod fetcher;
pub mod pagination;
pub mod sync;
pub mod transport;

#[cfg(test)]
mod mock;

pub use api::PrimeClient;
pub use error::{FetchError, SyncError};
pub use fetcher::{CacheSettings, CachedFetcher};
pub use sync::{populate, SyncOptions, SyncReport};
pub use transport::{BasicAuthTransport, HttpResponse, HttpSettings, Transport};
