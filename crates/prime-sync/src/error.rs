//! Error types for fetching and synchronization

use prime_core::{InventoryError, ModelError};
use thiserror::Error;

/// Errors that abort a run while talking to Prime
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Got unexpected HTTP code {status} when sending GET request {url}")]
    Status { url: String, status: u16 },
    #[error("GET request {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("Response from {url} is not valid JSON: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Response from {url} has no usable queryResponse envelope: {source}")]
    Envelope {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(
        "Pagination stalled at {url}: requested firstResult={first_result} \
         but got @last={last} of @count={count}"
    )]
    PaginationStalled {
        url: String,
        first_result: i64,
        last: i64,
        count: i64,
    },
}

/// Errors that abort an inventory run
#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("Malformed entity: {0}")]
    Model(#[from] ModelError),
    #[error("Inventory store rejected update: {0}")]
    Inventory(#[from] InventoryError),
}
