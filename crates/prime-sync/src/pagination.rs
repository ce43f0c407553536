//! Prime `queryResponse` envelopes and `firstResult`/`maxResults` paging
//!
//! Every list endpoint answers with
//! `{"queryResponse": {"@count": n, "@last": i, "entity": [...]}}`.
//! Pages are requested from `firstResult=0` and then from `@last + 1`
//! until `@last + 1 >= @count`. A page whose `@last` does not reach the
//! requested offset would repeat forever and is rejected, as is an `@last`
//! with no representable successor.

use prime_core::ResponseCache;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::FetchError;
use crate::fetcher::CachedFetcher;
use crate::transport::Transport;

fn no_rows() -> i64 {
    -1
}

/// One page of a list query
#[derive(Debug, Clone, Deserialize)]
pub struct QueryPage {
    /// Total rows available
    #[serde(rename = "@count", default)]
    pub count: i64,
    /// Index of the last row in this page
    #[serde(rename = "@last", default = "no_rows")]
    pub last: i64,
    /// Rows in this page
    #[serde(default)]
    pub entity: Vec<Value>,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "queryResponse")]
    query_response: QueryPage,
}

impl QueryPage {
    /// Extract the page from a response body
    pub fn from_response(url: &str, body: Value) -> Result<Self, FetchError> {
        let envelope: Envelope =
            serde_json::from_value(body).map_err(|source| FetchError::Envelope {
                url: url.to_string(),
                source,
            })?;
        Ok(envelope.query_response)
    }
}

/// Fetch a single page
pub fn fetch_page<T: Transport, C: ResponseCache>(
    fetcher: &mut CachedFetcher<T, C>,
    url: &str,
) -> Result<QueryPage, FetchError> {
    let body = fetcher.fetch(url)?;
    QueryPage::from_response(url, body)
}

/// Fetch and concatenate every page, building each URL from its `firstResult`
pub fn fetch_all_pages<T, C, F>(
    fetcher: &mut CachedFetcher<T, C>,
    page_url: F,
) -> Result<Vec<Value>, FetchError>
where
    T: Transport,
    C: ResponseCache,
    F: Fn(i64) -> String,
{
    let mut rows = Vec::new();
    let mut first_result = 0;

    loop {
        let url = page_url(first_result);
        let page = fetch_page(fetcher, &url)?;
        let (count, last) = (page.count, page.last);

        rows.extend(page.entity);
        debug!(
            first_result = first_result,
            last = last,
            count = count,
            received = rows.len(),
            "Fetched page"
        );

        let stalled = |url| FetchError::PaginationStalled {
            url,
            first_result,
            last,
            count,
        };
        // An `@last` at the top of the range has no next offset
        let Some(next) = last.checked_add(1) else {
            return Err(stalled(url));
        };
        if next >= count {
            break;
        }
        if last < first_result {
            return Err(stalled(url));
        }
        first_result = next;
    }

    Ok(rows)
}
