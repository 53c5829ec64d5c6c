// Copyright 2025 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.
//
// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

//! Bounded parallel download of plain URLs.
//!
//! Failures are soft: a URL that cannot be fetched yields `None` instead of
//! failing the whole call.

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::storage::error::{ApiFailure, StorageError, StorageResult};
use crate::util::retry::{retry_transient, RetryConfig};

/// Response statuses worth another attempt.
pub const RETRYABLE_STATUS_CODES: [u16; 7] = [408, 425, 429, 500, 502, 503, 504];

/// Default concurrency: `min(32, cpus + 4)`.
pub fn default_max_workers() -> usize {
    (num_cpus::get() + 4).min(32)
}

/// Download every URL with at most `max_workers` requests in flight.
///
/// Results arrive in completion order, not input order; use
/// [`download_all_indexed`] to realign them.
pub async fn download_all(
    client: &reqwest::Client,
    urls: &[String],
    max_workers: Option<usize>,
    retry: &RetryConfig,
) -> Vec<Option<Vec<u8>>> {
    download_all_indexed(client, urls, max_workers, retry)
        .await
        .into_iter()
        .map(|(_, bytes)| bytes)
        .collect()
}

/// Like [`download_all`], pairing each result with the index of its URL.
pub async fn download_all_indexed(
    client: &reqwest::Client,
    urls: &[String],
    max_workers: Option<usize>,
    retry: &RetryConfig,
) -> Vec<(usize, Option<Vec<u8>>)> {
    let parallelism = max_workers.unwrap_or_else(default_max_workers).max(1);

    let results: Vec<(usize, Option<Vec<u8>>)> = stream::iter(urls.iter().enumerate())
        .map(|(index, url)| async move {
            let bytes = match download_one(client, url, retry).await {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    warn!("Giving up on url={}, error={}", url, e);
                    None
                }
            };
            (index, bytes)
        })
        .buffer_unordered(parallelism)
        .collect()
        .await;

    info!(
        "Downloaded count={} of urls={}, parallelism={}",
        results.iter().filter(|(_, bytes)| bytes.is_some()).count(),
        urls.len(),
        parallelism
    );
    results
}

async fn download_one(
    client: &reqwest::Client,
    url: &str,
    retry: &RetryConfig,
) -> StorageResult<Vec<u8>> {
    retry_transient(retry, &format!("download({})", url), move || async move {
        let response = client
            .get(url)
            .send()
            .await
            .map_err(fetch_error)?;

        let status = response.status().as_u16();
        if status == 200 {
            let bytes = response
                .bytes()
                .await
                .map_err(fetch_error)?;
            return Ok(bytes.to_vec());
        }

        let failure = ApiFailure::new(status, None, format!("GET {}", url));
        if RETRYABLE_STATUS_CODES.contains(&status) {
            Err(StorageError::Transient(failure.to_string()))
        } else {
            Err(StorageError::Api {
                operation: "download".to_string(),
                id: url.to_string(),
                failure,
            })
        }
    })
    .await
}

/// Only network level failures are retried; a URL that cannot be built never will be.
fn fetch_error(error: reqwest::Error) -> StorageError {
    if error.is_timeout() || error.is_connect() || error.is_request() || error.is_body() {
        StorageError::Transient(error.to_string())
    } else {
        StorageError::RequestError(error)
    }
}
