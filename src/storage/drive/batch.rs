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

//! Batched calls against the drive API.
//!
//! Requests are sent as `multipart/mixed` round trips to the batch endpoint.
//! Each submitted request gets its own `BatchOutcome`, matched back to its
//! position through the part's `Content-ID`.

use regex::Regex;
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};
use uuid::Uuid;

use super::api::{api_url, transport_error, ApiRequest, MAX_BATCH_SIZE};
use super::auth::TokenSource;
use crate::storage::error::{ApiFailure, StorageError, StorageResult};
use crate::util::retry::{retry_transient, RetryConfig};

/// Result of one request inside a batch.
pub type BatchOutcome = Result<Value, ApiFailure>;

const CONTENT_ID_PATTERN: &str = r"(?i)content-id:\s*<?response-item-(\d+)>?";

fn content_id_regex() -> &'static Regex {
    static CONTENT_ID: OnceLock<Regex> = OnceLock::new();
    CONTENT_ID.get_or_init(|| Regex::new(CONTENT_ID_PATTERN).expect("valid Content-ID pattern"))
}

/// Sends groups of API requests as batch round trips.
pub struct BatchExecutor {
    client: reqwest::Client,
    tokens: Arc<dyn TokenSource>,
    batch_url: String,
    retry: RetryConfig,
    max_batch_size: usize,
}

impl BatchExecutor {
    pub fn new(
        client: reqwest::Client,
        tokens: Arc<dyn TokenSource>,
        api_base_url: &str,
        retry: RetryConfig,
    ) -> StorageResult<Self> {
        let batch_url = api_url(api_base_url, &["batch", "drive", "v3"])?.to_string();
        Ok(Self {
            client,
            tokens,
            batch_url,
            retry,
            max_batch_size: MAX_BATCH_SIZE,
        })
    }

    /// Lower the number of requests per round trip. Values above the provider limit are capped.
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size.clamp(1, MAX_BATCH_SIZE);
        self
    }

    /// Send every request and return one outcome per request, in submission order.
    pub async fn execute(&self, requests: &[ApiRequest]) -> StorageResult<Vec<BatchOutcome>> {
        let mut outcomes = Vec::with_capacity(requests.len());
        for chunk in requests.chunks(self.max_batch_size) {
            outcomes.extend(self.execute_round_trip(chunk).await?);
        }
        Ok(outcomes)
    }

    /// Execute and collect, retrying the whole batch on transient failures.
    pub async fn run(&self, operation_name: &str, requests: &[ApiRequest]) -> StorageResult<Vec<Value>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        retry_transient(&self.retry, operation_name, move || async move {
            let outcomes = self.execute(requests).await?;
            collect_batch(outcomes)
        })
        .await
    }

    async fn execute_round_trip(&self, requests: &[ApiRequest]) -> StorageResult<Vec<BatchOutcome>> {
        let boundary = format!("batch_{}", Uuid::new_v4().simple());
        let body = encode_batch_body(&boundary, requests)?;
        let token = self.tokens.access_token().await?;

        debug!(
            "Sending batch of count={} requests to url={}",
            requests.len(),
            self.batch_url
        );

        let response = self
            .client
            .post(&self.batch_url)
            .bearer_auth(token)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/mixed; boundary={}", boundary),
            )
            .body(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_default();
        let text = response.text().await.map_err(transport_error)?;

        if !(200..300).contains(&status) {
            return Err(StorageError::from_api_failure(
                "batch",
                &self.batch_url,
                ApiFailure::from_body(status, &text),
            ));
        }

        let response_boundary = boundary_from_content_type(&content_type).ok_or_else(|| {
            StorageError::InvalidResponse(format!(
                "batch response is not multipart: content-type='{}'",
                content_type
            ))
        })?;

        Ok(parse_batch_response(&response_boundary, &text, requests.len()))
    }
}

/// Reduce per-request outcomes to values, or a single error.
///
/// Any rate-limit failure makes the whole batch transient; otherwise all
/// failures are reported together.
pub fn collect_batch(outcomes: Vec<BatchOutcome>) -> StorageResult<Vec<Value>> {
    let mut values = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();

    for outcome in outcomes {
        match outcome {
            Ok(value) => values.push(value),
            Err(failure) => failures.push(failure),
        }
    }

    if failures.is_empty() {
        return Ok(values);
    }

    if let Some(rate_limited) = failures.iter().find(|f| f.is_rate_limit()) {
        warn!(
            "Batch rate limited, failures={} of requests={}",
            failures.len(),
            values.len() + failures.len()
        );
        return Err(StorageError::Transient(format!(
            "batch rate limited: {}",
            rate_limited
        )));
    }

    Err(StorageError::BatchFailure(failures))
}

/// Serialize requests into a `multipart/mixed` batch body.
pub(crate) fn encode_batch_body(boundary: &str, requests: &[ApiRequest]) -> StorageResult<String> {
    let mut body = String::new();

    for (index, request) in requests.iter().enumerate() {
        body.push_str(&format!("--{}\r\n", boundary));
        body.push_str("Content-Type: application/http\r\n");
        body.push_str(&format!("Content-ID: <item-{}>\r\n\r\n", index));
        body.push_str(&format!(
            "{} {} HTTP/1.1\r\n",
            request.method,
            request.path_and_query()
        ));

        match &request.body {
            Some(json) => {
                let payload = serde_json::to_string(json)?;
                body.push_str("Content-Type: application/json; charset=UTF-8\r\n");
                body.push_str(&format!("Content-Length: {}\r\n\r\n", payload.len()));
                body.push_str(&payload);
                body.push_str("\r\n");
            }
            None => body.push_str("\r\n"),
        }
    }

    body.push_str(&format!("--{}--\r\n", boundary));
    Ok(body)
}

pub(crate) fn boundary_from_content_type(content_type: &str) -> Option<String> {
    if !content_type.to_ascii_lowercase().starts_with("multipart/") {
        return None;
    }

    content_type
        .split(';')
        .map(str::trim)
        .find_map(|param| {
            let (key, value) = param.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("boundary")
                .then(|| value.trim().trim_matches('"').to_string())
        })
}

/// Split a batch response into `expected` outcomes.
///
/// Parts are placed by their `Content-ID`; a request with no matching part
/// gets `ApiFailure::missing`.
pub(crate) fn parse_batch_response(boundary: &str, body: &str, expected: usize) -> Vec<BatchOutcome> {
    let mut outcomes: Vec<Option<BatchOutcome>> = vec![None; expected];
    let normalized = body.replace("\r\n", "\n");
    let delimiter = format!("--{}", boundary);

    for (position, part) in normalized.split(delimiter.as_str()).skip(1).enumerate() {
        if part.starts_with("--") {
            break;
        }

        let Some((part_headers, http_response)) = part.trim_start_matches('\n').split_once("\n\n") else {
            continue;
        };

        let index = content_id_regex()
            .captures(part_headers)
            .and_then(|c| c[1].parse::<usize>().ok())
            .unwrap_or(position);

        if index >= expected {
            warn!("Ignoring batch part with out of range index={}", index);
            continue;
        }

        outcomes[index] = Some(parse_http_response(http_response));
    }

    outcomes
        .into_iter()
        .enumerate()
        .map(|(index, outcome)| outcome.unwrap_or_else(|| Err(ApiFailure::missing(index))))
        .collect()
}

/// Parse one embedded `HTTP/1.1 <status> ...` response.
fn parse_http_response(http_response: &str) -> BatchOutcome {
    let (head, payload) = http_response
        .split_once("\n\n")
        .unwrap_or((http_response, ""));

    let status = head
        .lines()
        .next()
        .and_then(|status_line| status_line.split_whitespace().nth(1))
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| ApiFailure::new(0, None, format!("malformed batch part: {}", head)))?;

    let payload = payload.trim();
    if !(200..300).contains(&status) {
        return Err(ApiFailure::from_body(status, payload));
    }

    if payload.is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(payload)
        .map_err(|e| ApiFailure::new(status, None, format!("invalid JSON in batch part: {}", e)))
}

/// Body of a batch response answering each item with `(status, json)`.
#[cfg(test)]
pub(crate) fn batch_response_body(boundary: &str, parts: &[(u16, Value)]) -> String {
    let mut body = String::new();
    for (index, (status, json)) in parts.iter().enumerate() {
        body.push_str(&format!(
            "--{}\r\nContent-Type: application/http\r\nContent-ID: <response-item-{}>\r\n\r\n",
            boundary, index
        ));
        body.push_str(&format!(
            "HTTP/1.1 {} X\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{}\r\n",
            status, json
        ));
    }
    body.push_str(&format!("--{}--\r\n", boundary));
    body
}
