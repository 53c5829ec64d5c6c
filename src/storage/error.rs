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

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde_json::Value;
use thiserror::Error;

use crate::util::retry::Transient;

/// Drive API error reasons that signal a transient rate limit.
pub const RATE_LIMIT_REASONS: [&str; 2] = ["userRateLimitExceeded", "rateLimitExceeded"];

/// Substrings of transport error descriptions that are worth retrying.
const CONNECTION_ERROR_MARKERS: [&str; 4] =
    ["ConnectionReset", "BrokenPipe", "Interrupted", "TimedOut"];

/// A single failed call reported by the remote drive API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFailure {
    /// HTTP status of the failed call (0 when the call produced no response at all)
    pub status: u16,

    /// Provider-specific reason code, e.g. `userRateLimitExceeded`
    pub reason: Option<String>,

    /// Human readable message
    pub message: String,
}

impl ApiFailure {
    pub fn new(status: u16, reason: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.map(str::to_string),
            message: message.into(),
        }
    }

    /// Build a failure from a response status and body.
    ///
    /// Google style error bodies (`{"error": {"message", "errors": [{"reason"}]}}`)
    /// are decoded; anything else is kept verbatim as the message.
    pub fn from_body(status: u16, body: &str) -> Self {
        let parsed: Option<Value> = serde_json::from_str(body).ok();
        let error = parsed.as_ref().and_then(|v| v.get("error"));

        let reason = error
            .and_then(|e| e.get("errors"))
            .and_then(|errors| errors.get(0))
            .and_then(|first| first.get("reason"))
            .and_then(Value::as_str)
            .or_else(|| error.and_then(|e| e.get("status")).and_then(Value::as_str));

        let message = error
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    format!("HTTP {}", status)
                } else {
                    trimmed.to_string()
                }
            });

        Self::new(status, reason, message)
    }

    /// Placeholder for a sub-request the batch response did not answer.
    pub fn missing(index: usize) -> Self {
        Self::new(0, None, format!("no response for batch item {}", index))
    }

    /// Whether this failure is the provider telling us to slow down.
    pub fn is_rate_limit(&self) -> bool {
        self.status == 429
            || self
                .reason
                .as_deref()
                .map(|r| RATE_LIMIT_REASONS.contains(&r))
                .unwrap_or(false)
    }
}

impl Display for ApiFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.reason {
            Some(reason) => write!(f, "HTTP {} ({}): {}", self.status, reason, self.message),
            None => write!(f, "HTTP {}: {}", self.status, self.message),
        }
    }
}

fn format_failures(failures: &[ApiFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Not found: {id}")]
    NotFound { id: String },

    #[error("Integrity error: '{id}' has {parent_count} parent folders, expected exactly one")]
    Integrity { id: String, parent_count: usize },

    #[error("Transient error: {0}")]
    Transient(String),

    #[error("Batch request failed:\n{}", format_failures(.0))]
    BatchFailure(Vec<ApiFailure>),

    #[error("API error in {operation}({id}): {failure}")]
    Api {
        operation: String,
        id: String,
        failure: ApiFailure,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Object store error: {0}")]
    ObjectStoreError(#[from] object_store::Error),

    #[error("Request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),
}

impl StorageError {
    /// Map an IO error on `id` to `NotFound` when the path does not exist.
    pub(crate) fn from_io(error: std::io::Error, id: &str) -> Self {
        if error.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound { id: id.to_string() }
        } else {
            StorageError::IoError(error)
        }
    }

    /// Map an object store error on `id` to `NotFound` when the key does not exist.
    pub(crate) fn from_object_store(error: object_store::Error, id: &str) -> Self {
        match error {
            object_store::Error::NotFound { .. } => StorageError::NotFound { id: id.to_string() },
            e => StorageError::ObjectStoreError(e),
        }
    }

    /// Classify a failed single call against the drive API.
    pub(crate) fn from_api_failure(operation: &str, id: &str, failure: ApiFailure) -> Self {
        if failure.is_rate_limit() {
            StorageError::Transient(format!("{}({}): {}", operation, id, failure))
        } else if failure.status == 404 {
            StorageError::NotFound { id: id.to_string() }
        } else {
            StorageError::Api {
                operation: operation.to_string(),
                id: id.to_string(),
                failure,
            }
        }
    }
}

impl Transient for StorageError {
    fn is_transient(&self) -> bool {
        match self {
            StorageError::Transient(_) => true,
            StorageError::ObjectStoreError(e) => {
                let error_msg = format!("{:?}", e);
                CONNECTION_ERROR_MARKERS
                    .iter()
                    .any(|marker| error_msg.contains(marker))
            }
            StorageError::IoError(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
