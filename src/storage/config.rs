// Copyright 2022 Adobe. All rights reserved.
// This file is licensed to you under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License. You may obtain a copy
// of the License at http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under
// the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR REPRESENTATIONS
// OF ANY KIND, either express or implied. See the License for the specific language
// governing permissions and limitations under the License.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use super::error::StorageError;
use crate::util::retry::RetryConfig;

/// Option keys consumed by the connection and retry layers rather than by a backend builder.
pub(crate) const TRANSPORT_OPTION_KEYS: [&str; 9] = [
    "timeout",
    "connect_timeout",
    "max_retries",
    "retry_timeout",
    "pool_idle_timeout",
    "pool_max_idle_per_host",
    "retry_max_attempts",
    "retry_initial_delay_ms",
    "retry_backoff",
];

/// Storage adapter type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// Local filesystem, ids are paths
    Local,
    /// AWS S3 storage
    Aws,
    /// Azure Data Lake Storage
    Azure,
    /// Google Cloud Storage
    Gcs,
    /// In-process object store, mostly useful for tests
    Memory,
    /// Google Drive (v3 REST API)
    Drive,
}

impl FromStr for StorageType {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(StorageType::Local),
            "aws" | "s3" => Ok(StorageType::Aws),
            "azure" => Ok(StorageType::Azure),
            "gcs" | "gcp" => Ok(StorageType::Gcs),
            "memory" => Ok(StorageType::Memory),
            "drive" | "gdrive" => Ok(StorageType::Drive),
            _ => Err(StorageError::ConfigError(format!(
                "Unknown storage type: {}",
                s
            ))),
        }
    }
}

/// Generic configuration for storage adapters
///
/// Provider-specific options are kept in a flat string map and interpreted by
/// the adapter that gets built from the configuration.
///
/// # Examples
///
/// ## Local filesystem
/// ```
/// use infra_io::storage::StorageConfig;
///
/// let config = StorageConfig::local();
/// ```
///
/// ## AWS S3
/// ```
/// use infra_io::storage::StorageConfig;
///
/// let config = StorageConfig::new("s3")
///     .with_option("bucket", "my-bucket")
///     .with_option("region", "us-east-1");
/// ```
///
/// ## Google Drive
/// ```
/// use infra_io::storage::StorageConfig;
///
/// let config = StorageConfig::drive()
///     .with_option("refresh_token", "REFRESH_TOKEN")
///     .with_option("client_secret_path", "/path/to/web_client.json");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage adapter type
    #[serde(rename = "type")]
    pub storage_type: StorageType,

    /// Provider-specific configuration options
    ///
    /// Common options:
    /// - timeout, connect_timeout: HTTP timeouts in seconds
    /// - retry_max_attempts, retry_initial_delay_ms, retry_backoff: transient retry policy
    ///
    /// AWS S3: bucket, region, access_key_id, secret_access_key, session_token, endpoint, allow_http
    ///
    /// Azure: container, account_name, access_key, sas_token, tenant_id, client_id, client_secret
    ///
    /// GCS: bucket, service_account_key_path, service_account_key
    ///
    /// Drive:
    /// - access_token: a ready bearer token
    /// - refresh_token + client_id + client_secret, or refresh_token + client_secret_path
    /// - token_url: OAuth token endpoint override
    /// - api_base_url: API root override (defaults to https://www.googleapis.com)
    /// - chunk_size: download chunk size in bytes
    #[serde(default)]
    pub options: HashMap<String, String>,
}

impl StorageConfig {
    /// Create a new storage configuration.
    ///
    /// # Panics
    ///
    /// Panics on an unknown storage type name. Use `StorageType::from_str` to
    /// handle the error instead.
    pub fn new(storage_type: impl Into<String>) -> Self {
        let storage_type_str = storage_type.into();
        let storage_type = match StorageType::from_str(&storage_type_str) {
            Ok(storage_type) => storage_type,
            Err(_) => panic!("Unknown storage type: {}", storage_type_str),
        };

        Self::of_type(storage_type)
    }

    /// Create a configuration for the given type with the default option set.
    pub fn of_type(storage_type: StorageType) -> Self {
        Self {
            storage_type,
            options: Self::default_options(),
        }
    }

    pub fn local() -> Self {
        Self::of_type(StorageType::Local)
    }

    pub fn aws() -> Self {
        Self::of_type(StorageType::Aws)
    }

    pub fn azure() -> Self {
        Self::of_type(StorageType::Azure)
    }

    /// GCS picks up its own defaults, so no options are preset.
    pub fn gcs() -> Self {
        Self {
            storage_type: StorageType::Gcs,
            options: HashMap::new(),
        }
    }

    pub fn memory() -> Self {
        Self::of_type(StorageType::Memory)
    }

    pub fn drive() -> Self {
        Self::of_type(StorageType::Drive)
    }

    /// Get default options for all storage types.
    pub fn default_options() -> HashMap<String, String> {
        [
            ("timeout", "1200"),
            ("connect_timeout", "30"),
            ("max_retries", "20"),
            ("retry_timeout", "1200"),
            ("pool_idle_timeout", "15"),
            ("pool_max_idle_per_host", "5"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    /// Add a configuration option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Add multiple configuration options.
    pub fn with_options(mut self, options: HashMap<String, String>) -> Self {
        self.options.extend(options);
        self
    }

    /// Get a configuration option.
    pub fn get_option(&self, key: &str) -> Option<&String> {
        self.options.get(key)
    }

    /// Get a required option or a `ConfigError` naming it.
    pub fn require_option(&self, key: &str) -> Result<&String, StorageError> {
        self.get_option(key).ok_or_else(|| {
            StorageError::ConfigError(format!(
                "{} storage requires '{}' option",
                self.storage_type_str(),
                key
            ))
        })
    }

    /// Parse an option, falling back to `None` when absent or malformed.
    pub fn parsed_option<T: FromStr>(&self, key: &str) -> Option<T> {
        self.get_option(key).and_then(|v| v.parse::<T>().ok())
    }

    /// Read an option holding a number of seconds.
    ///
    /// `"0"` and `"disabled"` yield `Some(None)`, meaning the timeout is switched off.
    pub fn duration_option(&self, key: &str) -> Option<Option<Duration>> {
        let value = self.get_option(key)?;
        if value == "0" || value == "disabled" {
            return Some(None);
        }
        value.parse::<u64>().ok().map(|s| Some(Duration::from_secs(s)))
    }

    /// Transient retry policy described by the `retry_*` options.
    pub fn retry_config(&self) -> RetryConfig {
        let default_config = RetryConfig::default();
        RetryConfig {
            max_attempts: self
                .parsed_option("retry_max_attempts")
                .unwrap_or(default_config.max_attempts),
            initial_delay: self
                .parsed_option::<u64>("retry_initial_delay_ms")
                .map(Duration::from_millis)
                .unwrap_or(default_config.initial_delay),
            backoff: self
                .parsed_option::<f64>("retry_backoff")
                .filter(|b| b.is_finite() && *b > 0.0)
                .unwrap_or(default_config.backoff),
            max_delay: default_config.max_delay,
        }
    }

    /// Get the storage type as a string.
    pub fn storage_type_str(&self) -> &str {
        match self.storage_type {
            StorageType::Local => "local",
            StorageType::Aws => "aws",
            StorageType::Azure => "azure",
            StorageType::Gcs => "gcs",
            StorageType::Memory => "memory",
            StorageType::Drive => "drive",
        }
    }
}
