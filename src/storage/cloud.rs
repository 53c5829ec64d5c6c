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

use super::adapter::{metas_by_id, AdapterKind, FileMeta, IoAdapter};
use super::config::{StorageConfig, StorageType, TRANSPORT_OPTION_KEYS};
use super::error::{StorageError, StorageResult};
use crate::util::retry::{retry_transient, RetryConfig};
use async_trait::async_trait;
use bytes::Bytes;
use object_store::path::Path as ObjectPath;
use object_store::{
    aws::AmazonS3Builder, azure::MicrosoftAzureBuilder, gcp::GoogleCloudStorageBuilder,
    memory::InMemory, ClientOptions, ObjectMeta, ObjectStore, ObjectStoreExt, PutPayload,
    RetryConfig as StoreRetryConfig,
};
use serde_json::json;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Adapter over an object store addressed by path-like URIs.
///
/// Ids are full URIs under the store's base URL, e.g. `s3://bucket/reports/q1.csv`.
/// Folders are implicit key prefixes.
pub struct CloudPathAdapter {
    pub store: Arc<dyn ObjectStore>,
    pub base_url: String,
    retry: RetryConfig,
}

impl CloudPathAdapter {
    /// Create a cloud adapter from configuration.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the storage type is not an object store or
    /// the backend cannot be built from the given options.
    pub fn new(config: &StorageConfig) -> StorageResult<Self> {
        let (store, base_url) = Self::build_store(config)?;
        Ok(Self {
            store: Arc::from(store),
            base_url: normalize_base_url(&base_url),
            retry: config.retry_config(),
        })
    }

    /// Wrap an already built store, e.g. `InMemory` in tests.
    pub fn from_store(store: Arc<dyn ObjectStore>, base_url: impl Into<String>) -> Self {
        Self {
            store,
            base_url: normalize_base_url(&base_url.into()),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn build_store(config: &StorageConfig) -> StorageResult<(Box<dyn ObjectStore>, String)> {
        match config.storage_type {
            StorageType::Aws => Self::build_aws_store(config),
            StorageType::Azure => Self::build_azure_store(config),
            StorageType::Gcs => Self::build_gcs_store(config),
            StorageType::Memory => Ok((Box::new(InMemory::new()), "memory://".to_string())),
            StorageType::Local | StorageType::Drive => Err(StorageError::ConfigError(format!(
                "'{}' is not an object store type",
                config.storage_type_str()
            ))),
        }
    }

    fn build_connection_options(config: &StorageConfig) -> ClientOptions {
        let mut client_options = ClientOptions::default();
        match config.duration_option("timeout") {
            Some(Some(timeout)) => client_options = client_options.with_timeout(timeout),
            Some(None) => client_options = client_options.with_timeout_disabled(),
            None => (),
        }
        match config.duration_option("connect_timeout") {
            Some(Some(timeout)) => client_options = client_options.with_connect_timeout(timeout),
            Some(None) => client_options = client_options.with_connect_timeout_disabled(),
            None => (),
        }
        if let Some(Some(idle)) = config.duration_option("pool_idle_timeout") {
            client_options = client_options.with_pool_idle_timeout(idle);
        }
        if let Some(max_idle) = config.parsed_option::<usize>("pool_max_idle_per_host") {
            client_options = client_options.with_pool_max_idle_per_host(max_idle);
        }
        client_options
    }

    /// Retry settings for the store's own HTTP client.
    fn build_retry_options(config: &StorageConfig) -> StoreRetryConfig {
        let default_retry_config = StoreRetryConfig::default();
        StoreRetryConfig {
            backoff: Default::default(),
            max_retries: config
                .parsed_option("max_retries")
                .unwrap_or(default_retry_config.max_retries),
            retry_timeout: config
                .parsed_option::<u64>("retry_timeout")
                .map(Duration::from_secs)
                .unwrap_or(default_retry_config.retry_timeout),
        }
    }

    fn build_aws_store(config: &StorageConfig) -> StorageResult<(Box<dyn ObjectStore>, String)> {
        let mut builder = AmazonS3Builder::new()
            .with_client_options(Self::build_connection_options(config))
            .with_retry(Self::build_retry_options(config));
        let mut bucket: Option<&String> = None;

        for (key, value) in &config.options {
            match key.as_str() {
                "bucket" => {
                    bucket = Some(value);
                    builder = builder.with_bucket_name(value);
                }
                "region" => builder = builder.with_region(value),
                "access_key_id" => builder = builder.with_access_key_id(value),
                "secret_access_key" => builder = builder.with_secret_access_key(value),
                "session_token" | "token" => builder = builder.with_token(value),
                "endpoint" => builder = builder.with_endpoint(value),
                "allow_http" => {
                    if value.to_lowercase() == "true" {
                        builder = builder.with_allow_http(true);
                    }
                }
                k if TRANSPORT_OPTION_KEYS.contains(&k) => (),
                _ => tracing::warn!("Unknown AWS S3 option: {}", key),
            }
        }

        let bucket = bucket.ok_or_else(|| {
            StorageError::ConfigError("AWS S3 storage requires 'bucket' option".to_string())
        })?;
        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(format!("Failed to create S3 store: {}", e)))?;

        Ok((Box::new(store), format!("s3://{}", bucket)))
    }

    fn build_azure_store(config: &StorageConfig) -> StorageResult<(Box<dyn ObjectStore>, String)> {
        let account_name = config.require_option("account_name")?;
        let container = config.require_option("container")?;

        let mut builder = MicrosoftAzureBuilder::new()
            .with_client_options(Self::build_connection_options(config))
            .with_retry(Self::build_retry_options(config))
            .with_account(account_name)
            .with_container_name(container);

        for (key, value) in &config.options {
            match key.as_str() {
                "container" | "account_name" => (),
                "access_key" | "account_key" => builder = builder.with_access_key(value),
                "sas_token" => {
                    let pairs: Vec<(String, String)> = value
                        .trim_start_matches('?')
                        .split('&')
                        .filter_map(|pair| {
                            let mut parts = pair.split('=');
                            match (parts.next(), parts.next()) {
                                (Some(k), Some(v)) => Some((k.to_string(), v.to_string())),
                                _ => None,
                            }
                        })
                        .collect();
                    builder = builder.with_sas_authorization(pairs);
                }
                "tenant_id" => builder = builder.with_tenant_id(value),
                "client_id" => builder = builder.with_client_id(value),
                "client_secret" => builder = builder.with_client_secret(value),
                "endpoint" => builder = builder.with_endpoint(value.clone()),
                k if TRANSPORT_OPTION_KEYS.contains(&k) => (),
                _ => tracing::warn!("Unknown Azure option: {}", key),
            }
        }

        let store = builder.build().map_err(|e| {
            StorageError::ConfigError(format!("Failed to create Azure store: {}", e))
        })?;

        Ok((
            Box::new(store),
            format!("abfss://{}@{}.dfs.core.windows.net", container, account_name),
        ))
    }

    fn build_gcs_store(config: &StorageConfig) -> StorageResult<(Box<dyn ObjectStore>, String)> {
        let bucket = config.require_option("bucket")?;
        let mut builder = GoogleCloudStorageBuilder::new()
            .with_client_options(Self::build_connection_options(config))
            .with_retry(Self::build_retry_options(config))
            .with_bucket_name(bucket);

        for (key, value) in &config.options {
            match key.as_str() {
                "bucket" => (),
                "service_account_key_path" => builder = builder.with_service_account_path(value),
                "service_account_key" => builder = builder.with_service_account_key(value),
                k if TRANSPORT_OPTION_KEYS.contains(&k) => (),
                _ => tracing::warn!("Unknown GCS option: {}", key),
            }
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(format!("Failed to create GCS store: {}", e)))?;

        Ok((Box::new(store), format!("gs://{}", bucket)))
    }

    /// A base URL without a bucket (`memory://`) already ends in a separator.
    fn is_scheme_root(&self) -> bool {
        self.base_url.ends_with("://")
    }

    /// Resolve an id (full URI or bare key) to a key inside the store.
    pub fn object_path(&self, id: &str) -> StorageResult<ObjectPath> {
        if let Some(rest) = id.strip_prefix(&self.base_url) {
            if self.is_scheme_root() || rest.is_empty() || rest.starts_with('/') {
                return Ok(ObjectPath::from(rest.trim_matches('/')));
            }
        }

        if id.contains("://") {
            return Err(StorageError::InvalidArgument(format!(
                "'{}' is outside of store root '{}'",
                id, self.base_url
            )));
        }

        Ok(ObjectPath::from(id.trim_matches('/')))
    }

    /// Full URI of a key inside the store.
    pub fn uri_from_path(&self, path: &ObjectPath) -> String {
        if path.as_ref().is_empty() {
            self.base_url.clone()
        } else if self.is_scheme_root() {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn parent_path(path: &ObjectPath) -> Option<ObjectPath> {
        let parts: Vec<_> = path.parts().collect();
        if parts.is_empty() {
            return None;
        }
        Some(parts[..parts.len() - 1].iter().cloned().collect())
    }

    fn path_to_meta(&self, path: &ObjectPath) -> FileMeta {
        let meta = FileMeta::new(
            self.uri_from_path(path),
            path.filename().unwrap_or_default(),
        );
        match Self::parent_path(path) {
            Some(parent) => meta.with_parent_ids(vec![self.uri_from_path(&parent)]),
            None => meta,
        }
    }

    fn object_to_meta(&self, object: &ObjectMeta) -> FileMeta {
        self.path_to_meta(&object.location).with_raw(json!({
            "is_dir": false,
            "size": object.size,
            "last_modified": object.last_modified.to_rfc3339(),
            "e_tag": object.e_tag,
        }))
    }
}

fn normalize_base_url(base_url: &str) -> String {
    if base_url.ends_with("://") {
        base_url.to_string()
    } else {
        base_url.trim_end_matches('/').to_string()
    }
}

#[async_trait]
impl IoAdapter for CloudPathAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::CloudPath
    }

    async fn list_dir_contents(&self, folder_id: &str) -> StorageResult<HashMap<String, FileMeta>> {
        let folder = self.object_path(folder_id)?;
        let prefix = if folder.as_ref().is_empty() {
            None
        } else {
            Some(&folder)
        };
        let store = &self.store;

        let list_result = retry_transient(
            &self.retry,
            &format!("list_dir_contents({})", folder_id),
            move || async move {
                store
                    .list_with_delimiter(prefix)
                    .await
                    .map_err(StorageError::from)
            },
        )
        .await?;

        let objects = list_result.objects.iter().map(|o| self.object_to_meta(o));
        let folders = list_result
            .common_prefixes
            .iter()
            .map(|p| self.path_to_meta(p).with_raw(json!({ "is_dir": true })));
        let metas = metas_by_id(objects.chain(folders));

        debug!("Listed folder={}, found count={} entries", folder_id, metas.len());
        Ok(metas)
    }

    async fn get_file_bytes(&self, file_id: &str) -> StorageResult<Vec<u8>> {
        let path = self.object_path(file_id)?;
        let path = &path;
        let store = &self.store;

        retry_transient(
            &self.retry,
            &format!("get_file_bytes({})", file_id),
            move || async move {
                let result = store
                    .get(path)
                    .await
                    .map_err(|e| StorageError::from_object_store(e, file_id))?;
                let bytes: Bytes = result.bytes().await?;
                Ok::<_, StorageError>(bytes.to_vec())
            },
        )
        .await
    }

    async fn get_parent_folders(&self, object_ids: &[String]) -> StorageResult<Vec<FileMeta>> {
        object_ids
            .iter()
            .map(|object_id| {
                let path = self.object_path(object_id)?;
                Self::parent_path(&path)
                    .map(|parent| self.path_to_meta(&parent))
                    .ok_or_else(|| StorageError::Integrity {
                        id: object_id.clone(),
                        parent_count: 0,
                    })
            })
            .collect()
    }

    async fn overwrite_file_bytes(
        &self,
        folder_id: &str,
        file_meta: &FileMeta,
        file_bytes: &[u8],
    ) -> StorageResult<FileMeta> {
        // Keys are unique, so folder/name is both the lookup and the target.
        let path = match &file_meta.id {
            Some(id) => self.object_path(id)?,
            None => self
                .object_path(folder_id)?
                .child(file_meta.require_name("overwrite_file_bytes")?),
        };
        let path_ref = &path;
        let store = &self.store;
        let payload = Bytes::copy_from_slice(file_bytes);
        let payload_ref = &payload;

        retry_transient(
            &self.retry,
            &format!("overwrite_file_bytes({})", path),
            move || async move {
                store
                    .put(path_ref, PutPayload::from(payload_ref.clone()))
                    .await
                    .map_err(StorageError::from)
            },
        )
        .await?;

        info!(
            "Wrote object={}, size={} bytes",
            self.uri_from_path(&path),
            file_bytes.len()
        );

        let written = self.path_to_meta(&path);
        Ok(FileMeta {
            id: written.id,
            name: file_meta.name.clone().or(written.name),
            parent_ids: written.parent_ids,
            raw: file_meta.raw.clone(),
        })
    }

    async fn get_or_create_subfolder(
        &self,
        parent_folder_id: &str,
        folder_meta: &FileMeta,
    ) -> StorageResult<FileMeta> {
        // Object stores have no directory objects; the prefix exists once a key is written under it.
        let dir_subfolder = self
            .object_path(parent_folder_id)?
            .child(folder_meta.require_name("get_or_create_subfolder")?);

        Ok(self.path_to_meta(&dir_subfolder))
    }
}

impl Debug for CloudPathAdapter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "CloudPathAdapter(base_url={})", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_adapter() -> CloudPathAdapter {
        CloudPathAdapter::from_store(Arc::new(InMemory::new()), "memory://")
            .with_retry(RetryConfig::no_retry())
    }

    #[test]
    fn test_build_connection_options_do_not_panic() {
        let config = StorageConfig::aws()
            .with_option("timeout", "disabled")
            .with_option("connect_timeout", "10")
            .with_option("pool_max_idle_per_host", "not_a_number");

        let _options = CloudPathAdapter::build_connection_options(&config);
    }

    #[test]
    fn test_build_retry_options_custom() {
        let config = StorageConfig::aws()
            .with_option("max_retries", "5")
            .with_option("retry_timeout", "300");

        let retry_config = CloudPathAdapter::build_retry_options(&config);
        assert_eq!(retry_config.max_retries, 5);
        assert_eq!(retry_config.retry_timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_build_retry_options_invalid_values() {
        let config = StorageConfig::aws()
            .with_option("max_retries", "invalid")
            .with_option("retry_timeout", "not_a_number");

        let retry_config = CloudPathAdapter::build_retry_options(&config);
        assert!(retry_config.max_retries > 0);
    }

    #[test]
    fn test_new_memory_store_from_config() {
        let adapter = CloudPathAdapter::new(&StorageConfig::memory()).unwrap();
        assert_eq!(adapter.base_url, "memory://");
    }

    #[test]
    fn test_new_aws_store_requires_bucket() {
        let result = CloudPathAdapter::new(&StorageConfig::aws().with_option("region", "us-east-1"));
        match result {
            Err(StorageError::ConfigError(msg)) => assert!(msg.contains("bucket")),
            other => panic!("Expected ConfigError, got {:?}", other.map(|a| a.base_url)),
        }
    }

    #[test]
    fn test_new_aws_store_base_url() {
        let config = StorageConfig::aws()
            .with_option("bucket", "my-bucket")
            .with_option("region", "us-east-1")
            .with_option("access_key_id", "AKID")
            .with_option("secret_access_key", "SECRET");

        let adapter = CloudPathAdapter::new(&config).unwrap();
        assert_eq!(adapter.base_url, "s3://my-bucket");
    }

    #[test]
    fn test_new_rejects_non_object_store_types() {
        assert!(matches!(
            CloudPathAdapter::new(&StorageConfig::local()),
            Err(StorageError::ConfigError(_))
        ));
    }

    #[test]
    fn test_object_path_resolution() {
        let adapter = CloudPathAdapter::from_store(Arc::new(InMemory::new()), "s3://bucket/");

        assert_eq!(
            adapter.object_path("s3://bucket/a/b.txt").unwrap().as_ref(),
            "a/b.txt"
        );
        assert_eq!(adapter.object_path("s3://bucket").unwrap().as_ref(), "");
        assert_eq!(adapter.object_path("a/b.txt").unwrap().as_ref(), "a/b.txt");
        assert!(matches!(
            adapter.object_path("s3://bucket2/a"),
            Err(StorageError::InvalidArgument(_))
        ));
        assert!(matches!(
            adapter.object_path("gs://bucket/a"),
            Err(StorageError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_uri_from_path() {
        let adapter = CloudPathAdapter::from_store(Arc::new(InMemory::new()), "gs://bucket");
        assert_eq!(
            adapter.uri_from_path(&ObjectPath::from("x/y")),
            "gs://bucket/x/y"
        );
        assert_eq!(adapter.uri_from_path(&ObjectPath::from("")), "gs://bucket");
    }

    #[tokio::test]
    async fn test_list_empty_prefix_returns_empty_map() {
        let adapter = memory_adapter();
        let contents = adapter.list_dir_contents("memory://empty").await.unwrap();
        assert!(contents.is_empty());
    }

    #[tokio::test]
    async fn test_overwrite_then_read_round_trip() {
        let adapter = memory_adapter();
        let payload = b"cloud bytes".to_vec();

        let written = adapter
            .overwrite_file_bytes("memory://reports", &FileMeta::named("q1.csv"), &payload)
            .await
            .unwrap();

        assert_eq!(written.id.as_deref(), Some("memory://reports/q1.csv"));
        assert_eq!(
            written.parent_ids,
            Some(vec!["memory://reports".to_string()])
        );

        let read_back = adapter
            .get_file_bytes(written.id.as_deref().unwrap())
            .await
            .unwrap();
        assert_eq!(read_back, payload);
    }

    #[tokio::test]
    async fn test_list_returns_objects_and_prefixes() {
        let adapter = memory_adapter();
        adapter
            .overwrite_file_bytes("memory://root", &FileMeta::named("top.txt"), b"t")
            .await
            .unwrap();
        adapter
            .overwrite_file_bytes("memory://root/sub", &FileMeta::named("deep.txt"), b"d")
            .await
            .unwrap();

        let contents = adapter.list_dir_contents("memory://root").await.unwrap();

        assert_eq!(contents.len(), 2);
        let top = &contents["memory://root/top.txt"];
        assert_eq!(top.name.as_deref(), Some("top.txt"));
        assert_eq!(top.raw.as_ref().unwrap()["size"], 1);
        let sub = &contents["memory://root/sub"];
        assert_eq!(sub.raw.as_ref().unwrap()["is_dir"], true);
    }

    #[tokio::test]
    async fn test_get_file_bytes_not_found() {
        let adapter = memory_adapter();
        let result = adapter.get_file_bytes("memory://missing.bin").await;
        assert!(
            matches!(result, Err(StorageError::NotFound { id }) if id == "memory://missing.bin")
        );
    }

    #[tokio::test]
    async fn test_get_or_create_subfolder_is_idempotent() {
        let adapter = memory_adapter();
        let folder_meta = FileMeta::named("exports");

        let first = adapter
            .get_or_create_subfolder("memory://data", &folder_meta)
            .await
            .unwrap();
        let second = adapter
            .get_or_create_subfolder("memory://data", &folder_meta)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.id.as_deref(), Some("memory://data/exports"));
    }

    #[tokio::test]
    async fn test_get_parent_folders() {
        let adapter = memory_adapter();
        let parents = adapter
            .get_parent_folders(&[
                "memory://a/b/c.txt".to_string(),
                "memory://top.txt".to_string(),
            ])
            .await
            .unwrap();

        assert_eq!(parents[0].id.as_deref(), Some("memory://a/b"));
        assert_eq!(parents[0].name.as_deref(), Some("b"));
        assert_eq!(parents[1].id.as_deref(), Some("memory://"));
    }

    #[tokio::test]
    async fn test_get_parent_of_store_root_is_integrity_error() {
        let adapter = memory_adapter();
        let result = adapter.get_parent_folder("memory://").await;
        assert!(matches!(
            result,
            Err(StorageError::Integrity { parent_count: 0, .. })
        ));
    }
}
