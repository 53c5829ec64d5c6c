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

//! Remote drive adapter over the Drive v3 REST API.
//!
//! Objects are addressed by opaque drive ids. Every object has exactly one
//! parent folder. Multi-object reads go through [`BatchExecutor`], and every
//! call is retried on rate limiting according to the adapter's `RetryConfig`.

pub mod api;
pub mod auth;
pub mod batch;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

pub use api::{ApiRequest, DEFAULT_API_BASE_URL, FOLDER_MIME_TYPE, MAX_BATCH_SIZE, SHARED_WITH_ME};
pub use auth::{RefreshTokenSource, StaticToken, TokenSource, DEFAULT_TOKEN_URL};
pub use batch::{collect_batch, BatchExecutor, BatchOutcome};

use self::api::{
    api_url, check_response, children_query, named_child_query, parent_ids_of, raw_to_file_meta,
    transport_error, FileList, FILE_FIELDS, LIST_FIELDS,
};
use super::adapter::{metas_by_id, AdapterKind, FileMeta, IoAdapter};
use super::config::StorageConfig;
use super::error::{StorageError, StorageResult};
use crate::download;
use crate::util::retry::{retry_transient, RetryConfig};

/// Default size of a single ranged download request (100 MiB).
pub const DEFAULT_CHUNK_SIZE: u64 = 100 * 1024 * 1024;

/// Roles that grant at least read access.
const READ_ROLES: [&str; 3] = ["reader", "writer", "owner"];

/// One ranged media response.
enum MediaChunk {
    /// `206`: a slice of the file and the total size when the server reported it
    Partial { bytes: Bytes, total: Option<u64> },
    /// `200`: the server ignored the range and sent everything
    Complete(Bytes),
    /// `416`: nothing left at the requested offset
    Unsatisfiable,
}

/// Adapter over a remote drive.
pub struct DriveAdapter {
    client: reqwest::Client,
    tokens: Arc<dyn TokenSource>,
    api_base_url: String,
    retry: RetryConfig,
    chunk_size: u64,
    create_adapter: Option<Arc<DriveAdapter>>,
}

impl std::fmt::Debug for DriveAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveAdapter")
            .field("api_base_url", &self.api_base_url)
            .field("chunk_size", &self.chunk_size)
            .field("retry", &self.retry)
            .field("has_create_adapter", &self.create_adapter.is_some())
            .finish()
    }
}

impl DriveAdapter {
    pub fn new(tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            client: reqwest::Client::new(),
            tokens,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            retry: RetryConfig::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            create_adapter: None,
        }
    }

    /// Point the adapter at another API host, e.g. a mock server.
    pub fn with_api_base_url(mut self, api_base_url: impl Into<String>) -> Self {
        self.api_base_url = api_base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Route create and modify-date operations through another adapter,
    /// typically one holding credentials with write scope.
    pub fn with_create_adapter(mut self, create_adapter: Arc<DriveAdapter>) -> Self {
        self.create_adapter = Some(create_adapter);
        self
    }

    /// Build an adapter from `drive` storage options.
    ///
    /// Credentials come from `access_token`, or from `refresh_token` together
    /// with either `client_secret_path` or `client_id` and `client_secret`.
    pub fn from_config(config: &StorageConfig) -> StorageResult<Self> {
        let client = Self::build_client(config)?;
        let tokens = Self::build_token_source(config, &client)?;

        let mut adapter = Self::new(tokens)
            .with_client(client)
            .with_retry(config.retry_config());

        if let Some(api_base_url) = config.get_option("api_base_url") {
            adapter = adapter.with_api_base_url(api_base_url.clone());
        }
        if let Some(chunk_size) = config.get_option("chunk_size") {
            let chunk_size = chunk_size.parse::<u64>().map_err(|_| {
                StorageError::ConfigError(format!("invalid chunk_size '{}'", chunk_size))
            })?;
            adapter = adapter.with_chunk_size(chunk_size);
        }

        info!(
            "Created drive adapter, api_base_url={}, chunk_size={}",
            adapter.api_base_url, adapter.chunk_size
        );
        Ok(adapter)
    }

    fn build_client(config: &StorageConfig) -> StorageResult<reqwest::Client> {
        let mut builder = reqwest::Client::builder();

        if let Some(Some(timeout)) = config.duration_option("timeout") {
            builder = builder.timeout(timeout);
        }
        if let Some(Some(connect_timeout)) = config.duration_option("connect_timeout") {
            builder = builder.connect_timeout(connect_timeout);
        }
        if let Some(pool_idle_timeout) = config.duration_option("pool_idle_timeout") {
            builder = builder.pool_idle_timeout(pool_idle_timeout);
        }
        if let Some(max_idle) = config.parsed_option::<usize>("pool_max_idle_per_host") {
            builder = builder.pool_max_idle_per_host(max_idle);
        }

        builder
            .build()
            .map_err(|e| StorageError::ConfigError(format!("failed to build HTTP client: {}", e)))
    }

    fn build_token_source(
        config: &StorageConfig,
        client: &reqwest::Client,
    ) -> StorageResult<Arc<dyn TokenSource>> {
        if let Some(access_token) = config.get_option("access_token") {
            return Ok(Arc::new(StaticToken::new(access_token.clone())));
        }

        let refresh_token = config.get_option("refresh_token").ok_or_else(|| {
            StorageError::ConfigError(
                "drive storage requires 'access_token' or 'refresh_token' option".to_string(),
            )
        })?;

        let source = match config.get_option("client_secret_path") {
            Some(path) => RefreshTokenSource::from_web_client_secret_file(refresh_token.clone(), path)?,
            None => RefreshTokenSource::new(
                refresh_token.clone(),
                config.require_option("client_id")?.clone(),
                config.require_option("client_secret")?.clone(),
            ),
        };

        let source = match config.get_option("token_url") {
            Some(token_url) => source.with_token_url(token_url.clone()),
            None => source,
        };

        Ok(Arc::new(source.with_client(client.clone())))
    }

    fn files_url(&self, segments: &[&str]) -> StorageResult<url::Url> {
        let mut path = vec!["drive", "v3", "files"];
        path.extend_from_slice(segments);
        api_url(&self.api_base_url, &path)
    }

    fn upload_url(&self, file_id: Option<&str>) -> StorageResult<url::Url> {
        let mut path = vec!["upload", "drive", "v3", "files"];
        path.extend(file_id);
        let mut url = api_url(&self.api_base_url, &path)?;
        url.query_pairs_mut()
            .append_pair("uploadType", "multipart")
            .append_pair("fields", FILE_FIELDS);
        Ok(url)
    }

    fn batch(&self) -> StorageResult<BatchExecutor> {
        BatchExecutor::new(
            self.client.clone(),
            Arc::clone(&self.tokens),
            &self.api_base_url,
            self.retry.clone(),
        )
    }

    /// Adapter that performs creates: the delegate when configured, else this one.
    fn creator(&self) -> &DriveAdapter {
        self.create_adapter.as_deref().unwrap_or(self)
    }

    /// Send a single JSON request, retrying transient failures.
    async fn call(&self, operation: &str, id: &str, request: &ApiRequest) -> StorageResult<Value> {
        retry_transient(&self.retry, operation, move || async move {
            let token = self.tokens.access_token().await?;
            let mut builder = self
                .client
                .request(request.method.clone(), request.url.clone())
                .bearer_auth(token);
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            let response = builder.send().await.map_err(transport_error)?;
            let response = check_response(operation, id, response).await?;
            let text = response.text().await.map_err(transport_error)?;

            if text.trim().is_empty() {
                Ok(Value::Null)
            } else {
                Ok::<_, StorageError>(serde_json::from_str(&text)?)
            }
        })
        .await
    }

    /// All pages of a `files.list` query.
    async fn list_files(&self, query: &str) -> StorageResult<Vec<FileMeta>> {
        let mut metas = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = ApiRequest::get(self.files_url(&[])?)
                .with_query(&[("q", query), ("fields", LIST_FIELDS)]);
            if let Some(token) = &page_token {
                request = request.with_query(&[("pageToken", token.as_str())]);
            }

            let page: FileList = serde_json::from_value(self.call("list", query, &request).await?)?;
            for raw in page.files {
                metas.push(raw_to_file_meta(raw)?);
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(metas)
    }

    /// First object named `name` in `folder_id`, if any.
    async fn find_by_name(&self, folder_id: &str, name: &str) -> StorageResult<Option<String>> {
        let request = ApiRequest::get(self.files_url(&[])?).with_query(&[
            ("q", named_child_query(folder_id, name, false).as_str()),
            ("fields", "files(id)"),
            ("pageSize", "1"),
        ]);

        let page: FileList = serde_json::from_value(self.call("find_by_name", name, &request).await?)?;
        Ok(page
            .files
            .first()
            .and_then(|f| f.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    async fn fetch_media_range(&self, file_id: &str, start: u64) -> StorageResult<MediaChunk> {
        let mut url = self.files_url(&[file_id])?;
        url.query_pairs_mut().append_pair("alt", "media");
        let range = format!("bytes={}-{}", start, start + self.chunk_size - 1);
        let (url, range) = (&url, &range);

        retry_transient(&self.retry, "get_file_bytes", move || async move {
            let token = self.tokens.access_token().await?;
            let response = self
                .client
                .get(url.clone())
                .bearer_auth(token)
                .header(reqwest::header::RANGE, range.as_str())
                .send()
                .await
                .map_err(transport_error)?;

            match response.status() {
                StatusCode::RANGE_NOT_SATISFIABLE => Ok(MediaChunk::Unsatisfiable),
                StatusCode::PARTIAL_CONTENT => {
                    let total = response
                        .headers()
                        .get(reqwest::header::CONTENT_RANGE)
                        .and_then(|v| v.to_str().ok())
                        .and_then(content_range_total);
                    let bytes = response.bytes().await.map_err(transport_error)?;
                    Ok(MediaChunk::Partial { bytes, total })
                }
                _ => {
                    let response = check_response("get_file_bytes", file_id, response).await?;
                    let bytes = response.bytes().await.map_err(transport_error)?;
                    Ok::<_, StorageError>(MediaChunk::Complete(bytes))
                }
            }
        })
        .await
    }

    async fn upload(
        &self,
        method: Method,
        file_id: Option<&str>,
        metadata: &Value,
        file_bytes: &[u8],
    ) -> StorageResult<FileMeta> {
        let url = self.upload_url(file_id)?;
        let boundary = format!("upload_{}", Uuid::new_v4().simple());
        let body = multipart_related_body(&boundary, metadata, file_bytes)?;
        let content_type = format!("multipart/related; boundary={}", boundary);
        let target = file_id.unwrap_or_default();
        let (url, body, content_type, method) = (&url, &body, &content_type, &method);

        let raw = retry_transient(&self.retry, "overwrite_file_bytes", move || async move {
            let token = self.tokens.access_token().await?;
            let response = self
                .client
                .request(method.clone(), url.clone())
                .bearer_auth(token)
                .header(reqwest::header::CONTENT_TYPE, content_type.as_str())
                .body(body.clone())
                .send()
                .await
                .map_err(transport_error)?;
            let response = check_response("overwrite_file_bytes", target, response).await?;
            Ok::<_, StorageError>(response.json::<Value>().await.map_err(transport_error)?)
        })
        .await?;

        raw_to_file_meta(raw)
    }

    /// Create a child folder without checking for an existing one.
    pub async fn create_subfolder(
        &self,
        parent_folder_id: &str,
        folder_meta: &FileMeta,
    ) -> StorageResult<FileMeta> {
        self.creator()
            .create_subfolder_here(parent_folder_id, folder_meta)
            .await
    }

    async fn create_subfolder_here(
        &self,
        parent_folder_id: &str,
        folder_meta: &FileMeta,
    ) -> StorageResult<FileMeta> {
        let name = folder_meta.require_name("create_subfolder")?;
        let request = ApiRequest::post(
            self.files_url(&[])?,
            folder_body(parent_folder_id, name),
        )
        .with_query(&[("fields", FILE_FIELDS)]);

        let created = raw_to_file_meta(self.call("create_subfolder", name, &request).await?)?;
        info!(
            "Created folder={} id={:?} in parent={}",
            name, created.id, parent_folder_id
        );
        Ok(created)
    }

    /// Create several folders in one batch; `parent_folder_ids[i]` receives `folder_names[i]`.
    pub async fn create_subfolders(
        &self,
        parent_folder_ids: &[String],
        folder_names: &[String],
    ) -> StorageResult<Vec<FileMeta>> {
        self.creator()
            .create_subfolders_here(parent_folder_ids, folder_names)
            .await
    }

    async fn create_subfolders_here(
        &self,
        parent_folder_ids: &[String],
        folder_names: &[String],
    ) -> StorageResult<Vec<FileMeta>> {
        ensure_same_len("create_subfolders", parent_folder_ids.len(), folder_names.len())?;
        let url = self.files_url(&[])?;
        let requests: Vec<ApiRequest> = parent_folder_ids
            .iter()
            .zip(folder_names)
            .map(|(parent, name)| {
                ApiRequest::post(url.clone(), folder_body(parent, name))
                    .with_query(&[("fields", FILE_FIELDS)])
            })
            .collect();

        self.batch()?
            .run("create_subfolders", &requests)
            .await?
            .into_iter()
            .map(raw_to_file_meta)
            .collect()
    }

    /// Child folder of `parent_folder_id` named like `folder_meta`, if present.
    pub async fn get_subfolder(
        &self,
        parent_folder_id: &str,
        folder_meta: &FileMeta,
    ) -> StorageResult<Option<FileMeta>> {
        let found = self
            .get_object_in_folder_ids(
                &[parent_folder_id.to_string()],
                std::slice::from_ref(folder_meta),
                true,
            )
            .await?;
        Ok(found.into_iter().next().flatten())
    }

    /// Elementwise batched lookup of `metas[i].name` inside `parent_folder_ids[i]`.
    ///
    /// Names are assumed unique within a folder; the first match wins.
    pub async fn get_object_in_folder_ids(
        &self,
        parent_folder_ids: &[String],
        metas: &[FileMeta],
        folders_only: bool,
    ) -> StorageResult<Vec<Option<FileMeta>>> {
        ensure_same_len("get_object_in_folder_ids", parent_folder_ids.len(), metas.len())?;
        let url = self.files_url(&[])?;

        let mut requests = Vec::with_capacity(metas.len());
        for (parent, meta) in parent_folder_ids.iter().zip(metas) {
            let query = named_child_query(parent, meta.require_name("get_object_in_folder_ids")?, folders_only);
            requests.push(ApiRequest::get(url.clone()).with_query(&[
                ("q", query.as_str()),
                ("fields", "nextPageToken, files(id, name, parents)"),
            ]));
        }

        let responses = self.batch()?.run("get_object_in_folder_ids", &requests).await?;
        responses
            .into_iter()
            .map(|response| {
                let page: FileList = serde_json::from_value(response)?;
                page.files.into_iter().next().map(raw_to_file_meta).transpose()
            })
            .collect()
    }

    /// Set `modifiedTime` on each object, pairing `object_ids[i]` with `datetimes[i]`.
    pub async fn set_modified_date(
        &self,
        object_ids: &[String],
        datetimes: &[DateTime<Utc>],
    ) -> StorageResult<Vec<FileMeta>> {
        self.creator()
            .set_modified_date_here(object_ids, datetimes)
            .await
    }

    async fn set_modified_date_here(
        &self,
        object_ids: &[String],
        datetimes: &[DateTime<Utc>],
    ) -> StorageResult<Vec<FileMeta>> {
        ensure_same_len("set_modified_date", object_ids.len(), datetimes.len())?;
        let mut requests = Vec::with_capacity(object_ids.len());
        for (object_id, datetime) in object_ids.iter().zip(datetimes) {
            requests.push(
                ApiRequest::patch(
                    self.files_url(&[object_id.as_str()])?,
                    json!({"modifiedTime": datetime.to_rfc3339_opts(SecondsFormat::Millis, true)}),
                )
                .with_query(&[("fields", "id, name, modifiedTime")]),
            );
        }

        self.batch()?
            .run("set_modified_date", &requests)
            .await?
            .into_iter()
            .map(raw_to_file_meta)
            .collect()
    }

    /// Share `file_id` with a user as reader or writer.
    pub async fn add_user_permission(
        &self,
        file_id: &str,
        email: &str,
        read_only: bool,
    ) -> StorageResult<()> {
        let role = if read_only { "reader" } else { "writer" };
        let request = ApiRequest::post(
            self.files_url(&[file_id, "permissions"])?,
            json!({"role": role, "type": "user", "emailAddress": email}),
        );

        self.call("add_user_permission", file_id, &request).await?;
        info!("Granted role={} on file={} to user={}", role, file_id, email);
        Ok(())
    }

    /// Per object, a map from lower-cased email address to role.
    pub async fn get_permissions(
        &self,
        file_ids: &[String],
    ) -> StorageResult<Vec<HashMap<String, String>>> {
        let mut requests = Vec::with_capacity(file_ids.len());
        for file_id in file_ids {
            requests.push(
                ApiRequest::get(self.files_url(&[file_id.as_str(), "permissions"])?)
                    .with_query(&[("fields", "permissions(id,emailAddress,type,role)")]),
            );
        }

        let responses = self.batch()?.run("get_permissions", &requests).await?;
        Ok(responses.iter().map(permissions_by_email).collect())
    }

    /// Whether `email` can at least read each object.
    pub async fn check_permissions_read(
        &self,
        file_ids: &[String],
        email: &str,
    ) -> StorageResult<Vec<bool>> {
        let email = email.to_lowercase();
        Ok(self
            .get_permissions(file_ids)
            .await?
            .iter()
            .map(|permissions| {
                permissions
                    .get(&email)
                    .map(|role| READ_ROLES.contains(&role.as_str()))
                    .unwrap_or(false)
            })
            .collect())
    }

    /// Thumbnail link per object; `None` when the provider has none.
    pub async fn get_thumbnail_urls(&self, file_ids: &[String]) -> StorageResult<Vec<Option<String>>> {
        let mut requests = Vec::with_capacity(file_ids.len());
        for file_id in file_ids {
            requests.push(
                ApiRequest::get(self.files_url(&[file_id.as_str()])?)
                    .with_query(&[("fields", "id, thumbnailLink")]),
            );
        }

        let responses = self.batch()?.run("get_thumbnail_urls", &requests).await?;
        Ok(responses
            .iter()
            .map(|r| r.get("thumbnailLink").and_then(Value::as_str).map(str::to_string))
            .collect())
    }

    /// Fetch plain URLs (e.g. thumbnail links) with this adapter's HTTP client.
    pub async fn download_bytes(
        &self,
        urls: &[String],
        max_workers: Option<usize>,
    ) -> Vec<Option<Vec<u8>>> {
        download::download_all(&self.client, urls, max_workers, &self.retry).await
    }
}

#[async_trait]
impl IoAdapter for DriveAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Drive
    }

    async fn list_dir_contents(&self, folder_id: &str) -> StorageResult<HashMap<String, FileMeta>> {
        let metas = self.list_files(&children_query(folder_id)).await?;
        debug!("Listed folder={}, found count={} entries", folder_id, metas.len());
        Ok(metas_by_id(metas))
    }

    async fn get_file_bytes(&self, file_id: &str) -> StorageResult<Vec<u8>> {
        let mut buffer = Vec::new();

        loop {
            let offset = buffer.len() as u64;
            match self.fetch_media_range(file_id, offset).await? {
                MediaChunk::Complete(bytes) => return Ok(bytes.to_vec()),
                MediaChunk::Unsatisfiable => break,
                MediaChunk::Partial { bytes, total } => {
                    let received = bytes.len() as u64;
                    buffer.extend_from_slice(&bytes);
                    debug!(
                        "Downloaded file={} bytes={}..{} of total={:?}",
                        file_id,
                        offset,
                        offset + received,
                        total
                    );

                    let done = match total {
                        Some(total) => buffer.len() as u64 >= total,
                        None => received < self.chunk_size,
                    };
                    if done || received == 0 {
                        break;
                    }
                }
            }
        }

        Ok(buffer)
    }

    async fn get_metas(&self, object_ids: &[String]) -> StorageResult<Vec<FileMeta>> {
        let mut requests = Vec::with_capacity(object_ids.len());
        for object_id in object_ids {
            requests.push(
                ApiRequest::get(self.files_url(&[object_id.as_str()])?)
                    .with_query(&[("fields", FILE_FIELDS)]),
            );
        }

        self.batch()?
            .run("get_metas", &requests)
            .await?
            .into_iter()
            .map(raw_to_file_meta)
            .collect()
    }

    async fn get_parent_folders(&self, object_ids: &[String]) -> StorageResult<Vec<FileMeta>> {
        let mut requests = Vec::with_capacity(object_ids.len());
        for object_id in object_ids {
            requests.push(
                ApiRequest::get(self.files_url(&[object_id.as_str()])?)
                    .with_query(&[("fields", "id, parents")]),
            );
        }

        let responses = self.batch()?.run("get_parent_folders", &requests).await?;

        let mut parent_ids = Vec::with_capacity(responses.len());
        for (object_id, response) in object_ids.iter().zip(&responses) {
            let parents = parent_ids_of(response);
            if parents.len() != 1 {
                return Err(StorageError::Integrity {
                    id: object_id.clone(),
                    parent_count: parents.len(),
                });
            }
            parent_ids.extend(parents);
        }

        self.get_metas(&parent_ids).await
    }

    async fn overwrite_file_bytes(
        &self,
        folder_id: &str,
        file_meta: &FileMeta,
        file_bytes: &[u8],
    ) -> StorageResult<FileMeta> {
        let existing_id = match &file_meta.id {
            Some(id) => Some(id.clone()),
            None => {
                let name = file_meta.require_name("overwrite_file_bytes")?;
                self.find_by_name(folder_id, name).await?
            }
        };

        let written = match existing_id {
            Some(file_id) => {
                info!("Updating existing file={:?} id={}", file_meta.name, file_id);
                let metadata = match &file_meta.name {
                    Some(name) => json!({"name": name}),
                    None => json!({}),
                };
                self.upload(Method::PATCH, Some(&file_id), &metadata, file_bytes)
                    .await?
            }
            None => {
                let name = file_meta.require_name("overwrite_file_bytes")?;
                let metadata = json!({"name": name, "parents": [folder_id]});
                let created = self
                    .creator()
                    .upload(Method::POST, None, &metadata, file_bytes)
                    .await?;
                info!("Created file={} id={:?} in folder={}", name, created.id, folder_id);
                created
            }
        };

        Ok(written)
    }

    async fn get_or_create_subfolder(
        &self,
        parent_folder_id: &str,
        folder_meta: &FileMeta,
    ) -> StorageResult<FileMeta> {
        match self.get_subfolder(parent_folder_id, folder_meta).await? {
            Some(existing) => Ok(existing),
            None => self.create_subfolder(parent_folder_id, folder_meta).await,
        }
    }
}

fn folder_body(parent_folder_id: &str, name: &str) -> Value {
    json!({
        "name": name,
        "parents": [parent_folder_id],
        "mimeType": FOLDER_MIME_TYPE,
    })
}

fn ensure_same_len(operation: &str, left: usize, right: usize) -> StorageResult<()> {
    if left == right {
        Ok(())
    } else {
        Err(StorageError::InvalidArgument(format!(
            "{} needs inputs of equal length, got {} and {}",
            operation, left, right
        )))
    }
}

fn permissions_by_email(response: &Value) -> HashMap<String, String> {
    response
        .get("permissions")
        .and_then(Value::as_array)
        .map(|permissions| {
            permissions
                .iter()
                .filter_map(|p| {
                    let email = p.get("emailAddress").and_then(Value::as_str)?;
                    let role = p.get("role").and_then(Value::as_str)?;
                    Some((email.to_lowercase(), role.to_string()))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Total size from a `Content-Range: bytes 0-99/1234` header.
fn content_range_total(content_range: &str) -> Option<u64> {
    content_range.rsplit('/').next()?.trim().parse().ok()
}

fn multipart_related_body(boundary: &str, metadata: &Value, file_bytes: &[u8]) -> StorageResult<Bytes> {
    let mut body = Vec::with_capacity(file_bytes.len() + 512);
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{}\r\n",
            boundary,
            serde_json::to_string(metadata)?
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        format!("--{}\r\nContent-Type: application/octet-stream\r\n\r\n", boundary).as_bytes(),
    );
    body.extend_from_slice(file_bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    Ok(Bytes::from(body))
}
