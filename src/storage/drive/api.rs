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

//! Request building and response decoding for the Drive v3 REST API.

use reqwest::{Method, Response};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::storage::adapter::FileMeta;
use crate::storage::error::{ApiFailure, StorageError, StorageResult};

pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com";

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Pseudo folder id listing everything shared with the authenticated user.
pub const SHARED_WITH_ME: &str = "sharedWithMe";

/// The provider rejects batches larger than this.
pub const MAX_BATCH_SIZE: usize = 100;

pub(crate) const FILE_FIELDS: &str = "id, name, parents, mimeType";

pub(crate) const LIST_FIELDS: &str = "nextPageToken, files(id, name, parents, mimeType)";

/// One call against the API, usable on its own or as part of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            body: None,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: Url, body: Value) -> Self {
        Self::new(Method::POST, url).with_body(body)
    }

    pub fn patch(url: Url, body: Value) -> Self {
        Self::new(Method::PATCH, url).with_body(body)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, params: &[(&str, &str)]) -> Self {
        self.url.query_pairs_mut().extend_pairs(params);
        self
    }

    /// Path and query, as written on the request line of a batch part.
    pub fn path_and_query(&self) -> String {
        match self.url.query() {
            Some(query) => format!("{}?{}", self.url.path(), query),
            None => self.url.path().to_string(),
        }
    }
}

/// Build `base/<segments...>` with every segment percent-encoded.
pub(crate) fn api_url(base: &str, segments: &[&str]) -> StorageResult<Url> {
    let mut url = Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|_| StorageError::ConfigError(format!("'{}' cannot be a base URL", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Quote a value for use inside a Drive search query string literal.
pub(crate) fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Query selecting the non-trashed children of a folder.
pub(crate) fn children_query(folder_id: &str) -> String {
    if folder_id == SHARED_WITH_ME {
        "sharedWithMe=true and trashed=false".to_string()
    } else {
        format!(
            "'{}' in parents and trashed=false",
            escape_query_value(folder_id)
        )
    }
}

/// Query selecting a non-trashed child of a folder by exact name.
pub(crate) fn named_child_query(folder_id: &str, name: &str, folders_only: bool) -> String {
    let mut query = format!(
        "'{}' in parents and name='{}' and trashed=false",
        escape_query_value(folder_id),
        escape_query_value(name)
    );
    if folders_only {
        query.push_str(&format!(" and mimeType='{}'", FOLDER_MIME_TYPE));
    }
    query
}

/// One page of a `files.list` response.
#[derive(Debug, Deserialize)]
pub(crate) struct FileList {
    #[serde(default)]
    pub files: Vec<Value>,

    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

/// Translate a Drive file resource into `FileMeta`.
pub(crate) fn raw_to_file_meta(raw: Value) -> StorageResult<FileMeta> {
    let id = raw
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| StorageError::InvalidResponse(format!("file resource without id: {}", raw)))?
        .to_string();
    let name = raw.get("name").and_then(Value::as_str).map(str::to_string);
    let parent_ids = raw
        .get("parents")
        .and_then(Value::as_array)
        .map(|parents| {
            parents
                .iter()
                .filter_map(|p| p.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    Ok(FileMeta {
        id: Some(id),
        name,
        parent_ids: Some(parent_ids),
        raw: Some(raw),
    })
}

/// Parent ids listed on a file resource.
pub(crate) fn parent_ids_of(raw: &Value) -> Vec<String> {
    raw.get("parents")
        .and_then(Value::as_array)
        .map(|parents| {
            parents
                .iter()
                .filter_map(|p| p.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Map a transport failure; timeouts and refused connections are worth another attempt.
pub(crate) fn transport_error(error: reqwest::Error) -> StorageError {
    if error.is_timeout() || error.is_connect() {
        StorageError::Transient(error.to_string())
    } else {
        StorageError::RequestError(error)
    }
}

/// Turn a non-success response into the matching `StorageError`.
pub(crate) async fn check_response(
    operation: &str,
    id: &str,
    response: Response,
) -> StorageResult<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(StorageError::from_api_failure(
        operation,
        id,
        ApiFailure::from_body(status, &body),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_api_url_encodes_segments() {
        let url = api_url("https://example.com/", &["drive", "v3", "files", "a/b c"]).unwrap();
        assert_eq!(url.as_str(), "https://example.com/drive/v3/files/a%2Fb%20c");
    }

    #[test]
    fn test_api_url_rejects_bad_base() {
        assert!(matches!(
            api_url("not a url", &["x"]),
            Err(StorageError::UrlParseError(_))
        ));
    }

    #[test]
    fn test_path_and_query() {
        let url = api_url("http://localhost:1234", &["drive", "v3", "files", "abc"]).unwrap();
        let request = ApiRequest::get(url).with_query(&[("fields", "id, name")]);

        assert_eq!(
            request.path_and_query(),
            "/drive/v3/files/abc?fields=id%2C+name"
        );
    }

    #[test]
    fn test_escape_query_value() {
        assert_eq!(escape_query_value("Bob's \\ file"), "Bob\\'s \\\\ file");
    }

    #[test]
    fn test_children_query() {
        assert_eq!(
            children_query("folder-1"),
            "'folder-1' in parents and trashed=false"
        );
        assert_eq!(
            children_query(SHARED_WITH_ME),
            "sharedWithMe=true and trashed=false"
        );
    }

    #[test]
    fn test_named_child_query() {
        let query = named_child_query("p", "it's", true);
        assert!(query.starts_with("'p' in parents and name='it\\'s' and trashed=false"));
        assert!(query.ends_with("mimeType='application/vnd.google-apps.folder'"));
        assert!(!named_child_query("p", "x", false).contains("mimeType"));
    }

    #[test]
    fn test_raw_to_file_meta() {
        let meta = raw_to_file_meta(json!({
            "id": "f1",
            "name": "report.pdf",
            "parents": ["p1"],
            "mimeType": "application/pdf"
        }))
        .unwrap();

        assert_eq!(meta.id.as_deref(), Some("f1"));
        assert_eq!(meta.name.as_deref(), Some("report.pdf"));
        assert_eq!(meta.parent_ids, Some(vec!["p1".to_string()]));
        assert_eq!(meta.raw.unwrap()["mimeType"], "application/pdf");
    }

    #[test]
    fn test_raw_to_file_meta_without_parents() {
        let meta = raw_to_file_meta(json!({"id": "f1", "name": "x"})).unwrap();
        assert_eq!(meta.parent_ids, Some(vec![]));
    }

    #[test]
    fn test_raw_to_file_meta_requires_id() {
        assert!(matches!(
            raw_to_file_meta(json!({"name": "x"})),
            Err(StorageError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_file_list_decoding() {
        let page: FileList = serde_json::from_value(json!({
            "nextPageToken": "tok",
            "files": [{"id": "a"}]
        }))
        .unwrap();
        assert_eq!(page.next_page_token.as_deref(), Some("tok"));
        assert_eq!(page.files.len(), 1);

        let last: FileList = serde_json::from_value(json!({})).unwrap();
        assert!(last.files.is_empty());
        assert!(last.next_page_token.is_none());
    }
}
