// Copyright 2022 Adobe. All rights reserved.
// This file is licensed to you under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License. You may obtain a copy
// of the License at http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under
// the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR REPRESENTATIONS
// OF ANY KIND, either express or implied. See the License for the specific language
// governing permissions and limitations under the License.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter, Result as FmtResult};

use super::error::{StorageError, StorageResult};

/// Provider-agnostic metadata about a file or folder.
///
/// Values are never updated in place by adapters; operations that assign an id
/// return a new copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileMeta {
    /// Identifier assigned by the backing store (a path for path-like stores)
    pub id: Option<String>,

    /// Display name, not guaranteed unique
    pub name: Option<String>,

    /// Identifiers of the containing folders
    pub parent_ids: Option<Vec<String>>,

    /// Native payload the metadata was translated from
    pub raw: Option<Value>,
}

impl FileMeta {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Metadata carrying only a name, as passed to create/overwrite calls.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Copy of this metadata with `id` assigned.
    pub fn with_id(&self, id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..self.clone()
        }
    }

    pub fn with_parent_ids(mut self, parent_ids: Vec<String>) -> Self {
        self.parent_ids = Some(parent_ids);
        self
    }

    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = Some(raw);
        self
    }

    /// The name, or an `InvalidArgument` error for `operation`.
    pub fn require_name(&self, operation: &str) -> StorageResult<&str> {
        self.name.as_deref().ok_or_else(|| {
            StorageError::InvalidArgument(format!("{} requires a file name", operation))
        })
    }
}

/// Key a listing by object id. Entries without an id are dropped.
pub(crate) fn metas_by_id(metas: impl IntoIterator<Item = FileMeta>) -> HashMap<String, FileMeta> {
    metas
        .into_iter()
        .filter_map(|meta| meta.id.clone().map(|id| (id, meta)))
        .collect()
}

/// Which medium an adapter talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
    Local,
    CloudPath,
    Drive,
}

impl Display for AdapterKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            AdapterKind::Local => "local",
            AdapterKind::CloudPath => "cloud_path",
            AdapterKind::Drive => "drive",
        };
        write!(f, "{}", name)
    }
}

/// Unified interface over local paths, cloud object stores and remote drives.
///
/// All variants honour the same contracts; they only differ in how the
/// operations map onto the underlying medium.
#[async_trait]
pub trait IoAdapter: Send + Sync {
    /// The medium this adapter talks to.
    fn kind(&self) -> AdapterKind;

    /// List the direct children of a folder, keyed by object id.
    ///
    /// An empty folder yields an empty map. Trashed entries are excluded where
    /// the backend has the notion.
    async fn list_dir_contents(&self, folder_id: &str) -> StorageResult<HashMap<String, FileMeta>>;

    /// Read the full contents of a file.
    ///
    /// # Errors
    ///
    /// `StorageError::NotFound` when `file_id` does not resolve.
    async fn get_file_bytes(&self, file_id: &str) -> StorageResult<Vec<u8>>;

    /// Parent folder of a single object.
    async fn get_parent_folder(&self, object_id: &str) -> StorageResult<FileMeta> {
        self.get_parent_folders(&[object_id.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StorageError::NotFound {
                id: object_id.to_string(),
            })
    }

    /// Parent folders of several objects, in input order.
    ///
    /// # Errors
    ///
    /// `StorageError::Integrity` when an object does not have exactly one parent.
    async fn get_parent_folders(&self, object_ids: &[String]) -> StorageResult<Vec<FileMeta>>;

    /// Write `file_bytes` into `folder_id`.
    ///
    /// When `file_meta.id` is unset, the folder is searched by name first; a
    /// match is updated, otherwise a new object is created. Returns the
    /// metadata with the (possibly new) id.
    async fn overwrite_file_bytes(
        &self,
        folder_id: &str,
        file_meta: &FileMeta,
        file_bytes: &[u8],
    ) -> StorageResult<FileMeta>;

    /// Metadata of a single object.
    async fn get_meta(&self, object_id: &str) -> StorageResult<FileMeta> {
        self.get_metas(&[object_id.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StorageError::NotFound {
                id: object_id.to_string(),
            })
    }

    /// Metadata of several objects, in input order.
    ///
    /// Path-like stores have nothing beyond the path, so the default uses the
    /// id as the name.
    async fn get_metas(&self, object_ids: &[String]) -> StorageResult<Vec<FileMeta>> {
        Ok(object_ids
            .iter()
            .map(|id| FileMeta::new(id.clone(), id.clone()))
            .collect())
    }

    /// Find a child folder by exact name, creating it when absent.
    ///
    /// Not atomic: two concurrent callers can both miss and both create.
    async fn get_or_create_subfolder(
        &self,
        parent_folder_id: &str,
        folder_meta: &FileMeta,
    ) -> StorageResult<FileMeta>;
}

impl Debug for dyn IoAdapter {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "IoAdapter(kind={})", self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_file_meta_new() {
        let meta = FileMeta::new("id-1", "report.csv");

        assert_eq!(meta.id.as_deref(), Some("id-1"));
        assert_eq!(meta.name.as_deref(), Some("report.csv"));
        assert!(meta.parent_ids.is_none());
        assert!(meta.raw.is_none());
    }

    #[test]
    fn test_with_id_leaves_original_untouched() {
        let original = FileMeta::named("notes.txt").with_parent_ids(vec!["p".to_string()]);
        let updated = original.with_id("new-id");

        assert_eq!(original.id, None);
        assert_eq!(updated.id.as_deref(), Some("new-id"));
        assert_eq!(updated.name, original.name);
        assert_eq!(updated.parent_ids, original.parent_ids);
    }

    #[test]
    fn test_require_name() {
        assert_eq!(
            FileMeta::named("a").require_name("overwrite").unwrap(),
            "a"
        );

        match FileMeta::default().require_name("overwrite") {
            Err(StorageError::InvalidArgument(msg)) => assert!(msg.contains("overwrite")),
            other => panic!("Expected InvalidArgument, got {:?}", other),
        }
    }

    #[test]
    fn test_metas_by_id_skips_missing_ids() {
        let metas = metas_by_id(vec![
            FileMeta::new("a", "A"),
            FileMeta::named("no-id"),
            FileMeta::new("b", "B"),
        ]);

        assert_eq!(metas.len(), 2);
        assert_eq!(metas["a"].name.as_deref(), Some("A"));
        assert_eq!(metas["b"].name.as_deref(), Some("B"));
    }

    #[test]
    fn test_file_meta_serializes_raw_payload() {
        let meta = FileMeta::new("id", "name").with_raw(json!({"mimeType": "text/plain"}));
        let value = serde_json::to_value(&meta).unwrap();

        assert_eq!(value["id"], "id");
        assert_eq!(value["raw"]["mimeType"], "text/plain");
    }

    #[test]
    fn test_adapter_kind_display() {
        assert_eq!(AdapterKind::Local.to_string(), "local");
        assert_eq!(AdapterKind::CloudPath.to_string(), "cloud_path");
        assert_eq!(AdapterKind::Drive.to_string(), "drive");
    }

    #[tokio::test]
    async fn test_default_methods_and_debug() {
        struct MockAdapter;

        #[async_trait]
        impl IoAdapter for MockAdapter {
            fn kind(&self) -> AdapterKind {
                AdapterKind::Local
            }

            async fn list_dir_contents(
                &self,
                _folder_id: &str,
            ) -> StorageResult<HashMap<String, FileMeta>> {
                Ok(HashMap::new())
            }

            async fn get_file_bytes(&self, _file_id: &str) -> StorageResult<Vec<u8>> {
                Ok(vec![])
            }

            async fn get_parent_folders(
                &self,
                object_ids: &[String],
            ) -> StorageResult<Vec<FileMeta>> {
                Ok(object_ids
                    .iter()
                    .map(|id| FileMeta::new(format!("{}/..", id), ".."))
                    .collect())
            }

            async fn overwrite_file_bytes(
                &self,
                _folder_id: &str,
                file_meta: &FileMeta,
                _file_bytes: &[u8],
            ) -> StorageResult<FileMeta> {
                Ok(file_meta.with_id("written"))
            }

            async fn get_or_create_subfolder(
                &self,
                _parent_folder_id: &str,
                folder_meta: &FileMeta,
            ) -> StorageResult<FileMeta> {
                Ok(folder_meta.with_id("folder"))
            }
        }

        let adapter: &dyn IoAdapter = &MockAdapter;

        let meta = adapter.get_meta("x").await.unwrap();
        assert_eq!(meta, FileMeta::new("x", "x"));

        let parent = adapter.get_parent_folder("x").await.unwrap();
        assert_eq!(parent.id.as_deref(), Some("x/.."));

        let debug_str = format!("{:?}", adapter);
        assert_eq!(debug_str, "IoAdapter(kind=local)");
    }
}
