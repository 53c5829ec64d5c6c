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

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::adapter::{metas_by_id, AdapterKind, FileMeta, IoAdapter};
use super::error::{StorageError, StorageResult};

/// Adapter over the local filesystem. Object ids are path strings.
#[derive(Debug, Clone, Default)]
pub struct LocalAdapter;

impl LocalAdapter {
    pub fn new() -> Self {
        Self
    }

    fn path_to_meta(path: &Path) -> FileMeta {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let meta = FileMeta::new(path.to_string_lossy().to_string(), name);

        match Self::parent_of(path) {
            Some(parent) => meta.with_parent_ids(vec![parent.to_string_lossy().to_string()]),
            None => meta,
        }
    }

    /// Parent directory, with `.` standing in for the parent of a bare relative name.
    fn parent_of(path: &Path) -> Option<PathBuf> {
        let parent = path.parent()?;
        if parent.as_os_str().is_empty() {
            Some(PathBuf::from("."))
        } else {
            Some(parent.to_path_buf())
        }
    }
}

#[async_trait]
impl IoAdapter for LocalAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Local
    }

    async fn list_dir_contents(&self, folder_id: &str) -> StorageResult<HashMap<String, FileMeta>> {
        let mut entries = tokio::fs::read_dir(folder_id)
            .await
            .map_err(|e| StorageError::from_io(e, folder_id))?;

        let mut metas = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            metas.push(Self::path_to_meta(&entry.path()));
        }

        debug!("Listed folder={}, found count={} entries", folder_id, metas.len());
        Ok(metas_by_id(metas))
    }

    async fn get_file_bytes(&self, file_id: &str) -> StorageResult<Vec<u8>> {
        tokio::fs::read(file_id)
            .await
            .map_err(|e| StorageError::from_io(e, file_id))
    }

    async fn get_parent_folders(&self, object_ids: &[String]) -> StorageResult<Vec<FileMeta>> {
        object_ids
            .iter()
            .map(|object_id| {
                Self::parent_of(Path::new(object_id))
                    .map(|parent| Self::path_to_meta(&parent))
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
        // A path is its own name lookup: writing folder/name updates or creates.
        let path_file = match &file_meta.id {
            Some(id) => PathBuf::from(id),
            None => Path::new(folder_id).join(file_meta.require_name("overwrite_file_bytes")?),
        };

        tokio::fs::write(&path_file, file_bytes)
            .await
            .map_err(|e| StorageError::from_io(e, &path_file.to_string_lossy()))?;

        info!(
            "Wrote file={}, size={} bytes",
            path_file.display(),
            file_bytes.len()
        );

        let written = Self::path_to_meta(&path_file);
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
        let dir_subfolder =
            Path::new(parent_folder_id).join(folder_meta.require_name("get_or_create_subfolder")?);

        if !tokio::fs::metadata(&dir_subfolder)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            tokio::fs::create_dir_all(&dir_subfolder).await?;
            info!("Created folder={}", dir_subfolder.display());
        }

        Ok(Self::path_to_meta(&dir_subfolder))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn dir_str(dir: &TempDir) -> String {
        dir.path().to_string_lossy().to_string()
    }

    #[tokio::test]
    async fn test_list_empty_dir_returns_empty_map() {
        let temp_dir = TempDir::new().unwrap();
        let adapter = LocalAdapter::new();

        let contents = adapter.list_dir_contents(&dir_str(&temp_dir)).await.unwrap();
        assert!(contents.is_empty());
    }

    #[tokio::test]
    async fn test_list_dir_contents_is_not_recursive() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), b"a").unwrap();
        fs::create_dir(temp_dir.path().join("sub")).unwrap();
        fs::write(temp_dir.path().join("sub").join("nested.txt"), b"n").unwrap();

        let adapter = LocalAdapter::new();
        let contents = adapter.list_dir_contents(&dir_str(&temp_dir)).await.unwrap();

        assert_eq!(contents.len(), 2);
        let file_id = temp_dir.path().join("a.txt").to_string_lossy().to_string();
        let meta = &contents[&file_id];
        assert_eq!(meta.name.as_deref(), Some("a.txt"));
        assert_eq!(meta.parent_ids, Some(vec![dir_str(&temp_dir)]));
        assert!(contents
            .values()
            .all(|m| m.name.as_deref() != Some("nested.txt")));
    }

    #[tokio::test]
    async fn test_list_missing_dir_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing").to_string_lossy().to_string();

        let result = LocalAdapter::new().list_dir_contents(&missing).await;
        assert!(matches!(result, Err(StorageError::NotFound { id }) if id == missing));
    }

    #[tokio::test]
    async fn test_get_file_bytes_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope.bin").to_string_lossy().to_string();

        let result = LocalAdapter::new().get_file_bytes(&missing).await;
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_overwrite_then_read_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let adapter = LocalAdapter::new();
        let payload = b"\x00\x01binary payload\xff".to_vec();

        let written = adapter
            .overwrite_file_bytes(&dir_str(&temp_dir), &FileMeta::named("data.bin"), &payload)
            .await
            .unwrap();

        let expected_id = temp_dir.path().join("data.bin").to_string_lossy().to_string();
        assert_eq!(written.id.as_deref(), Some(expected_id.as_str()));
        assert_eq!(written.name.as_deref(), Some("data.bin"));

        let read_back = adapter.get_file_bytes(&expected_id).await.unwrap();
        assert_eq!(read_back, payload);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_existing_file_by_name() {
        let temp_dir = TempDir::new().unwrap();
        let adapter = LocalAdapter::new();
        let folder = dir_str(&temp_dir);

        let first = adapter
            .overwrite_file_bytes(&folder, &FileMeta::named("v.txt"), b"one")
            .await
            .unwrap();
        let second = adapter
            .overwrite_file_bytes(&folder, &FileMeta::named("v.txt"), b"two")
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        let contents = adapter.list_dir_contents(&folder).await.unwrap();
        assert_eq!(contents.len(), 1);
        assert_eq!(
            adapter.get_file_bytes(second.id.as_deref().unwrap()).await.unwrap(),
            b"two"
        );
    }

    #[tokio::test]
    async fn test_overwrite_with_id_targets_that_path() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("explicit.txt").to_string_lossy().to_string();
        let meta = FileMeta::named("ignored-name.txt").with_id(target.clone());

        let written = LocalAdapter::new()
            .overwrite_file_bytes("/does/not/matter", &meta, b"hello")
            .await
            .unwrap();

        assert_eq!(written.id.as_deref(), Some(target.as_str()));
        assert_eq!(fs::read(&target).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_overwrite_without_name_or_id_fails() {
        let temp_dir = TempDir::new().unwrap();
        let result = LocalAdapter::new()
            .overwrite_file_bytes(&dir_str(&temp_dir), &FileMeta::default(), b"x")
            .await;

        assert!(matches!(result, Err(StorageError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_get_or_create_subfolder_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let adapter = LocalAdapter::new();
        let folder_meta = FileMeta::named("reports");

        let first = adapter
            .get_or_create_subfolder(&dir_str(&temp_dir), &folder_meta)
            .await
            .unwrap();
        let second = adapter
            .get_or_create_subfolder(&dir_str(&temp_dir), &folder_meta)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert!(temp_dir.path().join("reports").is_dir());
        assert_eq!(first.name.as_deref(), Some("reports"));
    }

    #[tokio::test]
    async fn test_get_parent_folder() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("child.txt");
        fs::write(&file, b"c").unwrap();

        let parent = LocalAdapter::new()
            .get_parent_folder(&file.to_string_lossy())
            .await
            .unwrap();

        assert_eq!(parent.id, Some(dir_str(&temp_dir)));
    }

    #[tokio::test]
    async fn test_get_parent_of_root_is_integrity_error() {
        let result = LocalAdapter::new().get_parent_folder("/").await;
        assert!(matches!(
            result,
            Err(StorageError::Integrity { parent_count: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_relative_name_parent_is_current_dir() {
        let parents = LocalAdapter::new()
            .get_parent_folders(&["file.txt".to_string()])
            .await
            .unwrap();

        assert_eq!(parents[0].id.as_deref(), Some("."));
    }
}
