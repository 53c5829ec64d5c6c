use std::sync::Arc;
use tracing::info;

use super::adapter::IoAdapter;
use super::cloud::CloudPathAdapter;
use super::config::{StorageConfig, StorageType};
use super::drive::DriveAdapter;
use super::error::StorageResult;
use super::local::LocalAdapter;

/// Factory for creating IO adapters
pub struct IoAdapterFactory;

impl IoAdapterFactory {
    /// Create an IO adapter from a configuration.
    ///
    /// `local` maps to [`LocalAdapter`], the object store types (`aws`,
    /// `azure`, `gcs`, `memory`) to [`CloudPathAdapter`] and `drive` to
    /// [`DriveAdapter`].
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// * Required configuration options are missing
    /// * The object store backend cannot be built
    /// * Drive credentials cannot be loaded
    pub fn from_config(config: StorageConfig) -> StorageResult<Arc<dyn IoAdapter>> {
        let adapter: Arc<dyn IoAdapter> = match config.storage_type {
            StorageType::Local => Arc::new(LocalAdapter::new()),
            StorageType::Aws | StorageType::Azure | StorageType::Gcs | StorageType::Memory => {
                Arc::new(CloudPathAdapter::new(&config)?)
            }
            StorageType::Drive => Arc::new(DriveAdapter::from_config(&config)?),
        };

        info!(
            "Created IO adapter kind={} for storage type={}",
            adapter.kind(),
            config.storage_type_str()
        );
        Ok(adapter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::adapter::{AdapterKind, FileMeta};
    use crate::storage::error::StorageError;

    #[test]
    fn test_local_config() {
        let adapter = IoAdapterFactory::from_config(StorageConfig::local()).unwrap();
        assert_eq!(adapter.kind(), AdapterKind::Local);
    }

    #[test]
    fn test_drive_config_with_token() {
        let config = StorageConfig::drive().with_option("access_token", "tok");
        let adapter = IoAdapterFactory::from_config(config).unwrap();
        assert_eq!(adapter.kind(), AdapterKind::Drive);
        assert_eq!(format!("{:?}", adapter), "IoAdapter(kind=drive)");
    }

    #[test]
    fn test_drive_config_without_credentials() {
        let result = IoAdapterFactory::from_config(StorageConfig::drive());
        assert!(matches!(result, Err(StorageError::ConfigError(_))));
    }

    #[test]
    fn test_aws_config_requires_bucket() {
        let result = IoAdapterFactory::from_config(StorageConfig::aws());
        assert!(matches!(result, Err(StorageError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_memory_adapter_round_trip() {
        let adapter = IoAdapterFactory::from_config(StorageConfig::memory()).unwrap();
        assert_eq!(adapter.kind(), AdapterKind::CloudPath);

        let folder = adapter
            .get_or_create_subfolder("memory://", &FileMeta::named("docs"))
            .await
            .unwrap();
        let folder_id = folder.id.unwrap();
        let written = adapter
            .overwrite_file_bytes(&folder_id, &FileMeta::named("a.txt"), b"hello")
            .await
            .unwrap();

        let bytes = adapter
            .get_file_bytes(written.id.as_deref().unwrap())
            .await
            .unwrap();
        assert_eq!(bytes, b"hello");

        let listing = adapter.list_dir_contents(&folder_id).await.unwrap();
        assert_eq!(listing.len(), 1);
    }
}
