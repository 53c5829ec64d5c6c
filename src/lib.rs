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

//! # infra-io
//!
//! A storage adapter facade: one async interface over local paths, cloud
//! object stores and a remote drive service.
//!
//! ## Features
//!
//! - **One interface**: [`IoAdapter`] lists folders, reads and overwrites files,
//!   resolves parents and finds or creates subfolders on every medium
//! - **Cloud storage**: AWS S3, Azure Data Lake Storage, Google Cloud Storage and
//!   an in-memory store, through `object_store`
//! - **Remote drive**: Drive v3 REST with batched metadata calls, chunked
//!   downloads, sharing permissions and thumbnails
//! - **Explicit retries**: transient failures are retried per [`RetryConfig`]
//! - **Parallel downloads**: bounded concurrent fetching of plain URLs
//!
//! ## Quick Start
//!
//! ### Local Filesystem Example
//!
//! ```rust,no_run
//! use infra_io::{FileMeta, IoAdapterFactory, StorageConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let adapter = IoAdapterFactory::from_config(StorageConfig::local())?;
//!
//! let folder = adapter
//!     .get_or_create_subfolder("/tmp", &FileMeta::named("reports"))
//!     .await?;
//! let folder_id = folder.id.unwrap_or_default();
//!
//! adapter
//!     .overwrite_file_bytes(&folder_id, &FileMeta::named("summary.txt"), b"all good")
//!     .await?;
//!
//! for (id, meta) in adapter.list_dir_contents(&folder_id).await? {
//!     println!("{} -> {:?}", id, meta.name);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### AWS S3 Example
//!
//! ```rust,no_run
//! use infra_io::{IoAdapterFactory, StorageConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let config = StorageConfig::aws()
//!     .with_option("bucket", "my-bucket")
//!     .with_option("region", "us-east-1")
//!     .with_option("access_key_id", "ACCESS_KEY")
//!     .with_option("secret_access_key", "SECRET_KEY");
//!
//! let adapter = IoAdapterFactory::from_config(config)?;
//! let bytes = adapter.get_file_bytes("s3://my-bucket/reports/summary.txt").await?;
//! println!("read {} bytes", bytes.len());
//! # Ok(())
//! # }
//! ```
//!
//! ### Drive Example
//!
//! ```rust,no_run
//! use infra_io::{IoAdapterFactory, StorageConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let config = StorageConfig::drive()
//!     .with_option("refresh_token", "REFRESH_TOKEN")
//!     .with_option("client_secret_path", "client_secret.json");
//!
//! let adapter = IoAdapterFactory::from_config(config)?;
//! let shared = adapter.list_dir_contents("sharedWithMe").await?;
//! println!("{} items shared with me", shared.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`storage`] - Adapters, configuration and error types
//! - [`download`] - Bounded parallel URL downloader
//! - [`util`] - Retry policy and misc helpers

pub mod download;
pub mod storage;
pub mod util;

// Re-export commonly used types
pub use download::{download_all, download_all_indexed};
pub use storage::{
    ApiFailure, FileMeta, IoAdapter, IoAdapterFactory, StorageConfig, StorageError, StorageResult,
};
pub use util::retry::RetryConfig;
