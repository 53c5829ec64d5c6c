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

//! Storage adapter layer
//!
//! This module provides one interface, [`IoAdapter`], over three storage
//! media: the local filesystem, cloud object stores reached through the
//! `object_store` crate (AWS S3, Azure Data Lake, GCS, in-memory) and a
//! remote drive service.
//!
//! Adapters are built from a [`StorageConfig`] by [`IoAdapterFactory`] and
//! shared as `Arc<dyn IoAdapter>`.

pub mod adapter;
pub mod cloud;
pub mod config;
pub mod drive;
pub mod error;
pub mod factory;
pub mod local;

// Public exports
pub use adapter::{AdapterKind, FileMeta, IoAdapter};
pub use cloud::CloudPathAdapter;
pub use config::{StorageConfig, StorageType};
pub use drive::DriveAdapter;
pub use error::{ApiFailure, StorageError, StorageResult};
pub use factory::IoAdapterFactory;
pub use local::LocalAdapter;
