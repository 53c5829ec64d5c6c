//! Utility functions and helpers
//!
//! ## Modules
//!
//! - [`retry`] - Retry logic for transient failures
//! - [`util`] - Timestamp, identifier and file type helpers

pub mod retry;
pub mod util;
