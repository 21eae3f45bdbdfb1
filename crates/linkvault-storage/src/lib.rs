//! Linkvault Storage Library
//!
//! Object storage abstraction and its S3 and local filesystem implementations.
//!
//! # Storage key format
//!
//! Media objects live under `{origin}/{content_id}/{file_name}`, where every
//! segment has been passed through [`keys::sanitize_segment`] and the file name
//! is prefixed with the item's native id ([`keys::media_file_name`]). YouTube
//! media use the fixed origin `youtube`.
//!
//! Keys must not contain `..` or a leading `/`.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use linkvault_core::StorageBackend;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{ObjectMetadata, Storage, StorageError, StorageReader, StorageResult};
