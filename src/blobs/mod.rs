//! Asset storage and upload.
//!
//! Uploaded images are stored under globally unique keys, sharded into
//! directories by the first two characters of the key, and exposed through
//! a public base URL.

mod storage;
mod uploader;

pub use storage::{Asset, AssetStorage};
pub use uploader::{AssetConfig, AssetUploader, LocalAssetUploader};
