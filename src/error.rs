//! Error types for the event store, the asset uploader and the creation
//! workflow.

use crate::types::FormField;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for document store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Invalid event record: {0}")]
    InvalidRecord(String),

    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    #[error("Asset already exists: {0}")]
    AssetExists(String),

    #[error("Invalid asset key: {0}")]
    InvalidKey(String),

    #[error("Store is locked by another process")]
    Locked,

    #[error("Store not initialized")]
    NotInitialized,

    #[error("Store has been shut down")]
    Closed,

    #[error("Invalid store format: {0}")]
    InvalidFormat(String),

    #[error("Checksum mismatch: expected {expected}, got {got}")]
    ChecksumMismatch { expected: u32, got: u32 },

    #[error("Digest mismatch for asset {key}")]
    DigestMismatch { key: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for StoreError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for StoreError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        StoreError::Deserialization(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// One or more required form fields were empty at submit time.
///
/// The display string is the only text ever shown to the user; `missing`
/// is kept for logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("All fields are required")]
pub struct ValidationError {
    pub missing: Vec<FormField>,
}

/// Asset transfer failed. No URL is produced and nothing may reference the
/// asset.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Failed to read local image {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Local image {0} is empty")]
    EmptyAsset(PathBuf),

    #[error("Invalid local image reference: {0}")]
    InvalidReference(String),

    #[error("Could not build a public URL for {key}: {source}")]
    Url {
        key: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Asset storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Listener failed to attach or was dropped. The feed keeps its last snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    #[error("Subscription rejected: {0}")]
    Rejected(String),

    #[error("Subscription disconnected")]
    Disconnected,
}

/// Why one creation attempt stopped. Carries the error of the first failing
/// step.
#[derive(Debug, Error)]
pub enum CreationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Image upload failed: {0}")]
    Upload(#[from] UploadError),

    #[error("Saving the event failed: {0}")]
    Persist(#[source] StoreError),
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Errors from opening a [`crate::SocialsContext`].
#[derive(Debug, Error)]
pub enum SocialsError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
