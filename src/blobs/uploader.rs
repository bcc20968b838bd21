//! Image upload: local reference in, durable public URL out.

use super::storage::{Asset, AssetStorage};
use crate::error::{ConfigError, Result, SocialsError, UploadError};
use crate::types::{is_durable_url, LocalImage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;
use uuid::Uuid;

/// Content type assumed when the source path has no recognizable image
/// extension.
const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

/// Asset storage configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Directory holding uploaded assets.
    pub path: PathBuf,

    /// Public URL prefix under which assets are served.
    pub public_base_url: String,

    /// Read cache size (number of assets).
    pub cache_size: usize,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./socials-assets"),
            public_base_url: "https://assets.example.com/socials/".to_string(),
            cache_size: 64,
        }
    }
}

impl AssetConfig {
    /// Parse and check the public base URL, normalized to end in `/`.
    pub fn base_url(&self) -> std::result::Result<Url, ConfigError> {
        let mut url = Url::parse(&self.public_base_url).map_err(|e| ConfigError::Invalid {
            key: "assets.public_base_url",
            reason: e.to_string(),
        })?;

        if !is_durable_url(&url) {
            return Err(ConfigError::Invalid {
                key: "assets.public_base_url",
                reason: format!("{} is not an http(s) URL", url),
            });
        }

        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        Ok(url)
    }
}

/// Turns a local image reference into a durable, publicly fetchable URL.
///
/// Implementations must not touch the source, and must only return a URL
/// once the whole asset is stored.
#[async_trait]
pub trait AssetUploader: Send + Sync {
    async fn upload(&self, image: &LocalImage) -> std::result::Result<Url, UploadError>;
}

/// Uploader backed by an [`AssetStorage`] directory that is served under a
/// public base URL.
///
/// Asset writes run on tokio's blocking pool, so `upload` needs a tokio
/// runtime.
pub struct LocalAssetUploader {
    storage: Arc<AssetStorage>,
    public_base: Url,
}

impl LocalAssetUploader {
    pub fn new(storage: AssetStorage, public_base: Url) -> Self {
        Self {
            storage: Arc::new(storage),
            public_base,
        }
    }

    /// Open the storage directory described by `config`.
    pub fn open(config: &AssetConfig) -> std::result::Result<Self, SocialsError> {
        let public_base = config.base_url()?;
        let storage = AssetStorage::new(&config.path, config.cache_size)?;
        Ok(Self::new(storage, public_base))
    }

    pub fn storage(&self) -> &AssetStorage {
        &self.storage
    }

    /// Public URL for a key.
    pub fn public_url(&self, key: &str) -> std::result::Result<Url, UploadError> {
        self.public_base.join(key).map_err(|source| UploadError::Url {
            key: key.to_string(),
            source,
        })
    }

    /// Resolve a URL returned by [`upload`](AssetUploader::upload) to the
    /// stored asset. URLs outside the public base resolve to `None`.
    pub fn fetch(&self, url: &Url) -> Result<Option<Asset>> {
        match url.as_str().strip_prefix(self.public_base.as_str()) {
            Some(key) if !key.is_empty() => self.storage.get(key),
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl AssetUploader for LocalAssetUploader {
    async fn upload(&self, image: &LocalImage) -> std::result::Result<Url, UploadError> {
        let path = image.to_path()?;

        let content = tokio::fs::read(&path)
            .await
            .map_err(|source| UploadError::Read {
                path: path.clone(),
                source,
            })?;
        if content.is_empty() {
            return Err(UploadError::EmptyAsset(path));
        }

        let (content_type, suffix) = image_type(&path);
        let key = format!("{}.{}", Uuid::new_v4().simple(), suffix);
        let url = self.public_url(&key)?;

        let storage = Arc::clone(&self.storage);
        let asset_key = key.clone();
        let asset = tokio::task::spawn_blocking(move || {
            storage.put(&asset_key, &content, &content_type)
        })
        .await
        .map_err(|e| UploadError::Transport(format!("asset write task failed: {}", e)))??;

        tracing::info!(
            key = %key,
            bytes = asset.content.len(),
            content_type = %asset.content_type,
            "uploaded image asset"
        );

        Ok(url)
    }
}

/// Content type and key suffix for a source image.
fn image_type(path: &Path) -> (String, &'static str) {
    let guessed = mime_guess::from_path(path)
        .first()
        .filter(|mime| mime.type_().as_str() == "image");

    let Some(mime) = guessed else {
        return (DEFAULT_CONTENT_TYPE.to_string(), "jpg");
    };

    let suffix = match mime.subtype().as_str() {
        "png" => "png",
        "gif" => "gif",
        "webp" => "webp",
        "heic" | "heif" => "heic",
        _ => "jpg",
    };
    (mime.essence_str().to_string(), suffix)
}
