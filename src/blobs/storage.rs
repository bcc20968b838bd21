//! Asset storage implementation.

use crate::error::{Result, StoreError};
use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

/// Magic bytes for asset files.
const ASSET_MAGIC: &[u8; 4] = b"AST\0";

/// Current asset format version.
const ASSET_VERSION: u8 = 1;

/// Suffix of in-flight writes. Never visible under a final key.
const TEMP_SUFFIX: &str = ".partial";

/// A stored asset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Asset {
    pub key: String,
    pub content: Vec<u8>,
    pub content_type: String,
    /// Hex SHA-256 of `content`.
    pub digest: String,
}

/// Keyed asset storage.
///
/// Assets are written once under a caller-chosen key and never modified.
pub struct AssetStorage {
    /// Base directory for assets.
    path: PathBuf,

    /// LRU cache for recently accessed assets.
    cache: Mutex<LruCache<String, Asset>>,
}

impl AssetStorage {
    /// Create a new asset storage at the given path.
    pub fn new(path: impl AsRef<Path>, cache_size: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        fs::create_dir_all(&path)?;

        let cache_size = NonZeroUsize::new(cache_size.max(1)).unwrap_or(NonZeroUsize::MIN);

        Ok(Self {
            path,
            cache: Mutex::new(LruCache::new(cache_size)),
        })
    }

    /// Store an asset under `key`.
    ///
    /// The content is written to a temporary file and renamed into place, so
    /// a failed write never leaves a readable object behind.
    pub fn put(&self, key: &str, content: &[u8], content_type: &str) -> Result<Asset> {
        validate_key(key)?;

        if self.exists(key) {
            return Err(StoreError::AssetExists(key.to_string()));
        }

        let shard_dir = self.shard_path(key);
        fs::create_dir_all(&shard_dir)?;

        let digest = Sha256::digest(content);
        let final_path = self.asset_path(key);
        let temp_path = shard_dir.join(format!("{}{}", key, TEMP_SUFFIX));

        if let Err(e) = Self::write_file(&temp_path, content, content_type, &digest) {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }
        if let Err(e) = fs::rename(&temp_path, &final_path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        let asset = Asset {
            key: key.to_string(),
            content: content.to_vec(),
            content_type: content_type.to_string(),
            digest: hex::encode(digest),
        };
        self.cache.lock().put(key.to_string(), asset.clone());

        Ok(asset)
    }

    fn write_file(path: &Path, content: &[u8], content_type: &str, digest: &[u8]) -> Result<()> {
        let mut file = File::create(path)?;

        // Header
        file.write_all(ASSET_MAGIC)?;
        file.write_all(&[ASSET_VERSION])?;

        // Content type
        let content_type_bytes = content_type.as_bytes();
        let content_type_len = u16::try_from(content_type_bytes.len())
            .map_err(|_| StoreError::InvalidFormat("content type too long".into()))?;
        file.write_all(&content_type_len.to_le_bytes())?;
        file.write_all(content_type_bytes)?;

        // Digest
        file.write_all(digest)?;

        // Content
        file.write_all(&(content.len() as u64).to_le_bytes())?;
        file.write_all(content)?;

        // Checksum
        file.write_all(&crc32fast::hash(content).to_le_bytes())?;

        file.sync_all()?;
        Ok(())
    }

    /// Get an asset by key.
    pub fn get(&self, key: &str) -> Result<Option<Asset>> {
        validate_key(key)?;

        if let Some(cached) = self.cache.lock().get(key).cloned() {
            return Ok(Some(cached));
        }

        let asset_path = self.asset_path(key);
        if !asset_path.exists() {
            return Ok(None);
        }

        let mut file = File::open(&asset_path)?;
        let file_len = file.metadata()?.len();

        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        if &magic != ASSET_MAGIC {
            return Err(StoreError::InvalidFormat("Invalid asset magic".into()));
        }

        let mut version = [0u8; 1];
        file.read_exact(&mut version)?;
        if version[0] != ASSET_VERSION {
            return Err(StoreError::InvalidFormat(format!(
                "Unsupported asset version: {}",
                version[0]
            )));
        }

        let mut content_type_len_bytes = [0u8; 2];
        file.read_exact(&mut content_type_len_bytes)?;
        let content_type_len = u16::from_le_bytes(content_type_len_bytes) as usize;
        let mut content_type_bytes = vec![0u8; content_type_len];
        file.read_exact(&mut content_type_bytes)?;
        let content_type = String::from_utf8_lossy(&content_type_bytes).into_owned();

        let mut stored_digest = [0u8; 32];
        file.read_exact(&mut stored_digest)?;

        let mut content_len_bytes = [0u8; 8];
        file.read_exact(&mut content_len_bytes)?;
        let content_len = u64::from_le_bytes(content_len_bytes);

        // Content plus trailing checksum must fit in what is left of the file.
        let header_len = (ASSET_MAGIC.len() + 1 + 2 + content_type_len + 32 + 8) as u64;
        let available = file_len.saturating_sub(header_len);
        if content_len.checked_add(4).map_or(true, |needed| needed > available) {
            return Err(StoreError::InvalidFormat(format!(
                "Asset {} declares {} content bytes but only {} remain",
                key, content_len, available
            )));
        }
        let content_len = usize::try_from(content_len)
            .map_err(|_| StoreError::InvalidFormat("Asset content too large".into()))?;
        let mut content = vec![0u8; content_len];
        file.read_exact(&mut content)?;

        let mut checksum_bytes = [0u8; 4];
        file.read_exact(&mut checksum_bytes)?;
        let stored_checksum = u32::from_le_bytes(checksum_bytes);
        let computed_checksum = crc32fast::hash(&content);
        if stored_checksum != computed_checksum {
            return Err(StoreError::ChecksumMismatch {
                expected: stored_checksum,
                got: computed_checksum,
            });
        }

        if Sha256::digest(&content).as_slice() != stored_digest.as_slice() {
            return Err(StoreError::DigestMismatch {
                key: key.to_string(),
            });
        }

        let asset = Asset {
            key: key.to_string(),
            content,
            content_type,
            digest: hex::encode(stored_digest),
        };
        self.cache.lock().put(key.to_string(), asset.clone());

        Ok(Some(asset))
    }

    /// Check if an asset exists.
    pub fn exists(&self, key: &str) -> bool {
        if self.cache.lock().contains(key) {
            return true;
        }
        self.asset_path(key).exists()
    }

    /// List all asset keys. In-flight temporary files are not listed.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();

        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                for asset_entry in fs::read_dir(entry.path())? {
                    let name = asset_entry?.file_name().to_string_lossy().into_owned();
                    if !name.ends_with(TEMP_SUFFIX) {
                        keys.push(name);
                    }
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    /// Get total size of all asset files.
    pub fn total_size(&self) -> Result<u64> {
        let mut total = 0u64;

        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                for asset_entry in fs::read_dir(entry.path())? {
                    let asset_entry = asset_entry?;
                    if !asset_entry.file_name().to_string_lossy().ends_with(TEMP_SUFFIX) {
                        total += asset_entry.metadata()?.len();
                    }
                }
            }
        }

        Ok(total)
    }

    /// Shard directory: first two characters of the key.
    fn shard_path(&self, key: &str) -> PathBuf {
        let prefix: String = key.chars().take(2).collect();
        self.path.join(prefix)
    }

    fn asset_path(&self, key: &str) -> PathBuf {
        self.shard_path(key).join(key)
    }
}

/// Keys are single path segments of ASCII alphanumerics, `-`, `_` and `.`.
fn validate_key(key: &str) -> Result<()> {
    let valid = key.len() >= 2
        && !key.starts_with('.')
        && !key.ends_with(TEMP_SUFFIX)
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}
