//! Durable, directory-backed event store.

use super::{Collection, EventStore};
use crate::error::{Result, StoreError};
use crate::records::DocumentLog;
use crate::subscriptions::{ChangeListener, Subscription, SubscriptionConfig};
use crate::types::{DocumentId, EventRecord, FeedOrder, Snapshot};
use async_trait::async_trait;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Store configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base path for the store.
    pub path: PathBuf,

    /// Whether to create the store if it doesn't exist.
    pub create_if_missing: bool,

    /// Sync the document log every N writes.
    pub sync_interval: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./socials-store"),
            create_if_missing: true,
            sync_interval: 1,
        }
    }
}

/// Magic bytes for store manifest.
const STORE_MAGIC: &[u8; 4] = b"SOC\0";

/// Current store format version.
const STORE_VERSION: u8 = 1;

/// Event store persisted in a local directory.
///
/// Layout: `MANIFEST` (magic + version), `LOCK` (exclusive while open),
/// `events.log` (document log). The collection is replayed into memory on
/// open.
///
/// Log appends run on tokio's blocking pool, so `write` needs a tokio
/// runtime.
pub struct LocalEventStore {
    /// Store configuration.
    config: StoreConfig,

    inner: Arc<StoreFiles>,
}

/// State shared with in-flight blocking appends.
struct StoreFiles {
    /// Lock file for exclusive access.
    _lock_file: File,

    log: DocumentLog,

    collection: Collection,
}

impl LocalEventStore {
    /// Open an existing store or create a new one.
    pub fn open_or_create(config: StoreConfig) -> Result<Self> {
        if config.path.join("MANIFEST").exists() {
            Self::open(config)
        } else if config.create_if_missing {
            Self::create(config)
        } else {
            Err(StoreError::NotInitialized)
        }
    }

    /// Create a new store.
    pub fn create(config: StoreConfig) -> Result<Self> {
        fs::create_dir_all(&config.path)?;
        Self::write_manifest(&config.path)?;
        Self::load(config)
    }

    /// Open an existing store.
    pub fn open(config: StoreConfig) -> Result<Self> {
        if !config.path.join("MANIFEST").exists() {
            return Err(StoreError::NotInitialized);
        }
        Self::verify_manifest(&config.path)?;
        Self::load(config)
    }

    fn load(config: StoreConfig) -> Result<Self> {
        let lock_file = Self::acquire_lock(&config.path)?;

        let (log, documents) = DocumentLog::open_with_sync_interval(
            config.path.join("events.log"),
            config.sync_interval,
        )?;

        tracing::info!(
            path = %config.path.display(),
            documents = documents.len(),
            "opened event store"
        );

        Ok(Self {
            config,
            inner: Arc::new(StoreFiles {
                _lock_file: lock_file,
                log,
                collection: Collection::new(documents),
            }),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Current snapshot, without subscribing.
    pub fn snapshot(&self, order: FeedOrder) -> Snapshot {
        self.inner.collection.snapshot(order)
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.inner.collection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of attached listeners.
    pub fn subscription_count(&self) -> usize {
        self.inner.collection.subscription_count()
    }

    /// Force sync the document log.
    pub fn sync(&self) -> Result<()> {
        self.inner.log.sync()
    }

    /// Disconnect every listener and refuse further work.
    pub fn shutdown(&self) {
        self.inner.collection.shutdown();
        if let Err(e) = self.inner.log.sync() {
            tracing::warn!(error = %e, "failed to sync document log on shutdown");
        }
    }

    fn write_manifest(path: &Path) -> Result<()> {
        let mut file = File::create(path.join("MANIFEST"))?;
        file.write_all(STORE_MAGIC)?;
        file.write_all(&[STORE_VERSION])?;
        file.sync_all()?;
        Ok(())
    }

    fn verify_manifest(path: &Path) -> Result<()> {
        let mut file = File::open(path.join("MANIFEST"))?;

        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        if &magic != STORE_MAGIC {
            return Err(StoreError::InvalidFormat("Invalid store magic".into()));
        }

        let mut version = [0u8; 1];
        file.read_exact(&mut version)?;
        if version[0] != STORE_VERSION {
            return Err(StoreError::InvalidFormat(format!(
                "Unsupported store version: {}",
                version[0]
            )));
        }

        Ok(())
    }

    fn acquire_lock(path: &Path) -> Result<File> {
        let lock_file = File::create(path.join("LOCK"))?;
        lock_file
            .try_lock_exclusive()
            .map_err(|_| StoreError::Locked)?;
        Ok(lock_file)
    }
}

#[async_trait]
impl EventStore for LocalEventStore {
    async fn subscribe(
        &self,
        config: SubscriptionConfig,
        on_change: ChangeListener,
    ) -> Subscription {
        self.inner.collection.attach(config, on_change)
    }

    async fn write(&self, record: EventRecord) -> Result<DocumentId> {
        record.check()?;

        let files = Arc::clone(&self.inner);
        let document = tokio::task::spawn_blocking(move || {
            files
                .collection
                .insert_with(|| files.log.append(&record))
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("document write task failed: {}", e)))??;

        tracing::info!(
            document = %document.id,
            name = %document.event_name,
            "event persisted"
        );
        Ok(document.id)
    }
}

impl Drop for StoreFiles {
    fn drop(&mut self) {
        // Best-effort sync on drop
        let _ = self.log.sync();
    }
}
