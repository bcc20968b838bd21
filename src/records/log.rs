//! Append-only document log.

use crate::error::{Result, StoreError};
use crate::types::{DocumentId, EventRecord, StoredEvent, Timestamp};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Magic bytes for each document frame.
const FRAME_MAGIC: &[u8; 4] = b"EVT\0";

/// Current frame format version.
const FRAME_VERSION: u8 = 1;

/// Fixed part of a frame: magic + version + flags + id + created + payload length.
const FRAME_HEADER_SIZE: usize = 4 + 1 + 1 + 8 + 8 + 4;

/// Trailing checksum size.
const FRAME_CHECKSUM_SIZE: usize = 4;

/// Flushes appended frames to stable storage.
type SyncFn = fn(&File) -> io::Result<()>;

struct LogState {
    file: File,
    next_id: u64,
    size: u64,
    writes_since_sync: u64,
}

/// Append-only log of event documents.
///
/// Each frame holds one [`EventRecord`] encoded as MessagePack with named
/// fields, plus the store-assigned id and creation time.
pub struct DocumentLog {
    path: PathBuf,
    state: Mutex<LogState>,
    /// Sync every N writes (1 = every write).
    sync_interval: u64,
    sync_data: SyncFn,
}

/// Result of parsing one frame.
enum Frame {
    Complete(StoredEvent, usize),
    /// Not enough bytes left for a whole frame (interrupted append).
    Torn,
}

impl DocumentLog {
    /// Default sync interval: every write is durable before `append` returns.
    const DEFAULT_SYNC_INTERVAL: u64 = 1;

    /// Open or create a log, returning it with every stored document in
    /// append order.
    pub fn open(path: impl AsRef<Path>) -> Result<(Self, Vec<StoredEvent>)> {
        Self::open_with_sync_interval(path, Self::DEFAULT_SYNC_INTERVAL)
    }

    /// Open or create a log with a custom sync interval.
    /// - sync_interval = 0 or 1: sync every write
    /// - sync_interval = N: sync every N writes
    pub fn open_with_sync_interval(
        path: impl AsRef<Path>,
        sync_interval: u64,
    ) -> Result<(Self, Vec<StoredEvent>)> {
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;

        let (documents, valid_len) = Self::replay(&fs::read(&path)?)?;

        let on_disk = file.metadata()?.len();
        if valid_len < on_disk {
            tracing::warn!(
                path = %path.display(),
                discarded = on_disk - valid_len,
                "truncating torn frame at end of document log"
            );
            file.set_len(valid_len)?;
        }

        let next_id = documents.last().map(|d| d.id.0 + 1).unwrap_or(1);

        let log = Self {
            path,
            state: Mutex::new(LogState {
                file,
                next_id,
                size: valid_len,
                writes_since_sync: 0,
            }),
            sync_interval: sync_interval.max(1),
            sync_data: File::sync_data,
        };

        Ok((log, documents))
    }

    /// Append a document, assigning its id and creation time.
    ///
    /// A write or sync failure truncates the log back to its previous
    /// length and leaves the next id unused, so a failed append never
    /// leaves a document behind.
    pub fn append(&self, record: &EventRecord) -> Result<StoredEvent> {
        let mut state = self.state.lock();

        let document = StoredEvent {
            id: DocumentId(state.next_id),
            created: Timestamp::now(),
            record: record.clone(),
        };
        let frame = Self::encode_frame(&document)?;

        let offset = state.size;
        if let Err(e) = self.write_frame(&mut state, offset, &frame) {
            if let Err(truncate) = state.file.set_len(offset) {
                // Replay still stops at a checksum or torn-frame boundary.
                tracing::warn!(
                    path = %self.path.display(),
                    error = %truncate,
                    "failed to roll back document log append"
                );
            }
            return Err(e);
        }

        state.size = offset + frame.len() as u64;
        state.next_id += 1;

        Ok(document)
    }

    /// Write one frame at `offset`, syncing if the interval is due.
    fn write_frame(&self, state: &mut LogState, offset: u64, frame: &[u8]) -> Result<()> {
        Self::write_at(&mut state.file, offset, frame)?;

        if state.writes_since_sync + 1 >= self.sync_interval {
            (self.sync_data)(&state.file)?;
            state.writes_since_sync = 0;
        } else {
            state.writes_since_sync += 1;
        }

        Ok(())
    }

    #[cfg(test)]
    fn set_sync_data(&mut self, sync_data: SyncFn) {
        self.sync_data = sync_data;
    }

    /// Force sync all pending writes to disk.
    pub fn sync(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.file.sync_all()?;
        state.writes_since_sync = 0;
        Ok(())
    }

    /// Read every document back from disk.
    pub fn read_all(&self) -> Result<Vec<StoredEvent>> {
        let _state = self.state.lock();
        let (documents, _) = Self::replay(&fs::read(&self.path)?)?;
        Ok(documents)
    }

    /// Current log size in bytes.
    pub fn size(&self) -> u64 {
        self.state.lock().size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_at(file: &mut File, offset: u64, frame: &[u8]) -> Result<()> {
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(frame)?;
        Ok(())
    }

    fn encode_frame(document: &StoredEvent) -> Result<Vec<u8>> {
        let payload = rmp_serde::to_vec_named(&document.record)?;
        let payload_len = u32::try_from(payload.len())
            .map_err(|_| StoreError::Serialization("document too large".into()))?;

        let mut frame =
            Vec::with_capacity(FRAME_HEADER_SIZE + payload.len() + FRAME_CHECKSUM_SIZE);
        frame.extend_from_slice(FRAME_MAGIC);
        frame.push(FRAME_VERSION);
        frame.push(0u8); // flags (reserved)
        frame.extend_from_slice(&document.id.0.to_le_bytes());
        frame.extend_from_slice(&document.created.0.to_le_bytes());
        frame.extend_from_slice(&payload_len.to_le_bytes());
        frame.extend_from_slice(&payload);
        frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());

        Ok(frame)
    }

    /// Parse all frames. Returns the documents and the length of the valid
    /// prefix.
    fn replay(bytes: &[u8]) -> Result<(Vec<StoredEvent>, u64)> {
        let mut documents = Vec::new();
        let mut offset = 0usize;

        while offset < bytes.len() {
            match Self::decode_frame(&bytes[offset..])? {
                Frame::Complete(document, len) => {
                    documents.push(document);
                    offset += len;
                }
                Frame::Torn => break,
            }
        }

        Ok((documents, offset as u64))
    }

    fn decode_frame(bytes: &[u8]) -> Result<Frame> {
        if bytes.len() < FRAME_HEADER_SIZE {
            return Ok(Frame::Torn);
        }

        if &bytes[0..4] != FRAME_MAGIC {
            return Err(StoreError::InvalidFormat("Invalid document frame magic".into()));
        }
        if bytes[4] != FRAME_VERSION {
            return Err(StoreError::InvalidFormat(format!(
                "Unsupported document frame version: {}",
                bytes[4]
            )));
        }

        let id = DocumentId(u64::from_le_bytes(le_array(&bytes[6..14])));
        let created = Timestamp(i64::from_le_bytes(le_array(&bytes[14..22])));
        let payload_len = u32::from_le_bytes(le_array(&bytes[22..26])) as usize;

        let total = FRAME_HEADER_SIZE + payload_len + FRAME_CHECKSUM_SIZE;
        if bytes.len() < total {
            return Ok(Frame::Torn);
        }

        let payload = &bytes[FRAME_HEADER_SIZE..FRAME_HEADER_SIZE + payload_len];
        let stored_checksum = u32::from_le_bytes(le_array(&bytes[total - 4..total]));
        let computed_checksum = crc32fast::hash(payload);
        if stored_checksum != computed_checksum {
            return Err(StoreError::ChecksumMismatch {
                expected: stored_checksum,
                got: computed_checksum,
            });
        }

        let record: EventRecord = rmp_serde::from_slice(payload)?;
        Ok(Frame::Complete(StoredEvent { id, created, record }, total))
    }
}

fn le_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}
