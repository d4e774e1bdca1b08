//! Append-only log file storage.
//!
//! Every write appends one self-describing frame (see [`codec`]); every read
//! replays the whole file from offset zero because there is no index. Cost
//! is O(n) per read regardless of which record is sought. File access runs
//! on the runtime's blocking pool.
//!
//! There is no update in place and no compaction, so soft deletes cannot be
//! recorded: [`Storage::delete`] returns [`StorageError::Unsupported`].

mod codec;

use crate::pool::run_blocking;
use async_trait::async_trait;
use parking_lot::Mutex;
use shrink_core::error::{Result, StorageError};
use shrink_core::{ReadStorage, ShortenedUrl, Stat, Storage};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Write side of the log.
trait LogWriter: Write + Send {
    fn size(&self) -> io::Result<u64>;
    fn truncate(&mut self, len: u64) -> io::Result<()>;
    fn sync(&mut self) -> io::Result<()>;
}

impl LogWriter for File {
    fn size(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

/// Open write and read handles over the same log file.
///
/// The read handle keeps its own cursor; it is rewound before each replay.
struct Handles {
    writer: Box<dyn LogWriter>,
    reader: BufReader<File>,
}

impl Handles {
    fn replay(&mut self) -> Result<Vec<ShortenedUrl>> {
        self.reader.seek(SeekFrom::Start(0))?;

        let mut records = Vec::new();
        while let Some(record) = codec::decode_next(&mut self.reader)? {
            records.push(record);
        }

        trace!(count = records.len(), "replayed log");
        Ok(records)
    }

    fn append(&mut self, frame: &[u8]) -> io::Result<()> {
        self.writer.write_all(frame)?;
        self.writer.flush()
    }
}

/// File-backed implementation of the storage contract.
///
/// One mutex serializes all file access, reads included, so the read
/// handle's cursor is never shared between two replays.
pub struct FileStorage {
    path: PathBuf,
    handles: Arc<Mutex<Option<Handles>>>,
}

impl std::fmt::Debug for FileStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStorage")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl FileStorage {
    /// Opens the log at `path`, creating it if missing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let writer = OpenOptions::new().create(true).append(true).open(&path)?;
        Self::with_writer(path, Box::new(writer))
    }

    fn with_writer(path: PathBuf, writer: Box<dyn LogWriter>) -> Result<Self> {
        let reader = OpenOptions::new().read(true).open(&path)?;

        debug!(path = %path.display(), "opened file storage");
        Ok(Self {
            path,
            handles: Arc::new(Mutex::new(Some(Handles {
                writer,
                reader: BufReader::new(reader),
            }))),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn with_handles<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Handles) -> Result<T> + Send + 'static,
    {
        let handles = Arc::clone(&self.handles);
        run_blocking(move || {
            let mut guard = handles.lock();
            let handles = guard.as_mut().ok_or(StorageError::Closed)?;
            f(handles)
        })
        .await
    }

    async fn records(&self) -> Result<Vec<ShortenedUrl>> {
        self.with_handles(Handles::replay).await
    }
}

#[async_trait]
impl ReadStorage for FileStorage {
    async fn get_by_slug(&self, slug: &str) -> Result<ShortenedUrl> {
        Ok(self
            .records()
            .await?
            .into_iter()
            .find(|r| r.slug == slug)
            .unwrap_or_default())
    }

    async fn get_by_url(&self, raw: &str) -> Result<ShortenedUrl> {
        Ok(self
            .records()
            .await?
            .into_iter()
            .find(|r| r.raw == raw)
            .unwrap_or_default())
    }

    async fn collect_by_user(&self, user_id: &str) -> Result<Vec<ShortenedUrl>> {
        if user_id.is_empty() {
            return Err(StorageError::EmptyUserId);
        }

        Ok(self
            .records()
            .await?
            .into_iter()
            .filter(|r| r.user_id == user_id)
            .collect())
    }

    async fn stat(&self) -> Result<Stat> {
        let records = self.records().await?;
        let users: HashSet<&str> = records.iter().map(|r| r.user_id.as_str()).collect();

        Ok(Stat {
            urls: records.len() as u64,
            users: users.len() as u64,
        })
    }
}

#[async_trait]
impl Storage for FileStorage {
    /// Appends one record after checking the `(raw, user_id)` pair and the
    /// slug against a full replay of the log.
    async fn save(&self, url: ShortenedUrl) -> Result<()> {
        let mut frame = Vec::new();
        codec::encode(&url, &mut frame)?;

        self.with_handles(move |handles| {
            let duplicate = handles
                .replay()?
                .iter()
                .any(|r| (r.raw == url.raw && r.user_id == url.user_id) || r.slug == url.slug);
            if duplicate {
                warn!(slug = %url.slug, user_id = %url.user_id, "rejected duplicate shortened url");
                return Err(StorageError::UniqueViolation);
            }

            handles.append(&frame)?;
            debug!(slug = %url.slug, user_id = %url.user_id, "saved shortened url");
            Ok(())
        })
        .await
    }

    /// Appends every record in order, after checking that no slug is taken
    /// by the log or repeated within the batch.
    ///
    /// If any write fails, the file is truncated back to its length before
    /// the batch and the error returned.
    async fn batch(&self, urls: Vec<ShortenedUrl>) -> Result<()> {
        let mut frames = Vec::with_capacity(urls.len());
        for url in &urls {
            let mut frame = Vec::new();
            codec::encode(url, &mut frame)?;
            frames.push(frame);
        }

        self.with_handles(move |handles| {
            let mut slugs: HashSet<String> =
                handles.replay()?.into_iter().map(|r| r.slug).collect();
            for url in &urls {
                if !slugs.insert(url.slug.clone()) {
                    warn!(slug = %url.slug, "rejected batch with a taken slug");
                    return Err(StorageError::UniqueViolation);
                }
            }

            let start = handles.writer.size()?;
            for frame in &frames {
                if let Err(err) = handles.append(frame) {
                    warn!(error = %err, start, "batch write failed, rolling back");
                    handles.writer.truncate(start)?;
                    return Err(err.into());
                }
            }

            debug!(count = frames.len(), "saved shortened url batch");
            Ok(())
        })
        .await
    }

    async fn delete(&self, _user_id: &str, _slugs: &[String]) -> Result<()> {
        Err(StorageError::Unsupported("delete"))
    }

    /// Flushes and closes both handles. Later calls on this storage return
    /// [`StorageError::Closed`]; closing twice is a no-op.
    async fn close(&self) -> Result<()> {
        let handles = Arc::clone(&self.handles);
        let path = self.path.clone();

        run_blocking(move || {
            let Some(mut handles) = handles.lock().take() else {
                return Ok(());
            };

            let write = handles.writer.flush().and_then(|_| handles.writer.sync());
            let read = handles.reader.get_ref().sync_all();
            drop(handles);

            debug!(path = %path.display(), "closed file storage");
            match (write, read) {
                (Ok(()), Ok(())) => Ok(()),
                (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e.into()),
                (Err(w), Err(r)) => Err(StorageError::Io(io::Error::new(
                    w.kind(),
                    format!("close files - {w}; {r}"),
                ))),
            }
        })
        .await
    }
}
