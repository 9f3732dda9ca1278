//! Segmented, buffered writer for raw stream bytes.
//!
//! Bytes are accumulated in memory and written to the open segment once the
//! buffer reaches its threshold. Rotating or closing always drains the
//! buffer before the file handle is released, so every accepted byte ends
//! up in exactly one segment, in arrival order.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use liverec_common::clock::file_timestamp;
use liverec_common::error::{LiverecError, LiverecResult};
use liverec_platform_core::PostProcessor;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::notify::Notifications;

/// Where finished segments are handed off.
#[derive(Clone)]
pub struct SegmentHandoff {
    pub post_processor: Arc<dyn PostProcessor>,
    pub notifications: Notifications,
}

/// Writes one recording as a series of time-bounded segment files.
pub struct SegmentWriter {
    dir: PathBuf,
    handle: String,
    extension: String,
    threshold: usize,
    buffer: Vec<u8>,
    file: Option<File>,
    path: PathBuf,
    segment_bytes: u64,
    total_bytes: u64,
    finished: Vec<PathBuf>,
    handoff: SegmentHandoff,
}

impl SegmentWriter {
    /// Create `dir` if needed and open the first segment.
    pub async fn create(
        dir: PathBuf,
        handle: impl Into<String>,
        extension: impl Into<String>,
        threshold: usize,
        handoff: SegmentHandoff,
    ) -> LiverecResult<Self> {
        tokio::fs::create_dir_all(&dir).await?;

        let mut writer = Self {
            dir,
            handle: handle.into(),
            extension: extension.into(),
            threshold: threshold.max(1),
            buffer: Vec::with_capacity(threshold),
            file: None,
            path: PathBuf::new(),
            segment_bytes: 0,
            total_bytes: 0,
            finished: Vec::new(),
            handoff,
        };
        writer.open_segment().await?;
        Ok(writer)
    }

    /// Append a chunk, flushing to disk once the buffer is full.
    pub async fn write(&mut self, chunk: &[u8]) -> LiverecResult<()> {
        self.ensure_open()?;
        self.buffer.extend_from_slice(chunk);
        if self.buffer.len() >= self.threshold {
            self.flush_buffer().await?;
        }
        Ok(())
    }

    /// Close the current segment, hand it off, and open a fresh one.
    ///
    /// Returns the path of the new segment.
    pub async fn rotate(&mut self) -> LiverecResult<&Path> {
        self.ensure_open()?;
        if let Some(done) = self.finish_segment().await? {
            tracing::info!(path = %done.display(), "Segment saved");
            self.handoff.notifications.segment_saved(&done).await;
        }
        self.open_segment().await?;
        Ok(&self.path)
    }

    /// Close the current segment and hand it off without opening another.
    ///
    /// Returns the last segment that was handed off, if any.
    pub async fn close(&mut self) -> LiverecResult<Option<PathBuf>> {
        if self.file.is_some() {
            self.finish_segment().await?;
        }
        Ok(self.finished.last().cloned())
    }

    /// Path of the segment currently being written.
    pub fn current_path(&self) -> &Path {
        &self.path
    }

    /// Bytes accepted but not yet written to disk.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Bytes written to the current segment so far.
    pub fn segment_bytes(&self) -> u64 {
        self.segment_bytes
    }

    /// Bytes written across all segments.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Segments handed off so far, oldest first.
    pub fn segments(&self) -> &[PathBuf] {
        &self.finished
    }

    fn ensure_open(&self) -> LiverecResult<()> {
        if self.file.is_none() {
            return Err(LiverecError::unexpected("segment writer is closed"));
        }
        Ok(())
    }

    async fn flush_buffer(&mut self) -> LiverecResult<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| LiverecError::unexpected("segment writer is closed"))?;
        file.write_all(&self.buffer).await?;
        file.flush().await?;

        let written = self.buffer.len() as u64;
        self.segment_bytes += written;
        self.total_bytes += written;
        self.buffer.clear();
        Ok(())
    }

    /// Drain, close, and hand off the current segment.
    ///
    /// Empty segments are deleted instead of being post-processed.
    async fn finish_segment(&mut self) -> LiverecResult<Option<PathBuf>> {
        self.flush_buffer().await?;
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
        }

        let path = self.path.clone();
        if self.segment_bytes == 0 {
            tracing::debug!(path = %path.display(), "Removing empty segment");
            if let Err(e) = tokio::fs::remove_file(&path).await {
                tracing::warn!(error = %e, path = %path.display(), "Failed to remove empty segment");
            }
            return Ok(None);
        }

        self.handoff.post_processor.convert(path.clone());
        self.finished.push(path.clone());
        Ok(Some(path))
    }

    /// Open `<dir>/<handle>_<timestamp>_<extension>`, adding a `-N` counter
    /// when a segment for the same second already exists.
    async fn open_segment(&mut self) -> LiverecResult<()> {
        let stem = format!("{}_{}", self.handle, file_timestamp());
        let mut n = 0;
        let (file, path) = loop {
            let path = self.segment_path(&stem, n);
            match OpenOptions::new().create_new(true).write(true).open(&path).await {
                Ok(file) => break (file, path),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => n += 1,
                Err(e) => return Err(e.into()),
            }
        };

        tracing::info!(path = %path.display(), "Recording to file");
        self.file = Some(file);
        self.path = path;
        self.segment_bytes = 0;
        Ok(())
    }

    fn segment_path(&self, stem: &str, n: usize) -> PathBuf {
        match n {
            0 => self.dir.join(format!("{stem}_{}", self.extension)),
            n => self.dir.join(format!("{stem}-{n}_{}", self.extension)),
        }
    }
}
