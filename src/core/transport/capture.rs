//! Capture file source
//!
//! Replays a raw stream recorded from the board, a fixed number of bytes per
//! poll, so offline decoding exercises the same partial-read path as a live
//! port.

use super::{ByteSource, SourceType, TransportError, TransportStats};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::debug;

/// Default bytes handed out per poll
pub const DEFAULT_CAPTURE_CHUNK: usize = 1024;

/// File-backed byte source
pub struct CaptureSource {
    path: PathBuf,
    chunk_size: usize,
    follow: bool,
    file: Option<File>,
    exhausted: bool,
    stats: TransportStats,
    opened_at: Option<Instant>,
}

impl CaptureSource {
    /// Replay `path`, `chunk_size` bytes per receive
    pub fn new(path: impl AsRef<Path>, chunk_size: usize) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            chunk_size: chunk_size.max(1),
            follow: false,
            file: None,
            exhausted: false,
            stats: TransportStats::default(),
            opened_at: None,
        }
    }

    /// Keep polling at end of file instead of finishing (growing captures)
    #[must_use]
    pub fn follow(mut self, follow: bool) -> Self {
        self.follow = follow;
        self
    }
}

#[async_trait]
impl ByteSource for CaptureSource {
    async fn connect(&mut self) -> Result<(), TransportError> {
        let file = File::open(&self.path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                TransportError::PortNotFound(self.path.display().to_string())
            }
            std::io::ErrorKind::PermissionDenied => {
                TransportError::PermissionDenied(self.path.display().to_string())
            }
            _ => TransportError::IoError(e),
        })?;
        debug!(path = %self.path.display(), "Capture opened");
        self.file = Some(file);
        self.exhausted = false;
        self.opened_at = Some(Instant::now());
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        self.file = None;
        self.opened_at = None;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.file.is_some()
    }

    async fn receive(&mut self) -> Result<Bytes, TransportError> {
        let file = self.file.as_mut().ok_or(TransportError::NotConnected)?;

        let mut buf = vec![0u8; self.chunk_size];
        let n = file.read(&mut buf).await?;
        if n == 0 {
            if !self.follow {
                self.exhausted = true;
            }
            return Ok(Bytes::new());
        }

        buf.truncate(n);
        self.stats.bytes_received += n as u64;
        self.stats.chunks_received += 1;
        Ok(Bytes::from(buf))
    }

    fn source_type(&self) -> SourceType {
        SourceType::Capture
    }

    fn connection_info(&self) -> String {
        format!("{} ({} B/poll)", self.path.display(), self.chunk_size)
    }

    fn stats(&self) -> TransportStats {
        let mut stats = self.stats.clone();
        if let Some(opened_at) = self.opened_at {
            stats.uptime_secs = opened_at.elapsed().as_secs();
        }
        stats
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_replays_in_chunks() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"0123456789").unwrap();

        let mut source = CaptureSource::new(file.path(), 4);
        source.connect().await.unwrap();

        assert_eq!(&source.receive().await.unwrap()[..], b"0123");
        assert_eq!(&source.receive().await.unwrap()[..], b"4567");
        assert_eq!(&source.receive().await.unwrap()[..], b"89");
        assert!(!source.is_exhausted());
        assert!(source.receive().await.unwrap().is_empty());
        assert!(source.is_exhausted());
        assert_eq!(source.stats().bytes_received, 10);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let mut source = CaptureSource::new("/nonexistent/capture.txt", 16);
        assert!(matches!(
            source.connect().await,
            Err(TransportError::PortNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_follow_never_exhausts() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut source = CaptureSource::new(file.path(), 16).follow(true);
        source.connect().await.unwrap();
        assert!(source.receive().await.unwrap().is_empty());
        assert!(!source.is_exhausted());
    }
}
