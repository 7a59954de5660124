//! In-memory chunk source

use super::{ByteSource, SourceType, TransportError, TransportStats};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::VecDeque;

/// Hands out queued chunks one per receive, then reports exhaustion
///
/// An optional scripted fault is raised once the queue is drained, which is
/// how tests model a port that disappears mid-stream.
#[derive(Debug, Default)]
pub struct ChunkSource {
    chunks: VecDeque<Bytes>,
    connected: bool,
    fail_when_drained: bool,
    stats: TransportStats,
}

impl ChunkSource {
    /// Queue the given chunks
    pub fn new<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Split `data` into chunks of `size` bytes
    pub fn chunked(data: &[u8], size: usize) -> Self {
        Self::new(
            data.chunks(size.max(1))
                .map(Bytes::copy_from_slice)
                .collect::<Vec<_>>(),
        )
    }

    /// Raise `Disconnected` instead of finishing once drained
    #[must_use]
    pub fn fail_when_drained(mut self) -> Self {
        self.fail_when_drained = true;
        self
    }
}

#[async_trait]
impl ByteSource for ChunkSource {
    async fn connect(&mut self) -> Result<(), TransportError> {
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn receive(&mut self) -> Result<Bytes, TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        match self.chunks.pop_front() {
            Some(chunk) => {
                self.stats.bytes_received += chunk.len() as u64;
                self.stats.chunks_received += 1;
                Ok(chunk)
            }
            None if self.fail_when_drained => Err(TransportError::Disconnected),
            None => Ok(Bytes::new()),
        }
    }

    fn source_type(&self) -> SourceType {
        SourceType::Memory
    }

    fn connection_info(&self) -> String {
        format!("memory ({} chunks queued)", self.chunks.len())
    }

    fn stats(&self) -> TransportStats {
        self.stats.clone()
    }

    fn is_exhausted(&self) -> bool {
        self.chunks.is_empty() && !self.fail_when_drained
    }
}
