//! Byte sources feeding the decoder
//!
//! Supports:
//! - Serial ports (USB CDC, USB-Serial adapters)
//! - Capture files (offline replay of a recorded stream)
//! - In-memory chunk queues (tests, simulation)
//!
//! A source only hands out what is available right now; reconnection and
//! port configuration stay with the caller.

mod capture;
mod memory;
mod serial;

pub use capture::{CaptureSource, DEFAULT_CAPTURE_CHUNK};
pub use memory::ChunkSource;
pub use serial::{list_ports, SerialConfig, SerialFlowControl, SerialParity, SerialTransport};

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use thiserror::Error;

/// Source type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceType {
    /// Serial port
    Serial,
    /// Capture file
    Capture,
    /// In-memory queue
    Memory,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial => write!(f, "Serial"),
            Self::Capture => write!(f, "Capture"),
            Self::Memory => write!(f, "Memory"),
        }
    }
}

/// Transport error types
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Port not found
    #[error("Port not found: {0}")]
    PortNotFound(String),

    /// Permission denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Not connected
    #[error("Not connected")]
    NotConnected,

    /// Disconnected
    #[error("Disconnected")]
    Disconnected,
}

/// Source statistics
#[derive(Debug, Clone, Default)]
pub struct TransportStats {
    /// Bytes received
    pub bytes_received: u64,
    /// Non-empty reads
    pub chunks_received: u64,
    /// Connection uptime in seconds
    pub uptime_secs: u64,
}

/// Byte source trait for all transports
#[async_trait]
pub trait ByteSource: Send {
    /// Open the source
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Close the source
    async fn disconnect(&mut self) -> Result<(), TransportError>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Bytes currently available (possibly none); never waits for a full line
    async fn receive(&mut self) -> Result<Bytes, TransportError>;

    /// Get source type
    fn source_type(&self) -> SourceType;

    /// Get connection info string
    fn connection_info(&self) -> String;

    /// Get statistics
    fn stats(&self) -> TransportStats;

    /// Finite sources report true once everything has been handed out
    fn is_exhausted(&self) -> bool {
        false
    }
}
