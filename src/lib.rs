//! # Spectrolink Core Library
//!
//! Host-side decoding for a DSP board that streams signal blocks and their
//! spectra over a serial link as marker-delimited text sections:
//! - Serial ports (USB CDC, USB-Serial adapters)
//! - Captured raw streams for offline replay
//!
//! ## Features
//!
//! - Chunk-boundary-agnostic line framing with an overflow cap
//! - Four-section packet assembly (time domain and spectrum, raw and filtered)
//! - CSV logging compatible with existing analysis scripts
//! - Live-view handle, JSON lines and text summaries
//! - CLI with exit codes
//!
//! ## Example
//!
//! ```rust,no_run
//! use spectrolink_core::{
//!     CsvSink, DecoderSession, PacketDecoder, PacketEmitter, SerialConfig, SerialTransport,
//!     SessionConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut port = SerialTransport::new(SerialConfig::new("/dev/ttyACM0", 115200));
//!     let mut decoder = PacketDecoder::default();
//!     let emitter = PacketEmitter::new().with_sink(CsvSink::open("signal_analysis_data.csv")?);
//!
//!     let session = DecoderSession::new(SessionConfig::default());
//!     let summary = session.run(&mut port, &mut decoder, emitter).await?;
//!     println!("{} packets", summary.packets_emitted);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod core;

// Re-exports for convenience
pub use crate::cli::{CliResult, ExitCodes};
pub use crate::config::{AppConfig, ConfigError, CsvConfig};
pub use crate::core::decoder::{DecoderConfig, DecoderEvent, DecoderStats, PacketDecoder};
pub use crate::core::packet::{Packet, Sample, SectionKind, Sections};
pub use crate::core::protocol::{encode_packet, ParseFault};
pub use crate::core::session::{DecoderSession, SessionConfig, SessionError, SessionSummary, StopReason};
pub use crate::core::simulator::SyntheticSignal;
pub use crate::core::sink::{
    export_snapshot, summarize, CsvSink, JsonLinesSink, LatestPacket, LogSummary, PacketEmitter,
    PacketSink, SinkError, SummarySink, TypeSummary,
};
pub use crate::core::transport::{
    ByteSource, CaptureSource, ChunkSource, SerialConfig, SerialFlowControl, SerialParity,
    SerialTransport, TransportError,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
