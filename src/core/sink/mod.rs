//! Packet sinks
//!
//! Everything downstream of the decoder (CSV log, live view, stdout) sees a
//! completed packet through [`PacketSink`]. The [`PacketEmitter`] fans a
//! packet out to every registered sink, one after another.

mod csv_log;
mod live;
mod stream;

pub use csv_log::{export_snapshot, summarize, CsvSink, LogSummary, TypeSummary, CSV_HEADER};
pub use live::LatestPacket;
pub use stream::{JsonLinesSink, SummarySink};

use crate::core::packet::Packet;
use thiserror::Error;
use tracing::warn;

/// Sink error types
#[derive(Error, Debug)]
pub enum SinkError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Consumer of completed packets
///
/// Called once per packet, in increasing id order, never concurrently.
pub trait PacketSink: Send {
    /// Name for diagnostics
    fn name(&self) -> &str;

    /// Handle one packet
    fn on_packet(&mut self, packet: &Packet) -> Result<(), SinkError>;

    /// Push buffered output to its destination
    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Sequential fan-out to registered sinks
#[derive(Default)]
pub struct PacketEmitter {
    sinks: Vec<Box<dyn PacketSink>>,
    emitted: u64,
    last_id: Option<u64>,
    failures: u64,
}

impl PacketEmitter {
    /// Emitter with no sinks
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink
    pub fn add_sink(&mut self, sink: Box<dyn PacketSink>) {
        self.sinks.push(sink);
    }

    /// Builder form of [`PacketEmitter::add_sink`]
    #[must_use]
    pub fn with_sink(mut self, sink: impl PacketSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Number of registered sinks
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Packets emitted so far
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Sink calls that returned an error
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Id of the last emitted packet
    pub fn last_id(&self) -> Option<u64> {
        self.last_id
    }

    /// Hand one packet to every sink
    ///
    /// A failing sink is logged and skipped; the others still see the packet.
    pub fn emit(&mut self, packet: &Packet) {
        debug_assert!(self.last_id.map_or(true, |last| packet.id > last));

        for sink in &mut self.sinks {
            if let Err(e) = sink.on_packet(packet) {
                self.failures += 1;
                warn!(sink = sink.name(), packet_id = packet.id, error = %e, "Sink failed");
            }
        }
        self.emitted += 1;
        self.last_id = Some(packet.id);
    }

    /// Flush every sink
    pub fn flush(&mut self) {
        for sink in &mut self.sinks {
            if let Err(e) = sink.flush() {
                self.failures += 1;
                warn!(sink = sink.name(), error = %e, "Sink flush failed");
            }
        }
    }
}
