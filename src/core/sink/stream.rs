//! Writer-backed sinks (stdout, pipes)

use super::{PacketSink, SinkError};
use crate::core::packet::Packet;
use std::io::Write;

/// One JSON object per packet, newline separated
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> PacketSink for JsonLinesSink<W> {
    fn name(&self) -> &str {
        "json"
    }

    fn on_packet(&mut self, packet: &Packet) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.writer, packet)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Human-readable one-line summary per packet
pub struct SummarySink<W: Write + Send> {
    writer: W,
    timestamps: bool,
}

impl<W: Write + Send> SummarySink<W> {
    /// Wrap a writer
    pub fn new(writer: W, timestamps: bool) -> Self {
        Self { writer, timestamps }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> PacketSink for SummarySink<W> {
    fn name(&self) -> &str {
        "summary"
    }

    fn on_packet(&mut self, packet: &Packet) -> Result<(), SinkError> {
        if self.timestamps {
            writeln!(
                self.writer,
                "[{}] {}",
                packet.created_at.format("%Y-%m-%d %H:%M:%S%.3f"),
                packet.summary()
            )?;
        } else {
            writeln!(self.writer, "{}", packet.summary())?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}
