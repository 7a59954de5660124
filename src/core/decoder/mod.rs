//! Streaming packet decoder
//!
//! Byte chunks in, validated packets out:
//!
//! ```text
//! bytes -> LineFramer -> LineClass -> DecoderState -> Packet
//! ```
//!
//! The decoder is a plain value owned by whoever drives the poll loop. It
//! never blocks and never fails; every irregularity becomes either a
//! [`DecoderEvent`] or a counter in [`DecoderStats`].

mod accumulator;
mod state_machine;

pub use accumulator::{Accepted, SectionAccumulator};
pub use state_machine::{DecoderState, Transition};

use crate::core::packet::{Packet, SectionKind, Sections};
use crate::core::protocol::{FramerEvent, LineClass, LineFramer, ParseFault, DEFAULT_MAX_LINE_BYTES};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Decoder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Cap on buffered bytes of a single unterminated line
    pub max_line_bytes: usize,
    /// Clear all four buffers after each emitted packet instead of carrying
    /// them over until their start marker reappears
    pub reset_unstarted_sections_on_complete: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            reset_unstarted_sections_on_complete: false,
        }
    }
}

/// Reportable decoder output
#[derive(Debug, Clone)]
pub enum DecoderEvent {
    /// A completed packet
    Packet(Arc<Packet>),
    /// A data line inside an open section was rejected
    Malformed {
        /// The offending line
        line: String,
        /// Why it was rejected
        fault: ParseFault,
    },
    /// An unterminated line grew past the cap
    Overflow {
        /// Bytes thrown away
        discarded: usize,
    },
}

/// Decoder counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderStats {
    /// Lines framed (including empty ones)
    pub lines: u64,
    /// Samples stored
    pub samples: u64,
    /// Data lines rejected by the numeric parser
    pub malformed: u64,
    /// Data lines seen with no section open
    pub outside_section: u64,
    /// Spectrum lines dropped for a frequency `<= 0`
    pub non_positive_frequency: u64,
    /// End markers that did not match the open section
    pub unmatched_end: u64,
    /// Residue overflows
    pub overflows: u64,
    /// Packets emitted
    pub packets: u64,
}

/// Stateful packet decoder
#[derive(Debug)]
pub struct PacketDecoder {
    framer: LineFramer,
    state: DecoderState,
    stats: DecoderStats,
}

impl Default for PacketDecoder {
    fn default() -> Self {
        Self::new(DecoderConfig::default())
    }
}

impl PacketDecoder {
    /// Create a decoder
    pub fn new(config: DecoderConfig) -> Self {
        debug!(
            max_line_bytes = config.max_line_bytes,
            reset_sections = config.reset_unstarted_sections_on_complete,
            "Initialized PacketDecoder"
        );
        Self {
            framer: LineFramer::new(config.max_line_bytes),
            state: DecoderState::new(config.reset_unstarted_sections_on_complete),
            stats: DecoderStats::default(),
        }
    }

    /// Feed a raw chunk; returns events in stream order
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<DecoderEvent> {
        self.feed_until(chunk, None)
    }

    /// Feed a raw chunk, stopping after `max_packets` completed packets
    ///
    /// Lines framed after the last allowed packet are dropped unapplied, so
    /// the packet counter and [`DecoderStats::packets`] never run ahead of
    /// what the caller received.
    pub fn feed_until(&mut self, chunk: &[u8], max_packets: Option<usize>) -> Vec<DecoderEvent> {
        let mut events = Vec::new();
        let mut packets = 0usize;
        if max_packets == Some(0) {
            return events;
        }

        let mut framed = self.framer.push(chunk).into_iter();
        for event in framed.by_ref() {
            match event {
                FramerEvent::Line(line) => {
                    if let Some(event) = self.push_line(&line) {
                        let completed = matches!(event, DecoderEvent::Packet(_));
                        events.push(event);
                        if completed {
                            packets += 1;
                            if max_packets.is_some_and(|max| packets >= max) {
                                break;
                            }
                        }
                    }
                }
                FramerEvent::Overflow { discarded } => {
                    self.stats.overflows += 1;
                    events.push(DecoderEvent::Overflow { discarded });
                }
            }
        }

        let dropped = framed.count();
        if dropped > 0 {
            debug!(dropped, "Packet limit reached, dropping remaining lines");
        }
        events
    }

    /// Feed a chunk and keep only the completed packets
    pub fn feed_packets(&mut self, chunk: &[u8]) -> Vec<Arc<Packet>> {
        self.feed_packets_until(chunk, None)
    }

    /// [`PacketDecoder::feed_until`], keeping only the completed packets
    pub fn feed_packets_until(
        &mut self,
        chunk: &[u8],
        max_packets: Option<usize>,
    ) -> Vec<Arc<Packet>> {
        self.feed_until(chunk, max_packets)
            .into_iter()
            .filter_map(|event| match event {
                DecoderEvent::Packet(packet) => Some(packet),
                _ => None,
            })
            .collect()
    }

    /// Apply one already-framed line
    pub fn push_line(&mut self, line: &str) -> Option<DecoderEvent> {
        self.stats.lines += 1;
        let line = line.trim();

        match self.state.apply(LineClass::classify(line)) {
            Transition::Ignored | Transition::SectionClosed(_) => None,
            Transition::SectionOpened(kind) => {
                trace!(section = %kind, "Section opened");
                None
            }
            Transition::UnmatchedEnd(kind) => {
                self.stats.unmatched_end += 1;
                debug!(section = %kind, open = ?self.state.open_section(), "End marker without matching start");
                None
            }
            Transition::Stored(_) => {
                self.stats.samples += 1;
                None
            }
            Transition::OutsideSection => {
                self.stats.outside_section += 1;
                trace!(line = %line, "Data outside any section");
                None
            }
            Transition::NonPositiveFrequency(kind) => {
                self.stats.non_positive_frequency += 1;
                trace!(section = %kind, line = %line, "Dropping non-positive frequency");
                None
            }
            Transition::Malformed(fault) => {
                self.stats.malformed += 1;
                warn!(line = %line, error = %fault, "Invalid value ignored");
                Some(DecoderEvent::Malformed {
                    line: line.to_string(),
                    fault,
                })
            }
            Transition::Completed(packet) => {
                self.stats.packets += 1;
                info!(
                    packet_id = packet.id,
                    samples = packet.sections.total_samples(),
                    "Packet #{} received",
                    packet.id
                );
                Some(DecoderEvent::Packet(Arc::new(packet)))
            }
        }
    }

    /// Drop any partial line (shutdown path); the in-flight packet is never emitted
    pub fn discard_partial(&mut self) {
        let pending = self.framer.pending_len();
        if pending > 0 {
            debug!(pending, "Discarding partial line");
        }
        self.framer.clear();
    }

    /// Counters so far
    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Currently open section
    pub fn open_section(&self) -> Option<SectionKind> {
        self.state.open_section()
    }

    /// Id of the last emitted packet
    pub fn packet_counter(&self) -> u64 {
        self.state.packet_counter()
    }

    /// In-flight buffers
    pub fn in_flight(&self) -> &Sections {
        self.state.in_flight()
    }

    /// Bytes waiting for a newline
    pub fn pending_bytes(&self) -> usize {
        self.framer.pending_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::packet::Sample;

    const PACKET: &[u8] = b"---SIGNAL_ORIGINAL_START---\n0.0,1.0\n0.1,0.9\n---SIGNAL_ORIGINAL_END---\n---DATA_COMPLETE---\n";

    #[test]
    fn test_feed_whole_packet() {
        let mut decoder = PacketDecoder::default();
        let packets = decoder.feed_packets(PACKET);

        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].id, 1);
        assert_eq!(
            packets[0].sections.signal_original,
            vec![Sample::new(0.0, 1.0), Sample::new(0.1, 0.9)]
        );
        assert_eq!(decoder.stats().samples, 2);
        assert_eq!(decoder.stats().packets, 1);
    }

    #[test]
    fn test_byte_at_a_time_matches_whole() {
        let mut whole = PacketDecoder::default();
        let expected = whole.feed_packets(PACKET);

        let mut split = PacketDecoder::default();
        let mut got = Vec::new();
        for byte in PACKET {
            got.extend(split.feed_packets(std::slice::from_ref(byte)));
        }

        assert_eq!(got.len(), 1);
        assert_eq!(got[0].sections, expected[0].sections);
        assert_eq!(split.stats(), whole.stats());
    }

    #[test]
    fn test_malformed_event_reported() {
        let mut decoder = PacketDecoder::default();
        let events = decoder.feed(b"---SIGNAL_FILTERED_START---\n1.0,2.0,3.0\n");

        assert_eq!(events.len(), 1);
        match &events[0] {
            DecoderEvent::Malformed { line, fault } => {
                assert_eq!(line, "1.0,2.0,3.0");
                assert_eq!(*fault, ParseFault::FieldCount(3));
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(decoder.open_section(), Some(SectionKind::SignalFiltered));
    }

    #[test]
    fn test_overflow_event_and_recovery() {
        let mut decoder = PacketDecoder::new(DecoderConfig {
            max_line_bytes: 16,
            ..Default::default()
        });
        let events = decoder.feed(&[b'x'; 40]);
        assert!(matches!(events[..], [DecoderEvent::Overflow { discarded: 40 }]));

        let packets = decoder.feed_packets(b"\n---DATA_COMPLETE---\n");
        assert_eq!(packets.len(), 1);
        assert_eq!(decoder.stats().overflows, 1);
    }

    #[test]
    fn test_discard_partial_on_shutdown() {
        let mut decoder = PacketDecoder::default();
        decoder.feed(b"---SIGNAL_ORIGINAL_START---\n0.0,1.0\n---DATA_COMPL");
        assert!(decoder.pending_bytes() > 0);

        decoder.discard_partial();
        assert_eq!(decoder.pending_bytes(), 0);
        assert_eq!(decoder.packet_counter(), 0);
    }

    #[test]
    fn test_counts_irregularities() {
        let mut decoder = PacketDecoder::default();
        decoder.feed(
            b"boot banner\n---FFT_ORIGINAL_END---\n---FFT_ORIGINAL_START---\n0.0,-3.0\n-5,3.0\n39.1,-20.0\n",
        );
        let stats = decoder.stats();
        assert_eq!(stats.outside_section, 1);
        assert_eq!(stats.unmatched_end, 1);
        assert_eq!(stats.non_positive_frequency, 2);
        assert_eq!(stats.samples, 1);
        assert_eq!(decoder.in_flight().fft_original.len(), 1);
    }

    #[test]
    fn test_packet_limit_stops_applying_lines() {
        let mut decoder = PacketDecoder::default();
        let packets = decoder.feed_packets_until(
            b"---DATA_COMPLETE---\n---DATA_COMPLETE---\n---SIGNAL_ORIGINAL_START---\n---DATA_COMPLETE---\n",
            Some(2),
        );

        assert_eq!(packets.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(decoder.packet_counter(), 2);
        assert_eq!(decoder.stats().packets, 2);
        assert_eq!(decoder.open_section(), None);
        assert!(decoder.feed_until(b"---DATA_COMPLETE---\n", Some(0)).is_empty());
        assert_eq!(decoder.packet_counter(), 2);
    }
}
