//! Packet state machine
//!
//! Applies classified lines to the in-flight packet and decides when a packet
//! is complete. There is no error state: malformed input is absorbed here and
//! reported as a [`Transition`].

use super::accumulator::{Accepted, SectionAccumulator};
use crate::core::packet::{Packet, SectionKind, Sections};
use crate::core::protocol::{parse_pair, LineClass, ParseFault};
use chrono::Local;

/// Outcome of applying one line
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Empty line
    Ignored,
    /// Start marker reset and opened a section
    SectionOpened(SectionKind),
    /// End marker closed the open section
    SectionClosed(SectionKind),
    /// End marker for a section that is not open
    UnmatchedEnd(SectionKind),
    /// Sample appended
    Stored(SectionKind),
    /// Data line arrived with no section open
    OutsideSection,
    /// Spectrum line with a frequency `<= 0`
    NonPositiveFrequency(SectionKind),
    /// Unparsable data line
    Malformed(ParseFault),
    /// Completion marker produced a packet
    Completed(Packet),
}

/// Process-local decoder state, one packet in flight
#[derive(Debug, Clone, Default)]
pub struct DecoderState {
    accumulator: SectionAccumulator,
    packet_counter: u64,
    reset_unstarted_sections_on_complete: bool,
}

impl DecoderState {
    /// Fresh state
    ///
    /// With `reset_unstarted_sections_on_complete` unset, buffers carry over
    /// into the next packet until their start marker reappears.
    pub fn new(reset_unstarted_sections_on_complete: bool) -> Self {
        Self {
            accumulator: SectionAccumulator::new(),
            packet_counter: 0,
            reset_unstarted_sections_on_complete,
        }
    }

    /// Id of the last emitted packet (0 before the first)
    pub fn packet_counter(&self) -> u64 {
        self.packet_counter
    }

    /// Currently open section
    pub fn open_section(&self) -> Option<SectionKind> {
        self.accumulator.open_section()
    }

    /// In-flight buffers
    pub fn in_flight(&self) -> &Sections {
        self.accumulator.sections()
    }

    /// Apply one classified line
    pub fn apply(&mut self, class: LineClass<'_>) -> Transition {
        match class {
            LineClass::Empty => Transition::Ignored,
            LineClass::StartOf(kind) => {
                self.accumulator.start(kind);
                Transition::SectionOpened(kind)
            }
            LineClass::EndOf(kind) => {
                if self.accumulator.end(kind) {
                    Transition::SectionClosed(kind)
                } else {
                    Transition::UnmatchedEnd(kind)
                }
            }
            LineClass::Data(line) => {
                if self.accumulator.open_section().is_none() {
                    return Transition::OutsideSection;
                }
                match parse_pair(line) {
                    Ok((a, b)) => match self.accumulator.push(a, b) {
                        Accepted::Stored(kind) => Transition::Stored(kind),
                        Accepted::NonPositiveFrequency(kind) => {
                            Transition::NonPositiveFrequency(kind)
                        }
                        Accepted::NoOpenSection => Transition::OutsideSection,
                    },
                    Err(fault) => Transition::Malformed(fault),
                }
            }
            LineClass::PacketComplete => Transition::Completed(self.complete()),
        }
    }

    /// Stamp and hand out the in-flight packet
    ///
    /// The open section is left as is.
    fn complete(&mut self) -> Packet {
        self.packet_counter += 1;
        let packet = Packet {
            id: self.packet_counter,
            created_at: Local::now(),
            sections: self.accumulator.snapshot(),
        };
        if self.reset_unstarted_sections_on_complete {
            self.accumulator.clear_buffers();
        }
        packet
    }
}
