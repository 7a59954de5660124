//! Core module containing the acquisition pipeline
//!
//! This module provides:
//! - Byte sources (serial port, capture file, in-memory queue)
//! - Wire protocol (line framing, marker classification, numeric lines, encoder)
//! - Packet decoder with its section state machine
//! - Packet sinks (CSV log, live view, JSON lines, text summary)
//! - Poll-loop session tying the three together
//! - Synthetic signal generator shaped like the board's output

pub mod decoder;
pub mod packet;
pub mod protocol;
pub mod session;
pub mod simulator;
pub mod sink;
pub mod transport;
