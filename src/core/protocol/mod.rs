//! Line protocol spoken by the DSP board
//!
//! ```text
//! ---SIGNAL_ORIGINAL_START---
//! 0.000000,1.650000
//! ...
//! ---SIGNAL_ORIGINAL_END---
//! (same for SIGNAL_FILTERED, FFT_ORIGINAL, FFT_FILTERED)
//! ---DATA_COMPLETE---
//! ```
//!
//! - `framing`: byte chunks to lines
//! - `marker`: line classification
//! - `sample`: `"<float>,<float>"` parsing
//! - `encoder`: sections back to text

pub mod encoder;
pub mod framing;
pub mod marker;
pub mod sample;

pub use encoder::{encode_packet, encode_pairs, encode_section};
pub use framing::{FramerEvent, LineFramer, DEFAULT_MAX_LINE_BYTES};
pub use marker::{LineClass, PACKET_COMPLETE_MARKER};
pub use sample::{parse_pair, ParseFault};
