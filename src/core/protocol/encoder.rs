//! Protocol encoder
//!
//! Renders sections back into the device's line format. Used by the
//! simulator and for producing capture files.

use super::marker::PACKET_COMPLETE_MARKER;
use crate::core::packet::{Sample, SectionKind, Sections};
use std::fmt::Write;

/// Render one section block (start marker, data lines, end marker)
pub fn encode_section(kind: SectionKind, samples: &[Sample], out: &mut String) {
    let pairs = samples.iter().map(|s| {
        if kind.is_spectrum() {
            (s.frequency_hz(), s.y)
        } else {
            (s.x, s.y)
        }
    });
    encode_pairs(kind, pairs, out);
}

/// Render a section block from wire values
///
/// Spectrum `x` is the frequency in Hz as the device prints it, so a DC bin
/// at `0.0` can be sent even though the decoder will drop it.
pub fn encode_pairs<I>(kind: SectionKind, pairs: I, out: &mut String)
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let _ = writeln!(out, "{}", kind.start_marker());
    for (x, y) in pairs {
        if kind.is_spectrum() {
            let _ = writeln!(out, "{:.1},{:.6}", x, y);
        } else {
            let _ = writeln!(out, "{:.6},{:.6}", x, y);
        }
    }
    let _ = writeln!(out, "{}", kind.end_marker());
}

/// Render a full packet in device order, terminated by the completion marker
pub fn encode_packet(sections: &Sections) -> String {
    let mut out = String::with_capacity(sections.total_samples() * 24 + 256);
    for (kind, samples) in sections.iter() {
        encode_section(kind, samples, &mut out);
    }
    let _ = writeln!(out, "{}", PACKET_COMPLETE_MARKER);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let mut sections = Sections::default();
        sections.signal_original.push(Sample::new(0.0001, 1.65));
        sections.fft_original.push(Sample::new(100f64.log10(), -20.5));

        let text = encode_packet(&sections);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "---SIGNAL_ORIGINAL_START---");
        assert_eq!(lines[1], "0.000100,1.650000");
        assert_eq!(lines[2], "---SIGNAL_ORIGINAL_END---");
        assert_eq!(lines[3], "---SIGNAL_FILTERED_START---");
        assert_eq!(lines[4], "---SIGNAL_FILTERED_END---");
        assert_eq!(lines[5], "---FFT_ORIGINAL_START---");
        assert_eq!(lines[6], "100.0,-20.500000");
        assert_eq!(lines.last(), Some(&"---DATA_COMPLETE---"));
        assert_eq!(lines.len(), 11);
    }

    #[test]
    fn test_encode_pairs_keeps_dc_bin() {
        let mut out = String::new();
        encode_pairs(SectionKind::FftFiltered, [(0.0, -3.0), (19.53125, -40.0)], &mut out);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            [
                "---FFT_FILTERED_START---",
                "0.0,-3.000000",
                "19.5,-40.000000",
                "---FFT_FILTERED_END---",
            ]
        );
    }
}
