//! Marker classification
//!
//! Every framed line is either one of the nine verbatim directives, an empty
//! line, or a data line. Classification never fails.

use crate::core::packet::SectionKind;

/// Packet completion directive
pub const PACKET_COMPLETE_MARKER: &str = "---DATA_COMPLETE---";

/// Classified line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass<'a> {
    /// Section start directive
    StartOf(SectionKind),
    /// Section end directive
    EndOf(SectionKind),
    /// Packet completion directive
    PacketComplete,
    /// Anything else that is not empty
    Data(&'a str),
    /// Zero-length line
    Empty,
}

impl<'a> LineClass<'a> {
    /// Classify one trimmed line (case-sensitive, exact match)
    pub fn classify(line: &'a str) -> Self {
        if line.is_empty() {
            return LineClass::Empty;
        }
        if !line.starts_with("---") {
            return LineClass::Data(line);
        }

        match line {
            "---SIGNAL_ORIGINAL_START---" => LineClass::StartOf(SectionKind::SignalOriginal),
            "---SIGNAL_ORIGINAL_END---" => LineClass::EndOf(SectionKind::SignalOriginal),
            "---SIGNAL_FILTERED_START---" => LineClass::StartOf(SectionKind::SignalFiltered),
            "---SIGNAL_FILTERED_END---" => LineClass::EndOf(SectionKind::SignalFiltered),
            "---FFT_ORIGINAL_START---" => LineClass::StartOf(SectionKind::FftOriginal),
            "---FFT_ORIGINAL_END---" => LineClass::EndOf(SectionKind::FftOriginal),
            "---FFT_FILTERED_START---" => LineClass::StartOf(SectionKind::FftFiltered),
            "---FFT_FILTERED_END---" => LineClass::EndOf(SectionKind::FftFiltered),
            PACKET_COMPLETE_MARKER => LineClass::PacketComplete,
            _ => LineClass::Data(line),
        }
    }

    /// Whether this line is one of the directives
    pub fn is_marker(&self) -> bool {
        matches!(
            self,
            LineClass::StartOf(_) | LineClass::EndOf(_) | LineClass::PacketComplete
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers_match_section_kind_tokens() {
        for &kind in SectionKind::all() {
            assert_eq!(LineClass::classify(kind.start_marker()), LineClass::StartOf(kind));
            assert_eq!(LineClass::classify(kind.end_marker()), LineClass::EndOf(kind));
        }
        assert_eq!(
            LineClass::classify("---DATA_COMPLETE---"),
            LineClass::PacketComplete
        );
    }

    #[test]
    fn test_near_misses_are_data() {
        for line in [
            "---signal_original_start---",
            "---SIGNAL_ORIGINAL_START--- ",
            "x---DATA_COMPLETE---",
            "---UNKNOWN---",
        ] {
            assert_eq!(LineClass::classify(line), LineClass::Data(line));
        }
    }

    #[test]
    fn test_empty_and_data() {
        assert_eq!(LineClass::classify(""), LineClass::Empty);
        assert_eq!(LineClass::classify("0.1,0.9"), LineClass::Data("0.1,0.9"));
        assert!(!LineClass::classify("0.1,0.9").is_marker());
        assert!(LineClass::classify("---FFT_FILTERED_END---").is_marker());
    }
}
