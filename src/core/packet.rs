//! Packet data model
//!
//! A packet is one complete cycle of the device dump: four labeled sample
//! sequences (time-domain signal and spectrum, original and filtered) plus a
//! sequence id and the local time at which the completion marker arrived.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Section of a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    /// Raw time-domain signal
    SignalOriginal,
    /// Low-pass filtered time-domain signal
    SignalFiltered,
    /// Magnitude spectrum of the raw signal
    FftOriginal,
    /// Magnitude spectrum of the filtered signal
    FftFiltered,
}

impl SectionKind {
    /// All kinds, in the order the device sends them
    pub fn all() -> &'static [SectionKind] {
        &[
            SectionKind::SignalOriginal,
            SectionKind::SignalFiltered,
            SectionKind::FftOriginal,
            SectionKind::FftFiltered,
        ]
    }

    /// Label used in CSV logs
    pub fn label(&self) -> &'static str {
        match self {
            SectionKind::SignalOriginal => "signal_original",
            SectionKind::SignalFiltered => "signal_filtered",
            SectionKind::FftOriginal => "fft_original",
            SectionKind::FftFiltered => "fft_filtered",
        }
    }

    /// Whether samples are (frequency, magnitude) pairs
    pub fn is_spectrum(&self) -> bool {
        matches!(self, SectionKind::FftOriginal | SectionKind::FftFiltered)
    }

    /// Start marker line
    pub fn start_marker(&self) -> &'static str {
        match self {
            SectionKind::SignalOriginal => "---SIGNAL_ORIGINAL_START---",
            SectionKind::SignalFiltered => "---SIGNAL_FILTERED_START---",
            SectionKind::FftOriginal => "---FFT_ORIGINAL_START---",
            SectionKind::FftFiltered => "---FFT_FILTERED_START---",
        }
    }

    /// End marker line
    pub fn end_marker(&self) -> &'static str {
        match self {
            SectionKind::SignalOriginal => "---SIGNAL_ORIGINAL_END---",
            SectionKind::SignalFiltered => "---SIGNAL_FILTERED_END---",
            SectionKind::FftOriginal => "---FFT_ORIGINAL_END---",
            SectionKind::FftFiltered => "---FFT_FILTERED_END---",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One (x, y) point
///
/// For spectrum sections `x` holds `log10(frequency)`; use
/// [`Sample::frequency_hz`] to get back to Hz.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Elapsed time, or log10 of the frequency for spectrum sections
    pub x: f64,
    /// Amplitude or magnitude
    pub y: f64,
}

impl Sample {
    /// Create a sample
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// De-logged x value for spectrum samples
    pub fn frequency_hz(&self) -> f64 {
        10f64.powf(self.x)
    }
}

/// Ordered samples of one section
pub type SectionBuffer = Vec<Sample>;

/// The four section buffers of a packet
///
/// Always carries all four kinds; a section that never started is empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sections {
    /// Raw signal samples
    pub signal_original: SectionBuffer,
    /// Filtered signal samples
    pub signal_filtered: SectionBuffer,
    /// Raw spectrum samples (log10 frequency)
    pub fft_original: SectionBuffer,
    /// Filtered spectrum samples (log10 frequency)
    pub fft_filtered: SectionBuffer,
}

impl Sections {
    /// Buffer for a kind
    pub fn get(&self, kind: SectionKind) -> &SectionBuffer {
        match kind {
            SectionKind::SignalOriginal => &self.signal_original,
            SectionKind::SignalFiltered => &self.signal_filtered,
            SectionKind::FftOriginal => &self.fft_original,
            SectionKind::FftFiltered => &self.fft_filtered,
        }
    }

    /// Mutable buffer for a kind
    pub fn get_mut(&mut self, kind: SectionKind) -> &mut SectionBuffer {
        match kind {
            SectionKind::SignalOriginal => &mut self.signal_original,
            SectionKind::SignalFiltered => &mut self.signal_filtered,
            SectionKind::FftOriginal => &mut self.fft_original,
            SectionKind::FftFiltered => &mut self.fft_filtered,
        }
    }

    /// Iterate `(kind, buffer)` in device order
    pub fn iter(&self) -> impl Iterator<Item = (SectionKind, &SectionBuffer)> {
        SectionKind::all().iter().map(move |&kind| (kind, self.get(kind)))
    }

    /// Total sample count over all sections
    pub fn total_samples(&self) -> usize {
        self.iter().map(|(_, buf)| buf.len()).sum()
    }

    /// True when every section is empty
    pub fn is_empty(&self) -> bool {
        self.total_samples() == 0
    }
}

/// A completed packet
///
/// Immutable once emitted; consumers receive it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    /// Sequence id, starting at 1
    pub id: u64,
    /// Local time the completion marker was processed
    pub created_at: DateTime<Local>,
    /// Section buffers
    pub sections: Sections,
}

impl Packet {
    /// Samples of one section
    pub fn section(&self, kind: SectionKind) -> &SectionBuffer {
        self.sections.get(kind)
    }

    /// One-line summary with per-section counts
    pub fn summary(&self) -> String {
        let counts: Vec<String> = self
            .sections
            .iter()
            .map(|(kind, buf)| format!("{}={}", kind, buf.len()))
            .collect();
        format!("Packet #{} [{}]", self.id, counts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_always_four() {
        let sections = Sections::default();
        assert_eq!(sections.iter().count(), 4);
        assert!(sections.is_empty());
    }

    #[test]
    fn test_get_mut_targets_kind() {
        let mut sections = Sections::default();
        sections.get_mut(SectionKind::FftFiltered).push(Sample::new(2.0, -3.0));

        assert_eq!(sections.fft_filtered.len(), 1);
        assert!(sections.fft_original.is_empty());
        assert_eq!(sections.total_samples(), 1);
    }

    #[test]
    fn test_frequency_round_trip() {
        let sample = Sample::new(100f64.log10(), 5.0);
        assert!((sample.frequency_hz() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_summary() {
        let mut sections = Sections::default();
        sections.signal_original.push(Sample::new(0.0, 1.0));
        let packet = Packet {
            id: 7,
            created_at: Local::now(),
            sections,
        };
        assert_eq!(
            packet.summary(),
            "Packet #7 [signal_original=1 signal_filtered=0 fft_original=0 fft_filtered=0]"
        );
    }

    #[test]
    fn test_kind_serializes_as_label() {
        let json = serde_json::to_string(&SectionKind::FftOriginal).unwrap();
        assert_eq!(json, "\"fft_original\"");
    }
}
