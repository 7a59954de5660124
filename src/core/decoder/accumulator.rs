//! Section accumulator
//!
//! Owns the four buffers of the in-flight packet and the currently open
//! section.

use crate::core::packet::{Sample, SectionKind, Sections};

/// Result of offering a parsed pair to the accumulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accepted {
    /// Appended to the open section
    Stored(SectionKind),
    /// Spectrum frequency was zero or negative, pair dropped
    NonPositiveFrequency(SectionKind),
    /// No section open, pair dropped
    NoOpenSection,
}

/// In-flight section buffers
#[derive(Debug, Clone, Default)]
pub struct SectionAccumulator {
    sections: Sections,
    open: Option<SectionKind>,
}

impl SectionAccumulator {
    /// Empty accumulator, nothing open
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently open section
    pub fn open_section(&self) -> Option<SectionKind> {
        self.open
    }

    /// In-flight buffers
    pub fn sections(&self) -> &Sections {
        &self.sections
    }

    /// Reset `kind` and make it the open section
    ///
    /// A second start while another section is open simply switches over.
    pub fn start(&mut self, kind: SectionKind) {
        self.sections.get_mut(kind).clear();
        self.open = Some(kind);
    }

    /// Close `kind` if it is the open section
    ///
    /// Returns false (and changes nothing) for an end marker that does not
    /// match the open section.
    pub fn end(&mut self, kind: SectionKind) -> bool {
        if self.open == Some(kind) {
            self.open = None;
            true
        } else {
            false
        }
    }

    /// Offer a parsed `(a, b)` pair to the open section
    ///
    /// Spectrum sections keep `log10(a)` and require `a > 0`.
    pub fn push(&mut self, a: f64, b: f64) -> Accepted {
        let Some(kind) = self.open else {
            return Accepted::NoOpenSection;
        };

        let sample = if kind.is_spectrum() {
            if a.is_nan() || a <= 0.0 {
                return Accepted::NonPositiveFrequency(kind);
            }
            Sample::new(a.log10(), b)
        } else {
            Sample::new(a, b)
        };

        self.sections.get_mut(kind).push(sample);
        Accepted::Stored(kind)
    }

    /// Copy of the in-flight buffers
    pub fn snapshot(&self) -> Sections {
        self.sections.clone()
    }

    /// Clear every buffer, leaving the open section untouched
    pub fn clear_buffers(&mut self) {
        self.sections = Sections::default();
    }
}
