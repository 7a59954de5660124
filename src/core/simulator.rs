//! Synthetic board output
//!
//! Produces packets shaped like the DSP firmware's: a block of ADC samples,
//! the same block through a first-order low-pass, and the Hann-windowed
//! magnitude spectrum of both in dB. Handy for exercising the decoder and the
//! sinks without hardware.

use crate::core::packet::{Sample, SectionKind, Sections};
use crate::core::protocol::{encode_pairs, encode_section, PACKET_COMPLETE_MARKER};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Signal generator parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticSignal {
    /// Samples per block
    pub samples: usize,
    /// Sample rate in Hz
    pub sample_rate_hz: f64,
    /// Low-pass cutoff in Hz
    pub cutoff_hz: f64,
    /// DC offset in volts (ADC mid-scale)
    pub offset: f64,
    /// Mains component frequency
    pub fundamental_hz: f64,
    /// Mains component amplitude
    pub fundamental_amplitude: f64,
    /// Interference frequency, above the cutoff
    pub interference_hz: f64,
    /// Interference amplitude
    pub interference_amplitude: f64,
}

impl Default for SyntheticSignal {
    fn default() -> Self {
        Self {
            samples: 512,
            sample_rate_hz: 10_000.0,
            cutoff_hz: 1_000.0,
            offset: 1.65,
            fundamental_hz: 60.0,
            fundamental_amplitude: 1.0,
            interference_hz: 3_000.0,
            interference_amplitude: 0.2,
        }
    }
}

impl SyntheticSignal {
    /// Sections of packet `index` as the decoder would store them; each
    /// index shifts the phase a little
    ///
    /// The DC bin is absent since its frequency is zero; [`SyntheticSignal::render`]
    /// still sends it the way the firmware does.
    pub fn generate(&self, index: u64) -> Sections {
        let (original, filtered) = self.blocks(index);
        let to_log = |bins: Vec<(f64, f64)>| -> Vec<Sample> {
            bins.into_iter()
                .filter(|&(hz, _)| hz > 0.0)
                .map(|(hz, db)| Sample::new(hz.log10(), db))
                .collect()
        };

        Sections {
            signal_original: self.time_samples(&original),
            signal_filtered: self.time_samples(&filtered),
            fft_original: to_log(self.spectrum(&original)),
            fft_filtered: to_log(self.spectrum(&filtered)),
        }
    }

    /// Packet `index` in wire format, DC bins included
    pub fn render(&self, index: u64) -> String {
        let (original, filtered) = self.blocks(index);
        let mut out = String::with_capacity(self.samples * 64 + 256);

        encode_section(SectionKind::SignalOriginal, &self.time_samples(&original), &mut out);
        encode_section(SectionKind::SignalFiltered, &self.time_samples(&filtered), &mut out);
        encode_pairs(SectionKind::FftOriginal, self.spectrum(&original), &mut out);
        encode_pairs(SectionKind::FftFiltered, self.spectrum(&filtered), &mut out);
        out.push_str(PACKET_COMPLETE_MARKER);
        out.push('\n');
        out
    }

    fn dt(&self) -> f64 {
        1.0 / self.sample_rate_hz
    }

    /// Raw and low-passed ADC block
    fn blocks(&self, index: u64) -> (Vec<f64>, Vec<f64>) {
        let n = self.samples.max(2);
        let dt = self.dt();
        let phase = index as f64 * 0.1;

        let original: Vec<f64> = (0..n)
            .map(|i| {
                let t = i as f64 * dt;
                self.offset
                    + self.fundamental_amplitude * (2.0 * PI * self.fundamental_hz * t + phase).sin()
                    + self.interference_amplitude * (2.0 * PI * self.interference_hz * t).sin()
            })
            .collect();
        let filtered = low_pass(&original, self.cutoff_hz, dt);
        (original, filtered)
    }

    fn time_samples(&self, values: &[f64]) -> Vec<Sample> {
        let dt = self.dt();
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| Sample::new(i as f64 * dt, v))
            .collect()
    }

    /// `(Hz, dB)` bins of the positive half, starting at DC
    fn spectrum(&self, values: &[f64]) -> Vec<(f64, f64)> {
        let bin_hz = self.sample_rate_hz / values.len() as f64;
        magnitude_db(values)
            .into_iter()
            .enumerate()
            .map(|(k, db)| (k as f64 * bin_hz, db))
            .collect()
    }
}

/// First-order IIR low-pass
fn low_pass(input: &[f64], cutoff_hz: f64, dt: f64) -> Vec<f64> {
    let rc = 1.0 / (2.0 * PI * cutoff_hz);
    let alpha = dt / (rc + dt);
    let mut out = Vec::with_capacity(input.len());
    let mut prev = input.first().copied().unwrap_or_default();
    for &x in input {
        prev += alpha * (x - prev);
        out.push(prev);
    }
    out
}

/// Hann-windowed DFT magnitude of the positive half, in dB
fn magnitude_db(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let windowed: Vec<f64> = values
        .iter()
        .enumerate()
        .map(|(i, &v)| v * 0.5 * (1.0 - (2.0 * PI * i as f64 / (n - 1) as f64).cos()))
        .collect();

    (0..n / 2)
        .map(|k| {
            let (mut re, mut im) = (0.0, 0.0);
            for (i, &v) in windowed.iter().enumerate() {
                let angle = -2.0 * PI * (k * i) as f64 / n as f64;
                re += v * angle.cos();
                im += v * angle.sin();
            }
            let magnitude = (re * re + im * im).sqrt();
            20.0 * (magnitude / n as f64 + 1e-12).log10()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::decoder::PacketDecoder;

    #[test]
    fn test_block_shape() {
        let sections = SyntheticSignal::default().generate(0);
        assert_eq!(sections.signal_original.len(), 512);
        assert_eq!(sections.signal_filtered.len(), 512);
        assert_eq!(sections.fft_original.len(), 255);
        assert_eq!(sections.fft_filtered.len(), 255);
    }

    #[test]
    fn test_low_pass_attenuates_interference() {
        let signal = SyntheticSignal::default();
        let sections = signal.generate(0);
        // 3 kHz bin sits at index 3000 / (10000 / 512) - 1 in the DC-less spectrum
        let bin = (signal.interference_hz / (signal.sample_rate_hz / 512.0)).round() as usize - 1;
        assert!(sections.fft_filtered[bin].y < sections.fft_original[bin].y - 6.0);
    }

    #[test]
    fn test_rendered_packet_decodes() {
        let signal = SyntheticSignal::default();
        let mut decoder = PacketDecoder::default();
        let packets = decoder.feed_packets(signal.render(0).as_bytes());

        assert_eq!(packets.len(), 1);
        let packet = &packets[0];
        assert_eq!(packet.sections.signal_original.len(), 512);
        assert_eq!(packet.sections.fft_original.len(), 255);
        assert_eq!(decoder.stats().malformed, 0);
        // one DC line per spectrum, dropped like the board's
        assert_eq!(decoder.stats().non_positive_frequency, 2);
    }
}
