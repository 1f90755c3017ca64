//! Background-noise extraction
//!
//! Tampering tends to leave its traces above the band where speech and room
//! tone carry most of their energy, so the noise track is everything above
//! 5 kHz: a Butterworth high-pass run forward and then backward over the
//! signal (zero-phase), so the residue lines up sample-for-sample with the
//! original.
//!
//! # Filter design
//!
//! ```text
//! analog prototype poles   p_k = exp(j*pi*(2k + N + 1) / 2N)
//! low-pass -> high-pass    s_k = wc / p_k          (wc prewarped)
//! bilinear transform       z_k = (4 + s_k) / (4 - s_k)
//! ```
//!
//! Poles are grouped into conjugate pairs (one biquad each) plus a single
//! first-order section when N is odd. All zeros of a high-pass sit at z = 1.
//! Each section is scaled to unity gain at Nyquist, which is exactly where an
//! ideal Butterworth high-pass has unity gain.

use crate::audio::{AudioBuffer, NoiseSignal};
use crate::config::NoiseExtractorConfig;
use crate::error::{ForensicError, Result};
use rustfft::num_complex::Complex64;
use std::f64::consts::PI;
use tracing::debug;

/// One second-order section, `a[0]` implied to be 1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Section {
    pub b: [f64; 3],
    pub a: [f64; 2],
}

impl Section {
    /// Steady-state step response of the transposed direct-form II state
    fn step_state(&self) -> ([f64; 2], f64) {
        let [b0, b1, b2] = self.b;
        let [a1, a2] = self.a;
        let dc_gain = (b0 + b1 + b2) / (1.0 + a1 + a2);
        let z1 = b2 - a2 * dc_gain;
        let z0 = b1 - a1 * dc_gain + z1;
        ([z0, z1], dc_gain)
    }
}

/// Cascade of second-order sections
#[derive(Debug, Clone, PartialEq)]
pub struct HighPass {
    order: usize,
    sections: Vec<Section>,
}

impl HighPass {
    /// Design an order-`order` Butterworth high-pass at `cutoff_hz`.
    ///
    /// Fails with `InvalidSampleRate` when the cutoff is at or above Nyquist.
    pub fn butterworth(order: usize, cutoff_hz: f64, sample_rate: u32) -> Result<Self> {
        let nyquist = sample_rate as f64 / 2.0;
        let wn = cutoff_hz / nyquist;
        if !(wn > 0.0 && wn < 1.0) || order == 0 {
            return Err(ForensicError::InvalidSampleRate {
                sample_rate,
                cutoff_hz,
            });
        }

        let fs2 = Complex64::new(4.0, 0.0);
        let warped = 4.0 * (PI * wn / 2.0).tan();
        let to_digital = |proto: Complex64| {
            let s = Complex64::new(warped, 0.0) / proto;
            (fs2 + s) / (fs2 - s)
        };

        let mut sections = Vec::with_capacity((order + 1) / 2);
        for k in 0..order / 2 {
            let theta = PI * (2 * k + order + 1) as f64 / (2 * order) as f64;
            let z = to_digital(Complex64::from_polar(1.0, theta));
            let a1 = -2.0 * z.re;
            let a2 = z.norm_sqr();
            let g = (1.0 - a1 + a2) / 4.0;
            sections.push(Section {
                b: [g, -2.0 * g, g],
                a: [a1, a2],
            });
        }

        if order % 2 == 1 {
            let z = to_digital(Complex64::new(-1.0, 0.0)).re;
            let g = (1.0 + z) / 2.0;
            sections.push(Section {
                b: [g, -g, 0.0],
                a: [-z, 0.0],
            });
        }

        Ok(Self { order, sections })
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Initial state per section for a signal sitting at 1.0 forever
    fn initial_state(&self) -> Vec<[f64; 2]> {
        let mut level = 1.0;
        self.sections
            .iter()
            .map(|s| {
                let (state, gain) = s.step_state();
                let scaled = [state[0] * level, state[1] * level];
                level *= gain;
                scaled
            })
            .collect()
    }

    fn run(&self, data: &mut [f64], initial: f64) {
        let mut state: Vec<[f64; 2]> = self
            .initial_state()
            .into_iter()
            .map(|[z0, z1]| [z0 * initial, z1 * initial])
            .collect();

        for x in data.iter_mut() {
            let mut v = *x;
            for (sec, st) in self.sections.iter().zip(state.iter_mut()) {
                let y = sec.b[0] * v + st[0];
                st[0] = sec.b[1] * v - sec.a[0] * y + st[1];
                st[1] = sec.b[2] * v - sec.a[1] * y;
                v = y;
            }
            *x = v;
        }
    }

    /// Forward-backward filtering with odd extension at both ends.
    ///
    /// Output has the same length as the input.
    pub fn filtfilt(&self, x: &[f64]) -> Vec<f64> {
        let n = x.len();
        if n == 0 {
            return Vec::new();
        }

        let padlen = (3 * (self.order + 1)).min(n - 1);
        let first = x[0];
        let last = x[n - 1];

        let mut ext = Vec::with_capacity(n + 2 * padlen);
        ext.extend((1..=padlen).rev().map(|i| 2.0 * first - x[i]));
        ext.extend_from_slice(x);
        ext.extend((1..=padlen).map(|i| 2.0 * last - x[n - 1 - i]));

        let start = ext[0];
        self.run(&mut ext, start);

        ext.reverse();
        let start = ext[0];
        self.run(&mut ext, start);
        ext.reverse();

        ext.drain(..padlen);
        ext.truncate(n);
        ext
    }
}

/// Derive the noise track of `buffer`
pub fn extract_noise(buffer: &AudioBuffer, config: &NoiseExtractorConfig) -> Result<NoiseSignal> {
    let filter = HighPass::butterworth(config.order, config.cutoff_hz, buffer.sample_rate())?;
    debug!(
        order = config.order,
        cutoff_hz = config.cutoff_hz,
        sections = filter.sections().len(),
        "extracting background noise"
    );
    Ok(NoiseSignal::from_samples(
        filter.filtfilt(buffer.samples()),
        buffer.sample_rate(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sine(freq: f64, sample_rate: u32, len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f64 / sample_rate as f64).sin())
            .collect()
    }

    fn magnitude_at(filter: &HighPass, freq: f64, sample_rate: u32) -> f64 {
        let w = 2.0 * PI * freq / sample_rate as f64;
        let z1 = Complex64::from_polar(1.0, -w);
        let z2 = z1 * z1;
        filter
            .sections()
            .iter()
            .map(|s| {
                let num = s.b[0] + z1 * s.b[1] + z2 * s.b[2];
                let den = 1.0 + z1 * s.a[0] + z2 * s.a[1];
                (num / den).norm()
            })
            .product()
    }

    // ==========================================================================
    // DESIGN
    // ==========================================================================
    //
    // A Butterworth high-pass is maximally flat in its passband: unity gain at
    // Nyquist, exactly -3 dB at the (prewarped) cutoff, and a 20*N dB/decade
    // slope below it.
    // ==========================================================================

    #[test]
    fn test_fifth_order_has_three_sections() {
        let f = HighPass::butterworth(5, 5000.0, 44100).unwrap();
        assert_eq!(f.sections().len(), 3);
        // Odd order leaves one first-order section
        assert_eq!(f.sections()[2].b[2], 0.0);
        assert_eq!(f.sections()[2].a[1], 0.0);
    }

    #[test]
    fn test_unity_gain_at_nyquist() {
        let f = HighPass::butterworth(5, 5000.0, 44100).unwrap();
        assert_abs_diff_eq!(magnitude_at(&f, 22050.0, 44100), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_minus_three_db_at_cutoff() {
        let f = HighPass::butterworth(5, 5000.0, 44100).unwrap();
        assert_abs_diff_eq!(
            magnitude_at(&f, 5000.0, 44100),
            std::f64::consts::FRAC_1_SQRT_2,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_sections_are_stable() {
        for order in 1..=8 {
            let f = HighPass::butterworth(order, 5000.0, 48000).unwrap();
            for s in f.sections() {
                // For a biquad, poles lie inside the unit circle iff |a2| < 1 and |a1| < 1 + a2
                assert!(s.a[1].abs() < 1.0, "order {} unstable a2 {}", order, s.a[1]);
                assert!(s.a[0].abs() < 1.0 + s.a[1], "order {} unstable a1 {}", order, s.a[0]);
            }
        }
    }

    #[test]
    fn test_cutoff_at_or_above_nyquist_fails() {
        assert!(matches!(
            HighPass::butterworth(5, 5000.0, 10000),
            Err(ForensicError::InvalidSampleRate { sample_rate: 10000, .. })
        ));
        assert!(HighPass::butterworth(5, 5000.0, 8000).is_err());
        assert!(HighPass::butterworth(5, 5000.0, 10002).is_ok());
    }

    // ==========================================================================
    // ZERO-PHASE FILTERING
    // ==========================================================================

    #[test]
    fn test_output_length_matches_input() {
        let f = HighPass::butterworth(5, 5000.0, 44100).unwrap();
        for len in [0usize, 1, 2, 10, 17, 18, 19, 1000] {
            let x: Vec<f64> = (0..len).map(|i| (i as f64 * 0.37).sin()).collect();
            assert_eq!(f.filtfilt(&x).len(), len);
        }
    }

    #[test]
    fn test_low_tone_is_removed() {
        let f = HighPass::butterworth(5, 5000.0, 44100).unwrap();
        let x = sine(100.0, 44100, 44100);
        let y = f.filtfilt(&x);
        let peak = y[500..y.len() - 500]
            .iter()
            .fold(0.0f64, |m, v| m.max(v.abs()));
        assert!(peak < 1e-3, "100 Hz should be gone, peak {}", peak);
    }

    #[test]
    fn test_high_tone_passes_without_phase_shift() {
        let f = HighPass::butterworth(5, 5000.0, 44100).unwrap();
        let x = sine(15000.0, 44100, 8820);
        let y = f.filtfilt(&x);
        for i in 1000..x.len() - 1000 {
            assert!(
                (x[i] - y[i]).abs() < 0.01,
                "sample {} drifted: {} vs {}",
                i,
                x[i],
                y[i]
            );
        }
    }

    #[test]
    fn test_extract_noise_keeps_shape() {
        let buf = AudioBuffer::new(sine(440.0, 44100, 4410), 44100).unwrap();
        let noise = extract_noise(&buf, &NoiseExtractorConfig::default()).unwrap();
        assert_eq!(noise.len(), buf.len());
        assert_eq!(noise.sample_rate(), 44100);
    }

    #[test]
    fn test_extract_noise_rejects_low_rate() {
        let buf = AudioBuffer::new(vec![0.0; 8000], 8000).unwrap();
        assert!(matches!(
            extract_noise(&buf, &NoiseExtractorConfig::default()),
            Err(ForensicError::InvalidSampleRate { .. })
        ));
    }

    #[test]
    fn test_filtfilt_is_deterministic() {
        let f = HighPass::butterworth(5, 5000.0, 44100).unwrap();
        let x: Vec<f64> = (0..5000).map(|i| ((i * 7919) % 1000) as f64 / 1000.0 - 0.5).collect();
        assert_eq!(f.filtfilt(&x), f.filtfilt(&x));
    }
}
