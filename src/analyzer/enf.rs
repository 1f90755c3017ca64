//! Electrical Network Frequency (ENF) consistency
//!
//! Equipment running off the mains picks up a faint 50/60 Hz hum. Within one
//! continuous capture that hum has a steady level; audio stitched together
//! from different sessions (or different rooms) usually does not.
//!
//! The detector slides a 2 s window over the raw signal with 50% overlap,
//! takes the mean FFT magnitude of the bins between 45 and 65 Hz in each
//! window, and compares the variance of that sequence to its mean.
//!
//! ```text
//! suspicious  <=>  var(P) > 0.5 * mean(P)
//! confidence   =   min(0.7, var(P) / (2 * mean(P)))
//! ```
//!
//! At 2 s per window the bins are 0.5 Hz apart, so the band always holds about
//! 41 bins. A window whose resolution leaves the band empty (absurdly low
//! sample rates) is skipped.

use super::result::{DetectorResult, DiagnosticSeries};
use super::stats::{mean, variance, window_starts};
use crate::audio::AudioBuffer;
use crate::config::EnfConfig;
use rustfft::{num_complex::Complex, FftPlanner};
use tracing::debug;

const LABEL: &str = "ENF Analysis";

/// Bins of an `fft_size`-point real FFT whose frequency is within the band
fn band_bins(fft_size: usize, sample_rate: u32, low_hz: f64, high_hz: f64) -> Vec<usize> {
    (0..=fft_size / 2)
        .filter(|&k| {
            let freq = k as f64 * sample_rate as f64 / fft_size as f64;
            freq >= low_hz && freq <= high_hz
        })
        .collect()
}

/// Mean band magnitude per window, with each window's start time
fn enf_power_trace(buffer: &AudioBuffer, config: &EnfConfig) -> (Vec<f64>, Vec<f64>) {
    let sample_rate = buffer.sample_rate();
    let window_size = (sample_rate as f64 * config.window_secs) as usize;
    let hop_size = window_size / 2;
    let samples = buffer.samples();

    let mut timestamps = Vec::new();
    let mut powers = Vec::new();

    if window_size < 2 || hop_size == 0 {
        return (timestamps, powers);
    }

    let bins = band_bins(window_size, sample_rate, config.band_low_hz, config.band_high_hz);
    if bins.is_empty() {
        debug!(window_size, sample_rate, "no FFT bins inside the ENF band");
        return (timestamps, powers);
    }

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(window_size);
    let mut buffer: Vec<Complex<f64>> = vec![Complex::new(0.0, 0.0); window_size];

    for start in window_starts(samples.len(), window_size, hop_size) {
        for (slot, &s) in buffer.iter_mut().zip(&samples[start..start + window_size]) {
            *slot = Complex::new(s, 0.0);
        }

        fft.process(&mut buffer);

        let power = bins.iter().map(|&k| buffer[k].norm()).sum::<f64>() / bins.len() as f64;
        timestamps.push(start as f64 / sample_rate as f64);
        powers.push(power);
    }

    (timestamps, powers)
}

/// Check the hum band for level changes across the recording
pub fn detect(buffer: &AudioBuffer, config: &EnfConfig) -> DetectorResult {
    let (timestamps, powers) = enf_power_trace(buffer, config);

    if powers.len() < 2 {
        return DetectorResult::insufficient(format!(
            "{}: Recording too short for power line frequency analysis ({} window(s)).",
            LABEL,
            powers.len()
        ));
    }

    let (m, var) = match (mean(&powers), variance(&powers)) {
        (Some(m), Some(v)) if m.is_finite() && v.is_finite() && m > 0.0 => (m, v),
        _ => {
            return DetectorResult::insufficient(format!(
                "{}: No measurable energy in the power line frequency band.",
                LABEL
            ))
        }
    };

    let suspicious = var > m * config.variance_ratio;
    let confidence = if suspicious {
        (var / (m * config.confidence_divisor)).min(config.max_confidence)
    } else {
        0.0
    };

    debug!(
        windows = powers.len(),
        mean = m,
        variance = var,
        suspicious,
        "ENF band power statistics"
    );

    let detail = format!(
        "{}: {} in power line frequency components.",
        LABEL,
        if suspicious {
            "Inconsistencies detected"
        } else {
            "No significant inconsistencies"
        }
    );

    DetectorResult::new(suspicious, confidence, detail).with_series(DiagnosticSeries::Enf {
        timestamps,
        enf_powers: powers,
        mean: m,
        variance: var,
    })
}
