//! Spectral discontinuity (splice) detection
//!
//! Splicing two independently recorded segments produces an abrupt change in
//! timbre at the seam. Mel-frequency cepstral coefficients (MFCCs) are a
//! compact summary of timbre, so the detector tracks how far the MFCC vector
//! moves from one frame to the next and flags the jumps that stand out.
//!
//! # How It Works
//!
//! ```text
//! signal --STFT--> |X|^2 --mel filterbank--> log-mel (dB) --DCT--> 13 MFCCs / frame
//!
//! delta_norm[t] = || mfcc[t + 1] - mfcc[t] ||
//! threshold     = mean(delta_norm) + 2 * std(delta_norm)
//! candidates    = { t : delta_norm[t] > threshold }
//! confidence    = min(0.8, |candidates| / 10)
//! ```
//!
//! The front end follows the usual speech-processing recipe: 2048-point
//! frames every 512 samples, centered on the frame index (the signal is
//! reflect-padded by half a frame at both ends), periodic Hann window, 128
//! Slaney-normalized mel bands from 0 Hz to Nyquist, power in dB clipped to
//! 80 dB below the loudest cell, then an orthonormal DCT-II.
//!
//! Natural transitions in speech or music rarely move the MFCC vector more
//! than two standard deviations above the typical frame-to-frame change.

use super::result::{DetectorResult, DiagnosticSeries};
use super::stats::outliers_above;
use crate::audio::AudioBuffer;
use crate::config::SpectralConfig;
use rustfft::{num_complex::Complex, FftPlanner};
use std::f64::consts::PI;
use tracing::debug;

const LABEL: &str = "Spectral Discontinuity Analysis";

/// Smallest power admitted to the log stage
const AMIN: f64 = 1e-10;

/// Periodic Hann window (DFT-even), the variant used for STFT analysis
fn hann_window(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / size as f64).cos()))
        .collect()
}

/// Convert power to dB, floored at `AMIN`
fn power_to_db(value: f64) -> f64 {
    10.0 * value.max(AMIN).log10()
}

// Slaney mel scale: linear below 1 kHz, logarithmic above
const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        mel * F_SP
    }
}

/// One triangular mel filter, stored sparsely from its first non-zero bin
#[derive(Debug, Clone)]
struct MelFilter {
    start: usize,
    weights: Vec<f64>,
}

fn mel_filterbank(sample_rate: u32, n_fft: usize, n_mels: usize) -> Vec<MelFilter> {
    let n_bins = n_fft / 2 + 1;
    let nyquist = sample_rate as f64 / 2.0;

    let max_mel = hz_to_mel(nyquist);
    let mel_f: Vec<f64> = (0..n_mels + 2)
        .map(|i| mel_to_hz(max_mel * i as f64 / (n_mels + 1) as f64))
        .collect();

    (0..n_mels)
        .map(|m| {
            let (lo, center, hi) = (mel_f[m], mel_f[m + 1], mel_f[m + 2]);
            let enorm = 2.0 / (hi - lo);

            let dense: Vec<f64> = (0..n_bins)
                .map(|k| {
                    let freq = k as f64 * sample_rate as f64 / n_fft as f64;
                    let lower = (freq - lo) / (center - lo);
                    let upper = (hi - freq) / (hi - center);
                    lower.min(upper).max(0.0) * enorm
                })
                .collect();

            match dense.iter().position(|&w| w > 0.0) {
                Some(start) => {
                    let end = dense.iter().rposition(|&w| w > 0.0).map_or(start, |e| e + 1);
                    MelFilter {
                        start,
                        weights: dense[start..end].to_vec(),
                    }
                }
                None => MelFilter {
                    start: 0,
                    weights: Vec::new(),
                },
            }
        })
        .collect()
}

/// Orthonormal DCT-II basis, `n_out` rows of length `n_in`
fn dct_basis(n_out: usize, n_in: usize) -> Vec<Vec<f64>> {
    let n = n_in as f64;
    (0..n_out)
        .map(|k| {
            let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            (0..n_in)
                .map(|i| scale * (PI * k as f64 * (2 * i + 1) as f64 / (2.0 * n)).cos())
                .collect()
        })
        .collect()
}

/// Pad by `pad` on both sides, mirroring around the edge samples.
///
/// Falls back to zeros when the signal is too short to mirror.
fn center_pad(samples: &[f64], pad: usize) -> Vec<f64> {
    let n = samples.len();
    let mut padded = Vec::with_capacity(n + 2 * pad);

    if n > pad {
        padded.extend((1..=pad).rev().map(|i| samples[i]));
        padded.extend_from_slice(samples);
        padded.extend((1..=pad).map(|i| samples[n - 1 - i]));
    } else {
        padded.resize(pad, 0.0);
        padded.extend_from_slice(samples);
        padded.resize(n + 2 * pad, 0.0);
    }

    padded
}

/// MFCC matrix of the whole signal, one row of `n_mfcc` coefficients per frame
pub fn mfcc(samples: &[f64], sample_rate: u32, config: &SpectralConfig) -> Vec<Vec<f64>> {
    let n_fft = config.n_fft;
    let hop = config.hop_length.max(1);
    let n_bins = n_fft / 2 + 1;

    if samples.is_empty() {
        return Vec::new();
    }

    let padded = center_pad(samples, n_fft / 2);
    if padded.len() < n_fft {
        return Vec::new();
    }
    let num_frames = 1 + (padded.len() - n_fft) / hop;

    let window = hann_window(n_fft);
    let filters = mel_filterbank(sample_rate, n_fft, config.n_mels);
    let dct = dct_basis(config.n_mfcc, config.n_mels);

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n_fft);
    let mut buffer: Vec<Complex<f64>> = vec![Complex::new(0.0, 0.0); n_fft];
    let mut power = vec![0.0f64; n_bins];

    // Log-mel for every frame first: the dB floor depends on the global max
    let mut log_mel = Vec::with_capacity(num_frames * config.n_mels);
    let mut global_max = f64::NEG_INFINITY;

    for t in 0..num_frames {
        let start = t * hop;
        for ((slot, &s), &w) in buffer
            .iter_mut()
            .zip(&padded[start..start + n_fft])
            .zip(window.iter())
        {
            *slot = Complex::new(s * w, 0.0);
        }

        fft.process(&mut buffer);

        for (p, c) in power.iter_mut().zip(buffer.iter()) {
            *p = c.norm_sqr();
        }

        for filter in &filters {
            let energy: f64 = filter
                .weights
                .iter()
                .zip(&power[filter.start..])
                .map(|(w, p)| w * p)
                .sum();
            let db = power_to_db(energy);
            global_max = global_max.max(db);
            log_mel.push(db);
        }
    }

    let floor = global_max - config.top_db;

    log_mel
        .chunks(config.n_mels)
        .map(|frame| {
            dct.iter()
                .map(|basis| {
                    basis
                        .iter()
                        .zip(frame)
                        .map(|(b, &v)| b * v.max(floor))
                        .sum::<f64>()
                })
                .collect()
        })
        .collect()
}

/// Euclidean distance between consecutive coefficient vectors
pub fn delta_norms(coefficients: &[Vec<f64>]) -> Vec<f64> {
    coefficients
        .windows(2)
        .map(|pair| {
            pair[1]
                .iter()
                .zip(&pair[0])
                .map(|(b, a)| (b - a) * (b - a))
                .sum::<f64>()
                .sqrt()
        })
        .collect()
}

/// Confidence contributed by `count` splice candidates
pub fn confidence_for(count: usize, config: &SpectralConfig) -> f64 {
    if count == 0 {
        return 0.0;
    }
    (count as f64 / config.confidence_divisor).min(config.max_confidence)
}

/// Time in seconds of a frame transition index
pub fn frame_time_secs(frame: usize, hop_length: usize, sample_rate: u32) -> f64 {
    (frame * hop_length) as f64 / sample_rate as f64
}

/// Look for abrupt timbre changes in the raw signal
pub fn detect(buffer: &AudioBuffer, config: &SpectralConfig) -> DetectorResult {
    let coefficients = mfcc(buffer.samples(), buffer.sample_rate(), config);

    if coefficients.len() < 2 {
        return DetectorResult::insufficient(format!(
            "{}: Recording too short for frame-to-frame comparison ({} frame(s)).",
            LABEL,
            coefficients.len()
        ));
    }

    let deltas = delta_norms(&coefficients);
    let (threshold, candidates) = match outliers_above(&deltas, config.sigma) {
        Some(found) => found,
        None => {
            return DetectorResult::insufficient(format!(
                "{}: Spectral features could not be computed reliably.",
                LABEL
            ))
        }
    };

    let suspicious = !candidates.is_empty();
    let confidence = confidence_for(candidates.len(), config);

    debug!(
        frames = coefficients.len(),
        threshold,
        candidates = candidates.len(),
        "MFCC delta statistics"
    );

    let detail = format!(
        "{}: {}.",
        LABEL,
        if suspicious {
            "Potential splicing points detected"
        } else {
            "No significant discontinuities found"
        }
    );

    let candidate_times = candidates
        .iter()
        .map(|&frame| frame_time_secs(frame, config.hop_length, buffer.sample_rate()))
        .collect();

    DetectorResult::new(suspicious, confidence, detail).with_series(
        DiagnosticSeries::SpectralDiscontinuity {
            delta_norms: deltas,
            threshold,
            candidate_frames: candidates,
            candidate_times,
        },
    )
}
