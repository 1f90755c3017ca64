//! Tunable thresholds for every detector
//!
//! All defaults are the heuristic constants the detectors were first written
//! with. None of them has been calibrated against a labeled corpus, so they are
//! exposed here rather than baked into the detector code. A JSON file with any
//! subset of these fields can be loaded with [`AnalyzerConfig::from_json_file`];
//! missing fields keep their defaults.
//!
//! ```json
//! { "noise_consistency": { "sigma": 1.5 }, "parallel": false }
//! ```

use crate::error::{ForensicError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub noise_extractor: NoiseExtractorConfig,
    pub enf: EnfConfig,
    pub spectral: SpectralConfig,
    pub noise_consistency: NoiseConsistencyConfig,
    /// Run the three detectors on the rayon pool instead of one after another
    pub parallel: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            noise_extractor: NoiseExtractorConfig::default(),
            enf: EnfConfig::default(),
            spectral: SpectralConfig::default(),
            noise_consistency: NoiseConsistencyConfig::default(),
            parallel: true,
        }
    }
}

/// Butterworth high-pass used to isolate background noise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseExtractorConfig {
    pub order: usize,
    pub cutoff_hz: f64,
}

impl Default for NoiseExtractorConfig {
    fn default() -> Self {
        Self {
            order: 5,
            cutoff_hz: 5000.0,
        }
    }
}

/// Power-line hum (ENF) band energy consistency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnfConfig {
    /// Analysis window length; hop is half of it
    pub window_secs: f64,
    pub band_low_hz: f64,
    pub band_high_hz: f64,
    /// Suspicious when variance > variance_ratio * mean
    pub variance_ratio: f64,
    /// confidence = variance / (confidence_divisor * mean)
    pub confidence_divisor: f64,
    pub max_confidence: f64,
}

impl Default for EnfConfig {
    fn default() -> Self {
        Self {
            window_secs: 2.0,
            band_low_hz: 45.0,
            band_high_hz: 65.0,
            variance_ratio: 0.5,
            confidence_divisor: 2.0,
            max_confidence: 0.7,
        }
    }
}

/// MFCC frame-to-frame discontinuity (splice) detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectralConfig {
    pub n_mfcc: usize,
    pub n_fft: usize,
    pub hop_length: usize,
    pub n_mels: usize,
    /// Dynamic range kept by the log-mel stage, in dB below the loudest cell
    pub top_db: f64,
    /// Threshold = mean + sigma * std of the delta norms
    pub sigma: f64,
    /// confidence = candidates / confidence_divisor
    pub confidence_divisor: f64,
    pub max_confidence: f64,
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            n_mfcc: 13,
            n_fft: 2048,
            hop_length: 512,
            n_mels: 128,
            top_db: 80.0,
            sigma: 2.0,
            confidence_divisor: 10.0,
            max_confidence: 0.8,
        }
    }
}

/// RMS level consistency of the extracted noise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConsistencyConfig {
    pub segment_secs: f64,
    /// Hop as a fraction of the segment length (0.5 = 50% overlap)
    pub hop_fraction: f64,
    pub sigma: f64,
    pub confidence_divisor: f64,
    pub max_confidence: f64,
}

impl Default for NoiseConsistencyConfig {
    fn default() -> Self {
        Self {
            segment_secs: 1.0,
            hop_fraction: 0.5,
            sigma: 2.0,
            confidence_divisor: 10.0,
            max_confidence: 0.75,
        }
    }
}

// Upper bounds keep window and filter sizes allocatable
pub const MAX_WINDOW_SECS: f64 = 60.0;
pub const MAX_FILTER_ORDER: usize = 16;
pub const MAX_FFT_SIZE: usize = 65536;
pub const MAX_MEL_BANDS: usize = 1024;

fn check_at_most(name: &str, value: f64, max: f64) -> Result<()> {
    if value <= max {
        Ok(())
    } else {
        Err(ForensicError::config(format!("{} must be at most {}, got {}", name, max, value)))
    }
}

fn check_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ForensicError::config(format!("{} must be positive, got {}", name, value)))
    }
}

fn check_confidence(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ForensicError::config(format!("{} must be within [0, 1], got {}", name, value)))
    }
}

impl AnalyzerConfig {
    /// Load a (possibly partial) config from a JSON file and validate it
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: AnalyzerConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let ne = &self.noise_extractor;
        if ne.order == 0 {
            return Err(ForensicError::config("noise_extractor.order must be at least 1"));
        }
        check_positive("noise_extractor.cutoff_hz", ne.cutoff_hz)?;
        if ne.order > MAX_FILTER_ORDER {
            return Err(ForensicError::config(format!(
                "noise_extractor.order must be at most {}, got {}",
                MAX_FILTER_ORDER, ne.order
            )));
        }

        let enf = &self.enf;
        check_positive("enf.window_secs", enf.window_secs)?;
        check_at_most("enf.window_secs", enf.window_secs, MAX_WINDOW_SECS)?;
        check_positive("enf.confidence_divisor", enf.confidence_divisor)?;
        if !(enf.band_low_hz >= 0.0 && enf.band_low_hz < enf.band_high_hz) {
            return Err(ForensicError::config(format!(
                "enf band must satisfy 0 <= low < high, got {}..{}",
                enf.band_low_hz, enf.band_high_hz
            )));
        }
        if !(enf.variance_ratio.is_finite() && enf.variance_ratio >= 0.0) {
            return Err(ForensicError::config("enf.variance_ratio must be non-negative"));
        }
        check_confidence("enf.max_confidence", enf.max_confidence)?;

        let sp = &self.spectral;
        if sp.n_mfcc == 0 || sp.n_mels == 0 || sp.n_fft < 2 || sp.hop_length == 0 {
            return Err(ForensicError::config(
                "spectral n_mfcc, n_mels, hop_length must be >= 1 and n_fft >= 2",
            ));
        }
        if sp.n_fft > MAX_FFT_SIZE || sp.hop_length > MAX_FFT_SIZE || sp.n_mels > MAX_MEL_BANDS {
            return Err(ForensicError::config(format!(
                "spectral n_fft and hop_length must be at most {}, n_mels at most {}",
                MAX_FFT_SIZE, MAX_MEL_BANDS
            )));
        }
        if sp.n_mfcc > sp.n_mels {
            return Err(ForensicError::config(format!(
                "spectral.n_mfcc ({}) cannot exceed n_mels ({})",
                sp.n_mfcc, sp.n_mels
            )));
        }
        check_positive("spectral.top_db", sp.top_db)?;
        check_positive("spectral.confidence_divisor", sp.confidence_divisor)?;
        check_confidence("spectral.max_confidence", sp.max_confidence)?;

        let nc = &self.noise_consistency;
        check_positive("noise_consistency.segment_secs", nc.segment_secs)?;
        check_at_most("noise_consistency.segment_secs", nc.segment_secs, MAX_WINDOW_SECS)?;
        check_positive("noise_consistency.confidence_divisor", nc.confidence_divisor)?;
        if !(nc.hop_fraction > 0.0 && nc.hop_fraction <= 1.0) {
            return Err(ForensicError::config(format!(
                "noise_consistency.hop_fraction must be within (0, 1], got {}",
                nc.hop_fraction
            )));
        }
        check_confidence("noise_consistency.max_confidence", nc.max_confidence)?;

        for (name, sigma) in [("spectral.sigma", sp.sigma), ("noise_consistency.sigma", nc.sigma)] {
            if !sigma.is_finite() {
                return Err(ForensicError::config(format!("{} must be finite", name)));
            }
        }

        Ok(())
    }
}
