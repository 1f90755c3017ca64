//! Background noise level consistency
//!
//! A single recording environment has a roughly stationary noise floor. When
//! a segment from another room, microphone or session is inserted, the level
//! of the high-frequency residue jumps.
//!
//! The extracted noise track is cut into 1 s segments every 0.5 s. Each
//! segment's RMS is compared against `mean + 2 * std` over all segments.
//! Segments above it are outliers:
//!
//! ```text
//! suspicious  <=>  at least one outlier
//! confidence   =   min(0.75, outliers / 10)
//! ```
//!
//! Because the threshold is relative to the recording's own spread, a short
//! burst stands out while an even 50/50 split between two levels does not
//! (every segment then sits one std from the mean).

use super::result::{DetectorResult, DiagnosticSeries};
use super::stats::{outliers_above, rms, window_starts};
use crate::audio::NoiseSignal;
use crate::config::NoiseConsistencyConfig;
use tracing::debug;

const LABEL: &str = "Noise Consistency Analysis";

/// RMS per segment with the segment start time in seconds
pub fn segment_levels(noise: &NoiseSignal, config: &NoiseConsistencyConfig) -> (Vec<f64>, Vec<f64>) {
    let sample_rate = noise.sample_rate() as f64;
    let segment_length = (sample_rate * config.segment_secs) as usize;
    let hop_length = (segment_length as f64 * config.hop_fraction) as usize;
    let samples = noise.samples();

    if segment_length == 0 || hop_length == 0 {
        return (Vec::new(), Vec::new());
    }

    window_starts(samples.len(), segment_length, hop_length)
        .map(|start| {
            let level = rms(&samples[start..start + segment_length]);
            (level, start as f64 / sample_rate)
        })
        .unzip()
}

/// Check the noise track for level jumps
pub fn detect(noise: &NoiseSignal, config: &NoiseConsistencyConfig) -> DetectorResult {
    let (rms_values, timestamps) = segment_levels(noise, config);

    if rms_values.is_empty() {
        return DetectorResult::insufficient(format!(
            "{}: Recording too short to compare background noise levels.",
            LABEL
        ));
    }

    let (threshold, outliers) = match outliers_above(&rms_values, config.sigma) {
        Some(found) => found,
        None => {
            return DetectorResult::insufficient(format!(
                "{}: Background noise level could not be measured.",
                LABEL
            ))
        }
    };

    let suspicious = !outliers.is_empty();
    let confidence = if suspicious {
        (outliers.len() as f64 / config.confidence_divisor).min(config.max_confidence)
    } else {
        0.0
    };

    debug!(
        segments = rms_values.len(),
        threshold,
        outliers = outliers.len(),
        "noise level statistics"
    );

    let detail = format!(
        "{}: {}.",
        LABEL,
        if suspicious {
            "Inconsistent noise levels detected"
        } else {
            "Background noise is consistent throughout the recording"
        }
    );

    DetectorResult::new(suspicious, confidence, detail).with_series(
        DiagnosticSeries::NoiseConsistency {
            rms_values,
            timestamps,
            threshold,
            outlier_indices: outliers,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::filter::extract_noise;
    use crate::audio::AudioBuffer;
    use crate::config::NoiseExtractorConfig;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f64::consts::PI;

    fn gaussian(rng: &mut StdRng, std: f64) -> f64 {
        let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = rng.gen();
        std * (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }

    /// 440 Hz tone plus white noise whose std is chosen per sample
    fn tone_with_noise(sr: u32, secs: f64, seed: u64, noise_std: impl Fn(f64) -> f64) -> AudioBuffer {
        let len = (sr as f64 * secs) as usize;
        let mut rng = StdRng::seed_from_u64(seed);
        let samples = (0..len)
            .map(|i| {
                let t = i as f64 / sr as f64;
                0.5 * (2.0 * PI * 440.0 * t).sin() + gaussian(&mut rng, noise_std(t))
            })
            .collect();
        AudioBuffer::new(samples, sr).unwrap()
    }

    fn outliers_of(result: &DetectorResult) -> (Vec<usize>, Vec<f64>) {
        match &result.series {
            Some(DiagnosticSeries::NoiseConsistency {
                outlier_indices,
                timestamps,
                ..
            }) => (outlier_indices.clone(), timestamps.clone()),
            other => panic!("expected noise series, got {:?}", other),
        }
    }

    // ==========================================================================
    // SEGMENTATION
    // ==========================================================================

    #[test]
    fn test_segments_overlap_by_half() {
        let noise = NoiseSignal::from_samples(vec![0.1; 5 * 1000], 1000);
        let (levels, times) = segment_levels(&noise, &NoiseConsistencyConfig::default());
        assert_eq!(times, vec![0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5]);
        assert_eq!(levels.len(), 8);
    }

    #[test]
    fn test_shorter_than_one_segment_is_unsuspicious() {
        let noise = NoiseSignal::from_samples(vec![0.1; 900], 1000);
        let r = detect(&noise, &NoiseConsistencyConfig::default());
        assert!(!r.suspicious);
        assert_eq!(r.confidence, 0.0);
        assert!(r.series.is_none());
    }

    // ==========================================================================
    // LEVEL CONSISTENCY
    // ==========================================================================

    #[test]
    fn test_stationary_noise_floor_is_consistent() {
        // Constant magnitude: every segment has exactly the same RMS
        let samples: Vec<f64> = (0..10 * 8000)
            .map(|i| if i % 2 == 0 { 0.05 } else { -0.05 })
            .collect();
        let noise = NoiseSignal::from_samples(samples, 8000);
        let r = detect(&noise, &NoiseConsistencyConfig::default());
        assert!(!r.suspicious);
        assert_eq!(r.confidence, 0.0);
        assert!(r.detail.contains("consistent throughout"));
    }

    #[test]
    fn test_noise_burst_is_flagged() {
        // 10 s at std 0.1 with half a second at std 0.4 starting at 5.0 s
        let buf = tone_with_noise(44100, 10.0, 11, |t| if (5.0..5.5).contains(&t) { 0.4 } else { 0.1 });
        let noise = extract_noise(&buf, &NoiseExtractorConfig::default()).unwrap();
        let r = detect(&noise, &NoiseConsistencyConfig::default());

        assert!(r.suspicious, "{}", r.detail);
        let (outliers, times) = outliers_of(&r);
        let flagged: Vec<f64> = outliers.iter().map(|&i| times[i]).collect();
        assert_eq!(flagged, vec![4.5, 5.0]);
        assert!((r.confidence - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_level_jump_at_midpoint_with_tighter_sigma() {
        // Second half twice as noisy. With the default 2-sigma rule an even
        // split never clears the threshold, so this runs at 1 sigma.
        let buf = tone_with_noise(44100, 5.0, 3, |t| if t >= 2.5 { 0.2 } else { 0.1 });
        let noise = extract_noise(&buf, &NoiseExtractorConfig::default()).unwrap();
        let config = NoiseConsistencyConfig {
            sigma: 1.0,
            ..NoiseConsistencyConfig::default()
        };
        let r = detect(&noise, &config);

        assert!(r.suspicious, "{}", r.detail);
        let (outliers, times) = outliers_of(&r);
        let first = times[outliers[0]];
        assert!((first - 2.5).abs() <= 0.5, "first outlier at {}s", first);
        assert!(outliers.iter().all(|&i| times[i] >= 2.0));
    }

    #[test]
    fn test_confidence_is_capped() {
        // 30 isolated spikes among a long quiet floor
        let sr = 100;
        let mut samples = vec![0.01; sr * 400];
        for k in 0..30 {
            let at = (k * 13 + 5) * sr;
            for s in &mut samples[at..at + sr / 2] {
                *s = 1.0;
            }
        }
        let noise = NoiseSignal::from_samples(samples, sr as u32);
        let r = detect(&noise, &NoiseConsistencyConfig::default());
        assert!(r.suspicious);
        assert_eq!(r.confidence, 0.75);
    }

    #[test]
    fn test_detection_is_deterministic() {
        let buf = tone_with_noise(22050, 4.0, 5, |_| 0.1);
        let noise = extract_noise(&buf, &NoiseExtractorConfig::default()).unwrap();
        let config = NoiseConsistencyConfig::default();
        assert_eq!(detect(&noise, &config), detect(&noise, &config));
    }
}
