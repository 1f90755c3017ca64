//! Merging detector verdicts into one report
//!
//! The three detectors are independent witnesses. Nothing is weighted or
//! combined: the recording is flagged if any detector is suspicious, and the
//! reported confidence is the strongest single detector's confidence.

use super::result::DetectorResult;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateReport {
    pub duration: f64,
    pub sample_rate: u32,
    pub forgery_detected: bool,
    /// Percentage, 0-100
    pub confidence: u32,
    /// ENF, spectral discontinuity, noise consistency, in that order
    pub details: Vec<String>,
}

/// Build the report from the three detector results
pub fn aggregate(
    duration: f64,
    sample_rate: u32,
    enf: &DetectorResult,
    spectral: &DetectorResult,
    noise: &DetectorResult,
) -> AggregateReport {
    let results = [enf, spectral, noise];

    let forgery_detected = results.iter().any(|r| r.suspicious);
    let max_confidence = results
        .iter()
        .map(|r| r.confidence)
        .filter(|c| c.is_finite())
        .fold(0.0f64, f64::max)
        .clamp(0.0, 1.0);

    AggregateReport {
        duration,
        sample_rate,
        forgery_detected,
        confidence: (max_confidence * 100.0).round() as u32,
        details: results.iter().map(|r| r.detail.clone()).collect(),
    }
}
