//! Typed detector output
//!
//! Each detector returns one [`DetectorResult`]. Plots are not produced here;
//! detectors that have something worth drawing attach a [`DiagnosticSeries`]
//! with the raw numbers and leave rendering to whoever consumes the report.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectorResult {
    pub suspicious: bool,
    /// Always within [0, 1]
    pub confidence: f64,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<DiagnosticSeries>,
}

impl DetectorResult {
    pub(crate) fn new(suspicious: bool, confidence: f64, detail: String) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            suspicious,
            confidence,
            detail,
            series: None,
        }
    }

    /// Not enough audio to form a statistic. A short clip is not evidence.
    pub(crate) fn insufficient(detail: String) -> Self {
        Self::new(false, 0.0, detail)
    }

    pub(crate) fn with_series(mut self, series: DiagnosticSeries) -> Self {
        self.series = Some(series);
        self
    }
}

/// Raw numbers behind a detector's decision, for external plotting
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticSeries {
    /// ENF band power per analysis window
    Enf {
        timestamps: Vec<f64>,
        enf_powers: Vec<f64>,
        mean: f64,
        variance: f64,
    },
    /// MFCC frame-to-frame change and the frames that cleared the threshold
    SpectralDiscontinuity {
        delta_norms: Vec<f64>,
        threshold: f64,
        candidate_frames: Vec<usize>,
        /// Start time in seconds of each candidate frame
        candidate_times: Vec<f64>,
    },
    /// Noise RMS per segment and the segments that cleared the threshold
    NoiseConsistency {
        rms_values: Vec<f64>,
        timestamps: Vec<f64>,
        threshold: f64,
        outlier_indices: Vec<usize>,
    },
}
