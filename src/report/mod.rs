//! Report generation for analysis results
//!
//! Two output formats are supported:
//!
//! - **JSON**: Full machine-readable record, including every detector's
//!   diagnostic series (the noise waveform is left out)
//! - **CSV**: One row per file for spreadsheets and bulk triage
//!
//! # Usage
//!
//! ```ignore
//! use splicelot::report;
//!
//! // Automatically picks format based on extension
//! report::generate("report.json", &results)?;  // JSON
//! report::generate("report.csv", &results)?;   // CSV
//! ```

pub mod csv;
pub mod json;

use crate::analyzer::{FileAnalysis, Verdict};
use crate::error::Result;
use serde::Serialize;
use std::io::BufWriter;
use std::path::Path;

/// Generate a report in the appropriate format based on file extension
pub fn generate<P: AsRef<Path>>(path: P, results: &[FileAnalysis]) -> Result<()> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let mut file = BufWriter::new(std::fs::File::create(path)?);

    match ext.as_str() {
        "json" => json::write(&mut file, results),
        _ => csv::write(&mut file, results),
    }
}

/// Summary statistics for a batch of results
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub clean: usize,
    pub tampered: usize,
    pub error: usize,
}

impl Summary {
    pub fn from_results(results: &[FileAnalysis]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };

        for r in results {
            match r.verdict {
                Verdict::Clean => summary.clean += 1,
                Verdict::Tampered => summary.tampered += 1,
                Verdict::Error => summary.error += 1,
            }
        }

        summary
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::analyzer::{AggregateReport, DetectorResult, Detectors, FileAnalysis, Verdict};

    pub fn file_result(verdict: Verdict, path: &str) -> FileAnalysis {
        let name = path.rsplit('/').next().unwrap_or(path).to_string();
        if verdict == Verdict::Error {
            return FileAnalysis {
                file_path: path.to_string(),
                file_name: name,
                verdict,
                report: None,
                detectors: None,
                error: Some("Failed to decode bad.wav: unsupported format".to_string()),
                error_code: Some("DECODE_FAILURE"),
            };
        }

        let tampered = verdict == Verdict::Tampered;
        let enf = DetectorResult::new(false, 0.0, "ENF Analysis: ok.".to_string());
        let spectral = DetectorResult::new(tampered, if tampered { 0.6 } else { 0.0 }, "Spectral, \"split\"".to_string());
        let noise = DetectorResult::new(false, 0.0, "Noise Consistency Analysis: ok.".to_string());

        FileAnalysis {
            file_path: path.to_string(),
            file_name: name,
            verdict,
            report: Some(AggregateReport {
                duration: 4.0,
                sample_rate: 44100,
                forgery_detected: tampered,
                confidence: if tampered { 60 } else { 0 },
                details: vec![enf.detail.clone(), spectral.detail.clone(), noise.detail.clone()],
            }),
            detectors: Some(Detectors {
                enf,
                spectral,
                noise_consistency: noise,
            }),
            error: None,
            error_code: None,
        }
    }
}
