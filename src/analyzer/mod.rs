//! Tamper analysis pipeline
//!
//! ```text
//! AudioBuffer ──> filter::extract_noise ──> NoiseSignal
//!      │                                        │
//!      ├──> enf::detect ───────────┐            │
//!      ├──> spectral::detect ──────┤            │
//!      │                           ├──> aggregate ──> AggregateReport
//!      │   noise::detect <─────────┼────────────┘
//!      │           └───────────────┘
//! ```
//!
//! The detectors share nothing mutable, so they run on the rayon pool when
//! [`AnalyzerConfig::parallel`] is set. The result does not depend on the
//! execution order.

pub mod aggregate;
pub mod enf;
pub mod filter;
pub mod noise;
pub mod result;
pub mod spectral;
pub mod stats;

pub use aggregate::{aggregate, AggregateReport};
pub use result::{DetectorResult, DiagnosticSeries};

use crate::audio::{AudioBuffer, NoiseSignal};
use crate::config::AnalyzerConfig;
use crate::error::{ForensicError, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Clean,
    Tampered,
    Error,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Verdict::Clean => write!(f, "CLEAN"),
            Verdict::Tampered => write!(f, "TAMPERED"),
            Verdict::Error => write!(f, "ERROR"),
        }
    }
}

/// The three detector results, in report order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detectors {
    pub enf: DetectorResult,
    pub spectral: DetectorResult,
    pub noise_consistency: DetectorResult,
}

/// Everything one pipeline run produces
#[derive(Debug, Clone)]
pub struct Analysis {
    pub report: AggregateReport,
    pub detectors: Detectors,
    /// Extracted noise track, for waveform rendering
    pub noise_signal: NoiseSignal,
}

impl Analysis {
    pub fn verdict(&self) -> Verdict {
        if self.report.forgery_detected {
            Verdict::Tampered
        } else {
            Verdict::Clean
        }
    }
}

/// Per-file record used by batch runs and reports
#[derive(Debug, Clone, Serialize)]
pub struct FileAnalysis {
    pub file_path: String,
    pub file_name: String,
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<AggregateReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detectors: Option<Detectors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
}

impl FileAnalysis {
    fn from_error(file_path: String, file_name: String, err: &ForensicError) -> Self {
        Self {
            file_path,
            file_name,
            verdict: Verdict::Error,
            report: None,
            detectors: None,
            error: Some(err.to_string()),
            error_code: Some(err.error_code()),
        }
    }

    /// Report confidence, 0 for files that failed
    pub fn confidence(&self) -> u32 {
        self.report.as_ref().map_or(0, |r| r.confidence)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: AnalyzerConfig,
    deadline: Option<Duration>,
}

impl Analyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: AnalyzerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    /// Give up on a file once its analysis exceeds `budget`
    pub fn with_deadline(mut self, budget: Option<Duration>) -> Self {
        self.deadline = budget;
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Run the full pipeline on an in-memory buffer
    pub fn analyze_buffer(&self, buffer: &AudioBuffer) -> Result<Analysis> {
        self.run_pipeline(buffer, None)
    }

    /// Pipeline body. With a `Cancel`, the flag is checked before every
    /// stage and a set flag ends the run with `DeadlineExceeded`.
    fn run_pipeline(&self, buffer: &AudioBuffer, cancel: Option<&Cancel>) -> Result<Analysis> {
        self.config.validate()?;
        let cfg = &self.config;

        checkpoint(cancel)?;
        let noise_signal = filter::extract_noise(buffer, &cfg.noise_extractor)?;
        checkpoint(cancel)?;

        let (enf, (spectral, noise_consistency)) = if cfg.parallel {
            rayon::join(
                || stage(cancel, || enf::detect(buffer, &cfg.enf)),
                || {
                    rayon::join(
                        || stage(cancel, || spectral::detect(buffer, &cfg.spectral)),
                        || stage(cancel, || noise::detect(&noise_signal, &cfg.noise_consistency)),
                    )
                },
            )
        } else {
            let enf = stage(cancel, || enf::detect(buffer, &cfg.enf));
            let spectral = stage(cancel, || spectral::detect(buffer, &cfg.spectral));
            let noise = stage(cancel, || noise::detect(&noise_signal, &cfg.noise_consistency));
            (enf, (spectral, noise))
        };

        let (enf, spectral, noise_consistency) = match (enf, spectral, noise_consistency) {
            (Some(enf), Some(spectral), Some(noise)) => (enf, spectral, noise),
            _ => {
                return Err(ForensicError::DeadlineExceeded {
                    budget: cancel.map_or(Duration::ZERO, |c| c.budget),
                })
            }
        };

        let report = aggregate(
            buffer.duration_secs(),
            buffer.sample_rate(),
            &enf,
            &spectral,
            &noise_consistency,
        );

        Ok(Analysis {
            report,
            detectors: Detectors {
                enf,
                spectral,
                noise_consistency,
            },
            noise_signal,
        })
    }

    /// Decode and analyze one file. Failures become a `Verdict::Error` record.
    pub fn analyze<P: AsRef<Path>>(&self, path: P) -> FileAnalysis {
        let path = path.as_ref();
        let file_path = path.display().to_string();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| file_path.clone());

        let started = Instant::now();
        let outcome = AudioBuffer::from_file(path).and_then(|buffer| match self.deadline {
            Some(budget) => analyze_with_deadline(self, buffer, budget),
            None => self.analyze_buffer(&buffer),
        });

        match outcome {
            Ok(analysis) => {
                info!(
                    file = %file_name,
                    verdict = %analysis.verdict(),
                    confidence = analysis.report.confidence,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "analyzed"
                );
                FileAnalysis {
                    file_path,
                    file_name,
                    verdict: analysis.verdict(),
                    report: Some(analysis.report),
                    detectors: Some(analysis.detectors),
                    error: None,
                    error_code: None,
                }
            }
            Err(err) => {
                warn!(file = %file_name, error = %err, "analysis failed");
                FileAnalysis::from_error(file_path, file_name, &err)
            }
        }
    }
}

/// Stop request shared between a deadline caller and its worker
struct Cancel {
    flag: Arc<AtomicBool>,
    budget: Duration,
}

impl Cancel {
    fn is_set(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

fn checkpoint(cancel: Option<&Cancel>) -> Result<()> {
    match cancel {
        Some(c) if c.is_set() => Err(ForensicError::DeadlineExceeded { budget: c.budget }),
        _ => Ok(()),
    }
}

/// Run one detector unless a stop was requested
fn stage(cancel: Option<&Cancel>, run: impl FnOnce() -> DetectorResult) -> Option<DetectorResult> {
    match cancel {
        Some(c) if c.is_set() => None,
        _ => Some(run()),
    }
}

/// Run the pipeline on a worker thread and wait at most `budget`.
///
/// A run that misses the deadline is abandoned: the worker is told to stop
/// at its next stage boundary, anything it still produces is dropped, and the
/// caller gets `DeadlineExceeded`, never a partial report.
pub fn analyze_with_deadline(
    analyzer: &Analyzer,
    buffer: AudioBuffer,
    budget: Duration,
) -> Result<Analysis> {
    let (tx, rx) = mpsc::channel();
    let worker = analyzer.clone();
    let flag = Arc::new(AtomicBool::new(false));
    let cancel = Cancel {
        flag: Arc::clone(&flag),
        budget,
    };

    let handle = thread::spawn(move || {
        // The receiver is gone once the deadline passed
        let _ = tx.send(worker.run_pipeline(&buffer, Some(&cancel)));
    });

    match rx.recv_timeout(budget) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            flag.store(true, Ordering::Relaxed);
            debug!(?budget, "deadline passed, stopping worker");
            Err(ForensicError::DeadlineExceeded { budget })
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => match handle.join() {
            Err(panic) => std::panic::resume_unwind(panic),
            Ok(()) => Err(ForensicError::DeadlineExceeded { budget }),
        },
    }
}
