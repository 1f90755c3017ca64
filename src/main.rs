use chrono::Local;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use splicelot::report::Summary;
use splicelot::{Analyzer, AnalyzerConfig, DiagnosticSeries, FileAnalysis, Verdict};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(name = "splicelot")]
#[command(author, version, about = "Detect signs of splicing and editing in audio recordings")]
struct Args {
    /// File or directory to analyze
    path: PathBuf,

    /// JSON file with analyzer thresholds
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output report file (.csv, .json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory for auto-generated reports
    #[arg(long, default_value = "splicelot-reports")]
    report_dir: PathBuf,

    /// Don't auto-generate CSV report
    #[arg(long)]
    no_report: bool,

    /// Don't prompt to open report
    #[arg(long)]
    no_open: bool,

    /// Number of parallel workers (default: number of CPUs)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Give up on a file after this many seconds of analysis
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Run the three detectors one after another for each file
    #[arg(long)]
    sequential: bool,

    /// Show detailed analysis
    #[arg(short, long)]
    verbose: bool,

    /// Only show summary
    #[arg(short, long)]
    quiet: bool,
}

// Formats symphonia is built with
const SUPPORTED_EXTENSIONS: &[&str] = &["wav", "wave", "flac", "ogg", "oga", "mp3"];

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose {
        "debug"
    } else if args.quiet {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => match AnalyzerConfig::from_json_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => AnalyzerConfig::default(),
    };
    if let Err(e) = config.validate() {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    // Set up thread pool
    if let Some(jobs) = args.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .ok();
    }

    // Collect audio files
    let files: Vec<PathBuf> = if args.path.is_dir() {
        WalkDir::new(&args.path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .map(|e| e.path().to_path_buf())
            .collect()
    } else {
        vec![args.path.clone()]
    };

    if files.is_empty() {
        eprintln!(
            "No audio files found (supported: {})",
            SUPPORTED_EXTENSIONS.join(", ")
        );
        std::process::exit(1);
    }

    if !args.quiet {
        eprintln!("\x1b[1mSplicelot - Audio Edit Detector\x1b[0m");
        eprintln!("{}", "─".repeat(70));
        eprintln!("Found {} audio file(s)\n", files.len());
    }

    // Set up progress bar
    let pb = if !args.quiet && files.len() > 1 {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    let analyzer = Analyzer::new()
        .with_config(config)
        .with_parallel(!args.sequential)
        .with_deadline(args.timeout_secs.map(Duration::from_secs));

    // Analyze files in parallel
    let results: Vec<FileAnalysis> = files
        .par_iter()
        .map(|path| {
            let result = analyzer.analyze(path);
            if let Some(ref pb) = pb {
                pb.inc(1);
                pb.set_message(result.file_name.clone());
            }
            result
        })
        .collect();

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    // Print results
    if !args.quiet {
        for r in &results {
            print_row(r);
            if args.verbose {
                print_details(r);
            }
        }
    }

    let summary = Summary::from_results(&results);

    if !args.quiet {
        eprintln!("\n{}", "─".repeat(70));
        eprintln!("\x1b[1mSummary:\x1b[0m");
        eprintln!("  \x1b[32m✓ Clean:\x1b[0m     {}", summary.clean);
        eprintln!("  \x1b[31m✗ Tampered:\x1b[0m  {}", summary.tampered);
        if summary.error > 0 {
            eprintln!("  \x1b[90mErrors:\x1b[0m      {}", summary.error);
        }
    }

    // Determine report path
    let report_path = if let Some(ref output) = args.output {
        Some(output.clone())
    } else if !args.no_report {
        std::fs::create_dir_all(&args.report_dir).ok();
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let filename = format!("splicelot_report_{}.csv", timestamp);
        Some(args.report_dir.join(filename))
    } else {
        None
    };

    if let Some(ref output_path) = report_path {
        if let Err(e) = splicelot::report::generate(output_path, &results) {
            eprintln!("Failed to write report: {}", e);
            std::process::exit(1);
        }
        if !args.quiet {
            eprintln!("\n\x1b[32mReport saved: {}\x1b[0m", output_path.display());
        }

        if !args.no_open && !args.quiet {
            eprint!("\nOpen report? [Y/n] ");
            io::stderr().flush().ok();

            let mut input = String::new();
            if io::stdin().read_line(&mut input).is_ok() {
                let input = input.trim().to_lowercase();
                if input.is_empty() || input == "y" || input == "yes" {
                    if let Err(e) = open::that(output_path) {
                        eprintln!("Failed to open report: {}", e);
                    }
                }
            }
        }
    }

    if !args.quiet {
        eprintln!("\n\x1b[90mAnalysis complete.\x1b[0m");
    }

    std::process::exit(exit_code(&summary));
}

fn exit_code(summary: &Summary) -> i32 {
    if summary.tampered > 0 {
        2
    } else if summary.error > 0 {
        1
    } else {
        0
    }
}

fn print_row(r: &FileAnalysis) {
    let color = match r.verdict {
        Verdict::Clean => "\x1b[32m",    // Green
        Verdict::Tampered => "\x1b[31m", // Red
        Verdict::Error => "\x1b[90m",    // Gray
    };
    let reset = "\x1b[0m";

    let flags = match &r.detectors {
        Some(d) => {
            let names: Vec<&str> = [
                (d.enf.suspicious, "enf"),
                (d.spectral.suspicious, "spectral"),
                (d.noise_consistency.suspicious, "noise"),
            ]
            .iter()
            .filter(|(flagged, _)| *flagged)
            .map(|(_, name)| *name)
            .collect();
            if names.is_empty() {
                "-".to_string()
            } else {
                names.join(",")
            }
        }
        None => "-".to_string(),
    };

    let (duration, sample_rate) = match &r.report {
        Some(report) => (format!("{:.1}s", report.duration), format!("{}Hz", report.sample_rate)),
        None => ("-".to_string(), "-".to_string()),
    };

    println!(
        "{}{:<10}{} {:>3}%  {:>8}  {:>8}  {:<20}  {}",
        color,
        format!("[{}]", r.verdict),
        reset,
        r.confidence(),
        duration,
        sample_rate,
        flags,
        &r.file_name
    );
}

fn print_details(r: &FileAnalysis) {
    if let Some(ref report) = r.report {
        for line in &report.details {
            eprintln!("    {}", line);
        }
    }
    if let Some(DiagnosticSeries::SpectralDiscontinuity { candidate_times, .. }) =
        r.detectors.as_ref().and_then(|d| d.spectral.series.as_ref())
    {
        if !candidate_times.is_empty() {
            let times: Vec<String> = candidate_times.iter().map(|t| format!("{:.2}s", t)).collect();
            eprintln!("    Splice candidates at: {}", times.join(", "));
        }
    }
    if let Some(ref error) = r.error {
        eprintln!("    {}", error);
    }
}
