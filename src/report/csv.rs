//! CSV report, one row per file

use crate::analyzer::FileAnalysis;
use crate::error::Result;
use std::io::Write;

const HEADER: &str = "file_path,file_name,verdict,confidence,duration_secs,sample_rate,\
enf_suspicious,spectral_suspicious,noise_suspicious,details,error";

pub fn write<W: Write>(writer: &mut W, results: &[FileAnalysis]) -> Result<()> {
    writeln!(writer, "{}", HEADER)?;

    for r in results {
        let (duration, sample_rate, details) = match &r.report {
            Some(report) => (
                format!("{:.3}", report.duration),
                report.sample_rate.to_string(),
                report.details.join(" | "),
            ),
            None => (String::new(), String::new(), String::new()),
        };

        let flags = match &r.detectors {
            Some(d) => [
                d.enf.suspicious.to_string(),
                d.spectral.suspicious.to_string(),
                d.noise_consistency.suspicious.to_string(),
            ],
            None => Default::default(),
        };

        writeln!(
            writer,
            "{},{},{},{},{},{},{},{},{},{},{}",
            escape(&r.file_path),
            escape(&r.file_name),
            r.verdict,
            r.confidence(),
            duration,
            sample_rate,
            flags[0],
            flags[1],
            flags[2],
            escape(&details),
            escape(r.error.as_deref().unwrap_or("")),
        )?;
    }

    writer.flush()?;
    Ok(())
}

/// Quote a field when it contains a separator, quote or line break
fn escape(field: &str) -> String {
    if field.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
