//! JSON report

use crate::analyzer::FileAnalysis;
use crate::error::Result;
use crate::report::Summary;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct Report<'a> {
    generator: &'static str,
    version: &'static str,
    summary: Summary,
    files: &'a [FileAnalysis],
}

pub fn write<W: Write>(writer: &mut W, results: &[FileAnalysis]) -> Result<()> {
    let report = Report {
        generator: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        summary: Summary::from_results(results),
        files: results,
    };

    serde_json::to_writer_pretty(&mut *writer, &report)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
