//! Shared output formatting for lint results.

use anyhow::Result;
use kolint::{RuleFault, Violation, ViolationDiagnostic};
use miette::NamedSource;
use serde::Serialize;
use std::io::{IsTerminal, Write};

use crate::OutputFormat;

/// Result of processing one file.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FileReport {
    /// File name as given or discovered.
    pub file: String,
    /// Normalized text the violation offsets refer to.
    #[serde(skip)]
    pub source: String,
    /// Violations, sorted by position.
    pub violations: Vec<Violation>,
    /// Rules that failed on this file.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub faults: Vec<RuleFault>,
    /// Whether formatting changed the file.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub changed: bool,
    /// Why the file could not be processed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileReport {
    /// Creates a report for a processed file.
    #[must_use]
    pub fn new(file: impl Into<String>, source: String, violations: Vec<Violation>, faults: Vec<RuleFault>) -> Self {
        Self {
            file: file.into(),
            source,
            violations,
            faults,
            ..Self::default()
        }
    }

    /// Creates a report for a file that could not be processed.
    #[must_use]
    pub fn failed(file: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Returns true if nothing was reported for the file.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty() && self.faults.is_empty() && self.error.is_none()
    }
}

/// Prints reports to stdout, and faults and errors to stderr.
pub fn print(reports: &[FileReport], format: OutputFormat) -> Result<()> {
    let color = std::io::stdout().is_terminal();
    render(&mut std::io::stdout().lock(), reports, format, color)?;
    print_problems(reports);
    Ok(())
}

/// Prints faults and errors to stderr.
pub fn print_problems(reports: &[FileReport]) {
    for report in reports {
        if let Some(error) = &report.error {
            eprintln!("{}: {error}", report.file);
        }
        for fault in &report.faults {
            eprintln!("{fault}");
        }
    }
}

/// Writes the violations of `reports` to `out`.
pub fn render(out: &mut impl Write, reports: &[FileReport], format: OutputFormat, color: bool) -> Result<()> {
    match format {
        OutputFormat::Plain => render_plain(out, reports, color)?,
        OutputFormat::Json => render_json(out, reports)?,
        OutputFormat::Compact => render_compact(out, reports)?,
        OutputFormat::Pretty => render_pretty(out, reports)?,
    }
    Ok(())
}

fn render_plain(out: &mut impl Write, reports: &[FileReport], color: bool) -> Result<()> {
    let mut total = 0;
    let mut fixable = 0;
    let mut files = 0;

    for report in reports.iter().filter(|r| !r.violations.is_empty()) {
        files += 1;
        writeln!(out, "{}", report.file)?;
        for v in &report.violations {
            total += 1;
            let note = if v.can_be_autocorrected {
                fixable += 1;
                ""
            } else {
                " (cannot be auto-corrected)"
            };
            writeln!(out, "  {}:{} {} ({}){note}", v.line, v.column, v.message, v.rule_id)?;
        }
        writeln!(out)?;
    }

    let (start, end) = match (color, total) {
        (false, _) => ("", ""),
        (true, 0) => ("\x1b[32m", "\x1b[0m"),
        (true, _) => ("\x1b[31m", "\x1b[0m"),
    };
    writeln!(
        out,
        "{start}Found {total} violation(s), {fixable} auto-correctable, in {files} of {} file(s){end}",
        reports.len()
    )?;
    Ok(())
}

fn render_json(out: &mut impl Write, reports: &[FileReport]) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, reports)?;
    writeln!(out)?;
    Ok(())
}

fn render_compact(out: &mut impl Write, reports: &[FileReport]) -> Result<()> {
    for report in reports {
        for v in &report.violations {
            writeln!(out, "{}", v.format(&report.file))?;
        }
    }
    Ok(())
}

fn render_pretty(out: &mut impl Write, reports: &[FileReport]) -> Result<()> {
    for report in reports {
        for v in &report.violations {
            let diagnostic = miette::Report::new(ViolationDiagnostic::from(v))
                .with_source_code(NamedSource::new(&report.file, report.source.clone()));
            writeln!(out, "{diagnostic:?}")?;
        }
    }
    Ok(())
}
