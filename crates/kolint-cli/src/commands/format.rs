//! Format command implementation.

use anyhow::{Context, Result};
use kolint::{SourceText, STDIN_FILE};
use std::io::Write;
use std::path::Path;

use super::output::{self, FileReport};
use super::{files, Session};
use crate::{InputArgs, OutputFormat, Overrides};

/// Runs the format command.
///
/// Returns `true` if every file was formatted without remaining violations,
/// and, for a dry run, if no file would change.
pub fn run(
    input: &InputArgs,
    overrides: &Overrides,
    format: OutputFormat,
    dry_run: bool,
    config: Option<&Path>,
) -> Result<bool> {
    let session = Session::load(input, overrides, config)?;

    if input.stdin {
        return format_stdin(&session, format);
    }

    let files = files::discover(&input.paths, &session.config.files, &input.exclude)?;
    tracing::info!("Formatting {} file(s)", files.len());
    let reports = super::process_parallel(&files, |path| format_file(&session, path, dry_run));

    output::print(&reports, format)?;
    let changed = reports.iter().filter(|r| r.changed).count();
    if dry_run {
        for report in reports.iter().filter(|r| r.changed) {
            eprintln!("Would format {}", report.file);
        }
        eprintln!("{changed} file(s) would be formatted");
    } else {
        eprintln!("Formatted {changed} file(s)");
    }

    let clean = reports.iter().all(FileReport::is_clean);
    Ok(clean && !(dry_run && changed > 0))
}

fn format_stdin(session: &Session, format: OutputFormat) -> Result<bool> {
    let code = super::read_stdin()?;
    let formatted = kolint::format_source_with(
        session.frontend.as_ref(),
        STDIN_FILE,
        &code,
        &session.settings,
        &session.engine,
    )
    .context("Failed to format stdin")?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(formatted.code.as_bytes())?;
    stdout.flush()?;

    let report = FileReport::new(
        STDIN_FILE,
        SourceText::new(&formatted.code).text,
        formatted.outcome.remaining,
        formatted.outcome.faults,
    );
    output::render(&mut std::io::stderr().lock(), std::slice::from_ref(&report), format, false)?;
    Ok(report.is_clean())
}

fn format_file(session: &Session, path: &Path, dry_run: bool) -> FileReport {
    let file = path.display().to_string();
    let code = match std::fs::read_to_string(path) {
        Ok(code) => code,
        Err(e) => return FileReport::failed(file, format!("Failed to read file: {e}")),
    };
    let formatted = match kolint::format_source_with(
        session.frontend.as_ref(),
        &file,
        &code,
        &session.settings,
        &session.engine,
    ) {
        Ok(formatted) => formatted,
        Err(e) => return FileReport::failed(file, e.to_string()),
    };

    if formatted.changed && !dry_run {
        if let Err(e) = std::fs::write(path, &formatted.code) {
            return FileReport::failed(file, format!("Failed to write file: {e}"));
        }
        tracing::debug!("Formatted {file}");
    }

    let mut report = FileReport::new(
        file,
        SourceText::new(&formatted.code).text,
        formatted.outcome.remaining,
        formatted.outcome.faults,
    );
    report.changed = formatted.changed;
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn session(dir: &Path) -> Session {
        let input = InputArgs {
            paths: vec![dir.to_path_buf()],
            exclude: vec![],
            stdin: false,
        };
        Session::load(&input, &Overrides::default(), None).unwrap()
    }

    #[test]
    fn file_is_rewritten() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("Main.kt");
        fs::write(&path, "fun main() {  \n    val a = 1 \n}").unwrap();

        let report = format_file(&session(tmp.path()), &path, false);
        assert!(report.changed);
        assert!(report.is_clean(), "{report:?}");
        assert_eq!(fs::read_to_string(&path).unwrap(), "fun main() {\n    val a = 1\n}\n");
    }

    #[test]
    fn dry_run_leaves_file_untouched() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("Main.kt");
        fs::write(&path, "fun name() {\n}").unwrap();

        let report = format_file(&session(tmp.path()), &path, true);
        assert!(report.changed);
        assert_eq!(fs::read_to_string(&path).unwrap(), "fun name() {\n}");
    }

    #[test]
    fn crlf_file_keeps_its_line_separator() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("Main.kt");
        fs::write(&path, "val a = 1 \r\nval b = 2\r\n").unwrap();

        format_file(&session(tmp.path()), &path, false);
        assert_eq!(fs::read_to_string(&path).unwrap(), "val a = 1\r\nval b = 2\r\n");
    }

    #[test]
    fn unfixable_violations_remain_in_report() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("kolint.toml"), "[style]\nmax_line_length = 20\n").unwrap();
        let path = tmp.path().join("Main.kt");
        fs::write(&path, "val someLongPropertyName = 1\n").unwrap();

        let report = format_file(&session(tmp.path()), &path, false);
        assert!(!report.violations.is_empty());
        assert!(report.violations.iter().all(|v| !v.can_be_autocorrected), "{report:?}");
        assert!(report.error.is_none());
    }
}
