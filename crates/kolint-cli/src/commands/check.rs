//! Check command implementation.

use anyhow::Result;
use kolint::{SourceText, STDIN_FILE};
use std::path::{Path, PathBuf};

use super::output::{self, FileReport};
use super::{files, Session};
use crate::{InputArgs, OutputFormat, Overrides};

/// Runs the check command. Returns `true` if no violations were found.
pub fn run(
    input: &InputArgs,
    overrides: &Overrides,
    format: OutputFormat,
    config: Option<&Path>,
) -> Result<bool> {
    let session = Session::load(input, overrides, config)?;

    let reports = if input.stdin {
        vec![check_source(&session, STDIN_FILE, &super::read_stdin()?)]
    } else {
        let files: Vec<PathBuf> = files::discover(&input.paths, &session.config.files, &input.exclude)?;
        tracing::info!("Checking {} file(s)", files.len());
        super::process_parallel(&files, |path| check_file(&session, path))
    };

    output::print(&reports, format)?;
    Ok(reports.iter().all(FileReport::is_clean))
}

fn check_file(session: &Session, path: &Path) -> FileReport {
    let file = path.display().to_string();
    match std::fs::read_to_string(path) {
        Ok(code) => check_source(session, &file, &code),
        Err(e) => FileReport::failed(file, format!("Failed to read file: {e}")),
    }
}

fn check_source(session: &Session, file: &str, code: &str) -> FileReport {
    let frontend = session.frontend.as_ref();
    match kolint::lint_source_with(frontend, file, code, &session.settings, &session.engine) {
        Ok(outcome) => FileReport::new(file, SourceText::new(code).text, outcome.violations, outcome.faults),
        Err(e) => FileReport::failed(file, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParserKind;
    use std::fs;
    use tempfile::TempDir;

    fn session(dir: &Path) -> Session {
        session_with(dir, &Overrides::default())
    }

    fn session_with(dir: &Path, overrides: &Overrides) -> Session {
        let input = InputArgs {
            paths: vec![dir.to_path_buf()],
            exclude: vec![],
            stdin: false,
        };
        Session::load(&input, overrides, None).unwrap()
    }

    #[test]
    fn file_violations_are_reported() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("Main.kt");
        fs::write(&path, "fun name() {\n}").unwrap();

        let report = check_file(&session(tmp.path()), &path);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].rule_id.as_str(), "standard:final-newline");
        assert!(!report.is_clean());
    }

    #[test]
    fn tree_sitter_parser_can_be_selected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("Main.kt");
        fs::write(&path, "fun name() {\n}").unwrap();
        let overrides = Overrides {
            parser: ParserKind::TreeSitter,
            ..Overrides::default()
        };

        let session = session_with(tmp.path(), &overrides);
        assert_eq!(session.frontend.name(), "tree-sitter");
        let report = check_file(&session, &path);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].rule_id.as_str(), "standard:final-newline");
    }

    #[test]
    fn project_config_is_honoured() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("kolint.toml"),
            "[rules.\"standard:final-newline\"]\nenabled = false\n",
        )
        .unwrap();
        let path = tmp.path().join("Main.kt");
        fs::write(&path, "fun name() {\n}").unwrap();

        assert!(check_file(&session(tmp.path()), &path).is_clean());
    }

    #[test]
    fn unparsable_file_is_a_failed_report() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("Broken.kt");
        fs::write(&path, "fun f() {\n").unwrap();

        let report = check_file(&session(tmp.path()), &path);
        assert!(report.error.as_deref().is_some_and(|e| e.contains("Failed to parse")));
    }

    #[test]
    fn missing_file_is_a_failed_report() {
        let tmp = TempDir::new().unwrap();
        let report = check_file(&session(tmp.path()), &tmp.path().join("Missing.kt"));
        assert!(report.error.as_deref().is_some_and(|e| e.starts_with("Failed to read file")));
    }
}
