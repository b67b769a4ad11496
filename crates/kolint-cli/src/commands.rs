//! Subcommand implementations.

pub mod check;
pub mod files;
pub mod format;
pub mod list_rules;
pub mod output;

use anyhow::{Context, Result};
use kolint::{Config, Frontend, LineLengthValue, RuleEngine, Settings};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use std::path::{Path, PathBuf};

use crate::{config_resolver, InputArgs, Overrides};

/// Engine, settings and file selection shared by the workers of one run.
pub struct Session {
    /// Rules to run.
    pub engine: RuleEngine,
    /// Settings snapshot for every file.
    pub settings: Settings,
    /// Loaded configuration.
    pub config: Config,
    /// Parser for every file.
    pub frontend: Box<dyn Frontend>,
}

impl Session {
    /// Resolves the configuration for `input` and builds the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or is invalid.
    pub fn load(input: &InputArgs, overrides: &Overrides, explicit: Option<&Path>) -> Result<Self> {
        let source = config_resolver::resolve(&config_resolver::project_dir(&input.paths), explicit);
        let mut config = source.load()?;
        apply_overrides(&mut config, overrides);
        let (engine, settings) = kolint::engine_for_config(&config).context("Invalid configuration")?;
        let frontend = overrides.parser.frontend();
        tracing::debug!(
            rules = ?engine.active_rule_ids(&settings),
            parser = frontend.name(),
            "Loaded rules"
        );
        Ok(Self {
            engine,
            settings,
            config,
            frontend,
        })
    }
}

fn apply_overrides(config: &mut Config, overrides: &Overrides) {
    if let Some(preset) = &overrides.preset {
        config.preset = Some(preset.clone());
    }
    if overrides.experimental {
        config.style.experimental = Some(true);
    }
    if let Some(max) = overrides.max_line_length {
        config.style.max_line_length = Some(LineLengthValue::Length(max));
    }
}

/// Reads all of stdin.
///
/// # Errors
///
/// Returns an error if stdin is not valid UTF-8 or cannot be read.
pub fn read_stdin() -> Result<String> {
    std::io::read_to_string(std::io::stdin()).context("Failed to read stdin")
}

/// Runs `job` on every file on the rayon thread pool.
///
/// Results are returned in the order of `files`.
pub fn process_parallel<T, F>(files: &[PathBuf], job: F) -> Vec<T>
where
    T: Send,
    F: Fn(&Path) -> T + Sync + Send,
{
    files.par_iter().map(|file| job(file)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parallel_results_keep_input_order() {
        let files: Vec<PathBuf> = (0..37).map(|i| PathBuf::from(format!("F{i}.kt"))).collect();
        let names = process_parallel(&files, |path| path.display().to_string());
        let expected: Vec<String> = files.iter().map(|p| p.display().to_string()).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn failing_file_is_not_silently_dropped() {
        let files: Vec<PathBuf> = (0..8).map(|i| PathBuf::from(format!("F{i}.kt"))).collect();
        let run = std::panic::catch_unwind(|| {
            process_parallel(&files, |path| {
                assert_ne!(path, Path::new("F3.kt"), "cannot process");
                path.display().to_string()
            })
        });
        assert!(run.is_err());
    }

    #[test]
    fn overrides_take_precedence() {
        let mut config = Config::parse("preset = \"standard\"\n\n[style]\nmax_line_length = 80\n").unwrap();
        apply_overrides(
            &mut config,
            &Overrides {
                preset: Some("all".to_string()),
                experimental: true,
                max_line_length: Some(120),
                ..Overrides::default()
            },
        );
        assert_eq!(config.preset.as_deref(), Some("all"));
        let settings = config.to_settings().unwrap();
        assert!(settings.experimental);
        assert_eq!(settings.max_line_length().limit(), Some(120));
    }
}
