//! Locates the `kolint.toml` that applies to a run.
//!
//! Candidates, first match wins:
//!
//! 1. the `--config` path, trusted without checking that it exists
//! 2. `kolint.toml`, then `.kolint.toml`, in the project directory
//! 3. `config.toml` in the global directory (`$KOLINT_CONFIG_DIR` or
//!    `~/.kolint/`)
//!
//! Without a match the built-in defaults apply.

use anyhow::{Context, Result};
use kolint::Config;
use std::path::{Path, PathBuf};

/// Where the configuration was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Given with `--config`.
    Explicit(PathBuf),
    /// Found in the project directory.
    Project(PathBuf),
    /// Found in the global directory.
    Global(PathBuf),
    /// Nothing found.
    Default,
}

impl ConfigSource {
    /// Returns the config file, if one was found.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Explicit(p) | Self::Project(p) | Self::Global(p) => Some(p),
            Self::Default => None,
        }
    }

    /// Reads the config file, or returns the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error naming the file if it cannot be read or parsed.
    pub fn load(&self) -> Result<Config> {
        let Some(path) = self.path() else {
            return Ok(Config::default());
        };
        if matches!(self, Self::Global(_)) {
            tracing::info!("Using global config: {}", path.display());
        }
        Config::from_file(path).with_context(|| format!("Failed to load config: {}", path.display()))
    }
}

const PROJECT_FILES: [&str; 2] = ["kolint.toml", ".kolint.toml"];
const GLOBAL_FILE: &str = "config.toml";

/// Resolves configuration files against a fixed global directory.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    global_dir: Option<PathBuf>,
}

impl Resolver {
    /// Uses `$KOLINT_CONFIG_DIR`, or `~/.kolint/` when it is not set.
    #[must_use]
    pub fn from_env() -> Self {
        let global_dir = std::env::var_os("KOLINT_CONFIG_DIR")
            .map(PathBuf::from)
            .or_else(|| home::home_dir().map(|home| home.join(".kolint")));
        Self { global_dir }
    }

    /// Uses `dir` as the global directory.
    #[must_use]
    pub fn with_global_dir(dir: Option<PathBuf>) -> Self {
        Self { global_dir: dir }
    }

    /// Finds the configuration for `project_dir`.
    #[must_use]
    pub fn resolve(&self, project_dir: &Path, explicit: Option<&Path>) -> ConfigSource {
        if let Some(path) = explicit {
            return ConfigSource::Explicit(path.to_path_buf());
        }
        let project = PROJECT_FILES
            .iter()
            .map(|name| project_dir.join(name))
            .find(|candidate| candidate.is_file());
        if let Some(path) = project {
            tracing::debug!("Found project config: {}", path.display());
            return ConfigSource::Project(path);
        }
        let global = self
            .global_dir
            .as_ref()
            .map(|dir| dir.join(GLOBAL_FILE))
            .filter(|candidate| candidate.is_file());
        match global {
            Some(path) => {
                tracing::debug!("Found global config: {}", path.display());
                ConfigSource::Global(path)
            }
            None => ConfigSource::Default,
        }
    }
}

/// Finds the configuration for `project_dir` using the environment's
/// global directory.
#[must_use]
pub fn resolve(project_dir: &Path, explicit: Option<&Path>) -> ConfigSource {
    Resolver::from_env().resolve(project_dir, explicit)
}

/// Returns the directory searched for a project config: the first input
/// directory, or the directory of the first input file.
#[must_use]
pub fn project_dir(paths: &[PathBuf]) -> PathBuf {
    match paths.first() {
        Some(first) if first.is_dir() => first.clone(),
        Some(first) => first
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf),
        None => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct Dirs {
        project: TempDir,
        global: TempDir,
    }

    impl Dirs {
        fn new(project_files: &[&str], with_global: bool) -> Self {
            let dirs = Self {
                project: TempDir::new().unwrap(),
                global: TempDir::new().unwrap(),
            };
            for name in project_files {
                fs::write(dirs.project.path().join(name), "").unwrap();
            }
            if with_global {
                fs::write(dirs.global.path().join(GLOBAL_FILE), "").unwrap();
            }
            dirs
        }

        fn resolve(&self, explicit: Option<&Path>) -> ConfigSource {
            Resolver::with_global_dir(Some(self.global.path().to_path_buf()))
                .resolve(self.project.path(), explicit)
        }
    }

    #[test]
    fn explicit_path_wins_and_is_not_checked() {
        let dirs = Dirs::new(&["kolint.toml"], true);
        let explicit = Path::new("/nonexistent/kolint.toml");
        assert_eq!(
            dirs.resolve(Some(explicit)),
            ConfigSource::Explicit(explicit.to_path_buf())
        );
    }

    #[test]
    fn project_files_are_checked_in_order() {
        let both = Dirs::new(&[".kolint.toml", "kolint.toml"], true);
        assert_eq!(
            both.resolve(None),
            ConfigSource::Project(both.project.path().join("kolint.toml"))
        );

        let hidden = Dirs::new(&[".kolint.toml"], true);
        assert_eq!(
            hidden.resolve(None),
            ConfigSource::Project(hidden.project.path().join(".kolint.toml"))
        );
    }

    #[test]
    fn global_config_is_the_fallback() {
        let dirs = Dirs::new(&[], true);
        assert_eq!(
            dirs.resolve(None),
            ConfigSource::Global(dirs.global.path().join(GLOBAL_FILE))
        );
        assert_eq!(Dirs::new(&[], false).resolve(None), ConfigSource::Default);
    }

    #[test]
    fn missing_global_dir_yields_default() {
        let project = TempDir::new().unwrap();
        let source = Resolver::with_global_dir(None).resolve(project.path(), None);
        assert_eq!(source, ConfigSource::Default);
        assert!(source.path().is_none());
    }

    #[test]
    fn project_config_is_loaded() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("kolint.toml");
        fs::write(&path, "preset = \"all\"\n\n[style]\nmax_line_length = 100\n").unwrap();

        let config = ConfigSource::Project(path).load().unwrap();
        assert_eq!(config.preset.as_deref(), Some("all"));
        assert_eq!(
            config.to_settings().unwrap().max_line_length().limit(),
            Some(100)
        );
        assert!(ConfigSource::Default.load().unwrap().preset.is_none());
    }

    #[test]
    fn broken_config_names_the_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("kolint.toml");
        fs::write(&path, "preset = [").unwrap();

        let err = ConfigSource::Explicit(path).load().unwrap_err();
        assert!(err.to_string().contains("kolint.toml"), "{err}");
    }

    #[test]
    fn project_dir_of_file_is_its_parent() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("Main.kt");
        fs::write(&file, "").unwrap();

        assert_eq!(project_dir(&[file]), tmp.path());
        assert_eq!(project_dir(&[tmp.path().to_path_buf()]), tmp.path());
        assert_eq!(project_dir(&[PathBuf::from("Main.kt")]), PathBuf::from("."));
        assert_eq!(project_dir(&[]), PathBuf::from("."));
    }
}
