//! Discovery of the Kotlin files to process.

use anyhow::{Context, Result};
use glob::Pattern;
use kolint::FilesConfig;
use std::path::{Path, PathBuf};

/// Include and exclude globs, matched against paths relative to the walked
/// directory.
struct Selection {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl Selection {
    fn new(files: &FilesConfig, extra_exclude: &[String]) -> Result<Self> {
        Ok(Self {
            include: compile(&files.include)?,
            exclude: compile(files.exclude.iter().chain(extra_exclude))?,
        })
    }

    fn is_excluded(&self, path: &Path) -> bool {
        self.exclude.iter().any(|p| p.matches_path(path))
    }

    fn accepts(&self, relative: &Path) -> bool {
        self.include.iter().any(|p| p.matches_path(relative)) && !self.is_excluded(relative)
    }
}

fn compile<'a>(patterns: impl IntoIterator<Item = &'a String>) -> Result<Vec<Pattern>> {
    patterns
        .into_iter()
        .map(|p| Pattern::new(p).with_context(|| format!("Invalid glob pattern: {p}")))
        .collect()
}

/// Returns the files under `paths` selected by `files` and `extra_exclude`,
/// sorted and without duplicates.
///
/// Files named directly are always included unless excluded. Directories
/// are walked honouring `.gitignore` when configured.
///
/// # Errors
///
/// Returns an error if a glob pattern is invalid or a directory cannot be
/// walked.
pub fn discover(paths: &[PathBuf], files: &FilesConfig, extra_exclude: &[String]) -> Result<Vec<PathBuf>> {
    let selection = Selection::new(files, extra_exclude)?;
    let mut found = Vec::new();

    for root in paths {
        if root.is_file() {
            if !selection.is_excluded(root) {
                found.push(root.clone());
            }
            continue;
        }

        let mut builder = ignore::WalkBuilder::new(root);
        builder
            .hidden(false)
            .git_ignore(files.respect_gitignore)
            .require_git(false);

        for entry in builder.build() {
            let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let relative = path.strip_prefix(root).unwrap_or(path);
            if selection.accepts(relative) {
                found.push(path.to_path_buf());
            }
        }
    }

    found.sort();
    found.dedup();
    tracing::debug!("Discovered {} file(s)", found.len());
    Ok(found)
}
