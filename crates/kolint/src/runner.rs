//! Runs the engine on source text.
//!
//! Source text is normalized before parsing: a leading byte order mark is
//! dropped and `\r\n` becomes `\n`. Formatted output gets both back, so a
//! file keeps its encoding marker and line separator. Violation lines and
//! columns are the same in both forms.

use kolint_core::{
    Config, ConfigError, EngineError, FormatOutcome, LintOutcome, RuleEngine, Settings, STDIN_FILE,
};
use kolint_parser::{strip_bom, Frontend, KotlinParser, ParseError, TreeSitterFrontend, BOM};
use kolint_rules::Preset;
use thiserror::Error;
use tracing::debug;

/// Errors raised while running kolint on source text.
#[derive(Debug, Error)]
pub enum KolintError {
    /// The source could not be parsed.
    #[error("Failed to parse {file}: {source}")]
    Parse {
        /// File being parsed.
        file: String,
        /// Parser error.
        #[source]
        source: ParseError,
    },

    /// The engine could not be built or formatting failed.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The configured preset does not exist.
    #[error("Unknown preset `{0}`. Valid presets: standard, experimental, all")]
    UnknownPreset(String),

    /// The requested parser frontend does not exist.
    #[error("Unknown parser `{0}`. Valid parsers: kotlin, tree-sitter")]
    UnknownParser(String),
}

/// Line separator used by a source file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineSeparator {
    /// `\n`
    #[default]
    Lf,
    /// `\r\n`
    CrLf,
}

impl LineSeparator {
    /// Returns the separator of the first line break in `code`, or `Lf` if
    /// there is none.
    #[must_use]
    pub fn detect(code: &str) -> Self {
        match code.find('\n') {
            Some(i) if i > 0 && code.as_bytes()[i - 1] == b'\r' => Self::CrLf,
            _ => Self::Lf,
        }
    }

    /// Returns the separator text.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

/// Source text normalized for parsing, with what is needed to restore it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    /// Text without byte order mark, with `\n` line separators.
    pub text: String,
    /// Whether the original started with a byte order mark.
    pub bom: bool,
    /// Line separator of the original.
    pub separator: LineSeparator,
}

impl SourceText {
    /// Normalizes `code`.
    #[must_use]
    pub fn new(code: &str) -> Self {
        let (code, bom) = strip_bom(code);
        let separator = LineSeparator::detect(code);
        let text = match separator {
            LineSeparator::Lf => code.to_string(),
            LineSeparator::CrLf => code.replace("\r\n", "\n"),
        };
        Self {
            text,
            bom,
            separator,
        }
    }

    /// Converts normalized `text` back to the form of the original.
    #[must_use]
    pub fn restore(&self, text: &str) -> String {
        let mut restored = String::with_capacity(text.len() + 4);
        if self.bom {
            restored.push(BOM);
        }
        match self.separator {
            LineSeparator::Lf => restored.push_str(text),
            LineSeparator::CrLf => restored.push_str(&text.replace('\n', "\r\n")),
        }
        restored
    }
}

/// Result of formatting source text.
#[derive(Debug, Clone)]
pub struct Formatted {
    /// Formatted source, in the form of the input.
    pub code: String,
    /// Whether `code` differs from the input.
    pub changed: bool,
    /// Corrected and remaining violations, and failed rules.
    pub outcome: FormatOutcome,
}

/// Lints source text that does not come from a file.
///
/// # Errors
///
/// Returns an error if the code cannot be parsed.
pub fn lint_code(code: &str, settings: &Settings, engine: &RuleEngine) -> Result<LintOutcome, KolintError> {
    lint_source(STDIN_FILE, code, settings, engine)
}

/// Lints the source text of `file`.
///
/// # Errors
///
/// Returns an error if the code cannot be parsed.
pub fn lint_source(
    file: &str,
    code: &str,
    settings: &Settings,
    engine: &RuleEngine,
) -> Result<LintOutcome, KolintError> {
    lint_source_with(&KotlinParser, file, code, settings, engine)
}

/// Lints the source text of `file`, parsing it with `frontend`.
///
/// # Errors
///
/// Returns an error if `frontend` cannot parse the code.
pub fn lint_source_with(
    frontend: &dyn Frontend,
    file: &str,
    code: &str,
    settings: &Settings,
    engine: &RuleEngine,
) -> Result<LintOutcome, KolintError> {
    let source = SourceText::new(code);
    let tree = parse(frontend, file, &source)?;
    Ok(engine.lint_file(file, &tree, settings))
}

/// Formats source text that does not come from a file.
///
/// # Errors
///
/// Returns an error if the code cannot be parsed or formatting does not
/// converge. Rules that fail are reported in the outcome's `faults`.
pub fn format_code(code: &str, settings: &Settings, engine: &RuleEngine) -> Result<Formatted, KolintError> {
    format_source(STDIN_FILE, code, settings, engine)
}

/// Formats the source text of `file`.
///
/// # Errors
///
/// See [`format_code`].
pub fn format_source(
    file: &str,
    code: &str,
    settings: &Settings,
    engine: &RuleEngine,
) -> Result<Formatted, KolintError> {
    format_source_with(&KotlinParser, file, code, settings, engine)
}

/// Formats the source text of `file`, parsing it with `frontend`.
///
/// # Errors
///
/// See [`format_code`].
pub fn format_source_with(
    frontend: &dyn Frontend,
    file: &str,
    code: &str,
    settings: &Settings,
    engine: &RuleEngine,
) -> Result<Formatted, KolintError> {
    let source = SourceText::new(code);
    let mut tree = parse(frontend, file, &source)?;
    let outcome = engine.format_file(file, &mut tree, settings, None)?;
    let formatted = source.restore(&tree.render());
    debug!(
        file,
        passes = outcome.passes,
        corrected = outcome.corrected.len(),
        "Formatted"
    );
    Ok(Formatted {
        changed: formatted != code,
        code: formatted,
        outcome,
    })
}

fn parse(
    frontend: &dyn Frontend,
    file: &str,
    source: &SourceText,
) -> Result<kolint_core::SyntaxTree, KolintError> {
    debug!(file, frontend = frontend.name(), "Parsing");
    frontend.parse(&source.text).map_err(|source| KolintError::Parse {
        file: file.to_string(),
        source,
    })
}

/// Resolves a parser frontend name.
///
/// # Errors
///
/// Returns [`KolintError::UnknownParser`] for names other than `kotlin` and
/// `tree-sitter`.
pub fn frontend_by_name(name: &str) -> Result<Box<dyn Frontend>, KolintError> {
    match name {
        "kotlin" => Ok(Box::new(KotlinParser::new())),
        "tree-sitter" => Ok(Box::new(TreeSitterFrontend::new())),
        other => Err(KolintError::UnknownParser(other.to_string())),
    }
}

/// Builds an engine with the built-in rules.
///
/// Experimental rules are loaded when `settings` enables them.
///
/// # Errors
///
/// Returns an error if the rule ordering constraints are inconsistent.
pub fn standard_engine(settings: &Settings) -> Result<RuleEngine, EngineError> {
    let preset = if settings.experimental {
        Preset::All
    } else {
        Preset::Standard
    };
    engine_for_preset(preset, None)
}

/// Builds an engine with the rules of `preset`.
///
/// # Errors
///
/// Returns an error if the rule ordering constraints are inconsistent.
pub fn engine_for_preset(preset: Preset, max_format_passes: Option<usize>) -> Result<RuleEngine, EngineError> {
    let mut builder = RuleEngine::builder().rules(preset.rules());
    if let Some(passes) = max_format_passes {
        builder = builder.max_format_passes(passes);
    }
    builder.build()
}

/// Resolves a preset name.
///
/// # Errors
///
/// Returns [`KolintError::UnknownPreset`] for names other than `standard`,
/// `experimental` and `all`.
pub fn preset_by_name(name: &str) -> Result<Preset, KolintError> {
    match name {
        "standard" => Ok(Preset::Standard),
        "experimental" => Ok(Preset::Experimental),
        "all" => Ok(Preset::All),
        other => Err(KolintError::UnknownPreset(other.to_string())),
    }
}

/// Builds the engine and settings described by `config`.
///
/// Without a preset the standard rules are loaded, plus the experimental
/// ones when the configuration enables them.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or names an unknown
/// preset.
pub fn engine_for_config(config: &Config) -> Result<(RuleEngine, Settings), KolintError> {
    let settings = config.to_settings()?;
    let preset = match config.preset.as_deref() {
        Some(name) => preset_by_name(name)?,
        None if settings.experimental => Preset::All,
        None => Preset::Standard,
    };
    let engine = engine_for_preset(preset, config.max_format_passes)?;
    debug!(?preset, rules = engine.rules().count(), "Built engine");
    Ok((engine, settings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_names_resolve() {
        assert_eq!(preset_by_name("standard").unwrap(), Preset::Standard);
        assert_eq!(preset_by_name("all").unwrap(), Preset::All);
        assert!(matches!(
            preset_by_name("strict"),
            Err(KolintError::UnknownPreset(name)) if name == "strict"
        ));
    }

    #[test]
    fn line_separator_follows_first_line_break() {
        assert_eq!(LineSeparator::detect("a\r\nb\n"), LineSeparator::CrLf);
        assert_eq!(LineSeparator::detect("a\nb\r\n"), LineSeparator::Lf);
        assert_eq!(LineSeparator::detect("a"), LineSeparator::Lf);
    }

    #[test]
    fn source_text_restores_bom_and_separator() {
        let source = SourceText::new("\u{feff}val a = 1\r\nval b = 2\r\n");
        assert_eq!(source.text, "val a = 1\nval b = 2\n");
        assert!(source.bom);
        assert_eq!(source.restore(&source.text), "\u{feff}val a = 1\r\nval b = 2\r\n");
    }

    #[test]
    fn config_preset_selects_rules() {
        let config = Config::parse("preset = \"experimental\"\n").unwrap();
        let (engine, _) = engine_for_config(&config).unwrap();
        let ids: Vec<String> = engine.rules().map(|r| r.id().to_string()).collect();
        assert_eq!(ids, vec!["standard:condition-wrapping"]);
    }

    #[test]
    fn unknown_preset_in_config_is_rejected() {
        let config = Config::parse("preset = \"strict\"\n").unwrap();
        assert!(matches!(
            engine_for_config(&config),
            Err(KolintError::UnknownPreset(_))
        ));
    }

    #[test]
    fn frontend_names_resolve() {
        assert_eq!(frontend_by_name("kotlin").unwrap().name(), "kotlin");
        assert_eq!(frontend_by_name("tree-sitter").unwrap().name(), "tree-sitter");
        assert!(matches!(
            frontend_by_name("antlr"),
            Err(KolintError::UnknownParser(name)) if name == "antlr"
        ));
    }

    #[test]
    fn tree_sitter_frontend_feeds_the_engine() {
        let settings = Settings::new();
        let engine = standard_engine(&settings).unwrap();
        let frontend = TreeSitterFrontend::new();

        let outcome =
            lint_source_with(&frontend, "Main.kt", "fun name() {\n}", &settings, &engine).unwrap();
        let ids: Vec<&str> = outcome.violations.iter().map(|v| v.rule_id.as_str()).collect();
        assert_eq!(ids, vec!["standard:final-newline"]);

        let formatted =
            format_source_with(&frontend, "Main.kt", "val a = 1  \r\n", &settings, &engine).unwrap();
        assert_eq!(formatted.code, "val a = 1\r\n");
    }

    #[test]
    fn tree_sitter_parse_errors_name_the_file() {
        let engine = standard_engine(&Settings::new()).unwrap();
        let frontend = TreeSitterFrontend::new();
        let err = lint_source_with(&frontend, "Broken.kt", "fun f( {\n", &Settings::new(), &engine)
            .unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse Broken.kt: Syntax error"), "{err}");
    }

    #[test]
    fn parse_errors_name_the_file() {
        let engine = standard_engine(&Settings::new()).unwrap();
        let err = lint_source("Broken.kt", "fun f() {\n", &Settings::new(), &engine).unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse Broken.kt"), "{err}");
    }
}
