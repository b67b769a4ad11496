//! Configuration file types for kolint.
//!
//! A `kolint.toml` file selects a preset, tunes the format loop, sets style
//! properties and enables or disables individual rules. [`Config::to_settings`]
//! turns it into the immutable [`Settings`] snapshot used by the engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::rule::RuleId;
use crate::settings::Settings;

/// Top-level configuration for kolint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Preset to use (`standard`, `experimental` or `all`).
    #[serde(default)]
    pub preset: Option<String>,

    /// Upper bound of format passes per file.
    #[serde(default)]
    pub max_format_passes: Option<usize>,

    /// Style properties, using editorconfig key names.
    #[serde(default)]
    pub style: StyleConfig,

    /// File selection.
    #[serde(default)]
    pub files: FilesConfig,

    /// Per-rule configurations, keyed by rule id.
    #[serde(default)]
    pub rules: BTreeMap<String, RuleConfig>,
}

impl Config {
    /// Creates a new default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    /// Checks if a rule is enabled explicitly, not considering presets.
    #[must_use]
    pub fn is_rule_enabled(&self, rule_id: &str) -> bool {
        self.rule_config(rule_id)
            .map_or(true, |c| c.enabled.unwrap_or(true))
    }

    /// Returns the configuration of a rule, accepting qualified and
    /// unqualified ids.
    #[must_use]
    pub fn rule_config(&self, rule_id: &str) -> Option<&RuleConfig> {
        let qualified = RuleId::new(rule_id);
        self.rules.get(rule_id).or_else(|| {
            self.rules
                .iter()
                .find(|(key, _)| RuleId::new(key.as_str()) == qualified)
                .map(|(_, config)| config)
        })
    }

    /// Builds the settings snapshot described by this configuration.
    ///
    /// Rule options are exposed as `ktlint_<rule-set>_<rule>_<option>`
    /// properties.
    ///
    /// # Errors
    ///
    /// Returns an error if a style property has a malformed value.
    pub fn to_settings(&self) -> Result<Settings, ConfigError> {
        let mut settings = Settings::default();
        if let Some(value) = &self.style.code_style {
            settings.apply_property("ktlint_code_style", value)?;
        }
        if let Some(value) = &self.style.max_line_length {
            settings.apply_property("max_line_length", &value.to_property())?;
        }
        if let Some(size) = self.style.indent_size {
            settings.indent.size = size;
        }
        if let Some(value) = &self.style.indent_style {
            settings.apply_property("indent_style", value)?;
        }
        if let Some(insert) = self.style.insert_final_newline {
            settings.insert_final_newline = insert;
        }
        if let Some(ignore) = self.style.ignore_back_ticked_identifier {
            settings.ignore_back_ticked_identifier = ignore;
        }
        if let Some(experimental) = self.style.experimental {
            settings.experimental = experimental;
        }
        for (key, value) in &self.style.properties {
            settings.apply_property(key, &toml_to_property(value))?;
        }

        for (id, rule) in &self.rules {
            let id = RuleId::new(id.as_str());
            if let Some(enabled) = rule.enabled {
                settings.rule_execution.insert(id.clone(), enabled);
            }
            for (option, value) in &rule.options {
                let key = format!(
                    "ktlint_{}_{}_{}",
                    id.rule_set(),
                    id.name().replace('-', "_"),
                    option
                );
                settings.properties.insert(key, toml_to_property(value));
            }
        }
        Ok(settings)
    }
}

/// Style properties.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StyleConfig {
    /// Code style (`ktlint_official`, `intellij_idea`, `android_studio`).
    #[serde(default)]
    pub code_style: Option<String>,

    /// Maximum line length, a number or `"off"`.
    #[serde(default)]
    pub max_line_length: Option<LineLengthValue>,

    /// Width of one indentation level.
    #[serde(default)]
    pub indent_size: Option<usize>,

    /// `space` or `tab`.
    #[serde(default)]
    pub indent_style: Option<String>,

    /// Whether files must end with a line break.
    #[serde(default)]
    pub insert_final_newline: Option<bool>,

    /// Whether backticked identifiers are excluded from line length.
    #[serde(default)]
    pub ignore_back_ticked_identifier: Option<bool>,

    /// Whether experimental rules run.
    #[serde(default)]
    pub experimental: Option<bool>,

    /// Any other editorconfig style property.
    #[serde(flatten)]
    pub properties: BTreeMap<String, toml::Value>,
}

/// Maximum line length as written in a config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LineLengthValue {
    /// A character count.
    Length(usize),
    /// A keyword such as `"off"`.
    Keyword(String),
}

impl LineLengthValue {
    fn to_property(&self) -> String {
        match self {
            Self::Length(length) => length.to_string(),
            Self::Keyword(keyword) => keyword.clone(),
        }
    }
}

/// File selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesConfig {
    /// Glob patterns of files to check.
    #[serde(default = "default_include")]
    pub include: Vec<String>,

    /// Glob patterns to exclude from checking.
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,

    /// Whether to respect .gitignore files.
    #[serde(default = "default_true")]
    pub respect_gitignore: bool,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            include: default_include(),
            exclude: default_exclude(),
            respect_gitignore: true,
        }
    }
}

fn default_include() -> Vec<String> {
    vec!["**/*.kt".to_string(), "**/*.kts".to_string()]
}

fn default_exclude() -> Vec<String> {
    vec!["**/build/**".to_string()]
}

fn default_true() -> bool {
    true
}

fn toml_to_property(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Array(items) => items
            .iter()
            .map(toml_to_property)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

/// Per-rule configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Whether this rule is enabled.
    #[serde(default)]
    pub enabled: Option<bool>,

    /// Rule-specific options as key-value pairs.
    #[serde(flatten)]
    pub options: BTreeMap<String, toml::Value>,
}

impl RuleConfig {
    /// Gets a boolean option with a default value.
    #[must_use]
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.options
            .get(key)
            .and_then(toml::Value::as_bool)
            .unwrap_or(default)
    }

    /// Gets a string option with a default value.
    #[must_use]
    pub fn get_str<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.options
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or(default)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Parse error in config file.
    #[error("Failed to parse config: {message}")]
    Parse {
        /// Parse error message.
        message: String,
    },

    /// A property has a value of the wrong shape.
    #[error("Invalid value '{value}' for '{key}': expected {expected}")]
    InvalidValue {
        /// Property name.
        key: String,
        /// Offending value.
        value: String,
        /// Description of accepted values.
        expected: String,
    },
}
