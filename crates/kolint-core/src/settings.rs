//! Resolved settings snapshot consumed by the engine and its rules.
//!
//! A [`Settings`] value is immutable while files are processed and can be
//! shared by reference across worker threads.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::ConfigError;
use crate::rule::RuleId;

/// Id of the rule that owns the `max_line_length` property.
pub const MAX_LINE_LENGTH_RULE_ID: &str = "standard:max-line-length";

/// Maximum line length, or no limit at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaxLineLength {
    /// Lines may hold at most this many characters.
    Limited(usize),
    /// Line length is not checked.
    Unlimited,
}

impl MaxLineLength {
    /// Returns true if a line of `length` characters exceeds the limit.
    #[must_use]
    pub fn is_exceeded_by(self, length: usize) -> bool {
        match self {
            Self::Limited(max) => length > max,
            Self::Unlimited => false,
        }
    }

    /// Returns the limit, if any.
    #[must_use]
    pub fn limit(self) -> Option<usize> {
        match self {
            Self::Limited(max) => Some(max),
            Self::Unlimited => None,
        }
    }
}

/// Code style variant, which determines defaults such as the line length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeStyle {
    /// The ktlint official code style.
    #[default]
    KtlintOfficial,
    /// IntelliJ IDEA default Kotlin code style.
    IntellijIdea,
    /// Android Studio Kotlin code style.
    AndroidStudio,
}

impl CodeStyle {
    /// Returns the line length applied when none is configured.
    #[must_use]
    pub fn default_max_line_length(self) -> MaxLineLength {
        match self {
            Self::KtlintOfficial => MaxLineLength::Limited(140),
            Self::AndroidStudio => MaxLineLength::Limited(100),
            Self::IntellijIdea => MaxLineLength::Unlimited,
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "ktlint_official" => Some(Self::KtlintOfficial),
            "intellij_idea" => Some(Self::IntellijIdea),
            "android_studio" => Some(Self::AndroidStudio),
            _ => None,
        }
    }
}

/// Character used for indentation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndentStyle {
    /// Indent with spaces.
    #[default]
    Space,
    /// Indent with tabs.
    Tab,
}

/// Indentation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndentConfig {
    /// Space or tab.
    pub style: IndentStyle,
    /// Width of one indentation level in columns.
    pub size: usize,
}

impl Default for IndentConfig {
    fn default() -> Self {
        Self {
            style: IndentStyle::Space,
            size: 4,
        }
    }
}

impl IndentConfig {
    /// Returns the text of one indentation level.
    #[must_use]
    pub fn unit(&self) -> String {
        match self.style {
            IndentStyle::Space => " ".repeat(self.size),
            IndentStyle::Tab => "\t".to_string(),
        }
    }

    /// Returns the text of `level` indentation levels.
    #[must_use]
    pub fn indent(&self, level: usize) -> String {
        self.unit().repeat(level)
    }

    /// Returns the number of whole levels in `indent`. Tabs count as one level.
    #[must_use]
    pub fn level_of(&self, indent: &str) -> usize {
        let indent = indent.rsplit(['\n', '\r']).next().unwrap_or(indent);
        let width: usize = indent
            .chars()
            .map(|c| if c == '\t' { self.size.max(1) } else { 1 })
            .sum();
        width / self.size.max(1)
    }
}

/// Resolved configuration for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Active code style.
    pub code_style: CodeStyle,
    /// Explicit line length; `None` uses the code style default.
    pub max_line_length: Option<MaxLineLength>,
    /// Indentation unit.
    pub indent: IndentConfig,
    /// Whether files must end with a line break.
    pub insert_final_newline: bool,
    /// Whether backticked identifiers are excluded from line length.
    pub ignore_back_ticked_identifier: bool,
    /// Whether experimental rules run by default.
    pub experimental: bool,
    /// Explicit enable/disable per qualified rule id.
    pub rule_execution: BTreeMap<RuleId, bool>,
    /// Explicit enable/disable per rule set id.
    pub rule_set_execution: BTreeMap<String, bool>,
    /// Remaining properties, available to rules as raw strings.
    pub properties: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            code_style: CodeStyle::default(),
            max_line_length: None,
            indent: IndentConfig::default(),
            insert_final_newline: true,
            ignore_back_ticked_identifier: false,
            experimental: false,
            rule_execution: BTreeMap::new(),
            rule_set_execution: BTreeMap::new(),
            properties: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Creates default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an explicit maximum line length.
    #[must_use]
    pub fn with_max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = Some(MaxLineLength::Limited(max));
        self
    }

    /// Disables the line length limit.
    #[must_use]
    pub fn with_unlimited_line_length(mut self) -> Self {
        self.max_line_length = Some(MaxLineLength::Unlimited);
        self
    }

    /// Sets the code style.
    #[must_use]
    pub fn with_code_style(mut self, code_style: CodeStyle) -> Self {
        self.code_style = code_style;
        self
    }

    /// Sets the indentation unit.
    #[must_use]
    pub fn with_indent(mut self, indent: IndentConfig) -> Self {
        self.indent = indent;
        self
    }

    /// Sets whether files must end with a line break.
    #[must_use]
    pub fn with_insert_final_newline(mut self, insert: bool) -> Self {
        self.insert_final_newline = insert;
        self
    }

    /// Sets whether backticked identifiers are excluded from line length.
    #[must_use]
    pub fn with_ignore_back_ticked_identifier(mut self, ignore: bool) -> Self {
        self.ignore_back_ticked_identifier = ignore;
        self
    }

    /// Enables experimental rules.
    #[must_use]
    pub fn with_experimental(mut self, enabled: bool) -> Self {
        self.experimental = enabled;
        self
    }

    /// Enables or disables a rule explicitly.
    #[must_use]
    pub fn with_rule(mut self, id: impl Into<RuleId>, enabled: bool) -> Self {
        self.rule_execution.insert(id.into(), enabled);
        self
    }

    /// Sets a raw property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Builds settings from editorconfig style key/value pairs.
    ///
    /// Recognized keys are `max_line_length`, `indent_size`, `indent_style`,
    /// `ktlint_code_style`, `insert_final_newline`,
    /// `ktlint_ignore_back_ticked_identifier`, `ktlint_experimental`,
    /// `ktlint_<rule-set>` and `ktlint_<rule-set>_<rule>`. Other keys are kept
    /// as raw properties.
    ///
    /// # Errors
    ///
    /// Returns an error if a recognized key has a malformed value.
    pub fn from_properties<I, K, V>(properties: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut settings = Self::default();
        for (key, value) in properties {
            settings.apply_property(key.as_ref(), value.as_ref())?;
        }
        Ok(settings)
    }

    /// Applies a single editorconfig style property.
    ///
    /// # Errors
    ///
    /// Returns an error if a recognized key has a malformed value.
    pub fn apply_property(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();
        match key.as_str() {
            "max_line_length" => {
                self.max_line_length = Some(match value {
                    "off" | "unset" => MaxLineLength::Unlimited,
                    number => MaxLineLength::Limited(parse_usize(&key, number)?),
                });
            }
            "indent_size" => {
                if value != "unset" {
                    self.indent.size = parse_usize(&key, value)?;
                }
            }
            "indent_style" => {
                self.indent.style = match value {
                    "space" => IndentStyle::Space,
                    "tab" => IndentStyle::Tab,
                    other => return Err(invalid(&key, other, "space or tab")),
                };
            }
            "ktlint_code_style" => {
                self.code_style = CodeStyle::parse(value).ok_or_else(|| {
                    invalid(&key, value, "ktlint_official, intellij_idea or android_studio")
                })?;
            }
            "insert_final_newline" => self.insert_final_newline = parse_bool(&key, value)?,
            "ktlint_ignore_back_ticked_identifier" => {
                self.ignore_back_ticked_identifier = parse_bool(&key, value)?;
            }
            "ktlint_experimental" => self.experimental = parse_execution(&key, value)?,
            _ => {
                if let Some(rest) = key.strip_prefix("ktlint_") {
                    if let Ok(enabled) = parse_execution(&key, value) {
                        match rest.split_once('_') {
                            Some((rule_set, rule)) => {
                                self.rule_execution
                                    .insert(RuleId::new(format!("{rule_set}:{rule}")), enabled);
                            }
                            None => {
                                self.rule_set_execution.insert(rest.to_string(), enabled);
                            }
                        }
                        return Ok(());
                    }
                }
                self.properties.insert(key, value.to_string());
            }
        }
        Ok(())
    }

    /// Returns the configured line length, or the code style default.
    #[must_use]
    pub fn configured_max_line_length(&self) -> MaxLineLength {
        self.max_line_length
            .unwrap_or_else(|| self.code_style.default_max_line_length())
    }

    /// Returns the line length that wrapping rules must honour.
    ///
    /// When the `max-line-length` rule is disabled, the limit is not
    /// enforced by any other rule either.
    #[must_use]
    pub fn max_line_length(&self) -> MaxLineLength {
        if self.is_rule_enabled(&RuleId::new(MAX_LINE_LENGTH_RULE_ID), false) {
            self.configured_max_line_length()
        } else {
            MaxLineLength::Unlimited
        }
    }

    /// Returns the indentation unit.
    #[must_use]
    pub fn indent(&self) -> IndentConfig {
        self.indent
    }

    /// Decides whether a rule runs.
    ///
    /// An explicit rule setting wins over a rule set setting. Experimental
    /// rules otherwise follow [`Settings::experimental`].
    #[must_use]
    pub fn is_rule_enabled(&self, id: &RuleId, experimental: bool) -> bool {
        if let Some(&enabled) = self.rule_execution.get(id) {
            return enabled;
        }
        if let Some(&enabled) = self.rule_set_execution.get(id.rule_set()) {
            if !enabled {
                return false;
            }
        }
        !experimental || self.experimental
    }

    /// Returns a raw property.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Returns a raw property parsed as a boolean.
    #[must_use]
    pub fn property_bool(&self, key: &str, default: bool) -> bool {
        self.property(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }
}

fn invalid(key: &str, value: &str, expected: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    }
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value
        .parse()
        .map_err(|_| invalid(key, value, "a non-negative number"))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse().map_err(|_| invalid(key, value, "true or false"))
}

fn parse_execution(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value {
        "enabled" => Ok(true),
        "disabled" => Ok(false),
        other => Err(invalid(key, other, "enabled or disabled")),
    }
}
