use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

use crate::diagnostic::Severity;
use crate::engine::measure::DEFAULT_TAB_WIDTH;
use crate::linter::DEFAULT_MAX_PASSES;
use crate::rules;

/// File name looked up in the working directory when no `--config` is given.
pub const CONFIG_FILE: &str = "jsstyle.toml";

/// Contents of a `jsstyle.toml`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub max_passes: usize,
    pub tab_width: usize,
    pub rules: BTreeMap<String, RuleSetting>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_passes: DEFAULT_MAX_PASSES,
            tab_width: DEFAULT_TAB_WIDTH,
            rules: BTreeMap::new(),
        }
    }
}

/// `rule = "warn"` or `rule = { level = "warn", options = ..., skip_messages = [...] }`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RuleSetting {
    Level(Severity),
    Detailed(RuleTable),
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleTable {
    pub level: Severity,
    /// Handed to the rule as is; each rule parses its own shape.
    pub options: Option<toml::Value>,
    pub skip_messages: Vec<String>,
}

impl RuleSetting {
    #[must_use]
    pub const fn level(&self) -> Severity {
        match self {
            Self::Level(level) => *level,
            Self::Detailed(t) => t.level,
        }
    }

    #[must_use]
    pub const fn options(&self) -> Option<&toml::Value> {
        match self {
            Self::Level(_) => None,
            Self::Detailed(t) => t.options.as_ref(),
        }
    }

    #[must_use]
    pub fn skip_messages(&self) -> &[String] {
        match self {
            Self::Level(_) => &[],
            Self::Detailed(t) => &t.skip_messages,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        for name in config.rules.keys() {
            ensure!(rules::NAMES.contains(&name.as_str()), "unknown rule `{name}`");
        }
        Ok(config)
    }

    /// Every built-in rule at `error` with default options, except
    /// `padded_blocks`, whose default pads every block.
    #[must_use]
    pub fn recommended() -> Self {
        Self {
            rules: rules::NAMES
                .iter()
                .filter(|&&name| name != "padded_blocks")
                .map(|&name| (name.to_string(), RuleSetting::Level(Severity::Error)))
                .collect(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn short_and_detailed_settings() {
        let config = Config::from_toml_str(
            r#"
max_passes = 3

[rules]
eol_last = "warn"
padded_blocks = { level = "error", options = "never" }
comma_spacing = { skip_messages = ["unexpected"] }
"#,
        )
        .unwrap();
        assert_eq!(config.max_passes, 3);
        assert_eq!(config.tab_width, 4);
        assert_eq!(config.rules["eol_last"], RuleSetting::Level(Severity::Warn));
        let padded = &config.rules["padded_blocks"];
        assert_eq!(padded.level(), Severity::Error);
        assert_eq!(padded.options().and_then(toml::Value::as_str), Some("never"));
        let comma = &config.rules["comma_spacing"];
        assert_eq!(comma.level(), Severity::Error);
        assert_eq!(comma.skip_messages(), ["unexpected"]);
    }

    #[test]
    fn rejects_unknown_rules_and_keys() {
        assert!(Config::from_toml_str("[rules]\nno_such_rule = \"error\"").is_err());
        assert!(Config::from_toml_str("passes = 2").is_err());
    }

    #[test]
    fn recommended_skips_padded_blocks() {
        let config = Config::recommended();
        assert_eq!(config.rules.len(), rules::NAMES.len() - 1);
        assert!(!config.rules.contains_key("padded_blocks"));
    }
}
