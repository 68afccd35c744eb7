use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::engine::{Fix, SourceLocation, Span};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Off,
    Warn,
    #[default]
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Off => "off",
            Self::Warn => "warning",
            Self::Error => "error",
        })
    }
}

/// One reported problem. `rule` and `message_id` are `None` for fatal parse
/// errors, which carry no fix.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub rule: Option<String>,
    pub message_id: Option<String>,
    pub message: String,
    pub severity: Severity,
    pub span: Span,
    pub loc: SourceLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<Fix>,
    pub fatal: bool,
}

impl Diagnostic {
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }

    #[must_use]
    pub fn has_message_id(&self, id: &str) -> bool {
        self.message_id.as_deref() == Some(id)
    }
}

/// A rule (or the file itself) failed to run. Never a lint finding.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ToolingError {
    pub path: Option<PathBuf>,
    pub rule: Option<String>,
    pub message: String,
}

impl fmt::Display for ToolingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "{}: ", path.display())?;
        }
        if let Some(rule) = &self.rule {
            write!(f, "rule `{rule}` failed: ")?;
        }
        f.write_str(&self.message)
    }
}

/// Fills `{{name}}` placeholders from `data`; unknown names are left as is.
#[must_use]
pub fn interpolate(template: &str, data: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find("{{") {
        let Some(close) = rest[open + 2..].find("}}") else {
            break;
        };
        let key = rest[open + 2..open + 2 + close].trim();
        out.push_str(&rest[..open]);
        match data.iter().find(|(k, _)| *k == key) {
            Some((_, v)) => out.push_str(v),
            None => out.push_str(&rest[open..open + 2 + close + 2]),
        }
        rest = &rest[open + 2 + close + 2..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders() {
        let data = [("loc", "after".to_string())];
        assert_eq!(
            interpolate("A space is required {{ loc }} ','.", &data),
            "A space is required after ','."
        );
        assert_eq!(interpolate("{{missing}} stays", &data), "{{missing}} stays");
        assert_eq!(interpolate("open {{ only", &data), "open {{ only");
    }
}
