#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![warn(clippy::nursery)]

pub mod config;
pub mod diagnostic;
pub mod engine;
pub mod grammar;
pub mod linter;
pub mod render;
pub mod rules;

use anyhow::Result;

pub use config::Config;
pub use diagnostic::{Diagnostic, Severity, ToolingError};
pub use linter::{FixOutcome, Linter, LinterOptions, Verification};

/// Lints `src` with `config`.
pub fn lint_source(src: &str, config: &Config) -> Result<Verification> {
    Ok(Linter::from_config(grammar::JsParser::new(), config)?.verify(src))
}

/// Fixes `src` with `config` and returns the resulting text.
pub fn fix_source(src: &str, config: &Config) -> Result<String> {
    Ok(Linter::from_config(grammar::JsParser::new(), config)?
        .verify_and_fix(src)
        .output)
}
