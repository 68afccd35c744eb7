use crate::diagnostic::{Diagnostic, Severity, interpolate};
use crate::engine::{
    EngineError, Fix, Fixer, IntoEdits, Edit, SourceBuffer, SourceCode, SourceLocation, Span,
    Spanned, TextMeasure, TokenStore,
};

use super::RuleMeta;

type FixFn<'f> = Box<dyn FnOnce(&Fixer<'_>) -> Vec<Edit> + 'f>;

/// One problem as a rule describes it, before it is resolved into a
/// [`Diagnostic`].
pub struct Report<'f> {
    span: Span,
    loc: Option<SourceLocation>,
    message_id: &'static str,
    data: Vec<(&'static str, String)>,
    fix: Option<FixFn<'f>>,
}

impl<'f> Report<'f> {
    pub fn new(anchor: impl Spanned, message_id: &'static str) -> Self {
        Self {
            span: anchor.span(),
            loc: None,
            message_id,
            data: Vec::new(),
            fix: None,
        }
    }

    #[must_use]
    pub fn data(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.data.push((key, value.into()));
        self
    }

    /// Overrides the location derived from the anchor.
    #[must_use]
    pub const fn with_loc(mut self, loc: SourceLocation) -> Self {
        self.loc = Some(loc);
        self
    }

    #[must_use]
    pub fn fix<E, F>(mut self, f: F) -> Self
    where
        E: IntoEdits,
        F: FnOnce(&Fixer<'_>) -> E + 'f,
    {
        self.fix = Some(Box::new(move |fixer| f(fixer).into_edits()));
        self
    }
}

/// What a rule callback sees: the file, its own metadata and a sink for
/// problems.
pub struct RuleContext<'a> {
    source: &'a SourceCode,
    meta: &'a RuleMeta,
    severity: Severity,
    measure: &'a TextMeasure,
    problems: &'a mut Vec<Diagnostic>,
}

impl<'a> RuleContext<'a> {
    pub fn new(
        source: &'a SourceCode,
        meta: &'a RuleMeta,
        severity: Severity,
        measure: &'a TextMeasure,
        problems: &'a mut Vec<Diagnostic>,
    ) -> Self {
        Self {
            source,
            meta,
            severity,
            measure,
            problems,
        }
    }

    #[must_use]
    pub const fn source(&self) -> &'a SourceCode {
        self.source
    }

    #[must_use]
    pub const fn tokens(&self) -> &'a TokenStore {
        self.source.tokens()
    }

    #[must_use]
    pub const fn buffer(&self) -> &'a SourceBuffer {
        self.source.buffer()
    }

    #[must_use]
    pub const fn measure(&self) -> &'a TextMeasure {
        self.measure
    }

    #[must_use]
    pub const fn rule_name(&self) -> &'static str {
        self.meta.name
    }

    /// Resolves the message, runs the fix closure and records the problem.
    pub fn report(&mut self, report: Report<'_>) -> Result<(), EngineError> {
        let template =
            self.meta
                .message(report.message_id)
                .ok_or_else(|| EngineError::UnknownMessageId {
                    rule: self.meta.name.to_string(),
                    id: report.message_id.to_string(),
                })?;
        let message = interpolate(template, &report.data);

        let buffer = self.source.buffer();
        let fix = match report.fix {
            Some(_) if !self.meta.fixable => {
                return Err(EngineError::FixNotDeclared {
                    rule: self.meta.name.to_string(),
                });
            }
            Some(f) => Fix::from_edits(buffer, f(&Fixer::new(buffer)))?,
            None => None,
        };
        let loc = match report.loc {
            Some(loc) => loc,
            None => buffer.location_of(report.span)?,
        };

        self.problems.push(Diagnostic {
            rule: Some(self.meta.name.to_string()),
            message_id: Some(report.message_id.to_string()),
            message,
            severity: self.severity,
            span: report.span,
            loc,
            fix,
            fatal: false,
        });
        Ok(())
    }

    pub(crate) fn mark(&self) -> usize {
        self.problems.len()
    }

    /// Drops problems reported after `mark` that fail `keep`.
    pub(crate) fn retain_since(&mut self, mark: usize, keep: impl Fn(&Diagnostic) -> bool) {
        let mut i = mark;
        while i < self.problems.len() {
            if keep(&self.problems[i]) {
                i += 1;
            } else {
                self.problems.remove(i);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{JsParser, SourceParser};

    const META: RuleMeta = RuleMeta {
        name: "demo",
        description: "test rule",
        fixable: true,
        messages: &[("gap", "Gap before {{what}}.")],
    };

    #[test]
    fn report_resolves_messages_and_fixes() {
        let src = JsParser::new().parse("a ;").unwrap();
        let measure = TextMeasure::default();
        let mut problems = Vec::new();
        let mut cx = RuleContext::new(&src, &META, Severity::Warn, &measure, &mut problems);
        let semi = &cx.tokens().tokens()[1];
        cx.report(
            Report::new(semi, "gap")
                .data("what", "';'")
                .fix(|f| f.remove_range(Span::new(1, 2))),
        )
        .unwrap();
        let err = cx.report(Report::new(semi, "nope")).unwrap_err();
        assert!(matches!(err, EngineError::UnknownMessageId { .. }));

        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].message, "Gap before ';'.");
        assert_eq!(problems[0].severity, Severity::Warn);
        assert_eq!(problems[0].fix.as_ref().unwrap().span, Span::new(1, 2));
        assert_eq!(problems[0].loc.start.column, 2);
    }

    #[test]
    fn fixes_require_a_fixable_rule() {
        let meta = RuleMeta {
            fixable: false,
            ..META
        };
        let src = JsParser::new().parse("a;").unwrap();
        let measure = TextMeasure::default();
        let mut problems = Vec::new();
        let mut cx = RuleContext::new(&src, &meta, Severity::Error, &measure, &mut problems);
        let err = cx
            .report(Report::new(Span::at(0), "gap").fix(|f| f.insert_text_before_range(Span::at(0), " ")))
            .unwrap_err();
        assert_eq!(err, EngineError::FixNotDeclared { rule: "demo".into() });
        assert!(problems.is_empty());
    }
}
