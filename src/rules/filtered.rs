use std::collections::BTreeSet;
use std::sync::Arc;

use super::{Rule, RuleMeta, Visitor, listener};

/// Wraps another rule and drops the problems it reports under the listed
/// message ids. The inner listeners run unchanged.
pub struct Filtered {
    inner: Box<dyn Rule>,
    skip: Arc<BTreeSet<String>>,
}

impl Filtered {
    pub fn new(inner: Box<dyn Rule>, skip_messages: impl IntoIterator<Item = String>) -> Self {
        Self {
            inner,
            skip: Arc::new(skip_messages.into_iter().collect()),
        }
    }

    #[must_use]
    pub fn inner(&self) -> &dyn Rule {
        self.inner.as_ref()
    }
}

impl Rule for Filtered {
    fn meta(&self) -> &RuleMeta {
        self.inner.meta()
    }

    fn create(&self) -> Visitor<'_> {
        self.inner.create().map(|mut inner| {
            let skip = Arc::clone(&self.skip);
            listener(move |node, cx| {
                let mark = cx.mark();
                inner(node, cx)?;
                cx.retain_since(mark, |d| {
                    d.message_id.as_ref().is_none_or(|id| !skip.contains(id))
                });
                Ok(())
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::JsParser;
    use crate::linter::Linter;
    use crate::rules::CommaSpacing;
    use crate::Severity;

    #[test]
    fn drops_only_listed_messages() {
        let mut linter = Linter::new(JsParser::new());
        let rule = Filtered::new(Box::new(CommaSpacing::default()), ["unexpected".to_string()]);
        linter.register(Box::new(rule), Severity::Error).unwrap();
        let verdict = linter.verify("f(a ,b);");
        let ids: Vec<_> = verdict
            .diagnostics
            .iter()
            .filter_map(|d| d.message_id.as_deref())
            .collect();
        assert_eq!(ids, ["missing"]);
    }
}
