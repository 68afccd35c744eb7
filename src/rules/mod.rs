use anyhow::{Result, bail};

use crate::engine::Node;

pub mod context;
pub mod filtered;
pub mod selector;
pub mod shape;

mod comma_dangle;
mod comma_spacing;
mod eol_last;
mod key_spacing;
mod keyword_spacing;
mod no_multi_spaces;
mod no_trailing_spaces;
mod padded_blocks;
mod semi_spacing;
mod space_infix_ops;
mod spaced_comment;

pub use comma_dangle::{CommaDangle, Dangle, PerContext};
pub use comma_spacing::CommaSpacing;
pub use context::{Report, RuleContext};
pub use eol_last::EolLast;
pub use filtered::Filtered;
pub use key_spacing::{Align, KeySpacing, Mode};
pub use keyword_spacing::{KeywordSpacing, Override};
pub use no_multi_spaces::NoMultiSpaces;
pub use no_trailing_spaces::NoTrailingSpaces;
pub use padded_blocks::{PaddedBlocks, Padding};
pub use selector::{Selector, SelectorError};
pub use semi_spacing::SemiSpacing;
pub use space_infix_ops::SpaceInfixOps;
pub use spaced_comment::{SpacedComment, Spacing};

/// Static description of a rule.
#[derive(Clone, Copy, Debug)]
pub struct RuleMeta {
    pub name: &'static str,
    pub description: &'static str,
    pub fixable: bool,
    /// `(message id, template)`; templates use `{{name}}` placeholders.
    pub messages: &'static [(&'static str, &'static str)],
}

impl RuleMeta {
    #[must_use]
    pub fn message(&self, id: &str) -> Option<&'static str> {
        self.messages
            .iter()
            .find(|(k, _)| *k == id)
            .map(|&(_, template)| template)
    }
}

pub trait Rule: Send + Sync {
    fn meta(&self) -> &RuleMeta;

    /// Fresh listeners for one file pass.
    fn create(&self) -> Visitor<'_>;
}

pub type Listener<'r> = Box<dyn for<'a> FnMut(Node<'a>, &mut RuleContext<'a>) -> Result<()> + 'r>;

/// Boxes a callback as a [`Listener`].
pub fn listener<'r, F>(f: F) -> Listener<'r>
where
    F: for<'a> FnMut(Node<'a>, &mut RuleContext<'a>) -> Result<()> + 'r,
{
    Box::new(f)
}

/// The selector-to-callback table a rule hands out for one file.
#[derive(Default)]
pub struct Visitor<'r> {
    listeners: Vec<(&'static str, Listener<'r>)>,
}

impl<'r> Visitor<'r> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on<F>(mut self, selector: &'static str, f: F) -> Self
    where
        F: for<'a> FnMut(Node<'a>, &mut RuleContext<'a>) -> Result<()> + 'r,
    {
        self.listeners.push((selector, listener(f)));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn selectors(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.listeners.iter().map(|(s, _)| *s)
    }

    /// Rewraps every listener; used by composing rules.
    #[must_use]
    pub fn map(self, mut f: impl FnMut(Listener<'r>) -> Listener<'r>) -> Self {
        Self {
            listeners: self
                .listeners
                .into_iter()
                .map(|(s, l)| (s, f(l)))
                .collect(),
        }
    }

    pub(crate) fn into_listeners(self) -> Vec<(&'static str, Listener<'r>)> {
        self.listeners
    }
}

/// Names accepted by [`create`], in registry order.
pub const NAMES: &[&str] = &[
    "comma_dangle",
    "comma_spacing",
    "eol_last",
    "key_spacing",
    "keyword_spacing",
    "no_multi_spaces",
    "no_trailing_spaces",
    "padded_blocks",
    "semi_spacing",
    "space_infix_ops",
    "spaced_comment",
];

/// Builds a built-in rule from its configured options.
pub fn create(name: &str, options: Option<&toml::Value>) -> Result<Box<dyn Rule>> {
    Ok(match name {
        "comma_dangle" => Box::new(CommaDangle::from_options(options)?),
        "comma_spacing" => Box::new(CommaSpacing::from_options(options)?),
        "eol_last" => Box::new(EolLast::from_options(options)?),
        "key_spacing" => Box::new(KeySpacing::from_options(options)?),
        "keyword_spacing" => Box::new(KeywordSpacing::from_options(options)?),
        "no_multi_spaces" => Box::new(NoMultiSpaces::from_options(options)?),
        "no_trailing_spaces" => Box::new(NoTrailingSpaces::from_options(options)?),
        "padded_blocks" => Box::new(PaddedBlocks::from_options(options)?),
        "semi_spacing" => Box::new(SemiSpacing::from_options(options)?),
        "space_infix_ops" => Box::new(SpaceInfixOps::from_options(options)?),
        "spaced_comment" => Box::new(SpacedComment::from_options(options)?),
        _ => bail!("unknown rule `{name}`"),
    })
}

/// Deserializes a rule's option value, falling back to `T::default()`.
pub(crate) fn parse_options<T>(rule: &str, options: Option<&toml::Value>) -> Result<T>
where
    T: serde::de::DeserializeOwned + Default,
{
    use anyhow::Context as _;
    options.map_or_else(
        || Ok(T::default()),
        |v| {
            v.clone()
                .try_into()
                .with_context(|| format!("invalid options for `{rule}`"))
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_name_builds_with_defaults() {
        for name in NAMES {
            let rule = create(name, None).unwrap();
            assert_eq!(rule.meta().name, *name);
            assert!(!rule.create().is_empty());
        }
        assert!(create("no_such_rule", None).is_err());
    }
}
