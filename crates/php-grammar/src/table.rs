use std::collections::HashMap;

use thiserror::Error;

use crate::component::{Component, RuleDef};

/// Name of the rule every parse starts from.
pub const ROOT_RULE: &str = "N_PROGRAM";

/// Configuration-time grammar errors. These are fatal and surface from
/// construction, never from a parse call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GrammarError {
    #[error("rule `{referenced}` is referenced by `{by}` but never defined")]
    UndefinedRule { referenced: String, by: String },

    #[error("grammar has no root rule `{ROOT_RULE}`")]
    MissingRoot,
}

/// A fully resolved, immutable rule table. Built once per parser
/// configuration and shared read-only across parse calls (and threads).
#[derive(Debug)]
pub struct Grammar {
    rules: HashMap<String, RuleDef>,
}

impl Grammar {
    pub fn rule(&self, name: &str) -> Option<&RuleDef> {
        self.rules.get(name)
    }

    /// Lookup that treats absence as a programming error: validation
    /// guarantees every reference resolves, so a miss here means the
    /// engine was handed a name outside the table.
    pub fn expect_rule(&self, name: &str) -> &RuleDef {
        self.rules
            .get(name)
            .unwrap_or_else(|| panic!("rule `{name}` is not defined in this grammar"))
    }

    pub fn has_rule(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Accumulates rule definitions, last definition of a name winning, then
/// validates into a [`Grammar`]. Overriding replaces a rule wholly; there
/// is no partial merge of components.
#[derive(Debug, Default)]
pub struct GrammarBuilder {
    rules: HashMap<String, RuleDef>,
}

impl GrammarBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: impl Into<String>, def: RuleDef) -> &mut Self {
        self.rules.insert(name.into(), def);
        self
    }

    /// Merge caller-supplied definitions over the current set.
    pub fn extend(&mut self, rules: impl IntoIterator<Item = (String, RuleDef)>) -> &mut Self {
        for (name, def) in rules {
            self.rules.insert(name, def);
        }
        self
    }

    pub fn build(self) -> Result<Grammar, GrammarError> {
        if !self.rules.contains_key(ROOT_RULE) {
            return Err(GrammarError::MissingRoot);
        }
        for (name, def) in &self.rules {
            check_refs(&def.component, name, &self.rules)?;
        }
        Ok(Grammar { rules: self.rules })
    }
}

fn check_refs(
    component: &Component,
    rule: &str,
    rules: &HashMap<String, RuleDef>,
) -> Result<(), GrammarError> {
    match component {
        Component::Rule(name) => {
            if rules.contains_key(name) {
                Ok(())
            } else {
                Err(GrammarError::UndefinedRule {
                    referenced: name.clone(),
                    by: rule.to_string(),
                })
            }
        }
        Component::Capture { inner, .. }
        | Component::Optional(inner)
        | Component::ZeroOrMore(inner)
        | Component::OneOrMore(inner)
        | Component::Peek(inner) => check_refs(inner, rule, rules),
        Component::Sequence(items) | Component::OneOf(items) => {
            items.iter().try_for_each(|c| check_refs(c, rule, rules))
        }
        Component::Literal(_) | Component::Regex { .. } | Component::Custom(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::{cap, lit, r, seq};

    fn root_def() -> RuleDef {
        RuleDef::node(seq(vec![cap("statements", lit("x"))]))
    }

    #[test]
    fn test_build_requires_root() {
        let mut builder = GrammarBuilder::new();
        builder.define("N_OTHER", RuleDef::matching(lit("y")));
        assert_eq!(builder.build().unwrap_err(), GrammarError::MissingRoot);
    }

    #[test]
    fn test_build_rejects_dangling_reference() {
        let mut builder = GrammarBuilder::new();
        builder.define(ROOT_RULE, RuleDef::matching(r("N_MISSING")));
        let err = builder.build().unwrap_err();
        assert_eq!(
            err,
            GrammarError::UndefinedRule {
                referenced: "N_MISSING".to_string(),
                by: ROOT_RULE.to_string(),
            }
        );
    }

    #[test]
    fn test_later_definition_replaces_earlier() {
        let mut builder = GrammarBuilder::new();
        builder.define(ROOT_RULE, RuleDef::matching(r("N_GONE")));
        builder.define(ROOT_RULE, root_def());
        let grammar = builder.build().unwrap();
        assert_eq!(grammar.len(), 1);
        assert!(grammar.has_rule(ROOT_RULE));
    }

    #[test]
    fn test_extend_overrides() {
        let mut builder = GrammarBuilder::new();
        builder.define(ROOT_RULE, root_def());
        builder.define("N_LEAF", RuleDef::matching(lit("a")));
        builder.extend(vec![("N_LEAF".to_string(), RuleDef::matching(lit("b")))]);
        let grammar = builder.build().unwrap();
        match &grammar.expect_rule("N_LEAF").component {
            Component::Literal(text) => assert_eq!(text, "b"),
            other => panic!("unexpected component: {other:?}"),
        }
    }

    #[test]
    #[should_panic(expected = "not defined")]
    fn test_expect_rule_panics_on_unknown_name() {
        let mut builder = GrammarBuilder::new();
        builder.define(ROOT_RULE, root_def());
        let grammar = builder.build().unwrap();
        grammar.expect_rule("N_NOWHERE");
    }
}
