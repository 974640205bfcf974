//! The matching engine: interprets a [`Grammar`]'s component trees
//! against a cursor. Matching is ordered and backtracking; `None` is the
//! universal mismatch signal and every failure rewinds the cursor to
//! where the attempt began.

use php_cursor::{Cursor, Mode};
use php_grammar::{Build, Component, Grammar, RuleMatcher};
use php_node::{Node, Value};

pub struct Matcher<'g> {
    grammar: &'g Grammar,
}

impl<'g> Matcher<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self { grammar }
    }

    fn component(&self, c: &Component, rule: &str, cur: &mut Cursor<'_>) -> Option<Value> {
        match c {
            Component::Rule(name) => self.apply(name, cur),
            Component::Literal(text) => {
                if cur.mode() == Mode::Php {
                    cur.skip_ignorable();
                }
                if cur.match_literal(text) {
                    Some(Value::Str(text.clone()))
                } else {
                    cur.note_failure(rule);
                    None
                }
            }
            Component::Regex { re, group } => {
                if cur.mode() == Mode::Php {
                    cur.skip_ignorable();
                }
                match cur.match_regex(re, *group) {
                    Some(text) => Some(Value::Str(text)),
                    None => {
                        cur.note_failure(rule);
                        None
                    }
                }
            }
            Component::Capture { name, inner } => {
                let value = self.component(inner, rule, cur)?;
                Some(Value::Node(Node::fragment().with(name.clone(), value)))
            }
            Component::Sequence(items) => self.sequence(items, rule, cur),
            Component::OneOf(items) => {
                let cp = cur.mark();
                for item in items {
                    if let Some(value) = self.component(item, rule, cur) {
                        return Some(value);
                    }
                    cur.rewind(cp);
                }
                None
            }
            Component::Optional(inner) => {
                let cp = cur.mark();
                match self.component(inner, rule, cur) {
                    Some(value) => Some(value),
                    None => {
                        cur.rewind(cp);
                        Some(Value::Null)
                    }
                }
            }
            Component::ZeroOrMore(inner) => Some(Value::List(self.repeat(inner, rule, cur))),
            Component::OneOrMore(inner) => {
                let items = self.repeat(inner, rule, cur);
                if items.is_empty() {
                    None
                } else {
                    Some(Value::List(items))
                }
            }
            Component::Peek(inner) => {
                let cp = cur.mark();
                let matched = self.component(inner, rule, cur);
                cur.rewind(cp);
                matched.map(|_| Value::Null)
            }
            Component::Custom(f) => {
                let cp = cur.mark();
                match f(cur, self) {
                    Some(value) => Some(value),
                    None => {
                        cur.rewind(cp);
                        None
                    }
                }
            }
        }
    }

    /// Named captures become fields of one fragment, in source order. A
    /// sequence without captures yields its last component's value.
    fn sequence(&self, items: &[Component], rule: &str, cur: &mut Cursor<'_>) -> Option<Value> {
        let cp = cur.mark();
        let mut fields: Option<Node> = None;
        let mut last = Value::Null;
        for item in items {
            if let Component::Capture { name, inner } = item {
                match self.component(inner, rule, cur) {
                    Some(value) => {
                        fields
                            .get_or_insert_with(Node::fragment)
                            .set(name.clone(), value);
                    }
                    None => {
                        cur.rewind(cp);
                        return None;
                    }
                }
            } else {
                match self.component(item, rule, cur) {
                    Some(value) => last = value,
                    None => {
                        cur.rewind(cp);
                        return None;
                    }
                }
            }
        }
        match fields {
            Some(frag) => Some(Value::Node(frag)),
            None => Some(last),
        }
    }

    fn repeat(&self, inner: &Component, rule: &str, cur: &mut Cursor<'_>) -> Vec<Value> {
        let mut items = Vec::new();
        loop {
            let before = cur.pos();
            let cp = cur.mark();
            match self.component(inner, rule, cur) {
                // zero-width repetition would never terminate
                Some(_) if cur.pos() == before => {
                    cur.rewind(cp);
                    break;
                }
                Some(value) => items.push(value),
                None => {
                    cur.rewind(cp);
                    break;
                }
            }
        }
        items
    }
}

fn tag(raw: Value, kind: &str) -> Value {
    match raw {
        Value::Node(node) => Value::Node(node.into_kind(kind)),
        _ => Value::Node(Node::new(kind)),
    }
}

impl RuleMatcher for Matcher<'_> {
    fn apply(&self, rule: &str, cur: &mut Cursor<'_>) -> Option<Value> {
        if !cur.enter() {
            return None;
        }
        let def = self.grammar.expect_rule(rule);
        let cp = cur.mark();
        let result = self
            .component(&def.component, rule, cur)
            .and_then(|raw| match &def.build {
                Build::Passthrough => Some(raw),
                Build::SelfNode => Some(tag(raw, rule)),
                Build::NodeAs(kind) => Some(tag(raw, kind)),
                Build::Assemble(f) => f(raw),
            });
        if result.is_none() {
            cur.rewind(cp);
        }
        cur.exit();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use php_grammar::dsl::{cap, lit, one_of, opt, r, re, seq, star};
    use php_grammar::{GrammarBuilder, RuleDef, ROOT_RULE};

    fn grammar(extra: Vec<(&str, RuleDef)>) -> Grammar {
        let mut builder = GrammarBuilder::new();
        builder.define(
            ROOT_RULE,
            RuleDef::node(seq(vec![cap("items", star(r("N_WORD")))])),
        );
        builder.define(
            "N_WORD",
            RuleDef::node(seq(vec![cap("word", re("[a-z]+"))])),
        );
        for (name, def) in extra {
            builder.define(name, def);
        }
        builder.build().expect("test grammar builds")
    }

    fn php_cursor(src: &str) -> Cursor<'_> {
        let mut cur = Cursor::new(src);
        cur.set_mode(Mode::Php);
        cur
    }

    #[test]
    fn test_sequence_without_captures_yields_last_value() {
        let g = grammar(vec![("N_PAIR", RuleDef::matching(seq(vec![lit("a"), lit("b")])))]);
        let m = Matcher::new(&g);
        let mut cur = php_cursor("a b");
        assert_eq!(m.apply("N_PAIR", &mut cur), Some(Value::Str("b".into())));
    }

    #[test]
    fn test_sequence_failure_rewinds_whole_unit() {
        let g = grammar(vec![("N_PAIR", RuleDef::matching(seq(vec![lit("a"), lit("b")])))]);
        let m = Matcher::new(&g);
        let mut cur = php_cursor("a c");
        assert!(m.apply("N_PAIR", &mut cur).is_none());
        assert_eq!(cur.pos(), 0);
    }

    #[test]
    fn test_one_of_is_ordered_first_wins() {
        let g = grammar(vec![(
            "N_CHOICE",
            RuleDef::matching(one_of(vec![re("ab"), re("abc")])),
        )]);
        let m = Matcher::new(&g);
        let mut cur = php_cursor("abc");
        assert_eq!(m.apply("N_CHOICE", &mut cur), Some(Value::Str("ab".into())));
        assert!(cur.starts_with("c"));
    }

    #[test]
    fn test_optional_mismatch_yields_null_without_consuming() {
        let g = grammar(vec![(
            "N_MAYBE",
            RuleDef::matching(seq(vec![lit("x"), cap("tail", opt(lit("y")))])),
        )]);
        let m = Matcher::new(&g);
        let mut cur = php_cursor("xz");
        let raw = m.apply("N_MAYBE", &mut cur).unwrap();
        assert_eq!(raw.into_node().unwrap().take("tail"), Some(Value::Null));
        assert!(cur.starts_with("z"));
    }

    #[test]
    fn test_terminals_skip_comments_in_php_mode() {
        let g = grammar(vec![]);
        let m = Matcher::new(&g);
        let mut cur = php_cursor("  /* noise */ abc // more\n def");
        let value = m.apply(ROOT_RULE, &mut cur).unwrap();
        let items = value
            .into_node()
            .unwrap()
            .take("items")
            .unwrap()
            .into_list();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_failed_alternative_still_reports_deepest_failure() {
        let g = grammar(vec![(
            "N_CALL",
            RuleDef::matching(seq(vec![lit("f"), lit("("), lit(")")])),
        )]);
        let m = Matcher::new(&g);
        let mut cur = php_cursor("f(!");
        assert!(m.apply("N_CALL", &mut cur).is_none());
        assert_eq!(cur.pos(), 0);
        assert_eq!(cur.furthest().offset, 2);
        assert!(cur.furthest().expected.contains("N_CALL"));
    }

    #[test]
    fn test_self_node_build_tags_fragment() {
        let g = grammar(vec![]);
        let m = Matcher::new(&g);
        let mut cur = php_cursor("hi");
        let value = m.apply("N_WORD", &mut cur).unwrap();
        assert!(value.as_node().unwrap().is_kind("N_WORD"));
    }

    #[test]
    fn test_repeat_stops_on_zero_width_match() {
        let g = grammar(vec![(
            "N_LOOP",
            RuleDef::matching(star(opt(lit("q")))),
        )]);
        let m = Matcher::new(&g);
        let mut cur = php_cursor("zzz");
        // opt always succeeds without consuming; the guard must break out
        assert_eq!(m.apply("N_LOOP", &mut cur), Some(Value::List(vec![])));
    }
}
