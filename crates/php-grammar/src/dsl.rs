//! Terse constructors for grammar components. The built-in PHP grammar
//! is written almost entirely in terms of these.

use std::sync::Arc;

use php_cursor::Cursor;
use php_node::Value;
use regex::Regex;

use crate::component::{Component, RuleMatcher};

/// Reference to a named rule.
pub fn r(name: &str) -> Component {
    Component::Rule(name.to_string())
}

pub fn lit(text: &str) -> Component {
    Component::Literal(text.to_string())
}

fn compile(pattern: &str) -> Regex {
    // Grammar terminals are static strings; a malformed one is a bug in
    // the rule table, not a runtime condition.
    Regex::new(&format!("^(?:{pattern})"))
        .unwrap_or_else(|e| panic!("invalid terminal pattern {pattern:?}: {e}"))
}

/// Anchored regex terminal yielding the whole match.
pub fn re(pattern: &str) -> Component {
    Component::Regex {
        re: compile(pattern),
        group: 0,
    }
}

/// Anchored regex terminal yielding capture group `group`.
pub fn re_cap(pattern: &str, group: usize) -> Component {
    Component::Regex {
        re: compile(pattern),
        group,
    }
}

/// Case-insensitive keyword with a word boundary, as PHP keywords are.
pub fn kw(word: &str) -> Component {
    re(&format!("(?i:{word})\\b"))
}

pub fn cap(name: &str, inner: Component) -> Component {
    Component::Capture {
        name: name.to_string(),
        inner: Box::new(inner),
    }
}

pub fn seq(items: Vec<Component>) -> Component {
    Component::Sequence(items)
}

pub fn one_of(items: Vec<Component>) -> Component {
    Component::OneOf(items)
}

pub fn opt(inner: Component) -> Component {
    Component::Optional(Box::new(inner))
}

pub fn star(inner: Component) -> Component {
    Component::ZeroOrMore(Box::new(inner))
}

pub fn plus(inner: Component) -> Component {
    Component::OneOrMore(Box::new(inner))
}

pub fn peek(inner: Component) -> Component {
    Component::Peek(Box::new(inner))
}

pub fn custom(
    f: impl Fn(&mut Cursor<'_>, &dyn RuleMatcher) -> Option<Value> + Send + Sync + 'static,
) -> Component {
    Component::Custom(Arc::new(f))
}

/// `item ("," item)*` capturing a flat `first`/`rest` fragment; pair with
/// an assembler that calls [`crate::assemble::flatten_list`].
pub fn comma_list(item: Component) -> Component {
    seq(vec![
        cap("first", item.clone()),
        cap("rest", star(seq(vec![lit(","), cap("item", item)]))),
    ])
}

/// Statement terminator: `;`, or an unconsumed `?>` close tag which PHP
/// treats as an implicit semicolon.
pub fn end_of_statement() -> Component {
    one_of(vec![lit(";"), peek(lit("?>"))])
}
