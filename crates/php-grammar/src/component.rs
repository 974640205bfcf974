use std::fmt;
use std::sync::Arc;

use php_cursor::Cursor;
use php_node::Value;
use regex::Regex;

/// The seam between grammar data and the matching engine. Custom
/// components and rule assemblers re-enter matching through this trait
/// (e.g. string interpolation re-entering `N_EXPRESSION`).
pub trait RuleMatcher {
    /// Attempt rule `rule` at the cursor. `None` is an ordinary mismatch;
    /// the implementation restores the cursor position on failure.
    fn apply(&self, rule: &str, cur: &mut Cursor<'_>) -> Option<Value>;
}

/// Post-processes a rule's raw captured value into its final node.
/// Returning `None` rejects the match, which backtracks like any other
/// mismatch.
pub type Assembler = Arc<dyn Fn(Value) -> Option<Value> + Send + Sync>;

/// A hand-written matcher for constructs that are painful as declarative
/// components: inline HTML segments, quoted strings, heredocs.
pub type CustomMatcher = Arc<dyn Fn(&mut Cursor<'_>, &dyn RuleMatcher) -> Option<Value> + Send + Sync>;

/// One grammar component. Rules compose these; the engine interprets
/// them against the cursor.
#[derive(Clone)]
pub enum Component {
    /// Reference to a named rule in the table.
    Rule(String),
    /// Exact text.
    Literal(String),
    /// Anchored regex; yields the given capture group.
    Regex { re: Regex, group: usize },
    /// Stores the inner result under `name` in the enclosing sequence.
    Capture { name: String, inner: Box<Component> },
    /// All components in order; fails (and rewinds) as a unit.
    Sequence(Vec<Component>),
    /// Ordered alternation, first success wins.
    OneOf(Vec<Component>),
    /// Matches nothing (yielding `Value::Null`) when the inner fails.
    Optional(Box<Component>),
    ZeroOrMore(Box<Component>),
    OneOrMore(Box<Component>),
    /// Zero-width lookahead: matches the inner component, then rewinds.
    Peek(Box<Component>),
    Custom(CustomMatcher),
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Rule(name) => write!(f, "Rule({name})"),
            Component::Literal(text) => write!(f, "Literal({text:?})"),
            Component::Regex { re, group } => write!(f, "Regex({:?}, group {group})", re.as_str()),
            Component::Capture { name, inner } => write!(f, "Capture({name}, {inner:?})"),
            Component::Sequence(items) => f.debug_tuple("Sequence").field(items).finish(),
            Component::OneOf(items) => f.debug_tuple("OneOf").field(items).finish(),
            Component::Optional(inner) => f.debug_tuple("Optional").field(inner).finish(),
            Component::ZeroOrMore(inner) => f.debug_tuple("ZeroOrMore").field(inner).finish(),
            Component::OneOrMore(inner) => f.debug_tuple("OneOrMore").field(inner).finish(),
            Component::Peek(inner) => f.debug_tuple("Peek").field(inner).finish(),
            Component::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// How a rule turns its raw captured value into its result.
#[derive(Clone)]
pub enum Build {
    /// Hand the raw value through unchanged.
    Passthrough,
    /// Tag the captured fragment with the rule's own name.
    SelfNode,
    /// Tag the captured fragment with an explicit node kind.
    NodeAs(String),
    Assemble(Assembler),
}

impl fmt::Debug for Build {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Build::Passthrough => write!(f, "Passthrough"),
            Build::SelfNode => write!(f, "SelfNode"),
            Build::NodeAs(kind) => write!(f, "NodeAs({kind})"),
            Build::Assemble(_) => write!(f, "Assemble(..)"),
        }
    }
}

/// One named grammar production: its component tree plus the build step.
#[derive(Debug, Clone)]
pub struct RuleDef {
    pub component: Component,
    pub build: Build,
}

impl RuleDef {
    pub fn matching(component: Component) -> Self {
        Self {
            component,
            build: Build::Passthrough,
        }
    }

    pub fn node(component: Component) -> Self {
        Self {
            component,
            build: Build::SelfNode,
        }
    }

    pub fn node_as(kind: impl Into<String>, component: Component) -> Self {
        Self {
            component,
            build: Build::NodeAs(kind.into()),
        }
    }

    pub fn assemble(
        component: Component,
        f: impl Fn(Value) -> Option<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            component,
            build: Build::Assemble(Arc::new(f)),
        }
    }
}
