//! A data-driven PHP parser. The grammar is a table of named rules over
//! a small component algebra; parsing interprets that table with ordered
//! alternation and backtracking and produces dynamically shaped AST
//! nodes tagged with `name` kinds (`N_PROGRAM`, `N_VARIABLE`, ...).
//!
//! ```
//! let ast = php_parse::parse("<?php return $a + 1;").unwrap();
//! assert_eq!(ast.kind(), Some("N_PROGRAM"));
//! ```
//!
//! Callers can override or extend the grammar per parser instance:
//!
//! ```
//! use php_parse::{Parser, ParserConfig, RuleDef};
//! use php_parse::dsl::{cap, kw, seq};
//!
//! let mut config = ParserConfig::default();
//! config.rules.push((
//!     "N_EXIT".to_string(),
//!     RuleDef::node(seq(vec![kw("exit"), cap("bare", kw("now"))])),
//! ));
//! let parser = Parser::with_config(config).unwrap();
//! assert!(parser.parse("<?php exit now;").is_ok());
//! ```

pub mod diagnostics;
pub mod matcher;

use std::sync::Arc;

use lazy_static::lazy_static;
use php_cursor::Cursor;
use php_grammar::Grammar;

pub use diagnostics::ParseError;
pub use php_cursor::{Mode, MAX_DEPTH};
pub use php_grammar::{
    builtin, dsl, scoped_statement_rules, Build, Component, GrammarBuilder, GrammarError, RuleDef,
    RuleMatcher, ROOT_RULE,
};
pub use php_node::{Node, Value};

lazy_static! {
    // Built once and shared by every default parser; the table is
    // immutable after construction.
    static ref BASE_GRAMMAR: Arc<Grammar> = Arc::new(
        builtin()
            .build()
            .expect("built-in grammar is closed over its rule references"),
    );
}

/// Grammar overrides applied on top of the built-in rule table. A rule
/// with an existing name replaces it wholly; a new name adds a rule that
/// becomes reachable once something references it.
#[derive(Default)]
pub struct ParserConfig {
    pub rules: Vec<(String, RuleDef)>,
}

pub struct Parser {
    grammar: Arc<Grammar>,
}

impl Parser {
    /// Parser over the unmodified built-in PHP grammar.
    pub fn new() -> Self {
        Self {
            grammar: Arc::clone(&BASE_GRAMMAR),
        }
    }

    pub fn with_config(config: ParserConfig) -> Result<Self, GrammarError> {
        if config.rules.is_empty() {
            return Ok(Self::new());
        }
        let mut builder = builtin();
        builder.extend(config.rules);
        Ok(Self {
            grammar: Arc::new(builder.build()?),
        })
    }

    /// Parse one source text into an `N_PROGRAM` node. The same parser
    /// can be reused across calls and shared across threads.
    pub fn parse(&self, source: &str) -> Result<Node, ParseError> {
        let mut cur = Cursor::new(source);
        let m = matcher::Matcher::new(&self.grammar);
        match m.apply(ROOT_RULE, &mut cur) {
            Some(Value::Node(node)) => Ok(node),
            _ => {
                if cur.depth_exceeded() {
                    Err(ParseError::too_deep(source, cur.furthest().offset))
                } else {
                    Err(ParseError::syntax(source, cur.furthest()))
                }
            }
        }
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot parse with the built-in grammar.
pub fn parse(source: &str) -> Result<Node, ParseError> {
    Parser::new().parse(source)
}
