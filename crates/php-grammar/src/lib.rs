pub mod component;
pub mod dsl;
pub mod table;

mod assemble;
mod expr;
mod stmt;
mod string;
mod term;
mod types;

pub use component::{Assembler, Build, Component, CustomMatcher, RuleDef, RuleMatcher};
pub use table::{Grammar, GrammarBuilder, GrammarError, ROOT_RULE};

/// PHP identifier pattern. PHP treats every byte >= 0x80 as an
/// identifier character; on `str` input that maps to any non-ASCII char.
pub(crate) const IDENT: &str = "[A-Za-z_\\x{80}-\\x{10FFFF}][0-9A-Za-z_\\x{80}-\\x{10FFFF}]*";

/// A possibly-qualified name: `Foo`, `Foo\Bar`, `\Foo\Bar`.
pub(crate) fn path_pattern() -> String {
    format!("\\\\?{IDENT}(?:\\\\{IDENT})*")
}

/// The complete built-in PHP grammar, ready for caller overrides before
/// being built into an immutable table.
pub fn builtin() -> GrammarBuilder {
    let mut builder = GrammarBuilder::new();
    stmt::register(&mut builder);
    expr::register(&mut builder);
    term::register(&mut builder);
    string::register(&mut builder);
    types::register(&mut builder);
    builder
}

/// The alternatives of `N_NAMESPACE_SCOPED_STATEMENT` in declaration
/// order. Exposed so grammar extensions can re-compose the alternation
/// around their own statement rules.
pub fn scoped_statement_rules() -> Vec<&'static str> {
    stmt::SCOPED_STATEMENTS.to_vec()
}
