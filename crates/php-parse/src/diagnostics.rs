use miette::{Diagnostic, SourceSpan};
use php_cursor::{Furthest, MAX_DEPTH};
use thiserror::Error;

/// Runtime parse failures. Grammar configuration problems surface
/// earlier, from [`php_grammar::GrammarError`].
#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    /// The input stopped matching. The offset and expectation set come
    /// from the deepest point any trial match reached, which survives all
    /// backtracking.
    #[error("syntax error at offset {offset}: expected {}", .expected.join(", "))]
    #[diagnostic(code(php_parse::syntax))]
    Syntax {
        offset: usize,
        expected: Vec<String>,
        #[source_code]
        src: String,
        #[label("parsing stopped here")]
        at: SourceSpan,
    },

    #[error("input nests deeper than {MAX_DEPTH} rule levels")]
    #[diagnostic(code(php_parse::too_deep))]
    TooDeep {
        offset: usize,
        #[source_code]
        src: String,
        #[label("deepest point reached")]
        at: SourceSpan,
    },
}

fn span_at(source: &str, offset: usize) -> SourceSpan {
    let offset = offset.min(source.len());
    let len = usize::from(offset < source.len());
    (offset, len).into()
}

impl ParseError {
    pub(crate) fn syntax(source: &str, furthest: &Furthest) -> Self {
        ParseError::Syntax {
            offset: furthest.offset,
            expected: furthest.expected.iter().cloned().collect(),
            src: source.to_string(),
            at: span_at(source, furthest.offset),
        }
    }

    pub(crate) fn too_deep(source: &str, offset: usize) -> Self {
        ParseError::TooDeep {
            offset,
            src: source.to_string(),
            at: span_at(source, offset),
        }
    }

    pub fn offset(&self) -> usize {
        match self {
            ParseError::Syntax { offset, .. } | ParseError::TooDeep { offset, .. } => *offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_syntax_error_lists_expectations_sorted() {
        let furthest = Furthest {
            offset: 3,
            expected: BTreeSet::from(["N_VARIABLE".to_string(), "N_INTEGER".to_string()]),
        };
        let err = ParseError::syntax("<?php !", &furthest);
        assert_eq!(
            err.to_string(),
            "syntax error at offset 3: expected N_INTEGER, N_VARIABLE"
        );
    }

    #[test]
    fn test_span_is_clamped_to_input() {
        let err = ParseError::syntax(
            "ab",
            &Furthest {
                offset: 99,
                expected: BTreeSet::new(),
            },
        );
        match err {
            ParseError::Syntax { at, .. } => {
                assert_eq!(at.offset(), 2);
                assert_eq!(at.len(), 0);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
