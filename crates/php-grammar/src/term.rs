//! Primary expressions: literals, variables, array constructors, and the
//! keyword-led term forms (`new`, `isset`, `exit`, closures, ...).

use lazy_static::lazy_static;
use php_cursor::Mode;
use php_node::{Node, Value};
use regex::Regex;

use crate::assemble::{flatten_list, fragment, list_or_empty, opt_part};
use crate::dsl::{cap, comma_list, custom, kw, lit, one_of, opt, r, re, re_cap, seq};
use crate::table::GrammarBuilder;
use crate::{path_pattern, RuleDef, IDENT};

/// Words that can never be a bare constant or function name. `self`,
/// `parent` and `static` are deliberately absent: they are valid class
/// references. `true`/`false`/`null` are matched by earlier term rules.
const RESERVED: &[&str] = &[
    "abstract",
    "and",
    "array",
    "as",
    "break",
    "callable",
    "case",
    "catch",
    "class",
    "clone",
    "const",
    "continue",
    "declare",
    "default",
    "die",
    "do",
    "echo",
    "else",
    "elseif",
    "empty",
    "enddeclare",
    "endfor",
    "endforeach",
    "endif",
    "endswitch",
    "endwhile",
    "eval",
    "exit",
    "extends",
    "final",
    "finally",
    "for",
    "foreach",
    "function",
    "global",
    "goto",
    "if",
    "implements",
    "include",
    "include_once",
    "instanceof",
    "insteadof",
    "interface",
    "isset",
    "list",
    "namespace",
    "new",
    "or",
    "print",
    "private",
    "protected",
    "public",
    "require",
    "require_once",
    "return",
    "switch",
    "throw",
    "trait",
    "try",
    "unset",
    "use",
    "var",
    "while",
    "xor",
    "yield",
];

pub(crate) fn is_reserved(word: &str) -> bool {
    let lower = word.to_ascii_lowercase();
    RESERVED.binary_search(&lower.as_str()).is_ok()
}

/// Bare (possibly qualified) name as an `N_STRING` node. Single
/// unqualified reserved words are rejected so keywords never parse as
/// constants.
fn bare_name() -> crate::Component {
    lazy_static! {
        static ref PATH_RE: Regex = Regex::new(&format!("^(?:{})", path_pattern()))
            .expect("name pattern compiles");
    }
    custom(|cur, _| {
        if cur.mode() == Mode::Php {
            cur.skip_ignorable();
        }
        let cp = cur.mark();
        match cur.match_regex(&PATH_RE, 0) {
            Some(text) => {
                if !text.contains('\\') && is_reserved(&text) {
                    cur.rewind(cp);
                    cur.note_failure("N_STRING");
                    return None;
                }
                Some(Value::Node(Node::new("N_STRING").with("string", text)))
            }
            None => {
                cur.note_failure("N_STRING");
                None
            }
        }
    })
}

fn normalize_integer(text: &str) -> String {
    let digits = text.as_bytes();
    if digits.len() > 2 && (digits[1] == b'x' || digits[1] == b'X') {
        match u128::from_str_radix(&text[2..], 16) {
            Ok(n) => n.to_string(),
            Err(_) => text.to_string(),
        }
    } else if digits.len() > 1 && digits[0] == b'0' {
        match u128::from_str_radix(&text[1..], 8) {
            Ok(n) => n.to_string(),
            Err(_) => text.to_string(),
        }
    } else {
        text.to_string()
    }
}

fn magic_constant_kind(text: &str) -> &'static str {
    match text.to_ascii_uppercase().as_str() {
        "__LINE__" => "N_MAGIC_LINE_CONSTANT",
        "__FILE__" => "N_MAGIC_FILE_CONSTANT",
        "__DIR__" => "N_MAGIC_DIR_CONSTANT",
        "__FUNCTION__" => "N_MAGIC_FUNCTION_CONSTANT",
        "__CLASS__" => "N_MAGIC_CLASS_CONSTANT",
        "__TRAIT__" => "N_MAGIC_TRAIT_CONSTANT",
        "__METHOD__" => "N_MAGIC_METHOD_CONSTANT",
        _ => "N_MAGIC_NAMESPACE_CONSTANT",
    }
}

pub(crate) fn register(builder: &mut GrammarBuilder) {
    builder.define(
        "N_EXPRESSION_LEVEL_0",
        RuleDef::matching(one_of(vec![
            r("N_CLOSURE"),
            r("N_NEW_EXPRESSION"),
            r("N_CLONE_EXPRESSION"),
            r("N_ISSET"),
            r("N_EMPTY"),
            r("N_EVAL"),
            r("N_EXIT"),
            r("N_LIST"),
            r("N_ARRAY_LITERAL"),
            r("N_MAGIC_CONSTANT"),
            r("N_BOOLEAN"),
            r("N_NULL"),
            r("N_FLOAT"),
            r("N_BINARY_LITERAL"),
            r("N_INTEGER"),
            r("N_STRING_LITERAL"),
            r("N_HEREDOC"),
            r("N_VARIABLE"),
            r("N_VARIABLE_EXPRESSION"),
            r("N_PARENTHESIZED_EXPRESSION"),
            r("N_STRING"),
        ])),
    );

    builder.define(
        "N_PARENTHESIZED_EXPRESSION",
        RuleDef::assemble(
            seq(vec![lit("("), cap("inner", r("N_EXPRESSION")), lit(")")]),
            |raw| fragment(raw)?.take("inner"),
        ),
    );

    builder.define(
        "N_VARIABLE",
        RuleDef::node(seq(vec![cap(
            "variable",
            re_cap(&format!("\\$({IDENT})"), 1),
        )])),
    );

    // Variable-variables: `$$x`, `$$$x`, `${expr}`.
    builder.define(
        "N_VARIABLE_EXPRESSION",
        RuleDef::node(one_of(vec![
            seq(vec![
                lit("${"),
                cap("expression", r("N_EXPRESSION")),
                lit("}"),
            ]),
            seq(vec![
                lit("$"),
                cap(
                    "expression",
                    one_of(vec![r("N_VARIABLE"), r("N_VARIABLE_EXPRESSION")]),
                ),
            ]),
        ])),
    );

    builder.define("N_STRING", RuleDef::matching(bare_name()));

    builder.define(
        "N_BOOLEAN",
        RuleDef::assemble(re("(?i:true|false)\\b"), |raw| {
            let text = raw.into_string()?;
            Some(Value::Node(
                Node::new("N_BOOLEAN").with("bool", text.eq_ignore_ascii_case("true")),
            ))
        }),
    );

    builder.define(
        "N_NULL",
        RuleDef::assemble(re("(?i:null)\\b"), |_| {
            Some(Value::Node(Node::new("N_NULL")))
        }),
    );

    builder.define(
        "N_FLOAT",
        RuleDef::assemble(
            re("(?:\\d+\\.\\d*|\\.\\d+)(?:[eE][+-]?\\d+)?|\\d+[eE][+-]?\\d+"),
            |raw| {
                let text = raw.into_string()?;
                Some(Value::Node(Node::new("N_FLOAT").with("number", text)))
            },
        ),
    );

    // Hex and octal notations normalize to decimal digit strings; plain
    // decimal text is kept verbatim.
    builder.define(
        "N_INTEGER",
        RuleDef::assemble(
            one_of(vec![re("0[xX][0-9A-Fa-f]+"), re("0[0-7]+"), re("\\d+")]),
            |raw| {
                let text = raw.into_string()?;
                Some(Value::Node(
                    Node::new("N_INTEGER").with("number", normalize_integer(&text)),
                ))
            },
        ),
    );

    builder.define(
        "N_BINARY_LITERAL",
        RuleDef::assemble(re("0[bB][01]+"), |raw| {
            let text = raw.into_string()?;
            let number = match u128::from_str_radix(&text[2..], 2) {
                Ok(n) => n.to_string(),
                Err(_) => text,
            };
            Some(Value::Node(
                Node::new("N_BINARY_LITERAL").with("number", number),
            ))
        }),
    );

    builder.define(
        "N_MAGIC_CONSTANT",
        RuleDef::assemble(
            re("(?i:__(?:LINE|FILE|DIR|FUNCTION|CLASS|TRAIT|METHOD|NAMESPACE)__)\\b"),
            |raw| {
                let text = raw.into_string()?;
                Some(Value::Node(Node::new(magic_constant_kind(&text))))
            },
        ),
    );

    builder.define(
        "N_ARRAY_LITERAL",
        RuleDef::assemble(
            one_of(vec![
                seq(vec![
                    kw("array"),
                    lit("("),
                    cap("elements", opt(comma_list(r("N_ARRAY_ELEMENT")))),
                    opt(lit(",")),
                    lit(")"),
                ]),
                seq(vec![
                    lit("["),
                    cap("elements", opt(comma_list(r("N_ARRAY_ELEMENT")))),
                    opt(lit(",")),
                    lit("]"),
                ]),
            ]),
            |raw| {
                let elements = flatten_list(fragment(raw)?.take("elements")?)?;
                Some(Value::Node(
                    Node::new("N_ARRAY_LITERAL").with("elements", elements),
                ))
            },
        ),
    );

    builder.define(
        "N_ARRAY_ELEMENT",
        RuleDef::assemble(
            seq(vec![
                cap("value", one_of(vec![r("N_REFERENCE"), r("N_EXPRESSION")])),
                cap(
                    "kv",
                    opt(seq(vec![
                        lit("=>"),
                        cap("second", one_of(vec![r("N_REFERENCE"), r("N_EXPRESSION")])),
                    ])),
                ),
            ]),
            |raw| {
                let mut frag = fragment(raw)?;
                let value = frag.take("value")?;
                match opt_part(frag.take("kv")?, "second") {
                    Value::Null => Some(value),
                    second => Some(Value::Node(
                        Node::new("N_KEY_VALUE_PAIR")
                            .with("key", value)
                            .with("value", second),
                    )),
                }
            },
        ),
    );

    builder.define(
        "N_LIST",
        RuleDef::assemble(
            seq(vec![
                kw("list"),
                lit("("),
                cap(
                    "elements",
                    opt(comma_list(one_of(vec![r("N_VARIABLE"), r("N_LIST")]))),
                ),
                lit(")"),
            ]),
            |raw| {
                let elements = flatten_list(fragment(raw)?.take("elements")?)?;
                Some(Value::Node(Node::new("N_LIST").with("elements", elements)))
            },
        ),
    );

    builder.define(
        "N_ISSET",
        RuleDef::assemble(
            seq(vec![
                kw("isset"),
                lit("("),
                cap("variables", comma_list(r("N_EXPRESSION"))),
                lit(")"),
            ]),
            |raw| {
                let variables = flatten_list(fragment(raw)?.take("variables")?)?;
                Some(Value::Node(
                    Node::new("N_ISSET").with("variables", variables),
                ))
            },
        ),
    );

    builder.define(
        "N_EMPTY",
        RuleDef::node(seq(vec![
            kw("empty"),
            lit("("),
            cap("variable", r("N_EXPRESSION")),
            lit(")"),
        ])),
    );

    builder.define(
        "N_EVAL",
        RuleDef::node(seq(vec![
            kw("eval"),
            lit("("),
            cap("code", r("N_EXPRESSION")),
            lit(")"),
        ])),
    );

    // `exit` and `die` are interchangeable; the status argument and even
    // the parentheses are optional, and an absent status leaves no field.
    builder.define(
        "N_EXIT",
        RuleDef::assemble(
            seq(vec![
                one_of(vec![kw("exit"), kw("die")]),
                cap(
                    "paren",
                    opt(seq(vec![
                        lit("("),
                        cap("status", opt(r("N_EXPRESSION"))),
                        lit(")"),
                    ])),
                ),
            ]),
            |raw| {
                let mut node = Node::new("N_EXIT");
                match opt_part(fragment(raw)?.take("paren")?, "status") {
                    Value::Null => {}
                    status => node.set("status", status),
                }
                Some(Value::Node(node))
            },
        ),
    );

    builder.define(
        "N_NEW_EXPRESSION",
        RuleDef::assemble(
            seq(vec![
                kw("new"),
                cap("className", one_of(vec![r("N_STRING"), r("N_VARIABLE")])),
                cap("args", opt(r("N_CALL_ARG_LIST"))),
            ]),
            |raw| {
                let mut frag = fragment(raw)?;
                let class_name = frag.take("className")?;
                let args = list_or_empty(frag.take("args")?);
                Some(Value::Node(
                    Node::new("N_NEW_EXPRESSION")
                        .with("className", class_name)
                        .with("args", args),
                ))
            },
        ),
    );

    builder.define(
        "N_CLONE_EXPRESSION",
        RuleDef::node(seq(vec![
            kw("clone"),
            cap("operand", r("N_EXPRESSION_LEVEL_1")),
        ])),
    );

    builder.define(
        "N_VARIABLE_REFERENCE",
        RuleDef::node_as(
            "N_REFERENCE",
            seq(vec![lit("&"), cap("operand", r("N_VARIABLE"))]),
        ),
    );

    builder.define(
        "N_CLOSURE",
        RuleDef::assemble(
            seq(vec![
                cap("static", opt(kw("static"))),
                kw("function"),
                opt(lit("&")),
                cap("args", r("N_PARAM_LIST")),
                cap(
                    "bindings",
                    opt(seq(vec![
                        kw("use"),
                        lit("("),
                        cap(
                            "list",
                            comma_list(one_of(vec![
                                r("N_VARIABLE_REFERENCE"),
                                r("N_VARIABLE"),
                            ])),
                        ),
                        lit(")"),
                    ])),
                ),
                cap(
                    "returnType",
                    opt(seq(vec![lit(":"), cap("type", r("N_TYPE"))])),
                ),
                cap("body", r("N_BRACED_STATEMENTS")),
            ]),
            |raw| {
                let mut frag = fragment(raw)?;
                let is_static = !frag.take("static")?.is_null();
                let args = frag.take("args")?;
                let bindings = flatten_list(opt_part(frag.take("bindings")?, "list"))?;
                let return_type = opt_part(frag.take("returnType")?, "type");
                let body = frag.take("body")?;
                let mut node = Node::new("N_CLOSURE")
                    .with("static", is_static)
                    .with("args", args)
                    .with("bindings", bindings);
                if !return_type.is_null() {
                    node.set("returnType", return_type);
                }
                node.set("body", body);
                Some(Value::Node(node))
            },
        ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_list_is_sorted_for_binary_search() {
        let mut sorted = RESERVED.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, RESERVED);
    }

    #[test]
    fn test_is_reserved_ignores_case() {
        assert!(is_reserved("While"));
        assert!(is_reserved("ECHO"));
        assert!(!is_reserved("self"));
        assert!(!is_reserved("parent"));
        assert!(!is_reserved("whileLoop"));
    }

    #[test]
    fn test_normalize_integer() {
        assert_eq!(normalize_integer("0x21"), "33");
        assert_eq!(normalize_integer("0XAbCD"), "43981");
        assert_eq!(normalize_integer("034"), "28");
        assert_eq!(normalize_integer("34"), "34");
        assert_eq!(normalize_integer("0"), "0");
    }

    #[test]
    fn test_magic_constant_kinds() {
        assert_eq!(magic_constant_kind("__LINE__"), "N_MAGIC_LINE_CONSTANT");
        assert_eq!(magic_constant_kind("__dir__"), "N_MAGIC_DIR_CONSTANT");
        assert_eq!(
            magic_constant_kind("__NAMESPACE__"),
            "N_MAGIC_NAMESPACE_CONSTANT"
        );
    }
}
