//! The expression ladder. Each tier is its own rule referencing the next
//! tighter tier, so precedence and associativity live entirely in the
//! rule table. Operator-prefix overlaps (`&` vs `&&`, `+` vs `+=`) are
//! resolved by ordered alternation and backtracking, not lookahead.

use php_node::{Node, Value};

use crate::assemble::{flatten_list, fragment, opt_part};
use crate::dsl::{cap, comma_list, kw, lit, one_of, opt, r, re, re_cap, seq, star};
use crate::table::GrammarBuilder;
use crate::{Component, RuleDef, IDENT};

/// Keyword operators come out of the regex with their source casing;
/// the tree carries them lowercased.
fn normalize_operator(op: Value) -> Value {
    match op {
        Value::Str(s) if s.chars().all(|c| c.is_ascii_alphabetic()) => {
            Value::Str(s.to_ascii_lowercase())
        }
        other => other,
    }
}

fn operator_pairs(raw: Value) -> Option<(Value, Vec<(Value, Value)>)> {
    let mut frag = fragment(raw)?;
    let left = frag.take("left")?;
    let mut pairs = Vec::new();
    for entry in frag.take("right")?.into_list() {
        let mut pair = entry.into_node()?;
        let op = normalize_operator(pair.take("operator")?);
        pairs.push((op, pair.take("operand")?));
    }
    Some((left, pairs))
}

/// Left-associative chain: the whole run becomes one node with a flat
/// operator/operand list, `1 - 2 + 3` keeping its source order.
fn assemble_left_chain(raw: Value) -> Option<Value> {
    let (left, pairs) = operator_pairs(raw)?;
    if pairs.is_empty() {
        return Some(left);
    }
    let right: Vec<Value> = pairs
        .into_iter()
        .map(|(op, operand)| {
            Value::Node(Node::fragment().with("operator", op).with("operand", operand))
        })
        .collect();
    Some(Value::Node(
        Node::new("N_EXPRESSION").with("left", left).with("right", right),
    ))
}

/// Right-associative chain: `2 ** 3 ** 4` nests as `2 ** (3 ** 4)`.
fn assemble_right_chain(raw: Value) -> Option<Value> {
    let (left, pairs) = operator_pairs(raw)?;
    Some(nest_right(left, &mut pairs.into_iter()))
}

fn nest_right(left: Value, pairs: &mut std::vec::IntoIter<(Value, Value)>) -> Value {
    match pairs.next() {
        None => left,
        Some((op, operand)) => {
            let operand = nest_right(operand, pairs);
            Value::Node(
                Node::new("N_EXPRESSION").with("left", left).with(
                    "right",
                    vec![Value::Node(
                        Node::fragment().with("operator", op).with("operand", operand),
                    )],
                ),
            )
        }
    }
}

fn binary_tier(
    builder: &mut GrammarBuilder,
    name: &str,
    tighter: &'static str,
    op: Component,
    assembler: fn(Value) -> Option<Value>,
) {
    builder.define(
        name,
        RuleDef::assemble(
            seq(vec![
                cap("left", r(tighter)),
                cap(
                    "right",
                    star(seq(vec![
                        cap("operator", op),
                        cap("operand", r(tighter)),
                    ])),
                ),
            ]),
            assembler,
        ),
    );
}

fn cast_kind(word: &str) -> &'static str {
    match word.to_ascii_lowercase().as_str() {
        "int" | "integer" => "N_INTEGER_CAST",
        "float" | "double" | "real" => "N_FLOAT_CAST",
        "string" | "binary" => "N_STRING_CAST",
        "bool" | "boolean" => "N_BOOLEAN_CAST",
        "array" => "N_ARRAY_CAST",
        "object" => "N_OBJECT_CAST",
        _ => "N_UNSET_CAST",
    }
}

/// Replace the deepest trailing operand of a binary chain with an
/// assignment around it, so `1 - $a = 2` reads as `1 - ($a = 2)`.
fn steal_last_operand(target: Value, operator: Value, right: Value) -> Option<Value> {
    match target {
        Value::Node(mut node) if node.is_kind("N_EXPRESSION") => {
            let mut pairs = node.take("right")?.into_list();
            let mut last = pairs.pop()?.into_node()?;
            let operand = last.take("operand")?;
            last.set("operand", steal_last_operand(operand, operator, right)?);
            pairs.push(Value::Node(last));
            node.set("right", Value::List(pairs));
            Some(Value::Node(node))
        }
        other => Some(Value::Node(
            Node::new("N_ASSIGNMENT")
                .with("left", other)
                .with("operator", operator)
                .with("right", right),
        )),
    }
}

fn assemble_unary(raw: Value) -> Option<Value> {
    let mut frag = fragment(raw)?;
    if let Some(cast) = frag.take("cast") {
        let value = frag.take("value")?;
        return Some(Value::Node(
            Node::new(cast_kind(cast.as_str()?)).with("value", value),
        ));
    }
    if let Some(expression) = frag.take("expression") {
        return Some(Value::Node(
            Node::new("N_SUPPRESSED_EXPRESSION").with("expression", expression),
        ));
    }
    if let Some(operator) = frag.take("operator") {
        let operand = frag.take("operand")?;
        return Some(Value::Node(
            Node::new("N_UNARY_EXPRESSION")
                .with("operator", operator)
                .with("operand", operand)
                .with("prefix", true),
        ));
    }
    let operand = frag.take("operand")?;
    match frag.take("post")? {
        Value::Null => Some(operand),
        post => Some(Value::Node(
            Node::new("N_UNARY_EXPRESSION")
                .with("operator", post)
                .with("operand", operand)
                .with("prefix", false),
        )),
    }
}

fn string_node(value: Value) -> Value {
    match value {
        Value::Str(s) => Value::Node(Node::new("N_STRING").with("string", s)),
        other => other,
    }
}

/// Fold one member-access suffix onto the expression built so far. The
/// suffix rules tag their fragments with a discriminating kind that never
/// reaches the final tree.
fn fold_suffix(target: Value, suffix: Value) -> Option<Value> {
    let mut suffix = suffix.into_node()?;
    let node = match suffix.kind() {
        Some("call") => Node::new("N_FUNCTION_CALL")
            .with("func", target)
            .with("args", suffix.take("args")?),
        Some("index") => Node::new("N_ARRAY_INDEX")
            .with("array", target)
            .with("index", suffix.take("index")?),
        Some("prop") => {
            let property = string_node(suffix.take("property")?);
            match suffix.take("args")? {
                Value::Null => Node::new("N_OBJECT_PROPERTY")
                    .with("object", target)
                    .with("property", property),
                args => Node::new("N_METHOD_CALL")
                    .with("object", target)
                    .with("method", property)
                    .with("args", args),
            }
        }
        Some("static_prop") => {
            let property = suffix.take("property")?;
            match suffix.take("args")? {
                Value::Null => Node::new("N_STATIC_PROPERTY")
                    .with("className", target)
                    .with("property", property),
                args => Node::new("N_STATIC_METHOD_CALL")
                    .with("className", target)
                    .with("method", property)
                    .with("args", args),
            }
        }
        Some("static_member") => {
            let member = suffix.take("member")?;
            match suffix.take("args")? {
                Value::Null => Node::new("N_CLASS_CONSTANT")
                    .with("className", target)
                    .with("constant", member),
                args => Node::new("N_STATIC_METHOD_CALL")
                    .with("className", target)
                    .with("method", string_node(member))
                    .with("args", args),
            }
        }
        _ => return None,
    };
    Some(Value::Node(node))
}

pub(crate) fn register(builder: &mut GrammarBuilder) {
    builder.define("N_EXPRESSION", RuleDef::matching(r("N_EXPRESSION_LEVEL_21")));

    builder.define(
        "N_BRACED_EXPRESSION",
        RuleDef::assemble(
            seq(vec![lit("{"), cap("inner", r("N_EXPRESSION")), lit("}")]),
            |raw| fragment(raw)?.take("inner"),
        ),
    );

    builder.define(
        "N_REFERENCE",
        RuleDef::node_as(
            "N_REFERENCE",
            seq(vec![lit("&"), cap("operand", r("N_EXPRESSION_LEVEL_16"))]),
        ),
    );

    builder.define(
        "N_CALL_ARG_LIST",
        RuleDef::assemble(
            seq(vec![
                lit("("),
                cap(
                    "args",
                    opt(comma_list(one_of(vec![
                        r("N_REFERENCE"),
                        r("N_EXPRESSION"),
                    ]))),
                ),
                lit(")"),
            ]),
            |raw| flatten_list(fragment(raw)?.take("args")?),
        ),
    );

    // ---- L1: member access, calls, indexing ----

    builder.define(
        "N_EXPRESSION_LEVEL_1",
        RuleDef::assemble(
            seq(vec![
                cap("target", r("N_EXPRESSION_LEVEL_0")),
                cap("suffixes", star(r("N_MEMBER_SUFFIX"))),
            ]),
            |raw| {
                let mut frag = fragment(raw)?;
                let mut acc = frag.take("target")?;
                for suffix in frag.take("suffixes")?.into_list() {
                    acc = fold_suffix(acc, suffix)?;
                }
                Some(acc)
            },
        ),
    );

    builder.define(
        "N_MEMBER_SUFFIX",
        RuleDef::matching(one_of(vec![
            r("N_CALL_SUFFIX"),
            r("N_INDEX_SUFFIX"),
            r("N_PROPERTY_SUFFIX"),
            r("N_STATIC_PROPERTY_SUFFIX"),
            r("N_STATIC_MEMBER_SUFFIX"),
        ])),
    );

    builder.define(
        "N_CALL_SUFFIX",
        RuleDef::node_as("call", seq(vec![cap("args", r("N_CALL_ARG_LIST"))])),
    );

    builder.define(
        "N_INDEX_SUFFIX",
        RuleDef::node_as(
            "index",
            seq(vec![
                lit("["),
                cap("index", opt(r("N_EXPRESSION"))),
                lit("]"),
            ]),
        ),
    );

    builder.define(
        "N_PROPERTY_SUFFIX",
        RuleDef::node_as(
            "prop",
            seq(vec![
                lit("->"),
                cap(
                    "property",
                    one_of(vec![
                        re(IDENT),
                        r("N_VARIABLE"),
                        r("N_BRACED_EXPRESSION"),
                    ]),
                ),
                cap("args", opt(r("N_CALL_ARG_LIST"))),
            ]),
        ),
    );

    builder.define(
        "N_STATIC_PROPERTY_SUFFIX",
        RuleDef::node_as(
            "static_prop",
            seq(vec![
                lit("::"),
                cap("property", r("N_VARIABLE")),
                cap("args", opt(r("N_CALL_ARG_LIST"))),
            ]),
        ),
    );

    builder.define(
        "N_STATIC_MEMBER_SUFFIX",
        RuleDef::node_as(
            "static_member",
            seq(vec![
                lit("::"),
                cap("member", re(IDENT)),
                cap("args", opt(r("N_CALL_ARG_LIST"))),
            ]),
        ),
    );

    // ---- L2..L15: binary operator tiers ----

    binary_tier(
        builder,
        "N_EXPRESSION_LEVEL_2",
        "N_EXPRESSION_LEVEL_1",
        re("\\*\\*"),
        assemble_right_chain,
    );

    // ---- L3: prefix/postfix unary, casts, error suppression ----

    builder.define(
        "N_EXPRESSION_LEVEL_3",
        RuleDef::assemble(
            one_of(vec![
                seq(vec![
                    cap("operator", re("\\+\\+|--|[!~+\\-]")),
                    cap("operand", r("N_EXPRESSION_LEVEL_3")),
                ]),
                seq(vec![
                    cap(
                        "cast",
                        re_cap(
                            "\\(\\s*((?i:integer|int|double|float|real|boolean|bool|string|binary|array|object|unset))\\s*\\)",
                            1,
                        ),
                    ),
                    cap("value", r("N_EXPRESSION_LEVEL_3")),
                ]),
                seq(vec![
                    lit("@"),
                    cap("expression", r("N_EXPRESSION_LEVEL_3")),
                ]),
                seq(vec![
                    cap("operand", r("N_EXPRESSION_LEVEL_2")),
                    cap("post", opt(re("\\+\\+|--"))),
                ]),
            ]),
            assemble_unary,
        ),
    );

    binary_tier(
        builder,
        "N_EXPRESSION_LEVEL_4",
        "N_EXPRESSION_LEVEL_3",
        kw("instanceof"),
        assemble_left_chain,
    );
    binary_tier(
        builder,
        "N_EXPRESSION_LEVEL_5",
        "N_EXPRESSION_LEVEL_4",
        re("[*/%]"),
        assemble_left_chain,
    );
    binary_tier(
        builder,
        "N_EXPRESSION_LEVEL_6",
        "N_EXPRESSION_LEVEL_5",
        re("[+\\-.]"),
        assemble_left_chain,
    );
    binary_tier(
        builder,
        "N_EXPRESSION_LEVEL_7",
        "N_EXPRESSION_LEVEL_6",
        re("<<|>>"),
        assemble_left_chain,
    );
    binary_tier(
        builder,
        "N_EXPRESSION_LEVEL_8",
        "N_EXPRESSION_LEVEL_7",
        re("<=|>=|<|>"),
        assemble_left_chain,
    );
    binary_tier(
        builder,
        "N_EXPRESSION_LEVEL_9",
        "N_EXPRESSION_LEVEL_8",
        re("===|!==|==|!=|<>"),
        assemble_left_chain,
    );
    binary_tier(
        builder,
        "N_EXPRESSION_LEVEL_10",
        "N_EXPRESSION_LEVEL_9",
        re("&"),
        assemble_left_chain,
    );
    binary_tier(
        builder,
        "N_EXPRESSION_LEVEL_11",
        "N_EXPRESSION_LEVEL_10",
        re("\\^"),
        assemble_left_chain,
    );
    binary_tier(
        builder,
        "N_EXPRESSION_LEVEL_12",
        "N_EXPRESSION_LEVEL_11",
        re("\\|"),
        assemble_left_chain,
    );
    binary_tier(
        builder,
        "N_EXPRESSION_LEVEL_13",
        "N_EXPRESSION_LEVEL_12",
        re("&&"),
        assemble_left_chain,
    );
    binary_tier(
        builder,
        "N_EXPRESSION_LEVEL_14",
        "N_EXPRESSION_LEVEL_13",
        re("\\|\\|"),
        assemble_left_chain,
    );
    binary_tier(
        builder,
        "N_EXPRESSION_LEVEL_15",
        "N_EXPRESSION_LEVEL_14",
        re("\\?\\?"),
        assemble_right_chain,
    );

    // ---- L16: ternary, left-associative, with the elvis short form ----

    builder.define(
        "N_EXPRESSION_LEVEL_16",
        RuleDef::assemble(
            seq(vec![
                cap("condition", r("N_EXPRESSION_LEVEL_15")),
                cap(
                    "chain",
                    star(seq(vec![
                        lit("?"),
                        cap("consequent", opt(r("N_EXPRESSION"))),
                        lit(":"),
                        cap("alternate", r("N_EXPRESSION_LEVEL_15")),
                    ])),
                ),
            ]),
            |raw| {
                let mut frag = fragment(raw)?;
                let mut acc = frag.take("condition")?;
                for link in frag.take("chain")?.into_list() {
                    let mut link = link.into_node()?;
                    acc = Value::Node(
                        Node::new("N_TERNARY")
                            .with("condition", acc)
                            .with("consequent", link.take("consequent")?)
                            .with("alternate", link.take("alternate")?),
                    );
                }
                Some(acc)
            },
        ),
    );

    // ---- L17: assignment, right-associative ----

    builder.define(
        "N_EXPRESSION_LEVEL_17",
        RuleDef::assemble(
            seq(vec![
                cap("left", r("N_EXPRESSION_LEVEL_16")),
                cap(
                    "tail",
                    opt(seq(vec![
                        cap(
                            "operator",
                            re("\\*\\*=|<<=|>>=|\\+=|-=|\\*=|/=|\\.=|%=|&=|\\|=|\\^=|="),
                        ),
                        // the right side reaches back up to print/yield/include
                        // so `$x = include 'f.php'` parses
                        cap(
                            "operand",
                            one_of(vec![r("N_REFERENCE"), r("N_EXPRESSION_LEVEL_18")]),
                        ),
                    ])),
                ),
            ]),
            |raw| {
                let mut frag = fragment(raw)?;
                let left = frag.take("left")?;
                match frag.take("tail")? {
                    Value::Null => Some(left),
                    tail => {
                        let mut tail = tail.into_node()?;
                        let operator = tail.take("operator")?;
                        let right = tail.take("operand")?;
                        steal_last_operand(left, operator, right)
                    }
                }
            },
        ),
    );

    // ---- L18: print and yield ----

    builder.define(
        "N_EXPRESSION_LEVEL_18",
        RuleDef::matching(one_of(vec![
            r("N_PRINT_EXPRESSION"),
            r("N_YIELD_EXPRESSION"),
            r("N_INCLUDE_EXPRESSION"),
            r("N_EXPRESSION_LEVEL_17"),
        ])),
    );

    builder.define(
        "N_INCLUDE_EXPRESSION",
        RuleDef::assemble(
            seq(vec![
                cap(
                    "keyword",
                    re_cap("((?i:require_once|require|include_once|include))\\b", 1),
                ),
                cap("operand", r("N_EXPRESSION_LEVEL_18")),
            ]),
            |raw| {
                let mut frag = fragment(raw)?;
                let keyword = frag.take("keyword")?.into_string()?.to_ascii_lowercase();
                Some(Value::Node(
                    Node::new("N_INCLUDE_EXPRESSION")
                        .with("operand", frag.take("operand")?)
                        .with("once", keyword.ends_with("_once"))
                        .with("require", keyword.starts_with("require")),
                ))
            },
        ),
    );

    builder.define(
        "N_PRINT_EXPRESSION",
        RuleDef::node(seq(vec![
            kw("print"),
            cap("operand", r("N_EXPRESSION_LEVEL_18")),
        ])),
    );

    builder.define(
        "N_YIELD_EXPRESSION",
        RuleDef::assemble(
            seq(vec![
                kw("yield"),
                cap("first", opt(r("N_EXPRESSION_LEVEL_17"))),
                cap(
                    "kv",
                    opt(seq(vec![
                        lit("=>"),
                        cap("value", r("N_EXPRESSION_LEVEL_17")),
                    ])),
                ),
            ]),
            |raw| {
                let mut frag = fragment(raw)?;
                let first = frag.take("first")?;
                let node = match opt_part(frag.take("kv")?, "value") {
                    Value::Null => Node::new("N_YIELD_EXPRESSION")
                        .with("key", Value::Null)
                        .with("value", first),
                    value => Node::new("N_YIELD_EXPRESSION")
                        .with("key", first)
                        .with("value", value),
                };
                Some(Value::Node(node))
            },
        ),
    );

    // ---- L19..L21: the low-precedence word operators ----

    binary_tier(
        builder,
        "N_EXPRESSION_LEVEL_19",
        "N_EXPRESSION_LEVEL_18",
        kw("and"),
        assemble_left_chain,
    );
    binary_tier(
        builder,
        "N_EXPRESSION_LEVEL_20",
        "N_EXPRESSION_LEVEL_19",
        kw("xor"),
        assemble_left_chain,
    );
    binary_tier(
        builder,
        "N_EXPRESSION_LEVEL_21",
        "N_EXPRESSION_LEVEL_20",
        kw("or"),
        assemble_left_chain,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(op: &str, operand: Value) -> Value {
        Value::Node(Node::fragment().with("operator", op).with("operand", operand))
    }

    fn int(n: &str) -> Value {
        Value::Node(Node::new("N_INTEGER").with("number", n))
    }

    fn var(name: &str) -> Value {
        Value::Node(Node::new("N_VARIABLE").with("variable", name))
    }

    #[test]
    fn test_left_chain_stays_flat() {
        let raw = Value::Node(
            Node::fragment()
                .with("left", int("1"))
                .with("right", vec![pair("-", int("2")), pair("+", int("3"))]),
        );
        let node = assemble_left_chain(raw).unwrap().into_node().unwrap();
        assert!(node.is_kind("N_EXPRESSION"));
        assert_eq!(node.get("right").unwrap().as_list().unwrap().len(), 2);
    }

    #[test]
    fn test_right_chain_nests() {
        let raw = Value::Node(
            Node::fragment()
                .with("left", int("2"))
                .with("right", vec![pair("**", int("3")), pair("**", int("4"))]),
        );
        let node = assemble_right_chain(raw).unwrap().into_node().unwrap();
        let outer = node.get("right").unwrap().as_list().unwrap();
        let inner = outer[0].as_node().unwrap().get("operand").unwrap();
        assert!(inner.as_node().unwrap().is_kind("N_EXPRESSION"));
    }

    #[test]
    fn test_steal_last_operand_rewrites_trailing_term() {
        // 1 - $a  with  `= 2`  becomes  1 - ($a = 2)
        let chain = Value::Node(
            Node::fragment()
                .with("left", int("1"))
                .with("right", vec![pair("-", var("a"))]),
        );
        let chain = assemble_left_chain(chain).unwrap();
        let result = steal_last_operand(chain, Value::Str("=".into()), int("2"))
            .unwrap()
            .into_node()
            .unwrap();
        assert!(result.is_kind("N_EXPRESSION"));
        let pairs = result.get("right").unwrap().as_list().unwrap();
        let stolen = pairs[0].as_node().unwrap().get("operand").unwrap();
        assert!(stolen.as_node().unwrap().is_kind("N_ASSIGNMENT"));
    }

    #[test]
    fn test_plain_assignment_keeps_left() {
        let result = steal_last_operand(var("a"), Value::Str("=".into()), int("2"))
            .unwrap()
            .into_node()
            .unwrap();
        assert!(result.is_kind("N_ASSIGNMENT"));
        assert_eq!(
            result.get("left").unwrap().as_node().unwrap().kind(),
            Some("N_VARIABLE")
        );
    }

    #[test]
    fn test_cast_kinds() {
        assert_eq!(cast_kind("Integer"), "N_INTEGER_CAST");
        assert_eq!(cast_kind("real"), "N_FLOAT_CAST");
        assert_eq!(cast_kind("binary"), "N_STRING_CAST");
        assert_eq!(cast_kind("unset"), "N_UNSET_CAST");
    }
}
