//! Parameter and return type hints. `?T` is sugar for a union with
//! null, and `A|B` unions come out as a list of type nodes.

use php_node::{Node, Value};

use crate::assemble::fragment;
use crate::dsl::{cap, kw, lit, one_of, opt, r, re_cap, seq, star};
use crate::table::GrammarBuilder;
use crate::{path_pattern, RuleDef};

fn scalar_type(word: &str) -> &'static str {
    match word.to_ascii_lowercase().as_str() {
        "int" | "integer" => "int",
        "float" | "double" => "float",
        "bool" | "boolean" => "bool",
        _ => "string",
    }
}

pub(crate) fn register(builder: &mut GrammarBuilder) {
    builder.define(
        "N_TYPE",
        RuleDef::assemble(
            seq(vec![
                cap("nullable", opt(lit("?"))),
                cap("first", r("N_SINGLE_TYPE")),
                cap(
                    "rest",
                    star(seq(vec![lit("|"), cap("item", r("N_SINGLE_TYPE"))])),
                ),
            ]),
            |raw| {
                let mut frag = fragment(raw)?;
                let nullable = !frag.take("nullable")?.is_null();
                let first = frag.take("first")?;
                let mut members = vec![first];
                for entry in frag.take("rest")?.into_list() {
                    members.push(entry.into_node()?.take("item")?);
                }
                if nullable {
                    members.push(Value::Node(
                        Node::new("N_SCALAR_TYPE").with("type", "null"),
                    ));
                }
                if members.len() == 1 {
                    members.pop()
                } else {
                    Some(Value::Node(
                        Node::new("N_UNION_TYPE").with("types", members),
                    ))
                }
            },
        ),
    );

    builder.define(
        "N_SINGLE_TYPE",
        RuleDef::matching(one_of(vec![
            r("N_SCALAR_TYPE"),
            r("N_ARRAY_TYPE"),
            r("N_CALLABLE_TYPE"),
            r("N_ITERABLE_TYPE"),
            r("N_VOID_TYPE"),
            r("N_CLASS_TYPE"),
        ])),
    );

    builder.define(
        "N_SCALAR_TYPE",
        RuleDef::assemble(
            re_cap("((?i:integer|int|double|float|boolean|bool|string))\\b", 1),
            |raw| {
                let word = raw.into_string()?;
                Some(Value::Node(
                    Node::new("N_SCALAR_TYPE").with("type", scalar_type(&word)),
                ))
            },
        ),
    );

    builder.define(
        "N_ARRAY_TYPE",
        RuleDef::assemble(kw("array"), |_| {
            Some(Value::Node(Node::new("N_ARRAY_TYPE")))
        }),
    );

    builder.define(
        "N_CALLABLE_TYPE",
        RuleDef::assemble(kw("callable"), |_| {
            Some(Value::Node(Node::new("N_CALLABLE_TYPE")))
        }),
    );

    builder.define(
        "N_ITERABLE_TYPE",
        RuleDef::assemble(kw("iterable"), |_| {
            Some(Value::Node(Node::new("N_ITERABLE_TYPE")))
        }),
    );

    builder.define(
        "N_VOID_TYPE",
        RuleDef::assemble(kw("void"), |_| {
            Some(Value::Node(Node::new("N_VOID_TYPE")))
        }),
    );

    builder.define(
        "N_CLASS_TYPE",
        RuleDef::node(seq(vec![cap(
            "className",
            re_cap(&format!("({})", path_pattern()), 1),
        )])),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_type_canonicalizes() {
        assert_eq!(scalar_type("Integer"), "int");
        assert_eq!(scalar_type("double"), "float");
        assert_eq!(scalar_type("BOOLEAN"), "bool");
        assert_eq!(scalar_type("string"), "string");
    }
}
