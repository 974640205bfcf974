//! Statements, declarations, and the program rule that alternates
//! between inline HTML and PHP code.

use lazy_static::lazy_static;
use php_cursor::{Cursor, Mode};
use php_node::{Node, Value};
use regex::Regex;

use crate::assemble::{flatten_list, fragment, opt_part};
use crate::dsl::{
    cap, comma_list, custom, end_of_statement, kw, lit, one_of, opt, peek, plus, r, re, re_cap,
    seq, star,
};
use crate::table::GrammarBuilder;
use crate::term::is_reserved;
use crate::{path_pattern, Component, RuleDef, RuleMatcher, IDENT};

/// Statement alternatives valid inside a namespace, in match order.
/// Order is semantic: `goto`/labels sit before the expression statement
/// so `foo:` never half-parses as a constant.
pub(crate) const SCOPED_STATEMENTS: &[&str] = &[
    "N_COMPOUND_STATEMENT",
    "N_IF_STATEMENT",
    "N_WHILE_STATEMENT",
    "N_DO_WHILE_STATEMENT",
    "N_FOR_STATEMENT",
    "N_FOREACH_STATEMENT",
    "N_SWITCH_STATEMENT",
    "N_BREAK_STATEMENT",
    "N_CONTINUE_STATEMENT",
    "N_RETURN_STATEMENT",
    "N_FUNCTION_STATEMENT",
    "N_CLASS_STATEMENT",
    "N_INTERFACE_STATEMENT",
    "N_TRAIT_STATEMENT",
    "N_USE_STATEMENT",
    "N_CONSTANT_STATEMENT",
    "N_STATIC_STATEMENT",
    "N_GLOBAL_STATEMENT",
    "N_UNSET_STATEMENT",
    "N_TRY_STATEMENT",
    "N_THROW_STATEMENT",
    "N_GOTO_STATEMENT",
    "N_LABEL_STATEMENT",
    "N_ECHO_STATEMENT",
    "N_EMPTY_STATEMENT",
    "N_EXPRESSION_STATEMENT",
];

lazy_static! {
    static ref IDENT_RE: Regex =
        Regex::new(&format!("^{IDENT}")).expect("identifier pattern compiles");
    // PHP recognizes the open tag in any casing, `<?PHP` included
    static ref OPEN_TAG_RE: Regex =
        Regex::new("(?i)<\\?php").expect("open tag pattern compiles");
}

/// The program alternates between raw HTML and PHP segments. HTML runs
/// to the next `<?php` open tag (case-insensitive); a `?>` close tag
/// swallows one trailing newline, as the PHP lexer does.
fn match_program(cur: &mut Cursor<'_>, m: &dyn RuleMatcher) -> Option<Value> {
    let mut statements = Vec::new();
    loop {
        match cur.mode() {
            Mode::Html => {
                let html_len = OPEN_TAG_RE
                    .find(cur.rest())
                    .map_or(cur.rest().len(), |tag| tag.start());
                let html = cur.take(html_len);
                if !html.is_empty() {
                    statements.push(Value::Node(
                        Node::new("N_INLINE_HTML_STATEMENT").with("html", html),
                    ));
                }
                if cur.at_end() {
                    break;
                }
                cur.advance("<?php".len());
                cur.set_mode(Mode::Php);
            }
            Mode::Php => {
                cur.skip_ignorable();
                if cur.at_end() {
                    break;
                }
                if cur.eat("?>") {
                    let _ = cur.eat("\r\n") || cur.eat("\n");
                    cur.set_mode(Mode::Html);
                    continue;
                }
                statements.push(m.apply("N_STATEMENT", cur)?);
            }
        }
    }
    Some(Value::Node(
        Node::new("N_PROGRAM").with("statements", statements),
    ))
}

/// Identifier that is not a reserved word; used for goto labels.
fn plain_ident() -> Component {
    custom(|cur, _| {
        if cur.mode() == Mode::Php {
            cur.skip_ignorable();
        }
        let cp = cur.mark();
        let text = cur.match_regex(&IDENT_RE, 0)?;
        if is_reserved(&text) {
            cur.rewind(cp);
            return None;
        }
        Some(Value::Str(text))
    })
}

fn scoped() -> Component {
    r("N_NAMESPACE_SCOPED_STATEMENT")
}

fn path() -> Component {
    re(&path_pattern())
}

fn return_type() -> Component {
    cap("returnType", opt(seq(vec![lit(":"), cap("type", r("N_TYPE"))])))
}

fn set_unless_null(node: &mut Node, field: &str, value: Value) {
    if !value.is_null() {
        node.set(field, value);
    }
}

fn assemble_if(raw: Value) -> Option<Value> {
    let mut frag = fragment(raw)?;
    let condition = frag.take("condition")?;
    let consequent = frag.take("consequent")?;
    let mut alternate = opt_part(frag.take("else")?, "statement");
    for link in frag.take("elseifs")?.into_list().into_iter().rev() {
        let mut link = link.into_node()?;
        alternate = Value::Node(
            Node::new("N_IF_STATEMENT")
                .with("condition", link.take("condition")?)
                .with("consequentStatement", link.take("statement")?)
                .with("alternateStatement", alternate),
        );
    }
    Some(Value::Node(
        Node::new("N_IF_STATEMENT")
            .with("condition", condition)
            .with("consequentStatement", consequent)
            .with("alternateStatement", alternate),
    ))
}

fn assemble_function(raw: Value) -> Option<Value> {
    let mut frag = fragment(raw)?;
    let mut node = Node::new("N_FUNCTION_STATEMENT")
        .with("func", frag.take("func")?)
        .with("args", frag.take("args")?);
    set_unless_null(
        &mut node,
        "returnType",
        opt_part(frag.take("returnType")?, "type"),
    );
    node.set("body", frag.take("body")?);
    Some(Value::Node(node))
}

fn assemble_parameter(raw: Value) -> Option<Value> {
    let mut frag = fragment(raw)?;
    let type_hint = frag.take("type")?;
    let by_ref = !frag.take("ref")?.is_null();
    let mut variable = frag.take("variable")?;
    if by_ref {
        variable = Value::Node(Node::new("N_REFERENCE").with("operand", variable));
    }
    let default = opt_part(frag.take("default")?, "value");
    let mut node = Node::new("N_ARGUMENT");
    set_unless_null(&mut node, "type", type_hint);
    node.set("variable", variable);
    set_unless_null(&mut node, "value", default);
    Some(Value::Node(node))
}

fn modifier_flags(modifiers: &[Value]) -> (String, bool, bool, bool) {
    let mut visibility = String::from("public");
    let (mut is_static, mut is_abstract, mut is_final) = (false, false, false);
    for m in modifiers {
        match m.as_str().map(str::to_ascii_lowercase).as_deref() {
            Some("public") | Some("var") => visibility = "public".to_string(),
            Some("protected") => visibility = "protected".to_string(),
            Some("private") => visibility = "private".to_string(),
            Some("static") => is_static = true,
            Some("abstract") => is_abstract = true,
            Some("final") => is_final = true,
            _ => {}
        }
    }
    (visibility, is_static, is_abstract, is_final)
}

fn assemble_method(raw: Value) -> Option<Value> {
    let mut frag = fragment(raw)?;
    let modifiers = frag.take("modifiers")?.into_list();
    let (visibility, is_static, is_abstract, is_final) = modifier_flags(&modifiers);
    let mut node = Node::new("N_METHOD_DEFINITION")
        .with("methodName", frag.take("methodName")?)
        .with("visibility", visibility)
        .with("static", is_static)
        .with("abstract", is_abstract)
        .with("final", is_final)
        .with("args", frag.take("args")?);
    set_unless_null(
        &mut node,
        "returnType",
        opt_part(frag.take("returnType")?, "type"),
    );
    // an abstract/interface method has `;` for a body
    let body = match frag.take("body")? {
        Value::Str(_) => Value::Null,
        body => body,
    };
    node.set("body", body);
    Some(Value::Node(node))
}

fn assemble_property(raw: Value) -> Option<Value> {
    let mut frag = fragment(raw)?;
    let modifiers = frag.take("modifiers")?.into_list();
    let (visibility, is_static, _, _) = modifier_flags(&modifiers);
    let mut node = Node::new("N_PROPERTY_DEFINITION")
        .with("variable", frag.take("variable")?)
        .with("visibility", visibility)
        .with("static", is_static);
    set_unless_null(&mut node, "value", opt_part(frag.take("default")?, "value"));
    Some(Value::Node(node))
}

fn assemble_class(raw: Value) -> Option<Value> {
    let mut frag = fragment(raw)?;
    let mut node = Node::new("N_CLASS_STATEMENT").with("className", frag.take("className")?);
    if let Value::Str(modifier) = frag.take("modifier")? {
        node.set("type", modifier.to_ascii_lowercase());
    }
    set_unless_null(&mut node, "extend", opt_part(frag.take("extends")?, "name"));
    let implement = flatten_list(opt_part(frag.take("implements")?, "names"))?;
    if !implement.as_list().map_or(true, <[Value]>::is_empty) {
        node.set("implement", implement);
    }
    node.set("members", frag.take("members")?);
    Some(Value::Node(node))
}

pub(crate) fn register(builder: &mut GrammarBuilder) {
    builder.define("N_PROGRAM", RuleDef::matching(custom(match_program)));

    builder.define(
        "N_STATEMENT",
        RuleDef::matching(one_of(vec![
            r("N_NAMESPACE_STATEMENT"),
            scoped(),
        ])),
    );

    builder.define(
        "N_NAMESPACE_SCOPED_STATEMENT",
        RuleDef::matching(one_of(SCOPED_STATEMENTS.iter().map(|n| r(n)).collect())),
    );

    builder.define(
        "N_BRACED_STATEMENTS",
        RuleDef::assemble(
            seq(vec![
                lit("{"),
                cap("statements", star(scoped())),
                lit("}"),
            ]),
            |raw| fragment(raw)?.take("statements"),
        ),
    );

    builder.define(
        "N_COMPOUND_STATEMENT",
        RuleDef::node(seq(vec![cap("statements", r("N_BRACED_STATEMENTS"))])),
    );

    builder.define(
        "N_IF_STATEMENT",
        RuleDef::assemble(
            seq(vec![
                kw("if"),
                lit("("),
                cap("condition", r("N_EXPRESSION")),
                lit(")"),
                cap("consequent", scoped()),
                cap(
                    "elseifs",
                    star(seq(vec![
                        one_of(vec![kw("elseif"), seq(vec![kw("else"), kw("if")])]),
                        lit("("),
                        cap("condition", r("N_EXPRESSION")),
                        lit(")"),
                        cap("statement", scoped()),
                    ])),
                ),
                cap(
                    "else",
                    opt(seq(vec![kw("else"), cap("statement", scoped())])),
                ),
            ]),
            assemble_if,
        ),
    );

    builder.define(
        "N_WHILE_STATEMENT",
        RuleDef::node(seq(vec![
            kw("while"),
            lit("("),
            cap("condition", r("N_EXPRESSION")),
            lit(")"),
            cap("body", scoped()),
        ])),
    );

    builder.define(
        "N_DO_WHILE_STATEMENT",
        RuleDef::node(seq(vec![
            kw("do"),
            cap("body", scoped()),
            kw("while"),
            lit("("),
            cap("condition", r("N_EXPRESSION")),
            lit(")"),
            end_of_statement(),
        ])),
    );

    builder.define(
        "N_FOR_STATEMENT",
        RuleDef::assemble(
            seq(vec![
                kw("for"),
                lit("("),
                cap("initializer", opt(comma_list(r("N_EXPRESSION")))),
                lit(";"),
                cap("condition", opt(comma_list(r("N_EXPRESSION")))),
                lit(";"),
                cap("update", opt(comma_list(r("N_EXPRESSION")))),
                lit(")"),
                cap("body", scoped()),
            ]),
            |raw| {
                let mut frag = fragment(raw)?;
                let initializer = flatten_list(frag.take("initializer")?)?;
                let condition = flatten_list(frag.take("condition")?)?;
                let update = flatten_list(frag.take("update")?)?;
                Some(Value::Node(
                    Node::new("N_FOR_STATEMENT")
                        .with("initializer", initializer)
                        .with("condition", condition)
                        .with("update", update)
                        .with("body", frag.take("body")?),
                ))
            },
        ),
    );

    builder.define(
        "N_FOREACH_STATEMENT",
        RuleDef::assemble(
            seq(vec![
                kw("foreach"),
                lit("("),
                cap("array", r("N_EXPRESSION")),
                kw("as"),
                cap(
                    "kv",
                    opt(seq(vec![cap("key", r("N_VARIABLE")), lit("=>")])),
                ),
                cap(
                    "value",
                    one_of(vec![
                        r("N_VARIABLE_REFERENCE"),
                        r("N_LIST"),
                        r("N_VARIABLE"),
                    ]),
                ),
                lit(")"),
                cap("body", scoped()),
            ]),
            |raw| {
                let mut frag = fragment(raw)?;
                Some(Value::Node(
                    Node::new("N_FOREACH_STATEMENT")
                        .with("array", frag.take("array")?)
                        .with("key", opt_part(frag.take("kv")?, "key"))
                        .with("value", frag.take("value")?)
                        .with("body", frag.take("body")?),
                ))
            },
        ),
    );

    builder.define(
        "N_SWITCH_STATEMENT",
        RuleDef::node(seq(vec![
            kw("switch"),
            lit("("),
            cap("expression", r("N_EXPRESSION")),
            lit(")"),
            lit("{"),
            cap("cases", star(one_of(vec![r("N_CASE"), r("N_DEFAULT_CASE")]))),
            lit("}"),
        ])),
    );

    builder.define(
        "N_CASE",
        RuleDef::node(seq(vec![
            kw("case"),
            cap("expression", r("N_EXPRESSION")),
            one_of(vec![lit(":"), lit(";")]),
            cap("body", star(scoped())),
        ])),
    );

    builder.define(
        "N_DEFAULT_CASE",
        RuleDef::node(seq(vec![
            kw("default"),
            one_of(vec![lit(":"), lit(";")]),
            cap("body", star(scoped())),
        ])),
    );

    builder.define(
        "N_BREAK_STATEMENT",
        RuleDef::node(seq(vec![
            kw("break"),
            cap("levels", opt(r("N_INTEGER"))),
            end_of_statement(),
        ])),
    );

    builder.define(
        "N_CONTINUE_STATEMENT",
        RuleDef::node(seq(vec![
            kw("continue"),
            cap("levels", opt(r("N_INTEGER"))),
            end_of_statement(),
        ])),
    );

    builder.define(
        "N_RETURN_STATEMENT",
        RuleDef::node(seq(vec![
            kw("return"),
            cap("expression", opt(r("N_EXPRESSION"))),
            end_of_statement(),
        ])),
    );

    builder.define(
        "N_ECHO_STATEMENT",
        RuleDef::assemble(
            seq(vec![
                kw("echo"),
                cap("expressions", comma_list(r("N_EXPRESSION"))),
                end_of_statement(),
            ]),
            |raw| {
                let expressions = flatten_list(fragment(raw)?.take("expressions")?)?;
                Some(Value::Node(
                    Node::new("N_ECHO_STATEMENT").with("expressions", expressions),
                ))
            },
        ),
    );

    builder.define(
        "N_EXPRESSION_STATEMENT",
        RuleDef::node(seq(vec![
            cap("expression", r("N_EXPRESSION")),
            end_of_statement(),
        ])),
    );

    builder.define(
        "N_EMPTY_STATEMENT",
        RuleDef::assemble(lit(";"), |_| {
            Some(Value::Node(Node::new("N_EMPTY_STATEMENT")))
        }),
    );

    builder.define(
        "N_THROW_STATEMENT",
        RuleDef::node(seq(vec![
            kw("throw"),
            cap("expression", r("N_EXPRESSION")),
            end_of_statement(),
        ])),
    );

    builder.define(
        "N_TRY_STATEMENT",
        RuleDef::assemble(
            seq(vec![
                kw("try"),
                cap("body", r("N_BRACED_STATEMENTS")),
                cap("catches", star(r("N_CATCH"))),
                cap(
                    "finally",
                    opt(seq(vec![
                        kw("finally"),
                        cap("body", r("N_BRACED_STATEMENTS")),
                    ])),
                ),
            ]),
            |raw| {
                let mut frag = fragment(raw)?;
                Some(Value::Node(
                    Node::new("N_TRY_STATEMENT")
                        .with("body", frag.take("body")?)
                        .with("catches", frag.take("catches")?)
                        .with("finalizer", opt_part(frag.take("finally")?, "body")),
                ))
            },
        ),
    );

    builder.define(
        "N_CATCH",
        RuleDef::matching(seq(vec![
            kw("catch"),
            lit("("),
            cap("type", path()),
            cap("variable", r("N_VARIABLE")),
            lit(")"),
            cap("body", r("N_BRACED_STATEMENTS")),
        ])),
    );

    builder.define(
        "N_GOTO_STATEMENT",
        RuleDef::node(seq(vec![
            kw("goto"),
            cap("label", plain_ident()),
            end_of_statement(),
        ])),
    );

    // the lookahead keeps `Foo::bar()` from half-matching as a label
    builder.define(
        "N_LABEL_STATEMENT",
        RuleDef::node(seq(vec![
            cap("label", plain_ident()),
            peek(re(":(?:$|[^:])")),
            lit(":"),
        ])),
    );

    builder.define(
        "N_STATIC_STATEMENT",
        RuleDef::assemble(
            seq(vec![
                kw("static"),
                cap("variables", comma_list(r("N_STATIC_VARIABLE"))),
                end_of_statement(),
            ]),
            |raw| {
                let variables = flatten_list(fragment(raw)?.take("variables")?)?;
                Some(Value::Node(
                    Node::new("N_STATIC_STATEMENT").with("variables", variables),
                ))
            },
        ),
    );

    builder.define(
        "N_STATIC_VARIABLE",
        RuleDef::assemble(
            seq(vec![
                cap("variable", r("N_VARIABLE")),
                cap("init", opt(seq(vec![lit("="), cap("value", r("N_EXPRESSION"))]))),
            ]),
            |raw| {
                let mut frag = fragment(raw)?;
                Some(Value::Node(
                    Node::fragment()
                        .with("variable", frag.take("variable")?)
                        .with("initializer", opt_part(frag.take("init")?, "value")),
                ))
            },
        ),
    );

    builder.define(
        "N_GLOBAL_STATEMENT",
        RuleDef::assemble(
            seq(vec![
                kw("global"),
                cap("variables", comma_list(r("N_VARIABLE"))),
                end_of_statement(),
            ]),
            |raw| {
                let variables = flatten_list(fragment(raw)?.take("variables")?)?;
                Some(Value::Node(
                    Node::new("N_GLOBAL_STATEMENT").with("variables", variables),
                ))
            },
        ),
    );

    builder.define(
        "N_UNSET_STATEMENT",
        RuleDef::assemble(
            seq(vec![
                kw("unset"),
                lit("("),
                cap("variables", comma_list(r("N_EXPRESSION"))),
                lit(")"),
                end_of_statement(),
            ]),
            |raw| {
                let variables = flatten_list(fragment(raw)?.take("variables")?)?;
                Some(Value::Node(
                    Node::new("N_UNSET_STATEMENT").with("variables", variables),
                ))
            },
        ),
    );

    builder.define(
        "N_CONSTANT_STATEMENT",
        RuleDef::assemble(
            seq(vec![
                kw("const"),
                cap("constants", comma_list(r("N_CONSTANT_SETTING"))),
                end_of_statement(),
            ]),
            |raw| {
                let constants = flatten_list(fragment(raw)?.take("constants")?)?;
                Some(Value::Node(
                    Node::new("N_CONSTANT_STATEMENT").with("constants", constants),
                ))
            },
        ),
    );

    builder.define(
        "N_CONSTANT_SETTING",
        RuleDef::matching(seq(vec![
            cap("constant", plain_ident()),
            lit("="),
            cap("value", r("N_EXPRESSION")),
        ])),
    );

    builder.define(
        "N_USE_STATEMENT",
        RuleDef::assemble(
            seq(vec![
                kw("use"),
                cap("uses", comma_list(r("N_USE_CLAUSE"))),
                end_of_statement(),
            ]),
            |raw| {
                let uses = flatten_list(fragment(raw)?.take("uses")?)?;
                Some(Value::Node(Node::new("N_USE_STATEMENT").with("uses", uses)))
            },
        ),
    );

    builder.define(
        "N_USE_CLAUSE",
        RuleDef::assemble(
            seq(vec![
                cap("source", path()),
                cap("alias", opt(seq(vec![kw("as"), cap("name", plain_ident())]))),
            ]),
            |raw| {
                let mut frag = fragment(raw)?;
                let mut clause = Node::fragment().with("source", frag.take("source")?);
                set_unless_null(&mut clause, "alias", opt_part(frag.take("alias")?, "name"));
                Some(Value::Node(clause))
            },
        ),
    );

    builder.define(
        "N_NAMESPACE_STATEMENT",
        RuleDef::assemble(
            seq(vec![
                kw("namespace"),
                cap("namespace", opt(path())),
                cap(
                    "body",
                    one_of(vec![
                        r("N_BRACED_STATEMENTS"),
                        seq(vec![lit(";"), cap("statements", star(scoped()))]),
                    ]),
                ),
            ]),
            |raw| {
                let mut frag = fragment(raw)?;
                let namespace = match frag.take("namespace")? {
                    Value::Str(name) => name,
                    _ => String::new(),
                };
                let statements = match frag.take("body")? {
                    Value::Node(mut inner) => inner.take("statements")?,
                    list => list,
                };
                Some(Value::Node(
                    Node::new("N_NAMESPACE_STATEMENT")
                        .with("namespace", namespace)
                        .with("statements", statements),
                ))
            },
        ),
    );

    // ---- functions and parameters ----

    builder.define(
        "N_FUNCTION_STATEMENT",
        RuleDef::assemble(
            seq(vec![
                kw("function"),
                opt(lit("&")),
                cap("func", plain_ident()),
                cap("args", r("N_PARAM_LIST")),
                return_type(),
                cap("body", r("N_BRACED_STATEMENTS")),
            ]),
            assemble_function,
        ),
    );

    builder.define(
        "N_PARAM_LIST",
        RuleDef::assemble(
            seq(vec![
                lit("("),
                cap("params", opt(comma_list(r("N_PARAMETER")))),
                lit(")"),
            ]),
            |raw| flatten_list(fragment(raw)?.take("params")?),
        ),
    );

    builder.define(
        "N_PARAMETER",
        RuleDef::assemble(
            seq(vec![
                cap("type", opt(r("N_TYPE"))),
                cap("ref", opt(lit("&"))),
                cap("variable", r("N_VARIABLE")),
                cap(
                    "default",
                    opt(seq(vec![lit("="), cap("value", r("N_EXPRESSION"))])),
                ),
            ]),
            assemble_parameter,
        ),
    );

    // ---- classes, interfaces, traits ----

    builder.define(
        "N_CLASS_STATEMENT",
        RuleDef::assemble(
            seq(vec![
                cap("modifier", opt(re_cap("((?i:abstract|final))\\b", 1))),
                kw("class"),
                cap("className", plain_ident()),
                cap(
                    "extends",
                    opt(seq(vec![kw("extends"), cap("name", path())])),
                ),
                cap(
                    "implements",
                    opt(seq(vec![
                        kw("implements"),
                        cap("names", comma_list(path())),
                    ])),
                ),
                lit("{"),
                cap("members", star(r("N_CLASS_MEMBER"))),
                lit("}"),
            ]),
            assemble_class,
        ),
    );

    builder.define(
        "N_INTERFACE_STATEMENT",
        RuleDef::assemble(
            seq(vec![
                kw("interface"),
                cap("interfaceName", plain_ident()),
                cap(
                    "extends",
                    opt(seq(vec![kw("extends"), cap("names", comma_list(path()))])),
                ),
                lit("{"),
                cap("members", star(r("N_CLASS_MEMBER"))),
                lit("}"),
            ]),
            |raw| {
                let mut frag = fragment(raw)?;
                let mut node =
                    Node::new("N_INTERFACE_STATEMENT").with("interfaceName", frag.take("interfaceName")?);
                let extend = flatten_list(opt_part(frag.take("extends")?, "names"))?;
                if !extend.as_list().map_or(true, <[Value]>::is_empty) {
                    node.set("extend", extend);
                }
                node.set("members", frag.take("members")?);
                Some(Value::Node(node))
            },
        ),
    );

    builder.define(
        "N_TRAIT_STATEMENT",
        RuleDef::node(seq(vec![
            kw("trait"),
            cap("traitName", plain_ident()),
            lit("{"),
            cap("members", star(r("N_CLASS_MEMBER"))),
            lit("}"),
        ])),
    );

    builder.define(
        "N_CLASS_MEMBER",
        RuleDef::matching(one_of(vec![
            r("N_USE_TRAIT_STATEMENT"),
            r("N_CLASS_CONSTANT_DEFINITION"),
            r("N_METHOD_DEFINITION"),
            r("N_PROPERTY_DEFINITION"),
        ])),
    );

    builder.define(
        "N_USE_TRAIT_STATEMENT",
        RuleDef::assemble(
            seq(vec![
                kw("use"),
                cap("traitNames", comma_list(path())),
                end_of_statement(),
            ]),
            |raw| {
                let names = flatten_list(fragment(raw)?.take("traitNames")?)?;
                Some(Value::Node(
                    Node::new("N_USE_TRAIT_STATEMENT").with("traitNames", names),
                ))
            },
        ),
    );

    builder.define(
        "N_CLASS_CONSTANT_DEFINITION",
        RuleDef::assemble(
            seq(vec![
                kw("const"),
                cap("constants", comma_list(r("N_CONSTANT_SETTING"))),
                end_of_statement(),
            ]),
            |raw| {
                let constants = flatten_list(fragment(raw)?.take("constants")?)?;
                Some(Value::Node(
                    Node::new("N_CLASS_CONSTANT_DEFINITION").with("constants", constants),
                ))
            },
        ),
    );

    builder.define(
        "N_METHOD_DEFINITION",
        RuleDef::assemble(
            seq(vec![
                cap(
                    "modifiers",
                    star(re_cap(
                        "((?i:public|protected|private|static|abstract|final))\\b",
                        1,
                    )),
                ),
                kw("function"),
                opt(lit("&")),
                cap("methodName", re(IDENT)),
                cap("args", r("N_PARAM_LIST")),
                return_type(),
                cap("body", one_of(vec![r("N_BRACED_STATEMENTS"), lit(";")])),
            ]),
            assemble_method,
        ),
    );

    builder.define(
        "N_PROPERTY_DEFINITION",
        RuleDef::assemble(
            seq(vec![
                cap(
                    "modifiers",
                    plus(re_cap(
                        "((?i:public|protected|private|static|var))\\b",
                        1,
                    )),
                ),
                cap("variable", r("N_VARIABLE")),
                cap(
                    "default",
                    opt(seq(vec![lit("="), cap("value", r("N_EXPRESSION"))])),
                ),
                end_of_statement(),
            ]),
            assemble_property,
        ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_flags_default_to_public() {
        let (visibility, is_static, is_abstract, is_final) = modifier_flags(&[]);
        assert_eq!(visibility, "public");
        assert!(!is_static && !is_abstract && !is_final);
    }

    #[test]
    fn test_modifier_flags_read_case_insensitively() {
        let mods: Vec<Value> = vec!["Private".into(), "STATIC".into(), "final".into()];
        let (visibility, is_static, _, is_final) = modifier_flags(&mods);
        assert_eq!(visibility, "private");
        assert!(is_static);
        assert!(is_final);
    }

    #[test]
    fn test_var_modifier_is_public() {
        let mods: Vec<Value> = vec!["var".into()];
        let (visibility, is_static, _, _) = modifier_flags(&mods);
        assert_eq!(visibility, "public");
        assert!(!is_static);
    }

    #[test]
    fn test_scoped_statement_order_tries_labels_before_expressions() {
        let label = SCOPED_STATEMENTS
            .iter()
            .position(|n| *n == "N_LABEL_STATEMENT")
            .unwrap();
        let expr = SCOPED_STATEMENTS
            .iter()
            .position(|n| *n == "N_EXPRESSION_STATEMENT")
            .unwrap();
        assert!(label < expr);
    }
}
