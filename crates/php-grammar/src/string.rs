//! String literals and the interpolation sub-lexer. Quoted strings and
//! heredocs are scanned character by character rather than declaratively:
//! escape processing and the `$`/`${`/`{$` interpolation forms are a
//! small state machine, with `{$...}` re-entering the expression grammar
//! through the matcher seam.

use lazy_static::lazy_static;
use php_cursor::{Cursor, Mode};
use php_node::{Node, Value};
use regex::Regex;

use crate::dsl::custom;
use crate::table::GrammarBuilder;
use crate::{RuleDef, RuleMatcher, IDENT};

lazy_static! {
    static ref IDENT_RE: Regex =
        Regex::new(&format!("^{IDENT}")).expect("identifier pattern compiles");
    static ref SIMPLE_VAR_RE: Regex =
        Regex::new(&format!("^\\$({IDENT})")).expect("variable pattern compiles");
    static ref SIMPLE_INDEX_RE: Regex =
        Regex::new("^-?\\d+").expect("index pattern compiles");
    static ref HEREDOC_OPEN_RE: Regex = Regex::new(&format!(
        "^<<<[ \\t]*(?:'({IDENT})'|\"({IDENT})\"|({IDENT}))\\r?\\n"
    ))
    .expect("heredoc pattern compiles");
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || !c.is_ascii()
}

fn literal_node(text: String) -> Value {
    Value::Node(Node::new("N_STRING_LITERAL").with("string", text))
}

/// A string with no interpolation stays a plain literal; one single
/// interpolated part is handed through undecorated.
fn finish_parts(mut parts: Vec<Value>) -> Value {
    match parts.len() {
        0 => literal_node(String::new()),
        1 => parts.remove(0),
        _ => Value::Node(Node::new("N_STRING_EXPRESSION").with("parts", parts)),
    }
}

/// Process one double-quoted escape sequence. The cursor sits on the
/// backslash; unknown sequences keep the backslash verbatim.
fn push_escape(cur: &mut Cursor<'_>, out: &mut String) {
    cur.bump_char();
    let Some(c) = cur.peek_char() else {
        out.push('\\');
        return;
    };
    match c {
        'n' => {
            out.push('\n');
            cur.bump_char();
        }
        'r' => {
            out.push('\r');
            cur.bump_char();
        }
        't' => {
            out.push('\t');
            cur.bump_char();
        }
        'v' => {
            out.push('\x0B');
            cur.bump_char();
        }
        'e' => {
            out.push('\x1B');
            cur.bump_char();
        }
        'f' => {
            out.push('\x0C');
            cur.bump_char();
        }
        '\\' | '$' | '"' => {
            out.push(c);
            cur.bump_char();
        }
        'x' => {
            cur.bump_char();
            let mut value = 0u32;
            let mut digits = 0;
            while digits < 2 {
                match cur.peek_char().and_then(|d| d.to_digit(16)) {
                    Some(d) => {
                        value = value * 16 + d;
                        cur.bump_char();
                        digits += 1;
                    }
                    None => break,
                }
            }
            if digits == 0 {
                out.push_str("\\x");
            } else {
                out.push(value as u8 as char);
            }
        }
        '0'..='7' => {
            let mut value = 0u32;
            let mut digits = 0;
            while digits < 3 {
                match cur.peek_char().and_then(|d| d.to_digit(8)) {
                    Some(d) => {
                        value = value * 8 + d;
                        cur.bump_char();
                        digits += 1;
                    }
                    None => break,
                }
            }
            out.push((value as u8) as char);
        }
        _ => {
            out.push('\\');
            out.push(c);
            cur.bump_char();
        }
    }
}

/// `$name` plus at most one simple dereference: `$a->prop` or `$a[key]`.
/// A malformed dereference falls back to the bare variable with the rest
/// kept as literal text.
fn scan_simple_variable(cur: &mut Cursor<'_>) -> Option<Value> {
    let name = cur.match_regex(&SIMPLE_VAR_RE, 1)?;
    let mut expr = Value::Node(Node::new("N_VARIABLE").with("variable", name));
    if cur.starts_with("->") {
        let cp = cur.mark();
        cur.advance(2);
        match cur.match_regex(&IDENT_RE, 0) {
            Some(prop) => {
                expr = Value::Node(
                    Node::new("N_OBJECT_PROPERTY")
                        .with("object", expr)
                        .with("property", Node::new("N_STRING").with("string", prop)),
                );
            }
            None => cur.rewind(cp),
        }
    } else if cur.starts_with("[") {
        let cp = cur.mark();
        cur.advance(1);
        match scan_simple_index(cur) {
            Some(index) if cur.eat("]") => {
                expr = Value::Node(
                    Node::new("N_ARRAY_INDEX")
                        .with("array", expr)
                        .with("index", index),
                );
            }
            _ => cur.rewind(cp),
        }
    }
    Some(expr)
}

/// Index forms the simple syntax allows: `$arr[0]`, `$arr[-1]`,
/// `$arr[$i]`, and the unquoted `$arr[key]` (a string key).
fn scan_simple_index(cur: &mut Cursor<'_>) -> Option<Value> {
    if let Some(name) = cur.match_regex(&SIMPLE_VAR_RE, 1) {
        return Some(Value::Node(Node::new("N_VARIABLE").with("variable", name)));
    }
    if let Some(number) = cur.match_regex(&SIMPLE_INDEX_RE, 0) {
        return Some(Value::Node(Node::new("N_INTEGER").with("number", number)));
    }
    let word = cur.match_regex(&IDENT_RE, 0)?;
    Some(literal_node(word))
}

/// After `${` has been consumed: a bare name closes back to a direct
/// variable; anything richer names the variable through an expression.
fn scan_dollar_brace(cur: &mut Cursor<'_>, m: &dyn RuleMatcher) -> Option<Value> {
    let cp = cur.mark();
    if let Some(name) = cur.match_regex(&IDENT_RE, 0) {
        if cur.eat("}") {
            return Some(Value::Node(Node::new("N_VARIABLE").with("variable", name)));
        }
        cur.rewind(cp);
    }
    let expression = m.apply("N_EXPRESSION", cur)?;
    if !cur.eat("}") {
        return None;
    }
    Some(Value::Node(
        Node::new("N_VARIABLE_EXPRESSION").with("expression", expression),
    ))
}

enum Boundary {
    /// Scan up to an unescaped `"`; running out of input is a failure.
    DoubleQuote,
    /// Scan to the end of the (sub-)cursor's input.
    Eof,
}

fn scan_parts(
    cur: &mut Cursor<'_>,
    m: &dyn RuleMatcher,
    boundary: Boundary,
) -> Option<Vec<Value>> {
    let mut parts = Vec::new();
    let mut text = String::new();
    let flush = |text: &mut String, parts: &mut Vec<Value>| {
        if !text.is_empty() {
            parts.push(literal_node(std::mem::take(text)));
        }
    };
    loop {
        let c = match cur.peek_char() {
            Some(c) => c,
            None => match boundary {
                Boundary::Eof => break,
                Boundary::DoubleQuote => return None,
            },
        };
        if matches!(boundary, Boundary::DoubleQuote) && c == '"' {
            cur.bump_char();
            break;
        }
        if c == '\\' {
            push_escape(cur, &mut text);
            continue;
        }
        if c == '$' {
            if SIMPLE_VAR_RE.is_match(cur.rest()) {
                flush(&mut text, &mut parts);
                parts.push(scan_simple_variable(cur)?);
                continue;
            }
            if cur.starts_with("${") {
                flush(&mut text, &mut parts);
                cur.advance(2);
                parts.push(scan_dollar_brace(cur, m)?);
                continue;
            }
            // a `$` not opening anything, e.g. the first of `$$`
            text.push('$');
            cur.bump_char();
            continue;
        }
        if c == '{' && cur.starts_with("{$") {
            flush(&mut text, &mut parts);
            cur.advance(1);
            let expression = m.apply("N_EXPRESSION", cur)?;
            if !cur.eat("}") {
                return None;
            }
            parts.push(expression);
            continue;
        }
        text.push(c);
        cur.bump_char();
    }
    flush(&mut text, &mut parts);
    Some(parts)
}

fn match_quoted_string(cur: &mut Cursor<'_>, m: &dyn RuleMatcher) -> Option<Value> {
    if cur.mode() == Mode::Php {
        cur.skip_ignorable();
    }
    if cur.eat("'") {
        let mut text = String::new();
        loop {
            match cur.bump_char()? {
                '\'' => break,
                '\\' => match cur.peek_char() {
                    Some(c @ ('\\' | '\'')) => {
                        text.push(c);
                        cur.bump_char();
                    }
                    _ => text.push('\\'),
                },
                c => text.push(c),
            }
        }
        return Some(literal_node(text));
    }
    if cur.eat("\"") {
        let parts = scan_parts(cur, m, Boundary::DoubleQuote)?;
        return Some(finish_parts(parts));
    }
    cur.note_failure("N_STRING_LITERAL");
    None
}

fn match_heredoc(cur: &mut Cursor<'_>, m: &dyn RuleMatcher) -> Option<Value> {
    if cur.mode() == Mode::Php {
        cur.skip_ignorable();
    }
    let Some(caps) = HEREDOC_OPEN_RE.captures(cur.rest()) else {
        cur.note_failure("N_HEREDOC");
        return None;
    };
    let open_len = caps.get(0).map(|g| g.end())?;
    let (label, nowdoc) = match (caps.get(1), caps.get(2), caps.get(3)) {
        (Some(l), _, _) => (l.as_str().to_string(), true),
        (_, Some(l), _) => (l.as_str().to_string(), false),
        (_, _, Some(l)) => (l.as_str().to_string(), false),
        _ => return None,
    };

    let body_start = cur.pos() + open_len;
    let rest = &cur.source()[body_start..];

    // The terminator is the label at the start of its own line, followed
    // by nothing identifier-like.
    let mut line_start = 0;
    let (body_end, label_start) = loop {
        let line_end = rest[line_start..].find('\n').map(|i| line_start + i);
        let line = &rest[line_start..line_end.unwrap_or(rest.len())];
        let line = line.strip_suffix('\r').unwrap_or(line);
        if let Some(tail) = line.strip_prefix(label.as_str()) {
            if tail.chars().next().map_or(true, |c| !is_ident_char(c)) {
                break (line_start.saturating_sub(1), line_start);
            }
        }
        match line_end {
            Some(e) => line_start = e + 1,
            None => {
                cur.note_failure("N_HEREDOC");
                return None;
            }
        }
    };

    let body = rest[..body_end].strip_suffix('\r').unwrap_or(&rest[..body_end]);
    let value = if nowdoc {
        literal_node(body.to_string())
    } else {
        let mut sub = Cursor::new(body);
        sub.set_mode(Mode::Php);
        let parts = scan_parts(&mut sub, m, Boundary::Eof)?;
        finish_parts(parts)
    };

    cur.advance(open_len + label_start + label.len());
    Some(value)
}

pub(crate) fn register(builder: &mut GrammarBuilder) {
    builder.define("N_STRING_LITERAL", RuleDef::matching(custom(match_quoted_string)));
    builder.define("N_HEREDOC", RuleDef::matching(custom(match_heredoc)));
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoRules;

    impl RuleMatcher for NoRules {
        fn apply(&self, _rule: &str, _cur: &mut Cursor<'_>) -> Option<Value> {
            None
        }
    }

    fn php_cursor(src: &str) -> Cursor<'_> {
        let mut cur = Cursor::new(src);
        cur.set_mode(Mode::Php);
        cur
    }

    fn literal(src: &str) -> String {
        let mut cur = php_cursor(src);
        let value = match_quoted_string(&mut cur, &NoRules).expect("string parses");
        let node = value.into_node().expect("literal node");
        assert!(node.is_kind("N_STRING_LITERAL"), "got {:?}", node.kind());
        let mut node = node;
        node.take("string").unwrap().into_string().unwrap()
    }

    #[test]
    fn test_single_quoted_escapes() {
        assert_eq!(literal(r"'a\'b\\c\nd'"), "a'b\\c\\nd");
    }

    #[test]
    fn test_double_quoted_escapes() {
        assert_eq!(literal(r#""a\tb\x41\101\q""#), "a\tbAA\\q");
    }

    #[test]
    fn test_escaped_dollar_stays_literal() {
        assert_eq!(literal(r#""\$name""#), "$name");
    }

    #[test]
    fn test_lone_dollar_is_literal() {
        assert_eq!(literal(r#""price: $ and $-""#), "price: $ and $-");
    }

    #[test]
    fn test_simple_variable_part() {
        let mut cur = php_cursor(r#""x $name y""#);
        let value = match_quoted_string(&mut cur, &NoRules).unwrap();
        let node = value.into_node().unwrap();
        assert!(node.is_kind("N_STRING_EXPRESSION"));
        let mut node = node;
        let parts = node.take("parts").unwrap().into_list();
        assert_eq!(parts.len(), 3);
        assert!(parts[1].as_node().unwrap().is_kind("N_VARIABLE"));
    }

    #[test]
    fn test_single_variable_string_flattens() {
        let mut cur = php_cursor(r#""$name""#);
        let value = match_quoted_string(&mut cur, &NoRules).unwrap();
        assert!(value.as_node().unwrap().is_kind("N_VARIABLE"));
    }

    #[test]
    fn test_simple_property_dereference() {
        let mut cur = php_cursor(r#""$user->name!""#);
        let value = match_quoted_string(&mut cur, &NoRules).unwrap();
        let mut node = value.into_node().unwrap();
        let parts = node.take("parts").unwrap().into_list();
        assert!(parts[0].as_node().unwrap().is_kind("N_OBJECT_PROPERTY"));
        assert_eq!(parts[1].as_node().unwrap().get("string").unwrap().as_str(), Some("!"));
    }

    #[test]
    fn test_simple_index_forms() {
        for (src, kind) in [
            (r#""$a[0]""#, "N_INTEGER"),
            (r#""$a[-1]""#, "N_INTEGER"),
            (r#""$a[$i]""#, "N_VARIABLE"),
            (r#""$a[key]""#, "N_STRING_LITERAL"),
        ] {
            let mut cur = php_cursor(src);
            let value = match_quoted_string(&mut cur, &NoRules).unwrap();
            let node = value.into_node().unwrap();
            assert!(node.is_kind("N_ARRAY_INDEX"), "{src}");
            assert_eq!(node.get("index").unwrap().as_node().unwrap().kind(), Some(kind));
        }
    }

    #[test]
    fn test_dollar_brace_bare_name() {
        let mut cur = php_cursor(r#""${name}""#);
        let value = match_quoted_string(&mut cur, &NoRules).unwrap();
        let node = value.into_node().unwrap();
        assert!(node.is_kind("N_VARIABLE"));
        assert_eq!(node.get("variable").unwrap().as_str(), Some("name"));
    }

    #[test]
    fn test_double_dollar_keeps_first_literal() {
        let mut cur = php_cursor(r#""$$name""#);
        let value = match_quoted_string(&mut cur, &NoRules).unwrap();
        let mut node = value.into_node().unwrap();
        assert!(node.is_kind("N_STRING_EXPRESSION"));
        let parts = node.take("parts").unwrap().into_list();
        assert_eq!(parts[0].as_node().unwrap().get("string").unwrap().as_str(), Some("$"));
        assert!(parts[1].as_node().unwrap().is_kind("N_VARIABLE"));
    }

    #[test]
    fn test_unterminated_double_quote_fails() {
        let mut cur = php_cursor(r#""never ends"#);
        assert!(match_quoted_string(&mut cur, &NoRules).is_none());
    }

    #[test]
    fn test_nowdoc_is_verbatim() {
        let src = "<<<'EOT'\nno $vars here\\n\nEOT;";
        let mut cur = php_cursor(src);
        let value = match_heredoc(&mut cur, &NoRules).unwrap();
        let mut node = value.into_node().unwrap();
        assert!(node.is_kind("N_STRING_LITERAL"));
        assert_eq!(
            node.take("string").unwrap().into_string().unwrap(),
            "no $vars here\\n"
        );
        assert!(cur.starts_with(";"));
    }

    #[test]
    fn test_heredoc_interpolates() {
        let src = "<<<EOT\nhello $name\nEOT;";
        let mut cur = php_cursor(src);
        let value = match_heredoc(&mut cur, &NoRules).unwrap();
        let mut node = value.into_node().unwrap();
        assert!(node.is_kind("N_STRING_EXPRESSION"));
        let parts = node.take("parts").unwrap().into_list();
        assert_eq!(parts.len(), 2);
        assert!(parts[1].as_node().unwrap().is_kind("N_VARIABLE"));
    }

    #[test]
    fn test_empty_heredoc_body() {
        let src = "<<<EOT\nEOT;";
        let mut cur = php_cursor(src);
        let value = match_heredoc(&mut cur, &NoRules).unwrap();
        let mut node = value.into_node().unwrap();
        assert_eq!(node.take("string").unwrap().into_string().unwrap(), "");
    }
}
