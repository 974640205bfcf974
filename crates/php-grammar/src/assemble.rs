//! Helpers shared by the built-in rule assemblers. Assemblers receive the
//! raw captured value of their rule's component tree and reshape it into
//! the node the downstream contract wants.

use php_node::{Node, Value};

/// Unwrap a capture fragment. Assemblers call this on values whose shape
/// the component tree guarantees; a non-fragment here rejects the match.
pub fn fragment(value: Value) -> Option<Node> {
    value.into_node()
}

/// Collapse the `first`/`rest` fragment produced by
/// [`crate::dsl::comma_list`] into a flat list. `Null` (the whole list
/// was optional and absent) becomes an empty list.
pub fn flatten_list(value: Value) -> Option<Value> {
    match value {
        Value::Null => Some(Value::List(Vec::new())),
        Value::Node(mut frag) => {
            let mut items = vec![frag.take("first")?];
            for entry in frag.take("rest")?.into_list() {
                let mut pair = entry.into_node()?;
                items.push(pair.take("item")?);
            }
            Some(Value::List(items))
        }
        _ => None,
    }
}

/// Unwrap `opt(seq![.., cap(field, ..)])`: the optional wrapper yields
/// either `Null` or a one-field fragment around the interesting capture.
pub fn opt_part(value: Value, field: &str) -> Value {
    match value {
        Value::Node(mut frag) if frag.kind().is_none() => {
            frag.take(field).unwrap_or(Value::Null)
        }
        _ => Value::Null,
    }
}

/// `Null` becomes an empty list; lists pass through.
pub fn list_or_empty(value: Value) -> Value {
    match value {
        Value::Null => Value::List(Vec::new()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_list_of_two() {
        let raw = Node::fragment()
            .with("first", "a")
            .with(
                "rest",
                vec![Value::Node(Node::fragment().with("item", "b"))],
            );
        let flat = flatten_list(Value::Node(raw)).unwrap();
        assert_eq!(flat, Value::List(vec!["a".into(), "b".into()]));
    }

    #[test]
    fn test_flatten_list_absent_is_empty() {
        assert_eq!(flatten_list(Value::Null).unwrap(), Value::List(vec![]));
    }

    #[test]
    fn test_opt_part_unwraps_present_capture() {
        let raw = Value::Node(Node::fragment().with("value", "21"));
        assert_eq!(opt_part(raw, "value"), Value::Str("21".to_string()));
        assert_eq!(opt_part(Value::Null, "value"), Value::Null);
    }
}
