use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// A value captured during a grammar match: either a scalar, an ordered
/// sequence, or a nested node. `Null` is what an optional component that
/// matched nothing contributes.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Str(String),
    List(Vec<Value>),
    Node(Node),
}

/// One AST node: a node-kind tag plus ordered, named fields.
///
/// Nodes produced as part of the public tree always carry a kind
/// (e.g. `N_VARIABLE`); intermediate capture fragments built by a
/// sequence of named captures have `kind: None` until a rule wraps or
/// consumes them. Fragments may still appear in the final tree where the
/// downstream contract calls for a bare `{operator, operand}` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    kind: Option<String>,
    fields: Vec<(String, Value)>,
}

impl Node {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            fields: Vec::new(),
        }
    }

    /// An unnamed capture fragment.
    pub fn fragment() -> Self {
        Self {
            kind: None,
            fields: Vec::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.fields.push((name, value));
        }
    }

    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind.as_deref() == Some(kind)
    }

    /// Tag (or re-tag) this node with a kind.
    pub fn into_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Remove and return a field, if present.
    pub fn take(&mut self, name: &str) -> Option<Value> {
        let idx = self.fields.iter().position(|(n, _)| n == name)?;
        Some(self.fields.remove(idx).1)
    }

    pub fn remove_null_fields(&mut self) {
        self.fields.retain(|(_, v)| !matches!(v, Value::Null));
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn into_node(self) -> Option<Node> {
        match self {
            Value::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn into_list(self) -> Vec<Value> {
        match self {
            Value::List(items) => items,
            Value::Null => Vec::new(),
            other => vec![other],
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Value::Node(node)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

// The downstream contract: a node serializes as a map with `name` first,
// then its fields in capture order. Fragments serialize without `name`.
impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let extra = usize::from(self.kind.is_some());
        let mut map = serializer.serialize_map(Some(self.fields.len() + extra))?;
        if let Some(kind) = &self.kind {
            map.serialize_entry("name", kind)?;
        }
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Str(s) => serializer.serialize_str(s),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Node(node) => node.serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_builder_keeps_field_order() {
        let node = Node::new("N_IF_STATEMENT")
            .with("condition", Node::new("N_VARIABLE").with("variable", "a"))
            .with("consequentStatement", Value::List(vec![]));
        let names: Vec<&str> = node.fields().map(|(n, _)| n).collect();
        assert_eq!(names, ["condition", "consequentStatement"]);
    }

    #[test]
    fn test_set_replaces_existing_field() {
        let mut node = Node::new("N_EXIT").with("status", Value::Null);
        node.set("status", Node::new("N_INTEGER").with("number", "21"));
        assert_eq!(node.len(), 1);
        assert!(node.get("status").unwrap().as_node().is_some());
    }

    #[test]
    fn test_serialized_shape_has_name_first() {
        let node = Node::new("N_PROGRAM").with("statements", Value::List(vec![]));
        let json = serde_json::to_string(&node).unwrap();
        assert_eq!(json, r#"{"name":"N_PROGRAM","statements":[]}"#);
    }

    #[test]
    fn test_fragment_serializes_without_name() {
        let frag = Node::fragment()
            .with("operator", "-")
            .with("operand", Node::new("N_INTEGER").with("number", "4"));
        assert_eq!(
            serde_json::to_value(&frag).unwrap(),
            json!({"operator": "-", "operand": {"name": "N_INTEGER", "number": "4"}})
        );
    }

    #[test]
    fn test_null_field_serializes_as_json_null() {
        let node = Node::new("N_TERNARY").with("consequent", Value::Null);
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({"name": "N_TERNARY", "consequent": null})
        );
    }

    #[test]
    fn test_remove_null_fields() {
        let mut node = Node::new("N_EXIT").with("status", Value::Null);
        node.remove_null_fields();
        assert!(node.is_empty());
    }

    #[test]
    fn test_take_removes_field() {
        let mut node = Node::fragment().with("left", "1").with("right", "2");
        let left = node.take("left").unwrap();
        assert_eq!(left.as_str(), Some("1"));
        assert!(node.get("left").is_none());
        assert!(node.get("right").is_some());
    }
}
