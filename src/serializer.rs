//! Projects a [`Node`] (and its subtree) into the OSCQuery JSON shape (C3).
//!
//! Implemented as a function producing a `serde_json::Map` rather than a
//! `#[derive(Serialize)]` struct: whether `RANGE`/`CLIPMODE`/`VALUE` are
//! emitted depends on a runtime predicate over a `Vec` of per-argument
//! optionals ("at least one non-null entry"), which `skip_serializing_if`
//! can't express at the field level.

use serde_json::{Map, Value};

use crate::node::{Access, Node};

/// The attribute selectors recognized by the HTTP endpoint (spec.md §4.3).
pub const SELECTORS: &[&str] = &[
    "FULL_PATH",
    "CONTENTS",
    "TYPE",
    "ACCESS",
    "RANGE",
    "DESCRIPTION",
    "TAGS",
    "CRITICAL",
    "CLIPMODE",
    "VALUE",
];

/// Serialize `node` (whose full path is `full_path`) to the full OSCQuery
/// JSON object, per the table in spec.md §4.2.
pub fn serialize_node(node: &Node, full_path: &str) -> Map<String, Value> {
    let mut out = Map::new();

    out.insert("FULL_PATH".to_string(), Value::from(full_path));

    if let Some(desc) = &node.description {
        out.insert("DESCRIPTION".to_string(), Value::from(desc.clone()));
    }

    // ACCESS: always present when set, or when the node is a container
    // (no arguments). Containers default to 0 if unset.
    let access = match node.access {
        Some(a) => Some(a),
        None if node.arguments.is_none() => Some(Access::NoValue),
        None => None,
    };
    if let Some(access) = access {
        out.insert("ACCESS".to_string(), Value::from(access as u8));
    }

    if let Some(tags) = &node.tags {
        out.insert(
            "TAGS".to_string(),
            Value::Array(tags.iter().cloned().map(Value::from).collect()),
        );
    }

    if let Some(critical) = node.critical {
        out.insert("CRITICAL".to_string(), Value::from(critical));
    }

    if !node.children.is_empty() {
        let mut contents = Map::new();
        for (name, child) in &node.children {
            let child_path = if full_path == "/" {
                format!("/{name}")
            } else {
                format!("{full_path}/{name}")
            };
            contents.insert(name.clone(), Value::Object(serialize_node(child, &child_path)));
        }
        out.insert("CONTENTS".to_string(), Value::Object(contents));
    }

    if let Some(args) = &node.arguments {
        out.insert("TYPE".to_string(), Value::from(type_string(args)));

        if args.iter().any(|a| a.range.as_ref().is_some_and(|r| !r.is_empty())) {
            let ranges = args
                .iter()
                .map(|a| match &a.range {
                    Some(r) if !r.is_empty() => Value::Object(range_to_json(r)),
                    _ => Value::Null,
                })
                .collect();
            out.insert("RANGE".to_string(), Value::Array(ranges));
        }

        if args.iter().any(|a| a.clipmode.is_some()) {
            let clipmodes = args
                .iter()
                .map(|a| match a.clipmode {
                    Some(c) => Value::from(clipmode_str(c)),
                    None => Value::Null,
                })
                .collect();
            out.insert("CLIPMODE".to_string(), Value::Array(clipmodes));
        }

        // A readable method with every slot unset omits VALUE entirely
        // (the "at least one non-null entry" rule), so `?VALUE` on it
        // yields a bare `null` via `select_attribute`, not `[null, ...]`.
        let readable = access.map(|a| a.is_readable()).unwrap_or(false);
        if readable && args.iter().any(|a| a.value.is_some()) {
            let values = args
                .iter()
                .map(|a| match &a.value {
                    Some(v) => v.to_json(),
                    None => Value::Null,
                })
                .collect();
            out.insert("VALUE".to_string(), Value::Array(values));
        }
    }

    out
}

fn type_string(args: &[crate::node::Argument]) -> String {
    args.iter()
        .map(|a| a.arg_type.as_ref().map(|t| t.type_string()).unwrap_or_default())
        .collect()
}

fn range_to_json(range: &crate::node::Range) -> Map<String, Value> {
    let mut m = Map::new();
    if let Some(min) = range.min {
        m.insert("MIN".to_string(), Value::from(min));
    }
    if let Some(max) = range.max {
        m.insert("MAX".to_string(), Value::from(max));
    }
    if let Some(vals) = &range.vals {
        m.insert(
            "VALS".to_string(),
            Value::Array(vals.iter().map(|v| v.to_json()).collect()),
        );
    }
    m
}

fn clipmode_str(mode: crate::node::ClipMode) -> &'static str {
    use crate::node::ClipMode::*;
    match mode {
        None => "none",
        Low => "low",
        High => "high",
        Both => "both",
    }
}

/// Apply an attribute selector to an already-serialized full node, per
/// spec.md §4.3's "Response shapes": selector absent from the node's
/// projection becomes a `null`-valued key, not an error.
pub fn select_attribute(full: &Map<String, Value>, selector: &str) -> Value {
    full.get(selector).cloned().unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Access, ArgType, Argument, ClipMode, Range};

    #[test]
    fn s1_chatbox_input_shape() {
        let mut node = Node::new();
        node.access = Some(Access::WriteOnly);
        node.arguments = Some(vec![
            Argument::new(ArgType::OscString),
            Argument::new(ArgType::True),
        ]);
        let json = serialize_node(&node, "/chatbox/input");
        assert_eq!(json["FULL_PATH"], "/chatbox/input");
        assert_eq!(json["TYPE"], "sT");
        assert_eq!(json["ACCESS"], 2);
        assert!(!json.contains_key("VALUE"));
    }

    #[test]
    fn s3_range_and_value_present() {
        let mut node = Node::new();
        node.access = Some(Access::ReadWrite);
        let mut arg = Argument::new(ArgType::Float32);
        arg.range = Some(Range { min: Some(0.0), max: Some(1.0), vals: None });
        arg.value = Some(crate::node::ArgValue::Float(0.5));
        node.arguments = Some(vec![arg]);
        let json = serialize_node(&node, "/a/b/c");
        assert_eq!(json["TYPE"], "f");
        assert_eq!(json["ACCESS"], 3);
        assert_eq!(json["RANGE"], serde_json::json!([{"MIN": 0.0, "MAX": 1.0}]));
        assert_eq!(json["VALUE"], serde_json::json!([0.5]));
    }

    #[test]
    fn omits_range_clipmode_value_when_all_null() {
        let mut node = Node::new();
        node.access = Some(Access::ReadWrite);
        node.arguments = Some(vec![Argument::new(ArgType::Int32)]);
        let json = serialize_node(&node, "/x");
        assert!(!json.contains_key("RANGE"));
        assert!(!json.contains_key("CLIPMODE"));
        assert!(!json.contains_key("VALUE"));
    }

    #[test]
    fn value_omitted_for_writeonly_even_if_set() {
        let mut node = Node::new();
        node.access = Some(Access::WriteOnly);
        let mut arg = Argument::new(ArgType::Int32);
        arg.value = Some(crate::node::ArgValue::Int(1));
        node.arguments = Some(vec![arg]);
        let json = serialize_node(&node, "/x");
        assert!(!json.contains_key("VALUE"));
    }

    #[test]
    fn container_defaults_access_zero() {
        let mut node = Node::new();
        node.children.insert("child".to_string(), Node::new());
        let json = serialize_node(&node, "/");
        assert_eq!(json["ACCESS"], 0);
        assert!(json.contains_key("CONTENTS"));
    }

    #[test]
    fn clipmode_serializes_as_lowercase_strings() {
        let mut node = Node::new();
        node.access = Some(Access::ReadWrite);
        let mut arg = Argument::new(ArgType::Int32);
        arg.clipmode = Some(ClipMode::Low);
        node.arguments = Some(vec![arg]);
        let json = serialize_node(&node, "/x");
        assert_eq!(json["CLIPMODE"], serde_json::json!(["low"]));
    }

    #[test]
    fn select_attribute_missing_is_null() {
        let node = Node::new();
        let json = serialize_node(&node, "/x");
        assert_eq!(select_attribute(&json, "VALUE"), Value::Null);
    }
}
