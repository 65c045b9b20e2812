//! The address-space tree's node type and the typed argument model (C1).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

/// Read/write access a method grants to external callers.
///
/// Containers default to `NoValue` on serialization if unset; methods must
/// set it explicitly via their [`MethodSpec`](crate::tree::MethodSpec).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Access {
    NoValue = 0,
    ReadOnly = 1,
    WriteOnly = 2,
    ReadWrite = 3,
}

impl Access {
    pub fn is_readable(self) -> bool {
        matches!(self, Access::ReadOnly | Access::ReadWrite)
    }
}

impl Default for Access {
    fn default() -> Self {
        Access::NoValue
    }
}

/// One OSC type code, or a nested list of codes for array/tuple arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgType {
    Int32,
    Float32,
    OscString,
    Blob,
    Int64,
    TimeTag,
    Double,
    AltString,
    Char,
    Rgba,
    Midi,
    True,
    False,
    Nil,
    Infinitum,
    Nested(Vec<ArgType>),
}

impl ArgType {
    /// The single-character OSC type tag, for the leaf variants.
    fn code(&self) -> Option<char> {
        use ArgType::*;
        Some(match self {
            Int32 => 'i',
            Float32 => 'f',
            OscString => 's',
            Blob => 'b',
            Int64 => 'h',
            TimeTag => 't',
            Double => 'd',
            AltString => 'S',
            Char => 'c',
            Rgba => 'r',
            Midi => 'm',
            True => 'T',
            False => 'F',
            Nil => 'N',
            Infinitum => 'I',
            Nested(_) => return None,
        })
    }

    /// Render the full TYPE string for this argument's type, with nested
    /// lists rendered as `[...]` per spec.md §3/§4.2.
    pub fn type_string(&self) -> String {
        match self {
            ArgType::Nested(types) => {
                let mut s = String::from("[");
                for t in types {
                    s.push_str(&t.type_string());
                }
                s.push(']');
                s
            }
            other => other.code().expect("leaf ArgType always has a code").to_string(),
        }
    }
}

/// A stored argument value, tagged by the same alphabet as [`ArgType`].
///
/// Reuses `rosc`'s payload types for timetag/rgba/midi rather than
/// reinventing them, per spec.md §9's "tagged variant... carrying the
/// payload matching each code."
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Int(i32),
    Float(f32),
    String(String),
    Blob(Vec<u8>),
    Int64(i64),
    TimeTag(rosc::OscTime),
    Double(f64),
    AltString(String),
    Char(char),
    Rgba(rosc::OscColor),
    Midi(rosc::OscMidiMessage),
    True,
    False,
    Nil,
    Infinitum,
    Nested(Vec<ArgValue>),
}

impl ArgValue {
    /// Project this value to JSON, per the VALUE column of spec.md §4.2.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as J;
        match self {
            ArgValue::Int(v) => J::from(*v),
            ArgValue::Float(v) => J::from(*v),
            ArgValue::String(v) | ArgValue::AltString(v) => J::from(v.clone()),
            ArgValue::Blob(v) => J::from(v.clone()),
            ArgValue::Int64(v) => J::from(*v),
            ArgValue::TimeTag(t) => J::from(vec![t.seconds, t.fractional]),
            ArgValue::Double(v) => J::from(*v),
            ArgValue::Char(c) => J::from(c.to_string()),
            ArgValue::Rgba(c) => J::from(vec![c.red, c.green, c.blue, c.alpha]),
            ArgValue::Midi(m) => J::from(vec![m.port, m.status, m.data1, m.data2]),
            ArgValue::True => J::from(true),
            ArgValue::False => J::from(false),
            ArgValue::Nil => J::Null,
            ArgValue::Infinitum => J::from("inf"),
            ArgValue::Nested(values) => {
                J::Array(values.iter().map(ArgValue::to_json).collect())
            }
        }
    }
}

/// Discrete or bounded range for a single argument slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Range {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub vals: Option<Vec<ArgValue>>,
}

impl Range {
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none() && self.vals.is_none()
    }
}

/// Per-argument clip policy; opaque to the core (see GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipMode {
    None,
    Low,
    High,
    Both,
}

/// A single argument slot of a method node.
#[derive(Debug, Clone, Default)]
pub struct Argument {
    pub arg_type: Option<ArgType>,
    pub value: Option<ArgValue>,
    pub range: Option<Range>,
    pub clipmode: Option<ClipMode>,
}

impl Argument {
    pub fn new(arg_type: ArgType) -> Self {
        Self {
            arg_type: Some(arg_type),
            value: None,
            range: None,
            clipmode: None,
        }
    }
}

/// A single point in the OSC address space.
///
/// Per Design Notes §9, `Node` owns its children directly; full paths are
/// reconstructed during traversal rather than walked via a parent
/// back-pointer, which avoids the ownership cycle outright.
#[derive(Debug, Clone, Default)]
pub struct Node {
    pub description: Option<String>,
    pub access: Option<Access>,
    pub tags: Option<Vec<String>>,
    pub critical: Option<bool>,
    pub arguments: Option<Vec<Argument>>,
    pub children: HashMap<String, Node>,
}

impl Node {
    pub fn new() -> Self {
        Self::default()
    }

    /// A node is a container if it has no arguments and at least one child;
    /// a method if it has arguments; empty otherwise. See spec.md §3
    /// invariant 2.
    pub fn is_empty_node(&self) -> bool {
        self.arguments.is_none() && self.children.is_empty() && self.description.is_none()
            && self.access.is_none()
            && self.tags.is_none()
            && self.critical.is_none()
    }

    pub fn is_method(&self) -> bool {
        self.arguments.is_some()
    }

    /// Clear this node's metadata, turning it back into a transient empty
    /// node (used by the cleanup rule in `Tree::remove_method`).
    pub fn clear_metadata(&mut self) {
        self.description = None;
        self.access = None;
        self.tags = None;
        self.critical = None;
        self.arguments = None;
    }

    /// Low-level child insertion exposed for the `DuplicateChild` error path
    /// (spec.md §7 category 4) — `Tree::add_method` never calls this
    /// because it always uses get-or-create.
    pub fn insert_child(&mut self, name: impl Into<String>, child: Node) -> Result<(), crate::error::TreeError> {
        let name = name.into();
        if self.children.contains_key(&name) {
            return Err(crate::error::TreeError::DuplicateChild {
                path: String::new(),
                name,
            });
        }
        self.children.insert(name, child);
        Ok(())
    }
}
