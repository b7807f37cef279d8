//! Node and edge shapes for the company relationship graph.
//!
//! Property maps only ever hold values that were actually supplied, so
//! merging one into an existing map is a plain insert: absent keys leave
//! previously stored values untouched.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeLabel {
    Company,
    Person,
    Investor,
    Market,
}

impl NodeLabel {
    pub const ALL: [NodeLabel; 4] = [
        NodeLabel::Company,
        NodeLabel::Person,
        NodeLabel::Investor,
        NodeLabel::Market,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeLabel::Company => "Company",
            NodeLabel::Person => "Person",
            NodeLabel::Investor => "Investor",
            NodeLabel::Market => "Market",
        }
    }
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EdgeKind {
    Founded,
    Leads,
    PreviouslyAt,
    InvestedIn,
    CompetesWith,
    Acquired,
    OperatesIn,
    PartnersWith,
}

impl EdgeKind {
    pub fn rel_type(&self) -> &'static str {
        match self {
            EdgeKind::Founded => "FOUNDED",
            EdgeKind::Leads => "LEADS",
            EdgeKind::PreviouslyAt => "PREVIOUSLY_AT",
            EdgeKind::InvestedIn => "INVESTED_IN",
            EdgeKind::CompetesWith => "COMPETES_WITH",
            EdgeKind::Acquired => "ACQUIRED",
            EdgeKind::OperatesIn => "OPERATES_IN",
            EdgeKind::PartnersWith => "PARTNERS_WITH",
        }
    }

    /// The (from, to) labels this relationship connects.
    pub fn endpoints(&self) -> (NodeLabel, NodeLabel) {
        use NodeLabel::*;
        match self {
            EdgeKind::Founded | EdgeKind::Leads | EdgeKind::PreviouslyAt => (Person, Company),
            EdgeKind::InvestedIn => (Investor, Company),
            EdgeKind::OperatesIn => (Company, Market),
            EdgeKind::CompetesWith | EdgeKind::Acquired | EdgeKind::PartnersWith => {
                (Company, Company)
            }
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.rel_type())
    }
}

/// Nodes are unique by (label, name). The name is matched exactly, so
/// `"Acme"` and `"acme"` are different nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey {
    pub label: NodeLabel,
    pub name: String,
}

impl NodeKey {
    pub fn new(label: NodeLabel, name: impl Into<String>) -> Self {
        Self {
            label,
            name: name.into(),
        }
    }

    pub fn company(name: impl Into<String>) -> Self {
        Self::new(NodeLabel::Company, name)
    }

    pub fn person(name: impl Into<String>) -> Self {
        Self::new(NodeLabel::Person, name)
    }

    pub fn investor(name: impl Into<String>) -> Self {
        Self::new(NodeLabel::Investor, name)
    }

    pub fn market(name: impl Into<String>) -> Self {
        Self::new(NodeLabel::Market, name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<&str> for PropValue {
    fn from(v: &str) -> Self {
        PropValue::Text(v.to_string())
    }
}

impl From<String> for PropValue {
    fn from(v: String) -> Self {
        PropValue::Text(v)
    }
}

impl From<i64> for PropValue {
    fn from(v: i64) -> Self {
        PropValue::Int(v)
    }
}

impl From<i32> for PropValue {
    fn from(v: i32) -> Self {
        PropValue::Int(v as i64)
    }
}

impl From<f64> for PropValue {
    fn from(v: f64) -> Self {
        PropValue::Float(v)
    }
}

impl From<bool> for PropValue {
    fn from(v: bool) -> Self {
        PropValue::Bool(v)
    }
}

pub type Props = BTreeMap<String, PropValue>;

/// Last-write-wins per key; keys missing from `incoming` are kept.
pub fn merge_props(existing: &mut Props, incoming: &Props) {
    for (k, v) in incoming {
        existing.insert(k.clone(), v.clone());
    }
}

fn set_text(props: &mut Props, key: &str, value: &str) {
    let value = value.trim();
    if !value.is_empty() {
        props.insert(key.to_string(), PropValue::Text(value.to_string()));
    }
}

fn set_opt<V: Into<PropValue>>(props: &mut Props, key: &str, value: Option<V>) {
    if let Some(v) = value {
        props.insert(key.to_string(), v.into());
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeSpec {
    pub key: NodeKey,
    pub props: Props,
}

impl NodeSpec {
    pub fn new(key: NodeKey) -> Self {
        Self {
            key,
            props: Props::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<PropValue>) -> Self {
        self.props.insert(key.to_string(), value.into());
        self
    }

    /// Blank strings are treated as not supplied.
    pub fn with_text(mut self, key: &str, value: &str) -> Self {
        set_text(&mut self.props, key, value);
        self
    }

    pub fn with_opt<V: Into<PropValue>>(mut self, key: &str, value: Option<V>) -> Self {
        set_opt(&mut self.props, key, value);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeSpec {
    pub kind: EdgeKind,
    pub from: NodeKey,
    pub to: NodeKey,
    pub props: Props,
}

impl EdgeSpec {
    pub fn new(kind: EdgeKind, from: NodeKey, to: NodeKey) -> Self {
        Self {
            kind,
            from,
            to,
            props: Props::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<PropValue>) -> Self {
        self.props.insert(key.to_string(), value.into());
        self
    }

    pub fn with_text(mut self, key: &str, value: &str) -> Self {
        set_text(&mut self.props, key, value);
        self
    }

    pub fn with_opt<V: Into<PropValue>>(mut self, key: &str, value: Option<V>) -> Self {
        set_opt(&mut self.props, key, value);
        self
    }

    /// Endpoint labels must match the relationship and both names must be set.
    pub fn validate(&self) -> Result<(), GraphError> {
        let (from_label, to_label) = self.kind.endpoints();
        let invalid = |reason: String| GraphError::InvalidEdge {
            kind: self.kind.rel_type(),
            reason,
        };
        if self.from.label != from_label || self.to.label != to_label {
            return Err(invalid(format!(
                "expected {from_label} -> {to_label}, got {} -> {}",
                self.from.label, self.to.label
            )));
        }
        if self.from.name.trim().is_empty() || self.to.name.trim().is_empty() {
            return Err(invalid("endpoint name is empty".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GraphWrite {
    Node(NodeSpec),
    Edge(EdgeSpec),
}

impl GraphWrite {
    pub fn describe(&self) -> String {
        match self {
            GraphWrite::Node(n) => format!("{}({})", n.key.label, n.key.name),
            GraphWrite::Edge(e) => format!("({})-[{}]->({})", e.from.name, e.kind, e.to.name),
        }
    }
}
