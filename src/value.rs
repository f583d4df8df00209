//! Attribute values
//!
//! A node's attribute bag maps names to [`Value`]s: null, scalars,
//! identifiers, or arbitrarily nested lists/maps of the same. The set of
//! storable shapes is closed by the enum itself; [`validate`] only has to
//! reject the shapes that would break value equality (non-finite floats).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};
use crate::id::{BranchId, NodeId, NodeRef, RevisionId};

/// Attribute bag of a node, ordered by name
pub type Attributes = BTreeMap<String, Value>;

/// Value stored in a node attribute
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    /// No value
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    NodeRef(NodeRef),
    BranchId(BranchId),
    RevisionId(RevisionId),
    NodeId(NodeId),
    /// Ordered sequence
    List(Vec<Value>),
    /// Keyed mapping
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// True for `Null`
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Boolean payload
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer payload
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// String payload
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Node reference payload
    pub fn as_node_ref(&self) -> Option<NodeRef> {
        match self {
            Value::NodeRef(r) => Some(*r),
            _ => None,
        }
    }

    /// List payload
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Map payload
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Render as JSON; identifiers become their canonical strings
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(v) => Json::from(*v),
            Value::Float(v) => serde_json::Number::from_f64(*v)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Text(s) => Json::String(s.clone()),
            Value::NodeRef(id) => Json::String(id.to_string()),
            Value::BranchId(id) => Json::String(id.to_string()),
            Value::RevisionId(id) => Json::String(id.to_string()),
            Value::NodeId(id) => Json::String(id.to_string()),
            Value::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

/// Check that `value` may be stored under attribute `name`.
pub fn validate(name: &str, value: &Value) -> Result<()> {
    if name.is_empty() {
        return Err(GraphError::invalid_value(name, "attribute name is empty"));
    }
    check_value(name, value)
}

fn check_value(name: &str, value: &Value) -> Result<()> {
    match value {
        Value::Float(v) if !v.is_finite() => {
            Err(GraphError::invalid_value(name, format!("non-finite float {v}")))
        }
        Value::List(items) => items.iter().try_for_each(|v| check_value(name, v)),
        Value::Map(map) => map.values().try_for_each(|v| check_value(name, v)),
        _ => Ok(()),
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = GraphError;

    fn try_from(json: serde_json::Value) -> Result<Self> {
        use serde_json::Value as Json;
        Ok(match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => {
                if let Some(v) = n.as_i64() {
                    Value::Int(v)
                } else if n.is_u64() {
                    return Err(GraphError::invalid_value("", format!("integer {n} out of range")));
                } else {
                    match n.as_f64() {
                        Some(v) if v.is_finite() => Value::Float(v),
                        _ => {
                            return Err(GraphError::invalid_value("", format!("unrepresentable number {n}")))
                        }
                    }
                }
            }
            Json::String(s) => Value::Text(s),
            Json::Array(items) => Value::List(
                items
                    .into_iter()
                    .map(Value::try_from)
                    .collect::<Result<Vec<_>>>()?,
            ),
            Json::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| Value::try_from(v).map(|v| (k, v)))
                    .collect::<Result<BTreeMap<_, _>>>()?,
            ),
        })
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {$(
        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::$variant(v.into())
            }
        }
    )*};
}

value_from!(
    bool => Bool,
    i64 => Int,
    i32 => Int,
    u32 => Int,
    f64 => Float,
    String => Text,
    &str => Text,
    NodeRef => NodeRef,
    BranchId => BranchId,
    RevisionId => RevisionId,
    NodeId => NodeId,
    Vec<Value> => List,
    BTreeMap<String, Value> => Map,
);

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
