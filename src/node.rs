//! Node storage unit
//!
//! A node is an open attribute bag identified by its [`NodeRef`]. The same
//! logical node may have several physical versions, one per revision that
//! wrote to it; each version remembers the storage it was forked from,
//! plus any version folded into it by a history merge.

use crate::id::{NodeId, NodeRef};
use crate::value::{Attributes, Value};

/// Attribute naming the type node of a node (see [`crate::proxy::Getter`])
pub const TYPE_ATTRIBUTE: &str = "__isinstance__";

/// One physical version of a node
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    node_ref: NodeRef,
    content: Attributes,
    /// Parent versions, fork source first
    origins: Vec<NodeId>,
}

impl Node {
    /// Empty node with a fresh ref
    pub fn new(node_ref: NodeRef) -> Self {
        Self {
            node_ref,
            content: Attributes::new(),
            origins: Vec::new(),
        }
    }

    /// Private copy of `self` whose storage was forked from `origin`
    pub(crate) fn fork(&self, origin: NodeId) -> Self {
        Self {
            node_ref: self.node_ref,
            content: self.content.clone(),
            origins: vec![origin],
        }
    }

    /// Version holding `content` that descends from every id in `origins`
    pub(crate) fn with_content(node_ref: NodeRef, content: Attributes, origins: Vec<NodeId>) -> Self {
        Self {
            node_ref,
            content,
            origins,
        }
    }

    /// Logical node this version belongs to
    pub fn node_ref(&self) -> NodeRef {
        self.node_ref
    }

    /// Read-only view of the attribute bag
    pub fn content(&self) -> &Attributes {
        &self.content
    }

    /// Storage this version was copied from, `None` for the first version
    pub fn origin(&self) -> Option<NodeId> {
        self.origins.first().copied()
    }

    /// Every parent version: the fork source, then merged-in versions
    pub fn origins(&self) -> &[NodeId] {
        &self.origins
    }

    /// Stored value of attribute `name`
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.content.get(name)
    }

    /// Type node named by [`TYPE_ATTRIBUTE`], if any
    pub fn type_ref(&self) -> Option<NodeRef> {
        self.content.get(TYPE_ATTRIBUTE).and_then(Value::as_node_ref)
    }

    pub(crate) fn set(&mut self, name: String, value: Value) -> Option<Value> {
        self.content.insert(name, value)
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<Value> {
        self.content.remove(name)
    }
}
