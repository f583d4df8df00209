//! Access proxies
//!
//! A [`NodeProxy`] is a capability-scoped handle `(revision, node ref,
//! access)`. It owns no data: every call resolves the node through the
//! [`Runtime`], so a proxy can never outlive or alias the storage it
//! points at.
//!
//! | Access        | Reads | Writes                                           |
//! |---------------|-------|--------------------------------------------------|
//! | `ReadOnly`    | yes   | `ReadOnlyViolation`                              |
//! | `ReadWrite`   | yes   | applied to the revision's own storage            |
//! | `CopyOnWrite` | yes   | first write forks the node into the revision     |

use crate::error::{GraphError, Result};
use crate::id::{NodeId, NodeRef, RevisionId};
use crate::node::Node;
use crate::proxy_dict::ProxyDict;
use crate::proxy_list::ProxyList;
use crate::runtime::Runtime;
use crate::value::{self, Attributes, Value};

/// Mutability of a [`NodeProxy`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    ReadOnly,
    ReadWrite,
    /// Inherited node, not yet owned by the revision
    CopyOnWrite,
}

/// Computed attributes for every node of one type.
///
/// Registered with [`Runtime::register_getter`] under the type node's ref;
/// nodes whose `__isinstance__` names that type are read through it.
/// Returning `None` falls back to the stored attribute.
pub trait Getter: Send + Sync {
    fn get(&self, node: &Node, name: &str) -> Option<Value>;
}

impl<F> Getter for F
where
    F: Fn(&Node, &str) -> Option<Value> + Send + Sync,
{
    fn get(&self, node: &Node, name: &str) -> Option<Value> {
        self(node, name)
    }
}

/// View of one node through one revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeProxy {
    revision: RevisionId,
    node_ref: NodeRef,
    access: Access,
}

impl NodeProxy {
    pub(crate) fn new(revision: RevisionId, node_ref: NodeRef, access: Access) -> Self {
        Self {
            revision,
            node_ref,
            access,
        }
    }

    /// Logical node viewed
    pub fn node_ref(&self) -> NodeRef {
        self.node_ref
    }

    /// Revision the view resolves through
    pub fn revision(&self) -> RevisionId {
        self.revision
    }

    /// Access granted when the proxy was issued
    pub fn access(&self) -> Access {
        self.access
    }

    /// False for read-only views
    pub fn is_writable(&self) -> bool {
        self.access != Access::ReadOnly
    }

    /// Storage currently backing this view
    pub fn node_id(&self, rt: &Runtime) -> Result<NodeId> {
        rt.get_revision(self.revision)?.node_id(self.node_ref)
    }

    /// Node version currently backing this view
    pub fn node<'r>(&self, rt: &'r Runtime) -> Result<&'r Node> {
        rt.get_node(self.node_id(rt)?)
    }

    /// Stored attributes, getters not applied
    pub fn content<'r>(&self, rt: &'r Runtime) -> Result<&'r Attributes> {
        self.node(rt).map(Node::content)
    }

    /// Read attribute `name`, through the type's [`Getter`] if one is registered
    pub fn get(&self, rt: &Runtime, name: &str) -> Result<Value> {
        let node = self.node(rt)?;
        if let Some(getter) = node.type_ref().and_then(|t| rt.getter(t)) {
            if let Some(value) = getter.get(node, name) {
                return Ok(value);
            }
        }
        node.get(name)
            .cloned()
            .ok_or_else(|| GraphError::KeyNotFound(name.to_owned()))
    }

    /// True if attribute `name` is stored
    pub fn contains(&self, rt: &Runtime, name: &str) -> Result<bool> {
        Ok(self.node(rt)?.get(name).is_some())
    }

    /// Change-tracking view of a list attribute; write it back with [`set`](Self::set)
    pub fn list(&self, rt: &Runtime, name: &str) -> Result<ProxyList<Value>> {
        match self.get(rt, name)? {
            Value::List(items) => Ok(ProxyList::new(items)),
            _ => Err(GraphError::invalid_value(name, "not a list")),
        }
    }

    /// Change-tracking view of a map attribute
    pub fn dict(&self, rt: &Runtime, name: &str) -> Result<ProxyDict<String, Value>> {
        match self.get(rt, name)? {
            Value::Map(map) => Ok(ProxyDict::new(map)),
            _ => Err(GraphError::invalid_value(name, "not a map")),
        }
    }

    /// Validate and store `value`, returning the previous value
    pub fn set(&self, rt: &mut Runtime, name: &str, value: impl Into<Value>) -> Result<Option<Value>> {
        self.ensure_writable()?;
        let value = value.into();
        value::validate(name, &value)?;
        let node = self.writable_node(rt)?;
        Ok(node.set(name.to_owned(), value))
    }

    /// Delete attribute `name`, returning its previous value
    pub fn remove(&self, rt: &mut Runtime, name: &str) -> Result<Option<Value>> {
        let node = self.writable_node(rt)?;
        Ok(node.remove(name))
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.access == Access::ReadOnly {
            return Err(GraphError::ReadOnlyViolation {
                node_ref: self.node_ref,
                revision: self.revision,
            });
        }
        Ok(())
    }

    fn writable_node<'r>(&self, rt: &'r mut Runtime) -> Result<&'r mut Node> {
        self.ensure_writable()?;
        let (revision, nodes) = rt.revision_and_nodes_mut(self.revision)?;
        let id = revision.fork_node(nodes, self.node_ref)?;
        nodes.node_mut(&id)
    }
}
