//! Revisions
//!
//! A revision is a snapshot of which storage backs every reachable node.
//! It is **open** while it is its branch's working copy and **finished**
//! once committed; a finished revision never changes again.
//!
//! ```text
//!   refs:  ref ──► owning revision      (every reachable node)
//!   nodes: refs whose storage lives here (created, attached or forked)
//! ```

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::error::{GraphError, Result};
use crate::id::{NodeId, NodeRef, RevisionId};
use crate::merge::{MergeConflict, MergeError};
use crate::node::Node;
use crate::proxy::{Access, NodeProxy};
use crate::store::NodeStore;

/// Where a reachable node's storage lives, relative to a revision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Storage lives in the revision itself
    Local,
    /// Storage lives in this earlier revision
    Inherited(RevisionId),
}

/// Why a history merge could not settle a node
#[derive(Debug, Clone, PartialEq)]
pub enum ConflictReason {
    /// Both sides wrote the node and share no common version
    Diverged,
    /// Attribute merge hit a conflict
    Attribute { name: String, conflict: MergeConflict },
    /// Attribute merge found inconsistent bases
    History { name: String, error: MergeError },
}

/// Node both sides of a history merge disagree on
#[derive(Debug, Clone, PartialEq)]
pub struct NodeConflict {
    /// Node in dispute
    pub node_ref: NodeRef,
    /// Owner on the receiving side
    pub ours: RevisionId,
    /// Owner on the merged-in side
    pub theirs: RevisionId,
    /// What stopped the merge
    pub reason: ConflictReason,
}

/// One snapshot of a branch's node graph
#[derive(Debug, Clone, PartialEq)]
pub struct Revision {
    id: RevisionId,
    /// Revisions this one descends from (commit parent, merged sources)
    ancestors: Vec<RevisionId>,
    /// Refs whose storage lives in this revision
    nodes: BTreeSet<NodeRef>,
    /// Every reachable ref and the revision owning its storage
    refs: BTreeMap<NodeRef, RevisionId>,
    /// Set once committed, never cleared
    finished: bool,
    /// Unsettled history merge results, keyed by ref
    conflicts: BTreeMap<NodeRef, NodeConflict>,
}

impl Revision {
    /// Open revision inheriting `refs`
    pub fn new(id: RevisionId, ancestors: Vec<RevisionId>, refs: BTreeMap<NodeRef, RevisionId>) -> Self {
        Self {
            id,
            ancestors,
            nodes: BTreeSet::new(),
            refs,
            finished: false,
            conflicts: BTreeMap::new(),
        }
    }

    /// Revision identifier
    pub fn id(&self) -> RevisionId {
        self.id
    }

    /// Direct predecessors, commit parent first
    pub fn ancestors(&self) -> &[RevisionId] {
        &self.ancestors
    }

    /// Refs owned by this revision
    pub fn nodes(&self) -> &BTreeSet<NodeRef> {
        &self.nodes
    }

    /// Reachable refs and their owning revisions
    pub fn refs(&self) -> &BTreeMap<NodeRef, RevisionId> {
        &self.refs
    }

    /// True once committed
    pub fn finished(&self) -> bool {
        self.finished
    }

    /// Unresolved history merge conflicts, by ref
    pub fn conflicts(&self) -> impl Iterator<Item = &NodeConflict> {
        self.conflicts.values()
    }

    /// True while history merge conflicts are unresolved
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// True if `node_ref` is reachable from this revision
    pub fn has_node(&self, node_ref: NodeRef) -> bool {
        self.refs.contains_key(&node_ref)
    }

    /// Where the storage for `node_ref` lives, `None` if unreachable
    pub fn search(&self, node_ref: NodeRef) -> Option<Ownership> {
        self.refs.get(&node_ref).map(|&owner| {
            if owner == self.id {
                Ownership::Local
            } else {
                Ownership::Inherited(owner)
            }
        })
    }

    /// Storage backing `node_ref` as seen from this revision
    pub fn node_id(&self, node_ref: NodeRef) -> Result<NodeId> {
        self.refs
            .get(&node_ref)
            .map(|&owner| NodeId::new(node_ref, owner))
            .ok_or(GraphError::NodeNotFound {
                node_ref,
                revision: self.id,
            })
    }

    /// Proxy for `node_ref` with the access this revision grants
    pub fn get_node(&self, node_ref: NodeRef) -> Result<NodeProxy> {
        let ownership = self.search(node_ref).ok_or(GraphError::NodeNotFound {
            node_ref,
            revision: self.id,
        })?;
        let access = match (self.finished, ownership) {
            (true, _) => Access::ReadOnly,
            (false, Ownership::Local) => Access::ReadWrite,
            (false, Ownership::Inherited(_)) => Access::CopyOnWrite,
        };
        Ok(NodeProxy::new(self.id, node_ref, access))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.finished {
            return Err(GraphError::RevisionFinished(self.id));
        }
        Ok(())
    }

    /// Allocate an empty node with ref `node_ref` in this revision
    pub fn create_node(&mut self, nodes: &mut NodeStore, node_ref: NodeRef) -> Result<NodeProxy> {
        self.attach_node(nodes, Node::new(node_ref))
    }

    /// Store `node` in this revision and make it owned here
    pub fn attach_node(&mut self, nodes: &mut NodeStore, node: Node) -> Result<NodeProxy> {
        self.ensure_open()?;
        let node_ref = node.node_ref();
        nodes.insert(NodeId::new(node_ref, self.id), node);
        self.nodes.insert(node_ref);
        self.refs.insert(node_ref, self.id);
        debug!(revision = %self.id, node = %node_ref, "node attached");
        Ok(NodeProxy::new(self.id, node_ref, Access::ReadWrite))
    }

    /// Make sure this revision owns private storage for `node_ref`,
    /// copying the inherited version on first use.
    pub(crate) fn fork_node(&mut self, nodes: &mut NodeStore, node_ref: NodeRef) -> Result<NodeId> {
        self.ensure_open()?;
        let inherited = self.node_id(node_ref)?;
        if inherited.revision() == self.id {
            return Ok(inherited);
        }
        let copy = nodes.node(&inherited)?.fork(inherited);
        let id = NodeId::new(node_ref, self.id);
        nodes.insert(id, copy);
        self.nodes.insert(node_ref);
        self.refs.insert(node_ref, self.id);
        debug!(revision = %self.id, node = %node_ref, from = %inherited, "copy-on-write fork");
        Ok(id)
    }

    /// Point `node_ref` at storage owned by `owner`
    pub(crate) fn adopt(&mut self, node_ref: NodeRef, owner: RevisionId) {
        if owner != self.id {
            self.nodes.remove(&node_ref);
        }
        self.refs.insert(node_ref, owner);
    }

    pub(crate) fn add_ancestor(&mut self, ancestor: RevisionId) {
        if !self.ancestors.contains(&ancestor) {
            self.ancestors.push(ancestor);
        }
    }

    pub(crate) fn record_conflict(&mut self, conflict: NodeConflict) {
        self.conflicts.insert(conflict.node_ref, conflict);
    }

    /// Settle a recorded conflict by choosing the storage of `owner`,
    /// which must be one of the two conflicting sides.
    pub fn resolve_conflict(&mut self, node_ref: NodeRef, owner: RevisionId) -> Result<()> {
        self.ensure_open()?;
        let conflict = self.conflicts.get(&node_ref).ok_or(GraphError::NodeNotFound {
            node_ref,
            revision: self.id,
        })?;
        if owner != conflict.ours && owner != conflict.theirs {
            return Err(GraphError::NodeIdNotFound(NodeId::new(node_ref, owner)));
        }
        self.conflicts.remove(&node_ref);
        self.adopt(node_ref, owner);
        debug!(revision = %self.id, node = %node_ref, owner = %owner, "conflict resolved");
        Ok(())
    }

    /// Open → Finished
    pub(crate) fn finish(&mut self) -> Result<()> {
        self.ensure_open()?;
        if !self.conflicts.is_empty() {
            return Err(GraphError::UnresolvedConflicts {
                revision: self.id,
                count: self.conflicts.len(),
            });
        }
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::BranchId;
    use crate::value::Value;

    fn open() -> (Revision, NodeStore) {
        let id = RevisionId::new(BranchId::new(), 0);
        (Revision::new(id, vec![], BTreeMap::new()), NodeStore::new())
    }

    #[test]
    fn test_create_node_is_owned() {
        let (mut rev, mut store) = open();
        let r = NodeRef::new();
        let proxy = rev.create_node(&mut store, r).unwrap();
        assert_eq!(proxy.access(), Access::ReadWrite);
        assert!(rev.has_node(r));
        assert_eq!(rev.search(r), Some(Ownership::Local));
        assert!(rev.nodes().contains(&r));
        assert!(store.contains(&NodeId::new(r, rev.id())));
    }

    #[test]
    fn test_unknown_ref_not_found() {
        let (rev, _) = open();
        let r = NodeRef::new();
        assert!(!rev.has_node(r));
        assert_eq!(rev.search(r), None);
        assert!(matches!(rev.get_node(r), Err(GraphError::NodeNotFound { .. })));
    }

    #[test]
    fn test_inherited_ref_is_copy_on_write() {
        let branch = BranchId::new();
        let (r0, r1) = (RevisionId::new(branch, 0), RevisionId::new(branch, 1));
        let node_ref = NodeRef::new();
        let rev = Revision::new(r1, vec![r0], BTreeMap::from([(node_ref, r0)]));
        assert_eq!(rev.search(node_ref), Some(Ownership::Inherited(r0)));
        assert_eq!(rev.get_node(node_ref).unwrap().access(), Access::CopyOnWrite);
        assert!(rev.nodes().is_empty());
    }

    #[test]
    fn test_finished_revision_is_immutable() {
        let (mut rev, mut store) = open();
        let r = NodeRef::new();
        rev.create_node(&mut store, r).unwrap();
        rev.finish().unwrap();
        let snapshot = rev.clone();

        assert!(matches!(rev.create_node(&mut store, NodeRef::new()), Err(GraphError::RevisionFinished(_))));
        assert!(matches!(rev.attach_node(&mut store, Node::new(NodeRef::new())), Err(GraphError::RevisionFinished(_))));
        assert!(matches!(rev.finish(), Err(GraphError::RevisionFinished(_))));
        assert_eq!(rev.get_node(r).unwrap().access(), Access::ReadOnly);
        assert_eq!(rev, snapshot);
    }

    #[test]
    fn test_fork_node_copies_inherited_storage() {
        let branch = BranchId::new();
        let (r0, r1) = (RevisionId::new(branch, 0), RevisionId::new(branch, 1));
        let mut store = NodeStore::new();
        let mut base = Revision::new(r0, vec![], BTreeMap::new());
        let r = NodeRef::new();
        base.create_node(&mut store, r).unwrap();
        store.node_mut(&NodeId::new(r, r0)).unwrap().set("a".into(), Value::from(1));
        base.finish().unwrap();

        let mut next = Revision::new(r1, vec![r0], base.refs().clone());
        let id = next.fork_node(&mut store, r).unwrap();
        assert_eq!(id, NodeId::new(r, r1));
        assert_eq!(next.search(r), Some(Ownership::Local));
        assert_eq!(store.node(&id).unwrap().get("a"), Some(&Value::from(1)));
        // second fork is a no-op
        assert_eq!(next.fork_node(&mut store, r).unwrap(), id);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_conflicts_block_finish_until_resolved() {
        let branch = BranchId::new();
        let (ours, theirs) = (RevisionId::new(branch, 0), RevisionId::new(BranchId::new(), 3));
        let (mut rev, _) = open();
        let r = NodeRef::new();
        rev.record_conflict(NodeConflict {
            node_ref: r,
            ours,
            theirs,
            reason: ConflictReason::Diverged,
        });
        assert!(matches!(rev.finish(), Err(GraphError::UnresolvedConflicts { count: 1, .. })));

        let stranger = RevisionId::new(branch, 9);
        assert!(rev.resolve_conflict(r, stranger).is_err());
        assert!(rev.resolve_conflict(NodeRef::new(), theirs).is_err());

        rev.resolve_conflict(r, theirs).unwrap();
        assert_eq!(rev.refs()[&r], theirs);
        assert!(!rev.has_conflicts());
        rev.finish().unwrap();
        assert!(rev.finished());
    }

    #[test]
    fn test_add_ancestor_dedups() {
        let (mut rev, _) = open();
        let other = RevisionId::new(BranchId::new(), 0);
        rev.add_ancestor(other);
        rev.add_ancestor(other);
        assert_eq!(rev.ancestors(), &[other]);
    }
}
