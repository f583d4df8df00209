//! Registries
//!
//! Flat, insertion-ordered tables keyed by id. Entries are created on
//! first use and never evicted; iteration follows registration order so
//! listings are deterministic.

use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;

use crate::branch::Branch;
use crate::error::{GraphError, Result};
use crate::id::{BranchId, NodeId, RevisionId};
use crate::node::Node;
use crate::revision::Revision;

/// Insertion-ordered table (O(1) lookup via HashMap index)
#[derive(Debug, Clone)]
pub struct Registry<K, V> {
    entries: Vec<(K, V)>,
    /// Maps key → index in `entries`
    index: HashMap<K, usize>,
}

impl<K, V> Default for Registry<K, V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<K: Copy + Eq + Hash, V> Registry<K, V> {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Install an entry; an existing entry under `key` is overwritten in place
    pub fn insert(&mut self, key: K, value: V) {
        match self.index.get(&key) {
            Some(&idx) => self.entries[idx].1 = value,
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    /// Entry for `key`
    pub fn get(&self, key: &K) -> Option<&V> {
        self.index.get(key).map(|&idx| &self.entries[idx].1)
    }

    /// Mutable entry for `key`
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.index.get(key).map(|&idx| &mut self.entries[idx].1)
    }

    /// True if `key` is registered
    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in registration order
    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.entries.iter().map(|(k, _)| *k)
    }

    /// Entries in registration order
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.entries.iter().map(|(k, v)| (k, v))
    }
}

/// Physical node storage: NodeId → Node
pub type NodeStore = Registry<NodeId, Node>;

/// Revisions by id
pub type RevisionStore = Registry<RevisionId, Revision>;

/// Branches by id
pub type BranchStore = Registry<BranchId, Branch>;

impl NodeStore {
    /// Total lookup of a node version
    pub fn node(&self, id: &NodeId) -> Result<&Node> {
        self.get(id).ok_or(GraphError::NodeIdNotFound(*id))
    }

    pub(crate) fn node_mut(&mut self, id: &NodeId) -> Result<&mut Node> {
        self.get_mut(id).ok_or(GraphError::NodeIdNotFound(*id))
    }

    /// Every version `id` descends from, `id` first, then breadth-first
    /// over [`Node::origins`]. Each version is listed once.
    pub fn lineage(&self, id: NodeId) -> Vec<NodeId> {
        let mut seen = HashSet::from([id]);
        let mut order = Vec::new();
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            order.push(current);
            let Some(node) = self.get(&current) else {
                continue;
            };
            for &parent in node.origins() {
                if seen.insert(parent) {
                    queue.push_back(parent);
                }
            }
        }
        order
    }

    /// Nearest version both `ours` and `theirs` descend from.
    ///
    /// Among the shared versions, picks the first (closest to `ours`) that
    /// no other shared version descends from.
    pub fn merge_base(&self, ours: NodeId, theirs: NodeId) -> Option<NodeId> {
        let their_line: HashSet<NodeId> = self.lineage(theirs).into_iter().collect();
        let shared: Vec<NodeId> = self
            .lineage(ours)
            .into_iter()
            .filter(|id| their_line.contains(id))
            .collect();
        shared.iter().copied().find(|&candidate| {
            !shared
                .iter()
                .any(|&other| other != candidate && self.lineage(other).contains(&candidate))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::NodeRef;

    fn node_id(rev: &RevisionId, node: &Node) -> NodeId {
        NodeId::new(node.node_ref(), *rev)
    }

    #[test]
    fn test_registry_keeps_insertion_order() {
        let mut reg = Registry::new();
        for k in [5u32, 1, 3] {
            reg.insert(k, k * 10);
        }
        assert_eq!(reg.keys().collect::<Vec<_>>(), vec![5, 1, 3]);
        assert_eq!(reg.get(&1), Some(&10));
    }

    #[test]
    fn test_registry_overwrite_keeps_position() {
        let mut reg = Registry::new();
        reg.insert(1u32, "a");
        reg.insert(2u32, "b");
        reg.insert(1u32, "c");
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.iter().map(|(_, v)| *v).collect::<Vec<_>>(), vec!["c", "b"]);
    }

    #[test]
    fn test_registry_default_is_empty() {
        let reg: Registry<u32, u32> = Registry::default();
        assert!(reg.is_empty());
        assert!(!reg.contains(&0));
        assert!(reg.get(&0).is_none());
    }

    #[test]
    fn test_node_store_missing_is_error() {
        let store = NodeStore::new();
        let id = NodeId::new(NodeRef::new(), RevisionId::new(BranchId::new(), 0));
        assert!(matches!(store.node(&id), Err(GraphError::NodeIdNotFound(_))));
    }

    #[test]
    fn test_lineage_follows_origins() {
        let branch = BranchId::new();
        let (r0, r1, r2) = (
            RevisionId::new(branch, 0),
            RevisionId::new(branch, 1),
            RevisionId::new(branch, 2),
        );
        let mut store = NodeStore::new();
        let base = Node::new(NodeRef::new());
        let id0 = node_id(&r0, &base);
        let v1 = base.fork(id0);
        let id1 = node_id(&r1, &v1);
        let v2 = v1.fork(id1);
        let id2 = node_id(&r2, &v2);
        store.insert(id0, base);
        store.insert(id1, v1);
        store.insert(id2, v2);

        assert_eq!(store.lineage(id2), vec![id2, id1, id0]);
        assert_eq!(store.lineage(id0), vec![id0]);
    }

    #[test]
    fn test_lineage_walks_merged_parents() {
        let (main, side) = (BranchId::new(), BranchId::new());
        let node_ref = NodeRef::new();
        let base = NodeId::new(node_ref, RevisionId::new(main, 0));
        let ours = NodeId::new(node_ref, RevisionId::new(main, 1));
        let theirs = NodeId::new(node_ref, RevisionId::new(side, 0));
        let merged = NodeId::new(node_ref, RevisionId::new(main, 2));
        let later = NodeId::new(node_ref, RevisionId::new(side, 1));

        let mut store = NodeStore::new();
        store.insert(base, Node::new(node_ref));
        store.insert(ours, Node::with_content(node_ref, Default::default(), vec![base]));
        store.insert(theirs, Node::with_content(node_ref, Default::default(), vec![base]));
        store.insert(merged, Node::with_content(node_ref, Default::default(), vec![ours, theirs]));
        store.insert(later, Node::with_content(node_ref, Default::default(), vec![theirs]));

        assert_eq!(store.lineage(merged), vec![merged, ours, theirs, base]);
        assert_eq!(store.merge_base(ours, theirs), Some(base));
        // the merged-in version is nearer than the original fork point
        assert_eq!(store.merge_base(merged, later), Some(theirs));
        assert_eq!(store.merge_base(merged, ours), Some(ours));
    }

    #[test]
    fn test_merge_base_unrelated_versions() {
        let mut store = NodeStore::new();
        let a = NodeId::new(NodeRef::new(), RevisionId::new(BranchId::new(), 0));
        let b = NodeId::new(a.node_ref(), RevisionId::new(BranchId::new(), 0));
        store.insert(a, Node::new(a.node_ref()));
        store.insert(b, Node::new(b.node_ref()));
        assert_eq!(store.merge_base(a, b), None);
    }
}
