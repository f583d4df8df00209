//! Revision history walks
//!
//! Revisions link to their predecessors through `ancestors`; these helpers
//! walk that DAG. Unregistered ids are skipped rather than reported, so a
//! walk over a partially registered history still terminates.

use std::collections::{HashSet, VecDeque};

use crate::id::RevisionId;
use crate::store::RevisionStore;

// ── Ancestry ───────────────────────────────────────────────────────────

/// Every revision reachable from `root` through `ancestors`, `root` first.
///
/// Breadth-first, each revision listed once, parents in declaration order,
/// so the result doubles as a newest-first log for linear histories.
pub fn ancestry(revisions: &RevisionStore, root: RevisionId) -> Vec<RevisionId> {
    let mut seen = HashSet::new();
    let mut order = Vec::new();
    let mut queue = VecDeque::new();

    if revisions.contains(&root) {
        seen.insert(root);
        queue.push_back(root);
    }

    while let Some(id) = queue.pop_front() {
        order.push(id);
        let Some(revision) = revisions.get(&id) else {
            continue;
        };
        for &parent in revision.ancestors() {
            if revisions.contains(&parent) && seen.insert(parent) {
                queue.push_back(parent);
            }
        }
    }
    order
}

/// True if `candidate` is a strict ancestor of `of`
pub fn is_ancestor(revisions: &RevisionStore, candidate: RevisionId, of: RevisionId) -> bool {
    candidate != of && ancestry(revisions, of).contains(&candidate)
}

/// Nearest revision both `a` and `b` descend from (either may be the answer)
pub fn common_ancestor(revisions: &RevisionStore, a: RevisionId, b: RevisionId) -> Option<RevisionId> {
    let theirs: HashSet<RevisionId> = ancestry(revisions, b).into_iter().collect();
    ancestry(revisions, a).into_iter().find(|id| theirs.contains(id))
}

// ── Tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::BranchId;
    use crate::revision::Revision;
    use std::collections::BTreeMap;

    fn chain(store: &mut RevisionStore, branch: BranchId, len: u32) -> Vec<RevisionId> {
        let mut ids = Vec::new();
        for n in 0..len {
            let id = RevisionId::new(branch, n);
            let ancestors = ids.last().copied().into_iter().collect();
            store.insert(id, Revision::new(id, ancestors, BTreeMap::new()));
            ids.push(id);
        }
        ids
    }

    #[test]
    fn test_ancestry_empty_store() {
        let store = RevisionStore::new();
        assert!(ancestry(&store, RevisionId::new(BranchId::new(), 0)).is_empty());
    }

    #[test]
    fn test_ancestry_linear_newest_first() {
        let mut store = RevisionStore::new();
        let ids = chain(&mut store, BranchId::new(), 3);
        assert_eq!(ancestry(&store, ids[2]), vec![ids[2], ids[1], ids[0]]);
        assert!(is_ancestor(&store, ids[0], ids[2]));
        assert!(!is_ancestor(&store, ids[2], ids[0]));
        assert!(!is_ancestor(&store, ids[1], ids[1]));
    }

    #[test]
    fn test_ancestry_merge_visits_once() {
        let mut store = RevisionStore::new();
        let main = chain(&mut store, BranchId::new(), 2);
        let side = BranchId::new();
        let s0 = RevisionId::new(side, 0);
        store.insert(s0, Revision::new(s0, vec![main[0]], BTreeMap::new()));
        let tip = RevisionId::new(main[0].branch(), 2);
        store.insert(tip, Revision::new(tip, vec![main[1], s0], BTreeMap::new()));

        let walk = ancestry(&store, tip);
        assert_eq!(walk, vec![tip, main[1], s0, main[0]]);
        assert!(is_ancestor(&store, s0, tip));
    }

    #[test]
    fn test_common_ancestor() {
        let mut store = RevisionStore::new();
        let main = chain(&mut store, BranchId::new(), 3);
        let side = BranchId::new();
        let s0 = RevisionId::new(side, 0);
        store.insert(s0, Revision::new(s0, vec![main[1]], BTreeMap::new()));

        assert_eq!(common_ancestor(&store, main[2], s0), Some(main[1]));
        assert_eq!(common_ancestor(&store, main[1], main[2]), Some(main[1]));

        let lone = RevisionId::new(BranchId::new(), 0);
        store.insert(lone, Revision::new(lone, vec![], BTreeMap::new()));
        assert_eq!(common_ancestor(&store, lone, main[2]), None);
    }
}
