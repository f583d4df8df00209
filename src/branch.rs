//! Branch cursor
//!
//! A branch is a movable pointer to its working copy: the one open
//! revision that may still change. Its own metadata lives in a node
//! attached to revision 0, so it is versioned like any other node.

use crate::id::{BranchId, NodeRef, RevisionId};

/// Attribute of the branch node holding the branch id
pub const BRANCH_ATTRIBUTE: &str = "__branch__";

/// Movable cursor over a branch's working copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    id: BranchId,
    /// Node carrying the branch metadata
    node_ref: NodeRef,
    /// Number of the working copy
    revision: u32,
    /// `RevisionId(id, revision)`
    wc: RevisionId,
}

impl Branch {
    /// Cursor at revision 0
    pub fn new(id: BranchId, node_ref: NodeRef) -> Self {
        Self {
            id,
            node_ref,
            revision: 0,
            wc: RevisionId::new(id, 0),
        }
    }

    /// Branch identifier
    pub fn id(&self) -> BranchId {
        self.id
    }

    /// Ref of the branch node
    pub fn node_ref(&self) -> NodeRef {
        self.node_ref
    }

    /// Revision number of the working copy
    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// Current working copy
    pub fn wc(&self) -> RevisionId {
        self.wc
    }

    /// Id the next working copy will get, `None` once numbers run out
    pub(crate) fn next_revision(&self) -> Option<RevisionId> {
        self.revision.checked_add(1).map(|n| RevisionId::new(self.id, n))
    }

    /// Move the cursor to `next`, obtained from [`next_revision`](Self::next_revision)
    pub(crate) fn advance(&mut self, next: RevisionId) {
        self.revision = next.number();
        self.wc = next;
    }
}
