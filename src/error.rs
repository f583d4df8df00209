//! Error taxonomy
//!
//! Every fallible engine operation returns [`GraphError`]. Merge outcomes
//! (conflicts, history mismatches) are *values* returned by the merge
//! machinery, see [`crate::merge`].

use crate::id::{BranchId, NodeId, NodeRef, RevisionId};

/// Crate-wide result alias
pub type Result<T> = core::result::Result<T, GraphError>;

/// Which identifier kind failed to parse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    NodeRef,
    BranchId,
    RevisionId,
    NodeId,
}

impl core::fmt::Display for IdKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            IdKind::NodeRef => "node ref",
            IdKind::BranchId => "branch id",
            IdKind::RevisionId => "revision id",
            IdKind::NodeId => "node id",
        })
    }
}

/// Errors raised by the graph engine
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Ref is not reachable from the revision
    #[error("node {node_ref} not found in revision {revision}")]
    NodeNotFound {
        node_ref: NodeRef,
        revision: RevisionId,
    },

    /// No physical version stored under this id
    #[error("node storage {0} is not registered")]
    NodeIdNotFound(NodeId),

    /// Revision id unknown to the runtime
    #[error("revision {0} is not registered")]
    RevisionNotFound(RevisionId),

    /// Branch id unknown to the runtime
    #[error("branch {0} is not registered")]
    BranchNotFound(BranchId),

    /// Write against a committed revision
    #[error("revision {0} is finished")]
    RevisionFinished(RevisionId),

    /// Fork or merge from a revision still open
    #[error("revision {0} is not finished")]
    RevisionNotFinished(RevisionId),

    /// Commit past the last revision number
    #[error("branch {0} has run out of revision numbers")]
    RevisionNumbersExhausted(BranchId),

    /// Identifier text failed to parse
    #[error("malformed {kind}: {input:?} ({reason})")]
    MalformedIdentifier {
        kind: IdKind,
        input: String,
        reason: &'static str,
    },

    /// Empty attribute name or unrepresentable value
    #[error("invalid value for attribute {name:?}: {reason}")]
    InvalidAttributeValue { name: String, reason: String },

    /// Write through a read-only proxy
    #[error("node {node_ref} is read only in revision {revision}")]
    ReadOnlyViolation {
        node_ref: NodeRef,
        revision: RevisionId,
    },

    /// Virtual list index past the end
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Attribute or mapping key absent
    #[error("key {0:?} not found")]
    KeyNotFound(String),

    /// Commit refused while merge conflicts remain
    #[error("revision {revision} has {count} unresolved node conflict(s)")]
    UnresolvedConflicts { revision: RevisionId, count: usize },

    /// Schema names a type not declared yet
    #[error("unknown type {0:?}")]
    UnknownType(String),

    /// Configuration document rejected
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl GraphError {
    pub(crate) fn malformed(kind: IdKind, input: &str, reason: &'static str) -> Self {
        GraphError::MalformedIdentifier {
            kind,
            input: input.to_owned(),
            reason,
        }
    }

    pub(crate) fn invalid_value(name: &str, reason: impl Into<String>) -> Self {
        GraphError::InvalidAttributeValue {
            name: name.to_owned(),
            reason: reason.into(),
        }
    }

    /// True for every "lookup failed" variant. The web layer maps these to 404.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            GraphError::NodeNotFound { .. }
                | GraphError::NodeIdNotFound(_)
                | GraphError::RevisionNotFound(_)
                | GraphError::BranchNotFound(_)
                | GraphError::MalformedIdentifier { .. }
        )
    }
}
