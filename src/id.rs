//! Identifier scheme
//!
//! Opaque, self-describing ids for nodes, branches, revisions and
//! node-at-revision storage addresses. All ids are `Copy` value types
//! whose canonical text form round-trips exactly through [`FromStr`].
//!
//! | Type | Text form |
//! |------|-----------|
//! | [`NodeRef`] | 22 chars over [`ALPHABET`] |
//! | [`BranchId`] | 12 chars over [`ALPHABET`] |
//! | [`RevisionId`] | `<branch>:<8 hex digits>` |
//! | [`NodeId`] | `<branch>:<8 hex digits>:<noderef>` |

use core::cmp::Ordering;
use core::fmt;
use core::str::FromStr;

use rand::Rng;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{GraphError, IdKind};

/// Id alphabet: lowercase letters and digits minus `0 1 i l o`
pub const ALPHABET: &[u8; 31] = b"23456789abcdefghjkmnpqrstuvwxyz";

/// Length of a [`NodeRef`] in characters
pub const NODE_REF_LEN: usize = 22;

/// Length of a [`BranchId`] in characters
pub const BRANCH_ID_LEN: usize = 12;

/// Number of hex digits in a rendered revision number
const REVISION_DIGITS: usize = 8;

#[inline]
fn is_id_char(b: u8) -> bool {
    ALPHABET.contains(&b)
}

fn fill_random<R: Rng, const N: usize>(rng: &mut R) -> [u8; N] {
    let mut out = [0u8; N];
    for slot in out.iter_mut() {
        *slot = ALPHABET[rng.gen_range(0..ALPHABET.len())];
    }
    out
}

fn parse_fixed<const N: usize>(s: &str, kind: IdKind) -> Result<[u8; N], GraphError> {
    let bytes = s.as_bytes();
    if bytes.len() != N {
        return Err(GraphError::malformed(kind, s, "wrong length"));
    }
    if !bytes.iter().all(|&b| is_id_char(b)) {
        return Err(GraphError::malformed(kind, s, "invalid character"));
    }
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    Ok(out)
}

macro_rules! short_id {
    ($(#[$meta:meta])* $name:ident, $len:expr, $kind:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; $len]);

        impl $name {
            /// Fresh random id from the thread-local RNG
            pub fn new() -> Self {
                Self::generate(&mut rand::thread_rng())
            }

            /// Fresh random id drawn from `rng`
            pub fn generate<R: Rng>(rng: &mut R) -> Self {
                Self(fill_random(rng))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                for &b in &self.0 {
                    fmt::Write::write_char(f, b as char)?;
                }
                Ok(())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self)
            }
        }

        impl FromStr for $name {
            type Err = GraphError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_fixed::<$len>(s, $kind).map(Self)
            }
        }
    };
}

short_id!(
    /// Logical identity of a node, stable across revisions
    NodeRef,
    NODE_REF_LEN,
    IdKind::NodeRef
);

short_id!(
    /// Identity of a branch lineage
    BranchId,
    BRANCH_ID_LEN,
    IdKind::BranchId
);

/// A revision within a branch: `(branch, number)`
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RevisionId {
    branch: BranchId,
    number: u32,
}

impl RevisionId {
    /// Revision `number` of `branch`
    pub fn new(branch: BranchId, number: u32) -> Self {
        Self { branch, number }
    }

    /// Branch the revision belongs to
    pub fn branch(&self) -> BranchId {
        self.branch
    }

    /// Position in the branch, 0 for the first revision
    pub fn number(&self) -> u32 {
        self.number
    }
}

/// Ordered by number within one branch; unordered across branches.
impl PartialOrd for RevisionId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.branch != other.branch {
            return None;
        }
        Some(self.number.cmp(&other.number))
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:08x}", self.branch, self.number)
    }
}

impl fmt::Debug for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RevisionId({})", self)
    }
}

impl FromStr for RevisionId {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = IdKind::RevisionId;
        let (branch, number) = s
            .split_once(':')
            .ok_or_else(|| GraphError::malformed(kind, s, "missing ':' separator"))?;
        let branch = parse_fixed::<BRANCH_ID_LEN>(branch, kind).map(BranchId)?;
        if number.len() != REVISION_DIGITS {
            return Err(GraphError::malformed(kind, s, "revision number must be 8 hex digits"));
        }
        if !number.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(GraphError::malformed(kind, s, "invalid hex digit"));
        }
        let number = u32::from_str_radix(number, 16)
            .map_err(|_| GraphError::malformed(kind, s, "invalid hex digit"))?;
        Ok(Self { branch, number })
    }
}

/// Physical storage address of a node: `(node ref, owning revision)`
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    node_ref: NodeRef,
    revision: RevisionId,
}

impl NodeId {
    /// Storage of `node_ref` owned by `revision`
    pub fn new(node_ref: NodeRef, revision: RevisionId) -> Self {
        Self { node_ref, revision }
    }

    /// Logical node
    pub fn node_ref(&self) -> NodeRef {
        self.node_ref
    }

    /// Revision owning the storage
    pub fn revision(&self) -> RevisionId {
        self.revision
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.revision, self.node_ref)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self)
    }
}

impl FromStr for NodeId {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = IdKind::NodeId;
        let (revision, node_ref) = s
            .rsplit_once(':')
            .ok_or_else(|| GraphError::malformed(kind, s, "missing ':' separator"))?;
        let revision: RevisionId = revision
            .parse()
            .map_err(|_| GraphError::malformed(kind, s, "invalid revision segment"))?;
        let node_ref = parse_fixed::<NODE_REF_LEN>(node_ref, kind).map(NodeRef)?;
        Ok(Self { node_ref, revision })
    }
}

// ── Serde: canonical strings ───────────────────────────────────────────

macro_rules! serde_as_string {
    ($($name:ident),*) => {$(
        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let text = String::deserialize(deserializer)?;
                text.parse().map_err(de::Error::custom)
            }
        }
    )*};
}

serde_as_string!(NodeRef, BranchId, RevisionId, NodeId);
