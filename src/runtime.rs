//! Runtime registry
//!
//! The [`Runtime`] owns every node version, revision and branch, plus the
//! RNG ids are drawn from. All entities are created on first use and never
//! evicted; lookups are total and fail with a not-found error.
//!
//! # History merge
//!
//! [`Runtime::merge`] folds a finished revision into a branch's working
//! copy, node by node:
//!
//! 1. ref unknown to the working copy -> adopted
//! 2. same storage on both sides -> nothing to do
//! 3. one version descends from the other -> the descendant wins
//! 4. both versions share an earlier version -> attribute three-way merge
//!    against the nearest shared version; the result keeps both sides as
//!    parents so later merges from the same branch start from here
//! 5. anything else -> recorded as a [`NodeConflict`]; commit is refused
//!    until every conflict is resolved

use std::collections::{BTreeMap, HashMap};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::branch::{Branch, BRANCH_ATTRIBUTE};
use crate::config::Config;
use crate::diff::{diff_dicts, diff_lists};
use crate::error::{GraphError, Result};
use crate::history;
use crate::id::{BranchId, NodeId, NodeRef, RevisionId};
use crate::merge::{merge_dicts_with, merge_lists, MergeOutcome};
use crate::node::Node;
use crate::proxy::{Getter, NodeProxy};
use crate::revision::{ConflictReason, NodeConflict, Revision};
use crate::store::{BranchStore, NodeStore, RevisionStore};
use crate::value::{Attributes, Value};

/// Statistics from a history merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Refs the working copy did not know yet
    pub adopted: usize,
    /// Refs moved to a newer version of the same node
    pub fast_forwarded: usize,
    /// Nodes whose attribute bags were three-way merged
    pub merged: usize,
    /// Nodes recorded as conflicts
    pub conflicts: usize,
}

impl MergeSummary {
    /// True if no node was left in conflict
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.conflicts == 0
    }
}

/// Owner of every node version, revision and branch
pub struct Runtime {
    config: Config,
    /// Source of fresh node refs and branch ids
    rng: StdRng,
    /// Physical node versions
    nodes: NodeStore,
    revisions: RevisionStore,
    branches: BranchStore,
    /// Type node ref -> computed attributes
    getters: HashMap<NodeRef, Box<dyn Getter>>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.config)
            .field("nodes", &self.nodes.len())
            .field("revisions", &self.revisions.len())
            .field("branches", &self.branches.len())
            .field("getters", &self.getters.len())
            .finish_non_exhaustive()
    }
}

impl Runtime {
    /// Runtime with default configuration and an entropy-seeded RNG
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Runtime seeded from `config.seed` when set
    pub fn with_config(config: Config) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            rng,
            nodes: NodeStore::new(),
            revisions: RevisionStore::new(),
            branches: BranchStore::new(),
            getters: HashMap::new(),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // ── Registries ─────────────────────────────────────────────────────

    /// Store a node version under `id`, replacing any previous one
    pub fn register_node(&mut self, id: NodeId, node: Node) {
        self.nodes.insert(id, node);
    }

    /// Store `revision` under its own id
    pub fn register_revision(&mut self, revision: Revision) {
        self.revisions.insert(revision.id(), revision);
    }

    /// Store `branch` under its own id
    pub fn register_branch(&mut self, branch: Branch) {
        self.branches.insert(branch.id(), branch);
    }

    /// Node version stored under `id`
    pub fn get_node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.node(&id)
    }

    /// Revision registered under `id`
    pub fn get_revision(&self, id: RevisionId) -> Result<&Revision> {
        self.revisions.get(&id).ok_or(GraphError::RevisionNotFound(id))
    }

    /// Branch registered under `id`
    pub fn get_branch(&self, id: BranchId) -> Result<&Branch> {
        self.branches.get(&id).ok_or(GraphError::BranchNotFound(id))
    }

    /// Branches in creation order
    pub fn get_branches(&self) -> impl Iterator<Item = &Branch> + '_ {
        self.branches.iter().map(|(_, branch)| branch)
    }

    /// Revisions of `branch` in creation order
    pub fn get_revisions(&self, branch: BranchId) -> impl Iterator<Item = &Revision> + '_ {
        self.revisions
            .iter()
            .filter(move |(id, _)| id.branch() == branch)
            .map(|(_, revision)| revision)
    }

    /// Working copy of `branch`
    pub fn wc(&self, branch: BranchId) -> Result<&Revision> {
        self.get_revision(self.get_branch(branch)?.wc())
    }

    /// `revision` and every revision it descends from, newest first
    pub fn log(&self, revision: RevisionId) -> Result<Vec<RevisionId>> {
        self.get_revision(revision)?;
        Ok(history::ancestry(&self.revisions, revision))
    }

    pub(crate) fn revision_and_nodes_mut(&mut self, id: RevisionId) -> Result<(&mut Revision, &mut NodeStore)> {
        let revision = self.revisions.get_mut(&id).ok_or(GraphError::RevisionNotFound(id))?;
        Ok((revision, &mut self.nodes))
    }

    // ── Getters ────────────────────────────────────────────────────────

    /// Read nodes typed `type_ref` through `getter`
    pub fn register_getter(&mut self, type_ref: NodeRef, getter: impl Getter + 'static) {
        self.getters.insert(type_ref, Box::new(getter));
    }

    pub(crate) fn getter(&self, type_ref: NodeRef) -> Option<&dyn Getter> {
        self.getters.get(&type_ref).map(|g| g.as_ref())
    }

    // ── Nodes ──────────────────────────────────────────────────────────

    /// Allocate an empty node in the open revision `revision`
    pub fn create_node(&mut self, revision: RevisionId) -> Result<NodeProxy> {
        let node_ref = NodeRef::generate(&mut self.rng);
        let (revision, nodes) = self.revision_and_nodes_mut(revision)?;
        revision.create_node(nodes, node_ref)
    }

    /// Store an existing node in the open revision `revision`
    pub fn attach_node(&mut self, revision: RevisionId, node: Node) -> Result<NodeProxy> {
        let (revision, nodes) = self.revision_and_nodes_mut(revision)?;
        revision.attach_node(nodes, node)
    }

    /// Proxy for `node_ref` as seen from `revision`
    pub fn node(&self, revision: RevisionId, node_ref: NodeRef) -> Result<NodeProxy> {
        self.get_revision(revision)?.get_node(node_ref)
    }

    // ── Branches ───────────────────────────────────────────────────────

    /// New branch whose working copy (revision 0) holds the branch node
    pub fn create_branch(&mut self) -> Result<BranchId> {
        let id = BranchId::generate(&mut self.rng);
        let node_ref = NodeRef::generate(&mut self.rng);
        let branch = Branch::new(id, node_ref);

        let mut revision = Revision::new(branch.wc(), Vec::new(), BTreeMap::new());
        let mut node = Node::new(node_ref);
        node.set(BRANCH_ATTRIBUTE.to_owned(), Value::BranchId(id));
        revision.attach_node(&mut self.nodes, node)?;

        self.register_revision(revision);
        self.register_branch(branch);
        info!(branch = %id, "branch created");
        Ok(id)
    }

    /// Finish the working copy of `branch` and open its successor.
    ///
    /// Returns the id of the revision just finished.
    pub fn commit(&mut self, branch: BranchId) -> Result<RevisionId> {
        let cursor = self.get_branch(branch)?;
        let finished = cursor.wc();
        let next = cursor
            .next_revision()
            .ok_or(GraphError::RevisionNumbersExhausted(branch))?;

        let revision = self
            .revisions
            .get_mut(&finished)
            .ok_or(GraphError::RevisionNotFound(finished))?;
        revision.finish()?;
        let refs = revision.refs().clone();

        self.revisions.insert(next, Revision::new(next, vec![finished], refs));
        if let Some(cursor) = self.branches.get_mut(&branch) {
            cursor.advance(next);
        }
        info!(branch = %branch, revision = %finished, "revision committed");
        Ok(finished)
    }

    /// New branch seeded with the history of the finished `revision`
    pub fn fork(&mut self, revision: RevisionId) -> Result<BranchId> {
        if !self.get_revision(revision)?.finished() {
            return Err(GraphError::RevisionNotFinished(revision));
        }
        let branch = self.create_branch()?;
        self.merge(branch, revision)?;
        info!(branch = %branch, from = %revision, "branch forked");
        Ok(branch)
    }

    /// Pick `owner`'s version of a conflicting node in the working copy of `branch`
    pub fn resolve_conflict(&mut self, branch: BranchId, node_ref: NodeRef, owner: RevisionId) -> Result<()> {
        let wc = self.get_branch(branch)?.wc();
        let (revision, _) = self.revision_and_nodes_mut(wc)?;
        revision.resolve_conflict(node_ref, owner)
    }

    /// Fold the finished `source` revision into the working copy of `branch`
    pub fn merge(&mut self, branch: BranchId, source: RevisionId) -> Result<MergeSummary> {
        let target = self.get_branch(branch)?.wc();
        let incoming = {
            let source_rev = self.get_revision(source)?;
            if !source_rev.finished() {
                return Err(GraphError::RevisionNotFinished(source));
            }
            source_rev
                .refs()
                .iter()
                .map(|(&node_ref, &owner)| (node_ref, owner))
                .collect::<Vec<_>>()
        };
        if self.get_revision(target)?.finished() {
            return Err(GraphError::RevisionFinished(target));
        }

        let mut summary = MergeSummary::default();
        if history::is_ancestor(&self.revisions, source, target) {
            debug!(branch = %branch, source = %source, "already merged");
            return Ok(summary);
        }

        let merge_attributes = self.config.merge_attributes;
        let revision = self
            .revisions
            .get_mut(&target)
            .ok_or(GraphError::RevisionNotFound(target))?;
        let nodes = &mut self.nodes;

        for (node_ref, theirs) in incoming {
            let Some(&ours) = revision.refs().get(&node_ref) else {
                revision.adopt(node_ref, theirs);
                summary.adopted += 1;
                continue;
            };
            if ours == theirs {
                continue;
            }

            let (ours_id, theirs_id) = (NodeId::new(node_ref, ours), NodeId::new(node_ref, theirs));
            if nodes.lineage(ours_id).contains(&theirs_id) {
                continue;
            }
            if nodes.lineage(theirs_id).contains(&ours_id) {
                revision.adopt(node_ref, theirs);
                summary.fast_forwarded += 1;
                continue;
            }

            let reason = match nodes.merge_base(ours_id, theirs_id) {
                Some(base) if merge_attributes => match merge_node(nodes, base, ours_id, theirs_id)? {
                    MergeOutcome::Merged(content) => {
                        // the merged version descends from both sides
                        let mut origins = if ours == target {
                            nodes.node(&ours_id)?.origins().to_vec()
                        } else {
                            vec![ours_id]
                        };
                        origins.push(theirs_id);
                        revision.attach_node(nodes, Node::with_content(node_ref, content, origins))?;
                        summary.merged += 1;
                        continue;
                    }
                    MergeOutcome::Conflict { at, conflict } => ConflictReason::Attribute { name: at, conflict },
                    MergeOutcome::Error { at, error } => ConflictReason::History { name: at, error },
                },
                _ => ConflictReason::Diverged,
            };
            revision.record_conflict(NodeConflict {
                node_ref,
                ours,
                theirs,
                reason,
            });
            summary.conflicts += 1;
        }
        revision.add_ancestor(source);

        if summary.is_clean() {
            info!(branch = %branch, source = %source, ?summary, "revision merged");
        } else {
            warn!(branch = %branch, source = %source, conflicts = summary.conflicts, "merge left conflicts");
        }
        Ok(summary)
    }
}

/// Three-way merge of two versions of a node against their common version
fn merge_node(nodes: &NodeStore, base: NodeId, ours: NodeId, theirs: NodeId) -> Result<MergeOutcome<Attributes, String>> {
    let base = nodes.node(&base)?.content();
    let ours = diff_dicts(base, nodes.node(&ours)?.content());
    let theirs = diff_dicts(base, nodes.node(&theirs)?.content());
    Ok(merge_dicts_with(&ours, &theirs, merge_list_values))
}

/// Lists edited on both sides are merged element-wise
fn merge_list_values(_name: &String, original: &Value, ours: &Value, theirs: &Value) -> Option<Value> {
    let (Value::List(original), Value::List(ours), Value::List(theirs)) = (original, ours, theirs) else {
        return None;
    };
    merge_lists(&diff_lists(original, ours), &diff_lists(original, theirs))
        .merged()
        .map(|list| Value::List(list.to_vec()))
}

// ── Tests ──────────────────────────────────────────────────────────────
