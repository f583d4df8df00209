//! ygg-graph: Versioned Node Graph
//!
//! Branch it, commit it, merge it back.
//!
//! A small in-memory store of open attribute-bag nodes that live inside
//! revisions, with git-like history:
//! - Copy-on-write revisions: untouched nodes are shared with ancestors
//! - Capability-scoped proxies (read-only, read-write, copy-on-write)
//! - Change-tracking mapping, sequence and set containers
//! - Three-way merge with distinct conflict and error outcomes
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`id`] | NodeRef, BranchId, RevisionId, NodeId and their text forms |
//! | [`value`] | Attribute value union and JSON conversion |
//! | [`node`] | Node versions (attribute bag + fork origin) |
//! | [`store`] | Insertion-ordered registries |
//! | [`revision`] | Revision state machine, proxy resolution, copy-on-write |
//! | [`branch`] | Branch cursor over its working copy |
//! | [`runtime`] | Registry and factory: branches, commit, fork, history merge |
//! | [`history`] | Ancestry walks over the revision DAG |
//! | [`proxy`] | Access-scoped node handles and the getter hook |
//! | [`proxy_dict`] | Change-tracking mapping |
//! | [`proxy_list`] | Change-tracking sequence with tombstones |
//! | [`proxy_set`] | Change-tracking set |
//! | [`merge`] | Three-way merge of lists and mappings |
//! | [`diff`] | Change-tracking containers from two snapshots |
//! | [`schema`] | Declarative type taxonomy bootstrap |
//! | [`config`] | Runtime configuration (TOML) |
//! | [`error`] | Error taxonomy |
//! | `shared` | `Arc<RwLock<Runtime>>` handle (feature `sync`) |
//!
//! # Feature flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `sync` | `SharedRuntime` for multi-threaded callers (pulls `parking_lot`) |
//!
//! # Quick Start
//!
//! ```
//! use ygg_graph::{Access, Runtime, Value};
//!
//! let mut rt = Runtime::new();
//! let main = rt.create_branch().unwrap();
//!
//! // Write a node in the working copy and commit it
//! let wc = rt.get_branch(main).unwrap().wc();
//! let note = rt.create_node(wc).unwrap();
//! note.set(&mut rt, "title", "hello").unwrap();
//! let r0 = rt.commit(main).unwrap();
//!
//! // A fork inherits the node without copying it
//! let side = rt.fork(r0).unwrap();
//! let view = rt.wc(side).unwrap().get_node(note.node_ref()).unwrap();
//! assert_eq!(view.access(), Access::CopyOnWrite);
//! assert_eq!(view.get(&rt, "title").unwrap(), Value::from("hello"));
//! ```

pub mod branch;
pub mod config;
pub mod diff;
pub mod error;
pub mod history;
pub mod id;
pub mod merge;
pub mod node;
pub mod proxy;
pub mod proxy_dict;
pub mod proxy_list;
pub mod proxy_set;
pub mod revision;
pub mod runtime;
pub mod schema;
#[cfg(feature = "sync")]
pub mod shared;
pub mod store;
pub mod value;

pub use branch::Branch;
pub use config::Config;
pub use diff::{diff_dicts, diff_lists};
pub use error::{GraphError, IdKind, Result};
pub use id::{BranchId, NodeId, NodeRef, RevisionId};
pub use merge::{
    merge_dicts, merge_dicts_with, merge_lists, MergeConflict, MergeError, MergeOutcome, MergeStep, ProxyListMerge,
};
pub use node::Node;
pub use proxy::{Access, Getter, NodeProxy};
pub use proxy_dict::ProxyDict;
pub use proxy_list::{ProxyList, Slot, SlotKind, SlotStream};
pub use proxy_set::ProxySet;
pub use revision::{ConflictReason, NodeConflict, Ownership, Revision};
pub use runtime::{MergeSummary, Runtime};
pub use schema::{SchemaBuilder, TypeDecl};
#[cfg(feature = "sync")]
pub use shared::SharedRuntime;
pub use value::{Attributes, Value};
