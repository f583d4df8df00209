//! Thread-safe runtime handle
//!
//! Readers share the lock; every mutation, including a whole commit or
//! history merge, runs under the single write lock, so no writer can see
//! a revision half finished.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::Result;
use crate::id::{BranchId, RevisionId};
use crate::runtime::{MergeSummary, Runtime};

/// Cloneable `Arc<RwLock<Runtime>>`
#[derive(Debug, Clone, Default)]
pub struct SharedRuntime {
    inner: Arc<RwLock<Runtime>>,
}

impl SharedRuntime {
    /// Share `runtime`
    pub fn new(runtime: Runtime) -> Self {
        Self {
            inner: Arc::new(RwLock::new(runtime)),
        }
    }

    /// Run `f` under the read lock
    pub fn read<R>(&self, f: impl FnOnce(&Runtime) -> R) -> R {
        f(&*self.inner.read())
    }

    /// Run `f` under the write lock
    pub fn write<R>(&self, f: impl FnOnce(&mut Runtime) -> R) -> R {
        f(&mut *self.inner.write())
    }

    /// See [`Runtime::create_branch`]
    pub fn create_branch(&self) -> Result<BranchId> {
        self.inner.write().create_branch()
    }

    /// See [`Runtime::commit`]
    pub fn commit(&self, branch: BranchId) -> Result<RevisionId> {
        self.inner.write().commit(branch)
    }

    /// See [`Runtime::merge`]
    pub fn merge(&self, branch: BranchId, source: RevisionId) -> Result<MergeSummary> {
        self.inner.write().merge(branch, source)
    }

    /// See [`Runtime::fork`]
    pub fn fork(&self, revision: RevisionId) -> Result<BranchId> {
        self.inner.write().fork(revision)
    }

    /// The runtime, if this is the last handle
    pub fn into_inner(self) -> Option<Runtime> {
        Arc::try_unwrap(self.inner).ok().map(RwLock::into_inner)
    }
}

impl From<Runtime> for SharedRuntime {
    fn from(runtime: Runtime) -> Self {
        Self::new(runtime)
    }
}
