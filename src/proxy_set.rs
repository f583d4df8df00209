//! Change-tracking set
//!
//! Members inserted or removed relative to a base set.

use std::borrow::Borrow;
use std::collections::BTreeSet;

/// Set that tracks members added and removed against its base
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySet<T> {
    items: BTreeSet<T>,
    added: BTreeSet<T>,
    removed: BTreeSet<T>,
}

impl<T: Ord> Default for ProxySet<T> {
    fn default() -> Self {
        Self {
            items: BTreeSet::new(),
            added: BTreeSet::new(),
            removed: BTreeSet::new(),
        }
    }
}

impl<T: Ord + Clone> ProxySet<T> {
    /// Unmodified view of `base`
    pub fn new(base: BTreeSet<T>) -> Self {
        Self {
            items: base,
            ..Self::default()
        }
    }

    /// Returns `false` if `value` was already a member
    pub fn insert(&mut self, value: T) -> bool {
        if self.items.contains(&value) {
            return false;
        }
        if !self.removed.remove(&value) {
            self.added.insert(value.clone());
        }
        self.items.insert(value)
    }

    /// Returns `false` if `value` was not a member
    pub fn remove<Q>(&mut self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let Some(value) = self.items.take(value) else {
            return false;
        };
        if !self.added.remove::<T>(&value) {
            self.removed.insert(value);
        }
        true
    }

    /// True if `value` is a current member
    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.items.contains(value)
    }

    /// Number of current members
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if there are no current members
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Current members in order
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Members not present in the base
    pub fn added(&self) -> &BTreeSet<T> {
        &self.added
    }

    /// Base members no longer present
    pub fn removed(&self) -> &BTreeSet<T> {
        &self.removed
    }
}
