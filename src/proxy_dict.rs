//! Change-tracking mapping
//!
//! [`ProxyDict`] layers edits over a base snapshot and remembers, per key,
//! whether it was added, changed or removed relative to that base. The
//! original base value is kept for changed and removed keys so a later
//! three-way merge can compare both sides against a common ancestor.
//!
//! ```
//! use std::collections::BTreeMap;
//! use ygg_graph::ProxyDict;
//!
//! let mut d = ProxyDict::new(BTreeMap::from([("a", 0)]));
//! d.insert("a", 1);
//! d.insert("a", 2);
//! assert_eq!(d.changed().get("a"), Some(&0)); // original, not first write
//! ```

use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};

use crate::proxy_list::SlotKind;

/// Mapping that tracks edits against its base snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyDict<K, V> {
    /// Current view: untouched, added and changed entries
    fields: BTreeMap<K, V>,
    /// Keys that did not exist in the base
    added: BTreeSet<K>,
    /// Original base values of replaced keys
    changed: BTreeMap<K, V>,
    /// Original base values of deleted keys
    removed: BTreeMap<K, V>,
}

impl<K: Ord, V> Default for ProxyDict<K, V> {
    fn default() -> Self {
        Self {
            fields: BTreeMap::new(),
            added: BTreeSet::new(),
            changed: BTreeMap::new(),
            removed: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Clone, V: Clone> ProxyDict<K, V> {
    /// Track edits over `base`
    pub fn new(base: BTreeMap<K, V>) -> Self {
        Self {
            fields: base,
            ..Self::default()
        }
    }

    /// Current value of `key`
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.fields.get(key)
    }

    /// True if `key` is in the current view
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.fields.contains_key(key)
    }

    /// Set `key`, returning the previous current value
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.fields.get(&key) {
            Some(old) => {
                if !self.added.contains(&key) && !self.changed.contains_key(&key) {
                    self.changed.insert(key.clone(), old.clone());
                }
            }
            None => match self.removed.remove(&key) {
                Some(original) => {
                    self.changed.insert(key.clone(), original);
                }
                None => {
                    self.added.insert(key.clone());
                }
            },
        }
        self.fields.insert(key, value)
    }

    /// Delete `key`, returning its current value
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let (key, current) = self.fields.remove_entry(key)?;
        if !self.added.remove::<K>(&key) {
            let original = self.changed.remove::<K>(&key).unwrap_or_else(|| current.clone());
            self.removed.insert(key, original);
        }
        Some(current)
    }

    /// Number of current entries
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if the current view is empty
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Current entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.fields.iter()
    }

    /// Current keys in order
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.fields.keys()
    }

    /// Current view as a plain map
    pub fn current(&self) -> &BTreeMap<K, V> {
        &self.fields
    }

    /// Consume into the current mapping
    pub fn into_current(self) -> BTreeMap<K, V> {
        self.fields
    }

    /// Keys absent from the base
    pub fn added(&self) -> &BTreeSet<K> {
        &self.added
    }

    /// Base keys given a new value, with their original values
    pub fn changed(&self) -> &BTreeMap<K, V> {
        &self.changed
    }

    /// Base keys deleted, with their original values
    pub fn removed(&self) -> &BTreeMap<K, V> {
        &self.removed
    }

    /// True if any key differs from the base
    pub fn is_modified(&self) -> bool {
        !(self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty())
    }

    /// Tracking state of `key`; [`SlotKind::Absent`] if neither base nor current has it
    pub fn kind_of<Q>(&self, key: &Q) -> SlotKind
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        if self.added.contains(key) {
            SlotKind::Inserted
        } else if self.changed.contains_key(key) {
            SlotKind::Changed
        } else if self.removed.contains_key(key) {
            SlotKind::Removed
        } else if self.fields.contains_key(key) {
            SlotKind::Unmodified
        } else {
            SlotKind::Absent
        }
    }

    /// Value `key` had in the base snapshot
    pub fn original<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self.kind_of(key) {
            SlotKind::Changed => self.changed.get(key),
            SlotKind::Removed => self.removed.get(key),
            SlotKind::Unmodified => self.fields.get(key),
            SlotKind::Inserted | SlotKind::Absent => None,
        }
    }

    /// Every key known to either the base or the current view
    pub fn all_keys(&self) -> BTreeSet<K> {
        self.fields.keys().chain(self.removed.keys()).cloned().collect()
    }

    /// Reconstruct the base snapshot
    pub fn base(&self) -> BTreeMap<K, V> {
        let mut base: BTreeMap<K, V> = self
            .fields
            .iter()
            .filter(|(k, _)| !self.added.contains(*k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (k, v) in self.changed.iter().chain(self.removed.iter()) {
            base.insert(k.clone(), v.clone());
        }
        base
    }
}

impl<K: Ord + Clone, V: Clone> FromIterator<(K, V)> for ProxyDict<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
