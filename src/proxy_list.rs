//! Change-tracking sequence
//!
//! [`ProxyList`] keeps one [`Slot`] per element. Removing a base element
//! leaves a tombstone so the merge stage can still see what was deleted
//! and where; public indices are *virtual* and skip tombstones.
//!
//! ```
//! use ygg_graph::ProxyList;
//!
//! let mut l = ProxyList::new(vec!['A', 'B', 'C']);
//! l.remove(1).unwrap();
//! assert_eq!(l.to_vec(), vec!['A', 'C']);
//! assert_eq!(l.slots().len(), 3); // tombstone kept
//! ```

use crate::error::{GraphError, Result};

/// Tracking state of a slot (or a dictionary key)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    /// No such element on this side ("stream exhausted" for lists)
    Absent,
    Unmodified,
    Inserted,
    Changed,
    Removed,
}

impl core::fmt::Display for SlotKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            SlotKind::Absent => "absent",
            SlotKind::Unmodified => "unmodified",
            SlotKind::Inserted => "inserted",
            SlotKind::Changed => "changed",
            SlotKind::Removed => "removed",
        })
    }
}

/// One element position in a [`ProxyList`]
#[derive(Debug, Clone, PartialEq)]
pub enum Slot<T> {
    /// Base element, untouched
    Unmodified(T),
    /// New element with no base position
    Inserted(T),
    /// Base element replaced; the original is kept
    Changed { value: T, original: T },
    /// Base element deleted; tombstone keeps the original
    Removed { original: T },
}

impl<T> Slot<T> {
    /// Tracking state of the slot
    pub fn kind(&self) -> SlotKind {
        match self {
            Slot::Unmodified(_) => SlotKind::Unmodified,
            Slot::Inserted(_) => SlotKind::Inserted,
            Slot::Changed { .. } => SlotKind::Changed,
            Slot::Removed { .. } => SlotKind::Removed,
        }
    }

    /// Current value; `None` for tombstones
    pub fn value(&self) -> Option<&T> {
        match self {
            Slot::Unmodified(v) | Slot::Inserted(v) | Slot::Changed { value: v, .. } => Some(v),
            Slot::Removed { .. } => None,
        }
    }

    /// Base value; `None` for insertions
    pub fn original(&self) -> Option<&T> {
        match self {
            Slot::Unmodified(v) | Slot::Changed { original: v, .. } | Slot::Removed { original: v } => Some(v),
            Slot::Inserted(_) => None,
        }
    }

    /// True for tombstones
    pub fn is_removed(&self) -> bool {
        matches!(self, Slot::Removed { .. })
    }

    /// Current value, consuming the slot
    pub fn into_value(self) -> Option<T> {
        match self {
            Slot::Unmodified(v) | Slot::Inserted(v) | Slot::Changed { value: v, .. } => Some(v),
            Slot::Removed { .. } => None,
        }
    }

    fn replaced(self, value: T) -> Self {
        match self {
            Slot::Unmodified(original) | Slot::Changed { original, .. } => Slot::Changed { value, original },
            Slot::Inserted(_) => Slot::Inserted(value),
            // translate() never lands on a tombstone
            removed @ Slot::Removed { .. } => removed,
        }
    }

    fn tombstone(self) -> Self {
        match self {
            Slot::Unmodified(original) | Slot::Changed { original, .. } | Slot::Removed { original } => {
                Slot::Removed { original }
            }
            inserted @ Slot::Inserted(_) => inserted,
        }
    }
}

/// Sequence that tracks edits against its base as slots
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyList<T> {
    slots: Vec<Slot<T>>,
    /// Number of non-removed slots
    len: usize,
}

impl<T> Default for ProxyList<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            len: 0,
        }
    }
}

impl<T> ProxyList<T> {
    /// Track edits over `base`
    pub fn new(base: Vec<T>) -> Self {
        let len = base.len();
        Self {
            slots: base.into_iter().map(Slot::Unmodified).collect(),
            len,
        }
    }

    /// Rebuild a list from raw slots (e.g. a merge result)
    pub fn from_slots(slots: Vec<Slot<T>>) -> Self {
        let len = slots.iter().filter(|s| !s.is_removed()).count();
        Self { slots, len }
    }

    /// Number of visible elements
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if no element is visible
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// All slots in order, tombstones included
    pub fn slots(&self) -> &[Slot<T>] {
        &self.slots
    }

    /// Consume into the slot sequence
    pub fn into_slots(self) -> Vec<Slot<T>> {
        self.slots
    }

    /// Map a virtual position (`0..=len`) to its real slot position.
    ///
    /// `index == len` maps past the last slot so it can be used for appends.
    pub fn translate(&self, index: usize) -> Result<usize> {
        let mut remaining = index;
        for (real, slot) in self.slots.iter().enumerate() {
            if slot.is_removed() {
                continue;
            }
            if remaining == 0 {
                return Ok(real);
            }
            remaining -= 1;
        }
        if remaining == 0 {
            Ok(self.slots.len())
        } else {
            Err(GraphError::IndexOutOfRange { index, len: self.len })
        }
    }

    fn check_index(&self, index: usize) -> Result<usize> {
        if index >= self.len {
            return Err(GraphError::IndexOutOfRange { index, len: self.len });
        }
        self.translate(index)
    }

    /// Element at virtual `index`
    pub fn get(&self, index: usize) -> Result<&T> {
        let real = self.check_index(index)?;
        self.slots[real]
            .value()
            .ok_or(GraphError::IndexOutOfRange { index, len: self.len })
    }

    /// Replace the element at `index`
    pub fn set(&mut self, index: usize, value: T) -> Result<()> {
        let real = self.check_index(index)?;
        self.rewrite(real, |slot| slot.replaced(value));
        Ok(())
    }

    /// Insert before virtual position `index` (`index == len` appends)
    pub fn insert(&mut self, index: usize, value: T) -> Result<()> {
        let real = self.translate(index)?;
        self.slots.insert(real, Slot::Inserted(value));
        self.len += 1;
        Ok(())
    }

    /// Append an inserted element
    pub fn push(&mut self, value: T) {
        self.slots.push(Slot::Inserted(value));
        self.len += 1;
    }

    /// Delete the element at `index`.
    ///
    /// Inserted elements vanish; base elements become tombstones.
    pub fn remove(&mut self, index: usize) -> Result<()> {
        let real = self.check_index(index)?;
        if matches!(self.slots[real], Slot::Inserted(_)) {
            self.slots.remove(real);
        } else {
            self.rewrite(real, Slot::tombstone);
        }
        self.len -= 1;
        Ok(())
    }

    /// Replace the slot at `real` with `f(old)`, keeping slot order
    fn rewrite(&mut self, real: usize, f: impl FnOnce(Slot<T>) -> Slot<T>) {
        let old = self.slots.remove(real);
        self.slots.insert(real, f(old));
    }

    /// Current values in order
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter_map(Slot::value)
    }

    /// Every slot in order, then an endless run of `None`.
    ///
    /// Each call starts a fresh pass.
    pub fn iterdata(&self) -> SlotStream<'_, T> {
        SlotStream {
            slots: self.slots.iter(),
        }
    }

    /// True if any slot differs from the base
    pub fn is_modified(&self) -> bool {
        self.slots.iter().any(|s| !matches!(s, Slot::Unmodified(_)))
    }
}

impl<T: Clone> ProxyList<T> {
    /// Current values, cloned
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }

    /// Reconstruct the base sequence
    pub fn base(&self) -> Vec<T> {
        self.slots.iter().filter_map(Slot::original).cloned().collect()
    }
}

impl<T: PartialEq> ProxyList<T> {
    /// True if `value` is visible
    pub fn contains(&self, value: &T) -> bool {
        self.iter().any(|v| v == value)
    }
}

impl<T> FromIterator<T> for ProxyList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Endless slot stream returned by [`ProxyList::iterdata`]
#[derive(Debug, Clone)]
pub struct SlotStream<'a, T> {
    slots: core::slice::Iter<'a, Slot<T>>,
}

impl<'a, T> Iterator for SlotStream<'a, T> {
    type Item = Option<&'a Slot<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.slots.next())
    }
}
