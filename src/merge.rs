//! Three-way merge
//!
//! Merges two change-tracking containers derived from a common base.
//! Every element is classified by the pair of states it has on each side;
//! the outcome is either a merged container, a **conflict** (both sides
//! edited the same original value, needs a policy decision) or an
//! **error** (the two sides disagree about the base itself and were not
//! derived from a common ancestor).
//!
//! List conflicts (`ours` × `theirs`):
//!
//! ```text
//!       0 V I C R
//!     0 - - - - -
//!     V - - - - -
//!     I - - - - -
//!     C - - - X X
//!     R - - - X -
//! ```
//!
//! List errors, raised when the original values disagree:
//!
//! ```text
//!       0 V I C R
//!     0 - - - - -
//!     V - X - X X
//!     I - - - - -
//!     C - X - X X
//!     R - X - X X
//! ```

use std::collections::{BTreeMap, BTreeSet};

use crate::proxy_dict::ProxyDict;
use crate::proxy_list::{ProxyList, Slot, SlotKind, SlotStream};

/// Both sides edited the same original value
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("merge conflict: {ours} (ours) vs {theirs} (theirs)")]
pub struct MergeConflict {
    pub ours: SlotKind,
    pub theirs: SlotKind,
}

/// The two sides disagree about the base
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("merge error: {ours} (ours) vs {theirs} (theirs) do not share a base")]
pub struct MergeError {
    pub ours: SlotKind,
    pub theirs: SlotKind,
}

/// Result of a single [`ProxyListMerge::merge_one`] step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStep {
    /// One element was merged; call again
    Continue,
    /// Both streams are exhausted
    Completed,
    Conflict(MergeConflict),
    Error(MergeError),
}

/// Final result of a merge; `L` locates the first failing element
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome<T, L> {
    Merged(T),
    Conflict { at: L, conflict: MergeConflict },
    Error { at: L, error: MergeError },
}

impl<T, L> MergeOutcome<T, L> {
    /// True for a clean merge
    pub fn is_merged(&self) -> bool {
        matches!(self, MergeOutcome::Merged(_))
    }

    /// The merged value, `None` on conflict or error
    pub fn merged(self) -> Option<T> {
        match self {
            MergeOutcome::Merged(value) => Some(value),
            _ => None,
        }
    }
}

// ── Lists ──────────────────────────────────────────────────────────────

/// Lockstep merge of two [`ProxyList`]s over the same base
pub struct ProxyListMerge<'a, T> {
    stream1: SlotStream<'a, T>,
    stream2: SlotStream<'a, T>,
    item1: Option<&'a Slot<T>>,
    item2: Option<&'a Slot<T>>,
    result: Vec<Slot<T>>,
    /// Base positions consumed so far
    base_index: usize,
}

impl<'a, T: Clone + PartialEq> ProxyListMerge<'a, T> {
    /// Merge `list1` (ours) with `list2` (theirs)
    pub fn new(list1: &'a ProxyList<T>, list2: &'a ProxyList<T>) -> Self {
        let mut stream1 = list1.iterdata();
        let mut stream2 = list2.iterdata();
        let item1 = stream1.next().flatten();
        let item2 = stream2.next().flatten();
        Self {
            stream1,
            stream2,
            item1,
            item2,
            result: Vec::new(),
            base_index: 0,
        }
    }

    /// Slots merged so far
    pub fn result(&self) -> &[Slot<T>] {
        &self.result
    }

    /// Base position of the element under consideration
    pub fn base_index(&self) -> usize {
        self.base_index
    }

    fn push1(&mut self) {
        if let Some(slot) = self.item1 {
            self.result.push(slot.clone());
        }
        self.item1 = self.stream1.next().flatten();
    }

    fn push2(&mut self) {
        if let Some(slot) = self.item2 {
            self.result.push(slot.clone());
        }
        self.item2 = self.stream2.next().flatten();
    }

    /// Keep `slot`, advance both streams past one base position
    fn take(&mut self, slot: &Slot<T>) {
        self.result.push(slot.clone());
        self.item1 = self.stream1.next().flatten();
        self.item2 = self.stream2.next().flatten();
        self.base_index += 1;
    }

    /// Merge the next element. Stops (returns the same outcome again) at
    /// the first conflict or error.
    pub fn merge_one(&mut self) -> MergeStep {
        use Slot::*;

        let (a, b) = match (self.item1, self.item2) {
            (None, None) => return MergeStep::Completed,
            (None, Some(_)) => {
                self.push2();
                return MergeStep::Continue;
            }
            (Some(_), None) => {
                self.push1();
                return MergeStep::Continue;
            }
            (Some(a), Some(b)) => (a, b),
        };

        let conflict = |a: &Slot<T>, b: &Slot<T>| {
            MergeStep::Conflict(MergeConflict {
                ours: a.kind(),
                theirs: b.kind(),
            })
        };
        let error = |a: &Slot<T>, b: &Slot<T>| {
            MergeStep::Error(MergeError {
                ours: a.kind(),
                theirs: b.kind(),
            })
        };

        match (a, b) {
            (Inserted(_), _) => self.push1(),
            (_, Inserted(_)) => self.push2(),

            (Removed { original: o1 }, Removed { original: o2 }) => {
                if o1 != o2 {
                    return error(a, b);
                }
                self.take(a);
            }
            (Removed { original: o1 }, Changed { original: o2, .. })
            | (Changed { original: o1, .. }, Removed { original: o2 })
            | (Changed { original: o1, .. }, Changed { original: o2, .. }) => {
                return if o1 == o2 { conflict(a, b) } else { error(a, b) };
            }
            (Removed { original }, Unmodified(value)) | (Changed { original, .. }, Unmodified(value)) => {
                if original != value {
                    return error(a, b);
                }
                self.take(a);
            }
            (Unmodified(value), Removed { original }) | (Unmodified(value), Changed { original, .. }) => {
                if value != original {
                    return error(a, b);
                }
                self.take(b);
            }
            (Unmodified(v1), Unmodified(v2)) => {
                if v1 != v2 {
                    return error(a, b);
                }
                self.take(a);
            }
        }
        MergeStep::Continue
    }

    /// Drive [`merge_one`](Self::merge_one) to completion
    pub fn run(mut self) -> MergeOutcome<ProxyList<T>, usize> {
        loop {
            match self.merge_one() {
                MergeStep::Continue => {}
                MergeStep::Completed => return MergeOutcome::Merged(ProxyList::from_slots(self.result)),
                MergeStep::Conflict(conflict) => {
                    return MergeOutcome::Conflict {
                        at: self.base_index,
                        conflict,
                    }
                }
                MergeStep::Error(error) => {
                    return MergeOutcome::Error {
                        at: self.base_index,
                        error,
                    }
                }
            }
        }
    }
}

/// Merge two lists; shorthand for `ProxyListMerge::new(a, b).run()`
pub fn merge_lists<T: Clone + PartialEq>(a: &ProxyList<T>, b: &ProxyList<T>) -> MergeOutcome<ProxyList<T>, usize> {
    ProxyListMerge::new(a, b).run()
}

// ── Mappings ───────────────────────────────────────────────────────────

/// Three-way merge of two [`ProxyDict`]s over the same base.
///
/// Identical edits on both sides merge cleanly.
pub fn merge_dicts<K, V>(a: &ProxyDict<K, V>, b: &ProxyDict<K, V>) -> MergeOutcome<BTreeMap<K, V>, K>
where
    K: Ord + Clone,
    V: Clone + PartialEq,
{
    merge_dicts_with(a, b, |_, _, _, _| None)
}

/// Like [`merge_dicts`], but offers every change/change conflict to
/// `resolve(key, original, ours, theirs)` first; `Some(value)` settles it.
pub fn merge_dicts_with<K, V, F>(a: &ProxyDict<K, V>, b: &ProxyDict<K, V>, mut resolve: F) -> MergeOutcome<BTreeMap<K, V>, K>
where
    K: Ord + Clone,
    V: Clone + PartialEq,
    F: FnMut(&K, &V, &V, &V) -> Option<V>,
{
    use SlotKind::*;

    let keys: BTreeSet<K> = a.all_keys().into_iter().chain(b.all_keys()).collect();
    let mut merged = BTreeMap::new();

    for key in keys {
        let (ka, kb) = (a.kind_of(&key), b.kind_of(&key));
        let original = a.original(&key);
        if original != b.original(&key) {
            return MergeOutcome::Error {
                at: key,
                error: MergeError { ours: ka, theirs: kb },
            };
        }
        let (va, vb) = (a.get(&key), b.get(&key));
        let conflict = MergeConflict { ours: ka, theirs: kb };

        let value = match (ka, kb) {
            (Inserted, Inserted) | (Changed, Changed) => {
                if va == vb {
                    va.cloned()
                } else {
                    let resolved = match (original, va, vb) {
                        (Some(o), Some(x), Some(y)) => resolve(&key, o, x, y),
                        _ => None,
                    };
                    match resolved {
                        Some(v) => Some(v),
                        None => return MergeOutcome::Conflict { at: key, conflict },
                    }
                }
            }
            (Removed, Changed) | (Changed, Removed) => return MergeOutcome::Conflict { at: key, conflict },
            (Removed, _) | (_, Removed) => None,
            (Changed, _) | (Inserted, _) => va.cloned(),
            (_, Changed) | (_, Inserted) => vb.cloned(),
            _ => va.cloned(),
        };
        if let Some(value) = value {
            merged.insert(key, value);
        }
    }
    MergeOutcome::Merged(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(s: &str) -> ProxyList<char> {
        s.chars().collect()
    }

    fn merged(a: &ProxyList<char>, b: &ProxyList<char>) -> String {
        match merge_lists(a, b) {
            MergeOutcome::Merged(l) => l.iter().collect(),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_merge_identical() {
        let (l1, l2) = (list("ABCDEF"), list("ABCDEF"));
        assert_eq!(merged(&l1, &l2), "ABCDEF");
    }

    #[test]
    fn test_merge_distinct_insertions() {
        let (mut l1, mut l2) = (list("ABCDEF"), list("ABCDEF"));
        l1.insert(2, 'M').unwrap();
        l2.insert(3, 'N').unwrap();
        assert_eq!(merged(&l1, &l2), "ABMCNDEF");
        // deterministic
        assert_eq!(merged(&l1, &l2), "ABMCNDEF");
    }

    #[test]
    fn test_merge_distinct_removals() {
        let (mut l1, mut l2) = (list("ABCDEF"), list("ABCDEF"));
        l1.remove(2).unwrap();
        l2.remove(4).unwrap();
        assert_eq!(merged(&l1, &l2), "ABDF");
    }

    #[test]
    fn test_merge_same_removal() {
        let (mut l1, mut l2) = (list("ABC"), list("ABC"));
        l1.remove(1).unwrap();
        l2.remove(1).unwrap();
        assert_eq!(merged(&l1, &l2), "AC");
    }

    #[test]
    fn test_merge_one_sided_change() {
        let (mut l1, l2) = (list("ABC"), list("ABC"));
        l1.set(0, 'Z').unwrap();
        assert_eq!(merged(&l1, &l2), "ZBC");
        assert_eq!(merged(&l2, &l1), "ZBC");
    }

    #[test]
    fn test_merge_tail_appends() {
        let (mut l1, mut l2) = (list("AB"), list("AB"));
        l1.push('X');
        l2.push('Y');
        l2.push('Z');
        assert_eq!(merged(&l1, &l2), "ABXYZ");
    }

    #[test]
    fn test_change_vs_remove_is_conflict() {
        let (mut l1, mut l2) = (list("ABC"), list("ABC"));
        l1.set(1, 'X').unwrap();
        l2.remove(1).unwrap();
        let outcome = merge_lists(&l1, &l2);
        assert_eq!(
            outcome,
            MergeOutcome::Conflict {
                at: 1,
                conflict: MergeConflict {
                    ours: SlotKind::Changed,
                    theirs: SlotKind::Removed
                }
            }
        );
        let outcome = merge_lists(&l2, &l1);
        assert!(matches!(
            outcome,
            MergeOutcome::Conflict { conflict: MergeConflict { ours: SlotKind::Removed, theirs: SlotKind::Changed }, .. }
        ));
    }

    #[test]
    fn test_change_vs_change_is_conflict() {
        let (mut l1, mut l2) = (list("ABC"), list("ABC"));
        l1.set(2, 'X').unwrap();
        l2.set(2, 'X').unwrap();
        assert!(matches!(merge_lists(&l1, &l2), MergeOutcome::Conflict { at: 2, .. }));
    }

    #[test]
    fn test_unrelated_bases_are_error() {
        let (l1, l2) = (list("ABC"), list("AXC"));
        assert_eq!(
            merge_lists(&l1, &l2),
            MergeOutcome::Error {
                at: 1,
                error: MergeError {
                    ours: SlotKind::Unmodified,
                    theirs: SlotKind::Unmodified
                }
            }
        );
    }

    #[test]
    fn test_remove_vs_mismatched_unmodified_is_error() {
        let (mut l1, l2) = (list("ABC"), list("AXC"));
        l1.remove(1).unwrap();
        assert!(matches!(
            merge_lists(&l1, &l2),
            MergeOutcome::Error { error: MergeError { ours: SlotKind::Removed, theirs: SlotKind::Unmodified }, .. }
        ));
    }

    fn error_kinds(l1: &ProxyList<char>, l2: &ProxyList<char>) -> (usize, SlotKind, SlotKind) {
        match merge_lists(l1, l2) {
            MergeOutcome::Error { at, error } => (at, error.ours, error.theirs),
            other => panic!("expected an error, got {other:?}"),
        }
    }

    #[test]
    fn test_both_removed_different_originals_is_error() {
        let (mut l1, mut l2) = (list("ABC"), list("AXC"));
        l1.remove(1).unwrap();
        l2.remove(1).unwrap();
        assert_eq!(error_kinds(&l1, &l2), (1, SlotKind::Removed, SlotKind::Removed));
    }

    #[test]
    fn test_remove_vs_change_different_originals_is_error() {
        let (mut l1, mut l2) = (list("ABC"), list("AXC"));
        l1.remove(1).unwrap();
        l2.set(1, 'Y').unwrap();
        assert_eq!(error_kinds(&l1, &l2), (1, SlotKind::Removed, SlotKind::Changed));
        assert_eq!(error_kinds(&l2, &l1), (1, SlotKind::Changed, SlotKind::Removed));
    }

    #[test]
    fn test_both_changed_different_originals_is_error() {
        let (mut l1, mut l2) = (list("ABC"), list("ABX"));
        l1.set(2, 'Y').unwrap();
        l2.set(2, 'Y').unwrap();
        assert_eq!(error_kinds(&l1, &l2), (2, SlotKind::Changed, SlotKind::Changed));
    }

    #[test]
    fn test_change_vs_mismatched_unmodified_is_error() {
        let (mut l1, l2) = (list("ABC"), list("AXC"));
        l1.set(1, 'Y').unwrap();
        assert_eq!(error_kinds(&l1, &l2), (1, SlotKind::Changed, SlotKind::Unmodified));
        assert_eq!(error_kinds(&l2, &l1), (1, SlotKind::Unmodified, SlotKind::Changed));
    }

    #[test]
    fn test_unmodified_vs_edit_takes_edit() {
        let (l1, mut l2) = (list("ABC"), list("ABC"));
        l2.set(1, 'X').unwrap();
        let mut m = ProxyListMerge::new(&l1, &l2);
        assert_eq!(m.merge_one(), MergeStep::Continue);
        assert_eq!(m.merge_one(), MergeStep::Continue);
        assert_eq!(m.result()[1], Slot::Changed { value: 'X', original: 'B' });

        let mut l3 = list("ABC");
        l3.remove(1).unwrap();
        assert_eq!(merged(&l1, &l3), "AC");
    }

    #[test]
    fn test_merge_one_stops_at_conflict() {
        let (mut l1, mut l2) = (list("AB"), list("AB"));
        l1.set(0, 'X').unwrap();
        l2.set(0, 'Y').unwrap();
        let mut m = ProxyListMerge::new(&l1, &l2);
        let first = m.merge_one();
        assert!(matches!(first, MergeStep::Conflict(_)));
        assert_eq!(m.merge_one(), first);
        assert!(m.result().is_empty());
    }

    fn dict(pairs: &[(&'static str, i32)]) -> ProxyDict<&'static str, i32> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_dict_merge_disjoint_edits() {
        let (mut a, mut b) = (dict(&[("x", 1), ("y", 2), ("z", 3)]), dict(&[("x", 1), ("y", 2), ("z", 3)]));
        a.insert("x", 10);
        a.insert("new", 0);
        b.remove("y");
        let out = merge_dicts(&a, &b).merged().unwrap();
        assert_eq!(out, BTreeMap::from([("new", 0), ("x", 10), ("z", 3)]));
    }

    #[test]
    fn test_dict_merge_identical_change_is_clean() {
        let (mut a, mut b) = (dict(&[("x", 1)]), dict(&[("x", 1)]));
        a.insert("x", 5);
        b.insert("x", 5);
        assert_eq!(merge_dicts(&a, &b).merged(), Some(BTreeMap::from([("x", 5)])));
    }

    #[test]
    fn test_dict_merge_divergent_change_is_conflict() {
        let (mut a, mut b) = (dict(&[("x", 1)]), dict(&[("x", 1)]));
        a.insert("x", 5);
        b.insert("x", 6);
        assert!(matches!(merge_dicts(&a, &b), MergeOutcome::Conflict { at: "x", .. }));
        let resolved = merge_dicts_with(&a, &b, |_, _, ours, theirs| Some(*ours.max(theirs)));
        assert_eq!(resolved.merged(), Some(BTreeMap::from([("x", 6)])));
    }

    #[test]
    fn test_dict_merge_remove_vs_change_is_conflict() {
        let (mut a, mut b) = (dict(&[("x", 1)]), dict(&[("x", 1)]));
        a.remove("x");
        b.insert("x", 2);
        assert!(matches!(
            merge_dicts(&a, &b),
            MergeOutcome::Conflict { conflict: MergeConflict { ours: SlotKind::Removed, theirs: SlotKind::Changed }, .. }
        ));
    }

    #[test]
    fn test_dict_merge_mismatched_base_is_error() {
        let (a, b) = (dict(&[("x", 1)]), dict(&[("x", 2)]));
        assert!(matches!(merge_dicts(&a, &b), MergeOutcome::Error { at: "x", .. }));
    }

    #[test]
    fn test_dict_merge_both_add_different_is_conflict() {
        let (mut a, mut b) = (dict(&[]), dict(&[]));
        a.insert("k", 1);
        b.insert("k", 2);
        assert!(matches!(
            merge_dicts(&a, &b),
            MergeOutcome::Conflict { conflict: MergeConflict { ours: SlotKind::Inserted, theirs: SlotKind::Inserted }, .. }
        ));
    }
}
