//! Snapshot diff
//!
//! Derives change-tracking containers from two plain snapshots, so state
//! that was edited without a proxy (or read back from two revisions) can
//! still be fed to the three-way merge.

use std::collections::BTreeMap;

use crate::proxy_dict::ProxyDict;
use crate::proxy_list::{ProxyList, Slot};

/// Compute the [`ProxyDict`] that turns `base` into `current`
pub fn diff_dicts<K, V>(base: &BTreeMap<K, V>, current: &BTreeMap<K, V>) -> ProxyDict<K, V>
where
    K: Ord + Clone,
    V: Clone + PartialEq,
{
    let mut dict = ProxyDict::new(base.clone());
    for key in base.keys() {
        if !current.contains_key(key) {
            dict.remove(key);
        }
    }
    for (key, value) in current {
        if base.get(key) != Some(value) {
            dict.insert(key.clone(), value.clone());
        }
    }
    dict
}

enum Edit {
    Keep(usize),
    Remove(usize),
    Insert(usize),
}

/// Compute the [`ProxyList`] that turns `base` into `current`
///
/// 1. Align both sequences on their longest common subsequence
/// 2. Base items off the alignment -> removed
/// 3. Current items off the alignment -> inserted
/// 4. Between two aligned items, removals and insertions are paired in
///    order into changed slots; the surplus stays removed or inserted
pub fn diff_lists<T: Clone + PartialEq>(base: &[T], current: &[T]) -> ProxyList<T> {
    let slots = collapse(base, current, &align(base, current));
    ProxyList::from_slots(slots)
}

fn align<T: PartialEq>(base: &[T], current: &[T]) -> Vec<Edit> {
    let (n, m) = (base.len(), current.len());
    // lcs[i][j] = LCS length of base[i..] and current[j..]
    let mut lcs = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if base[i] == current[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut edits = Vec::with_capacity(n.max(m));
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if base[i] == current[j] {
            edits.push(Edit::Keep(i));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            edits.push(Edit::Remove(i));
            i += 1;
        } else {
            edits.push(Edit::Insert(j));
            j += 1;
        }
    }
    edits.extend((i..n).map(Edit::Remove));
    edits.extend((j..m).map(Edit::Insert));
    edits
}

fn collapse<T: Clone>(base: &[T], current: &[T], edits: &[Edit]) -> Vec<Slot<T>> {
    let mut slots = Vec::with_capacity(edits.len());
    let mut removed: Vec<usize> = Vec::new();
    let mut inserted: Vec<usize> = Vec::new();

    let flush = |slots: &mut Vec<Slot<T>>, removed: &mut Vec<usize>, inserted: &mut Vec<usize>| {
        let paired = removed.len().min(inserted.len());
        for (&r, &c) in removed.iter().zip(inserted.iter()) {
            slots.push(Slot::Changed {
                value: current[c].clone(),
                original: base[r].clone(),
            });
        }
        for &r in &removed[paired..] {
            slots.push(Slot::Removed {
                original: base[r].clone(),
            });
        }
        for &c in &inserted[paired..] {
            slots.push(Slot::Inserted(current[c].clone()));
        }
        removed.clear();
        inserted.clear();
    };

    for edit in edits {
        match *edit {
            Edit::Keep(i) => {
                flush(&mut slots, &mut removed, &mut inserted);
                slots.push(Slot::Unmodified(base[i].clone()));
            }
            Edit::Remove(i) => removed.push(i),
            Edit::Insert(j) => inserted.push(j),
        }
    }
    flush(&mut slots, &mut removed, &mut inserted);
    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::{merge_lists, MergeOutcome};
    use crate::proxy_list::SlotKind;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn kinds(l: &ProxyList<char>) -> Vec<SlotKind> {
        l.slots().iter().map(Slot::kind).collect()
    }

    #[test]
    fn test_no_diff_identical_lists() {
        let l = diff_lists(&chars("ABC"), &chars("ABC"));
        assert!(!l.is_modified());
        assert_eq!(l.to_vec(), chars("ABC"));
    }

    #[test]
    fn test_diff_list_insert() {
        let l = diff_lists(&chars("ABC"), &chars("ABXC"));
        use SlotKind::*;
        assert_eq!(kinds(&l), vec![Unmodified, Unmodified, Inserted, Unmodified]);
    }

    #[test]
    fn test_diff_list_delete() {
        let l = diff_lists(&chars("ABC"), &chars("AC"));
        assert_eq!(l.slots()[1], Slot::Removed { original: 'B' });
        assert_eq!(l.to_vec(), chars("AC"));
        assert_eq!(l.base(), chars("ABC"));
    }

    #[test]
    fn test_diff_list_replacement_becomes_change() {
        let l = diff_lists(&chars("ABC"), &chars("AXC"));
        assert_eq!(l.slots()[1], Slot::Changed { value: 'X', original: 'B' });
        assert_eq!(l.slots().len(), 3);
    }

    #[test]
    fn test_diff_list_uneven_run() {
        let l = diff_lists(&chars("ABCD"), &chars("AXYZD"));
        use SlotKind::*;
        assert_eq!(kinds(&l), vec![Unmodified, Changed, Changed, Inserted, Unmodified]);
        assert_eq!(l.to_vec(), chars("AXYZD"));
        assert_eq!(l.base(), chars("ABCD"));
    }

    #[test]
    fn test_diff_list_empty_sides() {
        assert_eq!(diff_lists(&[], &chars("AB")).to_vec(), chars("AB"));
        let l = diff_lists(&chars("AB"), &[]);
        assert!(l.is_empty());
        assert_eq!(l.base(), chars("AB"));
    }

    #[test]
    fn test_diffed_lists_merge() {
        let base = chars("ABCDEF");
        let ours = diff_lists(&base, &chars("ABMCDEF"));
        let theirs = diff_lists(&base, &chars("ABCDF"));
        match merge_lists(&ours, &theirs) {
            MergeOutcome::Merged(l) => assert_eq!(l.to_vec(), chars("ABMCDF")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_diff_dicts_partition() {
        let base = BTreeMap::from([("a", 1), ("b", 2), ("c", 3)]);
        let current = BTreeMap::from([("a", 1), ("b", 20), ("d", 4)]);
        let d = diff_dicts(&base, &current);
        assert_eq!(d.current(), &current);
        assert_eq!(d.added().iter().copied().collect::<Vec<_>>(), vec!["d"]);
        assert_eq!(d.changed(), &BTreeMap::from([("b", 2)]));
        assert_eq!(d.removed(), &BTreeMap::from([("c", 3)]));
        assert_eq!(d.base(), base);
    }

    #[test]
    fn test_diff_dicts_identical_is_unmodified() {
        let base = BTreeMap::from([("a", 1)]);
        assert!(!diff_dicts(&base, &base).is_modified());
    }
}
