//! Generic ordered collection of non-overlapping `[addr, addr+size)`
//! intervals keyed by address.
//!
//! This is the single backbone data structure behind both the region
//! registry (`T = ()`) and the store tracker (`T = StorePayload`); a
//! generic payload is cleaner than two parallel implementations of the
//! same split/merge/iterate machinery.
//!
//! Backed by a `BTreeMap<u64, (u64, T)>` keyed by `addr`, giving
//! `O(log n + k)` lookup/insert/split where `k` is the number of touched
//! entries, ordered-map based so single-entry insert/remove under
//! mutation doesn't require re-sorting a `Vec`.

use std::collections::BTreeMap;

use crate::interval::{Interval, OverlapKind};

#[derive(Debug, Clone, Default)]
pub struct IntervalSet<T> {
    entries: BTreeMap<u64, (u64, T)>,
}

impl<T> IntervalSet<T> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (Interval, &T)> {
        self.entries
            .iter()
            .map(|(&addr, (size, payload))| (Interval::new(addr, *size), payload))
    }

    /// Keys (and sizes) of every entry overlapping `iv`, in ascending
    /// address order, computed once against the set's current state. This
    /// is the "snapshot" `iter_overlapping` describes: the set of returned
    /// entries is exactly those overlapping at the moment this is called,
    /// independent of any later mutation.
    pub fn overlapping_snapshot(&self, iv: Interval) -> Vec<Interval> {
        self.matching_keys(iv, false)
    }

    /// Same as `overlapping_snapshot` but also includes entries that merely
    /// touch `iv` at an endpoint. Used by `insert_merging` to satisfy the
    /// "no two adjacent entries" invariant.
    fn touching_snapshot(&self, iv: Interval) -> Vec<Interval> {
        self.matching_keys(iv, true)
    }

    fn matching_keys(&self, iv: Interval, include_touching: bool) -> Vec<Interval> {
        let mut out = Vec::new();

        // At most one entry can start before `iv.addr` and still reach it,
        // since entries are non-overlapping and sorted by address.
        if let Some((&addr, &(size, _))) = self.entries.range(..iv.addr).next_back() {
            let e = Interval::new(addr, size);
            let reaches = if include_touching {
                e.end() >= iv.addr
            } else {
                e.end() > iv.addr
            };
            if reaches {
                out.push(e);
            }
        }

        let upper = if include_touching { iv.end() + 1 } else { iv.end() };
        for (&addr, &(size, _)) in self.entries.range(iv.addr..upper) {
            out.push(Interval::new(addr, size));
        }

        out
    }

    /// Remove the entry at exactly `addr`, returning its interval and
    /// payload. Used by callers driving a resumable overlap walk: take the
    /// entry out, decide what to do with it, optionally `put` fragments
    /// back.
    pub fn take(&mut self, addr: u64) -> Option<(Interval, T)> {
        self.entries
            .remove(&addr)
            .map(|(size, payload)| (Interval::new(addr, size), payload))
    }

    /// Peek at the entry starting at exactly `addr` without removing it.
    pub fn peek(&self, addr: u64) -> Option<(Interval, &T)> {
        self.entries
            .get(&addr)
            .map(|(size, payload)| (Interval::new(addr, *size), payload))
    }

    /// Insert an entry. The caller must guarantee `iv` overlaps nothing
    /// currently in the set; violating this is a logic error in the caller
    /// (checked with `debug_assert` rather than enforced at runtime, since
    /// the hot ingestion path must stay allocation/panic free in release
    /// builds per the checker's "no abort on normal input" contract).
    pub fn put(&mut self, iv: Interval, payload: T) {
        debug_assert!(!iv.is_empty(), "zero-size interval inserted");
        debug_assert!(
            self.overlapping_snapshot(iv).is_empty(),
            "put() would overlap an existing entry"
        );
        self.entries.insert(iv.addr, (iv.size, payload));
    }

    /// Drive a resumable walk over every entry overlapping `iv`. `f` is
    /// handed the set (so it can `put` fragments back), the overlapping
    /// entry's interval, and its payload (already removed from the set).
    /// If `f` doesn't re-`put` anything for that key, the entry is simply
    /// gone (eviction).
    ///
    /// The entries visited are exactly the overlap snapshot taken before
    /// the walk starts; fragments `f` inserts mid-walk are never
    /// themselves revisited, matching the "resume after the mutated
    /// region" contract rather than reprocessing newly created entries.
    pub fn for_each_overlapping<F>(&mut self, iv: Interval, mut f: F)
    where
        F: FnMut(&mut IntervalSet<T>, Interval, T),
    {
        for key in self.overlapping_snapshot(iv) {
            if let Some((actual, payload)) = self.take(key.addr) {
                f(self, actual, payload);
            }
        }
    }

    /// Classify `iv` against the set per the checker's four-way
    /// overlap-classification contract (see `OverlapKind`). Only a single
    /// matching entry is considered at a time: a query that straddles a
    /// gap between two registered, non-adjacent regions does not match any
    /// of the three overlapping categories and reports `NotPresent`, which
    /// mirrors the literal "for some e" predicate rather than reasoning
    /// about the union of all overlapping entries.
    pub fn overlap_classify(&self, iv: Interval) -> OverlapKind {
        let candidates = self.overlapping_snapshot(iv);
        if candidates.is_empty() {
            return OverlapKind::NotPresent;
        }
        for e in &candidates {
            if e.contains(&iv) {
                return OverlapKind::FullyInside;
            }
        }
        for e in &candidates {
            if iv.addr < e.addr && e.addr <= iv.end() && iv.end() <= e.end() {
                return OverlapKind::OverlapHead;
            }
        }
        for e in &candidates {
            if e.addr <= iv.addr && iv.addr <= e.end() && e.end() < iv.end() {
                return OverlapKind::OverlapTail;
            }
        }
        OverlapKind::NotPresent
    }

    pub fn contains_any(&self, iv: Interval) -> bool {
        self.overlap_classify(iv) != OverlapKind::NotPresent
    }
}

impl<T: Clone> IntervalSet<T> {
    /// Remove `iv` from the set, splitting any entry that only partially
    /// overlaps it. Entries fully covered by `iv` are deleted outright.
    pub fn remove_range(&mut self, iv: Interval) {
        for key in self.overlapping_snapshot(iv) {
            let Some((e, payload)) = self.take(key.addr) else {
                continue;
            };
            // `e - iv`, expressed as up to two leftover fragments. This
            // single formula subsumes all four cases (full delete,
            // split-in-two, shrink-head, shrink-tail).
            if e.addr < iv.addr {
                let head = Interval::new(e.addr, iv.addr - e.addr);
                self.put(head, payload.clone());
            }
            if e.end() > iv.end() {
                let tail = Interval::new(iv.end(), e.end() - iv.end());
                self.put(tail, payload.clone());
            }
        }
    }

    /// Insert `iv`, merging it with every entry it overlaps or touches.
    /// `merge` combines payloads of swallowed entries into the inserted
    /// one; for the region registry, where the payload is `()`, this is
    /// simply `|_, _| ()`.
    pub fn insert_merging(&mut self, iv: Interval, payload: T, merge: impl Fn(T, T) -> T) -> Interval {
        let mut union = iv;
        let mut acc = payload;
        for e in self.touching_snapshot(iv) {
            if let Some((_, existing)) = self.take(e.addr) {
                union = union.union(&e);
                acc = merge(acc, existing);
            }
        }
        self.put(union, acc);
        union
    }
}
