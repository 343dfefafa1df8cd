//! BucketTable: power-of-two bucket array with separately chained entries.
//!
//! Entries live in a `SlotMap` arena; bucket slots and `Entry::next` hold
//! arena keys, so every chain node has exactly one owner link (the bucket
//! slot for a head, the predecessor otherwise) and relinking is O(1).
//!
//! Structural changes (insert of a new key, removal, resize, clear) bump
//! `version`. Cursors compare against it to fail fast.

use crate::entry::{Entry, EntryKey};
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use core::iter::FusedIterator;
use core::mem;
use core::sync::atomic::{AtomicU64, Ordering};
use slotmap::SlotMap;
use std::collections::hash_map::RandomState;

/// Bucket count allocated on the first insert into an empty table.
pub(crate) const DEFAULT_CAPACITY: usize = 16;
/// Load factor 3/4, kept as a ratio so thresholds stay integral.
const LOAD_FACTOR_NUM: usize = 3;
const LOAD_FACTOR_DEN: usize = 4;
/// Hashes are 32 bits wide; this is the largest power of two that is both
/// addressable by them and representable in `usize` on every target.
pub(crate) const MAX_CAPACITY: usize = 1 << 30;

static NEXT_TABLE_ID: AtomicU64 = AtomicU64::new(0);

/// Identity of one table instance; cursors record it to reject foreign maps.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct TableId(u64);

impl TableId {
    fn fresh() -> Self {
        TableId(NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Fold the native 64-bit hash to 32 bits, then mix the high half into the
/// low bits that the bucket mask keeps.
#[inline]
pub(crate) fn spread(h: u64) -> u32 {
    let h = (h ^ (h >> 32)) as u32;
    h ^ (h >> 16)
}

#[inline]
pub(crate) fn index_for(hash: u32, capacity: usize) -> usize {
    debug_assert!(capacity.is_power_of_two());
    hash as usize & (capacity - 1)
}

#[inline]
fn threshold_for(capacity: usize) -> usize {
    capacity / LOAD_FACTOR_DEN * LOAD_FACTOR_NUM
}

/// Smallest allowed capacity that holds `n` entries without resizing.
fn capacity_for(n: usize) -> usize {
    let mut cap = DEFAULT_CAPACITY;
    while cap < MAX_CAPACITY && threshold_for(cap) <= n {
        cap <<= 1;
    }
    cap
}

pub(crate) struct BucketTable<K, V, S = RandomState> {
    hasher: S,
    buckets: Box<[Option<EntryKey>]>,
    entries: SlotMap<EntryKey, Entry<K, V>>,
    threshold: usize,
    initial_capacity: usize,
    version: u64,
    id: TableId,
}

impl<K, V, S> BucketTable<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub(crate) fn with_hasher(hasher: S) -> Self {
        Self::with_capacity_and_hasher(0, hasher)
    }

    /// The bucket array is still allocated lazily; `n` only sizes it.
    pub(crate) fn with_capacity_and_hasher(n: usize, hasher: S) -> Self {
        Self {
            hasher,
            buckets: Box::new([]),
            entries: SlotMap::with_capacity_and_key(n),
            threshold: 0,
            initial_capacity: capacity_for(n),
            version: 0,
            id: TableId::fresh(),
        }
    }

    pub(crate) fn hash<Q>(&self, q: &Q) -> u32
    where
        Q: ?Sized + Hash,
    {
        spread(self.hasher.hash_one(q))
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.buckets.len()
    }

    #[cfg(test)]
    pub(crate) fn threshold(&self) -> usize {
        self.threshold
    }

    pub(crate) fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn id(&self) -> TableId {
        self.id
    }

    pub(crate) fn bucket_head(&self, idx: usize) -> Option<EntryKey> {
        self.buckets.get(idx).copied().flatten()
    }

    pub(crate) fn entry(&self, k: EntryKey) -> Option<&Entry<K, V>> {
        self.entries.get(k)
    }

    pub(crate) fn entry_mut(&mut self, k: EntryKey) -> Option<&mut Entry<K, V>> {
        self.entries.get_mut(k)
    }

    fn allocate(&mut self, capacity: usize) {
        log::debug!("allocating {capacity} buckets");
        self.buckets = vec![None; capacity].into_boxed_slice();
        self.threshold = threshold_for(capacity);
    }

    /// Insert or overwrite. Overwrite replaces the value in place and is not
    /// a structural change: `len` and `version` stay put.
    pub(crate) fn insert(&mut self, key: K, value: V) -> Option<V> {
        let hash = self.hash(&key);
        if self.buckets.is_empty() {
            self.allocate(self.initial_capacity);
        }
        let idx = index_for(hash, self.buckets.len());

        let mut tail = None;
        let mut cursor = self.buckets[idx];
        while let Some(k) = cursor {
            let e = &mut self.entries[k];
            if e.hash == hash && e.key == key {
                return Some(mem::replace(&mut e.value, value));
            }
            tail = Some(k);
            cursor = e.next;
        }

        let new = self.entries.insert(Entry::new(hash, key, value));
        match tail {
            None => self.buckets[idx] = Some(new),
            Some(t) => self.entries[t].next = Some(new),
        }
        self.version += 1;

        if self.entries.len() >= self.threshold {
            self.resize();
        }
        None
    }

    fn find<Q>(&self, q: &Q) -> Option<EntryKey>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        if self.buckets.is_empty() {
            return None;
        }
        let hash = self.hash(q);
        let mut cursor = self.buckets[index_for(hash, self.buckets.len())];
        while let Some(k) = cursor {
            let e = &self.entries[k];
            if e.matches(hash, q) {
                return Some(k);
            }
            cursor = e.next;
        }
        None
    }

    pub(crate) fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find(q).map(|k| &self.entries[k].value)
    }

    pub(crate) fn get_key_value<Q>(&self, q: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find(q).map(|k| {
            let e = &self.entries[k];
            (&e.key, &e.value)
        })
    }

    pub(crate) fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let k = self.find(q)?;
        self.entries.get_mut(k).map(|e| &mut e.value)
    }

    pub(crate) fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find(q).is_some()
    }

    pub(crate) fn remove_entry<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        if self.buckets.is_empty() {
            return None;
        }
        let hash = self.hash(q);
        let idx = index_for(hash, self.buckets.len());

        let mut pred = None;
        let mut cursor = self.buckets[idx];
        while let Some(k) = cursor {
            let e = &self.entries[k];
            if e.matches(hash, q) {
                return self.unlink(idx, pred, k);
            }
            pred = Some(k);
            cursor = e.next;
        }
        None
    }

    /// Unlink `k` from bucket `idx`, where `pred` is its in-chain
    /// predecessor (`None` for the chain head). Structural.
    pub(crate) fn unlink(
        &mut self,
        idx: usize,
        pred: Option<EntryKey>,
        k: EntryKey,
    ) -> Option<(K, V)> {
        let entry = self.entries.remove(k)?;
        match pred {
            None => self.buckets[idx] = entry.next,
            Some(p) => self.entries[p].next = entry.next,
        }
        self.version += 1;
        Some((entry.key, entry.value))
    }

    /// Double the bucket array. Cached hashes are reused: doubling adds one
    /// discriminating bit (`old_cap`), so each chain splits into a lo list
    /// that stays at `i` and a hi list that moves to `i + old_cap`, both in
    /// their original relative order.
    fn resize(&mut self) {
        let old_cap = self.buckets.len();
        if old_cap >= MAX_CAPACITY {
            self.threshold = usize::MAX;
            return;
        }
        let new_cap = old_cap << 1;
        let mut old = mem::replace(&mut self.buckets, vec![None; new_cap].into_boxed_slice());
        self.threshold = threshold_for(new_cap);

        for (i, slot) in old.iter_mut().enumerate() {
            let Some(head) = slot.take() else {
                continue;
            };
            let first = &self.entries[head];
            if first.next.is_none() {
                self.buckets[index_for(first.hash, new_cap)] = Some(head);
                continue;
            }

            let (mut lo_head, mut lo_tail) = (None, None);
            let (mut hi_head, mut hi_tail) = (None, None);
            let mut cursor = Some(head);
            while let Some(k) = cursor {
                let e = &self.entries[k];
                cursor = e.next;
                let (list_head, list_tail) = if (e.hash as usize & old_cap) == 0 {
                    (&mut lo_head, &mut lo_tail)
                } else {
                    (&mut hi_head, &mut hi_tail)
                };
                match *list_tail {
                    None => *list_head = Some(k),
                    Some(t) => self.entries[t].next = Some(k),
                }
                *list_tail = Some(k);
            }
            if let Some(t) = lo_tail {
                self.entries[t].next = None;
            }
            if let Some(t) = hi_tail {
                self.entries[t].next = None;
            }
            self.buckets[i] = lo_head;
            self.buckets[i + old_cap] = hi_head;
        }

        self.version += 1;
        log::trace!(
            "resized {old_cap} -> {new_cap} buckets ({} entries, threshold {})",
            self.entries.len(),
            self.threshold
        );
    }

    /// Drop every entry; the bucket array keeps its size.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.buckets.fill(None);
        self.version += 1;
    }

    pub(crate) fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        for idx in 0..self.buckets.len() {
            let mut pred = None;
            let mut cursor = self.buckets[idx];
            while let Some(k) = cursor {
                let e = &mut self.entries[k];
                cursor = e.next;
                if f(&e.key, &mut e.value) {
                    pred = Some(k);
                } else {
                    let removed = self.unlink(idx, pred, k);
                    debug_assert!(removed.is_some(), "chain link to a vacant arena slot");
                    drop(removed);
                }
            }
        }
    }

    pub(crate) fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            buckets: &self.buckets,
            entries: &self.entries,
            bucket: 0,
            next: None,
            remaining: self.entries.len(),
        }
    }

    /// Arena order, not bucket order.
    pub(crate) fn values_mut(&mut self) -> slotmap::basic::ValuesMut<'_, EntryKey, Entry<K, V>> {
        self.entries.values_mut()
    }

    /// Every live entry sits in the bucket its cached hash selects, each is
    /// reachable exactly once, and the growth threshold has not been crossed.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        let cap = self.buckets.len();
        if cap == 0 {
            assert!(self.entries.is_empty());
            return;
        }
        assert!(cap.is_power_of_two());
        let mut seen = 0usize;
        for (i, head) in self.buckets.iter().enumerate() {
            let mut cursor = *head;
            while let Some(k) = cursor {
                let e = self.entries.get(k).expect("dangling chain link");
                assert_eq!(index_for(e.hash, cap), i, "entry in wrong bucket");
                seen += 1;
                assert!(seen <= self.entries.len(), "chain cycle or shared node");
                cursor = e.next;
            }
        }
        assert_eq!(seen, self.entries.len());
        assert!(self.entries.len() < self.threshold || cap >= MAX_CAPACITY);
    }

    #[cfg(test)]
    pub(crate) fn chain(&self, idx: usize) -> Vec<&K> {
        let mut out = Vec::new();
        let mut cursor = self.bucket_head(idx);
        while let Some(k) = cursor {
            let e = &self.entries[k];
            out.push(&e.key);
            cursor = e.next;
        }
        out
    }
}

/// Iterator over `(&K, &V)` in bucket order, then chain order.
pub struct Iter<'a, K, V> {
    buckets: &'a [Option<EntryKey>],
    entries: &'a SlotMap<EntryKey, Entry<K, V>>,
    bucket: usize,
    next: Option<EntryKey>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let entries = self.entries;
        loop {
            if let Some(k) = self.next {
                let e = &entries[k];
                self.next = e.next;
                self.remaining -= 1;
                return Some((&e.key, &e.value));
            }
            let head = self.buckets.get(self.bucket)?;
            self.next = *head;
            self.bucket += 1;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            buckets: self.buckets,
            entries: self.entries,
            bucket: self.bucket,
            next: self.next,
            remaining: self.remaining,
        }
    }
}
