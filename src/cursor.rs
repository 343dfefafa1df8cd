//! Fail-fast, removal-capable cursors.
//!
//! A [`Cursor`] is detached from the map it walks: it stores positions
//! (arena keys and a bucket index) plus the map's version at creation, and
//! every call takes the map as an argument. The caller is therefore free to
//! mutate the map between calls, and the cursor reports that on its next use
//! with [`CursorError::ConcurrentModification`] instead of walking a
//! rearranged table.
//!
//! Removal through the cursor itself is the one mutation it tolerates: it
//! advances the map's version and its own snapshot together.
//!
//! What a cursor yields is chosen by its [`Projection`]: [`KeyOnly`],
//! [`ValueOnly`] or [`KeyValue`]. The walking logic is shared.

use crate::bucket_table::{BucketTable, TableId};
use crate::entry::EntryKey;
use crate::error::CursorError;
use crate::hash_map::ChainedHashMap;
use core::hash::{BuildHasher, Hash};
use core::marker::PhantomData;

/// Selects what a cursor yields for each entry.
pub trait Projection<K, V> {
    type Item<'a>
    where
        K: 'a,
        V: 'a;

    fn project<'a>(key: &'a K, value: &'a V) -> Self::Item<'a>;
}

/// Yields `&K`.
#[derive(Debug)]
pub enum KeyOnly {}

/// Yields `&V`.
#[derive(Debug)]
pub enum ValueOnly {}

/// Yields `(&K, &V)`.
#[derive(Debug)]
pub enum KeyValue {}

impl<K, V> Projection<K, V> for KeyOnly {
    type Item<'a>
        = &'a K
    where
        K: 'a,
        V: 'a;

    #[inline]
    fn project<'a>(key: &'a K, _value: &'a V) -> &'a K {
        key
    }
}

impl<K, V> Projection<K, V> for ValueOnly {
    type Item<'a>
        = &'a V
    where
        K: 'a,
        V: 'a;

    #[inline]
    fn project<'a>(_key: &'a K, value: &'a V) -> &'a V {
        value
    }
}

impl<K, V> Projection<K, V> for KeyValue {
    type Item<'a>
        = (&'a K, &'a V)
    where
        K: 'a,
        V: 'a;

    #[inline]
    fn project<'a>(key: &'a K, value: &'a V) -> (&'a K, &'a V) {
        (key, value)
    }
}

/// The entry most recently yielded by `next`, with what `remove` needs to
/// unlink it in O(1).
#[derive(Copy, Clone, Debug)]
struct LastReturned {
    key: EntryKey,
    bucket: usize,
    pred: Option<EntryKey>,
}

/// Single-pass cursor over a [`ChainedHashMap`]. See the module docs.
#[derive(Debug)]
pub struct Cursor<P> {
    owner: TableId,
    expected_version: u64,
    /// Bucket holding `next`, or the bucket count once exhausted.
    bucket: usize,
    next: Option<EntryKey>,
    /// In-chain predecessor of `next`; `None` when `next` heads its chain.
    next_pred: Option<EntryKey>,
    last: Option<LastReturned>,
    _projection: PhantomData<fn() -> P>,
}

impl<P> Cursor<P> {
    pub(crate) fn new<K, V, S>(table: &BucketTable<K, V, S>) -> Self
    where
        K: Eq + Hash,
        S: BuildHasher,
    {
        let mut cursor = Cursor {
            owner: table.id(),
            expected_version: table.version(),
            bucket: 0,
            next: None,
            next_pred: None,
            last: None,
            _projection: PhantomData,
        };
        cursor.seek(table, 0);
        cursor
    }

    /// Position on the first chain head at or after bucket `from`.
    fn seek<K, V, S>(&mut self, table: &BucketTable<K, V, S>, from: usize)
    where
        K: Eq + Hash,
        S: BuildHasher,
    {
        self.next_pred = None;
        let cap = table.capacity();
        for idx in from..cap {
            if let Some(head) = table.bucket_head(idx) {
                self.bucket = idx;
                self.next = Some(head);
                return;
            }
        }
        self.bucket = cap;
        self.next = None;
    }

    fn check<K, V, S>(&self, table: &BucketTable<K, V, S>) -> Result<(), CursorError>
    where
        K: Eq + Hash,
        S: BuildHasher,
    {
        if table.id() != self.owner {
            return Err(CursorError::WrongMap);
        }
        if table.version() != self.expected_version {
            return Err(CursorError::ConcurrentModification);
        }
        Ok(())
    }

    /// Whether `next` would yield an entry.
    pub fn has_next<K, V>(&self, map: &ChainedHashMap<K, V>) -> Result<bool, CursorError>
    where
        K: Eq + Hash,
    {
        self.check(map.table())?;
        Ok(self.next.is_some())
    }

    /// Yield the next entry, projected by `P`.
    pub fn next<'a, K, V>(
        &mut self,
        map: &'a ChainedHashMap<K, V>,
    ) -> Result<P::Item<'a>, CursorError>
    where
        K: Eq + Hash + 'a,
        V: 'a,
        P: Projection<K, V>,
    {
        let table = map.table();
        self.check(table)?;
        let key = self.next.ok_or(CursorError::Exhausted)?;
        let entry = table.entry(key).ok_or(CursorError::ConcurrentModification)?;

        let returned = LastReturned {
            key,
            bucket: self.bucket,
            pred: self.next_pred,
        };
        match entry.next {
            Some(succ) => {
                self.next_pred = Some(key);
                self.next = Some(succ);
            }
            None => self.seek(table, returned.bucket + 1),
        }
        self.last = Some(returned);
        Ok(P::project(&entry.key, &entry.value))
    }

    /// Remove the entry last yielded by `next` and hand it back.
    ///
    /// The cursor stays valid: iteration continues with the entry that
    /// followed the removed one.
    pub fn remove<K, V>(&mut self, map: &mut ChainedHashMap<K, V>) -> Result<(K, V), CursorError>
    where
        K: Eq + Hash,
    {
        let table = map.table_mut();
        self.check(&*table)?;
        let last = self.last.take().ok_or(CursorError::IllegalState)?;
        let removed = table
            .unlink(last.bucket, last.pred, last.key)
            .ok_or(CursorError::ConcurrentModification)?;
        self.expected_version += 1;
        debug_assert_eq!(self.expected_version, table.version());

        if self.next_pred == Some(last.key) {
            self.next_pred = last.pred;
        }
        Ok(removed)
    }

    /// Replace the value of the entry last yielded by `next`, returning the
    /// old one. Like any overwrite this is not structural: neither this
    /// cursor nor any other cursor over the map is invalidated.
    pub fn set_value<K, V>(&mut self, map: &mut ChainedHashMap<K, V>, value: V) -> Result<V, CursorError>
    where
        K: Eq + Hash,
    {
        let table = map.table_mut();
        self.check(&*table)?;
        let last = self.last.ok_or(CursorError::IllegalState)?;
        let entry = table
            .entry_mut(last.key)
            .ok_or(CursorError::ConcurrentModification)?;
        Ok(core::mem::replace(&mut entry.value, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> ChainedHashMap<&'static str, i32> {
        let mut m = ChainedHashMap::new();
        m.insert("a", 1);
        m.insert("b", 2);
        m.insert("c", 3);
        m
    }

    #[test]
    fn empty_map_cursor_is_exhausted() {
        let m: ChainedHashMap<u32, u32> = ChainedHashMap::new();
        let mut c = m.key_cursor();
        assert_eq!(c.has_next(&m), Ok(false));
        assert_eq!(c.next(&m), Err(CursorError::Exhausted));
    }

    #[test]
    fn projections_select_key_value_or_pair() {
        let m = abc();
        let mut keys = Vec::new();
        let mut c = m.key_cursor();
        while c.has_next(&m).unwrap() {
            keys.push(*c.next(&m).unwrap());
        }
        keys.sort();
        assert_eq!(keys, vec!["a", "b", "c"]);

        let mut values = Vec::new();
        let mut c = m.value_cursor();
        while c.has_next(&m).unwrap() {
            values.push(*c.next(&m).unwrap());
        }
        values.sort();
        assert_eq!(values, vec![1, 2, 3]);

        let mut c = m.entry_cursor();
        while c.has_next(&m).unwrap() {
            let (k, v) = c.next(&m).unwrap();
            assert_eq!(m.get(k), Some(v));
        }
    }

    /// The cursor walks the same order as `iter`.
    #[test]
    fn order_matches_iter() {
        let m: ChainedHashMap<u32, u32> = (0..50).map(|i| (i, i)).collect();
        let mut c = m.key_cursor();
        let mut via_cursor = Vec::new();
        while let Ok(k) = c.next(&m) {
            via_cursor.push(*k);
        }
        let via_iter: Vec<u32> = m.keys().copied().collect();
        assert_eq!(via_cursor, via_iter);
    }

    #[test]
    fn remove_requires_prior_next() {
        let mut m = abc();
        let mut c = m.key_cursor();
        assert_eq!(c.remove(&mut m), Err(CursorError::IllegalState));
        c.next(&m).unwrap();
        assert!(c.remove(&mut m).is_ok());
        assert_eq!(c.remove(&mut m), Err(CursorError::IllegalState));
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn set_value_requires_live_last_entry() {
        let mut m = abc();
        let mut c = m.entry_cursor();
        assert_eq!(c.set_value(&mut m, 0), Err(CursorError::IllegalState));
        let (&k, &v) = c.next(&m).unwrap();
        assert_eq!(c.set_value(&mut m, 10), Ok(v));
        assert_eq!(c.set_value(&mut m, 20), Ok(10));
        assert_eq!(m.get(k), Some(&20));
        c.remove(&mut m).unwrap();
        assert_eq!(c.set_value(&mut m, 30), Err(CursorError::IllegalState));
    }

    #[test]
    fn foreign_map_rejected() {
        let m1 = abc();
        let m2 = abc();
        let mut c = m1.key_cursor();
        assert_eq!(c.has_next(&m2), Err(CursorError::WrongMap));
        assert_eq!(c.next(&m2), Err(CursorError::WrongMap));
        assert!(c.next(&m1).is_ok());
    }

    /// Key whose `Hash` ignores its payload, so every key shares one chain.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Collide(u32);
    impl Hash for Collide {
        fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
            0u8.hash(state);
        }
    }

    /// Removing any subset of a single chain through the cursor unlinks
    /// exactly those entries; the rest of the chain stays reachable and is
    /// still yielded once each.
    #[test]
    fn remove_head_middle_and_tail_of_one_chain() {
        for drop_mask in 0u32..(1 << 5) {
            let mut m = ChainedHashMap::new();
            for k in 0..5 {
                m.insert(Collide(k), k);
            }
            let mut c = m.key_cursor();
            let mut yielded = Vec::new();
            while c.has_next(&m).unwrap() {
                let k = *c.next(&m).unwrap();
                yielded.push(k.0);
                if drop_mask & (1 << k.0) != 0 {
                    let (rk, rv) = c.remove(&mut m).unwrap();
                    assert_eq!((rk, rv), (k, k.0));
                }
            }
            assert_eq!(yielded, vec![0, 1, 2, 3, 4]);
            for k in 0..5 {
                let removed = drop_mask & (1 << k) != 0;
                assert_eq!(m.get(&Collide(k)).is_some(), !removed);
            }
            assert_eq!(m.len(), 5 - drop_mask.count_ones() as usize);
            m.table().check_invariants();
        }
    }
}
