//! ChainedHashMap: the public map surface over `BucketTable`.

use crate::bucket_table::{BucketTable, Iter};
use crate::cursor::{Cursor, KeyOnly, KeyValue, Projection, ValueOnly};
use crate::entry::{Entry, EntryKey};
use core::borrow::Borrow;
use core::fmt;
use core::hash::Hash;
use core::iter::FusedIterator;
use std::collections::hash_map::RandomState;

/// A hash map with separate chaining and fail-fast cursors.
///
/// Keys are hashed once on insert; the cached hash drives bucket selection
/// and resizing from then on. The bucket array is allocated on first insert
/// (16 buckets) and doubles whenever the entry count reaches three quarters
/// of the bucket count. It never shrinks.
pub struct ChainedHashMap<K, V> {
    table: BucketTable<K, V, RandomState>,
}

impl<K, V> ChainedHashMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            table: BucketTable::with_hasher(RandomState::new()),
        }
    }

    /// A map that accepts `n` inserts without resizing. Buckets are still
    /// allocated on the first insert.
    pub fn with_capacity(n: usize) -> Self {
        Self {
            table: BucketTable::with_capacity_and_hasher(n, RandomState::new()),
        }
    }

    pub(crate) fn table(&self) -> &BucketTable<K, V, RandomState> {
        &self.table
    }

    pub(crate) fn table_mut(&mut self) -> &mut BucketTable<K, V, RandomState> {
        &mut self.table
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Number of buckets; 0 until the first insert.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Insert `value` under `key`, returning the value it replaced.
    ///
    /// Replacing the value of an existing key does not invalidate cursors;
    /// inserting a new key does.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.table.insert(key, value)
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.table.get(q)
    }

    pub fn get_key_value<Q>(&self, q: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.table.get_key_value(q)
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.table.get_mut(q)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.table.contains_key(q)
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.table.remove_entry(q).map(|(_, v)| v)
    }

    pub fn remove_entry<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.table.remove_entry(q)
    }

    /// Remove every entry. Capacity is kept.
    pub fn clear(&mut self) {
        self.table.clear()
    }

    /// Keep only the entries for which `f` returns true.
    pub fn retain<F>(&mut self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        self.table.retain(f)
    }

    /// Borrowing iterator in bucket order. The borrow rules out concurrent
    /// modification, so unlike a [`Cursor`] it cannot fail.
    pub fn iter(&self) -> Iter<'_, K, V> {
        self.table.iter()
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys {
            inner: self.table.iter(),
        }
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values {
            inner: self.table.iter(),
        }
    }

    /// Mutable access to every value. The order is unspecified and may
    /// differ from `iter`.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.table.values_mut(),
        }
    }

    /// A detached cursor yielding whatever `P` projects.
    pub fn cursor<P>(&self) -> Cursor<P>
    where
        P: Projection<K, V>,
    {
        Cursor::new(&self.table)
    }

    pub fn key_cursor(&self) -> Cursor<KeyOnly> {
        self.cursor()
    }

    pub fn value_cursor(&self) -> Cursor<ValueOnly> {
        self.cursor()
    }

    pub fn entry_cursor(&self) -> Cursor<KeyValue> {
        self.cursor()
    }
}

impl<K, V> Default for ChainedHashMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for ChainedHashMap<K, V>
where
    K: Eq + Hash + fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V> Extend<(K, V)> for ChainedHashMap<K, V>
where
    K: Eq + Hash,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V> FromIterator<(K, V)> for ChainedHashMap<K, V>
where
    K: Eq + Hash,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut map = Self::with_capacity(iter.size_hint().0);
        map.extend(iter);
        map
    }
}

impl<'a, K, V> IntoIterator for &'a ChainedHashMap<K, V>
where
    K: Eq + Hash,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the keys of a [`ChainedHashMap`].
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}
impl<K, V> FusedIterator for Keys<'_, K, V> {}

/// Iterator over the values of a [`ChainedHashMap`].
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}
impl<K, V> FusedIterator for Values<'_, K, V> {}

/// Iterator over mutable values of a [`ChainedHashMap`].
pub struct ValuesMut<'a, K, V> {
    inner: slotmap::basic::ValuesMut<'a, EntryKey, Entry<K, V>>,
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|e| &mut e.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {}
impl<K, V> FusedIterator for ValuesMut<'_, K, V> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_map_is_empty_and_unallocated() {
        let m: ChainedHashMap<String, i32> = ChainedHashMap::new();
        assert!(m.is_empty());
        assert_eq!(m.len(), 0);
        assert_eq!(m.capacity(), 0);
        assert_eq!(m.get("x"), None);
    }

    #[test]
    fn borrowed_lookup_with_str() {
        let mut m: ChainedHashMap<String, i32> = ChainedHashMap::new();
        m.insert("hello".to_string(), 1);
        assert!(m.contains_key("hello"));
        assert!(!m.contains_key("world"));
        assert_eq!(m.get_key_value("hello"), Some((&"hello".to_string(), &1)));
        assert_eq!(m.remove("hello"), Some(1));
        assert!(m.is_empty());
    }

    /// `contains_key` reports presence even when the stored value is the
    /// "absent-like" `None`.
    #[test]
    fn contains_key_with_none_value() {
        let mut m: ChainedHashMap<&str, Option<i32>> = ChainedHashMap::new();
        m.insert("k", None);
        assert!(m.contains_key("k"));
        assert_eq!(m.get("k"), Some(&None));
        assert!(!m.contains_key("j"));
    }

    #[test]
    fn option_keys_hash_natively() {
        let mut m: ChainedHashMap<Option<u8>, &str> = ChainedHashMap::new();
        m.insert(None, "none");
        m.insert(Some(0), "zero");
        assert_eq!(m.get(&None), Some(&"none"));
        assert_eq!(m.get(&Some(0)), Some(&"zero"));
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn values_mut_is_not_structural() {
        let mut m: ChainedHashMap<u32, u32> = (0..10).map(|i| (i, i)).collect();
        let c = m.value_cursor();
        for v in m.values_mut() {
            *v *= 2;
        }
        assert_eq!(c.has_next(&m), Ok(true));
        assert_eq!(m.values().sum::<u32>(), 90);
    }

    #[test]
    fn values_mut_is_exact_and_fused() {
        let mut m: ChainedHashMap<u32, u32> = (0..7).map(|i| (i, i)).collect();
        let mut it = m.values_mut();
        assert_eq!(it.len(), 7);
        it.next();
        assert_eq!(it.len(), 6);
        let mut it = it.fuse();
        assert_eq!(it.by_ref().count(), 6);
        assert!(it.next().is_none());
    }

    #[test]
    fn debug_formats_as_map() {
        let mut m = ChainedHashMap::new();
        m.insert("a", 1);
        assert_eq!(format!("{:?}", m), r#"{"a": 1}"#);
    }

    #[test]
    fn from_iter_presizes() {
        let m: ChainedHashMap<u32, u32> = (0..100).map(|i| (i, i)).collect();
        assert_eq!(m.capacity(), 256);
        assert_eq!(m.len(), 100);
        assert_eq!(m.keys().len(), 100);
        assert_eq!((&m).into_iter().count(), 100);
    }
}
