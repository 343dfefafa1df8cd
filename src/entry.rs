//! Chain nodes stored in the table's entry arena.

use core::borrow::Borrow;

slotmap::new_key_type! {
    /// Generational index of an [`Entry`] in the arena. Bucket slots and
    /// `next` links hold these instead of pointers.
    pub(crate) struct EntryKey;
}

#[derive(Debug)]
pub(crate) struct Entry<K, V> {
    /// Spread hash computed once at insert; never recomputed.
    pub(crate) hash: u32,
    pub(crate) key: K,
    pub(crate) value: V,
    /// Next entry in the same bucket's chain.
    pub(crate) next: Option<EntryKey>,
}

impl<K, V> Entry<K, V> {
    pub(crate) fn new(hash: u32, key: K, value: V) -> Self {
        Self {
            hash,
            key,
            value,
            next: None,
        }
    }

    /// Cheap hash comparison first; `Eq` only runs on a hash match.
    #[inline]
    pub(crate) fn matches<Q>(&self, hash: u32, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        self.hash == hash && self.key.borrow() == q
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_requires_hash_and_key() {
        let e = Entry::new(7, "k".to_string(), 1);
        assert!(e.matches(7, "k"));
        assert!(!e.matches(8, "k"), "hash mismatch must short-circuit");
        assert!(!e.matches(7, "other"));
        assert!(e.next.is_none());
    }
}
