//! chained-hashmap: a single-threaded, separately chained hash map with
//! fail-fast cursors that can remove entries mid-traversal.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a classic bucket-array hash map whose chains, resize and
//!   iteration protocol are all expressed in safe Rust.
//! - Layers:
//!   - Entry: key, value, cached 32-bit hash and the arena key of the next
//!     entry in the same bucket.
//!   - BucketTable: power-of-two bucket array of chain heads over a
//!     `SlotMap` arena of entries; owns put/get/remove/resize.
//!   - Cursor<P>: detached, version-checked cursor generic over a
//!     projection (keys, values, or pairs).
//!   - ChainedHashMap<K, V>: public API delegating to BucketTable.
//!
//! Constraints
//! - Single-threaded: no locking, no atomics on the hot path.
//! - Bucket index is `hash & (capacity - 1)`; capacity is always a power of
//!   two (0 before the first insert, then 16, doubling).
//! - Resize triggers when `len >= capacity * 3/4`, before the inserting call
//!   returns. The table never shrinks.
//! - No unsafe code: chains link arena keys, not pointers.
//!
//! Hashing
//! - `K: Hash` runs once per insert and once per lookup. The stored hash is
//!   reused for bucket selection and for every resize.
//! - The 64-bit std hash is folded to 32 bits and its high half is xor-ed
//!   into the low half, so keys differing only in high bits still spread
//!   across buckets.
//!
//! Resize
//! - Doubling adds exactly one bit to the bucket mask. Each chain is split
//!   in one pass into entries without that bit (stay at `i`) and entries
//!   with it (move to `i + old_capacity`). Relative order is preserved.
//!
//! Cursors and the version token
//! - The table carries a version that increases on every structural change:
//!   insert of a new key, removal, resize, clear.
//! - Overwriting the value of an existing key is not structural. A cursor
//!   survives it and yields the new value.
//! - A cursor snapshots the version. Any later mismatch is reported as
//!   `CursorError::ConcurrentModification`. Removal through the cursor
//!   bumps both the table's version and the snapshot, so the cursor can
//!   keep going.
//! - Cursors do not borrow the map; each call takes it as an argument. The
//!   borrowing iterators (`iter`, `keys`, `values`) exist for the common
//!   case where the borrow checker already rules out modification.
//!
//! Notes and non-goals
//! - No custom hasher injection; the map always uses `RandomState`.
//! - No ordered iteration, no shrinking, no serialization.

mod bucket_table;
mod bucket_table_proptest;
mod cursor;
mod entry;
mod error;
mod hash_map;

// Public surface
pub use bucket_table::Iter;
pub use cursor::{Cursor, KeyOnly, KeyValue, Projection, ValueOnly};
pub use error::CursorError;
pub use hash_map::{ChainedHashMap, Keys, Values, ValuesMut};
