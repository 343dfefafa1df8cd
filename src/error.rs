use std::fmt;

/// Failures reported by a [`Cursor`](crate::Cursor).
///
/// A missing key is never an error; lookups and removals on the map return
/// `None` for that.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CursorError {
    /// The map was structurally modified (insert of a new key, removal,
    /// resize, clear) by something other than this cursor's own `remove`.
    /// The cursor cannot continue; start a new one.
    ConcurrentModification,
    /// `next` was called after every entry had been yielded.
    Exhausted,
    /// `remove` was called before any `next`, or twice for the same entry.
    IllegalState,
    /// The cursor was used with a map other than the one that created it.
    WrongMap,
}

impl fmt::Display for CursorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CursorError::ConcurrentModification => {
                write!(f, "map was structurally modified during iteration")
            }
            CursorError::Exhausted => write!(f, "cursor has no more entries"),
            CursorError::IllegalState => {
                write!(f, "remove called without a preceding next")
            }
            CursorError::WrongMap => {
                write!(f, "cursor used with a map that did not create it")
            }
        }
    }
}

impl std::error::Error for CursorError {}
