//! Cursor operation codes.

use lmbridge_engine::{sys, MdbCursorOp};

/// Cursor positioning directives (`MDB_cursor_op`), with the engine's
/// numbering.
///
/// The marshaler passes these through unchanged; any operation the engine
/// understands can also be given as a raw [`MdbCursorOp`].
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CursorOp {
    /// First key/data item.
    First = sys::MDB_FIRST,
    /// First data item of the current key.
    FirstDup = sys::MDB_FIRST_DUP,
    /// Exact key/data pair.
    GetBoth = sys::MDB_GET_BOTH,
    /// Exact key, nearest data.
    GetBothRange = sys::MDB_GET_BOTH_RANGE,
    /// Current key/data item.
    GetCurrent = sys::MDB_GET_CURRENT,
    /// Page of duplicates from the current position.
    GetMultiple = sys::MDB_GET_MULTIPLE,
    /// Last key/data item.
    Last = sys::MDB_LAST,
    /// Last data item of the current key.
    LastDup = sys::MDB_LAST_DUP,
    /// Next data item.
    Next = sys::MDB_NEXT,
    /// Next data item of the current key.
    NextDup = sys::MDB_NEXT_DUP,
    /// Page of duplicates from the next position.
    NextMultiple = sys::MDB_NEXT_MULTIPLE,
    /// First data item of the next key.
    NextNoDup = sys::MDB_NEXT_NODUP,
    /// Previous data item.
    Prev = sys::MDB_PREV,
    /// Previous data item of the current key.
    PrevDup = sys::MDB_PREV_DUP,
    /// Last data item of the previous key.
    PrevNoDup = sys::MDB_PREV_NODUP,
    /// Exact key.
    Set = sys::MDB_SET,
    /// Exact key, returning key and data.
    SetKey = sys::MDB_SET_KEY,
    /// First key greater than or equal to the given key.
    SetRange = sys::MDB_SET_RANGE,
    /// Page of duplicates before the current position.
    PrevMultiple = sys::MDB_PREV_MULTIPLE,
}

impl From<CursorOp> for MdbCursorOp {
    fn from(op: CursorOp) -> Self {
        op as MdbCursorOp
    }
}
