//! C-ABI types and constants of the native store.
//!
//! Layouts and numeric values match `lmdb.h` so that function pointers built
//! against these types can be handed to a real engine unchanged.

use std::ffi::{c_char, c_int, c_uint, c_void};

/// A generic structure used for passing keys and data in and out of the
/// engine (`MDB_val`).
///
/// The memory behind `mv_data` is never owned by the holder of the struct.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct MdbVal {
    /// Size of the data item.
    pub mv_size: usize,
    /// Address of the data item.
    pub mv_data: *mut c_void,
}

impl MdbVal {
    /// An empty value (null pointer, zero length).
    pub const fn empty() -> Self {
        Self {
            mv_size: 0,
            mv_data: std::ptr::null_mut(),
        }
    }

    /// Describes `bytes` without copying.
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self {
            mv_size: bytes.len(),
            mv_data: bytes.as_ptr() as *mut c_void,
        }
    }
}

impl Default for MdbVal {
    fn default() -> Self {
        Self::empty()
    }
}

/// Key comparison function (`MDB_cmp_func`).
pub type MdbCmpFunc = unsafe extern "C" fn(a: *const MdbVal, b: *const MdbVal) -> c_int;

/// Message listing callback (`MDB_msg_func`).
pub type MdbMsgFunc = unsafe extern "C" fn(msg: *const c_char, ctx: *mut c_void) -> c_int;

/// Cursor operation code (`MDB_cursor_op`).
pub type MdbCursorOp = c_uint;

/// A database handle within an environment (`MDB_dbi`).
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Dbi(pub u32);

/// An opaque transaction handle.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TxnHandle(pub u64);

/// An opaque cursor handle.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CursorHandle(pub u64);

// Return codes

/// Successful result.
pub const MDB_SUCCESS: c_int = 0;
/// Key/data pair already exists.
pub const MDB_KEYEXIST: c_int = -30799;
/// Key/data pair not found (EOF).
pub const MDB_NOTFOUND: c_int = -30798;
/// Requested page not found.
pub const MDB_PAGE_NOTFOUND: c_int = -30797;
/// Located page was wrong type.
pub const MDB_CORRUPTED: c_int = -30796;
/// Update of meta page failed or environment had fatal error.
pub const MDB_PANIC: c_int = -30795;
/// Environment version mismatch.
pub const MDB_VERSION_MISMATCH: c_int = -30794;
/// File is not a valid LMDB file.
pub const MDB_INVALID: c_int = -30793;
/// Environment mapsize reached.
pub const MDB_MAP_FULL: c_int = -30792;
/// Environment maxdbs reached.
pub const MDB_DBS_FULL: c_int = -30791;
/// Environment maxreaders reached.
pub const MDB_READERS_FULL: c_int = -30790;
/// Too many TLS keys in use.
pub const MDB_TLS_FULL: c_int = -30789;
/// Txn has too many dirty pages.
pub const MDB_TXN_FULL: c_int = -30788;
/// Cursor stack too deep.
pub const MDB_CURSOR_FULL: c_int = -30787;
/// Page has not enough space.
pub const MDB_PAGE_FULL: c_int = -30786;
/// Database contents grew beyond environment mapsize.
pub const MDB_MAP_RESIZED: c_int = -30785;
/// Operation and DB incompatible, or DB type changed.
pub const MDB_INCOMPATIBLE: c_int = -30784;
/// Invalid reuse of reader locktable slot.
pub const MDB_BAD_RSLOT: c_int = -30783;
/// Transaction must abort, has a child, or is invalid.
pub const MDB_BAD_TXN: c_int = -30782;
/// Unsupported size of key/DB name/data, or wrong DUPFIXED size.
pub const MDB_BAD_VALSIZE: c_int = -30781;
/// The specified DBI was changed unexpectedly.
pub const MDB_BAD_DBI: c_int = -30780;

/// Permission denied (`EACCES`).
pub const EACCES: c_int = 13;
/// Device or resource busy (`EBUSY`).
pub const EBUSY: c_int = 16;
/// Invalid argument (`EINVAL`).
pub const EINVAL: c_int = 22;

// Database flags

/// Use reverse string keys.
pub const MDB_REVERSEKEY: c_uint = 0x02;
/// Use sorted duplicates.
pub const MDB_DUPSORT: c_uint = 0x04;
/// Numeric keys in native byte order.
pub const MDB_INTEGERKEY: c_uint = 0x08;
/// With `MDB_DUPSORT`, sorted dup items have fixed size.
pub const MDB_DUPFIXED: c_uint = 0x10;
/// With `MDB_DUPSORT`, dups are `MDB_INTEGERKEY`-style integers.
pub const MDB_INTEGERDUP: c_uint = 0x20;
/// With `MDB_DUPSORT`, use reverse string dups.
pub const MDB_REVERSEDUP: c_uint = 0x40;
/// Create DB if not already existing.
pub const MDB_CREATE: c_uint = 0x40000;

// Transaction flags

/// Read only transaction.
pub const MDB_RDONLY: c_uint = 0x20000;

// Write flags

/// Don't write if the key already exists.
pub const MDB_NOOVERWRITE: c_uint = 0x10;
/// Only for `MDB_DUPSORT`: don't write if the key and data pair already exist.
pub const MDB_NODUPDATA: c_uint = 0x20;
/// For `mdb_cursor_put`: overwrite the current key/data pair.
pub const MDB_CURRENT: c_uint = 0x40;
/// Just reserve space for data, don't copy it.
pub const MDB_RESERVE: c_uint = 0x10000;
/// Data is being appended, don't split full pages.
pub const MDB_APPEND: c_uint = 0x20000;
/// Duplicate data is being appended, don't split full pages.
pub const MDB_APPENDDUP: c_uint = 0x40000;
/// Store multiple data items in one call. Only for `MDB_DUPFIXED`.
pub const MDB_MULTIPLE: c_uint = 0x80000;

// Cursor operations

/// Position at first key/data item.
pub const MDB_FIRST: MdbCursorOp = 0;
/// Position at first data item of current key. Only for `MDB_DUPSORT`.
pub const MDB_FIRST_DUP: MdbCursorOp = 1;
/// Position at key/data pair. Only for `MDB_DUPSORT`.
pub const MDB_GET_BOTH: MdbCursorOp = 2;
/// Position at key, nearest data. Only for `MDB_DUPSORT`.
pub const MDB_GET_BOTH_RANGE: MdbCursorOp = 3;
/// Return key/data at current cursor position.
pub const MDB_GET_CURRENT: MdbCursorOp = 4;
/// Return up to a page of duplicate data items from current cursor position.
pub const MDB_GET_MULTIPLE: MdbCursorOp = 5;
/// Position at last key/data item.
pub const MDB_LAST: MdbCursorOp = 6;
/// Position at last data item of current key. Only for `MDB_DUPSORT`.
pub const MDB_LAST_DUP: MdbCursorOp = 7;
/// Position at next data item.
pub const MDB_NEXT: MdbCursorOp = 8;
/// Position at next data item of current key. Only for `MDB_DUPSORT`.
pub const MDB_NEXT_DUP: MdbCursorOp = 9;
/// Return up to a page of duplicate data items from next cursor position.
pub const MDB_NEXT_MULTIPLE: MdbCursorOp = 10;
/// Position at first data item of next key.
pub const MDB_NEXT_NODUP: MdbCursorOp = 11;
/// Position at previous data item.
pub const MDB_PREV: MdbCursorOp = 12;
/// Position at previous data item of current key. Only for `MDB_DUPSORT`.
pub const MDB_PREV_DUP: MdbCursorOp = 13;
/// Position at last data item of previous key.
pub const MDB_PREV_NODUP: MdbCursorOp = 14;
/// Position at specified key.
pub const MDB_SET: MdbCursorOp = 15;
/// Position at specified key, return key + data.
pub const MDB_SET_KEY: MdbCursorOp = 16;
/// Position at first key greater than or equal to specified key.
pub const MDB_SET_RANGE: MdbCursorOp = 17;
/// Position at previous page and return up to a page of duplicate data items.
pub const MDB_PREV_MULTIPLE: MdbCursorOp = 18;

/// Largest key size the engine accepts.
pub const MAX_KEY_SIZE: usize = 511;
