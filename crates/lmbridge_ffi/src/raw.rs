//! Pointer+length shim over the engine primitives.
//!
//! Each function builds the descriptors the engine expects from raw
//! pointer+length pairs, makes exactly one engine call and returns its
//! status code unchanged. Nothing is copied.
//!
//! # Safety
//!
//! For every function here: each `(ptr, len)` pair must be readable for
//! `len` bytes (or `len` must be zero), and each `*mut MdbVal` must be
//! valid for writes. Descriptors the engine fills point at engine-owned
//! memory governed by the transaction.

use crate::buffer::Val;
use lmbridge_engine::sys::{EINVAL, MDB_MULTIPLE};
use lmbridge_engine::{CursorHandle, Dbi, Engine, MdbCursorOp, MdbVal, TxnHandle};
use std::ffi::{c_int, c_uint, c_void};

/// `mdb_get` with a raw key.
pub unsafe fn mdb_get<E: Engine + ?Sized>(
    engine: &E,
    txn: TxnHandle,
    dbi: Dbi,
    key: *const u8,
    key_len: usize,
    val: *mut MdbVal,
) -> c_int {
    let mut k = Val::from_raw(key, key_len);
    engine.get(txn, dbi, k.raw_mut(), val)
}

/// `mdb_put` with a raw key and a caller descriptor for the value.
pub unsafe fn mdb_put1<E: Engine + ?Sized>(
    engine: &E,
    txn: TxnHandle,
    dbi: Dbi,
    key: *const u8,
    key_len: usize,
    val: *mut MdbVal,
    flags: c_uint,
) -> c_int {
    let mut k = Val::from_raw(key, key_len);
    engine.put(txn, dbi, k.raw_mut(), val, flags)
}

/// `mdb_put` with a raw key and value.
#[allow(clippy::too_many_arguments)]
pub unsafe fn mdb_put2<E: Engine + ?Sized>(
    engine: &E,
    txn: TxnHandle,
    dbi: Dbi,
    key: *const u8,
    key_len: usize,
    val: *const u8,
    val_len: usize,
    flags: c_uint,
) -> c_int {
    let mut k = Val::from_raw(key, key_len);
    let mut v = Val::from_raw(val, val_len);
    engine.put(txn, dbi, k.raw_mut(), v.raw_mut(), flags)
}

/// `mdb_del` with a raw key and an optional raw value (null `val` deletes
/// every item of the key).
#[allow(clippy::too_many_arguments)]
pub unsafe fn mdb_del<E: Engine + ?Sized>(
    engine: &E,
    txn: TxnHandle,
    dbi: Dbi,
    key: *const u8,
    key_len: usize,
    val: *const u8,
    val_len: usize,
) -> c_int {
    let mut k = Val::from_raw(key, key_len);
    if val.is_null() {
        return engine.del(txn, dbi, k.raw_mut(), std::ptr::null_mut());
    }
    let mut v = Val::from_raw(val, val_len);
    engine.del(txn, dbi, k.raw_mut(), v.raw_mut())
}

/// `mdb_cursor_get` positioned by a raw key.
///
/// The key is written into `key` before the call, so the engine sees it as
/// input and may overwrite it with its own copy.
pub unsafe fn mdb_cursor_get1<E: Engine + ?Sized>(
    engine: &E,
    cursor: CursorHandle,
    set_key: *const u8,
    set_key_len: usize,
    key: *mut MdbVal,
    val: *mut MdbVal,
    op: MdbCursorOp,
) -> c_int {
    *key = Val::from_raw(set_key, set_key_len).into_raw();
    engine.cursor_get(cursor, key, val, op)
}

/// `mdb_cursor_get` positioned by a raw key and value.
#[allow(clippy::too_many_arguments)]
pub unsafe fn mdb_cursor_get2<E: Engine + ?Sized>(
    engine: &E,
    cursor: CursorHandle,
    set_key: *const u8,
    set_key_len: usize,
    set_val: *const u8,
    set_val_len: usize,
    key: *mut MdbVal,
    val: *mut MdbVal,
    op: MdbCursorOp,
) -> c_int {
    *key = Val::from_raw(set_key, set_key_len).into_raw();
    *val = Val::from_raw(set_val, set_val_len).into_raw();
    engine.cursor_get(cursor, key, val, op)
}

/// `mdb_cursor_put` with a raw key and a caller descriptor for the value.
pub unsafe fn mdb_cursor_put1<E: Engine + ?Sized>(
    engine: &E,
    cursor: CursorHandle,
    key: *const u8,
    key_len: usize,
    val: *mut MdbVal,
    flags: c_uint,
) -> c_int {
    let mut k = Val::from_raw(key, key_len);
    engine.cursor_put(cursor, k.raw_mut(), val, flags)
}

/// `mdb_cursor_put` with a raw key and value.
pub unsafe fn mdb_cursor_put2<E: Engine + ?Sized>(
    engine: &E,
    cursor: CursorHandle,
    key: *const u8,
    key_len: usize,
    val: *const u8,
    val_len: usize,
    flags: c_uint,
) -> c_int {
    let mut k = Val::from_raw(key, key_len);
    let mut v = Val::from_raw(val, val_len);
    engine.cursor_put(cursor, k.raw_mut(), v.raw_mut(), flags)
}

/// `mdb_cursor_put` of `count` records of `stride` bytes starting at
/// `page`, in one call. `MDB_MULTIPLE` is added to `flags`.
///
/// Returns `EINVAL` without calling the engine when `stride` is zero. On
/// return `*written`, when non-null, holds the number of records stored.
#[allow(clippy::too_many_arguments)]
pub unsafe fn mdb_cursor_putmulti<E: Engine + ?Sized>(
    engine: &E,
    cursor: CursorHandle,
    key: *const u8,
    key_len: usize,
    page: *const u8,
    count: usize,
    stride: usize,
    flags: c_uint,
    written: *mut usize,
) -> c_int {
    if stride == 0 {
        return EINVAL;
    }
    let mut k = Val::from_raw(key, key_len);
    let mut vals = [
        MdbVal {
            mv_size: stride,
            mv_data: page as *mut c_void,
        },
        MdbVal {
            mv_size: count,
            mv_data: std::ptr::null_mut(),
        },
    ];
    let rc = engine.cursor_put(cursor, k.raw_mut(), vals.as_mut_ptr(), flags | MDB_MULTIPLE);
    if let Some(written) = written.as_mut() {
        *written = vals[1].mv_size;
    }
    rc
}
