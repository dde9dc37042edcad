//! Write/read path marshaler.
//!
//! Slice-level wrappers over [`crate::raw`]. Each function makes one engine
//! call, then checks for a callback fault parked during that call, then maps
//! the engine's status code to a [`BridgeResult`]. Non-zero codes are carried
//! verbatim in [`BridgeError::Engine`].
//!
//! Descriptors returned from reads point at engine-owned memory. They are
//! tied to the engine borrow, but the engine's own rule is narrower: they
//! stay valid only until the transaction ends or next writes.

use crate::buffer::{MultiVal, Val};
use crate::error::{BridgeError, BridgeResult};
use crate::fault;
use crate::raw;
use lmbridge_engine::{CursorHandle, Dbi, Engine, MdbCursorOp, MdbVal, TxnHandle};
use std::ffi::{c_int, c_uint};

/// Maps an engine status to a result.
pub(crate) fn check(op: &'static str, rc: c_int) -> BridgeResult<()> {
    if rc == 0 {
        Ok(())
    } else {
        Err(BridgeError::engine(op, rc))
    }
}

/// Runs one native call with the fault slot cleared beforehand and checked
/// afterwards. A parked fault takes precedence over the status code.
fn call(op: &'static str, native: impl FnOnce() -> c_int) -> BridgeResult<()> {
    fault::clear_pending();
    let rc = native();
    if let Some(fault) = fault::take_pending() {
        return Err(BridgeError::CallbackFault(fault));
    }
    check(op, rc)
}

/// Looks up `key` (`mdb_get`).
pub fn get<'a, E: Engine + ?Sized>(
    engine: &'a E,
    txn: TxnHandle,
    dbi: Dbi,
    key: &[u8],
) -> BridgeResult<Val<'a>> {
    let mut val = MdbVal::empty();
    // SAFETY: `key` is a live slice and `val` a local descriptor.
    call("mdb_get", || unsafe {
        raw::mdb_get(engine, txn, dbi, key.as_ptr(), key.len(), &mut val)
    })?;
    // SAFETY: the engine filled `val` with memory it owns.
    Ok(unsafe { Val::from_mdb(val) })
}

/// Stores `key`/`val` (`mdb_put`).
pub fn put<E: Engine + ?Sized>(
    engine: &E,
    txn: TxnHandle,
    dbi: Dbi,
    key: &[u8],
    val: &[u8],
    flags: c_uint,
) -> BridgeResult<()> {
    // SAFETY: both slices outlive the call.
    call("mdb_put", || unsafe {
        raw::mdb_put2(
            engine,
            txn,
            dbi,
            key.as_ptr(),
            key.len(),
            val.as_ptr(),
            val.len(),
            flags,
        )
    })
}

/// Stores `key` with a caller-built descriptor for the value.
///
/// The descriptor is passed through unchanged and may be updated by the
/// engine. With `MDB_NOOVERWRITE` on an existing key it is set to the
/// existing value.
pub fn put_val<E: Engine + ?Sized>(
    engine: &E,
    txn: TxnHandle,
    dbi: Dbi,
    key: &[u8],
    val: &mut Val<'_>,
    flags: c_uint,
) -> BridgeResult<()> {
    // SAFETY: `key` outlives the call; `val` borrows its bytes.
    call("mdb_put", || unsafe {
        raw::mdb_put1(engine, txn, dbi, key.as_ptr(), key.len(), val.raw_mut(), flags)
    })
}

/// Deletes `key` (`mdb_del`). With `Some(val)` on a `MDB_DUPSORT` database
/// only that data item is deleted.
pub fn del<E: Engine + ?Sized>(
    engine: &E,
    txn: TxnHandle,
    dbi: Dbi,
    key: &[u8],
    val: Option<&[u8]>,
) -> BridgeResult<()> {
    let (vptr, vlen) = val.map_or((std::ptr::null(), 0), |v| (v.as_ptr(), v.len()));
    // SAFETY: `key` and `val` outlive the call; null `vptr` means no value.
    call("mdb_del", || unsafe {
        raw::mdb_del(engine, txn, dbi, key.as_ptr(), key.len(), vptr, vlen)
    })
}

/// Positions `cursor` and returns the key/data pair there
/// (`mdb_cursor_get`).
///
/// An empty `set_key` passes no inputs. An empty `set_val` passes the key
/// only. Otherwise both are passed. Which inputs `op` actually reads is up
/// to the engine.
pub fn cursor_get<'a, E: Engine + ?Sized>(
    engine: &'a E,
    cursor: CursorHandle,
    set_key: &'a [u8],
    set_val: &'a [u8],
    op: impl Into<MdbCursorOp>,
) -> BridgeResult<(Val<'a>, Val<'a>)> {
    let op = op.into();
    let mut key = MdbVal::empty();
    let mut val = MdbVal::empty();
    // SAFETY: inputs outlive the call; `key` and `val` are local.
    call("mdb_cursor_get", || unsafe {
        if set_key.is_empty() {
            engine.cursor_get(cursor, &mut key, &mut val, op)
        } else if set_val.is_empty() {
            raw::mdb_cursor_get1(
                engine,
                cursor,
                set_key.as_ptr(),
                set_key.len(),
                &mut key,
                &mut val,
                op,
            )
        } else {
            raw::mdb_cursor_get2(
                engine,
                cursor,
                set_key.as_ptr(),
                set_key.len(),
                set_val.as_ptr(),
                set_val.len(),
                &mut key,
                &mut val,
                op,
            )
        }
    })?;
    // SAFETY: the engine filled both descriptors, each pointing at its own
    // memory or at one of the inputs.
    Ok(unsafe { (Val::from_mdb(key), Val::from_mdb(val)) })
}

/// Stores `key`/`val` through `cursor` (`mdb_cursor_put`).
pub fn cursor_put<E: Engine + ?Sized>(
    engine: &E,
    cursor: CursorHandle,
    key: &[u8],
    val: &[u8],
    flags: c_uint,
) -> BridgeResult<()> {
    // SAFETY: both slices outlive the call.
    call("mdb_cursor_put", || unsafe {
        raw::mdb_cursor_put2(
            engine,
            cursor,
            key.as_ptr(),
            key.len(),
            val.as_ptr(),
            val.len(),
            flags,
        )
    })
}

/// Stores every `stride`-byte record of `page` under `key` in one call
/// (`mdb_cursor_put` with `MDB_MULTIPLE`). Returns the number of records
/// written.
///
/// A page whose length is not a multiple of `stride` is rejected with
/// [`BridgeError::IncongruentMulti`] before the engine is called.
pub fn cursor_put_multi<E: Engine + ?Sized>(
    engine: &E,
    cursor: CursorHandle,
    key: &[u8],
    page: &[u8],
    stride: usize,
    flags: c_uint,
) -> BridgeResult<usize> {
    let mut multi = MultiVal::wrap(page, stride)?;
    let mut k = Val::wrap(key);
    let flags = flags | lmbridge_engine::sys::MDB_MULTIPLE;
    // SAFETY: `multi` borrows `page` and holds the two-descriptor array.
    call("mdb_cursor_put", || unsafe {
        engine.cursor_put(cursor, k.raw_mut(), multi.as_mut_ptr(), flags)
    })?;
    Ok(multi.written())
}

/// Deletes the item at `cursor` (`mdb_cursor_del`).
pub fn cursor_del<E: Engine + ?Sized>(
    engine: &E,
    cursor: CursorHandle,
    flags: c_uint,
) -> BridgeResult<()> {
    call("mdb_cursor_del", || engine.cursor_del(cursor, flags))
}
