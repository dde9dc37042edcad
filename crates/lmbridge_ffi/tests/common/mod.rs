//! Shared helpers for the integration tests.

#![allow(dead_code)]

use lmbridge_engine::{CursorHandle, Engine};
use lmbridge_ffi::{cursor_get, BridgeResult, CursorOp};

/// Every key/data pair visible through `cursor`, in cursor order.
pub fn dump<E: Engine + ?Sized>(engine: &E, cursor: CursorHandle) -> Vec<(Vec<u8>, Vec<u8>)> {
    let mut items = Vec::new();
    let mut op = CursorOp::First;
    loop {
        match cursor_get(engine, cursor, b"", b"", op) {
            Ok((k, v)) => items.push(unsafe { (k.to_vec(), v.to_vec()) }),
            Err(e) if e.is_not_found() => break,
            Err(e) => panic!("cursor walk failed: {e}"),
        }
        op = CursorOp::Next;
    }
    items
}

/// Keys only, in cursor order.
pub fn keys<E: Engine + ?Sized>(engine: &E, cursor: CursorHandle) -> Vec<Vec<u8>> {
    dump(engine, cursor).into_iter().map(|(k, _)| k).collect()
}

/// Data items stored under `key`, in duplicate order.
pub fn dups<E: Engine + ?Sized>(
    engine: &E,
    cursor: CursorHandle,
    key: &[u8],
) -> BridgeResult<Vec<Vec<u8>>> {
    let mut items = Vec::new();
    let (_, first) = cursor_get(engine, cursor, key, b"", CursorOp::Set)?;
    items.push(unsafe { first.to_vec() });
    loop {
        match cursor_get(engine, cursor, b"", b"", CursorOp::NextDup) {
            Ok((_, v)) => items.push(unsafe { v.to_vec() }),
            Err(e) if e.is_not_found() => return Ok(items),
            Err(e) => return Err(e),
        }
    }
}
