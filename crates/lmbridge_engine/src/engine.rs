//! Native engine trait definition.

use crate::sys::{CursorHandle, Dbi, MdbCmpFunc, MdbCursorOp, MdbMsgFunc, MdbVal, TxnHandle};
use std::ffi::{c_int, c_uint, c_void, CStr};

/// The callback-based C API of a transactional, sorted key-value store.
///
/// Engines are **black boxes** to the bridge: every method follows the
/// `mdb_*` calling convention, returns a signed status code (`0` = success)
/// and leaves interpretation to the caller.
///
/// # Invariants
///
/// - Out-descriptors populated by `get` and `cursor_get` point at
///   engine-owned memory that stays valid until the transaction ends, the
///   next write in that transaction, or the next operation on the same cursor
/// - Registered comparators are invoked synchronously on the calling thread,
///   never recursively, and only from inside a call into the engine
/// - `reader_list` invokes the message function once per active reader, in
///   reader-slot order, and stops at the first non-zero return
///
/// # Implementors
///
/// - [`super::MemoryEngine`] - In-process reference engine
pub trait Engine: Send + Sync {
    /// Returns an identifier that is stable for the lifetime of this
    /// environment and unique within the process.
    fn env_id(&self) -> u64;

    /// Begins a transaction (`mdb_txn_begin`).
    ///
    /// Pass [`crate::sys::MDB_RDONLY`] in `flags` for a read-only transaction.
    fn txn_begin(&self, parent: Option<TxnHandle>, flags: c_uint, txn: &mut TxnHandle) -> c_int;

    /// Commits all the operations of a transaction (`mdb_txn_commit`).
    fn txn_commit(&self, txn: TxnHandle) -> c_int;

    /// Abandons all the operations of a transaction (`mdb_txn_abort`).
    fn txn_abort(&self, txn: TxnHandle);

    /// Opens a database in the environment (`mdb_dbi_open`).
    ///
    /// `name` of `None` opens the root database.
    fn dbi_open(&self, txn: TxnHandle, name: Option<&CStr>, flags: c_uint, dbi: &mut Dbi)
        -> c_int;

    /// Sets a custom key comparison function for a database
    /// (`mdb_set_compare`). `None` restores the default order.
    fn set_compare(&self, txn: TxnHandle, dbi: Dbi, cmp: Option<MdbCmpFunc>) -> c_int;

    /// Sets a custom data comparison function for a `MDB_DUPSORT` database
    /// (`mdb_set_dupsort`). `None` restores the default order.
    fn set_dupsort(&self, txn: TxnHandle, dbi: Dbi, cmp: Option<MdbCmpFunc>) -> c_int;

    /// Gets items from a database (`mdb_get`).
    ///
    /// # Safety
    ///
    /// `key` must describe readable memory; `data` must be writable.
    unsafe fn get(&self, txn: TxnHandle, dbi: Dbi, key: *mut MdbVal, data: *mut MdbVal) -> c_int;

    /// Stores items into a database (`mdb_put`).
    ///
    /// # Safety
    ///
    /// `key` and `data` must describe readable memory and be writable.
    unsafe fn put(
        &self,
        txn: TxnHandle,
        dbi: Dbi,
        key: *mut MdbVal,
        data: *mut MdbVal,
        flags: c_uint,
    ) -> c_int;

    /// Deletes items from a database (`mdb_del`). `data` may be null.
    ///
    /// # Safety
    ///
    /// `key` (and `data` when non-null) must describe readable memory.
    unsafe fn del(&self, txn: TxnHandle, dbi: Dbi, key: *mut MdbVal, data: *mut MdbVal) -> c_int;

    /// Creates a cursor handle (`mdb_cursor_open`).
    fn cursor_open(&self, txn: TxnHandle, dbi: Dbi, cursor: &mut CursorHandle) -> c_int;

    /// Closes a cursor handle (`mdb_cursor_close`).
    fn cursor_close(&self, cursor: CursorHandle);

    /// Retrieves by cursor (`mdb_cursor_get`).
    ///
    /// # Safety
    ///
    /// `key` and `data` must be writable; when the operation reads them as
    /// input they must describe readable memory.
    unsafe fn cursor_get(
        &self,
        cursor: CursorHandle,
        key: *mut MdbVal,
        data: *mut MdbVal,
        op: MdbCursorOp,
    ) -> c_int;

    /// Stores by cursor (`mdb_cursor_put`).
    ///
    /// With [`crate::sys::MDB_MULTIPLE`], `data` points at an array of two
    /// `MdbVal`s: the first holds the record size and the address of the
    /// first record, the second holds the record count. On return the
    /// second holds the number of records written.
    ///
    /// # Safety
    ///
    /// `key` and `data` must describe readable memory and be writable.
    unsafe fn cursor_put(
        &self,
        cursor: CursorHandle,
        key: *mut MdbVal,
        data: *mut MdbVal,
        flags: c_uint,
    ) -> c_int;

    /// Deletes the current key/data pair (`mdb_cursor_del`).
    fn cursor_del(&self, cursor: CursorHandle, flags: c_uint) -> c_int;

    /// Dumps the entries in the reader lock table (`mdb_reader_list`).
    ///
    /// # Safety
    ///
    /// `ctx` is passed to `func` verbatim and must be whatever `func`
    /// expects.
    unsafe fn reader_list(&self, func: Option<MdbMsgFunc>, ctx: *mut c_void) -> c_int;
}
