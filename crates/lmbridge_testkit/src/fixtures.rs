//! Test fixtures and environment helpers.
//!
//! Provides ready-made environments, transactions, databases and cursors
//! over [`MemoryEngine`], plus process-wide helpers for tests that share
//! global bridge state.

use lmbridge_engine::sys::{MDB_CREATE, MDB_RDONLY, MDB_SUCCESS};
use lmbridge_engine::{
    strerror, CursorHandle, Dbi, Engine, MemoryEngine, MemoryEngineConfig, TxnHandle,
};
use parking_lot::{Mutex, MutexGuard};
use std::ffi::{c_uint, CString};
use std::sync::Once;

/// A test environment. Dereferences to the engine.
pub struct TestEnv {
    /// The engine instance.
    pub env: MemoryEngine,
}

impl TestEnv {
    /// Creates an environment with the default configuration.
    pub fn new() -> Self {
        Self {
            env: MemoryEngine::new(),
        }
    }

    /// Creates an environment with `config`.
    pub fn with_config(config: MemoryEngineConfig) -> Self {
        Self {
            env: MemoryEngine::open(config).expect("Failed to open memory engine"),
        }
    }

    /// Begins a write transaction.
    pub fn begin_write(&self) -> TxnHandle {
        let mut txn = TxnHandle::default();
        expect_ok("mdb_txn_begin", self.env.txn_begin(None, 0, &mut txn));
        txn
    }

    /// Begins a read-only transaction.
    pub fn begin_read(&self) -> TxnHandle {
        let mut txn = TxnHandle::default();
        expect_ok("mdb_txn_begin", self.env.txn_begin(None, MDB_RDONLY, &mut txn));
        txn
    }

    /// Commits `txn`.
    pub fn commit(&self, txn: TxnHandle) {
        expect_ok("mdb_txn_commit", self.env.txn_commit(txn));
    }

    /// Opens (creating if needed) the named database with `flags`.
    pub fn open_db(&self, txn: TxnHandle, name: &str, flags: c_uint) -> Dbi {
        let name = CString::new(name).expect("Database name contains NUL");
        let mut dbi = Dbi(0);
        expect_ok(
            "mdb_dbi_open",
            self.env.dbi_open(txn, Some(&name), flags | MDB_CREATE, &mut dbi),
        );
        dbi
    }

    /// Opens a cursor on `dbi`.
    pub fn open_cursor(&self, txn: TxnHandle, dbi: Dbi) -> CursorHandle {
        let mut cursor = CursorHandle::default();
        expect_ok("mdb_cursor_open", self.env.cursor_open(txn, dbi, &mut cursor));
        cursor
    }

    /// Begins a write transaction and opens a database and a cursor in it.
    pub fn scratch(&self, name: &str, flags: c_uint) -> Scratch {
        let txn = self.begin_write();
        let dbi = self.open_db(txn, name, flags);
        let cursor = self.open_cursor(txn, dbi);
        Scratch { txn, dbi, cursor }
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestEnv {
    type Target = MemoryEngine;

    fn deref(&self) -> &Self::Target {
        &self.env
    }
}

/// Handles from [`TestEnv::scratch`].
#[derive(Debug, Clone, Copy)]
pub struct Scratch {
    /// The open write transaction.
    pub txn: TxnHandle,
    /// The opened database.
    pub dbi: Dbi,
    /// A cursor on the database.
    pub cursor: CursorHandle,
}

fn expect_ok(op: &str, rc: i32) {
    assert_eq!(rc, MDB_SUCCESS, "{op} failed: {}", strerror(rc));
}

/// Runs a test with a fresh environment.
pub fn with_test_env<F, R>(f: F) -> R
where
    F: FnOnce(&TestEnv) -> R,
{
    let env = TestEnv::new();
    f(&env)
}

static SERIAL: Mutex<()> = Mutex::new(());

/// Serializes tests that touch process-wide bridge state, such as the
/// single-dispatch comparator slot.
pub fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock()
}

static TRACING: Once = Once::new();

/// Installs a `tracing` subscriber filtered by `RUST_LOG`, once per process.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_handles() {
        with_test_env(|env| {
            let scratch = env.scratch("fixture", 0);
            assert_eq!(env.active_txns(), 1);
            env.commit(scratch.txn);
            assert_eq!(env.active_txns(), 0);
        });
    }

    #[test]
    fn test_readers_are_counted() {
        let env = TestEnv::new();
        let a = env.begin_read();
        let _b = env.begin_read();
        assert_eq!(env.active_readers(), 2);
        env.txn_abort(a);
        assert_eq!(env.active_readers(), 1);
    }
}
