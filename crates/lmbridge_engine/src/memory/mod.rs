//! In-process reference engine.
//!
//! `MemoryEngine` keeps every database as a sorted vector and publishes a new
//! immutable snapshot on each write commit. It honors the same callback
//! contracts as a native engine: comparators are called through their
//! `MdbCmpFunc` pointer and reader listings go through the `MdbMsgFunc`.

mod cursor;
mod readers;
mod tree;

use crate::config::{ConfigError, MemoryEngineConfig};
use crate::engine::Engine;
use crate::sys::*;
use cursor::{CursorState, Fetch};
use parking_lot::Mutex;
use readers::ReaderTable;
use std::collections::{BTreeMap, HashMap};
use std::ffi::{c_int, c_uint, c_void, CStr, CString};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tree::{DbData, Layout, Order, Refusal, Snapshot};

static NEXT_ENV_ID: AtomicU64 = AtomicU64::new(1);

/// Dbi of the unnamed root database.
const MAIN_DBI: u32 = 1;

/// Database flags the memory engine understands.
const SUPPORTED_DB_FLAGS: c_uint = MDB_DUPSORT | MDB_DUPFIXED;

/// Database flags that are part of a database's identity.
const PERSISTENT_DB_FLAGS: c_uint =
    MDB_REVERSEKEY | MDB_DUPSORT | MDB_INTEGERKEY | MDB_DUPFIXED | MDB_INTEGERDUP | MDB_REVERSEDUP;

const PUT_FLAGS: c_uint = MDB_NOOVERWRITE | MDB_NODUPDATA | MDB_APPEND | MDB_APPENDDUP;

struct DbMeta {
    name: Option<CString>,
    flags: c_uint,
    cmp: Option<MdbCmpFunc>,
    dcmp: Option<MdbCmpFunc>,
}

impl DbMeta {
    fn layout(&self) -> Layout {
        Layout {
            key_order: Order::new(self.cmp),
            dup_order: Order::new(self.dcmp),
            flags: self.flags,
        }
    }
}

enum View {
    Read(Arc<Snapshot>),
    Write(Snapshot),
}

impl View {
    fn snapshot(&self) -> &Snapshot {
        match self {
            Self::Read(snapshot) => snapshot,
            Self::Write(snapshot) => snapshot,
        }
    }

    fn snapshot_mut(&mut self) -> Option<&mut Snapshot> {
        match self {
            Self::Read(_) => None,
            Self::Write(snapshot) => Some(snapshot),
        }
    }
}

struct TxnState {
    view: View,
    reader_slot: Option<usize>,
}

struct EnvState {
    committed: Arc<Snapshot>,
    catalog: BTreeMap<u32, DbMeta>,
    txns: HashMap<u64, TxnState>,
    cursors: HashMap<u64, CursorState>,
    writer: Option<u64>,
    next_handle: u64,
}

impl EnvState {
    fn allocate_handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn read_db(&self, txn: TxnHandle, dbi: Dbi) -> Result<(&DbData, Layout), c_int> {
        let t = self.txns.get(&txn.0).ok_or(EINVAL)?;
        let meta = self.catalog.get(&dbi.0).ok_or(EINVAL)?;
        let db = t.view.snapshot().dbs.get(&dbi.0).ok_or(MDB_BAD_DBI)?;
        Ok((db, meta.layout()))
    }

    fn write_db(
        &mut self,
        txn: TxnHandle,
        dbi: Dbi,
    ) -> Result<(&mut DbData, &mut usize, Layout), c_int> {
        let t = self.txns.get_mut(&txn.0).ok_or(EINVAL)?;
        let meta = self.catalog.get(&dbi.0).ok_or(EINVAL)?;
        let Snapshot { dbs, used, .. } = t.view.snapshot_mut().ok_or(EACCES)?;
        let db = dbs.get_mut(&dbi.0).ok_or(MDB_BAD_DBI)?;
        Ok((db, used, meta.layout()))
    }

    /// Ends `txn`, closing its cursors. Returns the transaction if it existed.
    fn finish(&mut self, txn: TxnHandle, readers: &Mutex<ReaderTable>) -> Option<TxnState> {
        let state = self.txns.remove(&txn.0)?;
        self.cursors.retain(|_, cursor| cursor.txn != txn.0);
        if let Some(slot) = state.reader_slot {
            readers.lock().release(slot);
        }
        if self.writer == Some(txn.0) {
            self.writer = None;
        }
        Some(state)
    }
}

/// An in-memory environment implementing [`Engine`].
///
/// Lock order is the environment state, then the reader table.
pub struct MemoryEngine {
    id: u64,
    config: MemoryEngineConfig,
    state: Mutex<EnvState>,
    readers: Mutex<ReaderTable>,
}

impl MemoryEngine {
    /// Opens an environment with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::build(MemoryEngineConfig::default())
    }

    /// Opens an environment with `config`.
    pub fn open(config: MemoryEngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: MemoryEngineConfig) -> Self {
        let id = NEXT_ENV_ID.fetch_add(1, Ordering::Relaxed);
        let mut catalog = BTreeMap::new();
        catalog.insert(
            MAIN_DBI,
            DbMeta {
                name: None,
                flags: 0,
                cmp: None,
                dcmp: None,
            },
        );
        let mut dbs = BTreeMap::new();
        dbs.insert(MAIN_DBI, DbData::default());
        let committed = Arc::new(Snapshot {
            txnid: 0,
            dbs,
            used: 0,
        });

        tracing::debug!(
            env_id = id,
            max_readers = config.max_readers,
            map_size = config.map_size,
            "opened memory environment"
        );

        Self {
            id,
            readers: Mutex::new(ReaderTable::new(config.max_readers)),
            config,
            state: Mutex::new(EnvState {
                committed,
                catalog,
                txns: HashMap::new(),
                cursors: HashMap::new(),
                writer: None,
                next_handle: 0,
            }),
        }
    }

    /// Returns the configuration this environment was opened with.
    pub fn config(&self) -> &MemoryEngineConfig {
        &self.config
    }

    /// Returns the number of occupied reader slots.
    pub fn active_readers(&self) -> usize {
        self.readers.lock().active()
    }

    /// Returns the number of live transactions.
    pub fn active_txns(&self) -> usize {
        self.state.lock().txns.len()
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEngine")
            .field("id", &self.id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Borrows the bytes a descriptor points at.
///
/// # Safety
///
/// `val` must be null or describe readable memory that outlives `'a`.
unsafe fn bytes<'a>(val: *const MdbVal) -> &'a [u8] {
    match val.as_ref() {
        Some(val) if !val.mv_data.is_null() && val.mv_size > 0 => {
            std::slice::from_raw_parts(val.mv_data as *const u8, val.mv_size)
        }
        _ => &[],
    }
}

fn valid_key(key: &[u8]) -> bool {
    !key.is_empty() && key.len() <= MAX_KEY_SIZE
}

impl Engine for MemoryEngine {
    fn env_id(&self) -> u64 {
        self.id
    }

    fn txn_begin(&self, parent: Option<TxnHandle>, flags: c_uint, txn: &mut TxnHandle) -> c_int {
        if parent.is_some() {
            return EINVAL;
        }
        let mut state = self.state.lock();
        let readonly = flags & MDB_RDONLY != 0;
        let txn_state = if readonly {
            let snapshot = Arc::clone(&state.committed);
            let Some(slot) = self.readers.lock().acquire(snapshot.txnid) else {
                return MDB_READERS_FULL;
            };
            TxnState {
                view: View::Read(snapshot),
                reader_slot: Some(slot),
            }
        } else {
            if state.writer.is_some() {
                return EBUSY;
            }
            let mut snapshot = (*state.committed).clone();
            snapshot.txnid += 1;
            TxnState {
                view: View::Write(snapshot),
                reader_slot: None,
            }
        };

        let handle = state.allocate_handle();
        let txnid = txn_state.view.snapshot().txnid;
        if !readonly {
            state.writer = Some(handle);
        }
        state.txns.insert(handle, txn_state);
        *txn = TxnHandle(handle);

        tracing::debug!(env_id = self.id, handle, txnid, readonly, "began transaction");
        MDB_SUCCESS
    }

    fn txn_commit(&self, txn: TxnHandle) -> c_int {
        let mut state = self.state.lock();
        let Some(finished) = state.finish(txn, &self.readers) else {
            return EINVAL;
        };
        if let View::Write(snapshot) = finished.view {
            tracing::debug!(
                env_id = self.id,
                txnid = snapshot.txnid,
                used = snapshot.used,
                "committed transaction"
            );
            state.committed = Arc::new(snapshot);
        }
        MDB_SUCCESS
    }

    fn txn_abort(&self, txn: TxnHandle) {
        self.state.lock().finish(txn, &self.readers);
    }

    fn dbi_open(&self, txn: TxnHandle, name: Option<&CStr>, flags: c_uint, dbi: &mut Dbi) -> c_int {
        let persistent = flags & PERSISTENT_DB_FLAGS;
        if persistent & !SUPPORTED_DB_FLAGS != 0 {
            return EINVAL;
        }

        let mut state = self.state.lock();
        let EnvState { txns, catalog, .. } = &mut *state;
        let Some(t) = txns.get_mut(&txn.0) else {
            return EINVAL;
        };

        let existing = catalog
            .iter()
            .find(|(_, meta)| meta.name.as_deref() == name)
            .map(|(&id, _)| id);

        if let Some(id) = existing {
            if t.view.snapshot().dbs.contains_key(&id) {
                let meta = &catalog[&id];
                if persistent != 0 && persistent != meta.flags {
                    return MDB_INCOMPATIBLE;
                }
                *dbi = Dbi(id);
                return MDB_SUCCESS;
            }
        }

        if flags & MDB_CREATE == 0 {
            return MDB_NOTFOUND;
        }
        let Some(snapshot) = t.view.snapshot_mut() else {
            return EACCES;
        };

        let id = match existing {
            Some(id) => id,
            None => {
                if catalog.len() - 1 >= self.config.max_dbs {
                    return MDB_DBS_FULL;
                }
                let id = catalog.keys().next_back().map_or(MAIN_DBI, |last| last + 1);
                catalog.insert(
                    id,
                    DbMeta {
                        name: name.map(CStr::to_owned),
                        flags: persistent,
                        cmp: None,
                        dcmp: None,
                    },
                );
                id
            }
        };
        if let Some(meta) = catalog.get_mut(&id) {
            meta.flags = persistent;
        }
        snapshot.dbs.insert(id, DbData::default());

        tracing::debug!(env_id = self.id, dbi = id, flags = persistent, "created database");
        *dbi = Dbi(id);
        MDB_SUCCESS
    }

    fn set_compare(&self, txn: TxnHandle, dbi: Dbi, cmp: Option<MdbCmpFunc>) -> c_int {
        let mut state = self.state.lock();
        if !state.txns.contains_key(&txn.0) {
            return EINVAL;
        }
        match state.catalog.get_mut(&dbi.0) {
            Some(meta) => {
                meta.cmp = cmp;
                MDB_SUCCESS
            }
            None => EINVAL,
        }
    }

    fn set_dupsort(&self, txn: TxnHandle, dbi: Dbi, cmp: Option<MdbCmpFunc>) -> c_int {
        let mut state = self.state.lock();
        if !state.txns.contains_key(&txn.0) {
            return EINVAL;
        }
        match state.catalog.get_mut(&dbi.0) {
            Some(meta) => {
                meta.dcmp = cmp;
                MDB_SUCCESS
            }
            None => EINVAL,
        }
    }

    unsafe fn get(&self, txn: TxnHandle, dbi: Dbi, key: *mut MdbVal, data: *mut MdbVal) -> c_int {
        if key.is_null() || data.is_null() {
            return EINVAL;
        }
        let key_bytes = bytes(key);
        if !valid_key(key_bytes) {
            return MDB_BAD_VALSIZE;
        }
        let state = self.state.lock();
        let (db, layout) = match state.read_db(txn, dbi) {
            Ok(found) => found,
            Err(rc) => return rc,
        };
        match db.find(&layout, key_bytes) {
            Ok(i) => {
                *data = MdbVal::from_slice(&db.entries[i].vals[0]);
                MDB_SUCCESS
            }
            Err(_) => MDB_NOTFOUND,
        }
    }

    unsafe fn put(
        &self,
        txn: TxnHandle,
        dbi: Dbi,
        key: *mut MdbVal,
        data: *mut MdbVal,
        flags: c_uint,
    ) -> c_int {
        if key.is_null() || data.is_null() {
            return EINVAL;
        }
        if flags & !PUT_FLAGS != 0 {
            return EINVAL;
        }
        let key_bytes = bytes(key);
        if !valid_key(key_bytes) {
            return MDB_BAD_VALSIZE;
        }
        let val_bytes = bytes(data);
        let limit = self.config.map_size;

        let mut state = self.state.lock();
        let (db, used, layout) = match state.write_db(txn, dbi) {
            Ok(found) => found,
            Err(rc) => return rc,
        };
        match db.insert(&layout, key_bytes, val_bytes, flags, used, limit) {
            Ok(_) => MDB_SUCCESS,
            Err(Refusal::KeyExist((i, j))) => {
                *data = MdbVal::from_slice(&db.entries[i].vals[j]);
                MDB_KEYEXIST
            }
            Err(Refusal::Status(rc)) => rc,
        }
    }

    unsafe fn del(&self, txn: TxnHandle, dbi: Dbi, key: *mut MdbVal, data: *mut MdbVal) -> c_int {
        if key.is_null() {
            return EINVAL;
        }
        let key_bytes = bytes(key);
        if !valid_key(key_bytes) {
            return MDB_BAD_VALSIZE;
        }
        let val = (!data.is_null()).then(|| bytes(data));

        let mut state = self.state.lock();
        let (db, used, layout) = match state.write_db(txn, dbi) {
            Ok(found) => found,
            Err(rc) => return rc,
        };
        db.remove(&layout, key_bytes, val, used)
    }

    fn cursor_open(&self, txn: TxnHandle, dbi: Dbi, cursor: &mut CursorHandle) -> c_int {
        let mut state = self.state.lock();
        if let Err(rc) = state.read_db(txn, dbi) {
            return rc;
        }
        let handle = state.allocate_handle();
        state.cursors.insert(handle, CursorState::new(txn.0, dbi.0));
        *cursor = CursorHandle(handle);
        MDB_SUCCESS
    }

    fn cursor_close(&self, cursor: CursorHandle) {
        self.state.lock().cursors.remove(&cursor.0);
    }

    unsafe fn cursor_get(
        &self,
        cursor: CursorHandle,
        key: *mut MdbVal,
        data: *mut MdbVal,
        op: MdbCursorOp,
    ) -> c_int {
        let mut state = self.state.lock();
        let EnvState {
            txns,
            catalog,
            cursors,
            ..
        } = &mut *state;
        let Some(cur) = cursors.get_mut(&cursor.0) else {
            return EINVAL;
        };
        let (Some(t), Some(meta)) = (txns.get(&cur.txn), catalog.get(&cur.dbi)) else {
            return EINVAL;
        };
        let Some(db) = t.view.snapshot().dbs.get(&cur.dbi) else {
            return MDB_BAD_DBI;
        };

        let fetch = cur.step(db, &meta.layout(), op, bytes(key), bytes(data));
        match fetch {
            Ok(Fetch::Item((i, j))) => {
                let entry = &db.entries[i];
                if let Some(key) = key.as_mut() {
                    *key = MdbVal::from_slice(&entry.key);
                }
                if let Some(data) = data.as_mut() {
                    *data = MdbVal::from_slice(&entry.vals[j]);
                }
                MDB_SUCCESS
            }
            Ok(Fetch::Page(i, range)) => {
                let entry = &db.entries[i];
                cur.page.clear();
                for val in &entry.vals[range] {
                    cur.page.extend_from_slice(val);
                }
                if let Some(key) = key.as_mut() {
                    *key = MdbVal::from_slice(&entry.key);
                }
                if let Some(data) = data.as_mut() {
                    *data = MdbVal::from_slice(&cur.page);
                }
                MDB_SUCCESS
            }
            Err(rc) => rc,
        }
    }

    unsafe fn cursor_put(
        &self,
        cursor: CursorHandle,
        key: *mut MdbVal,
        data: *mut MdbVal,
        flags: c_uint,
    ) -> c_int {
        if key.is_null() || data.is_null() {
            return EINVAL;
        }
        if flags & !(PUT_FLAGS | MDB_CURRENT | MDB_MULTIPLE) != 0 {
            return EINVAL;
        }
        let key_bytes = bytes(key);
        if !valid_key(key_bytes) {
            return MDB_BAD_VALSIZE;
        }
        let limit = self.config.map_size;

        let mut state = self.state.lock();
        let EnvState {
            txns,
            catalog,
            cursors,
            ..
        } = &mut *state;
        let Some(cur) = cursors.get_mut(&cursor.0) else {
            return EINVAL;
        };
        let (Some(t), Some(meta)) = (txns.get_mut(&cur.txn), catalog.get(&cur.dbi)) else {
            return EINVAL;
        };
        let Some(Snapshot { dbs, used, .. }) = t.view.snapshot_mut() else {
            return EACCES;
        };
        let Some(db) = dbs.get_mut(&cur.dbi) else {
            return MDB_BAD_DBI;
        };
        let layout = meta.layout();
        cur.deleted = false;

        if flags & MDB_MULTIPLE != 0 {
            if !layout.dupfixed() {
                return EINVAL;
            }
            let first = *data;
            let count = (*data.add(1)).mv_size;
            let stride = first.mv_size;
            if stride == 0 && count > 0 {
                return MDB_BAD_VALSIZE;
            }
            let base = first.mv_data as *const u8;
            let mut written = 0;
            let mut rc = MDB_SUCCESS;
            for k in 0..count {
                let record = std::slice::from_raw_parts(base.add(k * stride), stride);
                match db.insert(&layout, key_bytes, record, flags & PUT_FLAGS, used, limit) {
                    Ok(pos) => {
                        cur.pos = Some(pos);
                        written += 1;
                    }
                    Err(Refusal::KeyExist(_)) => {
                        rc = MDB_KEYEXIST;
                        break;
                    }
                    Err(Refusal::Status(status)) => {
                        rc = status;
                        break;
                    }
                }
            }
            (*data.add(1)).mv_size = written;
            return rc;
        }

        let val_bytes = bytes(data);
        let result = if flags & MDB_CURRENT != 0 {
            let Some(pos) = cur.current(db) else {
                return EINVAL;
            };
            if layout.key_order.compare(&db.entries[pos.0].key, key_bytes).is_ne() {
                return EINVAL;
            }
            db.replace_at(&layout, pos, val_bytes, used, limit)
        } else {
            db.insert(&layout, key_bytes, val_bytes, flags, used, limit)
        };
        match result {
            Ok(pos) => {
                cur.pos = Some(pos);
                MDB_SUCCESS
            }
            Err(Refusal::KeyExist(pos)) => {
                cur.pos = Some(pos);
                *data = MdbVal::from_slice(&db.entries[pos.0].vals[pos.1]);
                MDB_KEYEXIST
            }
            Err(Refusal::Status(rc)) => rc,
        }
    }

    fn cursor_del(&self, cursor: CursorHandle, flags: c_uint) -> c_int {
        let mut state = self.state.lock();
        let EnvState {
            txns,
            catalog,
            cursors,
            ..
        } = &mut *state;
        let Some(cur) = cursors.get_mut(&cursor.0) else {
            return EINVAL;
        };
        let (Some(t), Some(meta)) = (txns.get_mut(&cur.txn), catalog.get(&cur.dbi)) else {
            return EINVAL;
        };
        let Some(Snapshot { dbs, used, .. }) = t.view.snapshot_mut() else {
            return EACCES;
        };
        let Some(db) = dbs.get_mut(&cur.dbi) else {
            return MDB_BAD_DBI;
        };
        let Some(pos) = cur.current(db) else {
            return EINVAL;
        };
        let all = !meta.layout().dupsort() || flags & MDB_NODUPDATA != 0;
        cur.pos = Some(db.remove_at(pos, all, used));
        cur.deleted = true;
        MDB_SUCCESS
    }

    unsafe fn reader_list(&self, func: Option<MdbMsgFunc>, ctx: *mut c_void) -> c_int {
        let Some(func) = func else {
            return -1;
        };
        let readers = self.readers.lock();
        for line in readers.lines() {
            let rc = func(line.as_ptr(), ctx);
            if rc != 0 {
                return rc;
            }
        }
        MDB_SUCCESS
    }
}
