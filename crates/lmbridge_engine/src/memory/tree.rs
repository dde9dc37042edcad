//! Sorted key/data storage for one database.

use crate::sys::*;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ffi::{c_int, c_uint};

/// A sort order: a registered comparison function or byte order.
#[derive(Clone, Copy, Default)]
pub(crate) struct Order {
    cmp: Option<MdbCmpFunc>,
}

impl Order {
    pub(crate) const fn new(cmp: Option<MdbCmpFunc>) -> Self {
        Self { cmp }
    }

    pub(crate) fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        match self.cmp {
            None => a.cmp(b),
            Some(func) => {
                let a = MdbVal::from_slice(a);
                let b = MdbVal::from_slice(b);
                // SAFETY: both descriptors describe live slices for the
                // duration of the call.
                unsafe { func(&a, &b) }.cmp(&0)
            }
        }
    }
}

/// Ordering and layout rules of one database.
#[derive(Clone, Copy)]
pub(crate) struct Layout {
    pub key_order: Order,
    pub dup_order: Order,
    pub flags: c_uint,
}

impl Layout {
    pub(crate) const fn dupsort(&self) -> bool {
        self.flags & MDB_DUPSORT != 0
    }

    pub(crate) const fn dupfixed(&self) -> bool {
        self.dupsort() && self.flags & MDB_DUPFIXED != 0
    }
}

/// Index of a key and of one of its data items.
pub(crate) type Position = (usize, usize);

/// Why a write was refused.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Refusal {
    /// The pair (or key) exists; the position of the existing item.
    KeyExist(Position),
    /// Any other status code.
    Status(c_int),
}

#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub key: Vec<u8>,
    pub vals: Vec<Vec<u8>>,
}

impl Entry {
    fn size(&self) -> usize {
        self.key.len() + self.vals.iter().map(Vec::len).sum::<usize>()
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct DbData {
    pub entries: Vec<Entry>,
}

/// An immutable view of every database, as of one transaction id.
#[derive(Debug, Clone)]
pub(crate) struct Snapshot {
    pub txnid: u64,
    pub dbs: BTreeMap<u32, DbData>,
    /// Bytes of key and data held across all databases.
    pub used: usize,
}

/// Accounts for `add` new bytes replacing `sub` old ones.
fn charge(used: &mut usize, limit: usize, add: usize, sub: usize) -> Result<(), Refusal> {
    let next = *used - sub + add;
    if next > limit {
        return Err(Refusal::Status(MDB_MAP_FULL));
    }
    *used = next;
    Ok(())
}

impl DbData {
    pub(crate) fn find(&self, layout: &Layout, key: &[u8]) -> Result<usize, usize> {
        self.entries
            .binary_search_by(|e| layout.key_order.compare(&e.key, key))
    }

    pub(crate) fn find_dup(&self, layout: &Layout, i: usize, val: &[u8]) -> Result<usize, usize> {
        self.entries[i]
            .vals
            .binary_search_by(|v| layout.dup_order.compare(v, val))
    }

    pub(crate) fn is_valid(&self, (i, j): Position) -> bool {
        i < self.entries.len() && j < self.entries[i].vals.len()
    }

    pub(crate) fn last_dup(&self, i: usize) -> usize {
        self.entries[i].vals.len() - 1
    }

    /// Stores `val` under `key` following the `mdb_put` flag rules.
    pub(crate) fn insert(
        &mut self,
        layout: &Layout,
        key: &[u8],
        val: &[u8],
        flags: c_uint,
        used: &mut usize,
        limit: usize,
    ) -> Result<Position, Refusal> {
        let i = match self.find(layout, key) {
            Ok(i) => i,
            Err(i) => {
                if flags & MDB_APPEND != 0 && i != self.entries.len() {
                    return Err(Refusal::Status(MDB_KEYEXIST));
                }
                charge(used, limit, key.len() + val.len(), 0)?;
                self.entries.insert(
                    i,
                    Entry {
                        key: key.to_vec(),
                        vals: vec![val.to_vec()],
                    },
                );
                return Ok((i, 0));
            }
        };

        if flags & MDB_NOOVERWRITE != 0 {
            return Err(Refusal::KeyExist((i, 0)));
        }
        if flags & MDB_APPEND != 0 && (!layout.dupsort() || i + 1 != self.entries.len()) {
            return Err(Refusal::Status(MDB_KEYEXIST));
        }

        if !layout.dupsort() {
            let old = self.entries[i].vals[0].len();
            charge(used, limit, val.len(), old)?;
            self.entries[i].vals[0] = val.to_vec();
            return Ok((i, 0));
        }

        if layout.dupfixed() && self.entries[i].vals[0].len() != val.len() {
            return Err(Refusal::Status(MDB_BAD_VALSIZE));
        }
        match self.find_dup(layout, i, val) {
            Ok(j) if flags & MDB_NODUPDATA != 0 => Err(Refusal::KeyExist((i, j))),
            Ok(j) => Ok((i, j)),
            Err(j) => {
                let count = self.entries[i].vals.len();
                if flags & MDB_APPENDDUP != 0 && j != count {
                    return Err(Refusal::KeyExist((i, count - 1)));
                }
                charge(used, limit, val.len(), 0)?;
                self.entries[i].vals.insert(j, val.to_vec());
                Ok((i, j))
            }
        }
    }

    /// Replaces the item at `pos` with `val` (`MDB_CURRENT`).
    pub(crate) fn replace_at(
        &mut self,
        layout: &Layout,
        (i, j): Position,
        val: &[u8],
        used: &mut usize,
        limit: usize,
    ) -> Result<Position, Refusal> {
        let old = self.entries[i].vals[j].len();
        if !layout.dupsort() {
            charge(used, limit, val.len(), old)?;
            self.entries[i].vals[0] = val.to_vec();
            return Ok((i, 0));
        }
        if layout.dupfixed() && old != val.len() {
            return Err(Refusal::Status(MDB_BAD_VALSIZE));
        }
        charge(used, limit, val.len(), old)?;
        let val = val.to_vec();
        self.entries[i].vals.remove(j);
        match self.find_dup(layout, i, &val) {
            Ok(k) => {
                // an equal item already exists; the replaced one is gone
                *used -= val.len();
                Ok((i, k))
            }
            Err(k) => {
                self.entries[i].vals.insert(k, val);
                Ok((i, k))
            }
        }
    }

    /// Deletes `key`, or only the `val` duplicate of it (`mdb_del`).
    pub(crate) fn remove(
        &mut self,
        layout: &Layout,
        key: &[u8],
        val: Option<&[u8]>,
        used: &mut usize,
    ) -> c_int {
        let Ok(i) = self.find(layout, key) else {
            return MDB_NOTFOUND;
        };
        match val {
            Some(val) if layout.dupsort() => {
                let Ok(j) = self.find_dup(layout, i, val) else {
                    return MDB_NOTFOUND;
                };
                self.remove_at((i, j), false, used);
            }
            _ => {
                self.remove_at((i, 0), true, used);
            }
        }
        MDB_SUCCESS
    }

    /// Deletes the item at `pos`, or every item of its key when `all`.
    ///
    /// Returns the position of the item that followed the deleted one.
    pub(crate) fn remove_at(&mut self, (i, j): Position, all: bool, used: &mut usize) -> Position {
        if all || self.entries[i].vals.len() == 1 {
            let entry = self.entries.remove(i);
            *used -= entry.size();
            return (i, 0);
        }
        let removed = self.entries[i].vals.remove(j);
        *used -= removed.len();
        if j == self.entries[i].vals.len() {
            (i + 1, 0)
        } else {
            (i, j)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> Layout {
        Layout {
            key_order: Order::default(),
            dup_order: Order::default(),
            flags: 0,
        }
    }

    fn dupfixed() -> Layout {
        Layout {
            flags: MDB_DUPSORT | MDB_DUPFIXED,
            ..plain()
        }
    }

    #[test]
    fn insert_keeps_keys_sorted() {
        let mut db = DbData::default();
        let mut used = 0;
        for key in [b"b", b"c", b"a"] {
            db.insert(&plain(), key, b"v", 0, &mut used, usize::MAX).unwrap();
        }
        let keys: Vec<_> = db.entries.iter().map(|e| e.key.clone()).collect();
        assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
        assert_eq!(used, 6);
    }

    #[test]
    fn replace_updates_accounting() {
        let mut db = DbData::default();
        let mut used = 0;
        db.insert(&plain(), b"k", b"short", 0, &mut used, usize::MAX).unwrap();
        db.insert(&plain(), b"k", b"much longer", 0, &mut used, usize::MAX).unwrap();
        assert_eq!(used, 1 + 11);
        assert_eq!(db.entries.len(), 1);
    }

    #[test]
    fn nooverwrite_reports_existing() {
        let mut db = DbData::default();
        let mut used = 0;
        db.insert(&plain(), b"k", b"1", 0, &mut used, usize::MAX).unwrap();
        let refusal = db
            .insert(&plain(), b"k", b"2", MDB_NOOVERWRITE, &mut used, usize::MAX)
            .unwrap_err();
        assert_eq!(refusal, Refusal::KeyExist((0, 0)));
        assert_eq!(db.entries[0].vals[0], b"1");
    }

    #[test]
    fn dupfixed_rejects_other_sizes() {
        let mut db = DbData::default();
        let mut used = 0;
        db.insert(&dupfixed(), b"k", b"aa", 0, &mut used, usize::MAX).unwrap();
        let refusal = db
            .insert(&dupfixed(), b"k", b"bbb", 0, &mut used, usize::MAX)
            .unwrap_err();
        assert_eq!(refusal, Refusal::Status(MDB_BAD_VALSIZE));
    }

    #[test]
    fn map_full_leaves_data_untouched() {
        let mut db = DbData::default();
        let mut used = 0;
        db.insert(&plain(), b"k", b"1234", 0, &mut used, 8).unwrap();
        let refusal = db
            .insert(&plain(), b"j", b"1234", 0, &mut used, 8)
            .unwrap_err();
        assert_eq!(refusal, Refusal::Status(MDB_MAP_FULL));
        assert_eq!(db.entries.len(), 1);
        assert_eq!(used, 5);
    }

    #[test]
    fn remove_at_returns_following_position() {
        let mut db = DbData::default();
        let mut used = 0;
        for val in [b"a", b"b", b"c"] {
            db.insert(&dupfixed(), b"k", val, 0, &mut used, usize::MAX).unwrap();
        }
        db.insert(&dupfixed(), b"m", b"z", 0, &mut used, usize::MAX).unwrap();

        assert_eq!(db.remove_at((0, 1), false, &mut used), (0, 1));
        assert_eq!(db.entries[0].vals, vec![b"a".to_vec(), b"c".to_vec()]);
        assert_eq!(db.remove_at((0, 1), false, &mut used), (1, 0));
        assert_eq!(db.remove_at((0, 0), true, &mut used), (0, 0));
        assert_eq!(db.entries.len(), 1);
        assert_eq!(used, 2);
    }
}
