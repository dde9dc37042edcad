//! Cursor positioning.

use super::tree::{DbData, Layout, Position};
use crate::sys::*;
use std::ffi::c_int;
use std::ops::Range;

/// What a positioning operation yields.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Fetch {
    /// A single key/data item.
    Item(Position),
    /// A run of fixed-size duplicates of one key.
    Page(usize, Range<usize>),
}

#[derive(Debug)]
pub(crate) struct CursorState {
    pub txn: u64,
    pub dbi: u32,
    /// The current item. May point one past the end after a delete.
    pub pos: Option<Position>,
    /// Set by a delete; the next `MDB_NEXT` yields `pos` itself.
    pub deleted: bool,
    /// Scratch buffer backing `MDB_GET_MULTIPLE` results.
    pub page: Vec<u8>,
}

impl CursorState {
    pub(crate) fn new(txn: u64, dbi: u32) -> Self {
        Self {
            txn,
            dbi,
            pos: None,
            deleted: false,
            page: Vec::new(),
        }
    }

    pub(crate) fn current(&self, db: &DbData) -> Option<Position> {
        self.pos.filter(|&pos| db.is_valid(pos))
    }

    /// Applies `op`, moving the cursor and reporting what it now points at.
    pub(crate) fn step(
        &mut self,
        db: &DbData,
        layout: &Layout,
        op: MdbCursorOp,
        key: &[u8],
        data: &[u8],
    ) -> Result<Fetch, c_int> {
        let deleted = std::mem::take(&mut self.deleted);
        let fetch = self.locate(db, layout, op, key, data, deleted)?;
        match &fetch {
            Fetch::Item(pos) => self.pos = Some(*pos),
            Fetch::Page(i, range) => self.pos = Some((*i, range.end - 1)),
        }
        Ok(fetch)
    }

    fn positioned(&self, db: &DbData) -> Result<Position, c_int> {
        if self.pos.is_none() {
            return Err(EINVAL);
        }
        self.current(db).ok_or(MDB_NOTFOUND)
    }

    fn locate(
        &self,
        db: &DbData,
        layout: &Layout,
        op: MdbCursorOp,
        key: &[u8],
        data: &[u8],
        deleted: bool,
    ) -> Result<Fetch, c_int> {
        let n = db.entries.len();
        let item = |pos: Position| Ok(Fetch::Item(pos));
        match op {
            MDB_FIRST => first(db).map(Fetch::Item),
            MDB_LAST => last(db).map(Fetch::Item),
            MDB_NEXT => match self.pos {
                None => first(db).map(Fetch::Item),
                Some(pos) if deleted => {
                    if db.is_valid(pos) {
                        item(pos)
                    } else {
                        Err(MDB_NOTFOUND)
                    }
                }
                Some(_) => {
                    let (i, j) = self.current(db).ok_or(MDB_NOTFOUND)?;
                    if j < db.last_dup(i) {
                        item((i, j + 1))
                    } else if i + 1 < n {
                        item((i + 1, 0))
                    } else {
                        Err(MDB_NOTFOUND)
                    }
                }
            },
            MDB_PREV => match self.pos {
                None => last(db).map(Fetch::Item),
                Some((i, j)) => {
                    if i < n && j > 0 {
                        item((i, j - 1))
                    } else if i > 0 && i <= n {
                        item((i - 1, db.last_dup(i - 1)))
                    } else {
                        Err(MDB_NOTFOUND)
                    }
                }
            },
            MDB_NEXT_NODUP => match self.pos {
                None => first(db).map(Fetch::Item),
                Some((i, 0)) if deleted && db.is_valid((i, 0)) => item((i, 0)),
                Some((i, _)) if i + 1 < n => item((i + 1, 0)),
                Some(_) => Err(MDB_NOTFOUND),
            },
            MDB_PREV_NODUP => match self.pos {
                None => last(db).map(Fetch::Item),
                Some((i, _)) if i > 0 && i <= n => item((i - 1, db.last_dup(i - 1))),
                Some(_) => Err(MDB_NOTFOUND),
            },
            MDB_GET_CURRENT => self.positioned(db).map(Fetch::Item),
            MDB_FIRST_DUP | MDB_LAST_DUP => {
                if !layout.dupsort() {
                    return Err(MDB_INCOMPATIBLE);
                }
                let (i, _) = self.positioned(db)?;
                if op == MDB_FIRST_DUP {
                    item((i, 0))
                } else {
                    item((i, db.last_dup(i)))
                }
            }
            MDB_NEXT_DUP | MDB_PREV_DUP => {
                let (i, j) = self.positioned(db)?;
                if !layout.dupsort() {
                    return Err(MDB_NOTFOUND);
                }
                if op == MDB_NEXT_DUP && j < db.last_dup(i) {
                    item((i, j + 1))
                } else if op == MDB_PREV_DUP && j > 0 {
                    item((i, j - 1))
                } else {
                    Err(MDB_NOTFOUND)
                }
            }
            MDB_SET | MDB_SET_KEY => {
                check_key(key)?;
                match db.find(layout, key) {
                    Ok(i) => item((i, 0)),
                    Err(_) => Err(MDB_NOTFOUND),
                }
            }
            MDB_SET_RANGE => {
                check_key(key)?;
                let i = db.find(layout, key).unwrap_or_else(|i| i);
                if i < n {
                    item((i, 0))
                } else {
                    Err(MDB_NOTFOUND)
                }
            }
            MDB_GET_BOTH | MDB_GET_BOTH_RANGE => {
                check_key(key)?;
                if !layout.dupsort() {
                    return Err(MDB_INCOMPATIBLE);
                }
                let Ok(i) = db.find(layout, key) else {
                    return Err(MDB_NOTFOUND);
                };
                match db.find_dup(layout, i, data) {
                    Ok(j) => item((i, j)),
                    Err(j) if op == MDB_GET_BOTH_RANGE && j < db.entries[i].vals.len() => {
                        item((i, j))
                    }
                    Err(_) => Err(MDB_NOTFOUND),
                }
            }
            MDB_GET_MULTIPLE => {
                if !layout.dupfixed() {
                    return Err(MDB_INCOMPATIBLE);
                }
                let (i, j) = self.positioned(db)?;
                Ok(Fetch::Page(i, j..db.entries[i].vals.len()))
            }
            MDB_NEXT_MULTIPLE => {
                if !layout.dupfixed() {
                    return Err(MDB_INCOMPATIBLE);
                }
                let (i, start) = match self.current(db) {
                    None if self.pos.is_none() => (first(db)?.0, 0),
                    None => return Err(MDB_NOTFOUND),
                    Some((i, j)) if j < db.last_dup(i) => (i, j + 1),
                    Some((i, _)) if i + 1 < n => (i + 1, 0),
                    Some(_) => return Err(MDB_NOTFOUND),
                };
                Ok(Fetch::Page(i, start..db.entries[i].vals.len()))
            }
            MDB_PREV_MULTIPLE => {
                if !layout.dupfixed() {
                    return Err(MDB_INCOMPATIBLE);
                }
                let (i, j) = self.positioned(db)?;
                if j > 0 {
                    Ok(Fetch::Page(i, 0..j))
                } else if i > 0 {
                    Ok(Fetch::Page(i - 1, 0..db.entries[i - 1].vals.len()))
                } else {
                    Err(MDB_NOTFOUND)
                }
            }
            _ => Err(EINVAL),
        }
    }
}

fn first(db: &DbData) -> Result<Position, c_int> {
    if db.entries.is_empty() {
        Err(MDB_NOTFOUND)
    } else {
        Ok((0, 0))
    }
}

fn last(db: &DbData) -> Result<Position, c_int> {
    match db.entries.len() {
        0 => Err(MDB_NOTFOUND),
        n => Ok((n - 1, db.last_dup(n - 1))),
    }
}

fn check_key(key: &[u8]) -> Result<(), c_int> {
    if key.is_empty() || key.len() > MAX_KEY_SIZE {
        Err(MDB_BAD_VALSIZE)
    } else {
        Ok(())
    }
}
