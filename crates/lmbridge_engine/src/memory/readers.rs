//! Reader lock table.

use std::ffi::CString;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_THREAD_TAG: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_TAG: u64 = NEXT_THREAD_TAG.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Clone, Copy)]
struct ReaderSlot {
    pid: u32,
    thread: u64,
    txnid: u64,
}

/// Fixed-capacity table of active read transactions.
#[derive(Debug)]
pub(crate) struct ReaderTable {
    slots: Vec<Option<ReaderSlot>>,
}

impl ReaderTable {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
        }
    }

    /// Claims the lowest free slot for a reader of snapshot `txnid`.
    pub(crate) fn acquire(&mut self, txnid: u64) -> Option<usize> {
        let index = self.slots.iter().position(Option::is_none)?;
        self.slots[index] = Some(ReaderSlot {
            pid: std::process::id(),
            thread: THREAD_TAG.with(|tag| *tag),
            txnid,
        });
        Some(index)
    }

    pub(crate) fn release(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = None;
        }
    }

    pub(crate) fn active(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// One formatted line per occupied slot, in slot order.
    pub(crate) fn lines(&self) -> impl Iterator<Item = CString> + '_ {
        self.slots.iter().flatten().map(|slot| {
            let line = format!("{:>10} {:x} {}\n", slot.pid, slot.thread, slot.txnid);
            CString::new(line).unwrap_or_default()
        })
    }
}
