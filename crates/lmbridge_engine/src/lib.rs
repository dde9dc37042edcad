//! # lmbridge engine seam
//!
//! C-ABI types and constants of an LMDB-compatible native store, the
//! [`Engine`] trait that the bridge calls through, and [`MemoryEngine`], an
//! in-process engine that honors the same callback contracts.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  lmbridge_ffi (marshaler, comparators)  │
//! ├─────────────────────────────────────────┤
//! │  Engine trait (mdb_* calling convention)│
//! ├─────────────────────────────────────────┤
//! │  MemoryEngine | native engine           │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Everything crossing the seam is an [`MdbVal`] descriptor, a function
//! pointer or a signed status code.

mod config;
mod engine;
mod memory;
mod status;
pub mod sys;

pub use config::{ConfigError, MemoryEngineConfig};
pub use engine::Engine;
pub use memory::MemoryEngine;
pub use status::{is_engine_code, status_name, strerror};
pub use sys::{CursorHandle, Dbi, MdbCmpFunc, MdbCursorOp, MdbMsgFunc, MdbVal, TxnHandle};
