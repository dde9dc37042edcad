//! # lmbridge FFI
//!
//! Native-call bridging layer for an LMDB-style key-value engine.
//!
//! This crate provides:
//! - Zero-copy buffer descriptors ([`Val`], [`MultiVal`], [`MessageLine`])
//! - Managed comparators behind the engine's bare function-pointer slot,
//!   in three dispatch modes ([`DispatchMode`])
//! - Reader-lock listing relayed to a Rust handler ([`reader_list`])
//! - Slice-level read/write wrappers ([`marshal`]) over a raw
//!   pointer+length shim ([`raw`])
//! - A C ABI for registering foreign comparators
//!
//! ## Error Handling
//!
//! Engine status codes are carried verbatim in [`BridgeError::Engine`].
//! Exported C functions return [`LmBridgeResult`] and leave a message for
//! [`error::lmbridge_get_last_error`].
//!
//! ## Callback Faults
//!
//! Callbacks run inside native frames that cannot unwind. Panics are caught
//! and handled per [`FaultPolicy`]; see [`compare`].

mod buffer;
pub mod capi;
pub mod compare;
mod config;
pub mod error;
mod fault;
pub mod marshal;
mod ops;
pub mod raw;
mod relay;

pub use buffer::{bytes_of, MessageLine, MultiVal, Val};
pub use compare::{
    baseline_compare, install_comparator, install_dup_comparator, lmbridge_cmp_baseline,
    lmbridge_cmp_single, register_database_comparator, register_dup_comparator, Comparator,
    ComparatorRegistry, ContextId, ContextRegistration, DispatchMode, MAX_CONTEXTS,
};
pub use config::{BridgeConfig, FaultPolicy};
pub use error::{BridgeError, BridgeResult, EngineStatus, ErrorCategory, LmBridgeResult};
pub use fault::{clear_pending, take_pending, CallbackFault, FaultKind};
pub use marshal::{
    cursor_del, cursor_get, cursor_put, cursor_put_multi, del, get, put, put_val,
};
pub use ops::CursorOp;
pub use relay::{collect_reader_lines, reader_list, reader_list_fallible, RelayError, RelaySummary};
