//! Error types for bridge operations.

use crate::compare::ContextId;
use crate::fault::CallbackFault;
use lmbridge_engine::{status_name, strerror, sys};
use std::cell::RefCell;
use std::ffi::{c_int, CString};
use thiserror::Error;

/// A status code returned by the engine, carried verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineStatus(pub c_int);

impl EngineStatus {
    /// The raw code.
    pub const fn code(self) -> c_int {
        self.0
    }

    /// Symbolic name such as `MDB_NOTFOUND`, if the code is known.
    pub fn name(self) -> Option<&'static str> {
        status_name(self.0)
    }

    /// Engine description of the code (`mdb_strerror`).
    pub fn describe(self) -> &'static str {
        strerror(self.0)
    }
}

impl std::fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}): {}",
            self.name().unwrap_or("UNKNOWN"),
            self.0,
            self.describe()
        )
    }
}

/// Broad classes of [`BridgeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The engine reported a non-zero status.
    Engine,
    /// The bridge refused the call before reaching the engine.
    Validation,
    /// A callback or a caller broke the bridge's contract.
    ContractViolation,
}

/// Errors that can occur during bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The engine returned a non-zero status code.
    #[error("{op}: {status}")]
    Engine {
        /// Name of the native operation.
        op: &'static str,
        /// The code, unchanged.
        status: EngineStatus,
    },

    /// A multi-value page length is not a whole number of records.
    #[error("page of {len} bytes is not a multiple of stride {stride}")]
    IncongruentMulti {
        /// Page length in bytes.
        len: usize,
        /// Requested record size.
        stride: usize,
    },

    /// No comparator is registered under the context id.
    #[error("no comparator registered for context {0}")]
    UnregisteredContext(ContextId),

    /// A comparator is already registered under the context id.
    #[error("context {0} already has a comparator")]
    ContextAlreadyRegistered(ContextId),

    /// Every context trampoline slot is in use.
    #[error("all {0} context comparator slots are in use")]
    ContextSlotsExhausted(usize),

    /// A released context slot is still installed on some databases.
    #[error("context {id} is still installed on {databases} database(s)")]
    ContextStillInstalled {
        /// The context last bound to the slot.
        id: ContextId,
        /// Databases whose comparator still points at the slot.
        databases: usize,
    },

    /// Single dispatch was selected but nothing is registered.
    #[error("no single-dispatch comparator registered")]
    NoSingleComparator,

    /// A single-dispatch comparator is already registered.
    #[error("a single-dispatch comparator is already registered")]
    SingleAlreadyRegistered,

    /// A required pointer argument was null.
    #[error("null pointer argument")]
    NullPointer,

    /// A managed callback faulted while the engine was running.
    #[error("callback fault: {0}")]
    CallbackFault(CallbackFault),
}

impl BridgeError {
    /// Wraps a non-zero engine status.
    pub(crate) fn engine(op: &'static str, code: c_int) -> Self {
        Self::Engine {
            op,
            status: EngineStatus(code),
        }
    }

    /// The class this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Engine { .. } => ErrorCategory::Engine,
            Self::IncongruentMulti { .. }
            | Self::UnregisteredContext(_)
            | Self::ContextAlreadyRegistered(_)
            | Self::ContextSlotsExhausted(_)
            | Self::ContextStillInstalled { .. }
            | Self::NoSingleComparator
            | Self::SingleAlreadyRegistered => ErrorCategory::Validation,
            Self::NullPointer | Self::CallbackFault(_) => ErrorCategory::ContractViolation,
        }
    }

    /// The engine status code, for engine errors.
    pub fn status(&self) -> Option<c_int> {
        match self {
            Self::Engine { status, .. } => Some(status.0),
            _ => None,
        }
    }

    /// True for `MDB_NOTFOUND`.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(sys::MDB_NOTFOUND)
    }

    /// True for `MDB_KEYEXIST`.
    pub fn is_key_exist(&self) -> bool {
        self.status() == Some(sys::MDB_KEYEXIST)
    }

    /// True for `MDB_MAP_FULL`.
    pub fn is_map_full(&self) -> bool {
        self.status() == Some(sys::MDB_MAP_FULL)
    }
}

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Result code for exported C functions.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LmBridgeResult {
    /// Operation succeeded.
    Ok = 0,
    /// Generic error.
    Error = 1,
    /// Invalid argument.
    InvalidArgument = 2,
    /// Null pointer.
    NullPointer = 3,
    /// Context id already registered.
    AlreadyRegistered = 4,
    /// Context id not registered.
    NotRegistered = 5,
    /// No free comparator slot.
    Exhausted = 6,
    /// A released comparator slot is still installed.
    InUse = 7,
}

impl LmBridgeResult {
    /// Returns true if the result indicates success.
    pub fn is_ok(self) -> bool {
        self == LmBridgeResult::Ok
    }

    /// Returns true if the result indicates an error.
    pub fn is_err(self) -> bool {
        self != LmBridgeResult::Ok
    }
}

impl From<&BridgeError> for LmBridgeResult {
    fn from(err: &BridgeError) -> Self {
        match err {
            BridgeError::NullPointer => Self::NullPointer,
            BridgeError::ContextAlreadyRegistered(_) | BridgeError::SingleAlreadyRegistered => {
                Self::AlreadyRegistered
            }
            BridgeError::UnregisteredContext(_) | BridgeError::NoSingleComparator => {
                Self::NotRegistered
            }
            BridgeError::ContextSlotsExhausted(_) => Self::Exhausted,
            BridgeError::ContextStillInstalled { .. } => Self::InUse,
            BridgeError::IncongruentMulti { .. } => Self::InvalidArgument,
            BridgeError::Engine { .. } | BridgeError::CallbackFault(_) => Self::Error,
        }
    }
}

// Thread-local storage for last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Sets the last error message.
pub fn set_last_error(message: impl Into<String>) {
    let msg = message.into();
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clears the last error.
pub fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Records `err` as the last error and returns its result code.
pub(crate) fn report(err: &BridgeError) -> LmBridgeResult {
    set_last_error(err.to_string());
    err.into()
}

/// Gets the last error message as a C string.
///
/// Returns null if no error is set.
///
/// # Safety
///
/// The returned pointer is valid until the next FFI call on this thread.
#[no_mangle]
pub extern "C" fn lmbridge_get_last_error() -> *const std::ffi::c_char {
    LAST_ERROR.with(|e| match e.borrow().as_ref() {
        Some(cstr) => cstr.as_ptr(),
        None => std::ptr::null(),
    })
}

/// Clears the last error message.
#[no_mangle]
pub extern "C" fn lmbridge_clear_error() {
    clear_last_error();
}
