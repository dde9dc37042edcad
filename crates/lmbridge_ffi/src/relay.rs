//! Message relay bridge.
//!
//! Drives the engine's reader-lock listing through a native proxy that
//! hands each line to a Rust handler. A non-zero handler return stops the
//! listing and becomes the overall status.

use crate::buffer::MessageLine;
use crate::compare::ComparatorRegistry;
use crate::error::{BridgeError, BridgeResult};
use crate::fault::{self, CallbackFault, FaultKind};
use lmbridge_engine::Engine;
use std::ffi::{c_char, c_int, c_void, CStr};
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

/// Outcome of one reader listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelaySummary {
    /// The handler's halting value if it stopped the listing, otherwise the
    /// listing primitive's terminal code.
    pub status: c_int,
    /// Number of lines delivered to the handler.
    pub lines: usize,
    /// True if the handler stopped the listing early.
    pub stopped: bool,
}

/// Errors from [`reader_list_fallible`].
#[derive(Debug, Error)]
pub enum RelayError {
    /// The listing itself failed.
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// The handler returned an error; the listing was stopped.
    #[error("reader line handler failed: {0}")]
    Handler(Box<dyn std::error::Error + Send + Sync>),
}

struct RelayState<'h> {
    handler: &'h mut dyn FnMut(&MessageLine<'_>) -> c_int,
    lines: usize,
    stopped_with: Option<c_int>,
    fault: Option<CallbackFault>,
    trace: bool,
}

/// Native proxy passed to `mdb_reader_list`.
///
/// # Safety
///
/// `ctx` must point at the `RelayState` of the listing in progress and
/// `msg` must be a null-terminated string.
unsafe extern "C" fn lmbridge_msg_proxy(msg: *const c_char, ctx: *mut c_void) -> c_int {
    let Some(state) = ctx.cast::<RelayState<'_>>().as_mut() else {
        return -1;
    };
    if msg.is_null() {
        return 0;
    }
    let line = MessageLine::new(CStr::from_ptr(msg));
    state.lines += 1;
    if state.trace {
        tracing::trace!(line = %line.trimmed(), "relayed reader line");
    }

    let handler: &mut dyn FnMut(&MessageLine<'_>) -> c_int = &mut *state.handler;
    match panic::catch_unwind(AssertUnwindSafe(|| handler(&line))) {
        Ok(0) => 0,
        Ok(code) => {
            state.stopped_with = Some(code);
            code
        }
        Err(payload) => {
            state.fault = Some(CallbackFault::from_panic(FaultKind::RelayPanic, payload.as_ref()));
            -1
        }
    }
}

/// Lists the engine's active readers, one handler call per line.
///
/// Lines are delivered in reader-slot order. A non-zero handler return
/// stops the listing; that value is the summary's status. If every call
/// returns zero the status is the engine's terminal code, and a non-zero
/// terminal code is returned as [`BridgeError::Engine`].
pub fn reader_list<E, F>(engine: &E, mut handler: F) -> BridgeResult<RelaySummary>
where
    E: Engine + ?Sized,
    F: FnMut(&MessageLine<'_>) -> c_int,
{
    let config = ComparatorRegistry::global().config();
    let mut state = RelayState {
        handler: &mut handler,
        lines: 0,
        stopped_with: None,
        fault: None,
        trace: config.trace_relay_lines,
    };

    tracing::debug!(env_id = engine.env_id(), "listing readers");
    // SAFETY: the proxy receives a pointer to `state`, which outlives the
    // call; the engine does not retain it.
    let rc = unsafe {
        engine.reader_list(
            Some(lmbridge_msg_proxy),
            std::ptr::addr_of_mut!(state).cast::<c_void>(),
        )
    };

    if let Some(fault) = state.fault.take() {
        fault::report(&fault, config.fault_policy);
        return Err(BridgeError::CallbackFault(fault));
    }
    let summary = match state.stopped_with {
        Some(code) => RelaySummary {
            status: code,
            lines: state.lines,
            stopped: true,
        },
        None if rc != 0 => return Err(BridgeError::engine("mdb_reader_list", rc)),
        None => RelaySummary {
            status: rc,
            lines: state.lines,
            stopped: false,
        },
    };

    tracing::debug!(lines = summary.lines, stopped = summary.stopped, "listed readers");
    Ok(summary)
}

/// Lists readers with a fallible handler.
///
/// The first handler error stops the listing and is returned. Otherwise
/// returns the number of lines handled.
pub fn reader_list_fallible<E, F, HandlerErr>(engine: &E, mut handler: F) -> Result<usize, RelayError>
where
    E: Engine + ?Sized,
    F: FnMut(&str) -> Result<(), HandlerErr>,
    HandlerErr: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let mut failure: Option<Box<dyn std::error::Error + Send + Sync>> = None;
    let summary = reader_list(engine, |line| match handler(&*line.to_string_lossy()) {
        Ok(()) => 0,
        Err(err) => {
            failure = Some(err.into());
            -1
        }
    })?;
    match failure {
        Some(err) => Err(RelayError::Handler(err)),
        None => Ok(summary.lines),
    }
}

/// Collects every reader line, without trailing newlines.
pub fn collect_reader_lines<E: Engine + ?Sized>(engine: &E) -> BridgeResult<Vec<String>> {
    let mut lines = Vec::new();
    reader_list(engine, |line| {
        lines.push(line.trimmed().into_owned());
        0
    })?;
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lmbridge_engine::sys::{MDB_RDONLY, MDB_SUCCESS};
    use lmbridge_engine::{MemoryEngine, TxnHandle};

    fn begin_readers(env: &MemoryEngine, n: usize) -> Vec<TxnHandle> {
        (0..n)
            .map(|_| {
                let mut txn = TxnHandle::default();
                assert_eq!(env.txn_begin(None, MDB_RDONLY, &mut txn), MDB_SUCCESS);
                txn
            })
            .collect()
    }

    #[test]
    fn empty_table_calls_nothing() {
        let env = MemoryEngine::new();
        let mut calls = 0;
        let summary = reader_list(&env, |_| {
            calls += 1;
            0
        })
        .unwrap();
        assert_eq!(calls, 0);
        assert_eq!(
            summary,
            RelaySummary {
                status: 0,
                lines: 0,
                stopped: false
            }
        );
    }

    #[test]
    fn one_call_per_reader() {
        let env = MemoryEngine::new();
        let readers = begin_readers(&env, 3);
        let summary = reader_list(&env, |_| 0).unwrap();
        assert_eq!(summary.lines, 3);
        assert!(!summary.stopped);
        for txn in readers {
            env.txn_abort(txn);
        }
    }

    #[test]
    fn early_stop_propagates_value() {
        let env = MemoryEngine::new();
        let _readers = begin_readers(&env, 4);
        let mut calls = 0;
        let summary = reader_list(&env, |_| {
            calls += 1;
            if calls == 2 {
                42
            } else {
                0
            }
        })
        .unwrap();
        assert_eq!(calls, 2);
        assert_eq!(summary.status, 42);
        assert!(summary.stopped);
    }

    #[test]
    fn fallible_handler_error_is_returned() {
        let env = MemoryEngine::new();
        let _readers = begin_readers(&env, 2);
        let mut seen = 0;
        let err = reader_list_fallible(&env, |_| {
            seen += 1;
            Err("stop here")
        })
        .unwrap_err();
        assert_eq!(seen, 1);
        assert!(matches!(err, RelayError::Handler(e) if e.to_string() == "stop here"));
    }

    #[test]
    fn collected_lines_are_trimmed() {
        let env = MemoryEngine::new();
        let _readers = begin_readers(&env, 2);
        let lines = collect_reader_lines(&env).unwrap();
        assert_eq!(lines.len(), 2);
        let pid = std::process::id().to_string();
        for line in &lines {
            assert!(!line.ends_with('\n'));
            assert_eq!(line.split_whitespace().next(), Some(pid.as_str()));
        }
    }
}
