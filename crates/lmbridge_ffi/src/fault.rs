//! Callback fault trap.
//!
//! A managed callback runs inside a native call frame that cannot be unwound.
//! Panics are caught at the boundary, logged, and then either abort the
//! process or are parked here for the marshaler to surface once the native
//! call has returned.

use crate::config::FaultPolicy;
use std::any::Any;
use std::cell::RefCell;

/// What faulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// A comparator panicked.
    ComparatorPanic,
    /// A comparison reached a context with no registered comparator.
    UnregisteredContext,
    /// A message handler panicked.
    RelayPanic,
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::ComparatorPanic => "comparator panicked",
            Self::UnregisteredContext => "unregistered comparator context",
            Self::RelayPanic => "message handler panicked",
        })
    }
}

/// A trapped callback failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackFault {
    /// What faulted.
    pub kind: FaultKind,
    /// The panic message or a description of the fault.
    pub message: String,
}

impl CallbackFault {
    /// Creates a fault record.
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn from_panic(kind: FaultKind, payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_owned()
        };
        Self::new(kind, message)
    }
}

impl std::fmt::Display for CallbackFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

thread_local! {
    static PENDING: RefCell<Option<CallbackFault>> = const { RefCell::new(None) };
}

/// Logs `fault` and applies `policy`. Returns only under
/// [`FaultPolicy::Sentinel`].
pub(crate) fn report(fault: &CallbackFault, policy: FaultPolicy) {
    tracing::error!(
        kind = ?fault.kind,
        message = %fault.message,
        ?policy,
        "callback fault inside native call"
    );
    if policy == FaultPolicy::Abort {
        std::process::abort();
    }
}

/// Reports `fault` and parks it for the current thread's native call.
///
/// Only the first fault of a call is kept.
pub(crate) fn raise(fault: CallbackFault, policy: FaultPolicy) {
    report(&fault, policy);
    PENDING.with(|pending| {
        let mut pending = pending.borrow_mut();
        if pending.is_none() {
            *pending = Some(fault);
        }
    });
}

/// Takes the fault parked by the last native call on this thread, if any.
///
/// The marshaler does this after every call; callers driving an engine
/// directly should do the same.
pub fn take_pending() -> Option<CallbackFault> {
    PENDING.with(|pending| pending.borrow_mut().take())
}

/// Discards any parked fault on this thread.
pub fn clear_pending() {
    PENDING.with(|pending| *pending.borrow_mut() = None);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_parks_first_fault() {
        clear_pending();
        raise(
            CallbackFault::new(FaultKind::ComparatorPanic, "first"),
            FaultPolicy::Sentinel,
        );
        raise(
            CallbackFault::new(FaultKind::ComparatorPanic, "second"),
            FaultPolicy::Sentinel,
        );

        let fault = take_pending().unwrap();
        assert_eq!(fault.message, "first");
        assert!(take_pending().is_none());
    }

    #[test]
    fn panic_payloads_become_messages() {
        let payload = std::panic::catch_unwind(|| panic!("bad order")).unwrap_err();
        let fault = CallbackFault::from_panic(FaultKind::ComparatorPanic, payload.as_ref());
        assert_eq!(fault.message, "bad order");

        let payload = std::panic::catch_unwind(|| panic!("{} {}", "formatted", 1)).unwrap_err();
        let fault = CallbackFault::from_panic(FaultKind::RelayPanic, payload.as_ref());
        assert_eq!(fault.message, "formatted 1");
        assert_eq!(fault.to_string(), "message handler panicked: formatted 1");
    }
}
