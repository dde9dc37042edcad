//! C-ABI registration surface for foreign bindings.
//!
//! Foreign code registers an `(user, a, b) -> int` callback under a context
//! id, then installs the matching trampoline with the engine's
//! `mdb_set_compare`. Every function clears the thread's last error on
//! entry and sets it on failure.

use crate::buffer::MultiVal;
use crate::compare::{Comparator, ComparatorRegistry, ContextId, DispatchMode};
use crate::error::{clear_last_error, report, set_last_error, LmBridgeResult};
use lmbridge_engine::{Dbi, MdbCmpFunc, MdbVal};
use std::cmp::Ordering;
use std::ffi::{c_int, c_uint, c_void};

/// Foreign comparator callback. Returns negative, zero or positive.
pub type LmBridgeCmpCallback =
    unsafe extern "C" fn(user: *mut c_void, a: *const MdbVal, b: *const MdbVal) -> c_int;

struct ForeignComparator {
    callback: LmBridgeCmpCallback,
    user: *mut c_void,
}

// SAFETY: the registering caller guarantees `user` may be used from any
// thread that calls into the engine.
unsafe impl Send for ForeignComparator {}
unsafe impl Sync for ForeignComparator {}

impl Comparator for ForeignComparator {
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        let a = MdbVal::from_slice(a);
        let b = MdbVal::from_slice(b);
        // SAFETY: the descriptors are live for the call.
        unsafe { (self.callback)(self.user, &a, &b) }.cmp(&0)
    }
}

fn foreign(callback: Option<LmBridgeCmpCallback>, user: *mut c_void) -> Option<ForeignComparator> {
    callback.map(|callback| ForeignComparator { callback, user })
}

/// Registers a foreign comparator under `id`.
///
/// The registration lasts until [`lmbridge_deregister_context`].
///
/// # Safety
///
/// `callback` must be safe to call with `user` from any thread for as long
/// as the registration lasts.
#[no_mangle]
pub unsafe extern "C" fn lmbridge_register_context(
    id: u64,
    callback: Option<LmBridgeCmpCallback>,
    user: *mut c_void,
) -> LmBridgeResult {
    clear_last_error();

    let Some(comparator) = foreign(callback, user) else {
        set_last_error("null pointer argument");
        return LmBridgeResult::NullPointer;
    };
    match ComparatorRegistry::global().register_context(ContextId::new(id), comparator) {
        Ok(registration) => {
            let _ = registration.into_id();
            LmBridgeResult::Ok
        }
        Err(e) => report(&e),
    }
}

/// Removes the comparator registered under `id`.
#[no_mangle]
pub extern "C" fn lmbridge_deregister_context(id: u64) -> LmBridgeResult {
    clear_last_error();

    match ComparatorRegistry::global().deregister_context(ContextId::new(id)) {
        Ok(()) => LmBridgeResult::Ok,
        Err(e) => report(&e),
    }
}

/// Registers the foreign single-dispatch comparator.
///
/// # Safety
///
/// Same as [`lmbridge_register_context`].
#[no_mangle]
pub unsafe extern "C" fn lmbridge_register_single(
    callback: Option<LmBridgeCmpCallback>,
    user: *mut c_void,
) -> LmBridgeResult {
    clear_last_error();

    let Some(comparator) = foreign(callback, user) else {
        set_last_error("null pointer argument");
        return LmBridgeResult::NullPointer;
    };
    match ComparatorRegistry::global().register_single(comparator) {
        Ok(()) => LmBridgeResult::Ok,
        Err(e) => report(&e),
    }
}

/// Removes the single-dispatch comparator. Removing none is not an error.
#[no_mangle]
pub extern "C" fn lmbridge_clear_single() -> LmBridgeResult {
    clear_last_error();
    ComparatorRegistry::global().clear_single();
    LmBridgeResult::Ok
}

/// Returned by [`lmbridge_context_id`] for an environment id wider than
/// [`ContextId::MAX_ENV_ID`]. Never a key-order id.
pub const LMBRIDGE_INVALID_CONTEXT: u64 = u64::MAX;

/// The key-order context id of database `dbi` in environment `env_id`, or
/// [`LMBRIDGE_INVALID_CONTEXT`] if `env_id` does not fit.
#[no_mangle]
pub extern "C" fn lmbridge_context_id(env_id: u64, dbi: c_uint) -> u64 {
    clear_last_error();
    if env_id > ContextId::MAX_ENV_ID {
        set_last_error(format!("environment id {env_id:#x} exceeds 31 bits"));
        return LMBRIDGE_INVALID_CONTEXT;
    }
    ContextId::for_database(env_id, Dbi(dbi)).get()
}

/// Frees the slot of a deregistered context once every database that
/// installed its trampoline has been given another comparator.
#[no_mangle]
pub extern "C" fn lmbridge_reclaim_context(id: u64) -> LmBridgeResult {
    clear_last_error();

    match ComparatorRegistry::global().reclaim(ContextId::new(id)) {
        Ok(true) => LmBridgeResult::Ok,
        Ok(false) => {
            set_last_error(format!("context {} holds no released slot", ContextId::new(id)));
            LmBridgeResult::NotRegistered
        }
        Err(e) => report(&e),
    }
}

/// Resolves a context id to the trampoline to pass to `mdb_set_compare`.
///
/// # Safety
///
/// `out` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn lmbridge_context_comparator(
    id: u64,
    out: *mut Option<MdbCmpFunc>,
) -> LmBridgeResult {
    clear_last_error();

    let Some(out) = out.as_mut() else {
        set_last_error("null pointer argument");
        return LmBridgeResult::NullPointer;
    };
    match ComparatorRegistry::global().native_fn(DispatchMode::Context(ContextId::new(id))) {
        Ok(func) => {
            *out = Some(func);
            LmBridgeResult::Ok
        }
        Err(e) => report(&e),
    }
}

/// Fills `out` with the two descriptors for a `MDB_MULTIPLE` put of `page`.
///
/// # Safety
///
/// `page` must be readable for `len` bytes (or `len` zero); `out` must be
/// null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn lmbridge_wrap_multi(
    page: *const u8,
    len: usize,
    stride: usize,
    out: *mut [MdbVal; 2],
) -> LmBridgeResult {
    clear_last_error();

    if out.is_null() || (page.is_null() && len > 0) {
        set_last_error("null pointer argument");
        return LmBridgeResult::NullPointer;
    }
    let page = if len == 0 {
        &[][..]
    } else {
        std::slice::from_raw_parts(page, len)
    };
    match MultiVal::wrap(page, stride) {
        Ok(mut multi) => {
            let vals = multi.as_mut_ptr();
            *out = [*vals, *vals.add(1)];
            LmBridgeResult::Ok
        }
        Err(e) => report(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::lmbridge_get_last_error;
    use std::ffi::CStr;

    unsafe extern "C" fn reverse_cb(_: *mut c_void, a: *const MdbVal, b: *const MdbVal) -> c_int {
        let (a, b) = (crate::buffer::bytes_of(a), crate::buffer::bytes_of(b));
        match b.cmp(a) {
            Ordering::Less => -5,
            Ordering::Equal => 0,
            Ordering::Greater => 5,
        }
    }

    fn last_error() -> String {
        let ptr = lmbridge_get_last_error();
        assert!(!ptr.is_null());
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
    }

    #[test]
    fn register_resolve_deregister() {
        let id = 0x5eed_0001;
        let rc = unsafe { lmbridge_register_context(id, Some(reverse_cb), std::ptr::null_mut()) };
        assert_eq!(rc, LmBridgeResult::Ok);

        let mut func = None;
        let rc = unsafe { lmbridge_context_comparator(id, &mut func) };
        assert_eq!(rc, LmBridgeResult::Ok);
        let func = func.unwrap();
        let (a, b) = (MdbVal::from_slice(b"a"), MdbVal::from_slice(b"b"));
        assert_eq!(unsafe { func(&a, &b) }, 1);

        let rc = unsafe { lmbridge_register_context(id, Some(reverse_cb), std::ptr::null_mut()) };
        assert_eq!(rc, LmBridgeResult::AlreadyRegistered);
        assert!(last_error().contains("already has a comparator"));

        assert_eq!(lmbridge_deregister_context(id), LmBridgeResult::Ok);
        assert_eq!(lmbridge_deregister_context(id), LmBridgeResult::NotRegistered);
    }

    #[test]
    fn null_callback_rejected() {
        let rc = unsafe { lmbridge_register_context(0x5eed_0002, None, std::ptr::null_mut()) };
        assert_eq!(rc, LmBridgeResult::NullPointer);
        let rc = unsafe { lmbridge_context_comparator(0x5eed_0002, std::ptr::null_mut()) };
        assert_eq!(rc, LmBridgeResult::NullPointer);
    }

    #[test]
    fn unknown_context_has_no_trampoline() {
        let mut func = None;
        let rc = unsafe { lmbridge_context_comparator(0x5eed_0003, &mut func) };
        assert_eq!(rc, LmBridgeResult::NotRegistered);
        assert!(func.is_none());
    }

    #[test]
    fn context_id_matches_rust_side() {
        assert_eq!(
            lmbridge_context_id(7, 3),
            ContextId::for_database(7, Dbi(3)).get()
        );
    }

    #[test]
    fn wide_environment_id_has_no_context() {
        let wide = ContextId::MAX_ENV_ID + 1;
        assert_eq!(lmbridge_context_id(wide, 3), LMBRIDGE_INVALID_CONTEXT);
        assert!(last_error().contains("exceeds 31 bits"));
        assert_ne!(lmbridge_context_id(ContextId::MAX_ENV_ID, 3), LMBRIDGE_INVALID_CONTEXT);
    }

    #[test]
    fn exported_slot_is_reclaimed_explicitly() {
        let id = 0x5eed_0004;
        let rc = unsafe { lmbridge_register_context(id, Some(reverse_cb), std::ptr::null_mut()) };
        assert_eq!(rc, LmBridgeResult::Ok);
        let mut func = None;
        assert_eq!(unsafe { lmbridge_context_comparator(id, &mut func) }, LmBridgeResult::Ok);
        assert_eq!(lmbridge_deregister_context(id), LmBridgeResult::Ok);

        assert_eq!(lmbridge_reclaim_context(id), LmBridgeResult::Ok);
        assert_eq!(lmbridge_reclaim_context(id), LmBridgeResult::NotRegistered);
    }

    #[test]
    fn wrap_multi_fills_descriptors() {
        let page = [1u8; 9];
        let mut out = [MdbVal::empty(); 2];
        let rc = unsafe { lmbridge_wrap_multi(page.as_ptr(), 9, 3, &mut out) };
        assert_eq!(rc, LmBridgeResult::Ok);
        assert_eq!(out[0].mv_size, 3);
        assert_eq!(out[1].mv_size, 3);

        let rc = unsafe { lmbridge_wrap_multi(page.as_ptr(), 8, 3, &mut out) };
        assert_eq!(rc, LmBridgeResult::InvalidArgument);
        assert!(last_error().contains("not a multiple of stride 3"));

        let rc = unsafe { lmbridge_wrap_multi(std::ptr::null(), 0, 4, &mut out) };
        assert_eq!(rc, LmBridgeResult::Ok);
        assert_eq!(out[1].mv_size, 0);
    }
}
