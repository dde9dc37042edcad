//! Callback faults under the sentinel policy surface as
//! `BridgeError::CallbackFault` once the native call returns.

use lmbridge_engine::sys::MDB_SUCCESS;
use lmbridge_engine::{Engine, MdbVal};
use lmbridge_ffi::{
    baseline_compare, bytes_of, get, install_comparator, put, raw, reader_list,
    register_database_comparator, take_pending, BridgeConfig, BridgeError, ComparatorRegistry,
    DispatchMode, ErrorCategory, FaultKind, FaultPolicy,
};
use lmbridge_testkit::{init_tracing, serial, TestEnv};
use std::cmp::Ordering;

fn sentinel() {
    init_tracing();
    let config = BridgeConfig::new().fault_policy(FaultPolicy::Sentinel);
    ComparatorRegistry::global().configure(config);
}

fn exploding(_: &[u8], _: &[u8]) -> Ordering {
    panic!("comparator exploded")
}

fn fault_kind(err: &BridgeError) -> FaultKind {
    match err {
        BridgeError::CallbackFault(fault) => fault.kind,
        other => panic!("expected a callback fault, got {other}"),
    }
}

#[test]
fn panicking_comparator_is_reported_after_the_call() {
    sentinel();
    let env = TestEnv::new();
    let s = env.scratch("panics", 0);
    let _reg = register_database_comparator(&*env, s.txn, s.dbi, exploding).unwrap();

    put(&*env, s.txn, s.dbi, b"first", b"v", 0).unwrap();
    let err = put(&*env, s.txn, s.dbi, b"second", b"v", 0).unwrap_err();

    assert_eq!(fault_kind(&err), FaultKind::ComparatorPanic);
    assert_eq!(err.category(), ErrorCategory::ContractViolation);
    assert!(err.to_string().contains("comparator exploded"));
}

#[test]
fn fault_does_not_leak_into_the_next_call() {
    sentinel();
    let env = TestEnv::new();
    let txn = env.begin_write();
    let broken = env.open_db(txn, "broken", 0);
    let plain = env.open_db(txn, "plain", 0);
    let _reg = register_database_comparator(&*env, txn, broken, exploding).unwrap();

    put(&*env, txn, broken, b"a", b"1", 0).unwrap();
    assert!(put(&*env, txn, broken, b"b", b"2", 0).is_err());

    put(&*env, txn, plain, b"a", b"1", 0).unwrap();
    assert!(get(&*env, txn, plain, b"a").is_ok());
}

#[test]
fn sentinel_keeps_a_deterministic_order() {
    sentinel();
    let env = TestEnv::new();
    let s = env.scratch("sentinel", 0);
    let _reg = register_database_comparator(&*env, s.txn, s.dbi, exploding).unwrap();

    for key in [b"c", b"a", b"b"] {
        let _ = put(&*env, s.txn, s.dbi, key, key, 0);
    }
    for key in [b"a", b"b", b"c"] {
        let mut val = MdbVal::empty();
        let rc = unsafe { raw::mdb_get(&*env, s.txn, s.dbi, key.as_ptr(), 1, &mut val) };
        assert_eq!(rc, MDB_SUCCESS);
        assert_eq!(unsafe { bytes_of(&val) }, key);
        assert_eq!(take_pending().map(|f| f.kind), Some(FaultKind::ComparatorPanic));
    }
}

#[test]
fn deregistered_context_faults_on_next_comparison() {
    sentinel();
    let env = TestEnv::new();
    let s = env.scratch("orphaned", 0);
    let registration =
        register_database_comparator(&*env, s.txn, s.dbi, |a: &[u8], b: &[u8]| a.cmp(b)).unwrap();
    put(&*env, s.txn, s.dbi, b"a", b"1", 0).unwrap();

    drop(registration);
    let err = put(&*env, s.txn, s.dbi, b"b", b"2", 0).unwrap_err();
    assert_eq!(fault_kind(&err), FaultKind::UnregisteredContext);
}

#[test]
fn released_slot_is_not_handed_to_another_database() {
    sentinel();
    let env = TestEnv::new();
    let txn = env.begin_write();
    let a = env.open_db(txn, "a", 0);
    let b = env.open_db(txn, "b", 0);

    let forward = register_database_comparator(&*env, txn, a, baseline_compare).unwrap();
    let released = forward.slot();
    put(&*env, txn, a, b"b", b"1", 0).unwrap();
    drop(forward);

    let backward =
        register_database_comparator(&*env, txn, b, |x: &[u8], y: &[u8]| y.cmp(x)).unwrap();
    assert_ne!(backward.slot(), released);

    for key in [b"a", b"c"] {
        let err = put(&*env, txn, a, key, b"2", 0).unwrap_err();
        assert_eq!(fault_kind(&err), FaultKind::UnregisteredContext);
    }

    install_comparator(&*env, txn, a, DispatchMode::Baseline).unwrap();
    put(&*env, txn, a, b"d", b"3", 0).unwrap();
    assert!(take_pending().is_none());
    assert_eq!(ComparatorRegistry::global().forget_environment(env.env_id()), 1);
}

#[test]
fn cleared_single_comparator_faults() {
    let _guard = serial();
    sentinel();
    let registry = ComparatorRegistry::global();
    registry.register_single(|a: &[u8], b: &[u8]| a.cmp(b)).unwrap();

    let env = TestEnv::new();
    let s = env.scratch("single", 0);
    install_comparator(&*env, s.txn, s.dbi, DispatchMode::Single).unwrap();
    put(&*env, s.txn, s.dbi, b"a", b"1", 0).unwrap();
    put(&*env, s.txn, s.dbi, b"b", b"2", 0).unwrap();

    assert!(registry.clear_single());
    let err = get(&*env, s.txn, s.dbi, b"a").unwrap_err();
    assert_eq!(fault_kind(&err), FaultKind::UnregisteredContext);
}

#[test]
fn panicking_relay_handler_is_a_fault() {
    sentinel();
    let env = TestEnv::new();
    let _r1 = env.begin_read();
    let _r2 = env.begin_read();

    let mut calls = 0;
    let err = reader_list(&*env, |_| {
        calls += 1;
        panic!("handler exploded")
    })
    .unwrap_err();

    assert_eq!(calls, 1);
    assert_eq!(fault_kind(&err), FaultKind::RelayPanic);
}
