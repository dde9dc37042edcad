//! Comparator bridge properties, checked through the engine.

mod common;

use common::{dups, keys};
use lmbridge_engine::sys::MDB_DUPSORT;
use lmbridge_engine::{Engine, MdbVal};
use lmbridge_ffi::{
    baseline_compare, cursor_put, install_comparator, lmbridge_cmp_baseline,
    register_database_comparator, register_dup_comparator, ComparatorRegistry, ContextId,
    DispatchMode,
};
use lmbridge_testkit::generators::{
    bytes_strategy, distinct_keys_strategy, engine_config, narrow_bytes_strategy,
};
use lmbridge_testkit::{serial, TestEnv};
use proptest::prelude::*;
use std::cmp::Ordering;

/// Shorter keys first, then bytewise.
fn shortlex(a: &[u8], b: &[u8]) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn native(a: &[u8], b: &[u8]) -> i32 {
    let (a, b) = (MdbVal::from_slice(a), MdbVal::from_slice(b));
    unsafe { lmbridge_cmp_baseline(&a, &b) }
}

/// Registers `shortlex` as the single-dispatch comparator for this binary.
fn ensure_single() {
    let _guard = serial();
    let registry = ComparatorRegistry::global();
    if !registry.has_single() {
        registry.register_single(shortlex).unwrap();
    }
}

/// Inserts `keys` into a fresh database ordered by `mode` and returns the
/// keys in cursor order.
fn ordered_by(mode: DispatchMode, keys_in: &[Vec<u8>]) -> Vec<Vec<u8>> {
    let env = TestEnv::new();
    let s = env.scratch("ordered", 0);
    install_comparator(&*env, s.txn, s.dbi, mode).unwrap();
    for key in keys_in {
        cursor_put(&*env, s.cursor, key, b"v", 0).unwrap();
    }
    keys(&*env, s.cursor)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn baseline_is_antisymmetric(a in bytes_strategy(), b in bytes_strategy()) {
        prop_assert_eq!(native(&a, &b), -native(&b, &a));
        prop_assert_eq!(baseline_compare(&a, &b), baseline_compare(&b, &a).reverse());
    }

    #[test]
    fn baseline_is_transitive(
        a in narrow_bytes_strategy(),
        b in narrow_bytes_strategy(),
        c in narrow_bytes_strategy(),
    ) {
        if native(&a, &b) <= 0 && native(&b, &c) <= 0 {
            prop_assert!(native(&a, &c) <= 0);
        }
    }

    #[test]
    fn baseline_equal_iff_identical(a in narrow_bytes_strategy(), b in narrow_bytes_strategy()) {
        prop_assert_eq!(native(&a, &b) == 0, a == b);
    }

    #[test]
    fn baseline_returns_unit_values(a in bytes_strategy(), b in bytes_strategy()) {
        prop_assert!([-1, 0, 1].contains(&native(&a, &b)));
        prop_assert_eq!(baseline_compare(&a, &b), a.cmp(&b));
    }
}

proptest! {
    #![proptest_config(engine_config())]

    #[test]
    fn baseline_mode_sorts_bytewise(keys_in in distinct_keys_strategy(24)) {
        let mut expected = keys_in.clone();
        expected.sort();
        prop_assert_eq!(ordered_by(DispatchMode::Baseline, &keys_in), expected);
    }

    #[test]
    fn single_and_context_modes_agree(keys_in in distinct_keys_strategy(24)) {
        ensure_single();
        let id = ContextId::new(0x5107_0000);
        let registration = ComparatorRegistry::global()
            .register_context(id, shortlex)
            .unwrap();

        let mut expected = keys_in.clone();
        expected.sort_by(|a, b| shortlex(a, b));
        let single = ordered_by(DispatchMode::Single, &keys_in);
        let context = ordered_by(DispatchMode::Context(id), &keys_in);
        drop(registration);

        prop_assert_eq!(&single, &expected);
        prop_assert_eq!(&context, &expected);
    }
}

#[test]
fn contexts_do_not_cross_talk() {
    let env = TestEnv::new();
    let txn = env.begin_write();
    let forward = env.open_db(txn, "forward", 0);
    let backward = env.open_db(txn, "backward", 0);

    let _f = register_database_comparator(&*env, txn, forward, baseline_compare).unwrap();
    let _b =
        register_database_comparator(&*env, txn, backward, |a: &[u8], b: &[u8]| b.cmp(a)).unwrap();

    let cf = env.open_cursor(txn, forward);
    let cb = env.open_cursor(txn, backward);
    for key in [b"b", b"a", b"c"] {
        cursor_put(&*env, cf, key, b"v", 0).unwrap();
        cursor_put(&*env, cb, key, b"v", 0).unwrap();
    }

    assert_eq!(keys(&*env, cf), vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    assert_eq!(keys(&*env, cb), vec![b"c".to_vec(), b"b".to_vec(), b"a".to_vec()]);
}

#[test]
fn duplicate_order_is_independent_of_key_order() {
    let env = TestEnv::new();
    let txn = env.begin_write();
    let dbi = env.open_db(txn, "dups", MDB_DUPSORT);

    let key_order =
        register_database_comparator(&*env, txn, dbi, |a: &[u8], b: &[u8]| b.cmp(a)).unwrap();
    let dup_order = register_dup_comparator(&*env, txn, dbi, shortlex).unwrap();
    assert_ne!(key_order.id(), dup_order.id());

    let cursor = env.open_cursor(txn, dbi);
    for (k, v) in [("k1", "ccc"), ("k1", "a"), ("k1", "bb"), ("k2", "z")] {
        cursor_put(&*env, cursor, k.as_bytes(), v.as_bytes(), 0).unwrap();
    }

    assert_eq!(keys(&*env, cursor)[0], b"k2");
    assert_eq!(
        dups(&*env, cursor, b"k1").unwrap(),
        vec![b"a".to_vec(), b"bb".to_vec(), b"ccc".to_vec()]
    );
}

#[test]
fn registration_guard_releases_context() {
    let env = TestEnv::new();
    let txn = env.begin_write();
    let dbi = env.open_db(txn, "scoped", 0);

    let registration = register_database_comparator(&*env, txn, dbi, shortlex).unwrap();
    let id = registration.id();
    assert_eq!(id, ContextId::for_database(env.env_id(), dbi));
    assert!(ComparatorRegistry::global().is_registered(id));

    drop(registration);
    assert!(!ComparatorRegistry::global().is_registered(id));
    let err = install_comparator(&*env, txn, dbi, DispatchMode::Context(id)).unwrap_err();
    assert!(matches!(err, lmbridge_ffi::BridgeError::UnregisteredContext(found) if found == id));
}
