//! Reader-lock listing through the message relay.

use lmbridge_engine::{Engine, MemoryEngineConfig, TxnHandle};
use lmbridge_ffi::{collect_reader_lines, reader_list, reader_list_fallible, RelayError};
use lmbridge_testkit::generators::engine_config;
use lmbridge_testkit::TestEnv;
use proptest::prelude::*;

fn readers(env: &TestEnv, n: usize) -> Vec<TxnHandle> {
    (0..n).map(|_| env.begin_read()).collect()
}

proptest! {
    #![proptest_config(engine_config())]

    #[test]
    fn one_call_per_active_reader(r in 0usize..12) {
        let env = TestEnv::new();
        let _held = readers(&env, r);

        let mut calls = 0;
        let summary = reader_list(&*env, |_| {
            calls += 1;
            0
        })
        .unwrap();

        prop_assert_eq!(calls, r);
        prop_assert_eq!(summary.lines, r);
        prop_assert_eq!(summary.status, 0);
        prop_assert!(!summary.stopped);
    }

    #[test]
    fn stop_at_call_k(
        (r, k) in (1usize..12).prop_flat_map(|r| (Just(r), 1..=r)),
        code in 1i32..1000,
    ) {
        let env = TestEnv::new();
        let _held = readers(&env, r);

        let mut calls = 0;
        let summary = reader_list(&*env, |_| {
            calls += 1;
            if calls == k { code } else { 0 }
        })
        .unwrap();

        prop_assert_eq!(calls, k);
        prop_assert_eq!(summary.status, code);
        prop_assert!(summary.stopped);
    }
}

#[test]
fn negative_stop_value_is_propagated() {
    let env = TestEnv::new();
    let _held = readers(&env, 3);
    let summary = reader_list(&*env, |_| -7).unwrap();
    assert_eq!((summary.status, summary.lines), (-7, 1));
}

#[test]
fn finished_readers_leave_the_listing() {
    let env = TestEnv::new();
    let held = readers(&env, 3);
    env.txn_abort(held[1]);
    assert_eq!(collect_reader_lines(&*env).unwrap().len(), 2);

    let writer = env.begin_write();
    assert_eq!(collect_reader_lines(&*env).unwrap().len(), 2);
    env.commit(writer);
}

#[test]
fn lines_carry_pid_thread_and_txnid() {
    let env = TestEnv::new();
    let _held = readers(&env, 2);
    let pid = std::process::id().to_string();

    for line in collect_reader_lines(&*env).unwrap() {
        let fields: Vec<_> = line.split_whitespace().collect();
        assert_eq!(fields.len(), 3, "unexpected line {line:?}");
        assert_eq!(fields[0], pid);
        assert!(u64::from_str_radix(fields[1], 16).is_ok());
        assert!(fields[2].parse::<u64>().is_ok());
    }
}

#[test]
fn fallible_handler_stops_on_first_error() {
    let env = TestEnv::new();
    let _held = readers(&env, 4);

    let mut seen = Vec::new();
    let err = reader_list_fallible(&*env, |line| {
        seen.push(line.to_owned());
        if seen.len() == 2 {
            Err(std::io::Error::other("disk full"))
        } else {
            Ok(())
        }
    })
    .unwrap_err();

    assert_eq!(seen.len(), 2);
    assert!(matches!(err, RelayError::Handler(_)));
    assert_eq!(err.to_string(), "reader line handler failed: disk full");
}

#[test]
fn fallible_handler_counts_lines() {
    let env = TestEnv::with_config(MemoryEngineConfig::new().max_readers(4));
    let _held = readers(&env, 4);
    let handled = reader_list_fallible(&*env, |_| Ok::<(), std::io::Error>(())).unwrap();
    assert_eq!(handled, 4);
    assert_eq!(env.active_readers(), 4);
}
