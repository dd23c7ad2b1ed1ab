//! Session snapshot tests: save a running session to bytes, restore it, and
//! continue where it left off.

use lisk::{Interpreter, SnapshotError};

/// Definitions made before the snapshot are usable after restore.
#[test]
fn a_restored_session_continues_where_the_saved_one_left_off() {
    let mut interp = Interpreter::new();
    interp.run("(define (fact n) (if (= n 0) 1 (* n (fact (- n 1)))))").unwrap();
    interp.run("(define base 10)").unwrap();

    let bytes = interp.snapshot().unwrap();
    let mut restored = Interpreter::restore(&bytes).unwrap();

    assert_eq!(restored.run("(fact 5)").unwrap(), "120");
    assert_eq!(restored.run("(+ base 1)").unwrap(), "11");
}

/// The saving session keeps working after a snapshot is taken.
#[test]
fn snapshotting_does_not_disturb_the_live_session() {
    let mut interp = Interpreter::new();
    interp.run("(define x 1)").unwrap();
    let _bytes = interp.snapshot().unwrap();
    assert_eq!(interp.run("x").unwrap(), "1");
}

/// A snapshot is a point-in-time copy: later mutations are not visible in it.
#[test]
fn a_snapshot_is_isolated_from_later_mutations() {
    let mut interp = Interpreter::new();
    interp.run("(define p (cons 1 2))").unwrap();
    let bytes = interp.snapshot().unwrap();

    interp.run("(set-car! p 99)").unwrap();
    assert_eq!(interp.run("p").unwrap(), "(99 . 2)");

    let mut restored = Interpreter::restore(&bytes).unwrap();
    assert_eq!(restored.run("p").unwrap(), "(1 . 2)");
}

/// Restored sessions are fully independent of the original.
#[test]
fn restored_sessions_share_nothing() {
    let mut interp = Interpreter::new();
    interp.run("(define xs (list 1 2 3))").unwrap();
    let bytes = interp.snapshot().unwrap();

    let mut a = Interpreter::restore(&bytes).unwrap();
    let mut b = Interpreter::restore(&bytes).unwrap();
    a.run("(set-car! xs 0)").unwrap();
    assert_eq!(a.run("xs").unwrap(), "(0 2 3)");
    assert_eq!(b.run("xs").unwrap(), "(1 2 3)");
}

/// Cyclic data survives the byte round trip.
#[test]
fn cycles_survive_the_round_trip() {
    let mut interp = Interpreter::new();
    interp.run("(define cyc '(1 2 3))").unwrap();
    interp.run("(set-cdr! (cdr (cdr cyc)) cyc)").unwrap();

    let bytes = interp.snapshot().unwrap();
    let mut restored = Interpreter::restore(&bytes).unwrap();

    assert_eq!(restored.run("(car cyc)").unwrap(), "1");
    assert_eq!(restored.run("(list? cyc)").unwrap(), "#f");
    assert_eq!(restored.run("(list-ref cyc 1)").unwrap_err().kind(), lisk::ErrorKind::RuntimeError);
}

/// A snapshot of a fresh session restores to a working interpreter.
#[test]
fn a_fresh_session_round_trips() {
    let bytes = Interpreter::new().snapshot().unwrap();
    let mut restored = Interpreter::restore(&bytes).unwrap();
    assert_eq!(restored.run("(+ 1 2)").unwrap(), "3");
}

/// Heap statistics agree before and after the round trip.
#[test]
fn stats_survive_the_round_trip() {
    let mut interp = Interpreter::new();
    interp.run("(define xs (list 1 2 3))").unwrap();
    let bytes = interp.snapshot().unwrap();
    let restored = Interpreter::restore(&bytes).unwrap();
    assert_eq!(restored.stats(), interp.stats());
}

/// Arbitrary bytes are rejected.
#[test]
fn garbage_bytes_do_not_restore() {
    assert!(Interpreter::restore(b"definitely not a snapshot").is_err());
    assert!(Interpreter::restore(&[]).is_err());
}

/// A snapshot from an unknown format version is refused, not misread.
#[test]
fn unknown_format_versions_are_refused() {
    let mut bytes = Interpreter::new().snapshot().unwrap();
    // The format version is the leading varint; any other single-byte value
    // is a version this build does not understand.
    bytes[0] = 0x7f;
    match Interpreter::restore(&bytes) {
        Err(SnapshotError::UnsupportedVersion { found, expected }) => {
            assert_eq!(found, 0x7f);
            assert_eq!(expected, 1);
        }
        Err(other) => panic!("expected UnsupportedVersion, got {other}"),
        Ok(_) => panic!("expected UnsupportedVersion, got a restored session"),
    }
}
