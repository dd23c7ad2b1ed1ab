//! Reclamation tests driven by `HeapStats`: transient garbage is freed after
//! every call, data reachable from the base environment survives, and cycles
//! neither leak nor get collected while still reachable.

use lisk::Interpreter;

/// A fresh session holds exactly one heap object: the base environment.
#[test]
fn a_fresh_session_holds_only_the_base_environment() {
    let interp = Interpreter::new();
    let stats = interp.stats();
    assert_eq!(stats.live_objects, 1);
    assert_eq!(stats.objects_by_kind.get("Env"), Some(&1));
    assert_eq!(stats.interned_symbols, 0, "builtin names are pre-interned, not dynamic");
}

/// Values unreachable after a call are swept, including the source graph.
#[test]
fn transient_allocations_are_collected() {
    let mut interp = Interpreter::new();
    assert_eq!(interp.run("(cons 1 2)").unwrap(), "(1 . 2)");
    let stats = interp.stats();
    assert_eq!(stats.live_objects, 1, "the result pair was transient");
    assert!(stats.free_slots > 0, "collected slots return to the free list");
}

/// Defined data stays live across calls.
#[test]
fn defined_data_survives_collection() {
    let mut interp = Interpreter::new();
    interp.run("(define xs (list 1 2 3))").unwrap();
    let stats = interp.stats();
    assert_eq!(stats.live_objects, 4, "base env plus three pairs");
    assert_eq!(stats.objects_by_kind.get("Pair"), Some(&3));
    assert_eq!(interp.run("xs").unwrap(), "(1 2 3)");
}

/// Re-running a pure lookup allocates nothing that survives, so stats are
/// stable across repeated identical calls.
#[test]
fn repeated_calls_reach_a_steady_state() {
    let mut interp = Interpreter::new();
    interp.run("(define xs (list 1 2 3))").unwrap();
    let baseline = interp.stats();
    for _ in 0..5 {
        interp.run("xs").unwrap();
        assert_eq!(interp.stats(), baseline, "a lookup call must not grow the heap");
    }
}

/// Rebinding a name strands its old value; the next collection frees it.
#[test]
fn rebinding_strands_the_old_value() {
    let mut interp = Interpreter::new();
    interp.run("(define xs (list 1 2 3))").unwrap();
    assert_eq!(interp.stats().live_objects, 4);
    interp.run("(define xs 0)").unwrap();
    assert_eq!(interp.stats().live_objects, 1, "the stranded list is collected");
}

/// Scenario: a list closed onto itself with `set-cdr!` stays evaluable
/// indefinitely and is neither leaked nor mis-collected.
#[test]
fn reachable_cycles_survive_repeated_collection() {
    let mut interp = Interpreter::new();
    interp.run("(define cyc '(1 2 3))").unwrap();
    interp.run("(set-cdr! (cdr (cdr cyc)) cyc)").unwrap();
    let baseline = interp.stats();
    assert_eq!(baseline.live_objects, 4, "base env plus the three-pair cycle");

    for _ in 0..5 {
        assert_eq!(interp.run("(car cyc)").unwrap(), "1");
        assert_eq!(interp.run("(list? cyc)").unwrap(), "#f");
        assert_eq!(interp.run("(pair? cyc)").unwrap(), "#t");
        assert_eq!(interp.stats(), baseline, "the cycle must neither grow nor shrink");
    }
}

/// Printing a cyclic structure is refused instead of diverging.
#[test]
fn printing_a_cycle_is_a_runtime_error() {
    let mut interp = Interpreter::new();
    interp.run("(define cyc '(1 2 3))").unwrap();
    interp.run("(set-cdr! (cdr (cdr cyc)) cyc)").unwrap();
    let err = interp.run("cyc").unwrap_err();
    assert_eq!(err.kind(), lisk::ErrorKind::RuntimeError);
    assert_eq!(interp.run("(car cyc)").unwrap(), "1", "the cycle itself is untouched");
}

/// An unreachable cycle is collected despite its internal references.
#[test]
fn unreachable_cycles_are_collected() {
    let mut interp = Interpreter::new();
    interp.run("(define cyc '(1 2 3))").unwrap();
    interp.run("(set-cdr! (cdr (cdr cyc)) cyc)").unwrap();
    assert_eq!(interp.stats().live_objects, 4);
    interp.run("(define cyc 0)").unwrap();
    assert_eq!(interp.stats().live_objects, 1, "the orphaned cycle is freed");
}

/// A closure returned from a call keeps its defining frame alive, forming a
/// closure-to-environment cycle; dropping the binding collects both.
#[test]
fn closure_environment_cycles_collect_when_unreachable() {
    let mut interp = Interpreter::new();
    interp.run("(define (outer) (define (inner) inner) inner)").unwrap();
    let after_outer = interp.stats().live_objects;

    interp.run("(define g (outer))").unwrap();
    let after_g = interp.stats().live_objects;
    assert_eq!(
        after_g,
        after_outer + 2,
        "the call added one closure and one environment frame"
    );
    assert_eq!(interp.run("(g)").unwrap(), "PrimitiveProcedure");
    assert_eq!(interp.stats().live_objects, after_g, "calling g allocates nothing lasting");

    interp.run("(define g 0)").unwrap();
    assert_eq!(
        interp.stats().live_objects,
        after_outer,
        "the closure-environment cycle is collected once unreachable"
    );
}

/// A captured environment survives as long as the capturing closure does.
#[test]
fn captured_environments_survive_while_reachable() {
    let mut interp = Interpreter::new();
    interp.run("(define (make-adder k) (lambda (x) (+ x k)))").unwrap();
    interp.run("(define add3 (make-adder 3))").unwrap();
    for _ in 0..3 {
        assert_eq!(interp.run("(add3 10)").unwrap(), "13");
    }
    interp.run("(define add3 0)").unwrap();
    assert_eq!(interp.run("((make-adder 1) 1)").unwrap(), "2", "the factory still works");
}

/// Failed calls also collect their transient allocations.
#[test]
fn errors_do_not_leak_transients() {
    let mut interp = Interpreter::new();
    let baseline = interp.stats().live_objects;
    assert!(interp.run("(car (list 1 2 3))").is_ok());
    assert!(interp.run("(car (cons 1 (car '())))").is_err());
    assert_eq!(interp.stats().live_objects, baseline, "error paths must not leak");
}
