//! Slot-arena heap with mark-and-sweep reclamation.
//!
//! All mutable and cyclic values live here; the evaluator passes `HeapId`
//! handles around and the arena owns the data. A tracing pass is required
//! because the value graph contains cycles that reference counting cannot
//! reclaim: a closure captures the environment that binds the closure, and
//! `set-cdr!` can close a list onto itself.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{env::Env, intern::SymbolId, value::Value};

/// Unique identifier for values stored inside the heap arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub(crate) struct HeapId(usize);

impl HeapId {
    /// Returns the raw slot index.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A mutable cons cell.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub(crate) struct Pair {
    pub car: Value,
    pub cdr: Value,
}

/// A user-defined procedure: formal parameters, unevaluated body expressions,
/// and the captured environment. Immutable after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Closure {
    pub params: SmallVec<[SymbolId; 4]>,
    pub body: SmallVec<[Value; 2]>,
    pub env: HeapId,
}

/// Every runtime value that must live in the arena: the mutable and the
/// cyclic kinds. Immediate values stay inline in `Value`.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) enum HeapData {
    Pair(Pair),
    Closure(Closure),
    Env(Env),
}

impl HeapData {
    fn kind_name(&self) -> &'static str {
        match self {
            Self::Pair(_) => "Pair",
            Self::Closure(_) => "Closure",
            Self::Env(_) => "Env",
        }
    }

    /// Pushes every outgoing heap reference onto the mark work list.
    fn collect_child_ids(&self, work_list: &mut Vec<HeapId>) {
        match self {
            Self::Pair(pair) => {
                push_ref(pair.car, work_list);
                push_ref(pair.cdr, work_list);
            }
            Self::Closure(closure) => {
                work_list.push(closure.env);
                for expr in &closure.body {
                    push_ref(*expr, work_list);
                }
            }
            Self::Env(env) => {
                if let Some(parent) = env.parent() {
                    work_list.push(parent);
                }
                for value in env.values() {
                    push_ref(value, work_list);
                }
            }
        }
    }
}

fn push_ref(value: Value, work_list: &mut Vec<HeapId>) {
    if let Value::Ref(id) = value {
        work_list.push(id);
    }
}

/// Snapshot of heap state at a point in time.
///
/// Captures slot counts and a per-kind breakdown of live objects. Useful for
/// observing heap growth across calls and for leak tests.
///
/// The `objects_by_kind` map uses `BTreeMap` for deterministic iteration
/// order, making snapshots suitable for display and comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapStats {
    /// Total number of live objects on the heap.
    pub live_objects: usize,
    /// Number of free (recycled) slots available for reuse.
    pub free_slots: usize,
    /// Total heap capacity (live + free).
    pub total_slots: usize,
    /// Breakdown of live objects by kind name ("Pair", "Closure", "Env").
    pub objects_by_kind: BTreeMap<&'static str, usize>,
    /// Number of dynamically interned symbols in the session.
    pub interned_symbols: usize,
}

/// Arena that owns every heap value.
///
/// Uses a free list to reuse slots from collected values, keeping slot counts
/// stable across calls that repeatedly allocate and abandon data. `collect`
/// pushes freed slot ids onto the free list; `allocate` pops from it before
/// growing the entry vector.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct Heap {
    entries: Vec<Option<HeapData>>,
    /// Ids of freed slots available for reuse.
    free_list: Vec<HeapId>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new value in the arena and returns its stable handle.
    pub fn allocate(&mut self, data: HeapData) -> HeapId {
        if let Some(id) = self.free_list.pop() {
            debug_assert!(self.entries[id.index()].is_none(), "free list points at a live slot");
            self.entries[id.index()] = Some(data);
            id
        } else {
            let id = HeapId(self.entries.len());
            self.entries.push(Some(data));
            id
        }
    }

    /// Allocates a list: right-nested pairs over `elements`, ending in `tail`.
    ///
    /// An empty `elements` returns `tail` unchanged, so a proper empty list
    /// comes back as `Nil` without touching the arena.
    pub fn allocate_list(&mut self, elements: Vec<Value>, tail: Value) -> Value {
        let mut rest = tail;
        for car in elements.into_iter().rev() {
            rest = Value::Ref(self.allocate(HeapData::Pair(Pair { car, cdr: rest })));
        }
        rest
    }

    /// # Panics
    /// Panics when `id` refers to a freed or never-allocated slot; handles
    /// only escape the interpreter through live values, so that is a bug.
    pub fn get(&self, id: HeapId) -> &HeapData {
        self.entries
            .get(id.index())
            .and_then(Option::as_ref)
            .expect("Heap::get: slot already freed")
    }

    /// # Panics
    /// Same contract as [`Heap::get`].
    pub fn get_mut(&mut self, id: HeapId) -> &mut HeapData {
        self.entries
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .expect("Heap::get_mut: slot already freed")
    }

    /// True when `id` refers to a live environment slot. Used to validate
    /// restored session snapshots.
    pub fn is_live_env(&self, id: HeapId) -> bool {
        matches!(self.entries.get(id.index()), Some(Some(HeapData::Env(_))))
    }

    /// Runs a mark-and-sweep pass over the arena.
    ///
    /// Marks every value reachable from `root` by following the per-kind
    /// child enumeration (pair car/cdr, closure body and captured
    /// environment, environment parent and bound values), then frees every
    /// unmarked slot. The mark phase uses an explicit work list and a
    /// `Vec<bool>` visited set, so cycles terminate and deep structures
    /// cannot overflow the stack.
    ///
    /// Runs only between top-level calls; repeated collection with the same
    /// reachable set is idempotent.
    pub fn collect(&mut self, root: HeapId) {
        let mut reachable = vec![false; self.entries.len()];
        let mut work_list = vec![root];
        while let Some(id) = work_list.pop() {
            let index = id.index();
            if reachable[index] {
                continue;
            }
            reachable[index] = true;
            if let Some(data) = self.entries.get(index).and_then(Option::as_ref) {
                data.collect_child_ids(&mut work_list);
            }
        }

        for (index, entry) in self.entries.iter_mut().enumerate() {
            if !reachable[index] && entry.take().is_some() {
                self.free_list.push(HeapId(index));
            }
        }
    }

    /// Current slot counts and per-kind breakdown.
    pub fn stats(&self, interned_symbols: usize) -> HeapStats {
        let mut objects_by_kind = BTreeMap::new();
        let mut live_objects = 0;
        for data in self.entries.iter().flatten() {
            live_objects += 1;
            *objects_by_kind.entry(data.kind_name()).or_insert(0) += 1;
        }
        HeapStats {
            live_objects,
            free_slots: self.free_list.len(),
            total_slots: self.entries.len(),
            objects_by_kind,
            interned_symbols,
        }
    }
}
