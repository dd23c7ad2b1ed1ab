//! Environment frames: chained identifier-to-value bindings.
//!
//! Frames live in the heap because closures retain them and the collector
//! must follow them. The chain is walked through the heap by the free
//! functions below; `define` only ever touches the given frame, `assign`
//! only ever rebinds an existing name.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, EvalResult},
    heap::{Heap, HeapData, HeapId},
    intern::{Interner, SymbolId},
    value::Value,
};

/// Binding storage. Insertion-ordered so snapshots and the collector's child
/// walk are deterministic.
pub(crate) type Bindings = IndexMap<SymbolId, Value, ahash::RandomState>;

/// A single frame: an optional parent and the local bindings.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Env {
    parent: Option<HeapId>,
    bindings: Bindings,
}

impl Env {
    pub fn new(parent: Option<HeapId>, bindings: Bindings) -> Self {
        Self { parent, bindings }
    }

    pub fn parent(&self) -> Option<HeapId> {
        self.parent
    }

    /// All bound values, for the collector's child walk.
    pub fn values(&self) -> impl Iterator<Item = Value> + '_ {
        self.bindings.values().copied()
    }

    fn get(&self, name: SymbolId) -> Option<Value> {
        self.bindings.get(&name).copied()
    }

    fn contains(&self, name: SymbolId) -> bool {
        self.bindings.contains_key(&name)
    }

    fn insert(&mut self, name: SymbolId, value: Value) {
        self.bindings.insert(name, value);
    }
}

/// Resolves `name` in the nearest enclosing frame.
pub(crate) fn lookup(heap: &Heap, env: HeapId, name: SymbolId, interner: &Interner) -> EvalResult<Value> {
    let mut current = Some(env);
    while let Some(id) = current {
        let frame = expect_env(heap, id);
        if let Some(value) = frame.get(name) {
            return Ok(value);
        }
        current = frame.parent();
    }
    Err(Error::name(format!("name `{}` is not defined", interner.resolve(name))))
}

/// Binds `name` in `env` itself, shadowing any outer binding. A previous
/// binding in this frame is replaced; parents are never touched.
pub(crate) fn define(heap: &mut Heap, env: HeapId, name: SymbolId, value: Value) {
    expect_env_mut(heap, env).insert(name, value);
}

/// Rebinds `name` in the nearest enclosing frame that already has it. Never
/// creates a binding.
pub(crate) fn assign(
    heap: &mut Heap,
    env: HeapId,
    name: SymbolId,
    value: Value,
    interner: &Interner,
) -> EvalResult<()> {
    let mut current = Some(env);
    while let Some(id) = current {
        let frame = expect_env(heap, id);
        if frame.contains(name) {
            expect_env_mut(heap, id).insert(name, value);
            return Ok(());
        }
        current = frame.parent();
    }
    Err(Error::name(format!(
        "cannot set undefined name `{}`",
        interner.resolve(name)
    )))
}

/// Allocates a child frame of `parent`.
pub(crate) fn extend(heap: &mut Heap, parent: HeapId, bindings: Bindings) -> HeapId {
    heap.allocate(HeapData::Env(Env::new(Some(parent), bindings)))
}

fn expect_env(heap: &Heap, id: HeapId) -> &Env {
    match heap.get(id) {
        HeapData::Env(env) => env,
        _ => panic!("environment handle does not refer to an environment"),
    }
}

fn expect_env_mut(heap: &mut Heap, id: HeapId) -> &mut Env {
    match heap.get_mut(id) {
        HeapData::Env(env) => env,
        _ => panic!("environment handle does not refer to an environment"),
    }
}
