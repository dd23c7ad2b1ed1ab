//! Interpreter façade: a persistent session evaluating one expression per call.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::{
    builtins::Builtin,
    env::{Bindings, Env},
    error::Error,
    eval::Evaluator,
    heap::{Heap, HeapData, HeapId, HeapStats},
    intern::{Interner, SymbolId},
    print::Printer,
    reader::Reader,
    value::Value,
};

/// Bumped whenever the snapshot byte layout changes.
const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// A persistent interpreter session.
///
/// The session owns a long-lived heap, symbol interner, and base environment.
/// Each [`Interpreter::run`] call reads, evaluates, and prints one expression
/// while preserving prior state: definitions, closures, and mutated pairs
/// from earlier calls stay visible. After every call a mark-and-sweep pass
/// rooted at the base environment reclaims whatever the session can no longer
/// reach, cycles included.
///
/// A session is strictly single-threaded; independent sessions share nothing.
pub struct Interpreter {
    heap: Heap,
    interner: Interner,
    base_env: HeapId,
}

impl Interpreter {
    /// Creates a session whose base environment is preloaded with every
    /// builtin procedure and special form.
    #[must_use]
    pub fn new() -> Self {
        let mut heap = Heap::new();
        let interner = Interner::new();
        let mut bindings = Bindings::default();
        for builtin in Builtin::iter() {
            bindings.insert(SymbolId::from_builtin(builtin), Value::Builtin(builtin));
        }
        let base_env = heap.allocate(HeapData::Env(Env::new(None, bindings)));
        Self {
            heap,
            interner,
            base_env,
        }
    }

    /// Evaluates one expression and returns its printed form.
    ///
    /// The source must contain exactly one complete expression; trailing
    /// tokens are a `SyntaxError` and a bare `()` is a `RuntimeError` (an
    /// application without an operator). Garbage collection runs after the
    /// call whether or not evaluation succeeded, so failed calls never leak
    /// transient allocations.
    pub fn run(&mut self, source: &str) -> Result<String, Error> {
        let result = self.run_one(source);
        self.heap.collect(self.base_env);
        result
    }

    fn run_one(&mut self, source: &str) -> Result<String, Error> {
        let mut reader = Reader::new(source, &mut self.heap, &mut self.interner);
        let expr = reader.read()?;
        reader.finish()?;
        if matches!(expr, Value::Nil) {
            return Err(Error::runtime("cannot evaluate an empty application"));
        }
        let value = Evaluator::new(&mut self.heap, &self.interner).eval(expr, self.base_env)?;
        Printer::new(&self.heap, &self.interner).print(value)
    }

    /// Heap and interner statistics for the session.
    #[must_use]
    pub fn stats(&self) -> HeapStats {
        self.heap.stats(self.interner.dynamic_len())
    }

    /// Serializes the whole session (heap, interned symbols, base
    /// environment handle) to a compact byte vector.
    pub fn snapshot(&self) -> Result<Vec<u8>, SnapshotError> {
        let snapshot = SessionSnapshotRef {
            format_version: SNAPSHOT_FORMAT_VERSION,
            symbols: self.interner.dynamic_names(),
            heap: &self.heap,
            base_env: self.base_env,
        };
        postcard::to_allocvec(&snapshot).map_err(SnapshotError::Encode)
    }

    /// Restores a session previously produced by [`Interpreter::snapshot`].
    ///
    /// The restored session behaves as if the saving instance had simply
    /// continued: same bindings, same heap identities, same interned symbols.
    pub fn restore(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: SessionSnapshot = postcard::from_bytes(bytes).map_err(SnapshotError::Decode)?;
        if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: snapshot.format_version,
                expected: SNAPSHOT_FORMAT_VERSION,
            });
        }
        if !snapshot.heap.is_live_env(snapshot.base_env) {
            return Err(SnapshotError::Corrupt(
                "base environment handle is not a live environment",
            ));
        }
        Ok(Self {
            heap: snapshot.heap,
            interner: Interner::from_dynamic_names(snapshot.symbols),
            base_env: snapshot.base_env,
        })
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// Borrowing mirror of [`SessionSnapshot`], so saving never clones the heap.
/// Field order must match exactly; postcard encodes fields positionally.
#[derive(Serialize)]
struct SessionSnapshotRef<'a> {
    format_version: u32,
    symbols: &'a [String],
    heap: &'a Heap,
    base_env: HeapId,
}

/// Serialized representation of a full session for disk persistence.
#[derive(Deserialize)]
struct SessionSnapshot {
    format_version: u32,
    symbols: Vec<String>,
    heap: Heap,
    base_env: HeapId,
}

/// Errors from session snapshot save and load.
///
/// Host-facing and distinct from the interpreter's user-visible error kinds:
/// a snapshot failure says nothing about the Scheme program.
#[derive(Debug)]
pub enum SnapshotError {
    /// Serialization failed.
    Encode(postcard::Error),
    /// The byte stream is not a well-formed snapshot.
    Decode(postcard::Error),
    /// The snapshot was written by an incompatible version.
    UnsupportedVersion { found: u32, expected: u32 },
    /// The snapshot decoded but its invariants do not hold.
    Corrupt(&'static str),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode(err) => write!(f, "failed to encode session snapshot: {err}"),
            Self::Decode(err) => write!(f, "failed to decode session snapshot: {err}"),
            Self::UnsupportedVersion { found, expected } => {
                write!(f, "unsupported snapshot format version {found}, expected {expected}")
            }
            Self::Corrupt(what) => write!(f, "corrupt session snapshot: {what}"),
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Encode(err) | Self::Decode(err) => Some(err),
            Self::UnsupportedVersion { .. } | Self::Corrupt(_) => None,
        }
    }
}
