//! Symbol interning for efficient storage and comparison of identifiers.
//!
//! Every symbol in a session maps to a stable [`SymbolId`]. Builtin names are
//! pre-interned: their ids are the `Builtin` discriminants, so installing the
//! base environment and recognizing `quote` in the reader need no allocation
//! or lookup. Dynamically interned names start at a fixed offset above the
//! static set and are append-only for the life of the session.

use std::str::FromStr;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::builtins::Builtin;

/// Index into the symbol table.
///
/// Uses `u32` to keep `Value` small; ids below [`DYNAMIC_SYMBOL_OFFSET`] are
/// builtin names, ids at or above it index the session's dynamic table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub(crate) struct SymbolId(u32);

/// First id available for dynamically interned symbols.
const DYNAMIC_SYMBOL_OFFSET: u32 = 64;

const _: () = assert!(<Builtin as strum::EnumCount>::COUNT <= DYNAMIC_SYMBOL_OFFSET as usize);

impl SymbolId {
    /// The static id of a builtin's name.
    pub fn from_builtin(builtin: Builtin) -> Self {
        Self(builtin as u32)
    }

    fn as_builtin(self) -> Option<Builtin> {
        if self.0 < DYNAMIC_SYMBOL_OFFSET {
            Builtin::from_repr(self.0)
        } else {
            None
        }
    }
}

/// Append-only symbol table shared by the reader, evaluator, and printer.
#[derive(Debug, Default)]
pub(crate) struct Interner {
    /// Dynamically interned names, indexed by `id - DYNAMIC_SYMBOL_OFFSET`.
    names: Vec<String>,
    /// Reverse lookup for dynamic names.
    ids: AHashMap<String, SymbolId>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `name`, returning its stable id.
    pub fn intern(&mut self, name: &str) -> SymbolId {
        if let Ok(builtin) = Builtin::from_str(name) {
            return SymbolId::from_builtin(builtin);
        }
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let index = u32::try_from(self.names.len()).expect("symbol table overflow");
        let id = SymbolId(DYNAMIC_SYMBOL_OFFSET + index);
        self.names.push(name.to_owned());
        self.ids.insert(name.to_owned(), id);
        id
    }

    /// Returns the textual name for `id`.
    ///
    /// # Panics
    /// Panics on an id this session never produced; that is an interpreter
    /// bug, not a user error.
    pub fn resolve(&self, id: SymbolId) -> &str {
        match id.as_builtin() {
            Some(builtin) => builtin.name(),
            None => {
                let index = (id.0 - DYNAMIC_SYMBOL_OFFSET) as usize;
                self.names.get(index).map(String::as_str).expect("unknown symbol id")
            }
        }
    }

    /// Number of dynamically interned symbols (the static set excluded).
    pub fn dynamic_len(&self) -> usize {
        self.names.len()
    }

    /// The dynamic tail, for session snapshots.
    pub fn dynamic_names(&self) -> &[String] {
        &self.names
    }

    /// Rebuilds an interner from a snapshot's dynamic tail. Ids are assigned
    /// by position, matching the ids the saving session handed out.
    pub fn from_dynamic_names(names: Vec<String>) -> Self {
        let ids = names
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let index = u32::try_from(index).expect("symbol table overflow");
                (name.clone(), SymbolId(DYNAMIC_SYMBOL_OFFSET + index))
            })
            .collect();
        Self { names, ids }
    }
}
