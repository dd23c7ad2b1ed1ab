//! Printed representation of values.

use crate::{
    error::{Error, EvalResult},
    heap::{Heap, HeapData, Pair},
    intern::Interner,
    value::Value,
};

/// Upper bound on nodes written in one printed form. Only a cyclic structure
/// can reach it; finite graphs print in full far below the limit.
const MAX_PRINT_NODES: usize = 10_000;

/// Fixed tag for procedure values, builtin and user-defined alike.
const PROCEDURE_TAG: &str = "PrimitiveProcedure";

pub(crate) struct Printer<'a> {
    heap: &'a Heap,
    interner: &'a Interner,
    budget: usize,
}

impl<'a> Printer<'a> {
    pub fn new(heap: &'a Heap, interner: &'a Interner) -> Self {
        Self {
            heap,
            interner,
            budget: MAX_PRINT_NODES,
        }
    }

    /// Renders `value`; a graph that exhausts the node budget (in practice,
    /// a cyclic one) is a runtime error rather than an endless loop.
    pub fn print(mut self, value: Value) -> EvalResult<String> {
        let mut out = String::new();
        self.write_value(&mut out, value)?;
        Ok(out)
    }

    fn write_value(&mut self, out: &mut String, value: Value) -> EvalResult<()> {
        self.spend()?;
        match value {
            Value::Nil => out.push_str("()"),
            Value::Bool(true) => out.push_str("#t"),
            Value::Bool(false) => out.push_str("#f"),
            Value::Int(n) => out.push_str(&n.to_string()),
            Value::Symbol(id) => out.push_str(self.interner.resolve(id)),
            Value::Builtin(_) => out.push_str(PROCEDURE_TAG),
            Value::Ref(id) => match self.heap.get(id) {
                HeapData::Pair(pair) => {
                    let pair = *pair;
                    self.write_pair(out, pair)?;
                }
                HeapData::Closure(_) => out.push_str(PROCEDURE_TAG),
                HeapData::Env(_) => out.push_str("Environment"),
            },
        }
        Ok(())
    }

    /// Walks the cdr spine: a space between proper elements, ` . tail` for a
    /// dotted cdr, and an implicit terminating empty list.
    fn write_pair(&mut self, out: &mut String, pair: Pair) -> EvalResult<()> {
        out.push('(');
        self.write_value(out, pair.car)?;
        let mut rest = pair.cdr;
        loop {
            match rest {
                Value::Nil => break,
                Value::Ref(id) => {
                    if let HeapData::Pair(next) = self.heap.get(id) {
                        let next = *next;
                        self.spend()?;
                        out.push(' ');
                        self.write_value(out, next.car)?;
                        rest = next.cdr;
                    } else {
                        out.push_str(" . ");
                        self.write_value(out, rest)?;
                        break;
                    }
                }
                other => {
                    out.push_str(" . ");
                    self.write_value(out, other)?;
                    break;
                }
            }
        }
        out.push(')');
        Ok(())
    }

    fn spend(&mut self) -> EvalResult<()> {
        if self.budget == 0 {
            return Err(Error::runtime("printed form is too large; the structure is likely cyclic"));
        }
        self.budget -= 1;
        Ok(())
    }
}
