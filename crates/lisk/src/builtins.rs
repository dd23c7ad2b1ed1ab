//! The primitive catalog: every name preloaded into the base environment.
//!
//! A single enum covers both special forms (which receive their argument
//! expressions unevaluated) and primitive procedures (which receive evaluated
//! arguments through [`Builtin::apply`]). The evaluator decides which path to
//! take from the *identity* of the evaluated operator, so shadowing a builtin
//! name behaves like shadowing any other binding.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter, EnumString, FromRepr, IntoStaticStr};

use crate::{
    error::{Error, EvalResult},
    heap::{Heap, HeapData, Pair},
    value::Value,
};

/// Enumerates every builtin binding of the base environment.
///
/// Uses strum derives for automatic `Display`, `FromStr`, and
/// `Into<&'static str>` implementations; each variant serializes to the
/// identifier it is bound to (e.g., `SetCar` -> "set-car!").
#[repr(u32)]
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    EnumCount,
    FromRepr,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
pub(crate) enum Builtin {
    // Special forms: their argument expressions arrive unevaluated.
    #[strum(serialize = "quote")]
    Quote,
    #[strum(serialize = "if")]
    If,
    #[strum(serialize = "and")]
    And,
    #[strum(serialize = "or")]
    Or,
    #[strum(serialize = "define")]
    Define,
    #[strum(serialize = "set!")]
    Set,
    #[strum(serialize = "lambda")]
    Lambda,
    #[strum(serialize = "set-car!")]
    SetCar,
    #[strum(serialize = "set-cdr!")]
    SetCdr,

    // Numeric folds.
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "*")]
    Mul,
    #[strum(serialize = "-")]
    Sub,
    #[strum(serialize = "/")]
    Div,
    #[strum(serialize = "min")]
    Min,
    #[strum(serialize = "max")]
    Max,
    #[strum(serialize = "abs")]
    Abs,

    // Comparison chains.
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = "=")]
    NumEq,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">=")]
    Ge,

    #[strum(serialize = "not")]
    Not,

    // Type predicates.
    #[strum(serialize = "number?")]
    IsNumber,
    #[strum(serialize = "boolean?")]
    IsBoolean,
    #[strum(serialize = "symbol?")]
    IsSymbol,
    #[strum(serialize = "pair?")]
    IsPair,
    #[strum(serialize = "null?")]
    IsNull,
    #[strum(serialize = "list?")]
    IsList,

    // Pair and list operations.
    #[strum(serialize = "cons")]
    Cons,
    #[strum(serialize = "car")]
    Car,
    #[strum(serialize = "cdr")]
    Cdr,
    #[strum(serialize = "list")]
    List,
    #[strum(serialize = "list-ref")]
    ListRef,
    #[strum(serialize = "list-tail")]
    ListTail,
}

impl Builtin {
    /// The identifier this builtin is bound to in the base environment.
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// True for forms whose arguments the evaluator must not pre-evaluate.
    pub fn is_special_form(self) -> bool {
        matches!(
            self,
            Self::Quote
                | Self::If
                | Self::And
                | Self::Or
                | Self::Define
                | Self::Set
                | Self::Lambda
                | Self::SetCar
                | Self::SetCdr
        )
    }

    /// Applies a primitive procedure to already-evaluated arguments.
    ///
    /// Special forms never reach this point; the evaluator dispatches them on
    /// the unevaluated argument list instead.
    pub fn apply(self, heap: &mut Heap, args: Vec<Value>) -> EvalResult<Value> {
        match self {
            Self::Add => fold_numbers(self, heap, &args, Some(0), |a, b| Ok(a.wrapping_add(b))),
            Self::Mul => fold_numbers(self, heap, &args, Some(1), |a, b| Ok(a.wrapping_mul(b))),
            Self::Sub => fold_numbers(self, heap, &args, None, |a, b| Ok(a.wrapping_sub(b))),
            Self::Div => fold_numbers(self, heap, &args, None, |a, b| {
                if b == 0 {
                    Err(Error::runtime("division by zero"))
                } else {
                    Ok(a.wrapping_div(b))
                }
            }),
            Self::Min => fold_numbers(self, heap, &args, None, |a, b| Ok(a.min(b))),
            Self::Max => fold_numbers(self, heap, &args, None, |a, b| Ok(a.max(b))),
            Self::Abs => {
                expect_arity(self, &args, 1)?;
                let n = expect_number(self, heap, &args[0])?;
                Ok(Value::Int(n.wrapping_abs()))
            }

            Self::Lt => chain_compare(self, heap, &args, |a, b| a < b),
            Self::Gt => chain_compare(self, heap, &args, |a, b| a > b),
            Self::NumEq => chain_compare(self, heap, &args, |a, b| a == b),
            Self::Le => chain_compare(self, heap, &args, |a, b| a <= b),
            Self::Ge => chain_compare(self, heap, &args, |a, b| a >= b),

            Self::Not => {
                expect_arity(self, &args, 1)?;
                Ok(Value::Bool(matches!(args[0], Value::Bool(false))))
            }

            Self::IsNumber => predicate(self, &args, matches!(args.first(), Some(Value::Int(_)))),
            Self::IsBoolean => predicate(self, &args, matches!(args.first(), Some(Value::Bool(_)))),
            Self::IsSymbol => predicate(self, &args, matches!(args.first(), Some(Value::Symbol(_)))),
            Self::IsPair => {
                expect_arity(self, &args, 1)?;
                let is_pair = matches!(&args[0], Value::Ref(id) if matches!(heap.get(*id), HeapData::Pair(_)));
                Ok(Value::Bool(is_pair))
            }
            Self::IsNull => predicate(self, &args, matches!(args.first(), Some(Value::Nil))),
            Self::IsList => {
                expect_arity(self, &args, 1)?;
                Ok(Value::Bool(is_proper_list(heap, args[0])))
            }

            Self::Cons => {
                expect_arity(self, &args, 2)?;
                let pair = Pair {
                    car: args[0],
                    cdr: args[1],
                };
                Ok(Value::Ref(heap.allocate(HeapData::Pair(pair))))
            }
            Self::Car => {
                expect_arity(self, &args, 1)?;
                Ok(expect_pair(self, heap, &args[0])?.car)
            }
            Self::Cdr => {
                expect_arity(self, &args, 1)?;
                Ok(expect_pair(self, heap, &args[0])?.cdr)
            }
            Self::List => Ok(heap.allocate_list(args, Value::Nil)),
            Self::ListRef => {
                let (elements, index) = list_and_index(self, heap, &args)?;
                elements.get(index).copied().ok_or_else(|| {
                    Error::runtime(format!(
                        "`list-ref` index {index} is out of range for a list of length {}",
                        elements.len()
                    ))
                })
            }
            Self::ListTail => {
                let (elements, index) = list_and_index(self, heap, &args)?;
                if index > elements.len() {
                    return Err(Error::runtime(format!(
                        "`list-tail` index {index} is out of range for a list of length {}",
                        elements.len()
                    )));
                }
                Ok(heap.allocate_list(elements[index..].to_vec(), Value::Nil))
            }

            Self::Quote
            | Self::If
            | Self::And
            | Self::Or
            | Self::Define
            | Self::Set
            | Self::Lambda
            | Self::SetCar
            | Self::SetCdr => unreachable!("special form `{self}` applied as a primitive"),
        }
    }
}

/// "s" when `count` is not one, for error messages.
pub(crate) fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

fn expect_arity(op: Builtin, args: &[Value], expected: usize) -> EvalResult<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(Error::runtime(format!(
            "`{op}` expects exactly {expected} argument{}, got {}",
            plural(expected),
            args.len()
        )))
    }
}

fn expect_number(op: Builtin, heap: &Heap, value: &Value) -> EvalResult<i64> {
    match value {
        Value::Int(n) => Ok(*n),
        other => Err(Error::runtime(format!(
            "`{op}` expects numbers, got {}",
            other.kind_name(heap)
        ))),
    }
}

fn expect_pair(op: Builtin, heap: &Heap, value: &Value) -> EvalResult<Pair> {
    if let Value::Ref(id) = value
        && let HeapData::Pair(pair) = heap.get(*id)
    {
        return Ok(*pair);
    }
    Err(Error::runtime(format!(
        "`{op}` expects a pair, got {}",
        value.kind_name(heap)
    )))
}

fn predicate(op: Builtin, args: &[Value], outcome: bool) -> EvalResult<Value> {
    expect_arity(op, args, 1)?;
    Ok(Value::Bool(outcome))
}

/// Left-fold over numeric arguments.
///
/// With an identity the fold may be empty (`(+)` is `0`); without one the
/// first argument seeds the accumulator and at least one argument is required.
fn fold_numbers(
    op: Builtin,
    heap: &Heap,
    args: &[Value],
    identity: Option<i64>,
    mut combine: impl FnMut(i64, i64) -> EvalResult<i64>,
) -> EvalResult<Value> {
    let (mut acc, rest) = match identity {
        Some(identity) => (identity, args),
        None => match args.split_first() {
            Some((first, rest)) => (expect_number(op, heap, first)?, rest),
            None => {
                return Err(Error::runtime(format!("`{op}` needs at least one argument")));
            }
        },
    };
    for value in rest {
        acc = combine(acc, expect_number(op, heap, value)?)?;
    }
    Ok(Value::Int(acc))
}

/// True iff the predicate holds between every consecutive pair of arguments.
/// Vacuously true for zero or one argument, but every argument must still be
/// a number.
fn chain_compare(
    op: Builtin,
    heap: &Heap,
    args: &[Value],
    holds: impl Fn(i64, i64) -> bool,
) -> EvalResult<Value> {
    let mut numbers = Vec::with_capacity(args.len());
    for value in args {
        numbers.push(expect_number(op, heap, value)?);
    }
    Ok(Value::Bool(numbers.windows(2).all(|w| holds(w[0], w[1]))))
}

enum SpineStep {
    End,
    Improper,
    Next(Value),
}

fn spine_next(heap: &Heap, value: Value) -> SpineStep {
    match value {
        Value::Nil => SpineStep::End,
        Value::Ref(id) => match heap.get(id) {
            HeapData::Pair(pair) => SpineStep::Next(pair.cdr),
            _ => SpineStep::Improper,
        },
        _ => SpineStep::Improper,
    }
}

/// Walks the cdr spine with two cursors so cyclic lists terminate with `false`
/// instead of hanging.
fn is_proper_list(heap: &Heap, start: Value) -> bool {
    let mut slow = start;
    let mut fast = start;
    loop {
        for _ in 0..2 {
            fast = match spine_next(heap, fast) {
                SpineStep::End => return true,
                SpineStep::Improper => return false,
                SpineStep::Next(next) => next,
            };
        }
        let SpineStep::Next(next_slow) = spine_next(heap, slow) else {
            unreachable!("slow cursor trails the validated fast cursor")
        };
        slow = next_slow;
        if slow == fast {
            return false;
        }
    }
}

/// Flattens a proper list into its elements; improper and cyclic spines fail.
fn list_elements(op: Builtin, heap: &Heap, value: Value) -> EvalResult<Vec<Value>> {
    if !is_proper_list(heap, value) {
        return Err(Error::runtime(format!(
            "`{op}` expects a proper list, got {}",
            value.kind_name(heap)
        )));
    }
    let mut elements = Vec::new();
    let mut rest = value;
    while let Value::Ref(id) = rest {
        let HeapData::Pair(pair) = heap.get(id) else {
            unreachable!("proper list spine holds only pairs")
        };
        elements.push(pair.car);
        rest = pair.cdr;
    }
    Ok(elements)
}

/// Shared argument parsing for `list-ref` and `list-tail`: a proper list and
/// a non-negative index.
fn list_and_index(op: Builtin, heap: &Heap, args: &[Value]) -> EvalResult<(Vec<Value>, usize)> {
    expect_arity(op, args, 2)?;
    let elements = list_elements(op, heap, args[0])?;
    let raw = expect_number(op, heap, &args[1])?;
    let index = usize::try_from(raw)
        .map_err(|_| Error::runtime(format!("`{op}` index must be non-negative, got {raw}")))?;
    Ok((elements, index))
}
