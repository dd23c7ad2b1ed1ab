//! Tree-walking evaluator.
//!
//! Dispatches on value kind: immediates and procedure values evaluate to
//! themselves, symbols resolve through the environment chain, and pairs are
//! applications. Special forms are recognized by the identity of the
//! *evaluated* operator, never by its name, so ordinary lookup and shadowing
//! rules apply uniformly to every binding in the base environment.

use smallvec::SmallVec;

use crate::{
    builtins::{Builtin, plural},
    env::{self, Bindings},
    error::{Error, EvalResult},
    heap::{Closure, Heap, HeapData, HeapId, Pair},
    intern::{Interner, SymbolId},
    value::Value,
};

/// Maximum evaluator nesting depth. Exceeding it is a `RuntimeError`, not a
/// stack overflow.
pub(crate) const MAX_RECURSION_DEPTH: usize = 1000;

pub(crate) struct Evaluator<'a> {
    heap: &'a mut Heap,
    interner: &'a Interner,
    depth_remaining: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(heap: &'a mut Heap, interner: &'a Interner) -> Self {
        Self {
            heap,
            interner,
            depth_remaining: MAX_RECURSION_DEPTH,
        }
    }

    /// Evaluates `expr` in `env`.
    pub fn eval(&mut self, expr: Value, env: HeapId) -> EvalResult<Value> {
        if self.depth_remaining == 0 {
            return Err(Error::runtime("maximum recursion depth exceeded"));
        }
        self.depth_remaining -= 1;
        let result = self.eval_inner(expr, env);
        self.depth_remaining += 1;
        result
    }

    fn eval_inner(&mut self, expr: Value, env: HeapId) -> EvalResult<Value> {
        match expr {
            Value::Symbol(name) => env::lookup(self.heap, env, name, self.interner),
            Value::Ref(id) => match self.heap.get(id) {
                HeapData::Pair(pair) => {
                    let Pair { car, cdr } = *pair;
                    self.eval_application(car, cdr, env)
                }
                // Procedure values and environments evaluate to themselves.
                HeapData::Closure(_) | HeapData::Env(_) => Ok(expr),
            },
            // Numbers, booleans, the empty list, and primitives are
            // self-evaluating.
            Value::Nil | Value::Bool(_) | Value::Int(_) | Value::Builtin(_) => Ok(expr),
        }
    }

    fn eval_application(&mut self, operator_expr: Value, args_expr: Value, env: HeapId) -> EvalResult<Value> {
        let operator = self.eval(operator_expr, env)?;
        match operator {
            Value::Builtin(builtin) if builtin.is_special_form() => {
                self.eval_special_form(builtin, args_expr, env)
            }
            Value::Builtin(builtin) => {
                let args = self.eval_args(args_expr, env)?;
                builtin.apply(self.heap, args)
            }
            Value::Ref(id) if matches!(self.heap.get(id), HeapData::Closure(_)) => {
                let args = self.eval_args(args_expr, env)?;
                self.apply_closure(id, args)
            }
            other => Err(Error::runtime(format!(
                "{} is not callable",
                other.kind_name(self.heap)
            ))),
        }
    }

    /// Flattens the argument expression list and evaluates each expression
    /// left to right in the caller's environment.
    fn eval_args(&mut self, args_expr: Value, env: HeapId) -> EvalResult<Vec<Value>> {
        let exprs = self.expr_list(args_expr)?;
        let mut args = Vec::with_capacity(exprs.len());
        for expr in exprs {
            args.push(self.eval(expr, env)?);
        }
        Ok(args)
    }

    /// Flattens a proper list of expressions; a dotted list is an error.
    fn expr_list(&self, list: Value) -> EvalResult<Vec<Value>> {
        let mut exprs = Vec::new();
        let mut rest = list;
        loop {
            match rest {
                Value::Nil => return Ok(exprs),
                Value::Ref(id) => match self.heap.get(id) {
                    HeapData::Pair(pair) => {
                        exprs.push(pair.car);
                        rest = pair.cdr;
                    }
                    _ => return Err(Error::runtime("argument list must be a proper list")),
                },
                _ => return Err(Error::runtime("argument list must be a proper list")),
            }
        }
    }

    fn eval_special_form(&mut self, form: Builtin, args_expr: Value, env: HeapId) -> EvalResult<Value> {
        let args = self.expr_list(args_expr)?;
        match form {
            Builtin::Quote => {
                expect_form_arity(form, &args, 1)?;
                Ok(args[0])
            }
            Builtin::If => self.eval_if(&args, env),
            Builtin::And => self.eval_and_or(args, env, true),
            Builtin::Or => self.eval_and_or(args, env, false),
            Builtin::Define => self.eval_define(&args, env),
            Builtin::Set => {
                expect_form_arity(form, &args, 2)?;
                let Value::Symbol(name) = args[0] else {
                    return Err(Error::syntax("`set!` expects a symbol as its first argument"));
                };
                let value = self.eval(args[1], env)?;
                env::assign(self.heap, env, name, value, self.interner)?;
                Ok(Value::Nil)
            }
            Builtin::Lambda => {
                if args.len() < 2 {
                    return Err(Error::syntax(
                        "`lambda` needs a parameter list and at least one body expression",
                    ));
                }
                let params = self.param_names(args[0])?;
                self.make_closure(params, &args[1..], env)
            }
            Builtin::SetCar | Builtin::SetCdr => self.eval_set_pair(form, &args, env),
            _ => unreachable!("`{form}` is not a special form"),
        }
    }

    fn eval_if(&mut self, args: &[Value], env: HeapId) -> EvalResult<Value> {
        if args.len() != 2 && args.len() != 3 {
            return Err(Error::syntax(
                "`if` needs a condition, a consequent, and an optional alternative",
            ));
        }
        let condition = self.eval(args[0], env)?;
        if condition.is_truthy() {
            self.eval(args[1], env)
        } else if let Some(&alternative) = args.get(2) {
            self.eval(alternative, env)
        } else {
            Ok(Value::Nil)
        }
    }

    /// Short-circuit evaluation shared by `and` and `or`: `and` returns the
    /// first false value, `or` the first true one; otherwise the value of the
    /// last argument. Zero arguments yield the identity (`#t` / `#f`).
    fn eval_and_or(&mut self, args: Vec<Value>, env: HeapId, conjunction: bool) -> EvalResult<Value> {
        let mut last = Value::Bool(conjunction);
        for expr in args {
            let value = self.eval(expr, env)?;
            if value.is_truthy() != conjunction {
                return Ok(value);
            }
            last = value;
        }
        Ok(last)
    }

    /// `(define name expr)` binds in the current frame; `(define (name p ...)
    /// body ...)` is sugar for binding a closure. Both return the empty list.
    fn eval_define(&mut self, args: &[Value], env: HeapId) -> EvalResult<Value> {
        let Some(&target) = args.first() else {
            return Err(Error::syntax("`define` needs a target and a value"));
        };
        match target {
            Value::Symbol(name) => {
                if args.len() != 2 {
                    return Err(Error::syntax(
                        "`define` for a variable needs exactly one value expression",
                    ));
                }
                let value = self.eval(args[1], env)?;
                env::define(self.heap, env, name, value);
                Ok(Value::Nil)
            }
            Value::Ref(id) if matches!(self.heap.get(id), HeapData::Pair(_)) => {
                let mut names = self.symbol_list(target, "a `define` function signature")?;
                let name = names.remove(0);
                if args.len() < 2 {
                    return Err(Error::syntax(
                        "`define` for a function needs at least one body expression",
                    ));
                }
                let closure = self.make_closure(names.into_iter().collect(), &args[1..], env)?;
                env::define(self.heap, env, name, closure);
                Ok(Value::Nil)
            }
            _ => Err(Error::syntax("`define` target must be a symbol or a function signature")),
        }
    }

    fn eval_set_pair(&mut self, form: Builtin, args: &[Value], env: HeapId) -> EvalResult<Value> {
        expect_form_arity(form, args, 2)?;
        let target = self.eval(args[0], env)?;
        let value = self.eval(args[1], env)?;
        if let Value::Ref(id) = target
            && let HeapData::Pair(pair) = self.heap.get_mut(id)
        {
            if form == Builtin::SetCar {
                pair.car = value;
            } else {
                pair.cdr = value;
            }
            return Ok(Value::Nil);
        }
        Err(Error::runtime(format!(
            "`{form}` expects a pair, got {}",
            target.kind_name(self.heap)
        )))
    }

    /// Flattens a proper list whose elements must all be symbols.
    fn symbol_list(&self, list: Value, what: &str) -> EvalResult<Vec<SymbolId>> {
        let Ok(exprs) = self.expr_list(list) else {
            return Err(Error::syntax(format!("{what} must be a proper list of symbols")));
        };
        exprs
            .into_iter()
            .map(|expr| match expr {
                Value::Symbol(name) => Ok(name),
                _ => Err(Error::syntax(format!("{what} must contain only symbols"))),
            })
            .collect()
    }

    fn param_names(&self, params: Value) -> EvalResult<SmallVec<[SymbolId; 4]>> {
        Ok(self
            .symbol_list(params, "a `lambda` parameter list")?
            .into_iter()
            .collect())
    }

    fn make_closure(&mut self, params: SmallVec<[SymbolId; 4]>, body: &[Value], env: HeapId) -> EvalResult<Value> {
        debug_assert!(!body.is_empty(), "callers reject empty bodies");
        let closure = Closure {
            params,
            body: body.iter().copied().collect(),
            env,
        };
        Ok(Value::Ref(self.heap.allocate(HeapData::Closure(closure))))
    }

    /// Applies a closure to already-evaluated arguments: exact arity, a fresh
    /// frame extending the *captured* environment, body expressions in order,
    /// last value returned.
    fn apply_closure(&mut self, closure_id: HeapId, args: Vec<Value>) -> EvalResult<Value> {
        let HeapData::Closure(closure) = self.heap.get(closure_id) else {
            unreachable!("apply_closure called on a non-closure")
        };
        let params = closure.params.clone();
        let body = closure.body.clone();
        let captured = closure.env;

        if args.len() != params.len() {
            return Err(Error::runtime(format!(
                "procedure expects {} argument{}, got {}",
                params.len(),
                plural(params.len()),
                args.len()
            )));
        }
        let mut bindings = Bindings::default();
        for (param, arg) in params.iter().zip(args) {
            bindings.insert(*param, arg);
        }
        let call_env = env::extend(self.heap, captured, bindings);

        let (last, leading) = body.split_last().expect("closure body is never empty");
        for expr in leading {
            self.eval(*expr, call_env)?;
        }
        self.eval(*last, call_env)
    }
}

fn expect_form_arity(form: Builtin, args: &[Value], expected: usize) -> EvalResult<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(Error::syntax(format!(
            "`{form}` needs exactly {expected} argument{}, got {}",
            plural(expected),
            args.len()
        )))
    }
}
