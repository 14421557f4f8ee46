// ABOUTME: Tree-walking evaluator: apply/eval, special forms, macro expansion, quasiquote

use crate::argspec::{list_to_vec, match_args, vec_to_list};
use crate::env;
use crate::error::{LispError, LispResult};
use crate::heap::Heap;
use crate::value::{Data, LambdaKind, Value};

/// Evaluates `expr` against `scope`. Integers, strings, builtins, lambdas and
/// scopes are self-evaluating; symbols resolve through the scope chain; lists
/// are function application or (uniformly) a special form (§4.6).
pub fn eval(heap: &mut Heap, scope: Value, expr: Value) -> LispResult<Value> {
    match expr.data() {
        Data::Int(_) | Data::Str(_) | Data::Builtin { .. } | Data::Lambda { .. } | Data::Scope { .. } => {
            Ok(expr)
        }
        Data::Symbol(name) => {
            let name = name.to_string();
            env::lookup(scope, &name)
        }
        Data::Pair { .. } => {
            if expr == heap.nil() {
                return Ok(heap.nil());
            }
            let (head, rest) = expr.pair().unwrap();
            let callable = eval(heap, scope, head)?;
            apply_form(heap, scope, callable, rest)
        }
    }
}

/// Evaluates every element of `args` and rebuilds the list, preserving order.
fn eval_list(heap: &mut Heap, scope: Value, args: Value) -> LispResult<Value> {
    let nil = heap.nil();
    let forms = list_to_vec(args, nil);
    let mut evaluated = Vec::with_capacity(forms.len());
    for form in forms {
        evaluated.push(eval(heap, scope, form)?);
    }
    Ok(vec_to_list(heap, &evaluated))
}

/// Resolves whether `callable` evaluates its arguments, evaluates them if so,
/// calls it, and (for macros) re-evaluates the expansion in the caller's scope.
fn apply_form(heap: &mut Heap, scope: Value, callable: Value, raw_args: Value) -> LispResult<Value> {
    let (eval_args, is_macro) = match callable.data() {
        Data::Builtin { eval_args, .. } => (*eval_args, false),
        Data::Lambda { kind, .. } => (*kind == LambdaKind::Function, *kind == LambdaKind::Macro),
        _ => return Err(LispError::not_callable(callable.type_name())),
    };

    let args = if eval_args {
        eval_list(heap, scope, raw_args)?
    } else {
        raw_args
    };

    let result = apply(heap, scope, callable, args)?;

    if is_macro {
        eval(heap, scope, result)
    } else {
        Ok(result)
    }
}

/// Calls a builtin or lambda with already-resolved arguments (evaluated, or
/// the raw unevaluated forms for a macro/special form).
pub fn apply(heap: &mut Heap, caller_scope: Value, callable: Value, args: Value) -> LispResult<Value> {
    match *callable.data() {
        Data::Builtin { func, .. } => func(heap, caller_scope, args),
        Data::Lambda { ref params, body, scope: captured, .. } => {
            let params = params.clone();
            let child = env::with_parent(heap, captured);
            let nil = heap.nil();
            let arg_vals = list_to_vec(args, nil);
            if arg_vals.len() < params.len() {
                return Err(LispError::arity_too_few("lambda", params.len().to_string(), arg_vals.len()));
            }
            if arg_vals.len() > params.len() {
                return Err(LispError::arity_too_many("lambda", params.len().to_string(), arg_vals.len()));
            }
            for (param, value) in params.iter().zip(arg_vals.iter()) {
                let name = param.as_symbol().expect("lambda params are always symbols");
                env::define(child, name, *value);
            }
            progn(heap, child, body)
        }
        _ => Err(LispError::not_callable(callable.type_name())),
    }
}

/// Evaluates each element of `body` in order, returning the last result.
/// Empty progn returns nil.
pub fn progn(heap: &mut Heap, scope: Value, body: Value) -> LispResult<Value> {
    let mut result = heap.nil();
    let mut cursor = body;
    while cursor != heap.nil() {
        match cursor.pair() {
            Some((item, rest)) => {
                result = eval(heap, scope, item)?;
                cursor = rest;
            }
            None => break,
        }
    }
    Ok(result)
}

/// Walks `expr`, replacing every cons cell whose head is `unquote` with the
/// result of evaluating that whole `(unquote x)` form; everything else is
/// copied into a fresh tree (the non-destructive variant recommended by §9).
fn quasiquote(heap: &mut Heap, scope: Value, expr: Value) -> LispResult<Value> {
    if expr == heap.nil() || !expr.is_pair() {
        return Ok(expr);
    }
    let (head, rest) = expr.pair().unwrap();
    if let Data::Symbol(name) = head.data() {
        if &**name == "unquote" {
            return eval(heap, scope, expr);
        }
    }
    let new_head = quasiquote(heap, scope, head)?;
    let new_rest = quasiquote(heap, scope, rest)?;
    Ok(heap.alloc_pair(new_head, new_rest))
}

fn truthy(v: Value) -> bool {
    matches!(v.as_int(), Some(n) if n != 0)
}

// ===== Special forms, implemented as eval_args=false builtins (§9) =====

fn sf_quote(heap: &mut Heap, _scope: Value, args: Value) -> LispResult<Value> {
    let m = match_args(heap, "quote", "*", args)?;
    Ok(m[0].value())
}

fn sf_unquote(heap: &mut Heap, scope: Value, args: Value) -> LispResult<Value> {
    let m = match_args(heap, "unquote", "*", args)?;
    eval(heap, scope, m[0].value())
}

fn sf_quasiquote(heap: &mut Heap, scope: Value, args: Value) -> LispResult<Value> {
    let m = match_args(heap, "quasiquote", "*", args)?;
    quasiquote(heap, scope, m[0].value())
}

fn make_lambda(heap: &mut Heap, scope: Value, args: Value, kind: LambdaKind, name: &str) -> LispResult<Value> {
    let m = match_args(heap, name, "lR", args)?;
    let nil = heap.nil();
    let param_values = list_to_vec(m[0].value(), nil);
    for p in &param_values {
        if p.as_symbol().is_none() {
            return Err(LispError::type_error(name, "symbol", p.type_name()));
        }
    }
    let body = m[1].value();
    Ok(heap.alloc_lambda(param_values, body, scope, kind))
}

fn sf_lambda(heap: &mut Heap, scope: Value, args: Value) -> LispResult<Value> {
    make_lambda(heap, scope, args, LambdaKind::Function, "lambda")
}

fn sf_macro(heap: &mut Heap, scope: Value, args: Value) -> LispResult<Value> {
    make_lambda(heap, scope, args, LambdaKind::Macro, "macro")
}

fn sf_define(heap: &mut Heap, scope: Value, args: Value) -> LispResult<Value> {
    let m = match_args(heap, "define", "s*", args)?;
    let name = m[0].value();
    let value = eval(heap, scope, m[1].value())?;
    let name_str = name.as_symbol().unwrap().to_string();
    env::define(scope, &name_str, value);
    Ok(value)
}

fn sf_if(heap: &mut Heap, scope: Value, args: Value) -> LispResult<Value> {
    let nil = heap.nil();
    let forms = list_to_vec(args, nil);
    if forms.len() < 2 {
        return Err(LispError::arity_too_few("if", "2-3", forms.len()));
    }
    if forms.len() > 3 {
        return Err(LispError::arity_too_many("if", "2-3", forms.len()));
    }
    let cond = eval(heap, scope, forms[0])?;
    if truthy(cond) {
        eval(heap, scope, forms[1])
    } else if forms.len() == 3 {
        eval(heap, scope, forms[2])
    } else {
        Ok(nil)
    }
}

fn sf_progn(heap: &mut Heap, scope: Value, args: Value) -> LispResult<Value> {
    progn(heap, scope, args)
}

/// Binds the special-form names onto `scope` (§4.6: "special forms are
/// builtins with a do-not-evaluate-args flag", not branches in the evaluator).
pub fn install_special_forms(heap: &mut Heap, scope: Value) {
    let mut bind = |name: &'static str, func: crate::value::BuiltinFn| {
        let v = heap.alloc_builtin(name, func, false);
        env::define(scope, name, v);
    };
    bind("quote", sf_quote);
    bind("unquote", sf_unquote);
    bind("quasiquote", sf_quasiquote);
    bind("lambda", sf_lambda);
    bind("macro", sf_macro);
    bind("define", sf_define);
    bind("if", sf_if);
    bind("progn", sf_progn);
}
