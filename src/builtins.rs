// ABOUTME: The fixed builtin set bound into every default scope (§4.7)

use crate::argspec::{list_to_vec, match_args, vec_to_list};
use crate::env;
use crate::error::{LispError, LispResult};
use crate::eval::{apply, eval as eval_form};
use crate::heap::Heap;
use crate::value::Value;

fn bind(heap: &mut Heap, scope: Value, name: &'static str, func: crate::value::BuiltinFn) {
    let v = heap.alloc_builtin(name, func, true);
    env::define(scope, name, v);
}

/// Populates `scope` with every builtin named in the embedder surface, minus
/// the special forms (`quote`, `lambda`, …) which `eval::install_special_forms`
/// already bound.
pub fn install(heap: &mut Heap, scope: Value) {
    bind(heap, scope, "car", car);
    bind(heap, scope, "cdr", cdr);
    bind(heap, scope, "cons", cons);
    bind(heap, scope, "+", add);
    bind(heap, scope, "-", sub);
    bind(heap, scope, "*", mul);
    bind(heap, scope, "/", div);
    bind(heap, scope, "==", num_eq);
    bind(heap, scope, "=", num_eq);
    bind(heap, scope, "<", lt);
    bind(heap, scope, "<=", le);
    bind(heap, scope, ">", gt);
    bind(heap, scope, ">=", ge);
    bind(heap, scope, "null?", is_null);
    bind(heap, scope, "eq?", eq);
    bind(heap, scope, "map", map);
    bind(heap, scope, "reduce", reduce);
    bind(heap, scope, "print", print);
    bind(heap, scope, "dump-stack", dump_stack);
    bind(heap, scope, "eval", eval_builtin);
}

fn car(heap: &mut Heap, _scope: Value, args: Value) -> LispResult<Value> {
    let m = match_args(heap, "car", "l", args)?;
    let v = m[0].value();
    if v == heap.nil() {
        return Err(LispError::type_error("car", "non-nil list", "nil"));
    }
    Ok(v.pair().unwrap().0)
}

fn cdr(heap: &mut Heap, _scope: Value, args: Value) -> LispResult<Value> {
    let m = match_args(heap, "cdr", "l", args)?;
    Ok(m[0].value().pair().unwrap().1)
}

fn cons(heap: &mut Heap, _scope: Value, args: Value) -> LispResult<Value> {
    let m = match_args(heap, "cons", "**", args)?;
    Ok(heap.alloc_pair(m[0].value(), m[1].value()))
}

fn ints(heap: &mut Heap, name: &str, args: Value) -> LispResult<Vec<i64>> {
    let nil = heap.nil();
    list_to_vec(args, nil)
        .into_iter()
        .map(|v| v.as_int().ok_or_else(|| LispError::type_error(name, "integer", v.type_name())))
        .collect()
}

fn add(heap: &mut Heap, _scope: Value, args: Value) -> LispResult<Value> {
    let sum = ints(heap, "+", args)?.into_iter().sum::<i64>();
    Ok(heap.alloc_int(sum))
}

fn mul(heap: &mut Heap, _scope: Value, args: Value) -> LispResult<Value> {
    let product = ints(heap, "*", args)?.into_iter().product::<i64>();
    Ok(heap.alloc_int(product))
}

fn sub(heap: &mut Heap, _scope: Value, args: Value) -> LispResult<Value> {
    let nums = ints(heap, "-", args)?;
    let result = match nums.as_slice() {
        [] => return Err(LispError::arity_too_few("-", "at least 1", 0)),
        [only] => -only,
        [first, rest @ ..] => rest.iter().fold(*first, |a, b| a - b),
    };
    Ok(heap.alloc_int(result))
}

fn div(heap: &mut Heap, _scope: Value, args: Value) -> LispResult<Value> {
    let nums = ints(heap, "/", args)?;
    let result = match nums.as_slice() {
        [] => return Err(LispError::arity_too_few("/", "at least 1", 0)),
        [only] => {
            if *only == 0 {
                return Err(LispError::divide_by_zero("/"));
            }
            1 / only
        }
        [first, rest @ ..] => {
            let mut acc = *first;
            for n in rest {
                if *n == 0 {
                    return Err(LispError::divide_by_zero("/"));
                }
                acc /= n;
            }
            acc
        }
    };
    Ok(heap.alloc_int(result))
}

fn binary_ints(heap: &mut Heap, name: &str, args: Value) -> LispResult<(i64, i64)> {
    let m = match_args(heap, name, "dd", args)?;
    Ok((m[0].int(), m[1].int()))
}

fn bool_int(heap: &mut Heap, b: bool) -> Value {
    heap.alloc_int(if b { 1 } else { 0 })
}

fn num_eq(heap: &mut Heap, _scope: Value, args: Value) -> LispResult<Value> {
    let (a, b) = binary_ints(heap, "==", args)?;
    Ok(bool_int(heap, a == b))
}

fn lt(heap: &mut Heap, _scope: Value, args: Value) -> LispResult<Value> {
    let (a, b) = binary_ints(heap, "<", args)?;
    Ok(bool_int(heap, a < b))
}

fn le(heap: &mut Heap, _scope: Value, args: Value) -> LispResult<Value> {
    let (a, b) = binary_ints(heap, "<=", args)?;
    Ok(bool_int(heap, a <= b))
}

fn gt(heap: &mut Heap, _scope: Value, args: Value) -> LispResult<Value> {
    let (a, b) = binary_ints(heap, ">", args)?;
    Ok(bool_int(heap, a > b))
}

fn ge(heap: &mut Heap, _scope: Value, args: Value) -> LispResult<Value> {
    let (a, b) = binary_ints(heap, ">=", args)?;
    Ok(bool_int(heap, a >= b))
}

fn is_null(heap: &mut Heap, _scope: Value, args: Value) -> LispResult<Value> {
    let m = match_args(heap, "null?", "*", args)?;
    let nil = heap.nil();
    Ok(bool_int(heap, m[0].value() == nil))
}

fn eq(heap: &mut Heap, _scope: Value, args: Value) -> LispResult<Value> {
    let m = match_args(heap, "eq?", "**", args)?;
    Ok(bool_int(heap, m[0].value() == m[1].value()))
}

fn map(heap: &mut Heap, scope: Value, args: Value) -> LispResult<Value> {
    let m = match_args(heap, "map", "*R", args)?;
    let f = m[0].value();
    let nil = heap.nil();
    let lists: Vec<Value> = list_to_vec(m[1].value(), nil);
    if lists.is_empty() {
        return Err(LispError::arity_too_few("map", "at least 2", 1));
    }
    let mut cursors = lists;
    let mut out = Vec::new();
    loop {
        let mut row = Vec::with_capacity(cursors.len());
        for cursor in &mut cursors {
            match cursor.pair() {
                Some((head, tail)) if *cursor != nil => {
                    row.push(head);
                    *cursor = tail;
                }
                _ => return Ok(vec_to_list(heap, &out)),
            }
        }
        let call_args = vec_to_list(heap, &row);
        out.push(apply(heap, scope, f, call_args)?);
    }
}

fn reduce(heap: &mut Heap, scope: Value, args: Value) -> LispResult<Value> {
    let nil = heap.nil();
    let forms = list_to_vec(args, nil);
    let (f, seed, rest) = match forms.as_slice() {
        [f, list] => {
            let items = list_to_vec(*list, nil);
            if items.len() < 2 {
                return Err(LispError::arity_too_few("reduce", "at least 2", items.len()));
            }
            (*f, items[0], items[1..].to_vec())
        }
        [f, init, list] => {
            let items = list_to_vec(*list, nil);
            if items.is_empty() {
                return Err(LispError::arity_too_few("reduce", "at least 1", 0));
            }
            (*f, *init, items)
        }
        _ => {
            return Err(LispError::arity_too_few("reduce", "2-3", forms.len()));
        }
    };
    let mut acc = seed;
    for item in rest {
        let call_args = vec_to_list(heap, &[acc, item]);
        acc = apply(heap, scope, f, call_args)?;
    }
    Ok(acc)
}

fn print(heap: &mut Heap, _scope: Value, args: Value) -> LispResult<Value> {
    let nil = heap.nil();
    for v in list_to_vec(args, nil) {
        println!("{}", v.to_display_string(nil));
    }
    Ok(nil)
}

fn dump_stack(heap: &mut Heap, _scope: Value, _args: Value) -> LispResult<Value> {
    eprintln!("<no call-stack diagnostic available>");
    Ok(heap.nil())
}

fn eval_builtin(heap: &mut Heap, scope: Value, args: Value) -> LispResult<Value> {
    let m = match_args(heap, "eval", "*", args)?;
    eval_form(heap, scope, m[0].value())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::install_special_forms;
    use crate::reader;

    fn run(src: &str) -> (Value, Heap) {
        let mut heap = Heap::new();
        let scope = env::new_root(&mut heap);
        install_special_forms(&mut heap, scope);
        install(&mut heap, scope);
        let form = reader::parse_progn(&mut heap, src).unwrap();
        let v = eval_form(&mut heap, scope, form).unwrap();
        (v, heap)
    }

    #[test]
    fn reduce_two_arg_uses_first_as_seed() {
        let (v, _heap) = run("(reduce + '(1 2 3 4))");
        assert_eq!(v.as_int(), Some(10));
    }

    #[test]
    fn reduce_three_arg_uses_explicit_init() {
        let (v, _heap) = run("(reduce + 10 '(1 2 3 4))");
        assert_eq!(v.as_int(), Some(20));
    }

    #[test]
    fn reduce_two_arg_single_element_is_arity_error() {
        let mut heap = Heap::new();
        let scope = env::new_root(&mut heap);
        install_special_forms(&mut heap, scope);
        install(&mut heap, scope);
        let form = reader::parse_progn(&mut heap, "(reduce + '(1))").unwrap();
        let err = eval_form(&mut heap, scope, form).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::ArityTooFew);
    }

    #[test]
    fn divide_by_zero_is_reported() {
        let mut heap = Heap::new();
        let scope = env::new_root(&mut heap);
        install_special_forms(&mut heap, scope);
        install(&mut heap, scope);
        let form = reader::parse_progn(&mut heap, "(/ 1 0)").unwrap();
        let err = eval_form(&mut heap, scope, form).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::DivideByZero);
    }

    #[test]
    fn map_applies_over_parallel_lists() {
        let (v, heap) = run("(map (lambda (x) (* x x)) '(1 2 3))");
        assert_eq!(v.to_display_string(heap.nil()), "(1 4 9)");
    }

    #[test]
    fn eq_is_identity_not_value_equality() {
        let (v, _heap) = run("(eq? 1 1)");
        // Two freshly-allocated integer literals are distinct allocations.
        assert_eq!(v.as_int(), Some(0));
        let (v, _heap) = run("(== 1 1)");
        assert_eq!(v.as_int(), Some(1));
    }

    #[test]
    fn null_is_true_only_for_nil() {
        let (v, _heap) = run("(null? '())");
        assert_eq!(v.as_int(), Some(1));
        let (v, _heap) = run("(null? 1)");
        assert_eq!(v.as_int(), Some(0));
    }

    #[test]
    fn cdr_of_nil_returns_nil() {
        let (v, heap) = run("(cdr '())");
        assert_eq!(v, heap.nil());
    }
}
