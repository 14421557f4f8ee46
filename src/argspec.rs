// ABOUTME: Declarative argument-matching helper shared by every builtin (§4.6)
//
// A format string of letters describes the expected argument shape:
//   d integer, l list, s symbol, S string, * any value, R "rest" (bind the
// remaining arguments as a list and stop). Arity mismatches produce
// arity-too-few/arity-too-many errors; type mismatches produce type errors.

use crate::error::LispError;
use crate::heap::Heap;
use crate::value::Value;

#[derive(Debug, Clone, Copy)]
pub enum Matched {
    Int(i64),
    List(Value),
    Symbol(Value),
    Str(Value),
    Any(Value),
    /// Remaining arguments, collected into a fresh proper list.
    Rest(Value),
}

impl Matched {
    pub fn int(&self) -> i64 {
        match self {
            Matched::Int(n) => *n,
            _ => unreachable!("argspec: matched a non-int as int"),
        }
    }
    pub fn value(&self) -> Value {
        match self {
            Matched::Int(_) => unreachable!("use Matched::int for integers"),
            Matched::List(v) | Matched::Symbol(v) | Matched::Str(v) | Matched::Any(v) | Matched::Rest(v) => *v,
        }
    }
}

/// Flattens a (possibly improper) cons chain into a `Vec<Value>`, stopping at
/// nil or at the first non-pair tail.
pub fn list_to_vec(mut list: Value, nil: Value) -> Vec<Value> {
    let mut out = Vec::new();
    while list != nil {
        match list.pair() {
            Some((left, right)) => {
                out.push(left);
                list = right;
            }
            None => break,
        }
    }
    out
}

pub fn vec_to_list(heap: &mut Heap, items: &[Value]) -> Value {
    let mut acc = heap.nil();
    for v in items.iter().rev() {
        acc = heap.alloc_pair(*v, acc);
    }
    acc
}

fn expected_description(fmt: &str) -> String {
    match fmt.find('R') {
        Some(rest_pos) => {
            if rest_pos == 0 {
                "at least 0".to_string()
            } else {
                format!("at least {rest_pos}")
            }
        }
        None => fmt.chars().count().to_string(),
    }
}

/// Matches `args` (a heap list of already-resolved argument values) against
/// `fmt`. Used uniformly by every builtin for its own argument validation.
pub fn match_args(
    heap: &mut Heap,
    function: &str,
    fmt: &str,
    args: Value,
) -> Result<Vec<Matched>, LispError> {
    let nil = heap.nil();
    let items = list_to_vec(args, nil);
    let chars: Vec<char> = fmt.chars().collect();
    let mut out = Vec::with_capacity(chars.len());
    let mut idx = 0;

    for (pos, &c) in chars.iter().enumerate() {
        if c == 'R' {
            let rest = &items[idx.min(items.len())..];
            out.push(Matched::Rest(vec_to_list(heap, rest)));
            idx = items.len();
            debug_assert_eq!(pos, chars.len() - 1, "R must be the final format letter");
            break;
        }
        let Some(&v) = items.get(idx) else {
            return Err(LispError::arity_too_few(
                function,
                expected_description(fmt),
                items.len(),
            ));
        };
        let matched = match c {
            'd' => v
                .as_int()
                .map(Matched::Int)
                .ok_or_else(|| LispError::type_error(function, "integer", v.type_name()))?,
            'l' => {
                if v.is_pair() {
                    Matched::List(v)
                } else {
                    return Err(LispError::type_error(function, "list", v.type_name()));
                }
            }
            's' => {
                if v.as_symbol().is_some() {
                    Matched::Symbol(v)
                } else {
                    return Err(LispError::type_error(function, "symbol", v.type_name()));
                }
            }
            'S' => {
                if v.as_str().is_some() {
                    Matched::Str(v)
                } else {
                    return Err(LispError::type_error(function, "string", v.type_name()));
                }
            }
            '*' => Matched::Any(v),
            other => unreachable!("unknown argspec letter '{other}'"),
        };
        out.push(matched);
        idx += 1;
    }

    if idx < items.len() {
        return Err(LispError::arity_too_many(
            function,
            expected_description(fmt),
            items.len(),
        ));
    }

    Ok(out)
}
