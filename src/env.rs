// ABOUTME: Scope chain operations over heap-allocated Value::Scope objects

use crate::error::LispError;
use crate::heap::Heap;
use crate::value::{Data, Value};

/// Creates a new scope with no parent (the toplevel of a runtime).
pub fn new_root(heap: &mut Heap) -> Value {
    heap.alloc_scope(None)
}

/// Creates a new child scope whose lookups fall through to `parent`.
pub fn with_parent(heap: &mut Heap, parent: Value) -> Value {
    heap.alloc_scope(Some(parent))
}

/// Defines a binding in THIS scope (doesn't walk parent chain).
pub fn define(scope: Value, name: &str, value: Value) {
    match scope.data() {
        Data::Scope { bindings, .. } => {
            bindings.borrow_mut().insert(name.into(), value);
        }
        _ => unreachable!("define called on a non-scope value"),
    }
}

/// Looks up a symbol in this scope, then parents, recursively.
pub fn get(scope: Value, name: &str) -> Option<Value> {
    match scope.data() {
        Data::Scope { bindings, parent } => {
            if let Some(v) = bindings.borrow().get(name) {
                return Some(*v);
            }
            let parent = *parent;
            parent.and_then(|p| get(p, name))
        }
        _ => unreachable!("get called on a non-scope value"),
    }
}

/// Looks up a symbol or produces the standard `undefined-symbol` error.
pub fn lookup(scope: Value, name: &str) -> Result<Value, LispError> {
    get(scope, name).ok_or_else(|| LispError::undefined_symbol(name))
}
