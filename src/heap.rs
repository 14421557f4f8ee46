// ABOUTME: Intrusive-list heap and mark-sweep garbage collector

use crate::value::{BuiltinFn, Data, LambdaKind, Mark, Obj, Value};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::ptr::NonNull;

/// Owns every live value. `head` is a permanent sentinel object (the `nil`
/// value) that is never freed; `tail` is the most recently allocated object.
/// Allocation appends to the tail; sweep walks from `head` unlinking and
/// freeing unmarked successors.
pub struct Heap {
    head: NonNull<Obj>,
    tail: NonNull<Obj>,
    nil: Value,
    symbols: HashMap<Box<str>, Value>,
}

impl Heap {
    pub fn new() -> Self {
        // nil's own `left`/`right` must point at nil itself (§3), which can only
        // exist once the object has an address — allocate with a Drop-free
        // placeholder payload, then overwrite it in place without running a
        // destructor on the placeholder (Data::Int has none).
        let nil_obj = Box::new(Obj {
            mark: Cell::new(Mark::Unmarked),
            next: Cell::new(None),
            data: Data::Int(0),
        });
        let ptr = NonNull::from(Box::leak(nil_obj));
        let nil = unsafe { Value::from_raw(ptr) };
        unsafe {
            std::ptr::write(&mut (*ptr.as_ptr()).data, Data::Pair { left: nil, right: nil });
        }
        Heap {
            head: ptr,
            tail: ptr,
            nil,
            symbols: HashMap::new(),
        }
    }

    pub fn nil(&self) -> Value {
        self.nil
    }

    fn push(&mut self, data: Data) -> Value {
        let obj = Box::new(Obj {
            mark: Cell::new(Mark::Unmarked),
            next: Cell::new(None),
            data,
        });
        let ptr = NonNull::from(Box::leak(obj));
        // SAFETY: `self.tail` is always a live object owned by this heap.
        unsafe {
            self.tail.as_ref().next.set(Some(ptr));
        }
        self.tail = ptr;
        unsafe { Value::from_raw(ptr) }
    }

    pub fn alloc_int(&mut self, n: i64) -> Value {
        self.push(Data::Int(n))
    }

    pub fn alloc_str(&mut self, s: impl Into<Box<str>>) -> Value {
        self.push(Data::Str(s.into()))
    }

    pub fn alloc_pair(&mut self, left: Value, right: Value) -> Value {
        self.push(Data::Pair { left, right })
    }

    pub fn alloc_lambda(&mut self, params: Vec<Value>, body: Value, scope: Value, kind: LambdaKind) -> Value {
        self.push(Data::Lambda { params, body, scope, kind })
    }

    pub fn alloc_builtin(&mut self, name: &'static str, func: BuiltinFn, eval_args: bool) -> Value {
        self.push(Data::Builtin { func, name, eval_args })
    }

    pub fn alloc_scope(&mut self, parent: Option<Value>) -> Value {
        self.push(Data::Scope {
            bindings: RefCell::new(HashMap::new()),
            parent,
        })
    }

    /// Uninterned symbol allocation; prefer [`Heap::symbol`] for normal use (§4.3).
    pub fn alloc_symbol_uninterned(&mut self, name: &str) -> Value {
        self.push(Data::Symbol(name.into()))
    }

    /// Interning entry point: equal names share one heap value.
    pub fn symbol(&mut self, name: &str) -> Value {
        if let Some(v) = self.symbols.get(name) {
            return *v;
        }
        let v = self.alloc_symbol_uninterned(name);
        self.symbols.insert(name.into(), v);
        v
    }

    /// Iteratively mark everything reachable from `root`, using an explicit
    /// worklist so deep structures can't overflow the host stack (§3, §4.2).
    ///
    /// Interned symbols are always seeded as extra roots: the symbol cache
    /// keeps handing out the same `Value` for a given name for the life of
    /// the heap, so a cached symbol must never be swept out from under it.
    pub fn mark(&mut self, root: Value) {
        let mut worklist: Vec<Value> = self.symbols.values().copied().collect();
        worklist.push(root);
        for v in &worklist {
            v.obj().mark.set(Mark::Queued);
        }
        while let Some(v) = worklist.pop() {
            v.obj().mark.set(Mark::Marked);
            for child in v.children() {
                if child.obj().mark.get() == Mark::Unmarked {
                    child.obj().mark.set(Mark::Queued);
                    worklist.push(child);
                }
            }
        }
    }

    /// Free everything not reached by a prior call to [`Heap::mark`]; reset
    /// survivors back to unmarked (§4.2).
    pub fn sweep(&mut self) {
        // nil (head) is never freed and never participates in the mark bits.
        let mut prev = self.head;
        let mut cursor = unsafe { prev.as_ref().next.get() };
        while let Some(node) = cursor {
            let next = unsafe { node.as_ref().next.get() };
            if unsafe { node.as_ref().mark.get() } == Mark::Marked {
                unsafe { node.as_ref().mark.set(Mark::Unmarked) };
                prev = node;
            } else {
                unsafe { prev.as_ref().next.set(next) };
                // SAFETY: `node` was allocated by `Box::into_raw`-equivalent `Box::leak`
                // in `push` and is unreachable from any root the embedder marked, so no
                // live `Value` can dereference it after this point.
                unsafe {
                    drop(Box::from_raw(node.as_ptr()));
                }
            }
            cursor = next;
        }
        self.tail = prev;
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Heap {
    fn drop(&mut self) {
        let mut cursor = unsafe { self.head.as_ref().next.get() };
        while let Some(node) = cursor {
            let next = unsafe { node.as_ref().next.get() };
            unsafe {
                drop(Box::from_raw(node.as_ptr()));
            }
            cursor = next;
        }
        unsafe {
            drop(Box::from_raw(self.head.as_ptr()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(heap: &Heap) -> usize {
        let mut n = 0;
        let mut cursor = unsafe { heap.head.as_ref().next.get() };
        while let Some(node) = cursor {
            n += 1;
            cursor = unsafe { node.as_ref().next.get() };
        }
        n
    }

    #[test]
    fn sweep_frees_unreachable_values() {
        let mut heap = Heap::new();
        let kept = heap.alloc_int(1);
        let _unreachable = heap.alloc_int(2);
        assert_eq!(count(&heap), 2);

        heap.mark(kept);
        heap.sweep();

        assert_eq!(count(&heap), 1);
    }

    #[test]
    fn sweep_without_mark_frees_everything() {
        let mut heap = Heap::new();
        heap.alloc_int(1);
        heap.alloc_int(2);
        heap.sweep();
        assert_eq!(count(&heap), 0);
    }

    #[test]
    fn mark_follows_pairs_and_scopes() {
        let mut heap = Heap::new();
        let a = heap.alloc_int(10);
        let b = heap.alloc_int(20);
        let pair = heap.alloc_pair(a, b);
        let scope = heap.alloc_scope(None);
        if let Data::Scope { bindings, .. } = scope.data() {
            bindings.borrow_mut().insert("x".into(), pair);
        }
        let garbage = heap.alloc_int(999);
        let _ = garbage;

        heap.mark(scope);
        heap.sweep();

        assert_eq!(count(&heap), 4); // scope, pair, a, b
    }

    #[test]
    fn symbols_intern() {
        let mut heap = Heap::new();
        let a = heap.symbol("foo");
        let b = heap.symbol("foo");
        assert_eq!(a, b);
        let c = heap.symbol("bar");
        assert_ne!(a, c);
    }

    #[test]
    fn nil_is_its_own_left_and_right() {
        let heap = Heap::new();
        let (left, right) = heap.nil().pair().unwrap();
        assert_eq!(left, heap.nil());
        assert_eq!(right, heap.nil());
    }
}
