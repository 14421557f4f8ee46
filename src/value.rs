// ABOUTME: Heap-allocated value representation: tagged objects plus the GC mark/link fields

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::ptr::NonNull;

/// Tri-state mark used by the collector. `Queued` exists only so the mark
/// worklist never enqueues the same object twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Unmarked,
    Queued,
    Marked,
}

/// Ordinary lambdas evaluate their arguments before the call; macros don't,
/// and their result is re-evaluated at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LambdaKind {
    Function,
    Macro,
}

pub type BuiltinFn = fn(&mut crate::heap::Heap, Value, Value) -> crate::error::LispResult<Value>;

/// Per-variant payload. The tag (which arm is active) is the entire dispatch
/// mechanism: there is no vtable, just `match` on this enum wherever a type
/// descriptor operation (print / expand / call / free) is needed.
pub enum Data {
    Int(i64),
    Str(Box<str>),
    Symbol(Box<str>),
    Pair {
        left: Value,
        right: Value,
    },
    Lambda {
        params: Vec<Value>,
        body: Value,
        scope: Value,
        kind: LambdaKind,
    },
    Builtin {
        func: BuiltinFn,
        name: &'static str,
        /// "evaluate arguments?" — special forms are builtins with this false.
        eval_args: bool,
    },
    Scope {
        bindings: RefCell<HashMap<Box<str>, Value>>,
        parent: Option<Value>,
    },
}

/// A heap object: the GC bookkeeping fields plus the tagged payload.
pub struct Obj {
    pub mark: Cell<Mark>,
    pub next: Cell<Option<NonNull<Obj>>>,
    pub data: Data,
}

/// A handle to a heap object. Non-owning, `Copy`, and compares by identity —
/// this is what makes `eq?` pointer equality and cloning a `Value` free.
/// The `Heap` that allocated it owns the backing `Obj`; a `Value` must never
/// outlive its heap.
#[derive(Clone, Copy)]
pub struct Value(pub(crate) NonNull<Obj>);

impl Value {
    /// # Safety
    /// `ptr` must point at a live `Obj` owned by some `Heap`.
    pub(crate) unsafe fn from_raw(ptr: NonNull<Obj>) -> Self {
        Value(ptr)
    }

    pub(crate) fn obj(&self) -> &Obj {
        // SAFETY: a Value is only ever constructed from a live heap allocation,
        // and the heap never frees an object still reachable through a held Value
        // (the embedder contract: mark everything you intend to keep before sweep).
        unsafe { self.0.as_ref() }
    }

    pub fn data(&self) -> &Data {
        &self.obj().data
    }

    pub fn type_name(&self) -> &'static str {
        match self.data() {
            Data::Int(_) => "integer",
            Data::Str(_) => "string",
            Data::Symbol(_) => "symbol",
            Data::Pair { .. } => "list",
            Data::Lambda { kind: LambdaKind::Function, .. } => "lambda",
            Data::Lambda { kind: LambdaKind::Macro, .. } => "macro",
            Data::Builtin { .. } => "builtin",
            Data::Scope { .. } => "scope",
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.data() {
            Data::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.data() {
            Data::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self.data() {
            Data::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_pair(&self) -> bool {
        matches!(self.data(), Data::Pair { .. })
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.data(), Data::Lambda { .. } | Data::Builtin { .. })
    }

    /// `car`/`cdr`, valid on any pair including nil (nil's own fields are nil).
    pub fn pair(&self) -> Option<(Value, Value)> {
        match self.data() {
            Data::Pair { left, right } => Some((*left, *right)),
            _ => None,
        }
    }

    /// Direct children for GC traversal (§4.1 "expand").
    pub(crate) fn children(&self) -> Vec<Value> {
        match self.data() {
            Data::Int(_) | Data::Str(_) | Data::Symbol(_) => vec![],
            Data::Pair { left, right } => vec![*left, *right],
            Data::Lambda { params, body, scope, .. } => {
                let mut out = params.clone();
                out.push(*body);
                out.push(*scope);
                out
            }
            Data::Builtin { .. } => vec![],
            Data::Scope { bindings, parent } => {
                let mut out: Vec<Value> = bindings.borrow().values().copied().collect();
                if let Some(p) = parent {
                    out.push(*p);
                }
                out
            }
        }
    }

    /// Render in canonical, reader-compatible syntax.
    pub fn write(&self, f: &mut impl fmt::Write, nil: Value) -> fmt::Result {
        match self.data() {
            Data::Int(n) => write!(f, "{n}"),
            Data::Str(s) => write_escaped_string(f, s),
            Data::Symbol(s) => write!(f, "{s}"),
            Data::Pair { .. } => {
                if self.0 == nil.0 {
                    write!(f, "()")
                } else {
                    write_list(f, *self, nil)
                }
            }
            Data::Lambda { kind: LambdaKind::Function, .. } => write!(f, "#<lambda>"),
            Data::Lambda { kind: LambdaKind::Macro, .. } => write!(f, "#<macro>"),
            Data::Builtin { name, .. } => write!(f, "#<builtin:{name}>"),
            Data::Scope { .. } => write!(f, "#<scope>"),
        }
    }

    pub fn to_display_string(&self, nil: Value) -> String {
        let mut s = String::new();
        let _ = self.write(&mut s, nil);
        s
    }
}

fn write_escaped_string(f: &mut impl fmt::Write, s: &str) -> fmt::Result {
    write!(f, "\"")?;
    for c in s.chars() {
        match c {
            '\u{7}' => write!(f, "\\a")?,
            '\u{8}' => write!(f, "\\b")?,
            '\u{C}' => write!(f, "\\f")?,
            '\n' => write!(f, "\\n")?,
            '\r' => write!(f, "\\r")?,
            '\t' => write!(f, "\\t")?,
            '\u{B}' => write!(f, "\\v")?,
            '"' => write!(f, "\\\"")?,
            '\\' => write!(f, "\\\\")?,
            other => write!(f, "{other}")?,
        }
    }
    write!(f, "\"")
}

fn write_list(f: &mut impl fmt::Write, mut v: Value, nil: Value) -> fmt::Result {
    write!(f, "(")?;
    let mut first = true;
    loop {
        match v.pair() {
            Some((left, right)) if v.0 != nil.0 => {
                if !first {
                    write!(f, " ")?;
                }
                first = false;
                left.write(f, nil)?;
                if right.0 == nil.0 {
                    break;
                } else if right.is_pair() {
                    v = right;
                } else {
                    write!(f, " . ")?;
                    right.write(f, nil)?;
                    break;
                }
            }
            _ => break,
        }
    }
    write!(f, ")")
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl Eq for Value {}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({:p}:{})", self.0.as_ptr(), self.type_name())
    }
}
