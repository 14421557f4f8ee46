// ABOUTME: Embedder-facing surface bundling heap, default scope and error slot (§6)

use crate::builtins;
use crate::env;
use crate::error::{ErrorKind, LispError};
use crate::eval::{self, install_special_forms};
use crate::heap::Heap;
use crate::value::Value;

/// Owns the heap, the symbol cache (inside the heap), and the last error.
/// A `Runtime` is the unit an embedder creates once and drives to
/// completion; nothing about it is safe to share across threads.
pub struct Runtime {
    heap: Heap,
    last_error: Option<LispError>,
}

impl Runtime {
    pub fn new() -> Self {
        Runtime { heap: Heap::new(), last_error: None }
    }

    pub fn heap(&mut self) -> &mut Heap {
        &mut self.heap
    }

    pub fn nil(&self) -> Value {
        self.heap.nil()
    }

    /// A fresh scope pre-populated with the special forms and builtins of §4.6/§4.7.
    pub fn default_scope(&mut self) -> Value {
        let scope = env::new_root(&mut self.heap);
        install_special_forms(&mut self.heap, scope);
        builtins::install(&mut self.heap, scope);
        scope
    }

    pub fn parse_progn(&mut self, text: &str) -> Option<Value> {
        match crate::reader::parse_progn(&mut self.heap, text) {
            Ok(v) => Some(v),
            Err(e) => {
                self.last_error = Some(e);
                None
            }
        }
    }

    pub fn eval(&mut self, scope: Value, expr: Value) -> Option<Value> {
        match eval::eval(&mut self.heap, scope, expr) {
            Ok(v) => Some(v),
            Err(e) => {
                self.last_error = Some(e);
                None
            }
        }
    }

    /// Calls a callable directly with already-resolved arguments, bypassing the
    /// reader; useful for embedders invoking a lambda value obtained by some
    /// other means than parsing `(f args...)` text.
    pub fn apply(&mut self, scope: Value, callable: Value, args: Value) -> Option<Value> {
        match eval::apply(&mut self.heap, scope, callable, args) {
            Ok(v) => Some(v),
            Err(e) => {
                self.last_error = Some(e);
                None
            }
        }
    }

    /// Reads the whole file, parses it into one `progn`, and evaluates it.
    pub fn load_file(&mut self, scope: Value, path: &std::path::Path) -> Option<Value> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                self.last_error = Some(LispError::file_io(format!("{}: {e}", path.display())));
                return None;
            }
        };
        let form = self.parse_progn(&contents)?;
        self.eval(scope, form)
    }

    pub fn mark(&mut self, root: Value) {
        self.heap.mark(root);
    }

    pub fn sweep(&mut self) {
        self.heap.sweep();
    }

    pub fn print_error(&self) {
        if let Some(e) = &self.last_error {
            match e.line {
                Some(line) => eprintln!("{}: {} (line {line})", e.kind, e.message),
                None => eprintln!("{}: {}", e.kind, e.message),
            }
        }
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    pub fn has_error(&self) -> bool {
        self.last_error.is_some()
    }

    pub fn last_error_kind(&self) -> Option<ErrorKind> {
        self.last_error.as_ref().map(|e| e.kind)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluates_a_simple_expression() {
        let mut rt = Runtime::new();
        let scope = rt.default_scope();
        let form = rt.parse_progn("(+ 1 2)").unwrap();
        let result = rt.eval(scope, form).unwrap();
        assert_eq!(result.as_int(), Some(3));
    }

    #[test]
    fn surfaces_parse_errors_through_the_error_slot() {
        let mut rt = Runtime::new();
        assert!(rt.parse_progn("(1 2").is_none());
        assert!(rt.has_error());
    }

    #[test]
    fn mark_and_sweep_after_each_top_level_form() {
        let mut rt = Runtime::new();
        let scope = rt.default_scope();
        let define = rt.parse_progn("(define x 10)").unwrap();
        let result = rt.eval(scope, define).unwrap();
        rt.mark(scope);
        rt.mark(result);
        rt.sweep();
        let lookup = rt.parse_progn("x").unwrap();
        assert_eq!(rt.eval(scope, lookup).unwrap().as_int(), Some(10));
    }
}
