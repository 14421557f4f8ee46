// ABOUTME: Error types for reader and evaluator failures

use thiserror::Error;

/// Stable error kinds exposed to embedders, independent of the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    EndOfFile,
    FileIo,
    Type,
    ArityTooFew,
    ArityTooMany,
    NotCallable,
    UndefinedSymbol,
    DivideByZero,
    Generic,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Syntax => "syntax",
            ErrorKind::EndOfFile => "end-of-file",
            ErrorKind::FileIo => "file-I/O",
            ErrorKind::Type => "type",
            ErrorKind::ArityTooFew => "arity-too-few",
            ErrorKind::ArityTooMany => "arity-too-many",
            ErrorKind::NotCallable => "not-callable",
            ErrorKind::UndefinedSymbol => "undefined-symbol",
            ErrorKind::DivideByZero => "divide-by-zero",
            ErrorKind::Generic => "generic",
        };
        write!(f, "{s}")
    }
}

/// A single evaluator/reader error: a stable kind plus a human-readable message.
///
/// Evaluation errors never unwind through a host-stack exception; they are
/// returned as data and short-circuit the evaluator via `?`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct LispError {
    pub kind: ErrorKind,
    pub message: String,
    /// One-based source line, populated for reader errors only.
    pub line: Option<usize>,
}

impl LispError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        LispError {
            kind,
            message: message.into(),
            line: None,
        }
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax, message)
    }

    pub fn end_of_file() -> Self {
        Self::new(ErrorKind::EndOfFile, "unexpected end of input")
    }

    pub fn file_io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FileIo, message)
    }

    pub fn type_error(function: &str, expected: &str, actual: &str) -> Self {
        Self::new(
            ErrorKind::Type,
            format!("{function}: expected {expected}, got {actual}"),
        )
    }

    pub fn arity_too_few(function: &str, expected: impl Into<String>, actual: usize) -> Self {
        Self::new(
            ErrorKind::ArityTooFew,
            format!("{function}: expected {}, got {actual}", expected.into()),
        )
    }

    pub fn arity_too_many(function: &str, expected: impl Into<String>, actual: usize) -> Self {
        Self::new(
            ErrorKind::ArityTooMany,
            format!("{function}: expected {}, got {actual}", expected.into()),
        )
    }

    pub fn not_callable(actual: &str) -> Self {
        Self::new(
            ErrorKind::NotCallable,
            format!("value of type {actual} is not callable"),
        )
    }

    pub fn undefined_symbol(name: &str) -> Self {
        Self::new(
            ErrorKind::UndefinedSymbol,
            format!("undefined symbol: {name}"),
        )
    }

    pub fn divide_by_zero(function: &str) -> Self {
        Self::new(
            ErrorKind::DivideByZero,
            format!("{function}: division by zero"),
        )
    }

    pub fn generic(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Generic, message)
    }
}

pub type LispResult<T> = Result<T, LispError>;
