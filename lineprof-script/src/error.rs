//! Structured error types for lineprof scripts
//!
//! Using thiserror for automatic Display implementation.

use lineprof_common::LineNo;
use std::fmt;
use thiserror::Error;

/// Source text could not be tokenized or parsed
#[derive(Error, Debug, Clone, PartialEq)]
#[error("line {line}: SyntaxError: {message}")]
pub struct SyntaxError {
    pub line: LineNo,
    pub message: String,
}

impl SyntaxError {
    pub(crate) fn new(line: LineNo, message: impl Into<String>) -> Self {
        Self { line, message: message.into() }
    }
}

/// Built-in exception classes
///
/// The hierarchy is shallow: every kind derives from `Exception`, with
/// `ArithmeticError` and `LookupError` as the only intermediate classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExcKind {
    Exception,
    ArithmeticError,
    ZeroDivisionError,
    OverflowError,
    LookupError,
    IndexError,
    KeyError,
    ValueError,
    TypeError,
    NameError,
    AttributeError,
    ImportError,
    RuntimeError,
    RecursionError,
    AssertionError,
}

impl ExcKind {
    pub const ALL: [ExcKind; 15] = [
        ExcKind::Exception,
        ExcKind::ArithmeticError,
        ExcKind::ZeroDivisionError,
        ExcKind::OverflowError,
        ExcKind::LookupError,
        ExcKind::IndexError,
        ExcKind::KeyError,
        ExcKind::ValueError,
        ExcKind::TypeError,
        ExcKind::NameError,
        ExcKind::AttributeError,
        ExcKind::ImportError,
        ExcKind::RuntimeError,
        ExcKind::RecursionError,
        ExcKind::AssertionError,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ExcKind::Exception => "Exception",
            ExcKind::ArithmeticError => "ArithmeticError",
            ExcKind::ZeroDivisionError => "ZeroDivisionError",
            ExcKind::OverflowError => "OverflowError",
            ExcKind::LookupError => "LookupError",
            ExcKind::IndexError => "IndexError",
            ExcKind::KeyError => "KeyError",
            ExcKind::ValueError => "ValueError",
            ExcKind::TypeError => "TypeError",
            ExcKind::NameError => "NameError",
            ExcKind::AttributeError => "AttributeError",
            ExcKind::ImportError => "ImportError",
            ExcKind::RuntimeError => "RuntimeError",
            ExcKind::RecursionError => "RecursionError",
            ExcKind::AssertionError => "AssertionError",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    #[must_use]
    pub fn parent(self) -> Option<Self> {
        match self {
            ExcKind::Exception => None,
            ExcKind::ZeroDivisionError | ExcKind::OverflowError => Some(ExcKind::ArithmeticError),
            ExcKind::IndexError | ExcKind::KeyError => Some(ExcKind::LookupError),
            ExcKind::RecursionError => Some(ExcKind::RuntimeError),
            _ => Some(ExcKind::Exception),
        }
    }

    /// `issubclass(self, other)`
    #[must_use]
    pub fn is_subclass_of(self, other: Self) -> bool {
        let mut current = Some(self);
        while let Some(kind) = current {
            if kind == other {
                return true;
            }
            current = kind.parent();
        }
        false
    }
}

impl fmt::Display for ExcKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An exception instance raised by a script
#[derive(Debug, Clone, PartialEq)]
pub struct Exception {
    pub kind: ExcKind,
    pub message: String,
}

impl Exception {
    pub fn new(kind: ExcKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

/// An exception that propagated out of a statement
///
/// `line` is the innermost statement the exception passed through; it is
/// filled in once, by the first statement that sees the exception.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{exception} (line {line})")]
pub struct RuntimeError {
    pub exception: Exception,
    pub line: LineNo,
}

impl RuntimeError {
    pub fn new(kind: ExcKind, message: impl Into<String>) -> Self {
        Self { exception: Exception::new(kind, message), line: 0 }
    }

    #[must_use]
    pub fn from_exception(exception: Exception) -> Self {
        Self { exception, line: 0 }
    }

    /// Attach the statement line if none is recorded yet
    #[must_use]
    pub fn locate(mut self, line: LineNo) -> Self {
        if self.line == 0 {
            self.line = line;
        }
        self
    }

    #[must_use]
    pub fn kind(&self) -> ExcKind {
        self.exception.kind
    }
}

/// Any failure while loading or running a script
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exception_hierarchy() {
        assert!(ExcKind::ZeroDivisionError.is_subclass_of(ExcKind::ArithmeticError));
        assert!(ExcKind::KeyError.is_subclass_of(ExcKind::LookupError));
        assert!(ExcKind::RecursionError.is_subclass_of(ExcKind::Exception));
        assert!(!ExcKind::ValueError.is_subclass_of(ExcKind::LookupError));
    }

    #[test]
    fn test_runtime_error_display() {
        let err = RuntimeError::new(ExcKind::ZeroDivisionError, "division by zero").locate(3);
        assert_eq!(err.to_string(), "ZeroDivisionError: division by zero (line 3)");
    }

    #[test]
    fn test_locate_keeps_innermost_line() {
        let err = RuntimeError::new(ExcKind::ValueError, "bad").locate(7).locate(2);
        assert_eq!(err.line, 7);
    }

    #[test]
    fn test_from_name_round_trips() {
        for kind in ExcKind::ALL {
            assert_eq!(ExcKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ExcKind::from_name("NotAnError"), None);
    }
}
