//! Error types for the VectorL compiler and stack machine

use crate::diagnostics::Origin;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// VectorL errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Front end
    /// Illegal character in the source text
    ///
    /// **Triggered by:** Any character outside the token alphabet
    /// **Example:** `var int a = 1 $ 2;`
    #[error("illegal character {ch:?} at line {line}, column {column}")]
    LexError {
        /// Offending character
        ch: char,
        /// Line number (1-indexed)
        line: usize,
        /// Column number (1-indexed)
        column: usize,
    },

    /// Grammar violation
    ///
    /// **Triggered by:** Missing separators, misplaced keywords, unterminated constructs
    /// **Example:** `event foo()` (missing `;`)
    #[error("syntax error at line {line}, column {column}: {message}")]
    SyntaxError {
        /// Line number where the error occurred
        line: usize,
        /// Column number where the error occurred
        column: usize,
        /// Error description
        message: String,
    },

    // Module factory
    /// The source fetcher has no source for a module
    #[error("cannot locate source for module '{module}'")]
    ImportError {
        /// Requested module name
        module: String,
    },

    /// A module imports itself, directly or transitively
    ///
    /// **Triggered by:** `import a;` inside `b` while `a` is importing `b`
    #[error("cyclic import of module '{module}'")]
    ImportCycleError {
        /// Module whose elaboration is still in progress
        module: String,
    },

    /// A module could not be compiled; its own errors were reported separately
    #[error("compilation of module '{module}' failed")]
    CompilationFailed {
        /// Module name
        module: String,
    },

    /// Reading a source file failed for a reason other than absence
    #[error("I/O error: {0}")]
    Io(String),

    // Elaboration
    /// Unresolved or redefined name
    ///
    /// **Triggered by:** Using an undeclared identifier or binding a name twice in one scope
    /// **Example:** `var int a = b;` (no `b` in scope)
    #[error("name error: {0}")]
    NameError(String),

    /// Incompatible types, non-scalar where a scalar is required
    ///
    /// **Triggered by:** Narrowing without a cast, non-bool `if` conditions, bad emit arguments
    /// **Example:** `var bool a = true; on Init a := 1;`
    #[error("type error: {0}")]
    TypeError(String),

    /// Shapes that cannot be unified
    ///
    /// **Triggered by:** Non-broadcastable operands, bad axis, bad permutation
    /// **Example:** `var int v = [1,2]; on Init v := [1,2,3];`
    #[error("shape error: {0}")]
    ShapeError(String),

    /// A compile-time constant was required
    ///
    /// **Triggered by:** `const` declarations and variable initializers over non-constant expressions
    /// **Example:** `var int a = 0; var int b = a;`
    #[error("constant error: {0}")]
    ConstError(String),

    /// Index out of range
    ///
    /// **Triggered by:** Static out-of-range selectors, empty slices, runtime out-of-range indices
    /// **Example:** `let int b = [1,2][1,2,3];`
    #[error("index error: {0}")]
    IndexError(String),

    // Runtime
    /// An instruction failed while an event was being dispatched
    #[error("runtime failure in {event} at {op}: {reason}")]
    RuntimeFailure {
        /// Qualified name of the event being dispatched
        event: String,
        /// The instruction that raised
        op: String,
        /// Snapshot of the data stack, top last
        stack: Vec<String>,
        /// Underlying error message
        reason: String,
        /// Innermost statement being executed, if any
        origin: Option<Origin>,
    },
}

/// Error kind tag, one per taxonomy entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Illegal character
    LexError,
    /// Grammar violation
    SyntaxError,
    /// Missing module source
    ImportError,
    /// Cyclic import
    ImportCycleError,
    /// Module failed to compile
    CompilationFailed,
    /// Unresolved or duplicate name
    NameError,
    /// Type mismatch
    TypeError,
    /// Shape mismatch
    ShapeError,
    /// Required constant is not constant
    ConstError,
    /// Index out of range
    IndexError,
    /// Instruction execution failed
    RuntimeFailure,
    /// Source I/O failure
    Io,
}

impl Error {
    /// Returns the taxonomy tag of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::LexError { .. } => ErrorKind::LexError,
            Error::SyntaxError { .. } => ErrorKind::SyntaxError,
            Error::ImportError { .. } => ErrorKind::ImportError,
            Error::ImportCycleError { .. } => ErrorKind::ImportCycleError,
            Error::CompilationFailed { .. } => ErrorKind::CompilationFailed,
            Error::Io(_) => ErrorKind::Io,
            Error::NameError(_) => ErrorKind::NameError,
            Error::TypeError(_) => ErrorKind::TypeError,
            Error::ShapeError(_) => ErrorKind::ShapeError,
            Error::ConstError(_) => ErrorKind::ConstError,
            Error::IndexError(_) => ErrorKind::IndexError,
            Error::RuntimeFailure { .. } => ErrorKind::RuntimeFailure,
        }
    }

    /// Source line carried by the error itself, if any
    pub fn line(&self) -> Option<usize> {
        match self {
            Error::LexError { line, .. } | Error::SyntaxError { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// Statement a runtime failure was raised in
    pub fn origin(&self) -> Option<&Origin> {
        match self {
            Error::RuntimeFailure { origin, .. } => origin.as_ref(),
            _ => None,
        }
    }

    /// Creates a syntax error
    pub fn syntax(line: usize, column: usize, message: impl Into<String>) -> Self {
        Error::SyntaxError {
            line,
            column,
            message: message.into(),
        }
    }

    /// Creates a name error
    pub fn name(msg: impl Into<String>) -> Self {
        Error::NameError(msg.into())
    }

    /// Creates a type error
    pub fn type_error(msg: impl Into<String>) -> Self {
        Error::TypeError(msg.into())
    }

    /// Creates a shape error
    pub fn shape(msg: impl Into<String>) -> Self {
        Error::ShapeError(msg.into())
    }

    /// Creates a constant error
    pub fn constant(msg: impl Into<String>) -> Self {
        Error::ConstError(msg.into())
    }

    /// Creates an index error
    pub fn index(msg: impl Into<String>) -> Self {
        Error::IndexError(msg.into())
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Result type for VectorL operations
pub type Result<T> = std::result::Result<T, Error>;
