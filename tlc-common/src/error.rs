//! Error handling for the Teleidoscope compiler
//!
//! This module defines the common error type used throughout the compiler.
//! All core errors are compile-time: a failed compilation yields no output
//! module, and no partially-valid module is ever emitted.

use crate::source_loc::{SourceLocation, SourceSpan};
use thiserror::Error;

/// Main compiler error type that encompasses all phases of compilation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompilerError {
    #[error("Lexical error at {location}: {message}")]
    LexError {
        location: SourceLocation,
        message: String,
    },

    #[error("Parse error at {location}: {message}")]
    ParseError {
        location: SourceLocation,
        message: String,
    },

    /// Reference to an undeclared function or variable during resolution
    #[error("Unbound name `{name}` at {span}")]
    UnboundName { name: String, span: SourceSpan },

    /// An operator or call used in a context where no valid coercion
    /// path exists
    #[error("Kind conflict at {span}: {message}")]
    KindConflict { span: SourceSpan, message: String },

    /// A call site's argument count does not match the declared
    /// parameter count
    #[error("Call to `{name}` at {span}: expected {expected} argument(s), found {found}")]
    SignatureMismatch {
        name: String,
        expected: usize,
        found: usize,
        span: SourceSpan,
    },

    /// A function or extern declared more than once
    #[error("`{name}` is declared more than once (at {span})")]
    DuplicateName { name: String, span: SourceSpan },

    #[error("IO error: {message}")]
    IoError { message: String },
}

impl CompilerError {
    /// Create a lexer error
    pub fn lexer_error(message: String, location: SourceLocation) -> Self {
        CompilerError::LexError { location, message }
    }

    /// Create a parse error
    pub fn parse_error(message: String, location: SourceLocation) -> Self {
        CompilerError::ParseError { location, message }
    }

    /// Create a kind-conflict error
    pub fn kind_conflict(message: String, span: SourceSpan) -> Self {
        CompilerError::KindConflict { span, message }
    }
}

/// Convert from std::io::Error
impl From<std::io::Error> for CompilerError {
    fn from(err: std::io::Error) -> Self {
        CompilerError::IoError {
            message: err.to_string(),
        }
    }
}
