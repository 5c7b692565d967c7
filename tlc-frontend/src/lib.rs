//! Teleidoscope Compiler - Frontend
//!
//! This crate provides the frontend components for the Teleidoscope
//! compiler:
//! - Lexer: tokenizes Teleidoscope source code
//! - Parser: builds AST from tokens
//! - AST: abstract syntax tree definitions

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::{
    BinaryOp, Expression, ExpressionKind, Function, NodeId, NodeIdGenerator, Program, Prototype,
    TopLevelItem,
};
pub use lexer::{Lexer, Token, TokenType};
pub use parser::{ParseError, Parser};

use tlc_common::CompilerError;

/// High-level frontend interface
pub struct Frontend;

impl Frontend {
    /// Parse Teleidoscope source code into an AST
    pub fn parse_source(source: &str) -> Result<Program, CompilerError> {
        // Tokenize
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize()?;

        // Parse
        let mut parser = Parser::new(tokens);
        parser.parse_program()
    }

    /// Tokenize source code (for debugging)
    pub fn tokenize_source(source: &str) -> Result<Vec<Token>, CompilerError> {
        let mut lexer = Lexer::new(source);
        lexer.tokenize()
    }
}
