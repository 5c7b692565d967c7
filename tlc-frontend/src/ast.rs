//! Abstract Syntax Tree definitions for Teleidoscope
//!
//! This module defines the AST nodes that represent Teleidoscope language
//! constructs. The AST is built by the parser and consumed read-only by
//! the codegen passes: every node carries a `NodeId` so that later passes
//! can attach annotations in side tables without mutating the tree.

use serde::{Deserialize, Serialize};
use std::fmt;
use tlc_common::SourceSpan;

/// Unique identifier for AST nodes within one compilation
pub type NodeId = u32;

/// Generator for unique node IDs
#[derive(Debug, Default)]
pub struct NodeIdGenerator {
    next_id: NodeId,
}

impl NodeIdGenerator {
    pub fn new() -> Self {
        Self { next_id: 0 }
    }

    pub fn next(&mut self) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Less,
    Add,
    Sub,
    Mul,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op_str = match self {
            BinaryOp::Less => "<",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
        };
        write!(f, "{}", op_str)
    }
}

/// AST Expression node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub node_id: NodeId,
    pub kind: ExpressionKind,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExpressionKind {
    /// Number literal
    Number(f64),

    /// Variable reference
    Variable(String),

    /// Binary operation
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },

    /// Function call
    Call {
        callee: String,
        arguments: Vec<Expression>,
    },

    /// If/then/else expression
    If {
        condition: Box<Expression>,
        then_expr: Box<Expression>,
        else_expr: Box<Expression>,
    },

    /// For loop expression: `for var = start, condition [, step] in body`.
    /// The body executes with `var = start`, then the loop continues while
    /// the condition (evaluated before the step) holds. A for expression
    /// yields no value.
    For {
        var: String,
        start: Box<Expression>,
        condition: Box<Expression>,
        step: Option<Box<Expression>>,
        body: Box<Expression>,
    },
}

/// Function prototype: name and parameter names. All parameters are
/// numeric; the language has no type annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prototype {
    pub name: String,
    pub params: Vec<String>,
    pub span: SourceSpan,
}

/// Function definition: prototype plus a single body expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub prototype: Prototype,
    pub body: Expression,
    pub span: SourceSpan,
}

/// Top-level items in a program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TopLevelItem {
    /// `extern name(params)` declaration
    Extern(Prototype),

    /// `def name(params) expr` definition
    Function(Function),

    /// Top-level expression statement, sequenced into the synthesized
    /// entry function
    Expression(Expression),
}

/// A complete parsed program
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    pub items: Vec<TopLevelItem>,
}

impl Program {
    /// Iterate over the function definitions in declaration order
    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.items.iter().filter_map(|item| match item {
            TopLevelItem::Function(f) => Some(f),
            _ => None,
        })
    }

    /// Iterate over the top-level expression statements in program order
    pub fn top_level_expressions(&self) -> impl Iterator<Item = &Expression> {
        self.items.iter().filter_map(|item| match item {
            TopLevelItem::Expression(e) => Some(e),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_generator() {
        let mut generator = NodeIdGenerator::new();
        assert_eq!(generator.next(), 0);
        assert_eq!(generator.next(), 1);
        assert_eq!(generator.next(), 2);
    }

    #[test]
    fn test_binary_op_display() {
        assert_eq!(format!("{}", BinaryOp::Less), "<");
        assert_eq!(format!("{}", BinaryOp::Add), "+");
        assert_eq!(format!("{}", BinaryOp::Sub), "-");
        assert_eq!(format!("{}", BinaryOp::Mul), "*");
    }
}
