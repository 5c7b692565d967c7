//! Strict numeric module AST
//!
//! This module defines the target-dialect statements and expressions the
//! emitter lowers to, together with their text rendering. Rendering is
//! deterministic: the same tree always prints byte-identically, so
//! compilation results are cacheable and testable by exact string
//! comparison.
//!
//! Expressions print with precedence-aware parenthesization so the
//! output reads like hand-written code (`+fib(x - 1.) + +fib(x - 2.)`,
//! not `(+fib((x - 1.)) + +fib((x - 2.)))`).

use std::fmt;

/// Name of the emitted module factory
pub const MODULE_FACTORY_NAME: &str = "Teleidoscope";

/// Binary operators of the target dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsBinOp {
    Lt,
    Add,
    Sub,
    Mul,
    Ne,
    Eq,
}

impl JsBinOp {
    fn symbol(self) -> &'static str {
        match self {
            JsBinOp::Lt => "<",
            JsBinOp::Add => "+",
            JsBinOp::Sub => "-",
            JsBinOp::Mul => "*",
            JsBinOp::Ne => "!=",
            JsBinOp::Eq => "==",
        }
    }

    fn precedence(self) -> u8 {
        match self {
            JsBinOp::Lt | JsBinOp::Ne | JsBinOp::Eq => 10,
            JsBinOp::Add | JsBinOp::Sub => 20,
            JsBinOp::Mul => 40,
        }
    }
}

/// Target-dialect expressions
#[derive(Debug, Clone, PartialEq)]
pub enum JsExpr {
    /// Double literal; integral values print with a trailing dot (`40.`)
    Double(f64),

    /// Identifier reference
    Ident(String),

    /// Binary operation
    Binary {
        op: JsBinOp,
        left: Box<JsExpr>,
        right: Box<JsExpr>,
    },

    /// Coercion to double: `+expr`
    CoerceDouble(Box<JsExpr>),

    /// Truncating coercion to int: `~~expr`
    CoerceInt(Box<JsExpr>),

    /// Logical negation of an int: `!expr`
    Not(Box<JsExpr>),

    /// Function call
    Call { callee: String, args: Vec<JsExpr> },
}

/// Format a double literal. The dialect requires double literals to be
/// syntactically distinguishable from int literals, so integral values
/// keep a trailing dot.
pub fn format_double(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{}.", value)
    } else {
        format!("{}", value)
    }
}

const UNARY_PRECEDENCE: u8 = 100;
const ATOM_PRECEDENCE: u8 = 255;

impl JsExpr {
    fn precedence(&self) -> u8 {
        match self {
            JsExpr::Binary { op, .. } => op.precedence(),
            JsExpr::CoerceDouble(_) | JsExpr::CoerceInt(_) | JsExpr::Not(_) => UNARY_PRECEDENCE,
            JsExpr::Double(_) | JsExpr::Ident(_) | JsExpr::Call { .. } => ATOM_PRECEDENCE,
        }
    }

    /// Render with the precedence of the enclosing context. `is_right`
    /// is set for the right operand of a (left-associative) binary
    /// operator, where an equal-precedence child still needs parens.
    fn fmt_prec(&self, f: &mut fmt::Formatter<'_>, parent: u8, is_right: bool) -> fmt::Result {
        let prec = self.precedence();
        let needs_parens = match self {
            JsExpr::Binary { .. } => prec < parent || (is_right && prec == parent),
            _ => false,
        };

        if needs_parens {
            write!(f, "(")?;
        }
        match self {
            JsExpr::Double(value) => write!(f, "{}", format_double(*value))?,
            JsExpr::Ident(name) => write!(f, "{}", name)?,
            JsExpr::Binary { op, left, right } => {
                left.fmt_prec(f, op.precedence(), false)?;
                write!(f, " {} ", op.symbol())?;
                right.fmt_prec(f, op.precedence(), true)?;
            }
            JsExpr::CoerceDouble(operand) => {
                write!(f, "+")?;
                operand.fmt_prec(f, UNARY_PRECEDENCE, false)?;
            }
            JsExpr::CoerceInt(operand) => {
                write!(f, "~~")?;
                operand.fmt_prec(f, UNARY_PRECEDENCE, false)?;
            }
            JsExpr::Not(operand) => {
                write!(f, "!")?;
                operand.fmt_prec(f, UNARY_PRECEDENCE, false)?;
            }
            JsExpr::Call { callee, args } => {
                write!(f, "{}(", callee)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    arg.fmt_prec(f, 0, false)?;
                }
                write!(f, ")")?;
            }
        }
        if needs_parens {
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl fmt::Display for JsExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_prec(f, 0, false)
    }
}

/// Target-dialect statements
#[derive(Debug, Clone, PartialEq)]
pub enum JsStmt {
    /// Expression statement
    Expr(JsExpr),

    /// Assignment to a parameter or local
    Assign { target: String, value: JsExpr },

    /// Return with a value. Functions that return nothing simply have
    /// no return statement.
    Return(JsExpr),

    /// If statement; `else_branch` may be empty
    If {
        condition: JsExpr,
        then_branch: Vec<JsStmt>,
        else_branch: Vec<JsStmt>,
    },

    /// Unconditional loop: `for (;;) { ... }`. The body carries the
    /// continue test and the step.
    Loop { body: Vec<JsStmt> },

    Break,
}

impl JsStmt {
    /// Simple statements render on one line without braces
    fn is_simple(&self) -> bool {
        matches!(
            self,
            JsStmt::Expr(_) | JsStmt::Assign { .. } | JsStmt::Return(_) | JsStmt::Break
        )
    }

    fn fmt_simple(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsStmt::Expr(expr) => write!(f, "{};", expr),
            JsStmt::Assign { target, value } => write!(f, "{} = {};", target, value),
            JsStmt::Return(expr) => write!(f, "return {};", expr),
            JsStmt::Break => write!(f, "break;"),
            _ => unreachable!("fmt_simple() is only called on simple statements"),
        }
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let pad = "  ".repeat(indent);
        match self {
            _ if self.is_simple() => {
                write!(f, "{}", pad)?;
                self.fmt_simple(f)?;
                writeln!(f)
            }
            JsStmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                // Single simple branches keep the compact one-line form
                let compact = then_branch.len() == 1
                    && then_branch[0].is_simple()
                    && (else_branch.is_empty()
                        || (else_branch.len() == 1 && else_branch[0].is_simple()));

                if compact {
                    write!(f, "{}if ({}) ", pad, condition)?;
                    then_branch[0].fmt_simple(f)?;
                    if let Some(else_stmt) = else_branch.first() {
                        write!(f, " else ")?;
                        else_stmt.fmt_simple(f)?;
                    }
                    writeln!(f)
                } else {
                    writeln!(f, "{}if ({}) {{", pad, condition)?;
                    for stmt in then_branch {
                        stmt.fmt_indented(f, indent + 1)?;
                    }
                    if else_branch.is_empty() {
                        writeln!(f, "{}}}", pad)
                    } else {
                        writeln!(f, "{}}} else {{", pad)?;
                        for stmt in else_branch {
                            stmt.fmt_indented(f, indent + 1)?;
                        }
                        writeln!(f, "{}}}", pad)
                    }
                }
            }
            JsStmt::Loop { body } => {
                writeln!(f, "{}for (;;) {{", pad)?;
                for stmt in body {
                    stmt.fmt_indented(f, indent + 1)?;
                }
                writeln!(f, "{}}}", pad)
            }
            _ => unreachable!("all statement variants are covered"),
        }
    }
}

/// Where a pulled-out import binding comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportSource {
    /// `var name = stdlib.name;`
    Stdlib,

    /// `var name = stdlib.Math.name;`
    StdlibMath,

    /// `var name = foreign.name;`
    Foreign,
}

/// A pulled-out import binding, named identically to its source name
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub name: String,
    pub source: ImportSource,
}

impl fmt::Display for ImportDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.source {
            ImportSource::Stdlib => write!(f, "var {} = stdlib.{};", self.name, self.name),
            ImportSource::StdlibMath => {
                write!(f, "var {} = stdlib.Math.{};", self.name, self.name)
            }
            ImportSource::Foreign => write!(f, "var {} = foreign.{};", self.name, self.name),
        }
    }
}

/// An emitted function: parameters are re-annotated to double on entry,
/// locals are declared before any other statement, as the dialect
/// requires.
#[derive(Debug, Clone, PartialEq)]
pub struct JsFunction {
    pub name: String,
    pub params: Vec<String>,
    pub locals: Vec<String>,
    pub body: Vec<JsStmt>,
}

impl fmt::Display for JsFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  function {}({}) {{", self.name, self.params.join(", "))?;
        for param in &self.params {
            writeln!(f, "    {} = +{};", param, param)?;
        }
        for local in &self.locals {
            writeln!(f, "    var {} = 0.;", local)?;
        }
        for stmt in &self.body {
            stmt.fmt_indented(f, 2)?;
        }
        write!(f, "  }}")
    }
}

/// The complete emitted module
#[derive(Debug, Clone, PartialEq)]
pub struct JsModule {
    pub imports: Vec<ImportDecl>,
    pub functions: Vec<JsFunction>,
    pub entry: String,
}

impl JsModule {
    /// True if the module pulls anything out of the `foreign` import
    pub fn uses_foreign(&self) -> bool {
        self.imports
            .iter()
            .any(|import| import.source == ImportSource::Foreign)
    }
}

impl fmt::Display for JsModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "function {}(stdlib, foreign, heap) {{",
            MODULE_FACTORY_NAME
        )?;
        writeln!(f, "  \"use asm\";")?;

        if !self.imports.is_empty() {
            writeln!(f)?;
            for import in &self.imports {
                writeln!(f, "  {}", import)?;
            }
        }

        for function in &self.functions {
            writeln!(f)?;
            writeln!(f, "{}", function)?;
        }

        writeln!(f)?;
        writeln!(f, "  return {{ main: {} }};", self.entry)?;
        writeln!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_double() {
        assert_eq!(format_double(40.0), "40.");
        assert_eq!(format_double(1.0), "1.");
        assert_eq!(format_double(0.0), "0.");
        assert_eq!(format_double(0.4), "0.4");
        assert_eq!(format_double(1.5), "1.5");
    }

    #[test]
    fn test_expr_precedence_rendering() {
        // (a + b) * c needs parens on the left
        let expr = JsExpr::Binary {
            op: JsBinOp::Mul,
            left: Box::new(JsExpr::Binary {
                op: JsBinOp::Add,
                left: Box::new(JsExpr::Ident("a".to_string())),
                right: Box::new(JsExpr::Ident("b".to_string())),
            }),
            right: Box::new(JsExpr::Ident("c".to_string())),
        };
        assert_eq!(expr.to_string(), "(a + b) * c");

        // a + b * c does not
        let expr = JsExpr::Binary {
            op: JsBinOp::Add,
            left: Box::new(JsExpr::Ident("a".to_string())),
            right: Box::new(JsExpr::Binary {
                op: JsBinOp::Mul,
                left: Box::new(JsExpr::Ident("b".to_string())),
                right: Box::new(JsExpr::Ident("c".to_string())),
            }),
        };
        assert_eq!(expr.to_string(), "a + b * c");
    }

    #[test]
    fn test_left_associative_right_operand() {
        // a - (b - c) keeps parens on the right
        let expr = JsExpr::Binary {
            op: JsBinOp::Sub,
            left: Box::new(JsExpr::Ident("a".to_string())),
            right: Box::new(JsExpr::Binary {
                op: JsBinOp::Sub,
                left: Box::new(JsExpr::Ident("b".to_string())),
                right: Box::new(JsExpr::Ident("c".to_string())),
            }),
        };
        assert_eq!(expr.to_string(), "a - (b - c)");
    }

    #[test]
    fn test_coercion_rendering() {
        let call = JsExpr::CoerceDouble(Box::new(JsExpr::Call {
            callee: "fib".to_string(),
            args: vec![JsExpr::Binary {
                op: JsBinOp::Sub,
                left: Box::new(JsExpr::Ident("x".to_string())),
                right: Box::new(JsExpr::Double(1.0)),
            }],
        }));
        assert_eq!(call.to_string(), "+fib(x - 1.)");

        let comparison = JsExpr::CoerceDouble(Box::new(JsExpr::Binary {
            op: JsBinOp::Lt,
            left: Box::new(JsExpr::Ident("a".to_string())),
            right: Box::new(JsExpr::Ident("b".to_string())),
        }));
        assert_eq!(comparison.to_string(), "+(a < b)");

        let truncated = JsExpr::Not(Box::new(JsExpr::CoerceInt(Box::new(JsExpr::Binary {
            op: JsBinOp::Sub,
            left: Box::new(JsExpr::Ident("n".to_string())),
            right: Box::new(JsExpr::Ident("i".to_string())),
        }))));
        assert_eq!(truncated.to_string(), "!~~(n - i)");
    }

    #[test]
    fn test_compact_if_rendering() {
        let stmt = JsStmt::If {
            condition: JsExpr::Binary {
                op: JsBinOp::Lt,
                left: Box::new(JsExpr::Ident("x".to_string())),
                right: Box::new(JsExpr::Double(3.0)),
            },
            then_branch: vec![JsStmt::Return(JsExpr::Double(1.0))],
            else_branch: vec![JsStmt::Return(JsExpr::Double(2.0))],
        };
        let function = JsFunction {
            name: "f".to_string(),
            params: vec!["x".to_string()],
            locals: vec![],
            body: vec![stmt],
        };
        assert_eq!(
            function.to_string(),
            "  function f(x) {\n    x = +x;\n    if (x < 3.) return 1.; else return 2.;\n  }"
        );
    }

    #[test]
    fn test_import_rendering() {
        let import = ImportDecl {
            name: "sin".to_string(),
            source: ImportSource::StdlibMath,
        };
        assert_eq!(import.to_string(), "var sin = stdlib.Math.sin;");

        let import = ImportDecl {
            name: "Infinity".to_string(),
            source: ImportSource::Stdlib,
        };
        assert_eq!(import.to_string(), "var Infinity = stdlib.Infinity;");

        let import = ImportDecl {
            name: "putchar".to_string(),
            source: ImportSource::Foreign,
        };
        assert_eq!(import.to_string(), "var putchar = foreign.putchar;");
    }
}
