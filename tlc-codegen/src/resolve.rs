//! Coercion Resolver
//!
//! Walks the AST once and assigns every expression node the numeric kind
//! it naturally produces, inserting explicit coercion markers at every
//! use-site that requires a different kind. The AST itself is never
//! mutated: annotations live in side tables keyed by `NodeId`, so the
//! pass is referentially transparent and independent compilations share
//! no state.
//!
//! The resolver also performs name resolution (scoped variables, the
//! program-wide callable namespace, the builtin catalog), call-arity
//! checking, and the reachability collection that lets the emitter pull
//! only the imports a program actually uses.

use crate::builtins::{self, Builtin};
use crate::js::{ImportDecl, ImportSource};
use crate::kind::{NumericKind, ValueKind};
use crate::{CompileOptions, LoopLowering};
use std::collections::HashMap;
use tlc_common::{CompilerError, SourceSpan};
use tlc_frontend::{BinaryOp, Expression, ExpressionKind, Function, NodeId, Program, TopLevelItem};

/// What a call site dispatches to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalleeKind {
    /// A `def` in this program
    User,

    /// An `extern`-declared foreign function
    Foreign,

    /// A whitelisted `stdlib.Math` function
    Math,
}

/// Signature of a callable name
#[derive(Debug, Clone)]
pub struct CallableSig {
    pub kind: CalleeKind,
    pub arity: usize,
    pub returns_value: bool,
}

/// How one loop's continue condition is lowered. The choice is made once
/// per compiled module, not per loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStrategy {
    /// Test the source condition directly (`i < n`)
    CounterComparison,

    /// Rewrite `lhs < rhs` to the truncated difference `~~(rhs - lhs)`,
    /// looping while it is nonzero
    TruncatedDifference,
}

/// Side tables produced by the resolver
#[derive(Debug, Default)]
pub struct Annotations {
    kinds: HashMap<NodeId, ValueKind>,
    coercions: HashMap<NodeId, NumericKind>,
    callees: HashMap<NodeId, CalleeKind>,
    loop_strategies: HashMap<NodeId, LoopStrategy>,

    /// Import bindings actually referenced, in first-use order
    pub imports: Vec<ImportDecl>,

    /// All callable names: user functions and foreign externs
    pub callables: HashMap<String, CallableSig>,
}

impl Annotations {
    /// The kind an expression naturally produces (`None` = no value)
    pub fn kind_of(&self, expr: &Expression) -> ValueKind {
        self.kinds.get(&expr.node_id).copied().flatten()
    }

    /// The coercion marker attached to an expression's use-site, if any
    pub fn coercion_of(&self, expr: &Expression) -> Option<NumericKind> {
        self.coercions.get(&expr.node_id).copied()
    }

    /// What a call expression dispatches to
    pub fn callee_kind_of(&self, expr: &Expression) -> Option<CalleeKind> {
        self.callees.get(&expr.node_id).copied()
    }

    /// The lowering strategy chosen for a loop expression
    pub fn loop_strategy_of(&self, expr: &Expression) -> LoopStrategy {
        self.loop_strategies
            .get(&expr.node_id)
            .copied()
            .unwrap_or(LoopStrategy::CounterComparison)
    }
}

/// The consumption context of a subexpression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ctx {
    /// The value is consumed (operand, argument, condition, hoisted
    /// branch)
    Value,

    /// The value is discarded; calls are side-effect-only
    Stmt,

    /// Tail position of a function body or of the synthesized entry:
    /// the value is returned if there is one
    Tail,
}

/// Resolve a program into its annotation side tables
pub fn resolve_program(
    program: &Program,
    options: &CompileOptions,
) -> Result<Annotations, CompilerError> {
    let mut resolver = Resolver {
        options,
        ann: Annotations::default(),
        scopes: Vec::new(),
    };

    resolver.collect_callables(program)?;
    resolver.infer_return_values(program);

    let last_expr_id = program.top_level_expressions().last().map(|e| e.node_id);

    for item in &program.items {
        match item {
            TopLevelItem::Function(func) => resolver.resolve_function(func)?,
            TopLevelItem::Extern(_) => {}
            TopLevelItem::Expression(expr) => {
                let ctx = if Some(expr.node_id) == last_expr_id {
                    resolver.tail_context_for(expr)
                } else {
                    Ctx::Stmt
                };
                let kind = resolver.resolve_expr(expr, ctx)?;
                // The entry returns a double, like every other function
                if ctx == Ctx::Tail && kind == Some(NumericKind::Int) {
                    resolver
                        .ann
                        .coercions
                        .insert(expr.node_id, NumericKind::Double);
                }
            }
        }
    }

    log::debug!(
        "resolved {} callable(s), {} import(s), {} coercion marker(s)",
        resolver.ann.callables.len(),
        resolver.ann.imports.len(),
        resolver.ann.coercions.len()
    );
    Ok(resolver.ann)
}

struct Resolver<'a> {
    options: &'a CompileOptions,
    ann: Annotations,
    scopes: Vec<Vec<String>>,
}

impl Resolver<'_> {
    /// First pass: collect user functions and foreign externs into the
    /// program-wide callable namespace. An `extern` naming a builtin is
    /// a no-op; any other redeclaration is an error.
    fn collect_callables(&mut self, program: &Program) -> Result<(), CompilerError> {
        for item in &program.items {
            match item {
                TopLevelItem::Extern(proto) => {
                    if builtins::lookup(&proto.name).is_some() {
                        continue;
                    }
                    if self.ann.callables.contains_key(&proto.name) {
                        return Err(CompilerError::DuplicateName {
                            name: proto.name.clone(),
                            span: proto.span.clone(),
                        });
                    }
                    self.ann.callables.insert(
                        proto.name.clone(),
                        CallableSig {
                            kind: CalleeKind::Foreign,
                            arity: proto.params.len(),
                            returns_value: true,
                        },
                    );
                }
                TopLevelItem::Function(func) => {
                    let proto = &func.prototype;
                    if self.ann.callables.contains_key(&proto.name) {
                        return Err(CompilerError::DuplicateName {
                            name: proto.name.clone(),
                            span: proto.span.clone(),
                        });
                    }
                    self.ann.callables.insert(
                        proto.name.clone(),
                        CallableSig {
                            kind: CalleeKind::User,
                            arity: proto.params.len(),
                            // Fixed up by infer_return_values()
                            returns_value: true,
                        },
                    );
                }
                TopLevelItem::Expression(_) => {}
            }
        }
        Ok(())
    }

    /// Second pass: decide which user functions yield a value. A body
    /// yields nothing when its tail is a loop, or a call to a function
    /// that itself yields nothing. Recursive cycles default to yielding
    /// a value.
    fn infer_return_values(&mut self, program: &Program) {
        let defs: HashMap<&str, &Function> = program
            .functions()
            .map(|f| (f.prototype.name.as_str(), f))
            .collect();
        let mut memo: HashMap<String, bool> = HashMap::new();

        fn expr_yields(
            expr: &Expression,
            defs: &HashMap<&str, &Function>,
            memo: &mut HashMap<String, bool>,
            in_progress: &mut Vec<String>,
        ) -> bool {
            match &expr.kind {
                ExpressionKind::Number(_)
                | ExpressionKind::Variable(_)
                | ExpressionKind::Binary { .. } => true,
                ExpressionKind::For { .. } => false,
                ExpressionKind::If {
                    then_expr,
                    else_expr,
                    ..
                } => {
                    expr_yields(then_expr, defs, memo, in_progress)
                        && expr_yields(else_expr, defs, memo, in_progress)
                }
                ExpressionKind::Call { callee, .. } => {
                    function_yields(callee, defs, memo, in_progress)
                }
            }
        }

        fn function_yields(
            name: &str,
            defs: &HashMap<&str, &Function>,
            memo: &mut HashMap<String, bool>,
            in_progress: &mut Vec<String>,
        ) -> bool {
            if let Some(&known) = memo.get(name) {
                return known;
            }
            let Some(func) = defs.get(name) else {
                // Foreign, builtin, or unbound; unbound names error later
                return true;
            };
            if in_progress.iter().any(|n| n == name) {
                return true;
            }
            in_progress.push(name.to_string());
            let yields = expr_yields(&func.body, defs, memo, in_progress);
            in_progress.pop();
            memo.insert(name.to_string(), yields);
            yields
        }

        for func in program.functions() {
            let name = &func.prototype.name;
            let yields = function_yields(name, &defs, &mut memo, &mut Vec::new());
            if let Some(sig) = self.ann.callables.get_mut(name) {
                sig.returns_value = yields;
            }
        }
    }

    /// The context for the final top-level expression: a trailing
    /// foreign call is side-effect-only and its result is discarded;
    /// everything else is returned from the entry function.
    fn tail_context_for(&self, expr: &Expression) -> Ctx {
        if let ExpressionKind::Call { callee, .. } = &expr.kind {
            let is_foreign = self
                .ann
                .callables
                .get(callee)
                .map(|sig| sig.kind == CalleeKind::Foreign)
                .unwrap_or(false);
            if is_foreign {
                return Ctx::Stmt;
            }
        }
        Ctx::Tail
    }

    fn resolve_function(&mut self, func: &Function) -> Result<(), CompilerError> {
        let proto = &func.prototype;
        let mut params = Vec::new();
        for param in &proto.params {
            if params.contains(param) {
                return Err(CompilerError::DuplicateName {
                    name: param.clone(),
                    span: proto.span.clone(),
                });
            }
            params.push(param.clone());
        }

        self.scopes.push(params);
        let kind = self.resolve_expr(&func.body, Ctx::Tail)?;
        self.scopes.pop();

        // A function returning a value always returns a double
        if kind == Some(NumericKind::Int) {
            self.ann
                .coercions
                .insert(func.body.node_id, NumericKind::Double);
        }

        debug_assert_eq!(
            kind.is_some(),
            self.ann.callables[&proto.name].returns_value,
            "return-value inference disagrees with body resolution for `{}`",
            proto.name
        );
        Ok(())
    }

    fn in_scope(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.iter().any(|n| n == name))
    }

    fn use_import(&mut self, name: &str, source: ImportSource) {
        if !self.ann.imports.iter().any(|import| import.name == name) {
            self.ann.imports.push(ImportDecl {
                name: name.to_string(),
                source,
            });
        }
    }

    /// Require a use-site to produce a double, inserting a coercion
    /// marker when the expression naturally produces an int
    fn require_double(
        &mut self,
        expr: &Expression,
        kind: ValueKind,
        what: &str,
    ) -> Result<(), CompilerError> {
        match kind {
            Some(NumericKind::Double) => Ok(()),
            Some(NumericKind::Int) => {
                self.ann
                    .coercions
                    .insert(expr.node_id, NumericKind::Double);
                Ok(())
            }
            None => Err(self.no_value_error(expr, what)),
        }
    }

    /// Require a use-site to produce some value; either kind is fine
    fn require_value(
        &mut self,
        expr: &Expression,
        kind: ValueKind,
        what: &str,
    ) -> Result<(), CompilerError> {
        if kind.is_none() {
            return Err(self.no_value_error(expr, what));
        }
        Ok(())
    }

    fn no_value_error(&self, expr: &Expression, what: &str) -> CompilerError {
        let detail = match &expr.kind {
            ExpressionKind::For { .. } => "a loop yields no value".to_string(),
            ExpressionKind::Call { callee, .. } => {
                format!("`{}` returns no value", callee)
            }
            _ => "this expression yields no value".to_string(),
        };
        CompilerError::kind_conflict(format!("{} used as {}", detail, what), expr.span.clone())
    }

    fn resolve_expr(&mut self, expr: &Expression, ctx: Ctx) -> Result<ValueKind, CompilerError> {
        let kind = match &expr.kind {
            ExpressionKind::Number(_) => Some(NumericKind::Double),

            ExpressionKind::Variable(name) => self.resolve_variable(name, &expr.span)?,

            ExpressionKind::Binary { op, left, right } => {
                let left_kind = self.resolve_expr(left, Ctx::Value)?;
                self.require_double(left, left_kind, "an operand")?;
                let right_kind = self.resolve_expr(right, Ctx::Value)?;
                self.require_double(right, right_kind, "an operand")?;

                match op {
                    BinaryOp::Less => Some(NumericKind::Int),
                    BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul => Some(NumericKind::Double),
                }
            }

            ExpressionKind::Call { callee, arguments } => {
                self.resolve_call(expr, callee, arguments, ctx)?
            }

            ExpressionKind::If {
                condition,
                then_expr,
                else_expr,
            } => {
                let cond_kind = self.resolve_expr(condition, Ctx::Value)?;
                self.require_value(condition, cond_kind, "a condition")?;

                let then_kind = self.resolve_expr(then_expr, ctx)?;
                let else_kind = self.resolve_expr(else_expr, ctx)?;

                if ctx == Ctx::Stmt {
                    // Both branch values are discarded
                    None
                } else {
                    match (then_kind, else_kind) {
                        (Some(_), Some(_)) => {
                            self.require_double(then_expr, then_kind, "an if branch")?;
                            self.require_double(else_expr, else_kind, "an if branch")?;
                            Some(NumericKind::Double)
                        }
                        (None, None) => None,
                        _ => {
                            return Err(CompilerError::kind_conflict(
                                "the branches of this if expression disagree about yielding \
                                 a value"
                                    .to_string(),
                                expr.span.clone(),
                            ));
                        }
                    }
                }
            }

            ExpressionKind::For { .. } => {
                self.resolve_for(expr)?;
                None
            }
        };

        self.ann.kinds.insert(expr.node_id, kind);
        Ok(kind)
    }

    fn resolve_variable(
        &mut self,
        name: &str,
        span: &SourceSpan,
    ) -> Result<ValueKind, CompilerError> {
        if self.in_scope(name) {
            return Ok(Some(NumericKind::Double));
        }

        if self.ann.callables.contains_key(name) {
            return Err(CompilerError::kind_conflict(
                format!("`{}` is a function and cannot be used as a value", name),
                span.clone(),
            ));
        }

        match builtins::lookup(name) {
            Some(Builtin::StdlibValue) => {
                self.use_import(name, ImportSource::Stdlib);
                Ok(Some(NumericKind::Double))
            }
            Some(Builtin::MathValue) => {
                self.use_import(name, ImportSource::StdlibMath);
                Ok(Some(NumericKind::Double))
            }
            Some(Builtin::MathFunction { .. }) => Err(CompilerError::kind_conflict(
                format!("`{}` is a function and cannot be used as a value", name),
                span.clone(),
            )),
            None => Err(CompilerError::UnboundName {
                name: name.to_string(),
                span: span.clone(),
            }),
        }
    }

    fn resolve_call(
        &mut self,
        expr: &Expression,
        callee: &str,
        arguments: &[Expression],
        ctx: Ctx,
    ) -> Result<ValueKind, CompilerError> {
        let (kind, arity, returns_value) = if let Some(sig) = self.ann.callables.get(callee) {
            (sig.kind, sig.arity, sig.returns_value)
        } else {
            match builtins::lookup(callee) {
                Some(Builtin::MathFunction { arity }) => (CalleeKind::Math, arity, true),
                Some(_) => {
                    return Err(CompilerError::kind_conflict(
                        format!("`{}` is not a function", callee),
                        expr.span.clone(),
                    ));
                }
                None => {
                    if self.in_scope(callee) {
                        return Err(CompilerError::kind_conflict(
                            format!("`{}` is a variable and cannot be called", callee),
                            expr.span.clone(),
                        ));
                    }
                    return Err(CompilerError::UnboundName {
                        name: callee.to_string(),
                        span: expr.span.clone(),
                    });
                }
            }
        };

        if arguments.len() != arity {
            return Err(CompilerError::SignatureMismatch {
                name: callee.to_string(),
                expected: arity,
                found: arguments.len(),
                span: expr.span.clone(),
            });
        }

        for arg in arguments {
            let arg_kind = self.resolve_expr(arg, Ctx::Value)?;
            self.require_double(arg, arg_kind, "an argument")?;
        }

        // Record reachability after the arguments so import order
        // matches evaluation order
        match kind {
            CalleeKind::Math => self.use_import(callee, ImportSource::StdlibMath),
            CalleeKind::Foreign => self.use_import(callee, ImportSource::Foreign),
            CalleeKind::User => {}
        }
        self.ann.callees.insert(expr.node_id, kind);

        // User and foreign call results cannot be locally inferred by
        // the target validator, so a consumed result is re-coerced to
        // double at the call site. Math builtins need no coercion, and
        // statement-position results are discarded uncoerced.
        Ok(match kind {
            CalleeKind::Math => Some(NumericKind::Double),
            CalleeKind::Foreign => {
                if ctx != Ctx::Stmt {
                    self.ann
                        .coercions
                        .insert(expr.node_id, NumericKind::Double);
                }
                Some(NumericKind::Double)
            }
            CalleeKind::User => {
                if returns_value {
                    if ctx != Ctx::Stmt {
                        self.ann
                            .coercions
                            .insert(expr.node_id, NumericKind::Double);
                    }
                    Some(NumericKind::Double)
                } else {
                    None
                }
            }
        })
    }

    fn resolve_for(&mut self, expr: &Expression) -> Result<(), CompilerError> {
        let ExpressionKind::For {
            var,
            start,
            condition,
            step,
            body,
        } = &expr.kind
        else {
            unreachable!("resolve_for() is only called on loops");
        };

        // The start value is evaluated in the enclosing scope
        let start_kind = self.resolve_expr(start, Ctx::Value)?;
        self.require_double(start, start_kind, "a loop start value")?;

        self.scopes.push(vec![var.clone()]);

        let truncating = self.options.loop_lowering == LoopLowering::TruncatingNonzero;
        let strategy = match &condition.kind {
            ExpressionKind::Binary {
                op: BinaryOp::Less,
                left,
                right,
            } if truncating => {
                let left_kind = self.resolve_expr(left, Ctx::Value)?;
                self.require_double(left, left_kind, "an operand")?;
                let right_kind = self.resolve_expr(right, Ctx::Value)?;
                self.require_double(right, right_kind, "an operand")?;
                self.ann
                    .kinds
                    .insert(condition.node_id, Some(NumericKind::Int));
                LoopStrategy::TruncatedDifference
            }
            _ => {
                let cond_kind = self.resolve_expr(condition, Ctx::Value)?;
                self.require_value(condition, cond_kind, "a loop condition")?;
                LoopStrategy::CounterComparison
            }
        };
        self.ann.loop_strategies.insert(expr.node_id, strategy);

        if let Some(step) = step {
            let step_kind = self.resolve_expr(step, Ctx::Value)?;
            self.require_double(step, step_kind, "a loop step")?;
        }

        self.resolve_expr(body, Ctx::Stmt)?;
        self.scopes.pop();
        Ok(())
    }
}
