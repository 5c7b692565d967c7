//! Module Emitter
//!
//! Lowers the annotated program into the strict module form. Lowering is
//! a pure function of the annotated AST and the module plan: the same
//! input yields a byte-identical module.
//!
//! Statement shape of the output, in order: the factory header with its
//! fixed `(stdlib, foreign, heap)` parameters, the strict-mode prologue,
//! the pulled-out import bindings, one function per normalized source
//! function (parameter re-annotations first, then local declarations,
//! then the lowered body), the synthesized entry, and the export object.
//!
//! A source loop runs its body first and tests the continue condition on
//! the pre-step counter, which a pre-test loop header cannot express, so
//! loops lower to `for (;;)` with the test and step in the body.

use crate::js::{JsBinOp, JsExpr, JsFunction, JsModule, JsStmt};
use crate::kind::NumericKind;
use crate::normalize::ModulePlan;
use crate::resolve::{Annotations, LoopStrategy};
use std::collections::HashSet;
use tlc_frontend::{BinaryOp, Expression, ExpressionKind, Function};

/// Lower a normalized program to the target module
pub fn lower_module(annotations: &Annotations, plan: &ModulePlan) -> JsModule {
    let mut module_names: HashSet<String> = annotations
        .imports
        .iter()
        .map(|import| import.name.clone())
        .collect();
    for function in &plan.functions {
        module_names.insert(function.prototype.name.clone());
    }
    module_names.insert(plan.entry_name.clone());

    let mut functions: Vec<JsFunction> = plan
        .functions
        .iter()
        .map(|function| lower_function(function, annotations, &module_names))
        .collect();
    functions.push(lower_entry(annotations, plan, &module_names));

    log::debug!(
        "emitting module with {} import(s) and {} function(s)",
        annotations.imports.len(),
        functions.len()
    );

    JsModule {
        imports: annotations.imports.clone(),
        functions,
        entry: plan.entry_name.clone(),
    }
}

fn lower_function(
    function: &Function,
    annotations: &Annotations,
    module_names: &HashSet<String>,
) -> JsFunction {
    let mut lowerer = FunctionLowerer::new(annotations, module_names);
    let params: Vec<String> = function
        .prototype
        .params
        .iter()
        .map(|param| lowerer.bind_param(param))
        .collect();

    let mut body = Vec::new();
    lowerer.lower_tail(&function.body, &mut body);

    JsFunction {
        name: function.prototype.name.clone(),
        params,
        locals: lowerer.locals,
        body,
    }
}

fn lower_entry(
    annotations: &Annotations,
    plan: &ModulePlan,
    module_names: &HashSet<String>,
) -> JsFunction {
    let mut lowerer = FunctionLowerer::new(annotations, module_names);
    let mut body = Vec::new();

    for (index, expr) in plan.main_body.iter().enumerate() {
        let is_last = index + 1 == plan.main_body.len();
        if is_last && plan.main_returns {
            lowerer.lower_tail(expr, &mut body);
        } else {
            lowerer.lower_stmt(expr, &mut body);
        }
    }

    JsFunction {
        name: plan.entry_name.clone(),
        params: Vec::new(),
        locals: lowerer.locals,
        body,
    }
}

/// Per-function lowering state: local declarations, fresh-name
/// generation, and the source-name to emitted-name scope map
struct FunctionLowerer<'a> {
    annotations: &'a Annotations,
    module_names: &'a HashSet<String>,
    used: HashSet<String>,
    locals: Vec<String>,
    scope: Vec<(String, String)>,
    temp_count: u32,
}

impl<'a> FunctionLowerer<'a> {
    fn new(annotations: &'a Annotations, module_names: &'a HashSet<String>) -> Self {
        Self {
            annotations,
            module_names,
            used: HashSet::new(),
            locals: Vec::new(),
            scope: Vec::new(),
            temp_count: 0,
        }
    }

    /// Pick an emitted name that shadows neither a module-level binding
    /// nor another name in this function
    fn fresh_name(&mut self, base: &str) -> String {
        let mut name = base.to_string();
        let mut counter = 1;
        while self.module_names.contains(&name) || self.used.contains(&name) {
            name = format!("{}${}", base, counter);
            counter += 1;
        }
        self.used.insert(name.clone());
        name
    }

    fn bind_param(&mut self, source: &str) -> String {
        let emitted = self.fresh_name(source);
        self.scope.push((source.to_string(), emitted.clone()));
        emitted
    }

    fn add_local(&mut self, base: &str) -> String {
        let name = self.fresh_name(base);
        self.locals.push(name.clone());
        name
    }

    /// Temporaries use a `$` prefix, which no source identifier can
    /// carry
    fn fresh_temp(&mut self) -> String {
        let name = format!("$t{}", self.temp_count);
        self.temp_count += 1;
        self.locals.push(name.clone());
        name
    }

    fn lookup(&self, source: &str) -> Option<String> {
        self.scope
            .iter()
            .rev()
            .find(|(name, _)| name == source)
            .map(|(_, emitted)| emitted.clone())
    }

    /// Lower an expression and flush its pending effects into a
    /// temporary, so statements hoisted by a later sibling cannot
    /// overtake them. Atoms are already effect-free and pass through.
    fn spill(&mut self, expr: &Expression, out: &mut Vec<JsStmt>) -> JsExpr {
        let value = self.lower_value(expr, out);
        if matches!(value, JsExpr::Ident(_) | JsExpr::Double(_)) {
            return value;
        }
        let temp = self.fresh_temp();
        out.push(JsStmt::Assign {
            target: temp.clone(),
            value,
        });
        JsExpr::Ident(temp)
    }

    /// Wrap an expression in its use-site coercion marker, if any
    fn apply_marker(&self, expr: &Expression, lowered: JsExpr) -> JsExpr {
        match self.annotations.coercion_of(expr) {
            Some(NumericKind::Double) => JsExpr::CoerceDouble(Box::new(lowered)),
            Some(NumericKind::Int) => JsExpr::CoerceInt(Box::new(lowered)),
            None => lowered,
        }
    }

    /// Lower an expression whose value is consumed. Statements that the
    /// lowering has to hoist (value-position ifs) are pushed onto `out`
    /// ahead of the returned expression.
    fn lower_value(&mut self, expr: &Expression, out: &mut Vec<JsStmt>) -> JsExpr {
        let lowered = match &expr.kind {
            ExpressionKind::Number(value) => JsExpr::Double(*value),

            ExpressionKind::Variable(name) => {
                // Imports and builtins keep their source names
                let emitted = self.lookup(name).unwrap_or_else(|| name.clone());
                JsExpr::Ident(emitted)
            }

            ExpressionKind::Binary { op, left, right } => {
                // A value-position if hoists to statements ahead of this
                // expression; spill its siblings so call order stays
                // exactly as written
                let (left, right) = if contains_value_if(left) || contains_value_if(right) {
                    (self.spill(left, out), self.spill(right, out))
                } else {
                    (self.lower_value(left, out), self.lower_value(right, out))
                };
                JsExpr::Binary {
                    op: lower_op(*op),
                    left: Box::new(left),
                    right: Box::new(right),
                }
            }

            ExpressionKind::Call { callee, arguments } => {
                let args = if arguments.iter().any(contains_value_if) {
                    arguments.iter().map(|arg| self.spill(arg, out)).collect()
                } else {
                    arguments
                        .iter()
                        .map(|arg| self.lower_value(arg, out))
                        .collect()
                };
                JsExpr::Call {
                    callee: callee.clone(),
                    args,
                }
            }

            ExpressionKind::If {
                condition,
                then_expr,
                else_expr,
            } => {
                let condition = self.lower_condition(condition, out);
                let temp = self.fresh_temp();

                let mut then_branch = Vec::new();
                let then_value = self.lower_value(then_expr, &mut then_branch);
                then_branch.push(JsStmt::Assign {
                    target: temp.clone(),
                    value: then_value,
                });

                let mut else_branch = Vec::new();
                let else_value = self.lower_value(else_expr, &mut else_branch);
                else_branch.push(JsStmt::Assign {
                    target: temp.clone(),
                    value: else_value,
                });

                out.push(JsStmt::If {
                    condition,
                    then_branch,
                    else_branch,
                });
                JsExpr::Ident(temp)
            }

            ExpressionKind::For { .. } => {
                unreachable!("the resolver rejects loops in value position")
            }
        };

        self.apply_marker(expr, lowered)
    }

    /// Lower a condition to an int-typed test
    fn lower_condition(&mut self, expr: &Expression, out: &mut Vec<JsStmt>) -> JsExpr {
        let kind = self.annotations.kind_of(expr);
        let lowered = self.lower_value(expr, out);
        match kind {
            Some(NumericKind::Int) => lowered,
            // A double condition is true while nonzero
            _ => JsExpr::Binary {
                op: JsBinOp::Ne,
                left: Box::new(lowered),
                right: Box::new(JsExpr::Double(0.0)),
            },
        }
    }

    /// Lower an expression in statement position; its value is
    /// discarded
    fn lower_stmt(&mut self, expr: &Expression, out: &mut Vec<JsStmt>) {
        match &expr.kind {
            ExpressionKind::If {
                condition,
                then_expr,
                else_expr,
            } => {
                let condition = self.lower_condition(condition, out);
                let mut then_branch = Vec::new();
                self.lower_stmt(then_expr, &mut then_branch);
                let mut else_branch = Vec::new();
                self.lower_stmt(else_expr, &mut else_branch);
                out.push(JsStmt::If {
                    condition,
                    then_branch,
                    else_branch,
                });
            }
            ExpressionKind::For { .. } => self.lower_for(expr, out),
            _ => {
                let lowered = self.lower_value(expr, out);
                out.push(JsStmt::Expr(lowered));
            }
        }
    }

    /// Lower an expression in tail position: its value, if it has one,
    /// becomes the function's return value
    fn lower_tail(&mut self, expr: &Expression, out: &mut Vec<JsStmt>) {
        match &expr.kind {
            ExpressionKind::If {
                condition,
                then_expr,
                else_expr,
            } => {
                let condition = self.lower_condition(condition, out);
                let mut then_branch = Vec::new();
                self.lower_tail(then_expr, &mut then_branch);
                let mut else_branch = Vec::new();
                self.lower_tail(else_expr, &mut else_branch);
                out.push(JsStmt::If {
                    condition,
                    then_branch,
                    else_branch,
                });
            }
            ExpressionKind::For { .. } => self.lower_for(expr, out),
            _ => match self.annotations.kind_of(expr) {
                // A call to a function that returns nothing
                None => self.lower_stmt(expr, out),
                Some(_) => {
                    let lowered = self.lower_value(expr, out);
                    out.push(JsStmt::Return(lowered));
                }
            },
        }
    }

    fn lower_for(&mut self, expr: &Expression, out: &mut Vec<JsStmt>) {
        let ExpressionKind::For {
            var,
            start,
            condition,
            step,
            body,
        } = &expr.kind
        else {
            unreachable!("lower_for() is only called on loops");
        };

        // The start value is evaluated outside the loop variable's scope
        let start_value = self.lower_value(start, out);
        let counter = self.add_local(var);
        out.push(JsStmt::Assign {
            target: counter.clone(),
            value: start_value,
        });
        self.scope.push((var.clone(), counter.clone()));

        let mut loop_body = Vec::new();
        self.lower_stmt(body, &mut loop_body);

        // The continue condition is tested after the body, on the
        // pre-step counter
        let break_when = match self.annotations.loop_strategy_of(expr) {
            LoopStrategy::TruncatedDifference => {
                let ExpressionKind::Binary { left, right, .. } = &condition.kind else {
                    unreachable!("the truncating strategy only applies to `<` conditions");
                };
                let counter_value = self.lower_value(left, &mut loop_body);
                let bound = self.lower_value(right, &mut loop_body);
                JsExpr::Not(Box::new(JsExpr::CoerceInt(Box::new(JsExpr::Binary {
                    op: JsBinOp::Sub,
                    left: Box::new(bound),
                    right: Box::new(counter_value),
                }))))
            }
            LoopStrategy::CounterComparison => {
                let kind = self.annotations.kind_of(condition);
                let lowered = self.lower_value(condition, &mut loop_body);
                match kind {
                    Some(NumericKind::Int) => JsExpr::Not(Box::new(lowered)),
                    _ => JsExpr::Binary {
                        op: JsBinOp::Eq,
                        left: Box::new(lowered),
                        right: Box::new(JsExpr::Double(0.0)),
                    },
                }
            }
        };
        loop_body.push(JsStmt::If {
            condition: break_when,
            then_branch: vec![JsStmt::Break],
            else_branch: Vec::new(),
        });

        let step_value = match step {
            Some(step) => self.lower_value(step, &mut loop_body),
            None => JsExpr::Double(1.0),
        };
        loop_body.push(JsStmt::Assign {
            target: counter.clone(),
            value: JsExpr::Binary {
                op: JsBinOp::Add,
                left: Box::new(JsExpr::Ident(counter)),
                right: Box::new(step_value),
            },
        });

        self.scope.pop();
        out.push(JsStmt::Loop { body: loop_body });
    }
}

/// True if evaluating this expression would hoist statements (it
/// contains an if in value position)
fn contains_value_if(expr: &Expression) -> bool {
    match &expr.kind {
        ExpressionKind::If { .. } => true,
        ExpressionKind::Binary { left, right, .. } => {
            contains_value_if(left) || contains_value_if(right)
        }
        ExpressionKind::Call { arguments, .. } => arguments.iter().any(contains_value_if),
        ExpressionKind::Number(_) | ExpressionKind::Variable(_) | ExpressionKind::For { .. } => {
            false
        }
    }
}

fn lower_op(op: BinaryOp) -> JsBinOp {
    match op {
        BinaryOp::Less => JsBinOp::Lt,
        BinaryOp::Add => JsBinOp::Add,
        BinaryOp::Sub => JsBinOp::Sub,
        BinaryOp::Mul => JsBinOp::Mul,
    }
}
