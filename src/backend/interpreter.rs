use anyhow::Result;

use crate::ast::{BinaryOperator, Expression};
use crate::backend::{Backend, Evaluation, compute};
use crate::functions::FunctionTable;
use crate::session::Context;
use crate::symbols::SymbolTable;

mod error;

pub use error::InterpreterError;

type EvalResult<T> = std::result::Result<T, InterpreterError>;

/// AST-walking backend that evaluates expressions directly without compilation.
pub struct Interpreter;

impl Interpreter {
    pub fn new() -> Self {
        Self
    }

    /// Evaluates `expression` against `scope`, resolving calls in `functions`.
    pub fn evaluate(
        &self,
        expression: &Expression,
        scope: &mut SymbolTable,
        functions: &FunctionTable,
    ) -> EvalResult<Evaluation> {
        let mut runtime = Runtime {
            functions,
            diagnostics: Vec::new(),
        };
        let value = runtime.eval(expression, scope)?;
        Ok(Evaluation {
            value,
            diagnostics: runtime.diagnostics,
        })
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for Interpreter {
    fn name(&self) -> &'static str {
        "interpreter"
    }

    fn run(&self, expression: &Expression, context: &mut Context) -> Result<Evaluation> {
        Ok(self.evaluate(expression, &mut context.globals, &context.functions)?)
    }
}

struct Runtime<'a> {
    functions: &'a FunctionTable,
    diagnostics: Vec<String>,
}

impl Runtime<'_> {
    fn eval(&mut self, expr: &Expression, scope: &mut SymbolTable) -> EvalResult<i64> {
        match expr {
            Expression::Literal(value) => Ok(*value),
            Expression::Variable(name) => Ok(scope.lookup(name)),
            Expression::BinaryOp {
                left,
                op: BinaryOperator::Assign,
                right,
            } => {
                let Expression::Variable(name) = left.as_ref() else {
                    return Err(InterpreterError::InvalidAssignmentTarget {
                        target: left.to_string(),
                    });
                };
                let value = self.eval(right, scope)?;
                scope.assign(name, value);
                Ok(value)
            }
            Expression::BinaryOp { left, op, right } => {
                let left = self.eval(left, scope)?;
                let right = self.eval(right, scope)?;
                Ok(compute(*op, left, right, &mut self.diagnostics))
            }
            Expression::Conditional {
                test,
                if_true,
                if_false,
            } => {
                if self.eval(test, scope)? != 0 {
                    self.eval(if_true, scope)
                } else {
                    self.eval(if_false, scope)
                }
            }
            Expression::Call { name, args } => self.eval_call(name, args, scope),
        }
    }

    fn eval_call(
        &mut self,
        name: &str,
        args: &[Expression],
        scope: &mut SymbolTable,
    ) -> EvalResult<i64> {
        let functions = self.functions;
        let function = functions
            .resolve(name)
            .ok_or_else(|| InterpreterError::UndefinedFunction {
                name: name.to_string(),
            })?;
        if args.len() != function.arity() {
            return Err(InterpreterError::FunctionArityMismatch {
                name: name.to_string(),
                expected: function.arity(),
                found: args.len(),
            });
        }

        // Arguments see the caller's scope; the body sees only its own.
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(arg, scope)?);
        }
        let mut locals = SymbolTable::new();
        for (param, value) in function.params.iter().zip(values) {
            locals.assign(param, value);
        }
        self.eval(&function.body, &mut locals)
    }
}
