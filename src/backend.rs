use anyhow::Result;

use crate::ast::{BinaryOperator, Expression};
use crate::session::Context;

pub mod interpreter;
pub mod vm;

/// Result of evaluating one expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub value: i64,
    /// Soft warnings raised during execution; the value is still usable.
    pub diagnostics: Vec<String>,
}

impl Evaluation {
    pub fn value(value: i64) -> Self {
        Self {
            value,
            diagnostics: Vec::new(),
        }
    }
}

/// Applies `op` for either backend. An operator without value semantics is
/// the soft fallback: it is reported in `diagnostics` and yields 0.
pub fn compute(op: BinaryOperator, left: i64, right: i64, diagnostics: &mut Vec<String>) -> i64 {
    op.apply(left, right).unwrap_or_else(|| {
        diagnostics.push(format!("Operation \"{}\" not recognized.", op.symbol()));
        0
    })
}

/// Common interface implemented by each execution strategy.
///
/// Both backends read and write the same global symbol table and resolve calls
/// against the same function table, so they can be swapped between lines.
pub trait Backend {
    fn name(&self) -> &'static str;
    fn run(&self, expression: &Expression, context: &mut Context) -> Result<Evaluation>;
}

pub fn backends() -> Vec<Box<dyn Backend>> {
    vec![
        Box::new(interpreter::Interpreter::new()),
        Box::new(vm::VM::new()),
    ]
}

pub fn backend(name: &str) -> Option<Box<dyn Backend>> {
    backends().into_iter().find(|backend| backend.name() == name)
}
