//! Line-at-a-time driver shared by the REPL, script runner and test harness.

use std::fmt;

use anyhow::{Context as _, Result};

use crate::ast::Statement;
use crate::backend::{Backend, Evaluation};
use crate::functions::FunctionTable;
use crate::parser;
use crate::symbols::SymbolTable;

/// Scripted session exercising definitions, recursion, assignment chains and
/// relational operators.
pub const DEMO: &str = include_str!("demo.calc");

/// Session-wide state: global variables and function definitions.
#[derive(Debug, Default)]
pub struct Context {
    pub globals: SymbolTable,
    pub functions: FunctionTable,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }
}

/// What executing a single line produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Blank line or comment.
    Nothing,
    /// A `deffn` line; carries the signature of the new definition.
    Defined(String),
    Evaluated(Evaluation),
    /// Output of a `:vars` or `:functions` command.
    Dump(String),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Nothing => Ok(()),
            Outcome::Defined(signature) => write!(f, "defined {signature}"),
            Outcome::Evaluated(evaluation) => write!(f, "{}", evaluation.value),
            Outcome::Dump(text) => f.write_str(text),
        }
    }
}

pub struct Session {
    context: Context,
    backend: Box<dyn Backend>,
}

impl Session {
    pub fn new(backend: Box<dyn Backend>) -> Self {
        Self {
            context: Context::new(),
            backend,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    /// Executes one line: a command, a definition or an expression.
    ///
    /// Definitions are registered before the next line is parsed, which is
    /// what lets later lines call them.
    pub fn execute(&mut self, line: &str) -> Result<Outcome> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(Outcome::Nothing);
        }
        match line {
            ":vars" => return Ok(Outcome::Dump(self.context.globals.to_string())),
            ":functions" => {
                let rendered = self
                    .context
                    .functions
                    .definitions()
                    .iter()
                    .map(|def| format!("{def} = {}", def.body))
                    .collect::<Vec<_>>()
                    .join("\n");
                return Ok(Outcome::Dump(rendered));
            }
            _ => {}
        }

        match parser::parse(line, &self.context.functions)? {
            Statement::FunctionDef { name, params, body } => {
                self.context.functions.define(name.clone(), params, body);
                let signature = self
                    .context
                    .functions
                    .resolve(&name)
                    .map(|def| def.to_string())
                    .unwrap_or(name);
                Ok(Outcome::Defined(signature))
            }
            Statement::Expr(expr) => {
                let evaluation = self.backend.run(&expr, &mut self.context)?;
                Ok(Outcome::Evaluated(evaluation))
            }
        }
    }

    /// Runs every line of `source`, returning the rendered outcomes joined by
    /// newlines. Stops at the first failing line.
    pub fn run_script(&mut self, source: &str) -> Result<String> {
        let mut output = Vec::new();
        for (index, line) in source.lines().enumerate() {
            let outcome = self
                .execute(line)
                .with_context(|| format!("Line {}: {}", index + 1, line.trim()))?;
            if outcome != Outcome::Nothing {
                output.push(outcome.to_string());
            }
        }
        Ok(output.join("\n"))
    }
}
