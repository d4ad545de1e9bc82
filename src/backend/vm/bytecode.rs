use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::ast::{BinaryOperator, Expression};
use crate::functions::{FunctionDef, FunctionTable};
use crate::symbols::{Slot, SymbolTable};

pub type Register = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    LoadConst {
        dst: Register,
        value: i64,
    },
    LoadVar {
        dst: Register,
        slot: Slot,
    },
    StoreVar {
        slot: Slot,
        src: Register,
    },
    Compute {
        op: BinaryOperator,
        dst: Register,
        left: Register,
        right: Register,
    },
    Move {
        dst: Register,
        src: Register,
    },
    /// Jumps to `target` when `condition` holds zero.
    Branch {
        condition: Register,
        target: usize,
    },
    Jump {
        target: usize,
    },
    Call {
        function: String,
        args: Vec<Register>,
        dst: Register,
    },
    Return {
        src: Register,
    },
    Print {
        src: Register,
    },
    /// Aborts execution with a construct the compiler could not lower.
    Fail {
        error: CompileError,
    },
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::LoadConst { dst, value } => write!(f, "T{dst} = {value}"),
            Instruction::LoadVar { dst, slot } => write!(f, "T{dst} = stack[{slot}]"),
            Instruction::StoreVar { slot, src } => write!(f, "stack[{slot}] = T{src}"),
            Instruction::Compute {
                op,
                dst,
                left,
                right,
            } => write!(f, "T{dst} = T{left} {} T{right}", op.symbol()),
            Instruction::Move { dst, src } => write!(f, "T{dst} = T{src}"),
            Instruction::Branch { condition, target } => {
                write!(f, "if T{condition} == 0 goto {target}")
            }
            Instruction::Jump { target } => write!(f, "goto {target}"),
            Instruction::Call {
                function,
                args,
                dst,
            } => {
                let args = args
                    .iter()
                    .map(|register| format!("T{register}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "T{dst} = {function}({args})")
            }
            Instruction::Return { src } => write!(f, "return T{src}"),
            Instruction::Print { src } => write!(f, "print T{src}"),
            Instruction::Fail { error } => write!(f, "fail \"{error}\""),
        }
    }
}

/// One straight-line unit of code: the top-level expression or a function body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub name: String,
    /// Local slot of each parameter, in declaration order.
    pub params: Vec<Slot>,
    pub code: Vec<Instruction>,
    pub registers: usize,
    pub slots: usize,
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: {} registers, {} slots",
            self.name, self.registers, self.slots
        )?;
        for (index, instruction) in self.code.iter().enumerate() {
            writeln!(f, "{index:>4}  {instruction}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Program {
    pub main: Chunk,
    pub functions: FxHashMap<String, Chunk>,
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.main)?;
        let mut names = self.functions.keys().collect::<Vec<_>>();
        names.sort();
        for name in names {
            write!(f, "{}", self.functions[name])?;
        }
        Ok(())
    }
}

/// A construct that cannot be lowered to working code. The compiler emits it
/// as a `Fail` instruction, so it only surfaces if execution reaches it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("Cannot assign to '{target}': left side of '=' must be a variable")]
    InvalidAssignmentTarget { target: String },
    #[error("Undefined function '{name}'")]
    UndefinedFunction { name: String },
    #[error("Function '{name}' expected {expected} arguments, got {found}")]
    FunctionArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
}

/// Lowers `expression` into a program whose main chunk addresses `globals` by
/// slot. Every function reachable from the expression is compiled once.
pub fn compile(
    expression: &Expression,
    globals: &mut SymbolTable,
    functions: &FunctionTable,
) -> Program {
    let mut compiler = Compiler {
        functions,
        chunks: FxHashMap::default(),
        pending: FxHashSet::default(),
    };
    let mut builder = ChunkBuilder::new("main", Vec::new(), globals, &mut compiler);
    let result = builder.expression(expression);
    builder.emit(Instruction::Print { src: result });
    let main = builder.finish();
    Program {
        main,
        functions: compiler.chunks,
    }
}

struct Compiler<'f> {
    functions: &'f FunctionTable,
    chunks: FxHashMap<String, Chunk>,
    // Functions whose bodies are being compiled; stops recursive definitions
    // from compiling themselves forever.
    pending: FxHashSet<String>,
}

impl<'f> Compiler<'f> {
    fn ensure_function(&mut self, function: &'f FunctionDef) {
        if self.chunks.contains_key(&function.name) || !self.pending.insert(function.name.clone())
        {
            return;
        }

        let mut locals = SymbolTable::new();
        let params = function
            .params
            .iter()
            .map(|param| locals.slot(param))
            .collect();
        let mut builder = ChunkBuilder::new(&function.name, params, &mut locals, self);
        let result = builder.expression(&function.body);
        builder.emit(Instruction::Return { src: result });
        let chunk = builder.finish();

        self.pending.remove(&function.name);
        self.chunks.insert(function.name.clone(), chunk);
    }
}

struct ChunkBuilder<'a, 'f> {
    name: String,
    params: Vec<Slot>,
    code: Vec<Instruction>,
    next_register: Register,
    scope: &'a mut SymbolTable,
    compiler: &'a mut Compiler<'f>,
}

impl<'a, 'f> ChunkBuilder<'a, 'f> {
    fn new(
        name: &str,
        params: Vec<Slot>,
        scope: &'a mut SymbolTable,
        compiler: &'a mut Compiler<'f>,
    ) -> Self {
        Self {
            name: name.to_string(),
            params,
            code: Vec::new(),
            next_register: 0,
            scope,
            compiler,
        }
    }

    fn finish(self) -> Chunk {
        Chunk {
            name: self.name,
            params: self.params,
            code: self.code,
            registers: self.next_register,
            slots: self.scope.slot_count(),
        }
    }

    fn emit(&mut self, instruction: Instruction) {
        self.code.push(instruction);
    }

    fn allocate(&mut self) -> Register {
        let register = self.next_register;
        self.next_register += 1;
        register
    }

    /// Emits `Fail` in place of a node. The register it returns is never
    /// written; nothing after the `Fail` runs.
    fn fail(&mut self, error: CompileError) -> Register {
        self.emit(Instruction::Fail { error });
        self.allocate()
    }

    fn expression(&mut self, expr: &Expression) -> Register {
        match expr {
            Expression::Literal(value) => {
                let dst = self.allocate();
                self.emit(Instruction::LoadConst { dst, value: *value });
                dst
            }
            Expression::Variable(name) => {
                let dst = self.allocate();
                let slot = self.scope.slot(name);
                self.emit(Instruction::LoadVar { dst, slot });
                dst
            }
            Expression::BinaryOp {
                left,
                op: BinaryOperator::Assign,
                right,
            } => {
                let Expression::Variable(name) = left.as_ref() else {
                    return self.fail(CompileError::InvalidAssignmentTarget {
                        target: left.to_string(),
                    });
                };
                let src = self.expression(right);
                let slot = self.scope.slot(name);
                self.emit(Instruction::StoreVar { slot, src });
                src
            }
            Expression::BinaryOp { left, op, right } => {
                let left = self.expression(left);
                let right = self.expression(right);
                let dst = self.allocate();
                self.emit(Instruction::Compute {
                    op: *op,
                    dst,
                    left,
                    right,
                });
                dst
            }
            Expression::Conditional {
                test,
                if_true,
                if_false,
            } => self.conditional(test, if_true, if_false),
            Expression::Call { name, args } => self.call(name, args),
        }
    }

    fn conditional(
        &mut self,
        test: &Expression,
        if_true: &Expression,
        if_false: &Expression,
    ) -> Register {
        let condition = self.expression(test);
        let dst = self.allocate();

        let branch_pos = self.code.len();
        self.emit(Instruction::Branch {
            condition,
            target: 0,
        });
        let src = self.expression(if_true);
        self.emit(Instruction::Move { dst, src });
        let jump_pos = self.code.len();
        self.emit(Instruction::Jump { target: 0 });

        let else_start = self.code.len();
        self.code[branch_pos] = Instruction::Branch {
            condition,
            target: else_start,
        };
        let src = self.expression(if_false);
        self.emit(Instruction::Move { dst, src });

        let end = self.code.len();
        self.code[jump_pos] = Instruction::Jump { target: end };
        dst
    }

    // Resolution and arity are checked before any argument is lowered, so a
    // bad call fails before its arguments have side effects.
    fn call(&mut self, name: &str, args: &[Expression]) -> Register {
        let functions = self.compiler.functions;
        let Some(function) = functions.resolve(name) else {
            return self.fail(CompileError::UndefinedFunction {
                name: name.to_string(),
            });
        };
        if args.len() != function.arity() {
            return self.fail(CompileError::FunctionArityMismatch {
                name: name.to_string(),
                expected: function.arity(),
                found: args.len(),
            });
        }

        let registers = args.iter().map(|arg| self.expression(arg)).collect();
        self.compiler.ensure_function(function);

        let dst = self.allocate();
        self.emit(Instruction::Call {
            function: name.to_string(),
            args: registers,
            dst,
        });
        dst
    }
}
