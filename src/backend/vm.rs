use anyhow::Result;

use crate::ast::Expression;
use crate::backend::{Backend, Evaluation, compute};
use crate::session::Context;
use crate::symbols::SymbolTable;

pub mod bytecode;
mod error;

pub use bytecode::{Chunk, CompileError, Instruction, Program, Register, compile};
pub use error::{VmError, VmResult};

/// Everything a program run produced besides its effect on the globals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Execution {
    pub output: Vec<i64>,
    pub diagnostics: Vec<String>,
}

/// Runs `program`, with the main chunk reading and writing `globals` by slot.
pub fn run(program: &Program, globals: &mut SymbolTable) -> VmResult<Execution> {
    let mut machine = Machine {
        program,
        execution: Execution::default(),
    };
    let mut registers = vec![0; program.main.registers];
    machine.execute(&program.main, &mut registers, globals.cells_mut())?;
    Ok(machine.execution)
}

struct Machine<'p> {
    program: &'p Program,
    execution: Execution,
}

impl Machine<'_> {
    /// Executes `chunk` until it returns or runs off its end.
    fn execute(
        &mut self,
        chunk: &Chunk,
        registers: &mut [i64],
        slots: &mut [Option<i64>],
    ) -> VmResult<Option<i64>> {
        let mut pc = 0;
        while let Some(instruction) = chunk.code.get(pc) {
            pc += 1;
            match instruction {
                Instruction::LoadConst { dst, value } => write(registers, *dst, *value)?,
                Instruction::LoadVar { dst, slot } => {
                    let cell = slots
                        .get_mut(*slot)
                        .ok_or(VmError::InvalidSlot { slot: *slot })?;
                    let value = *cell.get_or_insert(0);
                    write(registers, *dst, value)?;
                }
                Instruction::StoreVar { slot, src } => {
                    let value = read(registers, *src)?;
                    let cell = slots
                        .get_mut(*slot)
                        .ok_or(VmError::InvalidSlot { slot: *slot })?;
                    *cell = Some(value);
                }
                Instruction::Compute {
                    op,
                    dst,
                    left,
                    right,
                } => {
                    let left = read(registers, *left)?;
                    let right = read(registers, *right)?;
                    let value = compute(*op, left, right, &mut self.execution.diagnostics);
                    write(registers, *dst, value)?;
                }
                Instruction::Move { dst, src } => {
                    let value = read(registers, *src)?;
                    write(registers, *dst, value)?;
                }
                Instruction::Branch { condition, target } => {
                    if read(registers, *condition)? == 0 {
                        pc = jump_target(chunk, *target)?;
                    }
                }
                Instruction::Jump { target } => pc = jump_target(chunk, *target)?,
                Instruction::Call {
                    function,
                    args,
                    dst,
                } => {
                    let value = self.call(function, args, registers)?;
                    write(registers, *dst, value)?;
                }
                Instruction::Return { src } => return Ok(Some(read(registers, *src)?)),
                Instruction::Print { src } => {
                    let value = read(registers, *src)?;
                    self.execution.output.push(value);
                }
                Instruction::Fail { error } => return Err(error.clone().into()),
            }
        }
        Ok(None)
    }

    fn call(&mut self, name: &str, args: &[Register], registers: &[i64]) -> VmResult<i64> {
        let program = self.program;
        let callee = program
            .functions
            .get(name)
            .ok_or_else(|| VmError::UndefinedFunction {
                name: name.to_string(),
            })?;

        // The frame lives for exactly this activation.
        let mut frame = vec![0; callee.registers];
        let mut locals = vec![None; callee.slots];
        for (&slot, &arg) in callee.params.iter().zip(args) {
            let value = read(registers, arg)?;
            let cell = locals
                .get_mut(slot)
                .ok_or(VmError::InvalidSlot { slot })?;
            *cell = Some(value);
        }

        self.execute(callee, &mut frame, &mut locals)?
            .ok_or_else(|| VmError::MissingReturn {
                name: name.to_string(),
            })
    }
}

fn read(registers: &[i64], register: Register) -> VmResult<i64> {
    registers
        .get(register)
        .copied()
        .ok_or(VmError::InvalidRegister { register })
}

fn write(registers: &mut [i64], register: Register, value: i64) -> VmResult<()> {
    let slot = registers
        .get_mut(register)
        .ok_or(VmError::InvalidRegister { register })?;
    *slot = value;
    Ok(())
}

// Jumping to the end of the chunk is allowed and finishes it.
fn jump_target(chunk: &Chunk, target: usize) -> VmResult<usize> {
    if target > chunk.code.len() {
        return Err(VmError::InvalidJumpTarget {
            target,
            len: chunk.code.len(),
        });
    }
    Ok(target)
}

/// Register-machine backend: compiles each expression, then executes it.
pub struct VM;

impl VM {
    pub fn new() -> Self {
        Self
    }
}

impl Default for VM {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for VM {
    fn name(&self) -> &'static str {
        "vm"
    }

    fn run(&self, expression: &Expression, context: &mut Context) -> Result<Evaluation> {
        let program = compile(expression, &mut context.globals, &context.functions);
        let execution = run(&program, &mut context.globals)?;
        let value = execution
            .output
            .last()
            .copied()
            .ok_or(VmError::NoOutput)?;
        Ok(Evaluation {
            value,
            diagnostics: execution.diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOperator, Statement};
    use crate::backend::interpreter::Interpreter;
    use crate::parser::parse;
    use rustc_hash::FxHashMap;

    fn chunk(name: &str, code: Vec<Instruction>, registers: usize, slots: usize) -> Chunk {
        Chunk {
            name: name.to_string(),
            params: Vec::new(),
            code,
            registers,
            slots,
        }
    }

    fn program(main: Chunk) -> Program {
        Program {
            main,
            functions: FxHashMap::default(),
        }
    }

    /// Runs the same lines through both backends, each with its own context.
    struct Pair {
        interpreter: Context,
        vm: Context,
    }

    impl Pair {
        fn new() -> Self {
            Self {
                interpreter: Context::new(),
                vm: Context::new(),
            }
        }

        fn line(&mut self, source: &str) -> i64 {
            let interpreter = Interpreter::new();
            let vm = VM::new();
            let mut values = Vec::new();
            for (context, backend) in [
                (&mut self.interpreter, &interpreter as &dyn Backend),
                (&mut self.vm, &vm as &dyn Backend),
            ] {
                match parse(source, &context.functions).expect("parse failed") {
                    Statement::FunctionDef { name, params, body } => {
                        context.functions.define(name, params, body);
                        values.push(0);
                    }
                    Statement::Expr(expr) => {
                        let evaluation = backend.run(&expr, context).expect("run failed");
                        assert!(evaluation.diagnostics.is_empty());
                        values.push(evaluation.value);
                    }
                }
            }
            assert_eq!(values[0], values[1], "backends disagree on {source:?}");
            assert_eq!(
                self.interpreter.globals.to_string(),
                self.vm.globals.to_string(),
                "globals disagree after {source:?}"
            );
            values[1]
        }

        /// Runs an expression line that must fail on both backends with the same
        /// message. Returns the VM's error.
        fn failing_line(&mut self, source: &str) -> anyhow::Error {
            let interpreter = Interpreter::new();
            let vm = VM::new();
            let mut errors = Vec::new();
            for (context, backend) in [
                (&mut self.interpreter, &interpreter as &dyn Backend),
                (&mut self.vm, &vm as &dyn Backend),
            ] {
                let expr = match parse(source, &context.functions).expect("parse failed") {
                    Statement::Expr(expr) => expr,
                    other => panic!("expected expression, got {other:?}"),
                };
                errors.push(backend.run(&expr, context).expect_err("expected failure"));
            }
            assert_eq!(
                errors[0].to_string(),
                errors[1].to_string(),
                "backends disagree on {source:?}"
            );
            assert_eq!(
                self.interpreter.globals.to_string(),
                self.vm.globals.to_string(),
                "globals disagree after {source:?}"
            );
            errors.remove(1)
        }
    }

    #[test]
    fn agrees_with_interpreter_on_arithmetic() {
        let mut pair = Pair::new();
        assert_eq!(pair.line("2+3*4"), 14);
        assert_eq!(pair.line("(2+3)*4"), 20);
        assert_eq!(pair.line("Five = 2 + 3"), 5);
        assert_eq!(pair.line("Five * -4"), -20);
        assert_eq!(pair.line("Age = 2 + 3 * Five"), 17);
        assert_eq!(pair.line("-7 / 2"), -3);
        assert_eq!(pair.line("-7 % 2"), -1);
        assert_eq!(pair.line("z"), 0);
    }

    #[test]
    fn agrees_with_interpreter_on_assignment_order() {
        let mut pair = Pair::new();
        assert_eq!(pair.line("A = 3 + (B = 2)"), 5);
        assert_eq!(pair.line("C = D = A"), 5);
        assert_eq!(pair.line("E = F + (F = 1)"), 1);
        assert_eq!(pair.line("E = (F = 1) + F"), 2);
    }

    #[test]
    fn agrees_with_interpreter_on_conditionals() {
        let mut pair = Pair::new();
        pair.line("A = 1");
        pair.line("B = 2");
        assert_eq!(pair.line("A < B ? (t = 1) : (f = 1)"), 1);
        assert_eq!(pair.line("A > B ? (x = 1) : A == B ? (y = 2) : (w = 3)"), 3);
        assert_eq!(pair.line("PIE = A < B ? A - B : B - A"), -1);
        assert_eq!(
            pair.vm.globals.to_string(),
            "{ A=1 B=2 PIE=-1 t=1 w=3 }"
        );
    }

    #[test]
    fn agrees_with_interpreter_on_functions() {
        let mut pair = Pair::new();
        pair.line("deffn sqr(x)=x*x");
        pair.line("deffn abs(x)=x>0?x:-x");
        pair.line("deffn fact(n)=n<=1?1:n*fact(n-1)");
        pair.line("deffn add(a,b)=a+b");
        pair.line("deffn three()=3");
        assert_eq!(pair.line("Three = abs(-3)"), 3);
        assert_eq!(pair.line("3 + add(Three - 1, Three + 1)"), 9);
        assert_eq!(pair.line("three() * 9 + Three"), 30);
        assert_eq!(pair.line("fact(5)"), 120);
        assert_eq!(pair.line("fact(3) + fact(2)"), 8);
        assert_eq!(pair.line("sqr(sqr(3))"), 81);
        assert_eq!(pair.line("n = 7"), 7);
        assert_eq!(pair.line("fact(n) + n"), 5047);
    }

    #[test]
    fn unrecognized_operation_is_reported_and_yields_zero() {
        let program = program(chunk(
            "main",
            vec![
                Instruction::LoadConst { dst: 0, value: 4 },
                Instruction::LoadConst { dst: 1, value: 5 },
                Instruction::Compute {
                    op: BinaryOperator::Assign,
                    dst: 2,
                    left: 0,
                    right: 1,
                },
                Instruction::Print { src: 2 },
            ],
            3,
            0,
        ));
        let execution = run(&program, &mut SymbolTable::new()).expect("run failed");
        assert_eq!(execution.output, vec![0]);
        assert_eq!(
            execution.diagnostics,
            vec!["Operation \"=\" not recognized.".to_string()]
        );
    }

    #[test]
    fn rejects_out_of_range_operands() {
        let mut globals = SymbolTable::new();
        let bad_register = program(chunk("main", vec![Instruction::Print { src: 3 }], 1, 0));
        assert_eq!(
            run(&bad_register, &mut globals),
            Err(VmError::InvalidRegister { register: 3 })
        );

        let bad_slot = program(chunk(
            "main",
            vec![Instruction::LoadVar { dst: 0, slot: 2 }],
            1,
            0,
        ));
        assert_eq!(
            run(&bad_slot, &mut globals),
            Err(VmError::InvalidSlot { slot: 2 })
        );

        let bad_jump = program(chunk("main", vec![Instruction::Jump { target: 5 }], 0, 0));
        assert_eq!(
            run(&bad_jump, &mut globals),
            Err(VmError::InvalidJumpTarget { target: 5, len: 1 })
        );
    }

    #[test]
    fn calls_need_a_compiled_callee_that_returns() {
        let mut globals = SymbolTable::new();
        let call = vec![Instruction::Call {
            function: "f".to_string(),
            args: Vec::new(),
            dst: 0,
        }];

        let missing = program(chunk("main", call.clone(), 1, 0));
        assert_eq!(
            run(&missing, &mut globals),
            Err(VmError::UndefinedFunction {
                name: "f".to_string()
            })
        );

        let mut silent = program(chunk("main", call, 1, 0));
        silent.functions.insert(
            "f".to_string(),
            chunk("f", vec![Instruction::LoadConst { dst: 0, value: 1 }], 1, 0),
        );
        assert_eq!(
            run(&silent, &mut globals),
            Err(VmError::MissingReturn {
                name: "f".to_string()
            })
        );
    }

    #[test]
    fn untaken_bad_assignment_is_never_reached() {
        let mut pair = Pair::new();
        assert_eq!(pair.line("0 ? ((a+b)=1) : 5"), 5);
        assert_eq!(pair.line("1 ? 6 : ((a+b)=1)"), 6);
        assert!(pair.vm.globals.is_empty());
    }

    #[test]
    fn bad_assignment_fails_after_earlier_side_effects() {
        let mut pair = Pair::new();
        let err = pair.failing_line("x = (y=1) + 0 * ((a+b)=2)");
        assert!(matches!(
            err.downcast_ref::<VmError>(),
            Some(VmError::Rejected(CompileError::InvalidAssignmentTarget { .. }))
        ));
        assert_eq!(pair.vm.globals.to_string(), "{ y=1 }");
    }

    #[test]
    fn bad_calls_fail_only_when_reached() {
        let mut pair = Pair::new();
        pair.line("deffn g(a)=a");
        pair.line("deffn f(x)=x ? g() : 7");
        assert_eq!(pair.line("f(0)"), 7);

        let err = pair.failing_line("r = f(1)");
        assert_eq!(
            err.downcast_ref::<VmError>(),
            Some(&VmError::Rejected(CompileError::FunctionArityMismatch {
                name: "g".to_string(),
                expected: 1,
                found: 0,
            }))
        );
        assert!(pair.vm.globals.is_empty());

        pair.line("deffn g()=9");
        assert_eq!(pair.line("r = f(1)"), 9);
    }
}
