use thiserror::Error;

use super::bytecode::CompileError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VmError {
    #[error("Register T{register} is out of range")]
    InvalidRegister { register: usize },
    #[error("Variable slot {slot} is out of range")]
    InvalidSlot { slot: usize },
    #[error("Jump target {target} is outside a chunk of {len} instructions")]
    InvalidJumpTarget { target: usize, len: usize },
    #[error("Undefined function '{name}'")]
    UndefinedFunction { name: String },
    #[error("Function '{name}' finished without returning a value")]
    MissingReturn { name: String },
    #[error("Program finished without printing a value")]
    NoOutput,
    /// Execution reached a construct the compiler lowered to `Fail`.
    #[error(transparent)]
    Rejected(#[from] CompileError),
}

pub type VmResult<T> = Result<T, VmError>;
