use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Expected {expected}, got '{found}' at position {position}")]
    UnexpectedToken {
        expected: String,
        found: String,
        position: usize,
    },
    #[error("Function '{name}' must be followed by an argument list")]
    MissingArguments { name: String },
}

pub type ParseResult<T> = Result<T, ParseError>;
