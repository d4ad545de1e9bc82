pub mod ast;
pub mod backend;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod session;
pub mod symbols;
pub mod token;
