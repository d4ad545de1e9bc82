#![allow(dead_code)]
use std::fs;
use std::path::Path;

use exprtree::ast::Statement;
use exprtree::functions::FunctionTable;
use exprtree::parser;
use test_support::{CaseClass, load_cases};

/// Runtime-success fixtures that opt into benchmarking, as `(label, source)`.
pub fn workloads() -> Vec<(String, String)> {
    load_cases(Path::new("tests/programs"))
        .expect("load cases")
        .into_iter()
        .filter(|case| case.spec.bench.enabled && case.spec.class == CaseClass::RuntimeSuccess)
        .map(|case| {
            let source = fs::read_to_string(&case.program_path)
                .unwrap_or_else(|err| panic!("read {}: {err}", case.program_path.display()));
            (case.name, source)
        })
        .collect()
}

/// Lines that reach the parser: no blanks, comments or `:` commands.
pub fn statement_lines(source: &str) -> Vec<&str> {
    source
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with(':'))
        .collect()
}

/// Parses every line, registering definitions as it goes.
pub fn parse_all(lines: &[&str]) -> Vec<Statement> {
    let mut functions = FunctionTable::new();
    let mut statements = Vec::with_capacity(lines.len());
    for line in lines {
        let statement =
            parser::parse(line, &functions).unwrap_or_else(|err| panic!("parse {line}: {err}"));
        if let Statement::FunctionDef { name, params, body } = &statement {
            functions.define(name.clone(), params.clone(), body.clone());
        }
        statements.push(statement);
    }
    statements
}
