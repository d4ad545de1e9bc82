//! Syntax tree shared by both execution backends.
//!
//! The parser builds these nodes once per input line. The interpreter walks
//! them directly while the VM lowers them into register-machine code. Nodes are
//! never mutated after construction.

use std::fmt;

#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    Literal(i64),
    Variable(String),
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },
    Conditional {
        test: Box<Expression>,
        if_true: Box<Expression>,
        if_false: Box<Expression>,
    },
    Call {
        name: String,
        args: Vec<Expression>,
    },
}

impl Expression {
    pub fn binary(left: Expression, op: BinaryOperator, right: Expression) -> Self {
        Expression::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Unary minus, spelled as multiplication by -1 so the tree needs no extra variant.
    pub fn negate(operand: Expression) -> Self {
        Expression::binary(operand, BinaryOperator::Mul, Expression::Literal(-1))
    }

    pub fn conditional(test: Expression, if_true: Expression, if_false: Expression) -> Self {
        Expression::Conditional {
            test: Box::new(test),
            if_true: Box::new(if_true),
            if_false: Box::new(if_false),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BinaryOperator {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Greater,
    Less,
    GreaterEqual,
    LessEqual,
    Equal,
    NotEqual,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Assign => "=",
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Rem => "%",
            BinaryOperator::Greater => ">",
            BinaryOperator::Less => "<",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
        }
    }

    /// Applies a value-producing operator to two integers.
    ///
    /// Relational operators yield 1 or 0. `+ - *` wrap on overflow; `/` and `%`
    /// keep the native trap on a zero divisor. Returns `None` for `=`, which
    /// needs a write target rather than two values.
    pub fn apply(&self, left: i64, right: i64) -> Option<i64> {
        let value = match self {
            BinaryOperator::Assign => return None,
            BinaryOperator::Add => left.wrapping_add(right),
            BinaryOperator::Sub => left.wrapping_sub(right),
            BinaryOperator::Mul => left.wrapping_mul(right),
            BinaryOperator::Div => left.wrapping_div(right),
            BinaryOperator::Rem => left.wrapping_rem(right),
            BinaryOperator::Greater => i64::from(left > right),
            BinaryOperator::Less => i64::from(left < right),
            BinaryOperator::GreaterEqual => i64::from(left >= right),
            BinaryOperator::LessEqual => i64::from(left <= right),
            BinaryOperator::Equal => i64::from(left == right),
            BinaryOperator::NotEqual => i64::from(left != right),
        };
        Some(value)
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Postfix rendering used in diagnostics: `A B +`, `((t) ? (a) : (b))`, `f((x),(y))`.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(value) => write!(f, "{value}"),
            Expression::Variable(name) => f.write_str(name),
            Expression::BinaryOp { left, op, right } => write!(f, "{left} {right} {op}"),
            Expression::Conditional {
                test,
                if_true,
                if_false,
            } => write!(f, "(({test}) ? ({if_true}) : ({if_false}))"),
            Expression::Call { name, args } => {
                let rendered = args
                    .iter()
                    .map(|arg| format!("({arg})"))
                    .collect::<Vec<_>>()
                    .join(",");
                write!(f, "{name}({rendered})")
            }
        }
    }
}

/// One parsed input line.
#[derive(Debug, PartialEq, Clone)]
pub enum Statement {
    FunctionDef {
        name: String,
        params: Vec<String>,
        body: Expression,
    },
    Expr(Expression),
}
