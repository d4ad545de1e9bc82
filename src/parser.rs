use anyhow::Result;

use crate::ast::{BinaryOperator, Expression, Statement};
use crate::functions::FunctionTable;
use crate::lexer;
use crate::token::{Token, TokenKind};

mod error;

pub use error::{ParseError, ParseResult};

/// Recursive-descent parser for one input line.
///
/// Precedence, lowest first: assignment, conditional, relational test, sum,
/// product, factor. An identifier is a call only when the function table (or
/// the definition currently being parsed) knows its name.
pub struct Parser<'a, 'f> {
    tokens: Vec<Token<'a>>,
    position: usize,
    functions: &'f FunctionTable,
    defining: Option<&'a str>,
}

impl<'a, 'f> Parser<'a, 'f> {
    pub fn new(tokens: Vec<Token<'a>>, functions: &'f FunctionTable) -> Self {
        Self {
            tokens,
            position: 0,
            functions,
            defining: None,
        }
    }

    pub fn parse_statement(mut self) -> ParseResult<Statement> {
        let statement = if matches!(self.current(), TokenKind::Deffn) {
            self.parse_function_def()?
        } else {
            Statement::Expr(self.parse_assignment()?)
        };
        self.expect_eof()?;
        Ok(statement)
    }

    fn parse_function_def(&mut self) -> ParseResult<Statement> {
        self.advance(); // deffn
        let name = self.expect_identifier()?;
        self.expect(TokenKind::LParen, "(")?;

        let mut params = Vec::new();
        if !matches!(self.current(), TokenKind::RParen) {
            loop {
                params.push(self.expect_identifier()?.to_string());
                if matches!(self.current(), TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, ")")?;
        self.expect(TokenKind::Equal, "=")?;

        self.defining = Some(name);
        let body = self.parse_assignment()?;
        self.defining = None;

        Ok(Statement::FunctionDef {
            name: name.to_string(),
            params,
            body,
        })
    }

    /// `conditional ('=' assignment)?`, so chains nest to the right.
    fn parse_assignment(&mut self) -> ParseResult<Expression> {
        let target = self.parse_conditional()?;
        if matches!(self.current(), TokenKind::Equal) {
            self.advance();
            let value = self.parse_assignment()?;
            return Ok(Expression::binary(target, BinaryOperator::Assign, value));
        }
        Ok(target)
    }

    fn parse_conditional(&mut self) -> ParseResult<Expression> {
        let test = self.parse_test()?;
        if !matches!(self.current(), TokenKind::Question) {
            return Ok(test);
        }
        self.advance();
        let if_true = self.parse_test()?;
        self.expect(TokenKind::Colon, ":")?;
        let if_false = self.parse_conditional()?;
        Ok(Expression::conditional(test, if_true, if_false))
    }

    fn parse_test(&mut self) -> ParseResult<Expression> {
        let mut expr = self.parse_sum()?;
        loop {
            let op = match self.current() {
                TokenKind::Greater => BinaryOperator::Greater,
                TokenKind::Less => BinaryOperator::Less,
                TokenKind::GreaterEqual => BinaryOperator::GreaterEqual,
                TokenKind::LessEqual => BinaryOperator::LessEqual,
                TokenKind::EqualEqual => BinaryOperator::Equal,
                TokenKind::NotEqual => BinaryOperator::NotEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_sum()?;
            expr = Expression::binary(expr, op, right);
        }
        Ok(expr)
    }

    fn parse_sum(&mut self) -> ParseResult<Expression> {
        let mut expr = self.parse_product()?;
        loop {
            let op = match self.current() {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_product()?;
            expr = Expression::binary(expr, op, right);
        }
        Ok(expr)
    }

    fn parse_product(&mut self) -> ParseResult<Expression> {
        let mut expr = self.parse_factor()?;
        loop {
            let op = match self.current() {
                TokenKind::Star => BinaryOperator::Mul,
                TokenKind::Slash => BinaryOperator::Div,
                TokenKind::Percent => BinaryOperator::Rem,
                _ => break,
            };
            self.advance();
            let right = self.parse_factor()?;
            expr = Expression::binary(expr, op, right);
        }
        Ok(expr)
    }

    fn parse_factor(&mut self) -> ParseResult<Expression> {
        match self.current() {
            TokenKind::Minus | TokenKind::Tilde => {
                self.advance();
                let operand = self.parse_factor()?;
                Ok(Expression::negate(operand))
            }
            TokenKind::Integer(value) => {
                self.advance();
                Ok(Expression::Literal(value))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                if self.is_function(name) {
                    self.parse_call(name)
                } else {
                    Ok(Expression::Variable(name.to_string()))
                }
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_assignment()?;
                self.expect(TokenKind::RParen, ")")?;
                Ok(expr)
            }
            _ => Err(self.error("expression")),
        }
    }

    fn parse_call(&mut self, name: &str) -> ParseResult<Expression> {
        if !matches!(self.current(), TokenKind::LParen) {
            return Err(ParseError::MissingArguments {
                name: name.to_string(),
            });
        }
        self.advance();

        let mut args = Vec::new();
        if !matches!(self.current(), TokenKind::RParen) {
            loop {
                args.push(self.parse_assignment()?);
                if matches!(self.current(), TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, ")")?;

        Ok(Expression::Call {
            name: name.to_string(),
            args,
        })
    }

    fn is_function(&self, name: &str) -> bool {
        self.defining == Some(name) || self.functions.contains(name)
    }

    fn expect_identifier(&mut self) -> ParseResult<&'a str> {
        if let TokenKind::Identifier(name) = self.current() {
            self.advance();
            Ok(name)
        } else {
            Err(self.error("identifier"))
        }
    }

    fn expect(&mut self, kind: TokenKind<'a>, expected: &str) -> ParseResult<()> {
        if self.current() == kind {
            self.advance();
            Ok(())
        } else {
            Err(self.error(expected))
        }
    }

    fn expect_eof(&self) -> ParseResult<()> {
        if matches!(self.current(), TokenKind::EOF) {
            Ok(())
        } else {
            Err(self.error("end of input"))
        }
    }

    fn current(&self) -> TokenKind<'a> {
        self.tokens
            .get(self.position)
            .map(|token| token.kind)
            .unwrap_or(TokenKind::EOF)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn error(&self, expected: &str) -> ParseError {
        let position = self
            .tokens
            .get(self.position)
            .or(self.tokens.last())
            .map(|token| token.span.start)
            .unwrap_or(0);
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: self.current().text(),
            position,
        }
    }
}

pub fn parse_tokens(tokens: Vec<Token<'_>>, functions: &FunctionTable) -> ParseResult<Statement> {
    Parser::new(tokens, functions).parse_statement()
}

/// Tokenizes and parses one line.
pub fn parse(input: &str, functions: &FunctionTable) -> Result<Statement> {
    let tokens = lexer::tokenize(input)?;
    Ok(parse_tokens(tokens, functions)?)
}
