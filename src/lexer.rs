use std::{iter::Peekable, str::CharIndices};

use crate::token::{Span, Token, TokenKind};

mod error;

pub use error::{LexError, LexResult};

pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    eof_reached: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            eof_reached: false,
        }
    }

    pub fn next_token(&mut self) -> LexResult<Token<'a>> {
        self.skip_whitespace();

        let (start, ch) = match self.chars.peek() {
            Some(&(idx, c)) => (idx, c),
            None => {
                self.eof_reached = true;
                let index = self.input.len();
                return Ok(Token::new(
                    TokenKind::EOF,
                    Span {
                        start: index,
                        end: index,
                    },
                ));
            }
        };

        match ch {
            '+' => Ok(self.single(TokenKind::Plus, start)),
            '-' => Ok(self.single(TokenKind::Minus, start)),
            '*' => Ok(self.single(TokenKind::Star, start)),
            '/' => Ok(self.single(TokenKind::Slash, start)),
            '%' => Ok(self.single(TokenKind::Percent, start)),
            '?' => Ok(self.single(TokenKind::Question, start)),
            ':' => Ok(self.single(TokenKind::Colon, start)),
            '~' => Ok(self.single(TokenKind::Tilde, start)),
            ',' => Ok(self.single(TokenKind::Comma, start)),
            '(' => Ok(self.single(TokenKind::LParen, start)),
            ')' => Ok(self.single(TokenKind::RParen, start)),
            '=' => Ok(self.with_equal(TokenKind::Equal, TokenKind::EqualEqual, start)),
            '<' => Ok(self.with_equal(TokenKind::Less, TokenKind::LessEqual, start)),
            '>' => Ok(self.with_equal(TokenKind::Greater, TokenKind::GreaterEqual, start)),
            '!' => {
                self.chars.next();
                if self.next_is('=') {
                    self.chars.next();
                    Ok(Token::new(
                        TokenKind::NotEqual,
                        Span {
                            start,
                            end: start + 2,
                        },
                    ))
                } else {
                    Err(LexError::UnexpectedCharacter {
                        character: '!',
                        position: start,
                    })
                }
            }
            c if c.is_alphabetic() || c == '_' => Ok(self.read_identifier(start)),
            c if c.is_ascii_digit() => self.read_integer(start),
            _ => Err(LexError::UnexpectedCharacter {
                character: ch,
                position: start,
            }),
        }
    }

    fn single(&mut self, kind: TokenKind<'a>, start: usize) -> Token<'a> {
        self.chars.next();
        Token::new(
            kind,
            Span {
                start,
                end: start + 1,
            },
        )
    }

    /// Lexes `c` or `c=`, whichever is longer.
    fn with_equal(
        &mut self,
        short: TokenKind<'a>,
        long: TokenKind<'a>,
        start: usize,
    ) -> Token<'a> {
        self.chars.next();
        if self.next_is('=') {
            self.chars.next();
            Token::new(
                long,
                Span {
                    start,
                    end: start + 2,
                },
            )
        } else {
            Token::new(
                short,
                Span {
                    start,
                    end: start + 1,
                },
            )
        }
    }

    fn next_is(&mut self, expected: char) -> bool {
        matches!(self.chars.peek(), Some(&(_, c)) if c == expected)
    }

    fn skip_whitespace(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_whitespace() {
                self.chars.next();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self, start: usize) -> Token<'a> {
        self.chars.next(); // Consume first char
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.chars.next();
            } else {
                break;
            }
        }

        let end = self.current_index();
        let ident = &self.input[start..end];
        let kind = match ident {
            "deffn" => TokenKind::Deffn,
            _ => TokenKind::Identifier(ident),
        };
        Token::new(kind, Span { start, end })
    }

    fn read_integer(&mut self, start: usize) -> LexResult<Token<'a>> {
        self.chars.next(); // Consume first digit
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_digit() {
                self.chars.next();
            } else {
                break;
            }
        }

        let end = self.current_index();
        let literal = &self.input[start..end];
        let value = literal
            .parse::<i64>()
            .map_err(|_| LexError::InvalidIntegerLiteral {
                literal: literal.to_string(),
                position: start,
            })?;
        Ok(Token::new(TokenKind::Integer(value), Span { start, end }))
    }

    fn current_index(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(idx, _)| *idx)
            .unwrap_or(self.input.len())
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = LexResult<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.eof_reached {
            return None;
        }
        let token = self.next_token();
        if token.is_err() {
            self.eof_reached = true;
        }
        Some(token)
    }
}

/// Splits `input` into tokens. The returned vector always ends with `EOF`.
pub fn tokenize(input: &str) -> LexResult<Vec<Token<'_>>> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let is_eof = matches!(token.kind, TokenKind::EOF);
        tokens.push(token);
        if is_eof {
            break;
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind<'_>> {
        tokenize(input)
            .expect("tokenize should succeed")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn test_function_definition() {
        let expected_tokens = vec![
            TokenKind::Deffn,
            TokenKind::Identifier("fact"),
            TokenKind::LParen,
            TokenKind::Identifier("n"),
            TokenKind::RParen,
            TokenKind::Equal,
            TokenKind::Identifier("n"),
            TokenKind::LessEqual,
            TokenKind::Integer(1),
            TokenKind::Question,
            TokenKind::Integer(1),
            TokenKind::Colon,
            TokenKind::Identifier("n"),
            TokenKind::Star,
            TokenKind::Identifier("fact"),
            TokenKind::LParen,
            TokenKind::Identifier("n"),
            TokenKind::Minus,
            TokenKind::Integer(1),
            TokenKind::RParen,
            TokenKind::EOF,
        ];
        assert_eq!(kinds("deffn fact(n)=n<=1?1:n*fact(n-1)"), expected_tokens);
    }

    #[test]
    fn recognizes_two_character_operators() {
        assert_eq!(
            kinds("a >= b <= c == d != e > f < g = h"),
            vec![
                TokenKind::Identifier("a"),
                TokenKind::GreaterEqual,
                TokenKind::Identifier("b"),
                TokenKind::LessEqual,
                TokenKind::Identifier("c"),
                TokenKind::EqualEqual,
                TokenKind::Identifier("d"),
                TokenKind::NotEqual,
                TokenKind::Identifier("e"),
                TokenKind::Greater,
                TokenKind::Identifier("f"),
                TokenKind::Less,
                TokenKind::Identifier("g"),
                TokenKind::Equal,
                TokenKind::Identifier("h"),
                TokenKind::EOF,
            ]
        );
    }

    #[test]
    fn whitespace_is_only_a_separator() {
        assert_eq!(kinds("Five=2+3"), kinds("  Five = 2 +\t3  "));
        assert_eq!(kinds(""), vec![TokenKind::EOF]);
    }

    #[test]
    fn identifiers_are_case_sensitive_and_unbounded() {
        assert_eq!(
            kinds("Age age someVeryLongVariableName_2"),
            vec![
                TokenKind::Identifier("Age"),
                TokenKind::Identifier("age"),
                TokenKind::Identifier("someVeryLongVariableName_2"),
                TokenKind::EOF,
            ]
        );
    }

    #[test]
    fn records_spans() {
        let tokens = tokenize("ab <= 12").expect("tokenize should succeed");
        let spans = tokens.iter().map(|token| token.span).collect::<Vec<_>>();
        assert_eq!(
            spans,
            vec![
                Span { start: 0, end: 2 },
                Span { start: 3, end: 5 },
                Span { start: 6, end: 8 },
                Span { start: 8, end: 8 },
            ]
        );
    }

    #[test]
    fn errors_on_invalid_character() {
        let err = tokenize("x = 1 @ 2").expect_err("expected lexing failure");
        assert_eq!(
            err,
            LexError::UnexpectedCharacter {
                character: '@',
                position: 6
            }
        );
    }

    #[test]
    fn errors_on_lone_bang() {
        let err = tokenize("!x").expect_err("expected lexing failure");
        assert!(err.to_string().contains("Unexpected character '!'"));
    }

    #[test]
    fn iterator_stops_after_an_error() {
        let results = Lexer::new("1 ! 2").collect::<Vec<_>>();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    #[test]
    fn errors_on_integer_overflow() {
        let err = tokenize("n = 99999999999999999999999999").expect_err("expected overflow");
        assert!(err.to_string().contains("Invalid integer literal"));
    }
}
