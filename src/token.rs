#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind<'a> {
    Identifier(&'a str),
    Integer(i64),

    // Keywords
    Deffn,

    // Operators
    Plus,         // +
    Minus,        // -
    Star,         // *
    Slash,        // /
    Percent,      // %
    Equal,        // =
    Question,     // ?
    Colon,        // :
    Greater,      // >
    Less,         // <
    GreaterEqual, // >=
    LessEqual,    // <=
    EqualEqual,   // ==
    NotEqual,     // !=
    Tilde,        // ~

    // Delimiters
    Comma,  // ,
    LParen, // (
    RParen, // )

    // Structural
    EOF,
}

impl TokenKind<'_> {
    /// Source text of the token, used when reporting what the parser found.
    pub fn text(&self) -> String {
        match self {
            TokenKind::Identifier(name) => name.to_string(),
            TokenKind::Integer(value) => value.to_string(),
            TokenKind::Deffn => "deffn".to_string(),
            TokenKind::Plus => "+".to_string(),
            TokenKind::Minus => "-".to_string(),
            TokenKind::Star => "*".to_string(),
            TokenKind::Slash => "/".to_string(),
            TokenKind::Percent => "%".to_string(),
            TokenKind::Equal => "=".to_string(),
            TokenKind::Question => "?".to_string(),
            TokenKind::Colon => ":".to_string(),
            TokenKind::Greater => ">".to_string(),
            TokenKind::Less => "<".to_string(),
            TokenKind::GreaterEqual => ">=".to_string(),
            TokenKind::LessEqual => "<=".to_string(),
            TokenKind::EqualEqual => "==".to_string(),
            TokenKind::NotEqual => "!=".to_string(),
            TokenKind::Tilde => "~".to_string(),
            TokenKind::Comma => ",".to_string(),
            TokenKind::LParen => "(".to_string(),
            TokenKind::RParen => ")".to_string(),
            TokenKind::EOF => "end of input".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Span,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind<'a>, span: Span) -> Self {
        Self { kind, span }
    }
}
