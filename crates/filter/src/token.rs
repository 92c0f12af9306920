//! Filter tokens.

use std::fmt;

use crate::ast::Literal;

/// Token classification.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Bare identifier (one path segment).
    Identifier,
    /// `@name` external reference; holds the name without the marker.
    External(String),
    /// Any literal: number, string, boolean, null, temporal or infinity.
    Literal(Literal),

    /// `.`
    Dot,
    /// `,`
    Comma,
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,

    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,

    /// `=`
    Equal,
    /// `!=`
    NotEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `in`
    In,
    /// `!in`
    NotIn,
    /// `like`
    Like,
    /// `!like`
    NotLike,
    /// `ilike`
    ILike,
    /// `!ilike`
    NotILike,

    /// `and`
    And,
    /// `or`
    Or,
    /// `not`
    Not,
}

impl TokenKind {
    /// Returns true if a token of this kind can end an operand, which decides
    /// whether a following `-` is binary subtraction or a literal sign.
    pub fn ends_operand(&self) -> bool {
        matches!(
            self,
            TokenKind::Identifier
                | TokenKind::External(_)
                | TokenKind::Literal(_)
                | TokenKind::RightParen
                | TokenKind::RightBracket
        )
    }

    /// Returns true for keywords that may still be used as a path segment
    /// after a `.`.
    pub fn is_word(&self) -> bool {
        matches!(
            self,
            TokenKind::Identifier
                | TokenKind::In
                | TokenKind::Like
                | TokenKind::ILike
                | TokenKind::And
                | TokenKind::Or
                | TokenKind::Not
                | TokenKind::Literal(Literal::Boolean(_))
                | TokenKind::Literal(Literal::Null)
        )
    }
}

/// A token with its source text and byte offset.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Classification.
    pub kind: TokenKind,
    /// Source text of the token.
    pub text: String,
    /// Byte offset of the first character.
    pub position: usize,
}

impl Token {
    /// Creates a token.
    pub fn new(kind: TokenKind, text: impl Into<String>, position: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            position,
        }
    }

    /// Byte offset just past the end of the token.
    pub fn end(&self) -> usize {
        self.position + self.text.len()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.text)
    }
}
