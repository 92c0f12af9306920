//! Filter lexer.
//!
//! Converts filter text into a token stream. Temporal literals are recognized
//! by their fixed-length digit patterns before numbers are tried, so
//! `2024-01-31` is a date rather than an arithmetic expression.

use chrono::{DateTime, NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::{Literal, Number};
use crate::error::{ParseResult, SyntaxError};
use crate::token::{Token, TokenKind};

static DATETIME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}(?::\d{2}(?:\.\d{1,9})?)?(?:Z|[+-]\d{2}:\d{2})?")
        .unwrap_or_else(|e| unreachable!("invalid datetime pattern: {}", e))
});

static DATE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}")
        .unwrap_or_else(|e| unreachable!("invalid date pattern: {}", e))
});

static TIME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{2}:\d{2}(?::\d{2}(?:\.\d{1,9})?)?")
        .unwrap_or_else(|e| unreachable!("invalid time pattern: {}", e))
});

/// Tokenizes a filter string.
pub fn tokenize(input: &str) -> ParseResult<Vec<Token>> {
    Lexer::new(input).tokenize()
}

/// Filter lexer.
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    tokens: Vec<Token>,
    max_tokens: Option<usize>,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer over the input.
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            tokens: Vec::new(),
            max_tokens: None,
        }
    }

    /// Stops with an error once more than `max` tokens have been produced.
    pub fn with_max_tokens(mut self, max: usize) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Consumes the lexer and returns all tokens.
    pub fn tokenize(mut self) -> ParseResult<Vec<Token>> {
        loop {
            self.skip_whitespace();
            let Some(c) = self.peek() else {
                break;
            };

            if let Some(max) = self.max_tokens {
                if self.tokens.len() >= max {
                    return Err(SyntaxError::new(
                        self.pos,
                        format!("filter exceeds the maximum of {} tokens", max),
                    ));
                }
            }

            let start = self.pos;
            match c {
                c if is_identifier_start(c) => self.lex_word(),
                c if c.is_ascii_digit() => self.lex_digits(start)?,
                '-' if self.sign_allowed() => self.lex_signed(start)?,
                '\'' | '"' => self.lex_string(c)?,
                '@' => self.lex_external()?,
                '!' => self.lex_bang()?,
                '>' | '<' => {
                    self.advance(c);
                    let kind = match (c, self.peek()) {
                        ('>', Some('=')) => TokenKind::GreaterEqual,
                        ('<', Some('=')) => TokenKind::LessEqual,
                        ('>', _) => TokenKind::Greater,
                        _ => TokenKind::Less,
                    };
                    if matches!(kind, TokenKind::GreaterEqual | TokenKind::LessEqual) {
                        self.advance('=');
                    }
                    self.push(kind, start);
                }
                _ => {
                    let kind = match c {
                        '=' => TokenKind::Equal,
                        '.' => TokenKind::Dot,
                        ',' => TokenKind::Comma,
                        '(' => TokenKind::LeftParen,
                        ')' => TokenKind::RightParen,
                        '[' => TokenKind::LeftBracket,
                        ']' => TokenKind::RightBracket,
                        '+' => TokenKind::Plus,
                        '-' => TokenKind::Minus,
                        '*' => TokenKind::Star,
                        '/' => TokenKind::Slash,
                        other => {
                            return Err(SyntaxError::new(
                                start,
                                format!("unexpected character '{}'", other),
                            ));
                        }
                    };
                    self.advance(c);
                    self.push(kind, start);
                }
            }
        }
        Ok(self.tokens)
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self, c: char) {
        self.pos += c.len_utf8();
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance(c);
            } else {
                break;
            }
        }
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        let text = &self.input[start..self.pos];
        self.tokens.push(Token::new(kind, text, start));
    }

    /// A `-` is a literal sign only where an operand is expected.
    fn sign_allowed(&self) -> bool {
        !self
            .tokens
            .last()
            .is_some_and(|token| token.kind.ends_operand())
    }

    fn lex_word(&mut self) {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if is_identifier_part(c) {
                self.advance(c);
            } else {
                break;
            }
        }
        let word = &self.input[start..self.pos];
        let kind = match word.to_ascii_lowercase().as_str() {
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "in" => TokenKind::In,
            "like" => TokenKind::Like,
            "ilike" => TokenKind::ILike,
            "true" => TokenKind::Literal(Literal::Boolean(true)),
            "false" => TokenKind::Literal(Literal::Boolean(false)),
            "null" => TokenKind::Literal(Literal::Null),
            _ if word == "Infinity" => TokenKind::Literal(Literal::Infinity { negative: false }),
            _ => TokenKind::Identifier,
        };
        self.push(kind, start);
    }

    /// Lexes a literal that starts with a digit: datetime, date, time or number.
    fn lex_digits(&mut self, start: usize) -> ParseResult<()> {
        let rest = self.rest();
        if let Some(m) = DATETIME_PATTERN.find(rest) {
            let text = m.as_str();
            self.pos += m.end();
            self.check_literal_boundary()?;
            let value = parse_datetime(text).ok_or_else(|| {
                SyntaxError::new(start, format!("invalid datetime literal '{}'", text))
            })?;
            self.push(TokenKind::Literal(Literal::DateTime(value)), start);
            return Ok(());
        }
        if let Some(m) = DATE_PATTERN.find(rest) {
            let text = m.as_str();
            self.pos += m.end();
            self.check_literal_boundary()?;
            let value = NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map_err(|_| SyntaxError::new(start, format!("invalid date literal '{}'", text)))?;
            self.push(TokenKind::Literal(Literal::Date(value)), start);
            return Ok(());
        }
        if let Some(m) = TIME_PATTERN.find(rest) {
            let text = m.as_str();
            self.pos += m.end();
            self.check_literal_boundary()?;
            let value = parse_time(text)
                .ok_or_else(|| SyntaxError::new(start, format!("invalid time literal '{}'", text)))?;
            self.push(TokenKind::Literal(Literal::Time(value)), start);
            return Ok(());
        }
        self.lex_number(start)
    }

    /// Lexes `-<number>` or `-Infinity` in operand position.
    fn lex_signed(&mut self, start: usize) -> ParseResult<()> {
        let after = &self.rest()[1..];
        if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.advance('-');
            return self.lex_number(start);
        }
        if after.starts_with("Infinity")
            && !after["Infinity".len()..]
                .chars()
                .next()
                .is_some_and(is_identifier_part)
        {
            self.pos += 1 + "Infinity".len();
            self.push(TokenKind::Literal(Literal::Infinity { negative: true }), start);
            return Ok(());
        }
        self.advance('-');
        self.push(TokenKind::Minus, start);
        Ok(())
    }

    /// Lexes an integer, decimal or exponent number. A leading sign, if any,
    /// has already been consumed.
    fn lex_number(&mut self, start: usize) -> ParseResult<()> {
        let mut is_float = false;
        self.consume_digits();

        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.advance('.');
            self.consume_digits();
        }

        if matches!(self.peek(), Some('e') | Some('E')) {
            let exponent_pos = self.pos;
            self.advance('e');
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.pos += 1;
            }
            if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return Err(SyntaxError::new(exponent_pos, "malformed number exponent"));
            }
            is_float = true;
            self.consume_digits();
        }

        self.check_literal_boundary()?;

        let text = &self.input[start..self.pos];
        let number = if is_float {
            None
        } else {
            text.parse::<i64>().ok().map(Number::Integer)
        };
        let number = match number {
            Some(n) => n,
            None => text
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Number::Float)
                .ok_or_else(|| SyntaxError::new(start, format!("number out of range '{}'", text)))?,
        };
        self.push(TokenKind::Literal(Literal::Number(number)), start);
        Ok(())
    }

    fn consume_digits(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.advance(c);
            } else {
                break;
            }
        }
    }

    /// A literal must not run straight into an identifier character.
    fn check_literal_boundary(&self) -> ParseResult<()> {
        match self.peek() {
            Some(c) if is_identifier_part(c) => Err(SyntaxError::new(
                self.pos,
                format!("unexpected character '{}' after literal", c),
            )),
            _ => Ok(()),
        }
    }

    fn lex_string(&mut self, quote: char) -> ParseResult<()> {
        let start = self.pos;
        self.advance(quote);
        let mut value = String::new();

        loop {
            let Some(c) = self.peek() else {
                return Err(SyntaxError::new(start, "unterminated string"));
            };
            if c == quote {
                self.advance(c);
                break;
            }
            if c == '\\' {
                let escape_pos = self.pos;
                self.advance(c);
                let Some(escaped) = self.peek() else {
                    return Err(SyntaxError::new(start, "unterminated string"));
                };
                self.advance(escaped);
                match escaped {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    '\'' => value.push('\''),
                    '"' => value.push('"'),
                    '\\' => value.push('\\'),
                    'u' => {
                        let hex: String = self.rest().chars().take(4).collect();
                        let decoded = (hex.len() == 4)
                            .then(|| u32::from_str_radix(&hex, 16).ok())
                            .flatten()
                            .and_then(char::from_u32)
                            .ok_or_else(|| SyntaxError::new(escape_pos, "invalid unicode escape"))?;
                        self.pos += 4;
                        value.push(decoded);
                    }
                    other => {
                        value.push('\\');
                        value.push(other);
                    }
                }
                continue;
            }
            self.advance(c);
            value.push(c);
        }

        self.push(TokenKind::Literal(Literal::String(value)), start);
        Ok(())
    }

    fn lex_external(&mut self) -> ParseResult<()> {
        let start = self.pos;
        self.advance('@');
        let mut segments = Vec::new();
        loop {
            let segment_start = self.pos;
            match self.peek() {
                Some(c) if is_identifier_start(c) => {}
                Some(c) => {
                    return Err(SyntaxError::new(
                        segment_start,
                        format!("unexpected character '{}' in external reference", c),
                    ));
                }
                None => {
                    return Err(SyntaxError::new(
                        segment_start,
                        "expected a name after '@'",
                    ));
                }
            }
            while let Some(c) = self.peek() {
                if is_identifier_part(c) {
                    self.advance(c);
                } else {
                    break;
                }
            }
            segments.push(&self.input[segment_start..self.pos]);
            if self.peek() == Some('.') && self.peek_at(1).is_some_and(is_identifier_start) {
                self.advance('.');
            } else {
                break;
            }
        }
        self.push(TokenKind::External(segments.join(".")), start);
        Ok(())
    }

    fn lex_bang(&mut self) -> ParseResult<()> {
        let start = self.pos;
        self.advance('!');
        if self.peek() == Some('=') {
            self.advance('=');
            self.push(TokenKind::NotEqual, start);
            return Ok(());
        }

        let word_start = self.pos;
        while let Some(c) = self.peek() {
            if is_identifier_part(c) {
                self.advance(c);
            } else {
                break;
            }
        }
        let kind = match self.input[word_start..self.pos].to_ascii_lowercase().as_str() {
            "in" => TokenKind::NotIn,
            "like" => TokenKind::NotLike,
            "ilike" => TokenKind::NotILike,
            _ => return Err(SyntaxError::new(start, "unexpected character '!'")),
        };
        self.push(kind, start);
        Ok(())
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_part(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

pub(crate) fn parse_time(text: &str) -> Option<NaiveTime> {
    let normalized = if text.len() == 5 {
        format!("{}:00", text)
    } else {
        text.to_string()
    };
    NaiveTime::parse_from_str(&normalized, "%H:%M:%S%.f").ok()
}

pub(crate) fn parse_datetime(text: &str) -> Option<DateTime<chrono::FixedOffset>> {
    let (date, rest) = text.split_once('T')?;
    let zone_start = rest.find(['Z', '+', '-']).unwrap_or(rest.len());
    let (time, zone) = rest.split_at(zone_start);
    let time = if time.len() == 5 {
        format!("{}:00", time)
    } else {
        time.to_string()
    };
    let zone = if zone.is_empty() { "Z" } else { zone };
    DateTime::parse_from_rfc3339(&format!("{}T{}{}", date, time, zone)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_simple_comparison() {
        let tokens = tokenize("status='active'").unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].text, "status");
        assert_eq!(tokens[1].kind, TokenKind::Equal);
        assert_eq!(tokens[1].position, 6);
        assert_eq!(
            tokens[2].kind,
            TokenKind::Literal(Literal::String("active".to_string()))
        );
    }

    #[test]
    fn test_dotted_path() {
        assert_eq!(
            kinds("address.city"),
            vec![TokenKind::Identifier, TokenKind::Dot, TokenKind::Identifier]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("42 3.5 1e3 -7"),
            vec![
                TokenKind::Literal(Literal::Number(Number::Integer(42))),
                TokenKind::Literal(Literal::Number(Number::Float(3.5))),
                TokenKind::Literal(Literal::Number(Number::Float(1000.0))),
                TokenKind::Literal(Literal::Number(Number::Integer(-7))),
            ]
        );
    }

    #[test]
    fn test_minus_after_operand_is_operator() {
        assert_eq!(
            kinds("a-1"),
            vec![
                TokenKind::Identifier,
                TokenKind::Minus,
                TokenKind::Literal(Literal::Number(Number::Integer(1))),
            ]
        );
        assert_eq!(
            kinds("a - -1"),
            vec![
                TokenKind::Identifier,
                TokenKind::Minus,
                TokenKind::Literal(Literal::Number(Number::Integer(-1))),
            ]
        );
    }

    #[test]
    fn test_keywords_case_insensitive() {
        assert_eq!(
            kinds("AND Or not IN Like iLike TRUE False NULL"),
            vec![
                TokenKind::And,
                TokenKind::Or,
                TokenKind::Not,
                TokenKind::In,
                TokenKind::Like,
                TokenKind::ILike,
                TokenKind::Literal(Literal::Boolean(true)),
                TokenKind::Literal(Literal::Boolean(false)),
                TokenKind::Literal(Literal::Null),
            ]
        );
    }

    #[test]
    fn test_negated_operators() {
        assert_eq!(
            kinds("a !in b !like c !ilike d != e"),
            vec![
                TokenKind::Identifier,
                TokenKind::NotIn,
                TokenKind::Identifier,
                TokenKind::NotLike,
                TokenKind::Identifier,
                TokenKind::NotILike,
                TokenKind::Identifier,
                TokenKind::NotEqual,
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn test_infinity() {
        assert_eq!(
            kinds("Infinity -Infinity"),
            vec![
                TokenKind::Literal(Literal::Infinity { negative: false }),
                TokenKind::Literal(Literal::Infinity { negative: true }),
            ]
        );
    }

    #[test]
    fn test_temporal_literals() {
        let tokens = tokenize("2024-02-29 10:30 2024-02-29T10:30:15.5+02:00").unwrap();
        assert_eq!(
            tokens[0].kind,
            TokenKind::Literal(Literal::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()))
        );
        assert_eq!(
            tokens[1].kind,
            TokenKind::Literal(Literal::Time(NaiveTime::from_hms_opt(10, 30, 0).unwrap()))
        );
        match &tokens[2].kind {
            TokenKind::Literal(Literal::DateTime(dt)) => {
                assert_eq!(dt.to_rfc3339(), "2024-02-29T10:30:15.500+02:00");
            }
            other => panic!("Expected datetime, got {:?}", other),
        }
    }

    #[test]
    fn test_datetime_without_offset_is_utc() {
        match &kinds("2024-01-01T00:00")[0] {
            TokenKind::Literal(Literal::DateTime(dt)) => {
                assert_eq!(dt.offset().local_minus_utc(), 0);
            }
            other => panic!("Expected datetime, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_date() {
        let err = tokenize("d = 2024-13-40").unwrap_err();
        assert_eq!(err.position, 4);
        assert!(err.message.contains("invalid date"));
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#"'it\'s' "a\"b" 'tab\there' '\u0041'"#),
            vec![
                TokenKind::Literal(Literal::String("it's".to_string())),
                TokenKind::Literal(Literal::String("a\"b".to_string())),
                TokenKind::Literal(Literal::String("tab\there".to_string())),
                TokenKind::Literal(Literal::String("A".to_string())),
            ]
        );
    }

    #[test]
    fn test_unterminated_string_points_at_quote() {
        let err = tokenize("name = 'Smith").unwrap_err();
        assert_eq!(err.position, 7);
        assert!(err.message.contains("unterminated"));
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("a = 1 # b").unwrap_err();
        assert_eq!(err.position, 6);
        assert!(err.message.contains('#'));
    }

    #[test]
    fn test_dollar_is_not_an_identifier_character() {
        let err = tokenize("$where = 'x'").unwrap_err();
        assert_eq!(err.position, 0);
        assert!(err.message.contains("unexpected character '$'"));

        let err = tokenize("a$b = 1").unwrap_err();
        assert_eq!(err.position, 1);
        assert!(tokenize("a = @$x").is_err());
    }

    #[test]
    fn test_number_followed_by_letters() {
        let err = tokenize("a = 12abc").unwrap_err();
        assert_eq!(err.position, 6);
    }

    #[test]
    fn test_external_reference() {
        assert_eq!(
            kinds("owner = @user.id"),
            vec![
                TokenKind::Identifier,
                TokenKind::Equal,
                TokenKind::External("user.id".to_string()),
            ]
        );
        assert!(tokenize("a = @").is_err());
    }

    #[test]
    fn test_max_tokens() {
        let err = Lexer::new("a = 1 and b = 2")
            .with_max_tokens(4)
            .tokenize()
            .unwrap_err();
        assert!(err.message.contains("maximum of 4 tokens"));
        assert_eq!(err.position, 6);
    }
}
