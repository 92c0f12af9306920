//! Filter parser.
//!
//! A recursive-descent parser over the token stream produced by
//! [`crate::lexer`].
//!
//! # Grammar
//!
//! ```text
//! filter      = or
//! or          = and ("or" and)*
//! and         = not ("and" not)*
//! not         = "not" not / comparison
//! comparison  = additive [compareOp additive]
//! additive    = multiplicative (("+" / "-") multiplicative)*
//! multiplicative = unary (("*" / "/") unary)*
//! unary       = "-" unary / primary
//! primary     = literal / identifier / external / array / "(" or ")"
//! identifier  = name ("." name)*
//! array       = "[" [item ("," item)*] "]"
//! compareOp   = "=" / "!=" / ">" / ">=" / "<" / "<=" / "in" / "!in"
//!             / "like" / "!like" / "ilike" / "!ilike"
//! ```
//!
//! Logical items, `not` operands and the filter itself must be predicates;
//! arithmetic operands and comparison sides must be values.
//!
//! # Example
//!
//! ```
//! use sieve_filter::parser::parse_filter;
//!
//! let ast = parse_filter("status='active' and (age>=18 or verified=true)").unwrap();
//! assert_eq!(ast.to_string(), "status = 'active' and (age >= 18 or verified = true)");
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ast::{
    ArithmeticExpression, ArithmeticOperator, ArrayExpression, ComparisonExpression,
    ComparisonOperator, Expression, ExternalConstant, FilterAst, Literal, LogicalExpression,
    LogicalOperator, QualifiedIdentifier,
};
use crate::error::{ParseResult, SyntaxError};
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

/// Resource limits applied while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Maximum nesting of parentheses, `not` and unary minus.
    pub max_depth: usize,
    /// Maximum number of tokens in one filter.
    pub max_tokens: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_tokens: 1024,
        }
    }
}

impl ParseOptions {
    /// Sets the maximum nesting depth.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sets the maximum token count.
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Parses filter text with default limits.
pub fn parse_filter(input: &str) -> ParseResult<FilterAst> {
    parse_filter_with(input, &ParseOptions::default())
}

/// Parses filter text with explicit limits.
pub fn parse_filter_with(input: &str, options: &ParseOptions) -> ParseResult<FilterAst> {
    let tokens = Lexer::new(input)
        .with_max_tokens(options.max_tokens)
        .tokenize()?;
    let ast = Parser::new(&tokens, input.len())
        .with_max_depth(options.max_depth)
        .parse()?;
    debug!(tokens = tokens.len(), filter = %ast, "parsed filter");
    Ok(ast)
}

/// Parses an already tokenized filter with default limits.
pub fn parse(tokens: &[Token]) -> ParseResult<FilterAst> {
    let end = tokens.last().map(Token::end).unwrap_or(0);
    Parser::new(tokens, end).parse()
}

/// Recursive-descent parser over a token slice.
pub struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    end_position: usize,
    depth: usize,
    max_depth: usize,
}

impl<'t> Parser<'t> {
    /// Creates a parser. `end_position` is the byte length of the source,
    /// reported for errors at end of input.
    pub fn new(tokens: &'t [Token], end_position: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            end_position,
            depth: 0,
            max_depth: ParseOptions::default().max_depth,
        }
    }

    /// Sets the maximum nesting depth.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Parses the whole token stream as one filter.
    pub fn parse(mut self) -> ParseResult<FilterAst> {
        if self.tokens.is_empty() {
            return Err(SyntaxError::new(0, "empty filter expression"));
        }
        let expr = self.parse_or()?;
        self.require_predicate(&expr)?;
        if let Some(token) = self.peek() {
            return Err(SyntaxError::new(
                token.position,
                format!("unexpected token {}", token),
            ));
        }
        Ok(expr)
    }

    // ------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&'t TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn next(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn position(&self) -> usize {
        self.peek().map(|t| t.position).unwrap_or(self.end_position)
    }

    fn describe_current(&self) -> String {
        match self.peek() {
            Some(token) => format!("token {}", token),
            None => "end of input".to_string(),
        }
    }

    fn unexpected(&self) -> SyntaxError {
        SyntaxError::new(
            self.position(),
            format!("unexpected {}", self.describe_current()),
        )
    }

    fn enter(&mut self) -> ParseResult<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(SyntaxError::new(
                self.position(),
                format!("expression nesting exceeds the maximum depth of {}", self.max_depth),
            ));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Fails at the current token unless the expression is a predicate.
    fn require_predicate(&self, expr: &FilterAst) -> ParseResult<()> {
        if expr.is_boolean() {
            Ok(())
        } else {
            Err(SyntaxError::new(
                self.position(),
                format!(
                    "expected comparison operator but found {}",
                    self.describe_current()
                ),
            ))
        }
    }

    // ------------------------------------------------------------------
    // Boolean levels
    // ------------------------------------------------------------------

    fn parse_or(&mut self) -> ParseResult<FilterAst> {
        self.parse_logical(LogicalOperator::Or, &TokenKind::Or, Self::parse_and)
    }

    fn parse_and(&mut self) -> ParseResult<FilterAst> {
        self.parse_logical(LogicalOperator::And, &TokenKind::And, Self::parse_not)
    }

    /// Parses an `and` / `or` chain; same-operator chains become one node.
    fn parse_logical(
        &mut self,
        op: LogicalOperator,
        keyword: &TokenKind,
        parse_item: fn(&mut Self) -> ParseResult<FilterAst>,
    ) -> ParseResult<FilterAst> {
        let first = parse_item(self)?;
        if !self.check(keyword) {
            return Ok(first);
        }
        self.require_predicate(&first)?;

        let mut items = vec![first];
        while self.eat(keyword) {
            let item = parse_item(self)?;
            self.require_predicate(&item)?;
            items.push(item);
        }
        Ok(Expression::Logical(LogicalExpression { op, items }))
    }

    fn parse_not(&mut self) -> ParseResult<FilterAst> {
        if !self.eat(&TokenKind::Not) {
            return self.parse_comparison();
        }
        self.enter()?;
        let operand = self.parse_not()?;
        self.require_predicate(&operand)?;
        self.leave();
        Ok(Expression::Not(Box::new(operand)))
    }

    fn parse_comparison(&mut self) -> ParseResult<FilterAst> {
        let left_position = self.position();
        let left = self.parse_additive()?;

        let Some(op) = self.peek_kind().and_then(comparison_operator) else {
            return Ok(left);
        };

        if left.is_boolean() {
            return Err(SyntaxError::new(
                self.position(),
                "a comparison cannot be compared again",
            ));
        }
        if !is_comparable(&left) {
            return Err(SyntaxError::new(
                left_position,
                "left side of a comparison must be a field or an arithmetic expression",
            ));
        }
        self.pos += 1;

        let right_position = self.position();
        let right = self.parse_additive()?;
        if right.is_boolean() {
            return Err(SyntaxError::new(
                right_position,
                "comparison value cannot be a boolean expression",
            ));
        }

        if self.peek_kind().and_then(comparison_operator).is_some() {
            return Err(SyntaxError::new(
                self.position(),
                "comparison operators cannot be chained",
            ));
        }

        Ok(Expression::Comparison(ComparisonExpression {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }))
    }

    // ------------------------------------------------------------------
    // Value levels
    // ------------------------------------------------------------------

    fn parse_additive(&mut self) -> ParseResult<FilterAst> {
        self.parse_arithmetic(false)
    }

    /// Parses one precedence level of arithmetic into a flat, left-to-right
    /// item list. A multiplicative run inside an additive chain becomes a
    /// nested item.
    fn parse_arithmetic(&mut self, multiplicative: bool) -> ParseResult<FilterAst> {
        let parse_operand = |p: &mut Self| {
            if multiplicative {
                p.parse_unary()
            } else {
                p.parse_arithmetic(true)
            }
        };

        let first = parse_operand(self)?;
        let Some(op) = self.peek_arithmetic(multiplicative) else {
            return Ok(first);
        };
        self.require_value(&first)?;

        let mut chain = ArithmeticExpression::new(first);
        let mut next_op = Some(op);
        while let Some(op) = next_op {
            self.pos += 1;
            let operand = parse_operand(self)?;
            next_op = self.peek_arithmetic(multiplicative);
            self.require_value(&operand)?;
            chain.push(op, operand);
        }
        Ok(Expression::Arithmetic(chain))
    }

    fn peek_arithmetic(&self, multiplicative: bool) -> Option<ArithmeticOperator> {
        match (self.peek_kind()?, multiplicative) {
            (TokenKind::Plus, false) => Some(ArithmeticOperator::Add),
            (TokenKind::Minus, false) => Some(ArithmeticOperator::Subtract),
            (TokenKind::Star, true) => Some(ArithmeticOperator::Multiply),
            (TokenKind::Slash, true) => Some(ArithmeticOperator::Divide),
            _ => None,
        }
    }

    fn require_value(&self, expr: &FilterAst) -> ParseResult<()> {
        if expr.is_boolean() {
            Err(SyntaxError::new(
                self.position(),
                "arithmetic operands cannot be boolean expressions",
            ))
        } else {
            Ok(())
        }
    }

    fn parse_unary(&mut self) -> ParseResult<FilterAst> {
        if !self.eat(&TokenKind::Minus) {
            return self.parse_primary();
        }
        self.enter()?;
        let operand = self.parse_unary()?;
        self.require_value(&operand)?;
        self.leave();

        Ok(match operand {
            Expression::Literal(Literal::Number(n)) => Expression::Literal(Literal::Number(n.negate())),
            Expression::Literal(Literal::Infinity { negative }) => {
                Expression::Literal(Literal::Infinity {
                    negative: !negative,
                })
            }
            other => Expression::Negative(Box::new(other)),
        })
    }

    fn parse_primary(&mut self) -> ParseResult<FilterAst> {
        let Some(token) = self.peek() else {
            return Err(self.unexpected());
        };

        match &token.kind {
            TokenKind::Literal(literal) => {
                self.pos += 1;
                Ok(Expression::Literal(literal.clone()))
            }
            TokenKind::Identifier => self.parse_identifier().map(Expression::Identifier),
            TokenKind::External(name) => {
                self.pos += 1;
                Ok(Expression::External(ExternalConstant { name: name.clone() }))
            }
            TokenKind::LeftBracket => self.parse_array(),
            TokenKind::LeftParen => {
                self.pos += 1;
                self.enter()?;
                let inner = self.parse_or()?;
                if !self.eat(&TokenKind::RightParen) {
                    return Err(SyntaxError::new(
                        self.position(),
                        format!("expected ')' but found {}", self.describe_current()),
                    ));
                }
                self.leave();
                Ok(Expression::Parenthesized(Box::new(inner)))
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_identifier(&mut self) -> ParseResult<QualifiedIdentifier> {
        let mut segments = Vec::new();
        match self.next() {
            Some(token) if token.kind == TokenKind::Identifier => segments.push(token.text.clone()),
            _ => return Err(self.unexpected()),
        }

        while self.eat(&TokenKind::Dot) {
            match self.peek() {
                Some(token) if token.kind.is_word() => {
                    segments.push(token.text.clone());
                    self.pos += 1;
                }
                _ => {
                    return Err(SyntaxError::new(
                        self.position(),
                        format!(
                            "expected field name after '.' but found {}",
                            self.describe_current()
                        ),
                    ));
                }
            }
        }

        if self.check(&TokenKind::LeftParen) {
            return Err(SyntaxError::new(
                self.position(),
                format!("function calls are not supported ('{}')", segments.join(".")),
            ));
        }
        Ok(QualifiedIdentifier::new(segments))
    }

    fn parse_array(&mut self) -> ParseResult<FilterAst> {
        self.pos += 1; // '['
        let mut items = Vec::new();

        if self.eat(&TokenKind::RightBracket) {
            return Ok(Expression::Array(ArrayExpression { items }));
        }

        loop {
            let item = match self.peek_kind() {
                Some(TokenKind::Literal(literal)) => {
                    self.pos += 1;
                    Expression::Literal(literal.clone())
                }
                Some(TokenKind::Identifier) => Expression::Identifier(self.parse_identifier()?),
                Some(TokenKind::External(name)) => {
                    self.pos += 1;
                    Expression::External(ExternalConstant { name: name.clone() })
                }
                _ => {
                    return Err(SyntaxError::new(
                        self.position(),
                        format!(
                            "array items must be literals, fields or external constants, found {}",
                            self.describe_current()
                        ),
                    ));
                }
            };
            items.push(item);

            if self.eat(&TokenKind::Comma) {
                continue;
            }
            if self.eat(&TokenKind::RightBracket) {
                break;
            }
            return Err(SyntaxError::new(
                self.position(),
                format!("expected ',' or ']' but found {}", self.describe_current()),
            ));
        }

        Ok(Expression::Array(ArrayExpression { items }))
    }
}

fn comparison_operator(kind: &TokenKind) -> Option<ComparisonOperator> {
    match kind {
        TokenKind::Equal => Some(ComparisonOperator::Eq),
        TokenKind::NotEqual => Some(ComparisonOperator::Ne),
        TokenKind::Greater => Some(ComparisonOperator::Gt),
        TokenKind::GreaterEqual => Some(ComparisonOperator::Ge),
        TokenKind::Less => Some(ComparisonOperator::Lt),
        TokenKind::LessEqual => Some(ComparisonOperator::Le),
        TokenKind::In => Some(ComparisonOperator::In),
        TokenKind::NotIn => Some(ComparisonOperator::NotIn),
        TokenKind::Like => Some(ComparisonOperator::Like),
        TokenKind::NotLike => Some(ComparisonOperator::NotLike),
        TokenKind::ILike => Some(ComparisonOperator::ILike),
        TokenKind::NotILike => Some(ComparisonOperator::NotILike),
        _ => None,
    }
}

/// Fields, arithmetic and negations (optionally parenthesized) may be compared.
fn is_comparable(expr: &FilterAst) -> bool {
    matches!(
        expr.unwrap_parens(),
        Expression::Identifier(_) | Expression::Arithmetic(_) | Expression::Negative(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Number;

    fn ident(path: &str) -> FilterAst {
        Expression::Identifier(QualifiedIdentifier::from_path(path))
    }

    fn int(i: i64) -> FilterAst {
        Expression::Literal(Literal::Number(Number::Integer(i)))
    }

    fn cmp(left: FilterAst, op: ComparisonOperator, right: FilterAst) -> FilterAst {
        Expression::Comparison(ComparisonExpression {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    #[test]
    fn test_parse_simple_eq() {
        let expr = parse_filter("name = 'Smith'").unwrap();
        assert_eq!(
            expr,
            cmp(
                ident("name"),
                ComparisonOperator::Eq,
                Expression::Literal(Literal::String("Smith".to_string()))
            )
        );
    }

    #[test]
    fn test_precedence_and_over_or() {
        let expr = parse_filter("a=1 and b=2 or c=3").unwrap();
        let expected = Expression::Logical(LogicalExpression {
            op: LogicalOperator::Or,
            items: vec![
                Expression::Logical(LogicalExpression {
                    op: LogicalOperator::And,
                    items: vec![
                        cmp(ident("a"), ComparisonOperator::Eq, int(1)),
                        cmp(ident("b"), ComparisonOperator::Eq, int(2)),
                    ],
                }),
                cmp(ident("c"), ComparisonOperator::Eq, int(3)),
            ],
        });
        assert_eq!(expr, expected);
    }

    #[test]
    fn test_same_operator_chain_is_flat() {
        match parse_filter("a=1 and b=2 and c=3").unwrap() {
            Expression::Logical(logical) => {
                assert_eq!(logical.op, LogicalOperator::And);
                assert_eq!(logical.items.len(), 3);
            }
            other => panic!("Expected Logical, got {:?}", other),
        }
    }

    #[test]
    fn test_parentheses() {
        let expr = parse_filter("(status='a' or status='b') and category='c'").unwrap();
        match expr {
            Expression::Logical(logical) => {
                assert_eq!(logical.op, LogicalOperator::And);
                match &logical.items[0] {
                    Expression::Parenthesized(inner) => {
                        assert!(matches!(
                            inner.as_ref(),
                            Expression::Logical(LogicalExpression {
                                op: LogicalOperator::Or,
                                ..
                            })
                        ));
                    }
                    other => panic!("Expected Parenthesized, got {:?}", other),
                }
            }
            other => panic!("Expected Logical, got {:?}", other),
        }
    }

    #[test]
    fn test_arithmetic_precedence() {
        let expr = parse_filter("a + b * 2 > 10").unwrap();
        let Expression::Comparison(c) = expr else {
            panic!("Expected Comparison");
        };
        let Expression::Arithmetic(additive) = c.left.as_ref() else {
            panic!("Expected Arithmetic");
        };
        assert_eq!(additive.items.len(), 2);
        assert_eq!(additive.items[0].expression, ident("a"));
        assert_eq!(additive.items[1].op, ArithmeticOperator::Add);
        let Expression::Arithmetic(product) = &additive.items[1].expression else {
            panic!("Expected nested Arithmetic");
        };
        assert_eq!(product.items[1].op, ArithmeticOperator::Multiply);
    }

    #[test]
    fn test_arithmetic_left_associative_flat() {
        let expr = parse_filter("a - b + c = 0").unwrap();
        let Expression::Comparison(c) = expr else {
            panic!("Expected Comparison");
        };
        let Expression::Arithmetic(chain) = c.left.as_ref() else {
            panic!("Expected Arithmetic");
        };
        let ops: Vec<_> = chain.items.iter().map(|i| i.op).collect();
        assert_eq!(
            ops,
            vec![
                ArithmeticOperator::Add,
                ArithmeticOperator::Subtract,
                ArithmeticOperator::Add
            ]
        );
    }

    #[test]
    fn test_parenthesized_arithmetic_left() {
        assert!(parse_filter("(a + b) >= 3").is_ok());
        assert!(parse_filter("-a < 0").is_ok());
    }

    #[test]
    fn test_negative_literal_folding() {
        let expr = parse_filter("a = -(5)").unwrap();
        let Expression::Comparison(c) = expr else {
            panic!("Expected Comparison");
        };
        assert!(matches!(c.right.as_ref(), Expression::Negative(_)));

        let expr = parse_filter("a = - 5").unwrap();
        let Expression::Comparison(c) = expr else {
            panic!("Expected Comparison");
        };
        assert_eq!(*c.right, int(-5));
    }

    #[test]
    fn test_array_membership() {
        let expr = parse_filter("status in ['a', 'b']").unwrap();
        let Expression::Comparison(c) = expr else {
            panic!("Expected Comparison");
        };
        assert_eq!(c.op, ComparisonOperator::In);
        let Expression::Array(array) = c.right.as_ref() else {
            panic!("Expected Array");
        };
        assert_eq!(array.items.len(), 2);
    }

    #[test]
    fn test_empty_array() {
        assert!(parse_filter("status !in []").is_ok());
    }

    #[test]
    fn test_not_expression() {
        let expr = parse_filter("not status = 'inactive' and a = 1").unwrap();
        let Expression::Logical(logical) = expr else {
            panic!("Expected Logical");
        };
        assert!(matches!(logical.items[0], Expression::Not(_)));
    }

    #[test]
    fn test_external_constant() {
        let expr = parse_filter("owner = @currentUser").unwrap();
        let Expression::Comparison(c) = expr else {
            panic!("Expected Comparison");
        };
        assert_eq!(
            *c.right,
            Expression::External(ExternalConstant {
                name: "currentUser".to_string()
            })
        );
    }

    #[test]
    fn test_malformed_points_at_following_token() {
        let err = parse_filter("a= and b").unwrap_err();
        assert_eq!(err.position, 3);
        assert!(err.message.contains("'and'"));
    }

    #[test]
    fn test_chained_comparison_rejected() {
        let err = parse_filter("a=1=2").unwrap_err();
        assert_eq!(err.position, 3);
        assert!(err.message.contains("chained"));
    }

    #[test]
    fn test_bare_identifier_rejected() {
        let err = parse_filter("a").unwrap_err();
        assert_eq!(err.position, 1);
        assert!(err.message.contains("end of input"));

        let err = parse_filter("a = 1 and b").unwrap_err();
        assert_eq!(err.position, 11);
    }

    #[test]
    fn test_literal_left_side_rejected() {
        let err = parse_filter("5 = a").unwrap_err();
        assert_eq!(err.position, 0);
    }

    #[test]
    fn test_function_call_rejected() {
        let err = parse_filter("lower(name) = 'x'").unwrap_err();
        assert_eq!(err.position, 5);
        assert!(err.message.contains("function"));
    }

    #[test]
    fn test_unclosed_paren() {
        let err = parse_filter("(a = 1").unwrap_err();
        assert_eq!(err.position, 6);
        assert!(err.message.contains("')'"));
    }

    #[test]
    fn test_trailing_tokens() {
        let err = parse_filter("a = 1 b").unwrap_err();
        assert_eq!(err.position, 6);
    }

    #[test]
    fn test_boolean_in_arithmetic_rejected() {
        assert!(parse_filter("(a = 1) + 2 = 3").is_err());
        assert!(parse_filter("a = (b = 1)").is_err());
    }

    #[test]
    fn test_keyword_as_nested_segment() {
        let expr = parse_filter("meta.in = 1").unwrap();
        let Expression::Comparison(c) = expr else {
            panic!("Expected Comparison");
        };
        assert_eq!(*c.left, ident("meta.in"));
    }

    #[test]
    fn test_depth_limit() {
        let deep = format!("{}a = 1{}", "(".repeat(10), ")".repeat(10));
        assert!(parse_filter(&deep).is_ok());
        let options = ParseOptions::default().with_max_depth(5);
        let err = parse_filter_with(&deep, &options).unwrap_err();
        assert!(err.message.contains("maximum depth"));
    }

    #[test]
    fn test_token_limit() {
        let options = ParseOptions::default().with_max_tokens(3);
        assert!(parse_filter_with("a = 1", &options).is_ok());
        assert!(parse_filter_with("a = 1 and b = 2", &options).is_err());
    }

    #[test]
    fn test_empty_input() {
        let err = parse_filter("   ").unwrap_err();
        assert_eq!(err.position, 0);
    }

    #[test]
    fn test_parse_from_tokens() {
        let tokens = crate::lexer::tokenize("x != null").unwrap();
        let expr = parse(&tokens).unwrap();
        assert!(matches!(
            expr,
            Expression::Comparison(ComparisonExpression {
                op: ComparisonOperator::Ne,
                ..
            })
        ));
    }
}
