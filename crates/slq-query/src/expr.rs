//! Tokenizer, recursive-descent parser and evaluator for query
//! expressions.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! or_expr  := and_expr ( "or" and_expr )*
//! and_expr := not_expr ( "and" not_expr )*
//! not_expr := "not" not_expr | primary
//! primary  := "(" or_expr ")" | TERM
//! ```
//!
//! Keywords are case-sensitive and space-delimited; parentheses may
//! sit flush against a term. Anything else is an opaque term whose
//! truth value the caller supplies at evaluation time.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExprError {
    #[error("Empty query expression")]
    Empty,
    #[error("Expected closing parenthesis")]
    MissingParen,
    #[error("Unexpected {0:?} in query expression")]
    UnexpectedToken(String),
    #[error("Query expression ended unexpectedly")]
    UnexpectedEnd,
}

/// Parsed query expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Term(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Parse an expression string.
    pub fn parse(input: &str) -> Result<Self, ExprError> {
        let tokens = tokenize(input);
        if tokens.is_empty() {
            return Err(ExprError::Empty);
        }
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.or_expr()?;
        match parser.peek() {
            None => Ok(expr),
            Some(tok) => Err(ExprError::UnexpectedToken(tok.display().to_string())),
        }
    }

    /// Evaluate against a term oracle.
    ///
    /// The oracle decides each bare term; `and`/`or` short-circuit, so
    /// terms on untaken branches are never consulted. An oracle error
    /// aborts the whole evaluation.
    pub fn eval<E>(
        &self,
        oracle: &mut impl FnMut(&str) -> Result<bool, E>,
    ) -> Result<bool, E> {
        match self {
            Expr::Term(term) => oracle(term),
            Expr::Not(inner) => Ok(!inner.eval(oracle)?),
            Expr::And(lhs, rhs) => Ok(lhs.eval(oracle)? && rhs.eval(oracle)?),
            Expr::Or(lhs, rhs) => Ok(lhs.eval(oracle)? || rhs.eval(oracle)?),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    And,
    Or,
    Not,
    LParen,
    RParen,
    Term(String),
}

impl Token {
    fn display(&self) -> &str {
        match self {
            Token::And => "and",
            Token::Or => "or",
            Token::Not => "not",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Term(t) => t,
        }
    }
}

fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut term = String::new();
    let mut flush = |term: &mut String, tokens: &mut Vec<Token>| {
        if term.is_empty() {
            return;
        }
        tokens.push(match term.as_str() {
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            _ => Token::Term(term.clone()),
        });
        term.clear();
    };
    for ch in input.chars() {
        match ch {
            '(' => {
                flush(&mut term, &mut tokens);
                tokens.push(Token::LParen);
            }
            ')' => {
                flush(&mut term, &mut tokens);
                tokens.push(Token::RParen);
            }
            c if c.is_whitespace() => flush(&mut term, &mut tokens),
            c => term.push(c),
        }
    }
    flush(&mut term, &mut tokens);
    tokens
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn or_expr(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.and_expr()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let rhs = self.and_expr()?;
            expr = Expr::Or(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn and_expr(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.not_expr()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let rhs = self.not_expr()?;
            expr = Expr::And(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn not_expr(&mut self) -> Result<Expr, ExprError> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            let inner = self.not_expr()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        match self.advance() {
            Some(Token::Term(term)) => Ok(Expr::Term(term)),
            Some(Token::LParen) => {
                let expr = self.or_expr()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(expr),
                    _ => Err(ExprError::MissingParen),
                }
            }
            Some(tok) => Err(ExprError::UnexpectedToken(tok.display().to_string())),
            None => Err(ExprError::UnexpectedEnd),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn eval_with(expr: &str, truthy: &[&str]) -> bool {
        let parsed = Expr::parse(expr).unwrap();
        let result: Result<bool, Infallible> =
            parsed.eval(&mut |term| Ok(truthy.contains(&term)));
        let Ok(value) = result;
        value
    }

    #[test]
    fn test_single_term() {
        assert!(eval_with("a", &["a"]));
        assert!(!eval_with("a", &["b"]));
    }

    #[test]
    fn test_or_and_not() {
        assert!(eval_with("a or b", &["b"]));
        assert!(!eval_with("a and b", &["b"]));
        assert!(eval_with("a and b", &["a", "b"]));
        assert!(eval_with("not a", &["b"]));
        assert!(!eval_with("not a", &["a"]));
    }

    #[test]
    fn test_precedence_not_and_or() {
        // a or (b and c), not (a or b) and c
        assert!(eval_with("a or b and c", &["a"]));
        assert!(!eval_with("a or b and c", &["b"]));
        assert!(eval_with("a or b and c", &["b", "c"]));
        // not binds tightest: (not a) and b
        assert!(eval_with("not a and b", &["b"]));
    }

    #[test]
    fn test_parentheses() {
        assert!(!eval_with("(a or b) and c", &["a"]));
        assert!(eval_with("(a or b) and c", &["a", "c"]));
        // Parentheses flush against terms
        assert!(eval_with("(a)and(b)", &["a", "b"]));
    }

    #[test]
    fn test_double_negation() {
        assert!(eval_with("not not a", &["a"]));
    }

    #[test]
    fn test_keywords_are_case_sensitive() {
        // "AND" is a term, not a keyword; "a AND b" is two dangling terms
        assert!(Expr::parse("a AND b").is_err());
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Expr::parse(""), Err(ExprError::Empty));
        assert_eq!(Expr::parse("   "), Err(ExprError::Empty));
        assert_eq!(Expr::parse("a and"), Err(ExprError::UnexpectedEnd));
        assert_eq!(Expr::parse("(a or b"), Err(ExprError::MissingParen));
        assert!(matches!(
            Expr::parse("a b"),
            Err(ExprError::UnexpectedToken(_))
        ));
        assert!(matches!(
            Expr::parse("and a"),
            Err(ExprError::UnexpectedToken(_))
        ));
    }

    #[test]
    fn test_short_circuit_skips_untaken_branches() {
        let parsed = Expr::parse("a or b").unwrap();
        let mut consulted = Vec::new();
        let result: Result<bool, Infallible> = parsed.eval(&mut |term| {
            consulted.push(term.to_string());
            Ok(term == "a")
        });
        let Ok(value) = result;
        assert!(value);
        assert_eq!(consulted, vec!["a"]);
    }

    #[test]
    fn test_oracle_error_propagates() {
        let parsed = Expr::parse("a and b").unwrap();
        let result = parsed.eval(&mut |term| {
            if term == "b" { Err("bad term") } else { Ok(true) }
        });
        assert_eq!(result, Err("bad term"));
    }
}
