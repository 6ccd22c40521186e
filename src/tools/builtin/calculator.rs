//! Safe arithmetic evaluator.
//!
//! Supports `+ - * / **`, unary minus, parentheses and numeric literals.
//! Nothing else is accepted: there are no names, calls or attributes.
//! Integer arithmetic stays integral; `/` always yields a float.

use crate::tools::{Tool, ToolArgs};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::fmt;

/// Deepest nesting of parentheses, unary minus and exponents accepted.
const MAX_DEPTH: usize = 200;

pub struct Calculator;

#[async_trait]
impl Tool for Calculator {
    async fn invoke(&self, args: &ToolArgs) -> Result<String> {
        let expression = args.text("expression")?;
        Ok(match evaluate(&expression) {
            Ok(n) => n.to_string(),
            Err(e) => format!("Error during calculation: {}", e),
        })
    }
}

/// A numeric value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e16 => {
                write!(f, "{:.1}", x)
            }
            Self::Float(x) if x.is_nan() => write!(f, "nan"),
            Self::Float(x) if x.is_infinite() => {
                write!(f, "{}", if x > 0.0 { "inf" } else { "-inf" })
            }
            Self::Float(x) => write!(f, "{}", x),
        }
    }
}

/// Evaluate an arithmetic expression.
pub fn evaluate(expression: &str) -> Result<Number> {
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        bail!("empty expression");
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if let Some(tok) = parser.peek() {
        bail!("unexpected token '{}'", tok);
    }
    Ok(value)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(Number),
    Plus,
    Minus,
    Star,
    Slash,
    Pow,
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{}", n),
            Self::Plus => write!(f, "+"),
            Self::Minus => write!(f, "-"),
            Self::Star => write!(f, "*"),
            Self::Slash => write!(f, "/"),
            Self::Pow => write!(f, "**"),
            Self::LParen => write!(f, "("),
            Self::RParen => write!(f, ")"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' if chars.get(i + 1) == Some(&'*') => {
                tokens.push(Token::Pow);
                i += 2;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '0'..='9' | '.' => {
                let start = i;
                let mut is_float = false;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    is_float |= chars[i] == '.';
                    i += 1;
                }
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    is_float = true;
                    i += 1;
                    if i < chars.len() && (chars[i] == '+' || chars[i] == '-') {
                        i += 1;
                    }
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                let literal: String = chars[start..i].iter().collect();
                let number = if is_float {
                    Number::Float(
                        literal
                            .parse()
                            .map_err(|_| anyhow::anyhow!("invalid number '{}'", literal))?,
                    )
                } else {
                    match literal.parse::<i64>() {
                        Ok(n) => Number::Int(n),
                        Err(_) => Number::Float(
                            literal
                                .parse()
                                .map_err(|_| anyhow::anyhow!("invalid number '{}'", literal))?,
                        ),
                    }
                };
                tokens.push(Token::Num(number));
            }
            other => bail!("Unsupported character '{}'", other),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<Number> {
        let mut left = self.term()?;
        while let Some(op) = self.peek().cloned() {
            match op {
                Token::Plus | Token::Minus => {
                    self.pos += 1;
                    let right = self.term()?;
                    left = binary(&op, left, right)?;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    // term := unary (('*' | '/') unary)*
    fn term(&mut self) -> Result<Number> {
        let mut left = self.unary()?;
        while let Some(op) = self.peek().cloned() {
            match op {
                Token::Star | Token::Slash => {
                    self.pos += 1;
                    let right = self.unary()?;
                    left = binary(&op, left, right)?;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    // Every recursive path (parens, unary minus, exponents) passes through
    // here, so this is where nesting is bounded.
    fn unary(&mut self) -> Result<Number> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            bail!("expression too deeply nested");
        }
        let value = self.unary_inner();
        self.depth -= 1;
        value
    }

    // unary := '-' unary | power
    fn unary_inner(&mut self) -> Result<Number> {
        if self.peek() == Some(&Token::Minus) {
            self.pos += 1;
            return Ok(match self.unary()? {
                Number::Int(i) => i
                    .checked_neg()
                    .map(Number::Int)
                    .unwrap_or(Number::Float(-(i as f64))),
                Number::Float(f) => Number::Float(-f),
            });
        }
        self.power()
    }

    // power := atom ('**' unary)?   (right-associative, binds tighter than unary minus on its left)
    fn power(&mut self) -> Result<Number> {
        let base = self.atom()?;
        if self.peek() == Some(&Token::Pow) {
            self.pos += 1;
            let exponent = self.unary()?;
            return binary(&Token::Pow, base, exponent);
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Number> {
        match self.next() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    _ => bail!("expected ')'"),
                }
            }
            Some(Token::Plus) => bail!("Unsupported unary operator: UAdd"),
            Some(tok) => bail!("unexpected token '{}'", tok),
            None => bail!("unexpected end of expression"),
        }
    }
}

fn binary(op: &Token, left: Number, right: Number) -> Result<Number> {
    use Number::{Float, Int};

    let float = |f: fn(f64, f64) -> f64| Float(f(left.as_f64(), right.as_f64()));

    Ok(match (op, left, right) {
        (Token::Plus, Int(a), Int(b)) => a.checked_add(b).map(Int).unwrap_or_else(|| float(|a, b| a + b)),
        (Token::Minus, Int(a), Int(b)) => a.checked_sub(b).map(Int).unwrap_or_else(|| float(|a, b| a - b)),
        (Token::Star, Int(a), Int(b)) => a.checked_mul(b).map(Int).unwrap_or_else(|| float(|a, b| a * b)),
        (Token::Plus, ..) => float(|a, b| a + b),
        (Token::Minus, ..) => float(|a, b| a - b),
        (Token::Star, ..) => float(|a, b| a * b),
        (Token::Slash, ..) => {
            if right.as_f64() == 0.0 {
                bail!("division by zero");
            }
            float(|a, b| a / b)
        }
        (Token::Pow, Int(a), Int(b)) if b >= 0 => u32::try_from(b)
            .ok()
            .and_then(|e| a.checked_pow(e))
            .map(Int)
            .unwrap_or_else(|| float(f64::powf)),
        (Token::Pow, ..) => {
            if left.as_f64() == 0.0 && right.as_f64() < 0.0 {
                bail!("0.0 cannot be raised to a negative power");
            }
            float(f64::powf)
        }
        (tok, ..) => bail!("Unsupported operator: {}", tok),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(s: &str) -> String {
        evaluate(s).map(|n| n.to_string()).unwrap_or_else(|e| format!("ERR {e}"))
    }

    #[test]
    fn test_integer_arithmetic() {
        assert_eq!(eval("2+2"), "4");
        assert_eq!(eval("2 + 3 * 4"), "14");
        assert_eq!(eval("(2 + 3) * 4"), "20");
        assert_eq!(eval("2 ** 10"), "1024");
        assert_eq!(eval("2 ** 3 ** 2"), "512");
    }

    #[test]
    fn test_division_is_float() {
        assert_eq!(eval("7 / 2"), "3.5");
        assert_eq!(eval("4 / 2"), "2.0");
        assert_eq!(eval("2 ** -1"), "0.5");
    }

    #[test]
    fn test_unary_minus_precedence() {
        assert_eq!(eval("-2 ** 2"), "-4");
        assert_eq!(eval("(-2) ** 2"), "4");
        assert_eq!(eval("3 - -1"), "4");
    }

    #[test]
    fn test_rejects_non_arithmetic() {
        assert!(eval("__import__('os')").starts_with("ERR Unsupported character"));
        assert!(eval("1 / 0").contains("division by zero"));
        assert!(eval("(1 + 2").contains("expected ')'"));
        assert!(eval("1 2").contains("unexpected token"));
        assert!(eval("").contains("empty expression"));
        assert!(eval("+1").contains("UAdd"));
    }

    #[test]
    fn test_nesting_is_bounded() {
        let parens = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        assert!(eval(&parens).contains("too deeply nested"));

        let minuses = format!("{}1", "-".repeat(10_000));
        assert!(eval(&minuses).contains("too deeply nested"));

        let powers = vec!["2"; 5_000].join("**");
        assert!(eval(&powers).contains("too deeply nested"));

        let shallow = format!("{}7{}", "(".repeat(50), ")".repeat(50));
        assert_eq!(eval(&shallow), "7");
        assert_eq!(eval(&format!("{}1", "-".repeat(100))), "1");
    }

    #[tokio::test]
    async fn test_deep_nesting_through_registry() {
        let registry = crate::tools::FunctionRegistry::new();
        registry
            .register(
                "calculate",
                std::sync::Arc::new(Calculator),
                "Calculates a mathematical expression.",
                [("expression", "The mathematical expression to calculate")],
            )
            .unwrap();
        let expression = format!("{}1{}", "(".repeat(50_000), ")".repeat(50_000));
        let args = ToolArgs::from_iter([("expression", expression)]);
        assert_eq!(
            registry.call("calculate", &args).await,
            "Error during calculation: expression too deeply nested"
        );
    }

    #[tokio::test]
    async fn test_tool_reports_errors_as_text() {
        let args = ToolArgs::from_iter([("expression", "1/0")]);
        let out = Calculator.invoke(&args).await.unwrap();
        assert_eq!(out, "Error during calculation: division by zero");

        let args = ToolArgs::from_iter([("expression", 6)]);
        assert_eq!(Calculator.invoke(&args).await.unwrap(), "6");
    }
}
