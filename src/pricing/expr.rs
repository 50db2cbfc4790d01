//! Arithmetic over Decimal for data-driven formulas.
//!
//! Supports `+ - * /`, unary sign, parentheses, numeric literals and
//! variables. A variable is either a bare identifier (`volume`,
//! `modules.check.scan_volume`) or a braced placeholder (`{departments}`);
//! both are resolved through the caller's lookup.

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ExprError {
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unexpected token {0:?}")]
    UnexpectedToken(String),
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("arithmetic overflow")]
    Overflow,
    #[error("expression nested deeper than {0} levels")]
    TooDeep(usize),
}

/// Deepest nesting of parentheses and unary signs a formula may use
pub const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(Decimal),
    Var(String),
    Op(char),
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '+' | '-' | '*' | '/' => {
                tokens.push(Token::Op(c));
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
            '{' => {
                let start = i + 1;
                let end = chars[start..]
                    .iter()
                    .position(|&ch| ch == '}')
                    .map(|p| start + p)
                    .ok_or(ExprError::UnexpectedEnd)?;
                let name: String = chars[start..end].iter().collect();
                tokens.push(Token::Var(name.trim().to_string()));
                i = end + 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<Decimal>()
                    .map_err(|_| ExprError::InvalidNumber(text.clone()))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                tokens.push(Token::Var(chars[start..i].iter().collect()));
            }
            other => return Err(ExprError::UnexpectedChar(other)),
        }
    }

    Ok(tokens)
}

struct Parser<'a, F> {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    lookup: &'a F,
}

impl<'a, F> Parser<'a, F>
where
    F: Fn(&str) -> Option<Decimal>,
{
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expr(&mut self) -> Result<Decimal, ExprError> {
        let mut acc = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.term()?;
            acc = if op == '+' {
                acc.checked_add(rhs)
            } else {
                acc.checked_sub(rhs)
            }
            .ok_or(ExprError::Overflow)?;
        }
        Ok(acc)
    }

    fn term(&mut self) -> Result<Decimal, ExprError> {
        let mut acc = self.factor()?;
        while let Some(Token::Op(op @ ('*' | '/'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.factor()?;
            acc = if op == '*' {
                acc.checked_mul(rhs).ok_or(ExprError::Overflow)?
            } else {
                if rhs.is_zero() {
                    return Err(ExprError::DivisionByZero);
                }
                acc.checked_div(rhs).ok_or(ExprError::Overflow)?
            };
        }
        Ok(acc)
    }

    fn factor(&mut self) -> Result<Decimal, ExprError> {
        if self.depth >= MAX_DEPTH {
            return Err(ExprError::TooDeep(MAX_DEPTH));
        }
        self.depth += 1;
        let value = self.primary();
        self.depth -= 1;
        value
    }

    fn primary(&mut self) -> Result<Decimal, ExprError> {
        match self.next() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::Var(name)) => {
                (self.lookup)(&name).ok_or(ExprError::UnknownVariable(name))
            }
            Some(Token::Op('-')) => Ok(-self.factor()?),
            Some(Token::Op('+')) => self.factor(),
            Some(Token::LParen) => {
                let value = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    Some(other) => Err(ExprError::UnexpectedToken(format!("{:?}", other))),
                    None => Err(ExprError::UnexpectedEnd),
                }
            }
            Some(other) => Err(ExprError::UnexpectedToken(format!("{:?}", other))),
            None => Err(ExprError::UnexpectedEnd),
        }
    }
}

/// Evaluate `input`, resolving variables through `lookup`
pub fn evaluate<F>(input: &str, lookup: &F) -> Result<Decimal, ExprError>
where
    F: Fn(&str) -> Option<Decimal>,
{
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        lookup,
    };
    let value = parser.expr()?;
    match parser.next() {
        None => Ok(value),
        Some(token) => Err(ExprError::UnexpectedToken(format!("{:?}", token))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn no_vars(_: &str) -> Option<Decimal> {
        None
    }

    #[test]
    fn test_precedence_and_parentheses() {
        assert_eq!(evaluate("1 + 2 * 3", &no_vars), Ok(dec!(7)));
        assert_eq!(evaluate("(1 + 2) * 3", &no_vars), Ok(dec!(9)));
        assert_eq!(evaluate("10 / 4 - 0.5", &no_vars), Ok(dec!(2)));
        assert_eq!(evaluate("-(2 + 3) * 2", &no_vars), Ok(dec!(-10)));
    }

    #[test]
    fn test_variables() {
        let vars = |name: &str| match name {
            "volume" => Some(dec!(75000)),
            "rate" => Some(dec!(0.01)),
            "departments" => Some(dec!(3)),
            _ => None,
        };
        assert_eq!(evaluate("volume * rate + 280", &vars), Ok(dec!(1030)));
        assert_eq!(evaluate("{departments} * 2 + 1", &vars), Ok(dec!(7)));
        assert_eq!(
            evaluate("missing + 1", &vars),
            Err(ExprError::UnknownVariable("missing".into()))
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(evaluate("1 / 0", &no_vars), Err(ExprError::DivisionByZero));
        assert_eq!(evaluate("2 +", &no_vars), Err(ExprError::UnexpectedEnd));
        assert_eq!(evaluate("2 ^ 3", &no_vars), Err(ExprError::UnexpectedChar('^')));
        assert!(evaluate("(1 + 2", &no_vars).is_err());
        assert!(evaluate("1 2", &no_vars).is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let shallow = format!("{}1{}", "(".repeat(10), ")".repeat(10));
        assert_eq!(evaluate(&shallow, &no_vars), Ok(dec!(1)));

        let deep = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        assert_eq!(evaluate(&deep, &no_vars), Err(ExprError::TooDeep(MAX_DEPTH)));
        assert_eq!(
            evaluate(&"-".repeat(10_000), &no_vars),
            Err(ExprError::TooDeep(MAX_DEPTH))
        );
    }
}
