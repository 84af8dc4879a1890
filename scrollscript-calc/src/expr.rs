//! Arithmetic parser for substituted calc() bodies
//!
//! Supports numbers, `+ - * /`, unary signs and parentheses. Variables are
//! substituted as literal text before this parser ever sees the input, so
//! there are no identifiers in the grammar.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("Unexpected characters after substitution: {0}")]
    UnsafeCharacters(String),

    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    #[error("Unexpected token: {0}")]
    UnexpectedToken(String),

    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Result is not a finite number")]
    NonFinite,

    #[error("Expression nested deeper than {0} levels")]
    TooDeep(usize),
}

/// Nesting limit for parentheses and unary signs
pub const MAX_DEPTH: usize = 256;

/// Token types for the expression parser
#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

/// AST node for expressions
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    BinOp(Box<Expr>, Op, Box<Expr>),
    Neg(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

/// Tokenize an already-whitelisted expression string
fn tokenize(input: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&ch) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '+' => {
                tokens.push(Token::Plus);
                chars.next();
            }
            '-' => {
                tokens.push(Token::Minus);
                chars.next();
            }
            '*' => {
                tokens.push(Token::Star);
                chars.next();
            }
            '/' => {
                tokens.push(Token::Slash);
                chars.next();
            }
            '(' => {
                tokens.push(Token::LParen);
                chars.next();
            }
            ')' => {
                tokens.push(Token::RParen);
                chars.next();
            }
            '0'..='9' | '.' => {
                let mut num_str = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        num_str.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match num_str.parse::<f64>() {
                    Ok(n) => tokens.push(Token::Number(n)),
                    Err(_) => return Err(ExprError::InvalidNumber(num_str)),
                }
            }
            other => return Err(ExprError::UnsafeCharacters(other.to_string())),
        }
    }

    Ok(tokens)
}

/// Parse tokens into AST
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0, depth: 0 }
    }

    fn enter(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExprError::TooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    // expr = term (('+' | '-') term)*
    fn parse_expr(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_term()?;

        loop {
            let op = match self.peek() {
                Some(Token::Plus) => Op::Add,
                Some(Token::Minus) => Op::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            left = Expr::BinOp(Box::new(left), op, Box::new(right));
        }

        Ok(left)
    }

    // term = unary (('*' | '/') unary)*
    fn parse_term(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.peek() {
                Some(Token::Star) => Op::Mul,
                Some(Token::Slash) => Op::Div,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::BinOp(Box::new(left), op, Box::new(right));
        }

        Ok(left)
    }

    // unary = ('-' | '+') unary | primary
    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        self.enter()?;
        let expr = match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                Expr::Neg(Box::new(self.parse_unary()?))
            }
            Some(Token::Plus) => {
                self.advance();
                self.parse_unary()?
            }
            _ => self.parse_primary()?,
        };
        self.depth -= 1;
        Ok(expr)
    }

    // primary = number | '(' expr ')'
    fn parse_primary(&mut self) -> Result<Expr, ExprError> {
        match self.peek().cloned() {
            Some(Token::Number(n)) => {
                self.advance();
                Ok(Expr::Num(n))
            }
            Some(Token::LParen) => {
                self.enter()?;
                self.advance();
                let expr = self.parse_expr()?;
                if !matches!(self.peek(), Some(Token::RParen)) {
                    return Err(ExprError::UnexpectedEnd);
                }
                self.advance();
                self.depth -= 1;
                Ok(expr)
            }
            Some(token) => Err(ExprError::UnexpectedToken(format!("{:?}", token))),
            None => Err(ExprError::UnexpectedEnd),
        }
    }
}

/// Parse a substituted expression string into an AST
pub fn parse_expr(input: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ExprError::UnexpectedEnd);
    }
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_expr()?;

    // Check that all tokens were consumed
    if let Some(token) = parser.peek() {
        return Err(ExprError::UnexpectedToken(format!("{:?}", token)));
    }

    Ok(expr)
}

/// Evaluate a parsed expression
pub fn eval_expr(expr: &Expr) -> Result<f64, ExprError> {
    let value = match expr {
        Expr::Num(n) => *n,
        Expr::Neg(inner) => -eval_expr(inner)?,
        Expr::BinOp(left, op, right) => {
            let l = eval_expr(left)?;
            let r = eval_expr(right)?;
            match op {
                Op::Add => l + r,
                Op::Sub => l - r,
                Op::Mul => l * r,
                Op::Div => {
                    if r == 0.0 {
                        return Err(ExprError::DivisionByZero);
                    }
                    l / r
                }
            }
        }
    };

    if value.is_finite() {
        Ok(value)
    } else {
        Err(ExprError::NonFinite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_simple() {
        let tokens = tokenize("400 * -1").unwrap();
        assert_eq!(tokens, vec![Token::Number(400.0), Token::Star, Token::Minus, Token::Number(1.0)]);
    }

    #[test]
    fn test_precedence() {
        let expr = parse_expr("2 + 3 * 4").unwrap();
        assert_eq!(eval_expr(&expr).unwrap(), 14.0);
    }

    #[test]
    fn test_parentheses() {
        let expr = parse_expr("(2 + 3) * 4").unwrap();
        assert_eq!(eval_expr(&expr).unwrap(), 20.0);
    }

    #[test]
    fn test_double_negation() {
        let expr = parse_expr("10 - -5").unwrap();
        assert_eq!(eval_expr(&expr).unwrap(), 15.0);
    }

    #[test]
    fn test_left_associative_division() {
        let expr = parse_expr("100 / 10 / 2").unwrap();
        assert_eq!(eval_expr(&expr).unwrap(), 5.0);
    }

    #[test]
    fn test_division_by_zero() {
        let expr = parse_expr("1 / 0").unwrap();
        assert_eq!(eval_expr(&expr), Err(ExprError::DivisionByZero));
    }

    #[test]
    fn test_rejects_letters() {
        assert!(matches!(parse_expr("alert(1)"), Err(ExprError::UnsafeCharacters(_))));
    }

    #[test]
    fn test_unbalanced() {
        assert_eq!(parse_expr("(1 + 2"), Err(ExprError::UnexpectedEnd));
        assert!(matches!(parse_expr("1 + 2)"), Err(ExprError::UnexpectedToken(_))));
        assert!(matches!(parse_expr("1.2.3"), Err(ExprError::InvalidNumber(_))));
    }

    #[test]
    fn test_deep_nesting_rejected() {
        let nested = format!("{}1{}", "(".repeat(20_000), ")".repeat(20_000));
        assert_eq!(parse_expr(&nested), Err(ExprError::TooDeep(MAX_DEPTH)));

        let signs = format!("{}1", "-".repeat(20_000));
        assert_eq!(parse_expr(&signs), Err(ExprError::TooDeep(MAX_DEPTH)));
    }

    #[test]
    fn test_depth_resets_between_siblings() {
        let group = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        let sum = vec![group; 10].join(" + ");
        assert_eq!(eval_expr(&parse_expr(&sum).unwrap()).unwrap(), 10.0);
    }
}
