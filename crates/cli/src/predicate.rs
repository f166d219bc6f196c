// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filter predicate parser for `partix prune`
//!
//! ```text
//! or      := and ("OR" and)*
//! and     := atom ("AND" atom)*
//! atom    := "(" or ")" | "NOT" atom | operand op operand
//!          | ident "IN" "(" literal ("," literal)* ")"
//!          | ident "IS" ["NOT"] "NULL"
//! operand := ident | literal
//! literal := integer | 'YYYY-MM-DD' | NULL | $n
//! ```

use partix_core::{CmpOp, Expr, KeyType, Operand, Value};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unexpected end of predicate")]
    UnexpectedEnd,
    #[error("unexpected {found} at token {at}")]
    Unexpected { found: String, at: usize },
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnknownChar { ch: char, offset: usize },
    #[error("unterminated string literal at offset {0}")]
    UnterminatedString(usize),
    #[error("invalid literal {0}")]
    InvalidLiteral(String),
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Ident(String),
    Keyword(Keyword),
    Int(i64),
    Str(String),
    Param(usize),
    Op(CmpOp),
    LParen,
    RParen,
    Comma,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Keyword {
    And,
    Or,
    Not,
    In,
    Is,
    Null,
}

impl Keyword {
    fn lookup(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "AND" => Some(Keyword::And),
            "OR" => Some(Keyword::Or),
            "NOT" => Some(Keyword::Not),
            "IN" => Some(Keyword::In),
            "IS" => Some(Keyword::Is),
            "NULL" => Some(Keyword::Null),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(name) => write!(f, "identifier {name}"),
            Token::Keyword(kw) => write!(f, "{}", format!("{kw:?}").to_ascii_uppercase()),
            Token::Int(v) => write!(f, "{v}"),
            Token::Str(s) => write!(f, "'{s}'"),
            Token::Param(n) => write!(f, "${n}"),
            Token::Op(op) => f.write_str(op.symbol()),
            Token::LParen => f.write_str("'('"),
            Token::RParen => f.write_str("')'"),
            Token::Comma => f.write_str("','"),
        }
    }
}

/// Parse `input` into a filter expression
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.or()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(parser.unexpected(token.clone())),
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();
    while let Some(&(offset, ch)) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' | ')' | ',' => {
                chars.next();
                tokens.push(match ch {
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    _ => Token::Comma,
                });
            }
            '=' => {
                chars.next();
                tokens.push(Token::Op(CmpOp::Eq));
            }
            '<' | '>' | '!' => {
                chars.next();
                let next = chars.peek().map(|&(_, c)| c);
                let op = match (ch, next) {
                    ('<', Some('=')) => Some(CmpOp::Le),
                    ('<', Some('>')) | ('!', Some('=')) => Some(CmpOp::Ne),
                    ('>', Some('=')) => Some(CmpOp::Ge),
                    _ => None,
                };
                match (op, ch) {
                    (Some(op), _) => {
                        chars.next();
                        tokens.push(Token::Op(op));
                    }
                    (None, '<') => tokens.push(Token::Op(CmpOp::Lt)),
                    (None, '>') => tokens.push(Token::Op(CmpOp::Gt)),
                    (None, _) => return Err(ParseError::UnknownChar { ch, offset }),
                }
            }
            '\'' => {
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some((_, '\'')) => break,
                        Some((_, c)) => text.push(c),
                        None => return Err(ParseError::UnterminatedString(offset)),
                    }
                }
                tokens.push(Token::Str(text));
            }
            '$' => {
                chars.next();
                let digits = take_while(&mut chars, |c| c.is_ascii_digit());
                match digits.parse::<usize>() {
                    Ok(n) if n > 0 => tokens.push(Token::Param(n)),
                    _ => return Err(ParseError::InvalidLiteral(format!("${digits}"))),
                }
            }
            c if c.is_ascii_digit() || c == '-' => {
                chars.next();
                let rest = take_while(&mut chars, |c| c.is_ascii_digit());
                let text = format!("{c}{rest}");
                let value = text
                    .parse::<i64>()
                    .map_err(|_| ParseError::InvalidLiteral(text.clone()))?;
                tokens.push(Token::Int(value));
            }
            c if c.is_alphabetic() || c == '_' => {
                let word = take_while(&mut chars, |c| c.is_alphanumeric() || c == '_');
                tokens.push(match Keyword::lookup(&word) {
                    Some(kw) => Token::Keyword(kw),
                    None => Token::Ident(word),
                });
            }
            _ => return Err(ParseError::UnknownChar { ch, offset }),
        }
    }
    Ok(tokens)
}

fn take_while(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    keep: impl Fn(char) -> bool,
) -> String {
    let mut out = String::new();
    while let Some(&(_, c)) = chars.peek() {
        if !keep(c) {
            break;
        }
        out.push(c);
        chars.next();
    }
    out
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<Token, ParseError> {
        let token = self.tokens.get(self.pos).cloned().ok_or(ParseError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(token)
    }

    fn unexpected(&self, found: Token) -> ParseError {
        ParseError::Unexpected {
            found: found.to_string(),
            at: self.pos,
        }
    }

    fn eat_keyword(&mut self, kw: Keyword) -> bool {
        if self.peek() == Some(&Token::Keyword(kw)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, want: Token) -> Result<(), ParseError> {
        let token = self.next()?;
        if token == want {
            Ok(())
        } else {
            self.pos -= 1;
            Err(self.unexpected(token))
        }
    }

    fn or(&mut self) -> Result<Expr, ParseError> {
        let mut args = vec![self.and()?];
        while self.eat_keyword(Keyword::Or) {
            args.push(self.and()?);
        }
        Ok(if args.len() == 1 {
            args.remove(0)
        } else {
            Expr::Or(args)
        })
    }

    fn and(&mut self) -> Result<Expr, ParseError> {
        let mut args = vec![self.atom()?];
        while self.eat_keyword(Keyword::And) {
            args.push(self.atom()?);
        }
        Ok(if args.len() == 1 {
            args.remove(0)
        } else {
            Expr::And(args)
        })
    }

    fn atom(&mut self) -> Result<Expr, ParseError> {
        match self.next()? {
            Token::LParen => {
                let inner = self.or()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::Keyword(Keyword::Not) => Ok(Expr::Not(Box::new(self.atom()?))),
            Token::Ident(column) if self.eat_keyword(Keyword::In) => self.in_list(column),
            Token::Ident(column) if self.eat_keyword(Keyword::Is) => {
                let negated = self.eat_keyword(Keyword::Not);
                match self.next()? {
                    Token::Keyword(Keyword::Null) => Ok(Expr::IsNull { column, negated }),
                    other => {
                        self.pos -= 1;
                        Err(self.unexpected(other))
                    }
                }
            }
            first => {
                let left = self.operand(first)?;
                let op = match self.next()? {
                    Token::Op(op) => op,
                    other => {
                        self.pos -= 1;
                        return Err(self.unexpected(other));
                    }
                };
                let next = self.next()?;
                let right = self.operand(next)?;
                Ok(Expr::Compare { left, op, right })
            }
        }
    }

    fn in_list(&mut self, column: String) -> Result<Expr, ParseError> {
        self.expect(Token::LParen)?;
        let mut values = Vec::new();
        loop {
            let token = self.next()?;
            values.push(self.literal(token)?);
            match self.next()? {
                Token::Comma => continue,
                Token::RParen => break,
                other => {
                    self.pos -= 1;
                    return Err(self.unexpected(other));
                }
            }
        }
        Ok(Expr::InList { column, values })
    }

    fn operand(&self, token: Token) -> Result<Operand, ParseError> {
        match token {
            Token::Ident(name) => Ok(Operand::Column(name)),
            other => self.literal(other),
        }
    }

    fn literal(&self, token: Token) -> Result<Operand, ParseError> {
        match token {
            Token::Int(v) => Ok(Operand::Const(Value::Int(v))),
            Token::Str(text) => KeyType::Date
                .parse_value(&text)
                .map(Operand::Const)
                .map_err(|_| ParseError::InvalidLiteral(format!("'{text}'"))),
            Token::Keyword(Keyword::Null) => Ok(Operand::Const(Value::Null)),
            Token::Param(n) => Ok(Operand::Param(n - 1)),
            other => Err(self.unexpected(other)),
        }
    }
}

#[cfg(test)]
#[path = "predicate_tests.rs"]
mod tests;
