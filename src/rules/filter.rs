#![forbid(unsafe_code)]

//! Rule filter expressions
//!
//! A filter is a boolean predicate evaluated once per loaded rule; rules
//! for which it is false are dropped from the run. Inside the predicate,
//! `.Name`, `.Level`, `.Scope`, `.Message`, `.Description`, `.Extends` and
//! `.Link` (or `#.Name` and so on) refer to the rule being tested:
//!
//! ```text
//! .Level in ["error", "warning"] and not (.Name startsWith "Vellum.")
//! .Extends == "existence" || .Scope contains "heading"
//! ```
//!
//! Supported: string, number and boolean literals, `[...]` arrays,
//! `== != < <= > >=`, `and or not && || !`, `in`, `not in`, `contains`,
//! `startsWith`, `endsWith`, `matches` (regex), `len()`, `lower()`,
//! `upper()` and parentheses.

use super::definition::Definition;
use crate::config::Config;
use crate::error::ConfigError;
use regex::Regex;
use std::cmp::Ordering;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Field(String),
    Ident(String),
    Str(String),
    Num(f64),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Op(&'static str),
}

fn lex(src: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = src.chars().collect();
    let mut i = 0;

    let ident_at = |start: usize| -> (String, usize) {
        let mut end = start;
        while end < chars.len() && (chars[end].is_alphanumeric() || chars[end] == '_') {
            end += 1;
        }
        (chars[start..end].iter().collect(), end)
    };

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            _ if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '#' | '.' => {
                let start = if c == '#' && next == Some('.') { i + 2 } else { i + 1 };
                let (name, end) = ident_at(start);
                if name.is_empty() {
                    return Err(format!("expected a field name at {i}"));
                }
                tokens.push(Token::Field(name));
                i = end;
            }
            '"' | '\'' | '`' => {
                let mut out = String::new();
                let mut j = i + 1;
                loop {
                    match chars.get(j) {
                        None => return Err(format!("unterminated string starting at {i}")),
                        Some('\\') if c != '`' => {
                            match chars.get(j + 1) {
                                Some('n') => out.push('\n'),
                                Some('t') => out.push('\t'),
                                Some(other) => out.push(*other),
                                None => return Err("dangling escape".to_string()),
                            }
                            j += 2;
                        }
                        Some(ch) if *ch == c => break,
                        Some(ch) => {
                            out.push(*ch);
                            j += 1;
                        }
                    }
                }
                tokens.push(Token::Str(out));
                i = j + 1;
            }
            '0'..='9' => {
                let mut end = i;
                while end < chars.len() && (chars[end].is_ascii_digit() || chars[end] == '.') {
                    end += 1;
                }
                let text: String = chars[i..end].iter().collect();
                let num = text
                    .parse()
                    .map_err(|_| format!("invalid number '{text}'"))?;
                tokens.push(Token::Num(num));
                i = end;
            }
            '=' | '!' | '<' | '>' | '&' | '|' => {
                let op = match (c, next) {
                    ('=', Some('=')) => "==",
                    ('!', Some('=')) => "!=",
                    ('<', Some('=')) => "<=",
                    ('>', Some('=')) => ">=",
                    ('&', Some('&')) => "&&",
                    ('|', Some('|')) => "||",
                    ('<', _) => "<",
                    ('>', _) => ">",
                    ('!', _) => "!",
                    _ => return Err(format!("unexpected '{c}' at {i}")),
                };
                tokens.push(Token::Op(op));
                i += op.len();
            }
            _ if c.is_alphabetic() || c == '_' => {
                let (name, end) = ident_at(i);
                tokens.push(Token::Ident(name));
                i = end;
            }
            _ => return Err(format!("unexpected '{c}' at {i}")),
        }
    }
    Ok(tokens)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    Contains,
    StartsWith,
    EndsWith,
    Matches,
}

impl BinOp {
    fn precedence(self) -> u8 {
        match self {
            BinOp::Or => 1,
            BinOp::And => 2,
            _ => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Field(String),
    Str(String),
    Num(f64),
    Bool(bool),
    Array(Vec<Expr>),
    Not(Box<Expr>),
    Call(String, Vec<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
}

const NOT_PRECEDENCE: u8 = 3;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, token: Token) -> Result<(), String> {
        match self.next() {
            Some(t) if t == token => Ok(()),
            Some(t) => Err(format!("expected {token:?}, found {t:?}")),
            None => Err(format!("expected {token:?}, found end of input")),
        }
    }

    /// The binary operator at the cursor and how many tokens it spans
    fn binary_op(&self) -> Option<(BinOp, usize)> {
        let op = match self.peek()? {
            Token::Op("||") => BinOp::Or,
            Token::Op("&&") => BinOp::And,
            Token::Op("==") => BinOp::Eq,
            Token::Op("!=") => BinOp::Ne,
            Token::Op("<") => BinOp::Lt,
            Token::Op("<=") => BinOp::Le,
            Token::Op(">") => BinOp::Gt,
            Token::Op(">=") => BinOp::Ge,
            Token::Ident(word) => match word.as_str() {
                "or" => BinOp::Or,
                "and" => BinOp::And,
                "in" => BinOp::In,
                "contains" => BinOp::Contains,
                "startsWith" => BinOp::StartsWith,
                "endsWith" => BinOp::EndsWith,
                "matches" => BinOp::Matches,
                "not" => match self.tokens.get(self.pos + 1) {
                    Some(Token::Ident(w)) if w == "in" => return Some((BinOp::NotIn, 2)),
                    _ => return None,
                },
                _ => return None,
            },
            _ => return None,
        };
        Some((op, 1))
    }

    fn expr(&mut self, min: u8) -> Result<Expr, String> {
        let mut left = self.prefix()?;
        while let Some((op, width)) = self.binary_op() {
            let prec = op.precedence();
            if prec < min {
                break;
            }
            self.pos += width;
            let right = self.expr(prec + 1)?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn prefix(&mut self) -> Result<Expr, String> {
        match self.next() {
            Some(Token::Op("!")) => Ok(Expr::Not(Box::new(self.expr(NOT_PRECEDENCE)?))),
            Some(Token::Ident(word)) if word == "not" => {
                Ok(Expr::Not(Box::new(self.expr(NOT_PRECEDENCE)?)))
            }
            Some(Token::Ident(word)) if word == "true" => Ok(Expr::Bool(true)),
            Some(Token::Ident(word)) if word == "false" => Ok(Expr::Bool(false)),
            Some(Token::Ident(name)) => {
                self.expect(Token::LParen)?;
                let args = self.list(Token::RParen)?;
                Ok(Expr::Call(name, args))
            }
            Some(Token::Field(name)) => Ok(Expr::Field(name)),
            Some(Token::Str(s)) => Ok(Expr::Str(s)),
            Some(Token::Num(n)) => Ok(Expr::Num(n)),
            Some(Token::LBracket) => Ok(Expr::Array(self.list(Token::RBracket)?)),
            Some(Token::LParen) => {
                let inner = self.expr(0)?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(other) => Err(format!("unexpected {other:?}")),
            None => Err("unexpected end of expression".to_string()),
        }
    }

    fn list(&mut self, close: Token) -> Result<Vec<Expr>, String> {
        let mut items = Vec::new();
        if self.peek() == Some(&close) {
            self.pos += 1;
            return Ok(items);
        }
        loop {
            items.push(self.expr(0)?);
            match self.next() {
                Some(Token::Comma) => continue,
                Some(t) if t == close => return Ok(items),
                Some(t) => return Err(format!("expected ',' or {close:?}, found {t:?}")),
                None => return Err(format!("expected {close:?}")),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Val {
    Str(String),
    Num(f64),
    Bool(bool),
    List(Vec<Val>),
}

impl Val {
    fn type_name(&self) -> &'static str {
        match self {
            Val::Str(_) => "string",
            Val::Num(_) => "number",
            Val::Bool(_) => "bool",
            Val::List(_) => "array",
        }
    }

    fn as_bool(&self) -> Result<bool, String> {
        match self {
            Val::Bool(b) => Ok(*b),
            other => Err(format!("expected bool, found {}", other.type_name())),
        }
    }

    fn as_str(&self) -> Result<&str, String> {
        match self {
            Val::Str(s) => Ok(s),
            other => Err(format!("expected string, found {}", other.type_name())),
        }
    }
}

fn field(rule: &Definition, name: &str) -> Result<Val, String> {
    Ok(match name {
        "Name" => Val::Str(rule.name.clone()),
        "Level" => Val::Str(rule.level.as_str().to_string()),
        "Scope" => Val::List(
            rule.scope
                .selectors()
                .iter()
                .map(|s| Val::Str(s.as_str().to_string()))
                .collect(),
        ),
        "Message" => Val::Str(rule.message.clone()),
        "Description" => Val::Str(rule.description.clone()),
        "Extends" => Val::Str(rule.extends.clone()),
        "Link" => Val::Str(rule.link.clone()),
        other => return Err(format!("unknown field '.{other}'")),
    })
}

fn compare(op: BinOp, left: &Val, right: &Val) -> Result<bool, String> {
    let ordering = match (left, right) {
        (Val::Num(a), Val::Num(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
        (Val::Str(a), Val::Str(b)) => a.cmp(b),
        (a, b) => {
            return Err(format!(
                "cannot compare {} with {}",
                a.type_name(),
                b.type_name()
            ));
        }
    };
    Ok(match op {
        BinOp::Lt => ordering == Ordering::Less,
        BinOp::Le => ordering != Ordering::Greater,
        BinOp::Gt => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    })
}

fn contains(haystack: &Val, needle: &Val) -> Result<bool, String> {
    match haystack {
        Val::List(items) => Ok(items.contains(needle)),
        Val::Str(s) => Ok(s.contains(needle.as_str()?)),
        other => Err(format!("cannot search in {}", other.type_name())),
    }
}

fn eval(expr: &Expr, rule: &Definition) -> Result<Val, String> {
    match expr {
        Expr::Field(name) => field(rule, name),
        Expr::Str(s) => Ok(Val::Str(s.clone())),
        Expr::Num(n) => Ok(Val::Num(*n)),
        Expr::Bool(b) => Ok(Val::Bool(*b)),
        Expr::Array(items) => Ok(Val::List(
            items
                .iter()
                .map(|e| eval(e, rule))
                .collect::<Result<_, _>>()?,
        )),
        Expr::Not(inner) => Ok(Val::Bool(!eval(inner, rule)?.as_bool()?)),
        Expr::Call(name, args) => {
            let [arg] = args.as_slice() else {
                return Err(format!("{name}() takes exactly one argument"));
            };
            let value = eval(arg, rule)?;
            match (name.as_str(), &value) {
                ("len", Val::Str(s)) => Ok(Val::Num(s.chars().count() as f64)),
                ("len", Val::List(items)) => Ok(Val::Num(items.len() as f64)),
                ("lower", Val::Str(s)) => Ok(Val::Str(s.to_lowercase())),
                ("upper", Val::Str(s)) => Ok(Val::Str(s.to_uppercase())),
                ("len" | "lower" | "upper", other) => Err(format!(
                    "{name}() does not accept {}",
                    other.type_name()
                )),
                _ => Err(format!("unknown function '{name}'")),
            }
        }
        Expr::Binary(BinOp::Or, left, right) => Ok(Val::Bool(
            eval(left, rule)?.as_bool()? || eval(right, rule)?.as_bool()?,
        )),
        Expr::Binary(BinOp::And, left, right) => Ok(Val::Bool(
            eval(left, rule)?.as_bool()? && eval(right, rule)?.as_bool()?,
        )),
        Expr::Binary(op, left, right) => {
            let left = eval(left, rule)?;
            let right = eval(right, rule)?;
            let result = match op {
                BinOp::Eq => left == right,
                BinOp::Ne => left != right,
                BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => compare(*op, &left, &right)?,
                BinOp::In => contains(&right, &left)?,
                BinOp::NotIn => !contains(&right, &left)?,
                BinOp::Contains => contains(&left, &right)?,
                BinOp::StartsWith => left.as_str()?.starts_with(right.as_str()?),
                BinOp::EndsWith => left.as_str()?.ends_with(right.as_str()?),
                BinOp::Matches => {
                    let re = Regex::new(right.as_str()?).map_err(|e| e.to_string())?;
                    re.is_match(left.as_str()?)
                }
                BinOp::Or | BinOp::And => unreachable!("handled above"),
            };
            Ok(Val::Bool(result))
        }
    }
}

/// A compiled rule filter
#[derive(Debug, Clone)]
pub struct Filter {
    fragment: String,
    expr: Expr,
}

impl Filter {
    pub fn compile(fragment: &str) -> Result<Self, ConfigError> {
        let error = |message: String| ConfigError::Filter {
            fragment: fragment.trim().to_string(),
            message,
        };
        let tokens = lex(fragment).map_err(error)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.expr(0).map_err(error)?;
        if let Some(extra) = parser.peek() {
            return Err(error(format!("unexpected {extra:?} after expression")));
        }
        Ok(Filter {
            fragment: fragment.to_string(),
            expr,
        })
    }

    /// Whether the filter inspects rule levels
    pub fn references_level(&self) -> bool {
        self.fragment.contains(".Level")
    }

    pub fn matches(&self, rule: &Definition) -> Result<bool, ConfigError> {
        eval(&self.expr, rule)
            .and_then(|v| v.as_bool())
            .map_err(|message| ConfigError::Filter {
                fragment: self.fragment.trim().to_string(),
                message: format!("{message} (evaluating {})", rule.name),
            })
    }

    /// Names of the rules that pass, truncated to `Style.Rule`
    pub fn apply<'a>(
        &self,
        rules: impl IntoIterator<Item = &'a Definition>,
    ) -> Result<Vec<String>, ConfigError> {
        let mut kept = Vec::new();
        for rule in rules {
            if self.matches(rule)? {
                kept.push(truncate_name(&rule.name));
            }
        }
        Ok(kept)
    }
}

fn truncate_name(name: &str) -> String {
    name.splitn(3, '.').take(2).collect::<Vec<_>>().join(".")
}

/// The filter source named by `string_or_path`
///
/// An existing file is read; otherwise an asset under `config/filters` on
/// the style search paths; otherwise the string itself is the filter.
pub fn resolve_fragment(config: &Config, string_or_path: &str) -> Result<String, ConfigError> {
    let candidate = Path::new(string_or_path);
    if candidate.is_file() {
        return Ok(std::fs::read_to_string(candidate)?);
    }
    if let Some(asset) = config.find_asset("filters", string_or_path) {
        return Ok(std::fs::read_to_string(asset)?);
    }
    Ok(string_or_path.to_string())
}
