//! Row selectors: boolean expressions over column names.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! or      := and ( '|' and )*
//! and     := cmp ( '&' cmp )*
//! cmp     := unary ( ('==' | '!=' | '<' | '<=' | '>=' | '>') unary )?
//! unary   := '~' unary | atom
//! atom    := '(' or ')' | column | literal | ':' param
//! literal := integer | float | 'string' | "string" | true | false
//! ```
//!
//! A [Selector] is a disjunction of such expressions; an empty one matches
//! every row.

use std::cmp::Ordering;
use std::fmt::{self, Display};
use std::str::FromStr;

use vcs_core::{Column, Value, VcsError, VcsResult};

use crate::record::Record;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Ge,
    Gt,
}

impl CmpOp {
    fn holds(&self, ordering: Option<Ordering>) -> bool {
        match (self, ordering) {
            (CmpOp::Eq, Some(o)) => o == Ordering::Equal,
            (CmpOp::Ne, Some(o)) => o != Ordering::Equal,
            (CmpOp::Ne, None) => true,
            (CmpOp::Lt, Some(o)) => o == Ordering::Less,
            (CmpOp::Le, Some(o)) => o != Ordering::Greater,
            (CmpOp::Ge, Some(o)) => o != Ordering::Less,
            (CmpOp::Gt, Some(o)) => o == Ordering::Greater,
            (_, None) => false,
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Ge => ">=",
            CmpOp::Gt => ">",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Column(String),
    Literal(Value),
    Param(String),
    Cmp(Box<Expr>, CmpOp, Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
}

impl Expr {
    fn eval<'v, F>(&self, lookup: &F) -> VcsResult<Value>
    where
        F: Fn(&str) -> Option<&'v Value>,
    {
        match self {
            Expr::Column(name) => lookup(name)
                .cloned()
                .ok_or_else(|| VcsError::SchemaMismatch(format!("Unknown column {}", name))),
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Param(name) => Err(VcsError::Usage(format!("Unbound parameter :{}", name))),
            Expr::Cmp(lhs, op, rhs) => {
                let (l, r) = (lhs.eval(lookup)?, rhs.eval(lookup)?);
                Ok(Value::Bool(op.holds(l.compare(&r))))
            }
            Expr::And(terms) => {
                for term in terms {
                    if !term.truth(lookup)? {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            Expr::Or(terms) => {
                for term in terms {
                    if term.truth(lookup)? {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            Expr::Not(inner) => Ok(Value::Bool(!inner.truth(lookup)?)),
        }
    }

    fn truth<'v, F>(&self, lookup: &F) -> VcsResult<bool>
    where
        F: Fn(&str) -> Option<&'v Value>,
    {
        match self.eval(lookup)? {
            Value::Bool(b) => Ok(b),
            other => Err(VcsError::Usage(format!(
                "Selector term {} is not a boolean",
                other
            ))),
        }
    }

    fn bind(self, params: &Record) -> VcsResult<Expr> {
        Ok(match self {
            Expr::Param(name) => Expr::Literal(
                params
                    .get(&name)
                    .cloned()
                    .ok_or_else(|| VcsError::Usage(format!("Unbound parameter :{}", name)))?,
            ),
            Expr::Cmp(l, op, r) => Expr::Cmp(Box::new(l.bind(params)?), op, Box::new(r.bind(params)?)),
            Expr::And(terms) => Expr::And(
                terms
                    .into_iter()
                    .map(|t| t.bind(params))
                    .collect::<VcsResult<_>>()?,
            ),
            Expr::Or(terms) => Expr::Or(
                terms
                    .into_iter()
                    .map(|t| t.bind(params))
                    .collect::<VcsResult<_>>()?,
            ),
            Expr::Not(inner) => Expr::Not(Box::new(inner.bind(params)?)),
            other => other,
        })
    }

    fn columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Column(name) => out.push(name),
            Expr::Cmp(l, _, r) => {
                l.columns(out);
                r.columns(out);
            }
            Expr::And(terms) | Expr::Or(terms) => terms.iter().for_each(|t| t.columns(out)),
            Expr::Not(inner) => inner.columns(out),
            Expr::Literal(_) | Expr::Param(_) => {}
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(name) => write!(f, "{}", name),
            Expr::Literal(value) => write!(f, "{}", literal(value)),
            Expr::Param(name) => write!(f, ":{}", name),
            Expr::Cmp(l, op, r) => write!(f, "({} {} {})", l, op.symbol(), r),
            Expr::And(terms) => write!(f, "({})", join(terms, " & ")),
            Expr::Or(terms) => write!(f, "({})", join(terms, " | ")),
            Expr::Not(inner) => write!(f, "~{}", inner),
        }
    }
}

fn join(terms: &[Expr], separator: &str) -> String {
    terms
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(separator)
}

///
/// Render a value as a selector literal.
///
pub fn literal(value: &Value) -> String {
    match value {
        Value::Str(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        Value::Float(v) => format!("{:?}", v),
        Value::Double(v) => format!("{:?}", v),
        other => other.to_string(),
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    LParen,
    RParen,
    And,
    Or,
    Not,
    Op(CmpOp),
    Ident(String),
    Param(String),
    Lit(Value),
}

fn tokenize(text: &str) -> VcsResult<Vec<Token>> {
    let err = |msg: String| VcsError::Usage(format!("Bad selector {:?}: {}", text, msg));
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '&' => {
                tokens.push(Token::And);
                i += 1;
            }
            '|' => {
                tokens.push(Token::Or);
                i += 1;
            }
            '~' => {
                tokens.push(Token::Not);
                i += 1;
            }
            '=' if next == Some('=') => {
                tokens.push(Token::Op(CmpOp::Eq));
                i += 2;
            }
            '!' if next == Some('=') => {
                tokens.push(Token::Op(CmpOp::Ne));
                i += 2;
            }
            '<' if next == Some('=') => {
                tokens.push(Token::Op(CmpOp::Le));
                i += 2;
            }
            '>' if next == Some('=') => {
                tokens.push(Token::Op(CmpOp::Ge));
                i += 2;
            }
            '<' => {
                tokens.push(Token::Op(CmpOp::Lt));
                i += 1;
            }
            '>' => {
                tokens.push(Token::Op(CmpOp::Gt));
                i += 1;
            }
            '\'' | '"' => {
                let quote = c;
                let mut s = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(err("unterminated string".into())),
                        Some('\\') => {
                            let escaped = chars
                                .get(i + 1)
                                .ok_or_else(|| err("dangling escape".into()))?;
                            s.push(*escaped);
                            i += 2;
                        }
                        Some(ch) if *ch == quote => {
                            i += 1;
                            break;
                        }
                        Some(ch) => {
                            s.push(*ch);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Lit(Value::Str(s)));
            }
            ':' => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && (chars[end].is_alphanumeric() || chars[end] == '_') {
                    end += 1;
                }
                if end == start {
                    return Err(err("empty parameter name".into()));
                }
                tokens.push(Token::Param(chars[start..end].iter().collect()));
                i = end;
            }
            c if c.is_ascii_digit() || (c == '-' && next.is_some_and(|n| n.is_ascii_digit())) => {
                let start = i;
                i += 1;
                while i < chars.len()
                    && (chars[i].is_ascii_digit()
                        || chars[i] == '.'
                        || chars[i] == 'e'
                        || chars[i] == 'E'
                        || ((chars[i] == '-' || chars[i] == '+')
                            && matches!(chars[i - 1], 'e' | 'E')))
                {
                    i += 1;
                }
                let raw: String = chars[start..i].iter().collect();
                let value = match raw.parse::<i64>() {
                    Ok(v) => Value::Long(v),
                    Err(_) => Value::Double(
                        raw.parse::<f64>()
                            .map_err(|_| err(format!("bad number {}", raw)))?,
                    ),
                };
                tokens.push(Token::Lit(value));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(match word.as_str() {
                    "true" | "True" => Token::Lit(Value::Bool(true)),
                    "false" | "False" => Token::Lit(Value::Bool(false)),
                    _ => Token::Ident(word),
                });
            }
            other => return Err(err(format!("unexpected character {:?}", other))),
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    text: String,
}

impl Parser {
    fn error(&self, msg: &str) -> VcsError {
        VcsError::Usage(format!("Bad selector {:?}: {}", self.text, msg))
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    // n-ary nodes keep long disjunctions flat
    fn or(&mut self) -> VcsResult<Expr> {
        let mut terms = vec![self.and()?];
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            terms.push(self.and()?);
        }
        Ok(match terms.len() {
            1 => terms.remove(0),
            _ => Expr::Or(terms),
        })
    }

    fn and(&mut self) -> VcsResult<Expr> {
        let mut terms = vec![self.cmp()?];
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            terms.push(self.cmp()?);
        }
        Ok(match terms.len() {
            1 => terms.remove(0),
            _ => Expr::And(terms),
        })
    }

    fn cmp(&mut self) -> VcsResult<Expr> {
        let lhs = self.unary()?;
        if let Some(Token::Op(op)) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.unary()?;
            return Ok(Expr::Cmp(Box::new(lhs), op, Box::new(rhs)));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> VcsResult<Expr> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            return Ok(Expr::Not(Box::new(self.unary()?)));
        }
        self.atom()
    }

    fn atom(&mut self) -> VcsResult<Expr> {
        match self.advance() {
            Some(Token::LParen) => {
                let inner = self.or()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(self.error("missing closing parenthesis")),
                }
            }
            Some(Token::Ident(name)) => Ok(Expr::Column(name)),
            Some(Token::Param(name)) => Ok(Expr::Param(name)),
            Some(Token::Lit(value)) => Ok(Expr::Literal(value)),
            Some(_) => Err(self.error("unexpected token")),
            None => Err(self.error("unexpected end of expression")),
        }
    }
}

fn parse_expr(text: &str) -> VcsResult<Option<Expr>> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Ok(None);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        text: text.to_string(),
    };
    let expr = parser.or()?;
    if parser.pos != parser.tokens.len() {
        return Err(parser.error("trailing tokens"));
    }
    Ok(Some(expr))
}

///
/// A disjunction of boolean expressions; no term at all matches every row.
///
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Selector {
    terms: Vec<Expr>,
}

impl Selector {
    /// The selector matching every row.
    pub fn all() -> Self {
        Selector::default()
    }

    ///
    /// Parse one expression. Empty or blank text matches every row.
    ///
    pub fn parse(text: &str) -> VcsResult<Self> {
        Ok(Selector {
            terms: parse_expr(text)?.into_iter().collect(),
        })
    }

    ///
    /// Parse a list of expressions read as their disjunction. Blank entries
    /// are skipped; a list with no usable entry matches every row.
    ///
    pub fn any_of<S: AsRef<str>>(texts: &[S]) -> VcsResult<Self> {
        let mut terms = Vec::with_capacity(texts.len());
        for text in texts {
            if let Some(expr) = parse_expr(text.as_ref())? {
                terms.push(expr);
            }
        }
        Ok(Selector { terms })
    }

    pub fn matches_all(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn n_terms(&self) -> usize {
        self.terms.len()
    }

    ///
    /// Evaluate against a row whose values are found through `lookup`.
    ///
    pub fn matches_with<'v, F>(&self, lookup: F) -> VcsResult<bool>
    where
        F: Fn(&str) -> Option<&'v Value>,
    {
        if self.terms.is_empty() {
            return Ok(true);
        }
        for term in &self.terms {
            if term.truth(&lookup)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn matches(&self, record: &Record) -> VcsResult<bool> {
        self.matches_with(|name| record.get(name))
    }

    /// Replace every `:name` placeholder with the matching value of `params`.
    pub fn bind(self, params: &Record) -> VcsResult<Self> {
        let terms = self
            .terms
            .into_iter()
            .map(|t| t.bind(params))
            .collect::<VcsResult<Vec<_>>>()?;
        Ok(Selector { terms })
    }

    /// Check that every column named by the selector exists.
    pub fn validate(&self, columns: &[Column]) -> VcsResult<()> {
        let mut names = Vec::new();
        for term in &self.terms {
            term.columns(&mut names);
        }
        match names
            .into_iter()
            .find(|n| !columns.iter().any(|c| c.name == *n))
        {
            Some(unknown) => Err(VcsError::SchemaMismatch(format!(
                "Selector names unknown column {}",
                unknown
            ))),
            None => Ok(()),
        }
    }
}

impl FromStr for Selector {
    type Err = VcsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::parse(s)
    }
}

impl Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.terms.iter().map(|t| t.to_string()).collect();
        write!(f, "{}", parts.join(" | "))
    }
}

///
/// Build `column == v1 | column == v2 | ...` selectors over `values`, each
/// holding at most `max_terms` comparisons.
///
pub fn chunked_disjunction(column: &str, values: &[Value], max_terms: usize) -> Vec<String> {
    values
        .chunks(max_terms.max(1))
        .map(|chunk| {
            chunk
                .iter()
                .map(|v| format!("({} == {})", column, literal(v)))
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .collect()
}
