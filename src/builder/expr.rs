//! Expression tree ADT and string-expression parser (spec.md §3 "Expression
//! tree", §4.4 "Expression parsing").

use crate::error::{Error, Result};
use crate::proto::messages as m;
use crate::value::Value;
use std::collections::BTreeSet;

/// Host-facing expression tree. Lowered to the wire [`m::Expr`] shape only
/// after every placeholder has been substituted with its bound value
/// (spec.md §4.4 "Parameter binding" step 3).
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Identifier(Vec<String>),
    Literal(Value),
    Placeholder(String),
    FunctionCall(String, Vec<Expr>),
    BinaryOp(String, Box<Expr>, Box<Expr>),
    UnaryOp(String, Box<Expr>),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
}

impl Expr {
    /// Collects every named placeholder referenced, in declaration order
    /// with duplicates removed (spec.md §3 "Placeholders are recorded in
    /// declaration order").
    pub fn placeholders(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut ordered = Vec::new();
        self.collect_placeholders(&mut seen, &mut ordered);
        ordered
    }

    fn collect_placeholders(&self, seen: &mut BTreeSet<String>, ordered: &mut Vec<String>) {
        match self {
            Expr::Placeholder(name) => {
                if seen.insert(name.clone()) {
                    ordered.push(name.clone());
                }
            }
            Expr::FunctionCall(_, args) => {
                for a in args {
                    a.collect_placeholders(seen, ordered);
                }
            }
            Expr::BinaryOp(_, lhs, rhs) => {
                lhs.collect_placeholders(seen, ordered);
                rhs.collect_placeholders(seen, ordered);
            }
            Expr::UnaryOp(_, inner) => inner.collect_placeholders(seen, ordered),
            Expr::Array(items) => {
                for i in items {
                    i.collect_placeholders(seen, ordered);
                }
            }
            Expr::Object(fields) => {
                for (_, v) in fields {
                    v.collect_placeholders(seen, ordered);
                }
            }
            Expr::Identifier(_) | Expr::Literal(_) => {}
        }
    }

    /// Replaces every `Placeholder` with its bound literal, failing
    /// `unbound-placeholder` if any referenced name has no binding
    /// (spec.md §4.4 "Parameter binding" steps 1-3).
    pub fn substitute(&self, bindings: &std::collections::HashMap<String, Value>) -> Result<Expr> {
        Ok(match self {
            Expr::Placeholder(name) => {
                let value = bindings
                    .get(name)
                    .ok_or_else(|| Error::UnboundPlaceholder(name.clone()))?;
                Expr::Literal(value.clone())
            }
            Expr::FunctionCall(name, args) => Expr::FunctionCall(
                name.clone(),
                args.iter().map(|a| a.substitute(bindings)).collect::<Result<_>>()?,
            ),
            Expr::BinaryOp(op, lhs, rhs) => Expr::BinaryOp(
                op.clone(),
                Box::new(lhs.substitute(bindings)?),
                Box::new(rhs.substitute(bindings)?),
            ),
            Expr::UnaryOp(op, inner) => Expr::UnaryOp(op.clone(), Box::new(inner.substitute(bindings)?)),
            Expr::Array(items) => {
                Expr::Array(items.iter().map(|i| i.substitute(bindings)).collect::<Result<_>>()?)
            }
            Expr::Object(fields) => Expr::Object(
                fields
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), v.substitute(bindings)?)))
                    .collect::<Result<_>>()?,
            ),
            Expr::Identifier(_) | Expr::Literal(_) => self.clone(),
        })
    }

    /// Lowers a fully-substituted tree (no remaining placeholders) to the
    /// wire shape submitted in a CRUD/SQL message.
    pub fn to_wire(&self) -> Result<m::Expr> {
        let kind = match self {
            Expr::Identifier(path) => m::ExprKind::Identifier(identifier_to_wire(path)),
            Expr::Literal(value) => m::ExprKind::Literal(scalar_to_wire(value)?),
            Expr::Placeholder(name) => {
                return Err(Error::UnboundPlaceholder(name.clone()));
            }
            Expr::FunctionCall(name, args) => m::ExprKind::FunctionCall(m::FunctionCall {
                name: name.clone(),
                param: args.iter().map(Expr::to_wire).collect::<Result<_>>()?,
            }),
            Expr::BinaryOp(op, lhs, rhs) => m::ExprKind::Operator(m::Operator {
                name: op.clone(),
                param: vec![lhs.to_wire()?, rhs.to_wire()?],
            }),
            Expr::UnaryOp(op, inner) => m::ExprKind::Operator(m::Operator {
                name: op.clone(),
                param: vec![inner.to_wire()?],
            }),
            Expr::Array(items) => {
                // Arrays/objects as bare expression values are represented
                // as literal Any-like scalars via the function-call form
                // `array(...)` — there is no dedicated wire array-expr node.
                m::ExprKind::FunctionCall(m::FunctionCall {
                    name: "array".to_string(),
                    param: items.iter().map(Expr::to_wire).collect::<Result<_>>()?,
                })
            }
            Expr::Object(fields) => m::ExprKind::FunctionCall(m::FunctionCall {
                name: "object".to_string(),
                param: fields
                    .iter()
                    .map(|(k, v)| -> Result<m::Expr> {
                        Ok(m::Expr {
                            kind: Some(m::ExprKind::Operator(m::Operator {
                                name: "object_field".to_string(),
                                param: vec![
                                    m::Expr {
                                        kind: Some(m::ExprKind::Literal(m::Scalar {
                                            value: Some(m::ScalarValue::VString(k.clone())),
                                        })),
                                    },
                                    v.to_wire()?,
                                ],
                            })),
                        })
                    })
                    .collect::<Result<_>>()?,
            }),
        };
        Ok(m::Expr { kind: Some(kind) })
    }
}

fn identifier_to_wire(path: &[String]) -> m::ColumnIdentifier {
    m::ColumnIdentifier {
        document_path: path.to_vec(),
        name: None,
        table_name: None,
        schema_name: None,
    }
}

fn scalar_to_wire(value: &Value) -> Result<m::Scalar> {
    let any = crate::proto::codec::value_to_any(value);
    any.scalar
        .ok_or_else(|| Error::Malformed("array/object literal is not a valid scalar".to_string()))
}

// ---------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------

/// Parses a string expression (as passed to `.where`, `.having`, document
/// field selectors, and CRUD projection lists) into an [`Expr`] tree.
pub fn parse(input: &str) -> Result<Expr> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_expr(0)?;
    if parser.pos != parser.tokens.len() {
        return Err(Error::Malformed(format!(
            "trailing input after expression: {:?}",
            &parser.tokens[parser.pos..]
        )));
    }
    Ok(expr)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Placeholder(String),
    Int(i64),
    Float(f64),
    Str(String),
    Op(String),
    LParen,
    RParen,
    Comma,
    Dot,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        match c {
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '.' if !chars.get(i + 1).is_some_and(|c| c.is_ascii_digit()) => {
                tokens.push(Token::Dot);
                i += 1;
            }
            ':' => {
                let start = i + 1;
                let mut j = start;
                while j < chars.len() && (chars[j].is_alphanumeric() || chars[j] == '_') {
                    j += 1;
                }
                if j == start {
                    return Err(Error::Malformed("`:` must be followed by a placeholder name".to_string()));
                }
                tokens.push(Token::Placeholder(chars[start..j].iter().collect()));
                i = j;
            }
            '`' => {
                let mut j = i + 1;
                let mut ident = String::new();
                loop {
                    if j >= chars.len() {
                        return Err(Error::Malformed("unterminated back-tick identifier".to_string()));
                    }
                    if chars[j] == '`' {
                        if chars.get(j + 1) == Some(&'`') {
                            ident.push('`');
                            j += 2;
                            continue;
                        }
                        j += 1;
                        break;
                    }
                    ident.push(chars[j]);
                    j += 1;
                }
                tokens.push(Token::Ident(ident));
                i = j;
            }
            '\'' | '"' => {
                let quote = c;
                let mut j = i + 1;
                let mut s = String::new();
                loop {
                    if j >= chars.len() {
                        return Err(Error::Malformed("unterminated string literal".to_string()));
                    }
                    if chars[j] == '\\' && j + 1 < chars.len() {
                        s.push(chars[j + 1]);
                        j += 2;
                        continue;
                    }
                    if chars[j] == quote {
                        j += 1;
                        break;
                    }
                    s.push(chars[j]);
                    j += 1;
                }
                tokens.push(Token::Str(s));
                i = j;
            }
            c if c.is_ascii_digit() => {
                let start = i;
                let mut j = i;
                let mut is_float = false;
                while j < chars.len() && (chars[j].is_ascii_digit() || chars[j] == '.') {
                    if chars[j] == '.' {
                        is_float = true;
                    }
                    j += 1;
                }
                let text: String = chars[start..j].iter().collect();
                if is_float {
                    tokens.push(Token::Float(text.parse().map_err(|_| {
                        Error::Malformed(format!("invalid numeric literal `{text}`"))
                    })?));
                } else {
                    tokens.push(Token::Int(text.parse().map_err(|_| {
                        Error::Malformed(format!("invalid numeric literal `{text}`"))
                    })?));
                }
                i = j;
            }
            c if c.is_ascii_alphabetic() || c == '_' || c == '$' => {
                let start = i;
                let mut j = i;
                while j < chars.len() && (chars[j].is_alphanumeric() || chars[j] == '_' || chars[j] == '$') {
                    j += 1;
                }
                tokens.push(Token::Ident(chars[start..j].iter().collect()));
                i = j;
            }
            '=' | '!' | '<' | '>' | '+' | '-' | '*' | '/' | '%' => {
                let start = i;
                let mut j = i + 1;
                if matches!(c, '!' | '<' | '>') && chars.get(j) == Some(&'=') {
                    j += 1;
                }
                tokens.push(Token::Op(chars[start..j].iter().collect()));
                i = j;
            }
            other => {
                return Err(Error::Malformed(format!("unexpected character `{other}` in expression")));
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, tok: &Token) -> Result<()> {
        if self.peek() == Some(tok) {
            self.pos += 1;
            Ok(())
        } else {
            Err(Error::Malformed(format!("expected {tok:?}, found {:?}", self.peek())))
        }
    }

    fn binding_power(op: &str) -> Option<(u8, u8)> {
        Some(match op.to_uppercase().as_str() {
            "OR" => (1, 2),
            "AND" => (3, 4),
            "=" | "!=" | "<>" | "<" | "<=" | ">" | ">=" | "LIKE" | "IN" => (5, 6),
            "+" | "-" => (7, 8),
            "*" | "/" | "%" => (9, 10),
            _ => return None,
        })
    }

    fn parse_expr(&mut self, min_bp: u8) -> Result<Expr> {
        let mut lhs = self.parse_prefix()?;
        loop {
            let op = match self.peek() {
                Some(Token::Op(op)) => op.clone(),
                Some(Token::Ident(word))
                    if matches!(word.to_uppercase().as_str(), "AND" | "OR" | "LIKE" | "IN") =>
                {
                    word.clone()
                }
                _ => break,
            };
            let Some((l_bp, r_bp)) = Self::binding_power(&op) else {
                break;
            };
            if l_bp < min_bp {
                break;
            }
            self.bump();
            let rhs = self.parse_expr(r_bp)?;
            lhs = Expr::BinaryOp(op.to_uppercase(), Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<Expr> {
        match self.bump() {
            Some(Token::Int(v)) => Ok(Expr::Literal(Value::Int(v))),
            Some(Token::Float(v)) => Ok(Expr::Literal(Value::Double(v))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Token::Placeholder(name)) => Ok(Expr::Placeholder(name)),
            Some(Token::Op(op)) if op == "-" => {
                Ok(Expr::UnaryOp("-".to_string(), Box::new(self.parse_prefix()?)))
            }
            Some(Token::Ident(word)) => self.parse_ident_led(word),
            Some(Token::LParen) => {
                let inner = self.parse_expr(0)?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            other => Err(Error::Malformed(format!("unexpected token {other:?} in expression"))),
        }
    }

    fn parse_ident_led(&mut self, word: String) -> Result<Expr> {
        match word.to_uppercase().as_str() {
            "TRUE" => return Ok(Expr::Literal(Value::Bool(true))),
            "FALSE" => return Ok(Expr::Literal(Value::Bool(false))),
            "NULL" => return Ok(Expr::Literal(Value::Null)),
            "NOT" => return Ok(Expr::UnaryOp("NOT".to_string(), Box::new(self.parse_prefix()?))),
            _ => {}
        }
        if self.peek() == Some(&Token::LParen) {
            self.bump();
            let mut args = Vec::new();
            if self.peek() != Some(&Token::RParen) {
                loop {
                    args.push(self.parse_expr(0)?);
                    if self.peek() == Some(&Token::Comma) {
                        self.bump();
                        continue;
                    }
                    break;
                }
            }
            self.expect(&Token::RParen)?;
            return Ok(Expr::FunctionCall(word, args));
        }
        let mut path = vec![word];
        while self.peek() == Some(&Token::Dot) {
            self.bump();
            match self.bump() {
                Some(Token::Ident(segment)) => path.push(segment),
                other => return Err(Error::Malformed(format!("expected identifier after `.`, found {other:?}"))),
            }
        }
        Ok(Expr::Identifier(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_comparison_with_placeholder() {
        let expr = parse("age > :min_age").unwrap();
        assert_eq!(
            expr,
            Expr::BinaryOp(
                ">".to_string(),
                Box::new(Expr::Identifier(vec!["age".to_string()])),
                Box::new(Expr::Placeholder("min_age".to_string())),
            )
        );
        assert_eq!(expr.placeholders(), vec!["min_age".to_string()]);
    }

    #[test]
    fn parses_and_or_with_correct_precedence() {
        let expr = parse("a = 1 OR b = 2 AND c = 3").unwrap();
        // AND binds tighter than OR: a=1 OR (b=2 AND c=3)
        match expr {
            Expr::BinaryOp(op, _, rhs) => {
                assert_eq!(op, "OR");
                assert!(matches!(*rhs, Expr::BinaryOp(ref o, _, _) if o == "AND"));
            }
            _ => panic!("expected OR at the top"),
        }
    }

    #[test]
    fn parses_function_calls_and_dotted_paths() {
        let expr = parse("upper(name.first)").unwrap();
        assert_eq!(
            expr,
            Expr::FunctionCall(
                "upper".to_string(),
                vec![Expr::Identifier(vec!["name".to_string(), "first".to_string()])],
            )
        );
    }

    #[test]
    fn parses_quoted_identifier_with_doubled_backtick_escape() {
        let expr = parse("`weird``name`").unwrap();
        assert_eq!(expr, Expr::Identifier(vec!["weird`name".to_string()]));
    }

    #[test]
    fn substitute_fails_on_unbound_placeholder() {
        let expr = parse("age > :min_age").unwrap();
        let bindings = std::collections::HashMap::new();
        assert!(matches!(
            expr.substitute(&bindings),
            Err(Error::UnboundPlaceholder(_))
        ));
    }

    #[test]
    fn substitute_replaces_every_occurrence() {
        let expr = parse(":x + :x").unwrap();
        let mut bindings = std::collections::HashMap::new();
        bindings.insert("x".to_string(), Value::Int(5));
        let substituted = expr.substitute(&bindings).unwrap();
        assert_eq!(
            substituted,
            Expr::BinaryOp(
                "+".to_string(),
                Box::new(Expr::Literal(Value::Int(5))),
                Box::new(Expr::Literal(Value::Int(5))),
            )
        );
    }
}
