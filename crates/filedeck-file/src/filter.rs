//! Filter and sort expressions evaluated against stored records.
//!
//! Filters are `&&`-joined clauses of the form `field OP value`:
//!
//! | op   | meaning                                   |
//! |------|-------------------------------------------|
//! | `=`  | equal; on a list, every item equals       |
//! | `!=` | not equal                                 |
//! | `~`  | contains, case-insensitive                |
//! | `?=` | on a list, any item equals                |
//!
//! Values are quoted strings (`"..."` or `'...'`, backslash escapes),
//! numbers, `true`, `false` or `null`.

use std::cmp::Ordering;

use serde_json::Value;

use filedeck_core::Record;
use filedeck_core::Result;
use filedeck_core::error::InvalidInputError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
    Like,
    AnyEq,
}

#[derive(Debug, Clone, PartialEq)]
struct Clause {
    field: String,
    op: Op,
    value: Value,
}

/// A parsed filter expression.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    /// Parse a filter; an empty expression matches everything.
    pub fn parse(expr: &str) -> Result<Self> {
        let mut parser = Parser {
            expr,
            rest: expr.trim_start(),
        };
        let mut clauses = Vec::new();

        if parser.rest.is_empty() {
            return Ok(Self { clauses });
        }

        loop {
            clauses.push(parser.clause()?);
            parser.skip_ws();
            if parser.rest.is_empty() {
                break;
            }
            if !parser.eat("&&") {
                return Err(parser.error("expected '&&' between clauses"));
            }
        }

        Ok(Self { clauses })
    }

    /// Returns true if `record` satisfies every clause.
    pub fn matches(&self, record: &Record) -> bool {
        self.clauses.iter().all(|clause| clause.matches(record))
    }
}

impl Clause {
    fn matches(&self, record: &Record) -> bool {
        let actual = field_value(record, &self.field);
        match self.op {
            Op::Eq => equals(&actual, &self.value),
            Op::Ne => !equals(&actual, &self.value),
            Op::Like => match &actual {
                Value::Array(items) => items.iter().any(|item| contains(item, &self.value)),
                other => contains(other, &self.value),
            },
            Op::AnyEq => match &actual {
                Value::Array(items) => items.iter().any(|item| scalar_eq(item, &self.value)),
                other => scalar_eq(other, &self.value),
            },
        }
    }
}

/// Reads a field, including the system fields.
fn field_value(record: &Record, field: &str) -> Value {
    match field {
        "id" => Value::String(record.id.to_string()),
        "collectionId" => record.collection_id.clone().map_or(Value::Null, Value::String),
        "collectionName" => record
            .collection_name
            .clone()
            .map_or(Value::Null, Value::String),
        "created" => record
            .created
            .map_or(Value::Null, |t| Value::String(t.to_string())),
        "updated" => record
            .updated
            .map_or(Value::Null, |t| Value::String(t.to_string())),
        other => record.get(other).cloned().unwrap_or(Value::Null),
    }
}

fn equals(actual: &Value, expected: &Value) -> bool {
    match actual {
        Value::Array(items) if items.is_empty() => is_blank(expected),
        Value::Array(items) => items.iter().all(|item| scalar_eq(item, expected)),
        other => scalar_eq(other, expected),
    }
}

/// Missing values, `null` and `""` are all the same "no value".
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn scalar_eq(actual: &Value, expected: &Value) -> bool {
    if is_blank(actual) || is_blank(expected) {
        return is_blank(actual) && is_blank(expected);
    }
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (a, Value::String(b)) | (Value::String(b), a) => text(a) == *b,
        (a, b) => a == b,
    }
}

fn contains(actual: &Value, needle: &Value) -> bool {
    if is_blank(actual) {
        return is_blank(needle);
    }
    text(actual)
        .to_lowercase()
        .contains(&text(needle).to_lowercase())
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

struct Parser<'a> {
    expr: &'a str,
    rest: &'a str,
}

impl<'a> Parser<'a> {
    fn clause(&mut self) -> Result<Clause> {
        self.skip_ws();
        let field = self.field()?;
        self.skip_ws();
        let op = self.op()?;
        self.skip_ws();
        let value = self.value()?;
        Ok(Clause { field, op, value })
    }

    fn field(&mut self) -> Result<String> {
        let input = self.rest;
        let end = input
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
            .unwrap_or(input.len());
        if end == 0 {
            return Err(self.error("expected a field name"));
        }
        let (field, rest) = input.split_at(end);
        self.rest = rest;
        Ok(field.to_string())
    }

    fn op(&mut self) -> Result<Op> {
        for (token, op) in [("!=", Op::Ne), ("?=", Op::AnyEq), ("=", Op::Eq), ("~", Op::Like)] {
            if self.eat(token) {
                return Ok(op);
            }
        }
        Err(self.error("expected one of =, !=, ~, ?="))
    }

    fn value(&mut self) -> Result<Value> {
        let input = self.rest;
        match input.chars().next() {
            Some(quote @ ('"' | '\'')) => self.quoted(quote),
            Some(_) => {
                let end = input
                    .find(|c: char| c.is_whitespace() || c == '&')
                    .unwrap_or(input.len());
                let (word, rest) = input.split_at(end);
                self.rest = rest;
                match word {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    "null" => Ok(Value::Null),
                    number => serde_json::from_str::<serde_json::Number>(number)
                        .map(Value::Number)
                        .map_err(|_| self.error(&format!("unexpected value '{}'", number))),
                }
            }
            None => Err(self.error("expected a value")),
        }
    }

    fn quoted(&mut self, quote: char) -> Result<Value> {
        let input = self.rest;
        let mut out = String::new();
        let mut chars = input.char_indices().skip(1);

        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some((_, escaped)) => out.push(escaped),
                    None => break,
                },
                c if c == quote => {
                    self.rest = &input[i + c.len_utf8()..];
                    return Ok(Value::String(out));
                }
                c => out.push(c),
            }
        }

        Err(self.error("unterminated string"))
    }

    fn eat(&mut self, token: &str) -> bool {
        match self.rest.strip_prefix(token) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn skip_ws(&mut self) {
        self.rest = self.rest.trim_start();
    }

    fn error(&self, reason: &str) -> filedeck_core::Error {
        let at = self.expr.len() - self.rest.len();
        InvalidInputError::Filter {
            value: self.expr.to_string(),
            reason: format!("{} at offset {}", reason, at),
        }
        .into()
    }
}

/// Sorts records by a `-created,name` style expression. The sort is
/// stable; records without a sort key keep their relative order.
pub fn sort_records(records: &mut [Record], sort: &str) {
    let keys: Vec<(&str, bool)> = sort
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(|k| match k.strip_prefix('-') {
            Some(field) => (field, true),
            None => (k.strip_prefix('+').unwrap_or(k), false),
        })
        .collect();

    records.sort_by(|a, b| {
        keys.iter()
            .map(|(field, descending)| {
                let ord = compare(&field_value(a, field), &field_value(b, field));
                if *descending { ord.reverse() } else { ord }
            })
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
}

fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ if is_blank(a) || is_blank(b) => is_blank(b).cmp(&is_blank(a)),
        _ => text(a).cmp(&text(b)),
    }
}
