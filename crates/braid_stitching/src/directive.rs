//! The `delegate` directive and its path syntax.
//!
//! A delegation path selects where, inside a remote schema, the
//! annotated field's data lives:
//!
//! ```text
//! customer(id: $arguments:id).orders
//! ```
//!
//! Each dot-separated component names a remote field and may carry
//! arguments bound to literals, request variables (`$name`) or scoped
//! variables (`$scope:name`).

use crate::error::DelegationError;
use crate::variables::{ScopedVariable, VariableScope};
use braid_runtime::{FieldDef, FieldDirective};
use serde_json::Value;

/// One parsed `delegate` directive.
#[derive(Debug, Clone, PartialEq)]
pub struct DelegateDirective {
    /// The registered name of the target schema.
    pub schema: String,

    /// The delegation path, verbatim. `None` delegates the annotated
    /// field as-is.
    pub path: Option<String>,
}

impl DelegateDirective {
    /// The directive name in the schema.
    pub const NAME: &'static str = "delegate";

    /// Reads all `delegate` directives attached to a field, in
    /// declaration order.
    pub fn from_field(field: &FieldDef) -> Vec<Self> {
        field
            .directives_named(Self::NAME)
            .filter_map(Self::from_directive)
            .collect()
    }

    /// Reads one directive, ignoring it when `schema` is absent.
    pub fn from_directive(directive: &FieldDirective) -> Option<Self> {
        let schema = directive.argument("schema")?.as_str()?.to_string();
        let path = directive
            .argument("path")
            .and_then(Value::as_str)
            .map(str::to_string);
        Some(Self { schema, path })
    }

    /// Parses the delegation path into components.
    pub fn components(&self) -> Result<Vec<SelectionPathComponent>, DelegationError> {
        match &self.path {
            Some(path) => parse_selection_path(path),
            None => Ok(Vec::new()),
        }
    }
}

/// An argument value inside a delegation path.
#[derive(Debug, Clone, PartialEq)]
pub enum PathValue {
    /// An inline literal.
    Literal(Value),
    /// A plain request variable (`$name`).
    Variable(String),
    /// A scoped variable (`$scope:name`).
    Scoped(ScopedVariable),
}

/// One component of a delegation path: a remote field with arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionPathComponent {
    pub name: String,
    pub arguments: Vec<(String, PathValue)>,
}

/// Parses a delegation path such as `customer(id: $arguments:id).orders`.
pub fn parse_selection_path(input: &str) -> Result<Vec<SelectionPathComponent>, DelegationError> {
    let mut parser = PathParser::new(input);
    let mut components = vec![parser.parse_component()?];
    loop {
        parser.skip_ws();
        match parser.peek() {
            Some(b'.') => {
                parser.bump();
                components.push(parser.parse_component()?);
            }
            Some(other) => {
                return Err(parser.unexpected(&format!("'{}'", other as char)));
            }
            None => break,
        }
    }
    Ok(components)
}

struct PathParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> PathParser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.bump();
        }
    }

    fn eat(&mut self, expected: u8) -> Result<(), DelegationError> {
        if self.peek() == Some(expected) {
            self.bump();
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected '{}'", expected as char)))
        }
    }

    fn unexpected(&self, detail: &str) -> DelegationError {
        DelegationError::InvalidPath(format!(
            "{} at offset {} in '{}'",
            detail, self.pos, self.input
        ))
    }

    fn parse_ident(&mut self) -> Result<String, DelegationError> {
        self.skip_ws();
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
            self.bump();
        }
        if self.pos == start {
            return Err(self.unexpected("expected a name"));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn parse_component(&mut self) -> Result<SelectionPathComponent, DelegationError> {
        let name = self.parse_ident()?;
        let mut arguments = Vec::new();

        self.skip_ws();
        if self.peek() == Some(b'(') {
            self.bump();
            loop {
                let arg_name = self.parse_ident()?;
                self.skip_ws();
                self.eat(b':')?;
                let value = self.parse_value()?;
                arguments.push((arg_name, value));

                self.skip_ws();
                match self.peek() {
                    Some(b',') => self.bump(),
                    Some(b')') => {
                        self.bump();
                        break;
                    }
                    _ => return Err(self.unexpected("expected ',' or ')'")),
                }
            }
        }

        Ok(SelectionPathComponent { name, arguments })
    }

    fn parse_value(&mut self) -> Result<PathValue, DelegationError> {
        self.skip_ws();
        match self.peek() {
            Some(b'$') => {
                self.bump();
                let first = self.parse_ident()?;
                if self.peek() == Some(b':') {
                    self.bump();
                    let name = self.parse_ident()?;
                    let scope = VariableScope::parse(&first)
                        .ok_or_else(|| self.unexpected(&format!("unknown scope '{}'", first)))?;
                    Ok(PathValue::Scoped(ScopedVariable::new(scope, name)))
                } else {
                    Ok(PathValue::Variable(first))
                }
            }
            Some(b'"') => self.parse_string().map(PathValue::Literal),
            Some(c) if c == b'-' || c.is_ascii_digit() => {
                self.parse_number().map(PathValue::Literal)
            }
            Some(_) => {
                let word = self.parse_ident()?;
                match word.as_str() {
                    "true" => Ok(PathValue::Literal(Value::Bool(true))),
                    "false" => Ok(PathValue::Literal(Value::Bool(false))),
                    "null" => Ok(PathValue::Literal(Value::Null)),
                    other => Err(self.unexpected(&format!("unexpected value '{}'", other))),
                }
            }
            None => Err(self.unexpected("expected a value")),
        }
    }

    fn parse_string(&mut self) -> Result<Value, DelegationError> {
        self.eat(b'"')?;
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == b'"' {
                let content = self.input[start..self.pos].to_string();
                self.bump();
                return Ok(Value::String(content));
            }
            self.bump();
        }
        Err(self.unexpected("unterminated string"))
    }

    fn parse_number(&mut self) -> Result<Value, DelegationError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == b'-' || c == b'.') {
            self.bump();
        }
        serde_json::from_str(&self.input[start..self.pos])
            .map_err(|_| self.unexpected("invalid number"))
    }
}
