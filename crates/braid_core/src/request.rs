//! Query documents and operation requests.
//!
//! Selections are built programmatically; parsing a textual query
//! language is out of scope for this crate. An `OperationRequest` is
//! created once per incoming request and is read-only during execution.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// The kind of a GraphQL operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    /// Returns the keyword used in a query document.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
            Self::Subscription => "subscription",
        }
    }
}

/// The value bound to a field argument in a query document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArgumentValue {
    /// An inline literal.
    Literal(Value),
    /// A reference to a request variable (`$name`).
    Variable(String),
}

impl ArgumentValue {
    /// Returns the variable name if this is a variable reference.
    pub fn as_variable(&self) -> Option<&str> {
        match self {
            Self::Variable(name) => Some(name),
            Self::Literal(_) => None,
        }
    }
}

/// A field in a query document: name, arguments and child selections.
///
/// Nodes are owned by the parsed document and shared read-only across
/// all resolver tasks touching the field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldNode {
    /// The field name.
    pub name: String,

    /// Optional response alias.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Arguments in declaration order.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub arguments: Vec<(String, ArgumentValue)>,

    /// Child selections in declaration order.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub selections: Vec<FieldNode>,
}

impl FieldNode {
    /// Creates a new field node.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            arguments: Vec::new(),
            selections: Vec::new(),
        }
    }

    /// Sets the response alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Adds an argument.
    pub fn with_argument(mut self, name: impl Into<String>, value: ArgumentValue) -> Self {
        self.arguments.push((name.into(), value));
        self
    }

    /// Adds a child selection.
    pub fn with_selection(mut self, selection: FieldNode) -> Self {
        self.selections.push(selection);
        self
    }

    /// Adds multiple child selections.
    pub fn with_selections(mut self, selections: impl IntoIterator<Item = FieldNode>) -> Self {
        self.selections.extend(selections);
        self
    }

    /// The key under which this field appears in the response.
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Returns true if this field has child selections.
    pub fn is_composite(&self) -> bool {
        !self.selections.is_empty()
    }

    /// Collects the names of all request variables referenced by this
    /// field or its descendants.
    pub fn referenced_variables(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables(&self, names: &mut Vec<String>) {
        for (_, value) in &self.arguments {
            if let Some(name) = value.as_variable() {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }
        for selection in &self.selections {
            selection.collect_variables(names);
        }
    }
}

/// An immutable description of one incoming operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRequest {
    /// The operation kind.
    pub kind: OperationKind,

    /// Optional operation name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,

    /// Root selections in declaration order.
    pub selections: Vec<FieldNode>,

    /// Variable values supplied with the request.
    #[serde(skip_serializing_if = "HashMap::is_empty", default)]
    pub variables: HashMap<String, Value>,

    /// Initial context properties for the request.
    #[serde(skip_serializing_if = "HashMap::is_empty", default)]
    pub properties: HashMap<String, Value>,
}

impl OperationRequest {
    /// Starts building a request.
    pub fn builder() -> OperationRequestBuilder {
        OperationRequestBuilder::default()
    }

    /// Creates a query request from root selections.
    pub fn query(selections: Vec<FieldNode>) -> Self {
        Self {
            kind: OperationKind::Query,
            operation_name: None,
            selections,
            variables: HashMap::new(),
            properties: HashMap::new(),
        }
    }

    /// Gets a variable value by name.
    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Gets a context property by name.
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}

/// Builder for [`OperationRequest`].
#[derive(Debug, Default)]
pub struct OperationRequestBuilder {
    kind: Option<OperationKind>,
    operation_name: Option<String>,
    selections: Vec<FieldNode>,
    variables: HashMap<String, Value>,
    properties: HashMap<String, Value>,
}

impl OperationRequestBuilder {
    /// Sets the operation kind and name.
    pub fn set_operation(mut self, kind: OperationKind, name: Option<String>) -> Self {
        self.kind = Some(kind);
        self.operation_name = name;
        self
    }

    /// Adds a root selection.
    pub fn add_selection(mut self, selection: FieldNode) -> Self {
        self.selections.push(selection);
        self
    }

    /// Sets a variable value.
    pub fn set_variable(mut self, name: impl Into<String>, value: Value) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    /// Sets a context property.
    pub fn set_property(mut self, name: impl Into<String>, value: Value) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    /// Sets all context properties at once.
    pub fn set_properties(mut self, properties: HashMap<String, Value>) -> Self {
        self.properties = properties;
        self
    }

    /// Builds the request. Defaults to a query when no kind was set.
    pub fn build(self) -> OperationRequest {
        OperationRequest {
            kind: self.kind.unwrap_or(OperationKind::Query),
            operation_name: self.operation_name,
            selections: self.selections,
            variables: self.variables,
            properties: self.properties,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_key() {
        let field = FieldNode::new("user");
        assert_eq!(field.response_key(), "user");

        let aliased = FieldNode::new("user").with_alias("owner");
        assert_eq!(aliased.response_key(), "owner");
    }

    #[test]
    fn test_referenced_variables_deduplicated() {
        let field = FieldNode::new("user")
            .with_argument("id", ArgumentValue::Variable("id".into()))
            .with_selection(
                FieldNode::new("orders")
                    .with_argument("first", ArgumentValue::Variable("count".into()))
                    .with_argument("after", ArgumentValue::Variable("id".into())),
            );

        assert_eq!(field.referenced_variables(), vec!["id", "count"]);
    }

    #[test]
    fn test_request_builder() {
        let request = OperationRequest::builder()
            .set_operation(OperationKind::Query, Some("GetUser".into()))
            .add_selection(FieldNode::new("user"))
            .set_variable("id", serde_json::json!("42"))
            .set_property("tenant", serde_json::json!("acme"))
            .build();

        assert_eq!(request.kind, OperationKind::Query);
        assert_eq!(request.operation_name.as_deref(), Some("GetUser"));
        assert_eq!(request.variable("id"), Some(&serde_json::json!("42")));
        assert_eq!(request.property("tenant"), Some(&serde_json::json!("acme")));
    }

    #[test]
    fn test_builder_defaults_to_query() {
        let request = OperationRequest::builder()
            .add_selection(FieldNode::new("ping"))
            .build();
        assert_eq!(request.kind, OperationKind::Query);
    }
}
