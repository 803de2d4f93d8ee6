//! Query results.

use crate::error::GraphQlError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// The outcome of executing one operation.
///
/// `data` and `errors` follow GraphQL's partial-failure semantics: a
/// result may carry both. `context_data` transports request-scoped
/// properties produced during execution; a stitched schema uses it to
/// hand provenance data back to the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResult {
    /// The result tree, if any part of the operation produced data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Errors accumulated during execution, in completion order.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<GraphQlError>,

    /// Context data produced during execution.
    #[serde(skip_serializing_if = "HashMap::is_empty", default)]
    pub context_data: HashMap<String, Value>,
}

impl QueryResult {
    /// Creates a result with data and no errors.
    pub fn data(data: Value) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
            context_data: HashMap::new(),
        }
    }

    /// Creates a result with a single error and no data.
    pub fn error(error: GraphQlError) -> Self {
        Self {
            data: None,
            errors: vec![error],
            context_data: HashMap::new(),
        }
    }

    /// Adds context data.
    pub fn with_context_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context_data.insert(key.into(), value);
        self
    }

    /// Returns true if the result carries any errors.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns true if the result carries data.
    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }
}
