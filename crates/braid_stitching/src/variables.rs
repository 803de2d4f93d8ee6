//! Scoped variables.
//!
//! A delegation path binds remote arguments to values taken from the
//! local execution: the annotated field's arguments, the parent object,
//! request context data, or scoped context data. Each scoped variable
//! is mapped onto a synthetic request variable (`_<scope>_<name>`) so
//! the remote query stays an ordinary parameterized operation.

use crate::error::DelegationError;
use braid_runtime::{ResolverContext, TypeRef};
use serde_json::Value;
use std::fmt;

/// Where a scoped variable takes its value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableScope {
    /// An argument of the annotated field.
    Arguments,
    /// A property of the parent object value.
    Fields,
    /// Request-level context data.
    ContextData,
    /// Scoped context data visible at the annotated field.
    ScopedContextData,
}

impl VariableScope {
    /// The scope keyword used in delegation paths.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Arguments => "arguments",
            Self::Fields => "fields",
            Self::ContextData => "contextData",
            Self::ScopedContextData => "scopedContextData",
        }
    }

    /// Parses a scope keyword.
    pub fn parse(keyword: &str) -> Option<Self> {
        match keyword {
            "arguments" => Some(Self::Arguments),
            "fields" => Some(Self::Fields),
            "contextData" => Some(Self::ContextData),
            "scopedContextData" => Some(Self::ScopedContextData),
            _ => None,
        }
    }
}

impl fmt::Display for VariableScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A `$scope:name` reference in a delegation path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedVariable {
    pub scope: VariableScope,
    pub name: String,
}

impl ScopedVariable {
    pub fn new(scope: VariableScope, name: impl Into<String>) -> Self {
        Self {
            scope,
            name: name.into(),
        }
    }

    /// The synthetic request-variable name this reference maps onto.
    pub fn variable_name(&self) -> String {
        format!("_{}_{}", self.scope.as_str(), self.name)
    }

    /// Resolves the referenced value from the local execution.
    ///
    /// A missing argument or missing context data is a configuration
    /// error; a missing parent property or scoped entry yields `null`.
    pub async fn resolve(&self, ctx: &ResolverContext) -> Result<Value, DelegationError> {
        match self.scope {
            VariableScope::Arguments => ctx
                .args
                .get(&self.name)
                .cloned()
                .ok_or_else(|| DelegationError::ArgumentNotFound(self.name.clone())),
            VariableScope::Fields => Ok(match &ctx.parent {
                Value::Object(map) => map.get(&self.name).cloned().unwrap_or(Value::Null),
                _ => Value::Null,
            }),
            VariableScope::ContextData => ctx
                .execution
                .property(&self.name)
                .cloned()
                .ok_or_else(|| DelegationError::ContextDataNotFound(self.name.clone())),
            VariableScope::ScopedContextData => {
                Ok(ctx.scoped_value(&self.name).await.unwrap_or(Value::Null))
            }
        }
    }
}

impl fmt::Display for ScopedVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}:{}", self.scope, self.name)
    }
}

/// A variable bound for one delegated request.
///
/// Built while walking the delegation path and discarded once the
/// remote request is assembled.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableValue {
    /// The variable name in the remote operation.
    pub name: String,

    /// The declared type of the remote argument it feeds.
    pub ty: TypeRef,

    /// The locally resolved value, if any.
    pub value: Option<Value>,

    /// The remote argument's declared default.
    pub default: Option<Value>,
}

impl VariableValue {
    /// The value sent with the remote request: the resolved value if
    /// present, else the declared default, else `null`.
    pub fn resolve(&self) -> Value {
        self.value
            .clone()
            .or_else(|| self.default.clone())
            .unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_keywords_round_trip() {
        for scope in [
            VariableScope::Arguments,
            VariableScope::Fields,
            VariableScope::ContextData,
            VariableScope::ScopedContextData,
        ] {
            assert_eq!(VariableScope::parse(scope.as_str()), Some(scope));
        }
        assert_eq!(VariableScope::parse("variables"), None);
    }

    #[test]
    fn test_variable_name_is_scope_prefixed() {
        let var = ScopedVariable::new(VariableScope::Arguments, "id");
        assert_eq!(var.variable_name(), "_arguments_id");

        let var = ScopedVariable::new(VariableScope::ContextData, "tenantId");
        assert_eq!(var.variable_name(), "_contextData_tenantId");
    }

    #[test]
    fn test_variable_value_prefers_value_then_default() {
        use serde_json::json;

        let mut binding = VariableValue {
            name: "limit".to_string(),
            ty: TypeRef::named("Int"),
            value: Some(json!(25)),
            default: Some(json!(10)),
        };
        assert_eq!(binding.resolve(), json!(25));

        binding.value = None;
        assert_eq!(binding.resolve(), json!(10));

        binding.default = None;
        assert_eq!(binding.resolve(), Value::Null);
    }
}
