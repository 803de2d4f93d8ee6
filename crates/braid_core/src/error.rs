//! GraphQL error types.
//!
//! Errors are accumulated append-only during execution and surfaced in
//! the response's `errors` list. An error is never mutated after it has
//! been reported; it is annotated with `with_*` builder methods before
//! insertion.

use crate::path::Path;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Typed error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ErrorCode {
    // Resolver errors
    ResolverError,
    NonNullViolation,

    // Delegation configuration errors
    ArgumentNotFound,
    ContextDataNotFound,
    InvalidDelegationPath,
    UnexpectedPathType,
    UnknownRemoteSchema,

    // Transport errors
    RemoteRequestFailed,
    RemoteProtocolError,
    Timeout,

    // Internal errors
    InternalError,
}

impl ErrorCode {
    /// Returns the string representation of the error code.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ResolverError => "RESOLVER_ERROR",
            Self::NonNullViolation => "NON_NULL_VIOLATION",
            Self::ArgumentNotFound => "ARGUMENT_NOT_FOUND",
            Self::ContextDataNotFound => "CONTEXT_DATA_NOT_FOUND",
            Self::InvalidDelegationPath => "INVALID_DELEGATION_PATH",
            Self::UnexpectedPathType => "UNEXPECTED_PATH_TYPE",
            Self::UnknownRemoteSchema => "UNKNOWN_REMOTE_SCHEMA",
            Self::RemoteRequestFailed => "REMOTE_REQUEST_FAILED",
            Self::RemoteProtocolError => "REMOTE_PROTOCOL_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Returns true if this code marks a transport-level failure.
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::RemoteRequestFailed | Self::RemoteProtocolError | Self::Timeout
        )
    }

    /// Returns true if this code marks a delegation configuration error.
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ArgumentNotFound
                | Self::ContextDataNotFound
                | Self::InvalidDelegationPath
                | Self::UnexpectedPathType
                | Self::UnknownRemoteSchema
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A source location within a query document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A GraphQL execution error.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{message}")]
pub struct GraphQlError {
    /// Human-readable error message.
    pub message: String,

    /// Typed error code, surfaced under `extensions.code`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,

    /// Path to the result node this error belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Path>,

    /// Source locations within the query document.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub locations: Vec<Location>,

    /// Free-form extension data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<HashMap<String, serde_json::Value>>,
}

impl GraphQlError {
    /// Creates a new error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            path: None,
            locations: Vec::new(),
            extensions: None,
        }
    }

    /// Sets the error code.
    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Sets the result path.
    pub fn with_path(mut self, path: Path) -> Self {
        self.path = Some(path);
        self
    }

    /// Adds a source location.
    pub fn with_location(mut self, location: Location) -> Self {
        self.locations.push(location);
        self
    }

    /// Removes all source locations.
    pub fn clear_locations(mut self) -> Self {
        self.locations.clear();
        self
    }

    /// Adds an extension entry.
    pub fn with_extension(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        let extensions = self.extensions.get_or_insert_with(HashMap::new);
        if let Ok(v) = serde_json::to_value(value) {
            extensions.insert(key.into(), v);
        }
        self
    }

    /// Returns true if this error came from a transport-level failure.
    pub fn is_transport(&self) -> bool {
        self.code.is_some_and(|c| c.is_transport())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_properties() {
        assert!(ErrorCode::RemoteRequestFailed.is_transport());
        assert!(!ErrorCode::ResolverError.is_transport());

        assert!(ErrorCode::InvalidDelegationPath.is_configuration());
        assert!(!ErrorCode::Timeout.is_configuration());
    }

    #[test]
    fn test_error_construction() {
        let err = GraphQlError::new("User not found")
            .with_code(ErrorCode::ResolverError)
            .with_path(Path::root().append_field("user"))
            .with_extension("user_id", "123");

        assert_eq!(err.message, "User not found");
        assert_eq!(err.code, Some(ErrorCode::ResolverError));
        assert_eq!(err.path.as_ref().unwrap().to_string(), "user");
        assert!(err.extensions.is_some());
    }

    #[test]
    fn test_clear_locations() {
        let err = GraphQlError::new("boom")
            .with_location(Location::new(1, 2))
            .with_location(Location::new(3, 4))
            .clear_locations()
            .with_location(Location::new(5, 6));

        assert_eq!(err.locations, vec![Location::new(5, 6)]);
    }

    #[test]
    fn test_error_serialization() {
        let err = GraphQlError::new("Connection failed").with_code(ErrorCode::RemoteRequestFailed);
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("REMOTE_REQUEST_FAILED"));
        assert!(json.contains("Connection failed"));
        // Empty locations are omitted entirely.
        assert!(!json.contains("locations"));
    }
}
