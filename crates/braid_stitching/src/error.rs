//! Delegation errors.
//!
//! These are configuration errors: the `delegate` directive referenced
//! something that does not exist, or its path does not fit the remote
//! schema. Transport failures are a separate concern, see
//! [`TransportError`](crate::client::TransportError).

use braid_core::{ErrorCode, GraphQlError};
use thiserror::Error;

/// A delegation configuration error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DelegationError {
    /// A scoped variable referenced an argument the annotated field
    /// does not carry.
    #[error("Argument '{0}' was not provided for the delegated field")]
    ArgumentNotFound(String),

    /// A scoped variable referenced missing request context data.
    #[error("Context data '{0}' was not found on the request")]
    ContextDataNotFound(String),

    /// The delegation path could not be parsed.
    #[error("Invalid delegation path: {0}")]
    InvalidPath(String),

    /// A path component names a field the remote type does not have.
    #[error("Path element '{name}' does not exist on remote type '{type_name}'")]
    InvalidPathElement { name: String, type_name: String },

    /// A path component binds an argument the remote field does not
    /// declare.
    #[error("Argument '{name}' is not declared on remote field '{field}'")]
    UnknownArgument { name: String, field: String },

    /// A non-terminal path component resolved to a non-object type.
    #[error("Path element '{0}' must resolve to an object type")]
    UnexpectedPathType(String),

    /// The remote schema cannot be queried at all.
    #[error("Remote schema '{0}' does not define a query root")]
    MissingQueryRoot(String),

    /// The directive referenced a schema that was never registered.
    #[error("Remote schema '{0}' is not registered")]
    UnknownSchema(String),
}

impl DelegationError {
    /// The error code this delegation error surfaces with.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::ArgumentNotFound(_) => ErrorCode::ArgumentNotFound,
            Self::ContextDataNotFound(_) => ErrorCode::ContextDataNotFound,
            Self::InvalidPath(_)
            | Self::InvalidPathElement { .. }
            | Self::UnknownArgument { .. }
            | Self::MissingQueryRoot(_) => ErrorCode::InvalidDelegationPath,
            Self::UnexpectedPathType(_) => ErrorCode::UnexpectedPathType,
            Self::UnknownSchema(_) => ErrorCode::UnknownRemoteSchema,
        }
    }
}

impl From<DelegationError> for GraphQlError {
    fn from(error: DelegationError) -> Self {
        GraphQlError::new(error.to_string()).with_code(error.code())
    }
}
