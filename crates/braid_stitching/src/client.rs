//! Remote schemas and their query clients.

use crate::error::DelegationError;
use async_trait::async_trait;
use braid_core::{ErrorCode, OperationRequest, QueryResult};
use braid_runtime::Schema;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A transport-level failure while talking to a remote schema.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    /// The request could not be delivered or answered.
    #[error("Remote request failed: {0}")]
    RequestFailed(String),

    /// The response was not a valid query result.
    #[error("Remote response could not be read: {0}")]
    Protocol(String),

    /// The request timed out.
    #[error("Remote request timed out")]
    Timeout,
}

impl TransportError {
    /// The error code this transport error surfaces with.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::RequestFailed(_) => ErrorCode::RemoteRequestFailed,
            Self::Protocol(_) => ErrorCode::RemoteProtocolError,
            Self::Timeout => ErrorCode::Timeout,
        }
    }
}

/// Executes operations against one remote schema.
#[async_trait]
pub trait RemoteQueryClient: Send + Sync {
    /// Sends one operation and returns the remote result.
    async fn execute(&self, request: OperationRequest) -> Result<QueryResult, TransportError>;
}

/// One registered remote schema.
#[derive(Clone)]
pub struct RemoteSchema {
    /// The name the `delegate` directive refers to.
    pub name: String,

    /// The remote schema's type metadata, used to build and prune
    /// delegated queries.
    pub schema: Arc<Schema>,

    /// The client delegated operations are sent through.
    pub client: Arc<dyn RemoteQueryClient>,
}

impl RemoteSchema {
    pub fn new(
        name: impl Into<String>,
        schema: Arc<Schema>,
        client: Arc<dyn RemoteQueryClient>,
    ) -> Self {
        Self {
            name: name.into(),
            schema,
            client,
        }
    }
}

impl fmt::Debug for RemoteSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteSchema")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Registry of the remote schemas available for delegation.
#[derive(Debug, Default)]
pub struct StitchingContext {
    schemas: HashMap<String, RemoteSchema>,
}

impl StitchingContext {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a remote schema under its name.
    pub fn add_schema(mut self, remote: RemoteSchema) -> Self {
        self.schemas.insert(remote.name.clone(), remote);
        self
    }

    /// Looks up a remote schema by name.
    pub fn remote_schema(&self, name: &str) -> Result<&RemoteSchema, DelegationError> {
        self.schemas
            .get(name)
            .ok_or_else(|| DelegationError::UnknownSchema(name.to_string()))
    }

    /// Returns the registered schema names.
    pub fn schema_names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }
}
