//! Core types for Braid GraphQL.
//!
//! This crate provides the data model shared by the runtime and the
//! stitching layer:
//! - `path`: Result-tree paths (field names and list indices)
//! - `error`: GraphQL errors with typed codes and extension data
//! - `request`: Query documents and immutable operation requests
//! - `response`: Query results

pub mod error;
pub mod path;
pub mod request;
pub mod response;

pub use error::{ErrorCode, GraphQlError, Location};
pub use path::{Path, PathSegment};
pub use request::{
    ArgumentValue, FieldNode, OperationKind, OperationRequest, OperationRequestBuilder,
};
pub use response::QueryResult;
