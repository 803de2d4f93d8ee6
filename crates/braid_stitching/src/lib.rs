//! Braid schema stitching.
//!
//! Delegates fields of a local schema to remote schemas:
//!
//! - `directive`: the `delegate` directive and its path syntax
//! - `variables`: scoped variables (`$arguments:id` and friends)
//! - `client`: remote schema registry and the query client contract
//! - `query_builder`: remote operation construction
//! - `middleware`: the delegation field middleware
//!
//! Wire it up by registering the middleware on the executor:
//!
//! ```ignore
//! let executor = Executor::new(resolvers)
//!     .with_middleware(Arc::new(DelegateToRemoteSchema::new(stitching)));
//! ```

pub mod client;
pub mod directive;
pub mod error;
pub mod middleware;
pub mod query_builder;
pub mod variables;

pub use client::{RemoteQueryClient, RemoteSchema, StitchingContext, TransportError};
pub use directive::{DelegateDirective, PathValue, SelectionPathComponent, parse_selection_path};
pub use error::DelegationError;
pub use middleware::{DelegateToRemoteSchema, SCHEMA_NAME_KEY};
pub use query_builder::{DelegatedQuery, build_remote_query};
pub use variables::{ScopedVariable, VariableScope, VariableValue};
