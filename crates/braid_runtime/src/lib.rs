//! Braid execution runtime.
//!
//! This crate turns an [`OperationRequest`](braid_core::OperationRequest)
//! into a [`QueryResult`](braid_core::QueryResult):
//!
//! - `scheduler`: tracked task spawning with an idle signal
//! - `schema`: type and field metadata consumed during execution
//! - `context`: shared per-request state (errors, scoped data, result)
//! - `resolver`: the field resolver contract and default resolvers
//! - `middleware`: the field middleware pipeline
//! - `merger`: null propagation and declaration-order assembly
//! - `executor`: the operation executor tying it all together

pub mod context;
pub mod executor;
pub mod merger;
pub mod middleware;
pub mod resolver;
pub mod scheduler;
pub mod schema;

pub use context::{ExecutionContext, ScopedContext};
pub use executor::Executor;
pub use merger::{apply_nullability, assemble_list, assemble_object, FieldCompletion};
pub use middleware::{FieldFuture, FieldHandler, FieldMiddleware, FieldPipeline};
pub use resolver::{
    AsyncFnResolver, DefaultResolver, FnResolver, Resolver, ResolverArgs, ResolverContext,
    ResolverError, ResolverFuture, ResolverMap, ResolverResult,
};
pub use scheduler::{SchedulerStats, TaskGuard, TrackableScheduler};
pub use schema::{
    EnumDef, FieldDef, FieldDirective, InputFieldDef, InputObjectDef, ObjectDef, ScalarDef,
    Schema, SchemaBuilder, TypeDef, TypeRef,
};
