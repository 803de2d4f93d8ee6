//! Field middleware pipeline.
//!
//! Middleware wraps field resolution: each layer receives the
//! [`ResolverContext`] and a `next` handler and decides whether to call
//! through, short-circuit, or post-process. The pipeline terminates in
//! the registered resolver for the field.

use crate::resolver::{ResolverContext, ResolverError, ResolverMap, ResolverResult};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Future produced by a field handler.
pub type FieldFuture = Pin<Box<dyn Future<Output = ResolverResult> + Send>>;

/// A fully-composed handler for one field invocation.
pub type FieldHandler = Arc<dyn Fn(ResolverContext) -> FieldFuture + Send + Sync>;

/// A middleware layer around field resolution.
pub trait FieldMiddleware: Send + Sync {
    /// Handles one field invocation, calling `next` to continue down
    /// the pipeline.
    fn invoke(&self, ctx: ResolverContext, next: FieldHandler) -> FieldFuture;
}

/// Builds the composed handler for a set of middleware layers.
pub struct FieldPipeline;

impl FieldPipeline {
    /// Composes `middleware` (outermost first) around the terminal
    /// resolver-lookup handler.
    pub fn build(
        middleware: &[Arc<dyn FieldMiddleware>],
        resolvers: Arc<ResolverMap>,
    ) -> FieldHandler {
        let mut handler: FieldHandler = Arc::new(move |ctx: ResolverContext| {
            let resolvers = Arc::clone(&resolvers);
            Box::pin(async move {
                match resolvers.get(&ctx.object_type, &ctx.selection.name) {
                    Some(resolver) => resolver.resolve(&ctx).await,
                    None => Err(ResolverError::FieldNotFound(format!(
                        "{}.{}",
                        ctx.object_type, ctx.selection.name
                    ))),
                }
            }) as FieldFuture
        });

        for layer in middleware.iter().rev() {
            let layer = Arc::clone(layer);
            let next = handler;
            handler = Arc::new(move |ctx: ResolverContext| {
                layer.invoke(ctx, Arc::clone(&next))
            });
        }

        handler
    }
}
