//! Resolver contract.
//!
//! A resolver is a unit of work that computes one field's value, given
//! the per-invocation [`ResolverContext`]. Resolvers may be synchronous
//! functions, async functions, or the default parent-property accessor.

use crate::context::{ExecutionContext, ScopedContext};
use crate::schema::{FieldDef, Schema};
use braid_core::{ErrorCode, FieldNode, GraphQlError, OperationRequest, Path};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// Arguments passed to a resolver.
#[derive(Debug, Clone, Default)]
pub struct ResolverArgs {
    args: HashMap<String, Value>,
}

impl ResolverArgs {
    /// Creates new resolver args.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates resolver args from a list of (name, value) pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            args: pairs.into_iter().collect(),
        }
    }

    /// Gets an argument by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.args.get(name)
    }

    /// Gets an argument as a specific type.
    pub fn get_as<T: serde::de::DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.args
            .get(name)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Gets a required argument, returning an error if not found.
    pub fn require<T: serde::de::DeserializeOwned>(&self, name: &str) -> Result<T, ResolverError> {
        self.args
            .get(name)
            .ok_or_else(|| ResolverError::MissingArgument(name.to_string()))
            .and_then(|v| {
                serde_json::from_value(v.clone())
                    .map_err(|e| ResolverError::ArgumentParse(name.to_string(), e.to_string()))
            })
    }

    /// Returns all arguments.
    pub fn all(&self) -> &HashMap<String, Value> {
        &self.args
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Sets an argument.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.args.insert(name.into(), value);
    }
}

/// Per-field-invocation record.
///
/// Created when a field task starts; carries the current path, the
/// object being resolved, the field's schema metadata and selection
/// node, and a handle to the shared [`ExecutionContext`].
#[derive(Debug, Clone)]
pub struct ResolverContext {
    /// Path from the result root to this field.
    pub path: Path,

    /// Name of the object type declaring this field.
    pub object_type: String,

    /// The parent object value being resolved.
    pub parent: Value,

    /// Coerced argument values for this invocation.
    pub args: ResolverArgs,

    /// The field's schema definition.
    pub field: Arc<FieldDef>,

    /// The field's selection node in the query document.
    pub selection: Arc<FieldNode>,

    /// The local schema.
    pub schema: Arc<Schema>,

    /// The operation being executed.
    pub operation: Arc<OperationRequest>,

    /// Shared per-request state.
    pub execution: Arc<ExecutionContext>,
}

impl ResolverContext {
    /// The key under which this field appears in the response.
    pub fn response_key(&self) -> &str {
        self.selection.response_key()
    }

    /// Returns true if the field lives on a root operation type.
    pub fn is_root_field(&self) -> bool {
        self.schema.is_root_type(&self.object_type)
    }

    /// Gets a request variable by name.
    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.execution.variable(name)
    }

    /// Returns the scoped context data visible to this field.
    pub async fn scoped(&self) -> Arc<ScopedContext> {
        self.execution.scoped_at(&self.path).await
    }

    /// Gets a scoped context value visible to this field.
    pub async fn scoped_value(&self, key: &str) -> Option<Value> {
        self.scoped().await.get(key).cloned()
    }

    /// Reports an error for this field, anchored at its path.
    pub async fn report_error(&self, error: GraphQlError) {
        let error = match error.path {
            Some(_) => error,
            None => error.with_path(self.path.clone()),
        };
        self.execution.report_error(error).await;
    }
}

/// Result type for resolvers.
pub type ResolverResult = Result<Value, ResolverError>;

/// Future type for async resolvers.
pub type ResolverFuture<'a> = Pin<Box<dyn Future<Output = ResolverResult> + Send + 'a>>;

/// Error from a resolver.
#[derive(Error, Debug, Clone)]
pub enum ResolverError {
    /// Field not found on the parent value.
    #[error("Field not found: {0}")]
    FieldNotFound(String),

    /// Missing required argument.
    #[error("Missing required argument: {0}")]
    MissingArgument(String),

    /// Argument parse error.
    #[error("Failed to parse argument '{0}': {1}")]
    ArgumentParse(String, String),

    /// Null value for a non-nullable field.
    #[error("Cannot return null for non-nullable field: {0}")]
    NullValue(String),

    /// Custom error raised by user field logic.
    #[error("{0}")]
    Custom(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResolverError {
    /// The error code this resolver error surfaces with.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NullValue(_) => ErrorCode::NonNullViolation,
            Self::Internal(_) => ErrorCode::InternalError,
            _ => ErrorCode::ResolverError,
        }
    }
}

impl From<ResolverError> for GraphQlError {
    fn from(error: ResolverError) -> Self {
        GraphQlError::new(error.to_string()).with_code(error.code())
    }
}

/// Trait for field resolvers.
pub trait Resolver: Send + Sync {
    /// Resolves a field value.
    fn resolve<'a>(&'a self, ctx: &'a ResolverContext) -> ResolverFuture<'a>;
}

/// A boxed resolver.
pub type BoxedResolver = Box<dyn Resolver>;

/// A wrapper for sync resolver functions.
pub struct FnResolver {
    func: Arc<dyn Fn(&ResolverContext) -> ResolverResult + Send + Sync>,
}

impl FnResolver {
    /// Creates a new function resolver.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&ResolverContext) -> ResolverResult + Send + Sync + 'static,
    {
        Self { func: Arc::new(f) }
    }
}

impl Resolver for FnResolver {
    fn resolve<'a>(&'a self, ctx: &'a ResolverContext) -> ResolverFuture<'a> {
        let result = (self.func)(ctx);
        Box::pin(async move { result })
    }
}

/// A wrapper for async resolver functions.
pub struct AsyncFnResolver {
    func: Arc<dyn Fn(ResolverContext) -> ResolverFuture<'static> + Send + Sync>,
}

impl AsyncFnResolver {
    /// Creates a new async function resolver.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(ResolverContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ResolverResult> + Send + 'static,
    {
        Self {
            func: Arc::new(move |ctx| Box::pin(f(ctx))),
        }
    }
}

impl Resolver for AsyncFnResolver {
    fn resolve<'a>(&'a self, ctx: &'a ResolverContext) -> ResolverFuture<'a> {
        let ctx = ctx.clone();
        let func = Arc::clone(&self.func);
        Box::pin(async move { func(ctx).await })
    }
}

/// Default resolver that accesses properties from the parent object.
pub struct DefaultResolver;

impl Resolver for DefaultResolver {
    fn resolve<'a>(&'a self, ctx: &'a ResolverContext) -> ResolverFuture<'a> {
        let field_name = &ctx.selection.name;
        let result = match &ctx.parent {
            Value::Object(map) => {
                if let Some(value) = map.get(field_name) {
                    Ok(value.clone())
                } else {
                    // Try snake_case version
                    let snake_case = to_snake_case(field_name);
                    Ok(map.get(&snake_case).cloned().unwrap_or(Value::Null))
                }
            }
            Value::Null => Ok(Value::Null),
            _ => Err(ResolverError::FieldNotFound(field_name.clone())),
        };
        Box::pin(async move { result })
    }
}

/// Converts camelCase to snake_case.
fn to_snake_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.extend(c.to_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}

/// Storage for resolvers organized by type and field.
#[derive(Default)]
pub struct ResolverMap {
    /// Resolvers indexed by "TypeName.fieldName".
    resolvers: HashMap<String, BoxedResolver>,

    /// Default resolver for unregistered fields.
    default_resolver: Option<BoxedResolver>,
}

impl ResolverMap {
    /// Creates a new resolver map with the default property-access
    /// fallback.
    pub fn new() -> Self {
        Self {
            resolvers: HashMap::new(),
            default_resolver: Some(Box::new(DefaultResolver)),
        }
    }

    /// Registers a resolver for a specific type and field.
    pub fn register<R: Resolver + 'static>(
        &mut self,
        type_name: impl Into<String>,
        field_name: impl Into<String>,
        resolver: R,
    ) {
        let key = format!("{}.{}", type_name.into(), field_name.into());
        self.resolvers.insert(key, Box::new(resolver));
    }

    /// Registers a sync function as a resolver.
    pub fn register_fn<F>(
        &mut self,
        type_name: impl Into<String>,
        field_name: impl Into<String>,
        f: F,
    ) where
        F: Fn(&ResolverContext) -> ResolverResult + Send + Sync + 'static,
    {
        self.register(type_name, field_name, FnResolver::new(f));
    }

    /// Registers an async function as a resolver.
    pub fn register_async<F, Fut>(
        &mut self,
        type_name: impl Into<String>,
        field_name: impl Into<String>,
        f: F,
    ) where
        F: Fn(ResolverContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ResolverResult> + Send + 'static,
    {
        self.register(type_name, field_name, AsyncFnResolver::new(f));
    }

    /// Gets a resolver for a type and field.
    pub fn get(&self, type_name: &str, field_name: &str) -> Option<&dyn Resolver> {
        let key = format!("{}.{}", type_name, field_name);
        self.resolvers
            .get(&key)
            .map(|r| r.as_ref())
            .or(self.default_resolver.as_ref().map(|r| r.as_ref()))
    }

    /// Sets the default resolver.
    pub fn set_default<R: Resolver + 'static>(&mut self, resolver: R) {
        self.default_resolver = Some(Box::new(resolver));
    }

    /// Removes the default resolver.
    pub fn remove_default(&mut self) {
        self.default_resolver = None;
    }
}

impl Debug for ResolverMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverMap")
            .field("resolver_count", &self.resolvers.len())
            .field("has_default", &self.default_resolver.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TypeRef;
    use braid_core::OperationRequest;

    fn test_context(field_name: &str, parent: Value) -> ResolverContext {
        let operation = Arc::new(OperationRequest::query(vec![FieldNode::new(field_name)]));
        ResolverContext {
            path: Path::root().append_field(field_name),
            object_type: "Query".to_string(),
            parent,
            args: ResolverArgs::new(),
            field: Arc::new(FieldDef::new(field_name, TypeRef::named("String"))),
            selection: Arc::new(FieldNode::new(field_name)),
            schema: Arc::new(Schema::new()),
            execution: Arc::new(ExecutionContext::new(&operation)),
            operation,
        }
    }

    #[test]
    fn test_resolver_args() {
        let mut args = ResolverArgs::new();
        args.set("id", serde_json::json!(123));
        args.set("name", serde_json::json!("test"));

        assert_eq!(args.get_as::<i64>("id"), Some(123));
        assert_eq!(args.get_as::<String>("name"), Some("test".to_string()));
        assert_eq!(args.get_as::<i64>("missing"), None);
    }

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("firstName"), "first_name");
        assert_eq!(to_snake_case("lastName"), "last_name");
        assert_eq!(to_snake_case("id"), "id");
    }

    #[tokio::test]
    async fn test_default_resolver() {
        let resolver = DefaultResolver;
        let ctx = test_context("name", serde_json::json!({"name": "Alice", "age": 30}));

        let result = resolver.resolve(&ctx).await;
        assert_eq!(result.unwrap(), serde_json::json!("Alice"));
    }

    #[tokio::test]
    async fn test_fn_resolver_with_args() {
        let resolver = FnResolver::new(|ctx| {
            let id: i64 = ctx.args.require("id")?;
            Ok(serde_json::json!({"id": id}))
        });

        let mut ctx = test_context("user", serde_json::json!({}));
        ctx.args.set("id", serde_json::json!(42));

        let result = resolver.resolve(&ctx).await;
        assert_eq!(result.unwrap(), serde_json::json!({"id": 42}));
    }

    #[tokio::test]
    async fn test_async_resolver() {
        let resolver = AsyncFnResolver::new(|_ctx| async move {
            tokio::task::yield_now().await;
            Ok(serde_json::json!("done"))
        });

        let ctx = test_context("job", serde_json::json!({}));
        let result = resolver.resolve(&ctx).await;
        assert_eq!(result.unwrap(), serde_json::json!("done"));
    }

    #[tokio::test]
    async fn test_resolver_map_default_fallback() {
        let map = ResolverMap::new();

        let resolver = map.get("User", "name").unwrap();
        let ctx = ResolverContext {
            object_type: "User".to_string(),
            ..test_context("name", serde_json::json!({"name": "Bob"}))
        };

        let result = resolver.resolve(&ctx).await;
        assert_eq!(result.unwrap(), serde_json::json!("Bob"));
    }

    #[test]
    fn test_resolver_error_codes() {
        assert_eq!(
            ResolverError::NullValue("user".into()).code(),
            ErrorCode::NonNullViolation
        );
        assert_eq!(
            ResolverError::Custom("boom".into()).code(),
            ErrorCode::ResolverError
        );
    }
}
