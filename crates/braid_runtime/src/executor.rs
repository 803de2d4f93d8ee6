//! Operation execution.
//!
//! The executor walks the operation's selections against the schema,
//! running one tracked task per field. Sibling fields of a query run
//! concurrently; mutation root fields run serially in declaration
//! order. Values are completed bottom-up against the declared types
//! (null propagation, declaration-order objects) and the result is
//! sealed only once the scheduler reports idle.

use crate::context::ExecutionContext;
use crate::merger::{apply_nullability, assemble_list, assemble_object, FieldCompletion};
use crate::middleware::{FieldHandler, FieldMiddleware, FieldPipeline};
use crate::resolver::{ResolverArgs, ResolverContext, ResolverMap};
use crate::scheduler::TrackableScheduler;
use crate::schema::{Schema, TypeRef};
use braid_core::{
    ArgumentValue, ErrorCode, FieldNode, GraphQlError, OperationKind, OperationRequest, Path,
    QueryResult,
};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Everything a field task needs, cheap to clone across tasks.
#[derive(Clone)]
pub(crate) struct ExecutionEnv {
    pub schema: Arc<Schema>,
    pub operation: Arc<OperationRequest>,
    pub execution: Arc<ExecutionContext>,
    pub pipeline: FieldHandler,
    pub scheduler: TrackableScheduler,
}

/// Executes operations against a schema.
pub struct Executor {
    resolvers: Arc<ResolverMap>,
    middleware: Vec<Arc<dyn FieldMiddleware>>,
}

impl Executor {
    /// Creates an executor over the given resolvers.
    pub fn new(resolvers: ResolverMap) -> Self {
        Self {
            resolvers: Arc::new(resolvers),
            middleware: Vec::new(),
        }
    }

    /// Adds a middleware layer; layers run outermost-first in the
    /// order they were added.
    pub fn with_middleware(mut self, layer: Arc<dyn FieldMiddleware>) -> Self {
        self.middleware.push(layer);
        self
    }

    /// Executes one operation to completion.
    pub async fn execute(&self, schema: Arc<Schema>, request: OperationRequest) -> QueryResult {
        if request.kind == OperationKind::Subscription {
            return QueryResult::error(
                GraphQlError::new("Subscriptions are not supported by this executor")
                    .with_code(ErrorCode::InternalError),
            );
        }

        let Some(root_type) = schema.root_type(request.kind).map(str::to_string) else {
            return QueryResult::error(
                GraphQlError::new(format!(
                    "Schema does not define a {} root type",
                    request.kind.as_str()
                ))
                .with_code(ErrorCode::InternalError),
            );
        };

        let operation = Arc::new(request);
        let execution = Arc::new(ExecutionContext::new(&operation));
        let env = ExecutionEnv {
            schema,
            operation: Arc::clone(&operation),
            execution: Arc::clone(&execution),
            pipeline: FieldPipeline::build(&self.middleware, Arc::clone(&self.resolvers)),
            scheduler: TrackableScheduler::new(),
        };

        // An empty selection set still yields an object.
        execution
            .set_result(&Path::root(), Value::Object(serde_json::Map::new()))
            .await;

        let bubbled = match operation.kind {
            OperationKind::Mutation => execute_roots_serial(&env, &root_type).await,
            _ => execute_roots_concurrent(&env, &root_type).await,
        };

        env.scheduler.wait_until_idle().await;

        let data = if bubbled {
            Value::Null
        } else {
            execution.take_data().await
        };

        QueryResult {
            data: Some(data),
            errors: execution.errors().await,
            context_data: HashMap::new(),
        }
    }
}

/// Runs all root selections concurrently. Returns true if a non-null
/// root field bubbled, which nulls the entire `data` payload.
async fn execute_roots_concurrent(env: &ExecutionEnv, root_type: &str) -> bool {
    let mut handles = Vec::with_capacity(env.operation.selections.len());
    for selection in &env.operation.selections {
        let selection = Arc::new(selection.clone());
        let key = selection.response_key().to_string();
        let non_null = field_is_non_null(env, root_type, &selection.name);
        let path = Path::root().append_field(&key);
        let task_env = env.clone();
        let root_type = root_type.to_string();
        let handle = env.scheduler.spawn(async move {
            resolve_field(task_env, root_type, Value::Null, selection, path).await
        });
        handles.push((key, non_null, handle));
    }

    let mut bubbled = false;
    for (key, non_null, handle) in handles {
        let completion = match handle.await {
            Ok(completion) => completion,
            Err(join_error) => {
                report_lost_task(env, &key, join_error).await;
                lost_task_completion(non_null)
            }
        };
        bubbled |= write_root(env, &key, completion).await;
    }
    bubbled
}

fn field_is_non_null(env: &ExecutionEnv, type_name: &str, field_name: &str) -> bool {
    env.schema
        .get_field(type_name, field_name)
        .map(|field| field.ty.is_non_null())
        .unwrap_or(false)
}

/// Completes a field whose task was lost the same way a resolver error
/// does: null for a nullable type, a bubble for a non-null one.
fn lost_task_completion(non_null: bool) -> FieldCompletion {
    if non_null {
        FieldCompletion::Bubble
    } else {
        FieldCompletion::Resolved(Value::Null)
    }
}

/// Runs root selections one at a time, in declaration order.
async fn execute_roots_serial(env: &ExecutionEnv, root_type: &str) -> bool {
    let mut bubbled = false;
    for selection in &env.operation.selections {
        let selection = Arc::new(selection.clone());
        let key = selection.response_key().to_string();
        let path = Path::root().append_field(&key);
        let completion = resolve_field(
            env.clone(),
            root_type.to_string(),
            Value::Null,
            selection,
            path,
        )
        .await;
        bubbled |= write_root(env, &key, completion).await;
    }
    bubbled
}

async fn write_root(env: &ExecutionEnv, key: &str, completion: FieldCompletion) -> bool {
    match completion {
        FieldCompletion::Resolved(value) => {
            env.execution
                .set_result(&Path::root().append_field(key), value)
                .await;
            false
        }
        FieldCompletion::Bubble => true,
    }
}

async fn report_lost_task(env: &ExecutionEnv, key: &str, join_error: tokio::task::JoinError) {
    tracing::error!(field = key, error = %join_error, "field task lost");
    env.execution
        .report_error(
            GraphQlError::new(format!("Field '{}' failed unexpectedly", key))
                .with_code(ErrorCode::InternalError)
                .with_path(Path::root().append_field(key)),
        )
        .await;
}

/// Resolves one field and completes its value against the declared type.
async fn resolve_field(
    env: ExecutionEnv,
    object_type: String,
    parent: Value,
    selection: Arc<FieldNode>,
    path: Path,
) -> FieldCompletion {
    if selection.name == "__typename" {
        return FieldCompletion::Resolved(Value::String(object_type));
    }

    let Some(field) = env.schema.get_field(&object_type, &selection.name) else {
        env.execution
            .report_error(
                GraphQlError::new(format!(
                    "Unknown field '{}' on type '{}'",
                    selection.name, object_type
                ))
                .with_code(ErrorCode::ResolverError)
                .with_path(path.clone()),
            )
            .await;
        return FieldCompletion::Resolved(Value::Null);
    };
    let field = Arc::new(field.clone());
    let declared = field.ty.clone();

    let ctx = ResolverContext {
        path: path.clone(),
        object_type,
        parent,
        args: coerce_arguments(&env, &field, &selection),
        field,
        selection: Arc::clone(&selection),
        schema: Arc::clone(&env.schema),
        operation: Arc::clone(&env.operation),
        execution: Arc::clone(&env.execution),
    };

    match (env.pipeline)(ctx).await {
        Ok(value) => complete_value(env, declared, selection, path, value).await,
        Err(error) => {
            env.execution
                .report_error(GraphQlError::from(error).with_path(path))
                .await;
            // The error already explains the null; no non-null
            // violation is reported on top of it.
            if declared.is_non_null() {
                FieldCompletion::Bubble
            } else {
                FieldCompletion::Resolved(Value::Null)
            }
        }
    }
}

/// Coerces the selection's arguments: literals pass through, variables
/// are looked up on the request, declared defaults fill the gaps.
fn coerce_arguments(env: &ExecutionEnv, field: &crate::schema::FieldDef, selection: &FieldNode) -> ResolverArgs {
    let mut args = ResolverArgs::new();
    for (name, value) in &selection.arguments {
        let coerced = match value {
            ArgumentValue::Literal(literal) => literal.clone(),
            ArgumentValue::Variable(var) => {
                env.execution.variable(var).cloned().unwrap_or(Value::Null)
            }
        };
        args.set(name.clone(), coerced);
    }
    for (name, def) in &field.arguments {
        if args.get(name).is_none() {
            if let Some(default) = &def.default_value {
                args.set(name.clone(), default.clone());
            }
        }
    }
    args
}

/// Completes a resolved value against its declared type: descends into
/// lists and composite selections, then applies nullability.
fn complete_value(
    env: ExecutionEnv,
    declared: TypeRef,
    selection: Arc<FieldNode>,
    path: Path,
    value: Value,
) -> Pin<Box<dyn Future<Output = FieldCompletion> + Send>> {
    Box::pin(async move {
        let inner = match (declared.nullable(), value) {
            (_, Value::Null) => FieldCompletion::Resolved(Value::Null),
            (TypeRef::List(item), Value::Array(elements)) => {
                let mut completions = Vec::with_capacity(elements.len());
                for (index, element) in elements.into_iter().enumerate() {
                    let completion = complete_value(
                        env.clone(),
                        (**item).clone(),
                        Arc::clone(&selection),
                        path.append_index(index),
                        element,
                    )
                    .await;
                    completions.push(completion);
                }
                assemble_list(completions)
            }
            (TypeRef::List(_), _) => {
                env.execution
                    .report_error(
                        GraphQlError::new(format!("Expected a list at '{}'", path))
                            .with_code(ErrorCode::InternalError)
                            .with_path(path.clone()),
                    )
                    .await;
                FieldCompletion::Resolved(Value::Null)
            }
            (TypeRef::Named(name), value) => {
                if selection.is_composite() && env.schema.get_object(name).is_some() {
                    resolve_selection_set(
                        env.clone(),
                        name.clone(),
                        value,
                        selection.selections.clone(),
                        path.clone(),
                    )
                    .await
                } else {
                    FieldCompletion::Resolved(value)
                }
            }
            // `nullable()` strips the only NonNull wrapper.
            (TypeRef::NonNull(_), value) => FieldCompletion::Resolved(value),
        };

        if declared.is_non_null() && inner == FieldCompletion::Resolved(Value::Null) {
            env.execution
                .report_error(
                    GraphQlError::new(format!(
                        "Cannot return null for non-nullable field at '{}'",
                        path
                    ))
                    .with_code(ErrorCode::NonNullViolation)
                    .with_path(path.clone()),
                )
                .await;
        }
        apply_nullability(&declared, inner)
    })
}

/// Resolves an object's sub-selections concurrently and assembles the
/// result in declaration order.
async fn resolve_selection_set(
    env: ExecutionEnv,
    type_name: String,
    parent: Value,
    selections: Vec<FieldNode>,
    path: Path,
) -> FieldCompletion {
    let declared_keys: Vec<String> = selections
        .iter()
        .map(|s| s.response_key().to_string())
        .collect();

    let mut handles = Vec::with_capacity(selections.len());
    for selection in selections {
        let selection = Arc::new(selection);
        let key = selection.response_key().to_string();
        let non_null = field_is_non_null(&env, &type_name, &selection.name);
        let child_path = path.append_field(&key);
        let task_env = env.clone();
        let task_type = type_name.clone();
        let parent = parent.clone();
        let handle = env.scheduler.spawn(async move {
            resolve_field(task_env, task_type, parent, selection, child_path).await
        });
        handles.push((key, non_null, handle));
    }

    let mut completions = HashMap::with_capacity(handles.len());
    for (key, non_null, handle) in handles {
        match handle.await {
            Ok(completion) => {
                completions.insert(key, completion);
            }
            Err(join_error) => {
                tracing::error!(field = %key, error = %join_error, "field task lost");
                env.execution
                    .report_error(
                        GraphQlError::new(format!("Field '{}' failed unexpectedly", key))
                            .with_code(ErrorCode::InternalError)
                            .with_path(path.append_field(&key)),
                    )
                    .await;
                completions.insert(key, lost_task_completion(non_null));
            }
        }
    }

    assemble_object(&declared_keys, completions)
}
