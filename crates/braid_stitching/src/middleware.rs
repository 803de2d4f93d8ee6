//! The delegation middleware.
//!
//! Fields annotated with `delegate` directives are resolved remotely:
//! the middleware builds the remote operation, sends it through the
//! schema's client, splices the unwrapped result into the local result
//! tree and rebases remote errors onto local paths. Directives on one
//! field are candidates tried in declaration order; the first non-null
//! result wins.

use crate::client::StitchingContext;
use crate::directive::DelegateDirective;
use crate::error::DelegationError;
use crate::query_builder::build_remote_query;
use braid_core::{GraphQlError, Path, PathSegment, QueryResult};
use braid_runtime::{FieldFuture, FieldHandler, FieldMiddleware, ResolverContext, ResolverResult};
use serde_json::Value;
use std::sync::Arc;

/// Scoped-context key recording which remote schema produced a subtree.
pub const SCHEMA_NAME_KEY: &str = "schemaName";

/// Extension key carrying the original remote error.
const REMOTE_EXTENSION: &str = "remote";

/// Field middleware that resolves `delegate`-annotated fields against
/// remote schemas.
pub struct DelegateToRemoteSchema {
    stitching: Arc<StitchingContext>,
}

impl DelegateToRemoteSchema {
    pub fn new(stitching: Arc<StitchingContext>) -> Self {
        Self { stitching }
    }
}

impl FieldMiddleware for DelegateToRemoteSchema {
    fn invoke(&self, ctx: ResolverContext, next: FieldHandler) -> FieldFuture {
        let directives = DelegateDirective::from_field(&ctx.field);
        if directives.is_empty() {
            return next(ctx);
        }
        let stitching = Arc::clone(&self.stitching);
        Box::pin(async move { delegate(stitching, ctx, directives).await })
    }
}

async fn delegate(
    stitching: Arc<StitchingContext>,
    ctx: ResolverContext,
    directives: Vec<DelegateDirective>,
) -> ResolverResult {
    let mut data = Value::Null;
    let mut last_errors: Vec<GraphQlError> = Vec::new();
    let mut last_schema: Option<String> = None;

    for directive in &directives {
        let remote = match stitching.remote_schema(&directive.schema) {
            Ok(remote) => remote,
            Err(error) => {
                report_config_error(&ctx, error).await;
                return Ok(Value::Null);
            }
        };

        let delegated = match build_remote_query(remote, &ctx, directive).await {
            Ok(delegated) => delegated,
            Err(error) => {
                report_config_error(&ctx, error).await;
                return Ok(Value::Null);
            }
        };

        tracing::debug!(
            schema = %directive.schema,
            path = %ctx.path,
            depth = delegated.depth,
            "dispatching delegated query"
        );

        match remote.client.execute(delegated.request).await {
            Ok(result) => {
                update_scoped_context(&ctx, &directive.schema, &result).await;
                last_errors = result.errors;
                last_schema = Some(directive.schema.clone());

                let extracted = extract_data(result.data, delegated.depth);
                if !extracted.is_null() {
                    data = extracted;
                    break;
                }
            }
            Err(transport) => {
                ctx.execution
                    .report_error(
                        GraphQlError::new(transport.to_string())
                            .with_code(transport.code())
                            .with_path(ctx.path.clone())
                            .with_extension(SCHEMA_NAME_KEY, &directive.schema),
                    )
                    .await;
                last_errors.clear();
                last_schema = None;
                break;
            }
        }
    }

    if let Some(schema_name) = last_schema {
        for error in last_errors {
            let rewritten = rewrite_remote_error(&ctx.path, &schema_name, error);
            ctx.execution.report_error(rewritten).await;
        }
    }

    Ok(data)
}

async fn report_config_error(ctx: &ResolverContext, error: DelegationError) {
    tracing::warn!(error = %error, path = %ctx.path, "delegation misconfigured");
    ctx.execution
        .report_error(GraphQlError::from(error).with_path(ctx.path.clone()))
        .await;
}

/// Makes the remote result's context data, plus the producing schema's
/// name, visible to everything below the delegated field.
async fn update_scoped_context(ctx: &ResolverContext, schema_name: &str, result: &QueryResult) {
    let mut entries: Vec<(String, Value)> = result
        .context_data
        .iter()
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    entries.push((
        SCHEMA_NAME_KEY.to_string(),
        Value::String(schema_name.to_string()),
    ));

    ctx.execution
        .modify_scoped_context(&ctx.path, move |scoped| scoped.child_from(entries))
        .await;
}

/// Unwraps `levels` layers of the remote result, taking the first
/// entry at each level. An empty object or a non-object mid-way
/// yields `null`.
fn extract_data(data: Option<Value>, levels: usize) -> Value {
    let Some(Value::Object(map)) = data else {
        return Value::Null;
    };
    let Some((_, mut current)) = map.into_iter().next() else {
        return Value::Null;
    };

    for _ in 1..levels {
        match current {
            Value::Object(inner) => {
                current = match inner.into_iter().next() {
                    Some((_, value)) => value,
                    None => return Value::Null,
                };
            }
            _ => return Value::Null,
        }
    }
    current
}

/// Rebases one remote error onto the local result tree.
///
/// The original error is preserved under `extensions.remote`; source
/// locations refer to the remote document and are dropped.
fn rewrite_remote_error(local_path: &Path, schema_name: &str, error: GraphQlError) -> GraphQlError {
    let original = error.clone();
    let mut rewritten = error;
    rewritten.path = match rewritten.path.take() {
        Some(remote) => Some(rewrite_error_path(local_path, remote)),
        // Only transport-level failures are anchored at the delegating
        // field; other path-less errors stay request-global.
        None if rewritten.is_transport() => Some(local_path.clone()),
        None => None,
    };
    rewritten
        .clear_locations()
        .with_extension(REMOTE_EXTENSION, &original)
        .with_extension(SCHEMA_NAME_KEY, schema_name)
}

/// Maps a remote error path onto the local tree: the leading segment
/// (the remote root field) is dropped and the remainder is appended to
/// the delegating field's path.
fn rewrite_error_path(local_path: &Path, remote: Path) -> Path {
    match remote.segments().split_first() {
        Some((PathSegment::Field(_), rest)) => {
            let mut path = local_path.clone();
            for segment in rest {
                path = path.append(segment.clone());
            }
            path
        }
        Some((PathSegment::Index(_), _)) => {
            tracing::warn!(
                remote_path = %remote,
                "remote error path starts with a list index; anchoring at the delegating field"
            );
            local_path.clone()
        }
        None => local_path.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use braid_core::ErrorCode;
    use serde_json::json;

    #[test]
    fn test_extract_data_unwraps_one_level_per_component() {
        assert_eq!(extract_data(Some(json!({"a": {"b": "X"}})), 2), json!("X"));
        assert_eq!(
            extract_data(Some(json!({"customer": {"orders": [1, 2]}})), 2),
            json!([1, 2])
        );
    }

    #[test]
    fn test_extract_data_takes_first_entry() {
        assert_eq!(
            extract_data(Some(json!({"first": "yes", "second": "no"})), 1),
            json!("yes")
        );
    }

    #[test]
    fn test_extract_data_empty_object_is_null() {
        assert_eq!(extract_data(Some(json!({})), 1), Value::Null);
        assert_eq!(extract_data(Some(json!({"a": {}})), 2), Value::Null);
    }

    #[test]
    fn test_extract_data_non_object_input_is_null() {
        assert_eq!(extract_data(None, 1), Value::Null);
        assert_eq!(extract_data(Some(json!([1, 2])), 1), Value::Null);
        assert_eq!(extract_data(Some(json!({"a": 1})), 2), Value::Null);
    }

    #[test]
    fn test_extract_data_zero_levels_behaves_like_one() {
        assert_eq!(extract_data(Some(json!({"a": "X"})), 0), json!("X"));
    }

    #[test]
    fn test_rewrite_path_drops_remote_root_segment() {
        let local = Path::root().append_field("user").append_field("orders");
        let remote = Path::root()
            .append_field("root")
            .append_field("child")
            .append_index(0)
            .append_field("name");

        let rewritten = rewrite_error_path(&local, remote);
        assert_eq!(
            serde_json::to_value(&rewritten).unwrap(),
            json!(["user", "orders", "child", 0, "name"])
        );
    }

    #[test]
    fn test_rewrite_path_empty_remote_path_anchors_locally() {
        let local = Path::root().append_field("user");
        assert_eq!(rewrite_error_path(&local, Path::root()), local);
    }

    #[test]
    fn test_rewrite_path_with_index_leading_segment_anchors_locally() {
        let local = Path::root().append_field("user");
        let remote = Path::root().append_index(0).append_field("name");
        assert_eq!(rewrite_error_path(&local, remote), local);
    }

    #[test]
    fn test_path_less_transport_error_is_anchored_locally() {
        let local = Path::root().append_field("user");
        let error = GraphQlError::new("connection reset")
            .with_code(ErrorCode::RemoteRequestFailed);

        let rewritten = rewrite_remote_error(&local, "orders", error);
        assert_eq!(rewritten.path.as_ref(), Some(&local));
    }

    #[test]
    fn test_path_less_non_transport_error_stays_unanchored() {
        let local = Path::root().append_field("user");
        let error = GraphQlError::new("rate limited").with_code(ErrorCode::ResolverError);

        let rewritten = rewrite_remote_error(&local, "orders", error);
        assert_eq!(rewritten.path, None);
        // Provenance extensions are still attached.
        let extensions = rewritten.extensions.unwrap();
        assert_eq!(extensions.get(SCHEMA_NAME_KEY), Some(&json!("orders")));
    }

    #[test]
    fn test_rewrite_error_keeps_original_in_extensions() {
        let local = Path::root().append_field("customerOrders");
        let remote_error = GraphQlError::new("order not found")
            .with_code(ErrorCode::ResolverError)
            .with_path(Path::root().append_field("customer").append_field("orders"))
            .with_location(braid_core::Location::new(3, 7));

        let rewritten = rewrite_remote_error(&local, "orders", remote_error.clone());

        assert_eq!(
            rewritten.path.as_ref().map(Path::to_string).as_deref(),
            Some("customerOrders.orders")
        );
        assert!(rewritten.locations.is_empty());

        let extensions = rewritten.extensions.unwrap();
        assert_eq!(extensions.get(SCHEMA_NAME_KEY), Some(&json!("orders")));
        assert_eq!(
            extensions.get(REMOTE_EXTENSION),
            Some(&serde_json::to_value(&remote_error).unwrap())
        );
    }
}
