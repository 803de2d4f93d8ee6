//! Remote query construction.
//!
//! Builds the operation sent to a remote schema from a `delegate`
//! directive: the delegation path becomes a chain of nested field
//! nodes, scoped variables become synthetic request variables with
//! their values resolved from the local execution, and the local
//! selection set is spliced into the innermost node after pruning the
//! fields the remote type does not know.

use crate::client::RemoteSchema;
use crate::directive::{DelegateDirective, PathValue, SelectionPathComponent};
use crate::error::DelegationError;
use crate::variables::VariableValue;
use braid_core::{ArgumentValue, FieldNode, OperationKind, OperationRequest};
use braid_runtime::{ResolverContext, Schema};
use serde_json::Value;

/// A built remote operation, ready to send.
#[derive(Debug, Clone)]
pub struct DelegatedQuery {
    /// The operation to execute against the remote schema.
    pub request: OperationRequest,

    /// How many levels of the remote result wrap the delegated data
    /// (one per path component).
    pub depth: usize,
}

/// Builds the remote operation for one `delegate` directive.
pub async fn build_remote_query(
    remote: &RemoteSchema,
    ctx: &ResolverContext,
    directive: &DelegateDirective,
) -> Result<DelegatedQuery, DelegationError> {
    let components = directive.components()?;

    let root_type = remote
        .schema
        .root_type(OperationKind::Query)
        .ok_or_else(|| DelegationError::MissingQueryRoot(remote.name.clone()))?;

    // With no path, the annotated field itself is looked up on the
    // remote query root.
    let components = if components.is_empty() {
        vec![SelectionPathComponent {
            name: ctx.selection.name.clone(),
            arguments: ctx
                .selection
                .arguments
                .iter()
                .map(|(name, value)| (name.clone(), argument_to_path_value(value)))
                .collect(),
        }]
    } else {
        components
    };
    let depth = components.len();

    let mut bindings: Vec<VariableValue> = Vec::new();
    let mut nodes: Vec<FieldNode> = Vec::with_capacity(depth);
    let mut type_name = root_type;

    for (position, component) in components.iter().enumerate() {
        let field = remote
            .schema
            .get_field(type_name, &component.name)
            .ok_or_else(|| DelegationError::InvalidPathElement {
                name: component.name.clone(),
                type_name: type_name.to_string(),
            })?;

        let mut node = FieldNode::new(&component.name);
        for (arg_name, value) in &component.arguments {
            let def = field.arguments.get(arg_name).ok_or_else(|| {
                DelegationError::UnknownArgument {
                    name: arg_name.clone(),
                    field: format!("{}.{}", type_name, component.name),
                }
            })?;
            let argument = match value {
                PathValue::Literal(literal) => ArgumentValue::Literal(literal.clone()),
                PathValue::Variable(name) => {
                    bindings.push(VariableValue {
                        name: name.clone(),
                        ty: def.ty.clone(),
                        value: ctx.operation.variable(name).cloned(),
                        default: def.default_value.clone(),
                    });
                    ArgumentValue::Variable(name.clone())
                }
                PathValue::Scoped(scoped) => {
                    let variable = scoped.variable_name();
                    bindings.push(VariableValue {
                        name: variable.clone(),
                        ty: def.ty.clone(),
                        value: Some(scoped.resolve(ctx).await?),
                        default: def.default_value.clone(),
                    });
                    ArgumentValue::Variable(variable)
                }
            };
            node = node.with_argument(arg_name.clone(), argument);
        }
        nodes.push(node);

        type_name = field.ty.named_type();
        let is_terminal = position + 1 == depth;
        if !is_terminal && remote.schema.get_object(type_name).is_none() {
            return Err(DelegationError::UnexpectedPathType(component.name.clone()));
        }
    }

    // Splice the local selections into the innermost node, dropping
    // fields the remote terminal type does not define.
    let mut inner = match nodes.pop() {
        Some(node) => node,
        // `depth` is at least 1, so the chain is never empty.
        None => FieldNode::new(&ctx.selection.name),
    };
    inner.selections = prune_selections(&remote.schema, type_name, &ctx.selection.selections);

    let mut root = inner;
    while let Some(mut outer) = nodes.pop() {
        outer.selections = vec![root];
        root = outer;
    }

    let mut builder = OperationRequest::builder()
        .set_operation(OperationKind::Query, None)
        .set_properties(ctx.operation.properties.clone());

    for name in root.referenced_variables() {
        let value = match bindings.iter().find(|binding| binding.name == name) {
            Some(binding) => binding.resolve(),
            // Variables referenced by spliced selections have no remote
            // argument definition here; forward the local value.
            None => match ctx.operation.variable(&name) {
                Some(value) => value.clone(),
                None => {
                    tracing::debug!(variable = %name, "delegated variable has no local value");
                    Value::Null
                }
            },
        };
        builder = builder.set_variable(name, value);
    }

    Ok(DelegatedQuery {
        request: builder.add_selection(root).build(),
        depth,
    })
}

fn argument_to_path_value(value: &ArgumentValue) -> PathValue {
    match value {
        ArgumentValue::Literal(literal) => PathValue::Literal(literal.clone()),
        ArgumentValue::Variable(name) => PathValue::Variable(name.clone()),
    }
}

/// Keeps only the selections the remote type defines, recursively.
fn prune_selections(schema: &Schema, type_name: &str, selections: &[FieldNode]) -> Vec<FieldNode> {
    let Some(object) = schema.get_object(type_name) else {
        return Vec::new();
    };

    let mut kept = Vec::with_capacity(selections.len());
    for selection in selections {
        if selection.name == "__typename" {
            kept.push(selection.clone());
            continue;
        }
        let Some(field) = object.fields.get(&selection.name) else {
            tracing::debug!(
                field = %selection.name,
                remote_type = %type_name,
                "dropping selection unknown to the remote schema"
            );
            continue;
        };
        let mut node = selection.clone();
        if node.is_composite() {
            node.selections = prune_selections(schema, field.ty.named_type(), &node.selections);
        }
        kept.push(node);
    }
    kept
}
