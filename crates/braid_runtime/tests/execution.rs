//! End-to-end execution tests: ordering, null propagation, scoped
//! context visibility.

use braid_core::{FieldNode, GraphQlError, OperationRequest, Path};
use braid_runtime::{
    AsyncFnResolver, Executor, FieldDef, FnResolver, ObjectDef, ResolverError, ResolverMap,
    Schema, SchemaBuilder, TypeRef,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

fn schema_with_letters() -> Arc<Schema> {
    Arc::new(
        SchemaBuilder::new()
            .query_type("Query")
            .add_object(
                ObjectDef::new("Query")
                    .with_field(FieldDef::new("a", TypeRef::named("String")))
                    .with_field(FieldDef::new("b", TypeRef::named("String")))
                    .with_field(FieldDef::new("c", TypeRef::named("String"))),
            )
            .build(),
    )
}

#[tokio::test]
async fn response_keys_follow_declaration_order_not_completion_order() {
    let mut resolvers = ResolverMap::new();
    // The first-declared field completes last.
    resolvers.register(
        "Query",
        "a",
        AsyncFnResolver::new(|_| async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok(json!("a"))
        }),
    );
    resolvers.register(
        "Query",
        "b",
        AsyncFnResolver::new(|_| async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(json!("b"))
        }),
    );
    resolvers.register("Query", "c", FnResolver::new(|_| Ok(json!("c"))));

    let executor = Executor::new(resolvers);
    let request = OperationRequest::query(vec![
        FieldNode::new("a"),
        FieldNode::new("b"),
        FieldNode::new("c"),
    ]);
    let result = executor.execute(schema_with_letters(), request).await;

    let Some(Value::Object(data)) = result.data else {
        panic!("expected object data");
    };
    let keys: Vec<_> = data.keys().cloned().collect();
    assert_eq!(keys, vec!["a", "b", "c"]);
}

fn nested_schema() -> Arc<Schema> {
    // Query.user is nullable; everything below it is non-null.
    Arc::new(
        SchemaBuilder::new()
            .query_type("Query")
            .add_object(
                ObjectDef::new("Query").with_field(FieldDef::new("user", TypeRef::named("User"))),
            )
            .add_object(
                ObjectDef::new("User")
                    .with_field(FieldDef::new("id", TypeRef::non_null_named("ID")))
                    .with_field(FieldDef::new("profile", TypeRef::non_null_named("Profile"))),
            )
            .add_object(
                ObjectDef::new("Profile")
                    .with_field(FieldDef::new("bio", TypeRef::non_null_named("String"))),
            )
            .build(),
    )
}

#[tokio::test]
async fn null_propagates_to_nearest_nullable_ancestor() {
    let mut resolvers = ResolverMap::new();
    resolvers.register(
        "Query",
        "user",
        FnResolver::new(|_| Ok(json!({"id": "u1", "profile": {}}))),
    );
    // The deeply nested non-null field produces null.
    resolvers.register("Profile", "bio", FnResolver::new(|_| Ok(Value::Null)));

    let executor = Executor::new(resolvers);
    let request = OperationRequest::query(vec![FieldNode::new("user")
        .with_selection(FieldNode::new("id"))
        .with_selection(FieldNode::new("profile").with_selection(FieldNode::new("bio")))]);
    let result = executor.execute(nested_schema(), request).await;

    // The bubble stops at the nullable `user`; its resolved siblings
    // (id) are discarded with it.
    assert_eq!(result.data, Some(json!({"user": null})));

    assert_eq!(result.errors.len(), 1);
    let error = &result.errors[0];
    assert_eq!(
        error.path.as_ref().map(Path::to_string).as_deref(),
        Some("user.profile.bio")
    );
}

#[tokio::test]
async fn resolver_error_on_nullable_field_nulls_only_itself() {
    let mut resolvers = ResolverMap::new();
    resolvers.register(
        "Query",
        "a",
        FnResolver::new(|_| Err(ResolverError::Custom("a broke".into()))),
    );
    resolvers.register("Query", "b", FnResolver::new(|_| Ok(json!("ok"))));
    resolvers.register("Query", "c", FnResolver::new(|_| Ok(json!("fine"))));

    let executor = Executor::new(resolvers);
    let request = OperationRequest::query(vec![
        FieldNode::new("a"),
        FieldNode::new("b"),
        FieldNode::new("c"),
    ]);
    let result = executor.execute(schema_with_letters(), request).await;

    assert_eq!(
        result.data,
        Some(json!({"a": null, "b": "ok", "c": "fine"}))
    );
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].message, "a broke");
}

#[tokio::test]
async fn non_null_root_failure_nulls_data_but_keeps_errors() {
    let schema = Arc::new(
        SchemaBuilder::new()
            .query_type("Query")
            .add_object(
                ObjectDef::new("Query")
                    .with_field(FieldDef::new("required", TypeRef::non_null_named("String")))
                    .with_field(FieldDef::new("other", TypeRef::named("String"))),
            )
            .build(),
    );

    let mut resolvers = ResolverMap::new();
    resolvers.register(
        "Query",
        "required",
        FnResolver::new(|_| Err(ResolverError::Custom("backend down".into()))),
    );
    resolvers.register("Query", "other", FnResolver::new(|_| Ok(json!("done"))));

    let executor = Executor::new(resolvers);
    let request = OperationRequest::query(vec![
        FieldNode::new("required"),
        FieldNode::new("other"),
    ]);
    let result = executor.execute(schema, request).await;

    assert_eq!(result.data, Some(Value::Null));
    assert!(result
        .errors
        .iter()
        .any(|e| e.message == "backend down"));
}

#[tokio::test]
async fn panicking_resolver_on_non_null_root_nulls_data() {
    let schema = Arc::new(
        SchemaBuilder::new()
            .query_type("Query")
            .add_object(
                ObjectDef::new("Query")
                    .with_field(FieldDef::new("required", TypeRef::non_null_named("String"))),
            )
            .build(),
    );

    let mut resolvers = ResolverMap::new();
    resolvers.register(
        "Query",
        "required",
        AsyncFnResolver::new(|_| async { panic!("resolver blew up") }),
    );

    let executor = Executor::new(resolvers);
    let request = OperationRequest::query(vec![FieldNode::new("required")]);
    let result = executor.execute(schema, request).await;

    // A lost task on a non-null field bubbles like a resolver error.
    assert_eq!(result.data, Some(Value::Null));
    assert_eq!(result.errors.len(), 1);
    assert_eq!(
        result.errors[0].path.as_ref().map(Path::to_string).as_deref(),
        Some("required")
    );
}

#[tokio::test]
async fn panicking_resolver_bubbles_to_nearest_nullable_ancestor() {
    let mut resolvers = ResolverMap::new();
    resolvers.register(
        "Query",
        "user",
        FnResolver::new(|_| Ok(json!({"id": "u1"}))),
    );
    resolvers.register(
        "User",
        "id",
        AsyncFnResolver::new(|_| async { panic!("id resolver blew up") }),
    );

    let executor = Executor::new(resolvers);
    let request = OperationRequest::query(vec![
        FieldNode::new("user").with_selection(FieldNode::new("id"))
    ]);
    let result = executor.execute(nested_schema(), request).await;

    // `id` is non-null, so the whole `user` object is discarded.
    assert_eq!(result.data, Some(json!({"user": null})));
    assert_eq!(result.errors.len(), 1);
}

#[tokio::test]
async fn scoped_context_visible_to_descendants_but_not_siblings() {
    let schema = Arc::new(
        SchemaBuilder::new()
            .query_type("Query")
            .add_object(
                ObjectDef::new("Query")
                    .with_field(FieldDef::new("tenant", TypeRef::named("Tenant")))
                    .with_field(FieldDef::new("outside", TypeRef::named("String"))),
            )
            .add_object(
                ObjectDef::new("Tenant")
                    .with_field(FieldDef::new("region", TypeRef::named("String"))),
            )
            .build(),
    );

    let mut resolvers = ResolverMap::new();
    resolvers.register(
        "Query",
        "tenant",
        AsyncFnResolver::new(|ctx| async move {
            ctx.execution
                .modify_scoped_context(&ctx.path, |scoped| {
                    scoped.child_with("region", json!("eu-west"))
                })
                .await;
            Ok(json!({}))
        }),
    );
    resolvers.register(
        "Tenant",
        "region",
        AsyncFnResolver::new(|ctx| async move {
            Ok(ctx.scoped_value("region").await.unwrap_or(Value::Null))
        }),
    );
    resolvers.register(
        "Query",
        "outside",
        AsyncFnResolver::new(|ctx| async move {
            // A sibling subtree must not observe the tenant's data.
            match ctx.scoped_value("region").await {
                Some(_) => Err(ResolverError::Custom("leaked scoped data".into())),
                None => Ok(json!("isolated")),
            }
        }),
    );

    let executor = Executor::new(resolvers);
    let request = OperationRequest::query(vec![
        FieldNode::new("tenant").with_selection(FieldNode::new("region")),
        FieldNode::new("outside"),
    ]);
    let result = executor.execute(schema, request).await;

    assert!(result.errors.is_empty(), "errors: {:?}", result.errors);
    assert_eq!(
        result.data,
        Some(json!({"tenant": {"region": "eu-west"}, "outside": "isolated"}))
    );
}

#[tokio::test]
async fn mutation_roots_run_serially_in_declaration_order() {
    let schema = Arc::new(
        SchemaBuilder::new()
            .query_type("Query")
            .mutation_type("Mutation")
            .add_object(ObjectDef::new("Query"))
            .add_object(
                ObjectDef::new("Mutation")
                    .with_field(FieldDef::new("first", TypeRef::named("String")))
                    .with_field(FieldDef::new("second", TypeRef::named("String")))
                    .with_field(FieldDef::new("third", TypeRef::named("String"))),
            )
            .build(),
    );

    let log = Arc::new(std::sync::Mutex::new(Vec::<String>::new()));
    let mut resolvers = ResolverMap::new();
    for (name, delay) in [("first", 30u64), ("second", 10), ("third", 0)] {
        let log = Arc::clone(&log);
        resolvers.register(
            "Mutation",
            name,
            AsyncFnResolver::new(move |ctx| {
                let log = Arc::clone(&log);
                async move {
                    // The slowest mutation is declared first; only
                    // serial execution keeps the log in declaration
                    // order.
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    log.lock().unwrap().push(ctx.selection.name.clone());
                    Ok(json!("done"))
                }
            }),
        );
    }

    let executor = Executor::new(resolvers);
    let request = braid_core::OperationRequest::builder()
        .set_operation(braid_core::OperationKind::Mutation, None)
        .add_selection(FieldNode::new("first"))
        .add_selection(FieldNode::new("second"))
        .add_selection(FieldNode::new("third"))
        .build();
    let result = executor.execute(schema, request).await;

    assert!(result.errors.is_empty(), "errors: {:?}", result.errors);
    assert_eq!(
        *log.lock().unwrap(),
        vec!["first".to_string(), "second".to_string(), "third".to_string()]
    );
}

#[tokio::test]
async fn list_elements_complete_in_order() {
    let schema = Arc::new(
        SchemaBuilder::new()
            .query_type("Query")
            .add_object(ObjectDef::new("Query").with_field(FieldDef::new(
                "orders",
                TypeRef::list(TypeRef::named("Order")),
            )))
            .add_object(
                ObjectDef::new("Order")
                    .with_field(FieldDef::new("total", TypeRef::named("Int"))),
            )
            .build(),
    );

    let mut resolvers = ResolverMap::new();
    resolvers.register(
        "Query",
        "orders",
        FnResolver::new(|_| Ok(json!([{"total": 1}, {"total": 2}, {"total": 3}]))),
    );

    let executor = Executor::new(resolvers);
    let request = OperationRequest::query(vec![
        FieldNode::new("orders").with_selection(FieldNode::new("total"))
    ]);
    let result = executor.execute(schema, request).await;

    assert_eq!(
        result.data,
        Some(json!({"orders": [{"total": 1}, {"total": 2}, {"total": 3}]}))
    );
}

#[tokio::test]
async fn errors_carry_list_index_in_path() {
    let schema = Arc::new(
        SchemaBuilder::new()
            .query_type("Query")
            .add_object(ObjectDef::new("Query").with_field(FieldDef::new(
                "orders",
                TypeRef::list(TypeRef::named("Order")),
            )))
            .add_object(
                ObjectDef::new("Order")
                    .with_field(FieldDef::new("total", TypeRef::non_null_named("Int"))),
            )
            .build(),
    );

    let mut resolvers = ResolverMap::new();
    resolvers.register(
        "Query",
        "orders",
        FnResolver::new(|_| Ok(json!([{"total": 1}, {"total": null}]))),
    );

    let executor = Executor::new(resolvers);
    let request = OperationRequest::query(vec![
        FieldNode::new("orders").with_selection(FieldNode::new("total"))
    ]);
    let result = executor.execute(schema, request).await;

    // The element type is nullable, so the bubble from `total` stops
    // at the element.
    assert_eq!(result.data, Some(json!({"orders": [{"total": 1}, null]})));
    assert_eq!(
        result.errors[0].path.as_ref().map(Path::to_string).as_deref(),
        Some("orders[1].total")
    );
}

#[tokio::test]
async fn reported_errors_are_never_dropped() {
    let mut resolvers = ResolverMap::new();
    resolvers.register(
        "Query",
        "a",
        AsyncFnResolver::new(|ctx| async move {
            ctx.report_error(GraphQlError::new("advisory")).await;
            Ok(json!("with warning"))
        }),
    );
    resolvers.register("Query", "b", FnResolver::new(|_| Ok(json!("b"))));
    resolvers.register("Query", "c", FnResolver::new(|_| Ok(json!("c"))));

    let executor = Executor::new(resolvers);
    let request = OperationRequest::query(vec![FieldNode::new("a"), FieldNode::new("b")]);
    let result = executor.execute(schema_with_letters(), request).await;

    assert_eq!(
        result.data,
        Some(json!({"a": "with warning", "b": "b"}))
    );
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].message, "advisory");
}
