//! Per-request execution state.
//!
//! The `ExecutionContext` is the only state shared by concurrent
//! resolver tasks: an append-only error list, the scoped context data
//! chain, and the in-progress result tree. Scoped context data is
//! copy-on-write per descent, so it needs no locking on the read path
//! once a snapshot has been taken.

use braid_core::{GraphQlError, OperationRequest, Path};
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Copy-on-write, path-local key/value data.
///
/// A scoped context is an overlay map plus a parent pointer; lookups
/// walk child-to-root. Descending with [`child_with`](Self::child_with)
/// snapshots the chain: mutations never affect sibling or ancestor
/// contexts.
#[derive(Debug, Default)]
pub struct ScopedContext {
    parent: Option<Arc<ScopedContext>>,
    data: FxHashMap<String, Value>,
}

impl ScopedContext {
    /// Creates an empty root context.
    pub fn root() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Gets a value, searching this overlay first, then ancestors.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self.data.get(key) {
            Some(value) => Some(value),
            None => self.parent.as_ref().and_then(|p| p.get(key)),
        }
    }

    /// Returns true if the key is visible from this context.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Creates a child context with one additional entry.
    pub fn child_with(self: &Arc<Self>, key: impl Into<String>, value: Value) -> Arc<Self> {
        let mut data = FxHashMap::default();
        data.insert(key.into(), value);
        Arc::new(Self {
            parent: Some(Arc::clone(self)),
            data,
        })
    }

    /// Creates a child context overlaying all given entries.
    pub fn child_from(
        self: &Arc<Self>,
        entries: impl IntoIterator<Item = (String, Value)>,
    ) -> Arc<Self> {
        Arc::new(Self {
            parent: Some(Arc::clone(self)),
            data: entries.into_iter().collect(),
        })
    }

    /// Flattens the visible entries into one map (overlays win).
    pub fn flatten(&self) -> HashMap<String, Value> {
        let mut merged = match &self.parent {
            Some(parent) => parent.flatten(),
            None => HashMap::new(),
        };
        for (key, value) in &self.data {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }
}

/// Shared per-request state for all resolver tasks.
#[derive(Debug)]
pub struct ExecutionContext {
    errors: RwLock<Vec<GraphQlError>>,
    scoped: RwLock<FxHashMap<Path, Arc<ScopedContext>>>,
    scoped_root: Arc<ScopedContext>,
    result: RwLock<Value>,
    variables: HashMap<String, Value>,
    properties: HashMap<String, Value>,
}

impl ExecutionContext {
    /// Creates the context for one request.
    pub fn new(request: &OperationRequest) -> Self {
        Self {
            errors: RwLock::new(Vec::new()),
            scoped: RwLock::new(FxHashMap::default()),
            scoped_root: ScopedContext::root(),
            result: RwLock::new(Value::Null),
            variables: request.variables.clone(),
            properties: request.properties.clone(),
        }
    }

    /// Appends an error to the request's error list.
    pub async fn report_error(&self, error: GraphQlError) {
        tracing::debug!(message = %error.message, path = ?error.path, "field error reported");
        self.errors.write().await.push(error);
    }

    /// Returns a snapshot of the errors reported so far, in completion
    /// order.
    pub async fn errors(&self) -> Vec<GraphQlError> {
        self.errors.read().await.clone()
    }

    /// Gets a request variable by name.
    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Returns all request variables.
    pub fn variables(&self) -> &HashMap<String, Value> {
        &self.variables
    }

    /// Gets a request-level context property by name.
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Returns all request-level context properties.
    pub fn properties(&self) -> &HashMap<String, Value> {
        &self.properties
    }

    /// Returns the scoped context visible at `path`: the snapshot
    /// installed at the nearest ancestor, or the empty root.
    pub async fn scoped_at(&self, path: &Path) -> Arc<ScopedContext> {
        let scoped = self.scoped.read().await;
        Self::nearest(&scoped, path).unwrap_or_else(|| Arc::clone(&self.scoped_root))
    }

    /// Installs a new scoped-context snapshot for `path` and its
    /// descendants, produced by `transform` from the snapshot currently
    /// visible there. Ancestor and sibling snapshots are untouched.
    pub async fn modify_scoped_context<F>(&self, path: &Path, transform: F)
    where
        F: FnOnce(Arc<ScopedContext>) -> Arc<ScopedContext>,
    {
        let mut scoped = self.scoped.write().await;
        let current =
            Self::nearest(&scoped, path).unwrap_or_else(|| Arc::clone(&self.scoped_root));
        scoped.insert(path.clone(), transform(current));
    }

    fn nearest(
        scoped: &FxHashMap<Path, Arc<ScopedContext>>,
        path: &Path,
    ) -> Option<Arc<ScopedContext>> {
        let mut probe = Some(path.clone());
        while let Some(p) = probe {
            if let Some(ctx) = scoped.get(&p) {
                return Some(Arc::clone(ctx));
            }
            probe = p.parent();
        }
        None
    }

    /// Writes a resolved value into the result tree at `path`,
    /// creating intermediate objects and list slots as needed.
    pub async fn set_result(&self, path: &Path, value: Value) {
        let mut result = self.result.write().await;
        Self::write_at(&mut result, path.segments(), value);
    }

    /// Takes the buffered result tree, leaving `Null` behind.
    pub async fn take_data(&self) -> Value {
        std::mem::take(&mut *self.result.write().await)
    }

    fn write_at(target: &mut Value, segments: &[braid_core::PathSegment], value: Value) {
        use braid_core::PathSegment;

        let Some((head, rest)) = segments.split_first() else {
            *target = value;
            return;
        };

        match head {
            PathSegment::Field(name) => {
                if !target.is_object() {
                    *target = Value::Object(serde_json::Map::new());
                }
                if let Value::Object(map) = target {
                    let slot = map.entry(name.clone()).or_insert(Value::Null);
                    Self::write_at(slot, rest, value);
                }
            }
            PathSegment::Index(index) => {
                if !target.is_array() {
                    *target = Value::Array(Vec::new());
                }
                if let Value::Array(list) = target {
                    while list.len() <= *index {
                        list.push(Value::Null);
                    }
                    Self::write_at(&mut list[*index], rest, value);
                }
            }
        }
    }
}
