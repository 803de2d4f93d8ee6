//! Result merging and null propagation.
//!
//! GraphQL's partial-failure rule: a failed or null value for a
//! non-null field nulls the nearest ancestor whose declared type is
//! nullable, discarding sibling values under that ancestor. A failed
//! nullable field nulls only itself. Objects emit their fields in
//! declaration order regardless of completion order.

use crate::schema::TypeRef;
use serde_json::Value;
use std::collections::HashMap;

/// The outcome of completing one field against its declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldCompletion {
    /// A final value for the field.
    Resolved(Value),

    /// A non-null position produced null; the nullification must
    /// propagate upward until a nullable ancestor absorbs it.
    Bubble,
}

impl FieldCompletion {
    /// Returns true if this completion is still bubbling.
    pub fn is_bubble(&self) -> bool {
        matches!(self, Self::Bubble)
    }

    /// Resolves the completion at a nullable boundary: a bubble is
    /// absorbed into `null`.
    pub fn absorb(self) -> Value {
        match self {
            Self::Resolved(value) => value,
            Self::Bubble => Value::Null,
        }
    }
}

/// Applies the declared type's nullability to an inner completion.
///
/// At a non-null position a null (or bubbling) inner value keeps
/// bubbling; at a nullable position it is absorbed into `null`.
pub fn apply_nullability(declared: &TypeRef, inner: FieldCompletion) -> FieldCompletion {
    if declared.is_non_null() {
        match inner {
            FieldCompletion::Resolved(Value::Null) | FieldCompletion::Bubble => {
                FieldCompletion::Bubble
            }
            resolved => resolved,
        }
    } else {
        FieldCompletion::Resolved(inner.absorb())
    }
}

/// Assembles an object's fields in declaration order.
///
/// `completions` is keyed by response key and may have been filled in
/// any completion order. A bubbling child discards the whole object
/// (all sibling values under it) and bubbles further; the enclosing
/// declared type decides where the bubble stops.
pub fn assemble_object(
    declared_keys: &[String],
    mut completions: HashMap<String, FieldCompletion>,
) -> FieldCompletion {
    let mut object = serde_json::Map::with_capacity(declared_keys.len());
    for key in declared_keys {
        match completions.remove(key) {
            Some(FieldCompletion::Resolved(value)) => {
                object.insert(key.clone(), value);
            }
            Some(FieldCompletion::Bubble) => return FieldCompletion::Bubble,
            // A missing completion means the field task was lost
            // (e.g. panicked before producing an outcome); emit null.
            None => {
                object.insert(key.clone(), Value::Null);
            }
        }
    }
    FieldCompletion::Resolved(Value::Object(object))
}

/// Assembles a list from element completions, in element order.
///
/// Elements are expected to have been completed against the element
/// type already, so a remaining bubble means a non-null element failed:
/// the whole list is discarded and the bubble continues outward.
pub fn assemble_list(items: Vec<FieldCompletion>) -> FieldCompletion {
    let mut values = Vec::with_capacity(items.len());
    for item in items {
        match item {
            FieldCompletion::Resolved(value) => values.push(value),
            FieldCompletion::Bubble => return FieldCompletion::Bubble,
        }
    }
    FieldCompletion::Resolved(Value::Array(values))
}
