//! Schema metadata.
//!
//! The executor and the stitching layer consume schema metadata through
//! this module: per field, its declared type, argument definitions, and
//! any attached directives in declaration order. How the metadata is
//! produced (SDL parsing, attribute binding, composition) is the
//! concern of upstream tooling.

use braid_core::OperationKind;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Type reference with GraphQL wrapping semantics.
///
/// A bare `Named` type is nullable; `NonNull` and `List` wrap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeRef {
    Named(String),
    NonNull(Box<TypeRef>),
    List(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn non_null(inner: TypeRef) -> Self {
        Self::NonNull(Box::new(inner))
    }

    pub fn list(inner: TypeRef) -> Self {
        Self::List(Box::new(inner))
    }

    /// Shorthand for a non-null named type.
    pub fn non_null_named(name: impl Into<String>) -> Self {
        Self::non_null(Self::named(name))
    }

    /// Returns true if the outermost wrapper is non-null.
    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNull(_))
    }

    /// Strips one non-null wrapper, if present.
    pub fn nullable(&self) -> &TypeRef {
        match self {
            Self::NonNull(inner) => inner,
            other => other,
        }
    }

    /// Returns the innermost named type.
    pub fn named_type(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::NonNull(inner) | Self::List(inner) => inner.named_type(),
        }
    }

    /// Returns the element type if this (possibly non-null) type is a list.
    pub fn list_item(&self) -> Option<&TypeRef> {
        match self.nullable() {
            Self::List(item) => Some(item),
            _ => None,
        }
    }
}

impl std::fmt::Display for TypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Named(name) => write!(f, "{}", name),
            Self::NonNull(inner) => write!(f, "{}!", inner),
            Self::List(inner) => write!(f, "[{}]", inner),
        }
    }
}

/// A directive attached to a field definition.
///
/// Directives are stored as generic name/argument records; consumers
/// (such as the stitching layer's `delegate` directive) interpret them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDirective {
    pub name: String,
    pub arguments: IndexMap<String, Value>,
}

impl FieldDirective {
    /// Creates a directive with no arguments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: IndexMap::new(),
        }
    }

    /// Adds an argument.
    pub fn with_argument(mut self, name: impl Into<String>, value: Value) -> Self {
        self.arguments.insert(name.into(), value);
        self
    }

    /// Gets an argument value.
    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments.get(name)
    }
}

/// Field definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub description: Option<String>,
    pub ty: TypeRef,
    pub arguments: IndexMap<String, InputFieldDef>,
    /// Attached directives in declaration order.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub directives: Vec<FieldDirective>,
}

impl FieldDef {
    /// Creates a field definition.
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            description: None,
            ty,
            arguments: IndexMap::new(),
            directives: Vec::new(),
        }
    }

    /// Adds an argument definition.
    pub fn with_argument(mut self, arg: InputFieldDef) -> Self {
        self.arguments.insert(arg.name.clone(), arg);
        self
    }

    /// Attaches a directive.
    pub fn with_directive(mut self, directive: FieldDirective) -> Self {
        self.directives.push(directive);
        self
    }

    /// Returns the attached directives with the given name, in
    /// declaration order.
    pub fn directives_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a FieldDirective> {
        self.directives.iter().filter(move |d| d.name == name)
    }
}

/// Input field / argument definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputFieldDef {
    pub name: String,
    pub description: Option<String>,
    pub ty: TypeRef,
    pub default_value: Option<Value>,
}

impl InputFieldDef {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            description: None,
            ty,
            default_value: None,
        }
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }
}

/// Object type definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectDef {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, FieldDef>,
}

impl ObjectDef {
    /// Creates an object type definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: IndexMap::new(),
        }
    }

    /// Adds a field in declaration order.
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }
}

/// Scalar type definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalarDef {
    pub name: String,
    pub description: Option<String>,
}

/// Enum type definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumDef {
    pub name: String,
    pub description: Option<String>,
    pub values: Vec<String>,
}

/// Input object type definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputObjectDef {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, InputFieldDef>,
}

/// A type definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TypeDef {
    Scalar(ScalarDef),
    Object(ObjectDef),
    Enum(EnumDef),
    InputObject(InputObjectDef),
}

impl TypeDef {
    /// Returns the type name.
    pub fn name(&self) -> &str {
        match self {
            Self::Scalar(def) => &def.name,
            Self::Object(def) => &def.name,
            Self::Enum(def) => &def.name,
            Self::InputObject(def) => &def.name,
        }
    }

    /// Returns the object definition if this is an object type.
    pub fn as_object(&self) -> Option<&ObjectDef> {
        match self {
            Self::Object(def) => Some(def),
            _ => None,
        }
    }
}

/// A GraphQL schema.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub query_type: Option<String>,
    pub mutation_type: Option<String>,
    pub subscription_type: Option<String>,
    pub types: IndexMap<String, TypeDef>,
}

impl Schema {
    /// Creates a new empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a type by name.
    pub fn get_type(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }

    /// Gets an object type by name.
    pub fn get_object(&self, name: &str) -> Option<&ObjectDef> {
        self.get_type(name).and_then(TypeDef::as_object)
    }

    /// Gets a field definition by type and field name.
    pub fn get_field(&self, type_name: &str, field_name: &str) -> Option<&FieldDef> {
        self.get_object(type_name)
            .and_then(|obj| obj.fields.get(field_name))
    }

    /// Returns the root type name for the given operation kind.
    pub fn root_type(&self, kind: OperationKind) -> Option<&str> {
        match kind {
            OperationKind::Query => self.query_type.as_deref(),
            OperationKind::Mutation => self.mutation_type.as_deref(),
            OperationKind::Subscription => self.subscription_type.as_deref(),
        }
    }

    /// Returns true if the given type name is one of the root
    /// operation types.
    pub fn is_root_type(&self, name: &str) -> bool {
        [&self.query_type, &self.mutation_type, &self.subscription_type]
            .into_iter()
            .any(|t| t.as_deref() == Some(name))
    }
}

/// Schema builder.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    /// Creates a new schema builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the query root type name.
    pub fn query_type(mut self, name: impl Into<String>) -> Self {
        self.schema.query_type = Some(name.into());
        self
    }

    /// Sets the mutation root type name.
    pub fn mutation_type(mut self, name: impl Into<String>) -> Self {
        self.schema.mutation_type = Some(name.into());
        self
    }

    /// Sets the subscription root type name.
    pub fn subscription_type(mut self, name: impl Into<String>) -> Self {
        self.schema.subscription_type = Some(name.into());
        self
    }

    /// Adds a type definition.
    pub fn add_type(mut self, def: TypeDef) -> Self {
        self.schema.types.insert(def.name().to_string(), def);
        self
    }

    /// Adds an object type definition.
    pub fn add_object(self, def: ObjectDef) -> Self {
        self.add_type(TypeDef::Object(def))
    }

    /// Builds the schema.
    pub fn build(self) -> Schema {
        self.schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_ref_wrapping() {
        let ty = TypeRef::non_null(TypeRef::list(TypeRef::non_null_named("User")));

        assert!(ty.is_non_null());
        assert_eq!(ty.named_type(), "User");
        assert_eq!(ty.to_string(), "[User!]!");

        let item = ty.list_item().unwrap();
        assert!(item.is_non_null());
        assert_eq!(item.named_type(), "User");
    }

    #[test]
    fn test_nullable_strips_one_layer() {
        let ty = TypeRef::non_null_named("ID");
        assert_eq!(ty.nullable(), &TypeRef::named("ID"));
        assert_eq!(TypeRef::named("ID").nullable(), &TypeRef::named("ID"));
    }

    #[test]
    fn test_field_directives_in_declaration_order() {
        let field = FieldDef::new("orders", TypeRef::named("OrderList"))
            .with_directive(
                FieldDirective::new("delegate").with_argument("schema", serde_json::json!("a")),
            )
            .with_directive(
                FieldDirective::new("delegate").with_argument("schema", serde_json::json!("b")),
            )
            .with_directive(FieldDirective::new("deprecated"));

        let schemas: Vec<_> = field
            .directives_named("delegate")
            .map(|d| d.argument("schema").unwrap().as_str().unwrap())
            .collect();
        assert_eq!(schemas, vec!["a", "b"]);
    }

    #[test]
    fn test_schema_lookup() {
        let schema = SchemaBuilder::new()
            .query_type("Query")
            .add_object(
                ObjectDef::new("Query")
                    .with_field(FieldDef::new("user", TypeRef::named("User"))),
            )
            .add_object(
                ObjectDef::new("User")
                    .with_field(FieldDef::new("id", TypeRef::non_null_named("ID"))),
            )
            .build();

        assert_eq!(schema.root_type(OperationKind::Query), Some("Query"));
        assert!(schema.is_root_type("Query"));
        assert!(!schema.is_root_type("User"));
        assert!(schema.get_field("User", "id").unwrap().ty.is_non_null());
        assert!(schema.get_field("User", "missing").is_none());
    }
}
