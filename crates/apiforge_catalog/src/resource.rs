//! Internal resource definitions.

use serde::{Deserialize, Serialize};

/// The primitive kind of a resource field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Free-form text.
    String,
    /// Integer or numeric value.
    Integer,
    /// Boolean flag.
    Boolean,
    /// Nested JSON object.
    Object,
    /// Point in time.
    Timestamp,
    /// Unique identifier assigned by the store.
    Identifier,
}

impl FieldKind {
    /// Returns true if values of this kind are assigned by the store
    /// rather than supplied by clients.
    pub fn is_server_assigned(&self) -> bool {
        matches!(self, FieldKind::Identifier | FieldKind::Timestamp)
    }
}

/// A single field of a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Field name.
    pub name: String,
    /// Primitive kind.
    pub kind: FieldKind,
    /// Whether the field accepts null values.
    #[serde(default)]
    pub nullable: bool,
    /// Default value, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

impl Field {
    /// Creates a non-nullable field with no default.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: false,
            default: None,
        }
    }

    /// Marks the field as nullable.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Sets the default value.
    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// The operation an access rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessOperation {
    /// List the collection.
    List,
    /// Fetch a single entity by id.
    Get,
    /// Create a new entity.
    Create,
    /// Update an existing entity.
    Update,
    /// Delete an entity.
    Delete,
}

/// An access rule mapping an operation to a predicate and allowed roles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessRule {
    /// Operation the rule applies to.
    pub operation: AccessOperation,
    /// Predicate expression evaluated by the enclosing store.
    pub predicate: String,
    /// Roles permitted when the predicate holds.
    pub roles: Vec<String>,
}

impl AccessRule {
    /// Creates a new access rule.
    pub fn new(
        operation: AccessOperation,
        predicate: impl Into<String>,
        roles: Vec<String>,
    ) -> Self {
        Self {
            operation,
            predicate: predicate.into(),
            roles,
        }
    }
}

/// An internal entity definition used as the source of truth.
///
/// Resources are produced by introspecting the internal store and are
/// immutable within one sync cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource name (also the collection path segment).
    pub name: String,
    /// Ordered field list.
    pub fields: Vec<Field>,
    /// Access rules, possibly empty.
    #[serde(default)]
    pub access_rules: Vec<AccessRule>,
    /// Estimated row count in the internal store.
    #[serde(default)]
    pub row_estimate: u64,
}

impl Resource {
    /// Creates a resource with the given name and fields.
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            fields,
            access_rules: Vec::new(),
            row_estimate: 0,
        }
    }

    /// Adds access rules.
    pub fn with_access_rules(mut self, rules: Vec<AccessRule>) -> Self {
        self.access_rules = rules;
        self
    }

    /// Sets the row-count estimate.
    pub fn with_row_estimate(mut self, estimate: u64) -> Self {
        self.row_estimate = estimate;
        self
    }

    /// Returns the identifier field, if the resource has one.
    pub fn identifier_field(&self) -> Option<&Field> {
        self.fields.iter().find(|f| f.kind == FieldKind::Identifier)
    }

    /// Returns true if the resource has an identifier field.
    pub fn has_identifier(&self) -> bool {
        self.identifier_field().is_some()
    }

    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns true if any access rule covers the given operation.
    pub fn has_rule_for(&self, operation: AccessOperation) -> bool {
        self.access_rules.iter().any(|r| r.operation == operation)
    }
}
