//! Test fixtures: sample resources and a wired in-memory stack.

use apiforge_catalog::{AccessOperation, AccessRule, Field, FieldKind, Resource};
use apiforge_registry::{MemoryRegistryStore, MemoryResourceProvider};
use std::sync::Arc;

/// Resource set id used by the standard fixtures.
pub const SHOP_SET: &str = "shop-core";

/// A `widgets` resource with identifier and timestamp fields.
///
/// Yields the full five-endpoint CRUD set when analyzed.
pub fn widgets_resource() -> Resource {
    Resource::new(
        "widgets",
        vec![
            Field::new("id", FieldKind::Identifier),
            Field::new("name", FieldKind::String),
            Field::new("created_at", FieldKind::Timestamp),
            Field::new("note", FieldKind::String).nullable(),
        ],
    )
    .with_access_rules(vec![
        AccessRule::new(AccessOperation::Create, "user.role == 'editor'", vec!["editor".into()]),
        AccessRule::new(AccessOperation::Update, "user.role == 'editor'", vec!["editor".into()]),
        AccessRule::new(AccessOperation::Delete, "user.role == 'admin'", vec!["admin".into()]),
    ])
    .with_row_estimate(1200)
}

/// An `orders` resource without an identifier field.
///
/// Yields collection-level endpoints only.
pub fn orders_resource() -> Resource {
    Resource::new(
        "orders",
        vec![
            Field::new("number", FieldKind::Integer),
            Field::new("total", FieldKind::Integer),
            Field::new("paid", FieldKind::Boolean).with_default(serde_json::json!(false)),
        ],
    )
    .with_row_estimate(40)
}

/// An internal audit table that must never be published.
pub fn audit_resource() -> Resource {
    Resource::new(
        "audit_trail",
        vec![
            Field::new("id", FieldKind::Identifier),
            Field::new("entry", FieldKind::Object),
        ],
    )
}

/// A provider pre-loaded with the standard shop resource set.
pub fn seeded_provider() -> Arc<MemoryResourceProvider> {
    let provider = MemoryResourceProvider::new();
    provider.insert_set(SHOP_SET, vec![widgets_resource(), orders_resource()]);
    Arc::new(provider)
}

/// A fresh empty registry store.
pub fn empty_store() -> Arc<MemoryRegistryStore> {
    Arc::new(MemoryRegistryStore::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use apiforge_registry::ResourceProvider;

    #[test]
    fn fixtures_are_well_formed() {
        assert!(widgets_resource().has_identifier());
        assert!(!orders_resource().has_identifier());
        assert!(audit_resource().name.starts_with("audit_"));
    }

    #[test]
    fn seeded_provider_serves_the_set() {
        let provider = seeded_provider();
        let resources = provider.list_resources(SHOP_SET).unwrap();
        assert_eq!(resources.len(), 2);
    }
}
