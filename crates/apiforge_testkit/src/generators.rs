//! Property-based test generators using proptest.
//!
//! Strategies generate resources that satisfy the catalog's structural
//! invariants: publishable names, non-empty unique field lists.

use apiforge_catalog::{Field, FieldKind, Resource};
use proptest::prelude::*;

/// Strategy for publishable resource names (no internal prefixes).
pub fn resource_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9]{2,15}")
        .expect("Invalid regex")
        .prop_filter("Name must not use an internal prefix", |s| {
            !s.starts_with("sys_") && !s.starts_with("audit_") && !s.starts_with('_')
        })
}

/// Strategy for field names.
pub fn field_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,11}").expect("Invalid regex")
}

/// Strategy for field kinds.
pub fn field_kind_strategy() -> impl Strategy<Value = FieldKind> {
    prop_oneof![
        Just(FieldKind::String),
        Just(FieldKind::Integer),
        Just(FieldKind::Boolean),
        Just(FieldKind::Object),
        Just(FieldKind::Timestamp),
        Just(FieldKind::Identifier),
    ]
}

/// Strategy for a single field.
pub fn field_strategy() -> impl Strategy<Value = Field> {
    (field_name_strategy(), field_kind_strategy(), any::<bool>()).prop_map(
        |(name, kind, nullable)| {
            let field = Field::new(name, kind);
            if nullable {
                field.nullable()
            } else {
                field
            }
        },
    )
}

/// Strategy for a resource with 1–8 uniquely named fields.
pub fn resource_strategy() -> impl Strategy<Value = Resource> {
    (
        resource_name_strategy(),
        prop::collection::vec(field_strategy(), 1..8),
        0u64..100_000,
    )
        .prop_map(|(name, mut fields, rows)| {
            fields.sort_by(|a, b| a.name.cmp(&b.name));
            fields.dedup_by(|a, b| a.name == b.name);
            Resource::new(name, fields).with_row_estimate(rows)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn generated_resources_are_publishable(resource in resource_strategy()) {
            prop_assert!(!resource.fields.is_empty());
            prop_assert!(!resource.name.starts_with('_'));

            let mut names: Vec<&str> =
                resource.fields.iter().map(|f| f.name.as_str()).collect();
            names.sort_unstable();
            names.dedup();
            prop_assert_eq!(names.len(), resource.fields.len());
        }
    }
}
