//! Property tests for derivation determinism.

use apiforge_analyzer::{AlignmentContext, SchemaAnalyzer};
use apiforge_testkit::generators::resource_strategy;
use proptest::prelude::*;

proptest! {
    #[test]
    fn analysis_is_deterministic(resource in resource_strategy()) {
        let analyzer = SchemaAnalyzer::new();
        let context = AlignmentContext::registered();

        let first = analyzer.analyze(&resource, context).unwrap();
        let second = analyzer.analyze(&resource, context).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn endpoint_count_follows_identifier(resource in resource_strategy()) {
        let analyzer = SchemaAnalyzer::new();
        let endpoints = analyzer.derive_endpoints(&resource).unwrap();

        if resource.has_identifier() {
            prop_assert_eq!(endpoints.len(), 5);
        } else {
            prop_assert_eq!(endpoints.len(), 2);
        }
    }

    #[test]
    fn write_schemas_never_expose_server_assigned_fields(resource in resource_strategy()) {
        let analyzer = SchemaAnalyzer::new();
        let endpoints = analyzer.derive_endpoints(&resource).unwrap();

        for endpoint in endpoints {
            let Some(schema) = endpoint.request_schema else {
                continue;
            };
            let properties = schema["properties"].as_object().unwrap();
            for field in &resource.fields {
                if field.kind.is_server_assigned() {
                    prop_assert!(!properties.contains_key(&field.name));
                }
            }
        }
    }
}
