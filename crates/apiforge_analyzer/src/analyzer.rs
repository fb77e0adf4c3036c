//! The schema analyzer.

use crate::alignment::{AlignmentContext, AlignmentReport};
use crate::derive;
use crate::error::{AnalyzerError, AnalyzerResult};
use apiforge_catalog::{EndpointSpec, Resource};

/// Configuration for the schema analyzer.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Name prefixes marking internal tables that are never published.
    pub excluded_prefixes: Vec<String>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            excluded_prefixes: vec!["sys_".into(), "audit_".into(), "_".into()],
        }
    }
}

/// The result of analyzing one resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    /// The derived endpoint set.
    pub endpoints: Vec<EndpointSpec>,
    /// The alignment diagnostic.
    pub report: AlignmentReport,
}

/// Derives endpoint specifications and alignment reports from resource
/// definitions.
///
/// Analysis is a pure function of its inputs: the same resource and
/// context always produce the same output.
#[derive(Debug, Clone, Default)]
pub struct SchemaAnalyzer {
    config: AnalyzerConfig,
}

impl SchemaAnalyzer {
    /// Creates an analyzer with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an analyzer with a custom configuration.
    pub fn with_config(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    /// Returns true if the resource name is eligible for publication.
    pub fn is_published_resource(&self, name: &str) -> bool {
        !self
            .config
            .excluded_prefixes
            .iter()
            .any(|p| name.starts_with(p.as_str()))
    }

    /// Derives the endpoint set for a resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource is internal (excluded prefix) or
    /// has no fields.
    pub fn derive_endpoints(&self, resource: &Resource) -> AnalyzerResult<Vec<EndpointSpec>> {
        if !self.is_published_resource(&resource.name) {
            return Err(AnalyzerError::excluded(&resource.name));
        }
        if resource.fields.is_empty() {
            return Err(AnalyzerError::empty(&resource.name));
        }
        Ok(derive::derive_endpoints(resource))
    }

    /// Analyzes a resource: derives endpoints and computes the alignment
    /// report in one pass.
    pub fn analyze(
        &self,
        resource: &Resource,
        context: AlignmentContext,
    ) -> AnalyzerResult<Analysis> {
        let endpoints = self.derive_endpoints(resource)?;
        let report = AlignmentReport::from_checks(
            &resource.name,
            !resource.fields.is_empty(),
            context.is_registered,
            !resource.access_rules.is_empty(),
            !endpoints.is_empty(),
            context.has_mappings,
        );
        Ok(Analysis { endpoints, report })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apiforge_catalog::{Field, FieldKind};

    fn widgets() -> Resource {
        Resource::new(
            "widgets",
            vec![
                Field::new("id", FieldKind::Identifier),
                Field::new("name", FieldKind::String),
            ],
        )
    }

    #[test]
    fn excluded_prefixes_rejected() {
        let analyzer = SchemaAnalyzer::new();

        for name in ["sys_meta", "audit_log", "_migrations"] {
            let resource = Resource::new(name, vec![Field::new("id", FieldKind::Identifier)]);
            assert!(matches!(
                analyzer.derive_endpoints(&resource),
                Err(AnalyzerError::ExcludedResource { .. })
            ));
            assert!(!analyzer.is_published_resource(name));
        }

        assert!(analyzer.is_published_resource("widgets"));
    }

    #[test]
    fn empty_resource_rejected() {
        let analyzer = SchemaAnalyzer::new();
        let resource = Resource::new("widgets", vec![]);
        assert!(matches!(
            analyzer.derive_endpoints(&resource),
            Err(AnalyzerError::EmptyResource { .. })
        ));
    }

    #[test]
    fn custom_prefixes() {
        let analyzer = SchemaAnalyzer::with_config(AnalyzerConfig {
            excluded_prefixes: vec!["tmp_".into()],
        });
        assert!(!analyzer.is_published_resource("tmp_scratch"));
        assert!(analyzer.is_published_resource("sys_meta"));
    }

    #[test]
    fn analysis_is_deterministic() {
        let analyzer = SchemaAnalyzer::new();
        let resource = widgets();

        let first = analyzer.analyze(&resource, AlignmentContext::registered()).unwrap();
        let second = analyzer.analyze(&resource, AlignmentContext::registered()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn analysis_report_reflects_resource() {
        let analyzer = SchemaAnalyzer::new();
        let analysis = analyzer
            .analyze(&widgets(), AlignmentContext::default())
            .unwrap();

        assert_eq!(analysis.endpoints.len(), 5);
        assert!(analysis.report.has_type_definition);
        assert!(analysis.report.has_endpoints);
        assert!(!analysis.report.is_registered);
        assert!(!analysis.report.has_access_rules);
        assert_eq!(analysis.report.score, 0.4);
        assert!(analysis.report.needs_attention());
    }
}
