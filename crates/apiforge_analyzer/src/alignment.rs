//! Alignment reports.

use serde_json::json;

/// Score below which a resource should be flagged for attention.
pub const ATTENTION_THRESHOLD: f64 = 0.7;

/// Registry-side facts the analyzer cannot derive from a resource alone.
///
/// Supplied by the caller: the sync orchestrator fills it from the
/// registry store, standalone callers default it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlignmentContext {
    /// A registry record exists for the resource's set.
    pub is_registered: bool,
    /// Field mappings to the external representation exist.
    pub has_mappings: bool,
}

impl AlignmentContext {
    /// Context for a resource set that is fully wired into the registry.
    pub fn registered() -> Self {
        Self {
            is_registered: true,
            has_mappings: true,
        }
    }
}

/// Per-resource diagnostic: how completely the supporting artifacts exist.
///
/// Computed fresh on each analysis; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentReport {
    /// The resource has at least one field.
    pub has_type_definition: bool,
    /// A registry record exists for the resource's set.
    pub is_registered: bool,
    /// The resource has access rules.
    pub has_access_rules: bool,
    /// Endpoints were derived.
    pub has_endpoints: bool,
    /// Field mappings exist.
    pub has_mappings: bool,
    /// Fraction of checks that passed, 0–1.
    pub score: f64,
    /// Ordered remediation suggestions, one per failed check.
    pub suggestions: Vec<String>,
}

impl AlignmentReport {
    /// Builds a report from the five checks, deriving score and
    /// suggestions.
    pub fn from_checks(
        resource_name: &str,
        has_type_definition: bool,
        is_registered: bool,
        has_access_rules: bool,
        has_endpoints: bool,
        has_mappings: bool,
    ) -> Self {
        let checks = [
            (
                has_type_definition,
                format!("define fields for {resource_name}"),
            ),
            (
                is_registered,
                format!("register {resource_name} in the external registry"),
            ),
            (
                has_access_rules,
                format!("add access rules for {resource_name}"),
            ),
            (
                has_endpoints,
                format!("generate endpoints for {resource_name}"),
            ),
            (
                has_mappings,
                format!("map {resource_name} fields to the external representation"),
            ),
        ];

        let passed = checks.iter().filter(|(ok, _)| *ok).count();
        let suggestions = checks
            .iter()
            .filter(|(ok, _)| !ok)
            .map(|(_, s)| s.clone())
            .collect();

        Self {
            has_type_definition,
            is_registered,
            has_access_rules,
            has_endpoints,
            has_mappings,
            score: passed as f64 / checks.len() as f64,
            suggestions,
        }
    }

    /// Returns true when the score signals that downstream generation
    /// should be offered. A signal, not an error.
    pub fn needs_attention(&self) -> bool {
        self.score < ATTENTION_THRESHOLD
    }

    /// Renders the report as a JSON value for diagnostics output.
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "has_type_definition": self.has_type_definition,
            "is_registered": self.is_registered,
            "has_access_rules": self.has_access_rules,
            "has_endpoints": self.has_endpoints,
            "has_mappings": self.has_mappings,
            "score": self.score,
            "suggestions": self.suggestions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_alignment_scores_one() {
        let report = AlignmentReport::from_checks("widgets", true, true, true, true, true);
        assert_eq!(report.score, 1.0);
        assert!(report.suggestions.is_empty());
        assert!(!report.needs_attention());
    }

    #[test]
    fn each_failed_check_adds_a_suggestion() {
        let report = AlignmentReport::from_checks("widgets", true, false, false, true, false);
        assert_eq!(report.score, 0.4);
        assert_eq!(report.suggestions.len(), 3);
        assert!(report.needs_attention());
        // Suggestions keep check order.
        assert!(report.suggestions[0].contains("register"));
        assert!(report.suggestions[1].contains("access rules"));
        assert!(report.suggestions[2].contains("map"));
    }

    #[test]
    fn threshold_boundary() {
        // 4/5 = 0.8 passes, 3/5 = 0.6 does not.
        let ok = AlignmentReport::from_checks("w", true, true, true, true, false);
        assert!(!ok.needs_attention());

        let low = AlignmentReport::from_checks("w", true, true, true, false, false);
        assert!(low.needs_attention());
    }
}
