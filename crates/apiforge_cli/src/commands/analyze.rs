//! Analyze command implementation.

use super::ResourceSetFile;
use apiforge_analyzer::{AlignmentContext, SchemaAnalyzer};
use serde::Serialize;
use std::path::Path;

/// Analysis output for one resource set.
#[derive(Debug, Serialize)]
pub struct AnalyzeResult {
    /// Resource set id.
    pub resource_set_id: String,
    /// Per-resource analyses.
    pub resources: Vec<ResourceAnalysis>,
}

/// Analysis output for one resource.
#[derive(Debug, Serialize)]
pub struct ResourceAnalysis {
    /// Resource name.
    pub name: String,
    /// The resource is internal and skipped.
    pub excluded: bool,
    /// Derived endpoints.
    pub endpoints: Vec<EndpointSummary>,
    /// Alignment diagnostic.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alignment: Option<serde_json::Value>,
}

/// One derived endpoint, summarized.
#[derive(Debug, Serialize)]
pub struct EndpointSummary {
    /// HTTP method.
    pub method: String,
    /// Path template.
    pub path: String,
    /// Summary line.
    pub summary: String,
    /// Authentication required.
    pub requires_auth: bool,
}

/// Runs the analyze command.
pub fn run(file: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let set = ResourceSetFile::load(file)?;
    let analyzer = SchemaAnalyzer::new();

    let mut result = AnalyzeResult {
        resource_set_id: set.resource_set_id.clone(),
        resources: Vec::new(),
    };

    for resource in &set.resources {
        if !analyzer.is_published_resource(&resource.name) {
            result.resources.push(ResourceAnalysis {
                name: resource.name.clone(),
                excluded: true,
                endpoints: Vec::new(),
                alignment: None,
            });
            continue;
        }

        let analysis = analyzer.analyze(resource, AlignmentContext::default())?;
        result.resources.push(ResourceAnalysis {
            name: resource.name.clone(),
            excluded: false,
            endpoints: analysis
                .endpoints
                .iter()
                .map(|e| EndpointSummary {
                    method: e.method.to_string(),
                    path: e.path.clone(),
                    summary: e.summary.clone(),
                    requires_auth: e.requires_auth,
                })
                .collect(),
            alignment: Some(analysis.report.to_json()),
        });
    }

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn print_text_output(result: &AnalyzeResult) {
    println!("Resource set: {}", result.resource_set_id);
    println!();

    for resource in &result.resources {
        if resource.excluded {
            println!("{} (internal, skipped)", resource.name);
            println!();
            continue;
        }

        println!("{}", resource.name);
        for endpoint in &resource.endpoints {
            let auth = if endpoint.requires_auth { " [auth]" } else { "" };
            println!("  {:6} {}{}", endpoint.method, endpoint.path, auth);
        }
        if let Some(alignment) = &resource.alignment {
            if let Some(score) = alignment.get("score").and_then(|v| v.as_f64()) {
                println!("  alignment score: {score:.1}");
            }
            if let Some(suggestions) = alignment.get("suggestions").and_then(|v| v.as_array()) {
                for suggestion in suggestions {
                    if let Some(text) = suggestion.as_str() {
                        println!("  suggestion: {text}");
                    }
                }
            }
        }
        println!();
    }
}
