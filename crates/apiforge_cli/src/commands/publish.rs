//! Publish command implementation.

use super::{load_registry, save_registry, ResourceSetFile};
use apiforge_registry::{MemoryResourceProvider, RegistryStore};
use apiforge_sync::{PublishConfig, SyncOrchestrator};
use apiforge_workflow::PublishingWorkflow;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// The outcome of a publish run.
#[derive(Debug, Serialize)]
pub struct PublishResult {
    /// Resource set id.
    pub resource_set_id: String,
    /// Registry record id.
    pub record_id: String,
    /// Final record status.
    pub status: String,
    /// Endpoints published.
    pub endpoints: usize,
    /// Final workflow message.
    pub message: String,
    /// Legal next actions.
    pub next_actions: Vec<String>,
}

/// Runs the publish command: draft → review → publish over an in-memory
/// stack seeded from the resource file and registry snapshot.
pub fn run(
    file: &Path,
    registry: Option<&Path>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let set = ResourceSetFile::load(file)?;
    tracing::info!(
        resource_set_id = %set.resource_set_id,
        resources = set.resources.len(),
        "loaded resource definitions"
    );

    let provider = Arc::new(MemoryResourceProvider::new());
    provider.insert_set(set.resource_set_id.clone(), set.resources.clone());

    let store = Arc::new(match registry {
        Some(path) => load_registry(path)?,
        None => Default::default(),
    });

    let orchestrator = Arc::new(SyncOrchestrator::new(
        provider,
        Arc::clone(&store) as Arc<dyn RegistryStore>,
    ));
    let workflow = PublishingWorkflow::new(
        Arc::clone(&store) as Arc<dyn RegistryStore>,
        orchestrator,
    );

    let mut config = PublishConfig::new();
    if let Some(name) = &set.display_name {
        config = config.with_display_name(name);
    }
    if let Some(version) = &set.version {
        config = config.with_version(version);
    }

    workflow
        .create_draft(&set.resource_set_id, &config)
        .into_result()?;
    let record = store
        .find_by_resource_set(&set.resource_set_id)?
        .ok_or("draft record missing after creation")?;

    workflow.move_to_review(record.id).into_result()?;
    let published = workflow.publish(record.id).into_result()?;

    if let Some(path) = registry {
        save_registry(&store, path)?;
    }

    let stored = store.get_record(record.id)?;
    let result = PublishResult {
        resource_set_id: set.resource_set_id,
        record_id: stored.id.to_string(),
        status: stored.status.to_string(),
        endpoints: stored.endpoints.len(),
        message: published.message,
        next_actions: published
            .next_available_actions
            .iter()
            .map(|a| a.to_string())
            .collect(),
    };

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            println!("{}", result.message);
            println!("  record:    {}", result.record_id);
            println!("  status:    {}", result.status);
            println!("  endpoints: {}", result.endpoints);
            println!("  next:      {}", result.next_actions.join(", "));
        }
    }

    Ok(())
}
