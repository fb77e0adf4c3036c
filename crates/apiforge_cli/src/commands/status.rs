//! Status command implementation.

use super::load_registry;
use apiforge_workflow::available_actions;
use serde::Serialize;
use std::path::Path;

/// Status of one registry record.
#[derive(Debug, Serialize)]
pub struct RecordStatus {
    /// Resource set id.
    pub resource_set_id: String,
    /// Display name.
    pub display_name: String,
    /// Published version.
    pub version: String,
    /// Lifecycle status.
    pub status: String,
    /// Endpoints currently owned.
    pub endpoints: usize,
    /// Analytics recording enabled.
    pub analytics_enabled: bool,
    /// Legal next actions.
    pub next_actions: Vec<String>,
}

/// Runs the status command.
pub fn run(
    registry: &Path,
    set: Option<&str>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if !registry.exists() {
        return Err(format!("no registry snapshot at {}", registry.display()).into());
    }

    let store = load_registry(registry)?;
    let mut records = store.records();
    records.sort_by(|a, b| a.resource_set_id.cmp(&b.resource_set_id));

    let statuses: Vec<RecordStatus> = records
        .iter()
        .filter(|r| set.map(|s| r.resource_set_id == s).unwrap_or(true))
        .map(|r| RecordStatus {
            resource_set_id: r.resource_set_id.clone(),
            display_name: r.display_name.clone(),
            version: r.version.clone(),
            status: r.status.to_string(),
            endpoints: r.endpoints.len(),
            analytics_enabled: r.analytics_enabled,
            next_actions: available_actions(r.status)
                .iter()
                .map(|a| a.to_string())
                .collect(),
        })
        .collect();

    if statuses.is_empty() {
        return Err(match set {
            Some(set) => format!("no record for resource set {set}").into(),
            None => "registry snapshot is empty".into(),
        });
    }

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&statuses)?);
        }
        _ => {
            for status in &statuses {
                println!(
                    "{} ({}) v{}",
                    status.display_name, status.resource_set_id, status.version
                );
                println!("  status:    {}", status.status);
                println!("  endpoints: {}", status.endpoints);
                println!("  analytics: {}", status.analytics_enabled);
                println!("  next:      {}", status.next_actions.join(", "));
                println!();
            }
        }
    }

    Ok(())
}
