//! CLI command implementations.

pub mod analyze;
pub mod publish;
pub mod status;

use apiforge_catalog::{RegistryRecord, Resource};
use apiforge_registry::{MemoryRegistryStore, RegistryStore};
use serde::Deserialize;
use std::path::Path;

/// A resource-definition file: one resource set and its resources.
#[derive(Debug, Deserialize)]
pub struct ResourceSetFile {
    /// Resource set id.
    pub resource_set_id: String,
    /// Display name for the published record.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Version for the published record.
    #[serde(default)]
    pub version: Option<String>,
    /// The resources in the set.
    pub resources: Vec<Resource>,
}

impl ResourceSetFile {
    /// Loads and parses a resource-definition file.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
        let file: ResourceSetFile = serde_json::from_str(&contents)
            .map_err(|e| format!("cannot parse {}: {e}", path.display()))?;
        if file.resources.is_empty() {
            return Err(format!("{} contains no resources", path.display()).into());
        }
        Ok(file)
    }
}

/// Loads a registry snapshot into an in-memory store.
///
/// A missing file yields an empty store, so the first publish run can
/// create the snapshot.
pub fn load_registry(path: &Path) -> Result<MemoryRegistryStore, Box<dyn std::error::Error>> {
    let store = MemoryRegistryStore::new();
    if !path.exists() {
        return Ok(store);
    }

    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let records: Vec<RegistryRecord> = serde_json::from_str(&contents)
        .map_err(|e| format!("cannot parse {}: {e}", path.display()))?;
    for record in &records {
        store.upsert_record(record)?;
    }
    Ok(store)
}

/// Writes the store's records back to a registry snapshot.
pub fn save_registry(
    store: &MemoryRegistryStore,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut records = store.records();
    records.sort_by(|a, b| a.resource_set_id.cmp(&b.resource_set_id));
    let contents = serde_json::to_string_pretty(&records)?;
    std::fs::write(path, contents)
        .map_err(|e| format!("cannot write {}: {e}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use apiforge_catalog::PublishStatus;

    #[test]
    fn resource_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resources.json");
        std::fs::write(
            &path,
            r#"{
                "resource_set_id": "shop-core",
                "display_name": "Shop API",
                "resources": [
                    {
                        "name": "widgets",
                        "fields": [
                            {"name": "id", "kind": "identifier", "nullable": false},
                            {"name": "name", "kind": "string", "nullable": false}
                        ]
                    }
                ]
            }"#,
        )
        .unwrap();

        let file = ResourceSetFile::load(&path).unwrap();
        assert_eq!(file.resource_set_id, "shop-core");
        assert_eq!(file.display_name.as_deref(), Some("Shop API"));
        assert_eq!(file.resources.len(), 1);
        assert!(file.resources[0].has_identifier());
    }

    #[test]
    fn empty_resource_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.json");
        std::fs::write(&path, r#"{"resource_set_id": "x", "resources": []}"#).unwrap();
        assert!(ResourceSetFile::load(&path).is_err());
    }

    #[test]
    fn registry_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");

        let store = MemoryRegistryStore::new();
        let record = RegistryRecord::draft("shop-core", "Shop API");
        store.upsert_record(&record).unwrap();
        store.set_status(record.id, PublishStatus::Review).unwrap();
        save_registry(&store, &path).unwrap();

        let reloaded = load_registry(&path).unwrap();
        let records = reloaded.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, record.id);
        assert_eq!(records[0].status, PublishStatus::Review);
    }

    #[test]
    fn missing_registry_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = load_registry(&dir.path().join("absent.json")).unwrap();
        assert!(store.records().is_empty());
    }
}
