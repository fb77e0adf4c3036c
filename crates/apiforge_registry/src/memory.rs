//! In-memory registry store for tests and local runs.

use crate::error::{StoreError, StoreResult};
use crate::store::{MetadataPatch, RegistryStore};
use apiforge_catalog::{EndpointSpec, PublishStatus, RegistryRecord};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// An in-memory registry store.
///
/// Behaves like a well-behaved remote registry, with two scripting knobs
/// for exercising the sync engine's failure paths:
///
/// - [`fail_next`](Self::fail_next) queues an error for a named operation;
///   the next call to that operation consumes and returns it
/// - [`drop_next_inserts`](Self::drop_next_inserts) makes the next
///   `insert_endpoints` call silently persist fewer specs than submitted
#[derive(Default)]
pub struct MemoryRegistryStore {
    records: RwLock<HashMap<Uuid, RegistryRecord>>,
    scripted_failures: Mutex<HashMap<String, VecDeque<StoreError>>>,
    dropped_inserts: AtomicU64,
    write_count: AtomicU64,
}

impl MemoryRegistryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an error for the next call to `operation`.
    ///
    /// Queued errors are consumed in FIFO order, one per call, so queuing
    /// the same error twice makes the first two calls fail and the third
    /// succeed.
    pub fn fail_next(&self, operation: &str, error: StoreError) {
        self.scripted_failures
            .lock()
            .entry(operation.to_string())
            .or_default()
            .push_back(error);
    }

    /// Makes the next `insert_endpoints` call silently drop `count` specs
    /// from the tail of the submitted batch.
    pub fn drop_next_inserts(&self, count: u64) {
        self.dropped_inserts.store(count, Ordering::SeqCst);
    }

    /// Returns the number of mutating calls the store has served.
    pub fn write_count(&self) -> u64 {
        self.write_count.load(Ordering::SeqCst)
    }

    /// Returns all stored records.
    pub fn records(&self) -> Vec<RegistryRecord> {
        self.records.read().values().cloned().collect()
    }

    fn take_failure(&self, operation: &str) -> StoreResult<()> {
        let mut failures = self.scripted_failures.lock();
        if let Some(queue) = failures.get_mut(operation) {
            if let Some(error) = queue.pop_front() {
                return Err(error);
            }
        }
        Ok(())
    }

    fn record_write(&self) {
        self.write_count.fetch_add(1, Ordering::SeqCst);
    }
}

impl RegistryStore for MemoryRegistryStore {
    fn get_record(&self, id: Uuid) -> StoreResult<RegistryRecord> {
        self.take_failure("get_record")?;
        self.records
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("record {id}")))
    }

    fn find_by_resource_set(&self, resource_set_id: &str) -> StoreResult<Option<RegistryRecord>> {
        self.take_failure("find_by_resource_set")?;
        Ok(self
            .records
            .read()
            .values()
            .find(|r| r.resource_set_id == resource_set_id)
            .cloned())
    }

    fn find_by_display_name(&self, display_name: &str) -> StoreResult<Option<RegistryRecord>> {
        self.take_failure("find_by_display_name")?;
        Ok(self
            .records
            .read()
            .values()
            .find(|r| r.display_name == display_name)
            .cloned())
    }

    fn upsert_record(&self, record: &RegistryRecord) -> StoreResult<RegistryRecord> {
        self.take_failure("upsert_record")?;
        self.record_write();

        let mut records = self.records.write();
        let stored = match records.get_mut(&record.id) {
            Some(existing) => {
                // Metadata only; the endpoint set is owned by clear/insert.
                existing.resource_set_id = record.resource_set_id.clone();
                existing.display_name = record.display_name.clone();
                existing.version = record.version.clone();
                existing.status = record.status;
                existing.visibility = record.visibility;
                existing.analytics_enabled = record.analytics_enabled;
                existing.clone()
            }
            None => {
                records.insert(record.id, record.clone());
                record.clone()
            }
        };
        Ok(stored)
    }

    fn set_status(&self, id: Uuid, status: PublishStatus) -> StoreResult<()> {
        self.take_failure("set_status")?;
        self.record_write();

        let mut records = self.records.write();
        let record = records
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(format!("record {id}")))?;
        record.status = status;
        Ok(())
    }

    fn update_metadata(&self, id: Uuid, patch: &MetadataPatch) -> StoreResult<()> {
        self.take_failure("update_metadata")?;
        self.record_write();

        let mut records = self.records.write();
        let record = records
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(format!("record {id}")))?;

        if let Some(name) = &patch.display_name {
            record.display_name = name.clone();
        }
        if let Some(version) = &patch.version {
            record.version = version.clone();
        }
        if let Some(visibility) = patch.visibility {
            record.visibility = visibility;
        }
        Ok(())
    }

    fn set_analytics(&self, id: Uuid, enabled: bool) -> StoreResult<()> {
        self.take_failure("set_analytics")?;
        self.record_write();

        let mut records = self.records.write();
        let record = records
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(format!("record {id}")))?;
        record.analytics_enabled = enabled;
        Ok(())
    }

    fn clear_endpoints(&self, id: Uuid) -> StoreResult<u64> {
        self.take_failure("clear_endpoints")?;
        self.record_write();

        let mut records = self.records.write();
        let record = records
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(format!("record {id}")))?;
        let removed = record.endpoints.len() as u64;
        record.endpoints.clear();
        Ok(removed)
    }

    fn insert_endpoints(&self, id: Uuid, specs: &[EndpointSpec]) -> StoreResult<u64> {
        self.take_failure("insert_endpoints")?;
        self.record_write();

        let dropped = self.dropped_inserts.swap(0, Ordering::SeqCst) as usize;
        let persisted = specs.len().saturating_sub(dropped);

        let mut records = self.records.write();
        let record = records
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(format!("record {id}")))?;
        record.endpoints.extend(specs[..persisted].iter().cloned());
        Ok(persisted as u64)
    }

    fn count_endpoints(&self, id: Uuid) -> StoreResult<u64> {
        self.take_failure("count_endpoints")?;
        Ok(self
            .records
            .read()
            .get(&id)
            .ok_or_else(|| StoreError::not_found(format!("record {id}")))?
            .endpoints
            .len() as u64)
    }

    fn list_endpoints(&self, id: Uuid) -> StoreResult<Vec<EndpointSpec>> {
        self.take_failure("list_endpoints")?;
        Ok(self
            .records
            .read()
            .get(&id)
            .ok_or_else(|| StoreError::not_found(format!("record {id}")))?
            .endpoints
            .clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apiforge_catalog::HttpMethod;
    use serde_json::json;

    fn make_spec(path: &str) -> EndpointSpec {
        EndpointSpec {
            method: HttpMethod::Get,
            path: path.into(),
            summary: format!("List {path}"),
            requires_auth: false,
            request_schema: None,
            response_schema: json!({"type": "array"}),
        }
    }

    #[test]
    fn upsert_preserves_endpoint_set() {
        let store = MemoryRegistryStore::new();
        let mut record = RegistryRecord::draft("crm-core", "CRM Core API");
        store.upsert_record(&record).unwrap();
        store
            .insert_endpoints(record.id, &[make_spec("/contacts")])
            .unwrap();

        record.version = "0.2.0".into();
        let stored = store.upsert_record(&record).unwrap();

        assert_eq!(stored.version, "0.2.0");
        assert_eq!(store.count_endpoints(record.id).unwrap(), 1);
    }

    #[test]
    fn clear_then_insert_replaces_set() {
        let store = MemoryRegistryStore::new();
        let record = RegistryRecord::draft("crm-core", "CRM Core API");
        store.upsert_record(&record).unwrap();

        store
            .insert_endpoints(record.id, &[make_spec("/contacts"), make_spec("/deals")])
            .unwrap();
        assert_eq!(store.clear_endpoints(record.id).unwrap(), 2);

        store
            .insert_endpoints(record.id, &[make_spec("/contacts")])
            .unwrap();
        let endpoints = store.list_endpoints(record.id).unwrap();
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].path, "/contacts");
    }

    #[test]
    fn scripted_failure_consumed_once() {
        let store = MemoryRegistryStore::new();
        let record = RegistryRecord::draft("crm-core", "CRM Core API");
        store.upsert_record(&record).unwrap();

        store.fail_next("get_record", StoreError::unavailable("connection refused"));

        assert!(matches!(
            store.get_record(record.id),
            Err(StoreError::Unavailable { .. })
        ));
        assert!(store.get_record(record.id).is_ok());
    }

    #[test]
    fn dropped_inserts_report_fewer_rows() {
        let store = MemoryRegistryStore::new();
        let record = RegistryRecord::draft("crm-core", "CRM Core API");
        store.upsert_record(&record).unwrap();

        store.drop_next_inserts(1);
        let persisted = store
            .insert_endpoints(record.id, &[make_spec("/contacts"), make_spec("/deals")])
            .unwrap();

        assert_eq!(persisted, 1);
        assert_eq!(store.count_endpoints(record.id).unwrap(), 1);
    }

    #[test]
    fn write_count_tracks_mutations() {
        let store = MemoryRegistryStore::new();
        assert_eq!(store.write_count(), 0);

        let record = RegistryRecord::draft("crm-core", "CRM Core API");
        store.upsert_record(&record).unwrap();
        store.set_status(record.id, PublishStatus::Review).unwrap();
        store.find_by_resource_set("crm-core").unwrap();

        assert_eq!(store.write_count(), 2);
    }

    #[test]
    fn find_by_name_and_set() {
        let store = MemoryRegistryStore::new();
        let record = RegistryRecord::draft("crm-core", "CRM Core API");
        store.upsert_record(&record).unwrap();

        assert!(store.find_by_resource_set("crm-core").unwrap().is_some());
        assert!(store.find_by_display_name("CRM Core API").unwrap().is_some());
        assert!(store.find_by_resource_set("other").unwrap().is_none());
    }
}
