//! Resource introspection provider.

use crate::error::{StoreError, StoreResult};
use apiforge_catalog::{Resource, ResourceChangeEvent};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::sync::mpsc::{self, Receiver, Sender};

/// Introspection access to the internal resource catalog.
///
/// Supplied by whatever stores the internal data model. The sync engine
/// does not care how it is implemented; it only reads definitions and
/// listens for change events.
pub trait ResourceProvider: Send + Sync {
    /// Lists the resources belonging to a resource set.
    fn list_resources(&self, resource_set_id: &str) -> StoreResult<Vec<Resource>>;

    /// Fetches a single resource by name.
    fn get_resource(&self, resource_set_id: &str, name: &str) -> StoreResult<Resource>;

    /// Subscribes to change events for all resource sets.
    ///
    /// Events are emitted after an internal change commits, in commit
    /// order. The receiver should be drained regularly.
    fn subscribe(&self) -> Receiver<ResourceChangeEvent>;
}

/// An in-memory resource provider for tests and local runs.
///
/// Resource sets are registered up front; change events are emitted
/// explicitly through [`emit_updated`](Self::emit_updated) and
/// [`emit_deleted`](Self::emit_deleted) with monotonically increasing
/// sequence numbers.
#[derive(Default)]
pub struct MemoryResourceProvider {
    sets: RwLock<HashMap<String, Vec<Resource>>>,
    subscribers: RwLock<Vec<Sender<ResourceChangeEvent>>>,
    scripted_failures: Mutex<HashMap<String, VecDeque<StoreError>>>,
    next_sequence: Mutex<u64>,
}

impl MemoryResourceProvider {
    /// Creates an empty provider.
    pub fn new() -> Self {
        Self {
            next_sequence: Mutex::new(1),
            ..Self::default()
        }
    }

    /// Registers (or replaces) a resource set.
    pub fn insert_set(&self, resource_set_id: impl Into<String>, resources: Vec<Resource>) {
        self.sets.write().insert(resource_set_id.into(), resources);
    }

    /// Queues an error for the next call to `operation`.
    pub fn fail_next(&self, operation: &str, error: StoreError) {
        self.scripted_failures
            .lock()
            .entry(operation.to_string())
            .or_default()
            .push_back(error);
    }

    /// Emits an update event for a resource.
    pub fn emit_updated(&self, resource_set_id: &str, resource: &str) {
        let event = ResourceChangeEvent::updated(self.take_sequence(), resource_set_id, resource);
        self.broadcast(event);
    }

    /// Emits a delete event for a resource.
    pub fn emit_deleted(&self, resource_set_id: &str, resource: &str) {
        let event = ResourceChangeEvent::deleted(self.take_sequence(), resource_set_id, resource);
        self.broadcast(event);
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    fn take_sequence(&self) -> u64 {
        let mut next = self.next_sequence.lock();
        let sequence = *next;
        *next += 1;
        sequence
    }

    fn broadcast(&self, event: ResourceChangeEvent) {
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
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
}

impl ResourceProvider for MemoryResourceProvider {
    fn list_resources(&self, resource_set_id: &str) -> StoreResult<Vec<Resource>> {
        self.take_failure("list_resources")?;
        self.sets
            .read()
            .get(resource_set_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("resource set {resource_set_id}")))
    }

    fn get_resource(&self, resource_set_id: &str, name: &str) -> StoreResult<Resource> {
        self.take_failure("get_resource")?;
        self.sets
            .read()
            .get(resource_set_id)
            .and_then(|set| set.iter().find(|r| r.name == name))
            .cloned()
            .ok_or_else(|| {
                StoreError::not_found(format!("resource {name} in set {resource_set_id}"))
            })
    }

    fn subscribe(&self) -> Receiver<ResourceChangeEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push(tx);
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apiforge_catalog::{ChangeType, Field, FieldKind};
    use std::time::Duration;

    fn contacts() -> Resource {
        Resource::new(
            "contacts",
            vec![
                Field::new("id", FieldKind::Identifier),
                Field::new("email", FieldKind::String),
            ],
        )
    }

    #[test]
    fn list_and_get() {
        let provider = MemoryResourceProvider::new();
        provider.insert_set("crm-core", vec![contacts()]);

        let resources = provider.list_resources("crm-core").unwrap();
        assert_eq!(resources.len(), 1);

        let resource = provider.get_resource("crm-core", "contacts").unwrap();
        assert_eq!(resource.name, "contacts");

        assert!(matches!(
            provider.get_resource("crm-core", "missing"),
            Err(StoreError::NotFound { .. })
        ));
        assert!(provider.list_resources("unknown").is_err());
    }

    #[test]
    fn change_events_in_order() {
        let provider = MemoryResourceProvider::new();
        let rx = provider.subscribe();

        provider.emit_updated("crm-core", "contacts");
        provider.emit_deleted("crm-core", "contacts");

        let first = rx.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(first.sequence, 1);
        assert_eq!(first.change_type, ChangeType::Updated);

        let second = rx.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(second.sequence, 2);
        assert_eq!(second.change_type, ChangeType::Deleted);
    }

    #[test]
    fn subscriber_cleanup_on_drop() {
        let provider = MemoryResourceProvider::new();
        let rx = provider.subscribe();
        assert_eq!(provider.subscriber_count(), 1);

        drop(rx);
        provider.emit_updated("crm-core", "contacts");
        assert_eq!(provider.subscriber_count(), 0);
    }

    #[test]
    fn scripted_provider_failure() {
        let provider = MemoryResourceProvider::new();
        provider.insert_set("crm-core", vec![contacts()]);
        provider.fail_next("list_resources", StoreError::unavailable("introspection down"));

        assert!(provider.list_resources("crm-core").is_err());
        assert!(provider.list_resources("crm-core").is_ok());
    }
}
