//! Change events for resource change propagation.

use serde::{Deserialize, Serialize};

/// Type of change to an internal resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// The resource definition changed.
    Updated,
    /// The resource was removed from the internal store.
    Deleted,
}

/// A single change event from the resource provider.
///
/// Events are emitted only after an internal change commits, and carry
/// monotonically increasing sequence numbers in commit order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceChangeEvent {
    /// Sequence number of the change.
    pub sequence: u64,
    /// Resource set the changed resource belongs to.
    pub resource_set_id: String,
    /// Name of the changed resource.
    pub resource: String,
    /// Type of change.
    pub change_type: ChangeType,
}

impl ResourceChangeEvent {
    /// Creates an update event.
    pub fn updated(
        sequence: u64,
        resource_set_id: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            sequence,
            resource_set_id: resource_set_id.into(),
            resource: resource.into(),
            change_type: ChangeType::Updated,
        }
    }

    /// Creates a delete event.
    pub fn deleted(
        sequence: u64,
        resource_set_id: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            sequence,
            resource_set_id: resource_set_id.into(),
            resource: resource.into(),
            change_type: ChangeType::Deleted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_constructors() {
        let event = ResourceChangeEvent::updated(7, "crm-core", "contacts");
        assert_eq!(event.sequence, 7);
        assert_eq!(event.change_type, ChangeType::Updated);

        let event = ResourceChangeEvent::deleted(8, "crm-core", "contacts");
        assert_eq!(event.change_type, ChangeType::Deleted);
        assert_eq!(event.resource, "contacts");
    }
}
