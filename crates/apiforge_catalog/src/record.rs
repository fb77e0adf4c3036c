//! External registry records.

use crate::endpoint::EndpointSpec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a published record.
///
/// Status moves forward (`Draft → Review → Published → Deprecated`);
/// rollback and reactivation are explicit escape hatches handled by the
/// publishing workflow, not ordinary transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    /// Being prepared, not visible externally.
    Draft,
    /// Endpoints generated, awaiting approval.
    Review,
    /// Live and externally visible.
    Published,
    /// Retired; kept for history, never deleted.
    Deprecated,
}

impl PublishStatus {
    /// Returns the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishStatus::Draft => "draft",
            PublishStatus::Review => "review",
            PublishStatus::Published => "published",
            PublishStatus::Deprecated => "deprecated",
        }
    }

    /// Returns true if `next` is one step forward from this status.
    pub fn advances_to(&self, next: PublishStatus) -> bool {
        matches!(
            (self, next),
            (PublishStatus::Draft, PublishStatus::Review)
                | (PublishStatus::Review, PublishStatus::Published)
                | (PublishStatus::Published, PublishStatus::Deprecated)
        )
    }
}

impl std::fmt::Display for PublishStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visibility of a published record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Visible only inside the organization.
    Internal,
    /// Publicly listed.
    Public,
}

impl Default for Visibility {
    fn default() -> Self {
        Visibility::Internal
    }
}

/// The published, externally-visible representation of a resource set.
///
/// Owned exclusively by the sync orchestrator. Its endpoint specs are
/// always replaced as a set on a successful sync, never merged
/// field-by-field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryRecord {
    /// Record id.
    pub id: Uuid,
    /// Id of the source resource set.
    pub resource_set_id: String,
    /// Display name shown to external consumers.
    pub display_name: String,
    /// Published version string.
    pub version: String,
    /// Lifecycle status.
    pub status: PublishStatus,
    /// Visibility.
    pub visibility: Visibility,
    /// Whether usage analytics are recorded for this record.
    pub analytics_enabled: bool,
    /// Endpoint specs owned by this record.
    pub endpoints: Vec<EndpointSpec>,
}

impl RegistryRecord {
    /// Creates a fresh draft record with a random id and no endpoints.
    pub fn draft(resource_set_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            resource_set_id: resource_set_id.into(),
            display_name: display_name.into(),
            version: "0.1.0".into(),
            status: PublishStatus::Draft,
            visibility: Visibility::default(),
            analytics_enabled: false,
            endpoints: Vec::new(),
        }
    }

    /// Sets the version string.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Sets the visibility.
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }
}
