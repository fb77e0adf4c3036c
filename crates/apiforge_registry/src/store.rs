//! Registry store trait definition.

use crate::error::StoreResult;
use apiforge_catalog::{EndpointSpec, PublishStatus, RegistryRecord, Visibility};
use uuid::Uuid;

/// A partial update to a record's metadata fields.
///
/// `None` fields are left untouched. Endpoint specs are never patched
/// through this type; they are replaced as a set via
/// [`RegistryStore::clear_endpoints`] and [`RegistryStore::insert_endpoints`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataPatch {
    /// New display name.
    pub display_name: Option<String>,
    /// New version string.
    pub version: Option<String>,
    /// New visibility.
    pub visibility: Option<Visibility>,
}

impl MetadataPatch {
    /// Creates an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Sets the version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Sets the visibility.
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// Returns true if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.version.is_none() && self.visibility.is_none()
    }
}

/// CRUD access to the external registry.
///
/// The registry is a remote, fallible dependency. Implementations do not
/// retry internally; the sync engine wraps every call in its retrying
/// executor.
///
/// # Invariants
///
/// - `upsert_record` writes metadata only; an existing record keeps its
///   endpoint set untouched
/// - `insert_endpoints` appends to the record's owned set and returns the
///   number actually persisted
/// - records are never deleted, only marked `Deprecated`
pub trait RegistryStore: Send + Sync {
    /// Fetches a record by id.
    fn get_record(&self, id: Uuid) -> StoreResult<RegistryRecord>;

    /// Finds the record for a resource set, if one exists.
    fn find_by_resource_set(&self, resource_set_id: &str) -> StoreResult<Option<RegistryRecord>>;

    /// Finds a record by display name, if one exists.
    fn find_by_display_name(&self, display_name: &str) -> StoreResult<Option<RegistryRecord>>;

    /// Inserts the record, or updates the metadata of an existing record
    /// with the same id. Returns the stored record.
    fn upsert_record(&self, record: &RegistryRecord) -> StoreResult<RegistryRecord>;

    /// Sets a record's lifecycle status.
    fn set_status(&self, id: Uuid, status: PublishStatus) -> StoreResult<()>;

    /// Applies a metadata patch to a record.
    fn update_metadata(&self, id: Uuid, patch: &MetadataPatch) -> StoreResult<()>;

    /// Enables or disables usage analytics for a record.
    fn set_analytics(&self, id: Uuid, enabled: bool) -> StoreResult<()>;

    /// Deletes all endpoint specs owned by a record.
    ///
    /// Returns the number of specs removed.
    fn clear_endpoints(&self, id: Uuid) -> StoreResult<u64>;

    /// Inserts endpoint specs into a record's owned set.
    ///
    /// Returns the number of specs actually persisted, which callers must
    /// verify against the submitted count.
    fn insert_endpoints(&self, id: Uuid, specs: &[EndpointSpec]) -> StoreResult<u64>;

    /// Returns the number of endpoint specs currently owned by a record.
    fn count_endpoints(&self, id: Uuid) -> StoreResult<u64>;

    /// Lists the endpoint specs currently owned by a record.
    fn list_endpoints(&self, id: Uuid) -> StoreResult<Vec<EndpointSpec>>;
}
