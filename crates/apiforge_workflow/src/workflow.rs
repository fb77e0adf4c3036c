//! The publishing workflow.

use crate::actions::{available_actions, WorkflowAction};
use crate::error::{WorkflowError, WorkflowResult};
use apiforge_catalog::{PublishStatus, RegistryRecord};
use apiforge_registry::{MetadataPatch, RegistryStore, StoreError};
use apiforge_sync::{PublishConfig, SyncOrchestrator};
use std::sync::Arc;
use uuid::Uuid;

/// The uniform result of every workflow operation.
#[derive(Debug, Clone)]
pub struct WorkflowResponse {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Human-readable outcome message.
    pub message: String,
    /// The record's status after the operation, when known.
    pub current_status: Option<PublishStatus>,
    /// Legal next actions for that status.
    pub next_available_actions: Vec<WorkflowAction>,
}

impl WorkflowResponse {
    fn ok(message: impl Into<String>, status: PublishStatus) -> Self {
        Self {
            success: true,
            message: message.into(),
            current_status: Some(status),
            next_available_actions: available_actions(status).to_vec(),
        }
    }

    fn failed(message: impl Into<String>, status: Option<PublishStatus>) -> Self {
        Self {
            success: false,
            message: message.into(),
            current_status: status,
            next_available_actions: status
                .map(|s| available_actions(s).to_vec())
                .unwrap_or_default(),
        }
    }

    /// Converts the response into a `Result` for callers that prefer
    /// errors over result objects.
    pub fn into_result(self) -> WorkflowResult<WorkflowResponse> {
        if self.success {
            Ok(self)
        } else {
            Err(WorkflowError::rejected(self.message))
        }
    }
}

/// Sequences the publishing lifecycle of registry records.
///
/// Wraps the sync orchestrator with the status state machine: moving to
/// review runs an endpoints-only sync, publishing runs the full cycle,
/// and a record only reaches `published` after a verified cycle.
pub struct PublishingWorkflow {
    store: Arc<dyn RegistryStore>,
    orchestrator: Arc<SyncOrchestrator>,
}

impl PublishingWorkflow {
    /// Creates a workflow over a store and orchestrator.
    pub fn new(store: Arc<dyn RegistryStore>, orchestrator: Arc<SyncOrchestrator>) -> Self {
        Self {
            store,
            orchestrator,
        }
    }

    /// Returns the orchestrator, for diagnostics access.
    pub fn orchestrator(&self) -> &Arc<SyncOrchestrator> {
        &self.orchestrator
    }

    /// Creates a draft record for a resource set.
    ///
    /// Idempotent: an existing record for the same resource set or
    /// display name is transitioned to draft rather than duplicated.
    pub fn create_draft(
        &self,
        resource_set_id: &str,
        config: &PublishConfig,
    ) -> WorkflowResponse {
        let existing = match self.find_existing(resource_set_id, config) {
            Ok(existing) => existing,
            Err(error) => return WorkflowResponse::failed(error.to_string(), None),
        };

        match existing {
            Some(record) => {
                if let Err(error) = self.store.set_status(record.id, PublishStatus::Draft) {
                    return WorkflowResponse::failed(error.to_string(), Some(record.status));
                }
                let patch = patch_from_config(config);
                if !patch.is_empty() {
                    if let Err(error) = self.store.update_metadata(record.id, &patch) {
                        return WorkflowResponse::failed(
                            error.to_string(),
                            Some(PublishStatus::Draft),
                        );
                    }
                }
                tracing::debug!(resource_set_id, record_id = %record.id, "reused existing record as draft");
                WorkflowResponse::ok(
                    format!("existing record {} moved to draft", record.display_name),
                    PublishStatus::Draft,
                )
            }
            None => {
                let mut record = RegistryRecord::draft(
                    resource_set_id,
                    config
                        .display_name
                        .clone()
                        .unwrap_or_else(|| resource_set_id.to_string()),
                );
                if let Some(version) = &config.version {
                    record.version = version.clone();
                }
                if let Some(visibility) = config.visibility {
                    record.visibility = visibility;
                }

                match self.store.upsert_record(&record) {
                    Ok(stored) => {
                        tracing::debug!(resource_set_id, record_id = %stored.id, "draft created");
                        WorkflowResponse::ok(
                            format!("draft created for {}", stored.display_name),
                            PublishStatus::Draft,
                        )
                    }
                    Err(error) => WorkflowResponse::failed(error.to_string(), None),
                }
            }
        }
    }

    /// Generates endpoints and moves a draft record into review.
    pub fn move_to_review(&self, id: Uuid) -> WorkflowResponse {
        let record = match self.store.get_record(id) {
            Ok(record) => record,
            Err(error) => return WorkflowResponse::failed(error.to_string(), None),
        };
        if record.status != PublishStatus::Draft {
            return WorkflowResponse::failed(
                format!("cannot move to review from {}", record.status),
                Some(record.status),
            );
        }

        let report = match self.orchestrator.sync_endpoints_only(&record.resource_set_id) {
            Ok(report) => report,
            Err(error) => return WorkflowResponse::failed(error.to_string(), Some(record.status)),
        };
        if !report.success {
            return WorkflowResponse::failed(report.summary(), Some(record.status));
        }

        match self.store.set_status(id, PublishStatus::Review) {
            Ok(()) => WorkflowResponse::ok(
                format!(
                    "{} endpoints generated; {} is in review",
                    report.endpoints_published, record.display_name
                ),
                PublishStatus::Review,
            ),
            Err(error) => WorkflowResponse::failed(error.to_string(), Some(record.status)),
        }
    }

    /// Runs the full sync cycle and publishes a reviewed record.
    ///
    /// The record reaches `published` only after a verified cycle;
    /// analytics recording is enabled on success.
    pub fn publish(&self, id: Uuid) -> WorkflowResponse {
        let record = match self.store.get_record(id) {
            Ok(record) => record,
            Err(error) => return WorkflowResponse::failed(error.to_string(), None),
        };
        if record.status != PublishStatus::Review {
            return WorkflowResponse::failed(
                format!("cannot publish from {}", record.status),
                Some(record.status),
            );
        }

        let report = match self
            .orchestrator
            .publish_with_full_sync(&record.resource_set_id, &PublishConfig::new())
        {
            Ok(report) => report,
            // Covers the single-flight rejection; status is untouched.
            Err(error) => return WorkflowResponse::failed(error.to_string(), Some(record.status)),
        };
        if !report.success {
            return WorkflowResponse::failed(report.summary(), Some(record.status));
        }

        if let Err(error) = self.store.set_status(id, PublishStatus::Published) {
            return WorkflowResponse::failed(error.to_string(), Some(record.status));
        }
        if let Err(error) = self.store.set_analytics(id, true) {
            return WorkflowResponse::failed(error.to_string(), Some(PublishStatus::Published));
        }

        WorkflowResponse::ok(
            format!(
                "{} published with {} endpoints",
                record.display_name, report.endpoints_published
            ),
            PublishStatus::Published,
        )
    }

    /// Retires a published record. The record is kept, never deleted.
    pub fn deprecate(&self, id: Uuid) -> WorkflowResponse {
        self.transition(id, PublishStatus::Published, PublishStatus::Deprecated, "deprecated")
    }

    /// Returns a deprecated record to published.
    pub fn reactivate(&self, id: Uuid) -> WorkflowResponse {
        self.transition(id, PublishStatus::Deprecated, PublishStatus::Published, "reactivated")
    }

    /// Escape hatch: review → draft, published → review.
    pub fn rollback(&self, id: Uuid) -> WorkflowResponse {
        let record = match self.store.get_record(id) {
            Ok(record) => record,
            Err(error) => return WorkflowResponse::failed(error.to_string(), None),
        };

        let target = match record.status {
            PublishStatus::Review => PublishStatus::Draft,
            PublishStatus::Published => PublishStatus::Review,
            status => {
                return WorkflowResponse::failed(
                    format!("cannot roll back from {status}"),
                    Some(status),
                );
            }
        };

        match self.store.set_status(id, target) {
            Ok(()) => WorkflowResponse::ok(
                format!("{} rolled back to {target}", record.display_name),
                target,
            ),
            Err(error) => WorkflowResponse::failed(error.to_string(), Some(record.status)),
        }
    }

    /// Bumps the published version of a record.
    pub fn update_version(&self, id: Uuid, version: &str) -> WorkflowResponse {
        let record = match self.store.get_record(id) {
            Ok(record) => record,
            Err(error) => return WorkflowResponse::failed(error.to_string(), None),
        };
        if record.status != PublishStatus::Published {
            return WorkflowResponse::failed(
                format!("cannot update version from {}", record.status),
                Some(record.status),
            );
        }

        let patch = MetadataPatch::new().with_version(version);
        match self.store.update_metadata(id, &patch) {
            Ok(()) => WorkflowResponse::ok(
                format!("{} now at version {version}", record.display_name),
                record.status,
            ),
            Err(error) => WorkflowResponse::failed(error.to_string(), Some(record.status)),
        }
    }

    /// Pure read: the record's status and legal next actions.
    pub fn get_workflow_status(&self, id: Uuid) -> WorkflowResponse {
        match self.store.get_record(id) {
            Ok(record) => WorkflowResponse::ok(
                format!("{} is {}", record.display_name, record.status),
                record.status,
            ),
            Err(error) => WorkflowResponse::failed(error.to_string(), None),
        }
    }

    fn transition(
        &self,
        id: Uuid,
        from: PublishStatus,
        to: PublishStatus,
        verb: &str,
    ) -> WorkflowResponse {
        let record = match self.store.get_record(id) {
            Ok(record) => record,
            Err(error) => return WorkflowResponse::failed(error.to_string(), None),
        };
        if record.status != from {
            return WorkflowResponse::failed(
                format!("cannot be {verb} from {}", record.status),
                Some(record.status),
            );
        }
        match self.store.set_status(id, to) {
            Ok(()) => WorkflowResponse::ok(format!("{} {verb}", record.display_name), to),
            Err(error) => WorkflowResponse::failed(error.to_string(), Some(record.status)),
        }
    }

    fn find_existing(
        &self,
        resource_set_id: &str,
        config: &PublishConfig,
    ) -> Result<Option<RegistryRecord>, StoreError> {
        if let Some(record) = self.store.find_by_resource_set(resource_set_id)? {
            return Ok(Some(record));
        }
        if let Some(name) = &config.display_name {
            return self.store.find_by_display_name(name);
        }
        Ok(None)
    }
}

fn patch_from_config(config: &PublishConfig) -> MetadataPatch {
    let mut patch = MetadataPatch::new();
    if let Some(name) = &config.display_name {
        patch = patch.with_display_name(name);
    }
    if let Some(version) = &config.version {
        patch = patch.with_version(version);
    }
    if let Some(visibility) = config.visibility {
        patch = patch.with_visibility(visibility);
    }
    patch
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_into_result() {
        let ok = WorkflowResponse::ok("done", PublishStatus::Draft);
        assert!(ok.into_result().is_ok());

        let failed = WorkflowResponse::failed("nope", None);
        let err = failed.into_result().unwrap_err();
        assert_eq!(err.to_string(), "nope");
    }

    #[test]
    fn responses_carry_action_table() {
        let response = WorkflowResponse::ok("done", PublishStatus::Published);
        assert_eq!(
            response.next_available_actions,
            vec![
                WorkflowAction::Deprecate,
                WorkflowAction::UpdateVersion,
                WorkflowAction::ViewAnalytics,
            ]
        );

        let unknown = WorkflowResponse::failed("gone", None);
        assert!(unknown.next_available_actions.is_empty());
    }
}
