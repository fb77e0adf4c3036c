//! The static status → actions table.

use apiforge_catalog::PublishStatus;

/// An action a caller may take on a registry record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowAction {
    /// Generate endpoints and move the record into review.
    MoveToReview,
    /// Run the full sync cycle and publish.
    Publish,
    /// Retire the record.
    Deprecate,
    /// Bump the published version.
    UpdateVersion,
    /// Inspect usage analytics.
    ViewAnalytics,
    /// Return a deprecated record to published.
    Reactivate,
    /// Escape hatch: send a review record back to draft.
    RollbackToDraft,
    /// Escape hatch: send a published record back to review.
    RollbackToReview,
}

impl WorkflowAction {
    /// Returns the action as a lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowAction::MoveToReview => "move_to_review",
            WorkflowAction::Publish => "publish",
            WorkflowAction::Deprecate => "deprecate",
            WorkflowAction::UpdateVersion => "update_version",
            WorkflowAction::ViewAnalytics => "view_analytics",
            WorkflowAction::Reactivate => "reactivate",
            WorkflowAction::RollbackToDraft => "rollback_to_draft",
            WorkflowAction::RollbackToReview => "rollback_to_review",
        }
    }
}

impl std::fmt::Display for WorkflowAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the legal next actions for a status.
///
/// A lookup table, not a derivation: callers render valid operations
/// from this without re-implementing the state machine. Rollback edges
/// are escape hatches and deliberately not listed.
pub fn available_actions(status: PublishStatus) -> &'static [WorkflowAction] {
    match status {
        PublishStatus::Draft => &[WorkflowAction::MoveToReview],
        PublishStatus::Review => &[WorkflowAction::Publish, WorkflowAction::RollbackToDraft],
        PublishStatus::Published => &[
            WorkflowAction::Deprecate,
            WorkflowAction::UpdateVersion,
            WorkflowAction::ViewAnalytics,
        ],
        PublishStatus::Deprecated => &[WorkflowAction::Reactivate],
    }
}
