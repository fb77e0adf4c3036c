//! Sync orchestrator: the publish step machine.

use crate::classify::{ErrorClassifier, ErrorRecord, ErrorStats};
use crate::error::{SyncError, SyncResult};
use crate::executor::{ExecutorConfig, RetryExecutor};
use apiforge_analyzer::{Analysis, AlignmentContext, SchemaAnalyzer};
use apiforge_catalog::{
    ChangeType, EndpointSpec, PublishStatus, RegistryRecord, ResourceChangeEvent, Visibility,
};
use apiforge_registry::{MetadataPatch, RegistryStore, ResourceProvider};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// One step of the publish cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStep {
    /// Introspect resources and derive endpoint specs.
    Analyzing,
    /// Fold analyses into the target registry record and endpoint set.
    BuildingAggregate,
    /// Write the registry record's metadata.
    UpsertingRegistry,
    /// Delete every endpoint spec the record currently owns.
    ClearingStale,
    /// Insert the freshly derived endpoint set.
    InsertingFresh,
    /// Register the resource set for incremental re-sync.
    ArmingNotifications,
    /// Read back the persisted endpoint count and compare.
    Verifying,
    /// Cycle finished successfully.
    Done,
    /// Cycle aborted.
    Failed,
}

impl SyncStep {
    /// The full-cycle step order.
    pub const FULL_CYCLE: [SyncStep; 7] = [
        SyncStep::Analyzing,
        SyncStep::BuildingAggregate,
        SyncStep::UpsertingRegistry,
        SyncStep::ClearingStale,
        SyncStep::InsertingFresh,
        SyncStep::ArmingNotifications,
        SyncStep::Verifying,
    ];

    /// Returns the step as a lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStep::Analyzing => "analyzing",
            SyncStep::BuildingAggregate => "building_aggregate",
            SyncStep::UpsertingRegistry => "upserting_registry",
            SyncStep::ClearingStale => "clearing_stale",
            SyncStep::InsertingFresh => "inserting_fresh",
            SyncStep::ArmingNotifications => "arming_notifications",
            SyncStep::Verifying => "verifying",
            SyncStep::Done => "done",
            SyncStep::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SyncStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata overrides applied when publishing a resource set.
#[derive(Debug, Clone, Default)]
pub struct PublishConfig {
    /// Display name for the registry record.
    pub display_name: Option<String>,
    /// Version string for the registry record.
    pub version: Option<String>,
    /// Visibility of the registry record.
    pub visibility: Option<Visibility>,
}

impl PublishConfig {
    /// Creates an empty config (existing metadata is kept).
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
}

/// Retry budgets for the orchestrator's steps.
///
/// Store-bound steps carry the full retry budget; local steps (clearing,
/// arming, verifying) run a single attempt.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Budget for store-bound steps.
    pub store_budget: ExecutorConfig,
    /// Budget for local steps.
    pub local_budget: ExecutorConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            store_budget: ExecutorConfig::new(),
            local_budget: ExecutorConfig::new()
                .with_max_retries(1)
                .with_base_delay(Duration::from_millis(100))
                .with_timeout(Duration::from_millis(5_000)),
        }
    }
}

impl OrchestratorConfig {
    /// Creates the default budgets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the store-bound budget.
    pub fn with_store_budget(mut self, budget: ExecutorConfig) -> Self {
        self.store_budget = budget;
        self
    }

    /// Sets the local budget.
    pub fn with_local_budget(mut self, budget: ExecutorConfig) -> Self {
        self.local_budget = budget;
        self
    }
}

/// The structured result of one sync cycle.
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// Resource set the cycle ran for.
    pub resource_set_id: String,
    /// Whether the cycle completed.
    pub success: bool,
    /// Steps that completed, in order.
    pub completed_steps: Vec<SyncStep>,
    /// The step that aborted the cycle, if any.
    pub failed_step: Option<SyncStep>,
    /// The classified failure, if any.
    pub error: Option<ErrorRecord>,
    /// Resources analyzed.
    pub resources_analyzed: usize,
    /// Endpoint count derived by the analyzer.
    pub endpoints_expected: u64,
    /// Endpoint count confirmed by the verification read.
    pub endpoints_published: u64,
    /// Wall-clock duration of the cycle.
    pub duration: Duration,
}

impl SyncReport {
    /// Returns a one-line summary for messages and logs.
    pub fn summary(&self) -> String {
        if self.success {
            format!(
                "synced {} endpoints for {} resources in {:?}",
                self.endpoints_published, self.resources_analyzed, self.duration
            )
        } else {
            let step = self
                .failed_step
                .map(|s| s.as_str())
                .unwrap_or("unknown step");
            let message = self
                .error
                .as_ref()
                .map(|e| e.message.as_str())
                .unwrap_or("unknown error");
            format!("sync failed at {step}: {message}")
        }
    }
}

/// Aggregate statistics across sync cycles.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Cycles that completed successfully.
    pub cycles_completed: u64,
    /// Cycles that aborted.
    pub cycles_failed: u64,
    /// Endpoints published across all successful cycles.
    pub endpoints_published: u64,
    /// Incremental metadata patches applied.
    pub incremental_updates: u64,
    /// Records deprecated by incremental deletes.
    pub incremental_deprecations: u64,
    /// Last failure message.
    pub last_error: Option<String>,
    /// Completion time of the last cycle.
    pub last_sync_time: Option<Instant>,
}

/// Snapshot of a resource set's sync state.
#[derive(Debug, Clone)]
pub struct SyncStatus {
    /// The resource set.
    pub resource_set_id: String,
    /// A cycle is currently running.
    pub in_flight: bool,
    /// Change notifications are armed.
    pub armed: bool,
    /// The most recent cycle report.
    pub last_report: Option<SyncReport>,
}

/// What the incremental handler did with a change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncrementalAction {
    /// The resource set is not armed; nothing done.
    Ignored,
    /// Registry metadata was patched.
    MetadataPatched,
    /// The record was marked deprecated.
    Deprecated,
}

/// Everything the analyzing step produces for the rest of the cycle.
#[derive(Clone)]
struct AnalysisBundle {
    analyses: Vec<Analysis>,
    existing: Option<RegistryRecord>,
}

struct CycleOutput {
    completed: Vec<SyncStep>,
    resources: usize,
    expected: u64,
    published: u64,
}

struct CycleFailure {
    step: SyncStep,
    error: ErrorRecord,
    completed: Vec<SyncStep>,
}

/// Removes the resource set from the in-flight set on every exit path.
struct FlightGuard<'a> {
    set: &'a Mutex<HashSet<String>>,
    id: String,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.id);
    }
}

/// Coordinates publish cycles for resource sets.
///
/// Owns its collaborators by injection and its own in-flight guard set;
/// there is no process-wide state. At most one cycle runs per resource
/// set at any time; cycles for different resource sets are independent.
pub struct SyncOrchestrator {
    provider: Arc<dyn ResourceProvider>,
    store: Arc<dyn RegistryStore>,
    analyzer: SchemaAnalyzer,
    executor: RetryExecutor,
    config: OrchestratorConfig,
    in_flight: Mutex<HashSet<String>>,
    armed: Arc<RwLock<HashMap<String, Uuid>>>,
    stats: RwLock<SyncStats>,
    last_reports: RwLock<HashMap<String, SyncReport>>,
}

impl SyncOrchestrator {
    /// Creates an orchestrator with default analyzer, classifier, and
    /// budgets.
    pub fn new(provider: Arc<dyn ResourceProvider>, store: Arc<dyn RegistryStore>) -> Self {
        Self {
            provider,
            store,
            analyzer: SchemaAnalyzer::new(),
            executor: RetryExecutor::new(Arc::new(ErrorClassifier::new())),
            config: OrchestratorConfig::default(),
            in_flight: Mutex::new(HashSet::new()),
            armed: Arc::new(RwLock::new(HashMap::new())),
            stats: RwLock::new(SyncStats::default()),
            last_reports: RwLock::new(HashMap::new()),
        }
    }

    /// Replaces the step budgets.
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the schema analyzer.
    pub fn with_analyzer(mut self, analyzer: SchemaAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Runs a full publish cycle for a resource set.
    ///
    /// Fails immediately when a cycle for the same resource set is
    /// already in flight; no store access happens in that case. Step
    /// failures abort the cycle and are reported in the returned
    /// [`SyncReport`] rather than as an error.
    pub fn publish_with_full_sync(
        &self,
        resource_set_id: &str,
        config: &PublishConfig,
    ) -> SyncResult<SyncReport> {
        let Some(_guard) = self.try_acquire(resource_set_id) else {
            let error = SyncError::in_progress(resource_set_id);
            self.executor.classifier().classify(
                &error.to_string(),
                "publish_with_full_sync",
                resource_set_id,
            );
            return Err(error);
        };

        tracing::info!(resource_set_id, "starting full sync cycle");
        let start = Instant::now();
        let result = self.run_full_cycle(resource_set_id, config);
        Ok(self.finish(resource_set_id, start, result))
    }

    /// Runs the endpoints-only cycle used by review: analyze, clear,
    /// insert, verify. The registry record must already exist; its
    /// metadata is not touched and notifications are not armed.
    pub fn sync_endpoints_only(&self, resource_set_id: &str) -> SyncResult<SyncReport> {
        let Some(_guard) = self.try_acquire(resource_set_id) else {
            let error = SyncError::in_progress(resource_set_id);
            self.executor.classifier().classify(
                &error.to_string(),
                "sync_endpoints_only",
                resource_set_id,
            );
            return Err(error);
        };

        tracing::info!(resource_set_id, "starting endpoints-only sync");
        let start = Instant::now();
        let result = self.run_endpoints_cycle(resource_set_id);
        Ok(self.finish(resource_set_id, start, result))
    }

    /// Re-runs the full cycle outside the normal workflow triggers.
    pub fn force_refresh(&self, resource_set_id: &str) -> SyncResult<SyncReport> {
        tracing::info!(resource_set_id, "forcing refresh sync");
        self.publish_with_full_sync(resource_set_id, &PublishConfig::new())
    }

    /// Applies one resource change event.
    ///
    /// Events for unarmed resource sets are ignored. Updates patch the
    /// registry record's metadata (patch-version bump); deletes mark the
    /// record deprecated and disarm the set. The record itself is never
    /// deleted.
    pub fn handle_change_event(
        &self,
        event: &ResourceChangeEvent,
    ) -> SyncResult<IncrementalAction> {
        let record_id = self.armed.read().get(&event.resource_set_id).copied();
        let Some(record_id) = record_id else {
            return Ok(IncrementalAction::Ignored);
        };

        let budget = self
            .config
            .store_budget
            .clone()
            .with_context(&event.resource_set_id);

        match event.change_type {
            ChangeType::Updated => {
                let store = Arc::clone(&self.store);
                let outcome = self.executor.execute(
                    "incremental_metadata_patch",
                    &budget,
                    move || {
                        let record = store.get_record(record_id)?;
                        let patch = MetadataPatch::new()
                            .with_version(bump_patch_version(&record.version));
                        store.update_metadata(record_id, &patch)?;
                        Ok::<_, SyncError>(())
                    },
                );
                match outcome.into_result() {
                    Ok(()) => {
                        self.stats.write().incremental_updates += 1;
                        Ok(IncrementalAction::MetadataPatched)
                    }
                    Err(error) => Err(SyncError::Incremental {
                        message: error.message,
                    }),
                }
            }
            ChangeType::Deleted => {
                let store = Arc::clone(&self.store);
                let outcome =
                    self.executor
                        .execute("deprecate_registry_record", &budget, move || {
                            store.set_status(record_id, PublishStatus::Deprecated)?;
                            Ok::<_, SyncError>(())
                        });
                match outcome.into_result() {
                    Ok(()) => {
                        self.armed.write().remove(&event.resource_set_id);
                        self.stats.write().incremental_deprecations += 1;
                        Ok(IncrementalAction::Deprecated)
                    }
                    Err(error) => Err(SyncError::Incremental {
                        message: error.message,
                    }),
                }
            }
        }
    }

    /// Spawns a thread draining the provider's change feed into
    /// [`handle_change_event`] until the provider drops its sender.
    pub fn start_change_listener(self: Arc<Self>) -> thread::JoinHandle<()> {
        let receiver = self.provider.subscribe();
        thread::spawn(move || {
            while let Ok(event) = receiver.recv() {
                match self.handle_change_event(&event) {
                    Ok(action) => {
                        tracing::debug!(
                            sequence = event.sequence,
                            action = ?action,
                            "handled change event"
                        );
                    }
                    Err(error) => {
                        tracing::warn!(
                            sequence = event.sequence,
                            %error,
                            "change event handling failed"
                        );
                    }
                }
            }
        })
    }

    /// Returns the sync state of a resource set.
    pub fn get_sync_status(&self, resource_set_id: &str) -> SyncStatus {
        SyncStatus {
            resource_set_id: resource_set_id.to_string(),
            in_flight: self.in_flight.lock().contains(resource_set_id),
            armed: self.armed.read().contains_key(resource_set_id),
            last_report: self.last_reports.read().get(resource_set_id).cloned(),
        }
    }

    /// Returns aggregate cycle statistics.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Returns aggregate error counts from the classifier history.
    pub fn error_stats(&self) -> ErrorStats {
        self.executor.classifier().error_stats()
    }

    fn try_acquire(&self, resource_set_id: &str) -> Option<FlightGuard<'_>> {
        let mut set = self.in_flight.lock();
        if set.contains(resource_set_id) {
            return None;
        }
        set.insert(resource_set_id.to_string());
        Some(FlightGuard {
            set: &self.in_flight,
            id: resource_set_id.to_string(),
        })
    }

    fn run_step<T>(
        &self,
        step: SyncStep,
        operation: &str,
        budget: &ExecutorConfig,
        completed: &mut Vec<SyncStep>,
        op: impl Fn() -> Result<T, SyncError> + Send + Sync + 'static,
    ) -> Result<T, CycleFailure>
    where
        T: Send + 'static,
    {
        tracing::debug!(step = %step, operation, "running sync step");
        let outcome = self.executor.execute(operation, budget, op);
        match outcome.into_result() {
            Ok(data) => {
                completed.push(step);
                Ok(data)
            }
            Err(error) => {
                tracing::warn!(step = %step, code = error.code.as_str(), "sync step failed");
                Err(CycleFailure {
                    step,
                    error,
                    completed: completed.clone(),
                })
            }
        }
    }

    fn analyze_step(
        &self,
        resource_set_id: &str,
        completed: &mut Vec<SyncStep>,
    ) -> Result<AnalysisBundle, CycleFailure> {
        let provider = Arc::clone(&self.provider);
        let store = Arc::clone(&self.store);
        let analyzer = self.analyzer.clone();
        let set_id = resource_set_id.to_string();
        let budget = self
            .config
            .store_budget
            .clone()
            .with_context(resource_set_id);

        let bundle = self.run_step(
            SyncStep::Analyzing,
            "analyze_resource_set",
            &budget,
            completed,
            move || {
                let resources = provider.list_resources(&set_id)?;
                let existing = store.find_by_resource_set(&set_id)?;
                let context = AlignmentContext {
                    is_registered: existing.is_some(),
                    has_mappings: existing
                        .as_ref()
                        .map(|r| !r.endpoints.is_empty())
                        .unwrap_or(false),
                };

                let mut analyses = Vec::new();
                for resource in resources
                    .iter()
                    .filter(|r| analyzer.is_published_resource(&r.name))
                {
                    analyses.push(analyzer.analyze(resource, context)?);
                }
                Ok::<_, SyncError>(AnalysisBundle { analyses, existing })
            },
        )?;

        for analysis in &bundle.analyses {
            if analysis.report.needs_attention() {
                tracing::info!(
                    resource_set_id,
                    score = analysis.report.score,
                    "alignment below threshold, generation should be offered"
                );
            }
        }

        Ok(bundle)
    }

    fn run_full_cycle(
        &self,
        resource_set_id: &str,
        config: &PublishConfig,
    ) -> Result<CycleOutput, CycleFailure> {
        let mut completed = Vec::new();
        let store_budget = self
            .config
            .store_budget
            .clone()
            .with_context(resource_set_id);
        let local_budget = self
            .config
            .local_budget
            .clone()
            .with_context(resource_set_id);

        let bundle = self.analyze_step(resource_set_id, &mut completed)?;

        let build_bundle = bundle.clone();
        let build_config = config.clone();
        let build_set_id = resource_set_id.to_string();
        let (record, endpoints) = self.run_step(
            SyncStep::BuildingAggregate,
            "build_registry_aggregate",
            &local_budget,
            &mut completed,
            move || {
                let mut record = match &build_bundle.existing {
                    Some(existing) => existing.clone(),
                    None => RegistryRecord::draft(
                        &build_set_id,
                        build_config
                            .display_name
                            .clone()
                            .unwrap_or_else(|| build_set_id.clone()),
                    ),
                };
                if let Some(name) = &build_config.display_name {
                    record.display_name = name.clone();
                }
                if let Some(version) = &build_config.version {
                    record.version = version.clone();
                }
                if let Some(visibility) = build_config.visibility {
                    record.visibility = visibility;
                }

                let endpoints: Vec<EndpointSpec> = build_bundle
                    .analyses
                    .iter()
                    .flat_map(|a| a.endpoints.clone())
                    .collect();
                Ok::<_, SyncError>((record, endpoints))
            },
        )?;

        let upsert_store = Arc::clone(&self.store);
        let upsert_record = record.clone();
        let stored = self.run_step(
            SyncStep::UpsertingRegistry,
            "upsert_registry_record",
            &store_budget,
            &mut completed,
            move || Ok::<_, SyncError>(upsert_store.upsert_record(&upsert_record)?),
        )?;

        let record_id = stored.id;
        let expected = endpoints.len() as u64;
        let resources = bundle.analyses.len();

        self.replace_endpoints(
            record_id,
            endpoints,
            &store_budget,
            &local_budget,
            &mut completed,
        )?;

        let armed = Arc::clone(&self.armed);
        let arm_set_id = resource_set_id.to_string();
        self.run_step(
            SyncStep::ArmingNotifications,
            "arm_change_notifications",
            &local_budget,
            &mut completed,
            move || {
                armed.write().insert(arm_set_id.clone(), record_id);
                Ok::<_, SyncError>(())
            },
        )?;

        let published =
            self.verify_step(record_id, expected, &local_budget, &mut completed)?;

        completed.push(SyncStep::Done);
        Ok(CycleOutput {
            completed,
            resources,
            expected,
            published,
        })
    }

    fn run_endpoints_cycle(&self, resource_set_id: &str) -> Result<CycleOutput, CycleFailure> {
        let mut completed = Vec::new();
        let store_budget = self
            .config
            .store_budget
            .clone()
            .with_context(resource_set_id);
        let local_budget = self
            .config
            .local_budget
            .clone()
            .with_context(resource_set_id);

        let bundle = self.analyze_step(resource_set_id, &mut completed)?;

        let Some(existing) = bundle.existing.clone() else {
            let error = self.executor.classifier().classify(
                &format!("not found: registry record for resource set {resource_set_id}"),
                "sync_endpoints_only",
                resource_set_id,
            );
            return Err(CycleFailure {
                step: SyncStep::ClearingStale,
                error,
                completed,
            });
        };

        let endpoints: Vec<EndpointSpec> = bundle
            .analyses
            .iter()
            .flat_map(|a| a.endpoints.clone())
            .collect();
        let expected = endpoints.len() as u64;
        let resources = bundle.analyses.len();

        self.replace_endpoints(
            existing.id,
            endpoints,
            &store_budget,
            &local_budget,
            &mut completed,
        )?;

        let published =
            self.verify_step(existing.id, expected, &local_budget, &mut completed)?;

        completed.push(SyncStep::Done);
        Ok(CycleOutput {
            completed,
            resources,
            expected,
            published,
        })
    }

    /// Clears the record's endpoint set, then inserts the fresh one.
    ///
    /// The unconditional clear is what keeps endpoint sets
    /// replace-as-a-set: nothing from a previous sync can survive into
    /// the new set.
    fn replace_endpoints(
        &self,
        record_id: Uuid,
        endpoints: Vec<EndpointSpec>,
        store_budget: &ExecutorConfig,
        local_budget: &ExecutorConfig,
        completed: &mut Vec<SyncStep>,
    ) -> Result<(), CycleFailure> {
        let clear_store = Arc::clone(&self.store);
        self.run_step(
            SyncStep::ClearingStale,
            "clear_stale_endpoints",
            local_budget,
            completed,
            move || Ok::<_, SyncError>(clear_store.clear_endpoints(record_id)?),
        )?;

        let insert_store = Arc::clone(&self.store);
        self.run_step(
            SyncStep::InsertingFresh,
            "insert_fresh_endpoints",
            store_budget,
            completed,
            move || Ok::<_, SyncError>(insert_store.insert_endpoints(record_id, &endpoints)?),
        )?;

        Ok(())
    }

    /// Reads back the persisted endpoint count and compares it to the
    /// derived count.
    ///
    /// Count equality only: a content mismatch with a matching count
    /// passes undetected. Known weak check, kept as-is.
    fn verify_step(
        &self,
        record_id: Uuid,
        expected: u64,
        local_budget: &ExecutorConfig,
        completed: &mut Vec<SyncStep>,
    ) -> Result<u64, CycleFailure> {
        let verify_store = Arc::clone(&self.store);
        self.run_step(
            SyncStep::Verifying,
            "verify_endpoint_count",
            local_budget,
            completed,
            move || {
                let actual = verify_store.count_endpoints(record_id)?;
                if actual != expected {
                    return Err(SyncError::VerificationMismatch { expected, actual });
                }
                Ok::<_, SyncError>(actual)
            },
        )
    }

    fn finish(
        &self,
        resource_set_id: &str,
        start: Instant,
        result: Result<CycleOutput, CycleFailure>,
    ) -> SyncReport {
        let report = match result {
            Ok(output) => SyncReport {
                resource_set_id: resource_set_id.to_string(),
                success: true,
                completed_steps: output.completed,
                failed_step: None,
                error: None,
                resources_analyzed: output.resources,
                endpoints_expected: output.expected,
                endpoints_published: output.published,
                duration: start.elapsed(),
            },
            Err(failure) => SyncReport {
                resource_set_id: resource_set_id.to_string(),
                success: false,
                completed_steps: failure.completed,
                failed_step: Some(failure.step),
                error: Some(failure.error),
                resources_analyzed: 0,
                endpoints_expected: 0,
                endpoints_published: 0,
                duration: start.elapsed(),
            },
        };

        {
            let mut stats = self.stats.write();
            if report.success {
                stats.cycles_completed += 1;
                stats.endpoints_published += report.endpoints_published;
                stats.last_error = None;
            } else {
                stats.cycles_failed += 1;
                stats.last_error = report.error.as_ref().map(|e| e.message.clone());
            }
            stats.last_sync_time = Some(Instant::now());
        }

        if report.success {
            tracing::info!(resource_set_id, "{}", report.summary());
        } else {
            tracing::warn!(resource_set_id, "{}", report.summary());
        }

        self.last_reports
            .write()
            .insert(resource_set_id.to_string(), report.clone());
        report
    }
}

/// Bumps the trailing numeric segment of a version string.
fn bump_patch_version(version: &str) -> String {
    match version.rsplit_once('.') {
        Some((head, tail)) => match tail.parse::<u64>() {
            Ok(patch) => format!("{head}.{}", patch + 1),
            Err(_) => format!("{version}.1"),
        },
        None => match version.parse::<u64>() {
            Ok(single) => (single + 1).to_string(),
            Err(_) => format!("{version}.1"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apiforge_registry::{MemoryRegistryStore, MemoryResourceProvider, StoreError};
    use apiforge_testkit::fixtures::{
        audit_resource, orders_resource, seeded_provider, widgets_resource, SHOP_SET,
    };

    fn fast_config() -> OrchestratorConfig {
        OrchestratorConfig::new()
            .with_store_budget(
                ExecutorConfig::new()
                    .with_base_delay(Duration::from_millis(1))
                    .with_timeout(Duration::from_millis(2_000)),
            )
            .with_local_budget(
                ExecutorConfig::new()
                    .with_max_retries(1)
                    .with_base_delay(Duration::from_millis(1))
                    .with_timeout(Duration::from_millis(2_000)),
            )
    }

    fn orchestrator(
        provider: Arc<MemoryResourceProvider>,
        store: Arc<MemoryRegistryStore>,
    ) -> SyncOrchestrator {
        SyncOrchestrator::new(provider, store).with_config(fast_config())
    }

    #[test]
    fn full_cycle_publishes_all_endpoints() {
        let provider = seeded_provider();
        let store = Arc::new(MemoryRegistryStore::new());
        let orchestrator = orchestrator(provider, Arc::clone(&store));

        let report = orchestrator
            .publish_with_full_sync(SHOP_SET, &PublishConfig::new())
            .unwrap();

        // widgets has an identifier (5 endpoints), orders does not (2).
        assert!(report.success);
        assert_eq!(report.resources_analyzed, 2);
        assert_eq!(report.endpoints_expected, 7);
        assert_eq!(report.endpoints_published, 7);
        assert_eq!(report.completed_steps.last(), Some(&SyncStep::Done));

        let record = store.find_by_resource_set(SHOP_SET).unwrap().unwrap();
        assert_eq!(record.endpoints.len(), 7);

        let stats = orchestrator.stats();
        assert_eq!(stats.cycles_completed, 1);
        assert_eq!(stats.endpoints_published, 7);
    }

    #[test]
    fn internal_tables_are_skipped() {
        let provider = MemoryResourceProvider::new();
        provider.insert_set(SHOP_SET, vec![widgets_resource(), audit_resource()]);
        let store = Arc::new(MemoryRegistryStore::new());
        let orchestrator = orchestrator(Arc::new(provider), Arc::clone(&store));

        let report = orchestrator
            .publish_with_full_sync(SHOP_SET, &PublishConfig::new())
            .unwrap();

        assert!(report.success);
        assert_eq!(report.resources_analyzed, 1);
        assert_eq!(report.endpoints_published, 5);
    }

    #[test]
    fn transient_store_failure_is_retried() {
        let provider = seeded_provider();
        let store = Arc::new(MemoryRegistryStore::new());
        store.fail_next(
            "upsert_record",
            StoreError::unavailable("connection refused"),
        );
        let orchestrator = orchestrator(provider, Arc::clone(&store));

        let report = orchestrator
            .publish_with_full_sync(SHOP_SET, &PublishConfig::new())
            .unwrap();

        assert!(report.success);
        assert!(store.find_by_resource_set(SHOP_SET).unwrap().is_some());
    }

    #[test]
    fn fatal_step_failure_aborts_cycle() {
        let provider = seeded_provider();
        let store = Arc::new(MemoryRegistryStore::new());
        store.fail_next(
            "clear_endpoints",
            StoreError::unauthorized("token expired"),
        );
        let orchestrator = orchestrator(provider, Arc::clone(&store));

        let report = orchestrator
            .publish_with_full_sync(SHOP_SET, &PublishConfig::new())
            .unwrap();

        assert!(!report.success);
        assert_eq!(report.failed_step, Some(SyncStep::ClearingStale));
        assert_eq!(
            report.error.as_ref().unwrap().code,
            crate::classify::ErrorCode::AuthError
        );
        // The insert step never ran.
        let record = store.find_by_resource_set(SHOP_SET).unwrap().unwrap();
        assert!(record.endpoints.is_empty());

        assert_eq!(orchestrator.stats().cycles_failed, 1);
    }

    #[test]
    fn verification_gate_catches_dropped_inserts() {
        let provider = seeded_provider();
        let store = Arc::new(MemoryRegistryStore::new());
        store.drop_next_inserts(1);
        let orchestrator = orchestrator(provider, Arc::clone(&store));

        let report = orchestrator
            .publish_with_full_sync(SHOP_SET, &PublishConfig::new())
            .unwrap();

        assert!(!report.success);
        assert_eq!(report.failed_step, Some(SyncStep::Verifying));
        assert!(report
            .error
            .as_ref()
            .unwrap()
            .message
            .contains("verification failed"));
    }

    #[test]
    fn concurrent_sync_for_same_set_is_rejected() {
        let provider = seeded_provider();
        let store = Arc::new(MemoryRegistryStore::new());
        // Two transient failures force the first cycle into backoff
        // sleeps long enough for the second call to overlap.
        store.fail_next(
            "upsert_record",
            StoreError::unavailable("connection refused"),
        );
        store.fail_next(
            "upsert_record",
            StoreError::unavailable("connection refused"),
        );

        let config = fast_config().with_store_budget(
            ExecutorConfig::new()
                .with_base_delay(Duration::from_millis(200))
                .with_timeout(Duration::from_millis(2_000)),
        );
        let orchestrator = Arc::new(
            SyncOrchestrator::new(provider, store.clone()).with_config(config),
        );

        let first = Arc::clone(&orchestrator);
        let handle = thread::spawn(move || {
            first.publish_with_full_sync(SHOP_SET, &PublishConfig::new())
        });

        thread::sleep(Duration::from_millis(100));
        let second = orchestrator.publish_with_full_sync(SHOP_SET, &PublishConfig::new());
        assert!(matches!(second, Err(SyncError::SyncInProgress { .. })));

        let report = handle.join().unwrap().unwrap();
        assert!(report.success);
        // One upsert, one clear, one insert: the rejected call wrote
        // nothing.
        assert_eq!(store.write_count(), 3);
    }

    #[test]
    fn guard_released_after_failure() {
        let provider = seeded_provider();
        let store = Arc::new(MemoryRegistryStore::new());
        store.drop_next_inserts(1);
        let orchestrator = orchestrator(provider, Arc::clone(&store));

        let failed = orchestrator
            .publish_with_full_sync(SHOP_SET, &PublishConfig::new())
            .unwrap();
        assert!(!failed.success);
        assert!(!orchestrator.get_sync_status(SHOP_SET).in_flight);

        let retried = orchestrator
            .publish_with_full_sync(SHOP_SET, &PublishConfig::new())
            .unwrap();
        assert!(retried.success);
    }

    #[test]
    fn endpoints_only_requires_existing_record() {
        let provider = seeded_provider();
        let store = Arc::new(MemoryRegistryStore::new());
        let orchestrator = orchestrator(provider, Arc::clone(&store));

        let report = orchestrator.sync_endpoints_only(SHOP_SET).unwrap();
        assert!(!report.success);
        assert_eq!(report.failed_step, Some(SyncStep::ClearingStale));
    }

    #[test]
    fn endpoints_only_keeps_metadata() {
        let provider = seeded_provider();
        let store = Arc::new(MemoryRegistryStore::new());
        let record = RegistryRecord::draft(SHOP_SET, "Shop API").with_version("2.0.0");
        store.upsert_record(&record).unwrap();
        let orchestrator = orchestrator(provider, Arc::clone(&store));

        let report = orchestrator.sync_endpoints_only(SHOP_SET).unwrap();
        assert!(report.success);
        assert_eq!(report.endpoints_published, 7);

        let stored = store.get_record(record.id).unwrap();
        assert_eq!(stored.version, "2.0.0");
        assert_eq!(stored.endpoints.len(), 7);
        // Endpoints-only syncs do not arm notifications.
        assert!(!orchestrator.get_sync_status(SHOP_SET).armed);
    }

    #[test]
    fn incremental_update_patches_version() {
        let provider = seeded_provider();
        let store = Arc::new(MemoryRegistryStore::new());
        let orchestrator = orchestrator(Arc::clone(&provider), Arc::clone(&store));

        orchestrator
            .publish_with_full_sync(SHOP_SET, &PublishConfig::new())
            .unwrap();
        assert!(orchestrator.get_sync_status(SHOP_SET).armed);

        let record = store.find_by_resource_set(SHOP_SET).unwrap().unwrap();
        let event = ResourceChangeEvent::updated(1, SHOP_SET, "widgets");
        let action = orchestrator.handle_change_event(&event).unwrap();

        assert_eq!(action, IncrementalAction::MetadataPatched);
        let patched = store.get_record(record.id).unwrap();
        assert_eq!(patched.version, "0.1.1");
        assert_eq!(orchestrator.stats().incremental_updates, 1);
    }

    #[test]
    fn incremental_delete_deprecates_record() {
        let provider = seeded_provider();
        let store = Arc::new(MemoryRegistryStore::new());
        let orchestrator = orchestrator(Arc::clone(&provider), Arc::clone(&store));

        orchestrator
            .publish_with_full_sync(SHOP_SET, &PublishConfig::new())
            .unwrap();

        let record = store.find_by_resource_set(SHOP_SET).unwrap().unwrap();
        let event = ResourceChangeEvent::deleted(1, SHOP_SET, "widgets");
        let action = orchestrator.handle_change_event(&event).unwrap();

        assert_eq!(action, IncrementalAction::Deprecated);
        let stored = store.get_record(record.id).unwrap();
        assert_eq!(stored.status, PublishStatus::Deprecated);
        // The record survives deprecation.
        assert_eq!(store.records().len(), 1);
        assert!(!orchestrator.get_sync_status(SHOP_SET).armed);
    }

    #[test]
    fn unarmed_events_are_ignored() {
        let provider = seeded_provider();
        let store = Arc::new(MemoryRegistryStore::new());
        let orchestrator = orchestrator(provider, store);

        let event = ResourceChangeEvent::updated(1, SHOP_SET, "widgets");
        let action = orchestrator.handle_change_event(&event).unwrap();
        assert_eq!(action, IncrementalAction::Ignored);
    }

    #[test]
    fn change_listener_drains_feed() {
        let provider = seeded_provider();
        let store = Arc::new(MemoryRegistryStore::new());
        let orchestrator = Arc::new(orchestrator(Arc::clone(&provider), Arc::clone(&store)));

        orchestrator
            .publish_with_full_sync(SHOP_SET, &PublishConfig::new())
            .unwrap();

        // The listener holds the orchestrator (and so the provider)
        // alive; it is left detached rather than joined.
        let _handle = Arc::clone(&orchestrator).start_change_listener();
        provider.emit_updated(SHOP_SET, "widgets");

        // Give the listener thread time to drain the event.
        for _ in 0..50 {
            if orchestrator.stats().incremental_updates > 0 {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(orchestrator.stats().incremental_updates, 1);
    }

    #[test]
    fn different_sets_sync_independently() {
        let provider = MemoryResourceProvider::new();
        provider.insert_set("set-a", vec![widgets_resource()]);
        provider.insert_set("set-b", vec![orders_resource()]);
        let store = Arc::new(MemoryRegistryStore::new());
        let orchestrator = Arc::new(orchestrator(Arc::new(provider), Arc::clone(&store)));

        let a = Arc::clone(&orchestrator);
        let b = Arc::clone(&orchestrator);
        let handle_a =
            thread::spawn(move || a.publish_with_full_sync("set-a", &PublishConfig::new()));
        let handle_b =
            thread::spawn(move || b.publish_with_full_sync("set-b", &PublishConfig::new()));

        assert!(handle_a.join().unwrap().unwrap().success);
        assert!(handle_b.join().unwrap().unwrap().success);
        assert_eq!(store.records().len(), 2);
    }

    #[test]
    fn bump_patch_version_formats() {
        assert_eq!(bump_patch_version("0.1.0"), "0.1.1");
        assert_eq!(bump_patch_version("2.3.9"), "2.3.10");
        assert_eq!(bump_patch_version("7"), "8");
        assert_eq!(bump_patch_version("beta"), "beta.1");
    }
}
