//! Drifter engine: fetches the declared and running task definitions,
//! produces the drift diff, and drives sync/rollback through narrow
//! collaborator traits.
//!
//! The engine holds no state between calls and never caches a fetched task
//! definition; staleness is unacceptable for a deployment gate.

#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use metrics::{counter, histogram};
use serde_json::Value as Json;
use tracing::{info, warn};

use drifter_core::{
    diff_maps, flatten, normalize, Application, DiffEntry, DriftError, DriftResult, EcsTarget,
    ServiceState, SyncStatus,
};

/// Source-control collaborator. Resolves the application's repo/branch/path
/// to the latest committed task definition. Missing file, missing branch and
/// unparsable content all read uniformly as `None`; transport failures are
/// errors.
#[async_trait::async_trait]
pub trait SourceControl: Send + Sync {
    async fn task_definition(&self, app: &Application) -> Result<Option<Json>>;
}

/// Cloud-provider collaborator for the ECS surface the engine touches.
#[async_trait::async_trait]
pub trait EcsCloud: Send + Sync {
    async fn describe_service(&self, target: &EcsTarget) -> Result<Option<ServiceState>>;
    async fn describe_task_definition(&self, arn: &str) -> Result<Option<Json>>;
    /// Registers a new immutable revision and returns its ARN. This consumes
    /// a revision slot even if the service is never updated to it.
    async fn register_task_definition(&self, taskdef: &Json) -> Result<String>;
    async fn update_service(&self, target: &EcsTarget, arn: &str) -> Result<()>;
    /// Cancel the in-flight deployment; the provider reverts the service to
    /// its previous stable revision.
    async fn stop_deployment(&self, target: &EcsTarget) -> Result<()>;
}

/// Orchestrates diff, sync and rollback for tracked applications.
pub struct DeploymentEngine {
    scm: Arc<dyn SourceControl>,
    ecs: Arc<dyn EcsCloud>,
}

impl DeploymentEngine {
    pub fn new(scm: Arc<dyn SourceControl>, ecs: Arc<dyn EcsCloud>) -> Self {
        Self { scm, ecs }
    }

    /// Compare the declared task definition against the one the service is
    /// running. Empty result means no drift.
    pub async fn diff(&self, app: &Application) -> DriftResult<Vec<DiffEntry>> {
        let t0 = Instant::now();
        counter!("drift_diff_attempts", 1u64);
        info!(app = %app.name, "diff start");

        // The git fetch and the service lookup are independent; overlap them.
        let (declared, service) = tokio::join!(
            self.scm.task_definition(app),
            self.ecs.describe_service(&app.ecs),
        );
        let declared = declared
            .map_err(DriftError::Provider)?
            .ok_or(DriftError::TaskDefNotFound)?;
        let service = service.map_err(DriftError::Provider)?.ok_or_else(|| {
            DriftError::ServiceNotFound(format!("{}/{}", app.ecs.cluster, app.ecs.service))
        })?;
        if service.task_definition.is_empty() {
            return Err(DriftError::ReferenceMissing);
        }
        let current = self
            .ecs
            .describe_task_definition(&service.task_definition)
            .await
            .map_err(DriftError::Provider)?
            .ok_or_else(|| DriftError::ResolveFailed(service.task_definition.clone()))?;

        let current_map = flatten(&normalize(&current));
        let target_map = flatten(&normalize(&declared));
        let diffs = diff_maps(&current_map, &target_map);

        histogram!("drift_diff_latency_ms", t0.elapsed().as_secs_f64() * 1000.0);
        info!(app = %app.name, entries = diffs.len(), took_ms = %t0.elapsed().as_millis(), "diff done");
        Ok(diffs)
    }

    /// Register the declared task definition as a new revision and point the
    /// service at it. If registration fails the service is never touched.
    pub async fn sync(&self, app: &Application) -> DriftResult<()> {
        let t0 = Instant::now();
        counter!("drift_sync_attempts", 1u64);
        info!(app = %app.name, "sync start");

        let declared = self
            .scm
            .task_definition(app)
            .await
            .map_err(DriftError::Provider)?
            .ok_or(DriftError::TaskDefNotFound)?;
        let arn = self
            .ecs
            .register_task_definition(&declared)
            .await
            .map_err(DriftError::Provider)?;
        info!(app = %app.name, arn = %arn, "task definition registered");
        self.ecs
            .update_service(&app.ecs, &arn)
            .await
            .map_err(DriftError::Provider)?;

        counter!("drift_sync_ok", 1u64);
        info!(app = %app.name, took_ms = %t0.elapsed().as_millis(), "sync done");
        Ok(())
    }

    /// Cancel the in-flight deployment. The reversion target is entirely the
    /// provider's choice.
    pub async fn rollback(&self, app: &Application) -> DriftResult<()> {
        counter!("drift_rollback_attempts", 1u64);
        info!(app = %app.name, "rollback start");
        self.ecs
            .stop_deployment(&app.ecs)
            .await
            .map_err(DriftError::Provider)?;
        info!(app = %app.name, "rollback requested");
        Ok(())
    }

    /// Current service snapshot, for callers polling a rollout.
    pub async fn service_state(&self, app: &Application) -> DriftResult<ServiceState> {
        self.ecs
            .describe_service(&app.ecs)
            .await
            .map_err(DriftError::Provider)?
            .ok_or_else(|| {
                DriftError::ServiceNotFound(format!("{}/{}", app.ecs.cluster, app.ecs.service))
            })
    }

    /// Derive the tri-state sync status for one application. An application
    /// already flagged `Error` by an earlier fetch failure stays `Error`
    /// without another diff; any diff failure folds into `Error` here rather
    /// than propagating.
    pub async fn sync_status(&self, app: &Application) -> SyncStatus {
        if app.sync.status == SyncStatus::Error {
            return SyncStatus::Error;
        }
        match self.diff(app).await {
            Ok(diffs) if diffs.is_empty() => SyncStatus::InSync,
            Ok(_) => SyncStatus::OutOfSync,
            Err(e) => {
                warn!(app = %app.name, error = %e, "sync status errored");
                counter!("drift_status_errors", 1u64);
                SyncStatus::Error
            }
        }
    }

    /// Resolve a whole collection at once. Every application is diffed
    /// independently; one provider outage classifies that item as `Error`
    /// and leaves its siblings untouched.
    pub async fn sync_statuses(&self, apps: &[Application]) -> Vec<SyncStatus> {
        futures::future::join_all(apps.iter().map(|app| self.sync_status(app))).await
    }
}
