//! Drifter core types: drift diff records, sync status and the error taxonomy.
//!
//! Everything in this crate is pure and synchronous; fetching lives in
//! `drifter-engine`.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

pub mod diff;
pub mod domain;
pub mod taskdef;

pub use diff::{diff_maps, DiffEntry, DiffKind, DiffSummary};
pub use domain::{
    Application, AwsConfig, DeploymentState, EcsTarget, GitSource, RolloutState, ServiceState,
    SyncState,
};
pub use taskdef::{flatten, normalize, FlatMap};

/// Aggregate sync state of one tracked application. Derived on every read,
/// never a source of truth.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SyncStatus {
    InSync,
    OutOfSync,
    Error,
}

/// Failures surfaced by a single diff/sync/rollback call. All terminal for
/// that call; retry policy belongs to collaborators or the caller.
#[derive(Debug, thiserror::Error)]
pub enum DriftError {
    /// Task definition file missing, branch missing, or content unparsable.
    #[error("task definition not found in source control")]
    TaskDefNotFound,
    /// The cluster has no service matching the application's target.
    #[error("ECS service not found: {0}")]
    ServiceNotFound(String),
    /// The service exists but carries no active task definition reference.
    #[error("service has no active task definition reference")]
    ReferenceMissing,
    /// The provider could not expand a task definition ARN into a full
    /// task definition.
    #[error("task definition could not be resolved: {0}")]
    ResolveFailed(String),
    /// Transport/auth/throttling failure from a collaborator.
    #[error("provider call failed: {0}")]
    Provider(#[from] anyhow::Error),
}

pub type DriftResult<T> = Result<T, DriftError>;
