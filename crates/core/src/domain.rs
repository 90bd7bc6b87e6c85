//! Tracked-application domain model: what the dashboard knows about one
//! deployable unit and what the cluster reports back about it.

#![forbid(unsafe_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::SyncStatus;

/// One tracked application: where its declared task definition lives and
/// which ECS service it drives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub name: String,
    pub sync: SyncState,
    pub git: GitSource,
    pub ecs: EcsTarget,
    pub aws: AwsConfig,
}

impl Application {
    pub fn new(name: impl Into<String>, git: GitSource, ecs: EcsTarget, aws: AwsConfig) -> Self {
        Self {
            name: name.into(),
            sync: SyncState::default(),
            git,
            ecs,
            aws,
        }
    }
}

/// Last known sync classification. Recomputed on every read; `Error` set by
/// an earlier fetch failure short-circuits further diffing in that pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncState {
    pub status: SyncStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            status: SyncStatus::OutOfSync,
            last_synced_at: None,
        }
    }
}

/// Repository coordinates of the declared task definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitSource {
    pub repo: String,
    pub branch: String,
    pub path: String,
}

/// The running service this application is synchronized against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EcsTarget {
    pub cluster: String,
    pub service: String,
}

/// Account/credential coordinates handed to the cloud collaborator. The
/// engine never interprets these.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AwsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
    pub external_id: String,
}

/// Snapshot of a running ECS service as reported by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceState {
    pub status: String,
    pub desired_count: i64,
    pub running_count: i64,
    /// ARN of the task definition the service currently points at.
    pub task_definition: String,
    pub deployments: Vec<DeploymentState>,
}

/// One deployment on the service. The rollout machine is provider-owned;
/// callers observe it by re-reading service state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentState {
    pub status: String,
    pub rollout_state: RolloutState,
    pub rollout_state_reason: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RolloutState {
    Completed,
    InProgress,
    Failed,
}

impl RolloutState {
    /// Parse the provider's rollout-state string; unknown values read as
    /// `Failed`.
    pub fn parse(s: &str) -> Self {
        match s {
            "COMPLETED" => Self::Completed,
            "IN_PROGRESS" => Self::InProgress,
            _ => Self::Failed,
        }
    }
}
