// Agent, task, vote, and configuration types

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Specialization of an agent; selects which task kinds it can serve and
/// seeds its simulated voting behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentRole {
    Validator,
    Executor,
    Optimizer,
    RiskAssessor,
    Coordinator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Active,
    Busy,
    Offline,
    Failed,
}

/// One worker in the swarm. Created at swarm construction; only its status
/// and last-active timestamp change afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub role: AgentRole,
    pub capabilities: Vec<String>,
    pub voting_weight: f64,
    pub status: AgentStatus,
    pub last_active: DateTime<Utc>,
}

/// Semantic class of work; maps onto the roles allowed to serve it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Validate,
    Execute,
    Optimize,
    AssessRisk,
    Coordinate,
}

impl TaskKind {
    pub fn eligible_roles(&self) -> &'static [AgentRole] {
        match self {
            TaskKind::Validate => &[AgentRole::Validator, AgentRole::RiskAssessor],
            TaskKind::Execute => &[AgentRole::Executor],
            TaskKind::Optimize => &[AgentRole::Optimizer],
            TaskKind::AssessRisk => &[AgentRole::RiskAssessor, AgentRole::Validator],
            TaskKind::Coordinate => &[AgentRole::Coordinator],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Assigned,
    InProgress,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// A unit of work flowing through the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmTask {
    pub id: String,
    pub kind: TaskKind,
    /// Higher runs sooner; ties resolve in submission order.
    pub priority: i32,
    pub payload: serde_json::Value,
    pub assigned_agent: Option<String>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub deadline: Option<DateTime<Utc>>,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    /// Assignment generation; bumped every time the task is handed to an
    /// agent so stale handler completions can be ignored.
    pub attempts: u32,
}

/// One ballot in a consensus round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub agent_id: String,
    pub decision: bool,
    pub confidence: f64,
    pub reasoning: String,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of a weighted consensus round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub topic: String,
    pub decision: bool,
    pub consensus_reached: bool,
    pub approval_ratio: f64,
    pub yes_weight: f64,
    pub no_weight: f64,
    pub confidence: f64,
    pub participation_rate: f64,
    pub votes: Vec<Vote>,
}

/// Aggregate view of the swarm for monitoring.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SwarmStatus {
    pub agents_total: usize,
    pub agents_active: usize,
    pub agents_busy: usize,
    pub agents_offline: usize,
    pub agents_failed: usize,
    pub queued_tasks: usize,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
}

/// Per-role priors seeding simulated votes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RolePrior {
    pub approval: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone)]
pub struct SwarmConfig {
    /// Approval-weight ratio required to reach consensus (either way).
    pub consensus_threshold: f64,
    pub recovery_enabled: bool,
    pub recovery_delay: Duration,
    pub role_priors: HashMap<AgentRole, RolePrior>,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        let mut role_priors = HashMap::new();
        role_priors.insert(AgentRole::Validator, RolePrior { approval: 0.8, confidence: 0.85 });
        role_priors.insert(AgentRole::Executor, RolePrior { approval: 0.75, confidence: 0.8 });
        role_priors.insert(AgentRole::Optimizer, RolePrior { approval: 0.7, confidence: 0.75 });
        role_priors.insert(AgentRole::RiskAssessor, RolePrior { approval: 0.6, confidence: 0.9 });
        role_priors.insert(AgentRole::Coordinator, RolePrior { approval: 0.8, confidence: 0.8 });

        Self {
            consensus_threshold: 0.66,
            recovery_enabled: true,
            recovery_delay: Duration::from_secs(30),
            role_priors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_to_role_mapping() {
        assert_eq!(
            TaskKind::Validate.eligible_roles(),
            &[AgentRole::Validator, AgentRole::RiskAssessor]
        );
        assert_eq!(TaskKind::Execute.eligible_roles(), &[AgentRole::Executor]);
        assert_eq!(TaskKind::Optimize.eligible_roles(), &[AgentRole::Optimizer]);
        assert_eq!(
            TaskKind::AssessRisk.eligible_roles(),
            &[AgentRole::RiskAssessor, AgentRole::Validator]
        );
        assert_eq!(
            TaskKind::Coordinate.eligible_roles(),
            &[AgentRole::Coordinator]
        );
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Assigned.is_terminal());
        assert!(!TaskStatus::InProgress.is_terminal());
    }
}
