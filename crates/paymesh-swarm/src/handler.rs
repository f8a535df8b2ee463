// Agent handler trait and the simulated default

use std::collections::HashMap;

use async_trait::async_trait;
use rand::Rng;
use serde_json::json;
use tracing::debug;

use crate::{Agent, AgentRole, RolePrior, SwarmError, SwarmTask};

/// Work surface of an agent. Real deployments wire task execution and voting
/// to external services; the default implementation simulates both.
#[async_trait]
pub trait AgentHandler: Send + Sync {
    async fn execute(
        &self,
        agent: &Agent,
        task: &SwarmTask,
    ) -> Result<serde_json::Value, SwarmError>;

    /// Produce `(decision, confidence, reasoning)` for a consensus topic.
    async fn vote(
        &self,
        agent: &Agent,
        topic: &str,
        payload: &serde_json::Value,
    ) -> Result<(bool, f64, String), SwarmError>;
}

/// Simulated handler: task execution succeeds with a structured receipt,
/// votes are seeded from per-role approval and confidence priors.
#[derive(Debug, Default)]
pub struct SimulatedHandler {
    priors: HashMap<AgentRole, RolePrior>,
}

impl SimulatedHandler {
    pub fn new(priors: HashMap<AgentRole, RolePrior>) -> Self {
        Self { priors }
    }

    fn prior_for(&self, role: AgentRole) -> RolePrior {
        self.priors.get(&role).copied().unwrap_or(RolePrior {
            approval: 0.7,
            confidence: 0.8,
        })
    }
}

#[async_trait]
impl AgentHandler for SimulatedHandler {
    async fn execute(
        &self,
        agent: &Agent,
        task: &SwarmTask,
    ) -> Result<serde_json::Value, SwarmError> {
        debug!(agent_id = %agent.id, task_id = %task.id, kind = ?task.kind, "Simulating task execution");
        Ok(json!({
            "task_id": task.id,
            "handled_by": agent.id,
            "role": agent.role,
            "status": "ok",
        }))
    }

    async fn vote(
        &self,
        agent: &Agent,
        topic: &str,
        _payload: &serde_json::Value,
    ) -> Result<(bool, f64, String), SwarmError> {
        let prior = self.prior_for(agent.role);
        let mut rng = rand::thread_rng();
        let decision = rng.gen::<f64>() < prior.approval;
        let confidence = (prior.confidence + rng.gen_range(-0.05..0.05)).clamp(0.0, 1.0);
        let reasoning = format!(
            "{:?} {} on '{topic}' (prior approval {:.2})",
            agent.role,
            if decision { "approves" } else { "rejects" },
            prior.approval,
        );
        Ok((decision, confidence, reasoning))
    }
}
