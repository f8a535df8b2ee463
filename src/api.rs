// src/api.rs - Library-surface request and response shapes

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use paymesh_router::RouteObjective;
use paymesh_swarm::{AgentRole, TaskKind};

use crate::models::{GeoLocation, Transaction};

/// Request to score one transaction. Mirrors the transaction record; the
/// engine stamps identity and time when they are omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub transaction_id: Option<String>,
    pub user_id: String,
    pub amount: BigDecimal,
    pub from_address: String,
    pub to_address: String,
    pub chain: String,
    pub ip_address: Option<String>,
    pub geo: Option<GeoLocation>,
}

impl AnalyzeRequest {
    pub fn into_transaction(
        self,
        id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    ) -> Transaction {
        Transaction {
            id: self.transaction_id.unwrap_or(id),
            user_id: self.user_id,
            amount: self.amount,
            timestamp,
            from_address: self.from_address,
            to_address: self.to_address,
            chain: self.chain,
            ip_address: self.ip_address,
            geo: self.geo,
        }
    }
}

/// Request to recompute the yield allocation for an idle balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeRequest {
    pub balance: BigDecimal,
}

/// Request for a cross-chain route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRequest {
    pub from: String,
    pub to: String,
    pub amount: BigDecimal,
    #[serde(default)]
    pub objective: RouteObjective,
}

/// Request to queue a unit of work on the swarm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitTaskRequest {
    pub kind: TaskKind,
    pub payload: serde_json::Value,
    pub priority: i32,
    /// Seconds until the task deadline, when one applies.
    pub deadline_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitTaskResponse {
    pub task_id: String,
}

/// Request for a weighted consensus round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusRequest {
    pub topic: String,
    pub payload: serde_json::Value,
    pub role_filter: Option<Vec<AgentRole>>,
}
