// src/orchestrator/types.rs - Payment request and decision types

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use paymesh_router::{RouteObjective, RouteResult};
use paymesh_swarm::ConsensusResult;

use crate::fraud::RiskLevel;
use crate::models::GeoLocation;

/// Incoming payment request, as handed over by whatever surface fronts the
/// engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub user_id: String,
    pub amount: BigDecimal,
    pub from_address: String,
    pub to_address: String,
    pub from_chain: String,
    pub to_chain: String,
    pub objective: Option<RouteObjective>,
    pub ip_address: Option<String>,
    pub geo: Option<GeoLocation>,
}

/// Condensed view of the fraud analysis attached to a decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskSummary {
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub confidence: f64,
}

/// Final outcome of a payment request. Every non-approve path carries a
/// structured reason; swarm rejections include the consensus tally.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PaymentDecision {
    Executed {
        payment_id: String,
        risk: RiskSummary,
        price: BigDecimal,
        route: RouteResult,
        consensus: Option<ConsensusResult>,
        execution_task_id: String,
    },
    Rejected {
        payment_id: String,
        risk_level: RiskLevel,
        reason: String,
        consensus: Option<ConsensusResult>,
    },
}

impl PaymentDecision {
    pub fn is_executed(&self) -> bool {
        matches!(self, PaymentDecision::Executed { .. })
    }

    pub fn payment_id(&self) -> &str {
        match self {
            PaymentDecision::Executed { payment_id, .. } => payment_id,
            PaymentDecision::Rejected { payment_id, .. } => payment_id,
        }
    }
}
