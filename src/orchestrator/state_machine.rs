// src/orchestrator/state_machine.rs - Payment lifecycle state machine

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::OrchestratorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Received,
    Screening,
    Priced,
    UnderConsensus,
    Routing,
    Executing,
    Completed,
    Rejected,
    Failed,
}

pub struct PaymentStateMachine {
    transitions: HashMap<PaymentStatus, Vec<PaymentStatus>>,
}

impl PaymentStateMachine {
    pub fn new() -> Self {
        let mut transitions = HashMap::new();

        transitions.insert(
            PaymentStatus::Received,
            vec![PaymentStatus::Screening, PaymentStatus::Failed],
        );

        transitions.insert(
            PaymentStatus::Screening,
            vec![
                PaymentStatus::Priced,
                PaymentStatus::Rejected,
                PaymentStatus::Failed,
            ],
        );

        transitions.insert(
            PaymentStatus::Priced,
            vec![
                PaymentStatus::UnderConsensus,
                PaymentStatus::Routing,
                PaymentStatus::Failed,
            ],
        );

        transitions.insert(
            PaymentStatus::UnderConsensus,
            vec![
                PaymentStatus::Routing,
                PaymentStatus::Rejected,
                PaymentStatus::Failed,
            ],
        );

        transitions.insert(
            PaymentStatus::Routing,
            vec![PaymentStatus::Executing, PaymentStatus::Failed],
        );

        transitions.insert(
            PaymentStatus::Executing,
            vec![
                PaymentStatus::Completed,
                PaymentStatus::Rejected,
                PaymentStatus::Failed,
            ],
        );

        // Terminal states
        transitions.insert(PaymentStatus::Completed, vec![]);
        transitions.insert(PaymentStatus::Rejected, vec![]);
        transitions.insert(PaymentStatus::Failed, vec![]);

        Self { transitions }
    }

    pub fn can_transition(&self, from: PaymentStatus, to: PaymentStatus) -> bool {
        self.transitions
            .get(&from)
            .map(|allowed| allowed.contains(&to))
            .unwrap_or(false)
    }

    pub fn transition(
        &self,
        payment_id: &str,
        status: &mut PaymentStatus,
        next: PaymentStatus,
    ) -> Result<(), OrchestratorError> {
        if !self.can_transition(*status, next) {
            return Err(OrchestratorError::InvalidStateTransition {
                from: *status,
                to: next,
            });
        }

        let previous = *status;
        *status = next;
        tracing::info!(
            payment_id = %payment_id,
            from = ?previous,
            to = ?next,
            "Payment state transition"
        );
        Ok(())
    }

    pub fn is_terminal(&self, status: &PaymentStatus) -> bool {
        matches!(
            status,
            PaymentStatus::Completed | PaymentStatus::Rejected | PaymentStatus::Failed
        )
    }
}

impl Default for PaymentStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
