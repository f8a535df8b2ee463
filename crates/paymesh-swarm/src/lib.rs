// Priority-scheduled, role-routed agent swarm with weighted consensus

pub mod coordinator;
pub mod handler;
pub mod queue;
pub mod types;

pub use coordinator::*;
pub use handler::*;
pub use queue::*;
pub use types::*;

#[derive(Debug, Clone, thiserror::Error)]
pub enum SwarmError {
    #[error("no eligible agents for task kind {0:?}")]
    NoEligibleAgents(TaskKind),
    #[error("task not found: {0}")]
    TaskNotFound(String),
    #[error("agent not found: {0}")]
    AgentNotFound(String),
    #[error("task {task_id} exceeded its deadline")]
    Timeout { task_id: String },
    #[error("handler failure: {0}")]
    HandlerFailure(String),
    #[error("swarm is shut down")]
    ShutDown,
}
