// Risk-filtered yield allocation with hysteresis-gated rebalancing

pub mod adapters;
pub mod allocator;
pub mod types;

pub use adapters::*;
pub use allocator::*;
pub use types::*;

use bigdecimal::BigDecimal;

#[derive(Debug, thiserror::Error)]
pub enum YieldError {
    #[error("protocol feed failure: {0}")]
    FeedFailure(String),
    #[error("adapter failure on {protocol}: {reason}")]
    AdapterFailure { protocol: String, reason: String },
    #[error("capacity exceeded: withdrawing {requested} from {protocol} holding {held}")]
    CapacityExceeded {
        protocol: String,
        requested: BigDecimal,
        held: BigDecimal,
    },
    #[error("allocator already running")]
    AlreadyRunning,
}
