// Cross-chain route search over a bridge graph

pub mod feeds;
pub mod gas;
pub mod router;
pub mod types;

pub use feeds::*;
pub use gas::*;
pub use router::*;
pub use types::*;

use bigdecimal::BigDecimal;

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("no route from {from} to {to} within {max_hops} hops")]
    NoRoute {
        from: String,
        to: String,
        max_hops: usize,
    },
    #[error("amount {amount} outside supported bridge ranges from {from} to {to}")]
    AmountOutOfRange {
        from: String,
        to: String,
        amount: BigDecimal,
    },
    #[error("unknown chain: {0}")]
    UnknownChain(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("feed failure: {0}")]
    FeedFailure(String),
}
