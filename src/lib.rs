// src/lib.rs - Paymesh: decision-and-execution fabric for cross-chain payments

pub mod api;
pub mod config;
pub mod constants;
pub mod engine;
pub mod fraud;
pub mod models;
pub mod orchestrator;
pub mod pricing;
pub mod profile;
pub mod utils;

pub use api::{
    AnalyzeRequest, ConsensusRequest, OptimizeRequest, RouteRequest, SubmitTaskRequest,
    SubmitTaskResponse,
};
pub use config::EngineConfig;
pub use engine::{EngineBuilder, PaymeshEngine};
pub use fraud::{Blocklist, FraudAnalysis, FraudAnalyzer, FraudConfig};
pub use models::{GeoLocation, Transaction};
pub use orchestrator::{
    OrchestratorConfig, OrchestratorError, PaymentDecision, PaymentOrchestrator, PaymentRequest,
};
pub use pricing::{MarketData, MarketFeed, PricingConfig, PricingEngine, StaticMarketFeed};
pub use profile::{ProfileStore, UserProfile};
pub use utils::{Clock, IdGenerator, ManualClock, SystemClock};

// Companion crates re-exported for embedders.
pub use paymesh_router as router;
pub use paymesh_swarm as swarm;
pub use paymesh_yield as yield_allocation;

/// Install a tracing subscriber for binaries and examples. Safe to call
/// more than once; later calls are ignored.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(constants::DEFAULT_TRACING_FILTER));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
