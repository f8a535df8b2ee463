// src/engine.rs - Assembled engine facade over the four cores

use std::sync::Arc;

use anyhow::{ensure, Result};
use tracing::info;

use paymesh_router::{BridgeFeed, CrossChainRouter, GasFeed, RouteResult, RouterError};
use paymesh_swarm::{
    AgentHandler, AgentRole, ConsensusResult, SimulatedHandler, SwarmCoordinator, SwarmError,
    SwarmStatus,
};
use paymesh_yield::{ProtocolAdapter, ProtocolFeed, YieldAllocator, YieldError, YieldReport};

use crate::api::{
    AnalyzeRequest, ConsensusRequest, OptimizeRequest, RouteRequest, SubmitTaskRequest,
    SubmitTaskResponse,
};
use crate::config::EngineConfig;
use crate::fraud::{Blocklist, FraudAnalysis, FraudAnalyzer};
use crate::orchestrator::{
    OrchestratorError, PaymentDecision, PaymentOrchestrator, PaymentRequest,
};
use crate::pricing::{MarketData, MarketFeed, PricingEngine, StaticMarketFeed};
use crate::profile::ProfileStore;
use crate::utils::{Clock, IdGenerator, SystemClock};

/// One fully wired engine: profile store, fraud analyzer, pricing combiner,
/// router, swarm, yield allocator, and the payment orchestrator gluing them.
/// Collaborators arrive through the builder, so independent engines coexist
/// in one process.
pub struct PaymeshEngine {
    clock: Arc<dyn Clock>,
    ids: IdGenerator,
    analyzer: Arc<FraudAnalyzer>,
    pricing: Arc<PricingEngine>,
    router: Arc<CrossChainRouter>,
    swarm: Arc<SwarmCoordinator>,
    allocator: Arc<YieldAllocator>,
    orchestrator: PaymentOrchestrator,
}

impl PaymeshEngine {
    pub fn builder(config: EngineConfig) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    /// Score one transaction. Never fails on domain input.
    pub fn analyze(&self, request: AnalyzeRequest) -> FraudAnalysis {
        let tx = request.into_transaction(self.ids.new_id("tx"), self.clock.now());
        self.analyzer.analyze(&tx)
    }

    /// Recompute the yield allocation for an idle balance.
    pub async fn optimize(&self, request: OptimizeRequest) -> Result<YieldReport, YieldError> {
        self.allocator.optimize(&request.balance).await
    }

    /// Find the best route for the requested objective.
    pub async fn route(&self, request: RouteRequest) -> Result<RouteResult, RouterError> {
        self.router
            .route(
                &request.from,
                &request.to,
                &request.amount,
                request.objective,
            )
            .await
    }

    /// Queue a task on the swarm.
    pub fn submit_task(
        &self,
        request: SubmitTaskRequest,
    ) -> Result<SubmitTaskResponse, SwarmError> {
        let deadline = request.deadline_secs.map(std::time::Duration::from_secs);
        let task_id = self.swarm.submit_task(
            request.kind,
            request.payload,
            request.priority,
            deadline,
        )?;
        Ok(SubmitTaskResponse { task_id })
    }

    /// Run a weighted consensus round.
    pub async fn request_consensus(
        &self,
        request: ConsensusRequest,
    ) -> Result<ConsensusResult, SwarmError> {
        self.swarm
            .request_consensus(
                &request.topic,
                request.payload,
                request.role_filter.as_deref(),
            )
            .await
    }

    /// Decide and execute one payment end to end.
    pub async fn process_payment(
        &self,
        request: PaymentRequest,
    ) -> Result<PaymentDecision, OrchestratorError> {
        self.orchestrator.process_payment(request).await
    }

    pub fn swarm_status(&self) -> SwarmStatus {
        self.swarm.status()
    }

    /// Stop the swarm and the periodic allocator.
    pub fn shutdown(&self) {
        self.swarm.shutdown();
        self.allocator.stop();
        info!("Engine shut down");
    }

    pub fn analyzer(&self) -> &FraudAnalyzer {
        &self.analyzer
    }

    pub fn pricing(&self) -> &PricingEngine {
        &self.pricing
    }

    pub fn swarm(&self) -> &Arc<SwarmCoordinator> {
        &self.swarm
    }

    pub fn allocator(&self) -> &Arc<YieldAllocator> {
        &self.allocator
    }
}

/// Builder collecting the external collaborators the engine cannot invent:
/// bridge and gas feeds, the protocol universe and adapter, and optionally a
/// market feed, an agent handler, a clock, and the agent roster.
pub struct EngineBuilder {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    chains: Vec<String>,
    bridge_feed: Option<Arc<dyn BridgeFeed>>,
    gas_feed: Option<Arc<dyn GasFeed>>,
    protocol_feed: Option<Arc<dyn ProtocolFeed>>,
    protocol_adapter: Option<Arc<dyn ProtocolAdapter>>,
    market_feed: Option<Arc<dyn MarketFeed>>,
    agent_handler: Option<Arc<dyn AgentHandler>>,
    agents: Vec<(AgentRole, f64)>,
}

impl EngineBuilder {
    fn new(config: EngineConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            chains: Vec::new(),
            bridge_feed: None,
            gas_feed: None,
            protocol_feed: None,
            protocol_adapter: None,
            market_feed: None,
            agent_handler: None,
            agents: Vec::new(),
        }
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn chains(mut self, chains: impl IntoIterator<Item = String>) -> Self {
        self.chains = chains.into_iter().collect();
        self
    }

    pub fn bridge_feed(mut self, feed: Arc<dyn BridgeFeed>) -> Self {
        self.bridge_feed = Some(feed);
        self
    }

    pub fn gas_feed(mut self, feed: Arc<dyn GasFeed>) -> Self {
        self.gas_feed = Some(feed);
        self
    }

    pub fn protocol_feed(mut self, feed: Arc<dyn ProtocolFeed>) -> Self {
        self.protocol_feed = Some(feed);
        self
    }

    pub fn protocol_adapter(mut self, adapter: Arc<dyn ProtocolAdapter>) -> Self {
        self.protocol_adapter = Some(adapter);
        self
    }

    pub fn market_feed(mut self, feed: Arc<dyn MarketFeed>) -> Self {
        self.market_feed = Some(feed);
        self
    }

    pub fn agent_handler(mut self, handler: Arc<dyn AgentHandler>) -> Self {
        self.agent_handler = Some(handler);
        self
    }

    pub fn agent(mut self, role: AgentRole, voting_weight: f64) -> Self {
        self.agents.push((role, voting_weight));
        self
    }

    pub fn build(self) -> Result<PaymeshEngine> {
        self.config.validate()?;
        ensure!(!self.chains.is_empty(), "at least one chain is required");
        let bridge_feed = self
            .bridge_feed
            .ok_or_else(|| anyhow::anyhow!("a bridge feed is required"))?;
        let gas_feed = self
            .gas_feed
            .ok_or_else(|| anyhow::anyhow!("a gas feed is required"))?;
        let protocol_feed = self
            .protocol_feed
            .ok_or_else(|| anyhow::anyhow!("a protocol feed is required"))?;
        let protocol_adapter = self
            .protocol_adapter
            .ok_or_else(|| anyhow::anyhow!("a protocol adapter is required"))?;

        let market_feed = self.market_feed.unwrap_or_else(|| {
            Arc::new(StaticMarketFeed(MarketData {
                demand: 0.5,
                supply: 0.5,
                competitors: Vec::new(),
            }))
        });
        let handler: Arc<dyn AgentHandler> = match self.agent_handler {
            Some(handler) => handler,
            None => Arc::new(SimulatedHandler::new(
                self.config.swarm.role_priors.clone(),
            )),
        };

        let clock = self.clock;
        let profiles = Arc::new(ProfileStore::new(clock.clone()));
        let blocklist = Arc::new(Blocklist::new());
        let analyzer = Arc::new(FraudAnalyzer::new(
            self.config.fraud.clone(),
            profiles,
            blocklist,
            clock.clone(),
        ));
        let pricing = Arc::new(PricingEngine::new(
            self.config.pricing.clone(),
            clock.clone(),
        ));
        let router = Arc::new(CrossChainRouter::new(
            self.config.router.clone(),
            self.chains,
            bridge_feed,
            gas_feed,
        ));
        let swarm = SwarmCoordinator::new(self.config.swarm.clone(), clock.clone(), handler);
        for (role, weight) in self.agents {
            swarm.add_agent(role, weight, Vec::new());
        }
        let allocator = YieldAllocator::new(
            self.config.yield_allocation.clone(),
            protocol_feed,
            protocol_adapter,
            clock.clone(),
        );
        let orchestrator = PaymentOrchestrator::new(
            self.config.orchestrator.clone(),
            analyzer.clone(),
            pricing.clone(),
            market_feed,
            router.clone(),
            swarm.clone(),
            clock.clone(),
        );

        info!(
            agents = swarm.status().agents_total,
            "Paymesh engine assembled"
        );
        Ok(PaymeshEngine {
            clock,
            ids: IdGenerator::new(),
            analyzer,
            pricing,
            router,
            swarm,
            allocator,
            orchestrator,
        })
    }
}
