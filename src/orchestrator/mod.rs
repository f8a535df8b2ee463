// src/orchestrator/mod.rs - Payment orchestration across the four cores

use std::sync::Arc;
use std::time::Duration;

use bigdecimal::{BigDecimal, FromPrimitive, Zero};
use serde_json::json;
use tracing::{info, warn};

pub mod state_machine;
pub mod types;

pub use state_machine::{PaymentStateMachine, PaymentStatus};
pub use types::*;

use paymesh_router::{CrossChainRouter, RouteObjective, RouterError};
use paymesh_swarm::{AgentRole, SwarmCoordinator, SwarmError, TaskKind, TaskStatus};

use crate::constants::*;
use crate::fraud::{FraudAnalyzer, Recommendation};
use crate::models::Transaction;
use crate::pricing::{MarketFeed, PricingEngine};
use crate::utils::{Clock, IdGenerator};

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid payment state transition from {from:?} to {to:?}")]
    InvalidStateTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },
    #[error(transparent)]
    Router(#[from] RouterError),
    #[error(transparent)]
    Swarm(#[from] SwarmError),
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Payments at or above this amount require swarm consensus.
    pub high_value_threshold: BigDecimal,
    pub default_objective: RouteObjective,
    pub execution_priority: i32,
    pub high_value_priority: i32,
    /// Deadline handed to the swarm execute task.
    pub execution_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            high_value_threshold: BigDecimal::from_f64(DEFAULT_HIGH_VALUE_THRESHOLD)
                .expect("valid decimal"),
            default_objective: RouteObjective::Balance,
            execution_priority: DEFAULT_EXECUTION_PRIORITY,
            high_value_priority: DEFAULT_HIGH_VALUE_PRIORITY,
            execution_timeout: Duration::from_secs(30),
        }
    }
}

/// Glue for one payment: fraud screening, pricing, optional consensus,
/// routing, and swarm-driven execution. The yield allocator runs on its own
/// schedule and is owned by the embedder, not this orchestrator.
pub struct PaymentOrchestrator {
    config: OrchestratorConfig,
    analyzer: Arc<FraudAnalyzer>,
    pricing: Arc<PricingEngine>,
    market: Arc<dyn MarketFeed>,
    router: Arc<CrossChainRouter>,
    swarm: Arc<SwarmCoordinator>,
    state_machine: PaymentStateMachine,
    clock: Arc<dyn Clock>,
    ids: IdGenerator,
}

impl PaymentOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: OrchestratorConfig,
        analyzer: Arc<FraudAnalyzer>,
        pricing: Arc<PricingEngine>,
        market: Arc<dyn MarketFeed>,
        router: Arc<CrossChainRouter>,
        swarm: Arc<SwarmCoordinator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            analyzer,
            pricing,
            market,
            router,
            swarm,
            state_machine: PaymentStateMachine::new(),
            clock,
            ids: IdGenerator::new(),
        }
    }

    /// Decide and execute one payment request end to end.
    pub async fn process_payment(
        &self,
        request: PaymentRequest,
    ) -> Result<PaymentDecision, OrchestratorError> {
        self.validate(&request)?;

        let payment_id = self.ids.new_id("pay");
        let mut status = PaymentStatus::Received;
        info!(
            payment_id = %payment_id,
            user_id = %request.user_id,
            amount = %request.amount,
            from_chain = %request.from_chain,
            to_chain = %request.to_chain,
            "Processing payment"
        );

        // Fraud screening.
        self.advance(&payment_id, &mut status, PaymentStatus::Screening)?;
        let tx = Transaction {
            id: self.ids.new_id("tx"),
            user_id: request.user_id.clone(),
            amount: request.amount.clone(),
            timestamp: self.clock.now(),
            from_address: request.from_address.clone(),
            to_address: request.to_address.clone(),
            chain: request.from_chain.clone(),
            ip_address: request.ip_address.clone(),
            geo: request.geo.clone(),
        };
        let analysis = self.analyzer.analyze(&tx);

        if analysis.recommendation != Recommendation::Approve {
            self.advance(&payment_id, &mut status, PaymentStatus::Rejected)?;
            warn!(
                payment_id = %payment_id,
                risk_level = ?analysis.risk_level,
                recommendation = ?analysis.recommendation,
                "Payment rejected by fraud screening"
            );
            return Ok(PaymentDecision::Rejected {
                payment_id,
                risk_level: analysis.risk_level,
                reason: format!(
                    "fraud screening recommended {:?}: {}",
                    analysis.recommendation,
                    analysis.reasoning.join("; ")
                ),
                consensus: None,
            });
        }

        // Dynamic pricing.
        self.advance(&payment_id, &mut status, PaymentStatus::Priced)?;
        let market = self.market.snapshot().await;
        let quote = self.pricing.optimal(&market);
        let price = quote.recommended_price.clone();

        // High-value payments need the swarm's blessing.
        let high_value = request.amount >= self.config.high_value_threshold;
        let mut consensus = None;
        if high_value {
            self.advance(&payment_id, &mut status, PaymentStatus::UnderConsensus)?;
            let result = self
                .swarm
                .request_consensus(
                    "approve-payment",
                    json!({
                        "payment_id": payment_id,
                        "user_id": request.user_id,
                        "amount": request.amount.to_string(),
                        "risk_score": analysis.risk_score,
                        "risk_level": analysis.risk_level,
                    }),
                    Some(&[AgentRole::Validator, AgentRole::RiskAssessor]),
                )
                .await?;
            if !result.decision {
                self.advance(&payment_id, &mut status, PaymentStatus::Rejected)?;
                warn!(
                    payment_id = %payment_id,
                    approval_ratio = result.approval_ratio,
                    "Payment rejected by swarm consensus"
                );
                return Ok(PaymentDecision::Rejected {
                    payment_id,
                    risk_level: analysis.risk_level,
                    reason: format!(
                        "swarm consensus rejected the payment (approval ratio {:.2})",
                        result.approval_ratio
                    ),
                    consensus: Some(result),
                });
            }
            consensus = Some(result);
        }

        // Route selection.
        self.advance(&payment_id, &mut status, PaymentStatus::Routing)?;
        let objective = request.objective.unwrap_or(self.config.default_objective);
        let route = self
            .router
            .route(
                &request.from_chain,
                &request.to_chain,
                &request.amount,
                objective,
            )
            .await?;

        // Execution through the swarm.
        self.advance(&payment_id, &mut status, PaymentStatus::Executing)?;
        let priority = if high_value {
            self.config.high_value_priority
        } else {
            self.config.execution_priority
        };
        let execution_task_id = self.swarm.submit_task(
            TaskKind::Execute,
            json!({
                "payment_id": payment_id,
                "route": route,
                "price": price.to_string(),
            }),
            priority,
            Some(self.config.execution_timeout),
        )?;
        let task = self
            .swarm
            .wait_for_task(&execution_task_id, self.config.execution_timeout * 2)
            .await?;

        if task.status != TaskStatus::Completed {
            self.advance(&payment_id, &mut status, PaymentStatus::Rejected)?;
            let reason = task
                .error
                .unwrap_or_else(|| "execution failed without detail".to_string());
            warn!(payment_id = %payment_id, reason = %reason, "Payment execution failed");
            return Ok(PaymentDecision::Rejected {
                payment_id,
                risk_level: analysis.risk_level,
                reason: format!("execution failed: {reason}"),
                consensus,
            });
        }

        self.advance(&payment_id, &mut status, PaymentStatus::Completed)?;
        info!(
            payment_id = %payment_id,
            task_id = %execution_task_id,
            hops = route.hop_count,
            price = %price,
            "Payment executed"
        );
        Ok(PaymentDecision::Executed {
            payment_id,
            risk: RiskSummary {
                risk_score: analysis.risk_score,
                risk_level: analysis.risk_level,
                confidence: analysis.confidence,
            },
            price,
            route,
            consensus,
            execution_task_id,
        })
    }

    fn validate(&self, request: &PaymentRequest) -> Result<(), OrchestratorError> {
        if request.user_id.trim().is_empty() {
            return Err(OrchestratorError::InvalidInput("empty user id".to_string()));
        }
        if request.amount < BigDecimal::zero() {
            return Err(OrchestratorError::InvalidInput(format!(
                "negative amount {}",
                request.amount
            )));
        }
        if request.amount == BigDecimal::zero() {
            return Err(OrchestratorError::InvalidInput(
                "amount must be positive".to_string(),
            ));
        }
        for chain in [&request.from_chain, &request.to_chain] {
            if !self.router.has_chain(chain) {
                return Err(OrchestratorError::InvalidInput(format!(
                    "unknown chain {chain}"
                )));
            }
        }
        Ok(())
    }

    fn advance(
        &self,
        payment_id: &str,
        status: &mut PaymentStatus,
        next: PaymentStatus,
    ) -> Result<(), OrchestratorError> {
        self.state_machine.transition(payment_id, status, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fraud::{Blocklist, FraudConfig, RiskLevel};
    use crate::pricing::{MarketData, StaticMarketFeed};
    use crate::profile::ProfileStore;
    use crate::utils::SystemClock;
    use async_trait::async_trait;
    use bigdecimal::ToPrimitive;
    use paymesh_router::{Bridge, GasPrices, RouterConfig, StaticBridgeFeed, StaticGasFeed};
    use paymesh_swarm::{Agent, AgentHandler, SwarmTask};
    use serde_json::Value;

    /// Executes instantly; votes a fixed decision with full confidence.
    struct FixedHandler {
        approve: bool,
    }

    #[async_trait]
    impl AgentHandler for FixedHandler {
        async fn execute(&self, _agent: &Agent, task: &SwarmTask) -> Result<Value, SwarmError> {
            Ok(json!({ "task_id": task.id, "status": "ok" }))
        }

        async fn vote(
            &self,
            agent: &Agent,
            _topic: &str,
            _payload: &Value,
        ) -> Result<(bool, f64, String), SwarmError> {
            Ok((self.approve, 1.0, format!("{:?} fixed vote", agent.role)))
        }
    }

    fn test_router() -> Arc<CrossChainRouter> {
        let bridge = Bridge {
            name: "wormhole".to_string(),
            supported_chains: ["solana".to_string(), "ethereum".to_string()]
                .into_iter()
                .collect(),
            base_fee: BigDecimal::from_f64(5.0).unwrap(),
            fee_percent: 0.1,
            avg_transfer_secs: 180,
            max_slippage_pct: 0.5,
            min_amount: BigDecimal::from_f64(10.0).unwrap(),
            max_amount: BigDecimal::from_f64(10_000_000.0).unwrap(),
            reliability: 0.98,
        };
        let gas = StaticGasFeed::new()
            .with_chain(
                "solana",
                GasPrices {
                    standard_gwei: 0.1,
                    fast_gwei: 0.15,
                    instant_gwei: 0.25,
                    updated_at: chrono::Utc::now(),
                },
                150.0,
            )
            .with_chain(
                "ethereum",
                GasPrices {
                    standard_gwei: 20.0,
                    fast_gwei: 30.0,
                    instant_gwei: 50.0,
                    updated_at: chrono::Utc::now(),
                },
                2000.0,
            );
        Arc::new(CrossChainRouter::new(
            RouterConfig::default(),
            ["solana", "ethereum"].iter().map(|c| c.to_string()),
            Arc::new(StaticBridgeFeed::new(vec![bridge])),
            Arc::new(gas),
        ))
    }

    fn test_orchestrator(approve_votes: bool, high_value_threshold: f64) -> PaymentOrchestrator {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let profiles = Arc::new(ProfileStore::new(clock.clone()));
        let analyzer = Arc::new(FraudAnalyzer::new(
            FraudConfig::default(),
            profiles,
            Arc::new(Blocklist::new()),
            clock.clone(),
        ));
        let pricing = Arc::new(PricingEngine::new(
            crate::pricing::PricingConfig::default(),
            clock.clone(),
        ));
        let market = Arc::new(StaticMarketFeed(MarketData {
            demand: 0.5,
            supply: 0.5,
            competitors: Vec::new(),
        }));

        let swarm = SwarmCoordinator::new(
            paymesh_swarm::SwarmConfig::default(),
            clock.clone(),
            Arc::new(FixedHandler {
                approve: approve_votes,
            }),
        );
        swarm.add_agent(AgentRole::Executor, 1.5, vec![]);
        swarm.add_agent(AgentRole::Validator, 1.0, vec![]);
        swarm.add_agent(AgentRole::RiskAssessor, 2.0, vec![]);

        let config = OrchestratorConfig {
            high_value_threshold: BigDecimal::from_f64(high_value_threshold).unwrap(),
            ..OrchestratorConfig::default()
        };
        PaymentOrchestrator::new(
            config,
            analyzer,
            pricing,
            market,
            test_router(),
            swarm,
            clock,
        )
    }

    fn request(amount: f64) -> PaymentRequest {
        PaymentRequest {
            user_id: "u1".to_string(),
            amount: BigDecimal::from_f64(amount).unwrap(),
            from_address: "0xsender".to_string(),
            to_address: "0xreceiver".to_string(),
            from_chain: "solana".to_string(),
            to_chain: "ethereum".to_string(),
            objective: Some(RouteObjective::Cost),
            ip_address: None,
            geo: None,
        }
    }

    #[tokio::test]
    async fn test_small_payment_executes_without_consensus() {
        let orchestrator = test_orchestrator(true, 10_000.0);
        let decision = orchestrator.process_payment(request(500.0)).await.unwrap();

        match decision {
            PaymentDecision::Executed {
                route,
                consensus,
                risk,
                price,
                ..
            } => {
                assert_eq!(route.hop_count, 1);
                assert!(consensus.is_none());
                assert_eq!(risk.risk_level, RiskLevel::Safe);
                assert!(price.to_f64().unwrap() > 0.0);
            }
            other => panic!("expected execution, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_high_value_payment_carries_consensus() {
        let orchestrator = test_orchestrator(true, 100.0);
        let decision = orchestrator.process_payment(request(500.0)).await.unwrap();

        match decision {
            PaymentDecision::Executed { consensus, .. } => {
                let consensus = consensus.expect("high-value payment must carry a tally");
                assert!(consensus.decision);
                assert!((consensus.participation_rate - 2.0 / 3.0).abs() < 1e-9);
            }
            other => panic!("expected execution, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_swarm_rejection_returns_tally() {
        let orchestrator = test_orchestrator(false, 100.0);
        let decision = orchestrator.process_payment(request(500.0)).await.unwrap();

        match decision {
            PaymentDecision::Rejected {
                reason, consensus, ..
            } => {
                assert!(reason.contains("consensus"));
                let tally = consensus.expect("swarm rejection must include the tally");
                assert!(!tally.decision);
                assert_eq!(tally.yes_weight, 0.0);
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_blocklisted_address_rejected_without_consensus() {
        let orchestrator = test_orchestrator(true, 10_000.0);
        orchestrator.analyzer.blocklist().block("0xreceiver");

        let decision = orchestrator.process_payment(request(500.0)).await.unwrap();
        match decision {
            PaymentDecision::Rejected {
                risk_level,
                consensus,
                ..
            } => {
                assert_eq!(risk_level, RiskLevel::Critical);
                assert!(consensus.is_none());
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_inputs_rejected_upfront() {
        let orchestrator = test_orchestrator(true, 10_000.0);

        let negative = PaymentRequest {
            amount: BigDecimal::from_f64(-5.0).unwrap(),
            ..request(0.0)
        };
        assert!(matches!(
            orchestrator.process_payment(negative).await,
            Err(OrchestratorError::InvalidInput(_))
        ));

        let unknown_chain = PaymentRequest {
            to_chain: "cosmos".to_string(),
            ..request(100.0)
        };
        assert!(matches!(
            orchestrator.process_payment(unknown_chain).await,
            Err(OrchestratorError::InvalidInput(_))
        ));

        let empty_user = PaymentRequest {
            user_id: "  ".to_string(),
            ..request(100.0)
        };
        assert!(matches!(
            orchestrator.process_payment(empty_user).await,
            Err(OrchestratorError::InvalidInput(_))
        ));
    }
}
