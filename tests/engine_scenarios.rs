// tests/engine_scenarios.rs - End-to-end scenarios across the four cores

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bigdecimal::{BigDecimal, FromPrimitive};
use chrono::{Duration, TimeZone, Utc};
use serde_json::{json, Value};

use paymesh_engine::fraud::{RiskLevel, SignalKind, SignalSeverity};
use paymesh_engine::fraud::{Blocklist, FraudConfig};
use paymesh_engine::router::{
    Bridge, CrossChainRouter, GasPrices, RouteObjective, RouterConfig, StaticBridgeFeed,
    StaticGasFeed,
};
use paymesh_engine::swarm::{
    Agent, AgentHandler, AgentRole, SwarmConfig, SwarmCoordinator, SwarmError, SwarmTask,
};
use paymesh_engine::yield_allocation::{
    needs_rebalance, AllocationTarget, Position, RiskTier,
};
use paymesh_engine::{
    Clock, FraudAnalyzer, GeoLocation, ManualClock, ProfileStore, SystemClock, Transaction,
};

fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 6, 5, 12, 0, 0).unwrap(),
    ))
}

fn analyzer_with_clock(clock: Arc<ManualClock>) -> FraudAnalyzer {
    let profiles = Arc::new(ProfileStore::new(clock.clone()));
    FraudAnalyzer::new(
        FraudConfig::default(),
        profiles,
        Arc::new(Blocklist::new()),
        clock,
    )
}

fn tx(id: &str, user: &str, amount: f64, at: chrono::DateTime<chrono::Utc>) -> Transaction {
    Transaction {
        id: id.to_string(),
        user_id: user.to_string(),
        amount: BigDecimal::from_f64(amount).unwrap(),
        timestamp: at,
        from_address: format!("0x{user}"),
        to_address: "0xmerchant".to_string(),
        chain: "ethereum".to_string(),
        ip_address: None,
        geo: None,
    }
}

// S1: a first transaction against an empty profile is safe.
#[test]
fn scenario_normal_analysis() {
    let clock = manual_clock();
    let analyzer = analyzer_with_clock(clock.clone());

    let mut first = tx("t1", "u1", 125.50, clock.now());
    first.geo = Some(GeoLocation {
        country: "USA".to_string(),
        city: Some("Chicago".to_string()),
        lat: 41.8781,
        lon: -87.6298,
    });

    let analysis = analyzer.analyze(&first);

    assert_eq!(analysis.risk_level, RiskLevel::Safe);
    assert!(analysis.signals.is_empty());
    assert_eq!(
        analysis.recommendation,
        paymesh_engine::fraud::Recommendation::Approve
    );
    assert_eq!(analysis.confidence, 1.0);
}

// S2: twelve transactions in twelve minutes trip the velocity detector,
// including the five-minute burst.
#[test]
fn scenario_velocity_breach() {
    let clock = manual_clock();
    let analyzer = analyzer_with_clock(clock.clone());
    let start = clock.now();

    let mut last = None;
    for i in 0..12 {
        let t = tx(&format!("t{i}"), "u2", 40.0, start + Duration::minutes(i));
        last = Some(analyzer.analyze(&t));
    }
    let analysis = last.unwrap();

    let velocity: Vec<_> = analysis
        .signals
        .iter()
        .filter(|s| s.kind == SignalKind::Velocity)
        .collect();
    assert!(velocity
        .iter()
        .any(|s| s.severity >= SignalSeverity::Medium));
    assert!(velocity
        .iter()
        .any(|s| s.severity == SignalSeverity::High && s.metadata.get("count_5m").is_some()));
}

// S3: New York to Tokyo in one hour is impossible travel and forces a block.
#[test]
fn scenario_impossible_travel() {
    let clock = manual_clock();
    let analyzer = analyzer_with_clock(clock.clone());
    let start = clock.now();

    let mut prior = tx("t1", "u3", 200.0, start);
    prior.geo = Some(GeoLocation {
        country: "USA".to_string(),
        city: Some("New York".to_string()),
        lat: 40.7128,
        lon: -74.0060,
    });
    analyzer.analyze(&prior);

    let mut current = tx("t2", "u3", 200.0, start + Duration::hours(1));
    current.geo = Some(GeoLocation {
        country: "JPN".to_string(),
        city: Some("Tokyo".to_string()),
        lat: 35.6762,
        lon: 139.6503,
    });
    let analysis = analyzer.analyze(&current);

    let travel = analysis
        .signals
        .iter()
        .find(|s| s.kind == SignalKind::GeoAnomaly && s.severity == SignalSeverity::Critical)
        .expect("impossible travel must be flagged");
    assert!((travel.confidence - 0.95).abs() < 1e-9);
    assert_eq!(
        analysis.recommendation,
        paymesh_engine::fraud::Recommendation::Block
    );
}

// S4: cost-optimal Solana -> Ethereum for 1000 picks the single wormhole hop.
#[tokio::test]
async fn scenario_cost_optimal_route() {
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
        max_amount: BigDecimal::from_f64(1_000_000.0).unwrap(),
        reliability: 0.98,
    };
    let gas = StaticGasFeed::new()
        .with_chain(
            "solana",
            GasPrices {
                standard_gwei: 0.1,
                fast_gwei: 0.15,
                instant_gwei: 0.25,
                updated_at: Utc::now(),
            },
            150.0,
        )
        .with_chain(
            "ethereum",
            GasPrices {
                standard_gwei: 20.0,
                fast_gwei: 30.0,
                instant_gwei: 50.0,
                updated_at: Utc::now(),
            },
            2000.0,
        );
    let router = CrossChainRouter::new(
        RouterConfig::default(),
        ["solana", "ethereum"].iter().map(|c| c.to_string()),
        Arc::new(StaticBridgeFeed::new(vec![bridge])),
        Arc::new(gas),
    );

    let route = router
        .route(
            "solana",
            "ethereum",
            &BigDecimal::from_f64(1000.0).unwrap(),
            RouteObjective::Cost,
        )
        .await
        .expect("route exists");

    assert_eq!(route.hop_count, 1);
    assert_eq!(route.total_time_secs, 180);
    assert_eq!(route.path[0].bridge, "wormhole");
    assert!((route.success_probability - 0.98).abs() < 1e-9);
    assert_eq!(route.amount_out, &route.amount_in - &route.total_cost);
}

/// Approves unless the agent is a risk assessor; full confidence so the
/// weighted tallies stay exact.
struct QuorumHandler;

#[async_trait]
impl AgentHandler for QuorumHandler {
    async fn execute(&self, _agent: &Agent, _task: &SwarmTask) -> Result<Value, SwarmError> {
        Ok(json!({}))
    }

    async fn vote(
        &self,
        agent: &Agent,
        _topic: &str,
        _payload: &Value,
    ) -> Result<(bool, f64, String), SwarmError> {
        let approve = agent.role != AgentRole::RiskAssessor;
        Ok((approve, 1.0, format!("{:?}", agent.role)))
    }
}

// S5: weighted quorum with a dissenting risk assessor still approves.
#[tokio::test]
async fn scenario_consensus_quorum() {
    let coordinator = SwarmCoordinator::new(
        SwarmConfig::default(),
        Arc::new(SystemClock),
        Arc::new(QuorumHandler),
    );
    for _ in 0..3 {
        coordinator.add_agent(AgentRole::Validator, 1.0, vec![]);
    }
    for _ in 0..2 {
        coordinator.add_agent(AgentRole::Executor, 1.5, vec![]);
    }
    for _ in 0..2 {
        coordinator.add_agent(AgentRole::Optimizer, 1.0, vec![]);
    }
    coordinator.add_agent(AgentRole::RiskAssessor, 2.0, vec![]);

    let result = coordinator
        .request_consensus("large-transfer", json!({"amount": 80000}), None)
        .await
        .unwrap();

    assert!((result.yes_weight - 8.0).abs() < 1e-9);
    assert!((result.no_weight - 2.0).abs() < 1e-9);
    assert!((result.approval_ratio - 0.8).abs() < 1e-9);
    assert!(result.decision);
    assert!(result.consensus_reached);
}

// S6: the 5% hysteresis gate holds small drifts and releases large ones.
#[test]
fn scenario_rebalance_hysteresis() {
    let mut positions = HashMap::new();
    positions.insert(
        "Kamino".to_string(),
        Position {
            protocol: "Kamino".to_string(),
            amount: BigDecimal::from_f64(1000.0).unwrap(),
            entry_apy: 8.0,
            value: BigDecimal::from_f64(1000.0).unwrap(),
            last_updated: Utc::now(),
        },
    );

    let target = |amount: f64| {
        vec![AllocationTarget {
            protocol: "Kamino".to_string(),
            amount: BigDecimal::from_f64(amount).unwrap(),
            score: 8.0,
            apy_percent: 8.0,
            risk_tier: RiskTier::Low,
        }]
    };

    assert!(!needs_rebalance(&positions, &target(1020.0), 0.05));
    assert!(needs_rebalance(&positions, &target(200.0), 0.05));
}

// Round-trip: the same transaction analyzed twice yields two analyses and
// the second observes the first in the profile history.
#[test]
fn scenario_repeat_analysis_sees_history() {
    let clock = manual_clock();
    let analyzer = analyzer_with_clock(clock.clone());

    let payment = tx("t1", "u9", 300.0, clock.now());
    let first = analyzer.analyze(&payment);
    let second = analyzer.analyze(&payment);

    assert_eq!(first.transaction_id, second.transaction_id);
    assert_eq!(analyzer.profiles().get("u9").unwrap().total_transactions, 2);
    // Identical amount twice cannot trip the deviation detector; both stay
    // low-risk.
    assert!(first.risk_score <= second.risk_score + 1e-9);
}

// Round-trip: blocking an address is fully reversible.
#[test]
fn scenario_block_unblock_roundtrip() {
    let clock = manual_clock();
    let analyzer = analyzer_with_clock(clock.clone());

    analyzer.blocklist().block("0xu7");
    let blocked = analyzer.analyze(&tx("t1", "u7", 10.0, clock.now()));
    assert_eq!(blocked.risk_score, 1.0);
    assert_eq!(
        blocked.recommendation,
        paymesh_engine::fraud::Recommendation::Block
    );

    analyzer.blocklist().unblock("0xu7");
    let unblocked = analyzer.analyze(&tx("t2", "u7", 10.0, clock.now()));
    assert_ne!(
        unblocked.recommendation,
        paymesh_engine::fraud::Recommendation::Block
    );
    assert!(unblocked.risk_score < 1.0);
}

/// Tracks how many handler executions overlap.
struct ConcurrencyProbe {
    current: std::sync::atomic::AtomicUsize,
    peak: std::sync::atomic::AtomicUsize,
}

#[async_trait]
impl AgentHandler for ConcurrencyProbe {
    async fn execute(&self, _agent: &Agent, _task: &SwarmTask) -> Result<Value, SwarmError> {
        use std::sync::atomic::Ordering;
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(json!({}))
    }

    async fn vote(
        &self,
        _agent: &Agent,
        _topic: &str,
        _payload: &Value,
    ) -> Result<(bool, f64, String), SwarmError> {
        Ok((true, 1.0, "probe".to_string()))
    }
}

// Handler parallelism is bounded by the number of agents, structurally.
#[tokio::test]
async fn scenario_parallelism_bounded_by_agents() {
    let probe = Arc::new(ConcurrencyProbe {
        current: std::sync::atomic::AtomicUsize::new(0),
        peak: std::sync::atomic::AtomicUsize::new(0),
    });
    let coordinator = SwarmCoordinator::new(
        SwarmConfig::default(),
        Arc::new(SystemClock),
        probe.clone(),
    );
    for _ in 0..3 {
        coordinator.add_agent(AgentRole::Executor, 1.0, vec![]);
    }

    let mut task_ids = Vec::new();
    for i in 0..9 {
        task_ids.push(
            coordinator
                .submit_task(
                    paymesh_engine::swarm::TaskKind::Execute,
                    json!({"n": i}),
                    5,
                    None,
                )
                .unwrap(),
        );
    }
    for task_id in &task_ids {
        let task = coordinator
            .wait_for_task(task_id, std::time::Duration::from_secs(3))
            .await
            .unwrap();
        assert_eq!(task.status, paymesh_engine::swarm::TaskStatus::Completed);
    }

    let peak = probe.peak.load(std::sync::atomic::Ordering::SeqCst);
    assert!(peak <= 3, "peak concurrency {peak} exceeded the agent count");
    assert!(peak >= 2, "expected some overlap across three agents");
    assert_eq!(coordinator.status().tasks_completed, 9);
}
