// demos/payment_flow.rs - Wire a full engine and push payments through it
//
// Run with: cargo run --example payment_flow

use std::sync::Arc;

use bigdecimal::{BigDecimal, FromPrimitive};
use serde_json::json;

use paymesh_engine::router::{Bridge, GasPrices, StaticBridgeFeed, StaticGasFeed};
use paymesh_engine::swarm::{AgentRole, TaskKind};
use paymesh_engine::yield_allocation::{InMemoryAdapter, Protocol, RiskTier, StaticProtocolFeed};
use paymesh_engine::{
    EngineConfig, OptimizeRequest, PaymeshEngine, PaymentRequest, SubmitTaskRequest,
};

fn amount(value: f64) -> BigDecimal {
    BigDecimal::from_f64(value).expect("valid decimal")
}

fn build_engine() -> anyhow::Result<PaymeshEngine> {
    let wormhole = Bridge {
        name: "wormhole".to_string(),
        supported_chains: ["solana".to_string(), "ethereum".to_string()]
            .into_iter()
            .collect(),
        base_fee: amount(5.0),
        fee_percent: 0.1,
        avg_transfer_secs: 180,
        max_slippage_pct: 0.5,
        min_amount: amount(10.0),
        max_amount: amount(10_000_000.0),
        reliability: 0.98,
    };
    let allbridge = Bridge {
        name: "allbridge".to_string(),
        supported_chains: [
            "solana".to_string(),
            "ethereum".to_string(),
            "polygon".to_string(),
        ]
        .into_iter()
        .collect(),
        base_fee: amount(2.0),
        fee_percent: 0.3,
        avg_transfer_secs: 300,
        max_slippage_pct: 1.0,
        min_amount: amount(1.0),
        max_amount: amount(500_000.0),
        reliability: 0.95,
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
        )
        .with_chain(
            "polygon",
            GasPrices {
                standard_gwei: 40.0,
                fast_gwei: 60.0,
                instant_gwei: 100.0,
                updated_at: chrono::Utc::now(),
            },
            0.8,
        );

    let protocols = vec![
        Protocol {
            name: "kamino".to_string(),
            apy_percent: 8.2,
            tvl: amount(120_000_000.0),
            risk_tier: RiskTier::Low,
            weight: 3.0,
            min_deposit: amount(50.0),
        },
        Protocol {
            name: "marinade".to_string(),
            apy_percent: 6.9,
            tvl: amount(800_000_000.0),
            risk_tier: RiskTier::Medium,
            weight: 1.0,
            min_deposit: amount(10.0),
        },
    ];

    PaymeshEngine::builder(EngineConfig::from_env()?)
        .chains([
            "solana".to_string(),
            "ethereum".to_string(),
            "polygon".to_string(),
        ])
        .bridge_feed(Arc::new(StaticBridgeFeed::new(vec![wormhole, allbridge])))
        .gas_feed(Arc::new(gas))
        .protocol_feed(Arc::new(StaticProtocolFeed::new(protocols)))
        .protocol_adapter(Arc::new(
            InMemoryAdapter::new()
                .with_apy("kamino", 8.2)
                .with_apy("marinade", 6.9),
        ))
        .agent(AgentRole::Validator, 1.0)
        .agent(AgentRole::Validator, 1.0)
        .agent(AgentRole::Executor, 1.5)
        .agent(AgentRole::Executor, 1.5)
        .agent(AgentRole::Optimizer, 1.0)
        .agent(AgentRole::RiskAssessor, 2.0)
        .agent(AgentRole::Coordinator, 1.2)
        .build()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    paymesh_engine::init_tracing();
    let engine = build_engine()?;

    // A routine payment sails through screening, pricing, and routing.
    let decision = engine
        .process_payment(PaymentRequest {
            user_id: "alice".to_string(),
            amount: amount(750.0),
            from_address: "0xalice".to_string(),
            to_address: "0xshop".to_string(),
            from_chain: "solana".to_string(),
            to_chain: "ethereum".to_string(),
            objective: None,
            ip_address: None,
            geo: None,
        })
        .await?;
    println!("routine payment: {}", serde_json::to_string_pretty(&decision)?);

    // A high-value payment additionally goes through swarm consensus.
    let decision = engine
        .process_payment(PaymentRequest {
            user_id: "bob".to_string(),
            amount: amount(50_000.0),
            from_address: "0xbob".to_string(),
            to_address: "0xdesk".to_string(),
            from_chain: "solana".to_string(),
            to_chain: "ethereum".to_string(),
            objective: None,
            ip_address: None,
            geo: None,
        })
        .await?;
    println!(
        "high-value payment: {}",
        serde_json::to_string_pretty(&decision)?
    );

    // Idle balance gets put to work by the allocator.
    let report = engine
        .optimize(OptimizeRequest {
            balance: amount(25_000.0),
        })
        .await?;
    println!("allocation report: {}", serde_json::to_string_pretty(&report)?);

    // Arbitrary work can be queued directly.
    let submitted = engine.submit_task(SubmitTaskRequest {
        kind: TaskKind::Optimize,
        payload: json!({ "scope": "gas-schedule" }),
        priority: 3,
        deadline_secs: Some(10),
    })?;
    let task = engine
        .swarm()
        .wait_for_task(&submitted.task_id, std::time::Duration::from_secs(5))
        .await?;
    println!("queued task finished as {:?}", task.status);

    println!("swarm status: {:?}", engine.swarm_status());
    engine.shutdown();
    Ok(())
}
