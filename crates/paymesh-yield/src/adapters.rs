// Injected collaborators: protocol feed, protocol adapter, balance source

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bigdecimal::BigDecimal;

use crate::{Protocol, YieldError};

/// Source of the current protocol universe.
#[async_trait]
pub trait ProtocolFeed: Send + Sync {
    async fn snapshot(&self) -> Result<Vec<Protocol>, YieldError>;
}

/// On-chain deposit/withdraw surface. The allocator only tracks position
/// state; actual fund movement happens behind this trait.
#[async_trait]
pub trait ProtocolAdapter: Send + Sync {
    async fn deposit(&self, protocol: &str, amount: &BigDecimal) -> Result<(), YieldError>;
    async fn withdraw(&self, protocol: &str, amount: &BigDecimal) -> Result<(), YieldError>;
    async fn current_apy(&self, protocol: &str) -> Result<f64, YieldError>;
    async fn tvl(&self, protocol: &str) -> Result<BigDecimal, YieldError>;
}

/// Where the idle balance for periodic optimization comes from.
#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn idle_balance(&self) -> Result<BigDecimal, YieldError>;
}

/// Fixed protocol universe for configuration-driven deployments and tests.
#[derive(Debug, Default)]
pub struct StaticProtocolFeed {
    protocols: Vec<Protocol>,
}

impl StaticProtocolFeed {
    pub fn new(protocols: Vec<Protocol>) -> Self {
        Self { protocols }
    }
}

#[async_trait]
impl ProtocolFeed for StaticProtocolFeed {
    async fn snapshot(&self) -> Result<Vec<Protocol>, YieldError> {
        Ok(self.protocols.clone())
    }
}

/// Ledger operation recorded by the in-memory adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerOp {
    Deposit { protocol: String, amount: BigDecimal },
    Withdraw { protocol: String, amount: BigDecimal },
}

/// Adapter that applies operations to an in-memory ledger. Used by tests and
/// demos to assert ordering (withdraws before deposits) and amounts.
#[derive(Debug, Default)]
pub struct InMemoryAdapter {
    apy: HashMap<String, f64>,
    ops: Mutex<Vec<LedgerOp>>,
}

impl InMemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_apy(mut self, protocol: &str, apy_percent: f64) -> Self {
        self.apy.insert(protocol.to_string(), apy_percent);
        self
    }

    pub fn operations(&self) -> Vec<LedgerOp> {
        self.ops.lock().expect("ops mutex poisoned").clone()
    }
}

#[async_trait]
impl ProtocolAdapter for InMemoryAdapter {
    async fn deposit(&self, protocol: &str, amount: &BigDecimal) -> Result<(), YieldError> {
        self.ops
            .lock()
            .expect("ops mutex poisoned")
            .push(LedgerOp::Deposit {
                protocol: protocol.to_string(),
                amount: amount.clone(),
            });
        Ok(())
    }

    async fn withdraw(&self, protocol: &str, amount: &BigDecimal) -> Result<(), YieldError> {
        self.ops
            .lock()
            .expect("ops mutex poisoned")
            .push(LedgerOp::Withdraw {
                protocol: protocol.to_string(),
                amount: amount.clone(),
            });
        Ok(())
    }

    async fn current_apy(&self, protocol: &str) -> Result<f64, YieldError> {
        self.apy
            .get(protocol)
            .copied()
            .ok_or_else(|| YieldError::FeedFailure(format!("no APY data for {protocol}")))
    }

    async fn tvl(&self, protocol: &str) -> Result<BigDecimal, YieldError> {
        let _ = protocol;
        Ok(BigDecimal::default())
    }
}

/// Constant idle balance.
#[derive(Debug)]
pub struct StaticBalanceSource(pub BigDecimal);

#[async_trait]
impl BalanceSource for StaticBalanceSource {
    async fn idle_balance(&self) -> Result<BigDecimal, YieldError> {
        Ok(self.0.clone())
    }
}
