// Target allocation, rebalance decision, and execution

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use bigdecimal::rounding::RoundingMode;
use bigdecimal::{BigDecimal, FromPrimitive, One, ToPrimitive, Zero};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use paymesh_common::Clock;

use crate::{
    AllocationTarget, BalanceSource, Position, Protocol, ProtocolAdapter, ProtocolFeed,
    YieldConfig, YieldError, YieldReport,
};

/// Monetary scale for allocation shares. Rounding down keeps the sum of
/// shares within the available balance.
const SHARE_SCALE: i64 = 8;

/// Weight-proportional allocator over a risk-filtered protocol set, with a
/// 5% hysteresis gate before any funds move.
pub struct YieldAllocator {
    config: YieldConfig,
    feed: Arc<dyn ProtocolFeed>,
    adapter: Arc<dyn ProtocolAdapter>,
    clock: Arc<dyn Clock>,
    positions: Mutex<HashMap<String, Position>>,
    last_report: Mutex<Option<YieldReport>>,
    runner: Mutex<Option<JoinHandle<()>>>,
    /// Back-reference so the periodic runner owns an Arc to the allocator.
    self_ref: Weak<YieldAllocator>,
}

impl YieldAllocator {
    pub fn new(
        config: YieldConfig,
        feed: Arc<dyn ProtocolFeed>,
        adapter: Arc<dyn ProtocolAdapter>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            config,
            feed,
            adapter,
            clock,
            positions: Mutex::new(HashMap::new()),
            last_report: Mutex::new(None),
            runner: Mutex::new(None),
            self_ref: self_ref.clone(),
        })
    }

    /// Current protocol universe as reported by the injected feed.
    pub async fn snapshot_protocols(&self) -> Result<Vec<Protocol>, YieldError> {
        self.feed.snapshot().await
    }

    /// Compute the target allocation for `balance` and rebalance into it when
    /// the drift gate opens. Balances under the configured threshold return
    /// the current state untouched.
    pub async fn optimize(&self, balance: &BigDecimal) -> Result<YieldReport, YieldError> {
        if *balance < self.config.min_balance_threshold {
            debug!(balance = %balance, "Balance under threshold; skipping optimization");
            return Ok(self.report_from_current(Vec::new(), false));
        }

        let protocols = self.feed.snapshot().await?;
        let admitted: Vec<Protocol> = protocols
            .iter()
            .filter(|p| self.config.strategy.admits(p.risk_tier) && p.weight > 0.0)
            .cloned()
            .collect();

        let available = balance - &self.config.emergency_reserve;
        let targets = if available > BigDecimal::zero() {
            compute_targets(&admitted, &available)
        } else {
            Vec::new()
        };

        let current = self.positions_snapshot();
        let rebalanced = if needs_rebalance(&current, &targets, self.config.rebalance_tolerance) {
            info!(
                targets = targets.len(),
                positions = current.len(),
                "Rebalance required; executing"
            );
            self.execute_rebalance(&current, &targets).await?;
            true
        } else {
            debug!("Allocation drift within tolerance; holding positions");
            false
        };

        let report = self.report_from_current(targets, rebalanced);
        *self.last_report.lock().expect("report mutex poisoned") = Some(report.clone());
        Ok(report)
    }

    /// Withdraw every surplus before depositing any shortfall, committing
    /// position state after each adapter call succeeds.
    async fn execute_rebalance(
        &self,
        current: &HashMap<String, Position>,
        targets: &[AllocationTarget],
    ) -> Result<(), YieldError> {
        let target_by_name: HashMap<&str, &AllocationTarget> =
            targets.iter().map(|t| (t.protocol.as_str(), t)).collect();

        let mut withdraws: Vec<(String, BigDecimal)> = Vec::new();
        let mut deposits: Vec<(String, BigDecimal, f64)> = Vec::new();

        for (name, position) in current {
            let target_amount = target_by_name
                .get(name.as_str())
                .map(|t| t.amount.clone())
                .unwrap_or_else(BigDecimal::zero);
            if position.amount > target_amount {
                withdraws.push((name.clone(), &position.amount - &target_amount));
            }
        }
        for target in targets {
            let held = current
                .get(&target.protocol)
                .map(|p| p.amount.clone())
                .unwrap_or_else(BigDecimal::zero);
            if target.amount > held {
                deposits.push((
                    target.protocol.clone(),
                    &target.amount - &held,
                    target.apy_percent,
                ));
            }
        }

        for (protocol, amount) in &withdraws {
            let held = self
                .positions_snapshot()
                .get(protocol)
                .map(|p| p.amount.clone())
                .unwrap_or_else(BigDecimal::zero);
            if *amount > held {
                return Err(YieldError::CapacityExceeded {
                    protocol: protocol.clone(),
                    requested: amount.clone(),
                    held,
                });
            }
            self.adapter.withdraw(protocol, amount).await?;
            self.commit_delta(protocol, &-amount.clone(), None);
            info!(protocol = %protocol, amount = %amount, "Withdrawn surplus");
        }

        for (protocol, amount, apy) in &deposits {
            self.adapter.deposit(protocol, amount).await?;
            self.commit_delta(protocol, amount, Some(*apy));
            info!(protocol = %protocol, amount = %amount, "Deposited shortfall");
        }

        Ok(())
    }

    /// Apply one confirmed adapter operation to the position map.
    fn commit_delta(&self, protocol: &str, delta: &BigDecimal, entry_apy: Option<f64>) {
        let now = self.clock.now();
        let mut positions = self.positions.lock().expect("positions mutex poisoned");
        let position = positions
            .entry(protocol.to_string())
            .or_insert_with(|| Position {
                protocol: protocol.to_string(),
                amount: BigDecimal::zero(),
                entry_apy: entry_apy.unwrap_or(0.0),
                value: BigDecimal::zero(),
                last_updated: now,
            });
        position.amount = &position.amount + delta;
        position.value = position.amount.clone();
        position.last_updated = now;
        if let Some(apy) = entry_apy {
            position.entry_apy = apy;
        }
        if position.amount <= BigDecimal::zero() {
            positions.remove(protocol);
        }
    }

    fn report_from_current(&self, targets: Vec<AllocationTarget>, rebalanced: bool) -> YieldReport {
        let positions = self.positions_snapshot();
        let total_value: BigDecimal = positions.values().map(|p| p.value.clone()).sum();
        let weighted_apy = if total_value > BigDecimal::zero() {
            let total = total_value.to_f64().unwrap_or(0.0);
            positions
                .values()
                .map(|p| p.entry_apy * p.value.to_f64().unwrap_or(0.0))
                .sum::<f64>()
                / total
        } else {
            0.0
        };

        YieldReport {
            generated_at: self.clock.now(),
            total_value,
            weighted_apy,
            baseline_apy: self.config.baseline_apy,
            vs_baseline_pct: weighted_apy - self.config.baseline_apy,
            targets,
            rebalanced,
        }
    }

    pub fn positions_snapshot(&self) -> HashMap<String, Position> {
        self.positions
            .lock()
            .expect("positions mutex poisoned")
            .clone()
    }

    pub fn last_report(&self) -> Option<YieldReport> {
        self.last_report
            .lock()
            .expect("report mutex poisoned")
            .clone()
    }

    /// Start the periodic optimization loop. One runner at a time.
    pub fn start(
        &self,
        period: Duration,
        balance: Arc<dyn BalanceSource>,
    ) -> Result<(), YieldError> {
        let mut runner = self.runner.lock().expect("runner mutex poisoned");
        if runner.is_some() {
            return Err(YieldError::AlreadyRunning);
        }

        let allocator = self
            .self_ref
            .upgrade()
            .expect("allocator alive while start is called");
        *runner = Some(tokio::spawn(async move {
            loop {
                allocator.clock.sleep(period).await;
                match balance.idle_balance().await {
                    Ok(idle) => {
                        if let Err(e) = allocator.optimize(&idle).await {
                            warn!(error = %e, "Periodic optimization failed");
                        }
                    }
                    Err(e) => warn!(error = %e, "Idle balance unavailable"),
                }
            }
        }));
        info!(period_secs = period.as_secs_f64(), "Yield allocator started");
        Ok(())
    }

    pub fn stop(&self) {
        let mut runner = self.runner.lock().expect("runner mutex poisoned");
        if let Some(handle) = runner.take() {
            handle.abort();
            info!("Yield allocator stopped");
        }
    }
}

impl Drop for YieldAllocator {
    fn drop(&mut self) {
        if let Ok(mut runner) = self.runner.lock() {
            if let Some(handle) = runner.take() {
                handle.abort();
            }
        }
    }
}

/// Distribute `available` across protocols proportionally to weight. Any
/// protocol whose pro-rata share falls under its minimum deposit is dropped,
/// and the remainder is redistributed over the survivors in a second pass;
/// a dropped protocol does not resurrect. Score orders the result only.
pub fn compute_targets(protocols: &[Protocol], available: &BigDecimal) -> Vec<AllocationTarget> {
    if protocols.is_empty() || *available <= BigDecimal::zero() {
        return Vec::new();
    }

    let share = |protocol: &Protocol, weight_sum: f64| -> BigDecimal {
        let weight = BigDecimal::from_f64(protocol.weight).unwrap_or_default();
        let total = BigDecimal::from_f64(weight_sum).unwrap_or_else(BigDecimal::one);
        (available * weight / total).with_scale_round(SHARE_SCALE, RoundingMode::Down)
    };

    let weight_sum: f64 = protocols.iter().map(|p| p.weight).sum();
    if weight_sum <= 0.0 {
        return Vec::new();
    }

    let survivors: Vec<&Protocol> = protocols
        .iter()
        .filter(|p| share(p, weight_sum) >= p.min_deposit)
        .collect();
    if survivors.is_empty() {
        return Vec::new();
    }

    let survivor_weight_sum: f64 = survivors.iter().map(|p| p.weight).sum();
    let mut targets: Vec<AllocationTarget> = survivors
        .into_iter()
        .map(|p| AllocationTarget {
            protocol: p.name.clone(),
            amount: share(p, survivor_weight_sum),
            score: p.risk_adjusted_score(),
            apy_percent: p.apy_percent,
            risk_tier: p.risk_tier,
        })
        .collect();

    targets.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    targets
}

/// Hysteresis gate: move funds only when some protocol drifted more than
/// `tolerance` relative to its target (denominator floored at one unit), or
/// when nothing is deployed yet and a target exists.
pub fn needs_rebalance(
    positions: &HashMap<String, Position>,
    targets: &[AllocationTarget],
    tolerance: f64,
) -> bool {
    if positions.is_empty() {
        return targets.iter().any(|t| t.amount > BigDecimal::zero());
    }

    let mut names: Vec<&str> = positions.keys().map(String::as_str).collect();
    names.extend(targets.iter().map(|t| t.protocol.as_str()));
    names.sort_unstable();
    names.dedup();

    for name in names {
        let target = targets
            .iter()
            .find(|t| t.protocol == name)
            .map(|t| t.amount.clone())
            .unwrap_or_else(BigDecimal::zero);
        let current = positions
            .get(name)
            .map(|p| p.amount.clone())
            .unwrap_or_else(BigDecimal::zero);

        let drift = (&target - &current).abs().to_f64().unwrap_or(0.0);
        let denom = target.to_f64().unwrap_or(0.0).max(1.0);
        if drift / denom > tolerance {
            return true;
        }
    }
    false
}
