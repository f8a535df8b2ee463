// Bounded-hop route search and objective selection

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use bigdecimal::rounding::RoundingMode;
use bigdecimal::{BigDecimal, FromPrimitive, ToPrimitive, Zero};
use tracing::{debug, info};

use crate::gas::{hop_gas_usd, ChainGas};
use crate::{Bridge, BridgeFeed, GasFeed, RouteHop, RouteObjective, RouteResult, RouterError};

/// Monetary scale for hop costs; amounts stay exact at this precision.
const COST_SCALE: i64 = 8;

// Normalization constants for the balance objective.
const BALANCE_COST_NORM: f64 = 100.0;
const BALANCE_TIME_NORM: f64 = 600.0;
const BALANCE_COST_WEIGHT: f64 = 0.4;
const BALANCE_TIME_WEIGHT: f64 = 0.3;
const BALANCE_PROB_WEIGHT: f64 = 0.3;

const HOP_PROBABILITY_PENALTY: f64 = 0.05;

#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub max_hops: usize,
    pub gas_multiplier: f64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_hops: 4,
            gas_multiplier: 1.0,
        }
    }
}

/// Router over the bridge graph. Nodes are configured chains; every bridge
/// contributes an edge for each pair of distinct supported chains.
pub struct CrossChainRouter {
    config: RouterConfig,
    chains: HashSet<String>,
    bridge_feed: Arc<dyn BridgeFeed>,
    gas_feed: Arc<dyn GasFeed>,
}

struct SearchFrame {
    chain: String,
    amount: BigDecimal,
    path: Vec<RouteHop>,
    visited: HashSet<String>,
}

impl CrossChainRouter {
    pub fn new(
        config: RouterConfig,
        chains: impl IntoIterator<Item = String>,
        bridge_feed: Arc<dyn BridgeFeed>,
        gas_feed: Arc<dyn GasFeed>,
    ) -> Self {
        Self {
            config,
            chains: chains.into_iter().collect(),
            bridge_feed,
            gas_feed,
        }
    }

    pub fn has_chain(&self, chain: &str) -> bool {
        self.chains.contains(chain)
    }

    /// Find the best route for the objective, or fail with `NoRoute` /
    /// `AmountOutOfRange` when the graph cannot carry the payment.
    pub async fn route(
        &self,
        from: &str,
        to: &str,
        amount: &BigDecimal,
        objective: RouteObjective,
    ) -> Result<RouteResult, RouterError> {
        if !self.chains.contains(from) {
            return Err(RouterError::UnknownChain(from.to_string()));
        }
        if !self.chains.contains(to) {
            return Err(RouterError::UnknownChain(to.to_string()));
        }
        if *amount <= BigDecimal::zero() {
            return Err(RouterError::InvalidAmount(amount.to_string()));
        }

        if from == to {
            return Ok(RouteResult {
                from_chain: from.to_string(),
                to_chain: to.to_string(),
                amount_in: amount.clone(),
                amount_out: amount.clone(),
                path: Vec::new(),
                total_cost: BigDecimal::zero(),
                total_time_secs: 0,
                hop_count: 0,
                success_probability: 1.0,
                recommendation: "source and destination chain match; no bridging required"
                    .to_string(),
            });
        }

        let bridges = self.bridge_feed.bridges().await?;
        let gas_by_chain = self.load_gas(&bridges, from, to).await?;
        let liquidity = self.load_liquidity(&bridges).await?;

        let candidates = self.search(from, to, amount, objective, &bridges, &gas_by_chain, &liquidity);

        if candidates.is_empty() {
            return Err(if self.reachable_ignoring_amount(from, to, &bridges) {
                RouterError::AmountOutOfRange {
                    from: from.to_string(),
                    to: to.to_string(),
                    amount: amount.clone(),
                }
            } else {
                RouterError::NoRoute {
                    from: from.to_string(),
                    to: to.to_string(),
                    max_hops: self.config.max_hops,
                }
            });
        }

        let best = select_best(candidates, objective);
        info!(
            from = %from,
            to = %to,
            hops = best.hop_count,
            total_cost = %best.total_cost,
            total_time_secs = best.total_time_secs,
            success_probability = best.success_probability,
            "Route selected"
        );
        Ok(best)
    }

    /// Gas snapshot for every chain the search can touch.
    async fn load_gas(
        &self,
        bridges: &[Bridge],
        from: &str,
        to: &str,
    ) -> Result<HashMap<String, ChainGas>, RouterError> {
        let mut wanted: HashSet<&str> = bridges
            .iter()
            .flat_map(|b| b.supported_chains.iter().map(String::as_str))
            .filter(|c| self.chains.contains(*c))
            .collect();
        wanted.insert(from);
        wanted.insert(to);

        let mut gas_by_chain = HashMap::new();
        for chain in wanted {
            let prices = self.gas_feed.gas(chain).await?;
            let native_price_usd = self.gas_feed.native_price_usd(chain).await?;
            gas_by_chain.insert(
                chain.to_string(),
                ChainGas {
                    prices,
                    native_price_usd,
                },
            );
        }
        Ok(gas_by_chain)
    }

    async fn load_liquidity(
        &self,
        bridges: &[Bridge],
    ) -> Result<HashMap<String, BigDecimal>, RouterError> {
        let mut liquidity = HashMap::new();
        for bridge in bridges {
            if let Some(available) = self.bridge_feed.liquidity(&bridge.name).await? {
                liquidity.insert(bridge.name.clone(), available);
            }
        }
        Ok(liquidity)
    }

    /// Iterative DFS with an explicit stack. Prunes on the visited set, the
    /// hop budget, bridge amount bounds, and liquidity.
    #[allow(clippy::too_many_arguments)]
    fn search(
        &self,
        from: &str,
        to: &str,
        amount: &BigDecimal,
        objective: RouteObjective,
        bridges: &[Bridge],
        gas_by_chain: &HashMap<String, ChainGas>,
        liquidity: &HashMap<String, BigDecimal>,
    ) -> Vec<RouteResult> {
        let mut candidates = Vec::new();
        let mut stack = vec![SearchFrame {
            chain: from.to_string(),
            amount: amount.clone(),
            path: Vec::new(),
            visited: HashSet::from([from.to_string()]),
        }];

        while let Some(frame) = stack.pop() {
            if frame.chain == to {
                candidates.push(self.finish_route(from, to, amount, &frame.path, bridges));
                continue;
            }
            if frame.path.len() >= self.config.max_hops {
                continue;
            }
            // On the final allowed hop, only edges landing on the destination
            // are worth expanding.
            let last_hop = frame.path.len() + 1 == self.config.max_hops;

            for bridge in bridges {
                if !bridge.supported_chains.contains(&frame.chain) {
                    continue;
                }
                if !bridge.admits(&frame.amount) {
                    continue;
                }
                if let Some(available) = liquidity.get(&bridge.name) {
                    if frame.amount > *available {
                        debug!(
                            bridge = %bridge.name,
                            amount = %frame.amount,
                            "Branch pruned on bridge liquidity"
                        );
                        continue;
                    }
                }

                for next in &bridge.supported_chains {
                    if next == &frame.chain
                        || frame.visited.contains(next)
                        || !self.chains.contains(next)
                        || (last_hop && next != to)
                    {
                        continue;
                    }
                    let (Some(from_gas), Some(to_gas)) =
                        (gas_by_chain.get(&frame.chain), gas_by_chain.get(next))
                    else {
                        continue;
                    };

                    let hop = self.build_hop(
                        bridge,
                        &frame.chain,
                        next,
                        &frame.amount,
                        from_gas,
                        to_gas,
                        objective,
                    );
                    let remaining = &frame.amount - &hop.cost_usd;
                    if remaining <= BigDecimal::zero() {
                        continue;
                    }

                    let mut path = frame.path.clone();
                    path.push(hop);
                    let mut visited = frame.visited.clone();
                    visited.insert(next.clone());
                    stack.push(SearchFrame {
                        chain: next.clone(),
                        amount: remaining,
                        path,
                        visited,
                    });
                }
            }
        }

        candidates
    }

    #[allow(clippy::too_many_arguments)]
    fn build_hop(
        &self,
        bridge: &Bridge,
        from: &str,
        to: &str,
        amount: &BigDecimal,
        from_gas: &ChainGas,
        to_gas: &ChainGas,
        objective: RouteObjective,
    ) -> RouteHop {
        let amount_f64 = amount.to_f64().unwrap_or(0.0);
        let bridge_fee = bridge.base_fee.to_f64().unwrap_or(0.0)
            + amount_f64 * bridge.fee_percent / 100.0;
        let gas_usd = hop_gas_usd(from_gas, to_gas, objective, self.config.gas_multiplier);
        let gas_f64 = gas_usd.to_f64().unwrap_or(0.0);

        let cost_usd = BigDecimal::from_f64(bridge_fee + gas_f64)
            .unwrap_or_default()
            .with_scale_round(COST_SCALE, RoundingMode::HalfUp);

        RouteHop {
            from_chain: from.to_string(),
            to_chain: to.to_string(),
            bridge: bridge.name.clone(),
            amount: amount.clone(),
            cost_usd,
            gas_usd: gas_usd.with_scale_round(COST_SCALE, RoundingMode::HalfUp),
            time_secs: bridge.avg_transfer_secs,
        }
    }

    fn finish_route(
        &self,
        from: &str,
        to: &str,
        amount_in: &BigDecimal,
        path: &[RouteHop],
        bridges: &[Bridge],
    ) -> RouteResult {
        let total_cost: BigDecimal = path.iter().map(|h| h.cost_usd.clone()).sum();
        let total_time_secs = path.iter().map(|h| h.time_secs).sum();
        let hop_count = path.len();
        let success_probability = success_probability(path, bridges);

        let recommendation = match hop_count {
            1 => format!("single hop via {}", path[0].bridge),
            n => format!(
                "{n}-hop route via {}",
                path.iter()
                    .map(|h| h.bridge.as_str())
                    .collect::<Vec<_>>()
                    .join(" -> ")
            ),
        };

        RouteResult {
            from_chain: from.to_string(),
            to_chain: to.to_string(),
            amount_in: amount_in.clone(),
            amount_out: amount_in - &total_cost,
            path: path.to_vec(),
            total_cost,
            total_time_secs,
            hop_count,
            success_probability,
            recommendation,
        }
    }

    /// Breadth-first reachability within the hop budget, ignoring amount and
    /// liquidity. Distinguishes `NoRoute` from `AmountOutOfRange`.
    fn reachable_ignoring_amount(&self, from: &str, to: &str, bridges: &[Bridge]) -> bool {
        let mut seen: HashSet<&str> = HashSet::from([from]);
        let mut frontier: VecDeque<(&str, usize)> = VecDeque::from([(from, 0)]);

        while let Some((chain, depth)) = frontier.pop_front() {
            if depth >= self.config.max_hops {
                continue;
            }
            for bridge in bridges {
                if !bridge.supported_chains.contains(chain) {
                    continue;
                }
                for next in &bridge.supported_chains {
                    if next == chain || !self.chains.contains(next) || seen.contains(next.as_str())
                    {
                        continue;
                    }
                    if next == to {
                        return true;
                    }
                    seen.insert(next);
                    frontier.push_back((next, depth + 1));
                }
            }
        }
        false
    }
}

/// Start at certainty, pay a penalty per extra hop, then discount by every
/// bridge's intrinsic reliability.
fn success_probability(path: &[RouteHop], bridges: &[Bridge]) -> f64 {
    let base = 1.0 - HOP_PROBABILITY_PENALTY * path.len().saturating_sub(1) as f64;
    path.iter()
        .fold(base, |acc, hop| {
            let reliability = bridges
                .iter()
                .find(|b| b.name == hop.bridge)
                .map(|b| b.reliability)
                .unwrap_or(1.0);
            acc * reliability
        })
        .clamp(0.0, 1.0)
}

fn select_best(candidates: Vec<RouteResult>, objective: RouteObjective) -> RouteResult {
    match objective {
        RouteObjective::Cost => candidates
            .into_iter()
            .min_by(|a, b| a.total_cost.cmp(&b.total_cost))
            .expect("non-empty candidates"),
        RouteObjective::Speed => candidates
            .into_iter()
            .min_by_key(|c| c.total_time_secs)
            .expect("non-empty candidates"),
        RouteObjective::Balance => candidates
            .into_iter()
            .max_by(|a, b| {
                balance_score(a)
                    .partial_cmp(&balance_score(b))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .expect("non-empty candidates"),
    }
}

fn balance_score(route: &RouteResult) -> f64 {
    let cost = route.total_cost.to_f64().unwrap_or(f64::MAX);
    BALANCE_COST_WEIGHT * (1.0 - cost / BALANCE_COST_NORM)
        + BALANCE_TIME_WEIGHT * (1.0 - route.total_time_secs as f64 / BALANCE_TIME_NORM)
        + BALANCE_PROB_WEIGHT * route.success_probability
}
