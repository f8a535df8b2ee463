// Per-hop gas cost model

use bigdecimal::{BigDecimal, FromPrimitive};

use crate::{GasPrices, RouteObjective};

/// Gas units burned by the outbound (lock/burn) leg of a hop.
pub const GAS_UNITS_TRANSFER_OUT: u64 = 150_000;
/// Gas units burned by the inbound (mint/release) leg of a hop.
pub const GAS_UNITS_TRANSFER_IN: u64 = 100_000;

/// Resolved gas data for one chain: tier prices plus the native token price.
#[derive(Debug, Clone)]
pub struct ChainGas {
    pub prices: GasPrices,
    pub native_price_usd: f64,
}

/// USD cost of one gas leg on a chain.
///
/// `units × gwei × 1e-9` converts to native units; the native price converts
/// to USD; the multiplier absorbs deployment-specific padding.
pub fn leg_cost_usd(
    units: u64,
    chain_gas: &ChainGas,
    objective: RouteObjective,
    gas_multiplier: f64,
) -> f64 {
    units as f64
        * chain_gas.prices.tier_gwei(objective)
        * 1e-9
        * chain_gas.native_price_usd
        * gas_multiplier
}

/// Total gas for a hop: an outbound leg on the source chain and an inbound
/// leg on the destination chain.
pub fn hop_gas_usd(
    from_gas: &ChainGas,
    to_gas: &ChainGas,
    objective: RouteObjective,
    gas_multiplier: f64,
) -> BigDecimal {
    let total = leg_cost_usd(GAS_UNITS_TRANSFER_OUT, from_gas, objective, gas_multiplier)
        + leg_cost_usd(GAS_UNITS_TRANSFER_IN, to_gas, objective, gas_multiplier);
    BigDecimal::from_f64(total).unwrap_or_default()
}
