// src/fraud/detectors/amount.rs - Amount-distribution signals

use bigdecimal::ToPrimitive;
use serde_json::json;

use crate::fraud::types::{FraudConfig, FraudSignal, SignalKind, SignalSeverity};
use crate::models::Transaction;
use crate::profile::UserProfile;

const MIN_PRIOR_OBSERVATIONS: u64 = 3;
const ROUND_NUMBER_STEP: f64 = 1000.0;

/// Z-score deviation against the user's Welford estimate, plus the
/// round-number heuristic.
pub fn detect(
    tx: &Transaction,
    profile: Option<&UserProfile>,
    config: &FraudConfig,
) -> Vec<FraudSignal> {
    let mut signals = Vec::new();
    let amount = tx.amount.to_f64().unwrap_or(0.0);

    if let Some(profile) = profile {
        if profile.total_transactions >= MIN_PRIOR_OBSERVATIONS {
            if let Some(std_dev) = profile.std_dev().filter(|s| *s > f64::EPSILON) {
                let z = (amount - profile.mean_amount).abs() / std_dev;
                let d = config.deviation_threshold;
                if z > d {
                    let severity = if z < 1.5 * d {
                        SignalSeverity::Low
                    } else if z < 2.0 * d {
                        SignalSeverity::Medium
                    } else {
                        SignalSeverity::High
                    };
                    let confidence = (z / (2.0 * d)).min(1.0);
                    signals.push(FraudSignal::new(
                        SignalKind::AmountAnomaly,
                        severity,
                        confidence,
                        format!(
                            "amount {:.2} deviates {:.1}σ from user mean {:.2}",
                            amount, z, profile.mean_amount
                        ),
                        json!({ "z_score": z, "mean": profile.mean_amount, "std_dev": std_dev }),
                    ));
                }
            }
        }
    }

    if amount >= ROUND_NUMBER_STEP && (amount % ROUND_NUMBER_STEP).abs() < f64::EPSILON {
        signals.push(FraudSignal::new(
            SignalKind::AmountAnomaly,
            SignalSeverity::Low,
            0.6,
            format!("round number amount {amount:.0}"),
            json!({ "amount": amount }),
        ));
    }

    signals
}
