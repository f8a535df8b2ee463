// src/fraud/detectors/velocity.rs - Transaction-rate signals

use chrono::Duration;
use serde_json::json;

use crate::fraud::types::{FraudConfig, FraudSignal, SignalKind, SignalSeverity};
use crate::models::Transaction;
use crate::profile::UserProfile;

/// Hourly-rate and five-minute-burst detection against the prior history.
pub fn detect(
    tx: &Transaction,
    profile: Option<&UserProfile>,
    config: &FraudConfig,
) -> Vec<FraudSignal> {
    let Some(profile) = profile else {
        return Vec::new();
    };

    let mut signals = Vec::new();

    let n_1h = profile
        .recent_since(tx.timestamp - Duration::hours(1))
        .len();
    let n_5m = profile
        .recent_since(tx.timestamp - Duration::minutes(5))
        .len();

    let tau = config.velocity_threshold as usize;
    if tau > 0 && n_1h >= tau {
        let ratio = n_1h as f64 / tau as f64;
        let severity = if ratio < 1.5 {
            SignalSeverity::Medium
        } else if ratio < 2.0 {
            SignalSeverity::High
        } else {
            SignalSeverity::Critical
        };
        let confidence = (n_1h as f64 / (2.0 * tau as f64)).min(1.0);
        signals.push(FraudSignal::new(
            SignalKind::Velocity,
            severity,
            confidence,
            format!("{n_1h} transactions in the last hour (threshold {tau})"),
            json!({ "count_1h": n_1h, "threshold": tau }),
        ));
    }

    if n_5m >= config.burst_threshold {
        signals.push(FraudSignal::new(
            SignalKind::Velocity,
            SignalSeverity::High,
            0.9,
            format!("{n_5m} transactions within five minutes"),
            json!({ "count_5m": n_5m }),
        ));
    }

    signals
}
