// src/fraud/detectors/pattern.rs - Structural transaction patterns

use std::collections::HashSet;

use bigdecimal::{BigDecimal, Zero};
use chrono::Duration;
use serde_json::json;

use crate::fraud::types::{FraudConfig, FraudSignal, SignalKind, SignalSeverity};
use crate::models::Transaction;
use crate::profile::UserProfile;

const REPEATED_AMOUNT_THRESHOLD: usize = 5;
const DISPERSION_UNIQUE_THRESHOLD: usize = 10;
const DISPERSION_TOTAL_CAP: usize = 15;

/// Sequential amounts, repeated amounts, and destination dispersion.
pub fn detect(
    tx: &Transaction,
    profile: Option<&UserProfile>,
    _config: &FraudConfig,
) -> Vec<FraudSignal> {
    let Some(profile) = profile else {
        return Vec::new();
    };

    let mut signals = Vec::new();

    if let Some(signal) = sequential_amounts(tx, profile) {
        signals.push(signal);
    }
    if let Some(signal) = repeated_amount(tx, profile) {
        signals.push(signal);
    }
    if let Some(signal) = address_dispersion(tx, profile) {
        signals.push(signal);
    }

    signals
}

/// Last three prior amounts plus the current one form an arithmetic
/// progression with a nonzero step.
fn sequential_amounts(tx: &Transaction, profile: &UserProfile) -> Option<FraudSignal> {
    if profile.recent.len() < 3 {
        return None;
    }

    let mut amounts: Vec<&BigDecimal> = profile
        .recent
        .iter()
        .rev()
        .take(3)
        .map(|t| &t.amount)
        .collect();
    amounts.reverse();
    amounts.push(&tx.amount);

    let step = amounts[1] - amounts[0];
    if step.is_zero() {
        return None;
    }
    let sequential = amounts.windows(2).all(|pair| pair[1] - pair[0] == step);
    if !sequential {
        return None;
    }

    Some(FraudSignal::new(
        SignalKind::Pattern,
        SignalSeverity::Medium,
        0.8,
        format!("sequential amounts with step {step}"),
        json!({ "pattern": "sequential", "step": step.to_string() }),
    ))
}

/// The current amount occurs at least five times across the recent window.
fn repeated_amount(tx: &Transaction, profile: &UserProfile) -> Option<FraudSignal> {
    let occurrences = 1 + profile
        .recent
        .iter()
        .filter(|t| t.amount == tx.amount)
        .count();
    if occurrences < REPEATED_AMOUNT_THRESHOLD {
        return None;
    }

    Some(FraudSignal::new(
        SignalKind::Pattern,
        SignalSeverity::Medium,
        0.75,
        format!("amount repeated {occurrences} times in recent window"),
        json!({ "pattern": "repeated", "occurrences": occurrences }),
    ))
}

/// Many distinct destinations within the last hour while overall volume
/// stays small - classic fan-out.
fn address_dispersion(tx: &Transaction, profile: &UserProfile) -> Option<FraudSignal> {
    let last_hour = profile.recent_since(tx.timestamp - Duration::hours(1));
    let total = last_hour.len() + 1;

    let mut destinations: HashSet<&str> =
        last_hour.iter().map(|t| t.to_address.as_str()).collect();
    destinations.insert(tx.to_address.as_str());

    if destinations.len() < DISPERSION_UNIQUE_THRESHOLD || total > DISPERSION_TOTAL_CAP {
        return None;
    }

    Some(FraudSignal::new(
        SignalKind::Pattern,
        SignalSeverity::High,
        0.85,
        format!(
            "{} unique destinations across {} transactions in the last hour",
            destinations.len(),
            total
        ),
        json!({ "pattern": "dispersion", "unique_destinations": destinations.len(), "total": total }),
    ))
}
