// src/fraud/detectors/behavioral.rs - Account-behavior signals

use bigdecimal::ToPrimitive;
use serde_json::json;

use crate::fraud::types::{FraudConfig, FraudSignal, SignalKind, SignalSeverity};
use crate::models::Transaction;
use crate::profile::UserProfile;

const NEW_ACCOUNT_AGE_DAYS: i64 = 7;
const NEW_ACCOUNT_AMOUNT_LIMIT: f64 = 5000.0;
const ESTABLISHED_USER_TX_COUNT: u64 = 10;

/// Young accounts moving large amounts, and established users touching a
/// chain they have never used.
pub fn detect(
    tx: &Transaction,
    profile: Option<&UserProfile>,
    _config: &FraudConfig,
) -> Vec<FraudSignal> {
    let mut signals = Vec::new();
    let amount = tx.amount.to_f64().unwrap_or(0.0);

    let account_age_days = profile
        .map(|p| p.account_age_days(tx.timestamp))
        .unwrap_or(0);
    if account_age_days < NEW_ACCOUNT_AGE_DAYS && amount > NEW_ACCOUNT_AMOUNT_LIMIT {
        signals.push(FraudSignal::new(
            SignalKind::Behavioral,
            SignalSeverity::Medium,
            0.65,
            format!("account {account_age_days} days old moving {amount:.2}"),
            json!({ "account_age_days": account_age_days, "amount": amount }),
        ));
    }

    if let Some(profile) = profile {
        if profile.total_transactions > ESTABLISHED_USER_TX_COUNT
            && !profile.chains.contains(&tx.chain)
        {
            signals.push(FraudSignal::new(
                SignalKind::Behavioral,
                SignalSeverity::Low,
                0.5,
                format!("first use of chain {} for an established user", tx.chain),
                json!({ "chain": tx.chain, "known_chains": profile.chains }),
            ));
        }
    }

    signals
}
