// src/fraud/detectors/geo.rs - Geographic anomaly signals

use serde_json::json;

use crate::fraud::types::{FraudConfig, FraudSignal, SignalKind, SignalSeverity};
use crate::models::Transaction;
use crate::profile::UserProfile;

/// Unusual-country and impossible-travel detection. The typical-country set
/// accumulates on observation, so the check runs against countries from
/// prior transactions only.
pub fn detect(
    tx: &Transaction,
    profile: Option<&UserProfile>,
    config: &FraudConfig,
) -> Vec<FraudSignal> {
    let (Some(profile), Some(geo)) = (profile, tx.geo.as_ref()) else {
        return Vec::new();
    };

    let mut signals = Vec::new();

    if !profile.countries.is_empty() && !profile.countries.contains(&geo.country) {
        signals.push(FraudSignal::new(
            SignalKind::GeoAnomaly,
            SignalSeverity::Medium,
            0.7,
            format!("transaction from unusual country {}", geo.country),
            json!({ "country": geo.country, "typical_countries": profile.countries }),
        ));
    }

    // Most recent prior transaction that carried a location.
    let last_located = profile.recent.iter().rev().find(|t| t.geo.is_some());
    if let Some(prior) = last_located {
        let prior_geo = prior.geo.as_ref().expect("filtered on geo presence");
        let distance_km = prior_geo.distance_km(geo);
        let elapsed_hours =
            (tx.timestamp - prior.timestamp).num_milliseconds() as f64 / 3_600_000.0;
        let speed_kmh = if elapsed_hours > 0.0 {
            distance_km / elapsed_hours
        } else if distance_km > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        if speed_kmh > config.impossible_speed_kmh {
            signals.push(FraudSignal::new(
                SignalKind::GeoAnomaly,
                SignalSeverity::Critical,
                0.95,
                format!(
                    "impossible travel: {distance_km:.0} km in {elapsed_hours:.2} h"
                ),
                json!({
                    "anomaly": "impossible_travel",
                    "distance_km": distance_km,
                    "elapsed_hours": elapsed_hours,
                }),
            ));
        }
    }

    signals
}

/// Whether a signal is the impossible-travel evidence that forces a block.
pub fn is_impossible_travel(signal: &FraudSignal) -> bool {
    signal.kind == SignalKind::GeoAnomaly
        && signal.severity == SignalSeverity::Critical
        && signal.metadata.get("anomaly").and_then(|v| v.as_str()) == Some("impossible_travel")
}
