// src/fraud/types.rs - Risk signal and analysis types

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::*;

/// Signal family emitted by a detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalKind {
    Velocity,
    AmountAnomaly,
    Pattern,
    GeoAnomaly,
    KnownFraud,
    Behavioral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl SignalSeverity {
    /// Weight used by the aggregate risk score.
    pub fn weight(&self) -> f64 {
        match self {
            SignalSeverity::Low => 0.25,
            SignalSeverity::Medium => 0.5,
            SignalSeverity::High => 0.75,
            SignalSeverity::Critical => 1.0,
        }
    }
}

/// One piece of evidence produced by a detector. Immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudSignal {
    pub kind: SignalKind,
    pub severity: SignalSeverity,
    pub confidence: f64,
    pub description: String,
    pub metadata: serde_json::Value,
}

impl FraudSignal {
    pub fn new(
        kind: SignalKind,
        severity: SignalSeverity,
        confidence: f64,
        description: impl Into<String>,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            kind,
            severity,
            confidence: confidence.clamp(0.0, 1.0),
            description: description.into(),
            metadata,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Safe,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Convert an aggregate risk score to a level using configured thresholds.
    pub fn from_score(score: f64, thresholds: &LevelThresholds) -> Self {
        match score {
            s if s < thresholds.low => RiskLevel::Safe,
            s if s < thresholds.medium => RiskLevel::Low,
            s if s < thresholds.high => RiskLevel::Medium,
            s if s < thresholds.critical => RiskLevel::High,
            _ => RiskLevel::Critical,
        }
    }
}

/// Score boundaries between adjacent risk levels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelThresholds {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

impl Default for LevelThresholds {
    fn default() -> Self {
        Self {
            low: DEFAULT_RISK_LOW_THRESHOLD,
            medium: DEFAULT_RISK_MEDIUM_THRESHOLD,
            high: DEFAULT_RISK_HIGH_THRESHOLD,
            critical: DEFAULT_RISK_CRITICAL_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Approve,
    Flag,
    Block,
    Review,
}

/// Derived analysis for one transaction; never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudAnalysis {
    pub transaction_id: String,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub signals: Vec<FraudSignal>,
    pub recommendation: Recommendation,
    pub confidence: f64,
    pub reasoning: Vec<String>,
    pub analyzed_at: DateTime<Utc>,
}

/// Detector thresholds and the level-to-recommendation mapping.
#[derive(Debug, Clone)]
pub struct FraudConfig {
    /// Hourly transaction count threshold (τ) for the velocity detector.
    pub velocity_threshold: u32,
    /// Five-minute burst count that always raises a high-severity signal.
    pub burst_threshold: usize,
    /// Z-score threshold (d) for the amount anomaly detector.
    pub deviation_threshold: f64,
    /// Travel speed above which a geo jump is considered impossible, km/h.
    pub impossible_speed_kmh: f64,
    pub level_thresholds: LevelThresholds,
    /// Missing levels fall back to `Recommendation::Review`.
    pub recommendations: HashMap<RiskLevel, Recommendation>,
}

impl Default for FraudConfig {
    fn default() -> Self {
        let mut recommendations = HashMap::new();
        recommendations.insert(RiskLevel::Safe, Recommendation::Approve);
        recommendations.insert(RiskLevel::Low, Recommendation::Flag);
        recommendations.insert(RiskLevel::Medium, Recommendation::Review);
        recommendations.insert(RiskLevel::High, Recommendation::Review);
        recommendations.insert(RiskLevel::Critical, Recommendation::Block);

        Self {
            velocity_threshold: DEFAULT_VELOCITY_THRESHOLD,
            burst_threshold: DEFAULT_BURST_THRESHOLD,
            deviation_threshold: DEFAULT_DEVIATION_THRESHOLD,
            impossible_speed_kmh: DEFAULT_IMPOSSIBLE_SPEED_KMH,
            level_thresholds: LevelThresholds::default(),
            recommendations,
        }
    }
}

/// Running counters exposed for monitoring.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AnalyzerStats {
    pub analyses: u64,
    pub blocks: u64,
}
