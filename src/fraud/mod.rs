// src/fraud/mod.rs - Multi-signal fraud analysis

use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

pub mod blocklist;
pub mod detectors;
pub mod types;

pub use blocklist::Blocklist;
pub use types::*;

use crate::models::Transaction;
use crate::profile::ProfileStore;
use crate::utils::Clock;

/// Risk engine combining velocity, amount-distribution, pattern, geo, and
/// behavioral evidence into one bounded score.
///
/// `analyze` never fails on domain input: a transaction touching a blocked
/// address short-circuits to a terminal critical analysis, and a transaction
/// with no evidence scores as safe.
pub struct FraudAnalyzer {
    config: FraudConfig,
    profiles: Arc<ProfileStore>,
    blocklist: Arc<Blocklist>,
    clock: Arc<dyn Clock>,
    stats: Mutex<AnalyzerStats>,
}

impl FraudAnalyzer {
    pub fn new(
        config: FraudConfig,
        profiles: Arc<ProfileStore>,
        blocklist: Arc<Blocklist>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            profiles,
            blocklist,
            clock,
            stats: Mutex::new(AnalyzerStats::default()),
        }
    }

    /// Score one transaction against the user's prior profile, then record
    /// the observation so the next analysis sees it.
    pub fn analyze(&self, tx: &Transaction) -> FraudAnalysis {
        let analysis = if self.blocklist.contains(&tx.from_address)
            || self.blocklist.contains(&tx.to_address)
        {
            self.blocked_address_analysis(tx)
        } else {
            self.scored_analysis(tx)
        };

        self.profiles.observe(tx);

        let mut stats = self.stats.lock().expect("stats mutex poisoned");
        stats.analyses += 1;
        if analysis.recommendation == Recommendation::Block {
            stats.blocks += 1;
        }

        analysis
    }

    fn blocked_address_analysis(&self, tx: &Transaction) -> FraudAnalysis {
        warn!(
            transaction_id = %tx.id,
            user_id = %tx.user_id,
            "Transaction touches blocklisted address"
        );

        let signal = FraudSignal::new(
            SignalKind::KnownFraud,
            SignalSeverity::Critical,
            1.0,
            "address present on fraud blocklist",
            serde_json::json!({
                "from": tx.from_address,
                "to": tx.to_address,
            }),
        );

        FraudAnalysis {
            transaction_id: tx.id.clone(),
            risk_score: 1.0,
            risk_level: RiskLevel::Critical,
            reasoning: vec![signal.description.clone()],
            signals: vec![signal],
            recommendation: Recommendation::Block,
            confidence: 1.0,
            analyzed_at: self.clock.now(),
        }
    }

    fn scored_analysis(&self, tx: &Transaction) -> FraudAnalysis {
        let profile = self.profiles.get(&tx.user_id);
        let profile_ref = profile.as_ref();

        let mut signals = Vec::new();
        signals.extend(detectors::velocity::detect(tx, profile_ref, &self.config));
        signals.extend(detectors::amount::detect(tx, profile_ref, &self.config));
        signals.extend(detectors::pattern::detect(tx, profile_ref, &self.config));
        signals.extend(detectors::geo::detect(tx, profile_ref, &self.config));
        signals.extend(detectors::behavioral::detect(tx, profile_ref, &self.config));

        let risk_score = aggregate_score(&signals);
        let risk_level = RiskLevel::from_score(risk_score, &self.config.level_thresholds);

        let mut recommendation = self
            .config
            .recommendations
            .get(&risk_level)
            .copied()
            .unwrap_or(Recommendation::Review);

        // Impossible travel dominates whatever the aggregate says.
        if signals.iter().any(detectors::geo::is_impossible_travel) {
            recommendation = Recommendation::Block;
        }

        let confidence = analysis_confidence(&signals);
        let reasoning = build_reasoning(&signals, risk_score);

        debug!(
            transaction_id = %tx.id,
            user_id = %tx.user_id,
            risk_score,
            signal_count = signals.len(),
            "Fraud analysis complete"
        );
        if recommendation == Recommendation::Block {
            info!(
                transaction_id = %tx.id,
                user_id = %tx.user_id,
                risk_score,
                "Transaction blocked by fraud analysis"
            );
        }

        FraudAnalysis {
            transaction_id: tx.id.clone(),
            risk_score,
            risk_level,
            signals,
            recommendation,
            confidence,
            reasoning,
            analyzed_at: self.clock.now(),
        }
    }

    pub fn blocklist(&self) -> &Blocklist {
        &self.blocklist
    }

    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    pub fn stats(&self) -> AnalyzerStats {
        *self.stats.lock().expect("stats mutex poisoned")
    }
}

fn aggregate_score(signals: &[FraudSignal]) -> f64 {
    let weighted: f64 = signals
        .iter()
        .map(|s| s.severity.weight() * s.confidence)
        .sum();
    (weighted / signals.len().max(1) as f64).clamp(0.0, 1.0)
}

fn analysis_confidence(signals: &[FraudSignal]) -> f64 {
    if signals.is_empty() {
        // High confidence that a signal-free transaction is safe.
        return 1.0;
    }
    let mean: f64 = signals.iter().map(|s| s.confidence).sum::<f64>() / signals.len() as f64;
    let bonus = (0.05 * signals.len() as f64).min(0.2);
    (mean + bonus).clamp(0.0, 1.0)
}

fn build_reasoning(signals: &[FraudSignal], risk_score: f64) -> Vec<String> {
    if signals.is_empty() {
        return vec!["no risk signals detected".to_string()];
    }
    let mut lines: Vec<String> = signals
        .iter()
        .map(|s| format!("{:?}/{:?}: {}", s.kind, s.severity, s.description))
        .collect();
    lines.push(format!(
        "{} signals aggregate to risk score {risk_score:.3}",
        signals.len()
    ));
    lines
}
