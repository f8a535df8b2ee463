// Global constants for the Paymesh engine

// Profile store
pub const PROFILE_HISTORY_CAP: usize = 100;

// Risk level thresholds (score boundaries between adjacent levels)
pub const DEFAULT_RISK_LOW_THRESHOLD: f64 = 0.1;
pub const DEFAULT_RISK_MEDIUM_THRESHOLD: f64 = 0.3;
pub const DEFAULT_RISK_HIGH_THRESHOLD: f64 = 0.5;
pub const DEFAULT_RISK_CRITICAL_THRESHOLD: f64 = 0.7;

// Fraud detector thresholds
pub const DEFAULT_VELOCITY_THRESHOLD: u32 = 10;
pub const DEFAULT_BURST_THRESHOLD: usize = 5;
pub const DEFAULT_DEVIATION_THRESHOLD: f64 = 3.0;
pub const DEFAULT_IMPOSSIBLE_SPEED_KMH: f64 = 900.0;

// Pricing combiner
pub const PRICE_HISTORY_CAP: usize = 1000;
pub const DEMAND_IMPACT_COEFFICIENT: f64 = 0.10;
pub const TIME_IMPACT_COEFFICIENT: f64 = 0.10;
pub const CAPACITY_IMPACT_COEFFICIENT: f64 = 0.15;
pub const COMPETITOR_IMPACT_COEFFICIENT: f64 = 0.5;
pub const COMPETITOR_UNDERCUT_FACTOR: f64 = 0.95;
pub const PRICE_ELASTICITY: f64 = -1.5;
pub const MARGIN_SENSITIVITY: f64 = 0.3;
pub const PRICING_BASE_CONFIDENCE: f64 = 0.7;
pub const PRICING_HISTORY_CONFIDENCE_BONUS: f64 = 0.1;
pub const PRICING_COMPETITOR_CONFIDENCE_BONUS: f64 = 0.1;
pub const PRICING_VARIANCE_CONFIDENCE_PENALTY: f64 = 0.15;
pub const PRICING_HISTORY_BONUS_MIN_LEN: usize = 100;
pub const PRICING_COMPETITOR_BONUS_MIN: usize = 3;
pub const PRICING_SCORE_VARIANCE_LIMIT: f64 = 0.5;

// Orchestrator
pub const DEFAULT_HIGH_VALUE_THRESHOLD: f64 = 10_000.0;
pub const DEFAULT_EXECUTION_PRIORITY: i32 = 5;
pub const DEFAULT_HIGH_VALUE_PRIORITY: i32 = 8;

// Default tracing filter
pub const DEFAULT_TRACING_FILTER: &str = "paymesh_engine=debug,paymesh_swarm=debug";
