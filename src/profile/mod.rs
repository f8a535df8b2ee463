// src/profile/mod.rs - In-memory per-user rolling profiles

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::PROFILE_HISTORY_CAP;
use crate::models::Transaction;
use crate::utils::Clock;

/// Rolling per-user statistics. Created lazily on first observation and
/// never deleted. Counters are cumulative: evicting an entry from the
/// capped history does not subtract from them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub first_seen: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub total_transactions: u64,
    pub total_volume: BigDecimal,
    /// Welford running mean of transaction amounts.
    pub mean_amount: f64,
    /// Welford running sum of squared deviations (M2).
    pub m2: f64,
    pub chains: HashSet<String>,
    pub countries: HashSet<String>,
    /// Capped FIFO of recent transactions, oldest first.
    pub recent: VecDeque<Transaction>,
}

impl UserProfile {
    fn new(user_id: &str, first_seen: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            first_seen,
            last_activity: first_seen,
            total_transactions: 0,
            total_volume: BigDecimal::zero(),
            mean_amount: 0.0,
            m2: 0.0,
            chains: HashSet::new(),
            countries: HashSet::new(),
            recent: VecDeque::new(),
        }
    }

    fn record(&mut self, tx: &Transaction) {
        let amount = tx.amount.to_f64().unwrap_or(0.0);

        self.total_transactions += 1;
        self.total_volume += &tx.amount;
        self.last_activity = tx.timestamp;

        // Welford update keeps mean/variance stable without retaining the stream.
        let n = self.total_transactions as f64;
        let delta = amount - self.mean_amount;
        self.mean_amount += delta / n;
        let delta2 = amount - self.mean_amount;
        self.m2 += delta * delta2;

        self.chains.insert(tx.chain.clone());
        if let Some(geo) = &tx.geo {
            self.countries.insert(geo.country.clone());
        }

        self.recent.push_back(tx.clone());
        if self.recent.len() > PROFILE_HISTORY_CAP {
            self.recent.pop_front();
        }
    }

    /// Sample standard deviation of observed amounts; `None` until two
    /// observations exist.
    pub fn std_dev(&self) -> Option<f64> {
        if self.total_transactions < 2 {
            return None;
        }
        let variance = self.m2 / (self.total_transactions as f64 - 1.0);
        Some(variance.max(0.0).sqrt())
    }

    pub fn account_age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.first_seen).num_days().max(0)
    }

    /// Transactions at or after the cutoff, oldest first.
    pub fn recent_since(&self, cutoff: DateTime<Utc>) -> Vec<Transaction> {
        self.recent
            .iter()
            .filter(|tx| tx.timestamp >= cutoff)
            .cloned()
            .collect()
    }
}

/// Store of user profiles behind a single mutex. The fraud path is the only
/// writer; readers take cloned snapshots so the lock is never held across
/// detector work.
pub struct ProfileStore {
    clock: Arc<dyn Clock>,
    profiles: Mutex<HashMap<String, UserProfile>>,
}

impl ProfileStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            profiles: Mutex::new(HashMap::new()),
        }
    }

    /// Upsert the profile for `tx.user_id` with this observation. Per-user
    /// ordering follows call order; cross-user ordering is irrelevant.
    pub fn observe(&self, tx: &Transaction) {
        let mut profiles = self.profiles.lock().expect("profile mutex poisoned");
        let profile = profiles
            .entry(tx.user_id.clone())
            .or_insert_with(|| UserProfile::new(&tx.user_id, tx.timestamp));
        profile.record(tx);
        debug!(
            user_id = %tx.user_id,
            total = profile.total_transactions,
            "Profile observation recorded"
        );
    }

    /// Recent transactions for a user, filtered by a monotonic cutoff.
    /// Without a window, the full capped history is returned.
    pub fn recent(&self, user_id: &str, window: Option<Duration>) -> Vec<Transaction> {
        let profiles = self.profiles.lock().expect("profile mutex poisoned");
        match profiles.get(user_id) {
            Some(profile) => match window {
                Some(window) => profile.recent_since(self.clock.now() - window),
                None => profile.recent.iter().cloned().collect(),
            },
            None => Vec::new(),
        }
    }

    /// Cloned snapshot of a profile, if the user has been observed.
    pub fn get(&self, user_id: &str) -> Option<UserProfile> {
        let profiles = self.profiles.lock().expect("profile mutex poisoned");
        profiles.get(user_id).cloned()
    }

    pub fn profile_count(&self) -> usize {
        let profiles = self.profiles.lock().expect("profile mutex poisoned");
        profiles.len()
    }
}
