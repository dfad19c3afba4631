//! Statistical sanity check on indexer output.
//!
//! Each tier's winner count is compared with its hypergeometric expectation. A flag is an
//! operator alert, never a reason to withhold `finalize_draw`.

use crate::draw::game::GameRules;
use crate::draw::indexer::WinnerCounts;
use serde::Serialize;
use std::fmt;

pub const DEFAULT_Z_SCORE: f64 = 6.0;
pub const DEFAULT_SLACK: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlausibilityConfig {
    pub z_score: f64,
    /// Absolute tolerance added on top of `z * sd` so tiny samples never flag.
    pub slack: f64,
}

impl Default for PlausibilityConfig {
    fn default() -> Self {
        Self {
            z_score: DEFAULT_Z_SCORE,
            slack: DEFAULT_SLACK,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierAnomaly {
    pub tier: u8,
    pub observed: u32,
    pub expected: f64,
    pub std_dev: f64,
}

impl fmt::Display for TierAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "match{}: observed {} vs expected {:.2} (sd {:.2})",
            self.tier, self.observed, self.expected, self.std_dev
        )
    }
}

fn binomial(n: u64, k: u64) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    (0..k).fold(1.0f64, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}

/// Probability that a ticket matches exactly `k` of the drawn numbers.
pub fn tier_probability(rules: &GameRules, k: u8) -> f64 {
    let pool = u64::from(rules.pool_size);
    let picks = u64::from(rules.pick_count);
    let k = u64::from(k);
    if k > picks {
        return 0.0;
    }
    binomial(picks, k) * binomial(pool - picks, picks - k) / binomial(pool, picks)
}

pub fn check_plausibility(
    rules: &GameRules,
    counts: &WinnerCounts,
    total_tickets: u64,
    config: &PlausibilityConfig,
) -> Vec<TierAnomaly> {
    let total = total_tickets as f64;
    counts
        .tiers()
        .filter_map(|(tier, observed)| {
            let p = tier_probability(rules, tier);
            let expected = total * p;
            let std_dev = (total * p * (1.0 - p)).sqrt();
            let deviation = (f64::from(observed) - expected).abs();
            (deviation > config.z_score * std_dev + config.slack).then_some(TierAnomaly {
                tier,
                observed,
                expected,
                std_dev,
            })
        })
        .collect()
}
