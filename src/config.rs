//! Scheduler configuration.
//!
//! Passed in by the embedding application (bot process, CLI, service); the
//! core never reads the environment itself.

use serde::{Deserialize, Serialize};

/// Tuning knobs for sweeping, arming, and delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// How often the reconciliation sweep runs.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Look-ahead window for arming timers. Must be >= the sweep interval
    /// so no due event falls between two sweeps.
    #[serde(default = "default_arm_horizon_secs")]
    pub arm_horizon_secs: u64,
    /// Floor for timer delays. Past-due events (found after a restart) fire
    /// after this floor instead of all at once.
    #[serde(default = "default_min_delay_secs")]
    pub min_delay_secs: u64,
    /// Per-request timeout for outbound delivery.
    #[serde(default = "default_delivery_timeout_secs")]
    pub delivery_timeout_secs: u64,
    /// What to do when a delivery fails.
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_sweep_interval_secs() -> u64 {
    1800
}
fn default_arm_horizon_secs() -> u64 {
    1800
}
fn default_min_delay_secs() -> u64 {
    10
}
fn default_delivery_timeout_secs() -> u64 {
    30
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval_secs(),
            arm_horizon_secs: default_arm_horizon_secs(),
            min_delay_secs: default_min_delay_secs(),
            delivery_timeout_secs: default_delivery_timeout_secs(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Retry policy for failed deliveries. Deliberately `None` by default:
/// a failed attempt terminalizes the event so the scheduler never gets
/// stuck retrying. Kept as an explicit policy so bounded retry can be
/// added without changing existing behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryPolicy {
    #[default]
    None,
}
