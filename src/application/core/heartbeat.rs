//! HeartbeatMonitor (L3, §4.13).
//!
//! Grounded in `application::monitoring::agent_status::AgentStatusRegistry`
//! and `application::monitoring::heartbeat::StreamHealthMonitor`, but
//! shaped exactly as the spec's `HeartbeatTable`: a plain
//! `component_name -> last_beat_ts` map with a reader returning
//! `{name: age_ms}` and a single aggregate healthy/unhealthy verdict.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

const DEFAULT_HEALTHY_THRESHOLD_MS: i64 = 120_000;

#[derive(Debug)]
pub struct HeartbeatMonitor {
    last_beat: RwLock<HashMap<String, DateTime<Utc>>>,
    healthy_threshold_ms: i64,
}

impl HeartbeatMonitor {
    pub fn new(healthy_threshold_ms: i64) -> Self {
        Self {
            last_beat: RwLock::new(HashMap::new()),
            healthy_threshold_ms,
        }
    }

    pub fn beat(&self, name: &str, now: DateTime<Utc>) {
        self.last_beat
            .write()
            .expect("heartbeat lock poisoned")
            .insert(name.to_string(), now);
    }

    /// `{name: age_ms}` snapshot as of `now`.
    pub fn ages_ms(&self, now: DateTime<Utc>) -> HashMap<String, i64> {
        self.last_beat
            .read()
            .expect("heartbeat lock poisoned")
            .iter()
            .map(|(name, ts)| (name.clone(), (now - *ts).num_milliseconds().max(0)))
            .collect()
    }

    /// Healthy iff every registered component's age is under the threshold
    /// (§4.13: "healthy iff every component's age < 120s"). A monitor with
    /// no registered components is considered healthy (nothing to fail).
    pub fn is_healthy(&self, now: DateTime<Utc>) -> bool {
        self.ages_ms(now).values().all(|age| *age < self.healthy_threshold_ms)
    }

    pub fn unhealthy_components(&self, now: DateTime<Utc>) -> Vec<String> {
        self.ages_ms(now)
            .into_iter()
            .filter(|(_, age)| *age >= self.healthy_threshold_ms)
            .map(|(name, _)| name)
            .collect()
    }
}

/// A monitor using the spec's default 120s healthy threshold.
pub fn default_heartbeat_monitor() -> HeartbeatMonitor {
    HeartbeatMonitor::new(DEFAULT_HEALTHY_THRESHOLD_MS)
}
