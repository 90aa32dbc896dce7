//! Metrics instrumentation.
//!
//! Metrics go through the [`metrics`] facade; without an installed recorder (e.g. in tests, or
//! when the `prometheus` feature is off) every call is a no-op. All names are prefixed with
//! `zoneregistry_`.

use crate::health::TickReport;
use crate::peer::Role;
use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

/// Record one answered query and its latency.
pub fn record_query(server: &str, zone: &str, duration: Duration) {
    counter!(
        "zoneregistry_query_count_total",
        "server" => server.to_string(),
        "zone" => zone.to_string()
    )
    .increment(1);
    histogram!(
        "zoneregistry_response_duration_seconds",
        "server" => server.to_string(),
        "zone" => zone.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record a peer changing health state.
pub fn record_transition(role: Role, healthy: bool) {
    counter!(
        "zoneregistry_peer_transitions_total",
        "role" => role.as_str(),
        "healthy" => if healthy { "true" } else { "false" }
    )
    .increment(1);
}

/// Publish the healthy and unhealthy peer counts of a health-check tick, by role.
#[allow(clippy::cast_precision_loss)]
pub fn record_peer_counts(report: &TickReport) {
    for role in [Role::Primary, Role::Secondary] {
        let (healthy, unhealthy) = report.counts(role);
        gauge!("zoneregistry_healthy_peers", "role" => role.as_str()).set(healthy as f64);
        gauge!("zoneregistry_unhealthy_peers", "role" => role.as_str()).set(unhealthy as f64);
    }
}

/// Helper for timing operations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
