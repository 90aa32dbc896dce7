//! Periodic health checks of every registered peer.

use crate::health::DynHealthProbe;
use crate::metrics;
use crate::peer::Role;
use crate::registry::SharedRegistry;
use tokio::task::JoinSet;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Outcome of one health-check tick.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct TickReport {
    pub healthy_primary: usize,
    pub unhealthy_primary: usize,
    pub healthy_secondary: usize,
    pub unhealthy_secondary: usize,
    /// Number of peers whose state flipped during the tick.
    pub transitions: usize,
}

impl TickReport {
    /// `(healthy, unhealthy)` peer counts for `role`.
    pub fn counts(&self, role: Role) -> (usize, usize) {
        match role {
            Role::Primary => (self.healthy_primary, self.unhealthy_primary),
            Role::Secondary => (self.healthy_secondary, self.unhealthy_secondary),
        }
    }

    fn count(&mut self, role: Role, healthy: bool) {
        let slot = match (role, healthy) {
            (Role::Primary, true) => &mut self.healthy_primary,
            (Role::Primary, false) => &mut self.unhealthy_primary,
            (Role::Secondary, true) => &mut self.healthy_secondary,
            (Role::Secondary, false) => &mut self.unhealthy_secondary,
        };
        *slot += 1;
    }
}

pub struct HealthMonitor {
    registry: SharedRegistry,
    prober: DynHealthProbe,
}

impl HealthMonitor {
    pub fn new(registry: SharedRegistry, prober: DynHealthProbe) -> Self {
        HealthMonitor { registry, prober }
    }

    /// Tick forever at the registry's configured interval. The first tick happens one interval
    /// after the call, not immediately. A tick that overruns starts the next one late, but
    /// later ticks stay on the original schedule.
    pub async fn run(self) {
        let period = self.registry.settings().interval;
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// Probe every peer concurrently and commit all verdicts at once.
    ///
    /// Peers can't be added or removed while a tick is running. Queries keep seeing the
    /// previous health state until the commit.
    pub async fn tick(&self) -> TickReport {
        let membership = self.registry.lock_membership().await;
        let peers = self.registry.peers().await;
        debug!(peers = peers.len(), "performing health checks");

        let roles: Vec<Role> = peers.iter().map(|p| p.role).collect();
        let mut probes = JoinSet::new();
        for (idx, peer) in peers.into_iter().enumerate() {
            let prober = self.prober.clone();
            probes.spawn(async move { (idx, prober.probe(&peer).await) });
        }

        let mut verdicts = vec![false; roles.len()];
        while let Some(res) = probes.join_next().await {
            match res {
                Ok((idx, healthy)) => verdicts[idx] = healthy,
                Err(err) => warn!("health probe task failed: {err}"),
            }
        }

        let changed = self.registry.commit_health(&membership, &verdicts).await;
        drop(membership);

        for peer in &changed {
            info!(
                host = %peer.host,
                role = %peer.role,
                healthy = peer.healthy,
                "peer changed state"
            );
            metrics::record_transition(peer.role, peer.healthy);
        }

        let mut report = TickReport {
            transitions: changed.len(),
            ..TickReport::default()
        };
        for (role, healthy) in roles.into_iter().zip(verdicts) {
            report.count(role, healthy);
        }
        metrics::record_peer_counts(&report);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::HealthProbe;
    use crate::peer::Peer;
    use crate::registry::{Registry, Settings};
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Answers from a fixed set of healthy hosts, counting calls.
    #[derive(Default)]
    struct FakeProbe {
        healthy: Mutex<HashSet<String>>,
        calls: Mutex<usize>,
        delay: Duration,
        first_delay: Duration,
    }

    impl FakeProbe {
        fn set_healthy(&self, hosts: &[&str]) {
            *self.healthy.lock().unwrap() = hosts.iter().map(ToString::to_string).collect();
        }
    }

    #[async_trait::async_trait]
    impl HealthProbe for FakeProbe {
        async fn probe(&self, peer: &Peer) -> bool {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                *calls
            };
            let delay = if call == 1 && !self.first_delay.is_zero() {
                self.first_delay
            } else {
                self.delay
            };
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            self.healthy.lock().unwrap().contains(&peer.host)
        }
    }

    fn registry() -> SharedRegistry {
        Arc::new(Registry::with_peers(
            Settings::default(),
            vec![
                Peer::new("p1."),
                Peer::new("p2."),
                Peer::new("s1.").with_role(Role::Secondary),
            ],
        ))
    }

    #[tokio::test]
    async fn tick_commits_verdicts() {
        let registry = registry();
        let probe = Arc::new(FakeProbe::default());
        probe.set_healthy(&["p1.", "s1."]);
        let monitor = HealthMonitor::new(registry.clone(), probe.clone());

        let report = monitor.tick().await;
        assert_eq!(*probe.calls.lock().unwrap(), 3);
        assert_eq!(report.counts(Role::Primary), (1, 1));
        assert_eq!(report.counts(Role::Secondary), (1, 0));
        assert_eq!(report.transitions, 2);

        let healthy: Vec<bool> = registry.peers().await.iter().map(|p| p.healthy).collect();
        assert_eq!(healthy, vec![true, false, true]);
    }

    #[tokio::test]
    async fn single_verdict_flips_state() {
        let registry = registry();
        let probe = Arc::new(FakeProbe::default());
        let monitor = HealthMonitor::new(registry.clone(), probe.clone());

        probe.set_healthy(&["p2."]);
        assert_eq!(monitor.tick().await.transitions, 1);
        // Same verdicts again: no transition.
        assert_eq!(monitor.tick().await.transitions, 0);

        probe.set_healthy(&[]);
        let report = monitor.tick().await;
        assert_eq!(report.transitions, 1);
        assert!(registry.peers().await.iter().all(|p| !p.healthy));
    }

    #[tokio::test]
    async fn probes_run_concurrently() {
        let registry = registry();
        let probe = Arc::new(FakeProbe {
            delay: Duration::from_millis(200),
            ..FakeProbe::default()
        });
        probe.set_healthy(&["p1.", "p2.", "s1."]);
        let monitor = HealthMonitor::new(registry.clone(), probe);

        let started = std::time::Instant::now();
        monitor.tick().await;
        assert!(started.elapsed() < Duration::from_millis(550));
        assert_eq!(registry.select_healthy().await.len(), 2);
    }

    #[tokio::test]
    async fn readers_see_previous_state_during_tick() {
        let registry = registry();
        let probe = Arc::new(FakeProbe {
            delay: Duration::from_millis(300),
            ..FakeProbe::default()
        });
        probe.set_healthy(&["s1."]);
        let monitor = HealthMonitor::new(registry.clone(), probe);

        let tick = tokio::spawn(async move { monitor.tick().await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        // Mid-tick: nothing committed yet, selection falls back to every peer.
        assert_eq!(registry.select_healthy().await.len(), 3);

        tick.await.unwrap();
        let selected = registry.select_healthy().await;
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].host, "s1.");
    }

    #[tokio::test]
    async fn membership_changes_wait_for_tick() {
        let registry = registry();
        let probe = Arc::new(FakeProbe {
            delay: Duration::from_millis(200),
            ..FakeProbe::default()
        });
        probe.set_healthy(&["p1.", "p2.", "s1."]);
        let monitor = HealthMonitor::new(registry.clone(), probe);

        let tick = tokio::spawn(async move { monitor.tick().await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        registry.add(Peer::new("p3.")).await;
        // The add waited for the tick, so all three verdicts landed on the original peers.
        let report = tick.await.unwrap();
        assert_eq!(report.transitions, 3);

        let peers = registry.peers().await;
        assert_eq!(peers.len(), 4);
        assert_eq!(
            peers.iter().map(|p| p.healthy).collect::<Vec<_>>(),
            vec![true, true, true, false]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_after_one_interval() {
        let registry = Arc::new(Registry::with_peers(
            Settings {
                interval: Duration::from_secs(10),
                ..Settings::default()
            },
            vec![Peer::new("p1.")],
        ));
        let probe = Arc::new(FakeProbe::default());
        let handle = tokio::spawn(HealthMonitor::new(registry, probe.clone()).run());

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert_eq!(*probe.calls.lock().unwrap(), 0);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(*probe.calls.lock().unwrap(), 1);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(*probe.calls.lock().unwrap(), 2);
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn overrun_keeps_schedule() {
        let registry = Arc::new(Registry::with_peers(
            Settings {
                interval: Duration::from_secs(10),
                ..Settings::default()
            },
            vec![Peer::new("p1.")],
        ));
        let probe = Arc::new(FakeProbe {
            first_delay: Duration::from_secs(12),
            ..FakeProbe::default()
        });
        let handle = tokio::spawn(HealthMonitor::new(registry, probe.clone()).run());

        // Tick at 10s runs until 22s; the missed 20s tick starts right away.
        tokio::time::sleep(Duration::from_secs(23)).await;
        assert_eq!(*probe.calls.lock().unwrap(), 2);
        // The next tick stays at 30s instead of moving to 32s.
        tokio::time::sleep(Duration::from_secs(8)).await;
        assert_eq!(*probe.calls.lock().unwrap(), 3);
        handle.abort();
    }
}
