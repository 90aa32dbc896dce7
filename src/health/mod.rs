//! Peer health checking.
//!
//! A [`HealthProbe`] decides whether a single peer is healthy. The [`HealthMonitor`] runs a
//! probe against every registered peer once per interval and commits the verdicts to the
//! [`Registry`][crate::registry::Registry].
//!
//! Health is a two-state machine per peer, `unhealthy` (initial) and `healthy`. A single
//! verdict flips it; there is no failure threshold.

pub mod monitor;
pub mod prober;

use crate::peer::Peer;
use std::sync::Arc;

pub use monitor::{HealthMonitor, TickReport};
pub use prober::{HttpProber, PROBE_DEADLINE};

#[allow(clippy::module_name_repetitions)]
pub type DynHealthProbe = Arc<dyn HealthProbe + Send + Sync>;

/// Checks the reachability of a peer.
///
/// Failures are verdicts: implementations return `false` instead of surfacing errors.
#[async_trait::async_trait]
pub trait HealthProbe {
    async fn probe(&self, peer: &Peer) -> bool;
}
