//! Peer registry.
//!
//! The registry owns the ordered list of [`Peer`]s and the round-robin cursor shared by every
//! query. It is created once at startup and handed to both the
//! [`HealthMonitor`][crate::health::HealthMonitor] and the [DNS handler][crate::dns] as a
//! [`SharedRegistry`].
//!
//! # Locking
//!
//! * Peer list reads (selection, snapshots) take a shared [`RwLock`] read guard.
//! * Writes (add, remove, health commits) take the exclusive write guard.
//! * The cursor is an atomic advanced with compare-and-swap, so no two selections ever rotate
//!   from the same starting value.
//! * Membership changes and monitor ticks are serialized through a separate mutex. A tick
//!   holds it while probing so add/remove can't interleave with a tick, while queries keep
//!   reading the pre-tick state until the verdicts are committed in one write.

mod select;

use crate::error::Error;
use crate::peer::Peer;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard, RwLock};

#[allow(clippy::module_name_repetitions)]
pub type SharedRegistry = Arc<Registry>;

/// Health-check and answer settings carried by the registry.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Settings {
    /// Time between two health-check ticks.
    pub interval: Duration,
    /// Connect and request timeout of the health-check HTTP client.
    pub timeout: Duration,
    /// TTL of every synthesized record, in seconds.
    pub ttl: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            interval: Duration::from_secs(60),
            timeout: Duration::from_secs(5),
            ttl: 300,
        }
    }
}

/// Proof that the caller holds the registry's membership lock.
pub struct MembershipGuard<'a>(#[allow(dead_code)] MutexGuard<'a, ()>);

#[derive(Debug, Default)]
pub struct Registry {
    peers: RwLock<Vec<Peer>>,
    cursor: AtomicUsize,
    membership: Mutex<()>,
    settings: Settings,
}

impl Registry {
    pub fn new(settings: Settings) -> Self {
        Registry {
            settings,
            ..Registry::default()
        }
    }

    /// Builds a registry pre-populated with `peers`, in order.
    pub fn with_peers(settings: Settings, peers: Vec<Peer>) -> Self {
        Registry {
            peers: RwLock::new(peers),
            ..Registry::new(settings)
        }
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    /// Appends a peer. Hosts are not checked for duplicates, see [`Registry::try_add`].
    pub async fn add(&self, peer: Peer) {
        let _membership = self.membership.lock().await;
        self.peers.write().await.push(peer);
    }

    /// Appends a peer unless a peer with the same host is already registered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicatePeer`] if the host is already registered.
    pub async fn try_add(&self, peer: Peer) -> Result<(), Error> {
        let _membership = self.membership.lock().await;
        let mut peers = self.peers.write().await;
        if peers.iter().any(|p| p.host == peer.host) {
            return Err(Error::DuplicatePeer(peer.host));
        }
        peers.push(peer);
        Ok(())
    }

    /// Removes every peer whose host is exactly `host`. Returns whether any peer was removed.
    pub async fn remove(&self, host: &str) -> bool {
        let _membership = self.membership.lock().await;
        let mut peers = self.peers.write().await;
        let before = peers.len();
        peers.retain(|p| p.host != host);
        peers.len() != before
    }

    pub async fn contains(&self, host: &str) -> bool {
        self.peers.read().await.iter().any(|p| p.host == host)
    }

    /// A copy of every registered peer, in registry order.
    pub async fn peers(&self) -> Vec<Peer> {
        self.peers.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.peers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.peers.read().await.is_empty()
    }

    /// Peers to advertise for the next answer, rotated by the shared round-robin cursor.
    ///
    /// Healthy primaries are preferred, then healthy secondaries. If no peer is healthy every
    /// registered peer is returned. Each call advances the cursor by one position within the
    /// candidate set; an empty registry yields an empty list and leaves the cursor alone.
    pub async fn select_healthy(&self) -> Vec<Peer> {
        let peers = self.peers.read().await;
        let candidates = select::candidates(&peers);
        if candidates.is_empty() {
            return Vec::new();
        }
        let offset = self.advance_cursor(candidates.len());
        select::rotate(&candidates, offset)
            .into_iter()
            .cloned()
            .collect()
    }

    fn advance_cursor(&self, len: usize) -> usize {
        let mut offset = 0;
        // NB: the closure always returns `Some`, so the update can't fail.
        let _ = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cursor| {
                let (current, next) = select::advance(cursor, len);
                offset = current;
                Some(next)
            });
        offset
    }

    /// Blocks membership changes until the returned guard is dropped.
    pub(crate) async fn lock_membership(&self) -> MembershipGuard<'_> {
        MembershipGuard(self.membership.lock().await)
    }

    /// Stores one health verdict per peer, in registry order, in a single write. Returns the
    /// peers whose state changed, with their new state applied.
    ///
    /// Verdicts are matched to peers by position, which is stable while the membership guard
    /// is held. Extra verdicts are ignored.
    pub(crate) async fn commit_health(
        &self,
        _membership: &MembershipGuard<'_>,
        verdicts: &[bool],
    ) -> Vec<Peer> {
        let mut peers = self.peers.write().await;
        let mut changed = Vec::new();
        for (peer, &healthy) in peers.iter_mut().zip(verdicts) {
            if peer.healthy != healthy {
                peer.healthy = healthy;
                changed.push(peer.clone());
            }
        }
        changed
    }
}
