//! Peer selection policy.
//!
//! Healthy primaries win over healthy secondaries. When no peer is healthy every registered
//! peer is a candidate, so queries still get an answer (fail-open). The candidate list is then
//! rotated by the registry-wide round-robin cursor.

use crate::peer::{Peer, Role};

/// Candidate peers for an answer, in registry order.
pub(crate) fn candidates(peers: &[Peer]) -> Vec<&Peer> {
    let healthy = |role: Role| -> Vec<&Peer> {
        peers
            .iter()
            .filter(|p| p.healthy && p.role == role)
            .collect()
    };

    let primaries = healthy(Role::Primary);
    if !primaries.is_empty() {
        return primaries;
    }
    let secondaries = healthy(Role::Secondary);
    if !secondaries.is_empty() {
        return secondaries;
    }
    peers.iter().collect()
}

/// Returns `items[offset..] ++ items[..offset]`. Offsets past the end rotate by zero.
pub(crate) fn rotate<T: Clone>(items: &[T], offset: usize) -> Vec<T> {
    let offset = if offset >= items.len() { 0 } else { offset };
    let (head, tail) = items.split_at(offset);
    tail.iter().chain(head).cloned().collect()
}

/// Given the stored cursor and the candidate count, returns the offset to rotate by and the
/// cursor value to store afterwards. `len` must be non-zero.
pub(crate) fn advance(cursor: usize, len: usize) -> (usize, usize) {
    let offset = if cursor >= len { 0 } else { cursor };
    (offset, (offset + 1) % len)
}
