//! zonecrab
//!
//! An authoritative DNS responder for service discovery. Queries for names within the
//! configured zones are answered with the peers that currently pass their HTTP health check,
//! primaries before secondaries, rotated round-robin across queries.
//!
//! Answers are either [delegations][crate::dns#delegation-answers] (`NS` plus `A`/`AAAA` glue)
//! or [CNAMEs][crate::dns#cname-answers]. Peers can be listed, added and removed at runtime
//! through the [admin API][crate::api].
//!
#![warn(clippy::pedantic)]

pub mod api;
pub mod config;
pub mod dns;
pub mod error;
pub mod health;
pub mod metrics;
pub mod peer;
pub mod registry;

pub use api::new as new_http;
pub use config::{Config, Shared};
pub use dns::new as new_dns;
pub use health::{HealthMonitor, HttpProber};
pub use peer::{Peer, Role};
pub use registry::{Registry, SharedRegistry};
