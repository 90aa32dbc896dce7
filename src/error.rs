//! Error types.

use axum::extract::rejection::JsonRejection;
use std::net::IpAddr;
use trust_dns_server::proto::error::ProtoError;

/// Error enumerates the possible zonecrab error states.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Returned when a zone, fallthrough zone or peer host isn't a valid domain name.
    #[error("invalid domain name \"{0}\"")]
    InvalidName(String),

    /// Returned when the configured answer TTL is outside of `0..=3600` seconds.
    #[error("ttl must be in range [0, 3600]: {0}")]
    InvalidTtl(u32),

    /// Returned when the configured health-check interval is zero.
    #[error("health-check interval must be greater than zero")]
    InvalidInterval,

    /// Returned when the configured per-probe timeout is zero.
    #[error("health-check timeout must be greater than zero")]
    InvalidTimeout,

    /// Returned when the configuration doesn't name any zone to answer for.
    #[error("at least one zone must be configured")]
    NoZones,

    /// Returned when a peer host is registered twice, either in the
    /// [`Config::peers`][`crate::config::Config::peers`] list or through the
    /// [`/peers` API endpoint][crate::api#peers-post].
    #[error("peer \"{0}\" is already registered")]
    DuplicatePeer(String),

    /// Returned when clients `DELETE` a peer through the [`/peers/:host` API
    /// endpoint][crate::api#peershost-delete] that isn't in the registry.
    #[error("peer \"{0}\" is not registered")]
    UnknownPeer(String),

    /// Returned when clients `POST` invalid JSON.
    #[error(transparent)]
    JsonExtractorRejection(#[from] JsonRejection),

    /// Returned when the [`Config::api_bind_addr`][`crate::config::Config::api_bind_addr`] is
    /// not a loopback address, or an address within a private network space. The admin API can
    /// add and remove peers and is only meant to be reachable from private networks.
    #[error("API bind address ({0}) must be a loopback or private IP")]
    InsecureAPIBind(IpAddr),

    /// Returned when the HTTP client used for peer health checks can't be built.
    #[error("failed to build health-check HTTP client")]
    HttpClient(#[from] reqwest::Error),

    /// Returned when a generic IO error occurs, e.g. when a DNS response can't be written.
    #[error("an IO error occurred")]
    IO(#[from] std::io::Error),

    /// Returned when the configuration file contains invalid JSON content.
    #[error("invalid JSON")]
    InvalidJSON(#[from] serde_json::Error),

    /// Returned when the DNS server encounters a generic DNS protocol error.
    #[error("DNS error")]
    DNSError(#[from] ProtoError),
}
