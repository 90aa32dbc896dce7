//! Peers advertised in DNS answers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Default health-check port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default health-check path.
pub const DEFAULT_PATH: &str = "/health";

/// The preference class of a peer. Healthy primaries are always answered ahead of secondaries.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, Hash, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Primary,
    Secondary,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Primary => "primary",
            Role::Secondary => "secondary",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scheme used to reach a peer's health endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

impl Protocol {
    pub fn scheme(self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

/// A remote node advertised for the configured zones.
///
/// `host` is a lower-cased FQDN (trailing dot included) and identifies the peer within a
/// [`Registry`][crate::registry::Registry]. The `healthy` flag starts out `false` and is only
/// changed by the [`HealthMonitor`][crate::health::HealthMonitor].
#[derive(Serialize, Debug, Clone, Eq, PartialEq)]
pub struct Peer {
    pub host: String,
    pub role: Role,
    pub protocol: Protocol,
    pub path: String,
    pub port: u16,
    pub ipv4: Option<Ipv4Addr>,
    pub ipv6: Option<Ipv6Addr>,
    pub healthy: bool,
    pub labels: BTreeSet<String>,
}

impl Peer {
    pub fn new(host: impl Into<String>) -> Self {
        Peer {
            host: host.into(),
            role: Role::default(),
            protocol: Protocol::default(),
            path: DEFAULT_PATH.to_string(),
            port: DEFAULT_PORT,
            ipv4: None,
            ipv6: None,
            healthy: false,
            labels: BTreeSet::default(),
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    #[must_use]
    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_ipv4(mut self, ipv4: Ipv4Addr) -> Self {
        self.ipv4 = Some(ipv4);
        self
    }

    #[must_use]
    pub fn with_ipv6(mut self, ipv6: Ipv6Addr) -> Self {
        self.ipv6 = Some(ipv6);
        self
    }

    #[must_use]
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_healthy(mut self, healthy: bool) -> Self {
        self.healthy = healthy;
        self
    }

    /// Health-check URLs for every address the peer has, IPv6 first.
    ///
    /// A peer without addresses yields no URLs and can never be probed healthy.
    pub fn health_urls(&self) -> Vec<String> {
        let scheme = self.protocol.scheme();
        let mut urls = Vec::with_capacity(2);
        if let Some(ipv6) = self.ipv6 {
            urls.push(format!("{scheme}://[{ipv6}]:{}{}", self.port, self.path));
        }
        if let Some(ipv4) = self.ipv4 {
            urls.push(format!("{scheme}://{ipv4}:{}{}", self.port, self.path));
        }
        urls
    }
}
