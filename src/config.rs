use crate::dns::zones::Zones;
use crate::error::Error;
use crate::peer::{Peer, Protocol, Role, DEFAULT_PATH, DEFAULT_PORT};
use crate::registry::Settings;
use ipnetwork::IpNetwork;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use std::collections::{BTreeSet, HashSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use trust_dns_server::client::rr::Name;

pub type Shared = Arc<Config>;

/// Largest accepted answer TTL, in seconds.
pub const MAX_TTL: u32 = 3600;

/// How selected peers are rendered into a DNS answer.
#[derive(Deserialize, Debug, Clone, Copy, Default, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum AnswerStyle {
    /// NS records for the query's subdomain plus A/AAAA glue for each peer.
    #[default]
    Delegation,
    /// One CNAME per peer, pointing the query at the peer's subdomain.
    Cname,
}

#[serde_as]
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub zones: Vec<String>,
    #[serde(default)]
    pub fallthrough: Vec<String>,
    #[serde(default = "default_ttl")]
    pub ttl: u32,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_interval")]
    pub interval: Duration,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_timeout")]
    pub timeout: Duration,
    #[serde(default)]
    pub answer: AnswerStyle,
    pub dns_udp_bind_addr: SocketAddr,
    pub dns_tcp_bind_addr: SocketAddr,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub dns_tcp_timeout: Duration,
    pub api_bind_addr: SocketAddr,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub api_timeout: Duration,
    #[serde(default)]
    pub metrics_bind_addr: Option<SocketAddr>,
    #[serde(default)]
    pub peers: Vec<PeerConfig>,
}

/// A peer as written in the config file, or `POST`ed to the [`/peers` API
/// endpoint][crate::api#peers-post].
#[derive(Deserialize, Serialize, Debug, Clone, Eq, PartialEq)]
pub struct PeerConfig {
    pub host: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub ipv4: Option<Ipv4Addr>,
    #[serde(default)]
    pub ipv6: Option<Ipv6Addr>,
    #[serde(default)]
    pub labels: BTreeSet<String>,
}

fn default_ttl() -> u32 {
    300
}

fn default_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_path() -> String {
    DEFAULT_PATH.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

lazy_static! {
    // NOTE(XXX): Once the "ip" feature has stabilized we can use Ipv6Addr.is_unique_local[0].
    //            Presently this feature is unstable so we home-roll. See also RFC 4193[1].
    // [0]: https://doc.rust-lang.org/std/net/struct.Ipv6Addr.html#method.is_unique_local
    // [1]: https://www.rfc-editor.org/rfc/rfc4193.html
    static ref IPV6_UNIQUE_LOCAL_NETWORK: IpNetwork = IpNetwork::from_str("fc00::/7").unwrap();
}

/// Parse `name` as a domain name and return it lower-cased and fully qualified.
///
/// # Errors
///
/// Returns [`Error::InvalidName`] for empty or malformed names.
pub fn normalize_fqdn(name: &str) -> Result<String, Error> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidName(name.to_string()));
    }
    let mut parsed =
        Name::from_ascii(trimmed).map_err(|_| Error::InvalidName(name.to_string()))?;
    parsed.set_fqdn(true);
    Ok(parsed.to_ascii().to_ascii_lowercase())
}

impl Config {
    /// Load and validate a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IO`] if the file can't be read, [`Error::InvalidJSON`] if it can't be
    /// parsed, or any of the validation errors of [`Config::try_from_reader`].
    pub fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let f = File::open(p)?;
        Self::try_from_reader(BufReader::new(f))
    }

    /// Parse, normalize and validate a JSON config.
    ///
    /// Zone, fallthrough and peer names are lower-cased and made fully qualified, and peer
    /// paths get a leading `/`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidJSON`], [`Error::NoZones`], [`Error::InvalidName`],
    /// [`Error::InvalidTtl`], [`Error::InvalidInterval`], [`Error::InvalidTimeout`],
    /// [`Error::DuplicatePeer`] or [`Error::InsecureAPIBind`].
    pub fn try_from_reader(reader: impl Read) -> Result<Self, Error> {
        let conf: Config = serde_json::from_reader(reader)?;
        conf.normalized()
    }

    fn normalized(mut self) -> Result<Self, Error> {
        if self.zones.is_empty() {
            return Err(Error::NoZones);
        }
        self.zones = self
            .zones
            .iter()
            .map(|z| normalize_fqdn(z))
            .collect::<Result<_, _>>()?;
        self.fallthrough = self
            .fallthrough
            .iter()
            .map(|z| normalize_fqdn(z))
            .collect::<Result<_, _>>()?;

        if self.ttl > MAX_TTL {
            return Err(Error::InvalidTtl(self.ttl));
        }
        if self.interval.is_zero() {
            return Err(Error::InvalidInterval);
        }
        if self.timeout.is_zero() {
            return Err(Error::InvalidTimeout);
        }

        let mut seen = HashSet::new();
        for peer in &mut self.peers {
            peer.normalize()?;
            if !seen.insert(peer.host.clone()) {
                return Err(Error::DuplicatePeer(peer.host.clone()));
            }
        }

        self.bind_addr_is_secure()?;
        Ok(self)
    }

    pub fn settings(&self) -> Settings {
        Settings {
            interval: self.interval,
            timeout: self.timeout,
            ttl: self.ttl,
        }
    }

    /// The configured zones and fallthrough zones as DNS names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] for a malformed name.
    pub fn zones(&self) -> Result<Zones, Error> {
        Zones::parse(&self.zones, &self.fallthrough)
    }

    /// The configured peers, in order, all starting out unhealthy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] for a malformed peer host.
    pub fn peers(&self) -> Result<Vec<Peer>, Error> {
        self.peers.iter().cloned().map(Peer::try_from).collect()
    }

    fn bind_addr_is_secure(&self) -> Result<(), Error> {
        match self.api_bind_addr {
            SocketAddr::V4(v4_addr) => {
                let ip = v4_addr.ip();
                if !ip.is_loopback() && !ip.is_private() {
                    return Err(Error::InsecureAPIBind(IpAddr::V4(*ip)));
                }
                Ok(())
            }
            SocketAddr::V6(v6_addr) => {
                let ip = v6_addr.ip();
                if !ip.is_loopback() && !IPV6_UNIQUE_LOCAL_NETWORK.contains(IpAddr::V6(*ip)) {
                    return Err(Error::InsecureAPIBind(IpAddr::V6(*ip)));
                }
                Ok(())
            }
        }
    }
}

impl PeerConfig {
    fn normalize(&mut self) -> Result<(), Error> {
        self.host = normalize_fqdn(&self.host)?;
        if !self.path.starts_with('/') {
            self.path.insert(0, '/');
        }
        Ok(())
    }
}

impl TryFrom<PeerConfig> for Peer {
    type Error = Error;

    fn try_from(mut conf: PeerConfig) -> Result<Self, Self::Error> {
        conf.normalize()?;
        let mut peer = Peer::new(conf.host)
            .with_role(conf.role)
            .with_protocol(conf.protocol)
            .with_path(conf.path)
            .with_port(conf.port)
            .with_labels(conf.labels);
        peer.ipv4 = conf.ipv4;
        peer.ipv6 = conf.ipv6;
        Ok(peer)
    }
}
