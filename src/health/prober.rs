//! HTTP health checks.

use crate::error::Error;
use crate::health::HealthProbe;
use crate::peer::Peer;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::debug;

/// Deadline shared by all requests of one probe, independent of the client timeout.
pub const PROBE_DEADLINE: Duration = Duration::from_millis(500);

/// Probes `GET {protocol}://{address}:{port}{path}` on every address of a peer at once.
///
/// The peer is healthy as soon as any address answers `200 OK` within [`PROBE_DEADLINE`].
/// Errors, other statuses and the deadline elapsing all count as unhealthy.
#[derive(Debug, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct HttpProber {
    client: Client,
    deadline: Duration,
}

impl HttpProber {
    /// Build a prober whose HTTP client uses `timeout` for connecting and for whole requests.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HttpClient`] if the TLS backend can't be initialized.
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;
        Ok(HttpProber {
            client,
            deadline: PROBE_DEADLINE,
        })
    }

    async fn check(client: Client, host: String, url: String) -> bool {
        match client.get(&url).send().await {
            Ok(resp) if resp.status() == StatusCode::OK => {
                debug!(%host, %url, "health check passed");
                true
            }
            Ok(resp) => {
                debug!(%host, %url, status = %resp.status(), "health check failed");
                false
            }
            Err(err) => {
                debug!(%host, %url, error = %err, "health check failed");
                false
            }
        }
    }
}

#[async_trait::async_trait]
impl HealthProbe for HttpProber {
    async fn probe(&self, peer: &Peer) -> bool {
        let urls = peer.health_urls();
        if urls.is_empty() {
            debug!(host = %peer.host, "peer has no address to check");
            return false;
        }

        let mut requests = JoinSet::new();
        for url in urls {
            requests.spawn(Self::check(self.client.clone(), peer.host.clone(), url));
        }
        let any_ok = async {
            while let Some(res) = requests.join_next().await {
                if matches!(res, Ok(true)) {
                    return true;
                }
            }
            false
        };

        // Dropping the join set aborts requests still in flight.
        if let Ok(healthy) = tokio::time::timeout(self.deadline, any_ok).await {
            healthy
        } else {
            debug!(host = %peer.host, deadline = ?self.deadline, "health check deadline elapsed");
            false
        }
    }
}
