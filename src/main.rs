use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zonecrab::error::Error::DNSError;
use zonecrab::{Config, HealthMonitor, HttpProber, Registry, Shared};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_init();

    let mut first_args = std::env::args().take(2);
    let (program_name, config_file) = (
        first_args.next().unwrap_or("zonecrab".to_string()),
        first_args.next(),
    );

    let config = config_init(&program_name, config_file)?;
    metrics_init(&config)?;

    let registry = Arc::new(Registry::with_peers(config.settings(), config.peers()?));
    tracing::info!(
        "serving {} zone(s) with {} peer(s)",
        config.zones.len(),
        registry.len().await
    );

    let prober = Arc::new(HttpProber::new(config.timeout)?);
    let monitor = HealthMonitor::new(registry.clone(), prober);
    tracing::info!("health checks every {}s", config.interval.as_secs());
    let monitor_handle = tokio::spawn(monitor.run());

    tracing::info!("DNS listening on UDP {}", &config.dns_udp_bind_addr);
    tracing::info!("DNS listening on TCP {}", &config.dns_tcp_bind_addr);
    let dns_server =
        zonecrab::dns::new(config.clone(), registry.clone(), zonecrab::dns::Refuse).await?;
    let dns_handle = tokio::spawn(dns_server.block_until_done());

    tracing::info!("API listening on {}", &config.api_bind_addr);
    let api_server = zonecrab::api::new(config.clone(), registry.clone());
    let api_handle = tokio::spawn(api_server);

    tokio::select! {
        _ = signal::ctrl_c() => {
            tracing::info!("quitting from signal");
        },
        Ok(dns_res) = dns_handle => {
            if let Err(err) = dns_res {
                return Err(DNSError(err).into())
            }
        }
        Ok(api_res) = api_handle => {
            if let Err(err) = api_res {
                return Err(err.into())
            }
        }
        res = monitor_handle => {
            return Err(anyhow!("health monitor stopped: {res:?}"))
        }
    }
    tracing::info!("goodbye");
    Ok(())
}

fn tracing_init() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zonecrab=info".into()),
        )
        .init();
}

fn config_init(program_name: &str, config_file: Option<String>) -> Result<Shared> {
    match config_file {
        None => Err(anyhow!("usage: {program_name} /path/to/config.json")),
        Some(config_file) => {
            tracing::debug!("loaded config from {config_file}");
            let config = Config::try_from_file(&config_file)?;
            Ok(Arc::new(config))
        }
    }
}

#[cfg(feature = "prometheus")]
fn metrics_init(config: &Config) -> Result<()> {
    if let Some(addr) = config.metrics_bind_addr {
        tracing::info!("metrics listening on {addr}");
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
    }
    Ok(())
}

#[cfg(not(feature = "prometheus"))]
#[allow(clippy::unnecessary_wraps)]
fn metrics_init(config: &Config) -> Result<()> {
    if let Some(addr) = config.metrics_bind_addr {
        tracing::warn!("ignoring metrics bind address {addr}: built without prometheus support");
    }
    Ok(())
}
