use crate::api::api_error::APIError;
use crate::api::model::RemovePeerResult;
use crate::api::server::AppState;
use crate::config::{normalize_fqdn, PeerConfig};
use crate::error::Error;
use crate::peer::Peer;
use axum::extract::{ConnectInfo, Path, State};
use axum::response::IntoResponse;
use axum::routing::{delete, get};
use axum::{Json, Router};
use axum_extra::extract::WithRejection;
use serde_json::json;
use std::net::SocketAddr;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub(super) fn new(state: AppState) -> Router {
    Router::new()
        .route("/healthcheck", get(health_check))
        .route("/peers", get(list_peers).post(add_peer))
        .route("/peers/:host", delete(remove_peer))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(state.config.api_timeout))
        .with_state(state)
}

#[allow(clippy::unused_async)]
async fn health_check() -> impl IntoResponse {
    Json(json!({"ok":"healthy"}))
}

async fn list_peers(State(state): State<AppState>) -> Json<Vec<Peer>> {
    Json(state.registry.peers().await)
}

async fn add_peer(
    State(state): State<AppState>,
    ConnectInfo(client_addr): ConnectInfo<SocketAddr>,
    WithRejection(Json(payload), _): WithRejection<Json<PeerConfig>, APIError>,
) -> Result<Json<Peer>, APIError> {
    let client_addr = client_addr.ip();
    let peer = Peer::try_from(payload)?;

    if let Err(err) = state.registry.try_add(peer.clone()).await {
        tracing::debug!("rejected peer \"{}\" from {client_addr}: {err}", peer.host);
        return Err(err.into());
    }
    tracing::info!(
        "added {} peer \"{}\" from {client_addr}",
        peer.role,
        peer.host
    );
    Ok(Json(peer))
}

async fn remove_peer(
    State(state): State<AppState>,
    ConnectInfo(client_addr): ConnectInfo<SocketAddr>,
    Path(host): Path<String>,
) -> Result<Json<RemovePeerResult>, APIError> {
    let client_addr = client_addr.ip();
    let host = normalize_fqdn(&host)?;

    if !state.registry.remove(&host).await {
        return Err(Error::UnknownPeer(host).into());
    }
    tracing::info!("removed peer \"{host}\" from {client_addr}");
    Ok(Json(RemovePeerResult { removed: host }))
}
