use crate::api::routes;
use crate::config::Shared;
use crate::registry::SharedRegistry;
use std::future::Future;
use std::net::SocketAddr;

#[derive(Clone)]
pub(super) struct AppState {
    pub config: Shared,
    pub registry: SharedRegistry,
}

pub fn new(
    config: Shared,
    registry: SharedRegistry,
) -> impl Future<Output = hyper::Result<()>> {
    axum::Server::bind(&config.api_bind_addr).serve(
        routes::new(AppState { config, registry })
            .into_make_service_with_connect_info::<SocketAddr>(),
    )
}
