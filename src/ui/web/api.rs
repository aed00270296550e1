use axum::{
    extract::{rejection::JsonRejection, Extension},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use std::net::SocketAddr;
use tracing::{info, warn};

use super::response::*;
use crate::service::{ConnectRequest, Operation, Service, ServiceError, TunnelStatus};

async fn connect(
    Extension(service): Extension<Service>,
    payload: Result<Json<Connect>, JsonRejection>,
) -> impl IntoResponse {
    let res = match payload {
        Ok(Json(payload)) => match ConnectRequest::try_from(payload) {
            Ok(req) => service.connect(req).await,
            Err(e) => Err(e),
        },
        Err(e) => Err(ServiceError::Malformed(e.to_string())),
    };

    Reply::<()>::from((Operation::Connect, res.map(|()| None)))
}

async fn disconnect(Extension(service): Extension<Service>) -> impl IntoResponse {
    let res = service.disconnect().await;

    Reply::<()>::from((Operation::Disconnect, res.map(|()| None)))
}

async fn status(Extension(service): Extension<Service>) -> impl IntoResponse {
    Reply::<TunnelStatus>::from((Operation::Status, service.status().await))
}

#[derive(Debug, Parser)]
pub struct Config {
    #[clap(long, short, env = "DVPN_LISTEN_ADDR", default_value = "127.0.0.1:8080", value_parser)]
    pub listen_addr: SocketAddr,
}

pub fn router(service: Service) -> Router {
    Router::new()
        .route("/service/connect", post(connect))
        .route("/service/disconnect", post(disconnect))
        .route("/service/status", get(status))
        .layer(Extension(service))
}

pub async fn start(
    listen_addr: SocketAddr,
    service: Service,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = router(service);

    info!(%listen_addr, "control api listening");
    axum::Server::bind(&listen_addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for ctrl-c: {e}");
                std::future::pending::<()>().await;
            }
            info!("shutting down control api");
        })
        .await?;
    Ok(())
}
