use std::net::SocketAddr;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::instrument;

use super::response::{Connect, Envelope};
use crate::service::TunnelStatus;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("daemon request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("error {code}: {message}")]
    Api { code: u32, message: String },
}

/// Talks to a running daemon's control API.
pub struct ControlClient {
    http: Client,
    base_url: String,
}

async fn unwrap<T: DeserializeOwned>(resp: Response) -> Result<Option<T>, ClientError> {
    let envelope: Envelope<T> = resp.json().await?;
    match envelope.error {
        Some(e) => Err(ClientError::Api {
            code: e.code,
            message: e.message,
        }),
        None => Ok(envelope.result),
    }
}

impl ControlClient {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            http: Client::new(),
            base_url: format!("http://{addr}/service"),
        }
    }

    #[instrument(skip(self, req), fields(id = req.id))]
    pub async fn connect(&self, req: &Connect) -> Result<(), ClientError> {
        let resp = self
            .http
            .post(format!("{}/connect", self.base_url))
            .json(req)
            .send()
            .await?;
        unwrap::<()>(resp).await.map(drop)
    }

    #[instrument(skip(self))]
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        let resp = self
            .http
            .post(format!("{}/disconnect", self.base_url))
            .send()
            .await?;
        unwrap::<()>(resp).await.map(drop)
    }

    #[instrument(skip(self))]
    pub async fn status(&self) -> Result<Option<TunnelStatus>, ClientError> {
        let resp = self
            .http
            .get(format!("{}/status", self.base_url))
            .send()
            .await?;
        unwrap(resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        lifecycle::Hook,
        session::tests::sample_blob,
        testing::{service, MockTunnel},
        ui::web::api::router,
    };
    use base64::{engine::general_purpose::STANDARD, Engine};
    use tempfile::TempDir;

    async fn daemon(home: &std::path::Path, tunnel: &MockTunnel) -> ControlClient {
        let server = axum::Server::bind(&"127.0.0.1:0".parse().unwrap())
            .serve(router(service(home, tunnel)).into_make_service());
        let addr = server.local_addr();
        tokio::spawn(server);
        ControlClient::new(addr)
    }

    fn body(id: u64) -> Connect {
        Connect {
            id,
            info: STANDARD.encode(sample_blob()),
            keys: vec![STANDARD.encode([4u8; 32])],
            resolvers: vec!["9.9.9.9".parse().unwrap()],
        }
    }

    #[tokio::test]
    async fn full_cycle_over_http() {
        let dir = TempDir::new().unwrap();
        let tunnel = MockTunnel::default();
        let client = daemon(dir.path(), &tunnel).await;

        assert_eq!(client.status().await.unwrap(), None);

        client.connect(&body(11)).await.unwrap();
        let status = client.status().await.unwrap().unwrap();
        assert_eq!((status.id, status.iface.as_str()), (11, "wg99"));

        match client.connect(&body(12)).await {
            Err(ClientError::Api { code, .. }) => assert_eq!(code, 1004),
            r => panic!("unexpected {r:?}"),
        }

        client.disconnect().await.unwrap();
        client.disconnect().await.unwrap();
        assert_eq!(client.status().await.unwrap(), None);
        assert_eq!(tunnel.configured()[0].dns.len(), 2);
    }

    #[tokio::test]
    async fn hook_error_code_is_reported() {
        let dir = TempDir::new().unwrap();
        let tunnel = MockTunnel::failing(Hook::PreUp);
        let client = daemon(dir.path(), &tunnel).await;

        match client.connect(&body(1)).await {
            Err(ClientError::Api { code, message }) => {
                assert_eq!(code, 1009);
                assert!(message.contains("pre-up exploded"));
            }
            r => panic!("unexpected {r:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_rejected() {
        let dir = TempDir::new().unwrap();
        let client = daemon(dir.path(), &MockTunnel::default()).await;

        let resp = client
            .http
            .post(format!("{}/connect", client.base_url))
            .header("content-type", "application/json")
            .body("{\"id\": \"nope\"}")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 400);

        match unwrap::<()>(resp).await {
            Err(ClientError::Api { code, .. }) => assert_eq!(code, 1001),
            r => panic!("unexpected {r:?}"),
        }
    }
}
