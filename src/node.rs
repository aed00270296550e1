//! Client for the session registration endpoint of a remote node.

use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};

use crate::{
    service::keys::PublicKey,
    session::SESSION_INFO_LEN,
};

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("node request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Remote(String),
    #[error("node returned neither a result nor an error")]
    EmptyResult,
    #[error("node result is not valid base64")]
    Encoding,
    #[error("node returned {0} bytes of session info, expected {}", SESSION_INFO_LEN)]
    ShortInfo(usize),
}

#[derive(Debug, Serialize)]
struct AddSessionRequest {
    key: String,
    signature: String,
}

#[derive(Debug, Deserialize)]
pub struct RemoteError {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub error: Option<RemoteError>,
    #[serde(default)]
    pub result: Option<String>,
}

impl Envelope {
    /// Turns the envelope into the raw session info blob.
    pub fn into_info(self) -> Result<Vec<u8>, NodeError> {
        if let Some(e) = self.error {
            return Err(NodeError::Remote(e.message));
        }

        let result = self.result.ok_or(NodeError::EmptyResult)?;
        let info = STANDARD.decode(result).map_err(|_| NodeError::Encoding)?;
        if info.len() < SESSION_INFO_LEN {
            return Err(NodeError::ShortInfo(info.len()));
        }

        Ok(info)
    }
}

pub struct NodeClient {
    http: Client,
    base_url: String,
}

impl NodeClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    pub fn session_url(&self, account: &str, session_id: u64) -> String {
        format!("{}/accounts/{}/sessions/{}", self.base_url, account, session_id)
    }

    /// Registers our tunnel key for the session and returns the info blob.
    #[instrument(skip(self, signature))]
    pub async fn add_session(
        &self,
        account: &str,
        session_id: u64,
        key: &PublicKey,
        signature: &[u8],
    ) -> Result<Vec<u8>, NodeError> {
        let url = self.session_url(account, session_id);
        let body = AddSessionRequest {
            key: key.to_base64(),
            signature: STANDARD.encode(signature),
        };

        let envelope: Envelope = self.http.post(&url).json(&body).send().await?.json().await?;
        let info = envelope.into_info()?;
        info!(%url, "session registered with node");

        Ok(info)
    }
}
