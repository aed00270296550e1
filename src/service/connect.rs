use std::net::IpAddr;

use tracing::{debug, info, instrument, warn};

use super::{keys::PrivateKey, Service, ServiceError};
use crate::{
    lifecycle,
    session::{SessionInfo, SESSION_INFO_LEN},
    status::ServiceStatus,
    wireguard::InterfaceConfig,
};

pub struct ConnectRequest {
    pub id: u64,
    pub info: Vec<u8>,
    pub keys: Vec<Vec<u8>>,
    pub resolvers: Vec<IpAddr>,
}

impl ConnectRequest {
    /// Checks the request shape and returns the local private key.
    pub fn validate(&self) -> Result<PrivateKey, ServiceError> {
        if self.info.len() != SESSION_INFO_LEN {
            return Err(ServiceError::Validation(format!(
                "info must be {} bytes, got {}",
                SESSION_INFO_LEN,
                self.info.len()
            )));
        }

        let [key] = self.keys.as_slice() else {
            return Err(ServiceError::Validation(format!(
                "expected exactly one key, got {}",
                self.keys.len()
            )));
        };

        PrivateKey::from_bytes(key).map_err(|e| ServiceError::Validation(e.to_string()))
    }
}

impl std::fmt::Debug for ConnectRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectRequest")
            .field("id", &self.id)
            .field("info_len", &self.info.len())
            .field("resolvers", &self.resolvers)
            .finish_non_exhaustive()
    }
}

impl Service {
    #[instrument(skip(self))]
    pub async fn connect(&self, req: ConnectRequest) -> Result<(), ServiceError> {
        let private_key = req.validate()?;

        let shared = self.shared.lock().await;
        let tunnel = &*shared.tunnel;

        let status = shared.store.load().await.map_err(ServiceError::LoadStatus)?;
        if let Some(iface) = status.iface() {
            if lifecycle::is_up(tunnel, iface).await? {
                return Err(ServiceError::AlreadyConnected(iface.to_owned()));
            }
            // TODO: delete leftover OS artifacts of the stale interface once the
            // tunnel trait can enumerate them; wg-quick currently overwrites them.
            warn!(iface, id = status.id, "recorded interface is not up, replacing stale status");
        }

        let info = SessionInfo::decode(&req.info)?;
        let config = InterfaceConfig::build(
            &self.interface,
            &info,
            private_key,
            self.local_resolver,
            &req.resolvers,
        )?;

        shared
            .store
            .save(&ServiceStatus::new(req.id, &config.name))
            .await
            .map_err(ServiceError::SaveStatus)?;

        match lifecycle::bring_up(tunnel, &config).await {
            Ok(steps) => debug!(?steps, committed = lifecycle::committed(&steps), "up sequence done"),
            Err(e) => {
                debug!(steps = ?e.steps(), committed = lifecycle::committed(e.steps()), "up sequence aborted");
                return Err(e.into());
            }
        }
        info!(iface = %config.name, endpoint = %info.endpoint, "tunnel is up");

        Ok(())
    }
}
