use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{Service, ServiceError};
use crate::lifecycle;

/// Live tunnel as seen by `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelStatus {
    pub id: u64,
    pub iface: String,
    pub upload: u64,
    pub download: u64,
}

impl Service {
    /// Reports the recorded tunnel if it is up. Never mutates state.
    #[instrument(skip(self))]
    pub async fn status(&self) -> Result<Option<TunnelStatus>, ServiceError> {
        let shared = self.shared.lock().await;
        let tunnel = &*shared.tunnel;

        let status = shared.store.load().await.map_err(ServiceError::LoadStatus)?;
        let Some(iface) = status.iface() else {
            return Ok(None);
        };
        if !lifecycle::is_up(tunnel, iface).await? {
            return Ok(None);
        }

        let (upload, download) = tunnel.transfer(iface).await.map_err(ServiceError::Transfer)?;

        Ok(Some(TunnelStatus {
            id: status.id,
            iface: iface.to_owned(),
            upload,
            download,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        lifecycle::Hook,
        service::Operation,
        status::{ServiceStatus, StatusStore},
        testing::{connect_request, service, MockTunnel},
        traits::Tunnel,
    };
    use tempfile::TempDir;

    #[tokio::test]
    async fn empty_when_nothing_recorded() {
        let dir = TempDir::new().unwrap();
        let svc = service(dir.path(), &MockTunnel::default());

        assert_eq!(svc.status().await.unwrap(), None);
    }

    #[tokio::test]
    async fn reports_what_connect_persisted() {
        let dir = TempDir::new().unwrap();
        let tunnel = MockTunnel::default();
        let svc = service(dir.path(), &tunnel);
        svc.connect(connect_request(77)).await.unwrap();

        let first = svc.status().await.unwrap().unwrap();
        let second = svc.status().await.unwrap().unwrap();

        assert_eq!(first.id, 77);
        assert_eq!(first.iface, "wg99");
        assert!(second.upload >= first.upload);
        assert!(second.download >= first.download);
    }

    #[tokio::test]
    async fn survives_restart() {
        let dir = TempDir::new().unwrap();
        let tunnel = MockTunnel::default();
        service(dir.path(), &tunnel)
            .connect(connect_request(8))
            .await
            .unwrap();

        let restarted = service(dir.path(), &tunnel);
        let status = restarted.status().await.unwrap().unwrap();

        assert_eq!((status.id, status.iface.as_str()), (8, "wg99"));
    }

    #[tokio::test]
    async fn stale_record_reports_nothing_and_is_kept() {
        let dir = TempDir::new().unwrap();
        let store = StatusStore::in_home(dir.path());
        store.save(&ServiceStatus::new(4, "wg99")).await.unwrap();
        let tunnel = MockTunnel::default();

        assert_eq!(service(dir.path(), &tunnel).status().await.unwrap(), None);
        assert_eq!(store.load().await.unwrap(), ServiceStatus::new(4, "wg99"));
        assert!(!tunnel.calls().contains(&Hook::Down));
    }

    #[tokio::test]
    async fn failed_liveness_check_is_reported() {
        let dir = TempDir::new().unwrap();
        let tunnel = MockTunnel::default();
        let svc = service(dir.path(), &tunnel);
        svc.connect(connect_request(2)).await.unwrap();
        let before = std::fs::read(dir.path().join("status.json")).unwrap();

        tunnel.break_probe();
        let err = svc.status().await.unwrap_err();

        assert_eq!(err.code(Operation::Status), 1003);
        assert_eq!(std::fs::read(dir.path().join("status.json")).unwrap(), before);
    }

    #[tokio::test]
    async fn failed_counter_read_is_reported() {
        let dir = TempDir::new().unwrap();
        let tunnel = MockTunnel::default();
        let svc = service(dir.path(), &tunnel);
        svc.connect(connect_request(3)).await.unwrap();
        let before = std::fs::read(dir.path().join("status.json")).unwrap();

        tunnel.break_transfer();
        let err = svc.status().await.unwrap_err();

        assert_eq!(err.code(Operation::Status), 1002);
        assert!(err.to_string().contains("counters of wg99 exploded"));
        assert_eq!(std::fs::read(dir.path().join("status.json")).unwrap(), before);
        assert!(tunnel.is_up("wg99").await.unwrap());
    }
}
