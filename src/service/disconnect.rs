use tracing::{debug, info, instrument};

use super::{Service, ServiceError};
use crate::{lifecycle, status::StatusError};

impl Service {
    /// Tears down the recorded interface if it is up, then clears the
    /// record. A no-op when nothing is active.
    #[instrument(skip(self))]
    pub async fn disconnect(&self) -> Result<(), ServiceError> {
        let shared = self.shared.lock().await;

        let status = shared.store.load().await.map_err(ServiceError::LoadStatus)?;
        if let Some(iface) = status.iface() {
            match lifecycle::bring_down(&*shared.tunnel, iface).await {
                Ok(Some(steps)) => {
                    debug!(?steps, committed = lifecycle::committed(&steps), "down sequence done");
                    info!(iface, "tunnel is down");
                }
                Ok(None) => {}
                Err(e) => {
                    debug!(steps = ?e.steps(), committed = lifecycle::committed(e.steps()), "down sequence aborted");
                    return Err(e.into());
                }
            }
        }

        match shared.store.remove().await {
            Ok(()) => Ok(()),
            Err(StatusError::NotFound(path)) => {
                debug!(path = %path.display(), "no status to remove");
                Ok(())
            }
            Err(e) => Err(ServiceError::RemoveStatus(e)),
        }
    }
}
