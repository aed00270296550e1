pub mod connect;
mod disconnect;
pub mod error;
pub mod keys;
mod report;

use std::{net::IpAddr, path::Path, sync::Arc};

use tokio::sync::Mutex;

use clap::Parser;
pub use connect::*;
pub use error::*;
pub use report::*;
use tracing::{debug, instrument};

use crate::{
    netlink::error::NetlinkError,
    status::StatusStore,
    traits::Tunnel,
    wg_quick::{Scripts, WgQuick},
    wireguard::DEFAULT_INTERFACE,
};

struct Shared {
    store: StatusStore,
    tunnel: Arc<dyn Tunnel>,
}

#[derive(Debug, Parser)]
pub struct Config {
    #[clap(short, long, env = "DVPN_INTERFACE", default_value = DEFAULT_INTERFACE, value_parser)]
    interface: String,
    #[clap(long, env = "DVPN_LOCAL_RESOLVER", default_value = "10.8.0.1", value_parser)]
    local_resolver: IpAddr,
    #[clap(flatten)]
    scripts: Scripts,
}

/// The tunnel control surface. Every operation holds the shared lock for
/// its whole load, probe, mutate sequence, hooks included.
#[derive(Clone)]
pub struct Service {
    shared: Arc<Mutex<Shared>>,

    interface: String,
    local_resolver: IpAddr,
}

impl Service {
    #[instrument(skip(config))]
    pub fn new(config: Config, home: &Path) -> Result<Self, NetlinkError> {
        let tunnel = WgQuick::new(home, config.scripts)?;
        let store = StatusStore::in_home(home);
        debug!(path = %store.path().display(), "status store");

        Ok(Self::with_tunnel(
            store,
            Arc::new(tunnel),
            config.interface,
            config.local_resolver,
        ))
    }

    pub fn with_tunnel(
        store: StatusStore,
        tunnel: Arc<dyn Tunnel>,
        interface: String,
        local_resolver: IpAddr,
    ) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared { store, tunnel })),
            interface,
            local_resolver,
        }
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }
}
