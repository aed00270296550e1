use async_trait::async_trait;
use thiserror::Error;

use crate::{netlink::error::NetlinkError, wireguard::InterfaceConfig};

#[derive(Debug, Error)]
pub enum TunnelError {
    #[error("interface {0} is not up")]
    NotUp(String),
    #[error("`{command}` exited with code {code}: {stderr}")]
    Command {
        command: String,
        code: i32,
        stderr: String,
    },
    #[error("tunnel io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Netlink(#[from] NetlinkError),
    #[error("{0}")]
    Other(String),
}

/// The OS-level tunnel facility the daemon configures and supervises.
///
/// Up hooks receive the full interface config; down hooks and probes only
/// need the interface name recorded in the status store.
#[async_trait]
pub trait Tunnel: Send + Sync {
    async fn is_up(&self, name: &str) -> Result<bool, TunnelError>;

    async fn pre_up(&self, config: &InterfaceConfig) -> Result<(), TunnelError>;
    async fn up(&self, config: &InterfaceConfig) -> Result<(), TunnelError>;
    async fn post_up(&self, config: &InterfaceConfig) -> Result<(), TunnelError>;

    async fn pre_down(&self, name: &str) -> Result<(), TunnelError>;
    async fn down(&self, name: &str) -> Result<(), TunnelError>;
    async fn post_down(&self, name: &str) -> Result<(), TunnelError>;

    /// Cumulative (upload, download) bytes of a live interface.
    async fn transfer(&self, name: &str) -> Result<(u64, u64), TunnelError>;
}
