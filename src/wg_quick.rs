//! `wg-quick` backed tunnel.
//!
//! Bring-up and tear-down shell out to `wg-quick`, which also takes care of
//! routes and resolvers. Liveness and counters are read over netlink.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    process::Stdio,
};

use async_trait::async_trait;
use clap::Parser;
use tokio::{fs, io::AsyncWriteExt, process::Command, sync::Mutex};
use tracing::{debug, error, info, instrument};

use crate::{
    netlink::{error::NetlinkError, Netlink},
    traits::{Tunnel, TunnelError},
    wireguard::InterfaceConfig,
};

/// Optional user commands wrapped around the wg-quick calls. Each runs
/// through `/bin/sh -c` with `DVPN_INTERFACE` set.
#[derive(Debug, Clone, Default, Parser)]
pub struct Scripts {
    #[clap(long, env = "DVPN_PRE_UP", value_parser)]
    pub pre_up: Option<String>,
    #[clap(long, env = "DVPN_POST_UP", value_parser)]
    pub post_up: Option<String>,
    #[clap(long, env = "DVPN_PRE_DOWN", value_parser)]
    pub pre_down: Option<String>,
    #[clap(long, env = "DVPN_POST_DOWN", value_parser)]
    pub post_down: Option<String>,
}

pub struct WgQuick {
    home: PathBuf,
    scripts: Scripts,
    netlink: Mutex<Netlink>,
}

async fn run_command(program: &str, args: &[&str], iface: &str) -> Result<(), TunnelError> {
    let command = format!("{} {}", program, args.join(" "));
    debug!(%command, "running command");

    let output = Command::new(program)
        .args(args)
        .env("DVPN_INTERFACE", iface)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
        let code = output.status.code().unwrap_or(-1);
        error!(%command, code, %stderr, "command failed");

        return Err(TunnelError::Command {
            command,
            code,
            stderr,
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        debug!(output = %stdout.trim(), "command output");
    }

    Ok(())
}

async fn run_script(script: Option<&str>, iface: &str) -> Result<(), TunnelError> {
    match script {
        Some(script) => run_command("/bin/sh", &["-c", script], iface).await,
        None => Ok(()),
    }
}

impl WgQuick {
    pub fn new(home: impl Into<PathBuf>, scripts: Scripts) -> Result<Self, NetlinkError> {
        Ok(Self {
            home: home.into(),
            scripts,
            netlink: Mutex::new(Netlink::new()?),
        })
    }

    pub fn config_path(&self, name: &str) -> PathBuf {
        self.home.join(format!("{name}.conf"))
    }

    fn path_arg(path: &Path) -> Result<&str, TunnelError> {
        path.to_str()
            .ok_or_else(|| TunnelError::Other(format!("non utf-8 path {}", path.display())))
    }

    async fn write_config(&self, config: &InterfaceConfig) -> Result<(), TunnelError> {
        fs::create_dir_all(&self.home).await?;

        let path = self.config_path(&config.name);
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&path).await?;
        file.write_all(config.to_wg_quick().as_bytes()).await?;
        file.sync_all().await?;

        info!(path = %path.display(), "wrote interface config");
        Ok(())
    }
}

#[async_trait]
impl Tunnel for WgQuick {
    async fn is_up(&self, name: &str) -> Result<bool, TunnelError> {
        Ok(self.netlink.lock().await.link_up(name)?)
    }

    #[instrument(skip_all, fields(iface = %config.name))]
    async fn pre_up(&self, config: &InterfaceConfig) -> Result<(), TunnelError> {
        run_script(self.scripts.pre_up.as_deref(), &config.name).await?;
        self.write_config(config).await
    }

    #[instrument(skip_all, fields(iface = %config.name))]
    async fn up(&self, config: &InterfaceConfig) -> Result<(), TunnelError> {
        let path = self.config_path(&config.name);
        run_command("wg-quick", &["up", Self::path_arg(&path)?], &config.name).await
    }

    #[instrument(skip_all, fields(iface = %config.name))]
    async fn post_up(&self, config: &InterfaceConfig) -> Result<(), TunnelError> {
        run_script(self.scripts.post_up.as_deref(), &config.name).await
    }

    #[instrument(skip(self))]
    async fn pre_down(&self, name: &str) -> Result<(), TunnelError> {
        run_script(self.scripts.pre_down.as_deref(), name).await
    }

    #[instrument(skip(self))]
    async fn down(&self, name: &str) -> Result<(), TunnelError> {
        let path = self.config_path(name);
        run_command("wg-quick", &["down", Self::path_arg(&path)?], name).await
    }

    #[instrument(skip(self))]
    async fn post_down(&self, name: &str) -> Result<(), TunnelError> {
        match fs::remove_file(self.config_path(name)).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        run_script(self.scripts.post_down.as_deref(), name).await
    }

    async fn transfer(&self, name: &str) -> Result<(u64, u64), TunnelError> {
        let device = self
            .netlink
            .lock()
            .await
            .wg_device(name)
            .await
            .map_err(|e| match e {
                NetlinkError::NotFound => TunnelError::NotUp(name.to_owned()),
                e => e.into(),
            })?;
        debug!(
            iface = %device.name,
            listen_port = device.listen_port,
            peers = device.peers.len(),
            "read device counters"
        );

        Ok(device.transfer())
    }
}
