use std::{
    fmt::Write,
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
};

use cidr::IpCidr;
use thiserror::Error;

use crate::{
    service::keys::{PrivateKey, PublicKey},
    session::SessionInfo,
    utils,
};

pub const DEFAULT_INTERFACE: &str = "wg99";
pub const DEFAULT_LOCAL_RESOLVER: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 8, 0, 1));
pub const PERSISTENT_KEEPALIVE: u16 = 15;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("no free udp port: {0}")]
    NoFreePort(#[source] std::io::Error),
    #[error("invalid network: {0}")]
    Network(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    pub public_key: PublicKey,
    pub allowed_ips: Vec<IpCidr>,
    pub endpoint: SocketAddr,
    pub persistent_keepalive: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceConfig {
    pub name: String,
    pub addresses: Vec<IpCidr>,
    pub listen_port: u16,
    pub private_key: PrivateKey,
    pub dns: Vec<IpAddr>,
    pub peers: Vec<Peer>,
}

fn full_tunnel() -> Result<Vec<IpCidr>, BuildError> {
    [IpAddr::V4(Ipv4Addr::UNSPECIFIED), IpAddr::V6(Ipv6Addr::UNSPECIFIED)]
        .into_iter()
        .map(|addr| IpCidr::new(addr, 0).map_err(|e| BuildError::Network(e.to_string())))
        .collect()
}

fn fmt_cidr(c: &IpCidr) -> String {
    format!("{}/{}", c.first_address(), c.network_length())
}

fn join<T>(items: &[T], f: impl Fn(&T) -> String) -> String {
    items.iter().map(f).collect::<Vec<_>>().join(", ")
}

impl InterfaceConfig {
    /// Builds the config, allocating the listen port as late as possible.
    pub fn build(
        name: &str,
        info: &SessionInfo,
        private_key: PrivateKey,
        local_resolver: IpAddr,
        resolvers: &[IpAddr],
    ) -> Result<Self, BuildError> {
        let port = utils::free_udp_port().map_err(BuildError::NoFreePort)?;
        Self::with_port(name, info, private_key, port, local_resolver, resolvers)
    }

    pub fn with_port(
        name: &str,
        info: &SessionInfo,
        private_key: PrivateKey,
        listen_port: u16,
        local_resolver: IpAddr,
        resolvers: &[IpAddr],
    ) -> Result<Self, BuildError> {
        let mut dns = Vec::with_capacity(resolvers.len() + 1);
        dns.push(local_resolver);
        dns.extend_from_slice(resolvers);

        Ok(Self {
            name: name.to_owned(),
            addresses: vec![
                IpCidr::new_host(IpAddr::V4(info.addr_v4)),
                IpCidr::new_host(IpAddr::V6(info.addr_v6)),
            ],
            listen_port,
            private_key,
            dns,
            peers: vec![Peer {
                public_key: PublicKey::from(info.peer_key),
                allowed_ips: full_tunnel()?,
                endpoint: info.endpoint(),
                persistent_keepalive: PERSISTENT_KEEPALIVE,
            }],
        })
    }

    /// Renders the config in the format `wg-quick` reads.
    pub fn to_wg_quick(&self) -> String {
        let mut out = format!(
            "[Interface]
Address = {addresses}
ListenPort = {port}
PrivateKey = {priv_key}
DNS = {dns}
",
            addresses = join(&self.addresses, fmt_cidr),
            port = self.listen_port,
            priv_key = self.private_key.to_base64(),
            dns = join(&self.dns, |ip| ip.to_string()),
        );

        for peer in &self.peers {
            // writing to a String cannot fail
            let _ = write!(
                out,
                "
[Peer]
PublicKey = {pub_key}
AllowedIPs = {allowed_ips}
Endpoint = {endpoint}
PersistentKeepalive = {keepalive}
",
                pub_key = peer.public_key,
                allowed_ips = join(&peer.allowed_ips, fmt_cidr),
                endpoint = peer.endpoint,
                keepalive = peer.persistent_keepalive,
            );
        }

        out
    }
}
