use std::{
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4},
    ops::Range,
};

use thiserror::Error;

/// Length of the info blob a node returns after the session is registered.
pub const SESSION_INFO_LEN: usize = 58;

const ADDR_V4: Range<usize> = 0..4;
const ADDR_V6: Range<usize> = 4..20;
const ENDPOINT_HOST: Range<usize> = 20..24;
const ENDPOINT_PORT: Range<usize> = 24..26;
const PEER_KEY: Range<usize> = 26..58;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionInfoError {
    #[error("session info is {len} bytes, expected at least {}", SESSION_INFO_LEN)]
    Truncated { len: usize },
    #[error("session info field {field} out of range")]
    Field { field: &'static str },
}

/// Tunnel parameters assigned by the remote node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub addr_v4: Ipv4Addr,
    pub addr_v6: Ipv6Addr,
    pub endpoint: SocketAddrV4,
    pub peer_key: [u8; 32],
}

fn field<const N: usize>(
    buf: &[u8],
    range: Range<usize>,
    name: &'static str,
) -> Result<[u8; N], SessionInfoError> {
    buf.get(range)
        .and_then(|s| <[u8; N]>::try_from(s).ok())
        .ok_or(SessionInfoError::Field { field: name })
}

impl SessionInfo {
    /// Decodes the fixed layout. Bytes past offset 58 are ignored.
    pub fn decode(buf: &[u8]) -> Result<Self, SessionInfoError> {
        if buf.len() < SESSION_INFO_LEN {
            return Err(SessionInfoError::Truncated { len: buf.len() });
        }

        let addr_v4 = Ipv4Addr::from(field::<4>(buf, ADDR_V4, "addr_v4")?);
        let addr_v6 = Ipv6Addr::from(field::<16>(buf, ADDR_V6, "addr_v6")?);
        let host = Ipv4Addr::from(field::<4>(buf, ENDPOINT_HOST, "endpoint_host")?);
        let port = u16::from_be_bytes(field::<2>(buf, ENDPOINT_PORT, "endpoint_port")?);
        let peer_key = field::<32>(buf, PEER_KEY, "peer_key")?;

        Ok(Self {
            addr_v4,
            addr_v6,
            endpoint: SocketAddrV4::new(host, port),
            peer_key,
        })
    }

    pub fn endpoint(&self) -> SocketAddr {
        SocketAddr::V4(self.endpoint)
    }
}
