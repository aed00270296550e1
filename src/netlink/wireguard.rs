use futures::StreamExt;
use netlink_packet_core::{NetlinkMessage, NetlinkPayload, NLM_F_DUMP, NLM_F_REQUEST};
use netlink_packet_generic::GenlMessage;
use netlink_packet_wireguard::{
    nlas::{WgDeviceAttrs, WgPeerAttrs},
    Wireguard, WireguardCmd,
};

use super::{Netlink, NetlinkError};

/// Per-peer counters as reported by the kernel.
#[derive(Debug, Clone, Default)]
pub struct PeerStats {
    pub tx: u64,
    pub rx: u64,
}

impl From<Vec<WgPeerAttrs>> for PeerStats {
    fn from(nlas: Vec<WgPeerAttrs>) -> Self {
        let mut res = Self::default();

        for nla in nlas {
            match nla {
                WgPeerAttrs::TxBytes(v) => res.tx = v,
                WgPeerAttrs::RxBytes(v) => res.rx = v,
                _ => {}
            }
        }
        res
    }
}

#[derive(Debug, Default)]
pub struct Device {
    pub name: String,
    pub listen_port: u16,
    pub peers: Vec<PeerStats>,
}

impl Device {
    /// Cumulative (upload, download) bytes over all peers.
    pub fn transfer(&self) -> (u64, u64) {
        self.peers.iter().fold((0, 0), |(up, down), p| {
            (up.saturating_add(p.tx), down.saturating_add(p.rx))
        })
    }
}

impl From<Wireguard> for Device {
    fn from(wg: Wireguard) -> Self {
        let mut res = Self::default();
        for nla in wg.nlas {
            match nla {
                WgDeviceAttrs::IfName(v) => res.name = v,
                WgDeviceAttrs::ListenPort(v) => res.listen_port = v,
                WgDeviceAttrs::Peers(nlas) => {
                    res.peers.extend(nlas.into_iter().map(|n| PeerStats::from(n.0)))
                }
                _ => (),
            }
        }
        res
    }
}

impl Netlink {
    pub async fn wg_device(&mut self, name: &str) -> Result<Device, NetlinkError> {
        let genlmsg: GenlMessage<Wireguard> = GenlMessage::from_payload(Wireguard {
            cmd: WireguardCmd::GetDevice,
            nlas: vec![WgDeviceAttrs::IfName(name.to_owned())],
        });

        let mut nlmsg = NetlinkMessage::from(genlmsg);
        nlmsg.header.flags = NLM_F_REQUEST | NLM_F_DUMP;
        let mut responses = self.generic.request(nlmsg).await?;

        while let Some(result) = responses.next().await {
            let resp = result?;
            match resp.payload {
                NetlinkPayload::InnerMessage(genlmsg) => return Ok(Device::from(genlmsg.payload)),
                NetlinkPayload::Error(err) => return Err(NetlinkError::from(err.code)),
                _ => {}
            }
        }

        Err(NetlinkError::UnexpectedResponse)
    }
}
