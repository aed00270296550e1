use netlink_packet_core::{NetlinkHeader, NetlinkMessage, NetlinkPayload, NLM_F_REQUEST};
use netlink_packet_route::{nlas::link, LinkMessage, RtnlMessage, IFF_UP};

use super::{Netlink, NetlinkError};

fn get_link(name: &str) -> NetlinkMessage<RtnlMessage> {
    let mut message = LinkMessage::default();
    message.nlas.push(link::Nla::IfName(name.to_owned()));

    let mut header = NetlinkHeader::default();
    header.flags = NLM_F_REQUEST;

    NetlinkMessage::new(header, NetlinkPayload::from(RtnlMessage::GetLink(message)))
}

impl Netlink {
    /// Returns whether the named link exists and is administratively up.
    pub fn link_up(&self, name: &str) -> Result<bool, NetlinkError> {
        match Self::send_recv::<_, RtnlMessage>(&self.route, get_link(name)) {
            Ok(RtnlMessage::NewLink(msg)) => Ok(msg.header.flags & IFF_UP != 0),
            Ok(_) => Err(NetlinkError::UnexpectedResponse),
            Err(NetlinkError::NotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
