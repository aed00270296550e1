use std::{
    io,
    net::{Ipv4Addr, Ipv6Addr, UdpSocket},
};

const PORT_ATTEMPTS: usize = 8;

/// Asks the kernel for an ephemeral UDP port that is free right now on both
/// address families. The sockets are dropped before returning, so the
/// caller must bind soon.
pub fn free_udp_port() -> io::Result<u16> {
    let mut last_err = None;

    for _ in 0..PORT_ATTEMPTS {
        let port = match UdpSocket::bind((Ipv6Addr::UNSPECIFIED, 0)) {
            Ok(socket) => socket.local_addr()?.port(),
            // no IPv6 on this host
            Err(_) => {
                let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
                return Ok(socket.local_addr()?.port());
            }
        };

        // the v6 socket may have been v6-only
        match UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port)) {
            Ok(_) => return Ok(port),
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => last_err = Some(e),
            Err(e) => return Err(e),
        }
    }

    Err(last_err.unwrap_or_else(|| io::Error::from(io::ErrorKind::AddrInUse)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocated_port_can_be_bound_on_both_families() {
        let port = free_udp_port().unwrap();
        assert_ne!(port, 0);

        let v6_available = UdpSocket::bind((Ipv6Addr::UNSPECIFIED, 0)).is_ok();
        if v6_available {
            let _v6 = UdpSocket::bind((Ipv6Addr::UNSPECIFIED, port)).unwrap();
        } else {
            let _v4 = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port)).unwrap();
        }
    }

    #[test]
    fn port_held_over_ipv6_is_not_handed_out() {
        let Ok(held) = UdpSocket::bind((Ipv6Addr::UNSPECIFIED, 0)) else {
            return;
        };
        let held_port = held.local_addr().unwrap().port();

        for _ in 0..32 {
            assert_ne!(free_udp_port().unwrap(), held_port);
        }
    }
}
