//! Host address discovery for `/api/ip`.

use serde::Serialize;
use std::io;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};

/// Address clients on the local network can use to reach the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HostAddress {
    /// Host IP address.
    pub ip: IpAddr,
    /// Listening port.
    pub port: u16,
}

/// Finds the IPv4 address of the interface used for outbound traffic.
///
/// Connecting a UDP socket sends nothing; it only asks the OS to pick a
/// route, which reveals the local address of the matching interface.
pub fn outbound_ipv4() -> io::Result<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    socket.connect((Ipv4Addr::new(192, 0, 2, 1), 9))?;
    let ip = socket.local_addr()?.ip();
    if ip.is_unspecified() {
        return Err(io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            "no routable interface",
        ));
    }
    Ok(ip)
}

/// Picks the address to advertise for a server bound to `bind_ip`.
///
/// A specific bind address is advertised as-is. For a wildcard bind the
/// outbound interface is used, falling back to loopback when the host has no
/// route.
pub fn advertised_ip(bind_ip: IpAddr) -> IpAddr {
    if !bind_ip.is_unspecified() {
        return bind_ip;
    }

    match outbound_ipv4() {
        Ok(ip) => ip,
        Err(err) => {
            tracing::debug!(error = %err, "host address lookup failed, using loopback");
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specific_bind_is_advertised() {
        let ip: IpAddr = "10.1.2.3".parse().unwrap();
        assert_eq!(advertised_ip(ip), ip);
    }

    #[test]
    fn wildcard_bind_resolves_to_something_usable() {
        let ip = advertised_ip(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert!(!ip.is_unspecified());
    }

    #[test]
    fn host_address_json() {
        let addr = HostAddress {
            ip: IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)),
            port: 8000,
        };
        assert_eq!(
            serde_json::to_value(addr).unwrap(),
            serde_json::json!({"ip": "192.168.1.20", "port": 8000})
        );
    }
}
