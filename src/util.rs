//! Internal utilities.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

use crate::error::{Error, Result};

/// Bind a UDP socket for talking to `target`, on `local_port` (0 for ephemeral).
///
/// The socket's family matches the target's. IPv6 sockets are dual-stack.
pub(crate) fn bind_udp_socket(target: SocketAddr, local_port: u16) -> io::Result<UdpSocket> {
    let (domain, any) = if target.is_ipv6() {
        (Domain::IPV6, IpAddr::V6(Ipv6Addr::UNSPECIFIED))
    } else {
        (Domain::IPV4, IpAddr::V4(Ipv4Addr::UNSPECIFIED))
    };

    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    if target.is_ipv6() {
        socket.set_only_v6(false)?;
    }
    if local_port != 0 {
        // Fixed source ports are commonly reused by short-lived tools.
        socket.set_reuse_address(true)?;
    }
    socket.set_nonblocking(true)?;
    socket.bind(&SocketAddr::new(any, local_port).into())?;

    UdpSocket::from_std(socket.into())
}

/// Resolve `host` and `port` to the first socket address.
pub(crate) async fn resolve_target(host: &str, port: u16) -> Result<SocketAddr> {
    let target = format!("{}:{}", host, port);
    let lookup = match host.parse::<IpAddr>() {
        Ok(ip) => return Ok(SocketAddr::new(ip, port)),
        Err(_) => tokio::net::lookup_host((host, port)).await,
    };
    lookup
        .map_err(|e| Error::connection(Some(target.clone()), e))?
        .next()
        .ok_or_else(|| {
            Error::connection(
                Some(target),
                io::Error::new(io::ErrorKind::NotFound, "could not resolve address"),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_matches_target_family() {
        let v4 = bind_udp_socket("127.0.0.1:161".parse().unwrap(), 0).unwrap();
        let local = v4.local_addr().unwrap();
        assert!(local.is_ipv4());
        assert_ne!(local.port(), 0);

        let v6 = bind_udp_socket("[::1]:161".parse().unwrap(), 0).unwrap();
        assert!(v6.local_addr().unwrap().is_ipv6());
    }

    #[tokio::test]
    async fn test_resolve_literal_and_name() {
        assert_eq!(
            resolve_target("10.0.0.1", 161).await.unwrap(),
            "10.0.0.1:161".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            resolve_target("::1", 1161).await.unwrap(),
            "[::1]:1161".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(resolve_target("localhost", 161).await.unwrap().port(), 161);
    }
}
