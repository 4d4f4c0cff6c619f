//! UDP sink for OSC datagrams.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tracing::debug;

use crate::application::OscSink;

/// Sends every datagram to one fixed OSC receiver.
///
/// The socket is left unconnected and addressed per send, so a receiver that
/// is not running yet does not turn later sends into errors.
pub struct UdpOscSink {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpOscSink {
    /// Binds an ephemeral local port of the same address family as `target`.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the local socket cannot be bound.
    pub async fn bind(target: SocketAddr) -> std::io::Result<Self> {
        let local = if target.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };
        let socket = UdpSocket::bind(local).await?;
        debug!("OSC sink bound to {} → {target}", socket.local_addr()?);
        Ok(Self { socket, target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

#[async_trait]
impl OscSink for UdpOscSink {
    async fn send_datagram(&self, datagram: &[u8]) -> std::io::Result<()> {
        self.socket.send_to(datagram, self.target).await?;
        Ok(())
    }
}
