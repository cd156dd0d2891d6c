//! UDP broadcast adapter.
//!
//! Implements [`BroadcastPort`]: one connectionless datagram per
//! reading to the local broadcast address, fire-and-forget.  `std::net`
//! works unchanged on both ESP-IDF and the host, so this adapter has no
//! cfg split.

use std::net::{Ipv4Addr, SocketAddr, UdpSocket};

use log::{info, warn};

use crate::app::ports::BroadcastPort;
use crate::error::CommsError;

pub struct UdpBroadcast {
    socket: Option<UdpSocket>,
    target: SocketAddr,
}

impl UdpBroadcast {
    /// Broadcast to `port` on the all-ones address.
    pub fn new(port: u16) -> Self {
        Self {
            socket: None,
            target: SocketAddr::from((Ipv4Addr::BROADCAST, port)),
        }
    }

    /// Aim datagrams at an arbitrary address (loopback listeners in
    /// tests).
    #[cfg(test)]
    fn with_target(target: SocketAddr) -> Self {
        Self {
            socket: None,
            target,
        }
    }

    /// Bind lazily on first use: the network stack may not be up yet
    /// when the adapter is constructed at boot.
    fn ensure_socket(&mut self) -> Result<(), CommsError> {
        if self.socket.is_some() {
            return Ok(());
        }
        let socket = UdpSocket::bind("0.0.0.0:0").map_err(|e| {
            warn!("broadcast: bind failed ({e})");
            CommsError::SocketUnavailable
        })?;
        socket.set_broadcast(true).map_err(|e| {
            warn!("broadcast: SO_BROADCAST failed ({e})");
            CommsError::SocketUnavailable
        })?;
        info!("broadcast: socket ready, target {}", self.target);
        self.socket = Some(socket);
        Ok(())
    }
}

impl BroadcastPort for UdpBroadcast {
    fn send(&mut self, payload: &[u8]) -> Result<(), CommsError> {
        self.ensure_socket()?;
        let Some(socket) = self.socket.as_ref() else {
            return Err(CommsError::SocketUnavailable);
        };
        socket.send_to(payload, self.target).map_err(|e| {
            warn!("broadcast: send failed ({e})");
            CommsError::BroadcastSendFailed
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datagram_reaches_a_loopback_listener() {
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        listener
            .set_read_timeout(Some(std::time::Duration::from_secs(2)))
            .unwrap();

        let mut bcast = UdpBroadcast::with_target(listener.local_addr().unwrap());
        bcast
            .send(br#"{"tilt":25.3,"temp":21.5,"sg":1.052,"batt":100}"#)
            .unwrap();

        let mut buf = [0u8; 128];
        let (len, _) = listener.recv_from(&mut buf).unwrap();
        let v: serde_json::Value = serde_json::from_slice(&buf[..len]).unwrap();
        assert_eq!(v["batt"].as_i64().unwrap(), 100);
    }

    #[test]
    fn socket_is_reused_across_sends() {
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        let mut bcast = UdpBroadcast::with_target(listener.local_addr().unwrap());
        bcast.send(b"one").unwrap();
        assert!(bcast.socket.is_some());
        bcast.send(b"two").unwrap();
    }
}
