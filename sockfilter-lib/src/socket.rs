use tracing::{debug, info};

use crate::error::SocketError;
use crate::kernel::{InterfaceId, Kernel, NetworkInterface};

/// `ETH_P_ALL` from `linux/if_ether.h`: every link-layer protocol, host byte order
pub const ETH_P_ALL: u16 = 0x0003;

/// The "all protocols" selector as the kernel expects it in `socket(2)` and
/// `sockaddr_ll`: `htons(ETH_P_ALL)`.
pub const fn protocol_all() -> u16 {
    ETH_P_ALL.to_be()
}

/// Owned raw packet socket.
///
/// Closed exactly once: either by [`SocketGuard::close`] or on drop.
pub struct SocketGuard<'k, K: Kernel> {
    kernel: &'k K,
    interface: NetworkInterface,
    socket: Option<K::Socket>,
}

impl<'k, K: Kernel> SocketGuard<'k, K> {
    /// Resolve `id` and open a raw socket on it.
    ///
    /// An unresolvable identifier fails with [`SocketError::InterfaceNotFound`]
    /// before any socket is created.
    pub fn open(kernel: &'k K, id: &InterfaceId) -> Result<Self, SocketError> {
        let interface = kernel.resolve_interface(id)?;
        Self::open_on(kernel, &interface)
    }

    /// Open a raw socket on an already resolved interface
    pub fn open_on(kernel: &'k K, interface: &NetworkInterface) -> Result<Self, SocketError> {
        let socket = kernel.open_socket(interface)?;
        debug!(interface = %interface, "raw socket acquired");
        Ok(Self { kernel, interface: interface.clone(), socket: Some(socket) })
    }

    pub fn interface(&self) -> &NetworkInterface {
        &self.interface
    }

    pub fn get(&self) -> Option<&K::Socket> {
        self.socket.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    /// Close the socket. Calling it again is a no-op.
    pub fn close(&mut self) {
        if let Some(socket) = self.socket.take() {
            self.kernel.close_socket(socket);
            info!(interface = %self.interface, "raw socket closed");
        }
    }
}

impl<K: Kernel> Drop for SocketGuard<'_, K> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eth_p_all_matches_libc() {
        assert_eq!(i32::from(ETH_P_ALL), libc::ETH_P_ALL);
    }

    #[test]
    fn test_protocol_all_is_network_byte_order() {
        // htons(0x0003): the in-memory bytes must read 00 03 on every host.
        assert_eq!(protocol_all().to_ne_bytes(), [0x00, 0x03]);
        assert_eq!(u16::from_be(protocol_all()), 0x0003);
    }

    #[cfg(target_endian = "little")]
    #[test]
    fn test_protocol_all_literal_on_little_endian() {
        assert_eq!(protocol_all(), 0x0300);
        assert_eq!(i32::from(protocol_all()), 768);
    }

    #[cfg(target_endian = "big")]
    #[test]
    fn test_protocol_all_literal_on_big_endian() {
        assert_eq!(protocol_all(), 0x0003);
    }
}
