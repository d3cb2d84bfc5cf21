//! Non-blocking UDP socket wrapper.
//!
//! Thin layer over [`mio::net::UdpSocket`]: sockets are non-blocking from
//! creation, so a send to a slow or unreachable receiver returns an error
//! instead of stalling the caller.

use std::io::{self, ErrorKind};
use std::net::SocketAddr;
use std::os::fd::{AsFd, BorrowedFd};

use mio::event::Source;
use mio::net::UdpSocket as MioUdpSocket;
use mio::{Interest, Registry, Token};

use super::endpoint::{Family, TargetAddr};

/// A non-blocking UDP socket.
#[derive(Debug)]
pub struct UdpSocket {
    inner: MioUdpSocket,
}

impl UdpSocket {
    /// Creates a socket bound to the given local address.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be created or bound.
    pub fn bind(addr: SocketAddr) -> io::Result<Self> {
        let inner = MioUdpSocket::bind(addr)?;
        Ok(Self { inner })
    }

    /// Creates a send socket for `family` on the wildcard address and an
    /// ephemeral port.
    ///
    /// # Errors
    ///
    /// Returns an error if the family is unsupported on this host.
    pub fn for_family(family: Family) -> io::Result<Self> {
        Self::bind(family.wildcard())
    }

    /// Returns the local address this socket is bound to.
    ///
    /// # Errors
    ///
    /// Returns an error if the local address cannot be retrieved.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    /// Sends one datagram without blocking.
    ///
    /// # Errors
    ///
    /// Returns `WouldBlock` when the send buffer is full, or any other
    /// error the kernel reports for the destination.
    pub fn send_to(&self, buf: &[u8], dest: TargetAddr) -> io::Result<usize> {
        self.inner.send_to(buf, dest.into())
    }

    /// Receives one datagram, or `WouldBlock` if none is queued.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or if the socket would block.
    pub fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.inner.recv_from(buf)
    }

    /// Attempts to receive, returning `Ok(None)` instead of `WouldBlock`.
    pub fn try_recv_from(&self, buf: &mut [u8]) -> io::Result<Option<(usize, SocketAddr)>> {
        match self.recv_from(buf) {
            Ok(received) => Ok(Some(received)),
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Sets the socket's send buffer size.
    ///
    /// # Errors
    ///
    /// Returns an error if the option cannot be set.
    pub fn set_send_buffer_size(&self, size: usize) -> io::Result<()> {
        // mio does not expose socket options
        rustix::net::sockopt::set_socket_send_buffer_size(self.inner.as_fd(), size)?;
        Ok(())
    }

    /// Gets the socket's send buffer size.
    ///
    /// # Errors
    ///
    /// Returns an error if the option cannot be retrieved.
    pub fn send_buffer_size(&self) -> io::Result<usize> {
        Ok(rustix::net::sockopt::socket_send_buffer_size(
            self.inner.as_fd(),
        )?)
    }
}

impl AsFd for UdpSocket {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.inner.as_fd()
    }
}

impl Source for UdpSocket {
    fn register(
        &mut self,
        registry: &Registry,
        token: Token,
        interests: Interest,
    ) -> io::Result<()> {
        self.inner.register(registry, token, interests)
    }

    fn reregister(
        &mut self,
        registry: &Registry,
        token: Token,
        interests: Interest,
    ) -> io::Result<()> {
        self.inner.reregister(registry, token, interests)
    }

    fn deregister(&mut self, registry: &Registry) -> io::Result<()> {
        self.inner.deregister(registry)
    }
}
