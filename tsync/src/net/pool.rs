//! Per-family shared send sockets and the targets that use them.

use std::io;
use std::sync::Arc;

use super::endpoint::{Family, TargetAddr};
use super::socket::UdpSocket;
use crate::trace::{debug, error};

/// Error creating or configuring a pooled socket.
#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    /// The socket could not be created or bound.
    #[error("cannot create {family} socket: {source}")]
    Create {
        /// Family the socket was requested for.
        family: Family,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// The socket was created but an option could not be applied.
    #[error("cannot configure {family} socket: {source}")]
    Configure {
        /// Family the socket was requested for.
        family: Family,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
}

/// Lazily created sockets, at most one per address family.
#[derive(Debug, Default)]
pub struct SocketPool {
    v4: Option<Arc<UdpSocket>>,
    v6: Option<Arc<UdpSocket>>,
    send_buffer_size: Option<usize>,
}

impl SocketPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty pool whose sockets get the given send buffer size.
    #[must_use]
    pub fn with_send_buffer_size(size: usize) -> Self {
        Self {
            send_buffer_size: Some(size),
            ..Self::default()
        }
    }

    /// Returns the socket for `family`, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`SocketError`] if the socket cannot be created or configured.
    pub fn get_or_create(&mut self, family: Family) -> Result<Arc<UdpSocket>, SocketError> {
        let send_buffer_size = self.send_buffer_size;
        let slot = match family {
            Family::V4 => &mut self.v4,
            Family::V6 => &mut self.v6,
        };

        if let Some(socket) = slot {
            return Ok(Arc::clone(socket));
        }

        let socket = UdpSocket::for_family(family).map_err(|source| {
            error!(%family, error = %source, "failed to create socket");
            SocketError::Create { family, source }
        })?;
        if let Some(size) = send_buffer_size {
            socket
                .set_send_buffer_size(size)
                .map_err(|source| SocketError::Configure { family, source })?;
        }
        debug!(%family, local = ?socket.local_addr().ok(), "created send socket");

        Ok(Arc::clone(slot.insert(Arc::new(socket))))
    }

    /// Builds a target for `addr`, sharing the socket of its family.
    ///
    /// # Errors
    ///
    /// Returns [`SocketError`] if the family's socket has to be created and
    /// that fails.
    pub fn target(&mut self, addr: TargetAddr) -> Result<Target, SocketError> {
        let socket = self.get_or_create(addr.family())?;
        Ok(Target { addr, socket })
    }

    /// Number of live sockets (0, 1 or 2).
    #[must_use]
    pub fn len(&self) -> usize {
        usize::from(self.v4.is_some()) + usize::from(self.v6.is_some())
    }

    /// Returns `true` if no socket has been created yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A resolved destination bound to its family's shared socket.
#[derive(Debug, Clone)]
pub struct Target {
    addr: TargetAddr,
    socket: Arc<UdpSocket>,
}

impl Target {
    /// Destination address.
    #[must_use]
    pub const fn addr(&self) -> TargetAddr {
        self.addr
    }

    /// Family of the destination and of the socket it uses.
    #[must_use]
    pub const fn family(&self) -> Family {
        self.addr.family()
    }

    /// Socket shared with every other target of the same family.
    #[must_use]
    pub fn socket(&self) -> &Arc<UdpSocket> {
        &self.socket
    }

    /// Sends one datagram to this target without blocking.
    ///
    /// # Errors
    ///
    /// Returns the OS error for this destination, including `WouldBlock`.
    pub fn send(&self, buf: &[u8]) -> io::Result<usize> {
        self.socket.send_to(buf, self.addr)
    }
}
