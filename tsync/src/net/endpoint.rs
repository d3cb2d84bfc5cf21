//! Endpoint specifications and their resolution into target addresses.
//!
//! An endpoint is given on the command line as `host:port` or
//! `[literal]:port`, where the port is a number or a service name. Parsing
//! is pure and borrows from the input; resolution asks the system resolver
//! for datagram addresses and keeps only the first candidate it returns.

use std::fmt;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};

use super::lookup::first_datagram_addr;

/// Address family of a resolved target. Selects the shared socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Family {
    /// IPv4 (`AF_INET`).
    V4,
    /// IPv6 (`AF_INET6`).
    V6,
}

impl Family {
    /// Wildcard local address with an ephemeral port for this family.
    #[must_use]
    pub const fn wildcard(self) -> SocketAddr {
        match self {
            Self::V4 => SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0)),
            Self::V6 => SocketAddr::V6(SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, 0, 0, 0)),
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4 => f.write_str("IPv4"),
            Self::V6 => f.write_str("IPv6"),
        }
    }
}

/// A resolved destination, tagged by family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetAddr {
    /// IPv4 destination.
    V4(SocketAddrV4),
    /// IPv6 destination.
    V6(SocketAddrV6),
}

impl TargetAddr {
    /// Returns the family this destination must be sent from.
    #[must_use]
    pub const fn family(&self) -> Family {
        match self {
            Self::V4(_) => Family::V4,
            Self::V6(_) => Family::V6,
        }
    }

    /// Returns the port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        match self {
            Self::V4(addr) => addr.port(),
            Self::V6(addr) => addr.port(),
        }
    }

    /// Returns the underlying [`SocketAddr`].
    #[must_use]
    pub const fn as_socket_addr(&self) -> SocketAddr {
        match *self {
            Self::V4(addr) => SocketAddr::V4(addr),
            Self::V6(addr) => SocketAddr::V6(addr),
        }
    }
}

impl From<SocketAddr> for TargetAddr {
    fn from(addr: SocketAddr) -> Self {
        match addr {
            SocketAddr::V4(v4) => Self::V4(v4),
            SocketAddr::V6(v6) => Self::V6(v6),
        }
    }
}

impl From<TargetAddr> for SocketAddr {
    fn from(addr: TargetAddr) -> Self {
        addr.as_socket_addr()
    }
}

impl fmt::Display for TargetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_socket_addr().fmt(f)
    }
}

/// Why an endpoint string could not be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Malformed {
    /// No `:` separating host and port.
    #[error("missing `:port`")]
    MissingSeparator,
    /// Nothing before the port separator.
    #[error("empty host")]
    EmptyHost,
    /// `[` without a closing `]` directly before the port, or the reverse.
    #[error("unmatched bracket")]
    UnmatchedBracket,
    /// Port is empty, or numeric but out of range.
    #[error("invalid port")]
    InvalidPort,
}

/// Error turning an endpoint string into a target address.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The string does not have the `host:port` or `[literal]:port` shape.
    #[error("malformed endpoint `{spec}`: {reason}")]
    Malformed {
        /// The offending endpoint string.
        spec: String,
        /// What was wrong with it.
        reason: Malformed,
    },
    /// The system resolver failed, returned no candidates, or did not know
    /// the service name.
    #[error("cannot resolve `{host}`: {source}")]
    Resolution {
        /// Host as passed to the resolver (brackets stripped).
        host: String,
        /// Resolver diagnostic.
        #[source]
        source: io::Error,
    },
}

/// A parsed endpoint specification, borrowing its host from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointSpec<'a> {
    host: &'a str,
    port: &'a str,
}

impl<'a> EndpointSpec<'a> {
    /// Parses `host:port` or `[literal]:port`.
    ///
    /// The split happens at the last `:`, so unbracketed IPv6 literals such
    /// as `::1:9000` still parse with `::1` as host.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Malformed`] when the separator is missing, the
    /// host is empty, brackets do not match, or the port is empty or an
    /// out-of-range number. Service names are left to [`resolve`](Self::resolve).
    pub fn parse(spec: &'a str) -> Result<Self, ResolveError> {
        let malformed = |reason| ResolveError::Malformed {
            spec: spec.to_owned(),
            reason,
        };

        let (host, port) = spec
            .rsplit_once(':')
            .ok_or_else(|| malformed(Malformed::MissingSeparator))?;

        let host = match (host.strip_prefix('['), host.ends_with(']')) {
            (Some(inner), true) => &inner[..inner.len() - 1],
            (None, false) => host,
            _ => return Err(malformed(Malformed::UnmatchedBracket)),
        };
        if host.is_empty() {
            return Err(malformed(Malformed::EmptyHost));
        }

        let numeric = port.bytes().all(|b| b.is_ascii_digit());
        if port.is_empty() || (numeric && port.parse::<u16>().is_err()) {
            return Err(malformed(Malformed::InvalidPort));
        }

        Ok(Self { host, port })
    }

    /// Returns the host with any brackets stripped.
    #[must_use]
    pub const fn host(&self) -> &'a str {
        self.host
    }

    /// Returns the port as written: digits or a service name.
    #[must_use]
    pub const fn port(&self) -> &'a str {
        self.port
    }

    /// Resolves the host and returns the first candidate address.
    ///
    /// Alternate candidates (for example the IPv6 address of a dual-stack
    /// name) are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Resolution`] if lookup fails or yields nothing.
    pub fn resolve(&self) -> Result<TargetAddr, ResolveError> {
        let resolution = |source| ResolveError::Resolution {
            host: self.host.to_owned(),
            source,
        };

        first_datagram_addr(self.host, self.port)
            .map_err(resolution)?
            .map(TargetAddr::from)
            .ok_or_else(|| {
                resolution(io::Error::new(
                    io::ErrorKind::NotFound,
                    "no addresses returned",
                ))
            })
    }
}
