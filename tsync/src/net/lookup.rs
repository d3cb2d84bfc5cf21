//! `getaddrinfo` for datagram sockets.
//!
//! The std resolver only takes numeric ports; this one also accepts service
//! names (`domain`, `http`) from the system services database.

use std::ffi::{CStr, CString};
use std::io;
use std::mem;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::ptr;

/// Looks up `host` and `service` for UDP and returns the first candidate.
///
/// `Ok(None)` means the resolver answered but the first candidate is not
/// an IPv4 or IPv6 address.
///
/// # Errors
///
/// Returns the resolver's diagnostic if the lookup fails.
pub(crate) fn first_datagram_addr(host: &str, service: &str) -> io::Result<Option<SocketAddr>> {
    let host = c_string(host)?;
    let service = c_string(service)?;

    // SAFETY: all-zero is a valid `addrinfo` (null pointers, zero flags).
    let mut hints: libc::addrinfo = unsafe { mem::zeroed() };
    hints.ai_family = libc::AF_UNSPEC;
    hints.ai_socktype = libc::SOCK_DGRAM;

    let mut list: *mut libc::addrinfo = ptr::null_mut();
    // SAFETY: both strings are NUL-terminated and outlive the call; `list`
    // is only read after a zero return.
    let rc = unsafe { libc::getaddrinfo(host.as_ptr(), service.as_ptr(), &hints, &mut list) };
    if rc != 0 {
        return Err(gai_error(rc));
    }

    // SAFETY: on success `list` is null or points to a valid `addrinfo`
    // chain owned by us until `freeaddrinfo`.
    let first = unsafe { list.as_ref() }.and_then(|ai| unsafe { socket_addr(ai) });
    // SAFETY: `list` came from a successful `getaddrinfo` and is freed once.
    unsafe { libc::freeaddrinfo(list) };
    Ok(first)
}

fn c_string(s: &str) -> io::Result<CString> {
    CString::new(s).map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "embedded NUL"))
}

fn gai_error(rc: libc::c_int) -> io::Error {
    if rc == libc::EAI_SYSTEM {
        return io::Error::last_os_error();
    }
    // SAFETY: `gai_strerror` returns a static NUL-terminated string.
    let msg = unsafe { CStr::from_ptr(libc::gai_strerror(rc)) };
    io::Error::other(msg.to_string_lossy().into_owned())
}

/// # Safety
///
/// `ai.ai_addr` must be null or point to a socket address of at least
/// `ai.ai_addrlen` bytes.
unsafe fn socket_addr(ai: &libc::addrinfo) -> Option<SocketAddr> {
    if ai.ai_addr.is_null() {
        return None;
    }
    let len = ai.ai_addrlen as usize;
    match ai.ai_family {
        libc::AF_INET if len >= mem::size_of::<libc::sockaddr_in>() => {
            // SAFETY: family and length checked above.
            let sin = unsafe { ptr::read_unaligned(ai.ai_addr.cast::<libc::sockaddr_in>()) };
            Some(SocketAddr::V4(SocketAddrV4::new(
                Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr)),
                u16::from_be(sin.sin_port),
            )))
        }
        libc::AF_INET6 if len >= mem::size_of::<libc::sockaddr_in6>() => {
            // SAFETY: family and length checked above.
            let sin6 = unsafe { ptr::read_unaligned(ai.ai_addr.cast::<libc::sockaddr_in6>()) };
            Some(SocketAddr::V6(SocketAddrV6::new(
                Ipv6Addr::from(sin6.sin6_addr.s6_addr),
                u16::from_be(sin6.sin6_port),
                u32::from_be(sin6.sin6_flowinfo),
                sin6.sin6_scope_id,
            )))
        }
        _ => None,
    }
}
