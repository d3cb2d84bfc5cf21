//! Network primitives: endpoint parsing and resolution, the non-blocking
//! UDP socket, and the per-family socket pool that targets share.

pub mod endpoint;
mod lookup;
pub mod pool;
pub mod socket;

pub use endpoint::{EndpointSpec, Family, Malformed, ResolveError, TargetAddr};
pub use pool::{SocketError, SocketPool, Target};
pub use socket::UdpSocket;
