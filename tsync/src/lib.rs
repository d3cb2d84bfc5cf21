//! Mirror a JACK transport to remote listeners over UDP.
//!
//! Every period the transport is sampled, rendered as one text line and
//! sent, best effort, to each configured endpoint:
//!
//! ```text
//! p=10000 f=0 r=48000 bbt=1:1:0 den=4.000000:960.000000 bpm=120.000000 state=rolling
//! ```
//!
//! - [`net`]: endpoint parsing/resolution and per-family shared sockets.
//! - [`transport`]: transport sources and the per-tick sampler.
//! - [`broadcast`]: the wire line and fan-out to targets.
//! - [`runtime`]: startup, the fixed-period loop and its stop signal.

pub mod broadcast;
pub mod net;
pub mod runtime;
mod trace;
pub mod transport;

pub use trace::init_tracing;
