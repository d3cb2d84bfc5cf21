//! Session startup and the broadcast loop.
//!
//! Startup is all-or-nothing: every endpoint is resolved and its socket
//! created before the transport provider is contacted, and any failure
//! aborts before the first tick. Once [`start`] returns, nothing in the
//! loop can fail fatally.

pub mod config;
pub mod scheduler;
pub mod shutdown;

pub use config::{SourceKind, SyncConfig};
pub use scheduler::{LoopStats, Pause, Scheduler, ThreadSleep, TickReport};
pub use shutdown::{Shutdown, StopReason};

use crate::broadcast::Broadcaster;
use crate::net::{EndpointSpec, ResolveError, SocketError, SocketPool, Target};
use crate::trace::info;
use crate::transport::{ClockTransport, Sampler, SourceError, TransportSource};

/// Fatal error before the loop starts.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// Bad or missing arguments.
    #[error("{0}")]
    Usage(String),
    /// An endpoint was malformed or could not be resolved.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// A send socket could not be created.
    #[error(transparent)]
    Socket(#[from] SocketError),
    /// The transport provider is not running or not built in.
    #[error("{0}")]
    ProviderUnavailable(String),
    /// The provider refused to activate the client.
    #[error("{0}")]
    Activation(String),
}

impl StartupError {
    /// Whether the usage text should follow the diagnostic.
    #[must_use]
    pub const fn shows_usage(&self) -> bool {
        matches!(self, Self::Usage(_) | Self::Resolve(_))
    }

    /// Process exit status. Every startup failure is status 1.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        1
    }
}

impl From<SourceError> for StartupError {
    fn from(e: SourceError) -> Self {
        match e {
            SourceError::Activation(_) => Self::Activation(e.to_string()),
            SourceError::Unavailable(_) | SourceError::Query(_) => {
                Self::ProviderUnavailable(e.to_string())
            }
        }
    }
}

/// Parses and resolves one endpoint into a target that shares `pool`.
///
/// # Errors
///
/// Returns [`StartupError::Resolve`] for a malformed or unresolvable
/// endpoint, or [`StartupError::Socket`] if the family's socket cannot be
/// created.
pub fn resolve_target(spec: &str, pool: &mut SocketPool) -> Result<Target, StartupError> {
    let addr = EndpointSpec::parse(spec)?.resolve()?;
    let target = pool.target(addr)?;
    info!(endpoint = spec, resolved = %target.addr(), family = %target.family(), "target ready");
    Ok(target)
}

/// Resolves every endpoint, in order, into a target sharing `pool`.
///
/// Stops at the first failure; there is no partial result.
///
/// # Errors
///
/// Returns [`StartupError::Usage`] if `specs` is empty, otherwise the first
/// resolution or socket error.
pub fn resolve_targets<I>(specs: I, pool: &mut SocketPool) -> Result<Vec<Target>, StartupError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut targets = Vec::new();
    for spec in specs {
        targets.push(resolve_target(spec.as_ref(), pool)?);
    }
    if targets.is_empty() {
        return Err(StartupError::Usage("at least one endpoint is required".into()));
    }
    Ok(targets)
}

/// Opens and activates the configured transport provider.
///
/// `shutdown` receives [`StopReason::ProviderShutdown`] if the provider
/// goes away later.
///
/// # Errors
///
/// Returns [`StartupError::ProviderUnavailable`] or
/// [`StartupError::Activation`].
pub fn open_source(
    config: &SyncConfig,
    shutdown: &Shutdown,
) -> Result<Box<dyn TransportSource>, StartupError> {
    match &config.source {
        SourceKind::Clock(settings) => {
            info!(bpm = settings.beats_per_minute, rate = settings.frame_rate, "using free-running clock");
            Ok(Box::new(ClockTransport::start(*settings)))
        }
        #[cfg(feature = "jack")]
        SourceKind::Jack => {
            let source = crate::transport::jack::JackTransport::activate(&config.client_name, shutdown)?;
            Ok(Box::new(source))
        }
        #[cfg(not(feature = "jack"))]
        SourceKind::Jack => {
            let _ = shutdown;
            Err(StartupError::ProviderUnavailable(
                "built without JACK support (enable the `jack` feature or use --simulate)".into(),
            ))
        }
    }
}

/// Validates `config`, resolves targets, creates sockets and activates the
/// provider, returning a scheduler ready to [`run`](Scheduler::run).
///
/// # Errors
///
/// Returns the first [`StartupError`] encountered.
pub fn start(
    config: &SyncConfig,
    shutdown: Shutdown,
) -> Result<Scheduler<Box<dyn TransportSource>>, StartupError> {
    if config.period.is_zero() {
        return Err(StartupError::Usage("period must be greater than zero".into()));
    }

    let mut pool = match config.send_buffer_size {
        Some(size) => SocketPool::with_send_buffer_size(size),
        None => SocketPool::new(),
    };
    let targets = resolve_targets(&config.endpoints, &mut pool)?;
    info!(targets = targets.len(), sockets = pool.len(), "targets resolved");

    let source = open_source(config, &shutdown)?;

    Ok(Scheduler::new(
        Sampler::new(source),
        Broadcaster::new(targets),
        config.period,
        shutdown,
    ))
}
