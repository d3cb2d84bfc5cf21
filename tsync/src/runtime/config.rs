use std::time::Duration;

use crate::transport::clock::ClockSettings;

/// Default sampling period.
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(10);

/// Default JACK client name.
pub const DEFAULT_CLIENT_NAME: &str = "tsync";

/// Where transport snapshots come from.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceKind {
    /// The JACK server's transport. Needs the `jack` feature.
    Jack,
    /// A free-running clock with fixed tempo.
    Clock(ClockSettings),
}

/// Configuration for a broadcast session.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Endpoint strings, `host:port` or `[literal]:port`, in send order.
    pub endpoints: Vec<String>,
    /// Fixed pause between ticks. Also reported to receivers as `p=`.
    pub period: Duration,
    /// Client name registered with the transport provider.
    pub client_name: String,
    /// Send buffer size applied to each socket, if set.
    pub send_buffer_size: Option<usize>,
    /// Transport provider.
    pub source: SourceKind,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            period: DEFAULT_PERIOD,
            client_name: DEFAULT_CLIENT_NAME.to_owned(),
            send_buffer_size: None,
            source: SourceKind::Jack,
        }
    }
}
