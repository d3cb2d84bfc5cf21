//! End-to-end tests: startup, the broadcast loop and real loopback receivers.
//!
//! # Running with tracing
//!
//! ```bash
//! RUST_LOG=tsync=trace cargo test --features tracing --test broadcast_e2e -- --nocapture
//! ```

use std::net::{SocketAddr, UdpSocket};
use std::sync::{Arc, Once};
use std::thread;
use std::time::{Duration, Instant};

use tsync::broadcast::{SendReport, parse_line};
use tsync::net::{Family, SocketPool, Target};
use tsync::runtime::{
    self, Shutdown, SourceKind, StartupError, StopReason, SyncConfig, TickReport,
};
use tsync::transport::TransportState;
use tsync::transport::clock::ClockSettings;

static INIT_TRACING: Once = Once::new();

fn init_test_tracing() {
    INIT_TRACING.call_once(tsync::init_tracing);
}

/// Binds a non-blocking receiver on an ephemeral loopback port.
fn bind_receiver(addr: &str) -> Option<(UdpSocket, SocketAddr)> {
    let socket = UdpSocket::bind(addr).ok()?;
    socket.set_nonblocking(true).expect("set nonblocking");
    let local = socket.local_addr().expect("local addr");
    Some((socket, local))
}

/// Drains everything that arrives until `quiet` passes with no datagram.
fn drain_lines(socket: &UdpSocket, quiet: Duration) -> Vec<String> {
    let mut lines = Vec::new();
    let mut buf = [0u8; 2048];
    let mut last = Instant::now();
    while last.elapsed() < quiet {
        match socket.recv_from(&mut buf) {
            Ok((len, _)) => {
                lines.push(String::from_utf8(buf[..len].to_vec()).expect("ascii line"));
                last = Instant::now();
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(1));
            }
            Err(e) => panic!("recv failed: {e}"),
        }
    }
    lines
}

fn clock_config(endpoints: Vec<String>) -> SyncConfig {
    SyncConfig {
        endpoints,
        period: Duration::from_millis(2),
        source: SourceKind::Clock(ClockSettings::default()),
        ..SyncConfig::default()
    }
}

fn distinct_sockets(targets: &[Target]) -> usize {
    let mut seen: Vec<&Arc<tsync::net::UdpSocket>> = Vec::new();
    for target in targets {
        if !seen.iter().any(|s| Arc::ptr_eq(s, target.socket())) {
            seen.push(target.socket());
        }
    }
    seen.len()
}

#[test]
fn loop_delivers_identical_lines_until_stopped() {
    init_test_tracing();

    let (rx_a, addr_a) = bind_receiver("127.0.0.1:0").expect("bind v4");
    let (rx_b, addr_b) = bind_receiver("127.0.0.1:0").expect("bind v4");
    let config = clock_config(vec![addr_a.to_string(), addr_b.to_string()]);

    let shutdown = Shutdown::new();
    let mut scheduler = runtime::start(&config, shutdown.clone()).expect("startup");
    assert_eq!(distinct_sockets(scheduler.broadcaster().targets()), 1);

    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(60));
        shutdown.request(StopReason::Interrupted)
    });
    assert_eq!(scheduler.run(), StopReason::Interrupted);
    assert!(stopper.join().unwrap());

    let lines_a = drain_lines(&rx_a, Duration::from_millis(100));
    let lines_b = drain_lines(&rx_b, Duration::from_millis(100));
    assert!(!lines_a.is_empty(), "no datagrams received");
    assert_eq!(lines_a, lines_b);
    assert_eq!(lines_a.len() as u64, scheduler.stats().ticks);

    let mut last_frame = 0;
    for line in &lines_a {
        let sample = parse_line(line.as_bytes()).expect("well-formed line");
        assert_eq!(sample.period_micros, 2_000);
        assert_eq!(sample.snapshot.state, TransportState::Rolling);
        assert!(sample.snapshot.frame >= last_frame);
        last_frame = sample.snapshot.frame;
    }
}

#[test]
fn one_socket_per_family_across_many_targets() {
    init_test_tracing();

    let (_rx_v4, v4) = bind_receiver("127.0.0.1:0").expect("bind v4");
    let Some((rx_v6, v6)) = bind_receiver("[::1]:0") else {
        eprintln!("IPv6 loopback unavailable, skipping");
        return;
    };

    let mut endpoints = Vec::new();
    for _ in 0..5 {
        endpoints.push(v4.to_string());
        endpoints.push(format!("[::1]:{}", v6.port()));
    }

    let mut pool = SocketPool::new();
    let targets = runtime::resolve_targets(&endpoints, &mut pool).expect("resolve");
    assert_eq!(targets.len(), 10);
    assert_eq!(pool.len(), 2);
    assert_eq!(distinct_sockets(&targets), 2);
    assert_eq!(
        targets.iter().filter(|t| t.family() == Family::V6).count(),
        5
    );
    drop(rx_v6);
}

#[test]
fn ipv4_and_ipv6_targets_receive_the_same_line() {
    init_test_tracing();

    let (rx_v4, v4) = bind_receiver("127.0.0.1:0").expect("bind v4");
    let Some((rx_v6, v6)) = bind_receiver("[::1]:0") else {
        eprintln!("IPv6 loopback unavailable, skipping");
        return;
    };

    let config = clock_config(vec![v4.to_string(), format!("[::1]:{}", v6.port())]);
    let mut scheduler = runtime::start(&config, Shutdown::new()).expect("startup");
    assert_eq!(distinct_sockets(scheduler.broadcaster().targets()), 2);

    for _ in 0..3 {
        assert_eq!(
            scheduler.tick(),
            TickReport::Sent(SendReport { sent: 2, failed: 0 })
        );
    }

    let lines_v4 = drain_lines(&rx_v4, Duration::from_millis(100));
    let lines_v6 = drain_lines(&rx_v6, Duration::from_millis(100));
    assert_eq!(lines_v4.len(), 3);
    assert_eq!(lines_v4, lines_v6);
}

#[test]
fn unreachable_target_does_not_block_others() {
    init_test_tracing();

    let (rx, addr) = bind_receiver("127.0.0.1:0").expect("bind v4");
    // Broadcast without SO_BROADCAST is refused by the kernel on every send.
    let config = clock_config(vec!["255.255.255.255:9".into(), addr.to_string()]);
    let mut scheduler = runtime::start(&config, Shutdown::new()).expect("startup");

    for _ in 0..4 {
        assert_eq!(
            scheduler.tick(),
            TickReport::Sent(SendReport { sent: 1, failed: 1 })
        );
    }
    assert_eq!(drain_lines(&rx, Duration::from_millis(100)).len(), 4);
}

#[test]
fn malformed_endpoint_aborts_startup() {
    init_test_tracing();

    let config = clock_config(vec!["127.0.0.1:4444".into(), "[::1:4444".into()]);
    let err = runtime::start(&config, Shutdown::new()).err().expect("startup must fail");
    assert!(matches!(err, StartupError::Resolve(_)));
    assert!(err.shows_usage());
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn unresolvable_endpoint_aborts_startup() {
    init_test_tracing();

    let config = clock_config(vec!["no-such-host.invalid:4444".into()]);
    let err = runtime::start(&config, Shutdown::new()).err().expect("startup must fail");
    assert!(err.to_string().contains("no-such-host.invalid"));
}
