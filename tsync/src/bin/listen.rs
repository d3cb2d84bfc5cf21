//! tsync-listen: print the transport lines arriving on a UDP port.
//!
//! ```sh
//! tsync-listen               # binds 0.0.0.0:4444
//! tsync-listen [::]:4444
//! ```
//!
//! Prints every state change and, while rolling, the position about once a
//! second.

use std::io;
use std::net::SocketAddr;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use mio::{Events, Interest, Poll, Token};

use tsync::broadcast::{Sample, parse_line};
use tsync::net::UdpSocket;
use tsync::transport::TransportState;

const DEFAULT_BIND: &str = "0.0.0.0:4444";
const SOCKET: Token = Token(0);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn main() {
    tsync::init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map_or("tsync-listen", String::as_str);
    if args.iter().skip(1).any(|a| a == "-h" || a == "--help") || args.len() > 2 {
        eprintln!("usage: {program} [BIND_ADDR]   (default: {DEFAULT_BIND})");
        process::exit(i32::from(args.len() > 2));
    }

    let bind = args.get(1).map_or(DEFAULT_BIND, String::as_str);
    let bind: SocketAddr = match bind.parse() {
        Ok(addr) => addr,
        Err(e) => {
            eprintln!("{program}: invalid bind address {bind}: {e}");
            process::exit(1);
        }
    };

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    if let Err(e) = ctrlc::set_handler(move || r.store(false, Ordering::SeqCst)) {
        eprintln!("{program}: cannot install signal handler: {e}");
        process::exit(1);
    }

    if let Err(e) = listen(bind, &running) {
        eprintln!("{program}: {e}");
        process::exit(1);
    }
}

fn listen(bind: SocketAddr, running: &AtomicBool) -> io::Result<()> {
    let mut socket = UdpSocket::bind(bind)?;
    let mut poll = Poll::new()?;
    poll.registry()
        .register(&mut socket, SOCKET, Interest::READABLE)?;
    let mut events = Events::with_capacity(8);

    eprintln!("listening on {}", socket.local_addr()?);

    let mut printer = Printer::default();
    let mut buf = [0u8; 2048];
    while running.load(Ordering::SeqCst) {
        match poll.poll(&mut events, Some(POLL_INTERVAL)) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
        if events.is_empty() {
            continue;
        }
        // Edge-triggered: drain everything queued.
        while let Some((len, from)) = socket.try_recv_from(&mut buf)? {
            match parse_line(&buf[..len]) {
                Ok(sample) => printer.show(&sample),
                Err(e) => eprintln!("{from}: {e}"),
            }
        }
    }
    Ok(())
}

#[derive(Default)]
struct Printer {
    state: Option<TransportState>,
    last_second: Option<u64>,
}

impl Printer {
    fn show(&mut self, sample: &Sample) {
        let snapshot = &sample.snapshot;
        let position = sample.position_secs().unwrap_or(0.0);
        let second = position as u64;

        let changed = self.state != Some(snapshot.state);
        let tick_over = snapshot.state.is_moving() && self.last_second != Some(second);
        if changed || tick_over {
            println!(
                "{:>10.3}s  {:>4}:{}:{:<4}  {:>7.2} bpm  {}",
                position,
                snapshot.bar,
                snapshot.beat,
                snapshot.tick,
                snapshot.beats_per_minute,
                snapshot.state
            );
        }
        self.state = Some(snapshot.state);
        self.last_second = Some(second);
    }
}
