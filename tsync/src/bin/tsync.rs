//! tsync: mirror the JACK transport to UDP listeners.
//!
//! # Usage
//!
//! ```sh
//! tsync 192.168.1.20:4444 [::1]:4444
//! tsync --simulate --bpm 96 localhost:4444
//! ```
//!
//! # Exit status
//!
//! - `0`: stopped by SIGINT/SIGTERM
//! - `1`: startup failure, or the JACK server shut the client down

use std::process;
use std::str::FromStr;
use std::time::Duration;

use tsync::runtime::{self, Shutdown, SourceKind, StartupError, StopReason, SyncConfig};
use tsync::transport::clock::ClockSettings;

fn main() {
    tsync::init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map_or("tsync", String::as_str);

    let config = match parse_args(args.get(1..).unwrap_or_default()) {
        Ok(Some(config)) => config,
        Ok(None) => {
            print_usage(program);
            process::exit(0);
        }
        Err(e) => fail(program, &e),
    };

    let shutdown = Shutdown::new();
    let interrupt = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = interrupt.request(StopReason::Interrupted);
    }) {
        eprintln!("{program}: cannot install signal handler: {e}");
        process::exit(1);
    }

    let mut scheduler = match runtime::start(&config, shutdown) {
        Ok(scheduler) => scheduler,
        Err(e) => fail(program, &e),
    };

    eprintln!(
        "{program}: sending to {} target(s) every {} us",
        scheduler.broadcaster().targets().len(),
        scheduler.period_micros()
    );

    let reason = scheduler.run();
    match reason {
        StopReason::Interrupted => eprintln!("{program}: interrupted"),
        StopReason::ProviderShutdown => eprintln!("{program}: transport provider shut down"),
    }
    process::exit(reason.exit_code());
}

fn fail(program: &str, e: &StartupError) -> ! {
    eprintln!("{program}: {e}");
    if e.shows_usage() {
        print_usage(program);
    }
    process::exit(e.exit_code());
}

/// Parses arguments after the program name. `Ok(None)` means help was
/// requested.
fn parse_args(args: &[String]) -> Result<Option<SyncConfig>, StartupError> {
    let mut config = SyncConfig::default();
    let mut simulate = false;
    let mut clock = ClockSettings::default();

    let mut args = args.iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--period" | "-p" => {
                config.period = Duration::from_micros(value(arg, args.next())?);
            }
            "--name" | "-n" => {
                config.client_name = required(arg, args.next())?.to_owned();
            }
            "--sndbuf" => {
                config.send_buffer_size = Some(value(arg, args.next())?);
            }
            "--simulate" | "-s" => simulate = true,
            "--bpm" => {
                clock.beats_per_minute = value(arg, args.next())?;
                if !(clock.beats_per_minute.is_finite() && clock.beats_per_minute > 0.0) {
                    return Err(StartupError::Usage("--bpm must be positive".into()));
                }
            }
            "--rate" => {
                clock.frame_rate = value(arg, args.next())?;
                if clock.frame_rate == 0 {
                    return Err(StartupError::Usage("--rate must be positive".into()));
                }
            }
            "--help" | "-h" => return Ok(None),
            flag if flag.starts_with('-') => {
                return Err(StartupError::Usage(format!("unknown argument: {flag}")));
            }
            endpoint => config.endpoints.push(endpoint.to_owned()),
        }
    }

    if simulate {
        config.source = SourceKind::Clock(clock);
    }
    if config.endpoints.is_empty() {
        return Err(StartupError::Usage("at least one endpoint is required".into()));
    }
    Ok(Some(config))
}

fn required<'a>(flag: &str, value: Option<&'a String>) -> Result<&'a str, StartupError> {
    value
        .map(String::as_str)
        .ok_or_else(|| StartupError::Usage(format!("missing value for {flag}")))
}

fn value<T: FromStr>(flag: &str, raw: Option<&String>) -> Result<T, StartupError> {
    let raw = required(flag, raw)?;
    raw.parse()
        .map_err(|_| StartupError::Usage(format!("invalid value for {flag}: {raw}")))
}

fn print_usage(program: &str) {
    eprintln!(
        r#"usage: {program} [OPTIONS] HOST:PORT [HOST:PORT]...

Send the JACK transport state to every HOST:PORT as one UDP line per period.
IPv6 literals are written in brackets: [::1]:4444

OPTIONS:
    -p, --period <MICROS>   Sampling period in microseconds (default: 10000)
    -n, --name <NAME>       JACK client name (default: tsync)
        --sndbuf <BYTES>    Socket send buffer size
    -s, --simulate          Use a free-running clock instead of JACK
        --bpm <BPM>         Tempo of the simulated clock (default: 120)
        --rate <HZ>         Frame rate of the simulated clock (default: 48000)
    -h, --help              Print this help message

SIGNALS:
    SIGINT, SIGTERM         Stop after the current tick (exit status 0)
"#
    );
}
