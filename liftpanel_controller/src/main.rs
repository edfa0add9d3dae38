// CLI entry point for the liftpanel relay controller.
//
// Starts a standalone controller that panel clients connect to. See
// `server.rs` for the networking architecture and `bank.rs` for the relay
// state model.
//
// Usage:
//   liftpanel [OPTIONS]
//     --port <PORT>     Listen port (default: 81)
//     --verbose, -v     More log output (repeatable)
//     --quiet           Errors only

use std::thread;
use std::time::Duration;

use liftpanel_controller::gpio::SysfsOutputs;
use liftpanel_controller::server::{ControllerConfig, start_controller};
use log::error;

struct Args {
    config: ControllerConfig,
    verbosity: usize,
    quiet: bool,
}

fn main() {
    let args = parse_args();

    if let Err(e) = stderrlog::new()
        .verbosity(args.verbosity)
        .quiet(args.quiet)
        .timestamp(stderrlog::Timestamp::Second)
        .init()
    {
        eprintln!("failed to initialize logging: {e}");
    }

    let (_handle, _addr) = match start_controller(args.config, SysfsOutputs::new()) {
        Ok(result) => result,
        Err(e) => {
            error!("failed to start controller: {e}");
            std::process::exit(1);
        }
    };

    // The event loop runs on background threads; park here. The process
    // exits on SIGINT/SIGTERM by default, which tears the threads down —
    // relay state is not persisted, so there is nothing to flush.
    loop {
        thread::sleep(Duration::from_millis(500));
    }
}

/// Parse command-line arguments. Uses simple `std::env::args()` matching —
/// no CLI framework needed for three flags.
fn parse_args() -> Args {
    let mut args = Args {
        config: ControllerConfig::default(),
        verbosity: 2,
        quiet: false,
    };
    let argv: Vec<String> = std::env::args().collect();
    let mut i = 1;

    while i < argv.len() {
        match argv[i].as_str() {
            "--port" => {
                i += 1;
                args.config.port = argv.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("--port requires a valid port number");
                    std::process::exit(1);
                });
            }
            "--verbose" | "-v" => {
                args.verbosity += 1;
            }
            "--quiet" => {
                args.quiet = true;
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    args
}

fn print_usage() {
    println!("Usage: liftpanel [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --port <PORT>     Listen port (default: 81)");
    println!("  --verbose, -v     More log output (repeatable)");
    println!("  --quiet           Errors only");
    println!("  --help, -h        Show this help");
}
