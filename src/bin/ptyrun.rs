//! Ptyrun - run a command in a child PTY
//!
//! Spawns the command attached to a pseudo-terminal and relays bytes
//! between this process's stdin/stdout and the PTY, so the command
//! believes it is running interactively.

use std::io;
use std::process::ExitCode;

use ptyrun::cli;
use ptyrun::relay;
use ptyrun::signal;
use ptyrun::Child;

use nix::sys::signal::Signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Usage diagnostics share the usage text's stream (stdout).
const USAGE_EXIT_CODE: u8 = 2;

fn main() -> ExitCode {
    // Logging goes to stderr; stdout carries the relayed bytes.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        print_usage();
        return ExitCode::from(USAGE_EXIT_CODE);
    }

    let base = cli::host_window_size().unwrap_or_default();
    let invocation = match cli::parse(&args, base) {
        Ok(invocation) => invocation,
        Err(e) => {
            println!("{e}");
            return ExitCode::from(USAGE_EXIT_CODE);
        }
    };

    let child = match Child::spawn(&invocation.command, invocation.size) {
        Ok(child) => child,
        Err(e) => {
            eprintln!("ptyrun: {e}");
            return ExitCode::FAILURE;
        }
    };
    tracing::debug!(
        pid = %child.pid(),
        cols = invocation.size.cols,
        rows = invocation.size.rows,
        "session started"
    );

    if invocation.forward_interrupt {
        if let Err(e) = signal::enable(Signal::SIGINT) {
            eprintln!("ptyrun: {e}");
            return ExitCode::FAILURE;
        }
    }

    match relay::run(child) {
        // EOF on either side is a clean shutdown.
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ptyrun: {e}");
            ExitCode::FAILURE
        }
    }
}

fn print_usage() {
    println!("Usage: ptyrun [<switches>] [--] <command...>");
    println!();
    println!("Runs command in a child PTY with input/output exposed as stdin/stdout.");
    println!();
    println!("Window options:");
    println!("  -w <columns>  Width of the PTY in columns");
    println!("  -h <rows>     Height of the PTY in rows");
    println!();
    println!("  When run interactively, the PTY defaults to the dimensions of the");
    println!("  host terminal. Otherwise it defaults to 80 by 25.");
    println!();
    println!("Misc options:");
    println!("  -c            Forward SIGINT to the child PTY.");
}
