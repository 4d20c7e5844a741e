//! Command-line parsing and host-terminal geometry resolution
//!
//! Kept separate from the binary so the flag grammar is testable: `-w` and
//! `-h` override the PTY geometry, `-c` opts into SIGINT forwarding, `--`
//! ends option parsing, and everything after the options is the command.

use nix::libc;
use nix::unistd::isatty;

use crate::pty;
use crate::size::WindowSize;

/// A parsed invocation: resolved geometry, forwarding flag, and the command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// PTY geometry for the session
    pub size: WindowSize,
    /// Forward SIGINT to the child instead of dying to it
    pub forward_interrupt: bool,
    /// Program and arguments, never empty
    pub command: Vec<String>,
}

/// A malformed invocation, reported before any PTY work starts
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    #[error("Unknown option '{0}'")]
    UnknownOption(String),

    #[error("Expected PTY width after -w flag")]
    MissingWidth,

    #[error("Expected PTY height after -h flag")]
    MissingHeight,

    #[error("Invalid PTY width '{0}'")]
    InvalidWidth(String),

    #[error("Invalid PTY height '{0}'")]
    InvalidHeight(String),

    #[error("No command specified")]
    NoCommand,
}

/// Parse arguments (without the program name) against a base geometry.
///
/// `base` is what `-w`/`-h` override field-by-field, normally the host
/// terminal's size or the 80x25 default. The returned geometry is clamped
/// to at least 1x1.
pub fn parse(args: &[String], base: WindowSize) -> Result<Invocation, UsageError> {
    let mut size = base;
    let mut forward_interrupt = false;

    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        if !arg.starts_with('-') {
            break;
        }
        if arg == "--" {
            i += 1;
            break;
        }
        if arg.len() != 2 {
            return Err(UsageError::UnknownOption(arg.clone()));
        }
        match arg.as_bytes()[1] {
            b'w' => {
                i += 1;
                let value = args.get(i).ok_or(UsageError::MissingWidth)?;
                size.cols = parse_dimension(value)
                    .ok_or_else(|| UsageError::InvalidWidth(value.clone()))?;
            }
            b'h' => {
                i += 1;
                let value = args.get(i).ok_or(UsageError::MissingHeight)?;
                size.rows = parse_dimension(value)
                    .ok_or_else(|| UsageError::InvalidHeight(value.clone()))?;
            }
            b'c' => forward_interrupt = true,
            _ => return Err(UsageError::UnknownOption(arg.clone())),
        }
        i += 1;
    }

    let command: Vec<String> = args[i..].to_vec();
    if command.is_empty() {
        return Err(UsageError::NoCommand);
    }

    Ok(Invocation {
        size: size.clamped(),
        forward_interrupt,
        command,
    })
}

fn parse_dimension(value: &str) -> Option<u16> {
    value.parse::<u16>().ok().filter(|v| *v > 0)
}

/// Geometry of the host terminal, when stdin actually is one.
///
/// Returns `None` when stdin is not a terminal (redirected input), so the
/// caller falls back to the 80x25 default.
pub fn host_window_size() -> Option<WindowSize> {
    if !isatty(libc::STDIN_FILENO).unwrap_or(false) {
        return None;
    }
    pty::get_window_size(libc::STDIN_FILENO)
        .ok()
        .filter(|ws| ws.cols > 0 && ws.rows > 0)
}
