//! Ptyrun library
//!
//! Runs a command attached to a pseudo-terminal and relays bytes between
//! the caller's standard streams and the PTY master, so programs that
//! behave differently under a terminal (line buffering, color, prompts)
//! can be driven through plain pipes:
//!
//! - `pty`: PTY master allocation and window-size control
//! - `child`: child process spawning with proper session setup
//! - `relay`: the readiness-driven stdio <-> PTY byte relay
//! - `signal`: opt-in SIGINT forwarding to the child
//! - `cli`: flag parsing and host-terminal geometry resolution

pub mod child;
pub mod cli;
pub mod error;
pub mod pty;
pub mod relay;
pub mod signal;
pub mod size;

pub use child::Child;
pub use error::{Error, Result};
pub use pty::Pty;
pub use size::WindowSize;
