//! Error types for PTY session and relay operations

use thiserror::Error;

/// Error type for PTY session and relay operations
#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to open PTY master: {0}")]
    OpenMaster(#[source] nix::Error),

    #[error("Failed to grant PTY access: {0}")]
    GrantPty(#[source] nix::Error),

    #[error("Failed to unlock PTY: {0}")]
    UnlockPty(#[source] nix::Error),

    #[error("Failed to get PTY slave name: {0}")]
    PtsName(#[source] nix::Error),

    #[error("Failed to set window size: {0}")]
    SetWinsize(#[source] nix::Error),

    #[error("Failed to get window size: {0}")]
    GetWinsize(#[source] nix::Error),

    #[error("Failed to fork: {0}")]
    Fork(#[source] nix::Error),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Failed to poll: {0}")]
    Poll(#[source] nix::Error),

    #[error("Failed to read: {0}")]
    Read(#[source] nix::Error),

    #[error("Failed to write: {0}")]
    Write(#[source] nix::Error),

    #[error("Failed to signal child: {0}")]
    Signal(#[source] nix::Error),

    #[error("Failed to wait for child: {0}")]
    Wait(#[source] nix::Error),

    #[error("Failed to install signal handler: {0}")]
    Sigaction(#[source] nix::Error),
}

/// Result type for PTY session and relay operations
pub type Result<T> = std::result::Result<T, Error>;
