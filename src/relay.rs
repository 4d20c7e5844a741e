//! Bidirectional relay between the caller's stdio and a child PTY
//!
//! The heart of the tool: a single-threaded, readiness-driven loop that
//! blocks in `poll(2)` over exactly two descriptors (the caller's input and
//! the PTY master) and copies bytes between them until either side closes.

use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd};

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags};
use nix::unistd;

use crate::child::Child;
use crate::error::{Error, Result};
use crate::signal;

/// Bytes moved per wake, in each direction
pub const CHUNK_SIZE: usize = 1024;

/// Why the relay stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    /// The caller's input reached EOF or reported an error condition
    InputClosed,
    /// The child closed its side of the terminal, usually by exiting
    ChildClosed,
}

/// Relay between the process's stdin/stdout and the child's terminal.
///
/// Blocks until either endpoint closes or a fatal I/O error occurs. The
/// child is torn down (terminated and reaped, best effort) before this
/// returns, whatever the outcome.
pub fn run(mut child: Child) -> Result<Shutdown> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    run_between(&mut child, stdin.as_fd(), stdout.as_fd())
}

/// Like [`run`], but relaying over explicit descriptors.
pub fn run_between(
    child: &mut Child,
    input: BorrowedFd<'_>,
    output: BorrowedFd<'_>,
) -> Result<Shutdown> {
    // The forwarding target is only valid while the loop runs.
    signal::set_forward_target(child.pid());
    let outcome = relay_loop(child, input, output);
    signal::clear_forward_target();

    child.terminate();

    if let Ok(shutdown) = &outcome {
        tracing::debug!(?shutdown, "relay finished");
    }
    outcome
}

fn relay_loop(child: &Child, input: BorrowedFd<'_>, output: BorrowedFd<'_>) -> Result<Shutdown> {
    let master = child.pty().as_fd();
    let mut buf = [0u8; CHUNK_SIZE];

    loop {
        let mut fds = [
            PollFd::new(&input, PollFlags::POLLIN),
            PollFd::new(&master, PollFlags::POLLIN),
        ];

        match poll(&mut fds, -1) {
            Ok(_) => {}
            // A forwarded signal interrupts the wait; retry, never fail.
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(Error::Poll(e)),
        }

        let input_ready = fds[0].revents().unwrap_or(PollFlags::empty());
        let master_ready = fds[1].revents().unwrap_or(PollFlags::empty());

        // Fixed priority: input is serviced before child output when both
        // are ready, one read per wake, so interleaving is deterministic.
        if input_ready.contains(PollFlags::POLLIN) {
            match unistd::read(input.as_raw_fd(), &mut buf) {
                Ok(0) => return Ok(Shutdown::InputClosed),
                Ok(n) => write_all(master, &buf[..n])?,
                Err(Errno::EINTR) => {}
                Err(e) => return Err(Error::Read(e)),
            }
        } else if master_ready.contains(PollFlags::POLLIN) {
            match unistd::read(master.as_raw_fd(), &mut buf) {
                Ok(0) => return Ok(Shutdown::ChildClosed),
                Ok(n) => write_all(output, &buf[..n])?,
                Err(Errno::EINTR) => {}
                // Linux reports EIO on the master once the slave side is
                // gone; that is the child hanging up, not a failure.
                Err(Errno::EIO) => return Ok(Shutdown::ChildClosed),
                Err(e) => return Err(Error::Read(e)),
            }
        } else if input_ready.intersects(hangup_flags()) {
            // An error condition on input ends the session the same way
            // EOF does.
            return Ok(Shutdown::InputClosed);
        } else if master_ready.intersects(hangup_flags()) {
            return Ok(Shutdown::ChildClosed);
        }
    }
}

fn hangup_flags() -> PollFlags {
    PollFlags::POLLERR | PollFlags::POLLHUP | PollFlags::POLLNVAL
}

/// Write the whole buffer, retrying short writes so no bytes are dropped.
fn write_all(fd: BorrowedFd<'_>, mut data: &[u8]) -> Result<()> {
    while !data.is_empty() {
        match unistd::write(fd.as_raw_fd(), data) {
            Ok(0) => return Err(Error::Write(Errno::EIO)),
            Ok(n) => data = &data[n..],
            Err(Errno::EINTR) => {}
            Err(e) => return Err(Error::Write(e)),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Read;
    use std::os::fd::{AsFd, FromRawFd, OwnedFd};

    /// `nix::unistd::pipe` returns raw fds on this nix version; wrap them so
    /// the ends own their descriptors (close on drop) like the tests expect.
    fn pipe() -> nix::Result<(OwnedFd, OwnedFd)> {
        let (read_end, write_end) = nix::unistd::pipe()?;
        // SAFETY: both fds come straight from pipe(2) and are owned here.
        Ok(unsafe {
            (
                OwnedFd::from_raw_fd(read_end),
                OwnedFd::from_raw_fd(write_end),
            )
        })
    }

    #[test]
    fn test_write_all_delivers_everything() {
        let (read_end, write_end) = pipe().expect("Failed to create pipe");

        let data: Vec<u8> = (0..CHUNK_SIZE).map(|i| (i % 251) as u8).collect();
        write_all(write_end.as_fd(), &data).expect("write_all failed");
        drop(write_end);

        let mut received = Vec::new();
        File::from(read_end)
            .read_to_end(&mut received)
            .expect("Failed to read back");
        assert_eq!(received, data);
    }
}
