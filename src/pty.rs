//! PTY (pseudoterminal) master allocation and window-size control
//!
//! Handles creation of the PTY master and the ioctls that report and set the
//! terminal geometry the child will observe.

use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::libc;
use nix::poll::{poll, PollFd, PollFlags};
use nix::pty::{grantpt, posix_openpt, ptsname, unlockpt, PtyMaster};
use nix::unistd;

use crate::error::{Error, Result};
use crate::size::WindowSize;

/// A pseudoterminal master
pub struct Pty {
    /// The PTY master file descriptor
    master: PtyMaster,
    /// Path to the slave PTY
    slave_path: String,
}

impl Pty {
    /// Allocate a new PTY master and unlock its slave side.
    pub fn open() -> Result<Self> {
        let master = posix_openpt(OFlag::O_RDWR | OFlag::O_NOCTTY).map_err(Error::OpenMaster)?;
        grantpt(&master).map_err(Error::GrantPty)?;
        unlockpt(&master).map_err(Error::UnlockPty)?;

        // SAFETY: ptsname is not thread-safe, but we call it immediately
        // after unlockpt, before any other thread could interfere
        let slave_path = unsafe { ptsname(&master) }.map_err(Error::PtsName)?;

        Ok(Self { master, slave_path })
    }

    /// Path to the slave side of this PTY
    pub fn slave_path(&self) -> &str {
        &self.slave_path
    }

    /// Set the window size reported to the child
    pub fn set_window_size(&self, size: WindowSize) -> Result<()> {
        let ws = size.to_winsize();

        // SAFETY: TIOCSWINSZ is a valid ioctl for setting window size
        let result = unsafe { libc::ioctl(self.master.as_raw_fd(), libc::TIOCSWINSZ, &ws) };

        if result < 0 {
            Err(Error::SetWinsize(Errno::last()))
        } else {
            Ok(())
        }
    }

    /// Get the window size currently reported by this PTY
    pub fn get_window_size(&self) -> Result<WindowSize> {
        get_window_size(self.master.as_raw_fd())
    }

    /// Read from the PTY master
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        unistd::read(self.master.as_raw_fd(), buf).map_err(Error::Read)
    }

    /// Write all bytes to the PTY master, retrying on short writes
    pub fn write_all(&self, mut data: &[u8]) -> Result<()> {
        while !data.is_empty() {
            match unistd::write(self.master.as_raw_fd(), data) {
                Ok(0) => return Err(Error::Write(Errno::EIO)),
                Ok(n) => data = &data[n..],
                Err(Errno::EINTR) => {}
                Err(e) => return Err(Error::Write(e)),
            }
        }
        Ok(())
    }

    /// Poll for data available to read
    ///
    /// Returns true if data is available, false if the timeout expired.
    pub fn poll_read(&self, timeout_ms: i32) -> Result<bool> {
        let fd = self.as_fd();
        let mut fds = [PollFd::new(&fd, PollFlags::POLLIN)];
        let n = poll(&mut fds, timeout_ms).map_err(Error::Poll)?;
        Ok(n > 0
            && fds[0]
                .revents()
                .is_some_and(|r| r.contains(PollFlags::POLLIN)))
    }
}

impl AsFd for Pty {
    fn as_fd(&self) -> BorrowedFd<'_> {
        // SAFETY: the master fd is owned by this Pty and stays open for
        // the lifetime of the borrow
        unsafe { BorrowedFd::borrow_raw(self.master.as_raw_fd()) }
    }
}

/// Get the window size from a terminal file descriptor
pub(crate) fn get_window_size(fd: RawFd) -> Result<WindowSize> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };

    // SAFETY: TIOCGWINSZ is a valid ioctl for getting window size
    let result = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut ws) };

    if result < 0 {
        Err(Error::GetWinsize(Errno::last()))
    } else {
        Ok(WindowSize::from(ws))
    }
}
