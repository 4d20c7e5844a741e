//! Child process management for the PTY session
//!
//! Spawns the requested command attached to a freshly allocated PTY: the
//! parent keeps the master, the child makes the slave its controlling
//! terminal and standard streams before exec.

use std::ffi::{CString, OsStr};
use std::os::unix::ffi::OsStrExt;
use std::thread;
use std::time::Duration;

use nix::fcntl::{open, OFlag};
use nix::libc;
use nix::sys::signal::{kill, Signal};
use nix::sys::stat::Mode;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{close, dup2, execvp, fork, setsid, ForkResult, Pid};

use crate::error::{Error, Result};
use crate::pty::Pty;
use crate::size::WindowSize;

/// How long a signaled child gets to exit before SIGKILL.
const TERMINATE_GRACE: Duration = Duration::from_secs(2);
const TERMINATE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A child process attached to a PTY
pub struct Child {
    /// The PTY master
    pty: Pty,
    /// Child process ID
    pid: Pid,
    /// Whether the child has been reaped yet
    alive: bool,
}

impl Child {
    /// Spawn `command` attached to a new PTY with the given window size.
    ///
    /// The first element of `command` is the program, the rest its
    /// arguments. The window size is applied to the PTY before the fork, so
    /// the child's first size query already sees the requested geometry.
    ///
    /// The child inherits the parent's environment and working directory,
    /// and the slave keeps the default terminal modes (echo and canonical
    /// input stay on). An exec failure is visible to the parent only as EOF
    /// on the master; the failed child exits with status 127.
    pub fn spawn<S>(command: &[S], size: WindowSize) -> Result<Self>
    where
        S: AsRef<OsStr>,
    {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| Error::InvalidCommand("empty command".to_string()))?;

        // Build argv before forking; the child must not allocate.
        let program_cstr = CString::new(program.as_ref().as_bytes())
            .map_err(|_| Error::InvalidCommand("program name contains a null byte".to_string()))?;
        let mut argv: Vec<CString> = Vec::with_capacity(command.len());
        argv.push(program_cstr.clone());
        for arg in args {
            argv.push(
                CString::new(arg.as_ref().as_bytes()).map_err(|_| {
                    Error::InvalidCommand("argument contains a null byte".to_string())
                })?,
            );
        }

        let pty = Pty::open()?;
        pty.set_window_size(size)?;

        let slave_path = CString::new(pty.slave_path())
            .map_err(|_| Error::InvalidCommand("slave path contains a null byte".to_string()))?;

        // SAFETY: the child branch only runs async-signal-safe operations
        // and _exits on every failure path
        match unsafe { fork() }.map_err(Error::Fork)? {
            ForkResult::Parent { child } => {
                tracing::debug!(pid = %child, "spawned child in PTY");
                Ok(Self {
                    pty,
                    pid: child,
                    alive: true,
                })
            }
            ForkResult::Child => {
                // The child must never return into the parent's logic: every
                // failure path below ends in _exit.

                // Close the master; the child only talks to the slave.
                drop(pty);

                if setsid().is_err() {
                    unsafe { libc::_exit(1) };
                }

                // First tty opened after setsid becomes the controlling
                // terminal; TIOCSCTTY below makes that explicit.
                let slave_fd = match open(slave_path.as_c_str(), OFlag::O_RDWR, Mode::empty()) {
                    Ok(fd) => fd,
                    Err(_) => unsafe { libc::_exit(1) },
                };

                // SAFETY: TIOCSCTTY on the freshly opened slave; best effort
                // on systems where the open above already adopted it
                unsafe {
                    libc::ioctl(slave_fd, libc::TIOCSCTTY as libc::c_ulong, 0);
                }

                if dup2(slave_fd, libc::STDIN_FILENO).is_err()
                    || dup2(slave_fd, libc::STDOUT_FILENO).is_err()
                    || dup2(slave_fd, libc::STDERR_FILENO).is_err()
                {
                    unsafe { libc::_exit(1) };
                }

                if slave_fd > libc::STDERR_FILENO {
                    let _ = close(slave_fd);
                }

                let _ = execvp(&program_cstr, &argv);

                // Exec failed; the parent can only observe this as EOF on
                // the master. 127 follows the command-not-found convention.
                unsafe { libc::_exit(127) };
            }
        }
    }

    /// Get the PTY master
    pub fn pty(&self) -> &Pty {
        &self.pty
    }

    /// Get the child process ID
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Check if the child process is still running
    pub fn is_running(&mut self) -> bool {
        if !self.alive {
            return false;
        }
        match waitpid(self.pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => true,
            Ok(_) | Err(_) => {
                self.alive = false;
                false
            }
        }
    }

    /// Try to wait for the child (non-blocking)
    pub fn try_wait(&mut self) -> Result<Option<WaitStatus>> {
        if !self.alive {
            return Ok(None);
        }
        match waitpid(self.pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => Ok(None),
            Ok(status) => {
                self.alive = false;
                Ok(Some(status))
            }
            Err(e) => {
                self.alive = false;
                Err(Error::Wait(e))
            }
        }
    }

    /// Send a signal to the child process
    pub fn signal(&self, signal: Signal) -> Result<()> {
        kill(self.pid, signal).map_err(Error::Signal)
    }

    /// Terminate the child: SIGTERM, a bounded grace period, then SIGKILL.
    ///
    /// Best effort; a child that already exited is simply reaped.
    pub fn terminate(&mut self) {
        if !self.alive {
            return;
        }

        if self.signal(Signal::SIGTERM).is_err() {
            // Already gone; reap whatever is left.
            let _ = self.try_wait();
            return;
        }

        let attempts = TERMINATE_GRACE.as_millis() / TERMINATE_POLL_INTERVAL.as_millis();
        for _ in 0..attempts {
            match self.try_wait() {
                Ok(Some(_)) | Err(_) => return,
                Ok(None) => thread::sleep(TERMINATE_POLL_INTERVAL),
            }
        }

        tracing::debug!(pid = %self.pid, "child survived SIGTERM grace period, sending SIGKILL");
        let _ = self.signal(Signal::SIGKILL);
        let _ = waitpid(self.pid, None);
        self.alive = false;
    }

    /// Write all bytes to the child's input
    pub fn write_all(&self, data: &[u8]) -> Result<()> {
        self.pty.write_all(data)
    }

    /// Read from the child's output
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        self.pty.read(buf)
    }
}

impl Drop for Child {
    fn drop(&mut self) {
        if self.alive {
            let _ = waitpid(self.pid, Some(WaitPidFlag::WNOHANG));
        }
    }
}
