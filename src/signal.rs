//! Opt-in signal forwarding to the relayed child
//!
//! By default a signal like SIGINT keeps its default disposition and will
//! terminate this process without ever reaching the child. Calling
//! [`enable`] converts delivery of that signal into delivery to the child
//! instead. The asymmetry is deliberate: forwarding is an explicit opt-in.
//!
//! Signal handlers cannot receive parameters, so the target pid lives in a
//! process-wide atomic. The relay publishes the child's pid right before it
//! enters its wait loop and clears it on the way out; a handler firing
//! outside that window is a no-op.

use std::sync::atomic::{AtomicI32, Ordering};

use nix::libc;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::unistd::Pid;

use crate::error::{Error, Result};

static FORWARD_TARGET: AtomicI32 = AtomicI32::new(0);

/// Publish the pid that installed handlers forward to.
pub fn set_forward_target(pid: Pid) {
    FORWARD_TARGET.store(pid.as_raw(), Ordering::SeqCst);
}

/// Invalidate the forwarding target; subsequent deliveries are dropped.
pub fn clear_forward_target() {
    FORWARD_TARGET.store(0, Ordering::SeqCst);
}

/// Install a handler that forwards `signal` to the published target pid.
///
/// Process-wide and in effect for the lifetime of the process. The handler
/// does exactly one async-signal-safe thing (`kill(2)` on the stored pid),
/// so it is safe to run while the relay is suspended in its wait; the
/// interrupted wait sees EINTR and retries.
pub fn enable(signal: Signal) -> Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(forward_handler),
        SaFlags::empty(),
        SigSet::empty(),
    );

    // SAFETY: forward_handler only performs an atomic load and kill(2),
    // both async-signal-safe
    unsafe { sigaction(signal, &action) }.map_err(Error::Sigaction)?;
    Ok(())
}

extern "C" fn forward_handler(sig: libc::c_int) {
    deliver(sig);
}

fn deliver(sig: libc::c_int) {
    let pid = FORWARD_TARGET.load(Ordering::SeqCst);
    if pid > 0 {
        // SAFETY: kill is async-signal-safe; a stale pid at worst hits
        // nothing (ESRCH), never a different process group
        unsafe { libc::kill(pid, sig) };
    }
}
