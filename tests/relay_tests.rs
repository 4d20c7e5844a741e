//! Integration tests for the PTY relay
//!
//! These tests drive `relay::run_between` end-to-end with real PTYs and
//! real child processes, substituting pipes for the caller's stdio.

use std::fs::File;
use std::io::{Read, Write};
use std::os::fd::{AsFd, FromRawFd, OwnedFd};
use std::thread;
use std::time::{Duration, Instant};

use ptyrun::relay::{self, Shutdown};
use ptyrun::{Child, WindowSize};

/// `nix::unistd::pipe` returns raw fds on this nix version; wrap them so the
/// ends own their descriptors (close on drop) like these tests expect.
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

/// Drain everything the relay wrote to its output pipe.
///
/// The write end must already be closed so the read sees EOF.
fn read_relayed_output(read_end: std::os::fd::OwnedFd) -> Vec<u8> {
    let mut received = Vec::new();
    File::from(read_end)
        .read_to_end(&mut received)
        .expect("Failed to drain relay output");
    received
}

#[test]
fn test_relay_forwards_child_output_until_child_exits() {
    let mut child = Child::spawn(&["/bin/echo", "relay-bytes-test"], WindowSize::new(80, 25))
        .expect("Failed to spawn echo");

    let (in_read, _in_write) = pipe().expect("Failed to create input pipe");
    let (out_read, out_write) = pipe().expect("Failed to create output pipe");

    let shutdown = relay::run_between(&mut child, in_read.as_fd(), out_write.as_fd())
        .expect("Relay failed");
    assert_eq!(shutdown, Shutdown::ChildClosed);
    assert!(!child.is_running());

    drop(out_write);
    let output = read_relayed_output(out_read);
    let text = String::from_utf8_lossy(&output);
    assert!(
        text.contains("relay-bytes-test"),
        "Expected relayed output, got: {text}"
    );
}

#[test]
fn test_relay_preserves_output_order_across_chunks() {
    // seq's output is well over one relay chunk, so this exercises
    // multi-chunk forwarding. The line discipline turns \n into \r\n.
    let mut child = Child::spawn(&["/bin/sh", "-c", "seq 1 500"], WindowSize::new(80, 25))
        .expect("Failed to spawn seq");

    let (in_read, _in_write) = pipe().expect("Failed to create input pipe");
    let (out_read, out_write) = pipe().expect("Failed to create output pipe");

    let shutdown = relay::run_between(&mut child, in_read.as_fd(), out_write.as_fd())
        .expect("Relay failed");
    assert_eq!(shutdown, Shutdown::ChildClosed);

    drop(out_write);
    let output = read_relayed_output(out_read);
    let text = String::from_utf8_lossy(&output);

    let expected: String = (1..=500).map(|i| format!("{i}\r\n")).collect();
    assert_eq!(text, expected);
}

#[test]
fn test_relay_input_eof_terminates_child() {
    let mut child =
        Child::spawn(&["/bin/cat"], WindowSize::new(80, 25)).expect("Failed to spawn cat");

    let (in_read, in_write) = pipe().expect("Failed to create input pipe");
    let (out_read, out_write) = pipe().expect("Failed to create output pipe");

    // Preload the input and close it; the relay forwards the bytes, sees
    // EOF, and tears the still-running child down.
    let mut writer = File::from(in_write);
    writer.write_all(b"last words\n").expect("Failed to write");
    drop(writer);

    let shutdown = relay::run_between(&mut child, in_read.as_fd(), out_write.as_fd())
        .expect("Relay failed");
    assert_eq!(shutdown, Shutdown::InputClosed);
    assert!(!child.is_running());

    drop(out_write);
    drop(out_read);
}

#[test]
fn test_relay_forwards_input_in_order() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let sink = dir.path().join("sink");
    let command = format!("cat > {}", sink.display());

    let mut child = Child::spawn(&["/bin/sh", "-c", &command], WindowSize::new(80, 25))
        .expect("Failed to spawn sink shell");

    let (in_read, in_write) = pipe().expect("Failed to create input pipe");
    let (out_read, out_write) = pipe().expect("Failed to create output pipe");

    let chunks: [&[u8]; 3] = [b"alpha\n", b"bravo charlie\n", b"delta\n"];
    let expected: Vec<u8> = chunks.concat();

    let shutdown = thread::scope(|s| {
        let relay_thread =
            s.spawn(|| relay::run_between(&mut child, in_read.as_fd(), out_write.as_fd()));

        let mut writer = File::from(in_write);
        for chunk in chunks {
            writer.write_all(chunk).expect("Failed to write chunk");
        }

        // Wait for the bytes to land in the sink file before closing the
        // input, so the teardown cannot race the child's reads.
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if std::fs::read(&sink).map(|data| data == expected).unwrap_or(false) {
                break;
            }
            assert!(Instant::now() < deadline, "sink file never filled");
            thread::sleep(Duration::from_millis(20));
        }

        drop(writer);
        relay_thread.join().expect("Relay thread panicked")
    })
    .expect("Relay failed");

    assert_eq!(shutdown, Shutdown::InputClosed);
    assert!(!child.is_running());
    assert_eq!(std::fs::read(&sink).expect("Failed to read sink"), expected);

    drop(out_write);
    drop(out_read);
}

#[test]
fn test_relay_treats_exec_failure_as_child_closed() {
    // Exec failure cannot be reported synchronously; it shows up as the
    // child hanging up before producing output.
    let mut child = Child::spawn(
        &["/nonexistent/definitely-not-a-command"],
        WindowSize::new(80, 25),
    )
    .expect("Spawn itself should succeed");

    let (in_read, _in_write) = pipe().expect("Failed to create input pipe");
    let (out_read, out_write) = pipe().expect("Failed to create output pipe");

    let shutdown = relay::run_between(&mut child, in_read.as_fd(), out_write.as_fd())
        .expect("Relay failed");
    assert_eq!(shutdown, Shutdown::ChildClosed);

    drop(out_write);
    let output = read_relayed_output(out_read);
    assert!(output.is_empty(), "Unexpected output: {output:?}");
}

#[test]
fn test_child_observes_requested_geometry() {
    // stty reads the size from the slave, so this checks the child's own
    // view of the geometry, not just the master-side ioctl.
    let mut child = Child::spawn(&["/bin/sh", "-c", "stty size"], WindowSize::new(132, 43))
        .expect("Failed to spawn stty");

    let (in_read, _in_write) = pipe().expect("Failed to create input pipe");
    let (out_read, out_write) = pipe().expect("Failed to create output pipe");

    let shutdown = relay::run_between(&mut child, in_read.as_fd(), out_write.as_fd())
        .expect("Relay failed");
    assert_eq!(shutdown, Shutdown::ChildClosed);

    drop(out_write);
    let output = read_relayed_output(out_read);
    let text = String::from_utf8_lossy(&output);
    assert!(
        text.contains("43 132"),
        "Expected stty to report 43 132, got: {text}"
    );
}
