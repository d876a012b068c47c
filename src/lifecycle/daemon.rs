//! Detaching from the controlling terminal.
//!
//! Must run before the Tokio runtime or any other thread exists; `fork`
//! only carries the calling thread into the child.

use std::fs::OpenOptions;
use std::io;
use std::os::unix::io::AsRawFd;

/// Double-fork into the background.
///
/// Returns in the grandchild only. The original process and the
/// intermediate child exit with status 0.
pub fn daemonize() -> io::Result<()> {
    fork_and_exit_parent()?;
    // SAFETY: single-threaded at this point; setsid has no memory effects.
    if unsafe { libc::setsid() } < 0 {
        return Err(io::Error::last_os_error());
    }
    fork_and_exit_parent()?;

    std::env::set_current_dir("/")?;
    redirect_stdio()
}

fn fork_and_exit_parent() -> io::Result<()> {
    // SAFETY: called before any other thread is spawned.
    match unsafe { libc::fork() } {
        -1 => Err(io::Error::last_os_error()),
        0 => Ok(()),
        _ => unsafe { libc::_exit(0) },
    }
}

fn redirect_stdio() -> io::Result<()> {
    let devnull = OpenOptions::new()
        .read(true)
        .write(true)
        .open("/dev/null")?;
    let fd = devnull.as_raw_fd();
    for target in [libc::STDIN_FILENO, libc::STDOUT_FILENO, libc::STDERR_FILENO] {
        // SAFETY: both descriptors are valid for the duration of the call.
        if unsafe { libc::dup2(fd, target) } < 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}
