use std::io;
use std::process::{Command, ExitStatus};

#[cfg(unix)]
use std::os::unix::process::ExitStatusExt;
#[cfg(unix)]
use std::sync::atomic::{AtomicBool, Ordering};

pub(crate) struct ForegroundRun {
    pub(crate) status: ExitStatus,
    pub(crate) interrupted: bool,
}

#[cfg(unix)]
static SIGINT_SEEN: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
extern "C" fn record_sigint(_signum: libc::c_int) {
    SIGINT_SEEN.store(true, Ordering::SeqCst);
}

#[cfg(unix)]
struct ScopedSigaction {
    signum: libc::c_int,
    old_action: libc::sigaction,
}

#[cfg(unix)]
impl ScopedSigaction {
    fn install(signum: libc::c_int, handler: libc::sighandler_t) -> io::Result<Self> {
        unsafe {
            let mut new_action: libc::sigaction = std::mem::zeroed();
            new_action.sa_sigaction = handler;
            libc::sigemptyset(&mut new_action.sa_mask);
            new_action.sa_flags = 0;

            let mut old_action: libc::sigaction = std::mem::zeroed();
            if libc::sigaction(signum, &new_action, &mut old_action) != 0 {
                return Err(io::Error::last_os_error());
            }

            Ok(Self { signum, old_action })
        }
    }
}

#[cfg(unix)]
impl Drop for ScopedSigaction {
    fn drop(&mut self) {
        unsafe {
            let _ = libc::sigaction(self.signum, &self.old_action, std::ptr::null_mut());
        }
    }
}

/// Runs `cmd` to completion in the foreground. Ctrl+C still reaches the
/// child (handlers reset to default across exec) but only marks this
/// process as interrupted, so the caller can stop cleanly afterwards.
#[cfg(unix)]
pub(crate) fn run_foreground(cmd: &mut Command) -> io::Result<ForegroundRun> {
    SIGINT_SEEN.store(false, Ordering::SeqCst);
    let _sigint_guard = ScopedSigaction::install(
        libc::SIGINT,
        record_sigint as extern "C" fn(libc::c_int) as libc::sighandler_t,
    )?;
    let status = cmd.status()?;
    let interrupted =
        SIGINT_SEEN.load(Ordering::SeqCst) || status.signal() == Some(libc::SIGINT);
    Ok(ForegroundRun {
        status,
        interrupted,
    })
}

#[cfg(not(unix))]
pub(crate) fn run_foreground(cmd: &mut Command) -> io::Result<ForegroundRun> {
    let status = cmd.status()?;
    Ok(ForegroundRun {
        status,
        interrupted: false,
    })
}
