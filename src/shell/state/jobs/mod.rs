//! Parent-side job control: process groups, terminal ownership, the
//! interrupt relay and waiting.
pub mod launch;

use std::fmt;
use std::os::fd::BorrowedFd;
use std::sync::atomic::{AtomicI32, Ordering};

use nix::errno::Errno;
use nix::libc;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::sys::termios::{self, SetArg};
use nix::sys::wait::{self, WaitStatus};
use nix::unistd::{self, Pid};

use super::Session;
use crate::shell::error::{Error, Result};

/// Pid of the foreground child, 0 when there is none. The interrupt
/// handler reads nothing else.
static FOREGROUND: AtomicI32 = AtomicI32::new(0);

extern "C" fn relay_interrupt(_: libc::c_int) {
    let pid = FOREGROUND.load(Ordering::SeqCst);
    if pid > 0 {
        let _ = signal::kill(Pid::from_raw(pid), Signal::SIGINT);
    }
}

/// SIGINT action that forwards the signal to the foreground child. It
/// restarts interrupted reads and waits.
pub fn interrupt_relay() -> SigAction {
    SigAction::new(
        SigHandler::Handler(relay_interrupt),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    )
}

/// Route SIGINT delivered to the shell to the foreground child.
pub fn install_interrupt_relay() -> nix::Result<()> {
    unsafe { signal::sigaction(Signal::SIGINT, &interrupt_relay()) }.map(drop)
}

/// The child currently receiving relayed interrupts.
pub fn foreground_child() -> Option<Pid> {
    match FOREGROUND.load(Ordering::SeqCst) {
        0 => None,
        pid => Some(Pid::from_raw(pid)),
    }
}

/// How a waited-on child finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Exited(i32),
    Signaled(Signal),
}

impl ExitStatus {
    /// Shell-style numeric status: the exit code, or 128 plus the signal.
    pub fn code(&self) -> i32 {
        match *self {
            ExitStatus::Exited(code) => code,
            ExitStatus::Signaled(sig) => 128 + sig as i32,
        }
    }

    pub fn success(&self) -> bool {
        *self == ExitStatus::Exited(0)
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ExitStatus::Exited(code) => write!(f, "exited with status {}", code),
            ExitStatus::Signaled(sig) => write!(f, "killed by {}", sig),
        }
    }
}

/// Hands the terminal to a job's process group and takes it back on drop,
/// restoring the shell's saved terminal modes.
struct TerminalHandoff<'a> {
    session: &'a Session,
    terminal: BorrowedFd<'a>,
}

impl<'a> TerminalHandoff<'a> {
    fn new(session: &'a Session, terminal: BorrowedFd<'a>, group: Pid) -> TerminalHandoff<'a> {
        if let Err(errno) = unistd::tcsetpgrp(terminal, group) {
            debug!("tcsetpgrp({}) failed: {}", group, errno);
        }
        TerminalHandoff { session, terminal }
    }
}

impl<'a> Drop for TerminalHandoff<'a> {
    fn drop(&mut self) {
        if let Err(errno) = unistd::tcsetpgrp(self.terminal, self.session.pgid()) {
            warn!("failed to reclaim the terminal: {}", errno);
        }
        if let Some(modes) = self.session.saved_modes() {
            if let Err(errno) = termios::tcsetattr(self.terminal, SetArg::TCSADRAIN, modes) {
                warn!("failed to restore terminal modes: {}", errno);
            }
        }
    }
}

/// Forget the foreground child once its wait is over, whatever the outcome.
struct ForegroundSlot;

impl ForegroundSlot {
    fn record(child: Pid) -> ForegroundSlot {
        FOREGROUND.store(child.as_raw(), Ordering::SeqCst);
        ForegroundSlot
    }
}

impl Drop for ForegroundSlot {
    fn drop(&mut self) {
        FOREGROUND.store(0, Ordering::SeqCst);
    }
}

/// Put `child` in its own process group, give it the terminal if the session
/// is interactive, and block until it exits.
pub fn run_foreground(session: &Session, child: Pid) -> Result<ExitStatus> {
    if let Err(errno) = unistd::setpgid(child, child) {
        // EACCES once the child has exec'd; it moved itself already
        debug!("setpgid({}) from the shell: {}", child, errno);
    }
    let _slot = ForegroundSlot::record(child);
    if let Err(errno) = install_interrupt_relay() {
        warn!("cannot relay interrupts to {}: {}", child, errno);
    }
    if let Err(errno) = unsafe { signal::signal(Signal::SIGTTOU, SigHandler::SigIgn) } {
        warn!("cannot ignore SIGTTOU: {}", errno);
    }
    let _handoff = session
        .terminal()
        .map(|terminal| TerminalHandoff::new(session, terminal, child));
    let status = wait_for(child)?;
    debug!("{} {}", child, status);
    Ok(status)
}

/// Leave `child` running. It is collected later by [`wait_all`].
pub fn run_background(child: Pid) {
    info!("{} running in the background", child);
}

fn wait_for(child: Pid) -> Result<ExitStatus> {
    loop {
        match wait::waitpid(child, None) {
            Ok(WaitStatus::Exited(_, code)) => return Ok(ExitStatus::Exited(code)),
            Ok(WaitStatus::Signaled(_, sig, _)) => return Ok(ExitStatus::Signaled(sig)),
            Ok(other) => debug!("{} changed state: {:?}", child, other),
            Err(Errno::EINTR) => continue,
            Err(errno) => return Err(Error::Wait(errno)),
        }
    }
}

/// Reap any terminated children until none remain. Returns how many were
/// collected.
pub fn wait_all() -> Result<usize> {
    let mut reaped = 0;
    loop {
        match wait::wait() {
            Ok(status) => {
                debug!("reaped {:?}", status);
                reaped += 1;
            }
            Err(Errno::ECHILD) => return Ok(reaped),
            Err(Errno::EINTR) => continue,
            Err(errno) => return Err(Error::Wait(errno)),
        }
    }
}
