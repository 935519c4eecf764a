pub mod jobs;
pub mod path;

use std::io::{self, Stdin};
use std::os::fd::{AsFd, BorrowedFd};

use nix::sys::signal::{self, Signal};
use nix::sys::termios::{self, Termios};
use nix::unistd::{self, Pid};

use crate::sys::{self, SavedDispositions};

/// Process-wide shell state: who owns the terminal and how to give it back.
pub struct Session {
    terminal: Stdin,
    interactive: bool,
    modes: Option<Termios>,
    pgid: Pid,
}

impl Session {
    /// Set up the session for standard input. On a terminal this waits until
    /// the shell is in the foreground and then takes control of the terminal;
    /// if any of that fails the shell carries on without job control.
    pub fn init() -> Session {
        if !sys::stdin_is_tty() {
            debug!("stdin is not a terminal, running non-interactively");
            return Session::detached();
        }
        match Session::claim_terminal(io::stdin()) {
            Ok(session) => {
                info!("interactive session, process group {}", session.pgid);
                session
            }
            Err(errno) => {
                warn!("no job control ({}), running non-interactively", errno);
                Session::detached()
            }
        }
    }

    /// A session that never touches the terminal.
    pub fn detached() -> Session {
        Session {
            terminal: io::stdin(),
            interactive: false,
            modes: None,
            pgid: unistd::getpgrp(),
        }
    }

    /// Take the terminal for the shell's own process group. A failure leaves
    /// the process as it found it: signal dispositions and process group are
    /// put back before the error is returned.
    fn claim_terminal(terminal: Stdin) -> nix::Result<Session> {
        // Stop ourselves until whoever started us puts us in the foreground.
        loop {
            let pgrp = unistd::getpgrp();
            if unistd::tcgetpgrp(terminal.as_fd())? == pgrp {
                break;
            }
            signal::killpg(pgrp, Signal::SIGTTIN)?;
        }

        let mut dispositions = SavedDispositions::new();
        let original = unistd::getpgrp();
        match Session::take_control(terminal.as_fd(), &mut dispositions) {
            Ok((pgid, modes)) => Ok(Session {
                terminal,
                interactive: true,
                modes: Some(modes),
                pgid,
            }),
            Err(errno) => {
                if unistd::getpgrp() != original {
                    if let Err(e) = unistd::setpgid(Pid::from_raw(0), original) {
                        warn!("cannot return to process group {}: {}", original, e);
                    }
                }
                dispositions.restore();
                Err(errno)
            }
        }
    }

    fn take_control(
        terminal: BorrowedFd<'_>,
        dispositions: &mut SavedDispositions,
    ) -> nix::Result<(Pid, Termios)> {
        // SIGTTOU first: tcsetpgrp from a group that is not yet in the
        // foreground would otherwise stop the shell.
        for sig in [Signal::SIGTTOU, Signal::SIGQUIT, Signal::SIGTSTP, Signal::SIGTTIN] {
            dispositions.ignore(sig)?;
        }
        dispositions.replace(Signal::SIGINT, &jobs::interrupt_relay())?;

        let pid = unistd::getpid();
        if unistd::getpgrp() != pid {
            if let Err(errno) = unistd::setpgid(pid, pid) {
                debug!("could not lead a process group: {}", errno);
            }
        }
        let pgid = unistd::getpgrp();
        unistd::tcsetpgrp(terminal, pgid)?;
        let modes = termios::tcgetattr(terminal)?;
        Ok((pgid, modes))
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// The controlling terminal, when the shell does job control on it.
    pub fn terminal(&self) -> Option<BorrowedFd<'_>> {
        if self.interactive {
            Some(self.terminal.as_fd())
        } else {
            None
        }
    }

    pub fn pgid(&self) -> Pid {
        self.pgid
    }

    pub fn saved_modes(&self) -> Option<&Termios> {
        self.modes.as_ref()
    }

    pub fn foreground_child(&self) -> Option<Pid> {
        jobs::foreground_child()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detached_session_has_no_terminal() {
        let session = Session::detached();
        assert!(!session.is_interactive());
        assert!(session.terminal().is_none());
        assert!(session.saved_modes().is_none());
        assert_eq!(session.pgid(), unistd::getpgrp());
    }
}
