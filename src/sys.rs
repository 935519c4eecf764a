//! Process-level OS glue: the stdin tty check and signal dispositions the
//! shell changes for itself.
use std::io;

use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};

/// Check whether the shell's standard input is a terminal device.
pub fn stdin_is_tty() -> bool {
    termion::is_tty(&io::stdin())
}

/// Signal dispositions replaced so far, oldest first. [`restore`] puts them
/// back in reverse order; dropping the record keeps the new ones.
///
/// [`restore`]: SavedDispositions::restore
#[derive(Default)]
pub struct SavedDispositions {
    saved: Vec<(Signal, SigAction)>,
}

impl SavedDispositions {
    pub fn new() -> SavedDispositions {
        SavedDispositions::default()
    }

    /// Install `action` for `sig`, remembering what was there before.
    pub fn replace(&mut self, sig: Signal, action: &SigAction) -> nix::Result<()> {
        let previous = unsafe { signal::sigaction(sig, action) }?;
        self.saved.push((sig, previous));
        Ok(())
    }

    pub fn ignore(&mut self, sig: Signal) -> nix::Result<()> {
        let action = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
        self.replace(sig, &action)
    }

    pub fn len(&self) -> usize {
        self.saved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.saved.is_empty()
    }

    pub fn restore(self) {
        for (sig, action) in self.saved.iter().rev() {
            if let Err(errno) = unsafe { signal::sigaction(*sig, action) } {
                warn!("cannot restore the {} disposition: {}", sig, errno);
            }
        }
    }
}
