//! Fork a child, wire up its standard streams and exec the program.
//!
//! Everything the child needs is prepared in the parent by
//! [`Command::new`]. Between `fork` and `exec` the child only makes
//! system calls: no allocation, no locks, no unwinding back into the shell.
use std::ffi::{CStr, CString};
use std::io;
use std::os::fd::BorrowedFd;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::RawFd;
use std::ptr;

use nix::errno::Errno;
use nix::fcntl::{self, FcntlArg, FdFlag, OFlag};
use nix::libc;
use nix::sys::signal::{self, SigHandler, Signal};
use nix::sys::stat::Mode;
use nix::unistd::{self, ForkResult, Pid};

use crate::shell::error::{Error, Result};
use crate::shell::state::path;
use crate::shell::state::Session;
use crate::shell::syntax::redirect::{Plan, Redirection, Stream};

const CANNOT_RUN: &[u8] = b"This shell doesn't know how to run programs.";

/// Exit status of a child whose redirection could not be set up.
pub const EXIT_REDIRECT_FAILED: i32 = 1;
/// Exit status of a child that could not replace itself with the program.
pub const EXIT_CANNOT_RUN: i32 = 127;

// Dispositions the shell changes for itself. Ignored signals survive exec,
// so the child puts all of them back.
const JOB_CONTROL_SIGNALS: [Signal; 5] = [
    Signal::SIGINT,
    Signal::SIGQUIT,
    Signal::SIGTSTP,
    Signal::SIGTTIN,
    Signal::SIGTTOU,
];

#[derive(Debug)]
struct OpenTarget {
    fd: RawFd,
    path: CString,
    flags: OFlag,
    mode: Mode,
}

impl OpenTarget {
    fn new(redirection: &Redirection) -> Result<OpenTarget> {
        let (flags, mode) = match redirection.stream {
            Stream::Input => (OFlag::O_RDONLY, Mode::empty()),
            Stream::Output => (
                OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
                Mode::S_IRWXU,
            ),
        };
        Ok(OpenTarget {
            fd: redirection.stream.fd(),
            path: to_cstring(redirection.path.as_bytes())?,
            flags: flags | OFlag::O_CLOEXEC,
            mode,
        })
    }

    /// Open the file and move it onto the standard stream. The opened
    /// descriptor is close-on-exec; only the `dup2` copy survives exec.
    fn install(&self) -> nix::Result<()> {
        let fd = fcntl::open(self.path.as_c_str(), self.flags, self.mode)?;
        if fd == self.fd {
            // the stream was closed and open() reused its number
            fcntl::fcntl(fd, FcntlArg::F_SETFD(FdFlag::empty()))?;
            return Ok(());
        }
        let installed = unistd::dup2(fd, self.fd);
        let _ = unistd::close(fd);
        installed.map(drop)
    }
}

/// A command ready to be forked.
#[derive(Debug)]
pub struct Command {
    argv: Vec<CString>,
    // null-terminated pointers into `argv`, handed straight to execv
    argv_ptrs: Vec<*const libc::c_char>,
    program: Option<CString>,
    redirections: Vec<OpenTarget>,
    background: bool,
}

impl Command {
    /// Convert a plan into exec-ready strings and resolve the program.
    ///
    /// A name containing `/` is used as written. A bare name is looked up on
    /// `PATH`; when that fails the command is still built, and the child
    /// reports the failure after its redirections are in place.
    pub fn new(plan: &Plan, background: bool) -> Result<Command> {
        let name = match plan.argv.first() {
            Some(name) => *name,
            None => return Err(Error::MissingCommand),
        };
        let argv = plan
            .argv
            .iter()
            .map(|arg| to_cstring(arg.as_bytes()))
            .collect::<Result<Vec<CString>>>()?;
        let program = if path::has_separator(name) {
            Some(to_cstring(name.as_bytes())?)
        } else {
            match path::resolve(name) {
                Ok(resolved) => Some(to_cstring(resolved.as_os_str().as_bytes())?),
                Err(e) => {
                    debug!("{}", e);
                    None
                }
            }
        };
        let redirections = plan
            .redirections
            .iter()
            .map(OpenTarget::new)
            .collect::<Result<Vec<OpenTarget>>>()?;
        let mut argv_ptrs: Vec<*const libc::c_char> = argv.iter().map(|a| a.as_ptr()).collect();
        argv_ptrs.push(ptr::null());
        Ok(Command {
            argv,
            argv_ptrs,
            program,
            redirections,
            background,
        })
    }

    pub fn name(&self) -> &CStr {
        &self.argv[0]
    }

    /// Resolved executable, if there is one.
    pub fn program(&self) -> Option<&CStr> {
        self.program.as_deref()
    }

    pub fn is_background(&self) -> bool {
        self.background
    }

    /// Child side of `launch`. Never returns.
    fn exec(&self, terminal: Option<BorrowedFd<'_>>) -> ! {
        let pid = unistd::getpid();
        let _ = unistd::setpgid(pid, pid);
        if let Some(fd) = terminal {
            // SIGTTOU is still ignored here, so this cannot stop us
            let _ = unistd::tcsetpgrp(fd, pid);
        }
        for sig in JOB_CONTROL_SIGNALS.iter() {
            let _ = unsafe { signal::signal(*sig, SigHandler::SigDfl) };
        }
        for target in &self.redirections {
            if let Err(errno) = target.install() {
                report(target.path.to_bytes(), errno.desc().as_bytes());
                exit(EXIT_REDIRECT_FAILED);
            }
        }
        if let Some(ref program) = self.program {
            unsafe { libc::execv(program.as_ptr(), self.argv_ptrs.as_ptr()) };
            let errno = Errno::last();
            if errno != Errno::ENOENT {
                report(program.to_bytes(), errno.desc().as_bytes());
            }
        }
        report(self.name().to_bytes(), CANNOT_RUN);
        exit(EXIT_CANNOT_RUN)
    }
}

/// Fork and exec `command`, returning the child's pid to the parent.
///
/// A foreground child of an interactive session takes the terminal for its
/// own process group before exec. Every child leads its own process group.
pub fn launch(session: &Session, command: &Command) -> Result<Pid> {
    let terminal = if command.is_background() {
        None
    } else {
        session.terminal()
    };
    match unsafe { unistd::fork() } {
        Ok(ForkResult::Parent { child }) => {
            info!(
                "launched {:?} as {}{}",
                command.name(),
                child,
                if command.is_background() { " (background)" } else { "" }
            );
            Ok(child)
        }
        Ok(ForkResult::Child) => command.exec(terminal),
        Err(errno) => Err(Error::Fork(errno)),
    }
}

fn to_cstring(bytes: &[u8]) -> Result<CString> {
    CString::new(bytes).map_err(|_| Error::StringEncoding)
}

/// Write `subject: message` to stderr without touching Rust's stdio.
fn report(subject: &[u8], message: &[u8]) {
    let parts: [&[u8]; 4] = [subject, b": ", message, b"\n"];
    let stderr = io::stderr();
    for part in parts.iter() {
        let _ = unistd::write(&stderr, part);
    }
}

fn exit(code: i32) -> ! {
    // SAFETY: _exit(2) terminates the process immediately; it never returns.
    unsafe { nix::libc::_exit(code) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    fn words(line: &str) -> Vec<OsString> {
        line.split_whitespace().map(OsString::from).collect()
    }

    #[test]
    fn explicit_path_is_not_searched() {
        let tokens = words("/bin/echo hi");
        let plan = crate::shell::syntax::redirect::plan(&tokens).unwrap();
        let command = Command::new(&plan, false).unwrap();
        assert_eq!(command.program().unwrap().to_bytes(), b"/bin/echo");
        assert_eq!(command.name().to_bytes(), b"/bin/echo");
        assert_eq!(command.argv_ptrs.len(), 3);
        assert!(command.argv_ptrs[2].is_null());
    }

    #[test]
    fn unknown_program_still_builds() {
        let tokens = words("cinder-no-such-program-here arg");
        let plan = crate::shell::syntax::redirect::plan(&tokens).unwrap();
        let command = Command::new(&plan, true).unwrap();
        assert!(command.program().is_none());
        assert!(command.is_background());
    }

    #[test]
    fn redirection_modes() {
        let tokens = words("sort < in.txt > out.txt");
        let plan = crate::shell::syntax::redirect::plan(&tokens).unwrap();
        let command = Command::new(&plan, false).unwrap();
        let input = &command.redirections[0];
        assert_eq!(input.fd, 0);
        assert!(input.flags.contains(OFlag::O_CLOEXEC));
        assert!(!input.flags.contains(OFlag::O_CREAT));
        let output = &command.redirections[1];
        assert_eq!(output.fd, 1);
        assert!(output.flags.contains(OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC));
        assert_eq!(output.mode, Mode::S_IRWXU);
    }

    #[test]
    fn non_utf8_arguments_reach_exec_unchanged() {
        use std::os::unix::ffi::OsStringExt;
        let tokens = vec![
            OsString::from("/bin/echo"),
            OsString::from_vec(b"caf\xe9".to_vec()),
            OsString::from(">"),
            OsString::from_vec(b"caf\xe9.txt".to_vec()),
        ];
        let plan = crate::shell::syntax::redirect::plan(&tokens).unwrap();
        let command = Command::new(&plan, false).unwrap();
        assert_eq!(command.argv[1].to_bytes(), b"caf\xe9");
        assert_eq!(command.redirections[0].path.to_bytes(), b"caf\xe9.txt");
    }

    #[test]
    fn only_redirections_is_rejected() {
        let tokens = words("> out.txt");
        let plan = crate::shell::syntax::redirect::plan(&tokens).unwrap();
        assert!(matches!(Command::new(&plan, false), Err(Error::MissingCommand)));
    }

    #[test]
    fn nul_bytes_are_rejected() {
        let tokens = vec![OsString::from("echo"), OsString::from("a\0b")];
        let plan = crate::shell::syntax::redirect::plan(&tokens).unwrap();
        assert!(matches!(Command::new(&plan, false), Err(Error::StringEncoding)));
    }
}
