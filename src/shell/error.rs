use std::io;

use nix::errno::Errno;
use thiserror::Error;

pub type Result<T> = ::std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// `<` or `>` was the last word on the line.
    #[error("syntax error: `{0}` expects a file name")]
    MissingRedirectTarget(&'static str),
    #[error("syntax error: redirection without a command")]
    MissingCommand,
    #[error("syntax error: {0}")]
    Lex(String),
    #[error("argument contains a nul byte")]
    StringEncoding,
    #[error("fork failed: {0}")]
    Fork(#[source] Errno),
    #[error("wait failed: {0}")]
    Wait(#[source] Errno),
    #[error("input error: {0}")]
    Io(#[from] io::Error),
}
