use std::ffi::{OsStr, OsString};
use std::os::unix::io::RawFd;

use super::super::error::{Error, Result};

const INPUT_OPERATOR: &str = "<";
const OUTPUT_OPERATOR: &str = ">";
const BACKGROUND_OPERATOR: &str = "&";

/// Standard stream replaced by a redirection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Input,
    Output,
}

impl Stream {
    pub fn fd(&self) -> RawFd {
        match *self {
            Stream::Input => 0,
            Stream::Output => 1,
        }
    }

    pub fn operator(&self) -> &'static str {
        match *self {
            Stream::Input => INPUT_OPERATOR,
            Stream::Output => OUTPUT_OPERATOR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirection<'a> {
    pub stream: Stream,
    pub path: &'a OsStr,
}

/// Argument vector and redirections extracted from one command.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Plan<'a> {
    pub argv: Vec<&'a OsStr>,
    pub redirections: Vec<Redirection<'a>>,
}

impl<'a> Plan<'a> {
    /// Record a redirection. A later redirection of the same stream replaces
    /// the earlier one, so only the last `<` and the last `>` take effect.
    fn redirect(&mut self, stream: Stream, path: &'a OsStr) {
        self.redirections.retain(|r| r.stream != stream);
        self.redirections.push(Redirection { stream, path });
    }
}

/// Split a trailing `&` off the words. Returns the remaining words and
/// whether the command was asked to run in the background.
pub fn split_background(tokens: &[OsString]) -> (&[OsString], bool) {
    match tokens.split_last() {
        Some((last, rest)) if last == BACKGROUND_OPERATOR => (rest, true),
        _ => (tokens, false),
    }
}

/// Separate `<file` and `>file` directives from the arguments.
pub fn plan(tokens: &[OsString]) -> Result<Plan<'_>> {
    let mut plan = Plan::default();
    let mut iter = tokens.iter();
    while let Some(token) = iter.next() {
        let stream = if token == INPUT_OPERATOR {
            Stream::Input
        } else if token == OUTPUT_OPERATOR {
            Stream::Output
        } else {
            plan.argv.push(token);
            continue;
        };
        match iter.next() {
            Some(path) => plan.redirect(stream, path),
            None => return Err(Error::MissingRedirectTarget(stream.operator())),
        }
    }
    Ok(plan)
}
