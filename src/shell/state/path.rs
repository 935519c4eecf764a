//! Executable lookup along `PATH`.
use std::env;
use std::ffi::OsStr;
use std::fmt;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

/// No directory on the search list holds the requested program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandNotFound {
    pub name: String,
}

impl fmt::Display for CommandNotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: command not found", self.name)
    }
}

impl std::error::Error for CommandNotFound {}

/// Whether `name` should be used as written instead of searched for.
pub fn has_separator(name: &OsStr) -> bool {
    name.as_bytes().contains(&b'/')
}

/// Resolve a bare program name against the process `PATH`.
pub fn resolve(name: &OsStr) -> Result<PathBuf, CommandNotFound> {
    resolve_in(name, env::var_os("PATH").as_deref())
}

/// Resolve `name` against an explicit search list. An absent list behaves
/// like an empty one. The first candidate that exists wins; whether it is
/// executable is left for exec to decide.
pub fn resolve_in(name: &OsStr, search: Option<&OsStr>) -> Result<PathBuf, CommandNotFound> {
    let search = search.unwrap_or_default();
    search
        .as_bytes()
        .split(|b| *b == b':')
        .filter(|segment| !segment.is_empty())
        .map(|segment| Path::new(OsStr::from_bytes(segment)).join(name))
        .find(|candidate| candidate.exists())
        .ok_or_else(|| CommandNotFound {
            name: name.to_string_lossy().into_owned(),
        })
}
