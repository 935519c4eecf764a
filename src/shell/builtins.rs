use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

use super::state::jobs;
use super::Flow;

/// A command the shell runs itself instead of forking.
pub struct Builtin {
    pub name: &'static str,
    pub doc: &'static str,
    pub run: fn(&[OsString]) -> Flow,
}

static BUILTINS: [Builtin; 5] = [
    Builtin {
        name: "?",
        doc: "show this help menu",
        run: help,
    },
    Builtin {
        name: "exit",
        doc: "exit the command shell",
        run: exit,
    },
    Builtin {
        name: "cd",
        doc: "changes the current working directory to the argument taken",
        run: cd,
    },
    Builtin {
        name: "pwd",
        doc: "prints the current working directory to standard output",
        run: pwd,
    },
    Builtin {
        name: "wait",
        doc: "waits until all background jobs have terminated before returning to the prompt",
        run: wait,
    },
];

pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|builtin| builtin.name == name)
}

fn help(_: &[OsString]) -> Flow {
    for builtin in BUILTINS.iter() {
        println!("{} - {}", builtin.name, builtin.doc);
    }
    Flow::Continue
}

fn exit(_: &[OsString]) -> Flow {
    Flow::Exit(0)
}

fn cd(args: &[OsString]) -> Flow {
    let target = match args.first() {
        Some(dir) => Some(PathBuf::from(dir)),
        None => env::var_os("HOME").map(PathBuf::from),
    };
    let changed = match target {
        Some(dir) => env::set_current_dir(&dir).is_ok(),
        None => false,
    };
    if !changed {
        println!("No such directory");
    }
    Flow::Continue
}

fn pwd(_: &[OsString]) -> Flow {
    match env::current_dir() {
        Ok(dir) => println!("{}", dir.display()),
        Err(e) => eprintln!("pwd: {}", e),
    }
    Flow::Continue
}

fn wait(_: &[OsString]) -> Flow {
    match jobs::wait_all() {
        Ok(reaped) => debug!("wait collected {} children", reaped),
        Err(e) => eprintln!("wait: {}", e),
    }
    Flow::Continue
}
