use std::io;
use std::process;

use tracing_subscriber::EnvFilter;

fn main() {
    // CINDER_LOG controls verbosity; diagnostics go to stderr so they never
    // mix with command output.
    let filter = EnvFilter::try_from_env("CINDER_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .init();

    let mut shell = cinder::shell::Shell::new();
    process::exit(shell.run());
}
