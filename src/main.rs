//! modb CLI entry point
//!
//! Parses arguments and dispatches through `cli::run`; prints the error and
//! exits non-zero on failure. No other logic lives here.

use modb::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
