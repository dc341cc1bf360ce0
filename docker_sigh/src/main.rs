use std::error::Error as _;

use clap::Parser;

/// Environment variable holding the `env_logger` filter, for example `debug` or `warn`.
const VERBOSITY_ENV: &str = "DOCKERSIGH_VERBOSITY";

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or(VERBOSITY_ENV, "info"))
        .init();

    if let Err(error) = docker_sigh::cli::Cli::parse().run() {
        const BOLD_RED: &str = "\x1b[1;31m";
        const BOLD: &str = "\x1b[1m";
        const RESET: &str = "\x1b[0m";
        eprintln!("{BOLD_RED}error{RESET}{BOLD}:{RESET} {error}");

        let mut source = error.source();
        while let Some(cause) = source {
            eprintln!("  {BOLD}caused by:{RESET} {cause}");
            source = cause.source();
        }

        std::process::exit(1);
    }
}
