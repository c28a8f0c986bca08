//! Command line entry point.

use clap::Parser;
use std::process::ExitCode;
use stickerboard_cli::{Cli, Command};

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match &cli.command {
        Command::Check(args) => stickerboard_cli::check(args),
        Command::Export(args) => stickerboard_cli::export(args).map(|()| true),
    };
    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(err) => {
            log::error!("{}", err);
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}
