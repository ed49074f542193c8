// Entrypoint for the CLI application.
// Keeps `main` small: parse arguments, set up logging and hand over to
// `cli::run`. Errors are printed once here and mapped to an exit code.

use clap::Parser;
use std::process;
use vg_client::{cli, logging, sysexits, VgError};

fn main() {
    let args = cli::Cli::parse();
    logging::init(args.verbose);

    if let Err(err) = cli::run(args) {
        eprintln!("Error: {err:#}");
        let code = err
            .downcast_ref::<VgError>()
            .map_or(sysexits::EX_SOFTWARE, sysexits::code_for);
        process::exit(code);
    }
}
