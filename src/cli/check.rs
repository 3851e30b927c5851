use std::path::PathBuf;
use std::process;

use clap::Args;

use super::read_source;

#[derive(Args)]
pub struct CheckArgs {
    /// Input .mc file
    pub input: PathBuf,
}

pub fn cmd_check(args: CheckArgs) {
    let CheckArgs { input } = args;
    let source = read_source(&input);
    let filename = input.to_string_lossy().to_string();

    match minicc::check_source(&source, &filename) {
        Ok(()) => eprintln!("OK: {}", input.display()),
        Err(_) => process::exit(1),
    }
}
