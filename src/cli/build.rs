use std::path::PathBuf;
use std::process;

use clap::Args;

use super::read_source;

#[derive(Args)]
pub struct BuildArgs {
    /// Input .mc file
    pub input: PathBuf,
    /// Output .asm file (default: <input>.asm)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Also print the three-address code listing to stdout
    #[arg(long)]
    pub tac: bool,
}

pub fn cmd_build(args: BuildArgs) {
    let BuildArgs { input, output, tac } = args;
    let source = read_source(&input);
    let filename = input.to_string_lossy().to_string();

    let artifacts = match minicc::compile(&source, &filename) {
        Ok(a) => a,
        Err(_) => process::exit(1),
    };

    for note in &artifacts.spills {
        eprintln!("note: {}", note);
    }

    if tac {
        println!("{}", artifacts.tac);
    }

    let out_path = output.unwrap_or_else(|| input.with_extension("asm"));
    if let Err(e) = std::fs::write(&out_path, &artifacts.asm) {
        eprintln!("error: cannot write '{}': {}", out_path.display(), e);
        process::exit(1);
    }
    eprintln!("Compiled -> {}", out_path.display());
}
