use std::path::PathBuf;
use std::process;

use clap::Args;

use super::read_source;

#[derive(Args)]
pub struct TacArgs {
    /// Input .mc file
    pub input: PathBuf,
    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn cmd_tac(args: TacArgs) {
    let TacArgs { input, output } = args;
    let source = read_source(&input);
    let filename = input.to_string_lossy().to_string();

    let tac = match minicc::compile_to_tac(&source, &filename) {
        Ok(t) => t,
        Err(_) => process::exit(1),
    };

    match output {
        Some(out_path) => {
            if let Err(e) = std::fs::write(&out_path, &tac) {
                eprintln!("error: cannot write '{}': {}", out_path.display(), e);
                process::exit(1);
            }
            eprintln!("Lowered -> {}", out_path.display());
        }
        None => print!("{}", tac),
    }
}
