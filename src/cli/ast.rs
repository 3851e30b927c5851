use std::path::PathBuf;
use std::process;

use clap::Args;

use minicc::ast::display::format_ast;

use super::read_source;

#[derive(Args)]
pub struct AstArgs {
    /// Input .mc file
    pub input: PathBuf,
}

pub fn cmd_ast(args: AstArgs) {
    let AstArgs { input } = args;
    let source = read_source(&input);
    let filename = input.to_string_lossy().to_string();

    let program = match minicc::parse_source(&source, &filename) {
        Ok(p) => p,
        Err(_) => process::exit(1),
    };

    print!("{}", format_ast(&program));
}
