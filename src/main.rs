mod cli;

use clap::{Parser, Subcommand};

use cli::ast::AstArgs;
use cli::build::BuildArgs;
use cli::check::CheckArgs;
use cli::tac::TacArgs;

#[derive(Parser)]
#[command(
    name = "minicc",
    version,
    about = "minicc compiler: mini-C to three-address code and x86"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a .mc file to NASM assembly
    Build(BuildArgs),
    /// Parse and semantically check without emitting code
    Check(CheckArgs),
    /// Emit the three-address code listing
    Tac(TacArgs),
    /// Print the parse tree
    Ast(AstArgs),
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Build(args) => cli::build::cmd_build(args),
        Command::Check(args) => cli::check::cmd_check(args),
        Command::Tac(args) => cli::tac::cmd_tac(args),
        Command::Ast(args) => cli::ast::cmd_ast(args),
    }
}
