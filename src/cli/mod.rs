pub mod ast;
pub mod build;
pub mod check;
pub mod tac;

use std::path::Path;
use std::process;

/// Read a source file, exiting with a message if it cannot be read.
pub fn read_source(input: &Path) -> String {
    if !input.extension().is_some_and(|e| e == "mc") {
        eprintln!("error: input must be a .mc file");
        process::exit(1);
    }
    match std::fs::read_to_string(input) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", input.display(), e);
            process::exit(1);
        }
    }
}
