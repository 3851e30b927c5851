pub mod ast;
pub mod diagnostic;
pub mod lexeme;
pub mod lexer;
pub mod parser;
pub mod sema;
pub mod span;
pub mod tac;
pub mod x86;

use diagnostic::{render_diagnostics, Diagnostic};
use lexer::Lexer;
use parser::Parser;
use tac::{CodeBuffer, TacEmitter};
use x86::AssemblyGenerator;

/// Everything one compilation produces.
#[derive(Clone, Debug)]
pub struct Artifacts {
    /// The three-address code listing.
    pub tac: String,
    /// The NASM x86 (32-bit) listing.
    pub asm: String,
    /// Register allocator notes ("Spilling tN from reg for tM").
    pub spills: Vec<String>,
}

/// Parse a source string, rendering any diagnostics to stderr.
pub fn parse_source(source: &str, filename: &str) -> Result<ast::StatementList, Vec<Diagnostic>> {
    let (tokens, lex_errors) = Lexer::new(source).tokenize();
    if !lex_errors.is_empty() {
        render_diagnostics(&lex_errors, filename, source);
        return Err(lex_errors);
    }

    match Parser::new(tokens).parse_program() {
        Ok(program) => Ok(program),
        Err(errors) => {
            render_diagnostics(&errors, filename, source);
            Err(errors)
        }
    }
}

/// Parse without rendering; used by the library tests and embedders.
pub fn parse_source_silent(
    source: &str,
    _filename: &str,
) -> Result<ast::StatementList, Vec<Diagnostic>> {
    let (tokens, lex_errors) = Lexer::new(source).tokenize();
    if !lex_errors.is_empty() {
        return Err(lex_errors);
    }
    Parser::new(tokens).parse_program()
}

/// Compile a source string to TAC and NASM, rendering diagnostics to stderr.
///
/// Each call runs on fresh state (a new symbol table, code buffer, and
/// register pool) so repeated compilations are independent and
/// deterministic.
pub fn compile(source: &str, filename: &str) -> Result<Artifacts, Vec<Diagnostic>> {
    let program = parse_source(source, filename)?;
    compile_ast(&program).map_err(|err| {
        let diag = err.to_diagnostic();
        diag.render(filename, source);
        vec![diag]
    })
}

/// Compile without rendering diagnostics.
pub fn compile_silent(source: &str, filename: &str) -> Result<Artifacts, Vec<Diagnostic>> {
    let program = parse_source_silent(source, filename)?;
    compile_ast(&program).map_err(|err| vec![err.to_diagnostic()])
}

/// Compile a source string to the TAC listing only.
pub fn compile_to_tac(source: &str, filename: &str) -> Result<String, Vec<Diagnostic>> {
    let program = parse_source(source, filename)?;
    sema::check(&program).map_err(|err| {
        let diag = err.to_diagnostic();
        diag.render(filename, source);
        vec![diag]
    })?;
    Ok(lower_to_tac(&program))
}

/// Front end + semantic analysis only; no artifacts.
pub fn check_source(source: &str, filename: &str) -> Result<(), Vec<Diagnostic>> {
    let program = parse_source(source, filename)?;
    sema::check(&program).map_err(|err| {
        let diag = err.to_diagnostic();
        diag.render(filename, source);
        vec![diag]
    })
}

/// Lower an already-checked AST through both back-end phases.
fn compile_ast(program: &ast::StatementList) -> Result<Artifacts, sema::SemanticError> {
    sema::check(program)?;

    let tac = lower_to_tac(program);

    let mut asm_gen = AssemblyGenerator::new();
    let asm = asm_gen.generate_from_tac(&tac);

    Ok(Artifacts {
        tac,
        asm,
        spills: asm_gen.spill_log().to_vec(),
    })
}

fn lower_to_tac(program: &ast::StatementList) -> String {
    let mut buf = CodeBuffer::new();
    TacEmitter::new(&mut buf).emit_program(program);
    buf.get_code()
}
