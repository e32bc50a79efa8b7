use std::path::Path;

use scriptc::{
    CompileError, Compiler, diagnostics::Diagnostics, ir::Executable, parser::DocumentSource,
};

pub fn compile_program(source: &str, path: &str) -> Result<Executable, CompileError> {
    let compiler = Compiler::standard().expect("standard grammar loads");
    let source = DocumentSource::new(source, Path::new(path));
    tracing::debug!("source document:\n{}", &source.input);
    compiler.compile_source(&source)
}

#[allow(unused)]
pub fn check_invalid_program(source: &str, path: &str) -> (CompileError, Diagnostics) {
    let compiler = Compiler::standard().expect("standard grammar loads");
    let source = DocumentSource::new(source, Path::new(path));
    let error = compiler
        .compile_source(&source)
        .expect_err("expected error");
    (error, compiler.diagnostics())
}
