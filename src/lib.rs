pub mod ast;
pub mod compiler;
pub mod diagnostics;
pub mod driver;
pub mod grammar;
pub mod ir;
pub mod parser;

pub use compiler::{CompileError, CompileState, Compiler};
