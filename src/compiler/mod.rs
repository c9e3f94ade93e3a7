//! LLVM-backed back end — lowers the AST to LLVM IR via Inkwell.
pub mod codegen;
pub mod compiler;

pub use compiler::Compiler;
