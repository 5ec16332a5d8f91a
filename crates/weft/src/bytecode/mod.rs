//! Opcode program, compiler, and executor.
//!
//! The parser's document AST is lowered here into a flat, position-dependent
//! instruction sequence that both the executor and the hydration codegen
//! walk.
//!
//! # Module Structure
//!
//! - `op` - opcode and program definitions
//! - `builder` - `ProgramBuilder` emitting ops with jump backpatching
//! - `compiler` - document AST to opcode program, custom-tag instantiation
//! - `vm` - executor rendering markup from a program and a data context

pub use op::{BeginTag, Op, Program, RuntimeScript};
pub use vm::execute;
pub(crate) use compiler::compile;

mod builder;
mod compiler;
mod op;
mod vm;
