//! Stack-machine assembler and reference interpreter.
//!
//! # Pipeline
//!
//! A [`program::Code`] is a list of directives. [`assembler::compile`]
//! flattens nested functional forms, tracks the stack depth through every
//! instruction, resolves window-relative DUP/SWAP requests and labels, and
//! returns the bytecode. [`vm::execute`] runs that bytecode over an input.
//!
//! # Modules
//!
//! - [`assembler`]: Flattening, label layout and bytecode generation
//! - [`errors`]: Compile and execution error types
//! - [`isa`]: Opcode table with arity and immediate widths
//! - [`operand`]: Push operand encoding
//! - [`program`]: Program construction
//! - [`samples`]: Ready-made programs
//! - [`stack`]: Compile-time depth tracking and stack-slot translation
//! - [`vm`]: Reference interpreter

pub mod assembler;
pub mod errors;
pub mod isa;
#[cfg(test)]
mod isa_static_check;
pub mod operand;
pub mod program;
pub mod samples;
pub mod stack;
pub mod vm;
