//! Assembler for a 256-bit stack machine.
//!
//! Programs are built in Rust as [`evm::program::Code`], compiled to
//! bytecode with the stack depth checked statically, and can be run on the
//! bundled reference interpreter.

pub mod evm;
pub mod types;
pub mod utils;
