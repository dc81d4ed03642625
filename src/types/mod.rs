//! Core value types shared by the compiler and the interpreter.

pub mod word;
