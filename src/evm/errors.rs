use crate::evm::stack::StackSlot;
use crate::types::word::Word;
use specialops_derive::Error;

/// Errors detected while compiling a [`Code`](crate::evm::program::Code).
///
/// Every variant aborts compilation; no bytes are produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// An instruction consumes more items than the tracked depth holds.
    #[error("stack underflow: {op} pops {required} but depth is {depth}")]
    StackUnderflow {
        op: &'static str,
        required: usize,
        depth: usize,
    },
    /// Tracked depth exceeds the configured stack limit.
    #[error("stack overflow: depth {depth} exceeds limit {limit}")]
    StackOverflow { depth: usize, limit: usize },
    /// An explicit depth assertion, or a functional-form argument, left the
    /// stack at an unexpected depth.
    #[error("stack depth mismatch: expected {expected}, got {actual}")]
    StackDepthMismatch { expected: usize, actual: usize },
    /// A functional form supplied the wrong number of arguments.
    #[error("arity mismatch: {op} takes {expected} arguments, got {actual}")]
    ArityMismatch {
        op: &'static str,
        expected: usize,
        actual: usize,
    },
    /// A push operand is empty or wider than 32 bytes.
    #[error("push operand of {width} bytes outside 1..=32")]
    OperandTooWide { width: usize },
    /// An integer push operand is below zero.
    #[error("push operand {value} is negative")]
    NegativeOperand { value: i128 },
    /// A `PUSHn` opcode was used without an operand.
    #[error("{op} needs an immediate; use a push directive")]
    ImmediateRequired { op: &'static str },
    /// A jump-target push names a label that is never declared.
    #[error("undefined label: {label}")]
    UndefinedLabel { label: String },
    /// The same label is declared twice.
    #[error("duplicate label: {label}")]
    DuplicateLabel { label: String },
    /// A label offset does not fit the forced jump-target width.
    #[error("label {label} at offset {offset} does not fit in {width} bytes")]
    JumpTargetOverflow {
        label: String,
        offset: usize,
        width: usize,
    },
    /// A logical stack slot is outside the reach of every DUP/SWAP.
    #[error("stack slot {slot} unreachable at depth {depth}")]
    StackSlotUnreachable { slot: StackSlot, depth: usize },
}

/// A byte that is not an assigned opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unassigned opcode {0:#04x}")]
pub struct UnknownOpcode(pub u8);

/// Errors raised by the reference interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// Byte is not an assigned opcode.
    #[error("invalid opcode {opcode:#04x} at pc {pc}")]
    InvalidOpcode { opcode: u8, pc: usize },
    /// Opcode exists but the interpreter does not model it.
    #[error("unsupported opcode {op} at pc {pc}")]
    UnsupportedOpcode { op: &'static str, pc: usize },
    #[error("stack underflow executing {op} at pc {pc}")]
    StackUnderflow { op: &'static str, pc: usize },
    #[error("stack overflow at pc {pc}")]
    StackOverflow { pc: usize },
    /// Jump target is not a JUMPDEST outside push data.
    #[error("invalid jump destination {dest} from pc {pc}")]
    InvalidJump { dest: Word, pc: usize },
    /// A memory or calldata offset is beyond what the interpreter allocates.
    #[error("memory access {offset}+{size} exceeds limit at pc {pc}")]
    MemoryLimit {
        offset: Word,
        size: Word,
        pc: usize,
    },
    /// Execution ended with REVERT.
    #[error("execution reverted: {data:02x?}")]
    Reverted { data: Vec<u8> },
    /// Execution hit the designated INVALID instruction.
    #[error("INVALID instruction at pc {pc}")]
    InvalidInstruction { pc: usize },
}

/// Failure of the compile-then-run path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("compilation failed")]
    Compile(#[from] CompileError),
    #[error("execution failed")]
    Execute(#[from] ExecutionError),
}
