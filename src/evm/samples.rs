//! Ready-made programs used by the demo binary and the end-to-end tests.

use crate::evm::isa::OpCode;
use crate::evm::program::{Code, Directive};
use crate::evm::stack::StackSlot;

fn op(op: OpCode) -> Directive {
    Directive::op(op)
}

/// Returns the input unchanged.
pub fn echo() -> Code {
    Code::new()
        .call(
            OpCode::CallDataCopy,
            [op(OpCode::CallDataSize), op(OpCode::Push0), op(OpCode::Push0)],
        )
        .call(OpCode::Return, [op(OpCode::CallDataSize), op(OpCode::Push0)])
}

/// Returns the 32-byte Keccak-256 digest of the input.
pub fn keccak() -> Code {
    Code::new()
        .call(
            OpCode::CallDataCopy,
            [op(OpCode::CallDataSize), op(OpCode::Push0), op(OpCode::Push0)],
        )
        .call(OpCode::Keccak256, [op(OpCode::CallDataSize), op(OpCode::Push0)])
        .op(OpCode::Push0)
        .op(OpCode::MStore)
        .call(OpCode::Return, [Directive::push(32u8), op(OpCode::Push0)])
}

/// Treats the first input byte as a selector: zero echoes the remaining
/// bytes, anything else returns their Keccak-256 digest.
pub fn hash_or_echo() -> Code {
    Code::new()
        // payload length
        .call(OpCode::Sub, [Directive::push(1u8), op(OpCode::CallDataSize)])
        .call(
            OpCode::CallDataCopy,
            [op(OpCode::Dup1), Directive::push(1u8), op(OpCode::Push0)],
        )
        .call(
            OpCode::JumpI,
            [
                Directive::call(
                    OpCode::Shr,
                    [
                        Directive::call(OpCode::CallDataLoad, [op(OpCode::Push0)]),
                        Directive::push(248u8),
                    ],
                ),
                Directive::push_label("hash"),
            ],
        )
        .label("return")
        .expect_depth(1)
        .op(OpCode::Push0)
        .op(OpCode::Return)
        .label("hash")
        .set_depth(1)
        .op(OpCode::Push0)
        .op(OpCode::Keccak256)
        .op(OpCode::Push0)
        .op(OpCode::MStore)
        .push(32u8)
        .call(OpCode::Jump, [Directive::push_label("return")])
}

/// Pushes `depth` markers (each its own offset, via PC), applies `slot` and
/// returns the low byte of the resulting top of stack.
pub fn stack_marker(depth: usize, slot: StackSlot) -> Code {
    let mut code: Code = std::iter::repeat_n(op(OpCode::Pc), depth).collect();
    code.extend([
        Directive::inverted(slot),
        op(OpCode::Push0),
        op(OpCode::MStore),
    ]);
    code.call(
        OpCode::Return,
        [Directive::push(1u8), Directive::push(31u8)],
    )
}

/// Names accepted by [`by_name`].
pub const NAMES: &[&str] = &["echo", "keccak", "hash-or-echo"];

pub fn by_name(name: &str) -> Option<Code> {
    match name {
        "echo" => Some(echo()),
        "keccak" => Some(keccak()),
        "hash-or-echo" => Some(hash_or_echo()),
        _ => None,
    }
}
