//! Compile-time stack tracking.
//!
//! [`StackDepth`] follows the statically known depth through a program and
//! rejects underflow, overflow and failed depth assertions. [`StackSlot`]
//! addresses a stack item by its position from the bottom of the reachable
//! window and is translated to the matching `DUPn`/`SWAPn` from the depth at
//! that program point.

use crate::evm::errors::CompileError;
use crate::evm::isa::{OpCode, STACK_WINDOW};
use std::fmt;

/// Maximum stack depth of the machine.
pub const STACK_LIMIT: usize = 1024;

/// Statically known stack depth during one compilation run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StackDepth {
    depth: usize,
    limit: usize,
}

impl StackDepth {
    /// An empty stack bounded by `limit`.
    pub fn new(limit: usize) -> Self {
        Self { depth: 0, limit }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Applies an instruction's stack effect.
    pub fn apply(&mut self, op: OpCode) -> Result<(), CompileError> {
        let required = op.pops();
        if self.depth < required {
            return Err(CompileError::StackUnderflow {
                op: op.mnemonic(),
                required,
                depth: self.depth,
            });
        }
        self.adopt(self.depth - required + op.pushes())
    }

    /// Checks the depth without changing it.
    pub fn expect(&self, expected: usize) -> Result<(), CompileError> {
        if self.depth != expected {
            return Err(CompileError::StackDepthMismatch {
                expected,
                actual: self.depth,
            });
        }
        Ok(())
    }

    /// Replaces the depth unconditionally, as at a jump target reached from
    /// several places.
    pub fn set(&mut self, depth: usize) -> Result<(), CompileError> {
        self.adopt(depth)
    }

    fn adopt(&mut self, depth: usize) -> Result<(), CompileError> {
        if depth > self.limit {
            return Err(CompileError::StackOverflow {
                depth,
                limit: self.limit,
            });
        }
        self.depth = depth;
        Ok(())
    }
}

impl Default for StackDepth {
    fn default() -> Self {
        Self::new(STACK_LIMIT)
    }
}

/// A stack item addressed from the bottom of the reachable window.
///
/// The index is 1-based. While the stack holds at most 16 items, index `k`
/// is absolute position `k - 1` from the true bottom. Deeper stacks slide the
/// window up: the oldest `depth - 16` items cannot be reached and `k` names
/// position `(k - 1) + (depth - 16)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StackSlot {
    /// Copy the slot to the top.
    Dup(u8),
    /// Exchange the slot with the top.
    Swap(u8),
}

impl StackSlot {
    pub fn index(&self) -> u8 {
        match self {
            StackSlot::Dup(k) | StackSlot::Swap(k) => *k,
        }
    }

    /// Picks the native instruction for this slot at stack depth `depth`.
    pub fn resolve(&self, depth: usize) -> Result<OpCode, CompileError> {
        let unreachable = || CompileError::StackSlotUnreachable {
            slot: *self,
            depth,
        };

        let k = self.index() as usize;
        if k == 0 {
            return Err(unreachable());
        }
        let window_bottom = depth.saturating_sub(STACK_WINDOW);
        let global = (k - 1) + window_bottom;
        if global >= depth {
            return Err(unreachable());
        }
        // 1 is the top item
        let from_top = depth - global;

        let native = match self {
            StackSlot::Dup(_) => OpCode::dup(from_top),
            // swapping the top with itself is not an instruction
            StackSlot::Swap(_) if from_top >= 2 => OpCode::swap(from_top - 1),
            StackSlot::Swap(_) => None,
        };
        native.ok_or_else(unreachable)
    }
}

impl fmt::Display for StackSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackSlot::Dup(k) => write!(f, "inverted DUP{k}"),
            StackSlot::Swap(k) => write!(f, "inverted SWAP{k}"),
        }
    }
}
