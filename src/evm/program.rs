//! Program construction surface.
//!
//! A [`Code`] is an ordered list of [`Directive`]s built in Rust; there is no
//! textual syntax. Directives cover plain instructions, constant pushes,
//! labels and pushes of their addresses, depth declarations and assertions,
//! functional forms that nest argument expressions, and window-relative
//! DUP/SWAP requests.
//!
//! ```
//! use specialops::evm::isa::OpCode;
//! use specialops::evm::program::{Code, Directive};
//!
//! // return calldata[..] unchanged
//! let echo = Code::new()
//!     .call(
//!         OpCode::CallDataCopy,
//!         [
//!             Directive::op(OpCode::CallDataSize),
//!             Directive::op(OpCode::Push0),
//!             Directive::op(OpCode::Push0),
//!         ],
//!     )
//!     .call(
//!         OpCode::Return,
//!         [Directive::op(OpCode::CallDataSize), Directive::op(OpCode::Push0)],
//!     );
//! assert_eq!(echo.run(b"hello").unwrap(), b"hello");
//! ```

use crate::evm::assembler::{CompileOptions, compile};
use crate::evm::errors::{CompileError, Error};
use crate::evm::isa::OpCode;
use crate::evm::operand::Constant;
use crate::evm::stack::StackSlot;
use crate::evm::vm;

/// One element of a program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Directive {
    /// A plain instruction with no immediate.
    Op(OpCode),
    /// Push a constant using the narrowest (or forced) `PUSHn`.
    Push(Constant),
    /// Push the byte offset of a label.
    PushLabel(String),
    /// Declare a jump target; emits `JUMPDEST`.
    Label(String),
    /// Fail unless the tracked depth equals the value.
    ExpectDepth(usize),
    /// Adopt the value as the tracked depth.
    SetDepth(usize),
    /// Functional form: arguments are emitted in order, then `op`.
    ///
    /// Each argument must leave exactly one more item on the stack, so the
    /// last argument ends on top.
    Call { op: OpCode, args: Vec<Directive> },
    /// DUP/SWAP addressed relative to the bottom of the reachable window.
    Inverted(StackSlot),
}

impl Directive {
    pub fn op(op: OpCode) -> Self {
        Directive::Op(op)
    }

    pub fn push(value: impl Into<Constant>) -> Self {
        Directive::Push(value.into())
    }

    pub fn push_label(name: impl Into<String>) -> Self {
        Directive::PushLabel(name.into())
    }

    pub fn label(name: impl Into<String>) -> Self {
        Directive::Label(name.into())
    }

    pub fn call(op: OpCode, args: impl IntoIterator<Item = Directive>) -> Self {
        Directive::Call {
            op,
            args: args.into_iter().collect(),
        }
    }

    pub fn inverted(slot: StackSlot) -> Self {
        Directive::Inverted(slot)
    }
}

impl From<OpCode> for Directive {
    fn from(op: OpCode) -> Self {
        Directive::Op(op)
    }
}

impl From<StackSlot> for Directive {
    fn from(slot: StackSlot) -> Self {
        Directive::Inverted(slot)
    }
}

/// A program: the caller owns it, compilation only reads it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Code {
    directives: Vec<Directive>,
}

impl Code {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    /// Appends any directive.
    pub fn then(mut self, directive: impl Into<Directive>) -> Self {
        self.directives.push(directive.into());
        self
    }

    pub fn op(self, op: OpCode) -> Self {
        self.then(Directive::Op(op))
    }

    pub fn push(self, value: impl Into<Constant>) -> Self {
        self.then(Directive::push(value))
    }

    pub fn push_label(self, name: impl Into<String>) -> Self {
        self.then(Directive::push_label(name))
    }

    pub fn label(self, name: impl Into<String>) -> Self {
        self.then(Directive::label(name))
    }

    pub fn expect_depth(self, depth: usize) -> Self {
        self.then(Directive::ExpectDepth(depth))
    }

    pub fn set_depth(self, depth: usize) -> Self {
        self.then(Directive::SetDepth(depth))
    }

    pub fn call(self, op: OpCode, args: impl IntoIterator<Item = Directive>) -> Self {
        self.then(Directive::call(op, args))
    }

    pub fn inverted(self, slot: StackSlot) -> Self {
        self.then(Directive::Inverted(slot))
    }

    /// Compiles with [`CompileOptions::default`].
    pub fn compile(&self) -> Result<Vec<u8>, CompileError> {
        compile(self, &CompileOptions::default())
    }

    pub fn compile_with(&self, options: &CompileOptions) -> Result<Vec<u8>, CompileError> {
        compile(self, options)
    }

    /// Compiles, then runs the bytecode on the reference interpreter.
    pub fn run(&self, call_data: &[u8]) -> Result<Vec<u8>, Error> {
        let bytecode = self.compile()?;
        Ok(vm::execute(&bytecode, call_data)?)
    }
}

impl FromIterator<Directive> for Code {
    fn from_iter<I: IntoIterator<Item = Directive>>(iter: I) -> Self {
        Self {
            directives: iter.into_iter().collect(),
        }
    }
}

impl Extend<Directive> for Code {
    fn extend<I: IntoIterator<Item = Directive>>(&mut self, iter: I) {
        self.directives.extend(iter);
    }
}

impl IntoIterator for Code {
    type Item = Directive;
    type IntoIter = std::vec::IntoIter<Directive>;

    fn into_iter(self) -> Self::IntoIter {
        self.directives.into_iter()
    }
}

impl<'a> IntoIterator for &'a Code {
    type Item = &'a Directive;
    type IntoIter = std::slice::Iter<'a, Directive>;

    fn into_iter(self) -> Self::IntoIter {
        self.directives.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_appends_in_order() {
        let code = Code::new()
            .op(OpCode::CallDataSize)
            .push(1u8)
            .label("here")
            .push_label("here")
            .expect_depth(2)
            .set_depth(0)
            .inverted(StackSlot::Dup(1));
        assert_eq!(
            code.directives(),
            &[
                Directive::Op(OpCode::CallDataSize),
                Directive::Push(Constant::Int(1)),
                Directive::Label("here".into()),
                Directive::PushLabel("here".into()),
                Directive::ExpectDepth(2),
                Directive::SetDepth(0),
                Directive::Inverted(StackSlot::Dup(1)),
            ]
        );
    }

    #[test]
    fn collect_and_extend() {
        let mut code: Code = std::iter::repeat_n(Directive::op(OpCode::Pc), 3).collect();
        code.extend([Directive::op(OpCode::Pop)]);
        assert_eq!(code.len(), 4);
        assert!(!code.is_empty());
        assert_eq!((&code).into_iter().last(), Some(&Directive::Op(OpCode::Pop)));
    }

    #[test]
    fn call_collects_arguments() {
        let d = Directive::call(OpCode::Sub, [OpCode::Push0.into(), Directive::push(1u8)]);
        match d {
            Directive::Call { op, args } => {
                assert_eq!(op, OpCode::Sub);
                assert_eq!(args.len(), 2);
            }
            other => panic!("unexpected directive: {other:?}"),
        }
    }
}
